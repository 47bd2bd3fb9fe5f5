#![no_main]

use libfuzzer_sys::fuzz_target;
use oxicc_core::{are_approximate_inverses, Curve};

// Decode a lone curve payload and run the fitter over it. Never panics;
// the fitter may decline.
fuzz_target!(|data: &[u8]| {
    let Ok((curve, _)) = Curve::decode(data) else {
        return;
    };

    let _ = curve.eval(0.0);
    let _ = curve.eval(0.5);
    let _ = curve.eval(1.0);

    if let Some((tf, max_error)) = curve.approximate(None) {
        assert!(max_error.is_finite());
        assert!(tf.a > 0.0 && tf.g > 0.0);
        let _ = are_approximate_inverses(&curve, &tf);
    }
});
