#![no_main]

use libfuzzer_sys::fuzz_target;
use oxicc_core::Profile;

// Parse a profile and then query the pieces a consumer would: the first
// and last tag by index, and the materialized transforms.
fuzz_target!(|data: &[u8]| {
    let Ok(profile) = Profile::parse(data) else {
        return;
    };

    if profile.tag_count() > 0 {
        let _ = profile.tag_by_index(0);
        let _ = profile.tag_by_index(profile.tag_count() - 1);
    }

    if let Some(trc) = &profile.trc {
        for curve in trc {
            let _ = curve.eval(0.5);
        }
    }
    if let Some(a2b) = &profile.a2b {
        let _ = a2b.grid_points();
        for curve in &a2b.output_curves {
            let _ = curve.eval(0.5);
        }
    }
});
