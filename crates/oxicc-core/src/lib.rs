//! # oxicc - Oxidized ICC profile core
//!
//! A safe, zero-copy parser for ICC color profiles (ICC.1:2010) with a
//! Gauss–Newton transfer-function fitter.
//!
//! ## Goals
//!
//! - **Safe**: every offset, size and count in a profile is attacker
//!   controlled; nothing is trusted before a bounds check
//! - **Zero-copy**: a parsed [`Profile`] borrows its input buffer, table
//!   payloads included
//! - **Small surface**: header metadata, the tag directory, tone curves,
//!   the RGB→XYZ D50 matrix, and the A2B pipeline — the pieces a color
//!   pipeline needs to reconstruct a profile's transforms
//!
//! ## Quick Start
//!
//! ```no_run
//! use oxicc_core::{Profile, TagSignature};
//!
//! let bytes = std::fs::read("display.icc").unwrap();
//! let profile = Profile::parse(&bytes).unwrap();
//!
//! if let Some(trc) = &profile.trc {
//!     let mid = trc[0].eval(0.5);
//!     println!("red TRC at 0.5 -> {mid}");
//! }
//! if let Some(tag) = profile.tag_by_signature(TagSignature::RED_TRC) {
//!     println!("rTRC payload is {} bytes", tag.data.len());
//! }
//! ```
//!
//! Curve fitting runs on demand against any sampled curve:
//!
//! ```no_run
//! # let bytes: Vec<u8> = vec![];
//! # let profile = oxicc_core::Profile::parse(&bytes).unwrap();
//! if let Some(trc) = &profile.trc {
//!     if let Some((tf, max_error)) = trc[0].approximate(None) {
//!         println!("fitted g = {}, max error {max_error}", tf.g);
//!     }
//! }
//! ```

pub mod error;
pub mod icc;
pub mod math;

pub use error::{Error, Result};
pub use icc::{
    are_approximate_inverses, A2b, ClutStage, ClutTable, ColorSpace, Curve, DateTimeNumber,
    Header, MatrixStage, Profile, ProfileClass, RenderingIntent, S15Fixed16, Tag, TagSignature,
    TypeSignature, U8Fixed8, XyzNumber,
};
pub use math::{Matrix3x3, Matrix3x4, TransferFunction};

/// Version of oxicc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
