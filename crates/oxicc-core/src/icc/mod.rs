//! ICC Profile Parsing
//!
//! This module provides native ICC profile parsing according to ICC.1:2010.
//!
//! # Structure
//!
//! An ICC profile consists of:
//! 1. A 128-byte header followed by the 4-byte tag count
//! 2. A tag directory of (signature, offset, size) entries
//! 3. Tag payloads located by absolute offsets (may overlap)
//!
//! The parser is a zero-copy view: a `Profile` borrows its input buffer
//! and every decoded table inside it points back into that buffer. Offsets
//! and sizes come from untrusted input and are validated with widened
//! arithmetic before any slice is taken.

pub mod a2b;
pub mod curve;
pub mod header;
pub mod profile;
pub mod types;

mod bytes;

pub use a2b::{A2b, ClutStage, ClutTable, MatrixStage};
pub use curve::{are_approximate_inverses, Curve};
pub use header::Header;
pub use profile::{Profile, Tag};
pub use types::{
    ColorSpace, DateTimeNumber, ProfileClass, RenderingIntent, S15Fixed16, TagSignature,
    TypeSignature, U8Fixed8, XyzNumber,
};
