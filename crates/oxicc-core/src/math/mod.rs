//! Math utilities: small matrices and transfer-function fitting

pub mod matrix;
pub mod transfer;

pub use matrix::{Matrix3x3, Matrix3x4};
pub use transfer::TransferFunction;
