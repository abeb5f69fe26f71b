//! Pixel-layout conversion and orientation helpers.

pub mod convert;
pub mod orient;
