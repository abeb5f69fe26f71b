//! Canonical 68-point landmark layout and detector contour normalization.

pub mod normalize;
pub mod scheme;
pub mod synthetic;
