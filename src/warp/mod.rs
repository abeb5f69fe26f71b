//! Landmark-driven image deformation.

pub mod engine;
pub mod grid;
pub mod operators;
pub mod remap;
pub mod styles;
