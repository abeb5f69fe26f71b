//! Streaming session orchestration: generation-stamped hand-off, worker and render surface.

pub mod orchestrator;
pub mod slot;
pub mod surface;
