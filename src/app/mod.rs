// codesift - app/mod.rs
//
// Application layer: per-file workers and the pipeline orchestrator.
// Dependencies: core, platform.

pub mod pipeline;
pub mod worker;
