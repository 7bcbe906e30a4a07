// codesift - core/mod.rs
//
// Core business logic layer: line reading, candidate extraction, the
// cross-file tally, and the corpus writers.
// Must NOT depend on: app or platform.

pub mod discovery;
pub mod export;
pub mod extract;
pub mod model;
pub mod reader;
pub mod tally;
