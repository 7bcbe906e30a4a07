// codesift - platform/mod.rs
//
// Platform abstraction layer: config directories, config.toml, and the
// filesystem operations the pipeline needs (gzip open, atomic write).

pub mod config;
pub mod fs;
