// codesift - lib.rs
//
// Library entry point. The pipeline is invoked as a library step through
// `app::pipeline::run`; the `codesift` binary is a thin CLI over it.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
