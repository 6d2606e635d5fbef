//! Script sandbox implementations

mod rhai_sandbox;

pub use rhai_sandbox::{OUTPUT_VARIABLE, RhaiSandbox, SandboxLimits};
