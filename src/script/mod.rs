//! Host-facing glue: compiling scripts and driving their lifecycle

pub mod engine;
pub mod instance;

pub use engine::ScriptEngine;
pub use instance::ScriptInstance;
