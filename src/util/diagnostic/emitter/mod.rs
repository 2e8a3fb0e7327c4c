//! Diagnostic output

pub mod json;
pub mod text;

pub use json::JsonEmitter;
pub use text::{EmitterConfig, TextEmitter};
