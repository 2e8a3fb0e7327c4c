//! Shared infrastructure: locations, diagnostics, logging and configuration

pub mod config;
pub mod diagnostic;
pub mod logger;
pub mod span;

pub use span::{Location, Spanned};
