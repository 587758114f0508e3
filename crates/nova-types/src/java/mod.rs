//! Java-specific algorithms layered over the type model: capture conversion and per-body typing
//! contexts, supertype helpers, overload resolution and javac-style rendering.

pub mod env;
pub mod format;
pub mod helpers;
pub mod overload;
