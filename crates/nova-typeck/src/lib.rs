//! Expression-level type checking for Java method bodies.
//!
//! `nova-typeck` walks a lowered [`hir::Body`] and assigns a type to every expression and local,
//! driving the type-level machinery of `nova-types`:
//!
//! - overload selection for calls, `new` and method references;
//! - generic method inference across nested poly calls (`stream.collect(Collectors.toList())`);
//! - lambda parameter and return typing against functional interface targets;
//! - `var` locals (upward projection of the initializer type) and for-each element types;
//! - diagnostics for unresolvable, ambiguous and ill-typed expressions.
//!
//! Results are collected in a [`BodyTypeckResult`]. Bodies are independent: [`check_bodies`]
//! types many of them in parallel over one shared [`nova_types::TypeStore`].

mod checker;
pub mod config;
pub mod hir;

pub use checker::{check_bodies, check_body, BodyTypeckResult};
pub use config::{init_tracing, json_schema, ConfigError, LoggingConfig, TypeckConfig};
