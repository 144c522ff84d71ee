// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # triple-tms
//!
//! A minimal truth-maintenance system for derived facts. An external
//! evaluator computes `(subject, predicate, value)` triples and records,
//! per triple, which other triples it read (dependencies) and which
//! currently justify it (supports). This crate keeps those edges
//! consistent and answers the question "what is stale now?".
//!
//! ## Architecture
//!
//! - **Triples** (`triple`): keys, records, and the three edge primitives
//! - **Registry** (`registry`): concurrent map of triples with exclusive per-triple guards
//! - **Invalidation** (`invalidation`): read-only recompute and retraction planning
//! - **Config** (`config`): TOML-loadable registry settings
//!
//! ## Library usage
//!
//! ```
//! use triple_tms::invalidation::plan_recompute;
//! use triple_tms::registry::TripleRegistry;
//! use triple_tms::triple::TripleRef;
//!
//! let registry = TripleRegistry::default();
//! let age = TripleRef::new("person1", "age").unwrap();
//! let adult = TripleRef::new("person1", "isAdult").unwrap();
//!
//! registry.get_or_create(age.clone());
//! registry.get_or_create(adult.clone()).add_dependency(age.clone());
//!
//! let plan = plan_recompute(&registry, &age);
//! assert!(plan.contains(&adult));
//! ```

pub mod config;
pub mod error;
pub mod invalidation;
pub mod logging;
pub mod registry;
pub mod triple;
