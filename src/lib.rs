// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # htn-refine
//!
//! Preprocessing passes for HTN planning domains, run between the domain
//! loader and the compiler that turns the hierarchy into a classical problem.
//!
//! ## Passes
//!
//! - **Precondition inference** (`infer`): derives, per method, literals that
//!   must already hold because some subtask requires them and nothing in the
//!   method can establish them, and injects them as preconditions of a
//!   synthetic primitive step ordered first.
//! - **Two-regularization** (`regularize`): splits totally ordered methods
//!   with more than two subtasks into a cascade of binary methods.
//!
//! ## Library usage
//!
//! ```no_run
//! use htn_refine::config::RefineConfig;
//! use htn_refine::model::Domain;
//! use htn_refine::pipeline;
//!
//! let json = std::fs::read_to_string("domain.json").unwrap();
//! let mut domain: Domain = serde_json::from_str(&json).unwrap();
//! let report = pipeline::run(&mut domain, &RefineConfig::default()).unwrap();
//! if let Some(stats) = report.statistics {
//!     println!("Inference Statistics: {stats}");
//! }
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod infer;
pub mod loops;
pub mod model;
pub mod pipeline;
pub mod regularize;
