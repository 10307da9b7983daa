//! casetree: addressing, generation and grouping of conformance test cases.
//!
//! A query string such as `webgpu:api,operation,*` names a set of cases.
//! Parsing it, generating the parameter cases of each test and arranging
//! the matches in a prefix-sharing tree is what this crate does; running
//! the cases is left to the caller.

pub mod config;
pub mod error;
pub mod expectations;
pub mod group;
pub mod loader;
pub mod params;
pub mod query;
pub mod recorder;
pub mod tree;

pub use config::RunnerConfig;
pub use error::{Error, Result};
pub use expectations::{load_expectations, parse_expectations, Expectation, ExpectationKind};
pub use group::{CaseContext, CaseError, CaseId, CaseOutcome, RunCase, TestGroup};
pub use loader::{ListingEntry, SpecFile, SpecLoader, StaticLoader};
pub use params::{params, pbool, poptions, CaseParams, ParamValue, ParamsBuilder};
pub use query::{compare_queries, parse_query, Ordering, Query, QueryLevel};
pub use recorder::{CaseRecorder, CaseResult, Logger, Status};
pub use tree::{load_tree_for_query, resolve, Leaf, ResultTree, Subtree, TreeNode};
