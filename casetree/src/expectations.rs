//! Query-addressed expected failures and skips.
//!
//! File format:
//!
//! ```json
//! [
//!   { "query": "webgpu:api,operation,buffers:map:*", "expectation": "fail" },
//!   { "query": "webgpu:shader,*", "expectation": "skip" }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::query::{compare_queries, parse_query, Ordering, Query};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationKind {
    /// The covered cases are known to fail.
    Fail,
    /// The covered cases are not run.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub query: Query,
    pub expectation: ExpectationKind,
}

#[derive(Deserialize)]
struct RawExpectation {
    query: String,
    expectation: ExpectationKind,
}

impl Expectation {
    pub fn new(query: Query, expectation: ExpectationKind) -> Self {
        Self { query, expectation }
    }

    /// True if this expectation covers `case_query`.
    pub fn applies_to(&self, case_query: &Query) -> bool {
        compare_queries(&self.query, case_query).covers()
    }
}

/// Parse an expectations list, keeping only entries related to `run_query`.
pub fn parse_expectations(json: &str, run_query: &Query) -> Result<Vec<Expectation>> {
    let raw: Vec<RawExpectation> = serde_json::from_str(json)?;
    let mut expectations = Vec::with_capacity(raw.len());
    for entry in raw {
        let query = parse_query(&entry.query)?;
        if compare_queries(&query, run_query) == Ordering::Unordered {
            continue;
        }
        expectations.push(Expectation::new(query, entry.expectation));
    }
    Ok(expectations)
}

pub fn load_expectations(path: &Path, run_query: &Query) -> Result<Vec<Expectation>> {
    let contents = std::fs::read_to_string(path)?;
    parse_expectations(&contents, run_query)
}

/// The kinds of expectation that apply to one case.
pub fn expectation_kinds(expectations: &[Expectation], case_query: &Query) -> Vec<ExpectationKind> {
    expectations
        .iter()
        .filter(|e| e.applies_to(case_query))
        .map(|e| e.expectation)
        .collect()
}
