//! Query micro-language for addressing conformance cases.
//!
//! # Syntax Overview
//!
//! Full pattern: `suite:group,...:test,...:key=value;...`
//!
//! - **Multi-file**: `suite:*`, `suite:a,b,*` (a directory or file prefix)
//! - **Multi-test**: `suite:a,b:*`, `suite:a,b:c,*` (tests inside one spec file)
//! - **Multi-case**: `suite:a,b:c:*`, `suite:a,b:c:x=1;*` (cases of one test)
//! - **Single case**: `suite:a,b:c:`, `suite:a,b:c:x=1;y="str"`
//!
//! Param values are JSON literals; `undefined` encodes an absent value.

mod compare;
mod parser;

use std::fmt::{self, Write};

use crate::params::{param_key_is_public, CaseParams};

pub use compare::{
    compare_paths, compare_public_params_paths, compare_queries, compare_sequences, Ordering,
};
pub use parser::parse_query;

/// Separates suite, group path, test path and params.
pub const BIG_SEPARATOR: char = ':';
/// Separates segments of a group or test path.
pub const PATH_SEPARATOR: char = ',';
/// Separates `key=value` params.
pub const PARAM_SEPARATOR: char = ';';
/// Separates a param key from its value.
pub const PARAM_KV_SEPARATOR: char = '=';
/// Trailing marker meaning "this query and all descendants".
pub const WILDCARD: char = '*';

/// The most specific level a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryLevel {
    /// `suite:a,b,*`
    MultiFile,
    /// `suite:a,b:c,*`
    MultiTest,
    /// `suite:a,b:c:x=1;*`
    MultiCase,
    /// `suite:a,b:c:x=1`
    SingleCase,
}

/// A parsed query.
///
/// `params` is only present when `test_path` is. Multi-file and multi-test
/// queries always end with a wildcard; the constructors keep that invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Suite name (first section, never empty)
    pub suite: String,
    /// Group path identifying a directory or spec file
    pub group_path: Vec<String>,
    /// Test path inside a spec file
    pub test_path: Option<Vec<String>>,
    /// Public params of a case (or a prefix of them)
    pub params: Option<CaseParams>,
    /// Whether the query covers all descendants of the last level
    pub ends_with_wildcard: bool,
}

fn to_parts<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

impl Query {
    /// `suite:a,b,*`
    pub fn multi_file<I, S>(suite: impl Into<String>, group_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suite: suite.into(),
            group_path: to_parts(group_path),
            test_path: None,
            params: None,
            ends_with_wildcard: true,
        }
    }

    /// `suite:a,b:c,*`
    pub fn multi_test<I, S, J, T>(suite: impl Into<String>, group_path: I, test_path: J) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            suite: suite.into(),
            group_path: to_parts(group_path),
            test_path: Some(to_parts(test_path)),
            params: None,
            ends_with_wildcard: true,
        }
    }

    /// `suite:a,b:c:x=1;*`
    pub fn multi_case<I, S, J, T>(
        suite: impl Into<String>,
        group_path: I,
        test_path: J,
        params: CaseParams,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            suite: suite.into(),
            group_path: to_parts(group_path),
            test_path: Some(to_parts(test_path)),
            params: Some(params),
            ends_with_wildcard: true,
        }
    }

    /// `suite:a,b:c:x=1`
    pub fn single_case<I, S, J, T>(
        suite: impl Into<String>,
        group_path: I,
        test_path: J,
        params: CaseParams,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            ends_with_wildcard: false,
            ..Self::multi_case(suite, group_path, test_path, params)
        }
    }

    /// The most specific level this query addresses.
    pub fn level(&self) -> QueryLevel {
        match (&self.test_path, &self.params) {
            (None, _) => QueryLevel::MultiFile,
            (Some(_), None) => QueryLevel::MultiTest,
            (Some(_), Some(_)) if self.ends_with_wildcard => QueryLevel::MultiCase,
            (Some(_), Some(_)) => QueryLevel::SingleCase,
        }
    }

    /// Whether this query addresses exactly one case.
    pub fn is_single_case(&self) -> bool {
        self.level() == QueryLevel::SingleCase
    }
}

fn write_parts(
    f: &mut fmt::Formatter<'_>,
    parts: impl IntoIterator<Item = impl fmt::Display>,
    separator: char,
    wildcard: bool,
) -> fmt::Result {
    let mut first = true;
    for part in parts {
        if !first {
            f.write_char(separator)?;
        }
        write!(f, "{}", part)?;
        first = false;
    }
    if wildcard {
        if !first {
            f.write_char(separator)?;
        }
        f.write_char(WILDCARD)?;
    }
    Ok(())
}

/// Canonical form: the inverse of [`parse_query`] and the key of tree nodes.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.suite, BIG_SEPARATOR)?;

        let Some(test_path) = &self.test_path else {
            return write_parts(f, &self.group_path, PATH_SEPARATOR, true);
        };
        write_parts(f, &self.group_path, PATH_SEPARATOR, false)?;
        f.write_char(BIG_SEPARATOR)?;

        let Some(params) = &self.params else {
            return write_parts(f, test_path, PATH_SEPARATOR, true);
        };
        write_parts(f, test_path, PATH_SEPARATOR, false)?;
        f.write_char(BIG_SEPARATOR)?;

        let param_parts = params
            .iter()
            .filter(|(k, _)| param_key_is_public(k))
            .map(|(k, v)| format!("{}{}{}", k, PARAM_KV_SEPARATOR, v));
        write_parts(f, param_parts, PARAM_SEPARATOR, self.ends_with_wildcard)
    }
}
