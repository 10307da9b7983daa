//! Where listings and spec files come from.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::group::TestGroup;
use crate::query::PATH_SEPARATOR;
use crate::{Error, Result};

/// One entry of a suite listing: a directory readme or a spec file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: Vec<String>,
    /// Set for directory readmes; spec files have none.
    pub readme: Option<String>,
}

impl ListingEntry {
    pub fn spec_file<S: Into<String>>(path: impl IntoIterator<Item = S>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            readme: None,
        }
    }

    pub fn readme<S: Into<String>>(
        path: impl IntoIterator<Item = S>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            readme: Some(text.into()),
        }
    }
}

/// A loaded spec file.
#[derive(Debug, Clone)]
pub struct SpecFile {
    description: String,
    group: Arc<TestGroup>,
}

impl SpecFile {
    /// Wrap a finished group, checking every test has a body.
    pub fn new(description: impl Into<String>, group: TestGroup) -> Result<Self> {
        group.validate()?;
        Ok(Self {
            description: description.into(),
            group: Arc::new(group),
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn group(&self) -> &TestGroup {
        &self.group
    }
}

/// Source of suite listings and spec files.
#[async_trait]
pub trait SpecLoader: Send + Sync {
    /// All readmes and spec files of a suite, in display order.
    async fn listing(&self, suite: &str) -> Result<Vec<ListingEntry>>;

    /// Load the spec file at `path`.
    async fn import_spec_file(&self, suite: &str, path: &[String]) -> Result<SpecFile>;
}

type SpecFactory = Arc<dyn Fn() -> Result<SpecFile> + Send + Sync>;

#[derive(Default, Clone)]
struct SuiteEntry {
    listing: Vec<ListingEntry>,
    specs: HashMap<Vec<String>, SpecFactory>,
}

/// In-memory loader: suites registered up front, spec files built on import.
#[derive(Default, Clone)]
pub struct StaticLoader {
    suites: IndexMap<String, SuiteEntry>,
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.suites.iter().map(|(name, s)| (name, &s.listing)))
            .finish()
    }
}

fn display_path(suite: &str, path: &[String]) -> String {
    format!("{}:{}", suite, path.join(&PATH_SEPARATOR.to_string()))
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suites(&self) -> impl Iterator<Item = &str> {
        self.suites.keys().map(String::as_str)
    }

    /// Describe the directory at `path` (empty for the suite root).
    pub fn readme(&mut self, suite: &str, path: &[&str], text: &str) -> &mut Self {
        self.suite_mut(suite)
            .listing
            .push(ListingEntry::readme(path.iter().copied(), text));
        self
    }

    /// Register a spec file built by `factory` each time it is imported.
    pub fn spec<F>(&mut self, suite: &str, path: &[&str], factory: F) -> &mut Self
    where
        F: Fn() -> Result<SpecFile> + Send + Sync + 'static,
    {
        let entry = ListingEntry::spec_file(path.iter().copied());
        let suite = self.suite_mut(suite);
        suite.specs.insert(entry.path.clone(), Arc::new(factory));
        suite.listing.push(entry);
        self
    }

    fn suite_mut(&mut self, suite: &str) -> &mut SuiteEntry {
        self.suites.entry(suite.to_string()).or_default()
    }
}

#[async_trait]
impl SpecLoader for StaticLoader {
    async fn listing(&self, suite: &str) -> Result<Vec<ListingEntry>> {
        let entry = self
            .suites
            .get(suite)
            .ok_or_else(|| Error::SpecNotFound(format!("{}:*", suite)))?;
        tracing::debug!(
            target: "casetree::loader",
            suite,
            entries = entry.listing.len(),
            "Listing suite"
        );
        Ok(entry.listing.clone())
    }

    async fn import_spec_file(&self, suite: &str, path: &[String]) -> Result<SpecFile> {
        let factory = self
            .suites
            .get(suite)
            .and_then(|s| s.specs.get(path))
            .ok_or_else(|| Error::SpecNotFound(display_path(suite, path)))?;
        tracing::debug!(
            target: "casetree::loader",
            spec = %display_path(suite, path),
            "Importing spec file"
        );
        factory()
    }
}
