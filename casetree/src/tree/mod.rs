//! Result tree: the cases a query resolves to, grouped for reporting.
//!
//! Nodes are keyed by their canonical query string, so cases that share a
//! directory, file, test prefix or param prefix share the subtree for it:
//!
//! ```text
//! demo:*
//!   demo:a:*
//!     demo:a:t:*
//!       demo:a:t:n=1
//!       demo:a:t:n=2
//!   demo:a,*
//!     demo:a,b:*
//!       demo:a,b:t:*
//!         ...
//! ```

use std::fmt;

use indexmap::IndexMap;

use crate::expectations::Expectation;
use crate::group::RunCase;
use crate::loader::SpecLoader;
use crate::params::CaseParams;
use crate::query::{compare_paths, compare_public_params_paths, parse_query, Ordering, Query};
use crate::recorder::CaseRecorder;
use crate::{Error, Result};

#[derive(Debug)]
pub enum TreeNode {
    Subtree(Subtree),
    Leaf(Leaf),
}

impl TreeNode {
    pub fn query(&self) -> &Query {
        match self {
            TreeNode::Subtree(s) => &s.query,
            TreeNode::Leaf(l) => &l.query,
        }
    }
}

/// An interior node: a directory, spec file, test or param prefix.
#[derive(Debug)]
pub struct Subtree {
    pub query: Query,
    pub description: Option<String>,
    pub children: IndexMap<String, TreeNode>,
}

impl Subtree {
    fn new(query: Query) -> Self {
        Self {
            query,
            description: None,
            children: IndexMap::new(),
        }
    }

    /// Find a descendant by canonical key.
    pub fn find(&self, key: &str) -> Option<&TreeNode> {
        if let Some(node) = self.children.get(key) {
            return Some(node);
        }
        self.children.values().find_map(|child| match child {
            TreeNode::Subtree(s) => s.find(key),
            TreeNode::Leaf(_) => None,
        })
    }
}

/// A single case.
#[derive(Debug)]
pub struct Leaf {
    pub query: Query,
    pub run_case: RunCase,
}

impl Leaf {
    /// Run the case under its own query.
    pub fn run(&self, recorder: &mut CaseRecorder, expectations: &[Expectation]) {
        self.run_case.run(&self.query, recorder, expectations);
    }
}

/// The tree built for one query.
#[derive(Debug)]
pub struct ResultTree {
    query: Query,
    root: Subtree,
}

impl ResultTree {
    /// The query this tree was built for.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn root(&self) -> &Subtree {
        &self.root
    }

    /// Leaves, depth first, in discovery order.
    pub fn iter_leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![self.root.children.values()],
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.iter_leaves().count()
    }

    /// Look up a node below the root by canonical key.
    pub fn get(&self, key: &str) -> Option<&TreeNode> {
        self.root.find(key)
    }
}

/// Depth-first iterator over the leaves of a [`ResultTree`].
pub struct Leaves<'a> {
    stack: Vec<indexmap::map::Values<'a, String, TreeNode>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Leaf;

    fn next(&mut self) -> Option<&'a Leaf> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(TreeNode::Leaf(leaf)) => return Some(leaf),
                Some(TreeNode::Subtree(subtree)) => self.stack.push(subtree.children.values()),
            }
        }
    }
}

fn write_subtree(f: &mut fmt::Formatter<'_>, subtree: &Subtree, depth: usize) -> fmt::Result {
    write!(f, "{:indent$}{}", "", subtree.query, indent = depth * 2)?;
    if let Some(description) = &subtree.description {
        if let Some(first_line) = description.lines().next() {
            write!(f, "  # {}", first_line)?;
        }
    }
    writeln!(f)?;
    for child in subtree.children.values() {
        match child {
            TreeNode::Subtree(s) => write_subtree(f, s, depth + 1)?,
            TreeNode::Leaf(l) => {
                writeln!(f, "{:indent$}{}", "", l.query, indent = (depth + 1) * 2)?
            }
        }
    }
    Ok(())
}

impl fmt::Display for ResultTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_subtree(f, &self.root, 0)
    }
}

fn get_or_insert_subtree(parent: &mut Subtree, query: Query) -> Result<&mut Subtree> {
    let key = query.to_string();
    let node = parent
        .children
        .entry(key)
        .or_insert_with(|| TreeNode::Subtree(Subtree::new(query)));
    match node {
        TreeNode::Subtree(subtree) => Ok(subtree),
        TreeNode::Leaf(leaf) => Err(Error::StructuralMismatch(format!(
            "{} is a case, expected a subtree",
            leaf.query
        ))),
    }
}

/// The directory subtree for `path`, creating it and its ancestors.
fn subtree_for_dir<'a>(
    root: &'a mut Subtree,
    suite: &str,
    path: &[String],
) -> Result<&'a mut Subtree> {
    let mut node = root;
    for i in 1..=path.len() {
        node = get_or_insert_subtree(node, Query::multi_file(suite, &path[..i]))?;
    }
    Ok(node)
}

fn subtree_for_file<'a>(
    root: &'a mut Subtree,
    suite: &str,
    path: &[String],
) -> Result<&'a mut Subtree> {
    let Some((_, dirs)) = path.split_last() else {
        return Err(Error::StructuralMismatch(format!(
            "spec file with empty path in suite {}",
            suite
        )));
    };
    let dir = subtree_for_dir(root, suite, dirs)?;
    get_or_insert_subtree(dir, Query::multi_test(suite, path, Vec::<String>::new()))
}

fn insert_case(
    file: &mut Subtree,
    suite: &str,
    group_path: &[String],
    case: RunCase,
) -> Result<()> {
    let test_path = &case.id.test_path;

    let mut node = file;
    for i in 1..test_path.len() {
        node = get_or_insert_subtree(node, Query::multi_test(suite, group_path, &test_path[..i]))?;
    }
    node = get_or_insert_subtree(
        node,
        Query::multi_case(suite, group_path, test_path, CaseParams::new()),
    )?;

    let entries: Vec<(&String, &_)> = case.id.params.iter().collect();
    for i in 1..entries.len() {
        let prefix: CaseParams = entries[..i]
            .iter()
            .map(|(k, v)| ((*k).clone(), (*v).clone()))
            .collect();
        let query = Query::multi_case(suite, group_path, test_path, prefix);
        node = get_or_insert_subtree(node, query)?;
    }

    let query = case.query(suite, group_path);
    let key = query.to_string();
    if node.children.contains_key(&key) {
        return Err(Error::StructuralMismatch(format!("duplicate case {}", key)));
    }
    node.children.insert(key, TreeNode::Leaf(Leaf { query, run_case: case }));
    Ok(())
}

/// Whether a case of a matching spec file falls under `query`.
fn case_matches(query: &Query, case: &RunCase) -> bool {
    let Some(query_test) = &query.test_path else {
        return true;
    };
    match compare_paths(&case.id.test_path, query_test) {
        Ordering::Unordered | Ordering::Superset => return false,
        Ordering::Subset if query.params.is_some() => return false,
        Ordering::Subset | Ordering::Equal => {}
    }

    let Some(query_params) = &query.params else {
        return true;
    };
    match compare_public_params_paths(&case.id.params, query_params) {
        Ordering::Unordered | Ordering::Superset => false,
        Ordering::Subset => query.ends_with_wildcard,
        Ordering::Equal => true,
    }
}

/// Build the result tree of every case `query` selects.
///
/// Fails with `StructuralMismatch` when nothing matches; loader errors are
/// passed through unchanged.
pub async fn load_tree_for_query(loader: &dyn SpecLoader, query: &Query) -> Result<ResultTree> {
    let suite = query.suite.as_str();
    tracing::debug!(target: "casetree::tree", query = %query, "Building tree");

    let mut root = Subtree::new(Query::multi_file(suite, Vec::<String>::new()));
    let mut case_count = 0usize;

    for entry in loader.listing(suite).await? {
        let ordering = compare_paths(&entry.path, &query.group_path);
        match ordering {
            Ordering::Unordered => continue,
            Ordering::Subset if query.test_path.is_some() => continue,
            _ => {}
        }

        if let Some(readme) = &entry.readme {
            // under a test-level query only directories above the file get a node
            if query.test_path.is_none() || ordering == Ordering::Superset {
                let dir = subtree_for_dir(&mut root, suite, &entry.path)?;
                dir.description = Some(readme.trim().to_string());
            }
            continue;
        }
        if ordering == Ordering::Superset {
            // a file above the queried directory
            continue;
        }

        let spec = loader.import_spec_file(suite, &entry.path).await?;
        let file = subtree_for_file(&mut root, suite, &entry.path)?;
        let description = spec.description().trim();
        if !description.is_empty() {
            file.description = Some(description.to_string());
        }

        let before = case_count;
        for case in spec.group().iterate()? {
            if !case_matches(query, &case) {
                continue;
            }
            insert_case(file, suite, &entry.path, case)?;
            case_count += 1;
        }
        tracing::debug!(
            target: "casetree::tree",
            spec = %Query::multi_test(suite, &entry.path, Vec::<String>::new()),
            cases = case_count - before,
            "Loaded spec file"
        );
    }

    if case_count == 0 {
        tracing::warn!(target: "casetree::tree", query = %query, "Query matched no cases");
        return Err(Error::StructuralMismatch(format!(
            "query {} matches no cases",
            query
        )));
    }

    tracing::debug!(target: "casetree::tree", query = %query, cases = case_count, "Built tree");
    Ok(ResultTree {
        query: query.clone(),
        root,
    })
}

/// Parse `text` and build its tree.
pub async fn resolve(loader: &dyn SpecLoader, text: &str) -> Result<ResultTree> {
    let query = parse_query(text)?;
    load_tree_for_query(loader, &query).await
}

#[cfg(test)]
mod tests;
