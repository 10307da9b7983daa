//! Partial ordering of paths, params and whole queries.

use std::cmp::Ordering as CmpOrdering;

use crate::params::{param_key_is_public, CaseParams, ParamValue};

use super::Query;

/// How two selectors relate. `Superset` means the left side is broader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Unordered,
    Superset,
    Equal,
    Subset,
}

impl Ordering {
    /// The ordering seen from the other side.
    pub fn reverse(self) -> Self {
        match self {
            Ordering::Superset => Ordering::Subset,
            Ordering::Subset => Ordering::Superset,
            other => other,
        }
    }

    /// True for `Equal` and `Superset`.
    pub fn covers(self) -> bool {
        matches!(self, Ordering::Equal | Ordering::Superset)
    }
}

/// Compare two sequences element-wise up to the shorter length.
///
/// A proper prefix is a `Superset` of the longer sequence.
pub fn compare_sequences<T, F>(a: &[T], b: &[T], eq: F) -> Ordering
where
    F: Fn(&T, &T) -> bool,
{
    if !a.iter().zip(b).all(|(x, y)| eq(x, y)) {
        return Ordering::Unordered;
    }
    match a.len().cmp(&b.len()) {
        CmpOrdering::Equal => Ordering::Equal,
        CmpOrdering::Less => Ordering::Superset,
        CmpOrdering::Greater => Ordering::Subset,
    }
}

pub fn compare_paths(a: &[String], b: &[String]) -> Ordering {
    compare_sequences(a, b, |x, y| x == y)
}

fn public_entries(params: &CaseParams) -> Vec<(&str, &ParamValue)> {
    params
        .iter()
        .filter(|(k, _)| param_key_is_public(k))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// Compare the ordered `(key, value)` projections of the public params.
pub fn compare_public_params_paths(a: &CaseParams, b: &CaseParams) -> Ordering {
    compare_sequences(&public_entries(a), &public_entries(b), |x, y| x == y)
}

/// Compare two whole queries, level by level.
///
/// A query is "big" at a level when it stops there (e.g. `s:a,*` is big at
/// the group level, `s:a:*` is not), so `s:a,*` covers `s:a:*` which covers
/// `s:a:t:*` which covers `s:a:t:x=1`.
pub fn compare_queries(a: &Query, b: &Query) -> Ordering {
    if a.suite != b.suite {
        return Ordering::Unordered;
    }

    let group = compare_paths(&a.group_path, &b.group_path);
    if let Some(ordering) = compare_level(group, a.test_path.is_none(), b.test_path.is_none()) {
        return ordering;
    }
    let (Some(a_test), Some(b_test)) = (&a.test_path, &b.test_path) else {
        return Ordering::Unordered;
    };

    let test = compare_paths(a_test, b_test);
    if let Some(ordering) = compare_level(test, a.params.is_none(), b.params.is_none()) {
        return ordering;
    }
    let (Some(a_params), Some(b_params)) = (&a.params, &b.params) else {
        return Ordering::Unordered;
    };

    let params = compare_public_params_paths(a_params, b_params);
    compare_level(params, a.ends_with_wildcard, b.ends_with_wildcard).unwrap_or(Ordering::Equal)
}

/// Decide one level, or `None` if both sides continue to the next level.
fn compare_level(ordering: Ordering, a_big: bool, b_big: bool) -> Option<Ordering> {
    if !a_big && !b_big {
        return match ordering {
            Ordering::Equal => None,
            _ => Some(Ordering::Unordered),
        };
    }
    let decided = match ordering {
        Ordering::Unordered => Ordering::Unordered,
        Ordering::Superset if a_big || !b_big => Ordering::Superset,
        Ordering::Subset if !a_big || b_big => Ordering::Subset,
        Ordering::Superset | Ordering::Subset => Ordering::Unordered,
        Ordering::Equal => match (a_big, b_big) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Superset,
            _ => Ordering::Subset,
        },
    };
    Some(decided)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_params;
    use crate::query::parse_query;
    use proptest::prelude::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn cmp(a: &str, b: &str) -> Ordering {
        compare_queries(&parse_query(a).unwrap(), &parse_query(b).unwrap())
    }

    #[test]
    fn test_compare_paths() {
        assert_eq!(compare_paths(&path(&["a"]), &path(&["a"])), Ordering::Equal);
        assert_eq!(compare_paths(&path(&["a"]), &path(&["a", "b"])), Ordering::Superset);
        assert_eq!(compare_paths(&path(&["a", "b"]), &path(&["a"])), Ordering::Subset);
        assert_eq!(compare_paths(&path(&["a", "c"]), &path(&["a", "b"])), Ordering::Unordered);
        assert_eq!(compare_paths(&path(&[]), &path(&["a"])), Ordering::Superset);
        assert_eq!(compare_paths(&path(&[]), &path(&[])), Ordering::Equal);
    }

    #[test]
    fn test_compare_params_ignores_private() {
        let a = case_params! { "x" => 1, "_hidden" => 2 };
        let b = case_params! { "x" => 1, "y" => "z" };
        assert_eq!(compare_public_params_paths(&a, &b), Ordering::Superset);
    }

    #[test]
    fn test_compare_params_is_ordered() {
        let a = case_params! { "a" => 1, "b" => 2 };
        let b = case_params! { "b" => 2, "a" => 1 };
        assert_eq!(compare_public_params_paths(&a, &b), Ordering::Unordered);
    }

    #[test]
    fn test_compare_params_value_mismatch() {
        let a = case_params! { "a" => vec![1, 2] };
        let b = case_params! { "a" => vec![1, 3], "b" => true };
        assert_eq!(compare_public_params_paths(&a, &b), Ordering::Unordered);
    }

    #[test]
    fn test_compare_queries_chain() {
        let chain = ["s:*", "s:a,*", "s:a:*", "s:a:t,*", "s:a:t:*", "s:a:t:x=1;*", "s:a:t:x=1"];
        for pair in chain.windows(2) {
            assert_eq!(cmp(pair[0], pair[1]), Ordering::Superset, "{} vs {}", pair[0], pair[1]);
            assert_eq!(cmp(pair[1], pair[0]), Ordering::Subset, "{} vs {}", pair[1], pair[0]);
        }
        for q in chain {
            assert_eq!(cmp(q, q), Ordering::Equal);
        }
    }

    #[test]
    fn test_compare_queries_unordered() {
        assert_eq!(cmp("s:a,*", "t:a,*"), Ordering::Unordered);
        assert_eq!(cmp("s:a,*", "s:b,*"), Ordering::Unordered);
        // a file is not a directory of the same name
        assert_eq!(cmp("s:a:*", "s:a,b,*"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:*", "s:a:t,u,*"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:x=1", "s:a:t:x=1;y=2"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:x=1", "s:a:t:x=2"), Ordering::Unordered);
    }

    #[test]
    fn test_compare_queries_deep_subset() {
        assert_eq!(cmp("s:a,*", "s:a,b:t:x=1"), Ordering::Superset);
        assert_eq!(cmp("s:a:t:x=1;y=2", "s:a:t:x=1;*"), Ordering::Subset);
    }

    #[test]
    fn test_reverse() {
        assert_eq!(Ordering::Superset.reverse(), Ordering::Subset);
        assert_eq!(Ordering::Subset.reverse(), Ordering::Superset);
        assert_eq!(Ordering::Equal.reverse(), Ordering::Equal);
        assert_eq!(Ordering::Unordered.reverse(), Ordering::Unordered);
    }

    proptest! {
        #[test]
        fn prop_compare_sequences_inverse(
            a in prop::collection::vec(0u8..3, 0..5),
            b in prop::collection::vec(0u8..3, 0..5),
        ) {
            let forward = compare_sequences(&a, &b, |x, y| x == y);
            let backward = compare_sequences(&b, &a, |x, y| x == y);
            prop_assert_eq!(forward, backward.reverse());
        }

        #[test]
        fn prop_compare_paths_reflexive(a in prop::collection::vec("[a-c]{1,2}", 0..4)) {
            prop_assert_eq!(compare_paths(&a, &a), Ordering::Equal);
        }
    }
}
