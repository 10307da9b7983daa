//! Lazy, re-iterable combinatorial case generation.
//!
//! Every stage wraps the previous stage's producer function, never its output,
//! so a builder can be iterated any number of times with identical results.

use std::fmt;
use std::iter;
use std::sync::Arc;

use crate::{Error, Result};

use super::{public_params_equals, CaseParams, ParamValue};

/// A fresh pass over the cases of a builder.
pub type CaseIter = Box<dyn Iterator<Item = Result<CaseParams>> + Send>;

type Producer = Arc<dyn Fn() -> CaseIter + Send + Sync>;

/// Composable generator of parameter cases.
#[derive(Clone)]
pub struct ParamsBuilder {
    producer: Producer,
}

impl fmt::Debug for ParamsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamsBuilder").finish_non_exhaustive()
    }
}

/// A builder yielding a single empty case.
pub fn params() -> ParamsBuilder {
    ParamsBuilder::from_cases(vec![CaseParams::new()])
}

/// One case `{name: value}` per value.
pub fn poptions<V, I>(name: &str, values: I) -> ParamsBuilder
where
    V: Into<ParamValue>,
    I: IntoIterator<Item = V>,
{
    let cases = values
        .into_iter()
        .map(|value| single(name, value.into()))
        .collect();
    ParamsBuilder::from_cases(cases)
}

/// `{name: false}`, `{name: true}`
pub fn pbool(name: &str) -> ParamsBuilder {
    poptions(name, [false, true])
}

fn single(name: &str, value: ParamValue) -> CaseParams {
    let mut case = CaseParams::new();
    case.insert(name.to_string(), value);
    case
}

fn merge_params(a: &CaseParams, b: CaseParams) -> Result<CaseParams> {
    if let Some(key) = b.keys().find(|k| a.contains_key(*k)) {
        return Err(Error::DuplicateKey(key.clone()));
    }
    let mut merged = a.clone();
    merged.extend(b);
    Ok(merged)
}

impl ParamsBuilder {
    /// Wrap a function that starts a new pass each time it is called.
    pub fn from_producer<F>(producer: F) -> Self
    where
        F: Fn() -> CaseIter + Send + Sync + 'static,
    {
        Self {
            producer: Arc::new(producer),
        }
    }

    /// A builder over a fixed list of cases.
    pub fn from_cases(cases: Vec<CaseParams>) -> Self {
        let cases = Arc::new(cases);
        Self::from_producer(move || {
            let cases = Arc::clone(&cases);
            Box::new((0..cases.len()).map(move |i| Ok(cases[i].clone())))
        })
    }

    /// Start a new pass over the cases.
    pub fn iter(&self) -> CaseIter {
        (self.producer)()
    }

    /// Cartesian product with `dimension`; keys must not overlap.
    pub fn combine(self, dimension: ParamsBuilder) -> Self {
        let outer = self.producer;
        let inner = dimension.producer;
        Self::from_producer(move || {
            let inner = Arc::clone(&inner);
            Box::new(outer().flat_map(move |a| -> CaseIter {
                match a {
                    Ok(a) => Box::new(inner().map(move |b| merge_params(&a, b?))),
                    Err(e) => Box::new(iter::once(Err(e))),
                }
            }))
        })
    }

    /// Shorthand for `combine(poptions(name, values))`.
    pub fn combine_options<V, I>(self, name: &str, values: I) -> Self
    where
        V: Into<ParamValue>,
        I: IntoIterator<Item = V>,
    {
        self.combine(poptions(name, values))
    }

    /// For each case, merge in every case produced from it by `expander`.
    pub fn expand<F, I>(self, expander: F) -> Self
    where
        F: Fn(&CaseParams) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = CaseParams>,
        I::IntoIter: Send + 'static,
    {
        let prev = self.producer;
        let expander = Arc::new(expander);
        Self::from_producer(move || {
            let expander = Arc::clone(&expander);
            Box::new(prev().flat_map(move |a| -> CaseIter {
                match a {
                    Ok(a) => {
                        let expanded = expander(&a).into_iter();
                        Box::new(expanded.map(move |b| merge_params(&a, b)))
                    }
                    Err(e) => Box::new(iter::once(Err(e))),
                }
            }))
        })
    }

    /// Add a param `name` whose values depend on the rest of the case.
    pub fn expand_options<F, V>(self, name: &str, values: F) -> Self
    where
        F: Fn(&CaseParams) -> Vec<V> + Send + Sync + 'static,
        V: Into<ParamValue>,
    {
        let name = name.to_string();
        self.expand(move |case| {
            values(case)
                .into_iter()
                .map(|value| single(&name, value.into()))
                .collect::<Vec<_>>()
        })
    }

    /// Keep the cases matching `pred`.
    pub fn filter<P>(self, pred: P) -> Self
    where
        P: Fn(&CaseParams) -> bool + Send + Sync + 'static,
    {
        let prev = self.producer;
        let pred = Arc::new(pred);
        Self::from_producer(move || {
            let pred = Arc::clone(&pred);
            Box::new(prev().filter(move |case| match case {
                Ok(case) => pred(case),
                Err(_) => true,
            }))
        })
    }

    /// Drop the cases matching `pred`.
    pub fn unless<P>(self, pred: P) -> Self
    where
        P: Fn(&CaseParams) -> bool + Send + Sync + 'static,
    {
        self.filter(move |case| !pred(case))
    }

    /// Drop every case whose public params equal a case of `excluded`.
    pub fn exclude(self, excluded: ParamsBuilder) -> Self {
        let prev = self.producer;
        let excluded = excluded.producer;
        Self::from_producer(move || -> CaseIter {
            let excluded = match excluded().collect::<Result<Vec<_>>>() {
                Ok(excluded) => excluded,
                Err(e) => return Box::new(iter::once(Err(e))),
            };
            Box::new(prev().filter(move |case| match case {
                Ok(case) => !excluded.iter().any(|e| public_params_equals(case, e)),
                Err(_) => true,
            }))
        })
    }

    /// Materialize every case, failing on the first error.
    pub fn collect_cases(&self) -> Result<Vec<CaseParams>> {
        self.iter().collect()
    }

    pub fn count(&self) -> Result<usize> {
        self.iter().try_fold(0, |n, case| case.map(|_| n + 1))
    }
}

impl From<Vec<CaseParams>> for ParamsBuilder {
    fn from(cases: Vec<CaseParams>) -> Self {
        Self::from_cases(cases)
    }
}

impl<'a> IntoIterator for &'a ParamsBuilder {
    type Item = Result<CaseParams>;
    type IntoIter = CaseIter;

    fn into_iter(self) -> CaseIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_params;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cases(b: &ParamsBuilder) -> Vec<CaseParams> {
        b.collect_cases().unwrap()
    }

    #[test]
    fn test_params_is_single_empty_case() {
        assert_eq!(cases(&params()), vec![CaseParams::new()]);
    }

    #[test]
    fn test_combine_order() {
        let b = params()
            .combine(poptions("a", [1, 2]))
            .combine(poptions("b", [3, 4]));
        let expected = vec![
            case_params! { "a" => 1, "b" => 3 },
            case_params! { "a" => 1, "b" => 4 },
            case_params! { "a" => 2, "b" => 3 },
            case_params! { "a" => 2, "b" => 4 },
        ];
        assert_eq!(cases(&b), expected);
        // and again
        assert_eq!(cases(&b), expected);
    }

    #[test]
    fn test_combine_key_order_in_case() {
        let b = params().combine_options("z", [1]).combine_options("a", [2]);
        let case = &cases(&b)[0];
        let keys: Vec<&str> = case.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_combine_duplicate_key() {
        let b = poptions("a", [1]).combine(poptions("a", [2]));
        match b.collect_cases() {
            Err(Error::DuplicateKey(k)) => assert_eq!(k, "a"),
            other => panic!("expected DuplicateKey, got {:?}", other),
        }
    }

    #[test]
    fn test_combine_with_empty_dimension() {
        let b = poptions("a", [1, 2]).combine(poptions("b", Vec::<i32>::new()));
        assert_eq!(b.count().unwrap(), 0);
    }

    #[test]
    fn test_pbool() {
        assert_eq!(
            cases(&pbool("flag")),
            vec![case_params! { "flag" => false }, case_params! { "flag" => true }]
        );
    }

    #[test]
    fn test_expand_depends_on_case() {
        let b = poptions("n", [1, 3]).expand_options("i", |case| {
            let n = case["n"].as_f64().unwrap() as i32;
            (0..n).collect::<Vec<_>>()
        });
        let got = cases(&b);
        assert_eq!(got.len(), 4);
        assert_eq!(got[0], case_params! { "n" => 1, "i" => 0 });
        assert_eq!(got[3], case_params! { "n" => 3, "i" => 2 });
    }

    #[test]
    fn test_expand_duplicate_key() {
        let b = poptions("n", [1]).expand(|_| vec![case_params! { "n" => 2 }]);
        assert!(matches!(b.collect_cases(), Err(Error::DuplicateKey(_))));
    }

    #[test]
    fn test_filter_and_unless() {
        let base = poptions("x", [1, 2, 3, 4]);
        let even = base.clone().filter(|c| c["x"].as_f64().unwrap() as i32 % 2 == 0);
        let odd = base.unless(|c| c["x"].as_f64().unwrap() as i32 % 2 == 0);
        assert_eq!(
            cases(&even),
            vec![case_params! { "x" => 2 }, case_params! { "x" => 4 }]
        );
        assert_eq!(
            cases(&odd),
            vec![case_params! { "x" => 1 }, case_params! { "x" => 3 }]
        );
    }

    #[test]
    fn test_exclude_uses_public_projection() {
        let b = params()
            .combine_options("a", [1, 2])
            .combine_options("_seed", [7])
            .exclude(ParamsBuilder::from_cases(vec![case_params! { "a" => 1 }]));
        assert_eq!(cases(&b), vec![case_params! { "a" => 2, "_seed" => 7 }]);
    }

    #[test]
    fn test_exclude_treats_absent_as_undefined() {
        let b = ParamsBuilder::from_cases(vec![
            case_params! { "a" => 1, "b" => ParamValue::Undefined },
            case_params! { "a" => 2 },
        ])
        .exclude(ParamsBuilder::from_cases(vec![case_params! { "a" => 1 }]));
        assert_eq!(cases(&b), vec![case_params! { "a" => 2 }]);
    }

    #[test]
    fn test_stages_are_lazy_and_reiterable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = ParamsBuilder::from_producer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new((0..3).map(|i| Ok(case_params! { "i" => i })))
        });

        let b = params()
            .combine(source)
            .filter(|c| c["i"] != ParamValue::from(1))
            .exclude(ParamsBuilder::from_cases(vec![]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(b.count().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Independent passes do not share progress.
        let mut first = b.iter();
        let mut second = b.iter();
        assert_eq!(first.next().unwrap().unwrap(), case_params! { "i" => 0 });
        assert_eq!(second.next().unwrap().unwrap(), case_params! { "i" => 0 });
        assert_eq!(first.next().unwrap().unwrap(), case_params! { "i" => 2 });
        assert!(first.next().is_none());
        assert_eq!(second.next().unwrap().unwrap(), case_params! { "i" => 2 });
    }

    #[test]
    fn test_iterate_by_reference() {
        let b = poptions("a", ["x", "y"]);
        let mut seen = Vec::new();
        for case in &b {
            seen.push(case.unwrap()["a"].clone());
        }
        assert_eq!(seen, vec![ParamValue::from("x"), ParamValue::from("y")]);
    }
}
