//! `unittests`: the framework checking itself through its own runner.

use casetree::params::{check_duplicate_cases, validate_name_part};
use casetree::query::{compare_queries, Ordering};
use casetree::{
    case_params, params, pbool, poptions, CaseContext, CaseError, CaseOutcome, CaseParams,
    ParamValue, SpecFile, StaticLoader, TestGroup,
};

const SUITE: &str = "unittests";

const ROUND_TRIP: &[&str] = &[
    "webgpu:*",
    "webgpu:api,*",
    "webgpu:api,operation:*",
    "webgpu:api,operation:buffers,*",
    "webgpu:api,operation:buffers:*",
    "webgpu:api:t:size=4;*",
    "webgpu:api:t:size=4;mapped=true",
    r#"webgpu:a:b:format="rgba8unorm";layers=[1,6]"#,
    "webgpu:a:b:",
];

const MALFORMED: &[&str] = &[
    "webgpu",
    "webgpu:",
    "webgpu:api",
    "webgpu:api:",
    "webgpu:api:t",
    "webgpu:a,*:*",
    "webgpu:a:t:x=1;x=2",
    "webgpu:a:t:_p=1",
];

/// Each query is a superset of the next.
const CHAIN: &[&str] = &[
    "s:*",
    "s:a,*",
    "s:a:*",
    "s:a:t,*",
    "s:a:t:*",
    "s:a:t:x=1;*",
    "s:a:t:x=1",
];

fn index_param(t: &CaseContext<'_>, key: &str) -> Result<usize, CaseError> {
    t.param(key)?
        .as_f64()
        .filter(|n| *n >= 0.0)
        .map(|n| n as usize)
        .ok_or_else(|| CaseError::Threw(format!("`{}` is not an index", key)))
}

fn pick<'a>(list: &[&'a str], index: usize) -> Result<&'a str, CaseError> {
    list.get(index)
        .copied()
        .ok_or_else(|| CaseError::Threw(format!("no entry #{}", index)))
}

fn indices(list: &[&str]) -> std::ops::Range<u32> {
    0..list.len() as u32
}

fn number(t: &CaseContext<'_>, key: &str) -> Result<f64, CaseError> {
    t.param(key)?
        .as_f64()
        .ok_or_else(|| CaseError::Threw(format!("`{}` is not a number", key)))
}

fn query_spec() -> casetree::Result<SpecFile> {
    let mut g = TestGroup::new();

    g.test("round_trip")?
        .desc("parse then stringify gives back the input")
        .params(poptions("case", indices(ROUND_TRIP)))?
        .run(|t| {
            let text = pick(ROUND_TRIP, index_param(t, "case")?)?;
            match casetree::parse_query(text) {
                Ok(q) => {
                    t.expect(q.to_string() == text, format!("{} printed as {}", text, q));
                }
                Err(e) => t.fail(e.to_string()),
            }
            Ok(())
        });

    g.test("malformed")?
        .desc("malformed queries are rejected")
        .params(poptions("case", indices(MALFORMED)))?
        .run(|t| {
            let text = pick(MALFORMED, index_param(t, "case")?)?;
            let parsed = casetree::parse_query(text);
            t.debug(format!("{} -> {:?}", text, parsed));
            t.expect(parsed.is_err(), format!("{} was accepted", text));
            Ok(())
        });

    g.test("ordering,chain")?
        .desc("each query in the chain is a superset of the next")
        .params(poptions("step", 0..CHAIN.len() as u32 - 1))?
        .run(|t| {
            let step = index_param(t, "step")?;
            let parse = |s: &str| {
                casetree::parse_query(s).map_err(|e| CaseError::Threw(e.to_string()))
            };
            let broad = parse(pick(CHAIN, step)?)?;
            let narrow = parse(pick(CHAIN, step + 1)?)?;
            let forward = compare_queries(&broad, &narrow);
            let backward = compare_queries(&narrow, &broad);
            t.expect(
                forward == Ordering::Superset,
                format!("{} vs {}: {:?}", broad, narrow, forward),
            );
            t.expect(backward == forward.reverse(), "ordering is not antisymmetric");
            Ok(())
        });

    g.test("ordering,self")?
        .params(poptions("step", indices(CHAIN)))?
        .run(|t| {
            let text = pick(CHAIN, index_param(t, "step")?)?;
            let q = casetree::parse_query(text).map_err(|e| CaseError::Threw(e.to_string()))?;
            t.expect(
                compare_queries(&q, &q) == Ordering::Equal,
                format!("{} is not equal to itself", text),
            );
            Ok(())
        });

    SpecFile::new("Query parsing, stringification and ordering.", g)
}

fn builder_spec() -> casetree::Result<SpecFile> {
    let mut g = TestGroup::new();

    g.test("combine")?.run(|t| {
        let b = params()
            .combine(poptions("a", [1, 2]))
            .combine(poptions("b", [3, 4]));
        let expected = vec![
            case_params! { "a" => 1, "b" => 3 },
            case_params! { "a" => 1, "b" => 4 },
            case_params! { "a" => 2, "b" => 3 },
            case_params! { "a" => 2, "b" => 4 },
        ];
        for pass in 0..2 {
            match b.collect_cases() {
                Ok(cases) => {
                    t.expect(cases == expected, format!("pass {} gave {:?}", pass, cases));
                }
                Err(e) => t.fail(e.to_string()),
            }
        }
        Ok(())
    });

    g.test("filtered")?
        .desc("only even x reach the body")
        .params(poptions("x", [1, 2, 3, 4, 5, 6]).unless(|c| {
            c.get("x").and_then(ParamValue::as_f64).map_or(true, |x| x as i64 % 2 == 1)
        }))?
        .run(|t| {
            let x = number(t, "x")?;
            t.expect(x as i64 % 2 == 0, format!("{} is odd", x));
            Ok(())
        });

    g.test("dependent")?
        .params(
            poptions("n", [1, 2, 3])
                .expand_options("i", |c| {
                    let n = c.get("n").and_then(ParamValue::as_f64).unwrap_or(0.0) as i32;
                    (0..n).collect::<Vec<_>>()
                })
                .combine(pbool("flag")),
        )?
        .run(|t| {
            let n = number(t, "n")?;
            let i = number(t, "i")?;
            t.expect(i < n, format!("i = {} is not below n = {}", i, n));
            Ok(())
        });

    g.test("private")?
        .params(params().combine_options("x", [1, 2]).combine_options("_seed", [7]))?
        .run(|t| {
            let seed = number(t, "_seed")?;
            t.expect(seed == 7.0, "private param did not reach the body");
            Ok(())
        });

    SpecFile::new("Parameter case generation.", g)
}

fn identity_spec() -> casetree::Result<SpecFile> {
    let mut g = TestGroup::new();

    g.test("names")?
        .params(poptions("name", ["a b", "a_b", "abc123"]))?
        .run(|t| {
            let name = t.param("name")?.as_str().unwrap_or_default().to_string();
            match validate_name_part(&name) {
                Ok(valid) => {
                    t.expect(!valid.contains(' '), format!("{} kept a space", valid));
                }
                Err(e) => t.fail(e.to_string()),
            }
            Ok(())
        });

    g.test("bad_names")?.run(|t| {
        for name in ["a*b", "a,b", "", "a%20b", "a-b"] {
            t.expect(validate_name_part(name).is_err(), format!("`{}` was accepted", name));
        }
        Ok(())
    });

    g.test("duplicates")?.run(|t| {
        let same: Vec<CaseParams> = vec![
            case_params! { "a" => 1, "_p" => 1 },
            case_params! { "a" => 1, "_p" => 2 },
        ];
        t.expect(
            check_duplicate_cases(&same).is_err(),
            "cases differing only in private params were accepted",
        );
        let distinct: Vec<CaseParams> = vec![
            case_params! { "a" => 1, "b" => ParamValue::Undefined },
            case_params! { "a" => 1, "b" => 2 },
        ];
        t.expect(check_duplicate_cases(&distinct).is_ok(), "distinct cases were rejected");
        Ok(())
    });

    SpecFile::new("Case identity and validation.", g)
}

fn skip_spec() -> casetree::Result<SpecFile> {
    let mut g = TestGroup::new();
    g.test("unsupported")?
        .desc("always skipped")
        .run(|t| -> CaseOutcome { t.skip("demonstrates a skipped case") });
    SpecFile::new("Skip handling.", g)
}

pub fn register(loader: &mut StaticLoader) {
    loader
        .readme(SUITE, &[], "Self-tests of the case framework.")
        .spec(SUITE, &["query"], query_spec)
        .readme(SUITE, &["params"], "Parameters: generation and identity.")
        .spec(SUITE, &["params", "builder"], builder_spec)
        .spec(SUITE, &["params", "identity"], identity_spec)
        .spec(SUITE, &["skip"], skip_spec);
}
