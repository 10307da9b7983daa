//! `demo`: a minimal suite with a spec file and a nested one.

use casetree::{poptions, CaseContext, CaseOutcome, SpecFile, StaticLoader, TestGroup};

const SUITE: &str = "demo";

fn spec(description: &'static str) -> casetree::Result<SpecFile> {
    let mut g = TestGroup::new();
    g.test("t")?
        .desc("checks n is one of the generated values")
        .params(poptions("n", [1, 2]))?
        .run(check_n);
    SpecFile::new(description, g)
}

fn check_n(t: &mut CaseContext<'_>) -> CaseOutcome {
    let n = t.param("n")?.as_f64();
    t.debug(format!("n = {:?}", n));
    t.expect(matches!(n, Some(v) if v == 1.0 || v == 2.0), "n out of range");
    Ok(())
}

pub fn register(loader: &mut StaticLoader) {
    loader
        .readme(SUITE, &[], "Demo suite.")
        .spec(SUITE, &["a"], || spec("Demo spec file."))
        .spec(SUITE, &["a", "b"], || spec("Nested demo spec file."));
}
