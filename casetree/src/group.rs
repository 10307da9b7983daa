//! Test registration and runnable cases.
//!
//! A spec file builds one [`TestGroup`]. Each test has a name path, an
//! optional parameterization and a body; registration validates names and
//! case identity up front so that tree building only ever sees valid cases.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::expectations::{expectation_kinds, Expectation, ExpectationKind};
use crate::params::{
    check_duplicate_cases, extract_public_params, validate_name_part, validate_public_params,
    CaseParams, ParamValue, ParamsBuilder,
};
use crate::query::{Query, PATH_SEPARATOR};
use crate::recorder::{CaseRecorder, CaseResult, Status};
use crate::{Error, Result};

/// Why a test body stopped early.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaseError {
    #[error("skipped: {0}")]
    Skip(String),
    #[error("{0}")]
    Threw(String),
}

/// What a test body returns.
pub type CaseOutcome = std::result::Result<(), CaseError>;

/// A test body.
pub type TestFn = Arc<dyn Fn(&mut CaseContext<'_>) -> CaseOutcome + Send + Sync>;

/// Handed to a test body: its params and a way to log.
pub struct CaseContext<'a> {
    params: &'a CaseParams,
    recorder: &'a mut CaseRecorder,
}

impl<'a> CaseContext<'a> {
    pub fn new(params: &'a CaseParams, recorder: &'a mut CaseRecorder) -> Self {
        Self { params, recorder }
    }

    /// All params of the case, private ones included.
    pub fn params(&self) -> &CaseParams {
        self.params
    }

    /// One param, or an exception if the case lacks it.
    pub fn param(&self, key: &str) -> std::result::Result<&ParamValue, CaseError> {
        self.params
            .get(key)
            .ok_or_else(|| CaseError::Threw(format!("case has no param `{}`", key)))
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.recorder.debug(message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.recorder.info(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.recorder.warn(message);
    }

    /// Record a failure and keep going.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.recorder.expectation_failed(message);
    }

    /// Record a failure unless `condition` holds. Returns `condition`.
    pub fn expect(&mut self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.recorder.expectation_failed(message);
        }
        condition
    }

    /// Stop the case as skipped: `return t.skip("reason")`.
    pub fn skip(&self, message: impl Into<String>) -> CaseOutcome {
        Err(CaseError::Skip(message.into()))
    }
}

/// Identity of a case within its spec file.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseId {
    pub test_path: Vec<String>,
    /// Public params only.
    pub params: CaseParams,
}

/// A registered test before it is expanded into cases.
pub struct TestBuilder {
    test_path: Vec<String>,
    description: Option<String>,
    cases: Vec<CaseParams>,
    parameterized: bool,
    test_fn: Option<TestFn>,
}

impl TestBuilder {
    fn new(test_path: Vec<String>) -> Self {
        Self {
            test_path,
            description: None,
            cases: vec![CaseParams::new()],
            parameterized: false,
            test_fn: None,
        }
    }

    pub fn name(&self) -> String {
        self.test_path.join(&PATH_SEPARATOR.to_string())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn desc(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Parameterize the test. Every case is validated here, once.
    pub fn params(&mut self, builder: ParamsBuilder) -> Result<&mut Self> {
        if self.parameterized {
            return Err(Error::AlreadyParameterized(self.name()));
        }
        let cases = builder.collect_cases()?;
        for case in &cases {
            validate_public_params(case)?;
        }
        check_duplicate_cases(&cases)?;
        self.cases = cases;
        self.parameterized = true;
        Ok(self)
    }

    pub fn run<F>(&mut self, test_fn: F) -> &mut Self
    where
        F: Fn(&mut CaseContext<'_>) -> CaseOutcome + Send + Sync + 'static,
    {
        self.test_fn = Some(Arc::new(test_fn));
        self
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }
}

/// The tests of one spec file.
#[derive(Default)]
pub struct TestGroup {
    tests: Vec<TestBuilder>,
}

impl fmt::Debug for TestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tests.iter().map(TestBuilder::name))
            .finish()
    }
}

impl TestGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test. `name` may have several comma-separated segments.
    pub fn test(&mut self, name: &str) -> Result<&mut TestBuilder> {
        let test_path = name
            .split(PATH_SEPARATOR)
            .map(validate_name_part)
            .collect::<Result<Vec<_>>>()?;
        if self.tests.iter().any(|t| t.test_path == test_path) {
            return Err(Error::InvalidName(format!("duplicate test name `{}`", name)));
        }
        self.tests.push(TestBuilder::new(test_path));
        let index = self.tests.len() - 1;
        Ok(&mut self.tests[index])
    }

    /// Check that every test has a body.
    pub fn validate(&self) -> Result<()> {
        self.iterate().map(|_| ())
    }

    pub fn tests(&self) -> impl Iterator<Item = &TestBuilder> {
        self.tests.iter()
    }

    /// Every case of every test, in registration order. Restartable.
    ///
    /// Fails with `MissingTestFn` if any test has no body.
    pub fn iterate(&self) -> Result<impl Iterator<Item = RunCase> + '_> {
        let tests = self
            .tests
            .iter()
            .map(|test| match &test.test_fn {
                Some(test_fn) => Ok((test, Arc::clone(test_fn))),
                None => Err(Error::MissingTestFn(test.name())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(tests.into_iter().flat_map(|(test, test_fn)| {
            test.cases.iter().map(move |params| RunCase {
                id: CaseId {
                    test_path: test.test_path.clone(),
                    params: extract_public_params(params),
                },
                params: params.clone(),
                test_fn: Arc::clone(&test_fn),
            })
        }))
    }
}

/// One runnable case.
#[derive(Clone)]
pub struct RunCase {
    pub id: CaseId,
    params: CaseParams,
    test_fn: TestFn,
}

impl fmt::Debug for RunCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCase")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test panicked".to_string()
    }
}

impl RunCase {
    /// All params, private ones included.
    pub fn params(&self) -> &CaseParams {
        &self.params
    }

    /// The single-case query of this case inside the given spec file.
    pub fn query(&self, suite: &str, group_path: &[String]) -> Query {
        Query::single_case(
            suite,
            group_path,
            &self.id.test_path,
            self.id.params.clone(),
        )
    }

    /// Run the case addressed by `query` and leave its logs in `recorder`.
    ///
    /// A `skip` expectation skips the body. A `fail` expectation turns a
    /// failure into a pass and a pass into a failure.
    pub fn run(&self, query: &Query, recorder: &mut CaseRecorder, expectations: &[Expectation]) {
        let kinds = expectation_kinds(expectations, query);
        recorder.start();

        if kinds.contains(&ExpectationKind::Skip) {
            recorder.skipped("skipped by expectations");
            return;
        }

        recorder.debug(format!("running {}", query));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = CaseContext::new(&self.params, recorder);
            (self.test_fn)(&mut ctx)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(CaseError::Skip(message))) => recorder.skipped(message),
            Ok(Err(CaseError::Threw(message))) => recorder.threw(message),
            Err(payload) => recorder.threw(panic_message(payload)),
        }

        if kinds.contains(&ExpectationKind::Fail) {
            match recorder.status() {
                Status::Fail => recorder.expected_failure("failure was expected"),
                Status::Skip => {}
                Status::Pass | Status::Warn => {
                    recorder.expectation_failed("expected to fail, but passed")
                }
            }
        }
    }

    /// Record a result produced outside this process.
    pub fn inject_result(&self, recorder: &mut CaseRecorder, result: CaseResult) {
        recorder.inject(result);
    }
}
