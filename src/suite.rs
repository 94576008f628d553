//! The test-run context.
//!
//! A [`Suite`] plays the part of the host test framework: it runs named,
//! isolated sub-tests, records their outcomes and owns the [`CallRegistry`]
//! that numbers assertion calls. It is created at the top of a `#[test]`
//! function and checked when it goes out of scope.
//!
//! Sub-test bodies return `Result<(), TfError>`:
//!
//! - `Ok(())` with no recorded failures passes.
//! - Failures recorded through [`SubTest::fail`] (and friends) fail the
//!   sub-test without stopping it; siblings keep running.
//! - `Err(_)` aborts the sub-test. This is the fatal path taken by
//!   configuration and coercion errors.
//! - A panic escaping the body also aborts the sub-test; it never tears down
//!   the enclosing test.
//!
//! ```rust
//! use tf::Suite;
//!
//! let suite = Suite::new("arithmetic");
//! suite.run("addition", |t| {
//!     t.check_eq(&4, &(2 + 2), "2 + 2");
//!     Ok(())
//! });
//! let report = suite.finish();
//! assert!(!report.has_failures());
//! ```

use std::{fmt, io::Write, panic::{self, AssertUnwindSafe}, sync::Mutex};

use difference::{Changeset, Difference};
use miette::Diagnostic;
use serde::Serialize;
use termcolor::{Buffer, BufferWriter, Color, ColorSpec, WriteColor};
use tracing::{debug, warn};

use crate::{config::SuiteConfig, error::{TfError, TfResult}, registry::CallRegistry, value::Value};

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    /// Stopped early by an error or a panic.
    Aborted,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Passed => write!(f, "PASS"),
            Status::Failed => write!(f, "FAIL"),
            Status::Aborted => write!(f, "ABORT"),
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: None,
            actual: None,
            code: None,
            help: None,
        }
    }

    /// Attaches the expected and actual renderings shown in the report.
    pub fn compare(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl From<TfError> for Failure {
    fn from(err: TfError) -> Self {
        Self {
            message: err.to_string(),
            expected: None,
            actual: None,
            code: err.code().map(|c| c.to_string()),
            help: err.help().map(|h| h.to_string()),
        }
    }
}

/// The result of one sub-test, including its nested sub-tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub name: String,
    pub status: Status,
    pub failures: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Outcome>,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.status == Status::Passed
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a Outcome>) {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

// ============================================================================
// SUB-TESTS
// ============================================================================

/// The handle a sub-test body receives.
pub struct SubTest {
    name: String,
    config: SuiteConfig,
    failures: Vec<Failure>,
    children: Vec<Outcome>,
}

impl SubTest {
    fn new(name: String, config: SuiteConfig) -> Self {
        Self {
            name,
            config,
            failures: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Full name, `suite/sub-test[/nested..]`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Marks the sub-test failed and keeps running.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.record(Failure::new(message));
    }

    pub fn record(&mut self, failure: Failure) {
        debug!(test = %self.name, message = %failure.message, "failure recorded");
        self.failures.push(failure);
    }

    /// Records a failure unless `condition` holds. Returns `condition`.
    pub fn check(&mut self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.fail(message);
        }
        condition
    }

    /// Records a failure with both renderings unless `expected == actual`.
    pub fn check_eq<T>(&mut self, expected: &T, actual: &T, message: impl Into<String>) -> bool
    where
        T: PartialEq + fmt::Debug + ?Sized,
    {
        if expected == actual {
            return true;
        }
        self.record(
            Failure::new(message).compare(format!("{:?}", expected), format!("{:?}", actual)),
        );
        false
    }

    /// Runs a nested sub-test. A failing child fails this sub-test too.
    pub fn run<F>(&mut self, name: &str, body: F) -> bool
    where
        F: FnOnce(&mut SubTest) -> TfResult<()>,
    {
        let outcome = execute(join_name(&self.name, name), self.config, body);
        let passed = outcome.passed();
        self.children.push(outcome);
        passed
    }

    /// Whether anything in this sub-test, including nested ones, has failed.
    pub fn failed(&self) -> bool {
        !self.failures.is_empty() || self.children.iter().any(|c| !c.passed())
    }
}

fn join_name(parent: &str, child: &str) -> String {
    let child: String = child
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}/{}", parent, child)
}

fn execute<F>(name: String, config: SuiteConfig, body: F) -> Outcome
where
    F: FnOnce(&mut SubTest) -> TfResult<()>,
{
    debug!(test = %name, "sub-test started");
    if config.verbose {
        emit(&config, |out| {
            writeln!(out, "=== RUN   {}", name)?;
            Ok(())
        });
    }

    let mut sub = SubTest::new(name, config);
    let result = panic::catch_unwind(AssertUnwindSafe(|| body(&mut sub)));
    let status = match result {
        Ok(Ok(())) if sub.failed() => Status::Failed,
        Ok(Ok(())) => Status::Passed,
        Ok(Err(err)) => {
            sub.record(Failure::from(err));
            Status::Aborted
        }
        Err(payload) => {
            sub.record(Failure::new(format!(
                "panicked: {}",
                Value::from_panic(payload)
            )));
            Status::Aborted
        }
    };

    let outcome = Outcome {
        name: sub.name,
        status,
        failures: sub.failures,
        children: sub.children,
    };
    debug!(test = %outcome.name, status = %outcome.status, "sub-test finished");

    if config.verbose || !outcome.failures.is_empty() {
        emit(&config, |out| write_outcome(out, &outcome, config.verbose));
    }
    outcome
}

// Output goes through `eprint!` so the test harness captures it.
fn emit<F>(config: &SuiteConfig, write: F)
where
    F: FnOnce(&mut Buffer) -> std::io::Result<()>,
{
    let mut buffer = BufferWriter::stderr(config.color_choice()).buffer();
    if write(&mut buffer).is_ok() {
        eprint!("{}", String::from_utf8_lossy(buffer.as_slice()));
    }
}

// ============================================================================
// SUITE
// ============================================================================

/// A test-run context owning sub-test outcomes and the naming registry.
pub struct Suite {
    name: String,
    config: SuiteConfig,
    calls: CallRegistry,
    outcomes: Mutex<Vec<Outcome>>,
    finished: bool,
}

impl Suite {
    /// Creates a suite configured from the environment (see [`SuiteConfig::from_env`]).
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, SuiteConfig::from_env())
    }

    pub fn with_config(name: impl Into<String>, config: SuiteConfig) -> Self {
        Self {
            name: name.into(),
            config,
            calls: CallRegistry::new(),
            outcomes: Mutex::new(Vec::new()),
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// The naming registry shared by every callable wrapped against this suite.
    pub fn calls(&self) -> &CallRegistry {
        &self.calls
    }

    /// Runs one top-level sub-test and returns whether it passed.
    pub fn run<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce(&mut SubTest) -> TfResult<()>,
    {
        let outcome = execute(join_name(&self.name, name), self.config, body);
        let passed = outcome.passed();
        self.outcomes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(outcome);
        passed
    }

    /// Snapshot of everything run so far.
    pub fn report(&self) -> SuiteReport {
        SuiteReport {
            suite: self.name.clone(),
            outcomes: self
                .outcomes
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }

    /// Consumes the suite without failing the enclosing test.
    pub fn finish(mut self) -> SuiteReport {
        self.finished = true;
        self.report()
    }
}

impl Drop for Suite {
    fn drop(&mut self) {
        if self.finished || std::thread::panicking() {
            return;
        }
        let report = self.report();
        if report.has_failures() {
            panic!("{}", report.render(false));
        }
    }
}

// ============================================================================
// REPORTING
// ============================================================================

/// Aggregate counts over every sub-test, nested ones included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
}

impl TestSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total_tests(&self) -> usize {
        self.passed + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_tests() == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total_tests() as f64) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub outcomes: Vec<Outcome>,
}

impl SuiteReport {
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    fn all(&self) -> Vec<&Outcome> {
        let mut out = Vec::new();
        for outcome in &self.outcomes {
            outcome.walk(&mut out);
        }
        out
    }

    /// Looks up an outcome by full name, searching nested sub-tests too.
    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.all().into_iter().find(|o| o.name == name)
    }

    pub fn summary(&self) -> TestSummary {
        let all = self.all();
        let passed = all.iter().filter(|o| o.passed()).count();
        TestSummary {
            passed,
            failed: all.len() - passed,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.passed())
    }

    /// Human-readable report: every failing sub-test with its failures,
    /// followed by the summary line.
    pub fn render(&self, colors: bool) -> String {
        let mut buffer = if colors {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        };
        // A `Buffer` writes into memory, so the only possible error is from
        // the formatter itself; whatever was written so far is still returned.
        if let Err(err) = self.write_to(&mut buffer) {
            warn!(%err, suite = %self.suite, "report rendering stopped early");
        }
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    fn write_to(&self, out: &mut Buffer) -> std::io::Result<()> {
        for outcome in self.all().into_iter().filter(|o| !o.failures.is_empty()) {
            write_outcome(out, outcome, false)?;
        }
        let summary = self.summary();
        if summary.has_failures() {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "FAILED")?;
        } else {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            write!(out, "ok")?;
        }
        out.reset()?;
        writeln!(
            out,
            " {}: {} passed, {} failed ({:.1}%)",
            self.suite,
            summary.passed,
            summary.failed,
            summary.success_rate()
        )
    }

    pub fn to_json(&self) -> TfResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn write_outcome(out: &mut Buffer, outcome: &Outcome, status_line: bool) -> std::io::Result<()> {
    if status_line || !outcome.passed() {
        let color = if outcome.passed() {
            Color::Green
        } else {
            Color::Red
        };
        out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(out, "--- {}", outcome.status)?;
        out.reset()?;
        writeln!(out, ": {}", outcome.name)?;
    }
    for failure in &outcome.failures {
        write_failure(out, failure)?;
    }
    Ok(())
}

fn write_failure(out: &mut Buffer, failure: &Failure) -> std::io::Result<()> {
    writeln!(out, "    {}", failure.message)?;
    if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
        writeln!(out, "        expected: {}", expected)?;
        writeln!(out, "        actual:   {}", actual)?;
        if expected.contains('\n') || actual.contains('\n') {
            let changeset = Changeset::new(expected, actual, "\n");
            write_diff(out, &changeset.diffs)?;
        }
    }
    if let Some(help) = &failure.help {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        writeln!(out, "        help: {}", help)?;
        out.reset()?;
    }
    Ok(())
}

fn write_diff(out: &mut Buffer, diffs: &[Difference]) -> std::io::Result<()> {
    for diff in diffs {
        match diff {
            Difference::Same(x) => {
                out.reset()?;
                for line in x.lines() {
                    writeln!(out, "         {}", line)?;
                }
            }
            Difference::Add(x) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                for line in x.lines() {
                    writeln!(out, "        +{}", line)?;
                }
            }
            Difference::Rem(x) => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                for line in x.lines() {
                    writeln!(out, "        -{}", line)?;
                }
            }
        }
    }
    out.reset()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> SuiteConfig {
        SuiteConfig::default().verbose(false).colors(false)
    }

    #[test]
    fn statuses_follow_body_result() {
        let suite = Suite::with_config("s", quiet());
        assert!(suite.run("passes", |_| Ok(())));
        assert!(!suite.run("fails", |t| {
            t.fail("nope");
            Ok(())
        }));
        assert!(!suite.run("aborts", |_| Err(TfError::ArgumentCount {
            expected: 1,
            actual: 0
        })));
        assert!(!suite.run("panics", |_| panic!("kaboom")));

        let report = suite.finish();
        let status = |n: &str| report.outcome(n).map(|o| o.status);
        assert_eq!(status("s/passes"), Some(Status::Passed));
        assert_eq!(status("s/fails"), Some(Status::Failed));
        assert_eq!(status("s/aborts"), Some(Status::Aborted));
        assert_eq!(status("s/panics"), Some(Status::Aborted));
        assert_eq!(
            report.outcome("s/panics").unwrap().failures[0].message,
            "panicked: kaboom"
        );
    }

    #[test]
    fn names_replace_whitespace() {
        let suite = Suite::with_config("s", quiet());
        suite.run("GET /users list", |_| Ok(()));
        assert!(suite.report().outcome("s/GET_/users_list").is_some());
        suite.finish();
    }

    #[test]
    fn failed_child_fails_parent() {
        let suite = Suite::with_config("s", quiet());
        let passed = suite.run("parent", |t| {
            t.run("ok", |_| Ok(()));
            t.run("bad", |t| {
                t.fail("broken");
                Ok(())
            });
            Ok(())
        });
        assert!(!passed);
        let report = suite.finish();
        assert_eq!(report.outcome("s/parent").unwrap().status, Status::Failed);
        assert_eq!(report.summary(), TestSummary { passed: 1, failed: 2 });
    }

    #[test]
    fn error_failures_carry_code_and_help() {
        let failure = Failure::from(TfError::ReturnCount {
            expected: 2,
            actual: 1,
        });
        assert_eq!(failure.code.as_deref(), Some("tf::config::return_count"));
        assert!(failure.help.is_some());
    }

    #[test]
    fn summary_rate() {
        let summary = TestSummary { passed: 3, failed: 1 };
        assert_eq!(summary.total_tests(), 4);
        assert!((summary.success_rate() - 75.0).abs() < f64::EPSILON);
        assert_eq!(TestSummary { passed: 0, failed: 0 }.success_rate(), 0.0);
    }

    #[test]
    #[should_panic(expected = "FAILED s: 0 passed, 1 failed")]
    fn dropping_a_failed_suite_panics() {
        let suite = Suite::with_config("s", quiet());
        suite.run("bad", |t| {
            t.fail("broken");
            Ok(())
        });
    }
}
