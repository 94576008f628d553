// Reporting: summaries, rendered output, JSON and the drop check.
use predicates::prelude::*;
use tf::{function, vals, Failure, Status, Suite, SuiteConfig};

fn quiet(name: &str) -> Suite {
    Suite::with_config(name, SuiteConfig::default().verbose(false).colors(false))
}

fn double(n: i64) -> i64 {
    n * 2
}

#[test]
fn rendered_report_lists_failures_and_summary() {
    let suite = quiet("render");
    let f = function(&suite, double);
    f.call(vals![2]).returns(vals![4]);
    f.call(vals![2]).returns(vals![5]);
    let report = suite.finish();

    let text = report.render(false);
    assert!(predicate::str::contains("--- FAIL: render/double#2").eval(text.as_str()));
    assert!(predicate::str::contains("expected: 5").eval(text.as_str()));
    assert!(predicate::str::contains("actual:   4").eval(text.as_str()));
    assert!(predicate::str::ends_with("FAILED render: 1 passed, 1 failed (50.0%)\n").eval(text.as_str()));
    assert!(!predicate::str::contains("double#1").eval(text.as_str()));
}

#[test]
fn colours_are_opt_in() {
    let suite = quiet("colour");
    function(&suite, double).call(vals![1]).returns(vals![3]);
    let report = suite.finish();
    assert!(!report.render(false).contains('\x1b'));
    assert!(report.render(true).contains('\x1b'));
}

#[test]
fn multi_line_values_get_a_diff() {
    let suite = quiet("diff");
    suite.run("lines", |t| {
        t.record(Failure::new("text").compare("a\nb\nc", "a\nx\nc"));
        Ok(())
    });
    let report = suite.finish();
    let text = report.render(false);
    assert!(predicate::str::contains("-b").eval(text.as_str()));
    assert!(predicate::str::contains("+x").eval(text.as_str()));
}

#[test]
fn clean_runs_report_ok() {
    let suite = quiet("clean");
    function(&suite, double).call(vals![3]).returns(vals![6]);
    let report = suite.finish();
    assert!(!report.has_failures());
    assert_eq!(report.render(false), "ok clean: 1 passed, 0 failed (100.0%)\n");
}

#[test]
fn json_report_is_structured() {
    let suite = quiet("json");
    let f = function(&suite, double);
    f.call(vals![1]).returns(vals![2]);
    f.call(vals![1, 2]).returns(vals![2]);
    let report = suite.finish();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["suite"], "json");
    assert_eq!(json["outcomes"][0]["name"], "json/double#1");
    assert_eq!(json["outcomes"][0]["status"], "passed");
    assert_eq!(json["outcomes"][1]["status"], "aborted");
    assert_eq!(
        json["outcomes"][1]["failures"][0]["code"],
        "tf::config::argument_count"
    );
    assert!(json["outcomes"][0]["failures"].as_array().unwrap().is_empty());
}

#[test]
fn report_is_a_snapshot() {
    let suite = quiet("snapshot");
    suite.run("one", |_| Ok(()));
    let before = suite.report();
    suite.run("two", |_| Ok(()));
    assert_eq!(before.outcomes().len(), 1);
    assert_eq!(suite.report().outcomes().len(), 2);
    assert_eq!(suite.finish().summary().total_tests(), 2);
}

#[test]
fn verbose_mode_still_passes() {
    let suite = Suite::with_config("verbose", SuiteConfig::default().verbose(true).colors(false));
    assert!(suite.run("noisy", |_| Ok(())));
    assert_eq!(
        suite.finish().outcome("verbose/noisy").map(|o| o.status),
        Some(Status::Passed)
    );
}

#[test]
#[should_panic(expected = "--- FAIL: dropped/double#1")]
fn dropping_a_failed_suite_fails_the_test() {
    let suite = quiet("dropped");
    function(&suite, double).call(vals![1]).returns(vals![0]);
}

#[test]
fn dropping_a_clean_suite_is_silent() {
    let suite = quiet("silent");
    function(&suite, double).call(vals![1]).returns(vals![2]);
}
