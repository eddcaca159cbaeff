// Autograder results and their plain-text rendering.

use crate::platform::{ResultsPayload, TestEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseResult {
    pub passed: bool,
    pub name: String,
    pub output: String,
    pub score: f64,
    pub max_score: f64,
}

impl From<TestEntry> for TestCaseResult {
    fn from(entry: TestEntry) -> Self {
        TestCaseResult {
            passed: entry.status.as_deref() == Some("passed"),
            name: entry.name,
            output: entry.output.unwrap_or_default(),
            score: entry.score.unwrap_or(0.0),
            max_score: entry.max_score.unwrap_or(0.0),
        }
    }
}

/// Parsed results of a processed submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingResults {
    pub score: Option<f64>,
    pub tests: Vec<TestCaseResult>,
}

impl From<ResultsPayload> for GradingResults {
    fn from(payload: ResultsPayload) -> Self {
        GradingResults {
            score: payload.score,
            tests: payload.tests.into_iter().map(TestCaseResult::from).collect(),
        }
    }
}

/// One result as a header line followed by its indented output.
pub fn format_result(result: &TestCaseResult) -> String {
    let mark = if result.passed { "PASS" } else { "FAIL" };
    let mut text = format!(
        "[{mark}] {} ({}/{})",
        result.name, result.score, result.max_score
    );
    for line in result.output.lines() {
        text.push_str("\n    ");
        text.push_str(line);
    }
    text
}

/// All results in input order, one entry per result.
pub fn format_results(results: &[TestCaseResult]) -> String {
    format_results_with(results, |_, text| text)
}

/// Like [`format_results`], with each entry passed through `decorate`
/// (the terminal uses it to colour passes and failures).
pub fn format_results_with<F>(results: &[TestCaseResult], decorate: F) -> String
where
    F: Fn(&TestCaseResult, String) -> String,
{
    results
        .iter()
        .map(|result| decorate(result, format_result(result)))
        .collect::<Vec<_>>()
        .join("\n")
}
