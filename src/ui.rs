// UI layer: terminal prompts (via `dialoguer`), the polling spinner (via
// `indicatif`) and rendering of submission reports. Commands in
// `commands.rs` call into here for anything that talks to the user.

use std::io::Write;

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ApiClient;
use crate::platform::{Connector, Credentials};
use crate::report::{format_results_with, GradingResults};
use crate::session::Session;
use crate::submit::{PollOutcome, SubmissionReport};

/// Connector used by the binary: real HTTP client, credentials from the
/// terminal.
#[derive(Debug, Default)]
pub struct InteractiveConnector;

impl Connector for InteractiveConnector {
    type Platform = ApiClient;

    fn connect(&mut self, session: &Session) -> Result<ApiClient> {
        Ok(ApiClient::new(session)?)
    }

    fn credentials(&mut self) -> Result<Credentials> {
        let email: String = Input::new().with_prompt("Email").interact_text()?;
        // `Password` hides input in terminal for passwords.
        let password: String = Password::new().with_prompt("Password").interact()?;
        Ok(Credentials { email, password })
    }
}

/// Keyboard-driven picker; `None` when the user backs out with Esc or q.
pub fn select(prompt: &str, items: &[String]) -> Result<Option<usize>> {
    Ok(Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt()?)
}

/// Spinner shown while waiting on the autograder; the message is the
/// current grading phase. The poll loop advances it on every tick.
pub fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner
}

const REJECTED: &str = "Failed to submit. The platform did not accept the submission. Possible causes:
  - the course or assignment id is wrong
  - the deadline has passed
  - a required field is missing (e.g. a leaderboard name, see --leaderboard)";

pub fn print_report(out: &mut dyn Write, report: &SubmissionReport) -> Result<()> {
    match report {
        SubmissionReport::NothingToSubmit => {
            writeln!(out, "Nothing to submit: no readable files were found.")?;
        }
        SubmissionReport::Rejected => writeln!(out, "{}", REJECTED.red())?,
        SubmissionReport::Submitted { link, outcome } => {
            writeln!(out, "{}", "Submission complete.".yellow())?;
            print_outcome(out, link, outcome)?;
        }
    }
    Ok(())
}

pub fn print_outcome(out: &mut dyn Write, link: &str, outcome: &PollOutcome) -> Result<()> {
    match outcome {
        PollOutcome::Processed(results) => print_results(out, results)?,
        PollOutcome::TimedOut => {
            writeln!(
                out,
                "\nTimeout reached while waiting for autograder results. Check again later with `gscli status`."
            )?;
            writeln!(out, "View your submission at: {}", link.blue())?;
        }
        PollOutcome::Failed(err) => {
            writeln!(out, "{}", format!("Error fetching submission status: {err}").red())?;
            writeln!(out, "Check again later with `gscli status`.")?;
            writeln!(out, "View your submission at: {}", link.blue())?;
        }
    }
    Ok(())
}

fn print_results(out: &mut dyn Write, results: &GradingResults) -> Result<()> {
    writeln!(out, "\nAutograder Results:")?;
    writeln!(out, "{}", "=".repeat(50))?;
    if results.tests.is_empty() {
        writeln!(out, "No test results were reported.")?;
    } else {
        let text = format_results_with(&results.tests, |result, text| {
            if result.passed {
                text.green().to_string()
            } else {
                text.red().to_string()
            }
        });
        writeln!(out, "{text}")?;
    }
    if let Some(score) = results.score {
        writeln!(out, "{}", format!("Total score: {score}").bold())?;
    }
    Ok(())
}
