// The remote course platform as seen by the rest of the crate.
//
// `Platform` is the capability the core needs: authenticate, list courses
// and assignments, accept an upload and report grading status. `ApiClient`
// in `api.rs` is the HTTP implementation; tests drive the core with
// scripted implementations instead.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Deserializer};

use crate::files::SubmissionFile;
use crate::session::{CookieMap, Session};

/// Email and password collected from the user.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    pub short_name: String,
    pub name: String,
    pub term: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: String,
    pub name: String,
}

/// Grading state reported by the platform for one submission.
///
/// Unknown strings are kept verbatim so new server-side states are shown
/// to the user instead of failing the poll.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PollStatus {
    Unprocessed,
    HarnessStarted,
    TaskStarted,
    Processed,
    Other(String),
}

impl From<String> for PollStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "unprocessed" => PollStatus::Unprocessed,
            "autograder_harness_started" => PollStatus::HarnessStarted,
            "autograder_task_started" => PollStatus::TaskStarted,
            "processed" => PollStatus::Processed,
            _ => PollStatus::Other(raw),
        }
    }
}

impl PollStatus {
    /// Human readable phase shown next to the progress spinner.
    pub fn phase(&self) -> &str {
        match self {
            PollStatus::Unprocessed => "Waiting to be processed",
            PollStatus::HarnessStarted => "Preparing autograder",
            PollStatus::TaskStarted => "Autograder running",
            PollStatus::Processed => "Results ready",
            PollStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollStatus::Processed)
    }
}

/// JSON body returned when polling a submission link.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub status: PollStatus,
    #[serde(default)]
    pub results: Option<ResultsPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsPayload {
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default)]
    pub tests: Vec<TestEntry>,
}

/// One raw entry of `results.tests`.
#[derive(Debug, Clone, Deserialize)]
pub struct TestEntry {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub max_score: Option<f64>,
}

// Autograders emit scores as numbers, numeric strings or null.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub trait Platform {
    /// Current cookies of the underlying session, including rotated ones.
    fn cookies(&self) -> CookieMap;

    /// Cheap authenticated request; `Ok(true)` when the session is live.
    fn probe(&self) -> Result<bool>;

    fn login(&self, credentials: &Credentials) -> Result<()>;

    fn list_courses(&self) -> Result<Vec<Course>>;

    fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>>;

    /// Uploads `files` and returns the submission link, or `None` when the
    /// platform did not accept the submission. The files are consumed and
    /// closed by the call.
    fn upload(
        &self,
        course_id: &str,
        assignment_id: &str,
        files: Vec<SubmissionFile>,
        leaderboard_name: Option<&str>,
    ) -> Result<Option<String>>;

    fn fetch_status(&self, link: &str) -> Result<StatusPayload>;

    /// Latest submission id per assignment id for one course.
    fn latest_submissions(&self, course_id: &str) -> Result<BTreeMap<String, String>>;

    fn submission_link(
        &self,
        course_id: &str,
        assignment_id: &str,
        submission_id: &str,
    ) -> String;
}

/// Builds platform clients and asks the user for credentials.
pub trait Connector {
    type Platform: Platform;

    /// Creates a client carrying the cookies of `session`.
    fn connect(&mut self, session: &Session) -> Result<Self::Platform>;

    fn credentials(&mut self) -> Result<Credentials>;
}
