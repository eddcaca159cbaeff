// Upload a submission and wait for the autograder.
//
// Polling states: initializing -> {unprocessed, harness started, task
// started}* -> processed, or timed out, or poll error. Polling never
// retries a failed request and never changes remote state, so running it
// again later (the `status` command) is always safe.

use std::thread;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::files::SubmissionFile;
use crate::platform::Platform;
use crate::report::GradingResults;

/// How often and for how long to poll a submission link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Processed(GradingResults),
    TimedOut,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionReport {
    /// No files were collected; the platform was not contacted.
    NothingToSubmit,
    /// The platform did not return a submission link. The cause is not
    /// reported by the platform.
    Rejected,
    Submitted { link: String, outcome: PollOutcome },
}

/// What to submit where.
#[derive(Debug, Clone)]
pub struct SubmitRequest<'a> {
    pub course_id: &'a str,
    pub assignment_id: &'a str,
    pub leaderboard_name: Option<&'a str>,
}

/// Upload `files` and poll the resulting link until graded.
///
/// The files are closed before this returns on every path.
pub fn submit<P: Platform>(
    conn: &mut Connection<P>,
    request: &SubmitRequest<'_>,
    files: Vec<SubmissionFile>,
    config: &PollConfig,
    progress: &ProgressBar,
) -> SubmissionReport {
    if files.is_empty() {
        return SubmissionReport::NothingToSubmit;
    }

    debug!(
        course = request.course_id,
        assignment = request.assignment_id,
        files = files.len(),
        "uploading submission"
    );
    let uploaded = conn.call(|platform| {
        platform.upload(
            request.course_id,
            request.assignment_id,
            files,
            request.leaderboard_name,
        )
    });

    let link = match uploaded {
        Ok(Some(link)) => link,
        Ok(None) => return SubmissionReport::Rejected,
        Err(e) => {
            // An internal fault is indistinguishable from a rejection here.
            warn!(error = %format!("{e:#}"), "upload raised an error");
            return SubmissionReport::Rejected;
        }
    };

    let outcome = poll(conn.platform(), &link, config, progress);
    conn.persist();
    SubmissionReport::Submitted { link, outcome }
}

/// Poll `link` until it is processed, the request fails or `config.timeout`
/// has elapsed.
pub fn poll<P: Platform>(
    platform: &P,
    link: &str,
    config: &PollConfig,
    progress: &ProgressBar,
) -> PollOutcome {
    let started = Instant::now();
    progress.set_message("Initializing...");

    loop {
        if started.elapsed() >= config.timeout {
            debug!(link, "gave up waiting for autograder");
            return PollOutcome::TimedOut;
        }

        let payload = match platform.fetch_status(link) {
            Ok(payload) => payload,
            Err(e) => return PollOutcome::Failed(format!("{e:#}")),
        };

        if payload.status.is_terminal() {
            progress.set_message("");
            let results = payload.results.unwrap_or_default();
            return PollOutcome::Processed(GradingResults::from(results));
        }

        debug!(status = ?payload.status, "submission not processed yet");
        progress.set_message(format!("{}...", payload.status.phase()));
        progress.tick();
        thread::sleep(config.interval);
    }
}
