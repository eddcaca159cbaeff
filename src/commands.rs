// Command implementations. Each command gets the per-invocation context,
// a connector to reach the platform and a writer for user-facing output.
//
// Only a failed login escapes as an error; every other failure is printed
// and the command returns normally.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use indicatif::ProgressBar;
use tracing::warn;

use crate::assignment::{AssignmentStore, CurrentAssignment};
use crate::config::Config;
use crate::connection::{obtain_session, Connection};
use crate::files;
use crate::platform::{Connector, Course, Platform};
use crate::session::SessionStore;
use crate::submit::{self, SubmitRequest};
use crate::ui;

const NO_CURRENT_ASSIGNMENT: &str =
    "No current assignment. Run `gscli choose` first, or pass --course and --assignment.";

/// State shared by all commands of one invocation.
pub struct Context {
    pub config: Config,
    pub sessions: SessionStore,
    pub assignments: AssignmentStore,
    pub workdir: PathBuf,
}

impl Context {
    pub fn new(config: Config, workdir: impl AsRef<Path>) -> Self {
        Context {
            sessions: SessionStore::new(&config.config_dir),
            assignments: AssignmentStore::new(workdir.as_ref()),
            workdir: workdir.as_ref().to_path_buf(),
            config,
        }
    }

    fn connect<C: Connector>(&self, connector: &mut C) -> Result<Connection<C::Platform>> {
        obtain_session(&self.sessions, &self.config.base_url, connector)
    }

    /// Explicit ids win; anything missing comes from the current assignment.
    fn resolve_target(
        &self,
        course: Option<String>,
        assignment: Option<String>,
    ) -> Option<(String, String)> {
        if let (Some(course), Some(assignment)) = (&course, &assignment) {
            return Some((course.clone(), assignment.clone()));
        }
        let current = self.assignments.load()?;
        Some((
            course.unwrap_or(current.course_id),
            assignment.unwrap_or(current.assignment_id),
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubmitArgs {
    pub files: Vec<String>,
    pub course: Option<String>,
    pub assignment: Option<String>,
    pub leaderboard: Option<String>,
    pub recursive: bool,
}

pub fn submit<C: Connector>(
    ctx: &Context,
    connector: &mut C,
    args: SubmitArgs,
    progress: &ProgressBar,
    out: &mut dyn Write,
) -> Result<()> {
    let Some((course_id, assignment_id)) = ctx.resolve_target(args.course, args.assignment)
    else {
        writeln!(out, "{NO_CURRENT_ASSIGNMENT}")?;
        return Ok(());
    };

    let paths = if args.files.is_empty() {
        vec![ctx.workdir.to_string_lossy().into_owned()]
    } else {
        args.files
    };
    let collected = files::collect(&paths, args.recursive);
    if collected.is_empty() {
        return ui::print_report(out, &submit::SubmissionReport::NothingToSubmit);
    }

    let mut conn = ctx.connect(connector)?;
    writeln!(
        out,
        "Submitting {} file(s) to course {course_id}, assignment {assignment_id}...",
        collected.len()
    )?;
    let request = SubmitRequest {
        course_id: &course_id,
        assignment_id: &assignment_id,
        leaderboard_name: args.leaderboard.as_deref(),
    };
    let report = submit::submit(
        &mut conn,
        &request,
        collected,
        &ctx.config.submit_poll(),
        progress,
    );
    progress.finish_and_clear();
    ui::print_report(out, &report)
}

/// Re-check the latest submission of an assignment without uploading.
pub fn status<C: Connector>(
    ctx: &Context,
    connector: &mut C,
    course: Option<String>,
    assignment: Option<String>,
    progress: &ProgressBar,
    out: &mut dyn Write,
) -> Result<()> {
    let Some((course_id, assignment_id)) = ctx.resolve_target(course, assignment) else {
        writeln!(out, "{NO_CURRENT_ASSIGNMENT}")?;
        return Ok(());
    };

    let mut conn = ctx.connect(connector)?;
    let submissions = match conn.call(|p| p.latest_submissions(&course_id)) {
        Ok(submissions) => submissions,
        Err(e) => {
            writeln!(out, "Could not fetch submissions for course {course_id}: {e:#}")?;
            return Ok(());
        }
    };
    let Some(submission_id) = submissions.get(&assignment_id) else {
        writeln!(out, "No submission found for assignment {assignment_id}.")?;
        return Ok(());
    };

    let link = conn
        .platform()
        .submission_link(&course_id, &assignment_id, submission_id);
    let outcome = submit::poll(conn.platform(), &link, &ctx.config.status_poll(), progress);
    conn.persist();
    progress.finish_and_clear();
    ui::print_outcome(out, &link, &outcome)
}

/// List courses, grouped by term, with their assignments unless
/// `courses_only`. Without `all` only the most recent term is shown.
pub fn list<C: Connector>(
    ctx: &Context,
    connector: &mut C,
    all: bool,
    courses_only: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let mut conn = ctx.connect(connector)?;
    let mut courses = match conn.call(|p| p.list_courses()) {
        Ok(courses) => courses,
        Err(e) => {
            writeln!(out, "Could not list courses: {e:#}")?;
            return Ok(());
        }
    };
    if !all {
        if let Some(latest) = courses.first().map(|c| c.term.clone()) {
            courses.retain(|c| c.term == latest);
        }
    }
    if courses.is_empty() {
        writeln!(out, "No courses found.")?;
        return Ok(());
    }

    let mut term: Option<&str> = None;
    for course in &courses {
        if term != Some(course.term.as_str()) {
            term = Some(course.term.as_str());
            let heading = if course.term.is_empty() {
                "Courses"
            } else {
                course.term.as_str()
            };
            writeln!(out, "{heading}")?;
        }
        writeln!(out, "  {}", course_label(course))?;
        if courses_only {
            continue;
        }
        match conn.call(|p| p.list_assignments(&course.id)) {
            Ok(assignments) if assignments.is_empty() => writeln!(out, "    (no assignments)")?,
            Ok(assignments) => {
                for a in assignments {
                    writeln!(out, "    {} [{}]", a.name, a.id)?;
                }
            }
            Err(e) => {
                warn!(course = %course.id, error = %format!("{e:#}"), "could not list assignments");
                writeln!(out, "    (could not list assignments)")?;
            }
        }
    }
    Ok(())
}

fn course_label(course: &Course) -> String {
    if course.name.is_empty() || course.name == course.short_name {
        format!("{} [{}]", course.short_name, course.id)
    } else {
        format!("{} - {} [{}]", course.short_name, course.name, course.id)
    }
}

/// Interactively pick a course and an assignment and remember them for
/// the working directory. `pick` returns the chosen index, or `None` when
/// the user cancels.
pub fn choose<C, F>(ctx: &Context, connector: &mut C, mut pick: F, out: &mut dyn Write) -> Result<()>
where
    C: Connector,
    F: FnMut(&str, &[String]) -> Result<Option<usize>>,
{
    let mut conn = ctx.connect(connector)?;
    let courses = match conn.call(|p| p.list_courses()) {
        Ok(courses) if !courses.is_empty() => courses,
        Ok(_) => {
            writeln!(out, "No courses found.")?;
            return Ok(());
        }
        Err(e) => {
            writeln!(out, "Could not list courses: {e:#}")?;
            return Ok(());
        }
    };

    let labels: Vec<String> = courses.iter().map(course_label).collect();
    let Some(course) = pick("Course", &labels)?.and_then(|i| courses.get(i)) else {
        writeln!(out, "Cancelled.")?;
        return Ok(());
    };

    let assignments = match conn.call(|p| p.list_assignments(&course.id)) {
        Ok(assignments) if !assignments.is_empty() => assignments,
        Ok(_) => {
            writeln!(out, "No assignments found in {}.", course.short_name)?;
            return Ok(());
        }
        Err(e) => {
            writeln!(out, "Could not list assignments: {e:#}")?;
            return Ok(());
        }
    };

    let labels: Vec<String> = assignments
        .iter()
        .map(|a| format!("{} [{}]", a.name, a.id))
        .collect();
    let Some(assignment) = pick("Assignment", &labels)?.and_then(|i| assignments.get(i)) else {
        writeln!(out, "Cancelled.")?;
        return Ok(());
    };

    let current = CurrentAssignment {
        course_id: course.id.clone(),
        course_name: course.short_name.clone(),
        assignment_id: assignment.id.clone(),
        assignment_name: assignment.name.clone(),
    };
    match ctx.assignments.save(&current) {
        Ok(()) => writeln!(out, "Current assignment set to {current}.")?,
        Err(e) => writeln!(out, "Could not save the current assignment: {e:#}")?,
    }
    Ok(())
}

pub fn join(course_id: &str, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Joining courses is not supported yet (course {course_id}).")?;
    Ok(())
}

pub fn logout(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match ctx.sessions.clear() {
        Ok(()) => writeln!(out, "Logged out.")?,
        Err(e) => writeln!(out, "Could not log out: {e:#}")?,
    }
    Ok(())
}

/// Remove both files; a failure on one does not stop the other.
pub fn clean(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let results = [ctx.sessions.clear(), ctx.assignments.clear()];
    let mut removed = true;
    for e in results.into_iter().filter_map(Result::err) {
        writeln!(out, "Could not clean up: {e:#}")?;
        removed = false;
    }
    if removed {
        writeln!(out, "Removed the cached session and the current assignment.")?;
    }
    Ok(())
}

/// What runs when no subcommand is given.
pub fn report_current_assignment(ctx: &Context, out: &mut dyn Write) -> Result<()> {
    match ctx.assignments.load() {
        Some(current) => writeln!(out, "Current assignment: {current}")?,
        None => writeln!(out, "No current assignment selected.")?,
    }
    writeln!(
        out,
        "Run gscli --help on how to submit your assignment or choose a different assignment."
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{processed, FakeConnector, FakePlatform};
    use std::fs;
    use std::time::Duration;

    struct Fixture {
        _dirs: (tempfile::TempDir, tempfile::TempDir),
        ctx: Context,
    }

    fn fixture() -> Fixture {
        let config_dir = tempfile::tempdir().unwrap();
        let workdir = tempfile::tempdir().unwrap();
        let config = Config {
            base_url: "https://example.test".into(),
            config_dir: config_dir.path().to_path_buf(),
            poll_interval: Duration::from_millis(1),
            submit_timeout: Duration::from_secs(5),
            status_timeout: Duration::from_millis(20),
        };
        let ctx = Context::new(config, workdir.path());
        Fixture {
            _dirs: (config_dir, workdir),
            ctx,
        }
    }

    fn output(run: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn choose_hw(ctx: &Context) {
        ctx.assignments
            .save(&CurrentAssignment {
                course_id: "1".into(),
                course_name: "CS 1".into(),
                assignment_id: "2".into(),
                assignment_name: "HW".into(),
            })
            .unwrap();
    }

    #[test]
    fn submit_without_target_never_connects() {
        let fx = fixture();
        let platform = FakePlatform::default();
        let mut connector = FakeConnector::new(platform.clone());

        let text = output(|out| {
            submit(
                &fx.ctx,
                &mut connector,
                SubmitArgs::default(),
                &ProgressBar::hidden(),
                out,
            )
        });

        assert!(text.contains("No current assignment"));
        assert_eq!(connector.prompts(), 0);
        assert!(connector.restored().is_empty());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn submit_falls_back_to_current_assignment_and_workdir() {
        let fx = fixture();
        choose_hw(&fx.ctx);
        fs::write(fx.ctx.workdir.join("main.py"), "x = 1").unwrap();
        let platform =
            FakePlatform::default().statuses(vec![Ok(processed(&[("runs", true)]))]);
        let mut connector = FakeConnector::new(platform.clone());

        let text = output(|out| {
            submit(
                &fx.ctx,
                &mut connector,
                SubmitArgs::default(),
                &ProgressBar::hidden(),
                out,
            )
        });

        assert!(text.contains("Submission complete."));
        assert!(text.contains("[PASS] runs (1/1)"));
        // .gscli.json is hidden, so only main.py goes up.
        assert!(platform
            .calls()
            .contains(&"upload 1/2 [main.py] leaderboard=-".to_string()));
        assert!(fx.ctx.sessions.load("https://example.test").is_some());
    }

    #[test]
    fn submit_with_nothing_to_send_never_connects() {
        let fx = fixture();
        let mut connector = FakeConnector::new(FakePlatform::default());
        let args = SubmitArgs {
            files: vec![fx.ctx.workdir.join("missing.c").to_string_lossy().into_owned()],
            course: Some("1".into()),
            assignment: Some("2".into()),
            ..SubmitArgs::default()
        };

        let text = output(|out| {
            submit(&fx.ctx, &mut connector, args, &ProgressBar::hidden(), out)
        });

        assert!(text.contains("Nothing to submit"));
        assert_eq!(connector.prompts(), 0);
    }

    #[test]
    fn failed_login_propagates() {
        let fx = fixture();
        choose_hw(&fx.ctx);
        fs::write(fx.ctx.workdir.join("main.py"), "x = 1").unwrap();
        let mut connector = FakeConnector::new(FakePlatform::default().login_fails());

        let mut out = Vec::new();
        let result = submit(
            &fx.ctx,
            &mut connector,
            SubmitArgs::default(),
            &ProgressBar::hidden(),
            &mut out,
        );

        assert!(result.is_err());
    }

    #[test]
    fn status_polls_latest_submission() {
        let fx = fixture();
        let platform = FakePlatform::default()
            .submission("2", "77")
            .statuses(vec![Ok(processed(&[("late test", false)]))]);
        let mut connector = FakeConnector::new(platform.clone());

        let text = output(|out| {
            status(
                &fx.ctx,
                &mut connector,
                Some("1".into()),
                Some("2".into()),
                &ProgressBar::hidden(),
                out,
            )
        });

        assert!(text.contains("[FAIL] late test (0/1)"));
        assert!(platform.calls().contains(
            &"fetch_status https://example.test/courses/1/assignments/2/submissions/77"
                .to_string()
        ));
    }

    #[test]
    fn status_without_submission_says_so() {
        let fx = fixture();
        choose_hw(&fx.ctx);
        let mut connector = FakeConnector::new(FakePlatform::default());

        let text = output(|out| {
            status(&fx.ctx, &mut connector, None, None, &ProgressBar::hidden(), out)
        });

        assert!(text.contains("No submission found for assignment 2."));
    }

    #[test]
    fn list_shows_latest_term_unless_all() {
        let fx = fixture();
        let platform = FakePlatform::default()
            .course("1", "CS 1", "Fall 2026", &[("10", "HW 1")])
            .course("2", "CS 0", "Spring 2026", &[]);
        let mut connector = FakeConnector::new(platform.clone());

        let latest = output(|out| list(&fx.ctx, &mut connector, false, false, out));
        assert!(latest.contains("Fall 2026"));
        assert!(latest.contains("HW 1 [10]"));
        assert!(!latest.contains("CS 0"));

        let everything = output(|out| list(&fx.ctx, &mut connector, true, true, out));
        assert!(everything.contains("Spring 2026"));
        assert!(everything.contains("CS 0 - CS 0 full name [2]"));
        assert!(!everything.contains("HW 1"));
    }

    #[test]
    fn choose_saves_selection() {
        let fx = fixture();
        let platform = FakePlatform::default()
            .course("1", "CS 1", "Fall 2026", &[("10", "HW 1"), ("11", "HW 2")]);
        let mut connector = FakeConnector::new(platform);
        let picks = std::cell::RefCell::new(vec![Some(1), Some(0)]);

        let text = output(|out| {
            choose(
                &fx.ctx,
                &mut connector,
                |_, _| Ok(picks.borrow_mut().pop().flatten()),
                out,
            )
        });

        assert!(text.contains("Current assignment set to"));
        let current = fx.ctx.assignments.load().unwrap();
        assert_eq!(current.course_id, "1");
        assert_eq!(current.assignment_id, "11");
        assert_eq!(current.assignment_name, "HW 2");
    }

    #[test]
    fn logout_then_command_prompts_again() {
        let fx = fixture();
        let mut connector = FakeConnector::new(FakePlatform::default());
        output(|out| list(&fx.ctx, &mut connector, false, true, out));
        output(|out| list(&fx.ctx, &mut connector, false, true, out));
        assert_eq!(connector.prompts(), 1);

        output(|out| logout(&fx.ctx, out));
        output(|out| list(&fx.ctx, &mut connector, false, true, out));
        assert_eq!(connector.prompts(), 2);
    }

    #[test]
    fn clean_removes_both_files() {
        let fx = fixture();
        choose_hw(&fx.ctx);
        let mut connector = FakeConnector::new(FakePlatform::default());
        output(|out| list(&fx.ctx, &mut connector, false, true, out));

        output(|out| clean(&fx.ctx, out));

        assert!(fx.ctx.assignments.load().is_none());
        assert!(fx.ctx.sessions.load("https://example.test").is_none());
        let text = output(|out| report_current_assignment(&fx.ctx, out));
        assert!(text.contains("No current assignment selected."));
    }

    #[test]
    fn local_file_errors_are_printed_not_returned() {
        let fx = fixture();
        choose_hw(&fx.ctx);
        // A directory where a file is expected makes removal and writes fail.
        fs::create_dir_all(fx.ctx.sessions.path()).unwrap();

        let text = output(|out| logout(&fx.ctx, out));
        assert!(text.contains("Could not log out"));

        let text = output(|out| clean(&fx.ctx, out));
        assert!(text.contains("Could not clean up"));
        assert!(!text.contains("Removed the cached session"));
        assert!(fx.ctx.assignments.load().is_none());
    }

    #[test]
    fn choose_reports_unwritable_selection() {
        let fx = fixture();
        fs::create_dir_all(fx.ctx.assignments.path()).unwrap();
        let platform = FakePlatform::default().course("1", "CS 1", "Fall 2026", &[("10", "HW 1")]);
        let mut connector = FakeConnector::new(platform);

        let text = output(|out| choose(&fx.ctx, &mut connector, |_, _| Ok(Some(0)), out));

        assert!(text.contains("Could not save the current assignment"));
        assert!(!text.contains("Current assignment set to"));
    }
}
