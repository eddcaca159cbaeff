// Scripted platform used by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};

use crate::files::SubmissionFile;
use crate::platform::{
    Assignment, Connector, Course, Credentials, Platform, PollStatus, ResultsPayload,
    StatusPayload, TestEntry,
};
use crate::session::{CookieMap, Session};

pub const LINK: &str = "https://example.test/courses/1/assignments/2/submissions/3";

#[derive(Clone)]
enum Upload {
    Link,
    Absent,
    Fault,
}

#[derive(Clone)]
pub struct FakePlatform {
    probe: Option<bool>,
    login_fails: bool,
    cookies: CookieMap,
    upload: Upload,
    statuses: Rc<RefCell<VecDeque<Result<StatusPayload, String>>>>,
    courses: Vec<Course>,
    assignments: BTreeMap<String, Vec<Assignment>>,
    submissions: BTreeMap<String, String>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        FakePlatform {
            probe: Some(true),
            login_fails: false,
            cookies: CookieMap::new(),
            upload: Upload::Link,
            statuses: Rc::new(RefCell::new(VecDeque::new())),
            courses: Vec::new(),
            assignments: BTreeMap::new(),
            submissions: BTreeMap::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl FakePlatform {
    pub fn probe_ok(mut self, live: bool) -> Self {
        self.probe = Some(live);
        self
    }

    pub fn probe_fails(mut self) -> Self {
        self.probe = None;
        self
    }

    pub fn login_fails(mut self) -> Self {
        self.login_fails = true;
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn upload_absent(mut self) -> Self {
        self.upload = Upload::Absent;
        self
    }

    pub fn upload_fault(mut self) -> Self {
        self.upload = Upload::Fault;
        self
    }

    /// Responses returned by `fetch_status` in order; the last one repeats.
    pub fn statuses(self, script: Vec<Result<StatusPayload, String>>) -> Self {
        *self.statuses.borrow_mut() = script.into();
        self
    }

    pub fn course(mut self, id: &str, name: &str, term: &str, assignments: &[(&str, &str)]) -> Self {
        self.courses.push(Course {
            id: id.into(),
            short_name: name.into(),
            name: format!("{name} full name"),
            term: term.into(),
        });
        self.assignments.insert(
            id.into(),
            assignments
                .iter()
                .map(|(id, name)| Assignment {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn submission(mut self, assignment_id: &str, submission_id: &str) -> Self {
        self.submissions
            .insert(assignment_id.into(), submission_id.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(name))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Platform for FakePlatform {
    fn cookies(&self) -> CookieMap {
        self.cookies.clone()
    }

    fn probe(&self) -> Result<bool> {
        self.record("probe".into());
        self.probe.ok_or_else(|| anyhow!("connection reset"))
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        self.record(format!("login {}", credentials.email));
        if self.login_fails {
            bail!("login rejected");
        }
        Ok(())
    }

    fn list_courses(&self) -> Result<Vec<Course>> {
        self.record("list_courses".into());
        Ok(self.courses.clone())
    }

    fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>> {
        self.record(format!("list_assignments {course_id}"));
        Ok(self.assignments.get(course_id).cloned().unwrap_or_default())
    }

    fn upload(
        &self,
        course_id: &str,
        assignment_id: &str,
        files: Vec<SubmissionFile>,
        leaderboard_name: Option<&str>,
    ) -> Result<Option<String>> {
        let names: Vec<_> = files.iter().map(|f| f.upload_name.as_str()).collect();
        self.record(format!(
            "upload {course_id}/{assignment_id} [{}] leaderboard={}",
            names.join(","),
            leaderboard_name.unwrap_or("-")
        ));
        match self.upload {
            Upload::Link => Ok(Some(LINK.into())),
            Upload::Absent => Ok(None),
            Upload::Fault => bail!("invalid literal for int() with base 10"),
        }
    }

    fn fetch_status(&self, link: &str) -> Result<StatusPayload> {
        self.record(format!("fetch_status {link}"));
        let mut script = self.statuses.borrow_mut();
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => bail!("no status scripted"),
        }
    }

    fn latest_submissions(&self, course_id: &str) -> Result<BTreeMap<String, String>> {
        self.record(format!("latest_submissions {course_id}"));
        Ok(self.submissions.clone())
    }

    fn submission_link(
        &self,
        course_id: &str,
        assignment_id: &str,
        submission_id: &str,
    ) -> String {
        format!(
            "https://example.test/courses/{course_id}/assignments/{assignment_id}/submissions/{submission_id}"
        )
    }
}

/// Hands out clones of one `FakePlatform` and counts credential prompts.
pub struct FakeConnector {
    template: FakePlatform,
    prompts: usize,
    restored: Vec<CookieMap>,
}

impl FakeConnector {
    pub fn new(template: FakePlatform) -> Self {
        FakeConnector {
            template,
            prompts: 0,
            restored: Vec::new(),
        }
    }

    pub fn prompts(&self) -> usize {
        self.prompts
    }

    pub fn restored(&self) -> &[CookieMap] {
        &self.restored
    }
}

impl Connector for FakeConnector {
    type Platform = FakePlatform;

    fn connect(&mut self, session: &Session) -> Result<FakePlatform> {
        self.restored.push(session.cookies.clone());
        let mut platform = self.template.clone();
        let mut cookies = session.cookies.clone();
        cookies.extend(self.template.cookies.clone());
        platform.cookies = cookies;
        Ok(platform)
    }

    fn credentials(&mut self) -> Result<Credentials> {
        self.prompts += 1;
        Ok(Credentials {
            email: "student@example.test".into(),
            password: "correct horse".into(),
        })
    }
}

pub fn status(raw: &str) -> StatusPayload {
    StatusPayload {
        status: PollStatus::from(raw.to_string()),
        results: None,
    }
}

pub fn processed(tests: &[(&str, bool)]) -> StatusPayload {
    StatusPayload {
        status: PollStatus::Processed,
        results: Some(ResultsPayload {
            score: None,
            tests: tests
                .iter()
                .map(|(name, passed)| TestEntry {
                    status: Some(if *passed { "passed" } else { "failed" }.into()),
                    name: name.to_string(),
                    output: None,
                    score: Some(if *passed { 1.0 } else { 0.0 }),
                    max_score: Some(1.0),
                })
                .collect(),
        }),
    }
}
