// API client module: a small blocking HTTP client that talks to the course
// platform's web front end. It keeps every cookie the server hands out in a
// shared jar so the session can be written back to the cache after each
// request.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::{multipart, Client};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::ACCEPT;
use reqwest::Url;
use tracing::debug;

use crate::error::ApiError;
use crate::files::SubmissionFile;
use crate::platform::{Assignment, Course, Credentials, Platform, StatusPayload};
use crate::session::{CookieMap, Session};

static INPUT_AUTH_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<input[^>]*name="authenticity_token"[^>]*>"#).unwrap());
static VALUE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"value="([^"]*)""#).unwrap());
static CSRF_META: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<meta[^>]*name="csrf-token"[^>]*content="([^"]*)""#).unwrap());
static COURSE_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)class="courseList--term[^"]*"[^>]*>\s*([^<]*?)\s*<|href="/courses/(\d+)"[^>]*>.*?class="courseBox--shortname[^"]*"[^>]*>\s*([^<]*?)\s*<.*?class="courseBox--name[^"]*"[^>]*>\s*([^<]*?)\s*<"#,
    )
    .unwrap()
});
static ASSIGNMENT_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"href="/courses/\d+/assignments/(\d+)(?:/submissions/\d+)?"[^>]*>\s*([^<]+?)\s*</a>|data-assignment-id="(\d+)"[^>]*data-assignment-title="([^"]*)""#,
    )
    .unwrap()
});
static SUBMISSION_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"/courses/\d+/assignments/(\d+)/submissions/(\d+)"#).unwrap());

/// Blocking client bound to one platform base URL and one cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
    base: String,
}

impl ApiClient {
    /// Create a client for `session.base_url` carrying the session's cookies.
    pub fn new(session: &Session) -> Result<Self, ApiError> {
        let base = session.base_url.trim_end_matches('/').to_string();
        let base_url = Url::parse(&base).map_err(|e| ApiError::Url {
            url: base.clone(),
            reason: e.to_string(),
        })?;

        let jar = Arc::new(Jar::default());
        for (name, value) in &session.cookies {
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), &base_url);
        }

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(concat!("gscli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(ApiClient {
            client,
            jar,
            base_url,
            base,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn get_page(&self, path: &str) -> Result<String, ApiError> {
        let res = self.client.get(self.url(path)).send()?.error_for_status()?;
        Ok(res.text()?)
    }
}

fn is_login_page(url: &Url) -> bool {
    url.path().starts_with("/login")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// The hidden `authenticity_token` field of the login form.
pub fn authenticity_token(page: &str) -> Option<String> {
    let tag = INPUT_AUTH_TOKEN.find(page)?;
    VALUE_ATTR
        .captures(tag.as_str())
        .map(|c| unescape(&c[1]))
}

pub fn csrf_token(page: &str) -> Option<String> {
    CSRF_META.captures(page).map(|c| unescape(&c[1]))
}

/// Courses on the account page, each tagged with the term heading above it.
pub fn parse_courses(page: &str) -> Vec<Course> {
    let mut courses = Vec::new();
    let mut term = String::new();
    for caps in COURSE_LIST.captures_iter(page) {
        if let Some(heading) = caps.get(1) {
            term = unescape(heading.as_str());
            continue;
        }
        if let (Some(id), Some(short), Some(name)) = (caps.get(2), caps.get(3), caps.get(4)) {
            courses.push(Course {
                id: id.as_str().to_string(),
                short_name: unescape(short.as_str()),
                name: unescape(name.as_str()),
                term: term.clone(),
            });
        }
    }
    courses
}

/// Assignments listed on a course page, first occurrence of each id wins.
pub fn parse_assignments(page: &str) -> Vec<Assignment> {
    let mut assignments: Vec<Assignment> = Vec::new();
    for caps in ASSIGNMENT_ROW.captures_iter(page) {
        let (id, name) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(id), Some(name), _, _) | (_, _, Some(id), Some(name)) => (id, name),
            _ => continue,
        };
        if assignments.iter().any(|a| a.id == id.as_str()) {
            continue;
        }
        assignments.push(Assignment {
            id: id.as_str().to_string(),
            name: unescape(name.as_str()),
        });
    }
    assignments
}

/// Assignment id -> submission id for every submission link on a page.
pub fn parse_submissions(page: &str) -> BTreeMap<String, String> {
    SUBMISSION_LINK
        .captures_iter(page)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

impl Platform for ApiClient {
    fn cookies(&self) -> CookieMap {
        let header = match self.jar.cookies(&self.base_url) {
            Some(header) => header,
            None => return CookieMap::new(),
        };
        // Non-ASCII values make `to_str` fail; decode per byte so one odd
        // cookie cannot drop the rest.
        String::from_utf8_lossy(header.as_bytes())
            .split("; ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    fn probe(&self) -> Result<bool> {
        let res = self.client.get(self.url("/account")).send()?;
        Ok(res.status().is_success() && !is_login_page(res.url()))
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        let page = self.get_page("/login")?;
        let token = authenticity_token(&page).ok_or(ApiError::MissingToken {
            what: "authenticity_token",
            page: "/login".into(),
        })?;

        let form = [
            ("utf8", "✓"),
            ("session[email]", credentials.email.as_str()),
            ("session[password]", credentials.password.as_str()),
            ("session[remember_me]", "1"),
            ("commit", "Log In"),
            ("session[remember_me_sso]", "0"),
            ("authenticity_token", token.as_str()),
        ];
        let res = self
            .client
            .post(self.url("/login"))
            .form(&form)
            .send()
            .map_err(ApiError::from)?
            .error_for_status()
            .map_err(ApiError::from)?;

        if is_login_page(res.url()) {
            return Err(ApiError::LoginRejected.into());
        }
        Ok(())
    }

    fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(parse_courses(&self.get_page("/account")?))
    }

    fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>> {
        Ok(parse_assignments(
            &self.get_page(&format!("/courses/{course_id}"))?,
        ))
    }

    fn upload(
        &self,
        course_id: &str,
        assignment_id: &str,
        files: Vec<SubmissionFile>,
        leaderboard_name: Option<&str>,
    ) -> Result<Option<String>> {
        let page = self.get_page(&format!("/courses/{course_id}"))?;
        let token = csrf_token(&page).ok_or_else(|| ApiError::MissingToken {
            what: "csrf-token",
            page: format!("/courses/{course_id}"),
        })?;

        let mut form = multipart::Form::new()
            .text("authenticity_token", token)
            .text("submission[method]", "upload");
        if let Some(name) = leaderboard_name {
            form = form.text("submission[leaderboard_name]", name.to_string());
        }
        for SubmissionFile {
            file, upload_name, ..
        } in files
        {
            let part = multipart::Part::reader(file).file_name(upload_name);
            form = form.part("submission[files][]", part);
        }

        let res = self
            .client
            .post(self.url(&format!(
                "/courses/{course_id}/assignments/{assignment_id}/submissions"
            )))
            .multipart(form)
            .send()
            .map_err(ApiError::from)?;

        let landed = res.url().clone();
        if res.status().is_success() && landed.path().contains("/submissions/") {
            return Ok(Some(landed.to_string()));
        }
        debug!(status = %res.status(), url = %landed, "upload did not reach a submission page");
        Ok(None)
    }

    fn fetch_status(&self, link: &str) -> Result<StatusPayload> {
        let body = self
            .client
            .get(link)
            .header(ACCEPT, "application/json, text/javascript")
            .send()
            .map_err(ApiError::from)?
            .error_for_status()
            .map_err(ApiError::from)?
            .text()
            .map_err(ApiError::from)?;
        let payload = serde_json::from_str(&body).map_err(|source| ApiError::Payload {
            link: link.to_string(),
            source,
        })?;
        Ok(payload)
    }

    fn latest_submissions(&self, course_id: &str) -> Result<BTreeMap<String, String>> {
        Ok(parse_submissions(
            &self.get_page(&format!("/courses/{course_id}"))?,
        ))
    }

    fn submission_link(
        &self,
        course_id: &str,
        assignment_id: &str,
        submission_id: &str,
    ) -> String {
        self.url(&format!(
            "/courses/{course_id}/assignments/{assignment_id}/submissions/{submission_id}"
        ))
    }
}
