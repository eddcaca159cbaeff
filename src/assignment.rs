// The course/assignment pair chosen for a working directory.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CURRENT_ASSIGNMENT_FILE: &str = ".gscli.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurrentAssignment {
    pub course_id: String,
    pub course_name: String,
    pub assignment_id: String,
    pub assignment_name: String,
}

impl fmt::Display for CurrentAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) / {} ({})",
            self.course_name, self.course_id, self.assignment_name, self.assignment_id
        )
    }
}

/// Reads and writes the current assignment file of one directory.
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    path: PathBuf,
}

impl AssignmentStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        AssignmentStore {
            path: dir.as_ref().join(CURRENT_ASSIGNMENT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved selection; a missing or corrupt file yields `None`.
    pub fn load(&self) -> Option<CurrentAssignment> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "current assignment could not be read");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(current) => Some(current),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "current assignment file is corrupt, ignoring it");
                None
            }
        }
    }

    pub fn save(&self, current: &CurrentAssignment) -> Result<()> {
        let json = serde_json::to_string_pretty(current)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}
