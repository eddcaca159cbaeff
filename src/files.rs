// Resolves file and directory arguments into open files for upload.
//
// Rules:
// - arguments are deduplicated before anything is opened
// - an explicitly named file is always opened, hidden or not
// - a directory contributes its entries (descending when `recursive`),
//   skipping names that start with '.'
// - anything unreadable is warned about and skipped

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// A file opened for binary read, plus the name it is uploaded under.
///
/// Dropping the value closes the file.
#[derive(Debug)]
pub struct SubmissionFile {
    pub path: PathBuf,
    pub upload_name: String,
    pub file: File,
}

impl SubmissionFile {
    fn open(path: &Path, upload_name: String) -> Option<Self> {
        match File::open(path) {
            Ok(file) => Some(SubmissionFile {
                path: path.to_path_buf(),
                upload_name,
                file,
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open file, skipping");
                None
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    // Lossy decoding keeps a leading '.' even when the rest is not UTF-8.
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Collect every file named by `paths`.
pub fn collect<S: AsRef<str>>(paths: &[S], recursive: bool) -> Vec<SubmissionFile> {
    let unique: BTreeSet<&str> = paths.iter().map(|p| p.as_ref()).collect();
    let mut files = Vec::new();

    for raw in unique {
        let path = Path::new(raw);
        let metadata = match path.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not access path, skipping");
                continue;
            }
        };

        if metadata.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| raw.to_string());
            files.extend(SubmissionFile::open(path, name));
        } else if metadata.is_dir() {
            collect_dir(path, recursive, &mut files);
        }
    }

    files
}

fn collect_dir(root: &Path, recursive: bool, files: &mut Vec<SubmissionFile>) {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        // The root was named explicitly, so only entries below it can be hidden.
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let at = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                warn!(path = %at, error = %e, "could not access directory entry, skipping");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.extend(SubmissionFile::open(entry.path(), name));
    }
}
