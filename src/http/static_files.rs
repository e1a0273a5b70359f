//! Static file mounts.
//!
//! # Responsibilities
//! - Keep URL prefix → directory mounts in registration order
//! - Resolve a request path to a file under the first matching mount
//! - Read the file and type it by extension
//!
//! # Design Decisions
//! - A matching prefix bypasses routing entirely, whatever the method
//! - Paths with `..` segments are treated as missing

use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use axum::http::StatusCode;

use crate::http::error::DispatchError;
use crate::http::response::{guess_mime, Response, ResponseBody};

/// One URL prefix served from a directory.
#[derive(Debug, Clone)]
pub struct StaticMount {
    prefix: String,
    directory: PathBuf,
}

impl StaticMount {
    pub fn new(prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            directory: directory.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Ordered set of mounts.
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
    mounts: Vec<StaticMount>,
}

impl StaticFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, mount: StaticMount) {
        tracing::debug!(prefix = %mount.prefix, directory = %mount.directory.display(), "Static mount registered");
        self.mounts.push(mount);
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// The filesystem path for `path` under the first mount whose prefix it
    /// starts with, or `None` when no mount claims it. `Some(None)` means a
    /// mount claimed the path but it escapes the mounted directory.
    pub fn resolve(&self, path: &str) -> Option<Option<PathBuf>> {
        let mount = self.mounts.iter().find(|m| path.starts_with(&m.prefix))?;
        let relative = path[mount.prefix.len()..].trim_start_matches('/');
        let relative = Path::new(relative);

        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        Some(safe.then(|| mount.directory.join(relative)))
    }

    /// Serve `path` if a mount claims it.
    pub async fn serve(&self, path: &str) -> Option<Result<Response, DispatchError>> {
        let file = self.resolve(path)?;
        Some(read_file(file).await)
    }
}

async fn read_file(file: Option<PathBuf>) -> Result<Response, DispatchError> {
    let file = file.ok_or(DispatchError::FileNotFound)?;
    match tokio::fs::metadata(&file).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Err(DispatchError::FileNotFound),
    }

    let content = tokio::fs::read(&file).await.map_err(|e| {
        tracing::warn!(path = %file.display(), error = %e, "Static file read failed");
        DispatchError::Io(e)
    })?;

    Ok(Response::new(StatusCode::OK)
        .with_content_type(guess_mime(&file))
        .with_body(ResponseBody::Bytes(Bytes::from(content))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(dir: &Path) -> StaticFiles {
        let mut files = StaticFiles::new();
        files.mount(StaticMount::new("/assets", dir.join("a")));
        files.mount(StaticMount::new("/assets/special", dir.join("b")));
        files
    }

    #[test]
    fn first_mount_claims_path() {
        let dir = Path::new("/srv");
        let resolved = files(dir).resolve("/assets/special/x.css").unwrap().unwrap();
        assert_eq!(resolved, dir.join("a").join("special/x.css"));
        assert!(files(dir).resolve("/other").is_none());
    }

    #[test]
    fn parent_segments_are_refused() {
        let resolved = files(Path::new("/srv")).resolve("/assets/../secret").unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn serves_existing_file_with_mime() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("a/site.css"), "p { margin: 0 }").unwrap();

        let response = files(dir.path()).serve("/assets/site.css").await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.body_bytes().as_ref(), b"p { margin: 0 }");
    }

    #[tokio::test]
    async fn missing_file_and_directory_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();

        let files = files(dir.path());
        let missing = files.serve("/assets/none.txt").await.unwrap();
        assert!(matches!(missing, Err(DispatchError::FileNotFound)));

        let directory = files.serve("/assets").await.unwrap();
        assert!(matches!(directory, Err(DispatchError::FileNotFound)));
    }
}
