//! Forensic capture of failed responses.
//!
//! Every failed observation produces a [`FailureArtifact`] after the
//! counters have been updated. Sinks are best effort: the engine logs a
//! failed write and carries on.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Detail captured for one failed observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureArtifact {
    pub host: String,
    pub label: String,
    pub time: DateTime<Utc>,
    pub user: Option<String>,
    pub failure_count: u32,
    pub message_count: u32,
    pub errors: String,
    pub response_headers: String,
    pub response_body: String,
}

/// Destination for failure artifacts.
pub trait ArtifactSink: Send + Sync {
    fn persist(&self, artifact: &FailureArtifact) -> io::Result<()>;
}

/// Writes one `{yyyyMMdd.HHmmss.SSS}.{host}.response` file per artifact.
#[derive(Debug, Clone)]
pub struct ResponseFileSink {
    dir: PathBuf,
}

impl ResponseFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the artifact is written to.
    pub fn path_for(&self, artifact: &FailureArtifact) -> PathBuf {
        let stamp = artifact.time.format("%Y%m%d.%H%M%S%.3f");
        self.dir.join(format!("{stamp}.{}.response", artifact.host))
    }
}

impl ArtifactSink for ResponseFileSink {
    fn persist(&self, artifact: &FailureArtifact) -> io::Result<()> {
        let path = self.path_for(artifact);
        let mut out = BufWriter::new(File::create(&path)?);

        writeln!(out, "Sampler Label: {}", artifact.label)?;
        writeln!(out, "User: {}", artifact.user.as_deref().unwrap_or("-"))?;
        writeln!(out, "Consecutive Error Count: {}", artifact.failure_count)?;
        writeln!(out, "Sent Message Count: {}", artifact.message_count)?;
        writeln!(out, "Error Messages: {}", artifact.errors)?;
        writeln!(out, "{RULE}")?;
        write!(out, "{}", artifact.response_headers)?;
        writeln!(out, "{RULE}")?;
        write!(out, "{}", artifact.response_body)?;
        out.flush()?;

        debug!(path = %path.display(), "saved failed response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn artifact() -> FailureArtifact {
        FailureArtifact {
            host: "web-1".to_string(),
            label: "login".to_string(),
            time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
                + chrono::Duration::milliseconds(42),
            user: Some("jdoe".to_string()),
            failure_count: 3,
            message_count: 1,
            errors: "Response code was '500' - 'Internal Server Error'".to_string(),
            response_headers: "HTTP/1.1 500\n".to_string(),
            response_body: "<html>oops</html>".to_string(),
        }
    }

    #[test]
    fn file_name_encodes_time_and_host() {
        let sink = ResponseFileSink::new("/var/log/hostwatch");
        assert_eq!(
            sink.path_for(&artifact()),
            Path::new("/var/log/hostwatch/20240301.123005.042.web-1.response")
        );
    }

    #[test]
    fn writes_counts_headers_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ResponseFileSink::new(dir.path());
        let artifact = artifact();

        sink.persist(&artifact).unwrap();

        let content = std::fs::read_to_string(sink.path_for(&artifact)).unwrap();
        assert!(content.starts_with("Sampler Label: login\nUser: jdoe\n"));
        assert!(content.contains("Consecutive Error Count: 3\n"));
        assert!(content.contains("Sent Message Count: 1\n"));
        assert!(content.contains("HTTP/1.1 500\n"));
        assert!(content.ends_with("<html>oops</html>"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let sink = ResponseFileSink::new("/nonexistent/hostwatch/artifacts");
        assert!(sink.persist(&artifact()).is_err());
    }
}
