//! Append-only XML audit log.
//!
//! Each entry looks like:
//!
//! ```text
//! <!-- 2024-03-01 10:00:00 +01:00 OUT [JSESSIONID=abc] ==================== -->
//! <epp>...</epp>
//! <!-- END -->
//! ```
//!
//! While a capture is active, entries go to an in-memory buffer instead of
//! the file; the caller then either commits or discards the buffer.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use super::CookieSet;
use crate::error::Result;

/// Traffic direction of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Request sent to the registry
    Out,
    /// Response received
    In,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Out => "OUT",
            Self::In => "IN",
        }
    }
}

/// Audit log sink.
#[derive(Debug, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
    capture: Option<String>,
}

impl AuditLog {
    /// Log to `path`, or nowhere when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            capture: None,
        }
    }

    /// Log file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one message.
    pub fn record(&mut self, direction: Direction, cookies: &CookieSet, body: &str) -> Result<()> {
        let entry = format!(
            "\n<!-- {} {} {} ==================== -->\n{}\n<!-- END -->\n",
            Local::now().format("%Y-%m-%d %H:%M:%S %:z"),
            direction.as_str(),
            cookies,
            body
        );

        if let Some(buffer) = self.capture.as_mut() {
            buffer.push_str(&entry);
            Ok(())
        } else {
            self.append(&entry)
        }
    }

    /// Redirect entries into a buffer until [`AuditLog::end_capture`].
    pub fn begin_capture(&mut self) {
        self.capture.get_or_insert_with(String::new);
    }

    /// Whether a capture is active.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Stop capturing; write the buffer to the file when `commit`, else drop it.
    pub fn end_capture(&mut self, commit: bool) -> Result<()> {
        match self.capture.take() {
            Some(buffer) if commit => self.append(&buffer),
            Some(buffer) => {
                tracing::trace!(bytes = buffer.len(), "Discarding captured audit entries");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn append(&self, text: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_framing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xml.log");
        let mut log = AuditLog::new(Some(path.clone()));
        let cookies = CookieSet::from_set_cookie(["sid=1"]);

        log.record(Direction::Out, &cookies, "<epp/>").unwrap();
        log.record(Direction::In, &cookies, "<epp>ok</epp>").unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains(" OUT [sid=1] ==================== -->\n<epp/>\n<!-- END -->"));
        assert!(text.contains(" IN [sid=1] "));
        assert_eq!(text.matches("<!-- END -->").count(), 2);
    }

    #[test]
    fn test_capture_discard_and_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xml.log");
        let mut log = AuditLog::new(Some(path.clone()));
        let cookies = CookieSet::new();

        log.begin_capture();
        log.record(Direction::Out, &cookies, "<dropped/>").unwrap();
        assert!(!path.exists());
        log.end_capture(false).unwrap();
        assert!(!path.exists());

        log.begin_capture();
        log.record(Direction::Out, &cookies, "<kept/>").unwrap();
        log.end_capture(true).unwrap();
        assert!(!log.is_capturing());

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("<kept/>"));
        assert!(!text.contains("<dropped/>"));
    }

    #[test]
    fn test_no_path_is_silent() {
        let mut log = AuditLog::new(None);
        log.record(Direction::In, &CookieSet::new(), "<epp/>").unwrap();
        assert!(log.path().is_none());
    }
}
