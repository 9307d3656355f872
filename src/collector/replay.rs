//! Recorded event captures.
//!
//! A capture is JSON Lines, one [`SourcedEvent`] per line:
//!
//! ```text
//! # lid closes, then opens
//! {"src":0,"type":3,"code":25,"value":1}
//! {"src":0,"type":0,"code":0,"value":0}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::collector::types::SourcedEvent;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("capture file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a capture from text.
pub fn parse_capture(text: &str) -> Result<Vec<SourcedEvent>, ReplayError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim()).map_err(|source| ReplayError::Parse {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Load a capture file.
pub fn load_capture(path: &Path) -> Result<Vec<SourcedEvent>, ReplayError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_capture(&text)
}

/// Render events as a capture, one JSON object per line.
pub fn write_capture(events: &[SourcedEvent]) -> String {
    events
        .iter()
        .filter_map(|e| serde_json::to_string(e).ok())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write events to a capture file that `load_capture` reads back.
pub fn save_capture(path: &Path, events: &[SourcedEvent]) -> Result<(), ReplayError> {
    let mut text = write_capture(events);
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text).map_err(|source| ReplayError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::types::RawEvent;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let text = "# header\n\n{\"src\":0,\"type\":3,\"code\":25,\"value\":1}\n  \n{\"src\":1,\"type\":0,\"code\":0,\"value\":0}\n";
        let events = parse_capture(text).unwrap();
        assert_eq!(
            events,
            vec![
                SourcedEvent::new(0, RawEvent::distance(1)),
                SourcedEvent::new(1, RawEvent::sync()),
            ]
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let text = "{\"src\":0,\"type\":3,\"code\":25,\"value\":1}\n# ok\nnot json\n";
        match parse_capture(text) {
            Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_load_written_capture() {
        let events = vec![
            SourcedEvent::new(0, RawEvent::distance(0)),
            SourcedEvent::new(0, RawEvent::sync()),
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        std::fs::write(&path, write_capture(&events)).unwrap();

        assert_eq!(load_capture(&path).unwrap(), events);
    }

    #[test]
    fn test_saved_capture_ends_with_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");
        let events = vec![SourcedEvent::new(2, RawEvent::sync())];
        save_capture(&path, &events).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\"src\":2,\"type\":0,\"code\":0,\"value\":0}\n");
        assert_eq!(load_capture(&path).unwrap(), events);
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let err = save_capture(Path::new("/nonexistent/dir/capture.jsonl"), &[]).unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_capture(Path::new("/nonexistent/capture.jsonl")).unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }
}
