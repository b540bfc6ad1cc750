use std::fmt;

use serde::Serialize;

/// A user-visible failure, kept so the view can show it and copy it for support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// What was being attempted, e.g. "download whisper-small".
    pub context: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Plain-text form handed to the clipboard.
    pub fn copy_text(&self) -> String {
        format!(
            "VoxDesk {} error\ncontext: {}\nmessage: {}",
            env!("CARGO_PKG_VERSION"),
            self.context,
            self.message
        )
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_text_contains_context_and_message() {
        let report = ErrorReport::new("download m3", "disk full");
        let text = report.copy_text();
        assert!(text.contains("context: download m3"));
        assert!(text.contains("message: disk full"));
        assert_eq!(report.to_string(), "download m3: disk full");
    }
}
