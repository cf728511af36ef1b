//! Structured Feedback Module
//!
//! Machine-readable diagnostics for tooling. `xis check --json` prints a
//! [`CheckReport`] holding one [`ErrorReport`] per error found.

use crate::utils::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

// ==================== Structured Error Report ====================

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code (e.g., "E0002")
    pub code: String,

    pub severity: Severity,

    /// The bare message, without the line suffix
    pub message: String,

    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    /// 0 when the phase only tracks lines
    pub column: usize,
}

/// Stable code for each error phase
pub fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Lex => "E0001",
        ErrorKind::Parse => "E0002",
        ErrorKind::Runtime => "E0003",
    }
}

impl ErrorReport {
    /// Create an error report from a script error
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        let column = error.span().map_or(0, |s| s.column);
        Self {
            code: error_code(error.kind()).to_string(),
            severity: Severity::Error,
            message: error.message().to_string(),
            location: Location {
                file: file_name.to_string(),
                line: error.line(),
                column,
            },
        }
    }

    /// One-line human rendering: `file:line:column: code: message`
    pub fn render(&self) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            self.location.file, self.location.line, self.location.column, self.code, self.message
        )
    }
}

// ==================== Check Report ====================

/// Result of checking one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub file: String,
    pub success: bool,
    pub errors: Vec<ErrorReport>,
}

impl CheckReport {
    pub fn new(file: impl Into<String>, errors: &[Error]) -> Self {
        let file = file.into();
        let errors: Vec<ErrorReport> = errors.iter().map(|e| ErrorReport::from_error(e, &file)).collect();
        Self { success: errors.is_empty(), file, errors }
    }

    /// Output as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Parser;
    use crate::frontend::tokenize;
    use crate::utils::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_codes_follow_phase() {
        let lex = ErrorReport::from_error(&Error::lex("Unterminated string", Span::new(3, 8, 2, 4)), "a.xis");
        assert_eq!(lex.code, "E0001");
        assert_eq!(lex.location, Location { file: "a.xis".into(), line: 2, column: 4 });

        let runtime = ErrorReport::from_error(&Error::runtime("Maximum call depth of 200 exceeded", 9), "a.xis");
        assert_eq!(runtime.code, "E0003");
        assert_eq!(runtime.location.column, 0);
        assert_eq!(runtime.render(), "a.xis:9:0: E0003: Maximum call depth of 200 exceeded");
    }

    #[test]
    fn test_check_report_collects_recovered_errors() {
        let tokens = tokenize("local = 1\nx = 2\nlocal = 3").unwrap();
        let (_, errors) = Parser::new(tokens).parse_with_recovery();
        let report = CheckReport::new("broken.xis", &errors);

        assert!(!report.success);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.code == "E0002"));
        assert_eq!(report.errors[1].location.line, 3);
    }

    #[test]
    fn test_json_shape() {
        let report = CheckReport::new("ok.xis", &[]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "file": "ok.xis", "success": true, "errors": [] }));

        let failed = CheckReport::new("bad.xis", &[Error::parse("Expected expression", Span::new(0, 1, 1, 1))]);
        let json: serde_json::Value = serde_json::from_str(&failed.to_json().unwrap()).unwrap();
        assert_eq!(json["errors"][0]["severity"], "error");
        assert_eq!(json["errors"][0]["message"], "Expected expression");
    }
}
