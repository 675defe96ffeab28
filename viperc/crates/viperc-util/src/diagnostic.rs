//! Error and warning reporting.
//!
//! The [`Diagnostics`] handler collects everything the compiler has to
//! say about a source file and renders each report with the offending
//! line and a caret underline:
//!
//! ```text
//! demo.vpr:3:13: error: expected primary expression, found ';'
//!     let i32 a = ;
//!                 ^
//! ```
//!
//! Reporting never aborts the pipeline; phases keep going where they
//! can and the driver checks [`Diagnostics::had_errors`] before code
//! generation.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that prevents code generation.
    Error,
    /// A warning; compilation still succeeds.
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// A stable identifier for a diagnostic, e.g. `E0101`.
///
/// The `name` doubles as the key for warning toggles
/// (`-Wunused-variable` / `-Wno-unused-variable`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    /// "E" for errors, "W" for warnings.
    pub prefix: &'static str,
    /// Numeric identifier within the prefix.
    pub number: u32,
    /// Kebab-case name, used in warning flags.
    pub name: &'static str,
}

impl DiagnosticCode {
    #[inline]
    pub const fn new(prefix: &'static str, number: u32, name: &'static str) -> Self {
        Self {
            prefix,
            number,
            name,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", self.prefix, self.number)
    }
}

// Lexical errors.
pub const E_UNEXPECTED_CHAR: DiagnosticCode = DiagnosticCode::new("E", 1, "unexpected-character");
pub const E_UNTERMINATED_STRING: DiagnosticCode =
    DiagnosticCode::new("E", 2, "unterminated-string");
pub const E_UNKNOWN_ESCAPE: DiagnosticCode = DiagnosticCode::new("E", 3, "unknown-escape");
pub const E_INT_OVERFLOW: DiagnosticCode = DiagnosticCode::new("E", 4, "integer-overflow");

// Syntactic errors.
pub const E_UNEXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new("E", 101, "unexpected-token");
pub const E_EXPECTED_TOKEN: DiagnosticCode = DiagnosticCode::new("E", 102, "expected-token");

// Name resolution errors.
pub const E_UNDECLARED: DiagnosticCode = DiagnosticCode::new("E", 201, "undeclared-identifier");
pub const E_REDECLARATION: DiagnosticCode = DiagnosticCode::new("E", 202, "redeclaration");

// Type errors.
pub const E_UNKNOWN_TYPE: DiagnosticCode = DiagnosticCode::new("E", 301, "unknown-type");
pub const E_DUPLICATE_STRUCT: DiagnosticCode = DiagnosticCode::new("E", 302, "duplicate-struct");
pub const E_TYPE_MISMATCH: DiagnosticCode = DiagnosticCode::new("E", 303, "type-mismatch");
pub const E_INCOMPLETE_TYPE: DiagnosticCode = DiagnosticCode::new("E", 304, "incomplete-type");

// Warnings.
pub const W_UNUSED_VARIABLE: DiagnosticCode = DiagnosticCode::new("W", 1, "unused-variable");

/// Warnings that `set_warning` recognizes; unknown names are ignored.
const KNOWN_WARNINGS: &[&str] = &[W_UNUSED_VARIABLE.name];

/// A single collected report.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub code: Option<DiagnosticCode>,
}

/// Collector and renderer for compiler diagnostics.
///
/// Owns a copy of the source text so a report can be rendered with the
/// line it points into. Warnings default to enabled and are toggled by
/// name via [`Diagnostics::set_warning`].
///
/// # Examples
///
/// ```
/// use viperc_util::{Diagnostics, Span};
///
/// let mut diag = Diagnostics::new();
/// diag.set_file_name("demo.vpr");
/// diag.set_text("let i32 x = y;");
/// diag.report_error(Span::new(12, 13, 1, 13), "undeclared identifier 'y'");
/// assert!(diag.had_errors());
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    file_name: String,
    text: String,
    warning_overrides: FxHashMap<&'static str, bool>,
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source text reports are rendered against.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Set the file name used in report headers.
    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    /// Enable or disable a warning by name. Unknown names are ignored.
    pub fn set_warning(&mut self, enabled: bool, name: &str) {
        if let Some(known) = KNOWN_WARNINGS.iter().copied().find(|w| *w == name) {
            self.warning_overrides.insert(known, enabled);
        }
    }

    fn warning_enabled(&self, name: &str) -> bool {
        self.warning_overrides.get(name).copied().unwrap_or(true)
    }

    /// Report an error at `span`.
    pub fn report_error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: Level::Error,
            message: message.into(),
            span,
            code: None,
        });
    }

    /// Report an error carrying a stable code.
    pub fn report_error_with_code(
        &mut self,
        code: DiagnosticCode,
        span: Span,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            level: Level::Error,
            message: message.into(),
            span,
            code: Some(code),
        });
    }

    /// Report a warning, unless the named warning has been disabled.
    pub fn report_warning(&mut self, code: DiagnosticCode, span: Span, message: impl Into<String>) {
        if !self.warning_enabled(code.name) {
            return;
        }
        self.diagnostics.push(Diagnostic {
            level: Level::Warning,
            message: message.into(),
            span,
            code: Some(code),
        });
    }

    /// Returns true if any error has been reported.
    pub fn had_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// All collected diagnostics, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render one diagnostic as `file:line:col: level: message`, the
    /// source line, and a caret underline covering the span.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let span = diagnostic.span;
        if span.line == 0 {
            // Synthesized location; header only.
            return format!(
                "{}: {}: {}\n",
                self.file_name, diagnostic.level, diagnostic.message
            );
        }

        let mut out = format!(
            "{}:{}:{}: {}: {}\n",
            self.file_name, span.line, span.column, diagnostic.level, diagnostic.message
        );

        // Locate the line containing the span by scanning for the
        // nearest newlines around its start.
        let bytes = self.text.as_bytes();
        let anchor = span.start.min(self.text.len());
        let line_start = self.text[..anchor]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let line_end = bytes[anchor..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| anchor + i)
            .unwrap_or(self.text.len());

        let line = &self.text[line_start..line_end];
        out.push_str(line);
        out.push('\n');

        let caret_offset = anchor - line_start;
        let caret_len = span.len().max(1).min(line_end.saturating_sub(anchor).max(1));
        for _ in 0..caret_offset {
            out.push(' ');
        }
        for _ in 0..caret_len {
            out.push('^');
        }
        out.push('\n');
        out
    }

    /// Render every collected diagnostic.
    pub fn render_all(&self) -> String {
        self.diagnostics.iter().map(|d| self.render(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(text: &str) -> Diagnostics {
        let mut diag = Diagnostics::new();
        diag.set_file_name("test.vpr");
        diag.set_text(text);
        diag
    }

    #[test]
    fn test_level_display() {
        assert_eq!(format!("{}", Level::Error), "error");
        assert_eq!(format!("{}", Level::Warning), "warning");
    }

    #[test]
    fn test_code_display() {
        assert_eq!(format!("{}", E_UNEXPECTED_CHAR), "E0001");
        assert_eq!(format!("{}", W_UNUSED_VARIABLE), "W0001");
    }

    #[test]
    fn test_report_error_sets_had_errors() {
        let mut diag = handler("let");
        assert!(!diag.had_errors());
        diag.report_error(Span::new(0, 3, 1, 1), "boom");
        assert!(diag.had_errors());
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn test_warnings_do_not_set_had_errors() {
        let mut diag = handler("let i32 x;");
        diag.report_warning(W_UNUSED_VARIABLE, Span::new(8, 9, 1, 9), "unused variable 'x'");
        assert!(!diag.had_errors());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_disabled_warning_is_dropped() {
        let mut diag = handler("let i32 x;");
        diag.set_warning(false, "unused-variable");
        diag.report_warning(W_UNUSED_VARIABLE, Span::new(8, 9, 1, 9), "unused variable 'x'");
        assert_eq!(diag.warning_count(), 0);

        diag.set_warning(true, "unused-variable");
        diag.report_warning(W_UNUSED_VARIABLE, Span::new(8, 9, 1, 9), "unused variable 'x'");
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_unknown_warning_name_is_ignored() {
        let mut diag = handler("");
        diag.set_warning(false, "no-such-warning");
        // The known warning is unaffected.
        diag.report_warning(W_UNUSED_VARIABLE, Span::new(0, 0, 1, 1), "msg");
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn test_render_caret_line() {
        let mut diag = handler("let i32 a = ;\nlet i32 b = 1;");
        diag.report_error(Span::new(12, 13, 1, 13), "expected primary expression");
        let rendered = diag.render(&diag.diagnostics()[0]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines[0],
            "test.vpr:1:13: error: expected primary expression"
        );
        assert_eq!(lines[1], "let i32 a = ;");
        assert_eq!(lines[2], "            ^");
    }

    #[test]
    fn test_render_second_line() {
        let text = "let i32 a = 1;\nlet i32 b = c;";
        let mut diag = handler(text);
        let start = text.rfind('c').unwrap();
        diag.report_error(Span::new(start, start + 1, 2, 13), "undeclared identifier 'c'");
        let rendered = diag.render(&diag.diagnostics()[0]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "let i32 b = c;");
        assert_eq!(lines[2], "            ^");
    }

    #[test]
    fn test_render_dummy_span_has_no_snippet() {
        let mut diag = handler("text");
        diag.report_error(Span::DUMMY, "no input files");
        let rendered = diag.render(&diag.diagnostics()[0]);
        assert_eq!(rendered, "test.vpr: error: no input files\n");
    }

    #[test]
    fn test_render_span_at_end_of_text() {
        let mut diag = handler("\"abc");
        diag.report_error(Span::new(0, 4, 1, 1), "unterminated string literal");
        let rendered = diag.render(&diag.diagnostics()[0]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "\"abc");
        assert_eq!(lines[2], "^^^^");
    }
}
