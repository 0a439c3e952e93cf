// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Positioned diagnostics and their console rendering.
//!
//! Two layouts are supported. The compact one mirrors `tsc`:
//!
//! ```text
//! main.ts(3,5): error TS2304: Cannot find name 'foo'.
//! ```
//!
//! The context layout prints the offending line with a caret under the column,
//! using [`Source::message`](crate::lexer::Source::message).

use crate::lexer::Span;

use core::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Error,
    Warning,
    Message,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Error => "error",
            Category::Warning => "warning",
            Category::Message => "message",
        })
    }
}

#[derive(Clone)]
pub struct Diagnostic {
    pub span: Option<Span>,
    pub category: Category,
    pub code: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Option<Span>, code: u32, message: &str) -> Self {
        Self {
            span,
            category: Category::Error,
            code,
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == Category::Error
    }

    /// `file(line,col): error TSxxxx: message`, the file relative to `current_dir`.
    pub fn to_compact_string(&self, current_dir: &Path) -> String {
        let prefix = match &self.span {
            Some(span) => format!(
                "{}({},{}): ",
                relative_display(span.source.file(), current_dir),
                span.line,
                span.col
            ),
            None => String::new(),
        };
        format!(
            "{prefix}{} TS{}: {}",
            self.category, self.code, self.message
        )
    }

    pub fn to_context_string(&self) -> String {
        let kind = format!("{} TS{}", self.category, self.code);
        match &self.span {
            Some(span) => span.message(&kind, &self.message),
            None => format!("{kind}: {}", self.message),
        }
    }

    fn sort_key(&self) -> (String, u32, u32, String) {
        match &self.span {
            Some(span) => (
                span.source.file().to_string_lossy().into_owned(),
                span.start,
                self.code,
                self.message.clone(),
            ),
            None => (String::new(), 0, self.code, self.message.clone()),
        }
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(
                f,
                "{}({},{}): TS{} {}",
                span.source.file().display(),
                span.line,
                span.col,
                self.code,
                self.message
            ),
            None => write!(f, "TS{} {}", self.code, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_context_string())
    }
}

impl std::error::Error for Diagnostic {}

/// Orders diagnostics by file and position and drops exact duplicates.
pub fn sort_and_deduplicate(diagnostics: &mut Vec<Diagnostic>) {
    diagnostics.sort_by_key(|d| d.sort_key());
    diagnostics.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

/// Formats diagnostics one per line in `tsc` layout.
pub fn format_diagnostics(diagnostics: &[Diagnostic], current_dir: &Path) -> String {
    let mut out = String::new();
    for d in diagnostics {
        out.push_str(&d.to_compact_string(current_dir));
        out.push('\n');
    }
    out
}

/// Formats diagnostics with the offending source line and a caret.
pub fn format_diagnostics_with_context(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for d in diagnostics {
        out.push_str(&d.to_context_string());
        out.push('\n');
    }
    out
}

pub(crate) fn relative_display(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
