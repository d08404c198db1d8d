//! Diagnostic queue for collecting, deduplicating, and sorting diagnostics.
//!
//! Features:
//! - Error limits to prevent overwhelming output
//! - Deduplication of repeated errors with the same code and location
//! - Position sorting before output
//!
//! Positions are byte offsets from the primary span; rendering converts
//! them to line/column via [`crate::span_utils`] once the source is at hand.

use crate::{Diagnostic, ErrorCode};

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of errors before stopping (0 = unlimited).
    pub error_limit: usize,
    /// Deduplicate diagnostics with the same code and primary location.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            error_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing and batch analysis).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            error_limit: 0,
            deduplicate: false,
        }
    }
}

/// Queued diagnostic with its sort key.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct QueuedDiagnostic {
    diagnostic: Diagnostic,
    /// Byte offset of the primary label, `u32::MAX` if the diagnostic has
    /// no primary span (sorts last).
    offset: u32,
}

/// Queue for collecting, deduplicating, and sorting diagnostics.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<QueuedDiagnostic>,
    error_count: usize,
    /// Last (offset, code) of an error, for dedup.
    last_error: Option<(u32, ErrorCode)>,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    /// Create a new diagnostic queue with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a diagnostic queue with custom configuration.
    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            config,
            ..Self::default()
        }
    }

    /// Add a diagnostic to the queue.
    ///
    /// Returns `true` if the diagnostic was added, `false` if it was filtered
    /// by the error limit or deduplication.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if self.config.error_limit > 0 && self.error_count >= self.config.error_limit {
            return false;
        }

        let offset = diag.primary_span().map_or(u32::MAX, |s| s.start);
        let is_error = diag.is_error();

        if self.config.deduplicate && is_error && self.last_error == Some((offset, diag.code)) {
            return false;
        }

        if is_error {
            self.last_error = Some((offset, diag.code));
            self.error_count += 1;
        }

        self.diagnostics.push(QueuedDiagnostic {
            diagnostic: diag,
            offset,
        });
        true
    }

    /// Append a diagnostic past the error limit and deduplication.
    ///
    /// The cap notice itself arrives once the limit has already been hit,
    /// so it cannot go through [`Self::push`].
    pub fn push_unfiltered(&mut self, diag: Diagnostic) {
        let offset = diag.primary_span().map_or(u32::MAX, |s| s.start);
        self.diagnostics.push(QueuedDiagnostic {
            diagnostic: diag,
            offset,
        });
    }

    /// Check if the error limit has been reached.
    pub fn limit_reached(&self) -> bool {
        self.config.error_limit > 0 && self.error_count >= self.config.error_limit
    }

    /// Get the number of errors collected (warnings excluded).
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of queued diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Sort diagnostics by position and return them.
    ///
    /// Clears the queue after flushing. Skips sorting if already in order,
    /// the common case for a single forward pass over one file.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        let already_sorted = self
            .diagnostics
            .windows(2)
            .all(|w| w[0].offset <= w[1].offset);

        if !already_sorted {
            self.diagnostics.sort_by_key(|d| d.offset);
        }

        let result: Vec<Diagnostic> = self.diagnostics.drain(..).map(|d| d.diagnostic).collect();

        self.error_count = 0;
        self.last_error = None;

        result
    }

    /// Get diagnostics without clearing the queue.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|d| &d.diagnostic)
    }
}

/// Create a "too many errors" diagnostic.
///
/// Carries no label so it sorts after every located diagnostic on flush.
#[cold]
pub fn too_many_errors(limit: usize) -> Diagnostic {
    Diagnostic::error(ErrorCode::E9002)
        .with_message(format!("aborting due to {limit} previous errors"))
        .with_note("use --error-limit to increase the limit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rubine_ir::Span;

    fn error_at(code: ErrorCode, span: Span) -> Diagnostic {
        Diagnostic::error(code)
            .with_message("boom")
            .with_label(span, "here")
    }

    #[test]
    fn flush_sorts_by_offset() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
        queue.push(error_at(ErrorCode::E4001, Span::new(10, 12)));
        queue.push(error_at(ErrorCode::E4002, Span::new(0, 2)));
        queue.push(error_at(ErrorCode::E4003, Span::new(5, 7)));

        let codes: Vec<ErrorCode> = queue.flush().into_iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![ErrorCode::E4002, ErrorCode::E4003, ErrorCode::E4001]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn same_offset_same_code_deduplicated() {
        let mut queue = DiagnosticQueue::new();
        assert!(queue.push(error_at(ErrorCode::E4001, Span::new(3, 4))));
        assert!(!queue.push(error_at(ErrorCode::E4001, Span::new(3, 4))));
        assert!(queue.push(error_at(ErrorCode::E4002, Span::new(3, 4))));
        assert_eq!(queue.error_count(), 2);
    }

    #[test]
    fn error_limit_stops_collection() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
            error_limit: 2,
            deduplicate: false,
        });
        assert!(queue.push(error_at(ErrorCode::E4001, Span::new(0, 1))));
        assert!(queue.push(error_at(ErrorCode::E4001, Span::new(2, 3))));
        assert!(queue.limit_reached());
        assert!(!queue.push(error_at(ErrorCode::E4001, Span::new(4, 5))));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn cap_notice_is_recorded_past_the_limit() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
            error_limit: 2,
            deduplicate: false,
        });
        queue.push(error_at(ErrorCode::E4001, Span::new(0, 1)));
        queue.push(error_at(ErrorCode::E4001, Span::new(2, 3)));
        assert!(!queue.push(error_at(ErrorCode::E4001, Span::new(4, 5))));
        queue.push_unfiltered(too_many_errors(2));

        let codes: Vec<ErrorCode> = queue.flush().into_iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![ErrorCode::E4001, ErrorCode::E4001, ErrorCode::E9002]
        );
    }

    #[test]
    fn warnings_do_not_count_toward_limit() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
            error_limit: 1,
            deduplicate: false,
        });
        let warn = Diagnostic::warning(ErrorCode::E4004)
            .with_message("duplicate key")
            .with_label(Span::new(0, 1), "here");
        assert!(queue.push(warn.clone()));
        assert!(queue.push(warn));
        assert_eq!(queue.error_count(), 0);
        assert!(!queue.limit_reached());
    }

    #[test]
    fn missing_primary_span_sorts_last() {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
        queue.push(Diagnostic::error(ErrorCode::E9001).with_message("internal"));
        queue.push(error_at(ErrorCode::E4001, Span::new(0, 1)));
        let codes: Vec<ErrorCode> = queue.flush().into_iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![ErrorCode::E4001, ErrorCode::E9001]);
    }
}
