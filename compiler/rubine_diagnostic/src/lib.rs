//! Diagnostic system for rich error reporting.
//!
//! Every phase of the front end reports problems the same way:
//! - Error codes for searchability
//! - Clear messages (what went wrong)
//! - Primary span (where it went wrong)
//! - Context labels (why it's wrong)
//! - Suggestions (how to fix)
//!
//! Diagnostics are collected into a [`DiagnosticQueue`], which handles
//! error limits, same-line deduplication, and position sorting before
//! anything is shown to the user.

mod diagnostic;
mod error_code;
pub mod queue;
pub mod span_utils;

pub use diagnostic::{
    Applicability, Diagnostic, Label, Severity, Substitution, Suggestion,
};
pub use error_code::ErrorCode;
pub use queue::DiagnosticQueue;
