// ============================================================================
// reframe-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reports core errors as they are. `cli_context` prefixes a message
// with what the CLI was doing while keeping the error kind intact, so the
// printed line still names the failure kind first.

use reframe_core::{CoreError, CoreResult};

use std::fmt;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

fn prefixed(error: CoreError, context: impl fmt::Display) -> CoreError {
    let wrap = |message: String| format!("{}: {}", context, message);
    match error {
        CoreError::Configuration(m) => CoreError::Configuration(wrap(m)),
        CoreError::SourceRead(m) => CoreError::SourceRead(wrap(m)),
        CoreError::ResourceExhausted(m) => CoreError::ResourceExhausted(wrap(m)),
        CoreError::TimecodeFormat(m) => CoreError::TimecodeFormat(wrap(m)),
        CoreError::ReconciliationOverflow(m) => CoreError::ReconciliationOverflow(wrap(m)),
        CoreError::Scheduling(m) => CoreError::Scheduling(wrap(m)),
        CoreError::ContainerWrite(m) => CoreError::ContainerWrite(wrap(m)),
        other => other,
    }
}

/// Extension trait for adding context to errors in the CLI.
pub trait CliErrorContext<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| prefixed(e.into(), context))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| prefixed(e.into(), f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_the_error_kind() {
        let result: CoreResult<()> = Err(CoreError::Configuration("bad option".to_string()));
        let err = result.cli_context("input 'a.json'").unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: input 'a.json': bad option");
    }

    #[test]
    fn io_errors_pass_through() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result.cli_with_context(|| "reading").unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
