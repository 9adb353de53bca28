//! Fail-fast reporting for unrecoverable errors
//!
//! Binaries route setup failures here: the error is logged, shown to the user
//! through an [`ErrorDisplay`] and the process is aborted.

use std::error::Error;
use std::panic::Location;

/// Somewhere to show a fatal message before the process dies
pub trait ErrorDisplay {
    fn show(&mut self, message: &str);
}

/// Writes fatal messages to standard error
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrDisplay;

impl ErrorDisplay for StderrDisplay {
    fn show(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Formats an error, its source chain and where it was caught
pub fn report(err: &dyn Error, location: &Location<'_>) -> String {
    let mut message = format!("fatal error at {}:{}\n  {err}", location.file(), location.line());
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {cause}"));
        source = cause.source();
    }
    message
}

/// Logs `err`, shows it on `display` and aborts the process
pub fn abort(err: &dyn Error, location: &Location<'_>, display: &mut dyn ErrorDisplay) -> ! {
    let message = report(err, location);
    log::error!("{message}");
    display.show(&message);
    std::process::abort()
}

/// Unwraps a `Result` or aborts through [`abort`]
pub trait OrAbort<T> {
    fn or_abort(self, display: &mut dyn ErrorDisplay) -> T;
}

impl<T, E: Error> OrAbort<T> for Result<T, E> {
    #[track_caller]
    fn or_abort(self, display: &mut dyn ErrorDisplay) -> T {
        match self {
            Ok(value) => value,
            Err(err) => abort(&err, Location::caller(), display),
        }
    }
}
