//! Process exit codes
//!
//! The mapping from a command's outcome to an exit status happens once, in
//! `main`. Commands only return errors.

use bt_core::Error;

use crate::output::Formatter;

/// Exit status of the `bt` process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Command completed
    Success = 0,
    /// Any error raised while running a command
    Failure = 100,
    /// Usage or help was printed instead of running a command
    Usage = 200,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a command outcome to an exit code
    pub fn from_result(result: &anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => ExitCode::Success,
            Err(_) => ExitCode::Failure,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}

/// How much of an error to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    SummaryOnly,
    FullDetail,
}

/// User errors only ever get a summary; internal errors always get detail;
/// everything else follows the debug flag
pub fn error_verbosity(error: &anyhow::Error, debug_output: bool) -> Verbosity {
    match error.downcast_ref::<Error>() {
        Some(e) if e.is_user_error() => Verbosity::SummaryOnly,
        Some(Error::Internal(_)) => Verbosity::FullDetail,
        _ if debug_output => Verbosity::FullDetail,
        _ => Verbosity::SummaryOnly,
    }
}

/// Top-level handler: report the outcome and pick the exit code
pub fn finish(result: anyhow::Result<()>, debug_output: bool, formatter: &Formatter) -> ExitCode {
    let code = ExitCode::from_result(&result);
    if let Err(error) = result {
        formatter.error(&format!("Command failed: {error:#}"));
        if error_verbosity(&error, debug_output) == Verbosity::FullDetail {
            formatter.detail(&format!("{error:?}"));
        }
    }
    code
}
