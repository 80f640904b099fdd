//! Exit codes for the rt-core CLI.
//!
//! Exit codes communicate run outcome without requiring output parsing.

/// Exit codes for rt-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success: at least one geography produced results.
    Clean = 0,

    /// Configuration is missing, unreadable, or invalid.
    ConfigError = 2,

    /// Input or output I/O failed.
    IoError = 3,

    /// Run completed but no geography produced a result.
    NoResults = 4,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
