use std::io::{self, Write};

use crate::error::AppResult;

use super::ProgressReporter;

/// Prints to stdout with any live bars lifted out of the way first.
pub fn print_line(progress: &ProgressReporter, line: &str) -> AppResult<()> {
    progress.suspend(|| writeln!(io::stdout().lock(), "{line}"))?;
    Ok(())
}
