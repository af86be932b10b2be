use std::io::{self, Write};

use serde::Serialize;

use crate::error::AppResult;

pub fn print<T: Serialize>(value: &T) -> AppResult<()> {
    write(&mut io::stdout().lock(), value)
}

/// One pretty document followed by a newline, so reports can be piped
/// straight into `jq`.
pub fn write<W: Write, T: Serialize>(writer: &mut W, value: &T) -> AppResult<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}
