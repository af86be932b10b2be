pub mod json;
pub mod log_writer;
pub mod progress;
pub mod text;

use serde::Serialize;

use crate::error::AppResult;

pub use progress::ProgressReporter;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
    Quiet,
}

/// Where command summaries go. Text mode prints human-readable lines; JSON
/// mode prints one pretty JSON document per summary instead.
#[derive(Debug, Clone)]
pub struct Output {
    mode: OutputMode,
    progress: ProgressReporter,
}

impl Output {
    pub fn new(json: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        Self {
            mode,
            progress: ProgressReporter::new(),
        }
    }

    /// Prints nothing at all. Used by tests.
    pub fn quiet() -> Self {
        Self {
            mode: OutputMode::Quiet,
            progress: ProgressReporter::hidden(),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn emit<T: Serialize>(&self, text_line: &str, json_value: &T) -> AppResult<()> {
        match self.mode {
            OutputMode::Text => text::print_line(&self.progress, text_line),
            OutputMode::Json => json::print(json_value),
            OutputMode::Quiet => Ok(()),
        }
    }

    /// Text-only detail such as ranked tables; suppressed in JSON mode.
    pub fn lines<I, S>(&self, lines: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.mode == OutputMode::Text {
            for line in lines {
                text::print_line(&self.progress, line.as_ref())?;
            }
        }
        Ok(())
    }
}
