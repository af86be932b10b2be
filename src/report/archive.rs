use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::api::models::MessageRecord;
use crate::error::AppResult;
use crate::mail::message_body;

const MISSING: &str = "N/A";

/// One archived message, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub date: String,
    pub body: String,
}

impl ArchiveEntry {
    pub fn from_record(record: &MessageRecord) -> Self {
        let header = |name: &str| record.header(name).unwrap_or(MISSING).to_string();

        Self {
            id: record.id.clone(),
            from: header("From"),
            subject: header("Subject"),
            date: header("Date"),
            body: record
                .payload
                .as_ref()
                .map(message_body)
                .unwrap_or_default(),
        }
    }
}

/// Appends delimited message records to one output, opened once per run.
#[derive(Debug)]
pub struct ArchiveWriter<W: Write> {
    out: W,
    written: usize,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Creates (or truncates) the archive file at `path`.
    pub fn create(path: &Path) -> AppResult<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write_entry(&mut self, entry: &ArchiveEntry) -> AppResult<()> {
        writeln!(self.out, "--- MESSAGE START ---")?;
        writeln!(self.out, "Message-ID: {}", entry.id)?;
        writeln!(self.out, "From: {}", entry.from)?;
        writeln!(self.out, "Subject: {}", entry.subject)?;
        writeln!(self.out, "Date: {}", entry.date)?;
        writeln!(self.out)?;
        self.out.write_all(entry.body.as_bytes())?;
        writeln!(self.out)?;
        writeln!(self.out, "--- MESSAGE END ---")?;
        writeln!(self.out)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_message(&mut self, record: &MessageRecord) -> AppResult<()> {
        self.write_entry(&ArchiveEntry::from_record(record))
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes buffered output and hands back the underlying writer.
    pub fn finish(mut self) -> AppResult<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
