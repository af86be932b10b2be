use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use crate::error::AppResult;
use crate::mail::sender_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SenderCount {
    pub sender_email: String,
    pub count: usize,
}

/// Running count of messages per sender key.
#[derive(Debug, Clone, Default)]
pub struct SenderTally {
    counts: HashMap<String, usize>,
    total: usize,
}

impl SenderTally {
    pub fn record(&mut self, from: &str) {
        *self.counts.entry(sender_key(from)).or_default() += 1;
        self.total += 1;
    }

    /// Messages recorded so far.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Count descending, ties broken by address ascending.
    pub fn ranked(&self) -> Vec<SenderCount> {
        let mut ranked: Vec<_> = self
            .counts
            .iter()
            .map(|(sender, count)| SenderCount {
                sender_email: sender.clone(),
                count: *count,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.sender_email.cmp(&b.sender_email))
        });
        ranked
    }
}

/// Writes `sender_email,count` rows under a header line.
pub fn write_csv<W: Write>(out: W, counts: &[SenderCount]) -> AppResult<()> {
    let mut writer = Writer::from_writer(out);
    for row in counts {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(path: &Path, counts: &[SenderCount]) -> AppResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, counts)
}

pub fn format_top(counts: &[SenderCount], top: usize) -> Vec<String> {
    let width = counts
        .iter()
        .take(top)
        .map(|row| row.sender_email.chars().count())
        .max()
        .unwrap_or(0)
        .max("sender_email".len());

    let mut lines = vec![format!("{:<width$}  count", "sender_email")];
    lines.extend(
        counts
            .iter()
            .take(top)
            .map(|row| format!("{:<width$}  {:>5}", row.sender_email, row.count)),
    );
    lines
}
