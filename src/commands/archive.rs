use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::api::messages::{MessageFormat, date_range_query};
use crate::cli::ArchiveArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::fetch::{BatchFetcher, BatchSummary, ChunkFailure, list_message_ids};
use crate::report::ArchiveWriter;

pub const ARCHIVE_CHUNK_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
pub struct ArchiveReport {
    pub query: String,
    pub found: usize,
    pub archived: usize,
    pub batches: BatchSummary,
    pub output: Option<PathBuf>,
}

pub async fn run(ctx: &AppContext, args: ArchiveArgs) -> AppResult<()> {
    let query = date_range_query(args.start_date, args.end_date);
    ctx.output.lines([format!("Searching for messages with query: '{query}'")])?;

    let policy = ctx.fetch_policy(ARCHIVE_CHUNK_DELAY);
    let spinner = ctx.output.progress().spinner("Fetching message pages");
    let ids = list_message_ids(
        &ctx.gmail_client,
        ctx,
        &policy,
        Some(&query),
        None,
        &spinner,
    )
    .await?;
    spinner.finish_and_clear();
    ctx.output.lines([format!(
        "\nFound a total of {} messages in the specified date range.",
        ids.len()
    )])?;

    if ids.is_empty() {
        let report = ArchiveReport {
            query,
            found: 0,
            archived: 0,
            batches: BatchSummary::default(),
            output: None,
        };
        return ctx.output.emit(
            "No messages found in the specified date range. Exiting.",
            &report,
        );
    }

    let mut writer = ArchiveWriter::create(&args.output)?;
    let bar = ctx.output.progress().bar(ids.len() as u64, "Downloading messages");
    let fetcher = BatchFetcher::new(&ctx.gmail_client, ctx, policy)
        .on_chunk_failure(ChunkFailure::Propagate)
        .with_progress(bar.clone());

    let batches = fetcher
        .for_each_message(&ids, &MessageFormat::Full, |message| {
            writer.write_message(&message)
        })
        .await?;
    bar.finish_and_clear();

    let archived = writer.written();
    writer.finish()?;
    info!(found = ids.len(), archived, "archive written");

    let report = ArchiveReport {
        query,
        found: ids.len(),
        archived,
        batches,
        output: Some(args.output.clone()),
    };
    ctx.output.emit(
        &format!(
            "\n--- Archiving Complete ---\nAll messages from the date range have been saved to {}",
            args.output.display()
        ),
        &report,
    )
}
