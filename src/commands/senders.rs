use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::api::messages::MessageFormat;
use crate::cli::SendersArgs;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::fetch::{BatchFetcher, BatchSummary, ChunkFailure, list_message_ids};
use crate::report::senders::{self, SenderCount, SenderTally};

pub const SENDERS_CHUNK_DELAY: Duration = Duration::from_secs(1);
const TOP_SENDERS: usize = 25;

#[derive(Debug, Serialize)]
pub struct SendersReport {
    pub scanned: usize,
    pub counted: usize,
    pub unique_senders: usize,
    pub batches: BatchSummary,
    pub output: Option<PathBuf>,
    pub top: Vec<SenderCount>,
}

pub async fn run(ctx: &AppContext, args: SendersArgs) -> AppResult<()> {
    let limit = args.limit.filter(|&limit| limit > 0);
    if limit.is_none() {
        ctx.output.lines([
            "WARNING: this scans your ENTIRE mailbox, which may take a long time.",
        ])?;
    }

    let policy = ctx.fetch_policy(SENDERS_CHUNK_DELAY);
    let spinner = ctx.output.progress().spinner("Fetching message pages");
    let ids = list_message_ids(&ctx.gmail_client, ctx, &policy, None, limit, &spinner).await?;
    spinner.finish_and_clear();
    ctx.output.lines([format!("Found {} messages to process.", ids.len())])?;

    if ids.is_empty() {
        return ctx.output.emit("No message IDs found. Exiting.", &SendersReport::empty());
    }

    let bar = ctx.output.progress().bar(ids.len() as u64, "Processing messages");
    let fetcher = BatchFetcher::new(&ctx.gmail_client, ctx, policy)
        .on_chunk_failure(ChunkFailure::LogAndContinue)
        .with_progress(bar.clone());

    let mut tally = SenderTally::default();
    let batches = fetcher
        .for_each_message(&ids, &MessageFormat::metadata(["From"]), |message| {
            if let Some(from) = message.header("From").filter(|from| !from.is_empty()) {
                tally.record(from);
            }
            Ok(())
        })
        .await?;
    bar.finish_and_clear();
    info!(
        scanned = ids.len(),
        counted = tally.total(),
        failed = batches.failed,
        "sender scan finished"
    );

    if tally.is_empty() {
        let report = SendersReport {
            scanned: ids.len(),
            batches,
            ..SendersReport::empty()
        };
        return ctx.output.emit("Could not retrieve any sender information.", &report);
    }

    let ranked = tally.ranked();
    let mut lines = vec![
        String::new(),
        "--- Analysis Complete ---".to_string(),
        String::new(),
        format!("Top {TOP_SENDERS} Senders by Email Count:"),
    ];
    lines.extend(senders::format_top(&ranked, TOP_SENDERS));
    ctx.output.lines(lines)?;

    senders::save_csv(&args.output, &ranked)?;

    let report = SendersReport {
        scanned: ids.len(),
        counted: tally.total(),
        unique_senders: ranked.len(),
        batches,
        output: Some(args.output.clone()),
        top: ranked.into_iter().take(TOP_SENDERS).collect(),
    };
    ctx.output.emit(
        &format!("\nFull report saved to {}", args.output.display()),
        &report,
    )
}

impl SendersReport {
    fn empty() -> Self {
        Self {
            scanned: 0,
            counted: 0,
            unique_senders: 0,
            batches: BatchSummary::default(),
            output: None,
            top: Vec::new(),
        }
    }
}
