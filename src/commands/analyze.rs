use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::messages::MessageFormat;
use crate::cli::AnalyzeArgs;
use crate::config::FetchPolicy;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::fetch::{BatchFetcher, BatchSummary, ChunkFailure, list_message_ids};
use crate::labels::{LabelCache, apply_label};
use crate::report::analysis::{self, ANALYSIS_HEADERS, AnalysisRow, AnalysisTable};

pub const ANALYZE_CHUNK_DELAY: Duration = Duration::from_secs(1);
const TOP_SENDERS: usize = 20;
const TOP_UNSUBSCRIBE_SENDERS: usize = 10;

#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub messages: usize,
    pub with_unsubscribe: usize,
    pub columns: Vec<&'static str>,
    pub top_senders: Vec<(String, usize)>,
    pub top_unsubscribe_senders: Vec<(String, usize)>,
    pub batches: BatchSummary,
    pub labeling: Option<LabelingReport>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
pub struct LabelingReport {
    pub parent: String,
    pub parent_id: Option<String>,
    pub labeled: Vec<DomainLabel>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DomainLabel {
    pub label: String,
    pub label_id: String,
    pub messages: usize,
    pub batches: BatchSummary,
}

pub async fn run(ctx: &AppContext, args: AnalyzeArgs) -> AppResult<()> {
    let policy = ctx.fetch_policy(ANALYZE_CHUNK_DELAY);
    let spinner = ctx.output.progress().spinner("Fetching recent message ids");
    let ids = list_message_ids(
        &ctx.gmail_client,
        ctx,
        &policy,
        None,
        Some(args.max_results.get()),
        &spinner,
    )
    .await?;
    spinner.finish_and_clear();

    if ids.is_empty() {
        return ctx.output.emit("No messages found.", &AnalyzeReport::empty());
    }

    ctx.output.lines([format!(
        "Fetching headers for {} messages using batch requests...",
        ids.len()
    )])?;
    let bar = ctx.output.progress().bar(ids.len() as u64, "Fetching email headers");
    let fetcher = BatchFetcher::new(&ctx.gmail_client, ctx, policy)
        .on_chunk_failure(ChunkFailure::LogAndContinue)
        .with_progress(bar.clone());
    let (records, batches) = {
        let mut records = Vec::with_capacity(ids.len());
        let batches = fetcher
            .for_each_message(&ids, &MessageFormat::metadata(ANALYSIS_HEADERS), |message| {
                records.push(message);
                Ok(())
            })
            .await?;
        (records, batches)
    };
    bar.finish_and_clear();

    if records.is_empty() {
        let report = AnalyzeReport {
            batches,
            ..AnalyzeReport::empty()
        };
        return ctx.output.emit("Could not fetch any email headers.", &report);
    }

    let table = AnalysisTable::from_records(&records);
    let unsubscribe = table.unsubscribe_rows();
    let top_senders = rank_senders(table.rows().iter(), TOP_SENDERS);
    let top_unsubscribe_senders =
        rank_senders(unsubscribe.iter().copied(), TOP_UNSUBSCRIBE_SENDERS);

    let mut lines = vec![
        "\n--- Analysis Results ---".to_string(),
        format!("\nTop {TOP_SENDERS} Senders:"),
    ];
    lines.extend(analysis::format_counts(&top_senders, TOP_SENDERS));
    lines.push(format!(
        "\nFound {} emails with an unsubscribe link (likely newsletters/marketing).",
        unsubscribe.len()
    ));
    if !unsubscribe.is_empty() {
        lines.push("Top Senders with Unsubscribe Links:".to_string());
        lines.extend(analysis::format_counts(
            &top_unsubscribe_senders,
            TOP_UNSUBSCRIBE_SENDERS,
        ));
    }
    ctx.output.lines(lines)?;

    let labeling = match args.label_unsubscribe.as_deref() {
        Some(parent) => label_unsubscribe_senders(ctx, policy, parent, &unsubscribe)
            .await
            .map(Some),
        None => Ok(None),
    };

    table.save_csv(&args.output)?;
    ctx.output.lines([format!(
        "\nFull analysis data saved to {}",
        args.output.display()
    )])?;

    let labeling = labeling?;
    let report = AnalyzeReport {
        messages: table.len(),
        with_unsubscribe: unsubscribe.len(),
        columns: table.columns().to_vec(),
        top_senders,
        top_unsubscribe_senders,
        batches,
        labeling,
        output: Some(args.output.clone()),
    };
    ctx.output.emit(&format!("Analyzed {} messages.", report.messages), &report)
}

fn rank_senders<'a>(
    rows: impl Iterator<Item = &'a AnalysisRow>,
    top: usize,
) -> Vec<(String, usize)> {
    let mut counts = analysis::value_counts(rows.filter_map(AnalysisRow::sender));
    counts.truncate(top);
    counts
}

/// Files every unsubscribe-bearing message under `parent/<sender domain>`.
/// A parent label that cannot be ensured ends labeling; a domain label that
/// cannot be ensured skips that domain.
async fn label_unsubscribe_senders(
    ctx: &AppContext,
    policy: FetchPolicy,
    parent: &str,
    rows: &[&AnalysisRow],
) -> AppResult<LabelingReport> {
    ctx.output.lines([
        "\n--- Labeling Mode Activated ---",
        "WARNING: This will create nested labels and apply them to the recently analyzed emails.",
    ])?;

    let mut report = LabelingReport {
        parent: parent.to_string(),
        ..LabelingReport::default()
    };

    if rows.is_empty() {
        ctx.output.lines([
            "No emails with unsubscribe links found in the recent analysis to label.",
        ])?;
        return Ok(report);
    }

    ctx.output.lines(["\nFetching all existing labels from Gmail..."])?;
    let mut cache = LabelCache::fetch(&ctx.gmail_client, ctx).await?;
    info!(labels = cache.len(), "loaded label map");

    let parent_id = match cache.ensure(&ctx.gmail_client, ctx, parent).await {
        Ok(id) => id,
        Err(err) => {
            error!(label = parent, "could not create parent label: {err}");
            ctx.output.lines([format!(
                "Could not find or create parent label '{parent}'. Aborting labeling."
            )])?;
            return Ok(report);
        }
    };
    report.parent_id = Some(parent_id);

    let groups = analysis::group_by_domain(rows.iter().copied());
    ctx.output.lines([format!("\nFound {} unique domains to label.", groups.len())])?;

    let total: usize = groups.values().map(Vec::len).sum();
    let bar = ctx.output.progress().bar(total as u64, "Labeling emails");
    let fetcher = BatchFetcher::new(&ctx.gmail_client, ctx, policy)
        .on_chunk_failure(ChunkFailure::LogAndContinue)
        .with_progress(bar.clone());

    for (domain, ids) in groups {
        let label = format!("{parent}/{domain}");
        let label_id = match cache.ensure(&ctx.gmail_client, ctx, &label).await {
            Ok(id) => id,
            Err(err) => {
                warn!(label = %label, "skipping domain, label could not be created: {err}");
                report.skipped.push(label);
                continue;
            }
        };

        ctx.output.lines([format!(
            "Applying label '{label}' to {} emails...",
            ids.len()
        )])?;
        let batches = apply_label(&fetcher, &ids, &label_id).await?;
        report.labeled.push(DomainLabel {
            label,
            label_id,
            messages: ids.len(),
            batches,
        });
    }

    bar.finish_and_clear();
    Ok(report)
}

impl AnalyzeReport {
    fn empty() -> Self {
        Self {
            messages: 0,
            with_unsubscribe: 0,
            columns: Vec::new(),
            top_senders: Vec::new(),
            top_unsubscribe_senders: Vec::new(),
            batches: BatchSummary::default(),
            labeling: None,
            output: None,
        }
    }
}
