//! History command implementation.

use std::path::PathBuf;

use anyhow::Result;
use nimbus_core::{HistoryTracker, summarize};
use nimbus_service::Config;
use nimbus_types::Period;
use time::OffsetDateTime;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_history_text, format_json, format_summary_text};
use crate::util::{open_store, write_output};

/// Arguments for the history command.
pub struct HistoryArgs<'a> {
    pub period: Period,
    pub summary: bool,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub database: Option<&'a PathBuf>,
    pub config: &'a Config,
    pub opts: &'a FormatOptions,
}

pub fn cmd_history(args: HistoryArgs<'_>) -> Result<()> {
    let HistoryArgs {
        period,
        summary,
        format,
        output,
        database,
        config,
        opts,
    } = args;

    let store = open_store(database, config)?;
    let tracker = HistoryTracker::new(config.history.policy());
    let entries = tracker.query_history(&store, period, OffsetDateTime::now_utc());

    let content = if summary {
        let summary = summarize(&entries);
        match format {
            OutputFormat::Json => format_json(&summary)?,
            OutputFormat::Text => format_summary_text(&summary, period, opts),
        }
    } else {
        match format {
            OutputFormat::Json => format_json(&entries)?,
            OutputFormat::Text => format_history_text(&entries, period, opts),
        }
    };

    write_output(output, &content)
}
