//! Output formatting for text and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use nimbus_core::{HistorySummary, WeatherOutcome};
use nimbus_types::{Condition, HistoryEntry, Location, Period, Photo};
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    fn condition(&self, condition: Condition) -> String {
        let label = condition.label();
        if self.no_color {
            return label.to_string();
        }
        match condition {
            Condition::Sunny => label.yellow().to_string(),
            Condition::PartlyCloudy => label.bright_white().to_string(),
            Condition::Cloudy => label.dimmed().to_string(),
            Condition::Rainy => label.blue().to_string(),
            Condition::Snowy => label.cyan().to_string(),
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.yellow().to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.bold().to_string()
        }
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

fn format_time(ts: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    ts.format(&format).unwrap_or_else(|_| ts.to_string())
}

pub fn format_weather_text(
    outcome: &WeatherOutcome,
    location: &Location,
    opts: &FormatOptions,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", opts.heading(&location.to_string()));
    match outcome {
        WeatherOutcome::Fresh { sample } => {
            let _ = writeln!(
                out,
                "  {}°C  {}",
                sample.rounded_temperature(),
                opts.condition(sample.condition)
            );
            let _ = writeln!(out, "  Updated {}", format_time(sample.timestamp));
        }
        WeatherOutcome::Cached {
            sample,
            fetched_at,
            reason,
        } => {
            let _ = writeln!(
                out,
                "  {}°C  {}",
                sample.rounded_temperature(),
                opts.condition(sample.condition)
            );
            let _ = writeln!(
                out,
                "  {}",
                opts.warning(&format!(
                    "Offline, showing data from {} ({})",
                    format_time(*fetched_at),
                    reason
                ))
            );
        }
        WeatherOutcome::Unavailable { reason } => {
            let _ = writeln!(out, "  {}", opts.warning(&outcome.description()));
            let _ = writeln!(out, "  {}", reason);
        }
    }
    out
}

pub fn format_history_text(entries: &[HistoryEntry], period: Period, opts: &FormatOptions) -> String {
    if entries.is_empty() {
        return format!("No weather history for the last {}\n", period);
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        opts.heading(&format!("{} entries (last {})", entries.len(), period))
    );
    for entry in entries {
        let _ = writeln!(
            out,
            "  {}  {:>5.1}°C  {}",
            format_time(entry.timestamp),
            entry.temperature,
            opts.condition(entry.condition)
        );
    }
    out
}

pub fn format_summary_text(summary: &HistorySummary, period: Period, opts: &FormatOptions) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        opts.heading(&format!("Summary (last {})", period))
    );
    let _ = writeln!(out, "  Entries:  {}", summary.count);
    if let (Some(min), Some(max), Some(mean)) = (
        summary.min_temperature,
        summary.max_temperature,
        summary.mean_temperature,
    ) {
        let _ = writeln!(out, "  Min:      {:.1}°C", min);
        let _ = writeln!(out, "  Max:      {:.1}°C", max);
        let _ = writeln!(out, "  Mean:     {:.1}°C", mean);
    }
    if let Some(dominant) = summary.dominant {
        let _ = writeln!(out, "  Mostly:   {}", opts.condition(dominant));
    }
    for count in &summary.conditions {
        let _ = writeln!(out, "    {:<14} {}", count.condition.label(), count.count);
    }
    out
}

pub fn format_photos_text(photos: &[Photo], opts: &FormatOptions) -> String {
    if photos.is_empty() {
        return "No photos\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", opts.heading(&format!("{} photos", photos.len())));
    for photo in photos {
        let _ = writeln!(
            out,
            "  {:<14} {}  {}",
            photo.id,
            format_time(photo.timestamp),
            photo.mime_type().unwrap_or("unknown")
        );
    }
    out
}

/// Photo metadata for JSON listings (image data omitted).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoListing<'a> {
    pub id: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub mime_type: Option<&'a str>,
    pub size: usize,
}

impl<'a> From<&'a Photo> for PhotoListing<'a> {
    fn from(photo: &'a Photo) -> Self {
        Self {
            id: &photo.id,
            timestamp: photo.timestamp,
            mime_type: photo.mime_type(),
            size: photo.image_data.len(),
        }
    }
}
