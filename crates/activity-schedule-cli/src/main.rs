mod config;

use std::io::Read;
use std::path::{Path, PathBuf};

use activity_schedule::occurrence::deserialize_lenient;
use activity_schedule::{
    collect_booking_values, parse_date_text, partition_bookings, ActivityDates, BookingView,
    BookingWindow, DisplayOptions, RawOccurrence, ScheduleResolver,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::{display_options, load_config};

#[derive(Parser)]
#[command(name = "schedule", version)]
#[command(about = "Resolve activity schedules and booking lists from JSON records", long_about = None)]
struct Cli {
    /// TOML file with `timezone`, `locale` and `date_format`
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IANA timezone for calendar dates (default: Europe/Madrid)
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Locale for weekday and month names (default: es_ES)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Reference instant; defaults to the current time
    #[arg(long, global = true)]
    now: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pick the date to show for one activity
    Resolve {
        /// JSON file: an array of occurrences or an activity object (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Split bookings into active and past lists
    Bookings {
        /// JSON file: an array of bookings (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Time filter for active bookings: all, this-week, this-month
        #[arg(short, long, default_value_t = BookingWindow::All)]
        window: BookingWindow,
    },
}

/// `resolve` accepts either a bare candidate list or a whole activity record.
/// Malformed list elements are dropped rather than failing the whole input.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResolveInput {
    Occurrences(#[serde(deserialize_with = "deserialize_lenient")] Vec<RawOccurrence>),
    Activity(ActivityDates),
}

#[derive(Serialize)]
struct BookingsOutput {
    active: Vec<BookingView>,
    past: Vec<BookingView>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let options = display_options(&config, cli.timezone.as_deref(), cli.locale.as_deref())?;
    let now = reference_instant(cli.now.as_deref(), &options)?;

    let output = match cli.command {
        Command::Resolve { input } => {
            let text = read_input(input.as_deref())?;
            let parsed: ResolveInput =
                serde_json::from_str(&text).context("parsing occurrences JSON")?;

            let resolver = ScheduleResolver::new(options);
            let decision = match parsed {
                ResolveInput::Occurrences(raw) => resolver.resolve_raw(&raw, now),
                ResolveInput::Activity(activity) => resolver.resolve_activity(&activity, now),
            };
            serde_json::to_value(decision)?
        }
        Command::Bookings { input, window } => {
            let text = read_input(input.as_deref())?;
            let records: Vec<serde_json::Value> =
                serde_json::from_str(&text).context("parsing bookings JSON")?;

            let bookings = collect_booking_values(records, &options.timezone);
            let split = partition_bookings(bookings, now);

            let output = BookingsOutput {
                active: split
                    .active
                    .iter()
                    .filter(|b| window.contains(b.scheduled_at, now, &options.timezone))
                    .map(|b| b.view(now, &options))
                    .collect(),
                past: split.past.iter().map(|b| b.view(now, &options)).collect(),
            };
            serde_json::to_value(output)?
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");

    Ok(())
}

fn reference_instant(now: Option<&str>, options: &DisplayOptions) -> anyhow::Result<DateTime<Utc>> {
    match now {
        Some(text) => parse_date_text(text, &options.timezone)
            .with_context(|| format!("invalid --now value '{text}'")),
        None => Ok(Utc::now()),
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading input file {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            Ok(buf)
        }
    }
}
