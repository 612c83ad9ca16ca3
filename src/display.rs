use crate::core::types::{PointsReport, ServerEvent};
use chrono::{DateTime, Local, Utc};

// tracing-subscriber colors the level; these cover the per-account accents
// the subscriber cannot know about.
const RESET: &str = "\x1b[0m";
const ACCOUNT: &str = "\x1b[1;36m";
const POINTS: &str = "\x1b[92m";
const BANNER: &str = "\x1b[1;35m";

/// `Account NN` prefix, zero-padded for column alignment across the fleet.
pub fn account_prefix(index: usize) -> String {
    format!("{ACCOUNT}Account {index:02}{RESET}")
}

/// Point value, right-aligned to a fixed width of 6.
pub fn format_points(points: f64) -> String {
    format!("{POINTS}{points:>6}{RESET}")
}

/// Local-time 24-hour clock rendering of a server timestamp.
pub fn format_clock(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Current local time, 24-hour clock.
pub fn now_clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// One log line per recognized server event: timestamp plus both point values.
pub fn event_line(index: usize, event: &ServerEvent) -> String {
    let (verb, report) = match event {
        ServerEvent::Connected(report) => ("Connected at", report),
        ServerEvent::Pulse(report) => ("Server pulse at", report),
    };
    status_line(index, verb, report)
}

fn status_line(index: usize, verb: &str, report: &PointsReport) -> String {
    format!(
        "{} > {} {} | Points Today: {} | Total Points: {}",
        account_prefix(index),
        verb,
        format_clock(&report.date),
        format_points(report.points_today),
        format_points(report.points_total),
    )
}

/// Startup banner.
pub fn banner() {
    println!(
        "{BANNER}=============================================={RESET}\n\
         {BANNER}  pulsefleet v{}  -  multi-account keepalive  {RESET}\n\
         {BANNER}=============================================={RESET}",
        env!("CARGO_PKG_VERSION")
    );
}
