//! Output formatting functions.

use eventcache_core::utils::{format_optional, truncate_string};
use eventcache_core::{ErrorNotice, Event, QueryKey, QueryStatus};

use crate::cli::OutputFormat;

const TITLE_WIDTH: usize = 32;
const LOCATION_WIDTH: usize = 24;

/// Format a serializable value for output.
pub fn format_output<T: serde::Serialize>(value: &T, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(value).unwrap_or_default(),
        OutputFormat::Pretty => serde_json::to_string_pretty(value).unwrap_or_default(),
    }
}

/// One row per event.
pub fn format_events(events: &[Event]) -> String {
    if events.is_empty() {
        return "No events found.".to_string();
    }
    let mut output = format!("EVENTS ({})\n", events.len());
    output.push_str(&format!(
        "{:<8} {:<14} {:<width$} {}\n",
        "ID",
        "DATE",
        "TITLE",
        "LOCATION",
        width = TITLE_WIDTH
    ));
    output.push_str(&"-".repeat(8 + 14 + TITLE_WIDTH + LOCATION_WIDTH + 3));
    for event in events {
        output.push_str(&format!(
            "\n{:<8} {:<14} {:<width$} {}",
            truncate_string(event.id.as_str(), 8),
            event.formatted_date(),
            truncate_string(&event.title, TITLE_WIDTH),
            truncate_string(format_optional(&event.location, "-"), LOCATION_WIDTH),
            width = TITLE_WIDTH
        ));
    }
    output
}

/// Detail view of one event.
pub fn format_event(event: &Event, base_url: &str) -> String {
    let mut output = format!("{}\n  ID: {}", event.title, event.id);
    output.push_str(&format!("\n  When: {}", event.formatted_when()));
    output.push_str(&format!(
        "\n  Where: {}",
        format_optional(&event.location, "TBD")
    ));
    if let Some(url) = event.image_url(base_url) {
        output.push_str(&format!("\n  Image: {}", url));
    }
    if !event.description.is_empty() {
        output.push_str(&format!("\n\n{}", event.description));
    }
    output
}

pub fn format_notice(notice: &ErrorNotice) -> String {
    format!("Error: {}", notice)
}

/// One line per cached query.
pub fn format_status(entries: &[(QueryKey, QueryStatus, bool)]) -> String {
    if entries.is_empty() {
        return "Cache is empty.".to_string();
    }
    let mut output = String::from("CACHE");
    for (key, status, fetching) in entries {
        output.push_str(&format!("\n  {:<20} {:?}", key.to_string(), status));
        if *fetching {
            output.push_str(" (fetching)");
        }
    }
    output
}
