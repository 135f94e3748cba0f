use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use tabled::{settings::Style, Table, Tabled};

use crate::types::StateType;

/// Global output format setting
static OUTPUT_JSON: AtomicBool = AtomicBool::new(false);

pub fn set_json_output(json: bool) {
    OUTPUT_JSON.store(json, Ordering::Relaxed);
}

pub fn is_json_output() -> bool {
    OUTPUT_JSON.load(Ordering::Relaxed)
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print a table or JSON depending on output mode
pub fn print_table<T, R, F>(items: &[T], to_row: F)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    if is_json_output() {
        print_json(items);
    } else {
        let rows: Vec<R> = items.iter().map(to_row).collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if is_json_output() {
        print_json(item);
    } else {
        display(item);
    }
}

pub fn print_message(message: &str) {
    if is_json_output() {
        print_json(&json!({ "message": message }));
    } else {
        println!("{message}");
    }
}

/// Format status with its Linear color, falling back to one per state type
pub fn status_colored(status: &str, color: Option<&str>, state_type: StateType) -> String {
    if let Some((r, g, b)) = color.and_then(parse_hex_color) {
        return status.truecolor(r, g, b).to_string();
    }

    match state_type {
        StateType::Completed => status.green().to_string(),
        StateType::Started => status.blue().to_string(),
        StateType::Canceled => status.red().to_string(),
        StateType::Backlog => status.bright_black().to_string(),
        StateType::Unstarted | StateType::Unknown => status.to_string(),
    }
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Format a date string nicely using chrono
pub fn format_date(iso: &str) -> String {
    match iso.parse::<DateTime<Utc>>() {
        Ok(dt) => {
            let local: DateTime<Local> = dt.into();
            local.format("%Y-%m-%d %H:%M").to_string()
        }
        Err(_) => date_part(iso),
    }
}

fn date_part(iso: &str) -> String {
    iso.split('T').next().unwrap_or(iso).to_string()
}

/// Format a relative time (e.g., "2 days ago")
pub fn format_relative(iso: &str) -> String {
    match iso.parse::<DateTime<Utc>>() {
        Ok(dt) => relative_to(dt, Utc::now()),
        Err(_) => date_part(iso),
    }
}

fn relative_to(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(dt);
    let plural = |n: i64| if n == 1 { "" } else { "s" };

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        let mins = diff.num_minutes();
        format!("{mins} min{} ago", plural(mins))
    } else if diff.num_hours() < 24 {
        let hours = diff.num_hours();
        format!("{hours} hour{} ago", plural(hours))
    } else if diff.num_days() < 30 {
        let days = diff.num_days();
        format!("{days} day{} ago", plural(days))
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
