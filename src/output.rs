//! Terminal status lines.

use chrono::{DateTime, FixedOffset};
use colored::Colorize;

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn info(msg: &str) {
    println!("{} {}", "→".blue(), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn dry_run_header(what: &str) {
    println!("{}", format!("[DRY RUN] {what}:").blue().bold());
}

pub fn date(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}
