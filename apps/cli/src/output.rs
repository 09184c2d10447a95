//! Terminal output helpers.

use colored::Colorize;
use dmt_abstraction::{LogSink, TracingLogSink};
use serde::Serialize;
use std::sync::Arc;

/// Prints activity lines as they happen, dimmed and indented.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLogSink;

impl LogSink for ConsoleLogSink {
    fn log(&self, line: &str) {
        if line.is_empty() {
            println!();
        } else {
            println!("  {}", line.dimmed());
        }
    }
}

/// Activity log for the chosen output mode. JSON output keeps stdout clean
/// and routes activity to `tracing` on stderr instead.
pub fn activity_log(json: bool) -> Arc<dyn LogSink> {
    if json { Arc::new(TracingLogSink) } else { Arc::new(ConsoleLogSink) }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn heading(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
}

pub fn success(text: &str) {
    println!("{} {}", "✓".green(), text.green());
}
