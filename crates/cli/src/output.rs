// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text/JSON output branching (spec.md §6: "`--json`; when set,
//! machine-readable payloads go to stdout ... human-readable diagnostics go
//! to stderr"), grounded on the teacher's `crates/cli/src/output.rs`
//! `OutputFormat` + `format_or_json`/`handle_list` shape.

use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Render as pretty JSON on stdout, or run `text_fn` for human output.
pub fn format_or_json<T: Serialize>(format: OutputFormat, data: &T, text_fn: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}

/// Render a list as a JSON array, or one line per item via `render_text`.
pub fn handle_list<T: Serialize>(
    format: OutputFormat,
    items: &[T],
    empty_msg: &str,
    render_text: impl Fn(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Text => {
            if items.is_empty() {
                println!("{empty_msg}");
            } else {
                for item in items {
                    render_text(item);
                }
            }
        }
    }
    Ok(())
}

/// Print one tier-1 event as a JSON line (`--json`) or a short human line.
pub fn print_event(format: OutputFormat, event: &mill_core::MillEvent) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Text => println!(
            "[{}] {} #{} {}",
            event.timestamp,
            event.run_id,
            event.sequence,
            event.payload.type_name()
        ),
    }
    Ok(())
}
