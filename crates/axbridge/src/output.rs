use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a host's `/status` document.
pub fn print_status(status: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(status).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                serde_json::to_string_pretty(status).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in status_rows(status) {
                table.add_row(vec![field, value]);
            }
            println!("{table}");
        }
    }
}

/// Flatten the sectioned status document into `section.field` rows.
fn status_rows(status: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let Some(sections) = status.as_object() else {
        return rows;
    };
    for (section, body) in sections {
        match body.as_object() {
            Some(fields) => {
                for (field, value) in fields {
                    rows.push((format!("{section}.{field}"), cell(value)));
                }
            }
            None => rows.push((section.clone(), cell(body))),
        }
    }
    rows
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
