// Result rendering: tables for people, JSON for scripts

use anyhow::Result;
use clap::ValueEnum;
use tabled::builder::Builder;
use tabled::settings::Style;
use vexpersist_core::domain::{Record, ResultSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

pub fn render_rows(rows: &ResultSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(rows.rows())?),
        OutputFormat::Table => Ok(table(&rows.columns(), rows.rows())),
    }
}

pub fn render_record(record: &Record, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Table => {
            let columns: Vec<String> = record.columns().map(str::to_string).collect();
            Ok(table(&columns, std::slice::from_ref(record)))
        }
    }
}

fn table(columns: &[String], rows: &[Record]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(columns.iter().map(|c| {
            row.get(c).map(ToString::to_string).unwrap_or_default()
        }));
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> ResultSet {
        ResultSet::new(vec![
            Record::new().with("id", 1).with("name", "Ada"),
            Record::new().with("id", 2).with("name", None::<String>),
        ])
    }

    #[test]
    fn test_json_keeps_column_order() {
        let json = render_rows(&rows(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "Ada");
        assert!(parsed[1]["name"].is_null());
        assert!(json.find("\"id\"").unwrap() < json.find("\"name\"").unwrap());
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let table = render_rows(&rows(), OutputFormat::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[1].contains("id") && lines[1].contains("name"));
        assert!(table.contains("Ada"));
        assert!(table.contains("NULL"));
    }

    #[test]
    fn test_record_table() {
        let record = Record::new().with("status", "ok");
        let table = render_record(&record, OutputFormat::Table).unwrap();
        assert!(table.contains("status"));
        assert!(table.contains("ok"));
    }
}
