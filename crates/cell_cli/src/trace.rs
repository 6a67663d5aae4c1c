//! Per-tick CSV trace of a run.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TraceRow {
    pub tick: u64,
    /// Empty when the charge level was undefined or the controller is disabled.
    pub charge_percent: Option<f64>,
    pub running: bool,
    pub action: &'static str,
    pub load: f64,
    pub produced: f64,
    pub consumed: f64,
    pub shortfall: f64,
    pub starved_converters: usize,
}

pub struct TraceWriter {
    writer: csv::Writer<File>,
}

impl TraceWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating trace CSV: {}", path.display()))?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &TraceRow) -> Result<()> {
        self.writer
            .serialize(row)
            .with_context(|| format!("writing trace row for tick {}", row.tick))
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("flushing trace CSV")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_serialize_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        let mut writer = TraceWriter::create(&path).unwrap();
        writer
            .write_row(&TraceRow {
                tick: 0,
                charge_percent: Some(14.5),
                running: false,
                action: "start",
                load: 8.0,
                produced: 0.0,
                consumed: 8.0,
                shortfall: 0.0,
                starved_converters: 0,
            })
            .unwrap();
        writer
            .write_row(&TraceRow {
                tick: 1,
                charge_percent: None,
                running: true,
                action: "",
                load: 8.0,
                produced: 15.0,
                consumed: 6.5,
                shortfall: 1.5,
                starved_converters: 1,
            })
            .unwrap();
        writer.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "tick,charge_percent,running,action,load,produced,consumed,shortfall,starved_converters"
        );
        assert_eq!(lines[1], "0,14.5,false,start,8.0,0.0,8.0,0.0,0");
        assert_eq!(lines[2], "1,,true,,8.0,15.0,6.5,1.5,1");
    }
}
