use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::style::StyleIssues;
use crate::table::TableLayout;

/// JSON-lines debug log with named counters, flushed as a summary record.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn record_style_issues(&self, tag: &str, issues: StyleIssues) {
        if issues.is_empty() {
            return;
        }
        self.increment("style.ignored_property", issues.ignored_properties);
        self.increment("style.invalid_length", issues.invalid_lengths);
        self.increment("style.invalid_alignment", issues.invalid_alignments);
        self.log_json(&format!(
            "{{\"type\":\"style.issues\",\"tag\":\"{}\",\"ignored_properties\":{},\"invalid_lengths\":{},\"invalid_alignments\":{}}}",
            json_escape(tag),
            issues.ignored_properties,
            issues.invalid_lengths,
            issues.invalid_alignments
        ));
    }

    pub fn record_table(&self, layout: &TableLayout, cells: usize, ragged: bool) {
        self.increment("table.rendered", 1);
        self.increment("table.rows", layout.row_heights.len() as u64);
        self.increment("table.cells", cells as u64);
        if ragged {
            self.increment("table.ragged", 1);
        }
        self.log_json(&format!(
            "{{\"type\":\"table.layout\",\"rows\":{},\"columns\":{},\"cells\":{},\"ragged\":{},\"column_widths\":{},\"row_heights\":{}}}",
            layout.row_heights.len(),
            layout.columns(),
            cells,
            ragged,
            json_usize_array(&layout.column_widths),
            json_usize_array(&layout.row_heights)
        ));
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let mut counts_json = String::from("{");
            for (idx, (key, value)) in counters.iter().enumerate() {
                if idx > 0 {
                    counts_json.push(',');
                }
                counts_json.push_str(&format!("\"{}\":{}", json_escape(key), value));
            }
            counts_json.push('}');
            let _ = writeln!(
                state.writer,
                "{{\"type\":\"debug.summary\",\"context\":\"{}\",\"counts\":{}}}",
                json_escape(context),
                counts_json
            );
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

fn json_usize_array(values: &[usize]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(","))
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
