use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::debug::json_escape;

#[derive(Clone)]
pub(crate) struct PerfLogger {
    inner: Arc<Mutex<PerfState>>,
}

struct PerfState {
    writer: BufWriter<File>,
    span_totals: BTreeMap<String, f64>,
    span_counts: BTreeMap<String, u64>,
}

impl PerfLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(PerfState {
                writer: BufWriter::new(file),
                span_totals: BTreeMap::new(),
                span_counts: BTreeMap::new(),
            })),
        })
    }

    pub fn log_span_ms(&self, name: &str, ms: f64) {
        let json = format!(
            "{{\"type\":\"perf.span\",\"name\":\"{}\",\"unit\":\"ms\",\"ms\":{:.3}}}",
            json_escape(name),
            ms
        );
        if let Ok(mut state) = self.inner.lock() {
            *state.span_totals.entry(name.to_string()).or_insert(0.0) += ms;
            let entry = state.span_counts.entry(name.to_string()).or_insert(0);
            *entry = entry.saturating_add(1);
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn log_since(&self, name: &str, start: Instant) {
        self.log_span_ms(name, start.elapsed().as_secs_f64() * 1000.0);
    }

    pub fn log_counts(&self, name: &str, counts: &[(&str, u64)]) {
        let mut out = format!(
            "{{\"type\":\"perf.counts\",\"name\":\"{}\",\"counts\":{{",
            json_escape(name)
        );
        for (idx, (key, value)) in counts.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(&format!("\"{}\":{}", json_escape(key), value));
        }
        out.push_str("}}");
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{out}");
        }
    }

    /// Writes the per-span totals gathered so far and flushes the file.
    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let totals = std::mem::take(&mut state.span_totals);
            let counts = std::mem::take(&mut state.span_counts);
            if !totals.is_empty() {
                let mut spans = String::from("{");
                for (idx, (name, ms)) in totals.iter().enumerate() {
                    if idx > 0 {
                        spans.push(',');
                    }
                    let count = counts.get(name).copied().unwrap_or(0);
                    spans.push_str(&format!(
                        "\"{}\":{{\"ms\":{:.3},\"count\":{}}}",
                        json_escape(name),
                        ms,
                        count
                    ));
                }
                spans.push('}');
                let _ = writeln!(
                    state.writer,
                    "{{\"type\":\"perf.summary\",\"spans\":{spans}}}"
                );
            }
            let _ = state.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn spans_are_totalled_on_flush() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("tabletext_perf_{nanos}.jsonl"));
        let logger = PerfLogger::new(&path).expect("create log");
        logger.log_span_ms("render.table", 1.5);
        logger.log_span_ms("render.table", 2.0);
        logger.log_counts("render.nodes", &[("elements", 4), ("text", 3)]);
        logger.flush();

        let contents = std::fs::read_to_string(&path).expect("read log");
        let _ = std::fs::remove_file(&path);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4, "unexpected log: {contents}");
        assert_eq!(
            lines[2],
            "{\"type\":\"perf.counts\",\"name\":\"render.nodes\",\"counts\":{\"elements\":4,\"text\":3}}"
        );
        assert_eq!(
            lines[3],
            "{\"type\":\"perf.summary\",\"spans\":{\"render.table\":{\"ms\":3.500,\"count\":2}}}"
        );
    }
}
