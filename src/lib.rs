mod canvas;
mod debug;
mod error;
mod html;
mod perf;
mod state;
mod style;
mod table;
mod tags;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink;

pub use canvas::Canvas;
pub use error::TableTextError;
pub use state::{CellSlot, DocumentState, Frame, ROOT_TAG};
pub use style::{
    DisplayMode, ElementStyle, HorizontalAlignment, MAX_MARGIN_LINES, MAX_PADDING_COLUMNS,
    StyleIssues, VerticalAlignment, WhiteSpaceMode, apply_attributes, apply_style, element_style, parse_em,
};
pub use table::{Table, TableCell, TableLayout, TableRow};
pub use tags::{
    EndHandler, HandlerTable, StartHandler, br_start_handler, table_end_handler,
    table_start_handler, td_end_handler, td_start_handler, tr_start_handler,
};

use debug::DebugLogger;
use perf::PerfLogger;

pub const DEFAULT_CELL_SEPARATOR: &str = "  ";

/// Configured renderer. Cheap to clone; loggers are shared between clones.
#[derive(Clone)]
pub struct TableText {
    cell_separator: String,
    handlers: HandlerTable,
    debug: Option<Arc<DebugLogger>>,
    perf: Option<Arc<PerfLogger>>,
}

#[derive(Clone)]
pub struct TableTextBuilder {
    cell_separator: String,
    handlers: HandlerTable,
    debug_path: Option<PathBuf>,
    perf_path: Option<PathBuf>,
}

impl TableText {
    pub fn builder() -> TableTextBuilder {
        TableTextBuilder::new()
    }

    pub fn cell_separator(&self) -> &str {
        &self.cell_separator
    }

    /// Renders the subtree under `root` to plain text.
    pub fn render(&self, root: &NodeRef) -> String {
        let text = self.render_node(root);
        self.emit_debug_summary("render");
        text
    }

    /// Parses `html`, replaces every outermost `<table>` with a `<pre>`
    /// holding its rendered text and returns the serialized document.
    /// Nested tables are rendered as part of their enclosing table.
    pub fn extract_tables(&self, html: &str) -> String {
        let start = Instant::now();
        let document = kuchiki::parse_html().one(html);
        if let Some(perf) = self.perf.as_deref() {
            perf.log_since("render.parse_html", start);
        }
        for table in html::outermost_tables(&document) {
            let text = self.render_node(&table);
            html::replace_with_pre(&table, &text);
        }
        self.emit_debug_summary("extract_tables");
        document.to_string()
    }

    fn render_node(&self, root: &NodeRef) -> String {
        let start = Instant::now();
        let mut state = DocumentState::new(&self.handlers, &self.cell_separator)
            .with_debug(self.debug.as_deref())
            .with_perf(self.perf.as_deref());
        let counts = html::walk(root, &mut state);
        let text = state.finish();
        if let Some(perf) = self.perf.as_deref() {
            perf.log_since("render.walk", start);
            perf.log_counts(
                "render.nodes",
                &[
                    ("elements", counts.elements),
                    ("text_nodes", counts.text_nodes),
                    ("max_depth", counts.max_depth as u64),
                ],
            );
        }
        text
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
        if let Some(perf) = self.perf.as_deref() {
            perf.flush();
        }
    }
}

impl Default for TableText {
    fn default() -> Self {
        Self {
            cell_separator: DEFAULT_CELL_SEPARATOR.to_string(),
            handlers: HandlerTable::default(),
            debug: None,
            perf: None,
        }
    }
}

impl TableTextBuilder {
    pub fn new() -> Self {
        Self {
            cell_separator: DEFAULT_CELL_SEPARATOR.to_string(),
            handlers: HandlerTable::default(),
            debug_path: None,
            perf_path: None,
        }
    }

    pub fn cell_separator(mut self, separator: impl Into<String>) -> Self {
        self.cell_separator = separator.into();
        self
    }

    /// Replaces the structural tag handlers.
    pub fn handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TableText, TableTextError> {
        if self.cell_separator.contains('\n') || self.cell_separator.contains('\r') {
            return Err(TableTextError::InvalidConfiguration(
                "cell_separator must not contain a line break".to_string(),
            ));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let perf = if let Some(path) = self.perf_path {
            Some(Arc::new(PerfLogger::new(path)?))
        } else {
            None
        };
        Ok(TableText {
            cell_separator: self.cell_separator,
            handlers: self.handlers,
            debug,
            perf,
        })
    }
}

impl Default for TableTextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the subtree under `root` with the default configuration.
pub fn render(root: &NodeRef) -> String {
    TableText::default().render(root)
}

/// [`TableText::extract_tables`] with the default configuration.
pub fn extract_tables(html: &str) -> String {
    TableText::default().extract_tables(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_log(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!("tabletext_{name}_{nanos}.jsonl"))
    }

    fn parse(html: &str) -> NodeRef {
        kuchiki::parse_html().one(html)
    }

    #[test]
    fn render_uses_default_separator() {
        let document = parse(
            "<table><tr><td>a</td><td>bb</td></tr><tr><td>ccc</td><td>d</td></tr></table>",
        );
        assert_eq!(render(&document), "a    bb\nccc  d ");
    }

    #[test]
    fn ragged_rows_keep_their_cell_count() {
        let renderer = TableText::builder()
            .cell_separator(" | ")
            .build()
            .expect("valid configuration");
        let document = parse(
            "<table><tr><td>1</td><td>2</td><td>3</td></tr><tr><td>long</td></tr></table>",
        );
        assert_eq!(renderer.cell_separator(), " | ");
        assert_eq!(renderer.render(&document), "1    | 2 | 3\nlong");
    }

    #[test]
    fn render_is_repeatable() {
        let document = parse(
            r##"<table><tr><td align="right">1</td><td>22</td></tr><tr><td>333</td></tr></table>"##,
        );
        let renderer = TableText::default();
        let first = renderer.render(&document);
        assert_eq!(first, "  1  22\n333");
        assert_eq!(renderer.render(&document), first);
    }

    #[test]
    fn hidden_markup_inside_cells_is_dropped() {
        let document = parse(
            r##"<table><tr>
                <td>a<span style="display:none">hidden</span></td>
                <td><script>var x = 1;</script>b</td>
            </tr></table>"##,
        );
        assert_eq!(render(&document), "a  b");
    }

    #[test]
    fn malformed_styles_do_not_fail() {
        let document = parse(
            r##"<table><tr>
                <td style="margin-top: ; padding-left: abc; ;;: ; color: red">x</td>
                <td align="sideways" valign="">y</td>
            </tr></table>"##,
        );
        assert_eq!(render(&document), "x  y");
    }

    #[test]
    fn spaces_between_inline_siblings_survive() {
        let document = parse("<table><tr><td>Hello<b> world</b></td><td>x</td></tr></table>");
        assert_eq!(render(&document), "Hello world  x");

        let document = parse("<p>Click<a href=\"#\"> here</a> or <i>there </i>now</p>");
        assert_eq!(render(&document), "Click here or there now");
    }

    #[test]
    fn huge_margins_and_padding_are_bounded() {
        let document = parse(
            r##"<table><tr><td><div style="margin-top: 2147483647em; padding-left: 2147483647em">x</div></td></tr></table>"##,
        );
        let out = render(&document);
        let lines: Vec<&str> = out.lines().collect();
        let width = MAX_PADDING_COLUMNS as usize + 1;
        assert_eq!(lines.len(), MAX_MARGIN_LINES as usize + 1);
        assert!(lines.iter().all(|line| line.chars().count() == width));
        assert_eq!(
            lines.last().copied(),
            Some(format!("{}x", " ".repeat(MAX_PADDING_COLUMNS as usize)).as_str())
        );
    }

    #[test]
    fn empty_table_still_breaks_the_line() {
        let document = parse("<div>a<table></table>b</div>");
        assert_eq!(render(&document), "a\nb");
    }

    #[test]
    fn builder_rejects_multiline_separator() {
        let result = TableText::builder().cell_separator("|\n|").build();
        assert!(matches!(
            result,
            Err(TableTextError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn builder_reports_unwritable_log() {
        let path = std::env::temp_dir()
            .join("tabletext_missing_dir")
            .join("nested")
            .join("debug.jsonl");
        let result = TableText::builder().debug_log(path).build();
        match result {
            Err(err @ TableTextError::Io(_)) => {
                assert!(std::error::Error::source(&err).is_some());
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("log file in a missing directory should fail"),
        }
    }

    #[test]
    fn custom_handler_table_replaces_defaults() {
        let renderer = TableText::builder()
            .handlers(HandlerTable::empty())
            .build()
            .expect("valid configuration");
        let document = parse("<table><tr><td>a</td><td>b</td></tr></table>");
        // Without structural handlers every cell is just another block.
        assert_eq!(renderer.render(&document), "a\nb");
    }

    #[test]
    fn extract_tables_swaps_tables_for_pre() {
        let html = "<p>before</p><table><tr><td>a</td><td>b</td></tr></table><p>after</p>";
        let out = extract_tables(html);
        assert!(out.contains("<p>before</p>"), "unexpected output: {out}");
        assert!(out.contains("<pre>a  b</pre>"), "unexpected output: {out}");
        assert!(out.contains("<p>after</p>"), "unexpected output: {out}");
        assert!(!out.contains("<table"), "unexpected output: {out}");
    }

    #[test]
    fn extract_tables_renders_nested_tables_once() {
        let html = "<table><tr><td><table><tr><td>x</td></tr></table></td><td>y</td></tr></table>";
        let out = extract_tables(html);
        assert_eq!(out.matches("<pre>").count(), 1, "unexpected output: {out}");
        assert!(out.contains("<pre>x  y</pre>"), "unexpected output: {out}");
    }

    #[test]
    fn extract_tables_escapes_cell_text() {
        let out = extract_tables("<table><tr><td>a &lt; b</td></tr></table>");
        assert!(out.contains("<pre>a &lt; b</pre>"), "unexpected output: {out}");
    }

    #[test]
    fn loggers_record_tables_and_spans() {
        let debug_path = temp_log("lib_debug");
        let perf_path = temp_log("lib_perf");
        let renderer = TableText::builder()
            .debug_log(&debug_path)
            .perf_log(&perf_path)
            .build()
            .expect("valid configuration");
        let out = renderer.extract_tables(
            r##"<table><tr><td style="margin-top: abc; color: red">a</td></tr><tr><td>b</td><td>c</td></tr></table>"##,
        );
        assert!(out.contains("<pre>"), "unexpected output: {out}");

        let debug = std::fs::read_to_string(&debug_path).expect("read debug log");
        let perf = std::fs::read_to_string(&perf_path).expect("read perf log");
        let _ = std::fs::remove_file(&debug_path);
        let _ = std::fs::remove_file(&perf_path);

        assert!(debug.contains("\"type\":\"table.layout\""), "debug log: {debug}");
        assert!(debug.contains("\"ragged\":true"), "debug log: {debug}");
        assert!(debug.contains("\"context\":\"extract_tables\""), "debug log: {debug}");
        assert!(debug.contains("\"style.invalid_length\":1"), "debug log: {debug}");
        assert!(debug.contains("\"style.ignored_property\":1"), "debug log: {debug}");
        assert!(debug.contains("\"table.rendered\":1"), "debug log: {debug}");
        for span in ["render.parse_html", "render.walk", "render.table"] {
            assert!(perf.contains(span), "missing span {span} in perf log: {perf}");
        }
        assert!(perf.contains("\"type\":\"perf.summary\""), "perf log: {perf}");
    }
}
