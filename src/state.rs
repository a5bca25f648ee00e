use std::time::Instant;

use crate::canvas::Canvas;
use crate::debug::DebugLogger;
use crate::perf::PerfLogger;
use crate::style::{DisplayMode, ElementStyle, WhiteSpaceMode, element_style};
use crate::table::{Table, TableCell};
use crate::tags::HandlerTable;

pub const ROOT_TAG: &str = "#root";

/// Position of a cell inside the table stack of a [`DocumentState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSlot {
    pub table: usize,
    pub row: usize,
    pub column: usize,
}

/// One open element: its tag, resolved style and the canvas collecting its
/// text.
#[derive(Debug, Clone)]
pub struct Frame {
    pub tag: String,
    pub style: ElementStyle,
    pub canvas: Canvas,
    pub cell: Option<CellSlot>,
}

/// Stack machine mirroring the nesting of the walked tree. The bottom frame
/// belongs to no element and is never popped, so the stack is never empty.
pub struct DocumentState<'a> {
    frames: Vec<Frame>,
    tables: Vec<Table>,
    cell_separator: &'a str,
    handlers: &'a HandlerTable,
    debug: Option<&'a DebugLogger>,
    perf: Option<&'a PerfLogger>,
}

impl<'a> DocumentState<'a> {
    pub fn new(handlers: &'a HandlerTable, cell_separator: &'a str) -> Self {
        let style = ElementStyle::root();
        let mut canvas = Canvas::new();
        canvas.open_tag(&style);
        Self {
            frames: vec![Frame {
                tag: ROOT_TAG.to_string(),
                style,
                canvas,
                cell: None,
            }],
            tables: Vec::new(),
            cell_separator,
            handlers,
            debug: None,
            perf: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<&'a DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub(crate) fn with_perf(mut self, perf: Option<&'a PerfLogger>) -> Self {
        self.perf = perf;
        self
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn current(&self) -> &Frame {
        self.frames.last().expect("root frame is never popped")
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("root frame is never popped")
    }

    pub fn cell_separator(&self) -> &str {
        self.cell_separator
    }

    /// Opens `tag`: resolves its style from the parent frame, the built-in
    /// tag profile and `attributes`, pushes a frame with a fresh canvas and
    /// runs the tag's start handler.
    pub fn enter(&mut self, tag: &str, attributes: &[(String, String)]) {
        let (style, issues) = element_style(
            tag,
            attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &self.current().style,
        );
        if let Some(debug) = self.debug {
            debug.record_style_issues(tag, issues);
        }
        let mut canvas = Canvas::new();
        canvas.open_tag(&style);
        self.frames.push(Frame {
            tag: tag.to_string(),
            style,
            canvas,
            cell: None,
        });
        if let Some(handler) = self.handlers.start(tag) {
            handler(self, attributes);
        }
    }

    /// Closes `tag`: runs its end handler, pops the frame and merges the
    /// frame's canvas into the new current one.
    pub fn exit(&mut self, tag: &str) {
        if let Some(handler) = self.handlers.end(tag) {
            handler(self);
        }
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(frame) = self.frames.pop() {
            let parent = self.current_mut();
            frame.canvas.close_tag(&frame.style, &mut parent.canvas);
        }
    }

    /// Writes a text node into the current canvas, collapsing whitespace
    /// unless the current element preserves it.
    pub fn write_text(&mut self, text: &str) {
        let at_word_start = self.at_word_start();
        let frame = self.current_mut();
        match frame.style.white_space {
            WhiteSpaceMode::Pre => {
                let text = text.replace("\r\n", "\n").replace('\r', "\n");
                frame.canvas.write(&text);
            }
            WhiteSpaceMode::Normal => {
                let collapsed = collapse_whitespace(text);
                let collapsed = if at_word_start {
                    collapsed.trim_start_matches(' ')
                } else {
                    collapsed.as_str()
                };
                frame.canvas.write(collapsed);
            }
        }
    }

    /// True when the next inline text starts a word. Inline frames are
    /// transparent: the nearest pending text up to the enclosing block
    /// decides.
    pub fn at_word_start(&self) -> bool {
        for frame in self.frames.iter().rev() {
            if !frame.canvas.pending().is_empty() {
                return frame.canvas.at_word_start();
            }
            if frame.style.display == DisplayMode::Block || !frame.canvas.blocks().is_empty() {
                return true;
            }
        }
        true
    }

    pub fn write_newline(&mut self) {
        self.current_mut().canvas.write_newline();
    }

    pub fn open_table(&mut self) {
        self.tables.push(Table::new(self.cell_separator));
    }

    pub fn close_table(&mut self) -> Option<Table> {
        self.tables.pop()
    }

    pub fn current_table_mut(&mut self) -> Option<&mut Table> {
        self.tables.last_mut()
    }

    /// Adds `cell` to the innermost open table. Returns `None` outside tables.
    pub fn add_cell(&mut self, cell: TableCell) -> Option<CellSlot> {
        let table = self.tables.len().checked_sub(1)?;
        let (row, column) = self.tables[table].add_cell(cell);
        Some(CellSlot { table, row, column })
    }

    pub fn cell_mut(&mut self, slot: CellSlot) -> Option<&mut TableCell> {
        self.tables.get_mut(slot.table)?.cell_mut(slot.row, slot.column)
    }

    /// Lays out and renders `table`, recording diagnostics when enabled.
    pub fn render_table(&self, table: &mut Table) -> String {
        let start = Instant::now();
        let text = table.text();
        if let Some(perf) = self.perf {
            perf.log_since("render.table", start);
        }
        if let (Some(debug), Some(layout)) = (self.debug, table.layout()) {
            let cells = table.rows().iter().map(|row| row.len()).sum();
            debug.record_table(layout, cells, table.is_ragged());
        }
        text
    }

    /// Closes any frames left open and returns the accumulated text.
    pub fn finish(mut self) -> String {
        while self.frames.len() > 1 {
            let tag = self.current().tag.clone();
            self.exit(&tag);
        }
        self.current_mut().canvas.get_text()
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '\u{00A0}' {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn enter_and_exit_are_balanced() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        assert_eq!(state.depth(), 0);
        state.enter("div", &[]);
        state.enter("span", &[]);
        assert_eq!(state.depth(), 2);
        assert_eq!(state.current().tag, "span");
        state.exit("span");
        state.exit("div");
        assert_eq!(state.depth(), 0);
        state.exit("div");
        assert_eq!(state.depth(), 0, "root frame must survive stray exits");
    }

    #[test]
    fn style_comes_from_profile_attributes_and_parent() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("pre", &attrs(&[("style", "padding-left: 2em")]));
        assert_eq!(state.current().style.display, DisplayMode::Block);
        assert_eq!(state.current().style.padding_inline, 2);
        state.enter("span", &[]);
        assert_eq!(state.current().style.white_space, WhiteSpaceMode::Pre);
        assert_eq!(state.current().style.padding_inline, 0);
    }

    #[test]
    fn unhandled_tags_get_generic_treatment() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("custom-tag", &[]);
        state.write_text("kept");
        state.exit("custom-tag");
        assert_eq!(state.finish(), "kept");
    }

    #[test]
    fn whitespace_collapses_in_normal_mode() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("p", &[]);
        state.write_text("  hello \n\t world ");
        state.enter("b", &[]);
        state.write_text(" again");
        state.exit("b");
        state.exit("p");
        assert_eq!(state.finish(), "hello world again");
    }

    #[test]
    fn space_opening_inline_child_is_kept() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("p", &[]);
        state.write_text("a");
        state.enter("b", &[]);
        assert!(!state.at_word_start());
        state.write_text(" b");
        state.exit("b");
        state.enter("i", &[]);
        state.write_text(" c ");
        state.exit("i");
        state.write_text(" d");
        state.exit("p");
        assert_eq!(state.finish(), "a b c d");
    }

    #[test]
    fn space_after_block_boundary_is_dropped() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("div", &[]);
        state.enter("span", &[]);
        assert!(state.at_word_start());
        state.write_text("  x");
        state.exit("span");
        state.exit("div");
        assert_eq!(state.finish(), "x");
    }

    #[test]
    fn pre_keeps_whitespace() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("pre", &[]);
        state.write_text("  a\r\n   b");
        state.exit("pre");
        assert_eq!(state.finish(), "  a\n   b");
    }

    #[test]
    fn hidden_subtrees_are_dropped() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("div", &attrs(&[("style", "display:none")]));
        state.enter("p", &attrs(&[("style", "display:block")]));
        state.write_text("invisible");
        state.exit("p");
        state.exit("div");
        state.enter("p", &[]);
        state.write_text("visible");
        state.exit("p");
        assert_eq!(state.finish(), "visible");
    }

    #[test]
    fn finish_closes_open_frames() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        state.enter("div", &[]);
        state.enter("p", &[]);
        state.write_text("dangling");
        assert_eq!(state.finish(), "dangling");
    }

    #[test]
    fn cells_outside_tables_have_no_slot() {
        let handlers = HandlerTable::default();
        let mut state = DocumentState::new(&handlers, " ");
        assert_eq!(state.add_cell(TableCell::with_text("x")), None);
        state.open_table();
        let slot = state.add_cell(TableCell::with_text("x"));
        assert_eq!(
            slot,
            Some(CellSlot {
                table: 0,
                row: 0,
                column: 0
            })
        );
    }
}
