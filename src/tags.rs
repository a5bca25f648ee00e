use std::collections::HashMap;

use crate::canvas::Canvas;
use crate::state::DocumentState;
use crate::table::TableCell;

pub type StartHandler = fn(&mut DocumentState<'_>, &[(String, String)]);
pub type EndHandler = fn(&mut DocumentState<'_>);

/// Tag name to handler lookup for the structural tags. Tags without an entry
/// only get the generic style and canvas treatment.
#[derive(Clone)]
pub struct HandlerTable {
    start: HashMap<&'static str, StartHandler>,
    end: HashMap<&'static str, EndHandler>,
}

impl HandlerTable {
    pub fn empty() -> Self {
        Self {
            start: HashMap::new(),
            end: HashMap::new(),
        }
    }

    pub fn register_start(&mut self, tag: &'static str, handler: StartHandler) {
        self.start.insert(tag, handler);
    }

    pub fn register_end(&mut self, tag: &'static str, handler: EndHandler) {
        self.end.insert(tag, handler);
    }

    pub fn start(&self, tag: &str) -> Option<StartHandler> {
        self.start.get(tag).copied()
    }

    pub fn end(&self, tag: &str) -> Option<EndHandler> {
        self.end.get(tag).copied()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register_start("table", table_start_handler);
        table.register_start("tr", tr_start_handler);
        table.register_start("td", td_start_handler);
        table.register_start("th", td_start_handler);
        table.register_start("br", br_start_handler);
        table.register_end("table", table_end_handler);
        table.register_end("td", td_end_handler);
        table.register_end("th", td_end_handler);
        table
    }
}

pub fn br_start_handler(state: &mut DocumentState<'_>, _attributes: &[(String, String)]) {
    state.write_newline();
}

pub fn table_start_handler(state: &mut DocumentState<'_>, _attributes: &[(String, String)]) {
    state.open_table();
}

pub fn tr_start_handler(state: &mut DocumentState<'_>, _attributes: &[(String, String)]) {
    if let Some(table) = state.current_table_mut() {
        table.add_row();
    }
}

pub fn td_start_handler(state: &mut DocumentState<'_>, _attributes: &[(String, String)]) {
    let style = state.current().style;
    let cell = TableCell::new(style.align, style.valign);
    if let Some(slot) = state.add_cell(cell) {
        state.current_mut().cell = Some(slot);
    }
}

/// Moves the cell frame's text into the cell registered by the start
/// handler, leaving the frame empty so nothing leaks into the row.
pub fn td_end_handler(state: &mut DocumentState<'_>) {
    let frame = state.current_mut();
    let Some(slot) = frame.cell.take() else {
        return;
    };
    let style = frame.style;
    let mut content = std::mem::take(&mut frame.canvas);
    content.trim_pending_end();
    if let Some(cell) = state.cell_mut(slot) {
        content.close_tag(&style, cell.canvas_mut());
    }
}

/// Replaces the table frame's canvas with any stray text found inside the
/// table, followed by the rendered table.
pub fn table_end_handler(state: &mut DocumentState<'_>) {
    let Some(mut table) = state.close_table() else {
        return;
    };
    let rendered = state.render_table(&mut table);
    let frame = state.current_mut();
    let stray = frame.canvas.get_text();
    let stray = stray.trim();

    let mut canvas = Canvas::new();
    canvas.open_tag(&frame.style);
    if !stray.is_empty() {
        canvas.write(stray);
        canvas.write_newline();
    }
    canvas.write(rendered.strip_suffix('\n').unwrap_or(&rendered));
    canvas.flush_inline();
    frame.canvas = canvas;
}
