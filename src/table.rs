use crate::canvas::Canvas;
use crate::style::{HorizontalAlignment, VerticalAlignment};

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn pad_to_width(text: &str, width: usize, align: HorizontalAlignment) -> String {
    let fill = width.saturating_sub(char_len(text));
    if fill == 0 {
        return text.to_string();
    }
    let (left, right) = match align {
        HorizontalAlignment::Left => (0, fill),
        HorizontalAlignment::Right => (fill, 0),
        HorizontalAlignment::Center => (fill / 2, fill - fill / 2),
    };
    let mut out = String::with_capacity(text.len() + fill);
    out.extend(std::iter::repeat_n(' ', left));
    out.push_str(text);
    out.extend(std::iter::repeat_n(' ', right));
    out
}

/// A table cell: a canvas plus the alignment used when the cell is grown to
/// its row height and column width.
#[derive(Debug, Clone)]
pub struct TableCell {
    canvas: Canvas,
    align: HorizontalAlignment,
    valign: VerticalAlignment,
    width: Option<usize>,
    line_widths: Vec<usize>,
    vertical_padding: usize,
}

impl TableCell {
    pub fn new(align: HorizontalAlignment, valign: VerticalAlignment) -> Self {
        Self {
            canvas: Canvas::new(),
            align,
            valign,
            width: None,
            line_widths: Vec::new(),
            vertical_padding: 0,
        }
    }

    pub fn with_text(text: &str) -> Self {
        let mut cell = Self::new(HorizontalAlignment::Left, VerticalAlignment::Top);
        cell.write(text);
        cell
    }

    pub fn align(&self) -> HorizontalAlignment {
        self.align
    }

    pub fn valign(&self) -> VerticalAlignment {
        self.valign
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn write(&mut self, text: &str) {
        self.canvas.write(text);
    }

    /// The cell's blocks; one per visual line once normalized.
    pub fn lines(&self) -> &[String] {
        self.canvas.blocks()
    }

    /// Block lengths recorded right before the last width change.
    pub fn line_widths(&self) -> &[usize] {
        &self.line_widths
    }

    /// Blank lines inserted above the content by height growth.
    pub fn vertical_padding(&self) -> usize {
        self.vertical_padding
    }

    /// Splits multi-line blocks so each block is exactly one line. An empty
    /// cell becomes a single empty line. Returns the line count.
    pub fn normalize(&mut self) -> usize {
        self.canvas.flush_inline();
        let blocks = self.canvas.blocks_mut();
        if blocks.iter().any(|block| block.contains('\n')) {
            let lines: Vec<String> = blocks
                .iter()
                .flat_map(|block| block.split('\n'))
                .map(str::to_string)
                .collect();
            *blocks = lines;
        }
        if blocks.is_empty() {
            blocks.push(String::new());
        }
        blocks.len()
    }

    pub fn height(&self) -> usize {
        self.canvas.blocks().len().max(1)
    }

    /// Grows the cell to `height` lines. Never shrinks; the blank lines go
    /// below, above or around the content depending on vertical alignment.
    pub fn set_height(&mut self, height: usize) {
        let rows = self.canvas.blocks().len();
        if height <= rows {
            return;
        }
        let missing = height - rows;
        let above = match self.valign {
            VerticalAlignment::Top => 0,
            VerticalAlignment::Middle => missing / 2,
            VerticalAlignment::Bottom => missing,
        };
        let below = missing - above;
        let blocks = self.canvas.blocks_mut();
        blocks.splice(0..0, std::iter::repeat_n(String::new(), above));
        blocks.extend(std::iter::repeat_n(String::new(), below));
        self.vertical_padding += above;
    }

    /// The explicit width once set, otherwise the longest line.
    pub fn width(&self) -> usize {
        if let Some(width) = self.width {
            return width;
        }
        self.canvas
            .blocks()
            .iter()
            .flat_map(|block| block.split('\n'))
            .map(char_len)
            .max()
            .unwrap_or(0)
    }

    /// Pads every block to `width` characters following the horizontal
    /// alignment. Setting the width the cell already has is a no-op once
    /// every line is padded.
    pub fn set_width(&mut self, width: usize) {
        if self.width == Some(width)
            && self.canvas.blocks().iter().all(|block| char_len(block) == width)
        {
            return;
        }
        let align = self.align;
        let blocks = self.canvas.blocks_mut();
        self.line_widths = blocks.iter().map(|block| char_len(block)).collect();
        for block in blocks.iter_mut() {
            *block = pad_to_width(block, width, align);
        }
        self.width = Some(width);
    }
}

#[derive(Debug, Clone)]
pub struct TableRow {
    cells: Vec<TableCell>,
    cell_separator: String,
}

impl TableRow {
    pub fn new(cell_separator: impl Into<String>) -> Self {
        Self {
            cells: Vec::new(),
            cell_separator: cell_separator.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[TableCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [TableCell] {
        &mut self.cells
    }

    pub fn push(&mut self, cell: TableCell) {
        self.cells.push(cell);
    }

    pub fn width(&self) -> usize {
        if self.cells.is_empty() {
            return 0;
        }
        let cells: usize = self.cells.iter().map(TableCell::width).sum();
        cells + char_len(&self.cell_separator) * (self.cells.len() - 1)
    }

    /// Joins same-index lines of all cells. Cells are expected to share one
    /// height; extra lines of taller cells are dropped.
    pub fn text(&self) -> String {
        let height = self
            .cells
            .iter()
            .map(|cell| cell.lines().len())
            .min()
            .unwrap_or(0);
        let mut lines = Vec::with_capacity(height);
        for line_idx in 0..height {
            let parts: Vec<&str> = self
                .cells
                .iter()
                .map(|cell| cell.lines()[line_idx].as_str())
                .collect();
            lines.push(parts.join(&self.cell_separator));
        }
        lines.join("\n")
    }
}

/// Resolved geometry of the last render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLayout {
    pub row_heights: Vec<usize>,
    pub column_widths: Vec<usize>,
}

impl TableLayout {
    pub fn columns(&self) -> usize {
        self.column_widths.len()
    }
}

/// A table under construction. Rows may hold different numbers of cells;
/// short rows are rendered as they are, without filler cells.
#[derive(Debug, Clone)]
pub struct Table {
    rows: Vec<TableRow>,
    cell_separator: String,
    layout: Option<TableLayout>,
    rendered: Option<String>,
}

impl Table {
    pub fn new(cell_separator: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            cell_separator: cell_separator.into(),
            layout: None,
            rendered: None,
        }
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn cell_separator(&self) -> &str {
        &self.cell_separator
    }

    pub fn is_ragged(&self) -> bool {
        let mut lens = self.rows.iter().map(TableRow::len);
        match lens.next() {
            Some(first) => lens.any(|len| len != first),
            None => false,
        }
    }

    pub fn layout(&self) -> Option<&TableLayout> {
        self.layout.as_ref()
    }

    pub fn add_row(&mut self) {
        self.invalidate();
        self.rows.push(TableRow::new(self.cell_separator.clone()));
    }

    /// Appends `cell` to the last row, opening a row first if there is none.
    /// Returns the cell's (row, column) position.
    pub fn add_cell(&mut self, cell: TableCell) -> (usize, usize) {
        if self.rows.is_empty() {
            self.add_row();
        }
        self.invalidate();
        let row_idx = self.rows.len() - 1;
        let row = &mut self.rows[row_idx];
        row.push(cell);
        (row_idx, row.len() - 1)
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut TableCell> {
        self.invalidate();
        let cell = self.rows.get_mut(row)?.cells.get_mut(column)?;
        cell.width = None;
        Some(cell)
    }

    fn invalidate(&mut self) {
        self.rendered = None;
        self.layout = None;
    }

    fn set_row_heights(&mut self) -> Vec<usize> {
        let mut heights = Vec::with_capacity(self.rows.len());
        for row in &mut self.rows {
            let height = row
                .cells
                .iter_mut()
                .map(TableCell::normalize)
                .max()
                .unwrap_or(0);
            for cell in &mut row.cells {
                cell.set_height(height);
            }
            heights.push(height);
        }
        heights
    }

    fn set_column_widths(&mut self) -> Vec<usize> {
        let max_columns = self.rows.iter().map(TableRow::len).max().unwrap_or(0);
        let mut widths = Vec::with_capacity(max_columns);
        for column_idx in 0..max_columns {
            let width = self
                .rows
                .iter()
                .filter_map(|row| row.cells.get(column_idx))
                .map(TableCell::width)
                .max()
                .unwrap_or(0);
            for row in &mut self.rows {
                if let Some(cell) = row.cells.get_mut(column_idx) {
                    cell.set_width(width);
                }
            }
            widths.push(width);
        }
        widths
    }

    /// Lays the table out and renders it: one line per cell line, rows
    /// separated by line breaks, with a trailing line break. The result is
    /// cached until the table is modified again.
    pub fn text(&mut self) -> String {
        if let Some(rendered) = &self.rendered {
            return rendered.clone();
        }
        let rendered = if self.rows.is_empty() {
            self.layout = Some(TableLayout::default());
            "\n".to_string()
        } else {
            let row_heights = self.set_row_heights();
            let column_widths = self.set_column_widths();
            self.layout = Some(TableLayout {
                row_heights,
                column_widths,
            });
            let rows: Vec<String> = self.rows.iter().map(TableRow::text).collect();
            let mut out = rows.join("\n");
            out.push('\n');
            out
        };
        self.rendered = Some(rendered.clone());
        rendered
    }
}
