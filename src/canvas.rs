use crate::style::{DisplayMode, ElementStyle, MAX_MARGIN_LINES, MAX_PADDING_COLUMNS};

fn margin_lines(margin: i32) -> usize {
    margin.clamp(0, MAX_MARGIN_LINES) as usize
}

/// Text accumulated for one element's subtree: sealed blocks plus the inline
/// text that has not been sealed yet. A block may still contain `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canvas {
    blocks: Vec<String>,
    pending: String,
    suppressed: bool,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<String> {
        &mut self.blocks
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.pending.is_empty()
    }

    /// True when the next inline write starts at a word boundary.
    pub fn at_word_start(&self) -> bool {
        self.pending.is_empty() || self.pending.ends_with(' ')
    }

    pub fn write(&mut self, text: &str) {
        if text.is_empty() || self.suppressed {
            return;
        }
        self.pending.push_str(text);
    }

    /// Seals the pending text into a block. Returns false when there was
    /// nothing to seal.
    pub fn flush_inline(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.blocks.push(std::mem::take(&mut self.pending));
        true
    }

    /// Forces a block boundary, producing an empty line if nothing is pending.
    pub fn write_newline(&mut self) {
        if self.suppressed {
            return;
        }
        if !self.flush_inline() {
            self.blocks.push(String::new());
        }
    }

    pub fn trim_pending_end(&mut self) {
        let trimmed = self.pending.trim_end_matches(' ').len();
        self.pending.truncate(trimmed);
    }

    /// Binds the canvas to the element it collects text for. Writes into a
    /// hidden element's canvas are dropped.
    pub fn open_tag(&mut self, element: &ElementStyle) {
        self.suppressed = element.is_hidden();
    }

    /// Seals this canvas and merges it into `parent`. Margins become blank
    /// lines around the content and every content line is indented by the
    /// element's inline padding. Block elements land in their own block of
    /// the parent, inline ones continue the parent's pending text.
    pub fn close_tag(mut self, element: &ElementStyle, parent: &mut Canvas) {
        if self.suppressed || element.is_hidden() {
            return;
        }
        // An inline element whose text ended on a sealed boundary (e.g. a
        // trailing <br>) passes that boundary on to the parent.
        let ended_open = !self.pending.is_empty();
        self.flush_inline();
        if self.blocks.is_empty() {
            // An empty block element still ends the parent's line.
            if element.display == DisplayMode::Block && !parent.suppressed {
                parent.flush_inline();
            }
            return;
        }

        let indent = " ".repeat(element.padding_inline.clamp(0, MAX_PADDING_COLUMNS) as usize);
        let mut lines: Vec<String> = Vec::new();
        lines.extend(std::iter::repeat_n(String::new(), margin_lines(element.margin_before)));
        for block in &self.blocks {
            for line in block.split('\n') {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }
        lines.extend(std::iter::repeat_n(String::new(), margin_lines(element.margin_after)));
        let text = lines.join("\n");

        if parent.suppressed {
            return;
        }
        match element.display {
            DisplayMode::Block => {
                parent.flush_inline();
                parent.blocks.push(text);
            }
            _ => {
                parent.pending.push_str(&text);
                if !ended_open {
                    parent.write_newline();
                }
            }
        }
    }

    /// Seals pending text and returns all blocks joined by line breaks.
    pub fn get_text(&mut self) -> String {
        self.flush_inline();
        self.blocks.join("\n")
    }
}
