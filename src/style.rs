use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Block,
    Inline,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteSpaceMode {
    Normal,
    Pre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlignment {
    Left,
    Right,
    Center,
}

impl HorizontalAlignment {
    pub fn from_keyword(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "center" => Some(Self::Center),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlignment {
    pub fn from_keyword(value: &str) -> Option<Self> {
        match value {
            "top" => Some(Self::Top),
            "middle" => Some(Self::Middle),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Layout-relevant style of one element. Margins and padding are in em (one
/// em is one character cell, or one line for vertical margins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementStyle {
    pub display: DisplayMode,
    pub white_space: WhiteSpaceMode,
    pub align: HorizontalAlignment,
    pub valign: VerticalAlignment,
    pub margin_before: i32,
    pub margin_after: i32,
    pub padding_inline: i32,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            display: DisplayMode::Inline,
            white_space: WhiteSpaceMode::Normal,
            align: HorizontalAlignment::Left,
            valign: VerticalAlignment::Top,
            margin_before: 0,
            margin_after: 0,
            padding_inline: 0,
        }
    }
}

impl ElementStyle {
    /// Style of the synthetic frame sitting below the outermost element.
    pub fn root() -> Self {
        Self {
            display: DisplayMode::Block,
            ..Self::default()
        }
    }

    /// Starts a child style from `parent`. Whitespace and alignment carry over;
    /// a hidden parent hides the whole subtree.
    pub fn inherit(parent: &ElementStyle) -> Self {
        let display = if parent.display == DisplayMode::None {
            DisplayMode::None
        } else {
            DisplayMode::Inline
        };
        Self {
            display,
            white_space: parent.white_space,
            align: parent.align,
            valign: parent.valign,
            ..Self::default()
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.display == DisplayMode::None
    }
}

/// Counts of directives that had no effect. Never an error: callers only use
/// it for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleIssues {
    pub ignored_properties: u64,
    pub invalid_lengths: u64,
    pub invalid_alignments: u64,
}

impl StyleIssues {
    pub fn is_empty(&self) -> bool {
        self.ignored_properties == 0 && self.invalid_lengths == 0 && self.invalid_alignments == 0
    }

    pub fn merge(&mut self, other: StyleIssues) {
        self.ignored_properties += other.ignored_properties;
        self.invalid_lengths += other.invalid_lengths;
        self.invalid_alignments += other.invalid_alignments;
    }
}

type DirectiveFn = fn(&str, &mut ElementStyle, &mut StyleIssues);

// Aliases share one setter.
const PROPERTY_HANDLERS: &[(&str, DirectiveFn)] = &[
    ("display", apply_display),
    ("white-space", apply_white_space),
    ("margin-top", apply_margin_before),
    ("margin-before", apply_margin_before),
    ("margin-bottom", apply_margin_after),
    ("margin-after", apply_margin_after),
    ("padding-left", apply_padding_inline),
    ("padding-start", apply_padding_inline),
    ("horizontal-align", apply_horizontal_align),
    ("vertical-align", apply_vertical_align),
];

const ATTRIBUTE_HANDLERS: &[(&str, DirectiveFn)] = &[
    ("style", apply_style_attribute),
    ("align", apply_horizontal_align),
    ("valign", apply_vertical_align),
];

fn lookup(table: &[(&str, DirectiveFn)], name: &str) -> Option<DirectiveFn> {
    table
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, handler)| *handler)
}

/// Applies HTML attributes (`style`, `align`, `valign`) to `element`. Other
/// attribute names are skipped silently.
pub fn apply_attributes<'a, I>(attributes: I, element: &mut ElementStyle) -> StyleIssues
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut issues = StyleIssues::default();
    for (name, value) in attributes {
        if let Some(handler) = lookup(ATTRIBUTE_HANDLERS, name) {
            handler(value, element, &mut issues);
        }
    }
    issues
}

/// Applies a CSS declaration list such as `display: none; margin-top: 2em`.
pub fn apply_style(style: &str, element: &mut ElementStyle) -> StyleIssues {
    let mut issues = StyleIssues::default();
    apply_style_attribute(style, element, &mut issues);
    issues
}

fn apply_style_attribute(style: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    let style = style.to_lowercase();
    for directive in style.split(';') {
        let Some((key, value)) = directive.split_once(':') else {
            continue;
        };
        let key = key.trim().replace("-webkit-", "");
        let value = value.trim();
        match lookup(PROPERTY_HANDLERS, &key) {
            Some(handler) => handler(value, element, issues),
            None => issues.ignored_properties += 1,
        }
    }
}

fn apply_display(value: &str, element: &mut ElementStyle, _issues: &mut StyleIssues) {
    // display:none is sticky for the element.
    if element.display == DisplayMode::None {
        return;
    }
    element.display = match value {
        "block" => DisplayMode::Block,
        "none" => DisplayMode::None,
        _ => DisplayMode::Inline,
    };
}

fn apply_white_space(value: &str, element: &mut ElementStyle, _issues: &mut StyleIssues) {
    match value {
        "normal" | "nowrap" => element.white_space = WhiteSpaceMode::Normal,
        "pre" | "pre-line" | "pre-wrap" => element.white_space = WhiteSpaceMode::Pre,
        _ => {}
    }
}

/// Upper bounds for margins (blank lines) and inline padding (columns).
pub const MAX_MARGIN_LINES: i32 = 32;
pub const MAX_PADDING_COLUMNS: i32 = 160;

fn apply_margin_before(value: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    match parse_em(value) {
        Some(em) => element.margin_before = em.min(MAX_MARGIN_LINES),
        None => issues.invalid_lengths += 1,
    }
}

fn apply_margin_after(value: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    match parse_em(value) {
        Some(em) => element.margin_after = em.min(MAX_MARGIN_LINES),
        None => issues.invalid_lengths += 1,
    }
}

fn apply_padding_inline(value: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    match parse_em(value) {
        Some(em) => element.padding_inline = em.min(MAX_PADDING_COLUMNS),
        None => issues.invalid_lengths += 1,
    }
}

fn apply_horizontal_align(value: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    match HorizontalAlignment::from_keyword(value) {
        Some(align) => element.align = align,
        None => issues.invalid_alignments += 1,
    }
}

fn apply_vertical_align(value: &str, element: &mut ElementStyle, issues: &mut StyleIssues) {
    match VerticalAlignment::from_keyword(value) {
        Some(valign) => element.valign = valign,
        None => issues.invalid_alignments += 1,
    }
}

fn length_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(-?[0-9.]+)(\w+)").expect("valid length pattern"))
}

/// Converts a CSS length to whole em. Em-family units are rounded directly,
/// anything else counts 8 units per em. Ties round away from zero.
pub fn parse_em(length: &str) -> Option<i32> {
    let caps = length_pattern().captures(length)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let unit = caps.get(2)?.as_str();
    let em = match unit {
        "em" | "qem" | "rem" => value.round(),
        _ => (value / 8.0).round(),
    };
    Some(em.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

/// Built-in per-tag declarations, applied before the element's own
/// attributes.
pub(crate) fn user_agent_declarations(tag: &str) -> Option<&'static str> {
    let declarations = match tag {
        "head" | "script" | "style" | "title" | "template" | "noscript" => "display: none",
        "pre" => "display: block; white-space: pre",
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            "display: block; margin-top: 1em; margin-bottom: 1em"
        }
        "blockquote" | "dd" => "display: block; padding-left: 4em",
        "th" => "display: block; horizontal-align: center",
        "html" | "body" | "div" | "p" | "section" | "article" | "header" | "footer" | "aside"
        | "nav" | "main" | "ul" | "ol" | "dl" | "dt" | "li" | "table" | "thead" | "tbody"
        | "tfoot" | "tr" | "td" | "caption" | "form" | "hr" => "display: block",
        _ => return None,
    };
    Some(declarations)
}

/// Computes the style of a `tag` element opened under `parent`.
pub fn element_style<'a, I>(
    tag: &str,
    attributes: I,
    parent: &ElementStyle,
) -> (ElementStyle, StyleIssues)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut style = ElementStyle::inherit(parent);
    if let Some(declarations) = user_agent_declarations(tag) {
        apply_style(declarations, &mut style);
    }
    let issues = apply_attributes(attributes, &mut style);
    (style, issues)
}
