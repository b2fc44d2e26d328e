//! Markdown to styled, width-wrapped terminal lines.

use std::collections::HashMap;

use markdown::mdast::{self, Node};
use markdown::{to_mdast, ParseOptions};

use super::theme::{DefaultTextStyle, MarkdownTheme};
use crate::core::text::slice::wrap_text_with_ansi;
use crate::core::text::utils::{apply_background_to_line, style_prefix};
use crate::core::text::width::visible_width;

const TAB_REPLACEMENT: &str = "   ";
const QUOTE_BORDER: &str = "│ ";
const MAX_HR_WIDTH: usize = 80;
const MAX_UNBROKEN_WORD_WIDTH: usize = 30;

#[derive(Clone, Copy, PartialEq, Eq)]
enum InlineStyleKind {
    Default,
    Quote,
}

/// Style in effect for inline text, plus the escape prefix that restores it after a span.
struct InlineStyle {
    kind: InlineStyleKind,
    prefix: String,
}

struct FormatCache {
    text: String,
    width: usize,
    lines: Vec<String>,
}

/// Renders chat-style markdown into display lines no wider than the requested width.
///
/// Output for the last `(text, width)` pair is cached until the input changes or
/// [`MarkdownFormatter::invalidate`] is called.
pub struct MarkdownFormatter {
    theme: MarkdownTheme,
    default_text_style: Option<DefaultTextStyle>,
    default_prefix: String,
    padding_x: usize,
    padding_y: usize,
    cache: Option<FormatCache>,
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new(MarkdownTheme::default(), None)
    }
}

impl MarkdownFormatter {
    pub fn new(theme: MarkdownTheme, default_text_style: Option<DefaultTextStyle>) -> Self {
        let mut formatter = Self {
            theme,
            default_text_style,
            default_prefix: String::new(),
            padding_x: 0,
            padding_y: 0,
            cache: None,
        };
        formatter.default_prefix = formatter.compute_default_prefix();
        formatter
    }

    /// Blank columns on each side and blank rows above and below the content.
    pub fn with_padding(mut self, padding_x: usize, padding_y: usize) -> Self {
        self.set_padding(padding_x, padding_y);
        self
    }

    pub fn set_padding(&mut self, padding_x: usize, padding_y: usize) {
        self.padding_x = padding_x;
        self.padding_y = padding_y;
        self.invalidate();
    }

    pub fn set_theme(&mut self, theme: MarkdownTheme) {
        self.theme = theme;
        self.default_prefix = self.compute_default_prefix();
        self.invalidate();
    }

    pub fn set_default_text_style(&mut self, style: Option<DefaultTextStyle>) {
        self.default_text_style = style;
        self.default_prefix = self.compute_default_prefix();
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn compute_default_prefix(&self) -> String {
        match self.default_text_style.as_ref() {
            Some(style) => style_prefix(&|text| apply_default_style(&self.theme, style, text)),
            None => String::new(),
        }
    }

    /// Render `text` into lines of at most `width` visible columns.
    ///
    /// Blank input yields exactly one empty line. Malformed or unsupported markup is shown as
    /// its literal source.
    pub fn format(&mut self, text: &str, width: usize) -> Vec<String> {
        let width = width.max(1);
        if let Some(cache) = self.cache.as_ref() {
            if cache.width == width && cache.text == text {
                return cache.lines.clone();
            }
        }

        let lines = if text.trim().is_empty() {
            vec![String::new()]
        } else {
            self.format_uncached(text, width)
        };

        self.cache = Some(FormatCache {
            text: text.to_string(),
            width,
            lines: lines.clone(),
        });
        lines
    }

    fn format_uncached(&self, text: &str, width: usize) -> Vec<String> {
        let content_width = width.saturating_sub(self.padding_x * 2).max(1);
        let source = text.replace('\t', TAB_REPLACEMENT);

        let mut pass = Pass {
            theme: &self.theme,
            default_text_style: self.default_text_style.as_ref(),
            source: &source,
            definitions: HashMap::new(),
        };
        let rendered = match to_mdast(&source, &ParseOptions::gfm()) {
            Ok(Node::Root(root)) => {
                collect_definitions(&root.children, &mut pass.definitions);
                pass.render_blocks(
                    &root.children,
                    content_width,
                    &self.default_inline_style(),
                    true,
                )
            }
            Ok(other) => pass.render_block(&other, content_width, &self.default_inline_style()),
            Err(error) => {
                tracing::debug!(?error, "markdown parse failed, rendering literal text");
                wrap_text_with_ansi(&source, content_width)
            }
        };

        let bg_fn = self
            .default_text_style
            .as_ref()
            .and_then(|style| style.bg_color.as_deref());
        let margin = " ".repeat(self.padding_x);
        let finish = |line: &str| match bg_fn {
            Some(bg_fn) => {
                apply_background_to_line(&format!("{margin}{line}{margin}"), width, bg_fn)
            }
            None if line.is_empty() => String::new(),
            None => format!("{margin}{line}"),
        };

        let blank = finish("");
        let mut lines = vec![blank.clone(); self.padding_y];
        for line in &rendered {
            for wrapped in wrap_text_with_ansi(line, content_width) {
                lines.push(finish(&wrapped));
            }
        }
        lines.extend(std::iter::repeat(blank).take(self.padding_y));
        lines
    }

    fn default_inline_style(&self) -> InlineStyle {
        InlineStyle {
            kind: InlineStyleKind::Default,
            prefix: self.default_prefix.clone(),
        }
    }
}

fn apply_default_style(theme: &MarkdownTheme, style: &DefaultTextStyle, text: &str) -> String {
    let mut styled = text.to_string();
    if let Some(color) = style.color.as_ref() {
        styled = color(&styled);
    }
    if style.bold {
        styled = (theme.bold)(&styled);
    }
    if style.italic {
        styled = (theme.italic)(&styled);
    }
    if style.strikethrough {
        styled = (theme.strikethrough)(&styled);
    }
    if style.underline {
        styled = (theme.underline)(&styled);
    }
    styled
}

/// One formatting pass over a parsed document.
struct Pass<'a> {
    theme: &'a MarkdownTheme,
    default_text_style: Option<&'a DefaultTextStyle>,
    source: &'a str,
    /// Link reference definitions by normalized identifier.
    definitions: HashMap<String, String>,
}

fn collect_definitions(nodes: &[Node], definitions: &mut HashMap<String, String>) {
    for node in nodes {
        match node {
            // The first definition of an identifier wins.
            Node::Definition(definition) => {
                definitions
                    .entry(definition.identifier.clone())
                    .or_insert_with(|| definition.url.clone());
            }
            other => {
                if let Some(children) = other.children() {
                    collect_definitions(children, definitions);
                }
            }
        }
    }
}

impl Pass<'_> {
    fn style_text(&self, text: &str, style: &InlineStyle) -> String {
        text.split('\n')
            .map(|segment| match style.kind {
                InlineStyleKind::Default => match self.default_text_style {
                    Some(default) => apply_default_style(self.theme, default, segment),
                    None => segment.to_string(),
                },
                InlineStyleKind::Quote => (self.theme.quote)(&(self.theme.italic)(segment)),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn source_of(&self, node: &Node) -> Option<&str> {
        let position = node.position()?;
        let start = position.start.offset.min(self.source.len());
        let end = position.end.offset.min(self.source.len());
        if start >= end {
            return None;
        }
        self.source.get(start..end)
    }

    /// Literal source text for constructs this formatter has no rendering for.
    fn literal(&self, node: &Node, style: &InlineStyle) -> String {
        match self.source_of(node) {
            Some(raw) => self.style_text(raw, style),
            None => self.style_text(&node.to_string(), style),
        }
    }

    fn render_inline(&self, nodes: &[Node], style: &InlineStyle) -> String {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&self.style_text(&text.value, style)),
                Node::Strong(strong) => {
                    let content = self.render_inline(&strong.children, style);
                    out.push_str(&(self.theme.bold)(&content));
                    out.push_str(&style.prefix);
                }
                Node::Emphasis(emphasis) => {
                    let content = self.render_inline(&emphasis.children, style);
                    out.push_str(&(self.theme.italic)(&content));
                    out.push_str(&style.prefix);
                }
                Node::Delete(delete) => {
                    let content = self.render_inline(&delete.children, style);
                    out.push_str(&(self.theme.strikethrough)(&content));
                    out.push_str(&style.prefix);
                }
                Node::InlineCode(code) => {
                    out.push_str(&(self.theme.code)(&code.value));
                    out.push_str(&style.prefix);
                }
                Node::Link(link) => {
                    out.push_str(&self.render_link(&link.children, Some(&link.url), style));
                }
                Node::LinkReference(reference) => {
                    let href = self.definitions.get(&reference.identifier);
                    out.push_str(&self.render_link(&reference.children, href, style));
                }
                Node::Image(image) => {
                    let alt = if image.alt.is_empty() {
                        image.url.as_str()
                    } else {
                        image.alt.as_str()
                    };
                    out.push_str(&self.style_text(alt, style));
                }
                Node::Break(_) => out.push('\n'),
                Node::Html(html) => out.push_str(&self.style_text(&html.value, style)),
                Node::InlineMath(math) => out.push_str(&self.style_text(&math.value, style)),
                Node::Paragraph(paragraph) => {
                    out.push_str(&self.render_inline(&paragraph.children, style))
                }
                other => out.push_str(&self.literal(other, style)),
            }
        }
        out
    }

    /// Underlined label, followed by the target when it differs from the label text.
    fn render_link(
        &self,
        children: &[Node],
        href: Option<&String>,
        style: &InlineStyle,
    ) -> String {
        let label = self.render_inline(children, style);
        let mut out = (self.theme.link)(&(self.theme.underline)(&label));
        if let Some(href) = href {
            let plain = plain_text(children);
            let bare_href = href.strip_prefix("mailto:").unwrap_or(href);
            if plain != *href && plain != bare_href {
                out.push_str(&(self.theme.link_url)(&format!(" ({href})")));
            }
        }
        out.push_str(&style.prefix);
        out
    }

    /// Render a run of sibling blocks. `loose` separates them with blank lines.
    ///
    /// Definitions produce no lines; their targets show up on the references instead.
    fn render_blocks(
        &self,
        nodes: &[Node],
        width: usize,
        style: &InlineStyle,
        loose: bool,
    ) -> Vec<String> {
        let blocks: Vec<&Node> = nodes
            .iter()
            .filter(|node| !matches!(node, Node::Definition(_)))
            .collect();
        let mut lines = Vec::new();
        for (idx, &node) in blocks.iter().enumerate() {
            if idx > 0 && loose && self.separated(blocks[idx - 1], node) {
                lines.push(String::new());
            }
            lines.extend(self.render_block(node, width, style));
        }
        lines
    }

    /// A paragraph running straight into a list stays attached to it.
    fn separated(&self, previous: &Node, next: &Node) -> bool {
        if !matches!((previous, next), (Node::Paragraph(_), Node::List(_))) {
            return true;
        }
        match (previous.position(), next.position()) {
            (Some(prev), Some(next)) => {
                has_blank_line_between(self.source, prev.end.offset, next.start.offset)
            }
            _ => true,
        }
    }

    fn render_block(&self, node: &Node, width: usize, style: &InlineStyle) -> Vec<String> {
        match node {
            Node::Heading(heading) => {
                let text = self.render_inline(&heading.children, style);
                let theme = self.theme;
                let styled = match heading.depth {
                    1 => (theme.heading)(&(theme.bold)(&(theme.underline)(&text))),
                    2 => (theme.heading)(&(theme.bold)(&text)),
                    depth => {
                        let hashes = "#".repeat(usize::from(depth));
                        (theme.heading)(&(theme.bold)(&format!("{hashes} {text}")))
                    }
                };
                wrap_text_with_ansi(&styled, width)
            }
            Node::Paragraph(paragraph) => {
                wrap_text_with_ansi(&self.render_inline(&paragraph.children, style), width)
            }
            Node::Code(code) => self.render_code(code),
            Node::List(list) => self.render_list(list, width, style),
            Node::Blockquote(quote) => self.render_blockquote(quote, width),
            Node::ThematicBreak(_) => vec![(self.theme.hr)(&"─".repeat(width.min(MAX_HR_WIDTH)))],
            Node::Html(html) => wrap_text_with_ansi(&self.style_text(html.value.trim(), style), width),
            Node::Math(math) => math
                .value
                .split('\n')
                .map(|line| (self.theme.code_block)(line))
                .collect(),
            Node::Table(table) => self.render_table(node, table, width),
            Node::Definition(_) => Vec::new(),
            other => wrap_text_with_ansi(&self.literal(other, style), width),
        }
    }

    fn render_code(&self, code: &mdast::Code) -> Vec<String> {
        let indent = self.theme.code_block_indent.as_deref().unwrap_or("  ");
        let lang = code.lang.as_deref();
        let mut lines = vec![(self.theme.code_block_border)(&format!(
            "```{}",
            lang.unwrap_or_default()
        ))];
        match self.theme.highlight_code.as_ref() {
            Some(highlight) => {
                for line in highlight(&code.value, lang) {
                    lines.push(format!("{indent}{line}"));
                }
            }
            None => {
                for line in code.value.split('\n') {
                    lines.push(format!("{indent}{}", (self.theme.code_block)(line)));
                }
            }
        }
        lines.push((self.theme.code_block_border)("```"));
        lines
    }

    /// Items are laid out structurally: an item's body, nested lists included, is rendered at
    /// the width left after its bullet and then indented under it.
    fn render_list(&self, list: &mdast::List, width: usize, style: &InlineStyle) -> Vec<String> {
        let mut lines = Vec::new();
        let start = list.start.unwrap_or(1);
        let items: Vec<&mdast::ListItem> = list
            .children
            .iter()
            .filter_map(|node| match node {
                Node::ListItem(item) => Some(item),
                _ => None,
            })
            .collect();

        for (idx, item) in items.iter().enumerate() {
            let mut bullet = if list.ordered {
                format!("{}. ", u64::from(start) + idx as u64)
            } else {
                "- ".to_string()
            };
            if let Some(checked) = item.checked {
                bullet.push_str(if checked { "[x] " } else { "[ ] " });
            }
            let bullet_width = visible_width(&bullet);
            let styled_bullet = (self.theme.list_bullet)(&bullet);
            let indent = " ".repeat(bullet_width);

            let body_width = width.saturating_sub(bullet_width).max(1);
            let loose = list.spread || item.spread;
            let body = self.render_blocks(&item.children, body_width, style, loose);

            let mut body = body.into_iter();
            match body.next() {
                Some(first) => lines.push(format!("{styled_bullet}{first}")),
                None => lines.push(styled_bullet),
            }
            for line in body {
                if line.is_empty() {
                    lines.push(line);
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
            if list.spread && idx + 1 < items.len() {
                lines.push(String::new());
            }
        }
        lines
    }

    fn render_blockquote(&self, quote: &mdast::Blockquote, width: usize) -> Vec<String> {
        let theme = self.theme;
        let style = InlineStyle {
            kind: InlineStyleKind::Quote,
            prefix: style_prefix(&|text| (theme.quote)(&(theme.italic)(text))),
        };
        let border = (theme.quote_border)(QUOTE_BORDER);
        let inner_width = width.saturating_sub(visible_width(QUOTE_BORDER)).max(1);

        let inner = self.render_blocks(&quote.children, inner_width, &style, true);
        inner
            .into_iter()
            .map(|line| format!("{border}{line}"))
            .collect()
    }

    fn render_cell(&self, cell: &Node) -> String {
        let style = InlineStyle {
            kind: InlineStyleKind::Default,
            prefix: String::new(),
        };
        match cell {
            Node::TableCell(cell) => self.render_inline(&cell.children, &style),
            other => self.render_inline(std::slice::from_ref(other), &style),
        }
    }

    fn render_table(&self, node: &Node, table: &mdast::Table, width: usize) -> Vec<String> {
        let rows: Vec<Vec<String>> = table
            .children
            .iter()
            .filter_map(|row| match row {
                Node::TableRow(row) => {
                    Some(row.children.iter().map(|cell| self.render_cell(cell)).collect())
                }
                _ => None,
            })
            .collect();
        let num_cols = rows.first().map_or(0, Vec::len);
        if num_cols == 0 {
            return Vec::new();
        }

        let border_overhead = 3 * num_cols + 1;
        let available = width.saturating_sub(border_overhead);
        if available < num_cols {
            let raw = self.source_of(node).unwrap_or_default();
            return wrap_text_with_ansi(raw, width);
        }

        let widths = column_widths(&rows, num_cols, width, available);
        let rule = |left: &str, mid: &str, right: &str| {
            let cells: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            format!("{left}─{}─{right}", cells.join(&format!("─{mid}─")))
        };
        let separator = rule("├", "┼", "┤");

        let mut lines = vec![rule("┌", "┬", "┐")];
        for (row_idx, row) in rows.iter().enumerate() {
            let wrapped: Vec<Vec<String>> = widths
                .iter()
                .enumerate()
                .map(|(col, col_width)| {
                    let text = row.get(col).map(String::as_str).unwrap_or_default();
                    wrap_text_with_ansi(text, (*col_width).max(1))
                })
                .collect();
            let height = wrapped.iter().map(Vec::len).max().unwrap_or(0);

            for line_idx in 0..height {
                let parts: Vec<String> = widths
                    .iter()
                    .enumerate()
                    .map(|(col, col_width)| {
                        let text = wrapped[col].get(line_idx).map(String::as_str).unwrap_or_default();
                        let padded = format!(
                            "{text}{}",
                            " ".repeat(col_width.saturating_sub(visible_width(text)))
                        );
                        if row_idx == 0 {
                            (self.theme.bold)(&padded)
                        } else {
                            padded
                        }
                    })
                    .collect();
                lines.push(format!("│ {} │", parts.join(" │ ")));
            }

            if row_idx + 1 < rows.len() {
                lines.push(separator.clone());
            }
        }
        lines.push(rule("└", "┴", "┘"));
        lines
    }
}

fn longest_word_width(text: &str) -> usize {
    text.split_whitespace()
        .map(visible_width)
        .max()
        .unwrap_or(0)
        .min(MAX_UNBROKEN_WORD_WIDTH)
        .max(1)
}

/// Column widths that fit `available` cell columns.
///
/// Columns get their natural width when the whole table fits. Otherwise each column keeps at
/// least its longest word (capped) and the remaining space is shared in proportion to how much
/// each column wants to grow.
fn column_widths(rows: &[Vec<String>], num_cols: usize, width: usize, available: usize) -> Vec<usize> {
    let mut natural = vec![0usize; num_cols];
    let mut min_word = vec![1usize; num_cols];
    for row in rows {
        for (col, text) in row.iter().enumerate().take(num_cols) {
            natural[col] = natural[col].max(visible_width(text));
            min_word[col] = min_word[col].max(longest_word_width(text));
        }
    }

    let mut minimum = min_word.clone();
    if minimum.iter().sum::<usize>() > available {
        minimum = vec![1usize; num_cols];
        let remaining = available.saturating_sub(num_cols);
        let total_weight: usize = min_word.iter().map(|w| w.saturating_sub(1)).sum();
        if remaining > 0 && total_weight > 0 {
            let mut allocated = 0;
            for (col, word) in min_word.iter().enumerate() {
                let grow = word.saturating_sub(1) * remaining / total_weight;
                minimum[col] += grow;
                allocated += grow;
            }
            for slot in minimum.iter_mut().take(remaining - allocated) {
                *slot += 1;
            }
        }
    }

    let natural_total = natural.iter().sum::<usize>() + 3 * num_cols + 1;
    if natural_total <= width {
        return natural
            .iter()
            .zip(&minimum)
            .map(|(natural, min)| (*natural).max(*min))
            .collect();
    }

    let min_total: usize = minimum.iter().sum();
    let grow_potential: usize = natural
        .iter()
        .zip(&minimum)
        .map(|(natural, min)| natural.saturating_sub(*min))
        .sum();
    let extra = available.saturating_sub(min_total);
    let mut widths: Vec<usize> = natural
        .iter()
        .zip(&minimum)
        .map(|(natural, min)| {
            let delta = natural.saturating_sub(*min);
            let grow = if grow_potential > 0 {
                delta * extra / grow_potential
            } else {
                0
            };
            min + grow
        })
        .collect();

    let mut remaining = available.saturating_sub(widths.iter().sum());
    while remaining > 0 {
        let mut grew = false;
        for (col, col_width) in widths.iter_mut().enumerate() {
            if remaining == 0 {
                break;
            }
            if *col_width < natural[col] {
                *col_width += 1;
                remaining -= 1;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    widths
}

fn plain_text(nodes: &[Node]) -> String {
    nodes.iter().map(Node::to_string).collect()
}

/// Whether an empty line separates byte offsets `end` and `start` of `source`.
fn has_blank_line_between(source: &str, end: usize, start: usize) -> bool {
    source
        .get(end.min(start)..start.min(source.len()))
        .is_some_and(|between| between.matches('\n').count() >= 2)
}
