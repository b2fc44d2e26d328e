//! Diff renderer.
//!
//! The renderer remembers the last frame it wrote and turns each new frame into the
//! smallest escape program it can justify. The cursor is parked on the row just below the
//! last written line after every pass, and every movement is computed relative to that row.

use crate::config::RendererConfig;
use crate::core::output::TerminalCmd;
use crate::core::text::utils::clamp_to_width;
use crate::logging::log_render_pass;
use crate::render::Frame;

/// What a render pass decided to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Nothing changed; no output.
    #[default]
    NoOp,
    /// First pass: hide the cursor and write every line.
    FirstPaint,
    /// Size changed or a repaint was forced: clear, home, rewrite everything.
    ResizeRepaint,
    /// A change above the viewport: erase scrollback and rewrite everything.
    ScrollbackRewrite,
    /// Erase from the first changed row and rewrite the rest.
    BulkRewrite,
    /// Rewrite individual rows in place, then fix up the tail.
    SurgicalEdit,
}

impl RenderOutcome {
    fn is_full_repaint(self) -> bool {
        matches!(
            self,
            RenderOutcome::FirstPaint
                | RenderOutcome::ResizeRepaint
                | RenderOutcome::ScrollbackRewrite
        )
    }
}

/// Cumulative counters. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderMetrics {
    pub passes: u64,
    pub lines_redrawn: u64,
    pub full_repaints: u64,
}

#[derive(Debug, Default)]
pub struct DiffRenderer {
    previous_lines: Vec<String>,
    previous_width: usize,
    previous_height: usize,
    has_rendered: bool,
    force_full_repaint: bool,
    config: RendererConfig,
    metrics: RenderMetrics,
    last_outcome: RenderOutcome,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> RendererConfig {
        self.config
    }

    /// Forget the previous frame so the next pass is a first paint. Metrics are kept.
    pub fn reset(&mut self) {
        self.previous_lines.clear();
        self.previous_width = 0;
        self.previous_height = 0;
        self.has_rendered = false;
        self.force_full_repaint = false;
        self.last_outcome = RenderOutcome::NoOp;
    }

    /// Make the next pass a full clear-and-rewrite, whatever the diff says.
    pub fn force_full_repaint(&mut self) {
        self.force_full_repaint = true;
    }

    pub fn metrics(&self) -> RenderMetrics {
        self.metrics
    }

    pub fn last_outcome(&self) -> RenderOutcome {
        self.last_outcome
    }

    /// The frame as last written, after width clamping.
    pub fn previous_lines(&self) -> &[String] {
        &self.previous_lines
    }

    pub fn render(&mut self, frame: Frame, width: usize, height: usize) -> Vec<TerminalCmd> {
        let lines: Vec<String> = frame
            .into_lines()
            .iter()
            .map(|line| clamp_to_width(line, width))
            .collect();

        let resized =
            self.has_rendered && (width != self.previous_width || height != self.previous_height);
        let forced = std::mem::take(&mut self.force_full_repaint);

        let mut cmds = Vec::new();
        let (outcome, written) = if !self.has_rendered {
            cmds.push(TerminalCmd::HideCursor);
            push_lines(&mut cmds, &lines);
            (RenderOutcome::FirstPaint, lines.len())
        } else if forced || resized {
            cmds.push(TerminalCmd::ClearScreen);
            cmds.push(TerminalCmd::Home);
            cmds.push(TerminalCmd::HideCursor);
            push_lines(&mut cmds, &lines);
            (RenderOutcome::ResizeRepaint, lines.len())
        } else {
            self.diff(&lines, height, &mut cmds)
        };

        self.metrics.passes += 1;
        self.metrics.lines_redrawn += written as u64;
        if outcome.is_full_repaint() {
            self.metrics.full_repaints += 1;
        }
        log_render_pass(outcome, self.previous_lines.len(), lines.len(), written, height);

        self.last_outcome = outcome;
        self.has_rendered = true;
        self.previous_width = width;
        self.previous_height = height;
        self.previous_lines = lines;
        cmds
    }

    fn diff(
        &self,
        lines: &[String],
        height: usize,
        cmds: &mut Vec<TerminalCmd>,
    ) -> (RenderOutcome, usize) {
        let old = &self.previous_lines;
        let old_len = old.len();
        let new_len = lines.len();
        let overlap = old_len.min(new_len);

        let first_diff = (0..overlap)
            .find(|&i| old[i] != lines[i])
            .unwrap_or(overlap);
        if first_diff == overlap && old_len == new_len {
            return (RenderOutcome::NoOp, 0);
        }

        let viewport_height = height.saturating_sub(1);
        let viewport_top = old_len.saturating_sub(viewport_height);
        let cursor_row = old_len;

        if first_diff < viewport_top {
            cmds.push(TerminalCmd::ClearScrollback);
            cmds.push(TerminalCmd::Home);
            cmds.push(TerminalCmd::ClearToScreenEnd);
            push_lines(cmds, lines);
            return (RenderOutcome::ScrollbackRewrite, new_len);
        }

        let dirty_overlap = (first_diff..overlap)
            .filter(|&i| old[i] != lines[i])
            .count();
        let length_changed = old_len != new_len;
        if dirty_overlap > self.config.bulk_rewrite_threshold
            || (length_changed && first_diff < overlap)
        {
            cmds.push(TerminalCmd::MoveUp(cursor_row.saturating_sub(first_diff)));
            cmds.push(TerminalCmd::bytes("\r"));
            cmds.push(TerminalCmd::ClearToScreenEnd);
            push_lines(cmds, &lines[first_diff..]);
            return (RenderOutcome::BulkRewrite, new_len - first_diff);
        }

        let mut row = cursor_row;
        let mut written = 0;
        for i in first_diff..overlap {
            if old[i] == lines[i] {
                continue;
            }
            move_rows(cmds, row, i);
            cmds.push(TerminalCmd::bytes("\r"));
            cmds.push(TerminalCmd::ClearLine);
            cmds.push(TerminalCmd::bytes(lines[i].as_str()));
            row = i;
            written += 1;
        }

        if new_len > old_len {
            move_rows(cmds, row, old_len);
            cmds.push(TerminalCmd::bytes("\r"));
            push_lines(cmds, &lines[old_len..]);
            written += new_len - old_len;
        } else {
            move_rows(cmds, row, new_len);
            cmds.push(TerminalCmd::bytes("\r"));
            if new_len < old_len {
                cmds.push(TerminalCmd::ClearToScreenEnd);
            }
        }
        (RenderOutcome::SurgicalEdit, written)
    }
}

fn move_rows(cmds: &mut Vec<TerminalCmd>, from: usize, to: usize) {
    if to < from {
        cmds.push(TerminalCmd::MoveUp(from - to));
    } else if to > from {
        cmds.push(TerminalCmd::MoveDown(to - from));
    }
}

fn push_lines(cmds: &mut Vec<TerminalCmd>, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let mut buffer = String::new();
    for line in lines {
        buffer.push_str(line);
        buffer.push_str("\r\n");
    }
    cmds.push(TerminalCmd::Bytes(buffer));
}
