//! Call frame pane rendering
//!
//! Frames are listed innermost first. Each row shows the frame's byte range
//! between its bottom and the stack pointer saved by the caller, followed by
//! any pointers recorded with `stackSave`.

use crate::snapshot::Snapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the frame pane
pub fn render_frames_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Frames ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let snapshot = match snapshot {
        Some(s) if !s.frames.is_empty() || !s.saved.is_empty() => s,
        _ => {
            let paragraph = Paragraph::new("(no frames)")
                .block(block)
                .style(Style::default().fg(DEFAULT_THEME.comment));
            frame.render_widget(paragraph, area);
            return;
        }
    };

    let width = snapshot.address_bytes * 2;
    let depth = snapshot.frames.len();
    let mut items: Vec<ListItem> = Vec::new();

    for (i, f) in snapshot.frames.iter().enumerate().rev() {
        let is_top = i + 1 == depth;
        let name_style = if is_top {
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.suspended)
        };
        let mut spans = vec![
            Span::styled(
                format!("#{:<2} ", i),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(format!("{}()", f.name), name_style),
            Span::styled(
                format!("  {} bytes", f.size),
                Style::default().fg(DEFAULT_THEME.number),
            ),
            Span::styled(
                format!(
                    "  [0x{:0w$x} .. 0x{:0w$x}]",
                    f.saved_sp.wrapping_sub(f.size),
                    f.saved_sp,
                    w = width
                ),
                Style::default().fg(DEFAULT_THEME.fg),
            ),
        ];
        if let Some(loc) = f.location {
            spans.push(Span::styled(
                format!("  line {}", loc.line),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
        }
        items.push(ListItem::new(Line::from(spans)));
    }

    if !snapshot.saved.is_empty() {
        items.push(ListItem::new(Line::from(Span::styled(
            "saved",
            Style::default()
                .fg(DEFAULT_THEME.label)
                .add_modifier(Modifier::BOLD),
        ))));
        for sp in snapshot.saved.iter().rev() {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("  0x{:0w$x}", sp, w = width),
                Style::default().fg(DEFAULT_THEME.number),
            ))));
        }
    }

    let total_items = items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    let block = block.padding(Padding::new(1, 0, 0, 0));
    frame.render_widget(List::new(visible).block(block), area);
}
