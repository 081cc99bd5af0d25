//! Stack region pane: limits, stack pointer, usage gauge and fibers

use crate::snapshot::{FiberView, Snapshot};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

fn hex(value: u64, address_bytes: usize) -> String {
    format!("0x{:0width$x}", value, width = address_bytes * 2)
}

fn field<'a>(label: &'a str, value: String, value_style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("{:<8}", label),
            Style::default().fg(DEFAULT_THEME.label),
        ),
        Span::styled(value, value_style),
    ])
}

fn fiber_line(fiber: &FiberView, address_bytes: usize) -> Line<'_> {
    let (marker, name_style) = if fiber.running {
        (
            "▸ ",
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("  ", Style::default().fg(DEFAULT_THEME.suspended))
    };
    Line::from(vec![
        Span::styled(marker, name_style),
        Span::styled(fiber.name.as_str(), name_style),
        Span::styled(
            format!(
                "  [{} .. {}] sp={} depth {}",
                hex(fiber.end, address_bytes),
                hex(fiber.base, address_bytes),
                hex(fiber.stack_pointer, address_bytes),
                fiber.depth
            ),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
    ])
}

/// Render the stack region pane
pub fn render_region_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    is_focused: bool,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let title = match snapshot {
        Some(s) => format!(" Stack Region [{}] ", s.active_fiber),
        None => " Stack Region ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let Some(snapshot) = snapshot else {
        frame.render_widget(block, area);
        return;
    };

    let Some(region) = snapshot.region else {
        let paragraph = Paragraph::new(format!(
            "(not initialized, sp={})",
            hex(snapshot.stack_pointer, snapshot.address_bytes)
        ))
        .block(block)
        .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let bytes = snapshot.address_bytes;
    let sp = snapshot.stack_pointer;
    let overflowed = region.is_overflowed(sp);
    let value_style = Style::default().fg(DEFAULT_THEME.number);
    let sp_style = if overflowed {
        Style::default()
            .fg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.secondary)
    };

    let details = vec![
        field("base", hex(region.base, bytes), value_style),
        field("sp", hex(sp, bytes), sp_style),
        field("end", hex(region.end, bytes), value_style),
        field("size", format!("{} bytes", region.size()), value_style),
        field("used", format!("{} bytes", region.used(sp)), value_style),
        field(
            "free",
            if overflowed {
                format!("{} (wrapped)", region.free)
            } else {
                format!("{} bytes", region.free)
            },
            sp_style,
        ),
    ];
    frame.render_widget(Paragraph::new(details), chunks[0]);

    let ratio = if region.size() == 0 {
        if overflowed {
            1.0
        } else {
            0.0
        }
    } else {
        (region.used(sp) as f64 / region.size() as f64).clamp(0.0, 1.0)
    };
    let gauge_color = if overflowed || ratio >= 0.9 {
        DEFAULT_THEME.error
    } else if ratio >= 0.6 {
        DEFAULT_THEME.secondary
    } else {
        DEFAULT_THEME.success
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(gauge_color).bg(DEFAULT_THEME.current_line_bg))
        .ratio(ratio)
        .label(format!("{:.0}% used", ratio * 100.0));
    frame.render_widget(gauge, chunks[1]);

    let fibers: Vec<Line> = snapshot
        .fibers
        .iter()
        .map(|f| fiber_line(f, bytes))
        .collect();
    frame.render_widget(Paragraph::new(fibers), chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_fiber_is_muted() {
        let fiber = FiberView {
            name: "worker".to_string(),
            base: 0x3_0000,
            end: 0x2_ff00,
            stack_pointer: 0x3_0000,
            depth: 0,
            running: false,
        };
        let line = fiber_line(&fiber, 4);
        assert_eq!(line.spans[1].content, "worker");
        assert_eq!(line.spans[1].style.fg, Some(DEFAULT_THEME.suspended));

        let running = FiberView {
            running: true,
            ..fiber
        };
        let line = fiber_line(&running, 4);
        assert_eq!(line.spans[0].content, "▸ ");
        assert_eq!(line.spans[1].style.fg, Some(DEFAULT_THEME.function));
    }

    #[test]
    fn field_label_uses_label_color() {
        let line = field("base", "0x00001000".to_string(), Style::default());
        assert_eq!(line.spans[0].style.fg, Some(DEFAULT_THEME.label));
    }
}
