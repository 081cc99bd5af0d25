//! Script pane rendering with syntax highlighting
//!
//! This module renders the script pane, which displays the trace script
//! being executed with basic syntax highlighting and execution indicators.
//!
//! # Features
//!
//! - Highlighting for statement keywords, argument names, numbers and comments
//! - Current line highlighting with line number emphasis
//! - Error line shown in the error color
//! - Scroll state that keeps the current line at a fixed row

use crate::script::ast::KEYWORDS;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Simple syntax highlighting for one script line
fn highlight_script_line(line: &str) -> Line<'_> {
    let (code, comment) = match line.find('#') {
        Some(idx) => (&line[..idx], Some(&line[idx..])),
        None => (line, None),
    };

    let mut spans = Vec::new();
    let mut first_word = true;
    let mut word = String::new();

    let flush = |word: &mut String, spans: &mut Vec<Span<'_>>, first: &mut bool| {
        if word.is_empty() {
            return;
        }
        let style = word_style(word, *first);
        spans.push(Span::styled(std::mem::take(word), style));
        *first = false;
    };

    for c in code.chars() {
        if c.is_whitespace() || c == '=' {
            flush(&mut word, &mut spans, &mut first_word);
            let style = if c == '=' {
                Style::default().fg(DEFAULT_THEME.comment)
            } else {
                Style::default()
            };
            spans.push(Span::styled(c.to_string(), style));
        } else {
            word.push(c);
        }
    }
    flush(&mut word, &mut spans, &mut first_word);

    if let Some(comment) = comment {
        spans.push(Span::styled(
            comment.to_string(),
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }

    Line::from(spans)
}

fn word_style(word: &str, is_first: bool) -> Style {
    if is_first && KEYWORDS.contains(&word) {
        return Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD);
    }
    match word {
        "high" | "low" | "base" | "end" => Style::default().fg(DEFAULT_THEME.label),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ => Style::default().fg(DEFAULT_THEME.function),
    }
}

/// Scroll state for the script pane
pub struct SourceScrollState {
    pub offset: usize,
    pub target_line_row: Option<usize>,
}

/// Render the script pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: usize,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Script ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();

    // Calculate visible range
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders (2), min 1

    // Keep the current line at a fixed row, centered by default
    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    if current_line > 0 && current_line <= total_lines {
        let target_line_idx = current_line.saturating_sub(1); // Convert to 0-based
        scroll_state.offset = target_line_idx.saturating_sub(target_row);

        if total_lines > visible_height {
            let max_scroll = total_lines - visible_height;
            scroll_state.offset = scroll_state.offset.min(max_scroll);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let line_num_str = format!("{:4} ", line_num);

            let (num_style, content_base_style) = if is_current && is_error {
                // ERROR LINE: Red background with bold line number
                (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
            } else if is_current {
                (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Style::default().bg(DEFAULT_THEME.current_line_bg),
                )
            } else {
                (Style::default().fg(DEFAULT_THEME.comment), Style::default())
            };

            let mut content_line = highlight_script_line(line);

            if is_current && is_error {
                for span in &mut content_line.spans {
                    span.style = content_base_style;
                }
            } else if is_current {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(content_base_style);
                }
            }

            let mut final_spans = vec![Span::styled(line_num_str, num_style)];
            final_spans.extend(content_line.spans);

            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_keyword_arguments_and_comment() {
        let line = highlight_script_line("layout high=0x100 # bounds");
        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, ["layout", " ", "high", "=", "0x100", " ", "# bounds"]);
        assert_eq!(line.spans[0].style.fg, Some(DEFAULT_THEME.keyword));
        assert_eq!(line.spans[2].style.fg, Some(DEFAULT_THEME.label));
        assert_eq!(line.spans[4].style.fg, Some(DEFAULT_THEME.number));
    }
}
