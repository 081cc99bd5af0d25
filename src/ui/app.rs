//! Main TUI application state and logic

use crate::memory::Address;
use crate::runtime::engine::Machine;
use crate::runtime::errors::RuntimeError;
use crate::snapshot::EventLog;
use crate::ui::panes::{self, SourceScrollState, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Region,
    Frames,
    Events,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> events -> region -> frames)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Events,
            FocusedPane::Events => FocusedPane::Region,
            FocusedPane::Region => FocusedPane::Frames,
            FocusedPane::Frames => FocusedPane::Source,
        }
    }
}

/// The main application state
pub struct App<A: Address> {
    pub machine: Machine<A>,

    /// The script being executed
    pub source_code: String,

    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub frames_scroll: usize,
    pub events_scroll: usize,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl<A: Address> App<A> {
    pub fn new(machine: Machine<A>, source_code: String) -> Self {
        let status_message = match machine.error() {
            Some(e) => format!("Stopped: {}", e),
            None => String::from("Ready!"),
        };
        let a_second_ago = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        App {
            machine,
            source_code,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState {
                offset: 0,
                target_line_row: None, // Centered on first render
            },
            frames_scroll: 0,
            events_scroll: usize::MAX,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: a_second_ago,
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(500) {
                if self.machine.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.events_scroll = usize::MAX;
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(main_chunks[0]);

        // Left column: Script (top) | Events (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        // Right column: Region (top) | Frames (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        let snapshot = self.machine.current();
        let at_error = self.machine.at_error();
        let empty = EventLog::new();

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            self.machine.current_location().line,
            at_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_events_pane(
            frame,
            left_rows[1],
            snapshot.map(|s| &s.events).unwrap_or(&empty),
            self.focused_pane == FocusedPane::Events,
            &mut self.events_scroll,
        );

        panes::render_region_pane(
            frame,
            right_rows[0],
            snapshot,
            self.focused_pane == FocusedPane::Region,
        );

        panes::render_frames_pane(
            frame,
            right_rows[1],
            snapshot,
            self.focused_pane == FocusedPane::Frames,
            &mut self.frames_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            &StatusRenderData {
                message: &self.status_message,
                current_step: self.machine.history_position(),
                total_steps: self.machine.total_snapshots(),
                has_error: self.machine.error().is_some(),
                at_error,
                is_playing: self.is_playing,
            },
        );
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let mut stepped = 0;
                for _ in 0..n {
                    if self.machine.step_forward().is_err() {
                        break;
                    }
                    stepped += 1;
                }
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.events_scroll = usize::MAX;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Frames => {
                    self.frames_scroll = self.frames_scroll.saturating_sub(1);
                }
                FocusedPane::Events => {
                    self.events_scroll = self.events_scroll.saturating_sub(1);
                }
                FocusedPane::Region => {}
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Frames => {
                    self.frames_scroll = self.frames_scroll.saturating_add(1);
                }
                FocusedPane::Events => {
                    self.events_scroll = self.events_scroll.saturating_add(1);
                }
                FocusedPane::Region => {}
            },
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or_else(Instant::now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.machine.jump_to_end();
                self.status_message = match self.machine.error() {
                    Some(e) => format!("Jumped to end: {}", e),
                    None => "Jumped to end".to_string(),
                };
                self.events_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                if self.machine.rewind_to_start().is_ok() {
                    self.status_message = "Jumped to start".to_string();
                }
                self.events_scroll = usize::MAX;
            }
            _ => {}
        }
    }

    fn step_forward(&mut self) {
        match self.machine.step_forward() {
            Ok(()) => {
                self.status_message = if self.machine.at_error() {
                    self.machine
                        .error()
                        .map(|e| e.to_string())
                        .unwrap_or_default()
                } else {
                    "Stepped forward".to_string()
                };
                self.events_scroll = usize::MAX;
            }
            Err(RuntimeError::Generic { message, .. }) => {
                self.status_message = format!("Cannot step forward: {}", message);
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
            }
        }
    }

    fn step_backward(&mut self) {
        match self.machine.step_backward() {
            Ok(()) => {
                self.status_message = "Stepped backward".to_string();
                self.events_scroll = usize::MAX;
            }
            Err(RuntimeError::Generic { message, .. }) => {
                self.status_message = format!("Cannot step backward: {}", message);
            }
            Err(e) => {
                self.status_message = format!("Error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_cycles_through_all_panes() {
        let mut pane = FocusedPane::Source;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(pane);
            pane = pane.next();
        }
        assert_eq!(pane, FocusedPane::Source);
        assert!(seen.contains(&FocusedPane::Region));
        assert!(seen.contains(&FocusedPane::Frames));
        assert!(seen.contains(&FocusedPane::Events));
    }
}
