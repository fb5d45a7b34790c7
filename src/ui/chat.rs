//! Terminal user interface for the voice chat session.
//!
//! Renders the scrolling chat log, the latest exchange, a live input-level
//! sparkline while recording, and a waiting indicator during uploads. Errors
//! appear as a modal alert dismissed by any key press.

use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Sparkline, Wrap},
};
use std::error::Error;
use std::io::{stdout, Stdout};

use crate::chat::{Role, ViewSink};

/// Frames for the waiting-for-agent spinner.
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// User input command during a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    /// Keep going (no key pressed)
    Continue,
    /// Start or stop recording (Space or Enter)
    ToggleRecording,
    /// End the session (Escape or 'q')
    Quit,
}

/// Terminal UI for the chat session.
///
/// Implements [`ViewSink`] so the chat controller can drive it without
/// knowing about terminals.
pub struct ChatTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    sample_rate: u32,

    // Level meter state while recording
    volume_history: Vec<u64>,
    last_sample_time: std::time::Instant,
    sample_interval: std::time::Duration,
    terminal_width: usize,
    recording_start_time: std::time::Instant,

    spinner_frame: usize,
    last_spinner_tick: std::time::Instant,

    // View state driven through ViewSink
    chat_entries: Vec<(Role, String)>,
    transcript: Option<String>,
    assistant_reply: Option<String>,
    audio_source: Option<String>,
    alert: Option<String>,
    loading: bool,

    /// Whether the recording indicator is shown
    pub is_recording: bool,
}

impl ChatTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new(sample_rate: u32) -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        let size = terminal.size()?;
        let terminal_width = size.width as usize;

        let now = std::time::Instant::now();
        Ok(ChatTui {
            terminal,
            sample_rate,
            volume_history: vec![0u64; terminal_width],
            last_sample_time: now,
            sample_interval: std::time::Duration::from_millis(50),
            terminal_width,
            recording_start_time: now,
            spinner_frame: 0,
            last_spinner_tick: now,
            chat_entries: Vec::new(),
            transcript: None,
            assistant_reply: None,
            audio_source: None,
            alert: None,
            loading: false,
            is_recording: false,
        })
    }

    /// Updates the actual sample rate once recording has started.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
    }

    /// Marks the start or end of a recording for the level meter and timer.
    pub fn set_recording(&mut self, recording: bool) {
        self.is_recording = recording;
        if recording {
            self.recording_start_time = std::time::Instant::now();
            self.volume_history = vec![0u64; self.terminal_width];
        }
    }

    /// Processes user input and returns the appropriate chat command.
    ///
    /// While an alert is showing, any key dismisses it and nothing else
    /// happens. Otherwise Space/Enter toggle recording and Escape/'q' quit.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn handle_input(&mut self) -> Result<ChatCommand, Box<dyn Error>> {
        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if self.alert.is_some() {
                    tracing::debug!("Alert dismissed");
                    self.alert = None;
                    return Ok(ChatCommand::Continue);
                }

                return Ok(match key.code {
                    KeyCode::Char(' ') | KeyCode::Enter => {
                        tracing::debug!("Toggle key pressed");
                        ChatCommand::ToggleRecording
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        tracing::debug!("Escape or 'q' pressed: ending session");
                        ChatCommand::Quit
                    }
                    KeyCode::Char('c')
                        if key
                            .modifiers
                            .contains(crossterm::event::KeyModifiers::CONTROL) =>
                    {
                        tracing::debug!("Ctrl+C pressed: ending session");
                        ChatCommand::Quit
                    }
                    _ => ChatCommand::Continue,
                });
            }
        }
        Ok(ChatCommand::Continue)
    }

    /// Renders one frame of the chat screen.
    ///
    /// `samples` is the capture buffer so far, used for the level meter while
    /// recording; pass an empty slice when idle.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn render(&mut self, samples: &[i16]) -> Result<(), Box<dyn Error>> {
        if self.is_recording {
            let volume = calculate_volume(samples, self.sample_rate);
            if self.last_sample_time.elapsed() >= self.sample_interval {
                self.volume_history.push(volume as u64);
                if self.volume_history.len() > self.terminal_width {
                    self.volume_history.remove(0);
                }
                self.last_sample_time = std::time::Instant::now();
            }
        }

        if self.loading && self.last_spinner_tick.elapsed().as_millis() >= 80 {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
            self.last_spinner_tick = std::time::Instant::now();
        }

        let size = self.terminal.size()?;
        let current_width = size.width as usize;
        if current_width != self.terminal_width {
            self.terminal_width = current_width;
            self.volume_history.resize(current_width, 0);
        }

        // Calculate these values before the draw closure to avoid borrow issues
        let status_line = self.status_line();
        let show_meter = self.is_recording;

        self.terminal.draw(|frame| {
            let area = frame.area();

            let meter_height = if show_meter { 4 } else { 0 };
            let results_height = 4;
            let footer_height = 1;

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(3),
                    Constraint::Length(results_height),
                    Constraint::Length(meter_height),
                    Constraint::Length(footer_height),
                ])
                .split(area);

            // Chat log: most recent entries, bottom-anchored
            let mut lines: Vec<Line> = Vec::new();
            for (role, text) in &self.chat_entries {
                let (label_style, label) = match role {
                    Role::User => (Style::default().fg(Color::Yellow), "You: "),
                    Role::Assistant => (Style::default().fg(Color::Green), "Assistant: "),
                };
                lines.push(Line::from(vec![
                    Span::styled(label, label_style.add_modifier(Modifier::BOLD)),
                    Span::raw(text.clone()),
                ]));
                lines.push(Line::from(""));
            }

            let chat_height = chunks[0].height.saturating_sub(2) as usize;
            let skip = lines.len().saturating_sub(chat_height);
            let visible: Vec<Line> = lines.into_iter().skip(skip).collect();

            let chat = Paragraph::new(visible)
                .block(Block::default().borders(Borders::ALL).title(" Conversation "))
                .wrap(Wrap { trim: false });
            frame.render_widget(chat, chunks[0]);

            // Latest exchange panel, revealed once a reply has arrived
            if self.transcript.is_some() || self.assistant_reply.is_some() {
                let mut result_lines = Vec::new();
                if let Some(transcript) = &self.transcript {
                    result_lines.push(Line::from(vec![
                        Span::styled("Heard: ", Style::default().fg(Color::Yellow)),
                        Span::raw(transcript.clone()),
                    ]));
                }
                if let Some(reply) = &self.assistant_reply {
                    result_lines.push(Line::from(vec![
                        Span::styled("Reply: ", Style::default().fg(Color::Green)),
                        Span::raw(reply.clone()),
                    ]));
                }
                if let Some(source) = &self.audio_source {
                    result_lines.push(Line::from(Span::styled(
                        format!("Audio: {source}"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }

                let results = Paragraph::new(result_lines)
                    .block(Block::default().borders(Borders::ALL).title(" Last exchange "))
                    .wrap(Wrap { trim: true });
                frame.render_widget(results, chunks[1]);
            }

            // Input level meter while recording
            if show_meter {
                let sparkline = Sparkline::default()
                    .data(&self.volume_history)
                    .max(100)
                    .block(Block::default().borders(Borders::ALL).title(" Input level "))
                    .style(Style::default().fg(Color::Red));
                frame.render_widget(sparkline, chunks[2]);
            }

            let footer = Paragraph::new(status_line.clone())
                .style(Style::default().fg(Color::Rgb(185, 207, 212)));
            frame.render_widget(footer, chunks[3]);

            // Modal alert overlay
            if let Some(alert) = &self.alert {
                let modal_width = modal_width(area.width);
                let modal_height = 6.min(area.height);
                let modal = Rect {
                    x: area.x + (area.width.saturating_sub(modal_width)) / 2,
                    y: area.y + (area.height.saturating_sub(modal_height)) / 2,
                    width: modal_width,
                    height: modal_height,
                };

                frame.render_widget(Clear, modal);
                let text = vec![
                    Line::from(Span::styled(
                        alert.clone(),
                        Style::default().fg(Color::White),
                    )),
                    Line::from(""),
                    Line::from(Span::styled(
                        "Press any key to dismiss",
                        Style::default().fg(Color::Gray),
                    )),
                ];
                let paragraph = Paragraph::new(text)
                    .block(
                        Block::default()
                            .borders(Borders::ALL)
                            .title(" Error ")
                            .style(Style::default().bg(Color::Rgb(120, 0, 0))),
                    )
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true });
                frame.render_widget(paragraph, modal);
            }
        })?;

        Ok(())
    }

    /// Builds the footer status line for the current state.
    fn status_line(&self) -> Line<'static> {
        if self.loading {
            return Line::from(vec![
                Span::styled(
                    format!("{} ", SPINNER_FRAMES[self.spinner_frame]),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw("Waiting for agent…"),
            ]);
        }

        if self.is_recording {
            let duration_secs = self.recording_start_time.elapsed().as_secs();
            let minutes = duration_secs / 60;
            let secs = duration_secs % 60;
            return Line::from(vec![
                Span::styled("● ", Style::default().fg(Color::Red)),
                Span::raw(format!("{minutes}:{secs:02} recording — Space to send")),
            ]);
        }

        Line::from(Span::raw("Space: record   q: quit"))
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn cleanup(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl ViewSink for ChatTui {
    fn show_transcript(&mut self, text: &str) {
        self.transcript = Some(text.to_string());
    }

    fn show_assistant_reply(&mut self, text: &str) {
        self.assistant_reply = Some(text.to_string());
    }

    fn set_audio_source(&mut self, url: &str) {
        self.audio_source = Some(url.to_string());
    }

    fn append_chat_entry(&mut self, role: Role, text: &str) {
        self.chat_entries.push((role, text.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.alert = Some(message.to_string());
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if loading {
            self.spinner_frame = 0;
            self.last_spinner_tick = std::time::Instant::now();
        }
    }
}

/// Width of the alert modal: 70% of the terminal width.
///
/// Widened through u32 so the multiplication cannot wrap on very wide
/// terminals.
fn modal_width(total_width: u16) -> u16 {
    (u32::from(total_width) * 70 / 100) as u16
}

/// Calculates the current input level in percent from the most recent samples.
///
/// Converts RMS (Root Mean Square) audio samples to dBFS and normalizes to a
/// 0-100% scale against a -20 dBFS reference level.
fn calculate_volume(samples: &[i16], sample_rate: u32) -> u8 {
    if samples.is_empty() {
        return 0;
    }

    let last_samples_count = std::cmp::min(sample_rate / 20, samples.len() as u32) as usize;
    let recent_samples = &samples[samples.len() - last_samples_count..];

    let sum_of_squares: i64 = recent_samples.iter().map(|&x| (x as i64).pow(2)).sum();
    let mean_square = sum_of_squares / recent_samples.len() as i64;
    let rms = (mean_square as f32).sqrt();

    let db_fs = if rms > 0.0 {
        20.0 * (rms / 32767.0).log10()
    } else {
        -160.0
    };

    const REFERENCE_LEVEL_DB: f32 = -20.0;
    let min_db = REFERENCE_LEVEL_DB - 40.0;
    ((db_fs - min_db) / 40.0 * 100.0).clamp(4.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_width_does_not_wrap_on_wide_terminals() {
        assert_eq!(modal_width(100), 70);
        // 937+ columns would overflow a u16 multiply
        assert_eq!(modal_width(1000), 700);
        assert_eq!(modal_width(u16::MAX), 45874);
    }

    #[test]
    fn test_volume_of_silence_is_floor() {
        let samples = vec![0i16; 1600];
        assert_eq!(calculate_volume(&samples, 16000), 4);
    }

    #[test]
    fn test_volume_of_full_scale_is_max() {
        let samples = vec![i16::MAX; 1600];
        assert_eq!(calculate_volume(&samples, 16000), 100);
    }

    #[test]
    fn test_volume_of_empty_buffer_is_zero() {
        assert_eq!(calculate_volume(&[], 16000), 0);
    }
}
