//! Terminal rendering and management

use crate::messages::Message;
use crate::tui::state::{Snapshot, TopicRow};
use crate::tui::types::Focus;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use std::io::{stdout, Stdout};

pub const TITLE: &str = "MQTT TUI Browser";
pub const HELP_TEXT: &str =
    "↑/↓ navigate • tab switch panes • enter/space toggle subscription • r reset messages • q quit";
const NO_TOPICS: &str = "No topics discovered yet...";
const NO_MESSAGES: &str = "No messages yet...";

/// Terminal wrapper for cleanup on drop
pub struct Terminal {
    terminal: ratatui::Terminal<CrosstermBackend<Stdout>>,
}

impl Terminal {
    pub fn new() -> std::io::Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout());
        let terminal = ratatui::Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Topic rows and message entries that fit at the current terminal size.
    pub fn pane_capacities(&self, messages: &[Message]) -> std::io::Result<(usize, usize)> {
        let size = self.terminal.size()?;
        Ok(pane_capacities(
            Rect::new(0, 0, size.width, size.height),
            messages,
        ))
    }

    pub fn draw(&mut self, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
        self.terminal.draw(|frame| draw_browser(frame, snapshot))?;
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

struct BrowserLayout {
    title: Rect,
    topics: Rect,
    messages: Rect,
    status: Rect,
    help: Rect,
}

fn layout(area: Rect) -> BrowserLayout {
    let vert = Layout::vertical([
        Constraint::Length(1), // Title
        Constraint::Min(3),    // Panes
        Constraint::Length(1), // Status / error
        Constraint::Length(1), // Help
    ])
    .split(area);

    let cols = Layout::horizontal([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)]).split(vert[1]);

    BrowserLayout {
        title: vert[0],
        topics: cols[0],
        messages: cols[1],
        status: vert[2],
        help: vert[3],
    }
}

/// Number of topic rows and message entries that fit in `area`.
///
/// Message heights depend on how their payloads wrap, so the message count is taken from
/// the newest entries of `messages`. Without messages every entry counts as two lines.
pub fn pane_capacities(area: Rect, messages: &[Message]) -> (usize, usize) {
    let layout = layout(area);
    let topic_rows = layout.topics.height.saturating_sub(2) as usize;
    let inner = Block::default().borders(Borders::ALL).inner(layout.messages);
    let message_rows = if messages.is_empty() {
        inner.height as usize / 2
    } else {
        messages_that_fit(messages.iter().rev(), inner.width, inner.height)
    };
    (topic_rows.max(1), message_rows.max(1))
}

/// How many of `messages`, taken in order, fit in a pane of the given size. At least one.
fn messages_that_fit<'a>(
    messages: impl Iterator<Item = &'a Message>,
    width: u16,
    height: u16,
) -> usize {
    let mut used = 0;
    let mut count = 0;
    for message in messages {
        used += message.height(width as usize);
        if used > height as usize {
            break;
        }
        count += 1;
    }
    count.max(1)
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn topic_line<'a>(row: &TopicRow<'a>, selected: bool, focused: bool) -> Line<'a> {
    let marker = if row.subscribed { "✓ " } else { "  " };
    let mut style = if row.active {
        Style::default().fg(Color::Green)
    } else if row.subscribed {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    if selected {
        style = if focused {
            style.add_modifier(Modifier::REVERSED)
        } else {
            style.add_modifier(Modifier::BOLD)
        };
    }
    Line::from(vec![Span::styled(marker, style), Span::styled(row.name, style)])
}

/// Draw one frame of the browser.
pub fn draw_browser(frame: &mut Frame<'_>, snapshot: &Snapshot<'_>) {
    let layout = layout(frame.area());
    let dim = Style::default().fg(Color::DarkGray);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            TITLE,
            Style::default().fg(Color::Cyan).bold(),
        )))
        .alignment(Alignment::Center),
        layout.title,
    );

    // === TOPICS ===
    let topics_focused = snapshot.focus == Focus::Topics;
    let topics_block = pane_block(format!(" Topics ({}) ", snapshot.topics.len()), topics_focused);
    let ti = topics_block.inner(layout.topics);
    frame.render_widget(topics_block, layout.topics);

    let topic_lines: Vec<Line> = if snapshot.topics.is_empty() {
        vec![Line::from(Span::styled(NO_TOPICS, dim))]
    } else {
        snapshot
            .topics
            .iter()
            .enumerate()
            .skip(snapshot.topic_scroll)
            .take(ti.height as usize)
            .map(|(i, row)| topic_line(row, i == snapshot.selection, topics_focused))
            .collect()
    };
    frame.render_widget(Paragraph::new(topic_lines), ti);

    // === MESSAGES ===
    let messages_focused = snapshot.focus == Focus::Messages;
    let messages_block = pane_block(
        format!(" Messages ({}) ", snapshot.message_count),
        messages_focused,
    );
    let mi = messages_block.inner(layout.messages);
    frame.render_widget(messages_block, layout.messages);

    let message_lines: Vec<Line> = if snapshot.messages.is_empty() {
        vec![Line::from(Span::styled(NO_MESSAGES, dim))]
    } else {
        let shown = messages_that_fit(snapshot.messages.iter(), mi.width, mi.height);
        snapshot
            .messages
            .iter()
            .take(shown)
            .flat_map(|message| {
                let header = Line::from(vec![
                    Span::styled(message.topic.as_str(), Style::default().fg(Color::Cyan)),
                    " ".into(),
                    Span::styled(message.received_at.format("%H:%M:%S").to_string(), dim),
                ]);
                std::iter::once(header).chain(
                    message
                        .payload_lines(mi.width as usize)
                        .into_iter()
                        .map(Line::from),
                )
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(message_lines), mi);

    // === STATUS ===
    let status = if let Some(err) = snapshot.last_error {
        Line::from(Span::styled(
            format!("Error: {}", err),
            Style::default().fg(Color::Red),
        ))
    } else if snapshot.connected {
        Line::from(Span::styled(
            format!("Connected to {}", snapshot.broker),
            Style::default().fg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(
            format!("Connecting to {}...", snapshot.broker),
            Style::default().fg(Color::Yellow),
        ))
    };
    frame.render_widget(Paragraph::new(status), layout.status);

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(HELP_TEXT, dim))),
        layout.help,
    );
}
