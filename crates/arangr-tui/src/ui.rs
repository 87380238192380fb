use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use arangr_core::{Sender, Transcript};
use crate::app::App;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// Centered rect taking `percent_x`/`percent_y` of `area`
fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y) / 100) as u16;
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Dim the terminal behind the modal
    frame.render_widget(
        Block::default().style(Style::default().bg(Color::Black).fg(Color::DarkGray)),
        area,
    );

    let dialog_area = centered(area, 80, 85);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(" AI Assistant ", Style::default().fg(Color::Cyan).bold()));
    let inner = dialog.inner(dialog_area);
    frame.render_widget(dialog, dialog_area);

    // Dialog layout: file header, transcript, input, action bar
    let [header_area, chat_area, input_area, actions_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(inner);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_actions(app, frame, actions_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let file_label = match app.current_file_name() {
        Some(name) => Span::styled(format!(" File: {} ", name), Style::default().fg(Color::White)),
        None => Span::styled(" No file selected ", Style::default().fg(Color::DarkGray)),
    };

    let status = if app.service.is_ready() {
        Span::styled(
            format!(" {} ", app.service.config().model),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled(" not configured ", Style::default().fg(Color::Red))
    };

    let header = Paragraph::new(Line::from(vec![
        file_label,
        status,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let title = match app.transcript.pending_count() {
        0 => " Conversation ".to_string(),
        n => format!(" Conversation ({} pending) ", n),
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title);

    let chat = Paragraph::new(transcript_text(&app.transcript, app.animation_frame))
        .block(chat_block)
        .wrap(TRANSCRIPT_WRAP)
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

/// Wrapping shared by the transcript pane and its scroll bounds
pub const TRANSCRIPT_WRAP: Wrap = Wrap { trim: true };

/// Styled transcript lines, before wrapping
pub fn transcript_text(transcript: &Transcript, animation_frame: u8) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for entry in transcript.iter() {
        let (label, color) = match entry.sender {
            Sender::User => ("You:", Color::Cyan),
            Sender::Assistant => ("AI:", Color::Yellow),
            Sender::System => ("System:", Color::Magenta),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        if entry.pending {
            // Animated ellipsis: cycles through ".", "..", "..."
            let base = entry.text.trim_end_matches('.');
            let dots = ".".repeat((animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{}{}", base, dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        } else {
            match entry.sender {
                Sender::Assistant => {
                    for line in entry.text.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
                Sender::System => {
                    for line in entry.text.lines() {
                        lines.push(Line::from(Span::styled(
                            line.to_string(),
                            Style::default().fg(Color::Gray),
                        )));
                    }
                }
                Sender::User => {
                    for line in entry.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
            }
        }
        lines.push(Line::default());
    }

    Text::from(lines)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_border_color = if app.show_api_key_input {
        Color::DarkGray
    } else {
        Color::Yellow
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Ask a question ");

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if !app.show_api_key_input {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_actions(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_key = Style::default().bg(Color::Black).fg(Color::DarkGray);
    let disabled_label = Style::default()
        .bg(Color::Black)
        .fg(Color::DarkGray)
        .add_modifier(Modifier::DIM);

    let (analyze_key, analyze_label) = if app.can_analyze() {
        (key_style, label_style)
    } else {
        (disabled_key, disabled_label)
    };
    let (suggest_key, suggest_label) = if app.current_file.is_some() {
        (key_style, label_style)
    } else {
        (disabled_key, disabled_label)
    };

    let hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" ask ", label_style),
        Span::styled(" ^A ", analyze_key),
        Span::styled(" Analyze File ", analyze_label),
        Span::styled(" ^N ", suggest_key),
        Span::styled(" suggest names ", suggest_label),
        Span::styled(" ^K ", key_style),
        Span::styled(" API key ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" close ", label_style),
    ];

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Enter OpenAI API Key ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions = Paragraph::new("Paste your API key (sk-...). Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let display_text = mask_key(&app.api_key_input);
    frame.render_widget(
        Paragraph::new(display_text.clone()).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    // Cursor sits at the end of the masked text
    let cursor_x = display_text.chars().count().min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let char_count = format!("{} characters", app.api_key_input.chars().count());
    frame.render_widget(
        Paragraph::new(char_count).style(Style::default().fg(Color::DarkGray)),
        Rect::new(inner.x, inner.y + 4, inner.width, 1),
    );
}

/// Mask a key with asterisks, showing only the last 4 chars
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len == 0 {
        String::new()
    } else if len <= 4 {
        "*".repeat(len)
    } else {
        let masked_len = len - 4;
        let last_four: String = key.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    }
}
