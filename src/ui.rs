use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, InputMode, Screen};
use crate::models::*;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(frame.area());

    // Title bar
    let title = Paragraph::new(Line::from(vec![Span::styled(
        " Claude Conversations",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )]));
    frame.render_widget(title, chunks[0]);

    draw_bottom_bar(frame, app, chunks[2]);

    match app.screen {
        Screen::ProjectList => draw_project_list(frame, app, chunks[1]),
        Screen::ConversationList => draw_conversation_list(frame, app, chunks[1]),
        Screen::ConversationView => draw_conversation_view(frame, app, chunks[1]),
    }
}

fn draw_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.input_mode {
        InputMode::Filter => Line::from(vec![
            Span::styled(
                " /",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(&app.filter_query, Style::default().fg(Color::White)),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ]),
        InputMode::RenameProject => input_prompt(" New project name: ", &app.input_buffer),
        InputMode::RenameConversation => input_prompt(" New name: ", &app.input_buffer),
        InputMode::CorrectPath { .. } => input_prompt(" Working directory: ", &app.input_buffer),
        InputMode::ConfirmDelete => Line::from(Span::styled(
            " Delete this conversation and its metadata? y/n",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        InputMode::Normal => {
            if let Some(status) = &app.status {
                Line::from(Span::styled(
                    format!(" {}", status),
                    Style::default().fg(Color::Yellow),
                ))
            } else {
                let help = match app.screen {
                    Screen::ProjectList => {
                        "Enter: Open  r: Rename  p: Fix path  /: Filter  j/k: Navigate  q: Quit"
                    }
                    Screen::ConversationList => {
                        "Enter: View  l: Resume  y: Copy cmd  r: Rename  x: Delete  /: Filter  Esc: Back"
                    }
                    Screen::ConversationView => {
                        "l: Resume  y: Copy cmd  r: Rename  x: Delete  j/k: Scroll  Esc: Back"
                    }
                };
                Line::from(Span::styled(help, Style::default().fg(Color::DarkGray)))
            }
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn input_prompt<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            label,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(Color::White)),
        Span::styled("█", Style::default().fg(Color::Cyan)),
    ])
}

fn row_style(selected: bool) -> Style {
    if selected {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    } else {
        Style::default().fg(Color::White)
    }
}

fn draw_project_list(frame: &mut Frame, app: &App, area: Rect) {
    let header = Row::new(vec![
        Cell::from("Project"),
        Cell::from("Working Dir"),
        Cell::from("Convos"),
        Cell::from("Msgs"),
        Cell::from("Created"),
    ])
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    // borders(2) + header(1) = 3
    let visible_height = (area.height as usize).saturating_sub(3);

    let rows: Vec<Row> = app
        .displayed_projects
        .iter()
        .enumerate()
        .skip(app.project_scroll_offset)
        .take(visible_height)
        .map(|(i, project)| {
            Row::new(vec![
                Cell::from(truncate_display(&project.display_path, 48)),
                Cell::from(truncate_display(&project.working_path, 48)),
                Cell::from(project.conversation_count.to_string()),
                Cell::from(format_count(project.total_messages)),
                Cell::from(project.creation_date_str()),
            ])
            .style(row_style(i == app.selected_project))
        })
        .collect();

    let title = if app.filter_query.is_empty() {
        " Projects ".to_string()
    } else {
        format!(" Projects ({} matches) ", app.displayed_projects.len())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(38),
            Constraint::Percentage(32),
            Constraint::Percentage(8),
            Constraint::Percentage(8),
            Constraint::Percentage(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(table, area);
}

fn draw_conversation_list(frame: &mut Frame, app: &App, area: Rect) {
    let inner_chunks =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).split(area);

    // Breadcrumb
    let project_name = app
        .current_project
        .as_ref()
        .map(|p| p.display_path.as_str())
        .unwrap_or("");
    let breadcrumb = Paragraph::new(Line::from(vec![Span::styled(
        format!(" Project: {}", project_name),
        Style::default().fg(Color::DarkGray),
    )]));
    frame.render_widget(breadcrumb, inner_chunks[0]);

    let header = Row::new(vec![
        Cell::from("Created"),
        Cell::from("Msgs"),
        Cell::from("Name"),
    ])
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    // borders(2) + header(1) = 3
    let visible_height = (inner_chunks[1].height as usize).saturating_sub(3);

    let rows: Vec<Row> = app
        .displayed_conversations
        .iter()
        .enumerate()
        .skip(app.conversation_scroll_offset)
        .take(visible_height)
        .map(|(i, conversation)| {
            let name = conversation.name.replace('\n', " ");
            Row::new(vec![
                Cell::from(conversation.creation_date_str()),
                Cell::from(format_count(conversation.message_count)),
                Cell::from(truncate_display(&name, 80)),
            ])
            .style(row_style(i == app.selected_conversation))
        })
        .collect();

    let title = if app.filter_query.is_empty() {
        " Conversations ".to_string()
    } else {
        format!(
            " Conversations ({} matches) ",
            app.displayed_conversations.len()
        )
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(14),
            Constraint::Percentage(8),
            Constraint::Percentage(78),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(table, inner_chunks[1]);
}

fn draw_conversation_view(frame: &mut Frame, app: &App, area: Rect) {
    let inner_chunks =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).split(area);

    let conversation_name = app
        .displayed_conversations
        .get(app.selected_conversation)
        .map(|c| c.name.as_str())
        .unwrap_or("unknown");
    let breadcrumb = Paragraph::new(Line::from(vec![Span::styled(
        format!(" Conversation: {}", truncate_display(conversation_name, 70)),
        Style::default().fg(Color::DarkGray),
    )]));
    frame.render_widget(breadcrumb, inner_chunks[0]);

    let mut lines: Vec<Line> = Vec::new();
    for (i, message) in app.messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::from(""));
        }

        let role_color = match message.role {
            MessageRole::User => Color::Cyan,
            MessageRole::Assistant => Color::Green,
        };

        let ts = message.timestamp_str();
        let mut header_spans = vec![Span::styled(
            message.role_label(),
            Style::default()
                .fg(role_color)
                .add_modifier(Modifier::BOLD),
        )];
        if !ts.is_empty() {
            header_spans.push(Span::raw(" "));
            header_spans.push(Span::styled(ts, Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(header_spans));

        for text_line in message.text.lines() {
            lines.push(Line::from(Span::styled(
                text_line.to_string(),
                Style::default().fg(Color::White),
            )));
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No displayable content in this conversation.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let max_scroll = lines.len().saturating_sub(1).min(u16::MAX as usize);
    let paragraph = Paragraph::new(lines)
        .scroll((app.scroll_offset.min(max_scroll) as u16, 0))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );

    frame.render_widget(paragraph, inner_chunks[1]);
}

/// Truncate a string to a display-column budget, ellipsis-suffixed. Counts
/// terminal cells, not chars, so wide characters do not overflow the column.
fn truncate_display(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(3);
    let mut out = String::new();
    let mut width = 0usize;
    for ch in s.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.push_str("...");
    out
}
