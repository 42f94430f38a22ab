use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::api::models::{Role, ServerInfo, ServerKind};
use crate::app::{App, DeleteTarget, Tab};
use crate::form::{FormEditor, FormField};
use crate::workflow::{SERVERS, STEPS};

/// Render the entire dashboard
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Length(3), // Status bar
            Constraint::Min(8),    // Active tab
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
    match app.tab {
        Tab::Servers => render_server_grid(frame, app, chunks[2]),
        Tab::Agents => render_agent_list(frame, app, chunks[2]),
        Tab::Chat => render_chat(frame, app, chunks[2]),
        Tab::Workflow => render_workflow(frame, app, chunks[2]),
    }
    render_help_bar(frame, app, chunks[3]);

    // Render overlays
    if app.show_help {
        render_help_popup(frame);
    }

    if let Some(editor) = &app.server_form {
        render_server_form(frame, editor);
    }

    if let Some(target) = &app.pending_delete {
        render_confirm_delete(frame, target);
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" MCP Server Registry ")
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (command, http) = app.server_counts();
    let total = app.servers.len();
    let noun = if total == 1 { "Server" } else { "Servers" };
    let session = app
        .session_id
        .as_deref()
        .map(|id| id.chars().take(8).collect::<String>())
        .unwrap_or_else(|| "none".to_string());

    let status_line = Line::from(vec![
        Span::styled(
            format!("{} {}", total, noun),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("{} command", command),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" "),
        Span::styled(format!("{} http", http), Style::default().fg(Color::Blue)),
        Span::raw(" | Agents: "),
        Span::styled(
            format!("{}", app.agents.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw(" | "),
        Span::styled(app.approach.as_str(), Style::default().fg(Color::Magenta)),
        Span::raw(" | session: "),
        Span::styled(session, Style::default().fg(Color::Yellow)),
    ]);

    // Add status message if present
    let content = if let Some(ref msg) = app.status_message {
        vec![
            status_line,
            Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Cyan))),
        ]
    } else {
        vec![status_line]
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn placeholder(frame: &mut Frame, area: Rect, title: &str, text: &str) {
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", title))
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(paragraph, area);
}

fn render_server_grid(frame: &mut Frame, app: &App, area: Rect) {
    if app.servers_loading && app.servers.is_empty() {
        placeholder(frame, area, "Servers", "Loading servers...");
        return;
    }
    if app.servers.is_empty() {
        placeholder(
            frame,
            area,
            "Servers",
            "No servers yet.\n\nPress `a` to add your first MCP server.",
        );
        return;
    }

    let cols = 3.min(app.servers.len()).max(1);
    let rows = app.servers.len().div_ceil(cols);

    let row_height = area.height / rows as u16;
    let row_constraints: Vec<Constraint> = (0..rows)
        .map(|_| Constraint::Length(row_height.max(7)))
        .collect();

    let row_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (i, server) in app.servers.iter().enumerate() {
        let row = i / cols;
        let col = i % cols;

        if row >= row_chunks.len() {
            break;
        }

        let col_constraints: Vec<Constraint> = (0..cols)
            .map(|_| Constraint::Ratio(1, cols as u32))
            .collect();

        let col_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(row_chunks[row]);

        if col < col_chunks.len() {
            render_server_card(frame, server, col_chunks[col], i == app.selected);
        }
    }
}

fn render_server_card(frame: &mut Frame, server: &ServerInfo, area: Rect, is_selected: bool) {
    let kind_color = match server.kind {
        ServerKind::Command => Color::Green,
        ServerKind::Http => Color::Blue,
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(server.kind.as_str(), Style::default().fg(kind_color)),
            Span::raw("  "),
            Span::styled(server.status.clone(), Style::default().fg(Color::Yellow)),
            Span::raw(format!("  {} tools", server.tools_count)),
        ]),
    ];
    if let Some(target) = server.url.as_ref().or(server.command.as_ref()) {
        lines.push(Line::from(Span::styled(
            target.clone(),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if !server.description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(server.description.clone()));
    }

    let border_style = if is_selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", server.name))
        .border_style(border_style);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_agent_list(frame: &mut Frame, app: &App, area: Rect) {
    if app.agents_loading && app.agents.is_empty() {
        placeholder(frame, area, "Agents", "Loading agents...");
        return;
    }
    if app.agents.is_empty() {
        placeholder(frame, area, "Agents", "No agents registered.");
        return;
    }

    let mut lines = Vec::new();
    for (i, agent) in app.agents.iter().enumerate() {
        let marker = if i == app.selected { "> " } else { "  " };
        let name_style = if i == app.selected {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let mut header = vec![
            Span::raw(marker),
            Span::styled(agent.display_name.clone(), name_style),
            Span::styled(
                format!(" ({})", agent.name),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  "),
            Span::styled(agent.source.as_str(), Style::default().fg(Color::Magenta)),
        ];
        if let Some(server) = &agent.mcp_server {
            header.push(Span::styled(
                format!("  mcp: {}", server),
                Style::default().fg(Color::Green),
            ));
        }
        lines.push(Line::from(header));

        if !agent.description.is_empty() {
            lines.push(Line::from(format!("    {}", agent.description)));
        }
        if !agent.capabilities.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("    [{}]", agent.capabilities.join(", ")),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Agents ")
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let mut lines = Vec::new();
    for message in &app.transcript {
        let (label, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("Assistant", Color::Green),
        };
        let mut header = vec![
            Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {}", message.time_label()),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(elapsed) = message.processing_time {
            header.push(Span::styled(
                format!(" ({:.1}s)", elapsed.as_secs_f64()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(header));
        lines.extend(message.render_lines().into_iter().map(Line::from));
        lines.push(Line::from(""));
    }
    if app.awaiting_answer {
        lines.push(Line::from(Span::styled(
            "Thinking...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let visible = chunks[0].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;

    let transcript = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Chat ({}) ", app.approach))
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(transcript, chunks[0]);

    let input_style = if app.input_mode {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Query ")
            .border_style(input_style),
    );
    frame.render_widget(input, chunks[1]);
}

fn render_workflow(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Min(3),
        ])
        .split(area);

    let step_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            STEPS
                .iter()
                .map(|_| Constraint::Ratio(1, STEPS.len() as u32))
                .collect::<Vec<_>>(),
        )
        .split(chunks[0]);

    let active = app.workflow.active_step();
    for (i, step) in STEPS.iter().enumerate() {
        let style = if i == active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if i < active {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(step.title, style)),
            Line::from(Span::styled(step.summary, Style::default().fg(Color::DarkGray))),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", i + 1))
                .border_style(style),
        );
        frame.render_widget(paragraph, step_chunks[i]);
    }

    let detail = Paragraph::new(app.workflow.step().detail)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Current step ")
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(detail, chunks[1]);

    let mut servers = Vec::new();
    for (i, name) in SERVERS.iter().enumerate() {
        let style = if app.workflow.is_highlighted(i) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        servers.push(Span::styled(format!(" {} ", name), style));
        servers.push(Span::raw("  "));
    }
    let servers = Paragraph::new(Line::from(servers))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" MCP Servers ")
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(servers, chunks[2]);
}

fn key(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
}

fn render_help_bar(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.input_mode {
        vec![
            Span::styled(
                " INPUT ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            key("Enter"),
            Span::raw(":Send "),
            key("Esc"),
            Span::raw(":Leave input"),
        ]
    } else {
        let mut spans = vec![
            key("q"),
            Span::raw(":Quit "),
            key("Tab/1-4"),
            Span::raw(":Switch "),
            key("r"),
            Span::raw(":Refresh "),
        ];
        match app.tab {
            Tab::Servers => {
                spans.extend([
                    key("j/k"),
                    Span::raw(":Nav "),
                    key("a"),
                    Span::raw(":Add "),
                    key("d"),
                    Span::raw(":Delete "),
                ]);
            }
            Tab::Agents => {
                spans.extend([key("j/k"), Span::raw(":Nav "), key("d"), Span::raw(":Delete ")]);
            }
            Tab::Chat => {
                spans.extend([
                    key("i"),
                    Span::raw(":Type "),
                    key("a"),
                    Span::raw(":Approach "),
                    key("c"),
                    Span::raw(":Clear session "),
                ]);
            }
            Tab::Workflow => {}
        }
        spans.extend([key("?"), Span::raw(":Help")]);
        spans
    };

    let paragraph =
        Paragraph::new(Line::from(help_text)).style(Style::default().fg(Color::DarkGray));

    frame.render_widget(paragraph, area);
}

fn render_help_popup(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    let help_content = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  q, Esc      Quit"),
        Line::from("  Tab, 1-4    Switch tab"),
        Line::from("  j, Down     Move selection down"),
        Line::from("  k, Up       Move selection up"),
        Line::from("  a           Add server (Servers)"),
        Line::from("  d           Delete selected server or agent"),
        Line::from("  r           Refresh servers and agents"),
        Line::from("  i           Type a query (Chat)"),
        Line::from("  a           Toggle approach (Chat)"),
        Line::from("  c           Clear session (Chat)"),
        Line::from("  ?           Toggle this help"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_content).block(block);

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_confirm_delete(frame: &mut Frame, target: &DeleteTarget) {
    let area = centered_rect(40, 30, frame.area());

    let (what, name) = match target {
        DeleteTarget::Server(name) => ("server", name.clone()),
        DeleteTarget::Agent(name) => ("agent", name.clone()),
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Delete this {}?", what),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(name, Style::default().fg(Color::Yellow))),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Green)),
            Span::raw(": Yes  "),
            Span::styled("n", Style::default().fg(Color::Red)),
            Span::raw(": No"),
        ]),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(content)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_server_form(frame: &mut Frame, editor: &FormEditor) {
    let area = centered_rect(70, 80, frame.area());
    let focused = editor.focused();

    let mut lines = Vec::new();
    for field in editor.form.fields() {
        let is_focused = field == focused;
        let label_style = if is_focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut value = editor.form.value(field).to_string();
        if field == FormField::Kind {
            value = format!("< {} >", value);
        } else if is_focused {
            value.push('_');
        }
        lines.push(Line::from(vec![
            Span::styled(if is_focused { "> " } else { "  " }, label_style),
            Span::styled(format!("{:<14}", field.label()), label_style),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Tab/Up/Down move  Left/Right type  ^A add arg  ^E add env  ^X remove row",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "Enter submit  Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let title = if editor.submitting {
        " Add MCP Server (submitting...) "
    } else {
        " Add MCP Server "
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
