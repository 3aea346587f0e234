use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::types::{AppState, InputMode};

// Clean color palette for better visibility and modern look
const BASE_FG: Color = Color::Rgb(216, 222, 233); // Main text
const BASE_BG: Color = Color::Rgb(46, 52, 64); // Background
const ACCENT_COLOR: Color = Color::Rgb(136, 192, 208); // Primary accent
const SUCCESS_COLOR: Color = Color::Rgb(163, 190, 140); // Success/green
const WARNING_COLOR: Color = Color::Rgb(235, 203, 139); // Warning/yellow
const ERROR_COLOR: Color = Color::Rgb(191, 97, 106); // Failure/red
const HIGHLIGHT_BG: Color = Color::Rgb(59, 66, 82); // Selection background
const BORDER_COLOR: Color = Color::Rgb(76, 86, 106); // Inactive borders
const INPUT_TEXT: Color = Color::Rgb(235, 203, 139); // Input text

pub async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    app.initialize().await?;
    let mut last_tick = Instant::now();
    let mut last_refresh = Instant::now();
    let tick_rate = Duration::from_millis(250);
    let refresh_interval = Duration::from_secs(60);

    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.input_mode {
                        InputMode::Normal => {
                            if let Err(e) =
                                handle_normal_input(&mut app, key.code, key.modifiers).await
                            {
                                app.state = AppState::Error(e.to_string());
                            }
                        }
                        InputMode::Editing => {
                            handle_edit_input(&mut app, key.code).await?;
                        }
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        // Keep the resource mirror roughly current while the dashboard is
        // idle; never mid-batch.
        if last_refresh.elapsed() >= refresh_interval && !app.store.backups.enabling {
            let _ = app.refresh().await;
            last_refresh = Instant::now();
        }

        if !app.alive {
            break;
        }
        if matches!(app.state, AppState::Error(_)) && !app.show_help {
            break;
        }
    }

    Ok(())
}

pub async fn handle_normal_input(
    app: &mut App,
    key: KeyCode,
    _modifiers: KeyModifiers,
) -> Result<()> {
    if app.cancel_backups_alert_open {
        match key {
            KeyCode::Char('y') | KeyCode::Enter => app.cancel_backups().await,
            KeyCode::Esc | KeyCode::Char('n') => app.cancel_backups_alert_open = false,
            _ => {}
        }
        return Ok(());
    }

    match key {
        KeyCode::Char('q') => {
            app.shutdown();
        }
        KeyCode::Esc => {
            if app.error.is_some() {
                app.error = None;
            } else if app.show_help {
                app.toggle_help();
            } else if app.manual_input_active {
                app.cancel_manual_input();
            } else if app.store.backups.open {
                app.close_backup_drawer();
            }
        }
        KeyCode::Char('h') => app.toggle_help(),
        KeyCode::Char('/') => {
            if !app.store.backups.open {
                app.start_manual_input("search");
                app.manual_input_buffer = app.search_query.clone();
            }
        }
        KeyCode::Char('b') => {
            if !app.store.backups.open {
                app.open_backup_drawer();
            }
        }
        KeyCode::Char('a') => {
            if app.store.backups.open {
                app.toggle_auto_enroll();
            }
        }
        KeyCode::Enter => {
            if app.store.backups.open && !app.store.backups.enabling {
                app.confirm_backup_drawer().await;
            }
        }
        KeyCode::Char('s') => {
            if !app.store.backups.open && app.selected_linode_id().is_some() {
                app.start_manual_input("snapshot_label");
            }
        }
        KeyCode::Char('c') => {
            if !app.store.backups.open && app.selected_linode_id().is_some() {
                app.cancel_backups_alert_open = true;
            }
        }
        KeyCode::Char('w') => {
            if !app.store.backups.open && app.selected_linode_id().is_some() {
                app.start_manual_input("backup_schedule");
            }
        }
        KeyCode::Char('r') => {
            app.refresh().await?;
        }
        KeyCode::Up => app.move_selection_up(),
        KeyCode::Down => app.move_selection_down(),
        _ => {}
    }
    Ok(())
}

pub async fn handle_edit_input(app: &mut App, key: KeyCode) -> Result<()> {
    match key {
        KeyCode::Enter => {
            if app.manual_input_active {
                app.finish_manual_input().await?;
            }
        }
        KeyCode::Esc => {
            if app.manual_input_active {
                app.cancel_manual_input();
            } else {
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Char(c) => {
            if app.manual_input_active {
                app.manual_input_buffer.push(c);
                if app.manual_input_type == "search" {
                    app.search_query = app.manual_input_buffer.clone();
                    app.selected_result_index = 0;
                    app.run_search();
                }
            }
        }
        KeyCode::Backspace => {
            if app.manual_input_active {
                app.manual_input_buffer.pop();
                if app.manual_input_type == "search" {
                    app.search_query = app.manual_input_buffer.clone();
                    app.selected_result_index = 0;
                    app.run_search();
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, main_chunks[0], app);
    render_content(f, main_chunks[1], app);
    render_footer(f, main_chunks[2], app);

    if app.store.backups.open {
        render_backup_drawer(f, app);
    }
    if app.show_help {
        render_help_popup(f, app);
    }
    if app.manual_input_active {
        render_manual_input_popup(f, app);
    }
    if app.cancel_backups_alert_open {
        render_cancel_backups_popup(f, app);
    }
    if app.error.is_some() {
        render_error_popup(f, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.dry_run_mode {
        " Cloud Deck - DRY RUN MODE "
    } else {
        " Cloud Deck "
    };

    let subtitle = match &app.state {
        AppState::Loading => "Loading account resources...".to_string(),
        AppState::Dashboard => {
            let counts = if app.search_query.is_empty() {
                format!("{} resources", app.search_results.len())
            } else {
                format!(
                    "{} matches for \"{}\"",
                    app.search_results.len(),
                    app.search_query
                )
            };
            match &app.transfer {
                Some(transfer) => format!(
                    "{} | Transfer pool: {} of {} GB used",
                    counts,
                    transfer.pool_usage_display(),
                    transfer.quota
                ),
                None => counts,
            }
        }
        AppState::Error(_) => "Error Occurred".to_string(),
    };

    let header_block = Block::default()
        .title(title)
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(if app.dry_run_mode {
            Style::default().fg(WARNING_COLOR).bg(BASE_BG)
        } else {
            Style::default().fg(BASE_FG).bg(BASE_BG)
        });

    let header_content = Paragraph::new(subtitle)
        .style(Style::default().fg(ACCENT_COLOR))
        .alignment(Alignment::Center)
        .block(header_block);

    f.render_widget(header_content, area);
}

fn render_content(f: &mut Frame, area: Rect, app: &mut App) {
    match &app.state {
        AppState::Loading => render_loading(f, area, "Loading account resources..."),
        AppState::Dashboard => render_dashboard(f, area, app),
        AppState::Error(msg) => render_error(f, area, msg),
    }
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let search_display = if app.search_query.is_empty() {
        Span::styled("Press / to search by label or tag", Style::default().fg(BORDER_COLOR))
    } else {
        Span::styled(app.search_query.as_str(), Style::default().fg(INPUT_TEXT))
    };
    let search_bar = Paragraph::new(Line::from(search_display)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title("Search")
            .style(Style::default().fg(ACCENT_COLOR)),
    );
    f.render_widget(search_bar, chunks[0]);

    render_results_list(f, chunks[1], app);
}

fn kind_tag(kind: crate::app::ResultKind) -> &'static str {
    match kind {
        crate::app::ResultKind::Linode => "linode",
        crate::app::ResultKind::Volume => "volume",
        crate::app::ResultKind::NodeBalancer => "nodebal",
        crate::app::ResultKind::Domain => "domain",
        crate::app::ResultKind::Image => "image",
    }
}

fn render_results_list(f: &mut Frame, area: Rect, app: &mut App) {
    let flattened = app.flattened_results();

    let items: Vec<ListItem> = flattened
        .iter()
        .enumerate()
        .map(|(i, (kind, result))| {
            let style = if i == app.selected_result_index {
                Style::default()
                    .fg(ACCENT_COLOR)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(BASE_FG)
            };

            let tags = if result.data.tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", result.data.tags.join(", "))
            };

            ListItem::new(format!(
                "  {:<8} {:<24} {}{}",
                kind_tag(*kind),
                result.label,
                result.data.description,
                tags
            ))
            .style(style)
        })
        .collect();

    let title = format!("Resources ({})", flattened.len());
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title)
                .style(Style::default().fg(ACCENT_COLOR)),
        )
        .highlight_style(
            Style::default()
                .bg(HIGHLIGHT_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("► ");

    let mut state = ListState::default();
    state.select(Some(app.selected_result_index));

    f.render_stateful_widget(list, area, &mut state);
}

fn render_backup_drawer(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, popup_area);

    let drawer = &app.store.backups;
    let without_backups = app.store.resources.linodes_without_backups();

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            "Enable Backups",
            Style::default()
                .fg(ACCENT_COLOR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "{} Linode(s) currently without backups:",
            without_backups.len()
        )),
    ];

    for linode in without_backups.iter().take(10) {
        lines.push(Line::from(format!(
            "  {} ({})",
            linode.label, linode.region
        )));
    }
    if without_backups.len() > 10 {
        lines.push(Line::from(format!(
            "  ... and {} more",
            without_backups.len() - 10
        )));
    }

    lines.push(Line::from(""));
    let enroll_mark = if drawer.auto_enroll { "[x]" } else { "[ ]" };
    lines.push(Line::from(format!(
        "{} Auto-enroll future Linodes in backups (press a)",
        enroll_mark
    )));
    lines.push(Line::from(""));

    if drawer.enabling || drawer.enrolling {
        lines.push(Line::from(Span::styled(
            "Enabling backups...",
            Style::default().fg(WARNING_COLOR),
        )));
    } else if drawer.enable_success {
        lines.push(Line::from(Span::styled(
            format!("Backups enabled for {} Linode(s).", drawer.updated_count),
            Style::default().fg(SUCCESS_COLOR),
        )));
    } else if !drawer.enable_errors.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(
                "{} enabled, {} failed:",
                drawer.updated_count,
                drawer.enable_errors.len()
            ),
            Style::default().fg(ERROR_COLOR),
        )));
        for error in &drawer.enable_errors {
            lines.push(Line::from(Span::styled(
                format!("  Linode {}: {}", error.linode_id, error.reason),
                Style::default().fg(ERROR_COLOR),
            )));
        }
    }

    if let Some(auto_enroll_error) = &drawer.auto_enroll_error {
        lines.push(Line::from(Span::styled(
            auto_enroll_error.as_str(),
            Style::default().fg(ERROR_COLOR),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Enter] Confirm | [a] Toggle auto-enroll | [Esc] Close",
        Style::default().fg(WARNING_COLOR),
    )));

    let drawer_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Backups")
                .style(Style::default().fg(ACCENT_COLOR).bg(BASE_BG)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(drawer_widget, popup_area);
}

fn render_cancel_backups_popup(f: &mut Frame, _app: &App) {
    let popup_area = centered_rect(60, 25, f.area());
    f.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Cancel backups for this Linode?",
            Style::default()
                .fg(WARNING_COLOR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Existing backups will be deleted."),
        Line::from(""),
        Line::from(Span::styled(
            "[y] Confirm | [n/Esc] Keep backups",
            Style::default().fg(WARNING_COLOR),
        )),
    ];

    let popup = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .title("Cancel Backups")
                .style(Style::default().fg(WARNING_COLOR).bg(BASE_BG)),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(popup, popup_area);
}

fn render_error_popup(f: &mut Frame, app: &mut App) {
    if let Some(error_msg) = &app.error {
        let popup_area = centered_rect(60, 25, f.area());
        f.render_widget(Clear, popup_area);

        let error_text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "ERROR",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(error_msg.as_str()),
        ];

        let block = Block::default()
            .title("Error")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .style(Style::default().fg(Color::Red));

        let paragraph = Paragraph::new(error_text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });

        f.render_widget(paragraph, popup_area);
    }
}

fn render_loading(f: &mut Frame, area: Rect, message: &str) {
    let loading = Paragraph::new(message)
        .style(Style::default().fg(WARNING_COLOR))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(BORDER_COLOR)),
        );
    f.render_widget(loading, area);
}

fn render_error(f: &mut Frame, area: Rect, error_msg: &str) {
    let error = Paragraph::new(error_msg)
        .style(Style::default().fg(Color::Red))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Error")
                .style(Style::default().fg(Color::Red)),
        );
    f.render_widget(error, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let hints = if app.store.backups.open {
        "[Enter] Enable all | [a] Auto-enroll | [Esc] Close | [q] Quit"
    } else if app.selected_linode_id().is_some() {
        "[/] Search | [b] Backups | [s] Snapshot | [w] Schedule | [c] Cancel backups | [r] Refresh | [h] Help | [q] Quit"
    } else {
        "[/] Search | [b] Backups | [r] Refresh | [h] Help | [q] Quit"
    };

    let footer = Paragraph::new(hints)
        .style(Style::default().fg(BORDER_COLOR))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .style(Style::default().fg(BORDER_COLOR)),
        );
    f.render_widget(footer, area);
}

fn render_help_popup(f: &mut Frame, _app: &App) {
    let popup_area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "HELP - Cloud Deck",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "General:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  --dry-run                 Browse a sample fleet without network calls"),
        Line::from("  --token <TOKEN>           API token (defaults to LINODE_TOKEN)"),
        Line::from(""),
        Line::from(Span::styled(
            "Navigation:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  ↑/↓       Move through the result list"),
        Line::from("  /         Search resources by label or tag"),
        Line::from("  Esc       Close popup / clear error"),
        Line::from(""),
        Line::from(Span::styled(
            "Commands:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from("  B         Open the backup drawer"),
        Line::from("  Enter     Enable backups for every Linode without them"),
        Line::from("  A         Toggle auto-enroll (in the backup drawer)"),
        Line::from("  S         Take a snapshot of the selected Linode"),
        Line::from("  W         Set the backup window of the selected Linode"),
        Line::from("  C         Cancel backups for the selected Linode"),
        Line::from("  R         Refresh resource lists"),
        Line::from("  H         Toggle this help screen"),
        Line::from("  Q         Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Press H or Esc to close this help",
            Style::default().fg(Color::Yellow),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black));

    f.render_widget(help, popup_area);
}

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

fn render_manual_input_popup(f: &mut Frame, app: &App) {
    let area = f.area();
    let min_width = 50;
    let max_width = 80;
    let width = if area.width < min_width + 10 {
        area.width.saturating_sub(4)
    } else {
        (area.width * 60 / 100).clamp(min_width, max_width)
    };

    let height = 5;

    let popup_area = Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let title = match app.manual_input_type.as_str() {
        "search" => "Search by label or tag",
        "snapshot_label" => "Enter a Label for the Snapshot",
        "backup_schedule" => "Backup window: <day> <window>, e.g. Tuesday W10",
        _ => "Enter Input",
    };

    f.render_widget(Clear, popup_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(popup_area);

    let input = Paragraph::new(app.manual_input_buffer.as_str())
        .style(Style::default().fg(INPUT_TEXT))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title)
                .title_alignment(Alignment::Center)
                .style(Style::default().fg(ACCENT_COLOR).bg(BASE_BG)),
        );
    f.render_widget(input, chunks[0]);

    f.set_cursor_position((
        chunks[0].x + app.manual_input_buffer.width() as u16 + 1,
        chunks[0].y + 1,
    ));

    let hint = Paragraph::new(Line::from(Span::styled(
        "[Enter] Confirm | [Esc] Cancel",
        Style::default().fg(WARNING_COLOR),
    )))
    .alignment(Alignment::Center)
    .style(Style::default().bg(BASE_BG));
    f.render_widget(hint, chunks[1]);
}
