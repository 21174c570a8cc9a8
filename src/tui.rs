use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use std::io::stdout;
use std::time::{Duration, Instant};

use crate::controller::{DashboardState, UiEvent};
use crate::dispatch::{Completion, Dispatcher};
use crate::models::{View, cycle_employment_filter};
use crate::normalize::status_label;
use crate::render::{CardAction, CardView, Link, Screen};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Mode {
    Browse,
    Search { buffer: String },
}

pub fn run_dashboard(state: &mut DashboardState, dispatcher: &mut Dispatcher) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, state, dispatcher);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut DashboardState,
    dispatcher: &mut Dispatcher,
) -> Result<()> {
    let mut mode = Mode::Browse;
    let mut list_state = ListState::default();

    dispatcher.submit_load(state.begin_reload());

    loop {
        for completion in dispatcher.drain() {
            match completion {
                Completion::Loaded { view, outcome } => state.finish_reload(view, outcome),
                Completion::ActionDone { action, outcome } => {
                    state.finish_action(&action, outcome, Instant::now())
                }
            }
        }
        state.tick(Instant::now());

        let loading = dispatcher.in_flight() > 0;
        list_state.select(match state.screen {
            Screen::Cards(_) => Some(state.selected),
            Screen::Empty(_) => None,
        });
        terminal.draw(|frame| draw(frame, state, &mode, loading, &mut list_state))?;

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            break;
        }

        match &mut mode {
            Mode::Search { buffer } => match key.code {
                KeyCode::Enter => {
                    let text = std::mem::take(buffer);
                    mode = Mode::Browse;
                    dispatcher.submit_load(state.handle_event(UiEvent::SearchSubmit(text)));
                }
                KeyCode::Esc => mode = Mode::Browse,
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            },
            Mode::Browse => {
                let event = match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Char('1') => Some(UiEvent::SwitchView(View::All)),
                    KeyCode::Char('2') => Some(UiEvent::SwitchView(View::Today)),
                    KeyCode::Char('3') => Some(UiEvent::SwitchView(View::Bookmarks)),
                    KeyCode::Char('4') => Some(UiEvent::SwitchView(View::Applications)),
                    KeyCode::Tab => Some(UiEvent::SwitchView(state.view.next())),
                    KeyCode::Char('r') => Some(UiEvent::Refresh),
                    KeyCode::Char('e') => Some(UiEvent::FilterChange(cycle_employment_filter(
                        state.query.employment_filter,
                    ))),
                    KeyCode::Char('s') => Some(UiEvent::SortChange(state.query.sort_order.next())),
                    KeyCode::Char('/') => {
                        mode = Mode::Search {
                            buffer: state.query.search_text.clone(),
                        };
                        None
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.select_next();
                        None
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        state.select_prev();
                        None
                    }
                    KeyCode::Char('b') => {
                        submit_selected(state, dispatcher, |a| {
                            matches!(a, CardAction::Bookmark { .. })
                        });
                        None
                    }
                    KeyCode::Char('a') => {
                        submit_selected(state, dispatcher, |a| {
                            matches!(a, CardAction::Apply { .. })
                        });
                        None
                    }
                    KeyCode::Char('d') => {
                        submit_selected(state, dispatcher, |a| {
                            matches!(a, CardAction::Unbookmark { .. })
                        });
                        None
                    }
                    _ => None,
                };
                if let Some(event) = event {
                    dispatcher.submit_load(state.handle_event(event));
                }
            }
        }
    }
    Ok(())
}

fn submit_selected(
    state: &DashboardState,
    dispatcher: &mut Dispatcher,
    wanted: impl Fn(&CardAction) -> bool,
) {
    if let Some(action) = state.selected_actions().into_iter().find(|a| wanted(a)) {
        dispatcher.submit_action(action);
    }
}

fn dim() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn draw(
    frame: &mut Frame,
    state: &DashboardState,
    mode: &Mode,
    loading: bool,
    list_state: &mut ListState,
) {
    let banner_lines: Vec<String> = state
        .banner
        .as_ref()
        .map(|b| {
            let width = frame.area().width.saturating_sub(2).max(10) as usize;
            textwrap::wrap(&b.message, width).into_iter().map(|l| l.into_owned()).collect()
        })
        .unwrap_or_default();
    let banner_height = if banner_lines.is_empty() { 0 } else { banner_lines.len() as u16 + 2 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // View tabs
    let titles: Vec<String> = View::ALL
        .iter()
        .enumerate()
        .map(|(i, v)| format!("{} {}", i + 1, v.label()))
        .collect();
    let selected_tab = View::ALL.iter().position(|v| *v == state.view).unwrap_or(0);
    let title = if loading { " JobLog (불러오는 중...) " } else { " JobLog " };
    let tabs = Tabs::new(titles)
        .select(selected_tab)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, chunks[0]);

    frame.render_widget(Paragraph::new(filter_line(state, mode)), chunks[1]);

    // Stats
    let mut stat_spans = Vec::new();
    for (i, stat) in state.stats().into_iter().enumerate() {
        if i > 0 {
            stat_spans.push(Span::styled("  │  ", dim()));
        }
        stat_spans.push(Span::styled(format!("{} ", stat.label), dim()));
        stat_spans.push(Span::styled(stat.value, Style::default().add_modifier(Modifier::BOLD)));
    }
    frame.render_widget(Paragraph::new(Line::from(stat_spans)), chunks[2]);

    if let Some(banner) = &state.banner {
        let color = if banner.is_error() { Color::Red } else { Color::Green };
        let text: Vec<Line> = banner_lines.into_iter().map(Line::from).collect();
        let widget = Paragraph::new(text)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(widget, chunks[3]);
    }

    match &state.screen {
        Screen::Empty(message) => {
            let empty = Paragraph::new(message.as_str())
                .alignment(Alignment::Center)
                .style(dim())
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} ", state.view.label())),
                );
            frame.render_widget(empty, chunks[4]);
        }
        Screen::Cards(cards) => {
            let items: Vec<ListItem> = cards.iter().map(card_item).collect();
            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} ({}) ", state.view.label(), cards.len())),
                )
                .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            frame.render_stateful_widget(list, chunks[4], list_state);
        }
    }

    const BROWSE_HELP: &str =
        " 1-4/Tab:view  r:refresh  /:search  e:employment  s:sort  j/k:move  b:bookmark a:applied";
    let help = match mode {
        Mode::Search { .. } => " Enter:search  Esc:cancel".to_string(),
        Mode::Browse if state.view == View::Bookmarks => {
            format!("{} d:unbookmark  q:quit", BROWSE_HELP)
        }
        Mode::Browse => format!("{}  q:quit", BROWSE_HELP),
    };
    frame.render_widget(Paragraph::new(help).style(dim()), chunks[5]);
}

fn filter_line<'a>(state: &'a DashboardState, mode: &'a Mode) -> Line<'a> {
    let search = match mode {
        Mode::Search { buffer } => {
            Span::styled(format!("{}_", buffer), Style::default().fg(Color::Yellow))
        }
        Mode::Browse if state.query.search_text.is_empty() => Span::styled("-", dim()),
        Mode::Browse => Span::raw(state.query.search_text.as_str()),
    };
    let employment = match state.query.employment_filter {
        Some(kind) => status_label(Some(kind.as_str())),
        None => "전체".to_string(),
    };

    let mut spans = vec![
        Span::styled(" 검색 ", dim()),
        search,
        Span::styled("  고용형태 ", dim()),
        Span::raw(employment),
        Span::styled("  정렬 ", dim()),
        Span::raw(state.query.sort_order.label()),
    ];
    if !state.view.is_job_listing() {
        spans.push(Span::styled("  (이 뷰에는 적용되지 않음)", dim()));
    }
    Line::from(spans)
}

fn card_item(card: &CardView) -> ListItem<'static> {
    let header = Line::from(vec![
        Span::styled(format!("[{}] ", card.role_badge), Style::default().fg(Color::Cyan)),
        Span::styled(format!("[{}] ", card.status_badge), Style::default().fg(Color::Yellow)),
        Span::styled(card.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ]);
    let meta = Line::from(format!(
        "    {}  ·  {}  ·  {}",
        card.company, card.score_text, card.posted_text
    ));
    let link = match &card.link {
        Link::Enabled(url) => {
            Line::from(Span::styled(format!("    {}", url), Style::default().fg(Color::Blue)))
        }
        Link::Disabled(label) => Line::from(Span::styled(format!("    {}", label), dim())),
    };
    ListItem::new(vec![header, meta, link])
}
