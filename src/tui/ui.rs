use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};

use super::widgets::{card_detail, cards, dashboard, stats, study};
use super::{App, View};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    draw_tabs(f, app, chunks[0]);
    draw_content(f, app, chunks[1]);
    draw_help_bar(f, app, chunks[2]);
}

fn draw_tabs(f: &mut Frame, app: &App, area: Rect) {
    let tab_titles = vec!["Dashboard", "Cards", "Study", "Stats"];
    let selected = match app.view {
        View::Dashboard => 0,
        View::Cards | View::CardDetail => 1,
        View::Study => 2,
        View::Stats => 3,
    };

    let title = format!(" Flashcards · {} ", app.user.username);
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    f.render_widget(tabs, area);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    match app.view {
        View::Dashboard => dashboard::draw(f, app, area),
        View::Cards => cards::draw(f, app, area),
        View::CardDetail => card_detail::draw(f, app, area),
        View::Study => study::draw(f, app, area),
        View::Stats => stats::draw(f, app, area),
    }
}

fn key(k: &str) -> Span<'_> {
    Span::styled(k, Style::default().fg(Color::Cyan))
}

fn draw_help_bar(f: &mut Frame, app: &App, area: Rect) {
    let help_text = if app.search_mode {
        vec![
            Span::styled("/", Style::default().fg(Color::Yellow)),
            Span::raw(&app.search_input),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(" | "),
            key("<CR>"),
            Span::raw(" Apply  "),
            key("<Esc>"),
            Span::raw(" Cancel"),
        ]
    } else {
        let mut spans = vec![key("h/l"), Span::raw(" Views  ")];

        match app.view {
            View::Dashboard => {
                spans.extend(vec![
                    key("s"),
                    Span::raw(" Study  "),
                    key("^r"),
                    Span::raw(" Refresh  "),
                ]);
            }
            View::Cards => {
                spans.extend(vec![
                    key("j/k"),
                    Span::raw(" Nav  "),
                    key("g/G"),
                    Span::raw(" Top/Bot  "),
                    key("<CR>"),
                    Span::raw(" Open  "),
                    key("/"),
                    Span::raw(" Search  "),
                    key("t"),
                    Span::raw(" Topic  "),
                    key("o"),
                    Span::raw(" Sort  "),
                    key("u"),
                    Span::raw(" Unknown only  "),
                    key("s"),
                    Span::raw(" Study  "),
                ]);
                if app.query.search.is_some() || app.query.topic.is_some() {
                    spans.extend(vec![key("<Esc>"), Span::raw(" Clear  ")]);
                }
            }
            View::CardDetail => {
                spans.extend(vec![key("h/<Esc>"), Span::raw(" Back  ")]);
            }
            View::Study => match &app.study {
                Some(s) if !s.is_finished() && s.revealed => {
                    spans.extend(vec![
                        key("k/y"),
                        Span::raw(" Known  "),
                        key("r/n"),
                        Span::raw(" Review  "),
                        key("<Esc>"),
                        Span::raw(" End  "),
                    ]);
                }
                Some(s) if !s.is_finished() => {
                    spans.extend(vec![
                        key("<Space>"),
                        Span::raw(" Reveal  "),
                        key("<Esc>"),
                        Span::raw(" End  "),
                    ]);
                }
                _ => {
                    spans.extend(vec![key("s"), Span::raw(" Start  ")]);
                }
            },
            View::Stats => {
                spans.extend(vec![key("^r"), Span::raw(" Refresh  ")]);
            }
        }

        spans.extend(vec![key("q"), Span::raw(" Quit")]);
        if let Some(status) = &app.status {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(status.as_str(), Style::default().fg(Color::Yellow)));
        }

        spans
    };

    let help = Paragraph::new(Line::from(help_text)).style(Style::default().bg(Color::DarkGray));

    f.render_widget(help, area);
}
