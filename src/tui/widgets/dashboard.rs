use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{format_date, percent_bar, truncate};
use crate::models::success_rate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Totals + top topics row
            Constraint::Min(0),    // Recent sessions
        ])
        .split(area);

    let top_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    draw_totals(f, app, top_chunks[0]);
    draw_top_topics(f, app, top_chunks[1]);
    draw_recent_sessions(f, app, chunks[1]);
}

fn draw_totals(f: &mut Frame, app: &App, area: Rect) {
    let dash = &app.dashboard;
    let known_pct = success_rate(dash.known_cards, dash.total_cards);

    let text = vec![
        Line::from(vec![
            Span::styled("Cards: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", dash.total_cards),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Known: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", dash.known_cards),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::styled("To review: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{}", dash.review_cards),
                Style::default().fg(if dash.review_cards > 0 {
                    Color::Yellow
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(percent_bar(known_pct), Style::default().fg(Color::Green)),
            Span::styled(format!(" {}% known", known_pct), Style::default().fg(Color::Cyan)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Overview ")
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}

fn draw_top_topics(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .dashboard
        .top_topics
        .iter()
        .enumerate()
        .map(|(i, t)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("{:<24}", truncate(&t.topic, 22)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{}", t.count), Style::default().fg(Color::Yellow)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Top Topics ")
        .title_style(Style::default().fg(Color::Yellow));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

fn draw_recent_sessions(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .dashboard
        .recent_sessions
        .iter()
        .map(|session| {
            let (state, color) = if session.is_active() {
                ("In Progress", Color::Cyan)
            } else {
                ("Done", Color::DarkGray)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<14}", format_date(&session.started_at)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{:<22}", truncate(&session.topic, 20)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>3}/{:<4}", session.cards_known, session.cards_studied),
                    Style::default().fg(Color::Green),
                ),
                Span::styled(state, Style::default().fg(color)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Sessions ")
        .title_style(Style::default().fg(Color::Magenta));

    let list = List::new(items).block(block);
    f.render_widget(list, area);
}
