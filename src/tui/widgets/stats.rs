use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::{format_date, percent_bar, rate_color, truncate};
use crate::models::success_rate;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(chunks[0]);

    draw_totals(f, app, left[0]);
    draw_topics(f, app, left[1]);
    draw_sessions(f, app, chunks[1]);
}

fn draw_totals(f: &mut Frame, app: &App, area: Rect) {
    let stats = &app.stats;
    let label = Style::default().fg(Color::Gray);

    let text = vec![
        Line::from(vec![
            Span::styled("Cards: ", label),
            Span::styled(
                format!("{}", stats.total_cards),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled("Reviews: ", label),
            Span::styled(
                format!("{}", stats.total_reviews),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Known: ", label),
            Span::styled(
                format!("{}", stats.known_cards),
                Style::default().fg(Color::Green),
            ),
            Span::raw("   "),
            Span::styled("To review: ", label),
            Span::styled(
                format!("{}", stats.review_cards),
                Style::default().fg(Color::Yellow),
            ),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Totals ")
        .title_style(Style::default().fg(Color::Cyan));

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_topics(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .stats
        .topics
        .iter()
        .map(|t| {
            let pct = success_rate(t.known, t.total);
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<22}", truncate(&t.topic, 20)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>3}/{:<4} ", t.known, t.total),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(percent_bar(pct), Style::default().fg(rate_color(pct))),
                Span::styled(format!(" {:>3}%", pct), Style::default().fg(rate_color(pct))),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Topics ")
        .title_style(Style::default().fg(Color::Yellow));

    f.render_widget(List::new(items).block(block), area);
}

fn draw_sessions(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .stats
        .recent_sessions
        .iter()
        .map(|s| {
            let duration = if s.is_active() {
                "active".to_string()
            } else {
                format!("{} min", s.duration_minutes())
            };

            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{:<14}", format_date(&s.started_at)),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(truncate(&s.topic, 24), Style::default().fg(Color::White)),
                ]),
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        format!("{} studied, {} known, ", s.cards_studied, s.cards_known),
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled(duration, Style::default().fg(Color::Cyan)),
                ]),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Recent Sessions ")
        .title_style(Style::default().fg(Color::Magenta));

    f.render_widget(List::new(items).block(block), area);
}
