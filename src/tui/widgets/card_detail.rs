use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{format_date, percent_bar, rate_color};
use crate::models::Flashcard;
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let Some(card) = &app.selected_card else {
        let block = Block::default().borders(Borders::ALL).title(" Card ");
        let paragraph = Paragraph::new("No card selected").block(block);
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35), // Front
            Constraint::Percentage(35), // Back
            Constraint::Min(6),         // Progress
        ])
        .split(area);

    draw_side(f, " Front ", &card.front, Color::Yellow, chunks[0]);
    draw_side(f, " Back ", &card.back, Color::Green, chunks[1]);
    draw_progress(f, card, chunks[2]);
}

fn draw_side(f: &mut Frame, title: &str, body: &str, color: Color, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(body.to_string())
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_progress(f: &mut Frame, card: &Flashcard, area: Rect) {
    let rate = card.success_rate();
    let last = card
        .last_reviewed
        .as_deref()
        .map(format_date)
        .unwrap_or_else(|| "Never".to_string());

    let text = vec![
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            if card.is_known {
                Span::styled("Known", Style::default().fg(Color::Green))
            } else {
                Span::styled("Needs review", Style::default().fg(Color::Yellow))
            },
        ]),
        Line::from(vec![
            Span::styled("Reviews: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} ({} correct)", card.times_reviewed, card.times_correct),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Success: ", Style::default().fg(Color::Gray)),
            Span::styled(percent_bar(rate), Style::default().fg(rate_color(rate))),
            Span::styled(format!(" {}%", rate), Style::default().fg(rate_color(rate))),
        ]),
        Line::from(vec![
            Span::styled("Last reviewed: ", Style::default().fg(Color::Gray)),
            Span::styled(last, Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled("Created: ", Style::default().fg(Color::Gray)),
            Span::styled(format_date(&card.created_at), Style::default().fg(Color::White)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} · #{} ", card.topic, card.id))
        .title_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text).block(block);
    f.render_widget(paragraph, area);
}
