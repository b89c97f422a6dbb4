use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{one_line, rate_color, truncate};
use crate::tui::App;

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let mut filters = vec![app.query.sort.label().to_string()];
    if let Some(topic) = &app.query.topic {
        filters.push(format!("topic: {}", topic));
    }
    if let Some(search) = &app.query.search {
        filters.push(format!("search: {}", search));
    }
    if app.only_unknown {
        filters.push("study: unknown only".to_string());
    }
    let title = format!(" Cards ({}) · {} ", app.cards.items.len(), filters.join(" · "));

    let items: Vec<ListItem> = app
        .cards
        .items
        .iter()
        .map(|card| {
            let rate = card.success_rate();
            let (status, status_color) = if card.is_known {
                ("known ", Color::Green)
            } else {
                ("review", Color::Yellow)
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<18}", truncate(&card.topic, 16)),
                    Style::default().fg(Color::Cyan),
                ),
                Span::styled(
                    format!("{:<44}", truncate(&one_line(&card.front), 42)),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{} ", status), Style::default().fg(status_color)),
                Span::styled(
                    format!("{:>4} ", card.times_reviewed),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(format!("{:>4}%", rate), Style::default().fg(rate_color(rate))),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().fg(Color::Cyan));

    let header_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);
    let header = Line::from(vec![
        Span::styled(format!("  {:<18}", "Topic"), header_style),
        Span::styled(format!("{:<44}", "Front"), header_style),
        Span::styled("Status ", header_style),
        Span::styled("Revs ", header_style),
        Span::styled(" Rate", header_style),
    ]);

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(app.cards.selected);

    let header_area = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: 1,
    };
    f.render_widget(Paragraph::new(header), header_area);

    let list_area = Rect {
        x: area.x,
        y: area.y + 1,
        width: area.width,
        height: area.height.saturating_sub(1),
    };

    f.render_stateful_widget(list, list_area, &mut state);
}
