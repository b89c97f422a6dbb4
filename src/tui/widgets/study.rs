use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::tui::{App, StudyState};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    match &app.study {
        Some(study) if !study.is_finished() => draw_card(f, study, area),
        Some(study) => draw_summary(f, app, study, area),
        None => draw_idle(f, app, area),
    }
}

fn draw_idle(f: &mut Frame, app: &App, area: Rect) {
    let topic = app.query.topic.as_deref().unwrap_or("all topics");
    let scope = if app.only_unknown {
        "unknown cards only"
    } else {
        "every card"
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("Study {} ({})", topic, scope),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("s", Style::default().fg(Color::Cyan)),
            Span::raw(" to start. Topic and unknown-only filters come from the Cards view."),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Study ")
        .title_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn draw_card(f: &mut Frame, study: &StudyState, area: Rect) {
    let Some(card) = study.current() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Progress gauge
            Constraint::Percentage(45), // Question
            Constraint::Min(0),         // Answer
        ])
        .split(area);

    let done = study.index as f64 / study.cards.len().max(1) as f64;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            " {} · card {}/{} · {} known ",
            study.topic,
            study.index + 1,
            study.cards.len(),
            study.known
        )))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(done.clamp(0.0, 1.0));
    f.render_widget(gauge, chunks[0]);

    let question = Paragraph::new(card.front.clone())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", card.topic))
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(question, chunks[1]);

    let answer = if study.revealed {
        Paragraph::new(card.back.clone()).style(Style::default().fg(Color::White))
    } else {
        Paragraph::new("Press <Space> to reveal the answer")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
    };
    let answer = answer
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Answer ")
                .title_style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(answer, chunks[2]);
}

fn draw_summary(f: &mut Frame, app: &App, study: &StudyState, area: Rect) {
    let mut text = vec![Line::from("")];

    if study.cards.is_empty() {
        text.push(Line::from(Span::styled(
            app.status.clone().unwrap_or_else(|| "No cards to study".to_string()),
            Style::default().fg(Color::Yellow),
        )));
    } else {
        text.push(Line::from(Span::styled(
            "Session complete",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )));
        text.push(Line::from(""));

        let (studied, known, minutes) = match &study.summary {
            Some(s) => (s.cards_studied, s.cards_known, s.duration_minutes()),
            None => (study.reviewed as i64, study.known as i64, 0),
        };
        text.push(Line::from(format!(
            "{} studied · {} known · {} to review · {} min",
            studied,
            known,
            studied - known,
            minutes
        )));
    }

    text.push(Line::from(""));
    text.push(Line::from(vec![
        Span::raw("Press "),
        Span::styled("s", Style::default().fg(Color::Cyan)),
        Span::raw(" to study again"),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Study · {} ", study.topic))
        .title_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}
