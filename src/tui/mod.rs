mod ui;
pub(crate) mod widgets;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::cards;
use crate::db::Database;
use crate::error::Result;
use crate::models::{
    CardQuery, Dashboard, Flashcard, ReviewOutcome, SessionHandle, Statistics, StudySession, User,
};
use crate::review::{session_label, ReviewEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Dashboard,
    Cards,
    CardDetail,
    Study,
    Stats,
}

impl View {
    fn next(&self) -> Self {
        match self {
            View::Dashboard => View::Cards,
            View::Cards => View::Study,
            View::CardDetail => View::Cards,
            View::Study => View::Stats,
            View::Stats => View::Dashboard,
        }
    }

    fn prev(&self) -> Self {
        match self {
            View::Dashboard => View::Stats,
            View::Cards => View::Dashboard,
            View::CardDetail => View::Cards,
            View::Study => View::Cards,
            View::Stats => View::Study,
        }
    }
}

pub struct StatefulList<T> {
    pub items: Vec<T>,
    pub selected: Option<usize>,
}

impl<T> StatefulList<T> {
    fn with_items(items: Vec<T>) -> Self {
        let selected = if items.is_empty() { None } else { Some(0) };
        Self { items, selected }
    }

    fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(i) if i + 1 < self.items.len() => i + 1,
            _ => 0,
        };
        self.selected = Some(i);
    }

    fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.selected {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        };
        self.selected = Some(i);
    }

    fn first(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(0);
        }
    }

    fn last(&mut self) {
        if !self.items.is_empty() {
            self.selected = Some(self.items.len() - 1);
        }
    }

    fn selected_item(&self) -> Option<&T> {
        self.selected.and_then(|i| self.items.get(i))
    }
}

/// One pass through a shuffled study set. The session handle lives here for
/// as long as the pass is open.
pub struct StudyState {
    pub cards: Vec<Flashcard>,
    pub index: usize,
    pub revealed: bool,
    pub session: Option<SessionHandle>,
    pub topic: String,
    pub reviewed: usize,
    pub known: usize,
    pub summary: Option<StudySession>,
}

impl StudyState {
    pub fn current(&self) -> Option<&Flashcard> {
        if self.summary.is_some() {
            return None;
        }
        self.cards.get(self.index)
    }

    pub fn is_finished(&self) -> bool {
        self.summary.is_some() || self.index >= self.cards.len()
    }
}

pub struct App {
    db: Database,
    pub user: User,
    pub view: View,
    pub dashboard: Dashboard,
    pub stats: Statistics,
    pub cards: StatefulList<Flashcard>,
    pub topics: Vec<String>,
    pub query: CardQuery,
    pub only_unknown: bool,
    pub selected_card: Option<Flashcard>,
    pub study: Option<StudyState>,
    pub search_input: String,
    pub search_mode: bool,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(db: Database, user: User) -> Result<Self> {
        let dashboard = cards::dashboard(&db, &user)?;
        let stats = cards::statistics(&db, &user)?;
        let query = CardQuery::default();
        let list = cards::list(&db, &user, &query)?;
        let topics = cards::topics(&db, &user)?;

        Ok(Self {
            db,
            user,
            view: View::Dashboard,
            dashboard,
            stats,
            cards: StatefulList::with_items(list),
            topics,
            query,
            only_unknown: false,
            selected_card: None,
            study: None,
            search_input: String::new(),
            search_mode: false,
            status: None,
            should_quit: false,
        })
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        self.dashboard = cards::dashboard(&self.db, &self.user)?;
        self.stats = cards::statistics(&self.db, &self.user)?;
        self.topics = cards::topics(&self.db, &self.user)?;
        if let Some(topic) = &self.query.topic {
            if !self.topics.contains(topic) {
                self.query.topic = None;
            }
        }
        self.reload_cards()
    }

    // Keeps the cursor on the same card when it is still listed
    fn reload_cards(&mut self) -> Result<()> {
        let keep = self.cards.selected_item().map(|c| c.id);
        self.cards = StatefulList::with_items(cards::list(&self.db, &self.user, &self.query)?);
        if let Some(id) = keep {
            if let Some(pos) = self.cards.items.iter().position(|c| c.id == id) {
                self.cards.selected = Some(pos);
            }
        }
        Ok(())
    }

    fn apply_search(&mut self) -> Result<()> {
        let term = self.search_input.trim();
        self.query.search = if term.is_empty() {
            None
        } else {
            Some(term.to_string())
        };
        self.reload_cards()
    }

    fn clear_filters(&mut self) -> Result<()> {
        self.query.search = None;
        self.query.topic = None;
        self.search_input.clear();
        self.reload_cards()
    }

    // None → first topic → ... → last topic → None
    fn cycle_topic(&mut self) -> Result<()> {
        self.query.topic = match &self.query.topic {
            None => self.topics.first().cloned(),
            Some(current) => self
                .topics
                .iter()
                .position(|t| t == current)
                .and_then(|i| self.topics.get(i + 1))
                .cloned(),
        };
        self.reload_cards()
    }

    fn cycle_sort(&mut self) -> Result<()> {
        self.query.sort = self.query.sort.next();
        self.reload_cards()
    }

    fn select_card(&mut self) {
        if let Some(card) = self.cards.selected_item() {
            self.selected_card = Some(card.clone());
            self.view = View::CardDetail;
        }
    }

    fn start_study(&mut self) -> Result<()> {
        self.end_study()?;

        let topic = self.query.topic.clone().unwrap_or_default();
        let pass = ReviewEngine::new(&self.db).start_study(&self.user, &topic, self.only_unknown)?;

        self.status = if pass.cards.is_empty() {
            Some("No cards to study".to_string())
        } else {
            None
        };
        self.study = Some(StudyState {
            cards: pass.cards,
            index: 0,
            revealed: false,
            session: pass.session,
            topic: session_label(&topic).to_string(),
            reviewed: 0,
            known: 0,
            summary: None,
        });
        self.view = View::Study;
        Ok(())
    }

    fn record(&mut self, outcome: ReviewOutcome) -> Result<()> {
        let Some(study) = self.study.as_mut() else {
            return Ok(());
        };
        if !study.revealed {
            return Ok(());
        }
        let Some(card_id) = study.current().map(|c| c.id) else {
            return Ok(());
        };

        let result =
            ReviewEngine::new(&self.db).record_outcome(&self.user, card_id, outcome, study.session)?;
        study.reviewed += 1;
        if result.is_known() {
            study.known += 1;
        }
        study.cards[study.index] = result.card;
        study.index += 1;
        study.revealed = false;

        if study.index >= study.cards.len() {
            self.end_study()?;
        }
        Ok(())
    }

    /// Ends the open session, if any, and keeps its final tally for display.
    fn end_study(&mut self) -> Result<()> {
        let Some(study) = self.study.as_mut() else {
            return Ok(());
        };
        let Some(handle) = study.session else {
            return Ok(());
        };

        let engine = ReviewEngine::new(&self.db);
        engine.end_session(&self.user, &mut study.session)?;
        study.summary = Some(engine.session(&self.user, handle)?);
        self.refresh_data()
    }

    /// Event loop entry point. Errors the user can act on, like a card
    /// deleted from another terminal mid-pass, are shown in `status` and
    /// the app keeps running; internal errors still end it.
    pub fn on_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        self.status = None;
        match self.handle_key(key, modifiers) {
            Err(err) if !err.is_internal() => {
                self.status = Some(err.to_string());
                Ok(())
            }
            other => other,
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        if self.search_mode {
            match key {
                KeyCode::Esc => {
                    self.search_mode = false;
                    self.search_input.clear();
                }
                KeyCode::Enter => {
                    self.search_mode = false;
                    self.apply_search()?;
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                }
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                }
                _ => {}
            }
            return Ok(());
        }

        if self.view == View::Study
            && !modifiers.contains(KeyModifiers::CONTROL)
            && self.handle_study_key(key)?
        {
            return Ok(());
        }

        match key {
            KeyCode::Char('q') => {
                self.end_study()?;
                self.should_quit = true;
            }

            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.refresh_data()?;
            }

            KeyCode::Char('/') if self.view == View::Cards => {
                self.search_mode = true;
                self.search_input.clear();
            }
            KeyCode::Char('t') if self.view == View::Cards => self.cycle_topic()?,
            KeyCode::Char('o') if self.view == View::Cards => self.cycle_sort()?,
            KeyCode::Char('u') if self.view == View::Cards => {
                self.only_unknown = !self.only_unknown;
            }
            KeyCode::Char('s') if matches!(self.view, View::Cards | View::Dashboard) => {
                self.start_study()?;
            }

            KeyCode::Esc => match self.view {
                View::CardDetail => {
                    self.view = View::Cards;
                    self.selected_card = None;
                }
                View::Cards if self.query.search.is_some() || self.query.topic.is_some() => {
                    self.clear_filters()?;
                }
                _ => {}
            },

            KeyCode::Char('h') | KeyCode::Left => match self.view {
                View::CardDetail => {
                    self.view = View::Cards;
                    self.selected_card = None;
                }
                _ => self.view = self.view.prev(),
            },
            KeyCode::Char('l') | KeyCode::Right => match self.view {
                View::Cards => self.select_card(),
                _ => self.view = self.view.next(),
            },

            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),

            KeyCode::Char('j') | KeyCode::Down if self.view == View::Cards => self.cards.next(),
            KeyCode::Char('k') | KeyCode::Up if self.view == View::Cards => self.cards.previous(),
            KeyCode::Char('g') if self.view == View::Cards => self.cards.first(),
            KeyCode::Char('G') if self.view == View::Cards => self.cards.last(),

            KeyCode::Enter if self.view == View::Cards => self.select_card(),

            _ => {}
        }
        Ok(())
    }

    // Returns true when the key was consumed by study mode
    fn handle_study_key(&mut self, key: KeyCode) -> Result<bool> {
        let active = self.study.as_ref().is_some_and(|s| !s.is_finished());

        match key {
            KeyCode::Char('s') => self.start_study()?,
            KeyCode::Char(' ') | KeyCode::Enter if active => {
                if let Some(study) = self.study.as_mut() {
                    study.revealed = true;
                }
            }
            KeyCode::Char('k') | KeyCode::Char('y') if active => {
                self.record(ReviewOutcome::Known)?
            }
            KeyCode::Char('r') | KeyCode::Char('n') if active => {
                self.record(ReviewOutcome::Review)?
            }
            KeyCode::Esc if active => self.end_study()?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

pub fn run(db: Database, user: User) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Build state before touching the terminal so errors print normally
    let mut app = App::new(db, user)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // An error mid-loop can leave a session open
    app.end_study()?;
    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                app.on_key(key.code, key.modifiers)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
