//! Line-based study loop for the `study` command.

use std::io::{BufRead, Write};

use serde::Serialize;

use crate::error::Result;
use crate::models::{Flashcard, ReviewOutcome, SessionHandle, StudySession, User};
use crate::review::{ReviewEngine, StudyPass};

#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub total: usize,
    pub reviewed: usize,
    pub known: usize,
    pub session: Option<StudySession>,
}

enum Answer {
    Outcome(ReviewOutcome),
    Quit,
}

/// Walks the pass card by card: the front is shown, Enter reveals the back,
/// then `k` or `r` records the outcome. `q` or end of input stops early.
/// The session is ended on every exit path.
pub fn run_study<R: BufRead, W: Write>(
    engine: &ReviewEngine,
    user: &User,
    pass: StudyPass,
    mut input: R,
    mut output: W,
) -> Result<StudySummary> {
    let StudyPass { cards, session } = pass;
    let handle = session;
    let mut slot = session;

    let walked = walk(engine, user, &cards, handle, &mut input, &mut output);
    engine.end_session(user, &mut slot)?;
    let (reviewed, known) = walked?;

    let session = match handle {
        Some(h) => Some(engine.session(user, h)?),
        None => None,
    };

    writeln!(output)?;
    writeln!(output, "Reviewed {} of {} cards, {} known.", reviewed, cards.len(), known)?;
    if let Some(s) = &session {
        writeln!(output, "Session {} lasted {} min.", s.id, s.duration_minutes())?;
    }

    Ok(StudySummary {
        total: cards.len(),
        reviewed,
        known,
        session,
    })
}

fn walk<R: BufRead, W: Write>(
    engine: &ReviewEngine,
    user: &User,
    cards: &[Flashcard],
    handle: Option<SessionHandle>,
    input: &mut R,
    output: &mut W,
) -> Result<(usize, usize)> {
    let mut reviewed = 0;
    let mut known = 0;

    for (i, card) in cards.iter().enumerate() {
        writeln!(output)?;
        writeln!(output, "[{}/{}] {}", i + 1, cards.len(), card.topic)?;
        writeln!(output, "Q: {}", card.front)?;
        write!(output, "Press Enter to reveal (q to quit) ")?;
        output.flush()?;

        match read_line(input)? {
            Some(line) if line.eq_ignore_ascii_case("q") => break,
            Some(_) => {}
            None => break,
        }

        writeln!(output, "A: {}", card.back)?;

        let outcome = match prompt_outcome(input, output)? {
            Answer::Outcome(o) => o,
            Answer::Quit => break,
        };

        let result = engine.record_outcome(user, card.id, outcome, handle)?;
        reviewed += 1;
        if result.is_known() {
            known += 1;
        }
    }

    Ok((reviewed, known))
}

fn prompt_outcome<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Answer> {
    loop {
        write!(output, "Known or review? [k/r/q] ")?;
        output.flush()?;

        let Some(line) = read_line(input)? else {
            return Ok(Answer::Quit);
        };
        if line.eq_ignore_ascii_case("q") {
            return Ok(Answer::Quit);
        }
        match ReviewOutcome::from_str(&line) {
            Some(outcome) => return Ok(Answer::Outcome(outcome)),
            None => writeln!(output, "Please answer k (known) or r (review).")?,
        }
    }
}

// None on end of input
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::cards;
    use crate::db::Database;
    use crate::models::{CardDraft, CardQuery};
    use std::io::Cursor;

    fn setup(n: usize) -> (Database, User) {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        let user = accounts::register(&db, "testuser").unwrap();
        for i in 0..n {
            cards::create(&db, &user, &CardDraft::new(&format!("Q{}", i), "A", "Math")).unwrap();
        }
        (db, user)
    }

    fn study(db: &Database, user: &User, script: &str) -> (StudySummary, String) {
        let engine = ReviewEngine::new(db);
        let pass = engine.start_study(user, "", false).unwrap();
        let mut out = Vec::new();
        let summary = run_study(&engine, user, pass, Cursor::new(script), &mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn full_pass_records_every_card() {
        let (db, user) = setup(3);
        let (summary, out) = study(&db, &user, "\nk\n\nr\n\nyes\n");

        assert_eq!(summary.total, 3);
        assert_eq!(summary.reviewed, 3);
        assert_eq!(summary.known, 2);

        let session = summary.session.unwrap();
        assert_eq!(session.cards_studied, 3);
        assert_eq!(session.cards_known, 2);
        assert!(!session.is_active());
        assert!(out.contains("Reviewed 3 of 3 cards, 2 known."));

        let reviewed: i64 = db
            .list_cards(user.id, &CardQuery::default())
            .unwrap()
            .iter()
            .map(|c| c.times_reviewed)
            .sum();
        assert_eq!(reviewed, 3);
    }

    #[test]
    fn quit_ends_session_early() {
        let (db, user) = setup(3);
        let (summary, _) = study(&db, &user, "\nk\nq\n");

        assert_eq!(summary.reviewed, 1);
        let session = summary.session.unwrap();
        assert_eq!(session.cards_studied, 1);
        assert!(session.ended_at.is_some());
    }

    #[test]
    fn end_of_input_ends_session() {
        let (db, user) = setup(2);
        let (summary, _) = study(&db, &user, "\n");

        assert_eq!(summary.reviewed, 0);
        assert!(!summary.session.unwrap().is_active());
    }

    #[test]
    fn unrecognised_answer_reprompts() {
        let (db, user) = setup(1);
        let (summary, out) = study(&db, &user, "\nmaybe\nr\n");

        assert!(out.contains("Please answer k (known) or r (review)."));
        assert_eq!(summary.reviewed, 1);
        assert_eq!(summary.known, 0);
    }

    #[test]
    fn empty_pass_has_no_session() {
        let (db, user) = setup(0);
        let (summary, out) = study(&db, &user, "");

        assert_eq!(summary.total, 0);
        assert!(summary.session.is_none());
        assert!(out.contains("Reviewed 0 of 0 cards"));
    }
}
