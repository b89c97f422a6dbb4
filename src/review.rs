//! Study-set selection, session lifecycle and review tallying.
//!
//! The engine keeps no state between calls. A study pass hands the caller a
//! [`SessionHandle`]; the caller threads it back into [`ReviewEngine::record_outcome`]
//! and finally [`ReviewEngine::end_session`].

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Flashcard, ReviewOutcome, SessionHandle, StudySession, User, ALL_TOPICS};

/// Cards for one study pass plus the session they are tallied against.
#[derive(Debug, Clone, Serialize)]
pub struct StudyPass {
    pub cards: Vec<Flashcard>,
    pub session: Option<SessionHandle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub card: Flashcard,
    pub session: Option<StudySession>,
}

impl ReviewResult {
    pub fn is_known(&self) -> bool {
        self.card.is_known
    }
}

/// Label recorded on a session; an empty filter means every topic.
pub fn session_label(topic: &str) -> &str {
    if topic.is_empty() {
        ALL_TOPICS
    } else {
        topic
    }
}

pub struct ReviewEngine<'a> {
    db: &'a Database,
}

impl<'a> ReviewEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn select_study_set(
        &self,
        user: &User,
        topic: &str,
        only_unknown: bool,
    ) -> Result<Vec<Flashcard>> {
        self.select_study_set_with(user, topic, only_unknown, &mut rand::thread_rng())
    }

    /// Same as [`select_study_set`](Self::select_study_set) with a caller-supplied RNG.
    pub fn select_study_set_with<R: Rng + ?Sized>(
        &self,
        user: &User,
        topic: &str,
        only_unknown: bool,
        rng: &mut R,
    ) -> Result<Vec<Flashcard>> {
        let mut cards = self.db.study_candidates(user.id, topic, only_unknown)?;
        cards.shuffle(rng);
        debug!(
            user_id = user.id,
            topic,
            only_unknown,
            count = cards.len(),
            "selected study set"
        );
        Ok(cards)
    }

    /// Opens a session for `candidates`, or returns `None` when there is nothing to study.
    pub fn begin_session(
        &self,
        user: &User,
        topic: &str,
        candidates: &[Flashcard],
    ) -> Result<Option<SessionHandle>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let id = self.db.start_session(user.id, session_label(topic))?;
        info!(user_id = user.id, session_id = id, cards = candidates.len(), "began study session");
        Ok(Some(SessionHandle::from_raw(id)))
    }

    pub fn start_study(&self, user: &User, topic: &str, only_unknown: bool) -> Result<StudyPass> {
        let cards = self.select_study_set(user, topic, only_unknown)?;
        let session = self.begin_session(user, topic, &cards)?;
        Ok(StudyPass { cards, session })
    }

    /// Records a Known/Review outcome for one of the user's cards.
    ///
    /// The session is tallied only when the handle resolves to one of the
    /// user's sessions that hasn't ended; otherwise it is silently skipped.
    pub fn record_outcome(
        &self,
        user: &User,
        card_id: i64,
        outcome: ReviewOutcome,
        session: Option<SessionHandle>,
    ) -> Result<ReviewResult> {
        let (card, session) = self
            .db
            .record_review(user.id, card_id, outcome, session.map(|h| h.id()))?
            .ok_or(Error::NotFoundOrForbidden)?;

        debug!(
            user_id = user.id,
            card_id,
            outcome = outcome.as_str(),
            tallied = session.is_some(),
            "recorded review"
        );
        Ok(ReviewResult { card, session })
    }

    /// Ends the session held in `slot` and clears it. A missing or already
    /// ended session is a no-op.
    pub fn end_session(&self, user: &User, slot: &mut Option<SessionHandle>) -> Result<()> {
        let Some(handle) = slot.take() else {
            return Ok(());
        };

        if self.db.end_session(user.id, handle.id())? {
            info!(user_id = user.id, session_id = handle.id(), "ended study session");
        }
        Ok(())
    }

    pub fn session(&self, user: &User, handle: SessionHandle) -> Result<StudySession> {
        self.db
            .get_session(user.id, handle.id())?
            .ok_or(Error::NotFoundOrForbidden)
    }
}
