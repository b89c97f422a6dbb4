//! Owner-scoped card operations.
//!
//! Every lookup is keyed by the acting user as well as the card id, so a card
//! that belongs to somebody else is indistinguishable from one that doesn't
//! exist: both come back as [`Error::NotFoundOrForbidden`].

use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CardDraft, CardQuery, Dashboard, Flashcard, Statistics, User};

pub fn create(db: &Database, user: &User, draft: &CardDraft) -> Result<Flashcard> {
    draft.validate()?;
    let id = db.add_card(user.id, draft)?;
    info!(user_id = user.id, card_id = id, topic = %draft.topic, "created card");
    get(db, user, id)
}

pub fn get(db: &Database, user: &User, card_id: i64) -> Result<Flashcard> {
    db.get_card(user.id, card_id)?
        .ok_or(Error::NotFoundOrForbidden)
}

pub fn update(db: &Database, user: &User, card_id: i64, draft: &CardDraft) -> Result<Flashcard> {
    draft.validate()?;
    if !db.update_card(user.id, card_id, draft)? {
        return Err(Error::NotFoundOrForbidden);
    }
    info!(user_id = user.id, card_id, "updated card");
    get(db, user, card_id)
}

pub fn delete(db: &Database, user: &User, card_id: i64) -> Result<()> {
    if !db.delete_card(user.id, card_id)? {
        return Err(Error::NotFoundOrForbidden);
    }
    info!(user_id = user.id, card_id, "deleted card");
    Ok(())
}

pub fn list(db: &Database, user: &User, query: &CardQuery) -> Result<Vec<Flashcard>> {
    Ok(db.list_cards(user.id, query)?)
}

pub fn topics(db: &Database, user: &User) -> Result<Vec<String>> {
    Ok(db.list_topics(user.id)?)
}

pub fn dashboard(db: &Database, user: &User) -> Result<Dashboard> {
    Ok(db.dashboard(user.id)?)
}

pub fn statistics(db: &Database, user: &User) -> Result<Statistics> {
    Ok(db.statistics(user.id)?)
}
