use rusqlite::ErrorCode;
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::User;

pub fn register(db: &Database, username: &str) -> Result<User> {
    let username = username.trim();
    User::validate_username(username)?;

    match db.add_user(username) {
        Ok(id) => info!(user_id = id, username, "registered user"),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(Error::DuplicateUser(username.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    resolve(db, username)
}

/// Looks up the acting user by name.
pub fn resolve(db: &Database, username: &str) -> Result<User> {
    db.find_user(username.trim())?
        .ok_or_else(|| Error::UnknownUser(username.to_string()))
}

pub fn list(db: &Database) -> Result<Vec<User>> {
    Ok(db.list_users()?)
}

/// Deletes the user along with every card and session they own.
pub fn remove(db: &Database, username: &str) -> Result<()> {
    let user = resolve(db, username)?;
    db.delete_user(user.id)?;
    info!(user_id = user.id, username = %user.username, "deleted user");
    Ok(())
}
