//! CSV import and export of a user's cards.
//!
//! Export writes one row per card with review figures; import reads only the
//! content columns and always creates fresh cards. Column names are matched
//! through ordered alias lists so files from older exports still load.

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, Writer};
use serde::Serialize;
use tracing::info;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CardDraft, CardQuery, User};

pub const EXPORT_HEADER: [&str; 6] = [
    "Topic",
    "Question (Front)",
    "Answer (Back)",
    "Created Date",
    "Times Reviewed",
    "Success Rate",
];

pub const TOPIC_ALIASES: &[&str] = &["Topic"];
pub const FRONT_ALIASES: &[&str] = &["Question (Front)", "Front"];
pub const BACK_ALIASES: &[&str] = &["Answer (Back)", "Back"];

pub const DEFAULT_IMPORT_TOPIC: &str = "Imported";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportReport {
    pub created: usize,
}

/// Writes every card the user owns, newest first. Returns the number of rows.
pub fn export_cards<W: Write>(db: &Database, user: &User, writer: W) -> Result<usize> {
    let cards = db.list_cards(user.id, &CardQuery::default())?;
    let mut out = Writer::from_writer(writer);

    out.write_record(EXPORT_HEADER)?;
    for card in &cards {
        out.write_record([
            card.topic.as_str(),
            card.front.as_str(),
            card.back.as_str(),
            card.created_date().as_str(),
            card.times_reviewed.to_string().as_str(),
            format!("{}%", card.success_rate()).as_str(),
        ])?;
    }
    out.flush()?;

    info!(user_id = user.id, rows = cards.len(), "exported cards");
    Ok(cards.len())
}

/// Creates one fresh card per row. The whole input is parsed before anything
/// is written, and the inserts share one transaction.
pub fn import_cards<R: Read>(db: &Database, user: &User, reader: R) -> Result<ImportReport> {
    let drafts = parse_rows(reader)?;
    let created = db.import_cards(user.id, &drafts)?;
    info!(user_id = user.id, created, "imported cards");
    Ok(ImportReport { created })
}

pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<CardDraft>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(source) => {
            return Err(Error::MalformedImportRow {
                line: error_line(&source).unwrap_or(1),
                processed: 0,
                source,
            })
        }
    };

    let topic_col = column(&headers, TOPIC_ALIASES);
    let front_col = column(&headers, FRONT_ALIASES);
    let back_col = column(&headers, BACK_ALIASES);

    let mut drafts = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(source) => {
                return Err(Error::MalformedImportRow {
                    line: error_line(&source).unwrap_or(drafts.len() as u64 + 2),
                    processed: drafts.len(),
                    source,
                })
            }
        };

        let topic = match cell(&record, topic_col) {
            t if t.trim().is_empty() => DEFAULT_IMPORT_TOPIC.to_string(),
            t => t.to_string(),
        };

        drafts.push(CardDraft {
            front: cell(&record, front_col).to_string(),
            back: cell(&record, back_col).to_string(),
            topic,
        });
    }

    Ok(drafts)
}

// First alias present in the header row wins
fn column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').trim() == *alias)
    })
}

fn cell(record: &StringRecord, col: Option<usize>) -> &str {
    col.and_then(|i| record.get(i)).unwrap_or("")
}

fn error_line(err: &csv::Error) -> Option<u64> {
    err.position().map(|p| p.line())
}
