use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;
use std::time::Duration;

use crate::models::{
    now_timestamp, CardDraft, CardQuery, Dashboard, Flashcard, ReviewOutcome, Statistics,
    StudySession, TopicBreakdown, TopicCount, User,
};

const CARD_COLUMNS: &str = "id, user_id, front, back, topic, created_at, updated_at, \
     times_reviewed, times_correct, last_reviewed, is_known";

const SESSION_COLUMNS: &str =
    "id, user_id, started_at, ended_at, cards_studied, cards_known, topic";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        register_fold_case(&conn)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                front TEXT NOT NULL,
                back TEXT NOT NULL,
                topic TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                times_reviewed INTEGER NOT NULL DEFAULT 0 CHECK(times_reviewed >= 0),
                times_correct INTEGER NOT NULL DEFAULT 0
                    CHECK(times_correct >= 0 AND times_correct <= times_reviewed),
                last_reviewed TEXT,
                is_known INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS study_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT,
                cards_studied INTEGER NOT NULL DEFAULT 0 CHECK(cards_studied >= 0),
                cards_known INTEGER NOT NULL DEFAULT 0
                    CHECK(cards_known >= 0 AND cards_known <= cards_studied),
                topic TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_flashcards_user_topic ON flashcards(user_id, topic);
            CREATE INDEX IF NOT EXISTS idx_flashcards_user_created ON flashcards(user_id, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_sessions_user_started ON study_sessions(user_id, started_at DESC);
            "#,
        )?;

        Ok(())
    }

    // User operations
    pub fn add_user(&self, username: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, now_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, created_at FROM users ORDER BY username")?;

        let rows = stmt.query_map([], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user_id])?;
        Ok(rows > 0)
    }

    // Card operations
    pub fn add_card(&self, user_id: i64, draft: &CardDraft) -> Result<i64> {
        insert_card(&self.conn, user_id, draft)
    }

    pub fn get_card(&self, user_id: i64, card_id: i64) -> Result<Option<Flashcard>> {
        fetch_card(&self.conn, user_id, card_id)
    }

    pub fn update_card(&self, user_id: i64, card_id: i64, draft: &CardDraft) -> Result<bool> {
        let rows = self.conn.execute(
            r#"
            UPDATE flashcards
            SET front = ?1, back = ?2, topic = ?3, updated_at = ?4
            WHERE id = ?5 AND user_id = ?6
            "#,
            params![
                draft.front,
                draft.back,
                draft.topic,
                now_timestamp(),
                card_id,
                user_id
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn delete_card(&self, user_id: i64, card_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM flashcards WHERE id = ?1 AND user_id = ?2",
            params![card_id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_cards(&self, user_id: i64, query: &CardQuery) -> Result<Vec<Flashcard>> {
        let mut sql = format!("SELECT {} FROM flashcards WHERE user_id = ?1", CARD_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            params_vec.push(Box::new(search.to_string()));
            let n = params_vec.len();
            sql.push_str(&format!(
                " AND (instr(fold_case(front), fold_case(?{n})) > 0 \
                 OR instr(fold_case(back), fold_case(?{n})) > 0 \
                 OR instr(fold_case(topic), fold_case(?{n})) > 0)"
            ));
        }

        if let Some(topic) = query.topic.as_deref().filter(|t| !t.is_empty()) {
            params_vec.push(Box::new(topic.to_string()));
            sql.push_str(&format!(" AND topic = ?{}", params_vec.len()));
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(query.sort.order_clause());

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), card_from_row)?;
        rows.collect()
    }

    pub fn list_topics(&self, user_id: i64) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT topic FROM flashcards WHERE user_id = ?1 ORDER BY topic",
        )?;

        let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
        rows.collect()
    }

    // Cards eligible for a study pass, in storage order; shuffling is the caller's job
    pub fn study_candidates(
        &self,
        user_id: i64,
        topic: &str,
        only_unknown: bool,
    ) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM flashcards
            WHERE user_id = ?1
              AND (?2 = '' OR topic = ?2)
              AND (?3 = 0 OR is_known = 0)
            ORDER BY created_at DESC, id DESC
            "#,
            CARD_COLUMNS
        ))?;

        let rows = stmt.query_map(params![user_id, topic, only_unknown], card_from_row)?;
        rows.collect()
    }

    /// Inserts every draft inside one transaction; nothing is kept if any insert fails.
    pub fn import_cards(&self, user_id: i64, drafts: &[CardDraft]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for draft in drafts {
            insert_card(&tx, user_id, draft)?;
        }
        tx.commit()?;
        Ok(drafts.len())
    }

    /// Applies one review outcome to a card and, when given, an active session.
    ///
    /// Counters are bumped in place and both rows are written in the same
    /// transaction. Returns `None` when the card isn't owned by `user_id`.
    /// The session half is `None` when the session is missing, foreign or ended.
    pub fn record_review(
        &self,
        user_id: i64,
        card_id: i64,
        outcome: ReviewOutcome,
        session_id: Option<i64>,
    ) -> Result<Option<(Flashcard, Option<StudySession>)>> {
        let now = now_timestamp();
        let (correct_inc, known) = match outcome {
            ReviewOutcome::Known => (1, true),
            ReviewOutcome::Review => (0, false),
        };

        let tx = self.conn.unchecked_transaction()?;

        let updated = tx.execute(
            r#"
            UPDATE flashcards
            SET times_reviewed = times_reviewed + 1,
                times_correct = times_correct + ?1,
                is_known = ?2,
                last_reviewed = ?3,
                updated_at = ?3
            WHERE id = ?4 AND user_id = ?5
            "#,
            params![correct_inc, known, now, card_id, user_id],
        )?;

        if updated == 0 {
            return Ok(None);
        }

        let session = match session_id {
            Some(sid) => {
                let tallied = tx.execute(
                    r#"
                    UPDATE study_sessions
                    SET cards_studied = cards_studied + 1,
                        cards_known = cards_known + ?1
                    WHERE id = ?2 AND user_id = ?3 AND ended_at IS NULL
                    "#,
                    params![correct_inc, sid, user_id],
                )?;
                if tallied > 0 {
                    fetch_session(&tx, user_id, sid)?
                } else {
                    None
                }
            }
            None => None,
        };

        let card = fetch_card(&tx, user_id, card_id)?;
        tx.commit()?;

        Ok(card.map(|c| (c, session)))
    }

    // Study session operations
    pub fn start_session(&self, user_id: i64, topic: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO study_sessions (user_id, started_at, topic) VALUES (?1, ?2, ?3)",
            params![user_id, now_timestamp(), topic],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_session(&self, user_id: i64, session_id: i64) -> Result<Option<StudySession>> {
        fetch_session(&self.conn, user_id, session_id)
    }

    // Stamps the end time once; ending an ended session leaves the first stamp alone
    pub fn end_session(&self, user_id: i64, session_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            r#"
            UPDATE study_sessions
            SET ended_at = ?1
            WHERE id = ?2 AND user_id = ?3 AND ended_at IS NULL
            "#,
            params![now_timestamp(), session_id, user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn recent_sessions(&self, user_id: i64, limit: usize) -> Result<Vec<StudySession>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM study_sessions
            WHERE user_id = ?1
            ORDER BY started_at DESC, id DESC
            LIMIT ?2
            "#,
            SESSION_COLUMNS
        ))?;

        let rows = stmt.query_map(params![user_id, limit as i64], session_from_row)?;
        rows.collect()
    }

    // Aggregates
    fn card_counts(&self, user_id: i64) -> Result<(i64, i64, i64)> {
        self.conn.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN is_known THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(times_reviewed), 0)
            FROM flashcards
            WHERE user_id = ?1
            "#,
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
    }

    pub fn top_topics(&self, user_id: i64, limit: usize) -> Result<Vec<TopicCount>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT topic, COUNT(*) AS card_count
            FROM flashcards
            WHERE user_id = ?1
            GROUP BY topic
            ORDER BY card_count DESC, topic ASC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(TopicCount {
                topic: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect()
    }

    pub fn topic_breakdown(&self, user_id: i64) -> Result<Vec<TopicBreakdown>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT topic,
                   COUNT(*) AS total,
                   SUM(CASE WHEN is_known THEN 1 ELSE 0 END) AS known
            FROM flashcards
            WHERE user_id = ?1
            GROUP BY topic
            ORDER BY total DESC, topic ASC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(TopicBreakdown {
                topic: row.get(0)?,
                total: row.get(1)?,
                known: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    pub fn dashboard(&self, user_id: i64) -> Result<Dashboard> {
        let (total_cards, known_cards, _) = self.card_counts(user_id)?;

        Ok(Dashboard {
            total_cards,
            known_cards,
            review_cards: total_cards - known_cards,
            top_topics: self.top_topics(user_id, 5)?,
            recent_sessions: self.recent_sessions(user_id, 5)?,
        })
    }

    pub fn statistics(&self, user_id: i64) -> Result<Statistics> {
        let (total_cards, known_cards, total_reviews) = self.card_counts(user_id)?;

        Ok(Statistics {
            total_cards,
            known_cards,
            review_cards: total_cards - known_cards,
            total_reviews,
            topics: self.topic_breakdown(user_id)?,
            recent_sessions: self.recent_sessions(user_id, 10)?,
        })
    }
}

// SQLite's lower() only folds ASCII
fn register_fold_case(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn insert_card(conn: &Connection, user_id: i64, draft: &CardDraft) -> Result<i64> {
    let now = now_timestamp();
    conn.execute(
        r#"
        INSERT INTO flashcards (user_id, front, back, topic, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        "#,
        params![user_id, draft.front, draft.back, draft.topic, now],
    )?;
    Ok(conn.last_insert_rowid())
}

fn fetch_card(conn: &Connection, user_id: i64, card_id: i64) -> Result<Option<Flashcard>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM flashcards WHERE id = ?1 AND user_id = ?2",
            CARD_COLUMNS
        ),
        params![card_id, user_id],
        card_from_row,
    )
    .optional()
}

fn fetch_session(
    conn: &Connection,
    user_id: i64,
    session_id: i64,
) -> Result<Option<StudySession>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM study_sessions WHERE id = ?1 AND user_id = ?2",
            SESSION_COLUMNS
        ),
        params![session_id, user_id],
        session_from_row,
    )
    .optional()
}

fn card_from_row(row: &Row<'_>) -> Result<Flashcard> {
    Ok(Flashcard {
        id: row.get(0)?,
        user_id: row.get(1)?,
        front: row.get(2)?,
        back: row.get(3)?,
        topic: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        times_reviewed: row.get(7)?,
        times_correct: row.get(8)?,
        last_reviewed: row.get(9)?,
        is_known: row.get(10)?,
    })
}

fn session_from_row(row: &Row<'_>) -> Result<StudySession> {
    Ok(StudySession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        started_at: row.get(2)?,
        ended_at: row.get(3)?,
        cards_studied: row.get(4)?,
        cards_known: row.get(5)?,
        topic: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardSort;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn add_user(db: &Database, name: &str) -> i64 {
        db.add_user(name).expect("Failed to add user")
    }

    fn add_card(db: &Database, user_id: i64, front: &str, topic: &str) -> i64 {
        db.add_card(user_id, &CardDraft::new(front, &format!("{} answer", front), topic))
            .expect("Failed to add card")
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in ["users", "flashcards", "study_sessions"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            add_card(&db, user, "Q", "T");

            db.init().expect("Re-init should succeed");

            let cards = db.list_cards(user, &CardQuery::default()).unwrap();
            assert_eq!(cards.len(), 1);
        }
    }

    mod user_tests {
        use super::*;

        #[test]
        fn add_and_find_user() {
            let db = setup_db();
            let id = add_user(&db, "alice");
            let user = db.find_user("alice").unwrap().unwrap();
            assert_eq!(user.id, id);
            assert_eq!(user.username, "alice");
        }

        #[test]
        fn find_missing_user() {
            let db = setup_db();
            assert!(db.find_user("nobody").unwrap().is_none());
        }

        #[test]
        fn duplicate_username_fails() {
            let db = setup_db();
            add_user(&db, "alice");
            assert!(db.add_user("alice").is_err());
        }

        #[test]
        fn list_users_sorted() {
            let db = setup_db();
            add_user(&db, "zed");
            add_user(&db, "amy");
            let names: Vec<String> = db
                .list_users()
                .unwrap()
                .into_iter()
                .map(|u| u.username)
                .collect();
            assert_eq!(names, vec!["amy", "zed"]);
        }

        #[test]
        fn delete_user_cascades_to_cards_and_sessions() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let card = add_card(&db, user, "Q", "T");
            let session = db.start_session(user, "T").unwrap();

            assert!(db.delete_user(user).unwrap());

            assert!(db.get_card(user, card).unwrap().is_none());
            assert!(db.get_session(user, session).unwrap().is_none());
        }
    }

    mod card_tests {
        use super::*;

        #[test]
        fn add_card_has_fresh_counters() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "What is Django?", "Programming");

            let card = db.get_card(user, id).unwrap().unwrap();
            assert_eq!(card.front, "What is Django?");
            assert_eq!(card.topic, "Programming");
            assert_eq!(card.times_reviewed, 0);
            assert_eq!(card.times_correct, 0);
            assert!(card.last_reviewed.is_none());
            assert!(!card.is_known);
            assert_eq!(card.created_at, card.updated_at);
        }

        #[test]
        fn get_card_scoped_to_owner() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            let id = add_card(&db, alice, "Q", "T");

            assert!(db.get_card(alice, id).unwrap().is_some());
            assert!(db.get_card(bob, id).unwrap().is_none());
            assert!(db.get_card(alice, 999).unwrap().is_none());
        }

        #[test]
        fn update_card_changes_content_only() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            db.record_review(user, id, ReviewOutcome::Known, None).unwrap();

            let updated = db
                .update_card(user, id, &CardDraft::new("Q2", "A2", "T2"))
                .unwrap();
            assert!(updated);

            let card = db.get_card(user, id).unwrap().unwrap();
            assert_eq!(card.front, "Q2");
            assert_eq!(card.back, "A2");
            assert_eq!(card.topic, "T2");
            assert_eq!(card.times_reviewed, 1);
            assert!(card.is_known);
        }

        #[test]
        fn update_card_of_other_user_is_noop() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            let id = add_card(&db, alice, "Q", "T");

            let updated = db
                .update_card(bob, id, &CardDraft::new("hijack", "x", "y"))
                .unwrap();
            assert!(!updated);
            assert_eq!(db.get_card(alice, id).unwrap().unwrap().front, "Q");
        }

        #[test]
        fn delete_card_scoped_to_owner() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            let id = add_card(&db, alice, "Q", "T");

            assert!(!db.delete_card(bob, id).unwrap());
            assert!(db.delete_card(alice, id).unwrap());
            assert!(db.get_card(alice, id).unwrap().is_none());
            assert!(!db.delete_card(alice, id).unwrap());
        }

        #[test]
        fn list_cards_only_returns_own() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            add_card(&db, alice, "Test Question", "Test Topic");
            add_card(&db, bob, "Other Question", "Other Topic");

            let cards = db.list_cards(alice, &CardQuery::default()).unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].front, "Test Question");
        }

        #[test]
        fn list_cards_default_newest_first() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let first = add_card(&db, user, "first", "T");
            let second = add_card(&db, user, "second", "T");

            let cards = db.list_cards(user, &CardQuery::default()).unwrap();
            assert_eq!(cards[0].id, second);
            assert_eq!(cards[1].id, first);
        }

        #[test]
        fn list_cards_sorted_by_topic() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            add_card(&db, user, "q1", "Biology");
            add_card(&db, user, "q2", "Zoology");
            add_card(&db, user, "q3", "Algebra");

            let query = CardQuery {
                sort: CardSort::TopicAsc,
                ..Default::default()
            };
            let topics: Vec<String> = db
                .list_cards(user, &query)
                .unwrap()
                .into_iter()
                .map(|c| c.topic)
                .collect();
            assert_eq!(topics, vec!["Algebra", "Biology", "Zoology"]);

            let query = CardQuery {
                sort: CardSort::TopicDesc,
                ..Default::default()
            };
            let topics: Vec<String> = db
                .list_cards(user, &query)
                .unwrap()
                .into_iter()
                .map(|c| c.topic)
                .collect();
            assert_eq!(topics, vec!["Zoology", "Biology", "Algebra"]);
        }

        #[test]
        fn list_cards_oldest_first() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let first = add_card(&db, user, "first", "T");
            add_card(&db, user, "second", "T");

            let query = CardQuery {
                sort: CardSort::Oldest,
                ..Default::default()
            };
            let cards = db.list_cards(user, &query).unwrap();
            assert_eq!(cards[0].id, first);
        }

        #[test]
        fn search_matches_front_back_and_topic_case_insensitively() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            db.add_card(user, &CardDraft::new("What is Rust?", "A language", "Programming"))
                .unwrap();
            db.add_card(user, &CardDraft::new("Capital of France", "Paris", "Geography"))
                .unwrap();
            db.add_card(user, &CardDraft::new("Mitochondria", "Powerhouse", "BIOLOGY"))
                .unwrap();

            let search = |s: &str| {
                db.list_cards(
                    user,
                    &CardQuery {
                        search: Some(s.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap()
                .len()
            };

            assert_eq!(search("rust"), 1);
            assert_eq!(search("PARIS"), 1);
            assert_eq!(search("biology"), 1);
            assert_eq!(search("a"), 3);
            assert_eq!(search("nothing-like-this"), 0);
        }

        #[test]
        fn search_treats_wildcards_literally() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            db.add_card(user, &CardDraft::new("100% sure", "yes", "T")).unwrap();
            db.add_card(user, &CardDraft::new("plain", "text", "T")).unwrap();

            let cards = db
                .list_cards(
                    user,
                    &CardQuery {
                        search: Some("%".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].front, "100% sure");
        }

        #[test]
        fn search_folds_non_ascii_case() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            db.add_card(user, &CardDraft::new("ÜBER alles", "ja", "Deutsch")).unwrap();
            db.add_card(user, &CardDraft::new("Straße", "street", "ÉTUDES")).unwrap();

            let search = |s: &str| {
                db.list_cards(
                    user,
                    &CardQuery {
                        search: Some(s.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap()
                .into_iter()
                .map(|c| c.front)
                .collect::<Vec<_>>()
            };

            assert_eq!(search("über"), vec!["ÜBER alles"]);
            assert_eq!(search("études"), vec!["Straße"]);
            assert_eq!(search("STRASSE"), Vec::<String>::new());
            assert_eq!(search("STRAßE"), vec!["Straße"]);
        }

        #[test]
        fn topic_filter_is_exact() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            add_card(&db, user, "q1", "Math");
            add_card(&db, user, "q2", "Mathematics");

            let cards = db
                .list_cards(
                    user,
                    &CardQuery {
                        topic: Some("Math".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].topic, "Math");
        }

        #[test]
        fn list_topics_distinct_and_sorted() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let other = add_user(&db, "bob");
            add_card(&db, user, "q1", "Math");
            add_card(&db, user, "q2", "Art");
            add_card(&db, user, "q3", "Math");
            add_card(&db, other, "q4", "Secret");

            assert_eq!(db.list_topics(user).unwrap(), vec!["Art", "Math"]);
        }

        #[test]
        fn import_cards_inserts_all() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let drafts = vec![CardDraft::new("a", "b", "c"), CardDraft::new("d", "e", "f")];

            assert_eq!(db.import_cards(user, &drafts).unwrap(), 2);
            assert_eq!(db.list_cards(user, &CardQuery::default()).unwrap().len(), 2);
        }

        #[test]
        fn import_cards_rolls_back_on_failure() {
            let db = setup_db();
            let drafts = vec![CardDraft::new("a", "b", "c")];

            // Unknown user violates the foreign key
            assert!(db.import_cards(999, &drafts).is_err());
            let count: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM flashcards", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0);
        }
    }

    mod study_candidate_tests {
        use super::*;

        #[test]
        fn empty_topic_means_all() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            add_card(&db, user, "q1", "Math");
            add_card(&db, user, "q2", "Art");

            assert_eq!(db.study_candidates(user, "", false).unwrap().len(), 2);
            assert_eq!(db.study_candidates(user, "Art", false).unwrap().len(), 1);
            assert!(db.study_candidates(user, "Nope", false).unwrap().is_empty());
        }

        #[test]
        fn only_unknown_excludes_known_cards() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let known = add_card(&db, user, "q1", "Math");
            let unknown = add_card(&db, user, "q2", "Math");
            db.record_review(user, known, ReviewOutcome::Known, None)
                .unwrap();

            let cards = db.study_candidates(user, "", true).unwrap();
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].id, unknown);
        }

        #[test]
        fn candidates_exclude_other_users() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            add_card(&db, bob, "q", "Math");

            assert!(db.study_candidates(alice, "", false).unwrap().is_empty());
        }
    }

    mod review_tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        #[test]
        fn concurrent_reviews_from_separate_connections() {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("flashcards.db");

            let db = Database::open(&path).unwrap();
            db.init().unwrap();
            let user = add_user(&db, "alice");
            let card = add_card(&db, user, "Q", "T");
            let session = db.start_session(user, "All Topics").unwrap();

            let done = Arc::new(AtomicBool::new(false));

            // Card and session are written in one transaction, so a reader
            // never sees one bumped without the other
            let reader = {
                let path = path.clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let db = Database::open(&path).unwrap();
                    let mut reads = 0;
                    while !done.load(Ordering::SeqCst) {
                        let tx = db.conn.unchecked_transaction().unwrap();
                        let c = fetch_card(&tx, user, card).unwrap().unwrap();
                        let s = fetch_session(&tx, user, session).unwrap().unwrap();
                        tx.commit().unwrap();

                        assert_eq!(c.times_reviewed, s.cards_studied);
                        assert_eq!(c.times_correct, s.cards_known);
                        assert!(c.times_correct <= c.times_reviewed);
                        reads += 1;
                    }
                    reads
                })
            };

            let writers: Vec<_> = (0..4)
                .map(|_| {
                    let path = path.clone();
                    thread::spawn(move || {
                        let db = Database::open(&path).unwrap();
                        for i in 0..100 {
                            let outcome = if i % 2 == 0 {
                                ReviewOutcome::Known
                            } else {
                                ReviewOutcome::Review
                            };
                            db.record_review(user, card, outcome, Some(session))
                                .unwrap()
                                .unwrap();
                        }
                    })
                })
                .collect();

            for w in writers {
                w.join().expect("writer panicked");
            }
            done.store(true, Ordering::SeqCst);
            assert!(reader.join().expect("reader panicked") > 0);

            let c = db.get_card(user, card).unwrap().unwrap();
            let s = db.get_session(user, session).unwrap().unwrap();
            assert_eq!(c.times_reviewed, 400);
            assert_eq!(c.times_correct, 200);
            assert_eq!(s.cards_studied, 400);
            assert_eq!(s.cards_known, 200);
        }


        #[test]
        fn known_bumps_both_counters() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");

            let (card, session) = db
                .record_review(user, id, ReviewOutcome::Known, None)
                .unwrap()
                .unwrap();
            assert_eq!(card.times_reviewed, 1);
            assert_eq!(card.times_correct, 1);
            assert!(card.is_known);
            assert!(card.last_reviewed.is_some());
            assert!(session.is_none());
        }

        #[test]
        fn review_bumps_only_reviewed() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            db.record_review(user, id, ReviewOutcome::Known, None).unwrap();

            let (card, _) = db
                .record_review(user, id, ReviewOutcome::Review, None)
                .unwrap()
                .unwrap();
            assert_eq!(card.times_reviewed, 2);
            assert_eq!(card.times_correct, 1);
            assert!(!card.is_known);
        }

        #[test]
        fn review_of_foreign_card_changes_nothing() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            let id = add_card(&db, alice, "Q", "T");
            let session = db.start_session(bob, "All Topics").unwrap();

            let result = db
                .record_review(bob, id, ReviewOutcome::Known, Some(session))
                .unwrap();
            assert!(result.is_none());

            let card = db.get_card(alice, id).unwrap().unwrap();
            assert_eq!(card.times_reviewed, 0);
            let session = db.get_session(bob, session).unwrap().unwrap();
            assert_eq!(session.cards_studied, 0);
        }

        #[test]
        fn review_tallies_active_session() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            let sid = db.start_session(user, "T").unwrap();

            let (_, session) = db
                .record_review(user, id, ReviewOutcome::Known, Some(sid))
                .unwrap()
                .unwrap();
            let session = session.expect("active session should be tallied");
            assert_eq!(session.cards_studied, 1);
            assert_eq!(session.cards_known, 1);

            let (_, session) = db
                .record_review(user, id, ReviewOutcome::Review, Some(sid))
                .unwrap()
                .unwrap();
            let session = session.unwrap();
            assert_eq!(session.cards_studied, 2);
            assert_eq!(session.cards_known, 1);
        }

        #[test]
        fn review_skips_ended_or_missing_session() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            let sid = db.start_session(user, "T").unwrap();
            db.end_session(user, sid).unwrap();

            let (card, session) = db
                .record_review(user, id, ReviewOutcome::Known, Some(sid))
                .unwrap()
                .unwrap();
            assert!(session.is_none());
            assert_eq!(card.times_reviewed, 1);
            assert_eq!(db.get_session(user, sid).unwrap().unwrap().cards_studied, 0);

            let (_, session) = db
                .record_review(user, id, ReviewOutcome::Known, Some(4242))
                .unwrap()
                .unwrap();
            assert!(session.is_none());
        }

        #[test]
        fn correct_never_exceeds_reviewed() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            let outcomes = [
                ReviewOutcome::Known,
                ReviewOutcome::Review,
                ReviewOutcome::Known,
                ReviewOutcome::Known,
                ReviewOutcome::Review,
            ];
            for outcome in outcomes {
                let (card, _) = db.record_review(user, id, outcome, None).unwrap().unwrap();
                assert!(card.times_correct <= card.times_reviewed);
            }
        }

        #[test]
        fn schema_rejects_correct_above_reviewed() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let id = add_card(&db, user, "Q", "T");
            let result = db.conn.execute(
                "UPDATE flashcards SET times_correct = 1 WHERE id = ?1",
                params![id],
            );
            assert!(result.is_err());
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn start_session_creates_active_record() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let sid = db.start_session(user, "All Topics").unwrap();

            let session = db.get_session(user, sid).unwrap().unwrap();
            assert_eq!(session.topic, "All Topics");
            assert!(session.is_active());
            assert_eq!(session.cards_studied, 0);
            assert_eq!(session.cards_known, 0);
        }

        #[test]
        fn end_session_stamps_once() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let sid = db.start_session(user, "T").unwrap();

            assert!(db.end_session(user, sid).unwrap());
            let ended = db.get_session(user, sid).unwrap().unwrap().ended_at;
            assert!(ended.is_some());

            assert!(!db.end_session(user, sid).unwrap());
            assert_eq!(db.get_session(user, sid).unwrap().unwrap().ended_at, ended);
        }

        #[test]
        fn sessions_scoped_to_owner() {
            let db = setup_db();
            let alice = add_user(&db, "alice");
            let bob = add_user(&db, "bob");
            let sid = db.start_session(alice, "T").unwrap();

            assert!(db.get_session(bob, sid).unwrap().is_none());
            assert!(!db.end_session(bob, sid).unwrap());
            assert!(db.get_session(alice, sid).unwrap().unwrap().is_active());
        }

        #[test]
        fn recent_sessions_newest_first_and_limited() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let ids: Vec<i64> = (0..7)
                .map(|i| db.start_session(user, &format!("T{}", i)).unwrap())
                .collect();

            let recent = db.recent_sessions(user, 5).unwrap();
            assert_eq!(recent.len(), 5);
            assert_eq!(recent[0].id, ids[6]);
            assert_eq!(recent[4].id, ids[2]);
        }
    }

    mod aggregate_tests {
        use super::*;

        #[test]
        fn dashboard_empty() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let dash = db.dashboard(user).unwrap();
            assert_eq!(dash.total_cards, 0);
            assert_eq!(dash.known_cards, 0);
            assert_eq!(dash.review_cards, 0);
            assert!(dash.top_topics.is_empty());
            assert!(dash.recent_sessions.is_empty());
        }

        #[test]
        fn dashboard_counts_and_top_topics() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let topics = [
                ("A", 1),
                ("B", 4),
                ("C", 2),
                ("D", 3),
                ("E", 2),
                ("F", 5),
            ];
            let mut first = None;
            for (topic, n) in topics {
                for i in 0..n {
                    let id = add_card(&db, user, &format!("{}{}", topic, i), topic);
                    first.get_or_insert(id);
                }
            }
            db.record_review(user, first.unwrap(), ReviewOutcome::Known, None)
                .unwrap();

            let dash = db.dashboard(user).unwrap();
            assert_eq!(dash.total_cards, 17);
            assert_eq!(dash.known_cards, 1);
            assert_eq!(dash.review_cards, 16);

            let top: Vec<(String, i64)> = dash
                .top_topics
                .into_iter()
                .map(|t| (t.topic, t.count))
                .collect();
            assert_eq!(
                top,
                vec![
                    ("F".to_string(), 5),
                    ("B".to_string(), 4),
                    ("D".to_string(), 3),
                    ("C".to_string(), 2),
                    ("E".to_string(), 2),
                ]
            );
        }

        #[test]
        fn statistics_totals_and_breakdown() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            let other = add_user(&db, "bob");
            let m1 = add_card(&db, user, "m1", "Math");
            add_card(&db, user, "m2", "Math");
            let a1 = add_card(&db, user, "a1", "Art");
            add_card(&db, other, "x", "Math");

            db.record_review(user, m1, ReviewOutcome::Known, None).unwrap();
            db.record_review(user, m1, ReviewOutcome::Known, None).unwrap();
            db.record_review(user, a1, ReviewOutcome::Review, None).unwrap();

            let stats = db.statistics(user).unwrap();
            assert_eq!(stats.total_cards, 3);
            assert_eq!(stats.known_cards, 1);
            assert_eq!(stats.review_cards, 2);
            assert_eq!(stats.total_reviews, 3);

            assert_eq!(stats.topics.len(), 2);
            assert_eq!(stats.topics[0].topic, "Math");
            assert_eq!(stats.topics[0].total, 2);
            assert_eq!(stats.topics[0].known, 1);
            assert_eq!(stats.topics[1].topic, "Art");
            assert_eq!(stats.topics[1].known, 0);
        }

        #[test]
        fn statistics_keeps_ten_sessions() {
            let db = setup_db();
            let user = add_user(&db, "alice");
            for _ in 0..12 {
                db.start_session(user, "T").unwrap();
            }
            assert_eq!(db.statistics(user).unwrap().recent_sessions.len(), 10);
            assert_eq!(db.dashboard(user).unwrap().recent_sessions.len(), 5);
        }
    }
}
