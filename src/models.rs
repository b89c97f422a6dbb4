use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Session label used when a study pass isn't restricted to one topic
pub const ALL_TOPICS: &str = "All Topics";

pub const MAX_TOPIC_LEN: usize = 100;
pub const MAX_USERNAME_LEN: usize = 150;

// Timestamps are stored as fixed-width RFC 3339 strings so they sort lexically
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

impl User {
    pub fn validate_username(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::validation("username", "may not be blank"));
        }
        if name.chars().count() > MAX_USERNAME_LEN {
            return Err(Error::validation(
                "username",
                format!("must be at most {} characters", MAX_USERNAME_LEN),
            ));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(Error::validation(
                "username",
                "may only contain letters, digits and @/./+/-/_",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub user_id: i64,
    pub front: String,
    pub back: String,
    pub topic: String,
    pub created_at: String,
    pub updated_at: String,
    pub times_reviewed: i64,
    pub times_correct: i64,
    pub last_reviewed: Option<String>,
    pub is_known: bool,
}

impl Flashcard {
    /// Whole-percent share of reviews answered correctly, 0 before the first review.
    pub fn success_rate(&self) -> i64 {
        success_rate(self.times_correct, self.times_reviewed)
    }

    /// Creation date as `YYYY-MM-DD`.
    pub fn created_date(&self) -> String {
        match parse_timestamp(&self.created_at) {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => self.created_at.chars().take(10).collect(),
        }
    }
}

impl fmt::Display for Flashcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let front: String = self.front.chars().take(50).collect();
        write!(f, "{}: {}", self.topic, front)
    }
}

pub fn success_rate(correct: i64, reviewed: i64) -> i64 {
    if reviewed <= 0 {
        0
    } else {
        correct * 100 / reviewed
    }
}

/// User-supplied content of a card, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub topic: String,
}

impl CardDraft {
    pub fn new(front: &str, back: &str, topic: &str) -> Self {
        Self {
            front: front.trim().to_string(),
            back: back.trim().to_string(),
            topic: topic.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.front.trim().is_empty() {
            return Err(Error::validation("front", "may not be blank"));
        }
        if self.back.trim().is_empty() {
            return Err(Error::validation("back", "may not be blank"));
        }
        if self.topic.trim().is_empty() {
            return Err(Error::validation("topic", "may not be blank"));
        }
        if self.topic.chars().count() > MAX_TOPIC_LEN {
            return Err(Error::validation(
                "topic",
                format!("must be at most {} characters", MAX_TOPIC_LEN),
            ));
        }
        Ok(())
    }
}

impl From<&Flashcard> for CardDraft {
    fn from(card: &Flashcard) -> Self {
        Self {
            front: card.front.clone(),
            back: card.back.clone(),
            topic: card.topic.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: i64,
    pub user_id: i64,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub cards_studied: i64,
    pub cards_known: i64,
    pub topic: String,
}

impl StudySession {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn duration_minutes(&self) -> i64 {
        let Some(ended) = self.ended_at.as_deref().and_then(parse_timestamp) else {
            return 0;
        };
        match parse_timestamp(&self.started_at) {
            Some(started) => (ended - started).num_minutes().max(0),
            None => 0,
        }
    }
}

impl fmt::Display for StudySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let started = match parse_timestamp(&self.started_at) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None => self.started_at.clone(),
        };
        write!(f, "{} - {}", self.topic, started)
    }
}

/// Opaque reference to a study session, retained by the caller between reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(i64);

impl SessionHandle {
    pub fn from_raw(id: i64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewOutcome {
    Known,
    Review,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Known => "known",
            ReviewOutcome::Review => "review",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "known" | "k" | "yes" | "y" | "correct" => Some(ReviewOutcome::Known),
            "review" | "r" | "no" | "n" | "again" => Some(ReviewOutcome::Review),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardSort {
    #[default]
    Newest,
    Oldest,
    TopicAsc,
    TopicDesc,
}

impl CardSort {
    pub fn order_clause(&self) -> &'static str {
        match self {
            CardSort::Newest => "created_at DESC, id DESC",
            CardSort::Oldest => "created_at ASC, id ASC",
            CardSort::TopicAsc => "topic ASC, created_at DESC, id DESC",
            CardSort::TopicDesc => "topic DESC, created_at DESC, id DESC",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardSort::Newest => "Newest First",
            CardSort::Oldest => "Oldest First",
            CardSort::TopicAsc => "Topic A-Z",
            CardSort::TopicDesc => "Topic Z-A",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            CardSort::Newest => CardSort::Oldest,
            CardSort::Oldest => CardSort::TopicAsc,
            CardSort::TopicAsc => CardSort::TopicDesc,
            CardSort::TopicDesc => CardSort::Newest,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "-created_at" | "new" => Some(CardSort::Newest),
            "oldest" | "created_at" | "old" => Some(CardSort::Oldest),
            "topic" | "a-z" | "topic-asc" => Some(CardSort::TopicAsc),
            "-topic" | "z-a" | "topic-desc" => Some(CardSort::TopicDesc),
            _ => None,
        }
    }
}

/// Search, topic filter and ordering for card listings.
#[derive(Debug, Clone, Default)]
pub struct CardQuery {
    pub search: Option<String>,
    pub topic: Option<String>,
    pub sort: CardSort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBreakdown {
    pub topic: String,
    pub total: i64,
    pub known: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_cards: i64,
    pub known_cards: i64,
    pub review_cards: i64,
    pub top_topics: Vec<TopicCount>,
    pub recent_sessions: Vec<StudySession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_cards: i64,
    pub known_cards: i64,
    pub review_cards: i64,
    pub total_reviews: i64,
    pub topics: Vec<TopicBreakdown>,
    pub recent_sessions: Vec<StudySession>,
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
