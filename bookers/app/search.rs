//! Name/title search by match strategy.
//!
//! Patterns go through SQLite `LIKE`, which folds ASCII case only:
//! `"alice"` matches `"Alice"` but `"ä"` does not match `"Ä"`. Wildcards
//! typed by the user are escaped and match literally.

use std::fmt;
use std::str::FromStr;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Book, User};
use crate::schema::{books, users};

const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    PerfectMatch,
    ForwardMatch,
    BackwardMatch,
    PartialMatch,
    /// No filter at all.
    #[serde(other)]
    All,
}

impl SearchMode {
    /// Parses a mode parameter. Anything unrecognized means [`SearchMode::All`].
    pub fn from_param(param: &str) -> Self {
        match param {
            "perfect_match" => SearchMode::PerfectMatch,
            "forward_match" => SearchMode::ForwardMatch,
            "backward_match" => SearchMode::BackwardMatch,
            "partial_match" => SearchMode::PartialMatch,
            _ => SearchMode::All,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::PerfectMatch => "perfect_match",
            SearchMode::ForwardMatch => "forward_match",
            SearchMode::BackwardMatch => "backward_match",
            SearchMode::PartialMatch => "partial_match",
            SearchMode::All => "all",
        }
    }

    /// The `LIKE` pattern for `word`, or `None` when nothing is filtered.
    pub fn pattern(self, word: &str) -> Option<String> {
        let word = escape_like(word);
        match self {
            SearchMode::PerfectMatch => Some(word),
            SearchMode::ForwardMatch => Some(format!("{}%", word)),
            SearchMode::BackwardMatch => Some(format!("%{}", word)),
            SearchMode::PartialMatch => Some(format!("%{}%", word)),
            SearchMode::All => None,
        }
    }
}

impl FromStr for SearchMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SearchMode::from_param(s))
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if c == '%' || c == '_' || c == ESCAPE {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

impl User {
    pub fn looks(conn: &mut SqliteConnection, mode: SearchMode, word: &str) -> Result<Vec<User>> {
        let mut query = users::table
            .select(User::as_select())
            .order(users::id.asc())
            .into_boxed();
        if let Some(pattern) = mode.pattern(word) {
            query = query.filter(users::name.like(pattern).escape(ESCAPE));
        }
        let found: Vec<User> = query.load(conn)?;
        tracing::debug!(%mode, %word, hits = found.len(), "user search");
        Ok(found)
    }
}

impl Book {
    pub fn looks(conn: &mut SqliteConnection, mode: SearchMode, word: &str) -> Result<Vec<Book>> {
        let mut query = books::table
            .select(Book::as_select())
            .order(books::id.asc())
            .into_boxed();
        if let Some(pattern) = mode.pattern(word) {
            query = query.filter(books::title.like(pattern).escape(ESCAPE));
        }
        let found: Vec<Book> = query.load(conn)?;
        tracing::debug!(%mode, %word, hits = found.len(), "book search");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_param() {
        assert_eq!(SearchMode::from_param("perfect_match"), SearchMode::PerfectMatch);
        assert_eq!(SearchMode::from_param("forward_match"), SearchMode::ForwardMatch);
        assert_eq!(SearchMode::from_param("backward_match"), SearchMode::BackwardMatch);
        assert_eq!(SearchMode::from_param("partial_match"), SearchMode::PartialMatch);
        assert_eq!(SearchMode::from_param("Perfect_Match"), SearchMode::All);
        assert_eq!(SearchMode::from_param(""), SearchMode::All);
        assert_eq!("bogus".parse::<SearchMode>(), Ok(SearchMode::All));
    }

    #[test]
    fn test_deserialize_unknown_is_all() {
        let mode: SearchMode = serde_json::from_str("\"forward_match\"").unwrap();
        assert_eq!(mode, SearchMode::ForwardMatch);
        let mode: SearchMode = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(mode, SearchMode::All);
    }

    #[test]
    fn test_patterns() {
        assert_eq!(SearchMode::PerfectMatch.pattern("al").as_deref(), Some("al"));
        assert_eq!(SearchMode::ForwardMatch.pattern("al").as_deref(), Some("al%"));
        assert_eq!(SearchMode::BackwardMatch.pattern("al").as_deref(), Some("%al"));
        assert_eq!(SearchMode::PartialMatch.pattern("al").as_deref(), Some("%al%"));
        assert_eq!(SearchMode::All.pattern("al"), None);
    }

    #[test]
    fn test_wildcards_are_escaped() {
        assert_eq!(
            SearchMode::PartialMatch.pattern("50%_\\").as_deref(),
            Some("%50\\%\\_\\\\%")
        );
    }
}
