use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

mod format;
mod normalize;
mod parser;
mod reference;
mod sources;
mod tag;

pub use self::format::{BookArg, FormatOptions};
pub use self::normalize::normalize;
pub use self::parser::RefParser;
pub use self::reference::{Ref, RefList, RefRange};
pub use self::sources::xml;
pub use self::tag::RefTagger;

/// Plugin interface for loading a canon from some backing store. Primarily
/// designed to make it easier to add new document formats later.
pub trait CanonSource {
    /// Error type to be returned if there is a failure while loading.
    type Err: std::error::Error;
    /// Load using the source-specific implementation.
    /// # Errors
    ///
    /// Customize type of errors returned with `Err` associated type.
    fn load(self) -> Result<Canon, Self::Err>;
}

/// An immutable description of a corpus: an ordered list of books, each with
/// per-chapter verse counts. Loaded once, then shared freely.
#[derive(Debug, Clone, Serialize)]
pub struct Canon {
    pub name: String,
    pub lang: String,
    pub books: Vec<Book>,
}

impl Canon {
    /// Creates a `Canon` from the canon document embedded in this crate
    /// (66-book English Protestant canon).
    /// # Errors
    ///
    /// Will return `Err` if the embedded document fails validation, which
    /// would indicate a packaging defect.
    pub fn from_default_source() -> Result<Self, CanonError> {
        let source = xml::Parser::from_default_canon();
        let canon = source.load()?;
        Ok(canon)
    }

    /// Look a book up by its 1-based ordinal id.
    #[must_use]
    pub fn book_by_id(&self, id: usize) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    /// Look a book up by exact short name, display title, or abbreviation.
    /// Pattern-based matching lives on [`RefParser`], which holds the
    /// compiled patterns.
    #[must_use]
    pub fn book_by_name(&self, name: &str) -> Option<&Book> {
        self.books
            .iter()
            .find(|b| b.name == name || b.title == name || b.abbr.as_deref() == Some(name))
    }
}

/// One top-level division of a canon.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    /// 1-based ordinal within the canon. Unique, conventionally dense 1..N.
    pub id: usize,
    /// Stable short key, e.g. "Gen".
    pub name: String,
    /// Display title, e.g. "Genesis".
    pub title: String,
    /// Optional additional exact-match abbreviation.
    pub abbr: Option<String>,
    /// Regex source matching accepted written forms of the book name,
    /// applied case-insensitively at the start of a token.
    pub pattern: Option<String>,
    /// Any further attributes from the canon document, preserved verbatim
    /// for the formatter's `bkarg` lookup (localized titles and the like).
    pub extra: BTreeMap<String, String>,
    pub chapters: Vec<Chapter>,
}

/// One chapter of a book. Only structure is recorded, never text.
#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    /// Number of verses in this chapter.
    pub vss: usize,
}

/// All possible errors that this library can return.
#[derive(Error, Debug)]
pub enum CanonError {
    #[error("canon document parsing error")]
    CanonParsingError {
        #[from]
        source: xml::ParseError,
    },
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub fn book(id: usize, name: &str, title: &str, pattern: &str, vss: &[usize]) -> Book {
        Book {
            id,
            name: name.to_string(),
            title: title.to_string(),
            abbr: None,
            pattern: Some(pattern.to_string()),
            extra: BTreeMap::new(),
            chapters: vss.iter().map(|&vss| Chapter { vss }).collect(),
        }
    }

    /// Small hand-built canon: a multi-chapter book, a one-chapter book, and
    /// a book with a localized title in its extra table.
    pub fn tiny_canon() -> Canon {
        let mut exodus = book(2, "Exod", "Exodus", r"Ex(?:od(?:us)?)?", &[22, 25, 22, 31]);
        exodus
            .extra
            .insert("title_es".to_string(), "\u{c9}xodo".to_string());
        Canon {
            name: "tiny".to_string(),
            lang: "en".to_string(),
            books: vec![
                book(1, "Gen", "Genesis", r"Gen(?:esis)?", &[31, 25, 24, 26]),
                exodus,
                book(3, "Obad", "Obadiah", r"Ob(?:ad(?:iah)?)?", &[21]),
            ],
        }
    }

    pub fn eng_canon() -> Canon {
        Canon::from_default_source().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_lookup_by_id() {
        let canon = testutil::tiny_canon();
        assert_eq!(canon.book_by_id(2).map(|b| b.name.as_str()), Some("Exod"));
        assert!(canon.book_by_id(99).is_none());
    }

    #[test]
    fn book_lookup_by_name_title_abbr() {
        let mut canon = testutil::tiny_canon();
        canon.books[0].abbr = Some("Gn".to_string());
        assert_eq!(canon.book_by_name("Gen").map(|b| b.id), Some(1));
        assert_eq!(canon.book_by_name("Genesis").map(|b| b.id), Some(1));
        assert_eq!(canon.book_by_name("Gn").map(|b| b.id), Some(1));
        assert!(canon.book_by_name("Gene").is_none());
    }

    #[test]
    fn extra_attributes_survive() {
        let canon = testutil::tiny_canon();
        let exodus = canon.book_by_name("Exod").unwrap();
        assert_eq!(
            exodus.extra.get("title_es").map(String::as_str),
            Some("\u{c9}xodo")
        );
    }
}
