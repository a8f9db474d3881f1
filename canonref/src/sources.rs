/// Reader for canon documents in the XML format described in the crate docs:
/// a `canon` root bearing `name` and `lang`, containing `book` elements with
/// `title`, `pattern`, and `chapters` children.
pub mod xml {
    use crate::{Book, Canon, CanonSource, Chapter};
    use quick_xml::events::attributes::Attributes;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use regex::RegexBuilder;
    use std::collections::{BTreeMap, HashSet};
    use std::{fs, io, path};
    use thiserror::Error;

    /// Errors when reading a canon document.
    #[derive(Error, Debug)]
    pub enum ParseError {
        #[error("canon document not found")]
        CanonNotFound {
            #[from]
            source: io::Error,
        },

        #[error("canon invalid: {0}")]
        CanonInvalid(String),

        #[error("malformed XML")]
        Malformed {
            #[from]
            source: quick_xml::Error,
        },
    }

    const DEFAULT_CANON: &str = include_str!("../resources/canons/eng-canon.xml");

    enum Source {
        Path(path::PathBuf),
        Text(String),
    }

    /// Does the work of loading.
    pub struct Parser {
        source: Source,
    }

    impl Parser {
        /// Canon document on disk.
        #[must_use]
        pub fn new(path: &path::Path) -> Self {
            Self {
                source: Source::Path(path.into()),
            }
        }

        /// Canon document already in memory.
        #[must_use]
        pub fn from_document(document: &str) -> Self {
            Self {
                source: Source::Text(document.to_string()),
            }
        }

        /// The canon document embedded in this crate: the 66-book English
        /// Protestant canon with KJV-style versification.
        #[must_use]
        pub fn from_default_canon() -> Self {
            Self {
                source: Source::Text(DEFAULT_CANON.to_string()),
            }
        }
    }

    impl CanonSource for Parser {
        type Err = ParseError;
        fn load(self) -> Result<Canon, Self::Err> {
            let text = match self.source {
                Source::Path(p) => fs::read_to_string(p)?,
                Source::Text(t) => t,
            };

            let canon = parse_document(&text)?;
            validate(&canon)?;
            Ok(canon)
        }
    }

    struct BookBuilder {
        id: Option<usize>,
        name: Option<String>,
        abbr: Option<String>,
        extra: BTreeMap<String, String>,
        title: Option<String>,
        pattern: Option<String>,
        chapters: Vec<Chapter>,
    }

    impl BookBuilder {
        fn from_attributes(attrs: Attributes) -> Result<Self, ParseError> {
            let mut builder = Self {
                id: None,
                name: None,
                abbr: None,
                extra: BTreeMap::new(),
                title: None,
                pattern: None,
                chapters: vec![],
            };

            for attr in attrs {
                let attr = attr.map_err(quick_xml::Error::from)?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                let value = attr
                    .unescape_value()
                    .map_err(quick_xml::Error::from)?
                    .to_string();
                match key.as_str() {
                    "id" => {
                        let id = value.parse().map_err(|_| {
                            ParseError::CanonInvalid(format!("book id is not a number: {}", value))
                        })?;
                        builder.id = Some(id);
                    }
                    "name" => builder.name = Some(value),
                    "abbr" => builder.abbr = Some(value),
                    _ => {
                        builder.extra.insert(key, value);
                    }
                }
            }

            Ok(builder)
        }

        fn build(self) -> Result<Book, ParseError> {
            let id = self
                .id
                .ok_or_else(|| ParseError::CanonInvalid("book without an id".to_string()))?;
            let name = self.name.ok_or_else(|| {
                ParseError::CanonInvalid(format!("book {} has no name", id))
            })?;
            let title = self.title.ok_or_else(|| {
                ParseError::CanonInvalid(format!("book {} has no title", name))
            })?;
            if self.chapters.is_empty() {
                return Err(ParseError::CanonInvalid(format!(
                    "book {} has no chapters",
                    name
                )));
            }

            Ok(Book {
                id,
                name,
                title,
                abbr: self.abbr,
                pattern: self.pattern,
                extra: self.extra,
                chapters: self.chapters,
            })
        }
    }

    fn parse_document(text: &str) -> Result<Canon, ParseError> {
        let mut reader = Reader::from_str(text);
        let config = reader.config_mut();
        config.trim_text_start = true;
        config.trim_text_end = true;

        let mut canon: Option<Canon> = None;
        let mut book: Option<BookBuilder> = None;
        // element whose text content we are inside, if any
        let mut text_element: Option<String> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match tag.as_str() {
                        "canon" => {
                            let mut name = String::new();
                            let mut lang = String::new();
                            for attr in e.attributes() {
                                let attr = attr.map_err(quick_xml::Error::from)?;
                                let value = attr
                                    .unescape_value()
                                    .map_err(quick_xml::Error::from)?
                                    .to_string();
                                match attr.key.as_ref() {
                                    b"name" => name = value,
                                    b"lang" => lang = value,
                                    _ => {}
                                }
                            }
                            canon = Some(Canon {
                                name,
                                lang,
                                books: vec![],
                            });
                        }
                        "book" => {
                            if canon.is_none() {
                                return Err(ParseError::CanonInvalid(
                                    "book outside of a canon element".to_string(),
                                ));
                            }
                            book = Some(BookBuilder::from_attributes(e.attributes())?);
                        }
                        "title" | "pattern" => text_element = Some(tag),
                        "chapter" => {
                            let builder = book.as_mut().ok_or_else(|| {
                                ParseError::CanonInvalid(
                                    "chapter outside of a book element".to_string(),
                                )
                            })?;
                            let mut vss = None;
                            for attr in e.attributes() {
                                let attr = attr.map_err(quick_xml::Error::from)?;
                                if attr.key.as_ref() == b"vss" {
                                    let value = attr
                                        .unescape_value()
                                        .map_err(quick_xml::Error::from)?;
                                    vss = Some(value.parse().map_err(|_| {
                                        ParseError::CanonInvalid(format!(
                                            "chapter vss is not a number: {}",
                                            value
                                        ))
                                    })?);
                                }
                            }
                            let vss = vss.ok_or_else(|| {
                                ParseError::CanonInvalid("chapter without a vss count".to_string())
                            })?;
                            builder.chapters.push(Chapter { vss });
                        }
                        "chapters" => {}
                        other => {
                            return Err(ParseError::CanonInvalid(format!(
                                "unrecognized element: {}",
                                other
                            )))
                        }
                    }
                }
                Event::Text(e) => {
                    if let (Some(element), Some(builder)) = (&text_element, book.as_mut()) {
                        let value = e
                            .unescape()
                            .map_err(quick_xml::Error::from)?
                            .to_string();
                        match element.as_str() {
                            "title" => builder.title = Some(value),
                            "pattern" => builder.pattern = Some(value),
                            _ => {}
                        }
                    }
                }
                Event::End(e) => {
                    let tag = e.name();
                    match tag.as_ref() {
                        b"book" => {
                            let built = book
                                .take()
                                .ok_or_else(|| {
                                    ParseError::CanonInvalid("unbalanced book element".to_string())
                                })?
                                .build()?;
                            if let Some(canon) = canon.as_mut() {
                                canon.books.push(built);
                            }
                        }
                        b"title" | b"pattern" => text_element = None,
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        canon.ok_or_else(|| ParseError::CanonInvalid("no canon element found".to_string()))
    }

    fn validate(canon: &Canon) -> Result<(), ParseError> {
        if canon.books.is_empty() {
            return Err(ParseError::CanonInvalid("no books found".to_string()));
        }

        let mut seen = HashSet::new();
        for book in &canon.books {
            if !seen.insert(book.id) {
                return Err(ParseError::CanonInvalid(format!(
                    "duplicate book id: {}",
                    book.id
                )));
            }

            if let Some(pattern) = &book.pattern {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|_| {
                        ParseError::CanonInvalid(format!(
                            "book {} has an invalid pattern: {}",
                            book.name, pattern
                        ))
                    })?;
            }
        }

        Ok(())
    }

}
