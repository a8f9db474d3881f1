use crate::normalize::normalize;
use crate::reference::{Ref, RefList, RefRange};
use crate::{Book, Canon};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Tool to
/// * tell if a string is a reference,
/// * parse strings into `RefList`s, and
/// * format `RefList`s back into strings.
///
/// A parser is bound to one canon; `parse` takes `&self` and keeps no state
/// between calls, so one parser may serve many threads.
#[derive(Debug)]
pub struct RefParser {
    canon: Canon,
    // compiled forms of the book patterns, parallel to canon.books
    patterns: Vec<Option<Regex>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Sep(char),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ContentKind {
    Book,
    Ch,
    Vs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Book,
    BookOrCh,
    ChOrVs,
    Ch,
    Vs,
    Sep,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Start,
    End,
}

// A reference under construction. Chapter and verse stay raw strings until
// the range is committed; the completer coerces them.
#[derive(Debug, Clone, Default)]
struct DraftRef {
    bk: Option<String>,
    id: Option<usize>,
    ch: Option<String>,
    vs: Option<String>,
    wholech: bool,
}

#[derive(Debug, Clone, Default)]
struct DraftRange {
    start: DraftRef,
    end: DraftRef,
}

impl DraftRange {
    fn side(&self, side: Side) -> &DraftRef {
        match side {
            Side::Start => &self.start,
            Side::End => &self.end,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut DraftRef {
        match side {
            Side::Start => &mut self.start,
            Side::End => &mut self.end,
        }
    }
}

static IDS_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\-,]+$").unwrap());
static CHAPTER_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:ch|chap|chapter)s?$").unwrap());
static NUM_CONTINUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([0-9]+)(ff?)$").unwrap());

impl RefParser {
    /// Create a parser over the given canon, compiling every book's match
    /// pattern. Patterns are applied case-insensitively at the start of a
    /// token. A pattern the canon loader would have rejected matches
    /// nothing.
    #[must_use]
    pub fn new(canon: Canon) -> Self {
        let patterns = canon
            .books
            .iter()
            .map(|book| {
                book.pattern.as_ref().and_then(|pattern| {
                    RegexBuilder::new(&format!(r"\A(?:{})", pattern))
                        .case_insensitive(true)
                        .build()
                        .ok()
                })
            })
            .collect();
        Self { canon, patterns }
    }

    #[must_use]
    pub fn canon(&self) -> &Canon {
        &self.canon
    }

    /// The book a token names: exact short name, title, or abbreviation
    /// first, then the first book whose pattern matches at the start of the
    /// token, in canon order.
    #[must_use]
    pub fn match_book(&self, token: &str) -> Option<&Book> {
        if token.is_empty() {
            return None;
        }

        self.canon.book_by_name(token).or_else(|| {
            self.canon
                .books
                .iter()
                .zip(&self.patterns)
                .find_map(|(book, pattern)| match pattern {
                    Some(re) if re.is_match(token) => Some(book),
                    _ => None,
                })
        })
    }

    /// Number of chapters in the named book; 0 when the book is unknown.
    #[must_use]
    pub fn chapters_in(&self, bk: &str) -> usize {
        self.match_book(bk).map_or(0, |b| b.chapters.len())
    }

    /// Number of verses in the named book and chapter; 0 when either is out
    /// of range.
    #[must_use]
    pub fn verses_in(&self, bk: &str, ch: usize) -> usize {
        self.match_book(bk)
            .and_then(|b| {
                if ch >= 1 {
                    b.chapters.get(ch - 1)
                } else {
                    None
                }
            })
            .map_or(0, |c| c.vss)
    }

    /// Parses a reference string into a list of completed ranges.
    ///
    /// Input rules:
    /// * either the input must begin with a book name, or a `bk` hint must
    ///   be given
    /// * references are separated by semicolons, commas, or newlines
    ///   - comma usually indicates a verse break, sometimes a chapter break
    ///   - semicolon and newline indicate a chapter or book break
    /// * book, chapter, verse separated by periods, spaces, or colons
    /// * ranges indicated by one or more hyphens
    /// * whole chapters indicated by lack of a verse number
    /// * whole books indicated by a book name alone
    /// * following references that lack a book name take it from the
    ///   previous reference
    ///
    /// Total over all inputs: anything unparseable yields an empty list.
    #[must_use]
    pub fn parse(&self, refstring: &str, bk: Option<&str>) -> RefList {
        let refstring = if IDS_ONLY.is_match(refstring) {
            self.refstr_from_ids(refstring)
        } else {
            normalize(refstring)
        };
        debug!("{} [{}]", refstring, bk.unwrap_or(""));

        let mut tokens = tokenize(&refstring);
        expand_continuations(&mut tokens);

        // either bk is a parameter or the first token, or this is not a reference
        let first_is_book = tokens.first().map_or(false, |t| match t {
            Token::Text(t) => self.match_book(t).is_some(),
            Token::Sep(_) => false,
        });
        if !first_is_book {
            match bk {
                None => return RefList::new(),
                Some(bk) => {
                    if let Some(hinted) = self.match_book(bk) {
                        tokens.insert(0, Token::Sep('.'));
                        tokens.insert(0, Token::Text(hinted.name.clone()));
                    }
                    // an unknown hint parses on; nameless ranges drop below
                }
            }
        }

        let mut reflist = RefList::new();
        let mut crng = DraftRange::default();
        let mut side = Side::Start;

        let mut prev: Option<ContentKind> = None;
        let mut book: Option<&Book> = None;
        let mut expect = Expect::Book;

        for i in 0..tokens.len() {
            let token = tokens[i].clone();
            debug!("token = {:?}\texpect = {:?}\tprev = {:?}", token, expect, prev);

            match token {
                Token::Sep('.') => match prev {
                    Some(ContentKind::Book) => {
                        let name = book.map_or("", |b| b.name.as_str());
                        expect = if self.chapters_in(name) == 1 {
                            Expect::ChOrVs
                        } else {
                            Expect::Ch
                        };
                    }
                    Some(ContentKind::Ch) => expect = Expect::Vs,
                    _ => {}
                },
                Token::Sep(sep @ (',' | ';')) => {
                    self.commit_range(&mut crng, &mut reflist);

                    let prevref = crng.side(side).clone();
                    crng = DraftRange::default();
                    side = Side::Start;
                    crng.start.bk = prevref.bk.clone();
                    debug!("--> new crng = {:?}", crng);

                    match prev {
                        None | Some(ContentKind::Book) => expect = Expect::Book,
                        Some(ContentKind::Ch) => expect = Expect::BookOrCh,
                        Some(ContentKind::Vs) => {
                            // after a verse the two separators diverge
                            if sep == ',' {
                                expect = Expect::Vs;
                                crng.start.ch = prevref.ch.clone();
                            } else {
                                expect = Expect::BookOrCh;
                            }
                        }
                    }
                }
                Token::Sep('-') => {
                    side = Side::End;
                    debug!("--> switch to end ref");
                    match prev {
                        Some(ContentKind::Book) => expect = Expect::Book,
                        Some(ContentKind::Ch) => expect = Expect::BookOrCh,
                        Some(ContentKind::Vs) => expect = Expect::ChOrVs,
                        None => {}
                    }
                }
                Token::Sep(_) => {}
                Token::Text(t) => {
                    if CHAPTER_WORD.is_match(&t) {
                        expect = Expect::Ch;
                        continue;
                    }

                    match expect {
                        Expect::Book => {
                            if let Some(found) = self.match_book(&t) {
                                book = Some(found);
                                let cref = crng.side_mut(side);
                                cref.bk = Some(found.name.clone());
                                cref.id = Some(found.id);
                                debug!("--> book = {:?}", found.name);
                            } else {
                                // not a book where one was required: drop any
                                // inherited name so the range is discarded
                                let cref = crng.side_mut(side);
                                cref.bk = None;
                                cref.id = None;
                            }
                            prev = Some(ContentKind::Book);
                        }
                        Expect::BookOrCh => {
                            if let Some(found) = self.match_book(&t) {
                                book = Some(found);
                                let cref = crng.side_mut(side);
                                cref.bk = Some(found.name.clone());
                                cref.id = Some(found.id);
                                prev = Some(ContentKind::Book);
                                debug!("--> book = {:?}", found.name);
                            } else {
                                let start_bk = crng.start.bk.clone().unwrap_or_default();
                                if self.chapters_in(&start_bk) == 1 && !is_one(&t) {
                                    let vs = self.resolve_vs(&crng, &t);
                                    let cref = crng.side_mut(side);
                                    cref.ch = Some("1".to_string());
                                    cref.vs = Some(vs);
                                    prev = Some(ContentKind::Vs);
                                    debug!("--> vs = {:?}", t);
                                } else {
                                    let ch = self.resolve_ch(&crng, &t);
                                    crng.side_mut(side).ch = Some(ch);
                                    prev = Some(ContentKind::Ch);
                                    debug!("--> ch = {:?}", t);
                                }
                            }
                        }
                        Expect::ChOrVs => {
                            // either prev was a verse followed by '-', or
                            // prev was a one-chapter book
                            let following = tokens.get(i + 1);
                            let after_dash = i >= 1 && tokens[i - 1] == Token::Sep('-');
                            if prev == Some(ContentKind::Vs) && after_dash {
                                if let Some(found) = self.match_book(&t) {
                                    book = Some(found);
                                    let cref = crng.side_mut(side);
                                    cref.bk = Some(found.name.clone());
                                    cref.id = Some(found.id);
                                    prev = Some(ContentKind::Book);
                                    debug!("--> book = {:?}", found.name);
                                } else if following == Some(&Token::Sep('.')) {
                                    let ch = self.resolve_ch(&crng, &t);
                                    crng.side_mut(side).ch = Some(ch);
                                    prev = Some(ContentKind::Ch);
                                    debug!("--> ch = {:?}", t);
                                } else {
                                    let vs = self.resolve_vs(&crng, &t);
                                    crng.side_mut(side).vs = Some(vs);
                                    prev = Some(ContentKind::Vs);
                                    debug!("--> vs = {:?}", t);
                                }
                            } else if prev == Some(ContentKind::Book) {
                                let cur_bk = crng.side(side).bk.clone().unwrap_or_default();
                                if self.chapters_in(&cur_bk) == 1 {
                                    debug!("one-chapter book = {:?}", cur_bk);
                                    let as_verse = !is_one(&t)
                                        || following == Some(&Token::Sep('-'))
                                        || following == Some(&Token::Sep(','));
                                    // "1" before a '.' still reads as a chapter
                                    if is_one(&t) && following == Some(&Token::Sep('.')) {
                                        crng.side_mut(side).ch = Some(t.clone());
                                        prev = Some(ContentKind::Ch);
                                    } else if as_verse {
                                        let vs = self.resolve_vs(&crng, &t);
                                        crng.side_mut(side).vs = Some(vs);
                                        prev = Some(ContentKind::Vs);
                                        debug!("--> vs = {:?}", t);
                                    } else {
                                        let ch = self.resolve_ch(&crng, &t);
                                        crng.side_mut(side).ch = Some(ch);
                                        prev = Some(ContentKind::Ch);
                                        debug!("--> ch = {:?}", t);
                                    }
                                } else {
                                    let ch = self.resolve_ch(&crng, &t);
                                    crng.side_mut(side).ch = Some(ch);
                                    prev = Some(ContentKind::Ch);
                                    debug!("--> ch = {:?}", t);
                                }
                            }
                        }
                        Expect::Ch => {
                            let ch = self.resolve_ch(&crng, &t);
                            crng.side_mut(side).ch = Some(ch);
                            prev = Some(ContentKind::Ch);
                            debug!("--> ch = {:?}", t);
                        }
                        Expect::Vs => {
                            // a book name can follow a verse separator:
                            // "Gen 34:8, Deut"
                            if let Some(found) = self.match_book(&t) {
                                book = Some(found);
                                let cref = crng.side_mut(side);
                                cref.bk = Some(found.name.clone());
                                cref.id = Some(found.id);
                                cref.ch = None;
                                cref.vs = None;
                                prev = Some(ContentKind::Book);
                                debug!("--> book = {:?}", found.name);
                            } else {
                                let vs = self.resolve_vs(&crng, &t);
                                crng.side_mut(side).vs = Some(vs);
                                prev = Some(ContentKind::Vs);
                                debug!("--> vs = {:?}", t);
                            }
                        }
                        Expect::Sep => {}
                    }

                    expect = Expect::Sep;
                }
            }
        }

        // close out the last range
        self.commit_range(&mut crng, &mut reflist);

        reflist
    }

    /// Format under normalized defaults, then re-fold through the
    /// normalizer. The result parses back to the same list and is suitable
    /// as a canonical identifier.
    #[must_use]
    pub fn refstring(&self, list: &RefList) -> String {
        normalize(&self.format(list, &crate::FormatOptions::default()))
    }

    /// The integer-ID shortcut: a string of nine-digit sort keys (trailing
    /// zero triplets truncated for whole chapters and books) separated by
    /// `,` for instances and `-` for ranges, reconstructed into a reference
    /// string.
    #[must_use]
    pub fn refstr_from_ids(&self, ids: &str) -> String {
        let range_refstrs: Vec<String> = ids
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|range_id| {
                range_id
                    .split('-')
                    .filter(|s| !s.trim().is_empty())
                    .map(|rid| self.refstr_from_id(rid.trim()))
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect();
        self.refstring(&self.parse(&range_refstrs.join(";"), None))
    }

    fn refstr_from_id(&self, id: &str) -> String {
        static NONDIGIT_EDGES: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(^[^\d]+|[^\d]+$)").unwrap());

        let mut idstr = NONDIGIT_EDGES.replace_all(id, "").to_string();
        idstr = idstr.replace("000000", "");
        for _ in 0..2 {
            if idstr.len() > 3 && idstr.ends_with("000") {
                idstr.truncate(idstr.len() - 3);
            }
        }

        if idstr.len() < 4 {
            let key = format!("{:0>3}001001", idstr);
            let r = Ref::from_key(&key, &self.canon);
            r.name.unwrap_or_default()
        } else if idstr.len() < 7 {
            let key = format!("{:0>6}001", idstr);
            let r = Ref::from_key(&key, &self.canon);
            format!("{}.{}", r.name.unwrap_or_default(), r.ch.unwrap_or(0))
        } else {
            let key = format!("{:0>9}", idstr);
            let r = Ref::from_key(&key, &self.canon);
            format!(
                "{}.{}.{}",
                r.name.unwrap_or_default(),
                r.ch.unwrap_or(0),
                r.vs.unwrap_or(0)
            )
        }
    }

    // "F" means the next chapter, "FF" the last chapter of the current book.
    fn resolve_ch(&self, crng: &DraftRange, token: &str) -> String {
        match token {
            "F" => {
                let ch = crng.start.ch.as_deref().and_then(clean_int).unwrap_or(0);
                ch.saturating_add(1).to_string()
            }
            "FF" => {
                let bk = crng.start.bk.as_deref().unwrap_or("");
                self.chapters_in(bk).to_string()
            }
            _ => token.to_string(),
        }
    }

    // "F" means the next verse, "FF" the last verse of the current chapter.
    fn resolve_vs(&self, crng: &DraftRange, token: &str) -> String {
        match token {
            "F" => {
                let vs = crng.start.vs.as_deref().and_then(clean_int).unwrap_or(0);
                vs.saturating_add(1).to_string()
            }
            "FF" => {
                let bk = crng.start.bk.as_deref().unwrap_or("");
                let ch = crng.start.ch.as_deref().and_then(clean_int).unwrap_or(1);
                self.verses_in(bk, ch).to_string()
            }
            _ => token.to_string(),
        }
    }

    // Complete the range in place, then append it unless it never acquired a
    // book. The in-place fill matters: a following reference copies its book
    // and chapter from the completed sides.
    fn commit_range(&self, crng: &mut DraftRange, list: &mut RefList) {
        self.fill_range(crng);
        if let Some(range) = self.finish_range(crng) {
            debug!("--> append range = {}", range);
            list.push(range);
        }
    }

    // Fill in whichever sides of the range the input left unspecified, using
    // the canon's structure. Exhaustive over the completeness of (start, end).
    fn fill_range(&self, rng: &mut DraftRange) {
        debug!("fill range: {:?}", rng);

        let start_bk = match rng.start.bk.clone() {
            Some(bk) => bk,
            None => return, // nameless ranges are discarded by the caller
        };
        if let Some(found) = self.canon.book_by_name(&start_bk) {
            rng.start.id = Some(found.id);
        }

        if rng.start.ch.is_some() {
            if rng.start.vs.is_some() {
                if rng.end.vs.is_none() {
                    if rng.end.ch.is_none() {
                        if rng.end.bk.is_none() {
                            // start is full, end is empty: a single verse
                            rng.end.bk = rng.start.bk.clone();
                            rng.end.id = rng.start.id;
                            rng.end.ch = rng.start.ch.clone();
                            rng.end.vs = rng.start.vs.clone();
                        } else {
                            // the range runs to the end of the second book
                            let bk = rng.end.bk.clone().unwrap_or_default();
                            let last_ch = self.chapters_in(&bk);
                            rng.end.ch = Some(last_ch.to_string());
                            rng.end.vs = Some(self.verses_in(&bk, last_ch).to_string());
                        }
                    } else {
                        // same book, to the end of the named chapter; the
                        // finish step fills the chapter's last verse
                        rng.end.bk = rng.start.bk.clone();
                    }
                } else {
                    // verses either within or between chapters
                    if rng.end.ch.is_none() {
                        rng.end.ch = rng.start.ch.clone();
                    }
                    if rng.end.bk.is_none() {
                        rng.end.bk = rng.start.bk.clone();
                    }
                }
            } else {
                // a whole chapter or a range of chapters
                rng.start.wholech = true;
                rng.start.vs = Some("1".to_string());
                if rng.end.bk.is_none() {
                    rng.end.bk = rng.start.bk.clone();
                    if rng.end.ch.is_none() {
                        rng.end.ch = rng.start.ch.clone();
                    }
                } else if rng.end.ch.is_none() {
                    let bk = rng.end.bk.clone().unwrap_or_default();
                    rng.end.ch = Some(self.chapters_in(&bk).to_string());
                }
                if rng.end.vs.is_none() {
                    let bk = rng.end.bk.clone().unwrap_or_default();
                    let ch = rng.end.ch.as_deref().and_then(clean_int).unwrap_or(0);
                    rng.end.vs = Some(self.verses_in(&bk, ch).to_string());
                }
            }
        } else if rng.start.vs.is_some() {
            // a verse or range in a one-chapter book
            rng.start.ch = Some("1".to_string());
            if rng.end.bk.is_none() {
                rng.end.bk = rng.start.bk.clone();
            }
            if rng.end.ch.is_none() {
                rng.end.ch = rng.start.ch.clone();
            }
            if rng.end.vs.is_none() {
                rng.end.vs = rng.start.vs.clone();
            }
        } else {
            // a whole book or a range of books
            rng.start.ch = Some("1".to_string());
            rng.start.vs = Some("1".to_string());
            if rng.end.bk.is_none() {
                rng.end.bk = rng.start.bk.clone();
            }
            if rng.end.ch.is_none() {
                let bk = rng.end.bk.clone().unwrap_or_default();
                rng.end.ch = Some(self.chapters_in(&bk).to_string());
            }
            if rng.end.vs.is_none() {
                let bk = rng.end.bk.clone().unwrap_or_default();
                let ch = rng.end.ch.as_deref().and_then(clean_int).unwrap_or(0);
                rng.end.vs = Some(self.verses_in(&bk, ch).to_string());
            }
        }

        debug!("filled range: {:?}", rng);
    }

    // Coerce the filled draft into a `RefRange` with integer chapter and
    // verse on both sides, extracting any vsub letter suffix.
    fn finish_range(&self, rng: &DraftRange) -> Option<RefRange> {
        let start_bk = rng.start.bk.clone()?;
        let start_id = rng
            .start
            .id
            .or_else(|| self.match_book(&start_bk).map(|b| b.id));

        let start_ch = rng.start.ch.as_deref().and_then(clean_int).unwrap_or(1);
        let end_ch = rng
            .end
            .ch
            .as_deref()
            .and_then(clean_int)
            .unwrap_or_else(|| self.chapters_in(&start_bk));

        let (start_vs, start_vsub) = split_vs(rng.start.vs.as_deref());
        let (end_vs, end_vsub) = split_vs(rng.end.vs.as_deref());
        let start_vs = start_vs.unwrap_or(1);

        let end_bk = rng.end.bk.clone();
        let end_vs = end_vs
            .unwrap_or_else(|| self.verses_in(end_bk.as_deref().unwrap_or(""), end_ch));
        let end_id = rng.end.id.or(start_id);

        Some(RefRange {
            start: Ref {
                id: start_id,
                name: Some(start_bk),
                ch: Some(start_ch),
                vs: Some(start_vs),
                vsub: start_vsub,
                wholech: rng.start.wholech,
            },
            end: Ref {
                id: end_id,
                name: end_bk,
                ch: Some(end_ch),
                vs: Some(end_vs),
                vsub: end_vsub,
                wholech: rng.end.wholech,
            },
        })
    }
}

fn tokenize(refstring: &str) -> Vec<Token> {
    let mut tokens = vec![];
    let mut current = String::new();
    let mut chars = refstring.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' | ',' | ';' | '-' => {
                if !current.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut current)));
                }
                tokens.push(Token::Sep(c));
                // a delimiter may carry one trailing space
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Text(current));
    }
    tokens
}

// Rewrites numeric tokens carrying an "f"/"ff" continuation suffix into the
// synthetic sequence `<number> - F` / `<number> - FF`, back to front so the
// insertions do not disturb unvisited indices.
fn expand_continuations(tokens: &mut Vec<Token>) {
    let mut i = tokens.len();
    while i > 1 {
        i -= 1;
        if let Token::Text(t) = &tokens[i] {
            if let Some(caps) = NUM_CONTINUATION.captures(t) {
                let number = caps[1].to_string();
                let marker = if caps[2].len() == 2 { "FF" } else { "F" };
                tokens[i] = Token::Text(number);
                tokens.insert(i + 1, Token::Sep('-'));
                tokens.insert(i + 2, Token::Text(marker.to_string()));
            }
        }
    }
}

// Whether a chapter/verse token reads as the number one, zero padding
// included ("1", "001") but letter suffixes excluded ("1a").
fn is_one(token: &str) -> bool {
    token.trim_start_matches('0') == "1"
}

// First run of digits in the string, if it fits a usize.
fn clean_int(intstr: &str) -> Option<usize> {
    static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());
    DIGITS
        .find(intstr)
        .and_then(|m| m.as_str().parse().ok())
}

// Split a raw verse string into its number and any letter suffix ("15a").
// A string with no digits yields neither.
fn split_vs(vs: Option<&str>) -> (Option<usize>, Option<String>) {
    static VSUB: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9\W]+$").unwrap());

    match vs {
        None => (None, None),
        Some(s) => {
            let number = clean_int(s);
            let vsub = match (number, VSUB.find(s)) {
                (Some(_), Some(m)) => Some(m.as_str().to_string()),
                _ => None,
            };
            (number, vsub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn eng_parser() -> RefParser {
        RefParser::new(testutil::eng_canon())
    }

    fn spans(list: &RefList) -> Vec<(String, String)> {
        fn span(r: &Ref) -> String {
            format!(
                "{} {}:{}{}",
                r.name.as_deref().unwrap_or(""),
                r.ch.unwrap_or(0),
                r.vs.unwrap_or(0),
                r.vsub.as_deref().unwrap_or("")
            )
        }
        list.iter()
            .map(|r| (span(&r.start), span(&r.end)))
            .collect()
    }

    macro_rules! parse_tests {
        ($($name:ident: $input:expr => [$(($start:expr, $end:expr)),*],)*) => {
        $(
            #[test]
            fn $name() {
                let parser = eng_parser();
                let list = parser.parse($input, None);
                let expected: Vec<(String, String)> =
                    vec![$(($start.to_string(), $end.to_string())),*];
                assert_eq!(spans(&list), expected, "for input {:?}", $input);
            }
        )*
        }
    }

    parse_tests! {
        single_verse: "Gen 1:1" => [("Gen 1:1", "Gen 1:1")],
        whole_chapter: "Gen 1" => [("Gen 1:1", "Gen 1:31")],
        whole_book: "Gen" => [("Gen 1:1", "Gen 50:26")],
        comma_separates_whole_chapters: "Ps 24, 26; 28:8-10" =>
            [("Ps 24:1", "Ps 24:10"), ("Ps 26:1", "Ps 26:12"), ("Ps 28:8", "Ps 28:10")],
        chapter_range_then_verses: "Gen 1 - 2:5, 7, 9-10" =>
            [("Gen 1:1", "Gen 2:5"), ("Gen 2:7", "Gen 2:7"), ("Gen 2:9", "Gen 2:10")],
        whole_book_range: "Gen - Rev" => [("Gen 1:1", "Rev 22:21")],
        one_chapter_book_alone: "3Jn" => [("3Jn 1:1", "3Jn 1:15")],
        cross_book_chapters: "1Kgs 21-2Kgs 22" => [("1Kgs 21:1", "2Kgs 22:20")],
        padded_numeric_form: "2Jn.001.001 - Jude.001.025" => [("2Jn 1:1", "Jude 1:25")],
        song_title_folds: "Song of Songs 7.1 - 8.5" => [("Song 7:1", "Song 8:5")],
        books_by_comma: "Gen, Exod" =>
            [("Gen 1:1", "Gen 50:26"), ("Exod 1:1", "Exod 40:38")],
        book_then_chapter: "Gen, Exod 1" =>
            [("Gen 1:1", "Gen 50:26"), ("Exod 1:1", "Exod 1:22")],
        book_to_chapter_range: "Gen - Exod 1" => [("Gen 1:1", "Exod 1:22")],
        chapter_list: "Gen 1, 2" => [("Gen 1:1", "Gen 1:31"), ("Gen 2:1", "Gen 2:25")],
        chapter_range: "Gen 1 - 2" => [("Gen 1:1", "Gen 2:25")],
        verse_range_elided_chapter: "Gen 1:1 - 2" => [("Gen 1:1", "Gen 1:2")],
        verse_to_verse_across_chapters: "Gen 1:1 - 2:5" => [("Gen 1:1", "Gen 2:5")],
        chapter_to_verse: "Gen 1 - 2:5" => [("Gen 1:1", "Gen 2:5")],
        one_chapter_book_verse_range: "Obad 1-2" => [("Obad 1:1", "Obad 1:2")],
        one_chapter_book_explicit: "3Jn 1:1-4" => [("3Jn 1:1", "3Jn 1:4")],
        one_chapter_book_bare_one: "3Jn 1" => [("3Jn 1:1", "3Jn 1:15")],
        range_to_whole_book: "Gen 34:8-Deut" => [("Gen 34:8", "Deut 34:12")],
        book_after_comma_verse: "Gen 34:8, Deut" =>
            [("Gen 34:8", "Gen 34:8"), ("Deut 1:1", "Deut 34:12")],
        book_after_semicolon_verse: "Gen 34:8; Deut" =>
            [("Gen 34:8", "Gen 34:8"), ("Deut 1:1", "Deut 34:12")],
        one_chapter_book_verse_list: "Obad 1,3" =>
            [("Obad 1:1", "Obad 1:1"), ("Obad 1:3", "Obad 1:3")],
        comma_after_chapter: "Gen 1,3" =>
            [("Gen 1:1", "Gen 1:31"), ("Gen 3:1", "Gen 3:24")],
        comma_after_verse: "Gen 1:1,3" =>
            [("Gen 1:1", "Gen 1:1"), ("Gen 1:3", "Gen 1:3")],
        semicolon_after_verse: "Gen 1:1;3" =>
            [("Gen 1:1", "Gen 1:1"), ("Gen 3:1", "Gen 3:24")],
        one_chapter_book_semicolon: "Obad 1;3" =>
            [("Obad 1:1", "Obad 1:21"), ("Obad 1:3", "Obad 1:3")],
        one_chapter_then_multi: "Obad 1-3; 1Jn 5" =>
            [("Obad 1:1", "Obad 1:3"), ("1Jn 5:1", "1Jn 5:21")],
        chapter_range_across_books: "Gen 50 - Exod 1" => [("Gen 50:1", "Exod 1:22")],
        coordinate_books: "1,2Sam" => [("1Sam 1:1", "2Sam 24:25")],
        ordinal_words: "First John 3:16" => [("1Jn 3:16", "1Jn 3:16")],
        chapter_word: "Gen chapter 3" => [("Gen 3:1", "Gen 3:24")],
        verse_continuation: "Gen 3:15f" => [("Gen 3:15", "Gen 3:16")],
        verse_continuation_to_end: "Gen 3:15ff" => [("Gen 3:15", "Gen 3:24")],
        chapter_continuation: "Gen 3f" => [("Gen 3:1", "Gen 4:26")],
        chapter_continuation_to_end: "Gen 3ff" => [("Gen 3:1", "Gen 50:26")],
        vsub_suffixes: "Gen 3:15a-17b" => [("Gen 3:15a", "Gen 3:17b")],
        not_a_reference: "Something 1:5" => [],
        prose: "this is not a reference" => [],
        unknown_book_after_semicolon: "Gen; Xyzzy 4" => [("Gen 1:1", "Gen 50:26")],
    }

    #[test]
    fn numeric_ids_resolve_through_key_codec() {
        let parser = eng_parser();
        assert_eq!(
            spans(&parser.parse("001003015", None)),
            vec![("Gen 3:15".to_string(), "Gen 3:15".to_string())]
        );
        assert_eq!(
            spans(&parser.parse("001001-001002", None)),
            vec![("Gen 1:1".to_string(), "Gen 2:25".to_string())]
        );
        assert_eq!(
            spans(&parser.parse("031,066", None)),
            vec![
                ("Obad 1:1".to_string(), "Obad 1:21".to_string()),
                ("Rev 1:1".to_string(), "Rev 22:21".to_string())
            ]
        );
    }

    #[test]
    fn book_hint_supplies_the_book() {
        let parser = eng_parser();
        assert_eq!(
            spans(&parser.parse("3:16", Some("John"))),
            vec![("John 3:16".to_string(), "John 3:16".to_string())]
        );
    }

    #[test]
    fn book_hint_is_ignored_when_input_names_a_book() {
        let parser = eng_parser();
        for hint in &[None, Some("Rev"), Some("Obad"), Some("nonsense")] {
            assert_eq!(
                parser.parse("Gen 3:15-17", *hint),
                parser.parse("Gen 3:15-17", None)
            );
        }
    }

    #[test]
    fn unknown_hint_yields_empty() {
        let parser = eng_parser();
        assert!(parser.parse("5:3", Some("Nonsense")).is_empty());
        assert!(parser.parse("5:3", None).is_empty());
    }

    #[test]
    fn parse_is_total_on_garbage() {
        let parser = eng_parser();
        for garbage in &[
            "",
            "%%%",
            "....",
            ";;;;",
            "-",
            "f",
            "ff",
            "\u{2014}\u{2013}",
            "999999999999999999999999",
            "Gen \u{0}\u{1}",
            "1,2,3,4,5-6-7-8",
        ] {
            let _ = parser.parse(garbage, None);
            let _ = parser.parse(garbage, Some("Gen"));
        }
    }

    #[test]
    fn outputs_are_complete_and_ordered() {
        let parser = eng_parser();
        let inputs = [
            "Gen 1:1",
            "Gen 1 - 2:5, 7, 9-10",
            "Ps 24, 26; 28:8-10",
            "Gen - Rev",
            "Obad 1-3; 1Jn 5",
            "Gen 34:8; Deut",
            "3Jn",
            "Gen 3:15ff",
        ];
        for input in &inputs {
            for range in parser.parse(input, None).iter() {
                for r in [&range.start, &range.end] {
                    assert!(r.id.is_some(), "id missing for {:?}", input);
                    assert!(r.name.is_some(), "name missing for {:?}", input);
                    assert!(r.ch.unwrap_or(0) > 0, "bad ch for {:?}", input);
                    assert!(r.vs.unwrap_or(0) > 0, "bad vs for {:?}", input);
                }
                assert!(range.start <= range.end, "unordered range for {:?}", input);
            }
        }
    }

    #[test]
    fn refstring_round_trips() {
        let parser = eng_parser();
        let inputs = [
            "Gen 1:1",
            "Gen 1",
            "Gen",
            "Ps 24, 26; 28:8-10",
            "Gen 1 - 2:5, 7, 9-10",
            "Gen - Rev",
            "1Kgs 21-2Kgs 22",
            "Obad 1-3; 1Jn 5",
            "Gen 34:8; Deut",
            "Exod 3:2-Lev 4:5",
        ];
        for input in &inputs {
            let list = parser.parse(input, None);
            assert!(!list.is_empty(), "parse failed for {:?}", input);
            let refstr = parser.refstring(&list);
            assert_eq!(
                parser.parse(&refstr, None),
                list,
                "round trip failed for {:?} via {:?}",
                input,
                refstr
            );
        }
    }

    #[test]
    fn match_book_prefers_exact_then_pattern() {
        let parser = eng_parser();
        assert_eq!(parser.match_book("Gen").map(|b| b.id), Some(1));
        assert_eq!(parser.match_book("Genesis").map(|b| b.id), Some(1));
        assert_eq!(parser.match_book("GENESIS").map(|b| b.id), Some(1));
        assert_eq!(parser.match_book("Judges").map(|b| b.name.as_str()), Some("Judg"));
        assert_eq!(parser.match_book("Jude").map(|b| b.name.as_str()), Some("Jude"));
        assert_eq!(parser.match_book("Philemon").map(|b| b.name.as_str()), Some("Phlm"));
        assert_eq!(parser.match_book("Philippians").map(|b| b.name.as_str()), Some("Phil"));
        assert!(parser.match_book("Something").is_none());
        assert!(parser.match_book("7").is_none());
        assert!(parser.match_book("").is_none());
    }

    #[test]
    fn structure_lookups_clamp() {
        let parser = RefParser::new(testutil::tiny_canon());
        assert_eq!(parser.chapters_in("Gen"), 4);
        assert_eq!(parser.chapters_in("Nope"), 0);
        assert_eq!(parser.verses_in("Gen", 1), 31);
        assert_eq!(parser.verses_in("Gen", 4), 26);
        // one past the end is out of range, not an index error
        assert_eq!(parser.verses_in("Gen", 5), 0);
        assert_eq!(parser.verses_in("Gen", 0), 0);
        assert_eq!(parser.verses_in("Nope", 1), 0);
    }

    #[test]
    fn whole_chapter_marks_start() {
        let parser = eng_parser();
        let list = parser.parse("Gen 3", None);
        let range = list.iter().next().unwrap();
        assert!(range.start.wholech);
        assert_eq!(range.start.key(), "001003000");
    }
}
