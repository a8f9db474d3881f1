use crate::Canon;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::Serialize;
use std::{cmp, fmt, hash};

/// A single locus in a canon. Every field is individually optional; the
/// parser emits `Ref`s with `name`, `id`, `ch`, and `vs` resolved.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct Ref {
    /// 1-based book ordinal, copied from the canon.
    pub id: Option<usize>,
    /// Short book name, e.g. "Gen".
    pub name: Option<String>,
    /// Chapter number, 1-based.
    pub ch: Option<usize>,
    /// Verse number, 1-based.
    pub vs: Option<usize>,
    /// Letter suffix for a sub-verse subdivision, e.g. "a".
    pub vsub: Option<String>,
    /// Marks a reference standing for a full chapter. Zeroes the verse
    /// component of the sort key so whole chapters sort before their verses.
    pub wholech: bool,
}

impl Ref {
    /// The fixed-width sort key: three zero-padded 3-digit fields for book
    /// id, chapter, and verse, followed by any `vsub` suffix. Absent numeric
    /// fields contribute `000`; a missing id falls back to the book name.
    #[must_use]
    pub fn key(&self) -> String {
        let mut k = String::new();
        match (self.id, &self.name) {
            (Some(id), _) => k.push_str(&format!("{:03}", id)),
            (None, Some(name)) => k.push_str(name),
            (None, None) => k.push_str("000"),
        }
        if self.wholech {
            k.push_str(&format!("{:03}000", self.ch.unwrap_or(0)));
        } else {
            k.push_str(&format!(
                "{:03}{:03}",
                self.ch.unwrap_or(0),
                self.vs.unwrap_or(0)
            ));
            if let Some(vsub) = &self.vsub {
                k.push_str(vsub);
            }
        }
        k
    }

    // Key with the whole-chapter flag ignored: the locus itself. Equality
    // uses this so that a whole-chapter reference compares equal to the
    // same span parsed back from its formatted form.
    fn locus_key(&self) -> String {
        let mut flat = self.clone();
        flat.wholech = false;
        flat.key()
    }

    /// Decode a compact key (`"003015007"` = book 3, chapter 15, verse 7)
    /// against a canon. Truncated keys of 6 or 3 digits denote a whole
    /// chapter or a whole book; a trailing letter suffix becomes `vsub`.
    /// Unrecognized input yields an empty `Ref`.
    #[must_use]
    pub fn from_key(key: &str, canon: &Canon) -> Self {
        static KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([A-Za-z]*)$").unwrap());

        let caps = match KEY.captures(key.trim()) {
            Some(caps) => caps,
            None => return Self::default(),
        };
        let digits = caps.get(1).map_or("", |m| m.as_str());
        let vsub = match caps.get(2) {
            Some(m) if !m.as_str().is_empty() => Some(m.as_str().to_string()),
            _ => None,
        };

        let id: Option<usize> = digits
            .get(..digits.len().min(3))
            .and_then(|d| d.parse().ok())
            .filter(|&id| id > 0);
        let ch: Option<usize> = field(digits, 3).filter(|&ch| ch > 0);
        let vs: Option<usize> = field(digits, 6).filter(|&vs| vs > 0);

        let name = id
            .and_then(|id| canon.book_by_id(id))
            .map(|b| b.name.clone());

        Self {
            id,
            name,
            ch,
            vs,
            vsub,
            wholech: ch.is_some() && vs.is_none(),
        }
    }
}

fn field(digits: &str, at: usize) -> Option<usize> {
    if digits.len() <= at {
        None
    } else {
        digits
            .get(at..digits.len().min(at + 3))
            .and_then(|d| d.parse().ok())
    }
}

impl fmt::Display for Ref {
    /// Normalized string form: `name.ch.vs[vsub]`, with `0` standing in for
    /// absent numerics.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let name = match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        };
        write!(
            f,
            "{}.{}.{}{}",
            name,
            self.ch.unwrap_or(0),
            self.vs.unwrap_or(0),
            self.vsub.as_deref().unwrap_or("")
        )
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.locus_key() == other.locus_key()
    }
}

impl Eq for Ref {}

impl PartialOrd for Ref {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ref {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

/// An inclusive pair of `Ref`s representing a closed interval over the
/// canon's linear order.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RefRange {
    pub start: Ref,
    pub end: Ref,
}

impl fmt::Display for RefRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl PartialOrd for RefRange {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RefRange {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // shorter ranges sort first when starts tie
        match self.start.cmp(&other.start) {
            cmp::Ordering::Equal => self.end.cmp(&other.end),
            comp => comp,
        }
    }
}

impl hash::Hash for RefRange {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.start.locus_key().hash(state);
        self.end.locus_key().hash(state);
    }
}

/// An ordered sequence of `RefRange`s in the order the author wrote them.
/// Never deduplicated, never sorted.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RefList(Vec<RefRange>);

impl RefList {
    #[must_use]
    pub fn new() -> Self {
        Self(vec![])
    }

    pub fn push(&mut self, range: RefRange) {
        self.0.push(range);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RefRange> {
        self.0.iter()
    }
}

impl IntoIterator for RefList {
    type Item = RefRange;
    type IntoIter = std::vec::IntoIter<RefRange>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RefList {
    type Item = &'a RefRange;
    type IntoIter = std::slice::Iter<'a, RefRange>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RefList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let ranges: Vec<String> = self.0.iter().map(RefRange::to_string).collect();
        write!(f, "[{}]", ranges.join(", "))
    }
}
