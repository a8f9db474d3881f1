use crate::normalize::normalize;
use crate::reference::{Ref, RefList};
use crate::{Book, RefParser};

/// Which book attribute the formatter prints.
#[derive(Debug, Clone, PartialEq)]
pub enum BookArg {
    /// The short key, e.g. "Gen".
    Name,
    /// The display title, e.g. "Genesis".
    Title,
    /// An extra attribute from the canon document, by key (localized titles
    /// and the like). Falls back to the title, then the short name.
    Attr(String),
}

/// Rendering options for [`RefParser::format`]. The defaults produce the
/// common citation style: `Gen 3:15-17; 4:2`, an en dash between chapters
/// and an em dash between books.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Emit book names at all.
    pub with_bk: bool,
    /// Which book attribute to print.
    pub bkarg: BookArg,
    /// Chapter-verse separator.
    pub cvsep: String,
    /// Book-chapter separator.
    pub bksep: String,
    /// Verse-range separator.
    pub vsrsep: String,
    /// Chapter-range separator.
    pub chrsep: String,
    /// Book-range separator.
    pub bkrsep: String,
    /// List separator within the same chapter.
    pub comma: String,
    /// List separator between chapters or books.
    pub semicolon: String,
    /// Emit each range as an anchor linking to `uri + qarg + <canonical key>`.
    pub html: bool,
    pub uri: String,
    pub qarg: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            with_bk: true,
            bkarg: BookArg::Name,
            cvsep: ":".to_string(),
            bksep: " ".to_string(),
            vsrsep: "-".to_string(),
            chrsep: "\u{2013}".to_string(),
            bkrsep: "\u{2014}".to_string(),
            comma: ", ".to_string(),
            semicolon: "; ".to_string(),
            html: false,
            uri: String::new(),
            qarg: "?bref=".to_string(),
        }
    }
}

impl RefParser {
    /// Render a `RefList` back into a user-facing string. Consecutive ranges
    /// in the same book or chapter elide the redundant prefix. The list is
    /// not mutated or reordered.
    #[must_use]
    pub fn format(&self, list: &RefList, opts: &FormatOptions) -> String {
        let mut currbk: Option<String> = None;
        let mut currch: Option<usize> = None;
        let mut currvs: Option<usize> = None;
        let mut out = String::new();

        for range in list {
            let start = &range.start;
            let end = &range.end;

            // "Psalm 40", never "Psalms 40": singularize the title when the
            // whole range sits inside one chapter
            let singular = self.book_for(start).map_or(false, |b| b.title == "Psalms")
                && start.name == end.name
                && start.ch == end.ch;

            let start_name = start.name.clone().unwrap_or_default();
            let svsub = vsub_str(start);
            let startrefstr =
                if currbk.as_deref() == Some(start_name.as_str()) || !opts.with_bk {
                    if currch == start.ch {
                        format!("{}{}{}", opts.comma, num(start.vs), svsub)
                    } else {
                        if !out.is_empty() {
                            out.push_str("; ");
                        }
                        format!("{}{}{}{}", num(start.ch), opts.cvsep, num(start.vs), svsub)
                    }
                } else {
                    if !out.is_empty() {
                        out.push_str(&opts.semicolon);
                    }
                    format!(
                        "{}{}{}{}{}{}",
                        self.book_attr(start, opts, singular),
                        opts.bksep,
                        num(start.ch),
                        opts.cvsep,
                        num(start.vs),
                        svsub
                    )
                };

            currbk = Some(start_name.clone());
            currch = start.ch;
            currvs = start.vs;

            let end_name = end.name.clone().unwrap_or_default();
            let evsub = vsub_str(end);
            let endrefstr = if currbk.as_deref() == Some(end_name.as_str()) || !opts.with_bk
            {
                if currch == end.ch {
                    if currvs == end.vs {
                        String::new()
                    } else {
                        format!("{}{}{}", opts.vsrsep, num(end.vs), evsub)
                    }
                } else {
                    format!(
                        "{}{}{}{}{}",
                        opts.chrsep,
                        num(end.ch),
                        opts.cvsep,
                        num(end.vs),
                        evsub
                    )
                }
            } else {
                format!(
                    "{}{}{}{}{}{}{}",
                    opts.bkrsep,
                    self.book_attr(end, opts, singular),
                    opts.bksep,
                    num(end.ch),
                    opts.cvsep,
                    num(end.vs),
                    evsub
                )
            };

            if opts.html {
                let term = normalize(&format!(
                    "{}.{}.{}{}",
                    start_name,
                    num(start.ch),
                    num(start.vs),
                    endrefstr
                ));
                out.push_str(&format!(
                    "<a href='{}{}{}'>{}{}</a>",
                    opts.uri, opts.qarg, term, startrefstr, endrefstr
                ));
            } else {
                out.push_str(&startrefstr);
                out.push_str(&endrefstr);
            }
        }

        out
    }

    fn book_for(&self, r: &Ref) -> Option<&Book> {
        r.id.and_then(|id| self.canon().book_by_id(id))
            .or_else(|| r.name.as_deref().and_then(|n| self.canon().book_by_name(n)))
    }

    fn book_attr(&self, r: &Ref, opts: &FormatOptions, singular: bool) -> String {
        let book = self.book_for(r);
        let name = r
            .name
            .clone()
            .or_else(|| book.map(|b| b.name.clone()))
            .unwrap_or_default();
        match &opts.bkarg {
            BookArg::Name => name,
            BookArg::Title => {
                let title = book.map_or(name, |b| b.title.clone());
                if singular && title == "Psalms" {
                    "Psalm".to_string()
                } else {
                    title
                }
            }
            BookArg::Attr(key) => book
                .and_then(|b| b.extra.get(key).cloned())
                .or_else(|| book.map(|b| b.title.clone()))
                .unwrap_or(name),
        }
    }
}

fn num(n: Option<usize>) -> String {
    n.unwrap_or(0).to_string()
}

// vsub should be a letter only
fn vsub_str(r: &Ref) -> String {
    r.vsub
        .as_deref()
        .map_or(String::new(), |v| v.trim_matches('_').to_string())
}
