use crate::RefParser;
use regex::Regex;

const CH_PAT: &str = r"(?:[1-9][0-9]*[a-f]{0,2}\b)";
const VS_PAT: &str = r"(?:[.:][1-9][0-9]*[a-f]{0,2}\b)";
const SEP_PAT: &str = r"\s*[,;\-\u{2013}\u{2014}]\s*";

/// Recognizes reference spans inside running text and wraps each one in a
/// `<ref name="...">` element, where the name is the canonical refstring of
/// the span. Spans that do not resolve against the canon are left alone.
///
/// The catalog of patterns is rebuilt per canon from its book patterns, so a
/// tagger is only as multilingual as the canon it was built from.
pub struct RefTagger<'a> {
    parser: &'a RefParser,
    catalog: Vec<Regex>,
}

impl<'a> RefTagger<'a> {
    /// Build the pattern catalog for the parser's canon.
    ///
    /// The catalog has two kinds of entries: the full pattern (book name
    /// followed by chapter/verse sequences, possibly continuing across
    /// punctuation) and the "chapter(s)"/"chap."/"ch." word patterns, whose
    /// spans carry no book of their own and only resolve under a book hint.
    #[must_use]
    pub fn new(parser: &'a RefParser) -> Self {
        let alternatives: Vec<&str> = parser
            .canon()
            .books
            .iter()
            .filter_map(|b| b.pattern.as_deref())
            .collect();
        let bk_pat = format!(r"(?:(?:{})\.?)", alternatives.join("|"));

        let full = format!(
            r"\b{bk}\s*{ch}{vs}?(?:{sep}{bk}?\s*{ch}{vs}?)*",
            bk = bk_pat,
            ch = CH_PAT,
            vs = VS_PAT,
            sep = SEP_PAT
        );
        let chapter_words = [
            format!(r"\b[Cc]hapters?\s*{ch}(?:{sep}{ch})*", ch = CH_PAT, sep = SEP_PAT),
            format!(r"\b[Cc]haps?\.?\s*{ch}(?:{sep}{ch})*", ch = CH_PAT, sep = SEP_PAT),
            format!(r"\b[Cc]hs?\.?\s*{ch}(?:{sep}{ch})*", ch = CH_PAT, sep = SEP_PAT),
        ];

        let mut catalog = vec![];
        for pattern in std::iter::once(&full).chain(chapter_words.iter()) {
            if let Ok(regex) = Regex::new(pattern) {
                catalog.push(regex);
            }
        }

        Self { parser, catalog }
    }

    /// Tag every recognized span in `text`. A `bk` hint carries into the
    /// parse of each span, which is what lets bare "chapter 5" spans
    /// resolve.
    #[must_use]
    pub fn tag_text(&self, text: &str, bk: Option<&str>) -> String {
        let mut out = text.to_string();
        for regex in &self.catalog {
            out = regex
                .replace_all(&out, |caps: &regex::Captures| {
                    let span = &caps[0];
                    let list = self.parser.parse(span, bk);
                    if list.is_empty() {
                        span.to_string()
                    } else {
                        format!(
                            "<ref name=\"{}\">{}</ref>",
                            self.parser.refstring(&list),
                            span
                        )
                    }
                })
                .to_string();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn eng_parser() -> RefParser {
        RefParser::new(testutil::eng_canon())
    }

    #[test]
    fn tags_references_in_prose() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        assert_eq!(
            tagger.tag_text("See Gen 3:15-17 for details.", None),
            "See <ref name=\"Gen.3.15-17\">Gen 3:15-17</ref> for details."
        );
    }

    #[test]
    fn tags_multiple_references() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        assert_eq!(
            tagger.tag_text("Compare Gen 3:15 with Exod 1:1.", None),
            "Compare <ref name=\"Gen.3.15\">Gen 3:15</ref> with \
             <ref name=\"Exod.1.1\">Exod 1:1</ref>."
        );
    }

    #[test]
    fn grammatical_comma_stays_outside_the_span() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        assert_eq!(
            tagger.tag_text("I read Ephesians 4:28, and it changed everything.", None),
            "I read <ref name=\"Eph.4.28\">Ephesians 4:28</ref>, and it changed everything."
        );
    }

    #[test]
    fn reference_comma_stays_inside_the_span() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        assert_eq!(
            tagger.tag_text("see Eph 4:28,30 on work", None),
            "see <ref name=\"Eph.4.28,30\">Eph 4:28,30</ref> on work"
        );
    }

    #[test]
    fn chapter_word_resolves_under_a_hint() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        assert_eq!(
            tagger.tag_text("see chapter 5 for more", Some("Gen")),
            "see <ref name=\"Gen.5.1-32\">chapter 5</ref> for more"
        );
        // without a hint the span cannot resolve and stays bare
        assert_eq!(
            tagger.tag_text("see chapter 5 for more", None),
            "see chapter 5 for more"
        );
    }

    #[test]
    fn plain_numbers_are_not_tagged() {
        let parser = eng_parser();
        let tagger = RefTagger::new(&parser);
        for text in &[
            "in 1984 he wrote three books",
            "the meeting is at 3:30",
            "no references here",
        ] {
            assert_eq!(tagger.tag_text(text, None), *text);
        }
    }
}
