//! Folds the many written orthographies of a reference string into the
//! canonical delimiter alphabet:
//!
//! - `,` separates references, hinting at a verse break
//! - `;` separates references, hinting at a chapter or book break
//! - `.` separates book, chapter, and verse
//! - `-` separates the two sides of a range

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EDGE_NONWORD: Regex = Regex::new(r"(^\W+|\W+$)").unwrap();
    static ref BRACKETS: Regex = Regex::new(r"[()\[\]{}<>]").unwrap();
    static ref ORDINAL_JOIN: Regex = Regex::new(r"([123])\s+([A-Za-z])").unwrap();
    static ref FIRST: Regex = Regex::new(r"(?i)first\s*").unwrap();
    static ref SECOND: Regex = Regex::new(r"(?i)second\s*").unwrap();
    static ref THIRD: Regex = Regex::new(r"(?i)third\s*").unwrap();
    static ref SONG_TITLE: Regex = Regex::new(r"Song\.[^0-9]*").unwrap();
    static ref HEADING: Regex = Regex::new(r"(?i),\s*(?:heading|title)").unwrap();
    static ref LEADING_THE: Regex = Regex::new(r"^The\W+").unwrap();
    static ref COORD_COMMA: Regex = Regex::new(r"^(\d+),(\d+)(\w+)").unwrap();
    static ref COORD_DASH: Regex = Regex::new(r"^(\d+)-(\d+)(\D+)").unwrap();
}

const HYPHEN_ENTITIES: [&str; 9] = [
    "&#150;", "&#151;", "&#8211;", "&#8212;", "&#x2010;", "&#x2011;", "&#x2012;", "&#x2013;",
    "&#x2014;",
];

const HYPHEN_CHARS: [char; 7] = [
    '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{96}', '\u{97}',
];

/// Normalize a raw reference string. Total on all inputs; a string that is
/// not a reference simply normalizes to something the parser will reject.
///
/// Beware: the substitutions are aggressive and intended for reference
/// strings, not prose. In particular `"and"` is replaced as a plain
/// substring, and the ordinal words first/second/third become digits
/// wherever they occur.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut s = EDGE_NONWORD.replace_all(raw, "").to_string();
    s = BRACKETS.replace_all(&s, "").to_string();
    s = s.trim().to_string();
    s = s
        .trim_matches(|c| matches!(c, '-' | ',' | ';' | '.'))
        .to_string();
    s = s.replace("and", ",");
    s = s.replace("; ", ";");
    s = s.replace(':', ".");
    s = s.replace('_', " ");
    s = s.replace('\\', "");
    s = s.replace("&#160;", " ");
    s = s.replace('\u{a0}', " ");
    s = s.replace('\t', " ");
    for entity in &HYPHEN_ENTITIES {
        s = s.replace(entity, "-");
    }
    for c in &HYPHEN_CHARS {
        s = s.replace(*c, "-");
    }
    s = s.replace('\r', ";");
    s = s.replace('\n', ";");
    s = s.replace(" -", "-");
    s = s.replace("- ", "-");
    s = collapse_runs(&s, &[';', '-', ' ', '.', ',']);
    s = s.replace(" ,", ",");
    s = s.replace(", ", ",");
    s = s.replace(" ;", ";");
    s = s.replace("; ", ";");
    s = ORDINAL_JOIN.replace_all(&s, "${1}${2}").to_string();
    s = FIRST.replace_all(&s, "1").to_string();
    s = SECOND.replace_all(&s, "2").to_string();
    s = THIRD.replace_all(&s, "3").to_string();
    s = s.replace(' ', ".");
    s = SONG_TITLE.replace_all(&s, "Song.").to_string();
    s = HEADING.replace_all(&s, "").to_string();
    s = LEADING_THE.replace(&s, "").to_string();
    s = s.replace(".v.", ".1.");

    // co-ordinate book ranges: "1,2Sam" and "1-2Sam" both mean "1Sam-2Sam"
    s = COORD_COMMA.replace(&s, "${1}${3}-${2}${3}").to_string();
    s = COORD_DASH.replace(&s, "${1}${3}-${2}${3}").to_string();

    // the space-to-dot rewrite can manufacture runs, and the substitutions
    // above can expose fresh edge junk; one more collapse and strip keeps
    // normalization idempotent
    s = collapse_runs(&s, &[';', '-', ' ', '.', ',']);
    s = EDGE_NONWORD.replace_all(&s, "").to_string();
    s.trim_matches(|c| matches!(c, '-' | ',' | ';' | '.' | ' '))
        .to_string()
}

// Collapses consecutive duplicates of the given characters to single
// occurrences, in one pass.
fn collapse_runs(s: &str, chars: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if prev == Some(c) && chars.contains(&c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! normalize_tests {
        ($($name:ident: $input:expr => $expected:expr,)*) => {
        $(
            #[test]
            fn $name() {
                assert_eq!(normalize($input), $expected);
            }
        )*
        }
    }

    normalize_tests! {
        colons_and_spaces: "Gen 3:5-4:7; 5:8-10; Exod 3:2-Lev 4:5" => "Gen.3.5-4.7;5.8-10;Exod.3.2-Lev.4.5",
        underscores_and_double_dash: "Song of Songs 4 8 -- 5_3" => "Song.4.8-5.3",
        brackets_stripped: "(Gen 3:15)" => "Gen.3.15",
        abbreviation_dot: "Gen. 3:15" => "Gen.3.15",
        html_entity_dashes: "Gen 3:15&#8211;17" => "Gen.3.15-17",
        unicode_dashes: "Gen 3:15\u{2013}17" => "Gen.3.15-17",
        newline_becomes_semicolon: "Gen 3\nExod 4" => "Gen.3;Exod.4",
        and_becomes_comma: "Gen 3:15 and 17" => "Gen.3.15,17",
        ordinal_prefix_joined: "1 John 3:16" => "1John.3.16",
        ordinal_words: "First John 3:16" => "1John.3.16",
        second_ordinal: "second Kings 2" => "2Kings.2",
        the_stripped: "The Revelation 1:1" => "Revelation.1.1",
        v_marker: "Gen 5 v. 3" => "Gen.5.1.3",
        verse_word: "Gen 3.v.15" => "Gen.3.1.15",
        heading_dropped: "Gen 3, title" => "Gen.3",
        coordinate_comma_books: "1,2Sam" => "1Sam-2Sam",
        coordinate_dash_books: "1-2Sam" => "1Sam-2Sam",
        nbsp_entity: "Gen&#160;3:15" => "Gen.3.15",
        trailing_separators: "Gen 3:15;" => "Gen.3.15",
        empty: "" => "",
        punctuation_only: "--;;,," => "",
    }

    #[test]
    fn idempotent() {
        let cases = [
            "Gen 3:5-4:7; 5:8-10; Exod 3:2-Lev 4:5",
            "Song of Songs 4 8 -- 5_3",
            "Song of Songs",
            "1 John 3:16",
            "Gen. 3:15",
            "Ps 24, 26; 28:8-10",
            "not a reference at all",
            "",
        ];
        for case in &cases {
            let once = normalize(case);
            assert_eq!(normalize(&once), once, "for input {:?}", case);
        }
    }
}
