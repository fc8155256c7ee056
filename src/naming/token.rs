//! Constant names for anonymous tokens (`+`, `return`, `=>`, ...).
//!
//! A user table maps `parent type → field → token text → name`. `""` as
//! parent or field is the fallback key; it is never a token.
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{GenError, Result, UnmappedToken};

pub type TokenNameTable = IndexMap<String, IndexMap<String, IndexMap<String, String>>>;

/// Key used for "any parent type" and "any field" (and "no field" for children).
pub const FALLBACK_KEY: &str = "";

#[derive(Debug, Clone, Default)]
pub struct TokenNamer {
    table: TokenNameTable,
    exhaustive: bool,
}

impl TokenNamer {
    /// Default names only.
    pub fn automatic() -> Self {
        Self::default()
    }
    pub fn from_table(table: TokenNameTable, exhaustive: bool) -> Self {
        Self { table, exhaustive }
    }
    pub fn is_exhaustive(&self) -> bool {
        self.exhaustive
    }

    /// Lookup order: `(parent, field)`, `(parent, "")`, `("", field)`, `("", "")`.
    pub fn lookup(&self, parent: &str, field: &str, token: &str) -> Option<&str> {
        [parent, FALLBACK_KEY]
            .into_iter()
            .flat_map(|p| [(p, field), (p, FALLBACK_KEY)])
            .find_map(|(p, f)| {
                self.table.get(p)?.get(f)?.get(token).map(String::as_str)
            })
    }

    pub fn name(&self, parent: &str, field: &str, token: &str, index: usize) -> Result<String> {
        if let Some(name) = self.lookup(parent, field, token) {
            return Ok(name.to_string())
        }
        if self.exhaustive {
            return Err(GenError::TokensNotMapped(vec![UnmappedToken {
                parent: parent.to_string(),
                field: field.to_string(),
                token: token.to_string(),
            }]))
        }
        Ok(default_token_name(token, index))
    }

    /// Checks an exhaustive table against every token the grammar uses and
    /// reports all missing entries at once.
    pub fn validate<'a, I>(&self, used: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        if !self.exhaustive {
            return Ok(())
        }
        let missing = used
            .into_iter()
            .filter(|(parent, field, token)| self.lookup(parent, field, token).is_none())
            .map(|(parent, field, token)| UnmappedToken {
                parent: parent.to_string(),
                field: field.to_string(),
                token: token.to_string(),
            })
            .collect::<IndexSet<_>>();
        if missing.is_empty() {
            return Ok(())
        }
        debug!(missing = missing.len(), "token name table is not exhaustive");
        Err(GenError::TokensNotMapped(missing.into_iter().collect()))
    }
}

/// Name for a token without table entry: `*` becomes
/// `ASTERISK`, not `MULTIPLY`.
pub fn default_token_name(token: &str, index: usize) -> String {
    static LETTERS_AND_WHITESPACE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[\sa-zA-Z]+$").expect("valid regex"));
    static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").expect("valid regex"));

    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(name) = ascii_char_name(c) {
            return name.replace([' ', '-'], "_")
        }
    }
    if !token.trim().is_empty() && LETTERS_AND_WHITESPACE.is_match(token) {
        return WHITESPACE.replace_all(token, "_").to_uppercase()
    }
    format!("TOKEN_{index}")
}

/// Unicode character names for printable ASCII.
fn ascii_char_name(c: char) -> Option<String> {
    let name = match c {
        ' ' => "SPACE",
        '!' => "EXCLAMATION MARK",
        '"' => "QUOTATION MARK",
        '#' => "NUMBER SIGN",
        '$' => "DOLLAR SIGN",
        '%' => "PERCENT SIGN",
        '&' => "AMPERSAND",
        '\'' => "APOSTROPHE",
        '(' => "LEFT PARENTHESIS",
        ')' => "RIGHT PARENTHESIS",
        '*' => "ASTERISK",
        '+' => "PLUS SIGN",
        ',' => "COMMA",
        '-' => "HYPHEN-MINUS",
        '.' => "FULL STOP",
        '/' => "SOLIDUS",
        ':' => "COLON",
        ';' => "SEMICOLON",
        '<' => "LESS-THAN SIGN",
        '=' => "EQUALS SIGN",
        '>' => "GREATER-THAN SIGN",
        '?' => "QUESTION MARK",
        '@' => "COMMERCIAL AT",
        '[' => "LEFT SQUARE BRACKET",
        '\\' => "REVERSE SOLIDUS",
        ']' => "RIGHT SQUARE BRACKET",
        '^' => "CIRCUMFLEX ACCENT",
        '_' => "LOW LINE",
        '`' => "GRAVE ACCENT",
        '{' => "LEFT CURLY BRACKET",
        '|' => "VERTICAL LINE",
        '}' => "RIGHT CURLY BRACKET",
        '~' => "TILDE",
        '0'..='9' => {
            const DIGITS: [&str; 10] = [
                "ZERO", "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE",
            ];
            return Some(format!("DIGIT {}", DIGITS[c as usize - '0' as usize]))
        }
        'A'..='Z' => return Some(format!("LATIN CAPITAL LETTER {c}")),
        'a'..='z' => return Some(format!("LATIN SMALL LETTER {}", c.to_ascii_uppercase())),
        _ => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, &str, &str)]) -> TokenNameTable {
        let mut table = TokenNameTable::new();
        for (parent, field, token, name) in entries {
            table
                .entry(parent.to_string())
                .or_default()
                .entry(field.to_string())
                .or_default()
                .insert(token.to_string(), name.to_string());
        }
        table
    }

    #[test]
    fn automatic_names() {
        let namer = TokenNamer::automatic();
        let cases = [
            ("=", "EQUALS_SIGN"),
            ("+", "PLUS_SIGN"),
            ("-", "HYPHEN_MINUS"),
            ("<", "LESS_THAN_SIGN"),
            ("a", "LATIN_SMALL_LETTER_A"),
            ("7", "DIGIT_SEVEN"),
            ("some token", "SOME_TOKEN"),
            ("return", "RETURN"),
            ("==", "TOKEN_0"),
            ("<>", "TOKEN_0"),
            ("+++", "TOKEN_0"),
            ("  ", "TOKEN_0"),
            ("λ", "TOKEN_0"),
        ];
        for (token, expected) in cases {
            assert_eq!(namer.name("parent", "field", token, 0).unwrap(), expected, "token {token:?}");
        }
        assert_eq!(namer.name("parent", "field", "==", 3).unwrap(), "TOKEN_3");
    }

    #[test]
    fn lookup_falls_back_in_order() {
        let namer = TokenNamer::from_table(
            table(&[
                ("A", "a", "+", "A.a+"),
                ("A", "a", "-", "A.a-"),
                ("A", "b", "+", "A.b+"),
                ("A", "", "+", "A.fallback"),
                ("", "a", "+", "fallback.a"),
                ("", "", "+", "fallback.fallback"),
            ]),
            false,
        );
        let name = |parent, field, token| namer.name(parent, field, token, 0).unwrap();
        assert_eq!(name("A", "a", "+"), "A.a+");
        assert_eq!(name("A", "a", "-"), "A.a-");
        assert_eq!(name("A", "b", "+"), "A.b+");
        assert_eq!(name("A", "x", "+"), "A.fallback");
        assert_eq!(name("X", "a", "+"), "fallback.a");
        assert_eq!(name("X", "x", "+"), "fallback.fallback");
        assert_eq!(name("A", "a", "some token"), "SOME_TOKEN");
        assert_eq!(name("X", "x", "some token"), "SOME_TOKEN");
    }

    #[test]
    fn exhaustive_table_rejects_unmapped_tokens() {
        let namer = TokenNamer::from_table(table(&[("A", "a", "+", "A.a")]), true);
        assert_eq!(namer.name("A", "a", "+", 0).unwrap(), "A.a");
        for (parent, field, token) in [("A", "a", "some token"), ("A", "x", "+"), ("X", "a", "+")] {
            let error = namer.name(parent, field, token, 0).unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("Token type not mapped: type = {parent}, field = {field}, token = {token}")
            );
        }
    }

    #[test]
    fn validation_reports_every_unmapped_triple() {
        let namer = TokenNamer::from_table(table(&[("A", "a", "+", "PLUS"), ("", "", "-", "MINUS")]), true);
        let used = [
            ("A", "a", "+"),
            ("A", "a", "-"),
            ("A", "b", "*"),
            ("B", "", "/"),
            ("B", "", "/"),
        ];
        match namer.validate(used) {
            Err(GenError::TokensNotMapped(missing)) => {
                let missing = missing.iter().map(|m| m.to_string()).collect::<Vec<_>>();
                assert_eq!(missing, vec![
                    "Token type not mapped: type = A, field = b, token = *",
                    "Token type not mapped: type = B, field = , token = /",
                ]);
            }
            other => panic!("expected unmapped tokens, got {other:?}"),
        }
        assert!(TokenNamer::automatic().validate(used).is_ok());
    }
}
