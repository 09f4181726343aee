//! vCard 3.0 parsing into the entry-map model.

use std::fmt;

use super::core::{EntryValue, Meta, STRUCTURED_ITEMS, VCard, VCardEntry};
use super::lexer::{lex_content_line, logical_lines};

/// Result type for vCard parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// An error that occurred during vCard parsing.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Logical line number (1-based).
    pub line: usize,
    pub message: String,
}

impl ParseError {
    #[must_use]
    pub fn new(kind: ParseErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {:?}: {}", self.line, self.kind, self.message)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingColon,
    InvalidItemName,
    MissingBegin,
    MissingEnd,
}

/// Parses vCard 3.0 text into the entry map.
///
/// Lenient where servers are: bare LF line endings, vCard 2.1 bare TYPE
/// tokens, and properties after END are tolerated; a missing BEGIN or END
/// is not.
///
/// ## Errors
/// Returns an error on a missing BEGIN/END envelope or an unlexable
/// content line.
#[tracing::instrument(skip(input), fields(len = input.len()))]
pub fn parse(input: &str) -> ParseResult<VCard> {
    let lines = logical_lines(input);
    let mut card = VCard::new();
    let mut seen_begin = false;
    let mut seen_end = false;

    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let content = lex_content_line(line, line_num)?;

        match content.name.as_str() {
            "begin" if content.value.eq_ignore_ascii_case("vcard") => {
                seen_begin = true;
                continue;
            }
            "end" if content.value.eq_ignore_ascii_case("vcard") => {
                seen_end = true;
                continue;
            }
            "version" => continue,
            _ => {}
        }

        if !seen_begin {
            return Err(ParseError::new(
                ParseErrorKind::MissingBegin,
                line_num,
                "content before BEGIN:VCARD",
            ));
        }
        if seen_end {
            tracing::debug!(line = line_num, "ignoring content after END:VCARD");
            continue;
        }

        let mut meta = Meta::new();
        for (name, values) in &content.params {
            for value in values {
                meta.add(name, value);
            }
        }

        let value = if STRUCTURED_ITEMS.contains(&content.name.as_str()) {
            EntryValue::Structured(
                split_unescaped(&content.value, ';')
                    .iter()
                    .map(|part| unescape_text(part))
                    .collect(),
            )
        } else {
            EntryValue::Text(unescape_text(&content.value))
        };

        card.push(
            &content.name,
            VCardEntry {
                group: content.group,
                value,
                meta,
            },
        );
    }

    if !seen_begin {
        return Err(ParseError::new(
            ParseErrorKind::MissingBegin,
            1,
            "no BEGIN:VCARD found",
        ));
    }
    if !seen_end {
        return Err(ParseError::new(
            ParseErrorKind::MissingEnd,
            lines.len(),
            "no END:VCARD found",
        ));
    }

    Ok(card)
}

/// Unescapes a vCard text value (`\n`, `\,`, `\;`, `\\`).
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n' | 'N') => {
                    chars.next();
                    result.push('\n');
                }
                Some(&escaped @ (',' | ';' | '\\')) => {
                    chars.next();
                    result.push(escaped);
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Splits on an unescaped separator.
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut prev_backslash = false;

    for (i, c) in s.char_indices() {
        if c == '\\' {
            prev_backslash = !prev_backslash;
            continue;
        }
        if c == sep && !prev_backslash {
            parts.push(&s[start..i]);
            start = i + 1;
        }
        prev_backslash = false;
    }

    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:John Doe\r\n\
        N:Doe;John;;;\r\nEMAIL;TYPE=HOME:john@example.com\r\nEND:VCARD\r\n";

    #[test]
    fn parse_simple_card() {
        let card = parse(SIMPLE).unwrap();
        assert_eq!(card.text("fn"), Some("John Doe"));
        let n = card.first("n").unwrap();
        assert_eq!(n.value.component(0), "Doe");
        assert_eq!(n.value.component(1), "John");
        assert!(card.first("email").unwrap().meta.has_type("home"));
    }

    #[test]
    fn version_is_structural() {
        let card = parse(SIMPLE).unwrap();
        assert!(!card.contains("version"));
        assert!(!card.contains("begin"));
    }

    #[test]
    fn escaped_semicolon_in_text() {
        let input = "BEGIN:VCARD\r\nNOTE:a\\;b\\nc\r\nEND:VCARD\r\n";
        let card = parse(input).unwrap();
        assert_eq!(card.text("note"), Some("a;b\nc"));
    }

    #[test]
    fn escaped_semicolon_in_structured() {
        let input = "BEGIN:VCARD\r\nN:Doe\\;Jr;John;;;\r\nEND:VCARD\r\n";
        let card = parse(input).unwrap();
        let n = card.first("n").unwrap();
        assert_eq!(n.value.component(0), "Doe;Jr");
        assert_eq!(n.value.component(1), "John");
    }

    #[test]
    fn missing_end_is_an_error() {
        let err = parse("BEGIN:VCARD\r\nFN:x\r\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingEnd);
    }

    #[test]
    fn missing_begin_is_an_error() {
        let err = parse("FN:x\r\nEND:VCARD\r\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingBegin);
    }
}
