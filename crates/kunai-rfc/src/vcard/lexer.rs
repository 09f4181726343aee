//! vCard line unfolding and content-line lexing (RFC 2425 §5.8.1).

use super::parse::{ParseError, ParseErrorKind, ParseResult};

/// Splits raw vCard text into logical lines, merging folded continuations.
///
/// Continuations are CRLF (or bare LF, leniently) followed by a single
/// space or tab. Empty lines are dropped.
#[must_use]
pub fn logical_lines(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let continuation = &line[1..];
            if let Some(prev) = lines.last_mut() {
                prev.push_str(continuation);
            } else {
                lines.push(continuation.to_string());
            }
        } else {
            lines.push(line.to_string());
        }
    }

    lines
}

/// A lexed content line before value interpretation.
#[derive(Debug, Clone)]
pub struct ContentLine {
    /// Property group (`item1` in `item1.TEL`).
    pub group: Option<String>,
    /// Item name, lower-cased.
    pub name: String,
    /// Parameters as (name, value tokens), not yet case-normalized.
    pub params: Vec<(String, Vec<String>)>,
    /// Raw value string, still escaped.
    pub value: String,
}

/// Lexes one content line: `[group.]name[;param=value]*:value`.
///
/// Parameters without `=` (bare vCard 2.1 style tokens) are folded into a
/// TYPE parameter, which is how 3.0 consumers treat them in practice.
///
/// ## Errors
/// Returns an error if the colon separator is missing or the name is not
/// a valid item name.
pub fn lex_content_line(line: &str, line_num: usize) -> ParseResult<ContentLine> {
    let colon_pos = find_value_separator(line).ok_or_else(|| {
        ParseError::new(ParseErrorKind::MissingColon, line_num, "missing colon separator")
    })?;

    let (name_params, value) = line.split_at(colon_pos);
    let value = &value[1..];

    let (group, name_params) = split_group(name_params);

    let mut segments = split_unquoted(name_params, ';');
    let name = segments.remove(0);

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ParseError::new(
            ParseErrorKind::InvalidItemName,
            line_num,
            format!("invalid item name: {name}"),
        ));
    }

    let mut params = Vec::new();
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        if let Some(eq_pos) = segment.find('=') {
            let pname = segment[..eq_pos].to_string();
            let values = split_unquoted(&segment[eq_pos + 1..], ',')
                .into_iter()
                .map(|v| unquote(&v))
                .collect();
            params.push((pname, values));
        } else {
            // Bare token, e.g. `TEL;HOME;VOICE:...`
            params.push(("TYPE".to_string(), vec![segment]));
        }
    }

    Ok(ContentLine {
        group: group.map(String::from),
        name: name.to_ascii_lowercase(),
        params,
        value: value.to_string(),
    })
}

/// Finds the colon separating name/params from value, honoring quotes.
fn find_value_separator(line: &str) -> Option<usize> {
    let mut in_quotes = false;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => return Some(i),
            _ => {}
        }
    }

    None
}

/// Splits off an optional group prefix.
fn split_group(s: &str) -> (Option<&str>, &str) {
    if let Some(dot_pos) = s.find('.') {
        let candidate = &s[..dot_pos];
        if !candidate.is_empty()
            && candidate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return (Some(candidate), &s[dot_pos + 1..]);
        }
    }
    (None, s)
}

/// Splits on an unquoted separator character.
fn split_unquoted(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == sep && !in_quotes => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn unquote(s: &str) -> String {
    s.trim_matches('"').to_string()
}
