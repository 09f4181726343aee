//! vCard 3.0 generation, the exact inverse of [`super::parse`].

use super::core::{EntryValue, VCard, VCardEntry};

/// Maximum content line length in octets before folding (RFC 2425 §5.8.1).
const MAX_LINE_OCTETS: usize = 75;

/// Generates canonical vCard 3.0 text.
///
/// Items are emitted in canonical order with upper-cased names, folded at
/// 75 octets, CRLF terminated. Because the ordering is canonical,
/// generation after one parse pass is idempotent, which makes textual
/// comparison of two generated cards a reliable change signal.
#[must_use]
pub fn generate(card: &VCard) -> String {
    let mut out = String::new();
    out.push_str("BEGIN:VCARD\r\n");
    out.push_str("VERSION:3.0\r\n");

    for (name, entries) in card.iter() {
        for entry in entries {
            let line = content_line(name, entry);
            out.push_str(&fold_line(&line));
            out.push_str("\r\n");
        }
    }

    out.push_str("END:VCARD\r\n");
    out
}

fn content_line(name: &str, entry: &VCardEntry) -> String {
    let mut line = String::new();

    if let Some(group) = &entry.group {
        line.push_str(group);
        line.push('.');
    }
    line.push_str(&name.to_ascii_uppercase());

    for (pname, values) in &entry.meta.params {
        line.push(';');
        line.push_str(pname);
        line.push('=');
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            if value.contains([',', ';', ':']) {
                line.push('"');
                line.push_str(value);
                line.push('"');
            } else {
                line.push_str(value);
            }
        }
    }

    line.push(':');
    match &entry.value {
        EntryValue::Text(text) => line.push_str(&escape_text(text)),
        EntryValue::Structured(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    line.push(';');
                }
                line.push_str(&escape_text(part));
            }
        }
    }

    line
}

/// Escapes a vCard text value (`\\`, `\;`, `\,`, `\n`).
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            ';' => result.push_str("\\;"),
            ',' => result.push_str("\\,"),
            '\n' => result.push_str("\\n"),
            '\r' => {}
            c => result.push(c),
        }
    }
    result
}

/// Folds a line at 75 octets, breaking at UTF-8 boundaries.
#[must_use]
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut result = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut current_len = 0;
    let mut first_segment = true;

    for c in line.chars() {
        let char_len = c.len_utf8();
        let effective_max = if first_segment {
            MAX_LINE_OCTETS
        } else {
            // Continuation lines lose one octet to the leading space.
            MAX_LINE_OCTETS - 1
        };

        if current_len + char_len > effective_max {
            result.push_str("\r\n ");
            current_len = 0;
            first_segment = false;
        }

        result.push(c);
        current_len += char_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcard::parse;

    #[test]
    fn round_trip_is_idempotent_after_one_pass() {
        let input = "BEGIN:VCARD\nVERSION:3.0\nN:Doe;John;;;\nFN:John Doe\n\
            TEL;TYPE=HOME,VOICE:+1-555\nNOTE:line1\\nline2\nEND:VCARD\n";
        let once = generate(&parse(input).unwrap());
        let twice = generate(&parse(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn structural_lines_present() {
        let card = parse("BEGIN:VCARD\r\nFN:x\r\nEND:VCARD\r\n").unwrap();
        let text = generate(&card);
        assert!(text.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\n"));
        assert!(text.ends_with("END:VCARD\r\n"));
    }

    #[test]
    fn group_and_params_survive() {
        let input =
            "BEGIN:VCARD\r\nitem1.X-ABDATE;TYPE=PREF:2001-04-12\r\nEND:VCARD\r\n";
        let card = parse(input).unwrap();
        let text = generate(&card);
        assert!(text.contains("item1.X-ABDATE;TYPE=PREF:2001-04-12"));
    }

    #[test]
    fn long_lines_fold_at_75_octets() {
        let mut card = crate::vcard::VCard::new();
        card.push("note", crate::vcard::VCardEntry::text("x".repeat(200)));
        let text = generate(&card);
        for line in text.split("\r\n") {
            assert!(line.len() <= 76, "line too long: {}", line.len());
        }
        // And it still parses back to the same value.
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.text("note"), Some("x".repeat(200)).as_deref());
    }

    #[test]
    fn escaping_round_trips() {
        let mut card = crate::vcard::VCard::new();
        card.push("note", crate::vcard::VCardEntry::text("a;b,c\nd\\e"));
        let text = generate(&card);
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed.text("note"), Some("a;b,c\nd\\e"));
    }
}
