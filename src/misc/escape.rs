//! Escape sequences inside char set literals.

use crate::misc::{
    char_support::{self, MAX_CODE_POINT},
    IntervalSet,
};

/// What an escape sequence in a char-set literal stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeKind {
    /// Not a valid escape sequence.
    Invalid,
    /// A single code point like `\n` or `é`.
    CodePoint(u32),
    /// A Unicode property like `\p{Alpha}` or its complement `\P{Alpha}`.
    Property(IntervalSet),
}

/// The result of [`parse_escape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeResult {
    /// The decoded escape.
    pub kind: EscapeKind,
    /// Index of the backslash.
    pub start: usize,
    /// Number of chars the escape spans, backslash included.
    pub length: usize,
}

impl EscapeResult {
    fn invalid(start: usize, end: usize) -> Self {
        Self {
            kind: EscapeKind::Invalid,
            start,
            length: end - start,
        }
    }

    /// The chars of `chars` that make up this escape sequence.
    pub fn text(&self, chars: &[char]) -> String {
        let end = (self.start + self.length).min(chars.len());
        chars[self.start.min(end)..end].iter().collect()
    }
}

/// Parse the escape sequence that starts with the backslash at `chars[start]`.
///
/// Besides the escapes of string literals this accepts `\-` and `\]`, which are
/// only meaningful inside char sets, and the property escapes `\p{..}` and `\P{..}`.
pub fn parse_escape(chars: &[char], start: usize) -> EscapeResult {
    if start + 2 > chars.len() || chars[start] != '\\' {
        return EscapeResult::invalid(start, chars.len().max(start));
    }

    let escaped = chars[start + 1];
    let mut offset = start + 2;

    match escaped {
        'u' => {
            let (hex_start, hex_end, end) = if chars.get(offset) == Some(&'{') {
                let hex_start = offset + 1;

                match chars[hex_start..].iter().position(|c| *c == '}') {
                    Some(pos) => (hex_start, hex_start + pos, hex_start + pos + 1),
                    None => return EscapeResult::invalid(start, chars.len()),
                }
            } else {
                if offset + 4 > chars.len() {
                    return EscapeResult::invalid(start, chars.len());
                }

                (offset, offset + 4, offset + 4)
            };

            let hex: String = chars[hex_start..hex_end].iter().collect();

            match char_support::parse_hex_value(&hex) {
                Some(code_point) if code_point <= MAX_CODE_POINT => EscapeResult {
                    kind: EscapeKind::CodePoint(code_point),
                    start,
                    length: end - start,
                },
                _ => EscapeResult::invalid(start, end),
            }
        },
        'p' | 'P' => {
            if chars.get(offset) != Some(&'{') {
                return EscapeResult::invalid(start, offset);
            }

            offset += 1;

            let name_end = match chars[offset..].iter().position(|c| *c == '}') {
                Some(pos) => offset + pos,
                None => return EscapeResult::invalid(start, chars.len()),
            };
            let name: String = chars[offset..name_end].iter().collect();
            let end = name_end + 1;

            let Some(mut set) = unicode_property(&name) else {
                return EscapeResult::invalid(start, end);
            };

            if escaped == 'P' {
                set = set.complement(&IntervalSet::of(0, MAX_CODE_POINT as i32));
            }

            EscapeResult {
                kind: EscapeKind::Property(set),
                start,
                length: end - start,
            }
        },
        '-' | ']' => EscapeResult {
            kind: EscapeKind::CodePoint(escaped as u32),
            start,
            length: 2,
        },
        _ => match char_support::escaped_char_value(escaped) {
            Some(code_point) => EscapeResult {
                kind: EscapeKind::CodePoint(code_point),
                start,
                length: 2,
            },
            None => EscapeResult::invalid(start, offset),
        },
    }
}

fn collect_property<F>(predicate: F) -> IntervalSet
where
    F: Fn(char) -> bool,
{
    let mut set = IntervalSet::new();
    let mut run_start: Option<u32> = None;

    for code_point in 0..=MAX_CODE_POINT + 1 {
        let matches = code_point <= MAX_CODE_POINT && char::from_u32(code_point).map(&predicate).unwrap_or(false);

        match (matches, run_start) {
            (true, None) => run_start = Some(code_point),
            (false, Some(first)) => {
                set.add_range(first as i32, code_point as i32 - 1);
                run_start = None;
            },
            _ => {},
        }
    }

    set
}

/// Look up the code points of a Unicode property by name.
///
/// Only a small set of general properties is known, see [`parse_escape`].
pub fn unicode_property(name: &str) -> Option<IntervalSet> {
    let set = match name {
        "Alphabetic" | "Alpha" => collect_property(char::is_alphabetic),
        "Lowercase" | "Lower" => collect_property(char::is_lowercase),
        "Uppercase" | "Upper" => collect_property(char::is_uppercase),
        "White_Space" | "WSpace" | "space" => collect_property(char::is_whitespace),
        "N" | "Number" => collect_property(char::is_numeric),
        "Cc" | "Control" => collect_property(char::is_control),
        "ASCII_Hex_Digit" | "AHex" => collect_property(|c| c.is_ascii_hexdigit()),
        "ASCII" => IntervalSet::of(0, 0x7F),
        "Any" => IntervalSet::of(0, MAX_CODE_POINT as i32),
        _ => return None,
    };

    Some(set)
}
