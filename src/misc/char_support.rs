//! Decoding of grammar char and string literals and rendering of code points
//! back into literal syntax for diagnostics.

/// Largest Unicode code point.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// The code point a simple escape `\x` stands for inside a literal.
pub(crate) fn escaped_char_value(escaped: char) -> Option<u32> {
    match escaped {
        'n' => Some(0x0A),
        'r' => Some(0x0D),
        't' => Some(0x09),
        'b' => Some(0x08),
        'f' => Some(0x0C),
        '\\' => Some(0x5C),
        _ => None,
    }
}

/// Parse `s` as hexadecimal. Returns `None` for empty or non-hex input.
pub(crate) fn parse_hex_value(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    u32::from_str_radix(s, 16).ok()
}

/// Given a literal like `'a'` (quotes included), return the code point of `a`.
/// Escape sequences are decoded.
///
/// Returns `None` if the literal is not quoted or does not denote exactly one character.
pub fn char_value_from_grammar_char_literal(literal: &str) -> Option<u32> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    char_value_from_char_in_grammar_literal(inner)
}

/// Given `x`, `\t` or `ሴ`, return the code point.
/// Unnecessary escapes like `\{` yield `None`.
pub fn char_value_from_char_in_grammar_literal(cstr: &str) -> Option<u32> {
    let mut chars = cstr.chars();
    let first = chars.next()?;

    if first != '\\' {
        return if chars.next().is_none() {
            Some(first as u32)
        } else {
            None
        };
    }

    let escaped = chars.next()?;
    let rest = chars.as_str();

    match escaped {
        'u' => {
            let hex = if let Some(braced) = rest.strip_prefix('{') {
                braced.strip_suffix('}')?
            } else if rest.len() == 4 {
                rest
            } else {
                return None;
            };

            parse_hex_value(hex).filter(|c| *c <= MAX_CODE_POINT)
        },
        '\'' if rest.is_empty() => Some('\'' as u32),
        _ if rest.is_empty() => escaped_char_value(escaped),
        _ => None,
    }
}

/// Decode the contents of a string literal like `'a\tb'` (quotes included).
///
/// Returns `None` if the literal contains an invalid escape sequence.
pub fn string_from_grammar_string_literal(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
    let chars: Vec<char> = inner.chars().collect();
    let mut buffer = String::with_capacity(inner.len());
    let mut i = 0;

    while i < chars.len() {
        let mut end = i + 1;

        if chars[i] == '\\' {
            end = i + 2;

            if chars.get(i + 1) == Some(&'u') {
                if chars.get(i + 2) == Some(&'{') {
                    end = i + 3;

                    loop {
                        let c = *chars.get(end)?;
                        end += 1;

                        if c == '}' {
                            break;
                        }

                        if !c.is_ascii_hexdigit() {
                            return None;
                        }
                    }
                } else {
                    end = i + 6;

                    for j in i + 2..end {
                        if !chars.get(j)?.is_ascii_hexdigit() {
                            return None;
                        }
                    }
                }
            }
        }

        if end > chars.len() {
            return None;
        }

        let esc: String = chars[i..end].iter().collect();
        let c = char_value_from_char_in_grammar_literal(&esc)?;
        buffer.push(char::from_u32(c)?);

        i = end;
    }

    Some(buffer)
}

/// Render code point `c` as a grammar char literal, e.g. `'a'`, `'\\'` or `'é'`.
pub fn char_literal_for_char(c: i32) -> String {
    if c < 0 {
        return "'<INVALID>'".to_string();
    }

    let result = match char::from_u32(c as u32) {
        Some('\n') => "\\n".to_string(),
        Some('\r') => "\\r".to_string(),
        Some('\t') => "\\t".to_string(),
        Some('\u{8}') => "\\b".to_string(),
        Some('\u{c}') => "\\f".to_string(),
        Some('\\') => "\\\\".to_string(),
        Some('\'') => "\\'".to_string(),
        Some(ch) if ch.is_ascii() && !ch.is_ascii_control() => ch.to_string(),
        _ if c <= 0xFFFF => format!("\\u{:04X}", c),
        _ => format!("\\u{{{:06X}}}", c),
    };

    format!("'{}'", result)
}

/// Render `a..b` as `'a'..'b'`, or as a single literal if `a == b`.
pub fn range_escaped_string(a: i32, b: i32) -> String {
    if a == b {
        char_literal_for_char(a)
    } else {
        format!("{}..{}", char_literal_for_char(a), char_literal_for_char(b))
    }
}

/// Upper-case the first character of `s`.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_literals() {
        assert_eq!(char_value_from_grammar_char_literal("'a'"), Some('a' as u32));
        assert_eq!(char_value_from_grammar_char_literal("'\\n'"), Some(0x0A));
        assert_eq!(char_value_from_grammar_char_literal("'\\u00E9'"), Some(0xE9));
        assert_eq!(char_value_from_grammar_char_literal("'\\u{1F600}'"), Some(0x1F600));
        assert_eq!(char_value_from_grammar_char_literal("'\\{'"), None);
        assert_eq!(char_value_from_grammar_char_literal("'ab'"), None);
        assert_eq!(char_value_from_grammar_char_literal("''"), None);
        assert_eq!(char_value_from_grammar_char_literal("'"), None);
        assert_eq!(char_value_from_grammar_char_literal("éab"), None);
        assert_eq!(char_value_from_grammar_char_literal("'é"), None);
        assert_eq!(char_value_from_grammar_char_literal("'é'"), Some(0xE9));
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(string_from_grammar_string_literal("'abc'").as_deref(), Some("abc"));
        assert_eq!(string_from_grammar_string_literal("'a\\tb'").as_deref(), Some("a\tb"));
        assert_eq!(string_from_grammar_string_literal("'\\u0041\\u{42}'").as_deref(), Some("AB"));
        assert_eq!(string_from_grammar_string_literal("'it\\'s'").as_deref(), Some("it's"));
        assert_eq!(string_from_grammar_string_literal("'\\q'"), None);
        assert_eq!(string_from_grammar_string_literal("'\\u12'"), None);
        assert_eq!(string_from_grammar_string_literal("''").as_deref(), Some(""));
    }

    #[test]
    fn test_escaped_strings() {
        assert_eq!(char_literal_for_char('a' as i32), "'a'");
        assert_eq!(char_literal_for_char('\n' as i32), "'\\n'");
        assert_eq!(char_literal_for_char(0xE9), "'\\u00E9'");
        assert_eq!(char_literal_for_char(0x1F600), "'\\u{01F600}'");
        assert_eq!(range_escaped_string('z' as i32, 'a' as i32), "'z'..'a'");
        assert_eq!(capitalize("pushMode"), "PushMode");
    }
}
