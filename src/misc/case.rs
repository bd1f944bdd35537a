//! Simple case mappings and the classification of char ranges in case-insensitive rules.

/// Simple (single code point) lower case mapping. Code points whose lower case
/// form is not exactly one code point map to themselves.
pub fn to_lower(c: i32) -> i32 {
    map_single(c, |ch| {
        let mut lower = ch.to_lowercase();
        match (lower.next(), lower.next()) {
            (Some(l), None) => l,
            _ => ch,
        }
    })
}

/// Simple (single code point) upper case mapping. Code points whose upper case
/// form is not exactly one code point map to themselves.
pub fn to_upper(c: i32) -> i32 {
    map_single(c, |ch| {
        let mut upper = ch.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) => u,
            _ => ch,
        }
    })
}

fn map_single<F>(c: i32, f: F) -> i32
where
    F: Fn(char) -> char,
{
    match u32::try_from(c).ok().and_then(char::from_u32) {
        Some(ch) => f(ch) as i32,
        None => c,
    }
}

/// Case information about the borders of a range `from..to` in a
/// case-insensitive lexer rule.
///
/// A range like `'a'..'f'` stands for `a..f` plus `A..F` and is split into two
/// ranges. A range whose borders are caseless, like `'0'..'9'`, or whose case
/// forms are not parallel stays a single range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RangeBorderCharacters {
    from: i32,
    to: i32,
    /// Lower case form of the first border.
    pub lower_from: i32,
    /// Upper case form of the first border.
    pub upper_from: i32,
    /// Lower case form of the last border.
    pub lower_to: i32,
    /// Upper case form of the last border.
    pub upper_to: i32,
    /// One border is lower case and the other is not, e.g. `'a'..'Z'`.
    pub mixed_case: bool,
}

impl RangeBorderCharacters {
    /// Compute the case forms of both borders of `from..to`.
    pub fn classify(from: i32, to: i32) -> Self {
        let lower_from = to_lower(from);
        let upper_from = to_upper(from);
        let lower_to = to_lower(to);
        let upper_to = to_upper(to);

        let is_lower_from = lower_from == from;
        let is_lower_to = lower_to == to;

        Self {
            from,
            to,
            lower_from,
            upper_from,
            lower_to,
            upper_to,
            mixed_case: is_lower_from != is_lower_to,
        }
    }

    /// Whether the range must be added as is instead of as a lower case and an upper case range.
    pub fn is_single_range(&self) -> bool {
        (self.lower_from == self.upper_from && self.lower_to == self.upper_to)
            || self.mixed_case
            || self.lower_to - self.lower_from != self.upper_to - self.upper_from
    }

    /// For an ASCII range with mixed case borders, the characters of `from..to`
    /// (last border excluded) that are not letters. `'A'..'z'` for example
    /// contains `[\]^_` and the backtick.
    ///
    /// Returns `None` if there are none or the range does not qualify.
    pub fn not_implied_characters(&self) -> Option<String> {
        if !self.mixed_case || self.from > 0x7F || self.to > 0x7F {
            return None;
        }

        let chars: String = (self.from..self.to)
            .filter_map(|c| u32::try_from(c).ok().and_then(char::from_u32))
            .filter(|c| !c.is_alphabetic())
            .collect();

        if chars.is_empty() {
            None
        } else {
            Some(chars)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ranges() {
        let data = RangeBorderCharacters::classify('a' as i32, 'f' as i32);
        assert!(!data.is_single_range());
        assert_eq!(data.upper_from, 'A' as i32);
        assert_eq!(data.upper_to, 'F' as i32);

        let data = RangeBorderCharacters::classify('0' as i32, '9' as i32);
        assert!(data.is_single_range());
        assert_eq!(data.not_implied_characters(), None);
    }

    #[test]
    fn test_mixed_case() {
        let data = RangeBorderCharacters::classify('A' as i32, 'z' as i32);
        assert!(data.mixed_case);
        assert!(data.is_single_range());
        assert_eq!(data.not_implied_characters().as_deref(), Some("[\\]^_`"));

        let data = RangeBorderCharacters::classify('a' as i32, 'Z' as i32);
        assert!(data.mixed_case);
    }
}
