use crate::{
    automata::LexerAtnFactory,
    grammar::{Element, ElementKind, Position},
    misc::{
        char_support,
        escape::{self, EscapeKind},
        IntervalSet,
    },
    tool::ErrorKind,
};

/// Where the char-set parser is after the last char.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CharSetParseState {
    /// Nothing pending.
    None,
    /// An error was reported and the set is discarded.
    Error,
    /// A code point that may still become the start of a range.
    PrevCodePoint {
        code_point: i32,
        in_range: bool,
    },
    /// A property escape that has not been added yet.
    PrevProperty(IntervalSet),
}

impl CharSetParseState {
    fn in_range(&self) -> bool {
        matches!(self, CharSetParseState::PrevCodePoint { in_range: true, .. })
    }
}

fn set_text(element: &Element) -> String {
    match element.kind() {
        ElementKind::CharSet(text) => text.clone(),
        _ => element.text(),
    }
}

impl<'a> LexerAtnFactory<'a> {
    /// Parse the contents of a char set literal like `[a-z_\p{Alpha}]`.
    ///
    /// Problems are reported and yield an empty set.
    pub(crate) fn set_from_char_set_literal(&mut self, element: &Element) -> IntervalSet {
        let text = set_text(element);
        let inner = text.strip_prefix('[').unwrap_or(&text);
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let chars: Vec<char> = inner.chars().collect();
        let n = chars.len();
        let position = element.position();

        let mut set = IntervalSet::new();
        let mut state = CharSetParseState::None;
        let mut i = 0;

        while i < n {
            if state == CharSetParseState::Error {
                return IntervalSet::new();
            }

            let c = chars[i];
            let mut offset = 1;

            if c == '\\' {
                let result = escape::parse_escape(&chars, i);

                state = match result.kind.clone() {
                    EscapeKind::Invalid => {
                        self.report(ErrorKind::INVALID_ESCAPE_SEQUENCE, position, vec![result.text(&chars)]);
                        CharSetParseState::Error
                    },
                    EscapeKind::CodePoint(code_point) => {
                        self.apply_and_move_to_code_point(element, position, &mut set, state, code_point as i32)
                    },
                    EscapeKind::Property(property) => {
                        self.apply_and_move_to_property(element, position, &mut set, state, property)
                    },
                };

                offset = result.length.max(1);
            } else if c == '-' && !state.in_range() && i != 0 && i != n - 1 && state != CharSetParseState::None {
                state = match state {
                    CharSetParseState::PrevProperty(_) => {
                        self.report(ErrorKind::UNICODE_PROPERTY_NOT_ALLOWED_IN_RANGE, position, vec![text.as_str()]);
                        CharSetParseState::Error
                    },
                    CharSetParseState::PrevCodePoint { code_point, .. } => CharSetParseState::PrevCodePoint {
                        code_point,
                        in_range: true,
                    },
                    other => other,
                };
            } else {
                state = self.apply_and_move_to_code_point(element, position, &mut set, state, c as i32);
            }

            i += offset;
        }

        if state == CharSetParseState::Error {
            return IntervalSet::new();
        }

        self.apply_prev_state(element, position, &mut set, state);

        if set.is_empty() {
            self.report(ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED, position, vec!["[]"]);
        }

        set
    }

    fn apply_prev_state(&mut self, element: &Element, position: Option<Position>, set: &mut IntervalSet, state: CharSetParseState) {
        match state {
            CharSetParseState::PrevCodePoint { code_point, .. } => {
                self.check_char_and_add_to_set(element, position, set, code_point);
            },
            CharSetParseState::PrevProperty(property) => set.add_set(&property),
            CharSetParseState::None | CharSetParseState::Error => {},
        }
    }

    fn apply_and_move_to_code_point(
        &mut self,
        element: &Element,
        position: Option<Position>,
        set: &mut IntervalSet,
        state: CharSetParseState,
        code_point: i32,
    ) -> CharSetParseState {
        if let CharSetParseState::PrevCodePoint { code_point: prev, in_range: true } = state {
            if prev > code_point {
                self.report(
                    ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED,
                    position,
                    vec![char_support::range_escaped_string(prev, code_point)],
                );
            }

            let case_insensitive = self.current_rule_case_insensitive();
            self.check_range_and_add_to_set(element, position, set, prev, code_point, case_insensitive, None);
            return CharSetParseState::None;
        }

        self.apply_prev_state(element, position, set, state);

        CharSetParseState::PrevCodePoint {
            code_point,
            in_range: false,
        }
    }

    fn apply_and_move_to_property(
        &mut self,
        element: &Element,
        position: Option<Position>,
        set: &mut IntervalSet,
        state: CharSetParseState,
        property: IntervalSet,
    ) -> CharSetParseState {
        if state.in_range() {
            self.report(ErrorKind::UNICODE_PROPERTY_NOT_ALLOWED_IN_RANGE, position, vec![set_text(element)]);
            return CharSetParseState::Error;
        }

        self.apply_prev_state(element, position, set, state);
        CharSetParseState::PrevProperty(property)
    }
}
