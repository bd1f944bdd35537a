use std::collections::VecDeque;

use ahash::AHashSet;
use itertools::Itertools;

use crate::{
    atn::{Atn, StateId, StateKind, TransitionKind},
    grammar::Grammar,
    misc::{char_support, IntervalSet},
};

/// Renders the part of an ATN reachable from a start state as one line per
/// transition, e.g. `RuleStart_a_0->s2` or `s2-'x'->s3`.
///
/// States are visited breadth first. Rule calls are printed but not followed
/// into the called rule.
pub struct AtnPrinter<'a> {
    grammar: &'a Grammar,
    atn: &'a Atn,
    start: StateId,
}

impl<'a> AtnPrinter<'a> {
    /// Create a printer for everything reachable from `start`.
    pub fn new(grammar: &'a Grammar, atn: &'a Atn, start: StateId) -> Self {
        Self {
            grammar,
            atn,
            start,
        }
    }

    /// Render the network.
    pub fn as_string(&self) -> String {
        let mut marked = AHashSet::new();
        let mut work = VecDeque::from([self.start]);
        let mut buffer = String::new();

        while let Some(id) = work.pop_front() {
            if !marked.insert(id) {
                continue;
            }

            let Some(state) = self.atn.state(id) else {
                continue;
            };

            let is_stop = matches!(state.kind(), StateKind::RuleStop);
            let mut targets = AHashSet::new();

            for transition in state.transitions() {
                if is_stop {
                    // stop states link to the same follow state once per call site
                    if !targets.insert(transition.target) {
                        continue;
                    }
                } else if let TransitionKind::Rule { follow, .. } = &transition.kind {
                    work.push_back(*follow);
                } else {
                    work.push_back(transition.target);
                }

                buffer.push_str(&self.state_string(id));

                match &transition.kind {
                    TransitionKind::Epsilon => {},
                    kind => {
                        buffer.push('-');
                        buffer.push_str(&self.label_string(kind));
                    },
                }

                buffer.push_str("->");
                buffer.push_str(&self.state_string(transition.target));
                buffer.push('\n');
            }
        }

        buffer
    }

    fn rule_name(&self, rule_index: Option<usize>) -> &str {
        rule_index.and_then(|i| self.grammar.rules().get(i)).map(|r| r.name()).unwrap_or("?")
    }

    pub(crate) fn state_string(&self, id: StateId) -> String {
        let Some(state) = self.atn.state(id) else {
            return format!("s{}", id);
        };

        match state.kind() {
            StateKind::RuleStart { .. } | StateKind::RuleStop => {
                format!("{}_{}_{}", state.kind().name(), self.rule_name(state.rule_index()), id)
            },
            StateKind::BlockStart { .. }
            | StateKind::BlockEnd { .. }
            | StateKind::StarLoopEntry { .. }
            | StateKind::StarLoopBack
            | StateKind::PlusLoopBack => format!("{}_{}", state.kind().name(), id),
            _ => format!("s{}", id),
        }
    }

    fn set_string(&self, set: &IntervalSet) -> String {
        if self.grammar.is_lexer() {
            return match set.intervals().len() {
                1 => set.to_escaped_string(),
                _ => format!("{{{}}}", set.to_escaped_string()),
            };
        }

        let parts: Vec<String> = set
            .intervals()
            .iter()
            .flat_map(|iv| iv.a..=iv.b)
            .map(|t| self.grammar.token_display_name(t))
            .collect();

        if parts.len() == 1 {
            parts.join("")
        } else {
            format!("{{{}}}", parts.iter().join(", "))
        }
    }

    pub(crate) fn label_string(&self, kind: &TransitionKind) -> String {
        match kind {
            TransitionKind::Atom(a) => self.grammar.token_display_name(*a),
            TransitionKind::Range(a, b) => char_support::range_escaped_string(*a, *b),
            TransitionKind::Set(set) => self.set_string(set),
            TransitionKind::NotSet(set) => format!("~{}", self.set_string(set)),
            TransitionKind::Rule { rule_index, .. } => self.rule_name(Some(*rule_index)).to_string(),
            kind => kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atn::{Transition, StateKind},
        grammar::{Alternative, Element, GrammarBuilder, GrammarKind, Rule},
    };

    #[test]
    fn test_print_chain() {
        let grammar = GrammarBuilder::new(GrammarKind::Lexer, "L")
            .rule(Rule::new("A", vec![Alternative::new(vec![Element::literal("'ab'")])]))
            .build()
            .unwrap();

        let mut atn = Atn::new(GrammarKind::Lexer, 1);
        let stop = atn.add_state(Some(0), StateKind::RuleStop);
        let start = atn.add_state(Some(0), StateKind::RuleStart { stop, left_recursive: false });
        let s2 = atn.add_state(Some(0), StateKind::Basic);
        let s3 = atn.add_state(Some(0), StateKind::Basic);
        atn.epsilon(start, s2);
        atn.add_transition(s2, Transition::new(s3, TransitionKind::Atom('a' as i32)));
        atn.add_transition(s3, Transition::new(stop, TransitionKind::Set(IntervalSet::of('x' as i32, 'z' as i32))));

        let text = AtnPrinter::new(&grammar, &atn, start).as_string();
        assert_eq!(text, "RuleStart_A_1->s2\ns2-'a'->s3\ns3-'x'..'z'->RuleStop_A_0\n");
    }
}
