use ahash::AHashSet;

use crate::{
    atn::{Atn, StateId, StateKind, TransitionKind, TOKEN_EPSILON},
    misc::IntervalSet,
};

/// Computes the set of symbols that can follow a state.
pub trait Lookahead {
    /// The symbols that can be matched first on any path from `from` to
    /// `stop`. Contains [`TOKEN_EPSILON`](crate::atn::TOKEN_EPSILON) if `stop`
    /// (or the end of the rule) can be reached without consuming input.
    fn look(&self, atn: &Atn, from: StateId, stop: Option<StateId>) -> IntervalSet;
}

/// One-symbol lookahead through epsilon edges, predicates and rule calls.
#[derive(Debug, Default, Copy, Clone)]
pub struct Ll1Analyzer;

impl Ll1Analyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }
}

struct LookState<'a> {
    atn: &'a Atn,
    stop: Option<StateId>,
    look: IntervalSet,
    busy: AHashSet<(StateId, Vec<StateId>)>,
    called_rules: AHashSet<usize>,
}

impl<'a> LookState<'a> {
    /// `ctx` is the stack of follow states of the rule calls that lead to `s`.
    fn walk(&mut self, s: StateId, ctx: &mut Vec<StateId>) {
        if !self.busy.insert((s, ctx.clone())) {
            return;
        }

        let atn = self.atn;

        let Some(state) = atn.state(s) else {
            return;
        };

        if Some(s) == self.stop && ctx.is_empty() {
            self.look.add(TOKEN_EPSILON);
            return;
        }

        if let StateKind::RuleStop = state.kind() {
            let Some(return_state) = ctx.pop() else {
                self.look.add(TOKEN_EPSILON);
                return;
            };

            let rule = atn.state(return_state).and_then(|r| r.rule_index());
            let removed = rule.map(|r| self.called_rules.remove(&r)).unwrap_or(false);

            self.walk(return_state, ctx);

            if removed {
                if let Some(rule) = rule {
                    self.called_rules.insert(rule);
                }
            }

            ctx.push(return_state);
            return;
        }

        for transition in state.transitions() {
            match &transition.kind {
                TransitionKind::Rule { rule_index, follow, .. } => {
                    if self.called_rules.contains(rule_index) {
                        continue;
                    }

                    ctx.push(*follow);
                    self.called_rules.insert(*rule_index);
                    self.walk(transition.target, ctx);
                    self.called_rules.remove(rule_index);
                    ctx.pop();
                },
                kind if kind.is_epsilon() => self.walk(transition.target, ctx),
                TransitionKind::Wildcard => self.look.add_set(&atn.vocabulary()),
                TransitionKind::NotSet(set) => self.look.add_set(&set.complement(&atn.vocabulary())),
                kind => {
                    if let Some(label) = kind.label() {
                        self.look.add_set(&label);
                    }
                },
            }
        }
    }
}

impl Lookahead for Ll1Analyzer {
    fn look(&self, atn: &Atn, from: StateId, stop: Option<StateId>) -> IntervalSet {
        let mut state = LookState {
            atn,
            stop,
            look: IntervalSet::new(),
            busy: AHashSet::new(),
            called_rules: AHashSet::new(),
        };

        state.walk(from, &mut Vec::new());
        state.look
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atn::{Transition, TOKEN_EOF},
        grammar::GrammarKind,
    };

    #[test]
    fn test_look_through_epsilon() {
        let mut atn = Atn::new(GrammarKind::Parser, 5);
        let a = atn.add_state(Some(0), StateKind::Basic);
        let b = atn.add_state(Some(0), StateKind::Basic);
        let c = atn.add_state(Some(0), StateKind::Basic);
        let d = atn.add_state(Some(0), StateKind::Basic);
        atn.epsilon(a, b);
        atn.epsilon(a, c);
        atn.add_transition(b, Transition::new(d, TransitionKind::Atom(3)));
        atn.add_transition(c, Transition::new(d, TransitionKind::Atom(TOKEN_EOF)));

        let look = Ll1Analyzer::new().look(&atn, a, Some(d));
        assert!(look.contains(3));
        assert!(look.contains(TOKEN_EOF));
        assert!(!look.contains(TOKEN_EPSILON));

        let look = Ll1Analyzer::new().look(&atn, b, Some(b));
        assert_eq!(look, IntervalSet::of(TOKEN_EPSILON, TOKEN_EPSILON));
    }

    #[test]
    fn test_look_into_empty_rule() {
        // y : x A ;  x : ;
        let mut atn = Atn::new(GrammarKind::Parser, 5);
        let x_stop = atn.add_state(Some(1), StateKind::RuleStop);
        let x_start = atn.add_state(Some(1), StateKind::RuleStart { stop: x_stop, left_recursive: false });
        atn.epsilon(x_start, x_stop);

        let y0 = atn.add_state(Some(0), StateKind::Basic);
        let y1 = atn.add_state(Some(0), StateKind::Basic);
        let y2 = atn.add_state(Some(0), StateKind::Basic);
        atn.add_transition(y0, Transition::new(x_start, TransitionKind::Rule { rule_index: 1, precedence: 0, follow: y1 }));
        atn.add_transition(y1, Transition::new(y2, TransitionKind::Atom(4)));

        let look = Ll1Analyzer::new().look(&atn, y0, Some(y2));
        assert_eq!(look, IntervalSet::of(4, 4));

        let look = Ll1Analyzer::new().look(&atn, y0, Some(y1));
        assert!(look.contains(TOKEN_EPSILON));
    }

    #[test]
    fn test_wildcard_and_not_set() {
        let mut atn = Atn::new(GrammarKind::Parser, 4);
        let a = atn.add_state(Some(0), StateKind::Basic);
        let b = atn.add_state(Some(0), StateKind::Basic);
        atn.add_transition(a, Transition::new(b, TransitionKind::NotSet(IntervalSet::of(2, 3))));

        let look = Ll1Analyzer::new().look(&atn, a, Some(b));
        assert_eq!(look.to_string(), "{1, 4}");

        atn.add_transition(a, Transition::new(b, TransitionKind::Wildcard));
        let look = Ll1Analyzer::new().look(&atn, a, Some(b));
        assert_eq!(look, IntervalSet::of(1, 4));
    }
}
