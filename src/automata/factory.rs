use crate::{
    atn::{
        Atn, BlockKind, Handle, Ll1Analyzer, Lookahead, StateId, StateKind, Transition, TransitionKind,
        TOKEN_EOF, TOKEN_EPSILON,
    },
    automata::{builder, tail_epsilon},
    error::AtnError,
    grammar::{Action, Block, Element, Grammar, LexerCommand, Position, Rule, SuffixKind, Terminal},
    tool::{ErrorKind, ErrorManager},
};

/// Where the code of an action comes from.
#[derive(Debug, Clone)]
pub enum ActionSource<'e> {
    /// Code generated for a lexer command.
    Inline(String),
    /// An action `{...}` written in the grammar.
    Declared(&'e Element, &'e Action),
    /// A lexer command with a built-in meaning.
    Command(&'e LexerCommand, crate::atn::LexerAction),
}

/// A block whose contents are checked once the whole ATN exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeferredCheck {
    /// The rule containing the block.
    pub rule_index: usize,
    /// The block start.
    pub start: StateId,
    /// The block end.
    pub end: StateId,
}

/// The operations the [`AtnBuilder`](crate::automata::AtnBuilder) needs to turn
/// rule ASTs into ATN fragments.
///
/// Composition (sequences, blocks and loops) is shared by all grammar kinds and
/// implemented by [`ParserAtnFactory`]. Implementors provide the leaves that
/// differ between lexers and parsers.
pub trait AtnFactory<'a> {
    /// The shared construction state.
    fn base(&mut self) -> &mut ParserAtnFactory<'a>;

    /// The shared construction state.
    fn base_ref(&self) -> &ParserAtnFactory<'a>;

    /// The grammar the ATN is built for.
    fn grammar(&self) -> &'a Grammar {
        self.base_ref().grammar
    }

    /// Build the complete ATN.
    fn create_atn(self) -> Result<Atn, AtnError>
    where
        Self: Sized;

    /// Make `rule_index` the rule new states belong to.
    fn set_current_rule(&mut self, rule_index: usize) {
        self.base().set_current_rule(rule_index);
    }

    /// Link the body of `rule` to its start and stop state.
    fn rule(&mut self, rule: &Rule, body: Handle) -> Result<Handle, AtnError> {
        self.base().rule(rule, body)
    }

    /// Chain fragments into a sequence.
    fn elem_list(&mut self, elements: &[Handle]) -> Result<Handle, AtnError> {
        self.base().elem_list(elements)
    }

    /// Combine the alternatives of `block` and apply its suffix.
    fn block(&mut self, block: &Block, element: Option<&Element>, alts: Vec<Handle>) -> Result<Handle, AtnError> {
        self.base().block(block, element, alts)
    }

    /// `o-ε->o`
    fn epsilon_node(&mut self, element: Option<&Element>) -> Handle {
        self.base().epsilon_node(element)
    }

    /// `o-.->o`
    fn wildcard(&mut self, element: &Element) -> Handle {
        self.base().wildcard(element)
    }

    /// `o-{pred}?->o`
    fn sempred(&mut self, element: &Element, text: &str, index: usize, precedence: Option<i32>) -> Result<Handle, AtnError> {
        self.base().sempred(element, text, index, precedence)
    }

    /// `o->(rule) o` where the trailing state is only reachable through the rule's stop state.
    fn rule_ref(&mut self, element: &Element, name: &str, precedence: Option<i32>) -> Result<Handle, AtnError> {
        self.base().rule_ref(element, name, precedence)
    }

    /// A reference to a token.
    fn token_ref(&mut self, element: &Element, name: &str) -> Result<Handle, AtnError>;

    /// A string literal.
    fn string_literal(&mut self, element: &Element, text: &str) -> Result<Handle, AtnError>;

    /// A char set literal `[...]`.
    fn char_set_literal(&mut self, element: &Element) -> Result<Handle, AtnError>;

    /// A range `from..to`.
    fn range(&mut self, element: &Element, from: &Terminal, to: &Terminal) -> Result<Handle, AtnError>;

    /// A set of alternatives that each match a single symbol.
    fn set(&mut self, element: &Element, items: &[Element], invert: bool) -> Result<Handle, AtnError>;

    /// An action.
    fn action(&mut self, source: ActionSource<'_>) -> Result<Handle, AtnError>;

    /// A lexer command after `->`.
    fn lexer_command(&mut self, command: &LexerCommand) -> Result<Handle, AtnError>;

    /// Attach the sequence of lexer commands of an alternative.
    fn lexer_alt_commands(&mut self, alt: Handle, commands: Handle) -> Result<Handle, AtnError>;
}

fn stamp(element: Option<&Element>, state: StateId) {
    if let Some(element) = element {
        element.set_atn_state(state);
    }
}

/// Builds the ATN of a parser grammar.
///
/// Also holds everything the lexer factory shares with it: the ATN under
/// construction, the current rule and the deferred closure and optional checks.
pub struct ParserAtnFactory<'a> {
    grammar: &'a Grammar,
    errors: &'a mut ErrorManager,
    atn: Atn,
    current_rule: Option<usize>,
    closure_checks: Vec<DeferredCheck>,
    optional_checks: Vec<DeferredCheck>,
    lookahead: Box<dyn Lookahead + 'a>,
}

impl<'a> ParserAtnFactory<'a> {
    /// Create a factory that reports problems to `errors`.
    pub fn new(grammar: &'a Grammar, errors: &'a mut ErrorManager) -> Self {
        Self {
            grammar,
            errors,
            atn: Atn::new(grammar.kind(), grammar.max_token_type()),
            current_rule: None,
            closure_checks: Vec::new(),
            optional_checks: Vec::new(),
            lookahead: Box::new(Ll1Analyzer::new()),
        }
    }

    /// Replace the [`Ll1Analyzer`] used by the closure and optional checks.
    pub fn with_lookahead<L: Lookahead + 'a>(mut self, lookahead: L) -> Self {
        self.lookahead = Box::new(lookahead);
        self
    }

    /// The ATN built so far.
    pub fn atn(&self) -> &Atn {
        &self.atn
    }

    pub(crate) fn atn_mut(&mut self) -> &mut Atn {
        &mut self.atn
    }

    pub(crate) fn into_atn(self) -> Atn {
        self.atn
    }

    /// Blocks recorded for the closure check that has not run yet.
    pub fn closure_checks(&self) -> &[DeferredCheck] {
        &self.closure_checks
    }

    /// Blocks recorded for the optional check that has not run yet.
    pub fn optional_checks(&self) -> &[DeferredCheck] {
        &self.optional_checks
    }

    pub(crate) fn report<S: Into<String>>(&mut self, kind: ErrorKind, position: Option<Position>, args: Vec<S>) {
        let grammar = self.grammar;
        self.errors.report(kind, grammar.file_name(), position, args);
    }

    pub(crate) fn internal_error<S: Into<String>>(&mut self, message: S) -> AtnError {
        let message = message.into();
        self.report(ErrorKind::INTERNAL_ERROR, None, vec![message.clone()]);
        AtnError::Internal(message)
    }

    pub(crate) fn set_current_rule(&mut self, rule_index: usize) {
        self.current_rule = Some(rule_index);
    }

    pub(crate) fn current_rule(&self) -> Option<&'a Rule> {
        let grammar = self.grammar;
        self.current_rule.and_then(|i| grammar.rules().get(i))
    }

    pub(crate) fn current_rule_index(&mut self) -> Result<usize, AtnError> {
        match self.current_rule {
            Some(index) => Ok(index),
            None => Err(self.internal_error("no rule is being built")),
        }
    }

    /// A fresh basic state in the current rule.
    pub(crate) fn new_state(&mut self) -> StateId {
        self.new_state_of_kind(StateKind::Basic)
    }

    pub(crate) fn new_state_of_kind(&mut self, kind: StateKind) -> StateId {
        self.atn.add_state(self.current_rule, kind)
    }

    pub(crate) fn define_decision(&mut self, state: StateId) -> usize {
        let decision = self.atn.define_decision_state(state);
        log::debug!("State {} is decision {}", state, decision);
        decision
    }

    pub(crate) fn epsilon(&mut self, from: StateId, to: StateId) {
        self.atn.epsilon(from, to);
    }

    /// `o-kind->o`
    pub(crate) fn atom(&mut self, element: Option<&Element>, kind: TransitionKind) -> Handle {
        let left = self.new_state();
        let right = self.new_state();
        self.atn.add_transition(left, Transition::new(right, kind));
        stamp(element, left);
        Handle::new(left, right)
    }

    /// Allocate the start and stop state of every rule up front so that
    /// rule references can be resolved in any order.
    pub(crate) fn create_rule_start_and_stop_states(&mut self) {
        for rule in self.grammar.rules() {
            let index = Some(rule.index());
            let start = self.atn.add_state(index, StateKind::RuleStart {
                stop: 0,
                left_recursive: rule.is_left_recursive(),
            });
            let stop = self.atn.add_state(index, StateKind::RuleStop);

            *self.atn[start].kind_mut() = StateKind::RuleStart {
                stop,
                left_recursive: rule.is_left_recursive(),
            };

            self.atn.push_rule(start, stop);
        }
    }

    fn rule_states(&mut self, rule_index: usize) -> Result<(StateId, StateId), AtnError> {
        let start = self.atn.rule_to_start_state().get(rule_index).copied();
        let stop = self.atn.rule_to_stop_state().get(rule_index).copied();

        match (start, stop) {
            (Some(start), Some(stop)) => Ok((start, stop)),
            _ => Err(self.internal_error(format!("no start state for rule {}", rule_index))),
        }
    }

    /// `start->body->stop`
    pub(crate) fn rule(&mut self, rule: &Rule, body: Handle) -> Result<Handle, AtnError> {
        let (start, stop) = self.rule_states(rule.index())?;
        self.epsilon(start, body.left);
        self.epsilon(body.right, stop);
        Ok(Handle::new(start, stop))
    }

    fn is_trivial(&self, handle: Handle) -> bool {
        let (Some(left), Some(right)) = (self.atn.state(handle.left), self.atn.state(handle.right)) else {
            return false;
        };

        if left.kind() != &StateKind::Basic || right.kind() != &StateKind::Basic || left.transitions().len() != 1 {
            return false;
        }

        let transition = &left.transitions()[0];

        match &transition.kind {
            TransitionKind::Rule { follow, .. } if *follow == handle.right => true,
            _ => transition.target == handle.right,
        }
    }

    pub(crate) fn elem_list(&mut self, elements: &[Handle]) -> Result<Handle, AtnError> {
        let (Some(first), Some(last)) = (elements.first(), elements.last()) else {
            return Err(self.internal_error("empty element list"));
        };

        for pair in elements.windows(2) {
            let (element, next) = (pair[0], pair[1]);

            if self.is_trivial(element) {
                let transition = &mut self.atn[element.left].transitions_mut()[0];

                match &mut transition.kind {
                    TransitionKind::Rule { follow, .. } => *follow = next.left,
                    _ => transition.target = next.left,
                }

                self.atn.remove_state(element.right);
            } else {
                self.epsilon(element.right, next.left);
            }
        }

        Ok(Handle::new(first.left, last.right))
    }

    pub(crate) fn block(&mut self, block: &Block, element: Option<&Element>, alts: Vec<Handle>) -> Result<Handle, AtnError> {
        if alts.is_empty() {
            return Err(self.internal_error("block without alternatives"));
        }

        let Some(suffix) = block.suffix() else {
            if alts.len() == 1 {
                stamp(element, alts[0].left);
                return Ok(alts[0]);
            }

            let start = self.new_block_start(BlockKind::Basic);
            self.define_decision(start);
            let handle = self.make_block(start, &alts);
            stamp(element, start);
            return Ok(handle);
        };

        match suffix.kind {
            SuffixKind::Optional => {
                let start = self.new_block_start(BlockKind::Basic);
                self.define_decision(start);
                let handle = self.make_block(start, &alts);
                self.optional(element, handle, suffix.greedy)
            },
            SuffixKind::Star => {
                let start = self.new_block_start(BlockKind::Star);
                if alts.len() > 1 {
                    self.define_decision(start);
                }
                let handle = self.make_block(start, &alts);
                self.star(block, element, handle, suffix.greedy)
            },
            SuffixKind::Plus => {
                let start = self.new_block_start(BlockKind::Plus);
                if alts.len() > 1 {
                    self.define_decision(start);
                }
                let handle = self.make_block(start, &alts);
                self.plus(block, element, handle, suffix.greedy)
            },
        }
    }

    fn new_block_start(&mut self, kind: BlockKind) -> StateId {
        self.new_state_of_kind(StateKind::BlockStart {
            kind,
            end: None,
            loop_back: None,
        })
    }

    fn make_block(&mut self, start: StateId, alts: &[Handle]) -> Handle {
        let end = self.new_state_of_kind(StateKind::BlockEnd {
            start: Some(start),
        });

        if let StateKind::BlockStart { end: block_end, .. } = self.atn[start].kind_mut() {
            *block_end = Some(end);
        }

        for alt in alts {
            self.epsilon(start, alt.left);
            self.epsilon(alt.right, end);
            tail_epsilon::remove_tail_epsilons(&mut self.atn, alt.left);
        }

        Handle::new(start, end)
    }

    fn deferred_check(&mut self, start: StateId, end: StateId) -> Result<DeferredCheck, AtnError> {
        Ok(DeferredCheck {
            rule_index: self.current_rule_index()?,
            start,
            end,
        })
    }

    /// `(A)?` gets a bypass from the block start to the block end.
    fn optional(&mut self, element: Option<&Element>, block: Handle, greedy: bool) -> Result<Handle, AtnError> {
        let check = self.deferred_check(block.left, block.right)?;
        self.optional_checks.push(check);

        self.atn[block.left].set_non_greedy(!greedy);

        let bypass = Transition::epsilon(block.right);
        let transitions = self.atn[block.left].transitions_mut();

        if greedy {
            transitions.push(bypass);
        } else {
            transitions.insert(0, bypass);
        }

        stamp(element, block.left);
        Ok(block)
    }

    fn warn_wildcard_loop(&mut self, block: &Block, element: Option<&Element>, kind: SuffixKind) {
        if block.has_wildcard_alt() {
            self.report(
                ErrorKind::EXPECTED_NON_GREEDY_WILDCARD_BLOCK,
                element.and_then(Element::position),
                vec![kind.symbol()],
            );
        }
    }

    /// `(A)*` becomes an entry decision that either enters the block or skips
    /// to the loop end, and a loop back from the block end to the entry.
    fn star(&mut self, block: &Block, element: Option<&Element>, body: Handle, greedy: bool) -> Result<Handle, AtnError> {
        let (block_start, block_end) = (body.left, body.right);
        let check = self.deferred_check(block_start, block_end)?;
        self.closure_checks.push(check);

        let entry = self.new_state_of_kind(StateKind::StarLoopEntry {
            loop_back: None,
        });
        self.atn[entry].set_non_greedy(!greedy);
        self.define_decision(entry);

        let end = self.new_state_of_kind(StateKind::LoopEnd {
            loop_back: None,
        });
        let loop_back = self.new_state_of_kind(StateKind::StarLoopBack);

        *self.atn[entry].kind_mut() = StateKind::StarLoopEntry {
            loop_back: Some(loop_back),
        };
        *self.atn[end].kind_mut() = StateKind::LoopEnd {
            loop_back: Some(loop_back),
        };

        if greedy {
            self.warn_wildcard_loop(block, element, SuffixKind::Star);
            self.epsilon(entry, block_start);
            self.epsilon(entry, end);
        } else {
            self.epsilon(entry, end);
            self.epsilon(entry, block_start);
        }

        self.epsilon(block_end, loop_back);
        self.epsilon(loop_back, entry);

        stamp(element, entry);
        Ok(Handle::new(entry, end))
    }

    /// `(A)+` runs the block once and then decides at the loop back whether
    /// to repeat it.
    fn plus(&mut self, block: &Block, element: Option<&Element>, body: Handle, greedy: bool) -> Result<Handle, AtnError> {
        let (block_start, block_end) = (body.left, body.right);
        let check = self.deferred_check(block_start, block_end)?;
        self.closure_checks.push(check);

        let loop_back = self.new_state_of_kind(StateKind::PlusLoopBack);
        self.atn[loop_back].set_non_greedy(!greedy);
        self.define_decision(loop_back);

        let end = self.new_state_of_kind(StateKind::LoopEnd {
            loop_back: Some(loop_back),
        });

        if let StateKind::BlockStart { loop_back: start_loop_back, .. } = self.atn[block_start].kind_mut() {
            *start_loop_back = Some(loop_back);
        }

        stamp(element, loop_back);
        self.epsilon(block_end, loop_back);

        if greedy {
            self.warn_wildcard_loop(block, element, SuffixKind::Plus);
            self.epsilon(loop_back, block_start);
            self.epsilon(loop_back, end);
        } else {
            self.epsilon(loop_back, end);
            self.epsilon(loop_back, block_start);
        }

        Ok(Handle::new(block_start, end))
    }

    pub(crate) fn epsilon_node(&mut self, element: Option<&Element>) -> Handle {
        self.atom(element, TransitionKind::Epsilon)
    }

    pub(crate) fn wildcard(&mut self, element: &Element) -> Handle {
        self.atom(Some(element), TransitionKind::Wildcard)
    }

    pub(crate) fn sempred(&mut self, element: &Element, text: &str, index: usize, precedence: Option<i32>) -> Result<Handle, AtnError> {
        let kind = match precedence {
            Some(precedence) => TransitionKind::PrecedencePredicate(precedence),
            None => TransitionKind::Predicate {
                rule_index: self.current_rule_index()?,
                pred_index: index,
                ctx_dependent: text.contains('$'),
            },
        };

        Ok(self.atom(Some(element), kind))
    }

    pub(crate) fn rule_ref(&mut self, element: &Element, name: &str, precedence: Option<i32>) -> Result<Handle, AtnError> {
        let grammar = self.grammar;

        let Some(rule) = grammar.rule(name) else {
            self.report(ErrorKind::INTERNAL_ERROR, element.position(), vec![format!("Rule {} undefined", name)]);
            return Err(AtnError::UndefinedRule(name.to_string()));
        };

        let (start, _) = self.rule_states(rule.index())?;
        let left = self.new_state();
        let right = self.new_state();

        self.atn.add_transition(left, Transition::new(start, TransitionKind::Rule {
            rule_index: rule.index(),
            precedence: precedence.unwrap_or(0),
            follow: right,
        }));

        element.set_atn_state(left);
        Ok(Handle::new(left, right))
    }

    /// Link the stop state of every called rule to the follow state of the call.
    /// Returns the number of links.
    pub(crate) fn add_rule_follow_links(&mut self) -> usize {
        let calls: Vec<(usize, StateId)> = self
            .atn
            .states()
            .filter(|(_, s)| s.kind() == &StateKind::Basic && s.transitions().len() == 1)
            .filter_map(|(_, s)| match &s.transitions()[0].kind {
                TransitionKind::Rule { rule_index, follow, .. } => Some((*rule_index, *follow)),
                _ => None,
            })
            .collect();

        for (rule_index, follow) in &calls {
            if let Some(stop) = self.atn.rule_to_stop_state().get(*rule_index).copied() {
                self.epsilon(stop, *follow);
            }
        }

        calls.len()
    }

    /// Give every rule that no other rule calls an EOF transition to a shared
    /// sink state. Returns the number of such entry rules.
    pub(crate) fn add_eof_transition_to_start_rules(&mut self) -> usize {
        let eof_target = self.atn.add_state(None, StateKind::Basic);
        let mut entries = 0;

        for stop in self.atn.rule_to_stop_state().to_vec() {
            if !self.atn[stop].transitions().is_empty() {
                continue;
            }

            entries += 1;
            self.atn.add_transition(stop, Transition::new(eof_target, TransitionKind::Atom(TOKEN_EOF)));
        }

        entries
    }

    /// Report loops whose body can match the empty string or EOF.
    pub(crate) fn check_epsilon_closure(&mut self) {
        let grammar = self.grammar;

        for check in std::mem::take(&mut self.closure_checks) {
            let look = self.lookahead.look(&self.atn, check.start, Some(check.end));
            let Some(rule) = grammar.rules().get(check.rule_index) else {
                continue;
            };

            if look.contains(TOKEN_EPSILON) {
                let kind = if rule.is_left_recursive() {
                    ErrorKind::EPSILON_LR_FOLLOW
                } else {
                    ErrorKind::EPSILON_CLOSURE
                };
                self.report(kind, rule.position(), vec![rule.name()]);
            }

            if look.contains(TOKEN_EOF) {
                self.report(ErrorKind::EOF_CLOSURE, rule.position(), vec![rule.name()]);
            }
        }
    }

    /// Report optional blocks with an alternative that can match the empty string.
    /// Every optional block must have exactly one bypass.
    pub(crate) fn check_optional_blocks(&mut self) -> Result<(), AtnError> {
        let grammar = self.grammar;

        'outer: for check in std::mem::take(&mut self.optional_checks) {
            let targets: Vec<StateId> = self.atn[check.start].transitions().iter().map(|t| t.target).collect();
            let mut bypasses = 0;

            for target in targets {
                if target == check.end {
                    bypasses += 1;
                    continue;
                }

                if self.lookahead.look(&self.atn, target, Some(check.end)).contains(TOKEN_EPSILON) {
                    if let Some(rule) = grammar.rules().get(check.rule_index) {
                        self.report(ErrorKind::EPSILON_OPTIONAL, rule.position(), vec![rule.name()]);
                    }
                    continue 'outer;
                }
            }

            if bypasses != 1 {
                return Err(self.internal_error(format!(
                    "optional block at state {} has {} bypass alternatives instead of 1",
                    check.start, bypasses
                )));
            }
        }

        Ok(())
    }
}

impl<'a> AtnFactory<'a> for ParserAtnFactory<'a> {
    fn base(&mut self) -> &mut ParserAtnFactory<'a> {
        self
    }

    fn base_ref(&self) -> &ParserAtnFactory<'a> {
        self
    }

    fn create_atn(mut self) -> Result<Atn, AtnError> {
        self.create_rule_start_and_stop_states();
        builder::build_rules(&mut self)?;

        let links = self.add_rule_follow_links();
        let entries = self.add_eof_transition_to_start_rules();

        log::debug!(
            "Parser ATN for {}: {} states, {} follow links, {} entry rules, {} closure checks, {} optional checks",
            self.grammar.name(),
            self.atn.num_states(),
            links,
            entries,
            self.closure_checks.len(),
            self.optional_checks.len()
        );

        self.check_epsilon_closure();
        self.check_optional_blocks()?;

        Ok(self.atn)
    }

    fn token_ref(&mut self, element: &Element, name: &str) -> Result<Handle, AtnError> {
        let ttype = self.grammar.token_type(name);
        Ok(self.atom(Some(element), TransitionKind::Atom(ttype)))
    }

    fn string_literal(&mut self, element: &Element, text: &str) -> Result<Handle, AtnError> {
        self.token_ref(element, text)
    }

    fn char_set_literal(&mut self, element: &Element) -> Result<Handle, AtnError> {
        Err(AtnError::UnsupportedElement {
            element: element.kind_name(),
            grammar_kind: self.grammar.kind().name(),
        })
    }

    fn range(&mut self, element: &Element, from: &Terminal, to: &Terminal) -> Result<Handle, AtnError> {
        self.report(
            ErrorKind::TOKEN_RANGE_IN_PARSER,
            from.position().or(element.position()),
            vec![from.text(), to.text()],
        );

        let ttype = self.grammar.token_type(from.text());
        Ok(self.atom(Some(element), TransitionKind::Atom(ttype)))
    }

    fn set(&mut self, element: &Element, items: &[Element], invert: bool) -> Result<Handle, AtnError> {
        let grammar = self.grammar;
        let mut set = crate::misc::IntervalSet::new();

        for item in items {
            set.add(grammar.token_type(&item.text()));
        }

        let kind = if invert {
            TransitionKind::NotSet(set)
        } else {
            TransitionKind::Set(set)
        };

        Ok(self.atom(Some(element), kind))
    }

    fn action(&mut self, source: ActionSource<'_>) -> Result<Handle, AtnError> {
        match source {
            ActionSource::Declared(element, _) => {
                let rule_index = self.current_rule_index()?;
                Ok(self.atom(Some(element), TransitionKind::Action {
                    rule_index,
                    action_index: None,
                    ctx_dependent: false,
                }))
            },
            _ => Err(AtnError::UnsupportedElement {
                element: "lexer command",
                grammar_kind: self.grammar.kind().name(),
            }),
        }
    }

    fn lexer_command(&mut self, _command: &LexerCommand) -> Result<Handle, AtnError> {
        Err(AtnError::UnsupportedElement {
            element: "lexer command",
            grammar_kind: self.grammar.kind().name(),
        })
    }

    fn lexer_alt_commands(&mut self, _alt: Handle, _commands: Handle) -> Result<Handle, AtnError> {
        Err(AtnError::UnsupportedElement {
            element: "lexer command",
            grammar_kind: self.grammar.kind().name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{Alternative, Block, Element, Rule},
        misc::IntervalSet,
    };

    fn parser(rules: Vec<Rule>) -> Grammar {
        let mut builder = Grammar::parser("T");
        for rule in rules {
            builder = builder.rule(rule);
        }
        builder.build().unwrap()
    }

    fn alt(elements: Vec<Element>) -> Alternative {
        Alternative::new(elements)
    }

    #[test]
    fn test_rule_states() {
        let grammar = parser(vec![
            Rule::new("a", vec![alt(vec![Element::token_ref("A"), Element::rule_ref("b")])]),
            Rule::new("b", vec![alt(vec![Element::token_ref("B")])]),
        ]);
        let mut errors = ErrorManager::new();
        let atn = ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        for rule in grammar.rules() {
            let start = atn.rule_to_start_state()[rule.index()];
            let stop = atn.rule_to_stop_state()[rule.index()];
            assert_eq!(atn[start].rule_index(), Some(rule.index()));
            assert_eq!(atn[stop].rule_index(), Some(rule.index()));
            assert_eq!(atn[start].kind(), &StateKind::RuleStart { stop, left_recursive: false });
        }

        // b is called by a, so only a is an entry rule
        let a_stop = atn.rule_to_stop_state()[0];
        let b_stop = atn.rule_to_stop_state()[1];
        assert_eq!(atn[a_stop].transitions()[0].kind, TransitionKind::Atom(TOKEN_EOF));
        assert!(atn[b_stop].transitions().iter().all(|t| t.kind == TransitionKind::Epsilon));
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_elem_list_removes_trivial_states() {
        let grammar = parser(vec![Rule::new("a", vec![alt(vec![Element::token_ref("A")])])]);
        let mut errors = ErrorManager::new();
        let mut factory = ParserAtnFactory::new(&grammar, &mut errors);
        factory.create_rule_start_and_stop_states();
        factory.set_current_rule(0);

        let elements = [Element::token_ref("A"), Element::token_ref("A"), Element::token_ref("A")];
        let handles: Vec<Handle> = elements.iter().map(|e| factory.token_ref(e, "A").unwrap()).collect();
        let sequence = factory.elem_list(&handles).unwrap();

        let atn = factory.atn();
        assert_eq!(atn.num_states(), 2 + 4);
        let reachable = atn.reachable_from(sequence.left);
        assert_eq!(reachable.len(), 4);
        assert!(reachable.contains(&sequence.right));
        assert_eq!(elements[1].atn_state(), Some(atn[sequence.left].transitions()[0].target));
    }

    #[test]
    fn test_elem_list_rejects_empty_input() {
        let grammar = parser(vec![Rule::new("a", vec![Alternative::epsilon()])]);
        let mut errors = ErrorManager::new();
        let mut factory = ParserAtnFactory::new(&grammar, &mut errors);
        assert!(matches!(factory.elem_list(&[]), Err(AtnError::Internal(_))));
        drop(factory);
        assert_eq!(errors.count(ErrorKind::INTERNAL_ERROR), 1);
    }

    #[test]
    fn test_bypass_edges() {
        let grammar = parser(vec![Rule::new(
            "a",
            vec![alt(vec![
                Element::block(Block::new(vec![alt(vec![Element::token_ref("A")])]).optional()),
                Element::block(Block::new(vec![alt(vec![Element::token_ref("B")]), alt(vec![Element::token_ref("C")])]).star()),
                Element::block(Block::new(vec![alt(vec![Element::token_ref("D")])]).optional().non_greedy()),
            ])],
        )]);
        let mut errors = ErrorManager::new();
        let atn = ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        for (_, state) in atn.states() {
            let end = match state.kind() {
                StateKind::BlockStart { kind: BlockKind::Basic, end: Some(end), .. } => *end,
                StateKind::StarLoopEntry { .. } => {
                    let targets: Vec<_> = state.transitions().iter().map(|t| t.target).collect();
                    let loop_ends = targets.iter().filter(|t| matches!(atn[**t].kind(), StateKind::LoopEnd { .. })).count();
                    assert_eq!(loop_ends, 1);
                    continue;
                },
                _ => continue,
            };

            let bypasses = state.transitions().iter().filter(|t| t.target == end).count();
            assert_eq!(bypasses, 1);
        }

        let non_greedy = atn.states().find(|(_, s)| s.is_non_greedy()).map(|(_, s)| s).unwrap();
        assert!(matches!(atn[non_greedy.transitions()[0].target].kind(), StateKind::BlockEnd { .. }));
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_epsilon_closure() {
        // y : x+ ; x : ;
        let grammar = parser(vec![
            Rule::new("y", vec![alt(vec![Element::block(Block::new(vec![alt(vec![Element::rule_ref("x")])]).plus())])]),
            Rule::new("x", vec![Alternative::epsilon()]),
        ]);
        let mut errors = ErrorManager::new();
        let result = ParserAtnFactory::new(&grammar, &mut errors).create_atn();

        assert!(result.is_ok());
        assert_eq!(errors.count(ErrorKind::EPSILON_CLOSURE), 1);
        assert_eq!(errors.of_kind(ErrorKind::EPSILON_CLOSURE).next().unwrap().args(), &["y".to_string()]);
    }

    #[test]
    fn test_left_recursive_follow() {
        let grammar = parser(vec![
            Rule::new("e", vec![alt(vec![
                Element::token_ref("INT"),
                Element::block(Block::new(vec![alt(vec![Element::precedence_predicate(2), Element::rule_ref("x")])]).star()),
            ])])
            .left_recursive(),
            Rule::new("x", vec![Alternative::epsilon()]),
        ]);
        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(errors.count(ErrorKind::EPSILON_LR_FOLLOW), 1);
        assert_eq!(errors.count(ErrorKind::EPSILON_CLOSURE), 0);
    }

    #[test]
    fn test_eof_closure() {
        let grammar = parser(vec![Rule::new(
            "a",
            vec![alt(vec![Element::block(Block::new(vec![alt(vec![Element::token_ref("EOF")])]).star())])],
        )]);
        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(errors.count(ErrorKind::EOF_CLOSURE), 1);
    }

    #[test]
    fn test_epsilon_optional() {
        // y : x? ; x : ;
        let grammar = parser(vec![
            Rule::new("y", vec![alt(vec![Element::block(Block::new(vec![alt(vec![Element::rule_ref("x")])]).optional())])]),
            Rule::new("x", vec![Alternative::epsilon()]),
        ]);
        let mut errors = ErrorManager::new();
        let result = ParserAtnFactory::new(&grammar, &mut errors).create_atn();

        assert!(result.is_ok());
        assert_eq!(errors.count(ErrorKind::EPSILON_OPTIONAL), 1);
        assert_eq!(errors.num_errors(), 0);
    }

    /// Answers every lookahead query with the same set.
    struct FixedLookahead(IntervalSet);

    impl Lookahead for FixedLookahead {
        fn look(&self, _atn: &Atn, _from: StateId, _stop: Option<StateId>) -> IntervalSet {
            self.0.clone()
        }
    }

    #[test]
    fn test_injected_lookahead() {
        // a : (A)? (B)* C ;
        let grammar = parser(vec![Rule::new("a", vec![alt(vec![
            Element::block(Block::new(vec![alt(vec![Element::token_ref("A")])]).optional()),
            Element::block(Block::new(vec![alt(vec![Element::token_ref("B")])]).star()),
            Element::token_ref("C"),
        ])])]);

        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors)
            .with_lookahead(FixedLookahead(IntervalSet::of(TOKEN_EPSILON, TOKEN_EPSILON)))
            .create_atn()
            .unwrap();
        assert_eq!(errors.count(ErrorKind::EPSILON_OPTIONAL), 1);
        assert_eq!(errors.count(ErrorKind::EPSILON_CLOSURE), 1);

        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors)
            .with_lookahead(FixedLookahead(IntervalSet::new()))
            .create_atn()
            .unwrap();
        assert!(errors.diagnostics().is_empty());

        // the real analyzer sees that A, B and C consume input
        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_wildcard_loop_warning() {
        let grammar = parser(vec![Rule::new(
            "a",
            vec![alt(vec![
                Element::block(Block::new(vec![alt(vec![Element::wildcard()])]).star()),
                Element::block(Block::new(vec![alt(vec![Element::wildcard()])]).plus().non_greedy()),
                Element::token_ref("A"),
            ])],
        )]);
        let mut errors = ErrorManager::new();
        ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(errors.count(ErrorKind::EXPECTED_NON_GREEDY_WILDCARD_BLOCK), 1);
        assert_eq!(errors.diagnostics()[0].args(), &["*".to_string()]);
    }

    #[test]
    fn test_parser_leaves() {
        let grammar = parser(vec![Rule::new(
            "a",
            vec![alt(vec![
                Element::range("'a'", "'z'"),
                Element::set(vec![Element::token_ref("A"), Element::token_ref("B")], true),
                Element::predicate("$x > 1"),
                Element::action("run()"),
            ])],
        )]);
        let mut errors = ErrorManager::new();
        let atn = ParserAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(errors.count(ErrorKind::TOKEN_RANGE_IN_PARSER), 1);

        let labels: Vec<TransitionKind> = atn
            .states()
            .flat_map(|(_, s)| s.transitions().iter().map(|t| t.kind.clone()))
            .filter(|k| !matches!(k, TransitionKind::Epsilon))
            .collect();

        assert!(labels.contains(&TransitionKind::NotSet(crate::misc::IntervalSet::of(1, 2))));
        assert!(labels.contains(&TransitionKind::Predicate { rule_index: 0, pred_index: 0, ctx_dependent: true }));
        assert!(labels.contains(&TransitionKind::Action { rule_index: 0, action_index: None, ctx_dependent: false }));
    }

    #[test]
    fn test_char_set_in_parser() {
        let grammar = parser(vec![Rule::new("a", vec![alt(vec![Element::char_set("[a-z]")])])]);
        let mut errors = ErrorManager::new();
        let result = ParserAtnFactory::new(&grammar, &mut errors).create_atn();

        assert!(matches!(result, Err(AtnError::UnsupportedElement { element: "char set", grammar_kind: "parser" })));
    }
}
