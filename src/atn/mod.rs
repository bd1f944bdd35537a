//! The augmented transition network (ATN) produced by the factories.
//!
//! States live in an arena owned by the [`Atn`] and are addressed by [`StateId`]s.
//! Removing a state only empties its slot, so ids stay stable for the lifetime
//! of an ATN.
//!
//! Inspect an ATN like so:
//! ```ignore
//! for (id, state) in atn.states() {
//!     for transition in state.transitions() {
//!         println!("{} -> {} on {}", id, transition.target, transition.kind);
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::{Index, IndexMut};

use ahash::AHashSet;

use crate::{
    grammar::GrammarKind,
    misc::IntervalSet,
};

mod ll1;
mod printer;

pub use ll1::*;
pub use printer::*;

/// Index of a state in its [`Atn`].
pub type StateId = usize;

/// Token type of the end of input.
pub const TOKEN_EOF: i32 = -1;
/// Pseudo token type that stands for "matches nothing" in lookahead sets.
pub const TOKEN_EPSILON: i32 = -2;
/// Token type of names that are not tokens.
pub const INVALID_TYPE: i32 = 0;
/// The smallest token type a grammar can define.
pub const MIN_USER_TOKEN_TYPE: i32 = 1;

/// Index of the mode a lexer starts in.
pub const DEFAULT_MODE: i32 = 0;
/// Token type that makes a lexer drop the token.
pub const SKIP: i32 = -3;
/// Token type that makes a lexer continue the current token.
pub const MORE: i32 = -2;
/// The channel for whitespace and comments.
pub const HIDDEN: i32 = 1;
/// The channel tokens are emitted on by default.
pub const DEFAULT_TOKEN_CHANNEL: i32 = 0;
/// The smallest channel number a grammar can define.
pub const MIN_USER_CHANNEL_VALUE: i32 = 2;
/// The largest char a lexer can match.
pub const MAX_CHAR: i32 = 0x10FFFF;

/// Names that mean the same thing in every lexer and cannot be redefined.
pub const COMMON_CONSTANTS: &[(&str, i32)] = &[
    ("HIDDEN", HIDDEN),
    ("DEFAULT_TOKEN_CHANNEL", DEFAULT_TOKEN_CHANNEL),
    ("DEFAULT_MODE", DEFAULT_MODE),
    ("SKIP", SKIP),
    ("MORE", MORE),
    ("EOF", TOKEN_EOF),
];

/// Look up the value of a name in [`COMMON_CONSTANTS`].
pub fn common_constant(name: &str) -> Option<i32> {
    COMMON_CONSTANTS.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
}

/// The flavor of a block start.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A plain `(...)` or `(...)?` block.
    Basic,
    /// The body of a `(...)*` loop.
    Star,
    /// The body of a `(...)+` loop.
    Plus,
}

/// What a state is for. Back-references to related states are filled in
/// while the surrounding construct is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateKind {
    #[allow(missing_docs)]
    Basic,
    /// Entry of a rule.
    RuleStart {
        /// The rule's stop state.
        stop: StateId,
        /// Whether the rule is a rewritten left-recursive rule.
        left_recursive: bool,
    },
    /// Exit of a rule.
    RuleStop,
    /// Entry of a block.
    BlockStart {
        #[allow(missing_docs)]
        kind: BlockKind,
        /// The matching [`StateKind::BlockEnd`].
        end: Option<StateId>,
        /// For `+` loops, the [`StateKind::PlusLoopBack`].
        loop_back: Option<StateId>,
    },
    /// Exit of a block.
    BlockEnd {
        /// The matching [`StateKind::BlockStart`].
        start: Option<StateId>,
    },
    /// The decision of a `*` loop: enter the body or skip it.
    StarLoopEntry {
        /// The loop's [`StateKind::StarLoopBack`].
        loop_back: Option<StateId>,
    },
    /// Exit of a `*` or `+` loop.
    LoopEnd {
        /// The loop's back state.
        loop_back: Option<StateId>,
    },
    /// Jumps from the end of a `*` body back to the loop entry.
    StarLoopBack,
    /// The decision of a `+` loop: repeat the body or exit.
    PlusLoopBack,
    /// The entry of a lexer mode.
    TokensStart,
}

impl StateKind {
    /// A short name for the kind of state.
    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Basic => "Basic",
            StateKind::RuleStart { .. } => "RuleStart",
            StateKind::RuleStop => "RuleStop",
            StateKind::BlockStart { kind: BlockKind::Basic, .. } => "BlockStart",
            StateKind::BlockStart { kind: BlockKind::Star, .. } => "StarBlockStart",
            StateKind::BlockStart { kind: BlockKind::Plus, .. } => "PlusBlockStart",
            StateKind::BlockEnd { .. } => "BlockEnd",
            StateKind::StarLoopEntry { .. } => "StarLoopEntry",
            StateKind::LoopEnd { .. } => "LoopEnd",
            StateKind::StarLoopBack => "StarLoopBack",
            StateKind::PlusLoopBack => "PlusLoopBack",
            StateKind::TokensStart => "TokensStart",
        }
    }
}

/// Side effects a lexer rule can trigger when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerAction {
    /// `skip`
    Skip,
    /// `more`
    More,
    /// `popMode`
    PopMode,
    /// `mode(n)`
    Mode(i32),
    /// `pushMode(n)`
    PushMode(i32),
    /// `type(n)`
    Type(i32),
    /// `channel(n)`
    Channel(i32),
    /// Target-specific code, identified by the rule and its action index.
    Custom {
        /// The rule containing the action.
        rule_index: usize,
        /// Index of the action in the grammar.
        action_index: usize,
    },
}

impl Display for LexerAction {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            LexerAction::Skip => write!(f, "skip"),
            LexerAction::More => write!(f, "more"),
            LexerAction::PopMode => write!(f, "popMode"),
            LexerAction::Mode(mode) => write!(f, "mode({})", mode),
            LexerAction::PushMode(mode) => write!(f, "pushMode({})", mode),
            LexerAction::Type(ttype) => write!(f, "type({})", ttype),
            LexerAction::Channel(channel) => write!(f, "channel({})", channel),
            LexerAction::Custom { rule_index, action_index } => write!(f, "custom({}, {})", rule_index, action_index),
        }
    }
}

/// The label of a [`Transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionKind {
    /// Matches nothing.
    Epsilon,
    /// Matches a single char or token type.
    Atom(i32),
    /// Matches an inclusive range of chars.
    Range(i32, i32),
    /// Matches any element of the set.
    Set(IntervalSet),
    /// Matches anything but the elements of the set.
    NotSet(IntervalSet),
    /// Matches anything.
    Wildcard,
    /// Executes an embedded action.
    Action {
        #[allow(missing_docs)]
        rule_index: usize,
        /// Index into the lexer-action table. Parser actions have none.
        action_index: Option<usize>,
        #[allow(missing_docs)]
        ctx_dependent: bool,
    },
    /// Calls a rule. The transition target is the rule's start state.
    Rule {
        /// The called rule.
        rule_index: usize,
        #[allow(missing_docs)]
        precedence: i32,
        /// Where matching continues once the called rule returns.
        follow: StateId,
    },
    /// Evaluates a semantic predicate.
    Predicate {
        #[allow(missing_docs)]
        rule_index: usize,
        #[allow(missing_docs)]
        pred_index: usize,
        #[allow(missing_docs)]
        ctx_dependent: bool,
    },
    /// Evaluates a precedence predicate of a left-recursive rule.
    PrecedencePredicate(i32),
}

impl TransitionKind {
    /// Whether following this transition consumes no input.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            TransitionKind::Epsilon
                | TransitionKind::Action { .. }
                | TransitionKind::Rule { .. }
                | TransitionKind::Predicate { .. }
                | TransitionKind::PrecedencePredicate(_)
        )
    }

    /// The set of symbols this transition matches, if it matches a fixed set.
    /// For [`TransitionKind::NotSet`] this is the excluded set.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            TransitionKind::Atom(a) => Some(IntervalSet::of(*a, *a)),
            TransitionKind::Range(a, b) => Some(IntervalSet::of(*a, *b)),
            TransitionKind::Set(set) | TransitionKind::NotSet(set) => Some(set.clone()),
            _ => None,
        }
    }
}

impl Display for TransitionKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match self {
            TransitionKind::Epsilon => write!(f, "ε"),
            TransitionKind::Atom(a) => write!(f, "{}", a),
            TransitionKind::Range(a, b) => write!(f, "{}..{}", a, b),
            TransitionKind::Set(set) => write!(f, "{}", set),
            TransitionKind::NotSet(set) => write!(f, "~{}", set),
            TransitionKind::Wildcard => write!(f, "."),
            TransitionKind::Action { rule_index, action_index: Some(index), .. } => write!(f, "action_{}:{}", rule_index, index),
            TransitionKind::Action { rule_index, action_index: None, .. } => write!(f, "action_{}", rule_index),
            TransitionKind::Rule { rule_index, .. } => write!(f, "rule_{}", rule_index),
            TransitionKind::Predicate { rule_index, pred_index, .. } => write!(f, "pred_{}:{}", rule_index, pred_index),
            TransitionKind::PrecedencePredicate(precedence) => write!(f, "{} >= _p", precedence),
        }
    }
}

/// A labeled edge to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The state this transition leads to.
    pub target: StateId,
    /// What the transition matches.
    pub kind: TransitionKind,
}

impl Transition {
    /// Create a transition.
    pub fn new(target: StateId, kind: TransitionKind) -> Self {
        Self {
            target,
            kind,
        }
    }

    /// An epsilon transition to `target`.
    pub fn epsilon(target: StateId) -> Self {
        Self::new(target, TransitionKind::Epsilon)
    }

    /// Whether following this transition consumes no input.
    pub fn is_epsilon(&self) -> bool {
        self.kind.is_epsilon()
    }
}

/// A node of the ATN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnState {
    rule_index: Option<usize>,
    kind: StateKind,
    transitions: Vec<Transition>,
    decision: Option<usize>,
    non_greedy: bool,
}

impl AtnState {
    /// The rule this state belongs to. Only the shared EOF target of a parser ATN belongs to no rule.
    pub fn rule_index(&self) -> Option<usize> {
        self.rule_index
    }

    /// What this state is for.
    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut StateKind {
        &mut self.kind
    }

    /// The outgoing transitions in priority order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub(crate) fn transitions_mut(&mut self) -> &mut Vec<Transition> {
        &mut self.transitions
    }

    /// The decision number, if this is a decision state.
    pub fn decision(&self) -> Option<usize> {
        self.decision
    }

    /// Whether this decision prefers exiting over matching more.
    pub fn is_non_greedy(&self) -> bool {
        self.non_greedy
    }

    pub(crate) fn set_non_greedy(&mut self, non_greedy: bool) {
        self.non_greedy = non_greedy;
    }
}

/// An augmented transition network for a lexer or a parser grammar.
#[derive(Debug, Clone)]
pub struct Atn {
    grammar_kind: GrammarKind,
    max_token_type: i32,
    states: Vec<Option<AtnState>>,
    decision_to_state: Vec<StateId>,
    rule_to_start_state: Vec<StateId>,
    rule_to_stop_state: Vec<StateId>,
    rule_to_token_type: Vec<i32>,
    mode_to_start_state: Vec<StateId>,
    lexer_actions: Vec<LexerAction>,
}

impl Atn {
    /// Create an empty ATN.
    pub fn new(grammar_kind: GrammarKind, max_token_type: i32) -> Self {
        Self {
            grammar_kind,
            max_token_type,
            states: Vec::new(),
            decision_to_state: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    /// Whether this ATN recognizes chars or tokens.
    pub fn grammar_kind(&self) -> GrammarKind {
        self.grammar_kind
    }

    /// The largest token type of the grammar.
    pub fn max_token_type(&self) -> i32 {
        self.max_token_type
    }

    /// Everything a wildcard matches: all chars in a lexer, all token types in a parser.
    pub fn vocabulary(&self) -> IntervalSet {
        match self.grammar_kind {
            GrammarKind::Lexer => IntervalSet::of(0, MAX_CHAR),
            GrammarKind::Parser => IntervalSet::of(MIN_USER_TOKEN_TYPE, self.max_token_type),
        }
    }

    /// Create a new state without transitions.
    pub fn add_state(&mut self, rule_index: Option<usize>, kind: StateKind) -> StateId {
        self.states.push(Some(AtnState {
            rule_index,
            kind,
            transitions: Vec::new(),
            decision: None,
            non_greedy: false,
        }));
        self.states.len() - 1
    }

    /// Remove a state. Its id is never reused.
    pub fn remove_state(&mut self, id: StateId) {
        if let Some(slot) = self.states.get_mut(id) {
            *slot = None;
        }
    }

    /// Make `id` a decision state and return its new decision number.
    /// Calling this twice for the same state returns the existing number.
    pub fn define_decision_state(&mut self, id: StateId) -> usize {
        if let Some(decision) = self[id].decision {
            return decision;
        }

        let decision = self.decision_to_state.len();
        self.decision_to_state.push(id);
        self[id].decision = Some(decision);
        decision
    }

    /// Append a transition to the outgoing transitions of `from`.
    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        self[from].transitions.push(transition);
    }

    /// Add `from -ε-> to`.
    pub fn epsilon(&mut self, from: StateId, to: StateId) {
        self.add_transition(from, Transition::epsilon(to));
    }

    /// The state `id`, or `None` if it was removed or never existed.
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id).and_then(Option::as_ref)
    }

    /// All live states in ascending id order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &AtnState)> {
        self.states.iter().enumerate().filter_map(|(id, state)| state.as_ref().map(|s| (id, s)))
    }

    /// Number of states that have not been removed.
    pub fn num_states(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    /// Number of transitions of all live states.
    pub fn num_transitions(&self) -> usize {
        self.states().map(|(_, s)| s.transitions.len()).sum()
    }

    /// The decision states in decision-number order.
    pub fn decision_to_state(&self) -> &[StateId] {
        &self.decision_to_state
    }

    /// Rule start states in rule-index order.
    pub fn rule_to_start_state(&self) -> &[StateId] {
        &self.rule_to_start_state
    }

    /// Rule stop states in rule-index order.
    pub fn rule_to_stop_state(&self) -> &[StateId] {
        &self.rule_to_stop_state
    }

    pub(crate) fn push_rule(&mut self, start: StateId, stop: StateId) {
        self.rule_to_start_state.push(start);
        self.rule_to_stop_state.push(stop);
    }

    /// For lexers, the token type each rule emits. Fragment rules emit [`INVALID_TYPE`].
    pub fn rule_to_token_type(&self) -> &[i32] {
        &self.rule_to_token_type
    }

    pub(crate) fn set_rule_to_token_type(&mut self, types: Vec<i32>) {
        self.rule_to_token_type = types;
    }

    /// For lexers, the [`StateKind::TokensStart`] of every mode in mode order.
    pub fn mode_to_start_state(&self) -> &[StateId] {
        &self.mode_to_start_state
    }

    pub(crate) fn push_mode_start(&mut self, start: StateId) {
        self.mode_to_start_state.push(start);
    }

    /// For lexers, the deduplicated table of actions that [`TransitionKind::Action`] indices point into.
    pub fn lexer_actions(&self) -> &[LexerAction] {
        &self.lexer_actions
    }

    pub(crate) fn set_lexer_actions(&mut self, actions: Vec<LexerAction>) {
        self.lexer_actions = actions;
    }

    /// All states reachable from `start`. Rule calls are followed into the
    /// called rule and to their follow state.
    pub fn reachable_from(&self, start: StateId) -> AHashSet<StateId> {
        let mut seen = AHashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            let Some(state) = self.state(id) else {
                continue;
            };

            if !seen.insert(id) {
                continue;
            }

            for transition in &state.transitions {
                queue.push_back(transition.target);

                if let TransitionKind::Rule { follow, .. } = &transition.kind {
                    queue.push_back(*follow);
                }
            }
        }

        seen
    }
}

impl Index<StateId> for Atn {
    type Output = AtnState;

    /// # Panics
    /// If the state was removed.
    fn index(&self, id: StateId) -> &AtnState {
        match self.states.get(id) {
            Some(Some(state)) => state,
            _ => panic!("ATN state {} does not exist", id),
        }
    }
}

impl IndexMut<StateId> for Atn {
    fn index_mut(&mut self, id: StateId) -> &mut AtnState {
        match self.states.get_mut(id) {
            Some(Some(state)) => state,
            _ => panic!("ATN state {} does not exist", id),
        }
    }
}

/// The entry and exit state of a piece of ATN.
///
/// New transitions are only ever added to `right`. `left` is complete once the
/// handle is returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    /// Entry state.
    pub left: StateId,
    /// Exit state.
    pub right: StateId,
}

impl Handle {
    /// Create a handle.
    pub fn new(left: StateId, right: StateId) -> Self {
        Self {
            left,
            right,
        }
    }
}
