use std::cell::Cell;
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;

use crate::atn::StateId;

/// Name of the mode every lexer rule belongs to unless it says otherwise.
pub const DEFAULT_MODE_NAME: &str = "DEFAULT_MODE";

/// A location in the grammar source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// 1-based line.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A single token of grammar text, e.g. one end of a range or the name of a lexer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    text: String,
    position: Option<Position>,
}

impl Terminal {
    /// Create a terminal without a source position.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            position: None,
        }
    }

    /// Attach a source position.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position::new(line, column));
        self
    }

    /// The token text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Where the token appears in the grammar source.
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

/// An embedded action `{...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// The action code without braces.
    pub text: String,
    /// Index into the lexer-action table of the grammar. Only lexer actions have one.
    pub index: Option<usize>,
}

/// The repetition suffix of a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SuffixKind {
    /// `?`
    Optional,
    /// `*`
    Star,
    /// `+`
    Plus,
}

impl SuffixKind {
    /// The suffix as written in a grammar.
    pub fn symbol(&self) -> &'static str {
        match self {
            SuffixKind::Optional => "?",
            SuffixKind::Star => "*",
            SuffixKind::Plus => "+",
        }
    }
}

/// A suffix like `*` or `+?` attached to a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Suffix {
    /// Which repetition.
    pub kind: SuffixKind,
    /// `false` for the non-greedy forms `??`, `*?` and `+?`.
    pub greedy: bool,
}

/// A parenthesized list of alternatives, optionally with a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    alts: Vec<Alternative>,
    suffix: Option<Suffix>,
}

impl Block {
    /// Create a block without suffix.
    pub fn new(alts: Vec<Alternative>) -> Self {
        Self {
            alts,
            suffix: None,
        }
    }

    fn with_suffix(mut self, kind: SuffixKind) -> Self {
        self.suffix = Some(Suffix {
            kind,
            greedy: true,
        });
        self
    }

    /// Turn the block into `(...)?`.
    pub fn optional(self) -> Self {
        self.with_suffix(SuffixKind::Optional)
    }

    /// Turn the block into `(...)*`.
    pub fn star(self) -> Self {
        self.with_suffix(SuffixKind::Star)
    }

    /// Turn the block into `(...)+`.
    pub fn plus(self) -> Self {
        self.with_suffix(SuffixKind::Plus)
    }

    /// Make the suffix non-greedy. Has no effect on blocks without suffix.
    pub fn non_greedy(mut self) -> Self {
        if let Some(suffix) = &mut self.suffix {
            suffix.greedy = false;
        }
        self
    }

    /// The alternatives of this block.
    pub fn alts(&self) -> &[Alternative] {
        &self.alts
    }

    pub(crate) fn alts_mut(&mut self) -> &mut [Alternative] {
        &mut self.alts
    }

    /// The suffix of this block, if any.
    pub fn suffix(&self) -> Option<Suffix> {
        self.suffix
    }

    /// Whether some alternative consists of nothing but a wildcard.
    pub fn has_wildcard_alt(&self) -> bool {
        self.alts.iter().any(|alt| {
            alt.elements().len() == 1 && matches!(alt.elements()[0].kind(), ElementKind::Wildcard)
        })
    }
}

/// A lexer command like `skip` or `pushMode(STRING)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerCommand {
    name: Terminal,
    arg: Option<Terminal>,
    atn_state: Cell<Option<StateId>>,
}

impl LexerCommand {
    /// A command without argument.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: Terminal::new(name),
            arg: None,
            atn_state: Cell::new(None),
        }
    }

    /// A command with an argument.
    pub fn call<S: Into<String>, A: Into<String>>(name: S, arg: A) -> Self {
        Self {
            name: Terminal::new(name),
            arg: Some(Terminal::new(arg)),
            atn_state: Cell::new(None),
        }
    }

    /// Attach a source position.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.name = self.name.at(line, column);
        self
    }

    /// The command name.
    pub fn name(&self) -> &Terminal {
        &self.name
    }

    /// The argument, if any.
    pub fn arg(&self) -> Option<&Terminal> {
        self.arg.as_ref()
    }

    /// The state of the action transition built for this command.
    pub fn atn_state(&self) -> Option<StateId> {
        self.atn_state.get()
    }

    pub(crate) fn set_atn_state(&self, state: StateId) {
        self.atn_state.set(Some(state));
    }
}

/// One alternative: a sequence of elements plus the lexer commands after `->`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alternative {
    elements: Vec<Element>,
    commands: Vec<LexerCommand>,
}

impl Alternative {
    /// Create an alternative from a sequence of elements.
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            commands: Vec::new(),
        }
    }

    /// The empty alternative.
    pub fn epsilon() -> Self {
        Self::default()
    }

    /// Attach lexer commands.
    pub fn with_commands(mut self, commands: Vec<LexerCommand>) -> Self {
        self.commands = commands;
        self
    }

    /// The elements in order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut [Element] {
        &mut self.elements
    }

    /// The lexer commands in order.
    pub fn commands(&self) -> &[LexerCommand] {
        &self.commands
    }
}

/// What an [`Element`] is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// A reference to a token, `ID`.
    TokenRef(String),
    /// A reference to a parser rule, `expr` or `expr<p=3>`.
    RuleRef {
        /// The referenced rule.
        name: String,
        /// Precedence argument of a call into a left-recursive rule.
        precedence: Option<i32>,
    },
    /// A string literal including quotes, `'abc'`.
    StringLiteral(String),
    /// A char set literal including brackets, `[a-z]`.
    CharSet(String),
    /// A range between two char literals, `'a'..'z'`.
    Range(Terminal, Terminal),
    /// A set `('a'|'b'..'c')` or its complement `~('a'|'b')`.
    Set {
        /// Literals, ranges, char sets or token refs.
        items: Vec<Element>,
        /// `~`
        invert: bool,
    },
    /// `.`
    Wildcard,
    /// `{...}`
    Action(Action),
    /// `{...}?`
    Predicate {
        /// The predicate code without braces and question mark.
        text: String,
        /// Index of the predicate in its grammar.
        index: usize,
        /// Set on precedence predicates of left-recursive rules.
        precedence: Option<i32>,
    },
    /// A nested block.
    Block(Block),
}

/// A node of a rule's syntax tree.
///
/// The factories remember the ATN state they created for a node in it, which is
/// the only thing about the tree that changes while building an ATN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    kind: ElementKind,
    position: Option<Position>,
    atn_state: Cell<Option<StateId>>,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            position: None,
            atn_state: Cell::new(None),
        }
    }

    /// `ID`
    pub fn token_ref<S: Into<String>>(name: S) -> Self {
        Self::new(ElementKind::TokenRef(name.into()))
    }

    /// `expr`
    pub fn rule_ref<S: Into<String>>(name: S) -> Self {
        Self::new(ElementKind::RuleRef {
            name: name.into(),
            precedence: None,
        })
    }

    /// `expr<p=precedence>`
    pub fn rule_ref_with_precedence<S: Into<String>>(name: S, precedence: i32) -> Self {
        Self::new(ElementKind::RuleRef {
            name: name.into(),
            precedence: Some(precedence),
        })
    }

    /// A string literal. `text` must include the quotes.
    pub fn literal<S: Into<String>>(text: S) -> Self {
        Self::new(ElementKind::StringLiteral(text.into()))
    }

    /// A char set literal. `text` must include the brackets.
    pub fn char_set<S: Into<String>>(text: S) -> Self {
        Self::new(ElementKind::CharSet(text.into()))
    }

    /// `from..to` where both are char literals including quotes.
    pub fn range<S: Into<String>, T: Into<String>>(from: S, to: T) -> Self {
        Self::new(ElementKind::Range(Terminal::new(from), Terminal::new(to)))
    }

    /// `(a|b|c)` or `~(a|b|c)`.
    pub fn set(items: Vec<Element>, invert: bool) -> Self {
        Self::new(ElementKind::Set {
            items,
            invert,
        })
    }

    /// `.`
    pub fn wildcard() -> Self {
        Self::new(ElementKind::Wildcard)
    }

    /// `{text}`
    pub fn action<S: Into<String>>(text: S) -> Self {
        Self::new(ElementKind::Action(Action {
            text: text.into(),
            index: None,
        }))
    }

    /// `{text}?`
    pub fn predicate<S: Into<String>>(text: S) -> Self {
        Self::new(ElementKind::Predicate {
            text: text.into(),
            index: 0,
            precedence: None,
        })
    }

    /// `{precpred(_ctx, precedence)}?`
    pub fn precedence_predicate(precedence: i32) -> Self {
        Self::new(ElementKind::Predicate {
            text: format!("precpred(_ctx, {})", precedence),
            index: 0,
            precedence: Some(precedence),
        })
    }

    /// A nested block.
    pub fn block(block: Block) -> Self {
        Self::new(ElementKind::Block(block))
    }

    /// Attach a source position.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position::new(line, column));
        self
    }

    /// What this element is.
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ElementKind {
        &mut self.kind
    }

    /// Where this element appears in the grammar source.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// The ATN state that was created for this element, once an ATN was built.
    pub fn atn_state(&self) -> Option<StateId> {
        self.atn_state.get()
    }

    pub(crate) fn set_atn_state(&self, state: StateId) {
        self.atn_state.set(Some(state));
    }

    /// The element as it would appear in grammar source. Compound elements
    /// list their items separated by `|`.
    pub fn text(&self) -> String {
        match &self.kind {
            ElementKind::TokenRef(name) => name.clone(),
            ElementKind::RuleRef { name, .. } => name.clone(),
            ElementKind::StringLiteral(text) | ElementKind::CharSet(text) => text.clone(),
            ElementKind::Range(from, to) => format!("{}..{}", from.text(), to.text()),
            ElementKind::Set { items, .. } => items.iter().map(Element::text).join(" | "),
            ElementKind::Wildcard => ".".to_string(),
            ElementKind::Action(action) => format!("{{{}}}", action.text),
            ElementKind::Predicate { text, .. } => format!("{{{}}}?", text),
            ElementKind::Block(block) => {
                let alts = block
                    .alts()
                    .iter()
                    .map(|alt| alt.elements().iter().map(Element::text).join(" "))
                    .join(" | ");
                let suffix = block.suffix().map(|s| s.kind.symbol()).unwrap_or("");
                format!("({}){}", alts, suffix)
            },
        }
    }

    /// Short name of the kind of this element, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::TokenRef(_) => "token reference",
            ElementKind::RuleRef { .. } => "rule reference",
            ElementKind::StringLiteral(_) => "string literal",
            ElementKind::CharSet(_) => "char set",
            ElementKind::Range(..) => "range",
            ElementKind::Set { .. } => "set",
            ElementKind::Wildcard => "wildcard",
            ElementKind::Action(_) => "action",
            ElementKind::Predicate { .. } => "predicate",
            ElementKind::Block(_) => "block",
        }
    }
}

/// A lexer or parser rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    index: usize,
    name: String,
    block: Block,
    fragment: bool,
    mode: String,
    case_insensitive: Option<bool>,
    left_recursive: bool,
    position: Option<Position>,
}

impl Rule {
    /// Create a rule `name : alts ;`.
    pub fn new<S: Into<String>>(name: S, alts: Vec<Alternative>) -> Self {
        Self {
            index: 0,
            name: name.into(),
            block: Block::new(alts),
            fragment: false,
            mode: DEFAULT_MODE_NAME.to_string(),
            case_insensitive: None,
            left_recursive: false,
            position: None,
        }
    }

    /// Mark this as a fragment lexer rule.
    pub fn fragment(mut self) -> Self {
        self.fragment = true;
        self
    }

    /// Put this lexer rule into mode `mode`.
    pub fn in_mode<S: Into<String>>(mut self, mode: S) -> Self {
        self.mode = mode.into();
        self
    }

    /// Override the grammar-wide `caseInsensitive` option for this rule.
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = Some(case_insensitive);
        self
    }

    /// Mark this as a left-recursive parser rule.
    pub fn left_recursive(mut self) -> Self {
        self.left_recursive = true;
        self
    }

    /// Attach a source position.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.position = Some(Position::new(line, column));
        self
    }

    /// Position of the rule in the grammar's rule list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// The rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The body of the rule.
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub(crate) fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    /// Whether this is a fragment rule.
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    /// The mode this lexer rule belongs to.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// The rule-level `caseInsensitive` option, if set.
    pub fn case_insensitive_option(&self) -> Option<bool> {
        self.case_insensitive
    }

    /// Whether this rule was rewritten from a left-recursive rule.
    pub fn is_left_recursive(&self) -> bool {
        self.left_recursive
    }

    /// Where the rule is defined.
    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_text() {
        let set = Element::set(
            vec![Element::literal("'a'"), Element::range("'c'", "'f'"), Element::char_set("[x-z]")],
            false,
        );
        assert_eq!(set.text(), "'a' | 'c'..'f' | [x-z]");

        let block = Element::block(
            Block::new(vec![
                Alternative::new(vec![Element::token_ref("A"), Element::rule_ref("b")]),
                Alternative::epsilon(),
            ])
            .star(),
        );
        assert_eq!(block.text(), "(A b | )*");
    }

    #[test]
    fn test_wildcard_alt() {
        let block = Block::new(vec![Alternative::new(vec![Element::wildcard()])]).plus();
        assert!(block.has_wildcard_alt());

        let block = Block::new(vec![Alternative::new(vec![Element::wildcard(), Element::token_ref("A")])]);
        assert!(!block.has_wildcard_alt());
    }
}
