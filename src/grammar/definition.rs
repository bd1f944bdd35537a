use ahash::AHashMap;

use crate::{
    atn::{HIDDEN, DEFAULT_TOKEN_CHANNEL, INVALID_TYPE, TOKEN_EOF},
    grammar::{GrammarBuilder, Rule},
    misc::char_support,
};

/// Whether a grammar describes a lexer or a parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// Rules match chars and emit tokens.
    Lexer,
    /// Rules match tokens.
    Parser,
}

impl GrammarKind {
    /// `"lexer"` or `"parser"`.
    pub fn name(&self) -> &'static str {
        match self {
            GrammarKind::Lexer => "lexer",
            GrammarKind::Parser => "parser",
        }
    }
}

/// A validated grammar: its rules in declaration order plus the symbol tables
/// the ATN factories look names up in.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) kind: GrammarKind,
    pub(crate) name: String,
    pub(crate) file_name: String,
    pub(crate) case_insensitive: bool,
    pub(crate) rules: Vec<Rule>,
    pub(crate) rule_indices: AHashMap<String, usize>,
    pub(crate) token_types: AHashMap<String, i32>,
    pub(crate) token_names: Vec<String>,
    pub(crate) channels: AHashMap<String, i32>,
    pub(crate) modes: Vec<String>,
    pub(crate) lexer_action_count: usize,
}

impl Grammar {
    /// Start building a lexer grammar.
    pub fn lexer<S: Into<String>>(name: S) -> GrammarBuilder {
        GrammarBuilder::new(GrammarKind::Lexer, name)
    }

    /// Start building a parser grammar.
    pub fn parser<S: Into<String>>(name: S) -> GrammarBuilder {
        GrammarBuilder::new(GrammarKind::Parser, name)
    }

    /// Lexer or parser.
    pub fn kind(&self) -> GrammarKind {
        self.kind
    }

    /// Whether this is a lexer grammar.
    pub fn is_lexer(&self) -> bool {
        self.kind == GrammarKind::Lexer
    }

    /// The grammar name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file diagnostics are reported against.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The grammar-level `caseInsensitive` option.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Whether `rule` matches letters regardless of case.
    pub fn is_rule_case_insensitive(&self, rule: &Rule) -> bool {
        rule.case_insensitive_option().unwrap_or(self.case_insensitive)
    }

    /// All rules, indexed by [`Rule::index`].
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rule_indices.get(name).map(|i| &self.rules[*i])
    }

    /// The token type of a token name or, in parsers, of a literal like `'+'`.
    /// Unknown names yield [`INVALID_TYPE`].
    pub fn token_type(&self, name: &str) -> i32 {
        if name == "EOF" {
            return TOKEN_EOF;
        }

        self.token_types.get(name).copied().unwrap_or(INVALID_TYPE)
    }

    /// The largest defined token type.
    pub fn max_token_type(&self) -> i32 {
        self.token_names.len() as i32 - 1
    }

    /// How a token type is shown in diagnostics and ATN dumps.
    pub fn token_display_name(&self, ttype: i32) -> String {
        if ttype == TOKEN_EOF {
            return "EOF".to_string();
        }

        if self.is_lexer() {
            return char_support::char_literal_for_char(ttype);
        }

        usize::try_from(ttype)
            .ok()
            .and_then(|t| self.token_names.get(t))
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| ttype.to_string())
    }

    /// The value of a channel name. `HIDDEN` and `DEFAULT_TOKEN_CHANNEL` are always defined.
    pub fn channel_value(&self, name: &str) -> Option<i32> {
        match name {
            "HIDDEN" => Some(HIDDEN),
            "DEFAULT_TOKEN_CHANNEL" => Some(DEFAULT_TOKEN_CHANNEL),
            _ => self.channels.get(name).copied(),
        }
    }

    /// The lexer modes in definition order, `DEFAULT_MODE` first.
    pub fn mode_names(&self) -> &[String] {
        &self.modes
    }

    /// Index of a lexer mode.
    pub fn mode_index(&self, name: &str) -> Option<usize> {
        self.modes.iter().position(|m| m == name)
    }

    /// The rules of a lexer mode in declaration order.
    pub fn mode_rules<'g>(&'g self, mode: &'g str) -> impl Iterator<Item = &'g Rule> + 'g {
        self.rules.iter().filter(move |r| r.mode() == mode)
    }

    /// Number of embedded actions in lexer rules.
    pub fn lexer_action_count(&self) -> usize {
        self.lexer_action_count
    }
}
