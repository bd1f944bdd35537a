use std::path::Path;

use ahash::{AHashMap, AHashSet};

use crate::{
    atn::MIN_USER_CHANNEL_VALUE,
    error::{GrammarError, ParsingError},
    grammar::{Element, ElementKind, Grammar, GrammarKind, Rule, DEFAULT_MODE_NAME},
    parser::json,
};

/// The GrammarBuilder collects rules and symbol declarations and produces a validated [`Grammar`].
///
/// Use it like so:
/// ```ignore
/// let grammar = Grammar::lexer("Expr")
///     .rule(Rule::new("INT", vec![
///         Alternative::new(vec![Element::block(Block::new(vec![
///             Alternative::new(vec![Element::char_set("[0-9]")]),
///         ]).plus())]),
///     ]))
///     .channel("COMMENTS")
///     .build()?;
/// ```
/// or from a description on disk:
/// ```ignore
/// let grammar = Grammar::parser("Expr")
///     .json_grammar("expr.json")?
///     .build()?;
/// ```
pub struct GrammarBuilder {
    kind: GrammarKind,
    name: String,
    file_name: Option<String>,
    case_insensitive: bool,
    implicit_tokens: bool,
    rules: Vec<Rule>,
    tokens: Vec<String>,
    channels: Vec<String>,
    modes: Vec<String>,
}

impl GrammarBuilder {
    /// Start an empty grammar of kind `kind`.
    pub fn new<S: Into<String>>(kind: GrammarKind, name: S) -> Self {
        Self {
            kind,
            name: name.into(),
            file_name: None,
            case_insensitive: false,
            implicit_tokens: true,
            rules: Vec::new(),
            tokens: Vec::new(),
            channels: Vec::new(),
            modes: Vec::new(),
        }
    }

    /// Append a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Declare a token type like in a `tokens { ... }` section.
    pub fn token<S: Into<String>>(mut self, name: S) -> Self {
        self.tokens.push(name.into());
        self
    }

    /// Declare a channel like in a `channels { ... }` section.
    pub fn channel<S: Into<String>>(mut self, name: S) -> Self {
        self.channels.push(name.into());
        self
    }

    /// Declare a lexer mode. Modes that rules are put into are declared automatically.
    pub fn mode<S: Into<String>>(mut self, name: S) -> Self {
        self.modes.push(name.into());
        self
    }

    /// Set the file name diagnostics are reported against. Defaults to `<name>.g4`.
    pub fn file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Set the grammar-wide `caseInsensitive` option.
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Whether undeclared token references in parser grammars define new token types.
    /// If disabled, [`build`](GrammarBuilder::build) fails with [`GrammarError::MissingToken`] instead.
    /// On by default.
    pub fn implicit_tokens(mut self, implicit_tokens: bool) -> Self {
        self.implicit_tokens = implicit_tokens;
        self
    }

    /// Load rules and declarations from a JSON grammar description. The
    /// description may override the grammar kind and the `caseInsensitive` option.
    pub fn json_grammar<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ParsingError> {
        let path = path.as_ref();
        let mut description = json::parse_json(path)?;

        if let Some(kind) = description.kind {
            self.kind = kind;
        }

        if let Some(case_insensitive) = description.case_insensitive {
            self.case_insensitive = case_insensitive;
        }

        if self.file_name.is_none() {
            self.file_name = path.file_name().map(|f| f.to_string_lossy().into_owned());
        }

        self.rules.append(&mut description.rules);
        self.tokens.append(&mut description.tokens);
        self.channels.append(&mut description.channels);
        self.modes.append(&mut description.modes);
        Ok(self)
    }
}

fn walk_elements_mut<F>(elements: &mut [Element], f: &mut F)
where
    F: FnMut(&mut Element),
{
    for element in elements {
        f(element);

        match element.kind_mut() {
            ElementKind::Block(block) => {
                for alt in block.alts_mut() {
                    walk_elements_mut(alt.elements_mut(), f);
                }
            },
            ElementKind::Set { items, .. } => walk_elements_mut(items, f),
            _ => {},
        }
    }
}

/// Flattens a tree of elements in source order. The flag says whether an element is an item of a set.
fn flatten<'e>(elements: &'e [Element], in_set: bool, out: &mut Vec<(&'e Element, bool)>) {
    for element in elements {
        out.push((element, in_set));

        match element.kind() {
            ElementKind::Block(block) => {
                for alt in block.alts() {
                    flatten(alt.elements(), false, out);
                }
            },
            ElementKind::Set { items, .. } => flatten(items, true, out),
            _ => {},
        }
    }
}

fn rule_elements(rule: &Rule) -> Vec<(&Element, bool)> {
    let mut elements = Vec::new();

    for alt in rule.block().alts() {
        flatten(alt.elements(), false, &mut elements);
    }

    elements
}

impl GrammarBuilder {
    fn check_rules(&self) -> Result<(), GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }

        let mut defined = AHashSet::new();

        for rule in &self.rules {
            if !defined.insert(rule.name()) {
                return Err(GrammarError::DuplicateRule(rule.name().to_string()));
            }

            if self.kind == GrammarKind::Parser {
                let reason = if rule.is_fragment() {
                    Some("fragment rules are only allowed in lexer grammars")
                } else if rule.mode() != DEFAULT_MODE_NAME {
                    Some("modes are only allowed in lexer grammars")
                } else {
                    None
                };

                if let Some(reason) = reason {
                    return Err(GrammarError::MisplacedElement {
                        rule: rule.name().to_string(),
                        kind: self.kind.name(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_references(&self, rule_indices: &AHashMap<String, usize>) -> Result<(), GrammarError> {
        let declared: AHashSet<&str> = self.tokens.iter().map(String::as_str).collect();

        for rule in &self.rules {
            for (element, in_set) in rule_elements(rule) {
                match element.kind() {
                    ElementKind::RuleRef { name, .. } => {
                        if !rule_indices.contains_key(name) {
                            return Err(GrammarError::MissingRule {
                                rule: name.clone(),
                                referenced_by: rule.name().to_string(),
                            });
                        }
                    },
                    ElementKind::TokenRef(name) if name != "EOF" && !in_set => {
                        let missing = match self.kind {
                            GrammarKind::Lexer => !rule_indices.contains_key(name),
                            GrammarKind::Parser => !self.implicit_tokens && !declared.contains(name.as_str()),
                        };

                        if missing && self.kind == GrammarKind::Lexer {
                            return Err(GrammarError::MissingRule {
                                rule: name.clone(),
                                referenced_by: rule.name().to_string(),
                            });
                        } else if missing {
                            return Err(GrammarError::MissingToken {
                                token: name.clone(),
                                referenced_by: rule.name().to_string(),
                            });
                        }
                    },
                    _ => {},
                }
            }
        }

        Ok(())
    }

    fn assign_token_types(&self) -> (AHashMap<String, i32>, Vec<String>) {
        let mut types = AHashMap::new();
        let mut names = vec![String::new()];

        let mut define = |name: &str, types: &mut AHashMap<String, i32>| {
            if name == "EOF" || types.contains_key(name) {
                return;
            }

            types.insert(name.to_string(), names.len() as i32);
            names.push(name.to_string());
        };

        for token in &self.tokens {
            define(token, &mut types);
        }

        match self.kind {
            GrammarKind::Lexer => {
                for rule in self.rules.iter().filter(|r| !r.is_fragment()) {
                    define(rule.name(), &mut types);
                }
            },
            GrammarKind::Parser => {
                for rule in &self.rules {
                    for (element, _) in rule_elements(rule) {
                        match element.kind() {
                            ElementKind::TokenRef(name) if self.implicit_tokens => define(name, &mut types),
                            ElementKind::StringLiteral(text) => define(text, &mut types),
                            _ => {},
                        }
                    }
                }
            },
        }

        (types, names)
    }

    fn assign_channels(&self) -> AHashMap<String, i32> {
        let mut channels = AHashMap::new();

        for name in &self.channels {
            if !channels.contains_key(name) {
                let value = MIN_USER_CHANNEL_VALUE + channels.len() as i32;
                channels.insert(name.clone(), value);
            }
        }

        channels
    }

    fn assign_modes(&self) -> Vec<String> {
        let mut modes = vec![DEFAULT_MODE_NAME.to_string()];

        let declared = self.modes.iter().map(String::as_str);
        let used = self.rules.iter().map(Rule::mode);

        for mode in declared.chain(used) {
            if !modes.iter().any(|m| m == mode) {
                modes.push(mode.to_string());
            }
        }

        modes
    }

    /// Validate the rules and create the symbol tables.
    pub fn build(mut self) -> Result<Grammar, GrammarError> {
        self.check_rules()?;

        let mut rule_indices = AHashMap::new();

        for (index, rule) in self.rules.iter_mut().enumerate() {
            rule.set_index(index);
            rule_indices.insert(rule.name().to_string(), index);
        }

        self.check_references(&rule_indices)?;

        let is_lexer = self.kind == GrammarKind::Lexer;
        let mut next_action = 0;
        let mut next_predicate = 0;

        for rule in &mut self.rules {
            for alt in rule.block_mut().alts_mut() {
                walk_elements_mut(alt.elements_mut(), &mut |element| match element.kind_mut() {
                    ElementKind::Action(action) if is_lexer => {
                        action.index = Some(next_action);
                        next_action += 1;
                    },
                    ElementKind::Predicate { index, .. } => {
                        *index = next_predicate;
                        next_predicate += 1;
                    },
                    _ => {},
                });
            }
        }

        let (token_types, token_names) = self.assign_token_types();
        let channels = self.assign_channels();
        let modes = self.assign_modes();

        log::debug!(
            "Built {} grammar {} with {} rules and {} token types",
            self.kind.name(),
            self.name,
            self.rules.len(),
            token_names.len() - 1
        );

        Ok(Grammar {
            kind: self.kind,
            file_name: self.file_name.unwrap_or_else(|| format!("{}.g4", self.name)),
            name: self.name,
            case_insensitive: self.case_insensitive,
            rules: self.rules,
            rule_indices,
            token_types,
            token_names,
            channels,
            modes,
            lexer_action_count: next_action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atn::{HIDDEN, INVALID_TYPE, TOKEN_EOF},
        grammar::{Alternative, Block},
    };

    fn alt(elements: Vec<Element>) -> Vec<Alternative> {
        vec![Alternative::new(elements)]
    }

    #[test]
    fn test_lexer_tables() {
        let grammar = Grammar::lexer("L")
            .token("KEYWORD")
            .channel("COMMENTS")
            .rule(Rule::new("A", alt(vec![Element::literal("'a'"), Element::action("x")])))
            .rule(Rule::new("DIGIT", alt(vec![Element::char_set("[0-9]")])).fragment())
            .rule(Rule::new("B", alt(vec![Element::token_ref("DIGIT"), Element::action("y")])).in_mode("INSIDE"))
            .build()
            .unwrap();

        assert_eq!(grammar.file_name(), "L.g4");
        assert_eq!(grammar.token_type("KEYWORD"), 1);
        assert_eq!(grammar.token_type("A"), 2);
        assert_eq!(grammar.token_type("DIGIT"), INVALID_TYPE);
        assert_eq!(grammar.token_type("B"), 3);
        assert_eq!(grammar.token_type("EOF"), TOKEN_EOF);
        assert_eq!(grammar.max_token_type(), 3);

        assert_eq!(grammar.channel_value("COMMENTS"), Some(2));
        assert_eq!(grammar.channel_value("HIDDEN"), Some(HIDDEN));
        assert_eq!(grammar.channel_value("NOPE"), None);

        assert_eq!(grammar.mode_names(), &["DEFAULT_MODE".to_string(), "INSIDE".to_string()]);
        assert_eq!(grammar.mode_index("INSIDE"), Some(1));
        assert_eq!(grammar.mode_rules("INSIDE").count(), 1);

        assert_eq!(grammar.lexer_action_count(), 2);
        let ElementKind::Action(action) = grammar.rules()[2].block().alts()[0].elements()[1].kind() else {
            panic!("expected an action");
        };
        assert_eq!(action.index, Some(1));
        assert_eq!(grammar.rule("B").map(Rule::index), Some(2));
    }

    #[test]
    fn test_parser_implicit_tokens() {
        let grammar = Grammar::parser("P")
            .rule(Rule::new(
                "expr",
                alt(vec![
                    Element::token_ref("INT"),
                    Element::literal("'+'"),
                    Element::block(Block::new(vec![Alternative::new(vec![
                        Element::predicate("p"),
                        Element::token_ref("INT"),
                        Element::predicate("q"),
                    ])])),
                ]),
            ))
            .build()
            .unwrap();

        assert_eq!(grammar.token_type("INT"), 1);
        assert_eq!(grammar.token_type("'+'"), 2);
        assert_eq!(grammar.token_display_name(2), "'+'");
        assert_eq!(grammar.token_display_name(TOKEN_EOF), "EOF");

        let ElementKind::Block(block) = grammar.rules()[0].block().alts()[0].elements()[2].kind() else {
            panic!("expected a block");
        };
        assert!(matches!(block.alts()[0].elements()[2].kind(), ElementKind::Predicate { index: 1, .. }));
        assert_eq!(grammar.lexer_action_count(), 0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(Grammar::parser("P").build(), Err(GrammarError::EmptyGrammar)));

        let result = Grammar::parser("P")
            .rule(Rule::new("a", vec![Alternative::epsilon()]))
            .rule(Rule::new("a", vec![Alternative::epsilon()]))
            .build();
        assert!(matches!(result, Err(GrammarError::DuplicateRule(name)) if name == "a"));

        let result = Grammar::parser("P")
            .rule(Rule::new("a", alt(vec![Element::rule_ref("b")])))
            .build();
        assert!(matches!(result, Err(GrammarError::MissingRule { rule, referenced_by }) if rule == "b" && referenced_by == "a"));

        let result = Grammar::lexer("L")
            .rule(Rule::new("A", alt(vec![Element::token_ref("B")])))
            .build();
        assert!(matches!(result, Err(GrammarError::MissingRule { .. })));

        let result = Grammar::parser("P")
            .implicit_tokens(false)
            .token("INT")
            .rule(Rule::new("a", alt(vec![Element::token_ref("INT"), Element::token_ref("ID")])))
            .build();
        assert!(matches!(result, Err(GrammarError::MissingToken { token, .. }) if token == "ID"));

        let result = Grammar::parser("P")
            .rule(Rule::new("a", vec![Alternative::epsilon()]).fragment())
            .build();
        assert!(matches!(result, Err(GrammarError::MisplacedElement { kind: "parser", .. })));
    }

    #[test]
    fn test_token_refs_in_lexer_sets_are_left_to_the_factory() {
        let grammar = Grammar::lexer("L")
            .rule(Rule::new("A", alt(vec![Element::set(vec![Element::token_ref("NOPE")], false)])))
            .build();
        assert!(grammar.is_ok());
    }
}
