use ahash::AHashMap;

use crate::{
    atn::{
        common_constant, Atn, Handle, LexerAction, Lookahead, StateId, StateKind, Transition, TransitionKind,
        DEFAULT_MODE, DEFAULT_TOKEN_CHANNEL, HIDDEN, INVALID_TYPE, MIN_USER_CHANNEL_VALUE, TOKEN_EOF,
    },
    automata::{
        builder,
        commands::{template_name, CommandTemplates, RuleCommands, TargetTemplates},
        ActionSource, AtnFactory, ParserAtnFactory,
    },
    error::AtnError,
    grammar::{Element, ElementKind, Grammar, LexerCommand, Position, Rule, Terminal},
    misc::{case::RangeBorderCharacters, char_support, IntervalSet},
    tool::{ErrorKind, ErrorManager},
};

/// What [`LexerAtnFactory::check_range_and_add_to_set`] found out about a range.
/// Passed on to recursive calls for the lower and upper case halves so that
/// nothing is reported twice.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct CheckStatus {
    pub(crate) collision: bool,
    pub(crate) not_implied: bool,
}

fn code_point_range(a: i32, b: i32) -> TransitionKind {
    if a == b {
        TransitionKind::Atom(a)
    } else {
        TransitionKind::Range(a, b)
    }
}

fn code_point_string(c: i32) -> String {
    u32::try_from(c)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| c.to_string())
}

fn char_value(terminal: &Terminal) -> Option<i32> {
    char_support::char_value_from_grammar_char_literal(terminal.text()).and_then(|c| i32::try_from(c).ok())
}

/// Builds the ATN of a lexer grammar.
///
/// On top of the shared composition of [`ParserAtnFactory`] this matches chars
/// instead of tokens, gives every mode an entry state and translates lexer
/// commands into a table of deduplicated [`LexerAction`]s.
pub struct LexerAtnFactory<'a> {
    base: ParserAtnFactory<'a>,
    templates: Box<dyn CommandTemplates + 'a>,
    rule_commands: RuleCommands,
    action_to_index: AHashMap<LexerAction, usize>,
    index_to_action: Vec<LexerAction>,
    next_custom_action: usize,
}

impl<'a> LexerAtnFactory<'a> {
    /// Create a factory that reports problems to `errors`.
    /// Lexer commands without built-in meaning are rejected until
    /// templates are supplied with [`LexerAtnFactory::with_templates`].
    pub fn new(grammar: &'a Grammar, errors: &'a mut ErrorManager) -> Self {
        Self {
            base: ParserAtnFactory::new(grammar, errors),
            templates: Box::new(TargetTemplates::empty()),
            rule_commands: RuleCommands::default(),
            action_to_index: AHashMap::new(),
            index_to_action: Vec::new(),
            next_custom_action: grammar.lexer_action_count(),
        }
    }

    /// Use `templates` for custom lexer commands.
    pub fn with_templates<T: CommandTemplates + 'a>(mut self, templates: T) -> Self {
        self.templates = Box::new(templates);
        self
    }

    /// Replace the analyzer used by the closure check.
    pub fn with_lookahead<L: Lookahead + 'a>(mut self, lookahead: L) -> Self {
        self.base = self.base.with_lookahead(lookahead);
        self
    }

    /// The ATN built so far.
    pub fn atn(&self) -> &Atn {
        self.base.atn()
    }

    pub(crate) fn report<S: Into<String>>(&mut self, kind: ErrorKind, position: Option<Position>, args: Vec<S>) {
        self.base.report(kind, position, args);
    }

    pub(crate) fn current_rule_case_insensitive(&self) -> bool {
        let grammar = self.base.grammar();
        self.base.current_rule().map(|r| grammar.is_rule_case_insensitive(r)).unwrap_or(false)
    }

    /// The index of `action` in the lexer-action table. Equal actions share an index.
    fn lexer_action_index(&mut self, action: LexerAction) -> usize {
        if let Some(index) = self.action_to_index.get(&action) {
            return *index;
        }

        let index = self.index_to_action.len();
        self.index_to_action.push(action);
        self.action_to_index.insert(action, index);
        index
    }

    fn action_transition(&mut self, element: Option<&Element>, action: LexerAction) -> Result<Handle, AtnError> {
        let rule_index = self.base.current_rule_index()?;
        let action_index = self.lexer_action_index(action);

        Ok(self.base.atom(element, TransitionKind::Action {
            rule_index,
            action_index: Some(action_index),
            ctx_dependent: false,
        }))
    }

    fn next_custom_action_index(&mut self) -> usize {
        let index = self.next_custom_action;
        self.next_custom_action += 1;
        index
    }

    fn report_not_implied(&mut self, data: &RangeBorderCharacters, from: i32, to: i32, position: Option<Position>) {
        if let Some(chars) = data.not_implied_characters() {
            self.report(
                ErrorKind::RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS,
                position,
                vec![code_point_string(from), code_point_string(to), chars],
            );
        }
    }

    /// The transition for `from..to`. In case-insensitive rules letters match
    /// in both cases.
    pub(crate) fn create_transition(&mut self, target: StateId, from: i32, to: i32, position: Option<Position>) -> Transition {
        let data = RangeBorderCharacters::classify(from, to);
        self.report_not_implied(&data, from, to, position);

        let kind = if self.current_rule_case_insensitive() && !data.is_single_range() {
            let mut set = IntervalSet::of(data.lower_from, data.lower_to);
            set.add_range(data.upper_from, data.upper_to);
            TransitionKind::Set(set)
        } else {
            code_point_range(from, to)
        };

        Transition::new(target, kind)
    }

    /// Validate both ends of a range. Returns the code points if the range can be used.
    fn check_range(&mut self, from: &Terminal, to: &Terminal, position: Option<Position>) -> Option<(i32, i32)> {
        let a = char_value(from);
        let b = char_value(to);

        if a.is_none() {
            self.report(ErrorKind::INVALID_LITERAL_IN_LEXER_SET, from.position().or(position), vec![from.text()]);
        }

        if b.is_none() {
            self.report(ErrorKind::INVALID_LITERAL_IN_LEXER_SET, to.position().or(position), vec![to.text()]);
        }

        let (a, b) = (a?, b?);

        if b < a {
            self.report(
                ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED,
                position,
                vec![format!("{}..{}", from.text(), to.text())],
            );
            return None;
        }

        Some((a, b))
    }

    /// Add `a..b` to `set`, in both cases if the current rule is case-insensitive.
    /// Overlaps with what `set` already holds are reported once per call.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn check_range_and_add_to_set(
        &mut self,
        root: &Element,
        position: Option<Position>,
        set: &mut IntervalSet,
        a: i32,
        b: i32,
        case_insensitive: bool,
        previous: Option<CheckStatus>,
    ) -> CheckStatus {
        let data = RangeBorderCharacters::classify(a, b);

        if !previous.map(|p| p.not_implied).unwrap_or(false) {
            self.report_not_implied(&data, a, b, position);
        }

        if case_insensitive {
            let status = CheckStatus {
                collision: false,
                not_implied: data.mixed_case,
            };

            if data.is_single_range() {
                return self.check_range_and_add_to_set(root, position, set, a, b, false, Some(status));
            }

            let status = self.check_range_and_add_to_set(
                root,
                position,
                set,
                data.lower_from,
                data.lower_to,
                false,
                Some(status),
            );
            return self.check_range_and_add_to_set(
                root,
                position,
                set,
                data.upper_from,
                data.upper_to,
                false,
                Some(status),
            );
        }

        let mut collision = previous.map(|p| p.collision).unwrap_or(false);

        if !collision && set.intersects_range(a, b) {
            let chars = if a == b {
                code_point_string(a)
            } else {
                format!("{}-{}", code_point_string(a), code_point_string(b))
            };

            self.report(ErrorKind::CHARACTERS_COLLISION_IN_SET, position, vec![chars, root.text()]);
            collision = true;
        }

        set.add_range(a, b);

        CheckStatus {
            collision,
            not_implied: data.mixed_case,
        }
    }

    pub(crate) fn check_char_and_add_to_set(&mut self, root: &Element, position: Option<Position>, set: &mut IntervalSet, c: i32) {
        let case_insensitive = self.current_rule_case_insensitive();
        self.check_range_and_add_to_set(root, position, set, c, c, case_insensitive, None);
    }

    fn mode_constant_value(&mut self, arg: &Terminal) -> Option<i32> {
        let name = arg.text();

        if name == "DEFAULT_MODE" {
            return Some(DEFAULT_MODE);
        }

        if common_constant(name).is_some() {
            self.report(ErrorKind::MODE_CONFLICTS_WITH_COMMON_CONSTANTS, arg.position(), vec![name]);
            return None;
        }

        if let Some(index) = self.base.grammar().mode_index(name) {
            return i32::try_from(index).ok();
        }

        match name.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report(ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_MODE_NAME, arg.position(), vec![name]);
                None
            },
        }
    }

    fn token_constant_value(&mut self, arg: &Terminal) -> Option<i32> {
        let name = arg.text();

        if name == "EOF" {
            return Some(TOKEN_EOF);
        }

        if common_constant(name).is_some() {
            self.report(ErrorKind::TOKEN_CONFLICTS_WITH_COMMON_CONSTANTS, arg.position(), vec![name]);
            return None;
        }

        let ttype = self.base.grammar().token_type(name);

        if ttype != INVALID_TYPE {
            return Some(ttype);
        }

        match name.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report(ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_TOKEN_NAME, arg.position(), vec![name]);
                None
            },
        }
    }

    fn channel_constant_value(&mut self, arg: &Terminal) -> Option<i32> {
        let name = arg.text();

        match name {
            "HIDDEN" => return Some(HIDDEN),
            "DEFAULT_TOKEN_CHANNEL" => return Some(DEFAULT_TOKEN_CHANNEL),
            _ => {},
        }

        if common_constant(name).is_some() {
            self.report(ErrorKind::CHANNEL_CONFLICTS_WITH_COMMON_CONSTANTS, arg.position(), vec![name]);
            return None;
        }

        if let Some(value) = self.base.grammar().channel_value(name).filter(|v| *v >= MIN_USER_CHANNEL_VALUE) {
            return Some(value);
        }

        match name.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report(ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_CHANNEL_NAME, arg.position(), vec![name]);
                None
            },
        }
    }

    /// Resolve a command with a built-in meaning. `None` if the command is
    /// unknown or its argument was rejected; problems with the argument have
    /// been reported by then.
    fn builtin_command(&mut self, command: &LexerCommand) -> Option<Option<LexerAction>> {
        let name = command.name();

        let action = match (name.text(), command.arg()) {
            ("skip", None) => Some(LexerAction::Skip),
            ("more", None) => Some(LexerAction::More),
            ("popMode", None) => Some(LexerAction::PopMode),
            ("skip" | "more" | "popMode", Some(_)) => {
                self.report(ErrorKind::UNWANTED_LEXER_COMMAND_ARGUMENT, name.position(), vec![name.text()]);
                None
            },
            ("mode" | "pushMode" | "type" | "channel", None) => {
                self.report(ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT, name.position(), vec![name.text()]);
                None
            },
            ("mode", Some(arg)) => self.mode_constant_value(arg).map(LexerAction::Mode),
            ("pushMode", Some(arg)) => self.mode_constant_value(arg).map(LexerAction::PushMode),
            ("type", Some(arg)) => self.token_constant_value(arg).map(LexerAction::Type),
            ("channel", Some(arg)) => self.channel_constant_value(arg).map(LexerAction::Channel),
            _ => return None,
        };

        Some(action)
    }

    /// The mode entry states plus the rules of every mode linked to them.
    fn link_modes(&mut self) {
        let grammar = self.base.grammar();

        for (index, mode) in grammar.mode_names().iter().enumerate() {
            let Some(start) = self.base.atn().mode_to_start_state().get(index).copied() else {
                continue;
            };

            for rule in grammar.mode_rules(mode).filter(|r| !r.is_fragment()) {
                if let Some(rule_start) = self.base.atn().rule_to_start_state().get(rule.index()).copied() {
                    self.base.epsilon(start, rule_start);
                }
            }
        }
    }
}

impl<'a> AtnFactory<'a> for LexerAtnFactory<'a> {
    fn base(&mut self) -> &mut ParserAtnFactory<'a> {
        &mut self.base
    }

    fn base_ref(&self) -> &ParserAtnFactory<'a> {
        &self.base
    }

    fn create_atn(mut self) -> Result<Atn, AtnError> {
        let grammar = self.base.grammar();

        for mode in grammar.mode_names() {
            let start = self.base.atn_mut().add_state(None, StateKind::TokensStart);
            self.base.atn_mut().push_mode_start(start);
            let decision = self.base.define_decision(start);
            log::debug!("Mode {} starts at state {} (decision {})", mode, start, decision);
        }

        let token_types = grammar.rules().iter().map(|r| grammar.token_type(r.name())).collect();
        self.base.atn_mut().set_rule_to_token_type(token_types);

        self.base.create_rule_start_and_stop_states();
        builder::build_rules(&mut self)?;

        let actions = std::mem::take(&mut self.index_to_action);
        log::debug!("Lexer {} uses {} distinct actions", grammar.name(), actions.len());
        self.base.atn_mut().set_lexer_actions(actions);

        self.link_modes();

        log::debug!(
            "Lexer ATN for {}: {} states, {} modes",
            grammar.name(),
            self.base.atn().num_states(),
            grammar.mode_names().len()
        );

        self.base.check_epsilon_closure();

        Ok(self.base.into_atn())
    }

    fn rule(&mut self, rule: &Rule, body: Handle) -> Result<Handle, AtnError> {
        self.rule_commands.clear();
        self.base.rule(rule, body)
    }

    fn token_ref(&mut self, element: &Element, name: &str) -> Result<Handle, AtnError> {
        if name == "EOF" {
            return Ok(self.base.atom(Some(element), TransitionKind::Atom(TOKEN_EOF)));
        }

        self.base.rule_ref(element, name, None)
    }

    fn string_literal(&mut self, element: &Element, text: &str) -> Result<Handle, AtnError> {
        let left = self.base.new_state();
        element.set_atn_state(left);

        let Some(value) = char_support::string_from_grammar_string_literal(text) else {
            self.report(ErrorKind::INVALID_ESCAPE_SEQUENCE, element.position(), vec![text]);
            return Ok(Handle::new(left, left));
        };

        if value.is_empty() {
            self.report(ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED, element.position(), vec![text]);
            return Ok(Handle::new(left, left));
        }

        let mut prev = left;

        for c in value.chars() {
            let right = self.base.new_state();
            let transition = self.create_transition(right, c as i32, c as i32, element.position());
            self.base.atn_mut().add_transition(prev, transition);
            prev = right;
        }

        Ok(Handle::new(left, prev))
    }

    fn char_set_literal(&mut self, element: &Element) -> Result<Handle, AtnError> {
        let set = self.set_from_char_set_literal(element);
        Ok(self.base.atom(Some(element), TransitionKind::Set(set)))
    }

    fn range(&mut self, element: &Element, from: &Terminal, to: &Terminal) -> Result<Handle, AtnError> {
        let left = self.base.new_state();
        let right = self.base.new_state();

        if let Some((a, b)) = self.check_range(from, to, element.position()) {
            let transition = self.create_transition(right, a, b, element.position());
            self.base.atn_mut().add_transition(left, transition);
        }

        element.set_atn_state(left);
        Ok(Handle::new(left, right))
    }

    fn set(&mut self, element: &Element, items: &[Element], invert: bool) -> Result<Handle, AtnError> {
        let case_insensitive = self.current_rule_case_insensitive();
        let mut set = IntervalSet::new();

        for item in items {
            let position = item.position().or(element.position());

            match item.kind() {
                ElementKind::Range(from, to) => {
                    if let Some((a, b)) = self.check_range(from, to, position) {
                        self.check_range_and_add_to_set(element, position, &mut set, a, b, case_insensitive, None);
                    }
                },
                ElementKind::CharSet(_) => {
                    let chars = self.set_from_char_set_literal(item);
                    set.add_set(&chars);
                },
                ElementKind::StringLiteral(text) => {
                    let value = char_support::char_value_from_grammar_char_literal(text).and_then(|c| i32::try_from(c).ok());

                    match value {
                        Some(c) => self.check_char_and_add_to_set(element, position, &mut set, c),
                        None => self.report(ErrorKind::INVALID_LITERAL_IN_LEXER_SET, position, vec![text.as_str()]),
                    }
                },
                ElementKind::TokenRef(name) => {
                    self.report(ErrorKind::UNSUPPORTED_REFERENCE_IN_LEXER_SET, position, vec![name.as_str()]);
                },
                _ => {
                    return Err(self.base.internal_error(format!("{} is not allowed in a lexer set", item.kind_name())));
                },
            }
        }

        let kind = if invert {
            TransitionKind::NotSet(set)
        } else if set.intervals().len() == 1 {
            let interval = set.intervals()[0];
            code_point_range(interval.a, interval.b)
        } else {
            TransitionKind::Set(set)
        };

        Ok(self.base.atom(Some(element), kind))
    }

    fn action(&mut self, source: ActionSource<'_>) -> Result<Handle, AtnError> {
        match source {
            ActionSource::Inline(text) => {
                if text.trim().is_empty() {
                    return Ok(self.base.epsilon_node(None));
                }

                let rule_index = self.base.current_rule_index()?;
                let action_index = self.next_custom_action_index();
                self.action_transition(None, LexerAction::Custom {
                    rule_index,
                    action_index,
                })
            },
            ActionSource::Declared(element, action) => {
                let rule_index = self.base.current_rule_index()?;
                let action_index = match action.index {
                    Some(index) => index,
                    None => self.next_custom_action_index(),
                };
                self.action_transition(Some(element), LexerAction::Custom {
                    rule_index,
                    action_index,
                })
            },
            ActionSource::Command(command, action) => {
                let handle = self.action_transition(None, action)?;
                command.set_atn_state(handle.left);
                Ok(handle)
            },
        }
    }

    fn lexer_command(&mut self, command: &LexerCommand) -> Result<Handle, AtnError> {
        let name = command.name();

        for (kind, args) in self.rule_commands.check(name.text()) {
            self.report(kind, name.position(), args);
        }

        match self.builtin_command(command) {
            Some(Some(action)) => return self.action(ActionSource::Command(command, action)),
            Some(None) => return Ok(self.base.epsilon_node(None)),
            None => {},
        }

        let Some(template) = self.templates.lookup(&template_name(name.text())).cloned() else {
            self.report(ErrorKind::INVALID_LEXER_COMMAND, name.position(), vec![name.text()]);
            return Ok(self.base.epsilon_node(None));
        };

        match (template.takes_argument(), command.arg()) {
            (true, None) => {
                self.report(ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT, name.position(), vec![name.text()]);
                Ok(self.base.epsilon_node(None))
            },
            (false, Some(_)) => {
                self.report(ErrorKind::UNWANTED_LEXER_COMMAND_ARGUMENT, name.position(), vec![name.text()]);
                Ok(self.base.epsilon_node(None))
            },
            (_, arg) => {
                let handle = self.action(ActionSource::Inline(template.render(arg.map(Terminal::text))))?;
                command.set_atn_state(handle.left);
                Ok(handle)
            },
        }
    }

    fn lexer_alt_commands(&mut self, alt: Handle, commands: Handle) -> Result<Handle, AtnError> {
        self.base.epsilon(alt.right, commands.left);
        Ok(Handle::new(alt.left, commands.right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        atn::TOKEN_EPSILON,
        automata::CommandTemplate,
        grammar::{Alternative, Block},
    };

    fn lexer(rules: Vec<Rule>) -> Grammar {
        let mut builder = Grammar::lexer("L");
        for rule in rules {
            builder = builder.rule(rule);
        }
        builder.build().unwrap()
    }

    fn alt(elements: Vec<Element>) -> Alternative {
        Alternative::new(elements)
    }

    fn labels(atn: &Atn) -> Vec<TransitionKind> {
        atn.states()
            .flat_map(|(_, s)| s.transitions().iter().map(|t| t.kind.clone()))
            .filter(|k| !k.is_epsilon())
            .collect()
    }

    #[test]
    fn test_modes() {
        let grammar = Grammar::lexer("L")
            .rule(Rule::new("A", vec![alt(vec![Element::literal("'a'")])]))
            .rule(Rule::new("D", vec![alt(vec![Element::token_ref("DIGIT")])]))
            .rule(Rule::new("DIGIT", vec![alt(vec![Element::range("'0'", "'9'")])]).fragment())
            .rule(Rule::new("S", vec![alt(vec![Element::literal("'\"'")])]).in_mode("STR"))
            .build()
            .unwrap();
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(atn.mode_to_start_state().len(), 2);

        let default_targets: Vec<StateId> = atn[atn.mode_to_start_state()[0]].transitions().iter().map(|t| t.target).collect();
        assert_eq!(default_targets, vec![atn.rule_to_start_state()[0], atn.rule_to_start_state()[1]]);

        let str_targets: Vec<StateId> = atn[atn.mode_to_start_state()[1]].transitions().iter().map(|t| t.target).collect();
        assert_eq!(str_targets, vec![atn.rule_to_start_state()[3]]);

        assert_eq!(atn.rule_to_token_type(), &[1, 2, INVALID_TYPE, 3]);
        assert_eq!(atn[atn.mode_to_start_state()[0]].decision(), Some(0));
        assert!(labels(&atn).contains(&TransitionKind::Range('0' as i32, '9' as i32)));

        // no EOF transitions and no follow links in lexers
        for stop in atn.rule_to_stop_state() {
            assert!(atn[*stop].transitions().is_empty());
        }
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_string_literal() {
        let grammar = lexer(vec![Rule::new("IF", vec![alt(vec![Element::literal("'if'")])])]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(labels(&atn), vec![TransitionKind::Atom('i' as i32), TransitionKind::Atom('f' as i32)]);
    }

    #[test]
    fn test_case_insensitive_literal() {
        let grammar = Grammar::lexer("L")
            .case_insensitive(true)
            .rule(Rule::new("K", vec![alt(vec![Element::literal("'ab'")])]))
            .build()
            .unwrap();
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        let mut a = IntervalSet::of('a' as i32, 'a' as i32);
        a.add('A' as i32);
        assert_eq!(labels(&atn)[0], TransitionKind::Set(a));
    }

    #[test]
    fn test_not_implied_characters() {
        let grammar = lexer(vec![Rule::new("R", vec![alt(vec![Element::range("'A'", "'z'")])])]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(labels(&atn), vec![TransitionKind::Range('A' as i32, 'z' as i32)]);
        assert_eq!(errors.count(ErrorKind::RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS), 1);
    }

    #[test]
    fn test_reversed_range() {
        let grammar = lexer(vec![Rule::new("R", vec![alt(vec![Element::range("'z'", "'a'")])])]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert!(labels(&atn).is_empty());
        assert_eq!(errors.count(ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED), 1);
        assert_eq!(errors.diagnostics()[0].args(), &["'z'..'a'".to_string()]);
    }

    #[test]
    fn test_sets() {
        let grammar = lexer(vec![
            Rule::new("S", vec![alt(vec![Element::set(
                vec![Element::literal("'a'"), Element::range("'c'", "'e'"), Element::literal("'d'")],
                false,
            )])]),
            Rule::new("N", vec![alt(vec![Element::set(vec![Element::literal("'x'")], true)])]),
            Rule::new("O", vec![alt(vec![Element::set(vec![Element::literal("'q'"), Element::literal("'r'")], false)])]),
            Rule::new("T", vec![alt(vec![Element::set(vec![Element::token_ref("S"), Element::literal("'ab'")], false)])]),
        ]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();
        let labels = labels(&atn);

        let mut expected = IntervalSet::of('a' as i32, 'a' as i32);
        expected.add_range('c' as i32, 'e' as i32);
        assert!(labels.contains(&TransitionKind::Set(expected)));
        assert!(labels.contains(&TransitionKind::NotSet(IntervalSet::of('x' as i32, 'x' as i32))));
        assert!(labels.contains(&TransitionKind::Range('q' as i32, 'r' as i32)));

        assert_eq!(errors.count(ErrorKind::CHARACTERS_COLLISION_IN_SET), 1);
        assert_eq!(
            errors.of_kind(ErrorKind::CHARACTERS_COLLISION_IN_SET).next().unwrap().args(),
            &["d".to_string(), "'a' | 'c'..'e' | 'd'".to_string()]
        );
        assert_eq!(errors.count(ErrorKind::UNSUPPORTED_REFERENCE_IN_LEXER_SET), 1);
        assert_eq!(errors.count(ErrorKind::INVALID_LITERAL_IN_LEXER_SET), 1);
    }

    #[test]
    fn test_builtin_commands() {
        let grammar = Grammar::lexer("L")
            .channel("COMMENTS")
            .rule(Rule::new("WS", vec![alt(vec![Element::literal("' '")]).with_commands(vec![LexerCommand::new("skip")])]))
            .rule(Rule::new("C", vec![alt(vec![Element::literal("'#'")]).with_commands(vec![
                LexerCommand::call("channel", "COMMENTS"),
                LexerCommand::call("type", "WS"),
            ])]))
            .rule(Rule::new("Q", vec![alt(vec![Element::literal("'\"'")]).with_commands(vec![
                LexerCommand::call("pushMode", "STR"),
                LexerCommand::new("more"),
            ])]))
            .rule(Rule::new("E", vec![alt(vec![Element::literal("'\"'")]).with_commands(vec![LexerCommand::new("popMode")])]).in_mode("STR"))
            .rule(Rule::new("X", vec![alt(vec![Element::literal("'x'")]).with_commands(vec![LexerCommand::new("skip")])]))
            .build()
            .unwrap();
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(atn.lexer_actions(), &[
            LexerAction::Skip,
            LexerAction::Channel(2),
            LexerAction::Type(1),
            LexerAction::PushMode(1),
            LexerAction::More,
            LexerAction::PopMode,
        ]);

        // both skip commands share the table entry
        let actions: Vec<Option<usize>> = atn
            .states()
            .flat_map(|(_, s)| s.transitions().iter())
            .filter_map(|t| match t.kind {
                TransitionKind::Action { action_index, .. } => Some(action_index),
                _ => None,
            })
            .collect();
        assert_eq!(actions.len(), 7);
        assert_eq!(actions.iter().filter(|i| **i == Some(0)).count(), 2);
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_command_arguments() {
        let grammar = Grammar::lexer("L")
            .rule(Rule::new("A", vec![alt(vec![Element::literal("'a'")]).with_commands(vec![
                LexerCommand::call("mode", "SKIP"),
                LexerCommand::call("type", "NOPE"),
                LexerCommand::call("channel", "7"),
                LexerCommand::call("skip", "X"),
                LexerCommand::new("pushMode"),
            ])]))
            .build()
            .unwrap();
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(atn.lexer_actions(), &[LexerAction::Channel(7)]);
        assert_eq!(errors.count(ErrorKind::MODE_CONFLICTS_WITH_COMMON_CONSTANTS), 1);
        assert_eq!(errors.count(ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_TOKEN_NAME), 1);
        assert_eq!(errors.count(ErrorKind::UNWANTED_LEXER_COMMAND_ARGUMENT), 1);
        assert_eq!(errors.count(ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT), 1);
        assert_eq!(errors.count(ErrorKind::INCOMPATIBLE_COMMANDS), 1);
    }

    #[test]
    fn test_custom_commands() {
        let grammar = Grammar::lexer("L")
            .rule(Rule::new("A", vec![alt(vec![Element::literal("'a'"), Element::action("count++;")]).with_commands(vec![
                LexerCommand::call("setText", "\"b\""),
                LexerCommand::new("beep"),
                LexerCommand::new("beep"),
            ])]))
            .rule(Rule::new("B", vec![alt(vec![Element::literal("'b'")]).with_commands(vec![
                LexerCommand::new("setText"),
                LexerCommand::new("unknown"),
            ])]))
            .build()
            .unwrap();
        let templates = TargetTemplates::empty()
            .with("setText", CommandTemplate::with_argument("setText(<arg>);"))
            .with("beep", CommandTemplate::new("beep();"));
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).with_templates(templates).create_atn().unwrap();

        assert_eq!(atn.lexer_actions(), &[
            LexerAction::Custom { rule_index: 0, action_index: 0 },
            LexerAction::Custom { rule_index: 0, action_index: 1 },
            LexerAction::Custom { rule_index: 0, action_index: 2 },
            LexerAction::Custom { rule_index: 0, action_index: 3 },
        ]);
        assert_eq!(errors.count(ErrorKind::DUPLICATED_COMMAND), 1);
        assert_eq!(errors.count(ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT), 1);
        assert_eq!(errors.count(ErrorKind::INVALID_LEXER_COMMAND), 1);
    }

    #[test]
    fn test_eof_and_rule_refs() {
        let grammar = lexer(vec![
            Rule::new("A", vec![alt(vec![Element::token_ref("B"), Element::token_ref("EOF")])]),
            Rule::new("B", vec![alt(vec![Element::block(Block::new(vec![alt(vec![Element::literal("'b'")])]).star())])]),
        ]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        let labels: Vec<TransitionKind> = atn.states().flat_map(|(_, s)| s.transitions().iter().map(|t| t.kind.clone())).collect();
        assert!(labels.contains(&TransitionKind::Atom(TOKEN_EOF)));
        assert!(labels.iter().any(|k| matches!(k, TransitionKind::Rule { rule_index: 1, .. })));
        assert!(errors.diagnostics().is_empty());
    }

    #[test]
    fn test_empty_literal() {
        let grammar = lexer(vec![Rule::new("E", vec![alt(vec![Element::literal("''"), Element::literal("'x'")])])]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        assert_eq!(errors.count(ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED), 1);
        assert_eq!(labels(&atn), vec![TransitionKind::Atom('x' as i32)]);
    }

    #[test]
    fn test_unquoted_range_bound() {
        let grammar = lexer(vec![Rule::new("A", vec![alt(vec![Element::range("éab", "'z'")])])]);
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn().unwrap();

        let diagnostic = errors.of_kind(ErrorKind::INVALID_LITERAL_IN_LEXER_SET).next().unwrap();
        assert_eq!(diagnostic.args(), &["éab".to_string()]);
        assert!(labels(&atn).is_empty());
    }

    struct EpsilonLookahead;

    impl Lookahead for EpsilonLookahead {
        fn look(&self, _atn: &Atn, _from: StateId, _stop: Option<StateId>) -> IntervalSet {
            IntervalSet::of(TOKEN_EPSILON, TOKEN_EPSILON)
        }
    }

    #[test]
    fn test_injected_lookahead() {
        let grammar = lexer(vec![Rule::new("A", vec![alt(vec![
            Element::block(Block::new(vec![alt(vec![Element::literal("'a'")])]).plus()),
        ])])]);
        let mut errors = ErrorManager::new();
        LexerAtnFactory::new(&grammar, &mut errors).with_lookahead(EpsilonLookahead).create_atn().unwrap();

        let diagnostic = errors.of_kind(ErrorKind::EPSILON_CLOSURE).next().unwrap();
        assert_eq!(diagnostic.args(), &["A".to_string()]);
    }

    #[test]
    fn test_commands_are_stamped() {
        let grammar = lexer(vec![Rule::new("A", vec![alt(vec![Element::literal("'a'")]).with_commands(vec![
            LexerCommand::new("skip"),
            LexerCommand::new("beep"),
            LexerCommand::new("unknown"),
        ])])]);
        let templates = TargetTemplates::empty().with("beep", CommandTemplate::new("beep();"));
        let mut errors = ErrorManager::new();
        let atn = LexerAtnFactory::new(&grammar, &mut errors).with_templates(templates).create_atn().unwrap();

        let commands = grammar.rules()[0].block().alts()[0].commands();

        for command in &commands[..2] {
            let state = command.atn_state().unwrap();
            assert!(matches!(atn[state].transitions()[0].kind, TransitionKind::Action { .. }));
        }

        assert_eq!(commands[2].atn_state(), None);
    }
}
