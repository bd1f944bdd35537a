use crate::{
    atn::Handle,
    automata::{ActionSource, AtnFactory},
    error::AtnError,
    grammar::{Alternative, Block, Element, ElementKind},
};

/// Build the ATN fragment of every rule of the factory's grammar and link it
/// to the rule's start and stop state.
pub(crate) fn build_rules<'a, F: AtnFactory<'a>>(factory: &mut F) -> Result<(), AtnError> {
    let grammar = factory.grammar();

    for rule in grammar.rules() {
        log::debug!("Building ATN of rule {}", rule.name());

        factory.set_current_rule(rule.index());
        let body = AtnBuilder::new(factory).rule_block(rule.block())?;
        factory.rule(rule, body)?;
    }

    Ok(())
}

/// Walks the syntax tree of a rule bottom-up and hands every node to the
/// factory. Children are always built before their parent.
pub struct AtnBuilder<'f, F> {
    factory: &'f mut F,
}

impl<'f, 'a, F: AtnFactory<'a>> AtnBuilder<'f, F> {
    /// Create a walker that builds into `factory`.
    pub fn new(factory: &'f mut F) -> Self {
        Self {
            factory,
        }
    }

    /// The body of a rule.
    pub fn rule_block(&mut self, block: &Block) -> Result<Handle, AtnError> {
        self.block(block, None)
    }

    fn block(&mut self, block: &Block, element: Option<&Element>) -> Result<Handle, AtnError> {
        let alts = block
            .alts()
            .iter()
            .map(|alt| self.alternative(alt))
            .collect::<Result<Vec<_>, _>>()?;

        self.factory.block(block, element, alts)
    }

    /// One alternative including its lexer commands.
    pub fn alternative(&mut self, alt: &Alternative) -> Result<Handle, AtnError> {
        let body = if alt.elements().is_empty() {
            self.factory.epsilon_node(None)
        } else {
            let elements = alt
                .elements()
                .iter()
                .map(|element| self.element(element))
                .collect::<Result<Vec<_>, _>>()?;
            self.factory.elem_list(&elements)?
        };

        if alt.commands().is_empty() {
            return Ok(body);
        }

        let commands = alt
            .commands()
            .iter()
            .map(|command| self.factory.lexer_command(command))
            .collect::<Result<Vec<_>, _>>()?;
        let commands = self.factory.elem_list(&commands)?;

        self.factory.lexer_alt_commands(body, commands)
    }

    /// A single element.
    pub fn element(&mut self, element: &Element) -> Result<Handle, AtnError> {
        match element.kind() {
            ElementKind::TokenRef(name) => self.factory.token_ref(element, name),
            ElementKind::RuleRef { name, precedence } => self.factory.rule_ref(element, name, *precedence),
            ElementKind::StringLiteral(text) => self.factory.string_literal(element, text),
            ElementKind::CharSet(_) => self.factory.char_set_literal(element),
            ElementKind::Range(from, to) => self.factory.range(element, from, to),
            ElementKind::Set { items, invert } => self.factory.set(element, items, *invert),
            ElementKind::Wildcard => Ok(self.factory.wildcard(element)),
            ElementKind::Action(action) => self.factory.action(ActionSource::Declared(element, action)),
            ElementKind::Predicate { text, index, precedence } => self.factory.sempred(element, text, *index, *precedence),
            ElementKind::Block(block) => self.block(block, Some(element)),
        }
    }
}
