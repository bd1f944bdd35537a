use ahash::AHashMap;

use crate::{
    misc::char_support,
    tool::ErrorKind,
};

/// Code-generation text for a lexer command that has no built-in meaning,
/// e.g. `setText(<arg>)` for a command `setText("x")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    text: String,
    takes_argument: bool,
}

impl CommandTemplate {
    /// A template for a command without argument.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            takes_argument: false,
        }
    }

    /// A template for a command with one argument, substituted for `<arg>`.
    pub fn with_argument<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            takes_argument: true,
        }
    }

    /// Whether the command expects an argument.
    pub fn takes_argument(&self) -> bool {
        self.takes_argument
    }

    /// The code for a use of the command.
    pub fn render(&self, arg: Option<&str>) -> String {
        match arg {
            Some(arg) if self.takes_argument => self.text.replace("<arg>", arg),
            _ => self.text.clone(),
        }
    }
}

/// Looks up code-generation templates by name. Names have the form
/// `Lexer<Command>Command`, see [`template_name`].
pub trait CommandTemplates {
    /// The template called `name`, if the target defines one.
    fn lookup(&self, name: &str) -> Option<&CommandTemplate>;
}

/// A fixed table of templates.
#[derive(Debug, Clone, Default)]
pub struct TargetTemplates {
    templates: AHashMap<String, CommandTemplate>,
}

impl TargetTemplates {
    /// A target without custom lexer commands.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a template for the lexer command `command`.
    pub fn with<S: AsRef<str>>(mut self, command: S, template: CommandTemplate) -> Self {
        self.templates.insert(template_name(command.as_ref()), template);
        self
    }
}

impl CommandTemplates for TargetTemplates {
    fn lookup(&self, name: &str) -> Option<&CommandTemplate> {
        self.templates.get(name)
    }
}

/// `setText` becomes `LexerSetTextCommand`.
pub fn template_name(command: &str) -> String {
    format!("Lexer{}Command", char_support::capitalize(command))
}

/// The commands a lexer rule has used so far, for detecting duplicates and
/// combinations that contradict each other.
#[derive(Debug, Default)]
pub(crate) struct RuleCommands {
    seen: Vec<String>,
}

impl RuleCommands {
    pub(crate) fn clear(&mut self) {
        self.seen.clear();
    }

    /// Record `command` and return the diagnostics its use triggers.
    pub(crate) fn check(&mut self, command: &str) -> Vec<(ErrorKind, Vec<String>)> {
        let mut problems = Vec::new();

        if command != "pushMode" && command != "popMode" {
            if self.seen.iter().any(|c| c == command) {
                problems.push((ErrorKind::DUPLICATED_COMMAND, vec![command.to_string()]));
            }

            let incompatible: &[&str] = match command {
                "skip" => &["more", "type", "channel"],
                "more" => &["skip", "type", "channel"],
                "type" | "channel" => &["more", "skip"],
                _ => &[],
            };

            let first = incompatible.iter().find(|other| self.seen.iter().any(|c| c == *other));

            if let Some(first) = first {
                problems.push((ErrorKind::INCOMPATIBLE_COMMANDS, vec![first.to_string(), command.to_string()]));
            }
        }

        self.seen.push(command.to_string());
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        let templates = TargetTemplates::empty()
            .with("setText", CommandTemplate::with_argument("setText(<arg>);"))
            .with("beep", CommandTemplate::new("beep();"));

        let template = templates.lookup("LexerSetTextCommand").unwrap();
        assert!(template.takes_argument());
        assert_eq!(template.render(Some("\"x\"")), "setText(\"x\");");
        assert_eq!(templates.lookup("LexerBeepCommand").unwrap().render(None), "beep();");
        assert!(templates.lookup("LexerSkipCommand").is_none());
        assert!(TargetTemplates::empty().lookup("LexerBeepCommand").is_none());
    }

    #[test]
    fn test_rule_commands() {
        let mut commands = RuleCommands::default();
        assert!(commands.check("skip").is_empty());
        assert_eq!(
            commands.check("more"),
            vec![(ErrorKind::INCOMPATIBLE_COMMANDS, vec!["skip".to_string(), "more".to_string()])],
        );
        assert_eq!(
            commands.check("skip"),
            vec![
                (ErrorKind::DUPLICATED_COMMAND, vec!["skip".to_string()]),
                (ErrorKind::INCOMPATIBLE_COMMANDS, vec!["more".to_string(), "skip".to_string()]),
            ],
        );

        commands.clear();
        assert!(commands.check("pushMode").is_empty());
        assert!(commands.check("pushMode").is_empty());
        assert!(commands.check("channel").is_empty());
        assert_eq!(commands.check("type"), Vec::new());
        assert_eq!(commands.check("more").len(), 1);
    }
}
