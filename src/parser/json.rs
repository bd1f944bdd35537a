use std::path::Path;
use std::fs::File;
use std::io::BufReader;
use json_comments::{CommentSettings, StripComments};
use serde_json as json;

use crate::{
    grammar::{Alternative, Block, Element, GrammarKind, LexerCommand, Rule},
    error::ParsingError,
};

/// Everything a grammar description on disk can declare.
#[derive(Debug, Default)]
pub(crate) struct GrammarDescription {
    pub(crate) kind: Option<GrammarKind>,
    pub(crate) case_insensitive: Option<bool>,
    pub(crate) tokens: Vec<String>,
    pub(crate) channels: Vec<String>,
    pub(crate) modes: Vec<String>,
    pub(crate) rules: Vec<Rule>,
}

fn is_quoted(keyword: &str) -> bool {
    keyword.len() >= 2 && keyword.starts_with('\'') && keyword.ends_with('\'')
}

/// `'a'..'z'` splits into `'a'` and `'z'`.
fn parse_range(keyword: &str) -> Option<(&str, &str)> {
    if !is_quoted(keyword) {
        return None;
    }

    let split = keyword.find("'..'")?;
    let (from, to) = (&keyword[..split + 1], &keyword[split + 3..]);

    if is_quoted(from) && is_quoted(to) {
        Some((from, to))
    } else {
        None
    }
}

fn parse_element_str(keyword: &str) -> Result<Element, String> {
    if keyword.is_empty() {
        return Err("Elements must not be empty strings".to_string());
    }

    if let Some((from, to)) = parse_range(keyword) {
        return Ok(Element::range(from, to));
    }

    if is_quoted(keyword) {
        return Ok(Element::literal(keyword));
    }

    if keyword.starts_with('[') && keyword.ends_with(']') {
        return Ok(Element::char_set(keyword));
    }

    if keyword == "." {
        return Ok(Element::wildcard());
    }

    if let Some(predicate) = keyword.strip_prefix('{').and_then(|k| k.strip_suffix("}?")) {
        return Ok(Element::predicate(predicate));
    }

    if let Some(action) = keyword.strip_prefix('{').and_then(|k| k.strip_suffix('}')) {
        return Ok(Element::action(action));
    }

    if !keyword.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format!("'{}' is not a valid element", keyword));
    }

    if keyword.chars().next().map(char::is_uppercase).unwrap_or(false) {
        Ok(Element::token_ref(keyword))
    } else {
        Ok(Element::rule_ref(keyword))
    }
}

fn parse_suffix(block: Block, suffix: &str) -> Result<Block, String> {
    let (kind, greedy) = match suffix.strip_suffix('?') {
        Some(kind) if !kind.is_empty() => (kind, false),
        _ => (suffix, true),
    };

    let block = match kind {
        "?" => block.optional(),
        "*" => block.star(),
        "+" => block.plus(),
        _ => return Err(format!("'{}' is not a valid block suffix", suffix)),
    };

    Ok(if greedy { block } else { block.non_greedy() })
}

fn parse_element_object(object: &json::Map<String, json::Value>) -> Result<Element, String> {
    if let Some(alts) = object.get("block") {
        let mut block = Block::new(parse_alternatives(alts)?);

        if let Some(suffix) = object.get("suffix") {
            let suffix = suffix.as_str().ok_or("Block suffix must be a string")?;
            block = parse_suffix(block, suffix)?;
        }

        return Ok(Element::block(block));
    }

    if let Some(items) = object.get("set") {
        let items = match items {
            json::Value::Array(items) => items.iter().map(parse_element).collect::<Result<Vec<_>, _>>()?,
            _ => return Err("Set items must be an array".to_string()),
        };
        let invert = object.get("invert").and_then(json::Value::as_bool).unwrap_or(false);
        return Ok(Element::set(items, invert));
    }

    let precedence = match object.get("precedence") {
        Some(value) => Some(value.as_i64().and_then(|p| i32::try_from(p).ok()).ok_or("Precedence must be an integer")?),
        None => None,
    };

    if let Some(name) = object.get("rule") {
        let name = name.as_str().ok_or("Rule reference must be a string")?;
        return Ok(match precedence {
            Some(precedence) => Element::rule_ref_with_precedence(name, precedence),
            None => Element::rule_ref(name),
        });
    }

    if object.contains_key("predicate") {
        return match precedence {
            Some(precedence) => Ok(Element::precedence_predicate(precedence)),
            None => Err("A predicate object needs a precedence".to_string()),
        };
    }

    Err("Element objects must contain one of 'block', 'set', 'rule' or 'predicate'".to_string())
}

fn parse_element(value: &json::Value) -> Result<Element, String> {
    match value {
        json::Value::String(keyword) => parse_element_str(keyword),
        json::Value::Object(object) => parse_element_object(object),
        _ => Err("Elements must be strings or objects".to_string()),
    }
}

/// `skip` or `pushMode(STR)`.
fn parse_command(value: &json::Value) -> Result<LexerCommand, String> {
    let command = value.as_str().ok_or("Lexer commands must be strings")?;

    match command.split_once('(') {
        Some((name, arg)) => match arg.strip_suffix(')') {
            Some(arg) if !name.is_empty() => Ok(LexerCommand::call(name.trim(), arg.trim())),
            _ => Err(format!("'{}' is not a valid lexer command", command)),
        },
        None if !command.is_empty() => Ok(LexerCommand::new(command.trim())),
        None => Err("Lexer commands must not be empty".to_string()),
    }
}

fn parse_alternative(value: &json::Value) -> Result<Alternative, String> {
    match value {
        json::Value::Array(elements) => {
            let elements = elements.iter().map(parse_element).collect::<Result<Vec<_>, _>>()?;
            Ok(Alternative::new(elements))
        },
        json::Value::Object(object) => {
            let mut alt = match object.get("elements") {
                Some(elements) => parse_alternative(elements)?,
                None => Alternative::epsilon(),
            };

            if let Some(commands) = object.get("commands") {
                let commands = match commands {
                    json::Value::Array(commands) => commands.iter().map(parse_command).collect::<Result<Vec<_>, _>>()?,
                    _ => return Err("Lexer commands must be an array".to_string()),
                };
                alt = alt.with_commands(commands);
            }

            Ok(alt)
        },
        _ => Err("Alternatives must be arrays or objects".to_string()),
    }
}

fn parse_alternatives(value: &json::Value) -> Result<Vec<Alternative>, String> {
    let alts = match value {
        json::Value::Array(alts) => alts,
        _ => return Err("Alternatives must be given as an array".to_string()),
    };

    if alts.is_empty() {
        return Err("A block must have at least one alternative".to_string());
    }

    alts.iter().map(parse_alternative).collect()
}

fn parse_rule(name: &str, value: &json::Value) -> Result<Rule, String> {
    let object = match value {
        json::Value::Array(_) => {
            let alts = parse_alternatives(value).map_err(|e| format!("Invalid rule '{}': {}", name, e))?;
            return Ok(Rule::new(name, alts));
        },
        json::Value::Object(object) => object,
        _ => return Err(format!("Rule '{}' must be an array or an object", name)),
    };

    let alts = object.get("alts").ok_or_else(|| format!("Rule '{}' has no 'alts'", name))?;
    let alts = parse_alternatives(alts).map_err(|e| format!("Invalid rule '{}': {}", name, e))?;
    let mut rule = Rule::new(name, alts);

    if object.get("fragment").and_then(json::Value::as_bool).unwrap_or(false) {
        rule = rule.fragment();
    }

    if let Some(mode) = object.get("mode") {
        let mode = mode.as_str().ok_or_else(|| format!("Mode of rule '{}' must be a string", name))?;
        rule = rule.in_mode(mode);
    }

    if let Some(case_insensitive) = object.get("caseInsensitive").and_then(json::Value::as_bool) {
        rule = rule.case_insensitive(case_insensitive);
    }

    if object.get("leftRecursive").and_then(json::Value::as_bool).unwrap_or(false) {
        rule = rule.left_recursive();
    }

    Ok(rule)
}

fn parse_names(object: &json::Map<String, json::Value>, key: &str) -> Result<Vec<String>, String> {
    match object.get(key) {
        None => Ok(Vec::new()),
        Some(json::Value::Array(names)) => names
            .iter()
            .map(|name| name.as_str().map(str::to_string).ok_or_else(|| format!("'{}' must be an array of strings", key)))
            .collect(),
        Some(_) => Err(format!("'{}' must be an array of strings", key)),
    }
}

fn parse_grammar(value: json::Value) -> Result<GrammarDescription, String> {
    let object = match value {
        json::Value::Object(object) => object,
        _ => return Err("A grammar description must be an object".to_string()),
    };

    let kind = match object.get("kind").map(json::Value::as_str) {
        None => None,
        Some(Some("lexer")) => Some(GrammarKind::Lexer),
        Some(Some("parser")) => Some(GrammarKind::Parser),
        Some(_) => return Err("'kind' must be either \"lexer\" or \"parser\"".to_string()),
    };

    let rules = match object.get("rules") {
        Some(json::Value::Object(rules)) => rules,
        _ => return Err("'rules' must be an object mapping rule names to alternatives".to_string()),
    };

    let rules = rules
        .iter()
        .map(|(name, value)| parse_rule(name, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GrammarDescription {
        kind,
        case_insensitive: object.get("caseInsensitive").and_then(json::Value::as_bool),
        tokens: parse_names(&object, "tokens")?,
        channels: parse_names(&object, "channels")?,
        modes: parse_names(&object, "modes")?,
        rules,
    })
}

pub(crate) fn parse_json(path: &Path) -> Result<GrammarDescription, ParsingError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return Err(ParsingError::new(path, format!("Cannot open file: {}", e))),
    };
    let reader = BufReader::new(file);
    let reader = StripComments::with_settings(CommentSettings::c_style(), reader);

    let value: json::Value = match json::from_reader(reader) {
        Ok(value) => value,
        Err(e) => {
            return Err(ParsingError::new(
                path,
                format!("Invalid JSON syntax: {}", e)
            ));
        },
    };

    parse_grammar(value).map_err(|e| ParsingError::new(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{ElementKind, SuffixKind};

    #[test]
    fn test_elements() {
        assert!(matches!(parse_element_str("'a'..'z'").unwrap().kind(), ElementKind::Range(..)));
        assert!(matches!(parse_element_str("'..'").unwrap().kind(), ElementKind::StringLiteral(_)));
        assert!(matches!(parse_element_str("[a-z]").unwrap().kind(), ElementKind::CharSet(_)));
        assert!(matches!(parse_element_str("ID").unwrap().kind(), ElementKind::TokenRef(_)));
        assert!(matches!(parse_element_str("expr").unwrap().kind(), ElementKind::RuleRef { .. }));
        assert!(matches!(parse_element_str("{x > 1}?").unwrap().kind(), ElementKind::Predicate { .. }));
        assert!(matches!(parse_element_str("{run();}").unwrap().kind(), ElementKind::Action(_)));
        assert!(matches!(parse_element_str(".").unwrap().kind(), ElementKind::Wildcard));
        assert!(parse_element_str("a b").is_err());

        let block = parse_element(&json::json!({"block": [["A"], []], "suffix": "*?"})).unwrap();
        let ElementKind::Block(block) = block.kind() else {
            panic!("not a block");
        };
        assert_eq!(block.suffix().map(|s| (s.kind, s.greedy)), Some((SuffixKind::Star, false)));
        assert_eq!(block.alts().len(), 2);
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_command(&json::json!("skip")).unwrap(), LexerCommand::new("skip"));
        assert_eq!(parse_command(&json::json!("pushMode(STR)")).unwrap(), LexerCommand::call("pushMode", "STR"));
        assert!(parse_command(&json::json!("pushMode(STR")).is_err());
    }

    #[test]
    fn test_lexer_description() {
        let description = parse_json(Path::new("test-data/grammars/lexer.json")).unwrap();
        assert_eq!(description.kind, Some(GrammarKind::Lexer));
        assert_eq!(description.channels, vec!["COMMENTS".to_string()]);
        assert_eq!(description.rules[0].name(), "ID");
        assert!(description.rules.iter().any(|r| r.is_fragment()));
    }

    #[test]
    fn test_errors() {
        let error = parse_json(Path::new("test-data/grammars/does-not-exist.json")).unwrap_err();
        assert!(error.message().starts_with("Cannot open file"));

        assert!(parse_grammar(json::json!({"rules": {"a": []}})).is_err());
        assert!(parse_grammar(json::json!({"kind": "tree", "rules": {}})).is_err());
        assert!(parse_grammar(json::json!([])).is_err());
    }
}
