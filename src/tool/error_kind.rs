use std::fmt::{Display, Formatter, Result as FmtResult};

/// How bad a reported problem is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The grammar is suspicious but the ATN is usable.
    Warning,
    /// The grammar is wrong; the ATN must not be used for code generation.
    Error,
}

/// The kinds of problems that can be found while building an ATN.
///
/// Every kind has a fixed numeric code, a [`Severity`] and a message template
/// with `<arg>`, `<arg2>` and `<arg3>` placeholders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types, missing_docs)]
pub enum ErrorKind {
    INTERNAL_ERROR,
    EXPECTED_NON_GREEDY_WILDCARD_BLOCK,
    UNSUPPORTED_REFERENCE_IN_LEXER_SET,
    INVALID_LITERAL_IN_LEXER_SET,
    EPSILON_LR_FOLLOW,
    INVALID_LEXER_COMMAND,
    MISSING_LEXER_COMMAND_ARGUMENT,
    UNWANTED_LEXER_COMMAND_ARGUMENT,
    EPSILON_CLOSURE,
    EPSILON_OPTIONAL,
    INVALID_ESCAPE_SEQUENCE,
    TOKEN_CONFLICTS_WITH_COMMON_CONSTANTS,
    CHANNEL_CONFLICTS_WITH_COMMON_CONSTANTS,
    MODE_CONFLICTS_WITH_COMMON_CONSTANTS,
    EMPTY_STRINGS_AND_SETS_NOT_ALLOWED,
    CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_TOKEN_NAME,
    CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_MODE_NAME,
    CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_CHANNEL_NAME,
    DUPLICATED_COMMAND,
    INCOMPATIBLE_COMMANDS,
    CHARACTERS_COLLISION_IN_SET,
    TOKEN_RANGE_IN_PARSER,
    UNICODE_PROPERTY_NOT_ALLOWED_IN_RANGE,
    RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS,
    EOF_CLOSURE,
}

impl ErrorKind {
    /// The stable diagnostic number shown to users.
    pub fn code(&self) -> u32 {
        match self {
            ErrorKind::INTERNAL_ERROR => 20,
            ErrorKind::EXPECTED_NON_GREEDY_WILDCARD_BLOCK => 131,
            ErrorKind::UNSUPPORTED_REFERENCE_IN_LEXER_SET => 183,
            ErrorKind::INVALID_LITERAL_IN_LEXER_SET => 144,
            ErrorKind::EPSILON_LR_FOLLOW => 148,
            ErrorKind::INVALID_LEXER_COMMAND => 149,
            ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT => 150,
            ErrorKind::UNWANTED_LEXER_COMMAND_ARGUMENT => 151,
            ErrorKind::EPSILON_CLOSURE => 153,
            ErrorKind::EPSILON_OPTIONAL => 154,
            ErrorKind::INVALID_ESCAPE_SEQUENCE => 156,
            ErrorKind::TOKEN_CONFLICTS_WITH_COMMON_CONSTANTS => 171,
            ErrorKind::CHANNEL_CONFLICTS_WITH_COMMON_CONSTANTS => 172,
            ErrorKind::MODE_CONFLICTS_WITH_COMMON_CONSTANTS => 173,
            ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED => 174,
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_TOKEN_NAME => 175,
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_MODE_NAME => 176,
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_CHANNEL_NAME => 177,
            ErrorKind::DUPLICATED_COMMAND => 178,
            ErrorKind::INCOMPATIBLE_COMMANDS => 179,
            ErrorKind::CHARACTERS_COLLISION_IN_SET => 180,
            ErrorKind::TOKEN_RANGE_IN_PARSER => 181,
            ErrorKind::UNICODE_PROPERTY_NOT_ALLOWED_IN_RANGE => 182,
            ErrorKind::RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS => 185,
            ErrorKind::EOF_CLOSURE => 186,
        }
    }

    /// Whether this kind is a warning or an error.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::EXPECTED_NON_GREEDY_WILDCARD_BLOCK
            | ErrorKind::EPSILON_OPTIONAL
            | ErrorKind::DUPLICATED_COMMAND
            | ErrorKind::INCOMPATIBLE_COMMANDS
            | ErrorKind::CHARACTERS_COLLISION_IN_SET
            | ErrorKind::RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The message template. Placeholders are filled in by [`ErrorKind::render`].
    pub fn template(&self) -> &'static str {
        match self {
            ErrorKind::INTERNAL_ERROR => "internal error: <arg> <arg2>",
            ErrorKind::EXPECTED_NON_GREEDY_WILDCARD_BLOCK => "greedy block ()<arg> contains wildcard; the non-greedy syntax ()<arg>? may be preferred",
            ErrorKind::UNSUPPORTED_REFERENCE_IN_LEXER_SET => "rule reference <arg> is not currently supported in a set",
            ErrorKind::INVALID_LITERAL_IN_LEXER_SET => "multi-character literals are not allowed in lexer sets: <arg>",
            ErrorKind::EPSILON_LR_FOLLOW => "left recursive rule <arg> contains a left recursive alternative which can be followed by the empty string",
            ErrorKind::INVALID_LEXER_COMMAND => "lexer command <arg> does not exist or is not supported by the current target",
            ErrorKind::MISSING_LEXER_COMMAND_ARGUMENT => "missing argument for lexer command <arg>",
            ErrorKind::UNWANTED_LEXER_COMMAND_ARGUMENT => "lexer command <arg> does not take any arguments",
            ErrorKind::EPSILON_CLOSURE => "rule <arg> contains a closure with at least one alternative that can match an empty string",
            ErrorKind::EPSILON_OPTIONAL => "rule <arg> contains an optional block with at least one alternative that can match an empty string",
            ErrorKind::INVALID_ESCAPE_SEQUENCE => "invalid escape sequence <arg>",
            ErrorKind::TOKEN_CONFLICTS_WITH_COMMON_CONSTANTS => "cannot use or declare token with reserved name <arg>",
            ErrorKind::CHANNEL_CONFLICTS_WITH_COMMON_CONSTANTS => "cannot use or declare channel with reserved name <arg>",
            ErrorKind::MODE_CONFLICTS_WITH_COMMON_CONSTANTS => "cannot use or declare mode with reserved name <arg>",
            ErrorKind::EMPTY_STRINGS_AND_SETS_NOT_ALLOWED => "string literals and sets cannot be empty: <arg>",
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_TOKEN_NAME => "<arg> is not a recognized token name",
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_MODE_NAME => "<arg> is not a recognized mode name",
            ErrorKind::CONSTANT_VALUE_IS_NOT_A_RECOGNIZED_CHANNEL_NAME => "<arg> is not a recognized channel name",
            ErrorKind::DUPLICATED_COMMAND => "duplicated command <arg>",
            ErrorKind::INCOMPATIBLE_COMMANDS => "incompatible commands <arg> and <arg2>",
            ErrorKind::CHARACTERS_COLLISION_IN_SET => "chars <arg> used multiple times in set <arg2>",
            ErrorKind::TOKEN_RANGE_IN_PARSER => "token ranges not allowed in parser: <arg>..<arg2>",
            ErrorKind::UNICODE_PROPERTY_NOT_ALLOWED_IN_RANGE => "unicode property escapes not allowed in lexer charset range: <arg>",
            ErrorKind::RANGE_PROBABLY_CONTAINS_NOT_IMPLIED_CHARACTERS => "Range <arg>..<arg2> probably contains not implied characters <arg3>. Both bounds should be defined in lower or UPPER case",
            ErrorKind::EOF_CLOSURE => "rule <arg> contains a closure with at least one alternative that can match EOF",
        }
    }

    /// Fill the template of this kind with `args`. Missing arguments render as empty strings.
    pub fn render(&self, args: &[String]) -> String {
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");

        self.template()
            .replace("<arg3>", arg(2))
            .replace("<arg2>", arg(1))
            .replace("<arg>", arg(0))
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{:?}", self)
    }
}
