use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    grammar::Position,
    tool::{ErrorKind, Severity},
};

/// A single problem found in a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    kind: ErrorKind,
    file_name: String,
    position: Option<Position>,
    args: Vec<String>,
}

impl Diagnostic {
    /// What went wrong.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The grammar file the problem was found in.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Where in the grammar the problem was found, if the AST knows it.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// The values substituted into the message template.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The rendered message, without location.
    pub fn message(&self) -> String {
        self.kind.render(&self.args)
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let severity = match self.kind.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "{}({}): {}", severity, self.kind.code(), self.file_name)?;

        if let Some(position) = &self.position {
            write!(f, ":{}", position)?;
        }

        write!(f, ": {}", self.message())
    }
}

/// Collects the diagnostics reported while building an ATN.
///
/// Reporting is fire-and-forget: nothing is printed and construction is never
/// interrupted. Every report is mirrored to the `log` facade.
#[derive(Debug, Default)]
pub struct ErrorManager {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl ErrorManager {
    /// Create an empty ErrorManager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem of kind `kind` at `position` in `file_name`.
    pub fn report<S: Into<String>>(&mut self, kind: ErrorKind, file_name: &str, position: Option<Position>, args: Vec<S>) {
        let diagnostic = Diagnostic {
            kind,
            file_name: file_name.to_string(),
            position,
            args: args.into_iter().map(Into::into).collect(),
        };

        match kind.severity() {
            Severity::Warning => {
                self.warnings += 1;
                log::warn!("{}", diagnostic);
            },
            Severity::Error => {
                self.errors += 1;
                log::error!("{}", diagnostic);
            },
        }

        self.diagnostics.push(diagnostic);
    }

    /// All diagnostics in the order they were reported.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of reported problems with [`Severity::Error`].
    pub fn num_errors(&self) -> usize {
        self.errors
    }

    /// Number of reported problems with [`Severity::Warning`].
    pub fn num_warnings(&self) -> usize {
        self.warnings
    }

    /// How often a problem of kind `kind` was reported.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Iterate over all diagnostics of kind `kind`.
    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}
