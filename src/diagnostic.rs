use std::fmt;

use crate::{
    resolve::{ResolveError, ResolveWarning},
    token::{Marker, Position},
};

/// A semantic diagnostic, attributed to the marker of the offending node.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub marker: Marker,
    pub kind: DiagnosticKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    Error(ResolveError),
    Warning(ResolveWarning),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self.kind {
            DiagnosticKind::Error(_) => Severity::Error,
            DiagnosticKind::Warning(_) => Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn position(&self) -> Position {
        self.marker.position()
    }

    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Error(e) => e.to_string(),
            DiagnosticKind::Warning(w) => w.to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.position(),
            self.severity(),
            self.message()
        )?;
        if f.alternate() {
            write!(f, " ({})", self.marker.filename)?;
        }
        Ok(())
    }
}

/// Append-only, ordered collection of the diagnostics of one compilation
/// unit. Two diagnostics on the same marker are both kept.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagnostics {
    list: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn error(&mut self, marker: &Marker, error: ResolveError) {
        tracing::trace!(position = %marker.position(), %error, "resolve error");
        self.push(marker, DiagnosticKind::Error(error));
    }

    pub fn warning(&mut self, marker: &Marker, warning: ResolveWarning) {
        tracing::trace!(position = %marker.position(), %warning, "resolve warning");
        self.push(marker, DiagnosticKind::Warning(warning));
    }

    fn push(&mut self, marker: &Marker, kind: DiagnosticKind) {
        self.list.push(Diagnostic {
            marker: Marker::clone(marker),
            kind,
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.list.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.list.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.list.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.list.iter().any(|d| !d.is_error())
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Diagnostics> for Vec<Diagnostic> {
    fn from(diagnostics: Diagnostics) -> Self {
        diagnostics.list
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        token::{Token, TokenKind},
        types::DataType,
    };

    fn marker(line: u32, column: u32) -> Marker {
        Arc::new(Token::new(TokenKind::Keyword, "render", Arc::from("d.yt"), line, column))
    }

    #[test]
    fn diagnostics_keep_discovery_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning(&marker(2, 1), ResolveWarning::AlreadyUnsafe);
        diagnostics.error(&marker(1, 4), ResolveError::Unreachable);
        diagnostics.error(&marker(1, 4), ResolveError::DuplicateEntry);

        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert_eq!(diagnostics.errors().count(), 2);
        assert_eq!(
            diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
            [
                "[line 2, column 1] warning: already inside an unsafe block",
                "[line 1, column 4] error: unreachable code",
                "[line 1, column 4] error: duplicate main entry point",
            ]
        );
    }

    #[test]
    fn alternate_display_names_the_file() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(&marker(1, 1), ResolveError::MissingReturnValue(DataType::I32));
        let diagnostic = diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.severity(), Severity::Error);
        assert_eq!(
            format!("{diagnostic:#}"),
            "[line 1, column 1] error: invalid no return value, must return i32 (d.yt)"
        );
        assert!(!diagnostics.has_warnings());
    }
}
