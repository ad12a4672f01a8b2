use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::bom::FieldKind;

/// Errors that abort an import or an export
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),
    #[error("Spreadsheet error {0}")]
    Excel(#[from] calamine::Error),
    #[error("Spreadsheet {} has no worksheet", .0.display())]
    EmptyWorkbook(PathBuf),
    #[error("JSON error {0}")]
    Json(#[from] serde_json::Error),
}

/// A field update that was dropped by the type-gated merge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown field {0}")]
    UnknownField(String),
    #[error("Field {field} expects {expected}, found {found}")]
    TypeMismatch {
        field: &'static str,
        expected: FieldKind,
        found: FieldKind,
    },
    #[error("Value {value} out of range for field {field}")]
    OutOfRange { field: &'static str, value: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("First line is not .HEA")]
    MissingHeader,
    #[error("Last line is not .END")]
    MissingEnd,
    #[error("{command} expects {expected} parameters, found {found}")]
    MissingParameters {
        command: String,
        expected: usize,
        found: usize,
    },
    #[error("Terminal {designator}.{pin} appears before any net")]
    TerminalWithoutNet { designator: String, pin: String },
    #[error("Dropped field for {designator}: {error}")]
    DroppedField {
        designator: String,
        #[source]
        error: FieldError,
    },
}

/// Non-fatal problem found while importing, the import carries on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line (or record) number, if the problem is tied to one
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(line: Option<usize>, kind: DiagnosticKind) -> Self {
        Self { line, kind }
    }

    pub(crate) fn dropped_fields(
        line: Option<usize>,
        designator: &str,
        errors: Vec<FieldError>,
    ) -> impl Iterator<Item = Diagnostic> + '_ {
        errors.into_iter().map(move |error| {
            Diagnostic::new(
                line,
                DiagnosticKind::DroppedField {
                    designator: designator.to_owned(),
                    error,
                },
            )
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}
