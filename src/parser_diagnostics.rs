use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::pos::Position;
use crate::token::{TokenKind, MAX_T};

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("cannot open file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("buffer out of bounds access, position: {0}")]
    OutOfBounds(usize),
    #[error("illegal byte order mark at start of file")]
    IllegalByteOrderMark,
}

/// Counted, recoverable syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("{} expected", .0.name())]
    Expected(TokenKind),
    #[error("invalid {}", .0.name())]
    Invalid(Production),
}

impl SyntaxError {
    /// Stable numeric code: the kind ordinal for a missing token, and a
    /// number past the last token kind for a failed production.
    pub fn code(&self) -> u32 {
        match self {
            SyntaxError::Expected(kind) => kind.index() as u32,
            SyntaxError::Invalid(production) => MAX_T as u32 + 1 + *production as u32,
        }
    }
}

/// Nonterminals whose alternatives can all fail to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Production {
    TypeMark,
    AddOp,
    Primary,
    Name,
}

impl Production {
    pub fn name(self) -> &'static str {
        match self {
            Production::TypeMark => "TypeMark",
            Production::AddOp => "AddOp",
            Production::Primary => "Primary",
            Production::Name => "Name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `None` for messages reported without a source location.
    pub position: Option<Position>,
    pub message: String,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Template for positioned diagnostics: `{0}` is the line, `{1}` the column
/// and `{2}` the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormat(String);

impl MessageFormat {
    pub fn new(template: impl Into<String>) -> Self {
        MessageFormat(template.into())
    }

    pub fn render(&self, position: Position, message: &str) -> String {
        self.0
            .replace("{0}", &position.line.to_string())
            .replace("{1}", &position.col.to_string())
            .replace("{2}", message)
    }
}

impl Default for MessageFormat {
    fn default() -> Self {
        MessageFormat::new("-- line {0} col {1}: {2}")
    }
}

/// Collects diagnostics for one parse run.
///
/// Every diagnostic is kept in memory and, when an output is attached,
/// written to it as soon as it is recorded. Only errors count toward
/// [`ErrorSink::count`].
#[derive(Default)]
pub struct ErrorSink {
    count: usize,
    format: MessageFormat,
    diagnostics: Vec<Diagnostic>,
    output: Option<Box<dyn Write>>,
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink")
            .field("count", &self.count)
            .field("format", &self.format)
            .field("diagnostics", &self.diagnostics)
            .field("output", &self.output.as_ref().map(|_| ".."))
            .finish()
    }
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    pub fn syn_err(&mut self, position: Position, error: SyntaxError) {
        self.count += 1;
        self.record(Severity::Error, Some(position), error.to_string());
    }

    pub fn sem_err(&mut self, position: Position, message: impl Into<String>) {
        self.count += 1;
        self.record(Severity::Error, Some(position), message.into());
    }

    pub fn sem_err_unpositioned(&mut self, message: impl Into<String>) {
        self.count += 1;
        self.record(Severity::Error, None, message.into());
    }

    pub fn warning(&mut self, position: Position, message: impl Into<String>) {
        self.record(Severity::Warning, Some(position), message.into());
    }

    pub fn warning_unpositioned(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, None, message.into());
    }

    /// Number of errors; warnings are not counted.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| !d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Renders a diagnostic the way it is written to the output.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        match diagnostic.position {
            Some(position) => self.format.render(position, &diagnostic.message),
            None => diagnostic.message.clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| self.render(d)).collect()
    }

    pub fn summary(&self) -> String {
        match self.count {
            1 => "1 error detected".to_owned(),
            n => format!("{} errors detected", n),
        }
    }

    fn record(&mut self, severity: Severity, position: Option<Position>, message: String) {
        let diagnostic = Diagnostic {
            severity,
            position,
            message,
        };
        if self.output.is_some() {
            let line = self.render(&diagnostic);
            if let Some(output) = self.output.as_mut() {
                if let Err(e) = writeln!(output, "{}", line) {
                    warn!(error = %e, "failed to write diagnostic");
                }
            }
        }
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedOutput(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn pos(line: u32, col: u32) -> Position {
        Position { line, col }
    }

    #[test]
    fn test_syntax_error_messages() {
        assert_eq!(
            SyntaxError::Expected(TokenKind::Semicolon).to_string(),
            "\";\" expected"
        );
        assert_eq!(
            SyntaxError::Expected(TokenKind::Ident).to_string(),
            "ident expected"
        );
        assert_eq!(
            SyntaxError::Invalid(Production::TypeMark).to_string(),
            "invalid TypeMark"
        );
    }

    #[test]
    fn test_syntax_error_codes() {
        assert_eq!(SyntaxError::Expected(TokenKind::Eof).code(), 0);
        assert_eq!(SyntaxError::Expected(TokenKind::Colon).code(), 28);
        assert_eq!(SyntaxError::Invalid(Production::TypeMark).code(), 49);
        assert_eq!(SyntaxError::Invalid(Production::Primary).code(), 51);
    }

    #[test]
    fn test_summary() {
        let mut sink = ErrorSink::new();
        assert_eq!(sink.summary(), "0 errors detected");
        sink.sem_err(pos(1, 1), "a");
        assert_eq!(sink.summary(), "1 error detected");
        sink.sem_err_unpositioned("b");
        assert_eq!(sink.summary(), "2 errors detected");
    }

    #[test]
    fn test_warnings_are_not_counted() {
        let mut sink = ErrorSink::new();
        sink.warning(pos(2, 3), "careful");
        sink.warning_unpositioned("careful again");
        sink.syn_err(pos(4, 5), SyntaxError::Expected(TokenKind::End));
        assert_eq!(sink.count(), 1);
        assert_eq!(sink.warning_count(), 2);
        assert_eq!(
            sink.messages(),
            vec![
                "-- line 2 col 3: careful".to_owned(),
                "careful again".to_owned(),
                "-- line 4 col 5: end expected".to_owned(),
            ]
        );
        let severities = sink
            .into_diagnostics()
            .iter()
            .map(|d| d.is_error())
            .collect::<Vec<_>>();
        assert_eq!(severities, vec![false, false, true]);
    }

    #[test]
    fn test_custom_format() {
        let mut sink = ErrorSink::new().with_format(MessageFormat::new("{2} ({0}:{1})"));
        sink.sem_err(pos(7, 9), "invalid assignment target");
        assert_eq!(sink.messages(), vec!["invalid assignment target (7:9)"]);
    }

    #[test]
    fn test_streams_to_output() {
        let output = SharedOutput::default();
        let mut sink = ErrorSink::new().with_output(output.clone());
        sink.syn_err(pos(1, 13), SyntaxError::Expected(TokenKind::Semicolon));
        assert_eq!(
            String::from_utf8_lossy(&output.0.borrow()),
            "-- line 1 col 13: \";\" expected\n"
        );
        sink.warning_unpositioned("done");
        assert_eq!(
            String::from_utf8_lossy(&output.0.borrow()),
            "-- line 1 col 13: \";\" expected\ndone\n"
        );
    }

    #[test]
    fn test_diagnostic_json() {
        let d = Diagnostic {
            severity: Severity::Warning,
            position: Some(pos(1, 2)),
            message: "m".to_owned(),
        };
        assert_eq!(
            serde_json::to_string(&d).unwrap(),
            r#"{"severity":"warning","position":{"line":1,"col":2},"message":"m"}"#
        );
    }
}
