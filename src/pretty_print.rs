use ariadne::{Label, Report, ReportKind, Source};

use crate::evaluator::EvalError;
use crate::parser::ParseError;

impl ParseError {
    /// Prints an ariadne report pointing into the offending input line.
    pub fn report(&self, input: &str) {
        let (message, label) = match self {
            ParseError::InvalidValue(_) => (
                "Invalid value",
                "this is not a recognizable expression".to_string(),
            ),
            ParseError::NumberTooBig(_) => (
                "Number too big",
                "this literal does not fit in a double".to_string(),
            ),
            ParseError::RootNotSingular(_) => (
                "Trailing input",
                "only one expression is accepted per line".to_string(),
            ),
            ParseError::MissCloseParen(_) => (
                "Missing close parenthesis",
                "this list is never closed".to_string(),
            ),
        };
        let range = self.span().to_range();
        Report::build(ReportKind::Error, ("REPL", range.clone()))
            .with_message(message)
            .with_label(Label::new(("REPL", range)).with_message(label))
            .finish()
            .print(("REPL", Source::from(input)))
            .ok();
    }
}

impl EvalError {
    pub fn report(&self, input: &str) {
        let (message, label) = match self {
            EvalError::InvalidValue(_) => (
                "Invalid expression",
                "this expression cannot be evaluated".to_string(),
            ),
            EvalError::UnknownBinaryOp(_) => (
                "Unknown operator",
                "this operator is not a numeric one".to_string(),
            ),
            EvalError::VariableNotFound(name, _) => (
                "Unbound variable",
                format!("`{}` is not defined in the current environment", name),
            ),
            EvalError::IllegalOperation(_) => (
                "Illegal list operation",
                "this operand does not resolve to quoted list data".to_string(),
            ),
            EvalError::TypeMismatch {
                expected, found, ..
            } => (
                "Type mismatch",
                format!("expected {}, found {}", expected, found),
            ),
            EvalError::ArityMismatch {
                expected, found, ..
            } => (
                "Wrong number of arguments",
                format!("expected {}, got {}", expected, found),
            ),
        };
        let range = self.span().to_range();
        Report::build(ReportKind::Error, ("REPL", range.clone()))
            .with_message(message)
            .with_label(Label::new(("REPL", range)).with_message(label))
            .finish()
            .print(("REPL", Source::from(input)))
            .ok();
    }
}
