use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    /// Internal-consistency errors point at a builder defect rather than at
    /// the user's source.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.internal_error,
            ErrorImpl::UnbalancedStack { .. }
                | ErrorImpl::BlockContextMismatch { .. }
                | ErrorImpl::MissingPosition { .. }
                | ErrorImpl::InvalidSpan { .. }
                | ErrorImpl::KindMismatch { .. }
        )
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::StackUnderflow { .. } => "StackUnderflow",
            ErrorImpl::StackTypeMismatch { .. } => "StackTypeMismatch",
            ErrorImpl::DuplicateProcedure { .. } => "DuplicateProcedure",
            ErrorImpl::EmptyMetadataKey { .. } => "EmptyMetadataKey",
            ErrorImpl::MalformedLValue { .. } => "MalformedLValue",
            ErrorImpl::LoopControlOutsideLoop { .. } => "LoopControlOutsideLoop",
            ErrorImpl::ReturnInCommand => "ReturnInCommand",
            ErrorImpl::CallTargetNotCallable { .. } => "CallTargetNotCallable",
            ErrorImpl::DeclarationOutsideScope { .. } => "DeclarationOutsideScope",
            ErrorImpl::NestingTooDeep { .. } => "NestingTooDeep",
            ErrorImpl::UnbalancedStack { .. } => "UnbalancedStack",
            ErrorImpl::BlockContextMismatch { .. } => "BlockContextMismatch",
            ErrorImpl::MissingPosition { .. } => "MissingPosition",
            ErrorImpl::InvalidSpan { .. } => "InvalidSpan",
            ErrorImpl::KindMismatch { .. } => "KindMismatch",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a line break?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::StackUnderflow { rule, .. } => ErrorTip::Suggestion(format!(
                "The parse tree for `{}` is missing operands",
                rule
            )),
            ErrorImpl::StackTypeMismatch { rule, expected, found } => {
                ErrorTip::Suggestion(format!(
                    "`{}` expected {} but the parse tree produced {}",
                    rule, expected, found
                ))
            }
            ErrorImpl::DuplicateProcedure { name } => ErrorTip::Suggestion(format!(
                "Procedure `{}` is already defined, the first definition is kept",
                name
            )),
            ErrorImpl::EmptyMetadataKey { .. } => {
                ErrorTip::Suggestion(String::from("Metadata lines look like `:: key: value`"))
            }
            ErrorImpl::MalformedLValue { message } => ErrorTip::Suggestion(message.clone()),
            ErrorImpl::LoopControlOutsideLoop { statement } => ErrorTip::Suggestion(format!(
                "`{}` can only be used inside `while` or `for each`",
                statement
            )),
            ErrorImpl::ReturnInCommand => ErrorTip::Suggestion(String::from(
                "Command blocks cannot return, use `emit` or move the code into a `func`",
            )),
            ErrorImpl::CallTargetNotCallable { found } => ErrorTip::Suggestion(format!(
                "`call` needs a procedure or tool call, found {}",
                found
            )),
            ErrorImpl::DeclarationOutsideScope { what } => ErrorTip::Suggestion(format!(
                "{} must appear inside its declaration",
                what
            )),
            ErrorImpl::NestingTooDeep { limit } => ErrorTip::Suggestion(format!(
                "Split the expression or block into smaller pieces, at most {} levels are allowed",
                limit
            )),
            ErrorImpl::UnbalancedStack { .. }
            | ErrorImpl::BlockContextMismatch { .. }
            | ErrorImpl::MissingPosition { .. }
            | ErrorImpl::InvalidSpan { .. }
            | ErrorImpl::KindMismatch { .. } => ErrorTip::Suggestion(String::from(
                "This is an internal error in the AST builder",
            )),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("stack underflow in {rule}: expected {expected}")]
    StackUnderflow { rule: String, expected: String },
    #[error("stack type mismatch in {rule}: expected {expected}, found {found}")]
    StackTypeMismatch {
        rule: String,
        expected: String,
        found: String,
    },
    #[error("duplicate procedure definition: {name:?}")]
    DuplicateProcedure { name: String },
    #[error("metadata line has an empty key: {line:?}")]
    EmptyMetadataKey { line: String },
    #[error("malformed assignment target: {message}")]
    MalformedLValue { message: String },
    #[error("{statement} statement outside of a loop")]
    LoopControlOutsideLoop { statement: String },
    #[error("return statement inside a command block")]
    ReturnInCommand,
    #[error("call statement target is not callable: {found}")]
    CallTargetNotCallable { found: String },
    #[error("{what} found outside of any declaration")]
    DeclarationOutsideScope { what: String },
    #[error("nodes nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },
    #[error("{stack} stack not empty at end of program ({remaining} item(s) left)")]
    UnbalancedStack { stack: String, remaining: usize },
    #[error("block context mismatch: closing {expected}, innermost open block is {found}")]
    BlockContextMismatch { expected: String, found: String },
    #[error("{node} node has no start position")]
    MissingPosition { node: String },
    #[error("{node} node ends before it starts")]
    InvalidSpan { node: String },
    #[error("{node} node is tagged as {kind}")]
    KindMismatch { node: String, kind: String },
}

/// All errors collected during one build, de-duplicated, in the order they
/// were first reported.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", join_messages(.errors))]
pub struct BuildErrors {
    errors: Vec<Error>,
}

impl BuildErrors {
    pub fn new(errors: Vec<Error>) -> Self {
        let mut unique: Vec<Error> = Vec::with_capacity(errors.len());
        for error in errors {
            if !unique.contains(&error) {
                unique.push(error);
            }
        }
        BuildErrors { errors: unique }
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_internal(&self) -> bool {
        self.errors.iter().any(Error::is_internal)
    }
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<String>>()
        .join("; ")
}
