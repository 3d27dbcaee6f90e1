//! Utility macros for the front end.
//!
//! This module defines helper macros used by the lexer:
//!
//! - `MK_TOKEN!` - Creates a Token instance
//! - `MK_DEFAULT_HANDLER!` - Creates a default lexer handler for simple tokens
//!
//! These macros reduce boilerplate in the lexer pattern table.

/// Creates a Token instance.
///
/// # Arguments
///
/// * `$kind` - The TokenKind
/// * `$value` - The token's string value
/// * `$span` - The source span
/// * `$channel` - Optional channel, defaults to `Channel::Default`
///
/// # Example
///
/// ```ignore
/// let token = MK_TOKEN!(TokenKind::Number, "42".to_string(), span);
/// let comment = MK_TOKEN!(TokenKind::Comment, text, span, Channel::Hidden);
/// ```
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr, $value:expr, $span:expr) => {
        $crate::MK_TOKEN!($kind, $value, $span, Channel::Default)
    };
    ($kind:expr, $value:expr, $span:expr, $channel:expr) => {
        Token {
            kind: $kind,
            value: $value,
            span: $span,
            channel: $channel,
        }
    };
}

/// Creates a default lexer handler for fixed-text tokens.
///
/// The generated handler emits a token with the given kind and literal value
/// and advances the lexer past the matched text.
///
/// # Example
///
/// ```ignore
/// RegexPattern {
///     regex: Regex::new("^\\+").unwrap(),
///     handler: MK_DEFAULT_HANDLER!(TokenKind::Plus, "+"),
/// }
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    ($kind:expr, $value:literal) => {
        |lexer: &mut Lexer, _matched: &str| {
            lexer.emit($kind, String::from($value), $value, Channel::Default);
        }
    };
}
