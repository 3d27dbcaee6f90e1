//! Lexical analysis module.
//!
//! This module contains the lexer (tokenizer) that converts script source
//! into a stream of tokens for parsing. It handles:
//!
//! - Tokenization of source code using anchored regex patterns
//! - Recognition of keywords, identifiers, literals, and operators
//! - Line/column tracking for every token
//! - Comments on the hidden channel, metadata lines as single tokens

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
