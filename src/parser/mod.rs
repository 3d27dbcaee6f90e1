//! Parser module producing a grammar-shaped parse tree.
//!
//! This module contains the reference parsing front end that transforms a
//! token stream into a `ParseTree` the AST builder walks. It handles:
//!
//! - Declarations (procedures, commands, event handlers, metadata lines)
//! - Statement parsing through a keyword dispatch table
//! - Expressions as one flat repetition rule per precedence level
//! - The depth-first listener walk over the finished tree
//!
//! The parser stops at the first syntax error.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod tree;

#[cfg(test)]
mod tests;
