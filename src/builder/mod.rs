//! AST builder.
//!
//! Walks the parse tree depth-first and assembles the typed AST:
//!
//! - Expressions are folded on a value stack as their rules exit
//! - Statements land in the innermost open block's step list
//! - Procedures, commands and event handlers collect their steps and
//!   split off their `on error` handlers
//! - Metadata lines go to the scope that is open when they are seen
//!
//! Comments are attached in a separate pass over the token stream once the
//! tree is complete. Errors never stop the walk; they are collected and
//! returned next to the tree.

pub mod builder;
pub mod comments;
pub mod decl;
pub mod expr;
pub mod metadata;
pub mod stack;
pub mod stmt;
pub mod validate;

pub use builder::{build, AstBuilder, BuildOptions, BuildOutput, LoopControlCheck};
