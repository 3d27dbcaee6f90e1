/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: Node bookkeeping, kinds, and the top-level declarations
/// - expressions: Definitions for the closed set of expression variants
/// - statements: The universal Step node and assignment targets
pub mod ast;
pub mod expressions;
pub mod statements;
