use crate::{
    ast::{
        ast::{BaseNode, CommandNode, Kind, Metadata, Procedure, Program},
        expressions::{ErrorMarkerExpr, Expression},
        statements::{LValueNode, Step},
    },
    codec::MAX_DEPTH,
    errors::errors::{BuildErrors, Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    parser::tree::{walk, BlockKind, ParseTree, ParseTreeListener, Rule, RuleNode},
    Position,
};

use super::{
    comments,
    stack::{BlockStack, StackError, StackValue, ValueStack},
    validate,
};

/// How `break`/`continue` outside of any loop is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopControlCheck {
    /// Collected as a build error.
    #[default]
    Error,
    /// Logged and otherwise accepted.
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Run the position/kind validation pass over the finished tree.
    pub validate_tags: bool,
    pub loop_control: LoopControlCheck,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            validate_tags: true,
            loop_control: LoopControlCheck::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildOutput {
    pub program: Program,
    /// File-scope metadata, also stored on `program.metadata`.
    pub file_metadata: Metadata,
}

/// Listener that turns a finished parse tree into the AST.
///
/// Child rules finish before their parent, so every exit handler finds the
/// values its children produced on top of `values` and folds them into a
/// node of its own.
pub struct AstBuilder {
    pub(super) values: ValueStack,
    pub(super) blocks: BlockStack,
    pub(super) program: Program,
    pub(super) current_procedure: Option<Procedure>,
    pub(super) current_command: Option<CommandNode>,
    pub(super) loop_depth: u32,
    pub(super) errors: Vec<Error>,
    pub(super) options: BuildOptions,
    pub(super) last_position: Position,
}

impl AstBuilder {
    pub fn new(options: BuildOptions) -> Self {
        AstBuilder {
            values: ValueStack::new(),
            blocks: BlockStack::new(),
            program: Program::default(),
            current_procedure: None,
            current_command: None,
            loop_depth: 0,
            errors: vec![],
            options,
            last_position: Position::null(),
        }
    }

    /// True when both stacks are empty, which must hold after a full walk.
    pub fn stacks_empty(&self) -> bool {
        self.values.is_empty() && self.blocks.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Runs the post-walk passes and hands out the tree.
    pub fn finish(mut self, tokens: &[Token]) -> (BuildOutput, Result<(), BuildErrors>) {
        if !self.values.is_empty() {
            let remaining = self.values.len();
            self.internal_error(ErrorImpl::UnbalancedStack {
                stack: String::from("value"),
                remaining,
            });
        }
        if !self.blocks.is_empty() {
            let remaining = self.blocks.depth();
            self.internal_error(ErrorImpl::UnbalancedStack {
                stack: String::from("block context"),
                remaining,
            });
        }

        let too_deep = validate::check_depth(&self.program, MAX_DEPTH);
        let nesting_ok = too_deep.is_empty();
        for error in too_deep {
            warn!("{}", error);
            self.errors.push(error);
        }

        comments::associate(&mut self.program, tokens);

        if self.options.validate_tags && nesting_ok {
            for error in validate::check_tags(&self.program) {
                warn!("{}", error);
                self.errors.push(error);
            }
        }

        debug!(
            "Built program: {} procedure(s), {} command(s), {} event handler(s), {} comment(s), {} error(s)",
            self.program.procedures.len(),
            self.program.commands.len(),
            self.program.events.len(),
            self.program.comment_count(),
            self.errors.len()
        );

        let file_metadata = self.program.metadata.clone();
        let output = BuildOutput {
            program: self.program,
            file_metadata,
        };

        let result = if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BuildErrors::new(self.errors))
        };

        (output, result)
    }

    pub(super) fn error(&mut self, error: ErrorImpl, position: Position) {
        let error = Error::new(error, position);
        warn!("{}", error);
        self.errors.push(error);
    }

    fn internal_error(&mut self, error: ErrorImpl) {
        let position = self.last_position.clone();
        self.error(error, position);
    }

    /// Where errors about `node` are reported.
    pub(super) fn position_of(&self, node: &RuleNode) -> Position {
        node.start_token()
            .map(|token| token.span.start.clone())
            .unwrap_or_else(|| self.last_position.clone())
    }

    /// Bookkeeping covering every token of `node`. Left unset when the rule
    /// matched nothing, which the validation pass reports.
    pub(super) fn base_of(&self, node: &RuleNode, kind: Kind) -> BaseNode {
        let start = node
            .start_token()
            .map(|token| token.span.start.clone())
            .unwrap_or_default();
        let end = node
            .stop_token()
            .map(|token| token.span.end.clone())
            .unwrap_or_default();
        BaseNode::new(kind, start, end)
    }

    pub(super) fn error_marker(&self, node: &RuleNode, message: &str) -> Expression {
        Expression::ErrorMarker(ErrorMarkerExpr {
            base: self.base_of(node, Kind::ErrorMarker),
            message: String::from(message),
        })
    }

    pub(super) fn stack_error(&mut self, node: &RuleNode, error: StackError) {
        let rule = node.rule.to_string();
        let error = match error {
            StackError::Underflow { expected } => ErrorImpl::StackUnderflow {
                rule,
                expected: String::from(expected),
            },
            StackError::TypeMismatch { expected, found } => ErrorImpl::StackTypeMismatch {
                rule,
                expected: String::from(expected),
                found: String::from(found),
            },
        };
        let position = self.position_of(node);
        self.error(error, position);
    }

    pub(super) fn push_expr(&mut self, expression: Expression) {
        self.values.push(StackValue::Expr(expression));
    }

    /// Pops one expression, substituting an error marker on failure.
    pub(super) fn take_expr(&mut self, node: &RuleNode) -> Expression {
        match self.values.pop_expr() {
            Ok(expression) => expression,
            Err(error) => {
                self.stack_error(node, error);
                self.error_marker(node, "missing operand")
            }
        }
    }

    /// Pops `n` expressions in source order, `None` after reporting a failure.
    pub(super) fn take_exprs(&mut self, node: &RuleNode, n: usize) -> Option<Vec<Expression>> {
        match self.values.pop_exprs(n) {
            Ok(expressions) => Some(expressions),
            Err(error) => {
                self.stack_error(node, error);
                None
            }
        }
    }

    pub(super) fn take_steps(&mut self, node: &RuleNode) -> Vec<Step> {
        self.values.pop_steps().unwrap_or_else(|error| {
            self.stack_error(node, error);
            vec![]
        })
    }

    pub(super) fn take_names(&mut self, node: &RuleNode) -> Vec<String> {
        self.values.pop_names().unwrap_or_else(|error| {
            self.stack_error(node, error);
            vec![]
        })
    }

    pub(super) fn take_lvalue(&mut self, node: &RuleNode) -> LValueNode {
        self.values.pop_lvalue().unwrap_or_else(|error| {
            self.stack_error(node, error);
            LValueNode {
                base: self.base_of(node, Kind::LValue),
                ..Default::default()
            }
        })
    }

    pub(super) fn take_lvalues(&mut self, node: &RuleNode) -> Vec<LValueNode> {
        self.values.pop_lvalues().unwrap_or_else(|error| {
            self.stack_error(node, error);
            vec![]
        })
    }

    /// Adds a finished step to the innermost open block.
    pub(super) fn append_step(&mut self, node: &RuleNode, step: Step) {
        if !self.blocks.append(step) {
            let position = self.position_of(node);
            self.error(
                ErrorImpl::DeclarationOutsideScope {
                    what: node.rule.to_string(),
                },
                position,
            );
        }
    }

    fn enter_block(&mut self, kind: BlockKind) {
        self.blocks.enter(kind);
    }

    fn exit_block(&mut self, kind: BlockKind) {
        let steps = match self.blocks.exit() {
            Some((open, steps)) => {
                if open != kind {
                    self.internal_error(ErrorImpl::BlockContextMismatch {
                        expected: kind.to_string(),
                        found: open.to_string(),
                    });
                }
                steps
            }
            None => {
                self.internal_error(ErrorImpl::BlockContextMismatch {
                    expected: kind.to_string(),
                    found: String::from("none"),
                });
                vec![]
            }
        };

        trace!("Closed {} with {} step(s)", kind, steps.len());
        self.values.push(StackValue::Steps(steps));
    }
}

impl ParseTreeListener for AstBuilder {
    fn enter_rule(&mut self, node: &RuleNode) {
        match node.rule {
            Rule::ProcedureDefinition => self.enter_procedure(node),
            Rule::CommandBlock => self.enter_command(node),
            Rule::Block(kind) => self.enter_block(kind),
            Rule::WhileStmt | Rule::ForStmt => self.loop_depth += 1,
            _ => {}
        }
    }

    fn exit_rule(&mut self, node: &RuleNode) {
        match node.rule {
            Rule::Program => self.exit_program(node),
            Rule::MetadataEntry => self.exit_metadata_entry(node),
            Rule::ProcedureDefinition => self.exit_procedure(node),
            Rule::NeedsClause | Rule::OptionalClause | Rule::ReturnsClause => {
                self.exit_signature_clause(node)
            }
            Rule::ParamList => self.exit_param_list(node),
            Rule::CommandBlock => self.exit_command(node),
            Rule::EventHandler => self.exit_event_handler(node),
            Rule::Block(kind) => self.exit_block(kind),

            Rule::SetStmt => self.exit_set(node),
            Rule::CallStmt => self.exit_call(node),
            Rule::ReturnStmt => self.exit_return(node),
            Rule::EmitStmt => self.exit_emit(node),
            Rule::MustStmt => self.exit_must(node),
            Rule::FailStmt => self.exit_fail(node),
            Rule::ClearErrorStmt => self.exit_clear_error(node),
            Rule::AskStmt => self.exit_ask(node),
            Rule::PromptUserStmt => self.exit_promptuser(node),
            Rule::BreakStmt | Rule::ContinueStmt => self.exit_loop_control(node),
            Rule::IfStmt => self.exit_if(node),
            Rule::WhileStmt => {
                self.loop_depth = self.loop_depth.saturating_sub(1);
                self.exit_while(node)
            }
            Rule::ForStmt => {
                self.loop_depth = self.loop_depth.saturating_sub(1);
                self.exit_for(node)
            }
            Rule::OnErrorStmt => self.exit_on_error(node),
            Rule::ExpressionStmt => self.exit_expression_stmt(node),
            Rule::LvalueList => self.exit_lvalue_list(node),
            Rule::Lvalue => self.exit_lvalue(node),

            Rule::LogicalOrExpr
            | Rule::LogicalAndExpr
            | Rule::BitwiseOrExpr
            | Rule::BitwiseXorExpr
            | Rule::BitwiseAndExpr
            | Rule::EqualityExpr
            | Rule::RelationalExpr
            | Rule::AdditiveExpr
            | Rule::MultiplicativeExpr => self.exit_binary(node),
            Rule::UnaryExpr => self.exit_unary(node),
            Rule::PowerExpr => self.exit_power(node),
            Rule::AccessorExpr => self.exit_accessor(node),
            Rule::Primary => self.exit_primary(node),
            Rule::Literal => self.exit_literal(node),
            Rule::Placeholder => self.exit_placeholder(node),
            Rule::CallableExpr => self.exit_callable(node),
            Rule::ListLiteral => self.exit_list_literal(node),
            Rule::MapLiteral => self.exit_map_literal(node),
            Rule::MapEntry => self.exit_map_entry(node),
            Rule::EvalExpr => self.exit_eval(node),

            // Consumed by their parents
            Rule::Signature | Rule::ElseIfClause | Rule::ElseClause | Rule::CallTarget => {}
        }
    }

    fn visit_terminal(&mut self, token: &Token) {
        if token.kind != TokenKind::EOF || !self.last_position.is_set() {
            self.last_position = token.span.start.clone();
        }
    }
}

/// Builds the AST for `tree`. `tokens` is the full token stream including
/// hidden comments, used to attach comments to the nodes they describe.
///
/// The tree is always returned; errors found along the way are collected
/// into the second element.
pub fn build(
    tree: &ParseTree,
    tokens: &[Token],
    options: &BuildOptions,
) -> (BuildOutput, Result<(), BuildErrors>) {
    let mut builder = AstBuilder::new(options.clone());
    walk(&mut builder, tree);
    builder.finish(tokens)
}
