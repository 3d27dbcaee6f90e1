use crate::{
    ast::{
        ast::{BaseNode, Kind},
        expressions::Expression,
        statements::{AccessorKind, AccessorNode, AskStmt, LValueNode, Step, StepKind},
    },
    errors::errors::ErrorImpl,
    lexer::tokens::{Token, TokenKind},
    parser::tree::{ParseTree, Rule, RuleNode},
};

use super::{
    builder::{AstBuilder, LoopControlCheck},
    stack::StackValue,
};

impl AstBuilder {
    fn step(&self, node: &RuleNode, kind: StepKind) -> Step {
        let mut step = Step::new(kind);
        step.base = self.base_of(node, step.step_type().kind());
        step
    }

    fn finish_step(&mut self, node: &RuleNode, kind: StepKind) {
        let step = self.step(node, kind);
        trace!("Built {} step at {}", step.step_type(), step.base.start);
        self.append_step(node, step);
    }

    pub(super) fn exit_set(&mut self, node: &RuleNode) {
        let value = self.take_expr(node);
        let targets = self.take_lvalues(node);
        self.finish_step(node, StepKind::Set { targets, value });
    }

    pub(super) fn exit_call(&mut self, node: &RuleNode) {
        match self.take_expr(node) {
            Expression::Callable(call) => self.finish_step(node, StepKind::Call { call }),
            // Already reported
            Expression::ErrorMarker(_) => {}
            other => {
                let position = self.position_of(node);
                self.error(
                    ErrorImpl::CallTargetNotCallable {
                        found: other.to_string(),
                    },
                    position,
                );
            }
        }
    }

    pub(super) fn exit_return(&mut self, node: &RuleNode) {
        let count = node.count_rules(Rule::LogicalOrExpr);
        let values = self.take_exprs(node, count).unwrap_or_default();

        if self.current_command.is_some() {
            let position = self.position_of(node);
            self.error(ErrorImpl::ReturnInCommand, position);
            return;
        }

        self.finish_step(node, StepKind::Return { values });
    }

    pub(super) fn exit_emit(&mut self, node: &RuleNode) {
        let value = self.take_expr(node);
        self.finish_step(node, StepKind::Emit { value });
    }

    pub(super) fn exit_must(&mut self, node: &RuleNode) {
        let value = self.take_expr(node);
        self.finish_step(node, StepKind::Must { value });
    }

    pub(super) fn exit_fail(&mut self, node: &RuleNode) {
        let message = if node.count_rules(Rule::LogicalOrExpr) > 0 {
            Some(self.take_expr(node))
        } else {
            None
        };
        self.finish_step(node, StepKind::Fail { message });
    }

    pub(super) fn exit_clear_error(&mut self, node: &RuleNode) {
        self.finish_step(node, StepKind::ClearError);
    }

    pub(super) fn exit_expression_stmt(&mut self, node: &RuleNode) {
        let expression = self.take_expr(node);
        self.finish_step(node, StepKind::Expression { expression });
    }

    /// `ask model, prompt [with options] [into target]`, popped back to front.
    pub(super) fn exit_ask(&mut self, node: &RuleNode) {
        let target = if node.has_terminal(TokenKind::Into) {
            Some(self.take_lvalue(node))
        } else {
            None
        };
        let options = if node.has_terminal(TokenKind::With) {
            Some(self.take_expr(node))
        } else {
            None
        };
        let prompt = self.take_expr(node);
        let model = self.take_expr(node);

        self.finish_step(
            node,
            StepKind::Ask(AskStmt {
                model,
                prompt,
                options,
                target,
            }),
        );
    }

    pub(super) fn exit_promptuser(&mut self, node: &RuleNode) {
        let target = self.take_lvalue(node);
        let prompt = self.take_expr(node);
        self.finish_step(node, StepKind::PromptUser { prompt, target });
    }

    /// `break` and `continue`. An `on error` body inside a loop counts as
    /// inside that loop.
    pub(super) fn exit_loop_control(&mut self, node: &RuleNode) {
        let (kind, statement) = if node.rule == Rule::BreakStmt {
            (StepKind::Break, "break")
        } else {
            (StepKind::Continue, "continue")
        };

        if self.loop_depth == 0 {
            let position = self.position_of(node);
            match self.options.loop_control {
                LoopControlCheck::Error => self.error(
                    ErrorImpl::LoopControlOutsideLoop {
                        statement: String::from(statement),
                    },
                    position,
                ),
                LoopControlCheck::Warn => {
                    warn!("{}: `{}` outside of a loop", position, statement)
                }
            }
        }

        self.finish_step(node, kind);
    }

    /// Each `else if` turns into an `if` nested alone in the else-body of the
    /// previous one, so the chain is built from the back.
    pub(super) fn exit_if(&mut self, node: &RuleNode) {
        let mut else_body = if node.child_rule(Rule::ElseClause).is_some() {
            Some(self.take_steps(node))
        } else {
            None
        };

        let end = node
            .stop_token()
            .map(|token| token.span.end.clone())
            .unwrap_or_default();

        for clause in node.child_rules(Rule::ElseIfClause).into_iter().rev() {
            let body = self.take_steps(clause);
            let condition = self.take_expr(clause);

            let mut nested = Step::new(StepKind::If {
                condition,
                body,
                else_body,
            });
            let start = clause
                .start_token()
                .map(|token| token.span.start.clone())
                .unwrap_or_default();
            nested.base = BaseNode::new(Kind::If, start, end.clone());

            else_body = Some(vec![nested]);
        }

        let body = self.take_steps(node);
        let condition = self.take_expr(node);
        self.finish_step(
            node,
            StepKind::If {
                condition,
                body,
                else_body,
            },
        );
    }

    pub(super) fn exit_while(&mut self, node: &RuleNode) {
        let body = self.take_steps(node);
        let condition = self.take_expr(node);
        self.finish_step(node, StepKind::While { condition, body });
    }

    pub(super) fn exit_for(&mut self, node: &RuleNode) {
        let body = self.take_steps(node);
        let collection = self.take_expr(node);
        let variable = node
            .terminal(TokenKind::Identifier)
            .map(|token| token.value.clone())
            .unwrap_or_default();

        self.finish_step(
            node,
            StepKind::For {
                variable,
                collection,
                body,
            },
        );
    }

    pub(super) fn exit_on_error(&mut self, node: &RuleNode) {
        let body = self.take_steps(node);
        self.finish_step(node, StepKind::OnError { body });
    }

    pub(super) fn exit_lvalue_list(&mut self, node: &RuleNode) {
        let count = node.count_rules(Rule::Lvalue);
        let targets = match self.values.pop_lvalue_many(count) {
            Ok(targets) => targets,
            Err(error) => {
                self.stack_error(node, error);
                vec![]
            }
        };
        self.values.push(StackValue::LValues(targets));
    }

    /// `name`, then any run of `[expr]` and `.field`.
    pub(super) fn exit_lvalue(&mut self, node: &RuleNode) {
        let count = node.rule_children().len();
        let mut indices = self.take_exprs(node, count).unwrap_or_default().into_iter();

        let mut terminals = node.children.iter().filter_map(ParseTree::as_terminal);
        let identifier = match terminals.next() {
            Some(token) if token.kind == TokenKind::Identifier => token.value.clone(),
            _ => {
                self.malformed_lvalue(node, "assignment target must start with an identifier");
                String::new()
            }
        };

        let mut accessors = vec![];
        let mut open: Option<&Token> = None;

        for token in terminals {
            match (token.kind, open) {
                (TokenKind::OpenBracket | TokenKind::Dot, None) => open = Some(token),
                (TokenKind::CloseBracket, Some(start)) if start.kind == TokenKind::OpenBracket => {
                    open = None;
                    match indices.next() {
                        Some(index) => accessors.push(AccessorNode {
                            base: BaseNode::new(
                                Kind::Accessor,
                                start.span.start.clone(),
                                token.span.end.clone(),
                            ),
                            kind: AccessorKind::Index(index),
                        }),
                        None => self.malformed_lvalue(node, "index accessor without an index"),
                    }
                }
                (TokenKind::Identifier, Some(start)) if start.kind == TokenKind::Dot => {
                    open = None;
                    accessors.push(AccessorNode {
                        base: BaseNode::new(
                            Kind::Accessor,
                            start.span.start.clone(),
                            token.span.end.clone(),
                        ),
                        kind: AccessorKind::Field(token.value.clone()),
                    });
                }
                _ => {
                    self.malformed_lvalue(node, &format!("unexpected `{}` in accessor", token.value));
                    open = None;
                }
            }
        }

        if open.is_some() {
            self.malformed_lvalue(node, "unterminated accessor");
        }

        self.values.push(StackValue::LValue(LValueNode {
            base: self.base_of(node, Kind::LValue),
            identifier,
            accessors,
        }));
    }

    fn malformed_lvalue(&mut self, node: &RuleNode, message: &str) {
        let position = self.position_of(node);
        self.error(
            ErrorImpl::MalformedLValue {
                message: String::from(message),
            },
            position,
        );
    }
}
