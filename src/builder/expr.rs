use crate::{
    ast::{
        ast::{BaseNode, Kind, Node},
        expressions::{
            BinaryExpr, BooleanExpr, CallTarget, CallableExpr, ElementAccessExpr, EvalExpr,
            Expression, LastResultExpr, ListExpr, MapEntryNode, MapExpr, NilExpr, Number,
            NumberExpr, PlaceholderExpr, StringExpr, TypeOfExpr, UnaryExpr, VariableExpr,
        },
    },
    errors::errors::ErrorImpl,
    lexer::tokens::{Token, TokenKind},
    parser::tree::{ParseTree, Rule, RuleNode},
};

use super::{builder::AstBuilder, stack::StackValue};

fn token_base(token: &Token, kind: Kind) -> BaseNode {
    BaseNode::new(kind, token.span.start.clone(), token.span.end.clone())
}

/// Integer unless the literal has a fractional part.
pub fn parse_number(text: &str) -> Option<Number> {
    if text.contains('.') {
        text.parse::<f64>().ok().map(Number::Float)
    } else {
        text.parse::<i64>().ok().map(Number::Int)
    }
}

impl AstBuilder {
    /// Folds `operand (op operand)*` left to right. A single operand passes
    /// through untouched.
    pub(super) fn exit_binary(&mut self, node: &RuleNode) {
        let operand_count = node.rule_children().len();
        if operand_count <= 1 {
            return;
        }

        let operators = node.terminals();
        let Some(operands) = self.take_exprs(node, operand_count) else {
            let marker = self.error_marker(node, "missing operand");
            self.push_expr(marker);
            return;
        };

        let mut operands = operands.into_iter();
        let Some(mut folded) = operands.next() else {
            return;
        };

        for (operator, right) in operators.into_iter().zip(operands) {
            let base = BaseNode::new(
                Kind::BinaryOp,
                folded.base().start.clone(),
                right.base().end.clone(),
            );
            folded = Expression::BinaryOp(BinaryExpr {
                base,
                left: Box::new(folded),
                operator: operator.value.clone(),
                right: Box::new(right),
            });
        }

        self.push_expr(folded);
    }

    pub(super) fn exit_unary(&mut self, node: &RuleNode) {
        let Some(ParseTree::Terminal(operator)) = node.children.first() else {
            return;
        };

        let operand = self.take_expr(node);
        let expression = if operator.kind == TokenKind::Typeof {
            Expression::TypeOf(TypeOfExpr {
                base: self.base_of(node, Kind::TypeOf),
                operand: Box::new(operand),
            })
        } else {
            Expression::UnaryOp(UnaryExpr {
                base: self.base_of(node, Kind::UnaryOp),
                operator: operator.value.clone(),
                operand: Box::new(operand),
            })
        };

        self.push_expr(expression);
    }

    /// `a ** b ** c` arrives already nested on the right.
    pub(super) fn exit_power(&mut self, node: &RuleNode) {
        let Some(operator) = node.terminal(TokenKind::StarStar) else {
            return;
        };

        let expression = match self.take_exprs(node, 2) {
            Some(operands) => {
                let mut operands = operands.into_iter();
                match (operands.next(), operands.next()) {
                    (Some(left), Some(right)) => Expression::BinaryOp(BinaryExpr {
                        base: self.base_of(node, Kind::BinaryOp),
                        left: Box::new(left),
                        operator: operator.value.clone(),
                        right: Box::new(right),
                    }),
                    _ => self.error_marker(node, "missing operand"),
                }
            }
            None => self.error_marker(node, "missing operand"),
        };

        self.push_expr(expression);
    }

    /// Chains `[index]` and `.field` accessors into nested element accesses,
    /// each one covering the text from the primary to its own closing token.
    pub(super) fn exit_accessor(&mut self, node: &RuleNode) {
        if node.terminals().is_empty() {
            return;
        }

        let count = node.rule_children().len();
        let Some(values) = self.take_exprs(node, count) else {
            let marker = self.error_marker(node, "missing operand");
            self.push_expr(marker);
            return;
        };

        let mut values = values.into_iter();
        let Some(mut result) = values.next() else {
            return;
        };

        let mut pending_index: Option<Expression> = None;
        let mut after_dot = false;

        for child in &node.children {
            let ParseTree::Terminal(token) = child else {
                continue;
            };

            let accessor = match token.kind {
                TokenKind::OpenBracket => {
                    pending_index = values.next();
                    None
                }
                TokenKind::CloseBracket => pending_index.take(),
                TokenKind::Dot => {
                    after_dot = true;
                    None
                }
                TokenKind::Identifier if after_dot => {
                    after_dot = false;
                    Some(Expression::StringLiteral(StringExpr {
                        base: token_base(token, Kind::StringLiteral),
                        value: token.value.clone(),
                        is_raw: false,
                    }))
                }
                _ => None,
            };

            if let Some(accessor) = accessor {
                let base = BaseNode::new(
                    Kind::ElementAccess,
                    result.base().start.clone(),
                    token.span.end.clone(),
                );
                result = Expression::ElementAccess(ElementAccessExpr {
                    base,
                    collection: Box::new(result),
                    accessor: Box::new(accessor),
                });
            }
        }

        self.push_expr(result);
    }

    /// Identifiers and `last` become leaves here; everything else was pushed
    /// by a child rule.
    pub(super) fn exit_primary(&mut self, node: &RuleNode) {
        if let Some(identifier) = node.terminal(TokenKind::Identifier) {
            self.push_expr(Expression::Variable(VariableExpr {
                base: token_base(identifier, Kind::Variable),
                name: identifier.value.clone(),
            }));
        } else if let Some(last) = node.terminal(TokenKind::Last) {
            self.push_expr(Expression::LastResult(LastResultExpr {
                base: token_base(last, Kind::LastResult),
            }));
        }
    }

    pub(super) fn exit_literal(&mut self, node: &RuleNode) {
        let Some(token) = node.terminals().into_iter().next() else {
            let marker = self.error_marker(node, "empty literal");
            self.push_expr(marker);
            return;
        };

        let expression = match token.kind {
            TokenKind::Number => match parse_number(&token.value) {
                Some(value) => Expression::NumberLiteral(NumberExpr {
                    base: token_base(token, Kind::NumberLiteral),
                    value,
                }),
                None => {
                    self.error(
                        ErrorImpl::NumberParseError {
                            token: token.value.clone(),
                        },
                        token.span.start.clone(),
                    );
                    self.error_marker(node, "invalid number")
                }
            },
            TokenKind::String | TokenKind::RawString => Expression::StringLiteral(StringExpr {
                base: token_base(token, Kind::StringLiteral),
                value: token.value.clone(),
                is_raw: token.kind == TokenKind::RawString,
            }),
            TokenKind::True | TokenKind::False => Expression::BooleanLiteral(BooleanExpr {
                base: token_base(token, Kind::BooleanLiteral),
                value: token.kind == TokenKind::True,
            }),
            TokenKind::Nil => Expression::NilLiteral(NilExpr {
                base: token_base(token, Kind::NilLiteral),
            }),
            _ => {
                self.error(
                    ErrorImpl::UnexpectedToken {
                        token: token.value.clone(),
                    },
                    token.span.start.clone(),
                );
                self.error_marker(node, "not a literal")
            }
        };

        self.push_expr(expression);
    }

    pub(super) fn exit_placeholder(&mut self, node: &RuleNode) {
        let name = node
            .terminal(TokenKind::Identifier)
            .map(|token| token.value.clone())
            .unwrap_or_default();

        self.push_expr(Expression::Placeholder(PlaceholderExpr {
            base: self.base_of(node, Kind::Placeholder),
            name,
        }));
    }

    pub(super) fn exit_callable(&mut self, node: &RuleNode) {
        let target = node
            .child_rule(Rule::CallTarget)
            .map(call_target)
            .unwrap_or_default();

        let count = node.count_rules(Rule::LogicalOrExpr);
        let expression = match self.take_exprs(node, count) {
            Some(arguments) => Expression::Callable(CallableExpr {
                base: self.base_of(node, Kind::Callable),
                target,
                arguments,
            }),
            None => self.error_marker(node, "missing call argument"),
        };

        self.push_expr(expression);
    }

    pub(super) fn exit_list_literal(&mut self, node: &RuleNode) {
        let count = node.count_rules(Rule::LogicalOrExpr);
        let expression = match self.take_exprs(node, count) {
            Some(elements) => Expression::ListLiteral(ListExpr {
                base: self.base_of(node, Kind::ListLiteral),
                elements,
            }),
            None => self.error_marker(node, "missing list element"),
        };

        self.push_expr(expression);
    }

    pub(super) fn exit_map_entry(&mut self, node: &RuleNode) {
        let key = node
            .terminal(TokenKind::String)
            .map(|token| token.value.clone())
            .unwrap_or_default();
        let value = self.take_expr(node);

        self.values.push(StackValue::MapEntry(MapEntryNode {
            base: self.base_of(node, Kind::MapEntry),
            key,
            value,
        }));
    }

    pub(super) fn exit_map_literal(&mut self, node: &RuleNode) {
        let count = node.count_rules(Rule::MapEntry);
        let expression = match self.values.pop_map_entries(count) {
            Ok(entries) => Expression::MapLiteral(MapExpr {
                base: self.base_of(node, Kind::MapLiteral),
                entries,
            }),
            Err(error) => {
                self.stack_error(node, error);
                self.error_marker(node, "missing map entry")
            }
        };

        self.push_expr(expression);
    }

    pub(super) fn exit_eval(&mut self, node: &RuleNode) {
        let source = self.take_expr(node);
        self.push_expr(Expression::Eval(EvalExpr {
            base: self.base_of(node, Kind::Eval),
            source: Box::new(source),
        }));
    }
}

/// `tool.a.b` keeps `a.b` as the name; a plain identifier is a procedure.
fn call_target(node: &RuleNode) -> CallTarget {
    let name = node
        .terminals()
        .into_iter()
        .filter(|token| token.kind == TokenKind::Identifier)
        .map(|token| token.value.as_str())
        .collect::<Vec<&str>>()
        .join(".");

    CallTarget {
        is_tool: node.has_terminal(TokenKind::Tool),
        name,
    }
}
