use crate::{
    ast::{
        ast::{CommandNode, Kind, OnEventDecl, Procedure},
        statements::partition_error_handlers,
    },
    errors::errors::ErrorImpl,
    lexer::tokens::{Token, TokenKind},
    parser::tree::{ParseTree, Rule, RuleNode},
};

use super::{builder::AstBuilder, stack::StackValue};

/// The terminal directly following the first `kind` terminal of `node`.
fn terminal_after(node: &RuleNode, kind: TokenKind) -> Option<&Token> {
    let mut terminals = node.children.iter().filter_map(ParseTree::as_terminal);
    terminals.find(|token| token.kind == kind)?;
    terminals.next()
}

impl AstBuilder {
    pub(super) fn enter_procedure(&mut self, node: &RuleNode) {
        let name = node
            .terminal(TokenKind::Identifier)
            .map(|token| token.value.clone())
            .unwrap_or_default();

        self.current_procedure = Some(Procedure {
            base: self.base_of(node, Kind::Procedure),
            name,
            ..Default::default()
        });
    }

    pub(super) fn enter_command(&mut self, node: &RuleNode) {
        self.current_command = Some(CommandNode {
            base: self.base_of(node, Kind::Command),
            ..Default::default()
        });
    }

    pub(super) fn exit_program(&mut self, node: &RuleNode) {
        self.program.base = self.base_of(node, Kind::Program);
    }

    pub(super) fn exit_param_list(&mut self, node: &RuleNode) {
        let names = node
            .terminals()
            .into_iter()
            .filter(|token| token.kind == TokenKind::Identifier)
            .map(|token| token.value.clone())
            .collect();
        self.values.push(StackValue::Names(names));
    }

    /// `needs`, `optional` and `returns` each fill their own list, so clause
    /// order in the signature does not matter.
    pub(super) fn exit_signature_clause(&mut self, node: &RuleNode) {
        let names = self.take_names(node);

        let Some(procedure) = self.current_procedure.as_mut() else {
            let position = self.position_of(node);
            self.error(
                ErrorImpl::DeclarationOutsideScope {
                    what: node.rule.to_string(),
                },
                position,
            );
            return;
        };

        match node.rule {
            Rule::NeedsClause => procedure.required_params.extend(names),
            Rule::OptionalClause => procedure.optional_params.extend(names),
            _ => procedure.return_params.extend(names),
        }
    }

    pub(super) fn exit_procedure(&mut self, node: &RuleNode) {
        let steps = self.take_steps(node);

        let Some(mut procedure) = self.current_procedure.take() else {
            let position = self.position_of(node);
            self.error(
                ErrorImpl::DeclarationOutsideScope {
                    what: node.rule.to_string(),
                },
                position,
            );
            return;
        };

        let (steps, error_handlers) = partition_error_handlers(steps);
        procedure.steps = steps;
        procedure.error_handlers = error_handlers;
        procedure.base = self.base_of(node, Kind::Procedure);

        if self.program.procedures.contains_key(&procedure.name) {
            self.error(
                ErrorImpl::DuplicateProcedure {
                    name: procedure.name.clone(),
                },
                procedure.base.start.clone(),
            );
            return;
        }

        debug!(
            "Built procedure `{}` ({} step(s), {} error handler(s))",
            procedure.name,
            procedure.steps.len(),
            procedure.error_handlers.len()
        );
        self.program
            .procedures
            .insert(procedure.name.clone(), procedure);
    }

    pub(super) fn exit_command(&mut self, node: &RuleNode) {
        let steps = self.take_steps(node);
        let mut command = self.current_command.take().unwrap_or_default();

        let (steps, error_handlers) = partition_error_handlers(steps);
        command.steps = steps;
        command.error_handlers = error_handlers;
        command.base = self.base_of(node, Kind::Command);

        debug!("Built command with {} step(s)", command.steps.len());
        self.program.commands.push(command);
    }

    pub(super) fn exit_event_handler(&mut self, node: &RuleNode) {
        let steps = self.take_steps(node);
        let event = self.take_expr(node);

        let handler_name = terminal_after(node, TokenKind::Named)
            .filter(|token| token.kind == TokenKind::String)
            .map(|token| token.value.clone());
        let bound_var = terminal_after(node, TokenKind::As)
            .filter(|token| token.kind == TokenKind::Identifier)
            .map(|token| token.value.clone());

        let (steps, error_handlers) = partition_error_handlers(steps);
        let handler = OnEventDecl {
            base: self.base_of(node, Kind::OnEvent),
            event,
            handler_name,
            bound_var,
            steps,
            error_handlers,
            comments: vec![],
        };

        debug!("Built event handler for {}", handler.event);
        self.program.events.push(handler);
    }
}
