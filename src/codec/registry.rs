use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::ast::ast::Kind;

/// Wire layout of one node type: fields are written in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSchema {
    pub kind: Kind,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl NodeSchema {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

lazy_static! {
    /// Every node kind by type id.
    pub static ref REGISTRY: HashMap<u8, NodeSchema> = {
        let mut registry = HashMap::new();
        let mut register = |kind: Kind, name: &'static str, fields: &'static [&'static str]| {
            registry.insert(kind.id(), NodeSchema { kind, name, fields });
        };

        // Declarations
        register(Kind::Program, "program", &["procedures", "commands", "events", "metadata", "comments"]);
        register(
            Kind::Procedure,
            "procedure",
            &[
                "name",
                "required_params",
                "optional_params",
                "return_params",
                "metadata",
                "steps",
                "error_handlers",
                "comments",
            ],
        );
        register(Kind::Command, "command", &["metadata", "steps", "error_handlers", "comments"]);
        register(
            Kind::OnEvent,
            "on_event",
            &["event", "handler_name", "bound_var", "steps", "error_handlers", "comments"],
        );
        register(Kind::Comment, "comment", &["text"]);
        register(Kind::LValue, "lvalue", &["identifier", "accessors"]);
        register(Kind::Accessor, "accessor", &["accessor"]);
        register(Kind::MapEntry, "map_entry", &["key", "value"]);

        // Steps
        register(Kind::Set, "set", &["targets", "value", "comments"]);
        register(Kind::Call, "call", &["call", "comments"]);
        register(Kind::Return, "return", &["values", "comments"]);
        register(Kind::Emit, "emit", &["value", "comments"]);
        register(Kind::Must, "must", &["value", "comments"]);
        register(Kind::Fail, "fail", &["message", "comments"]);
        register(Kind::Ask, "ask", &["model", "prompt", "options", "target", "comments"]);
        register(Kind::PromptUser, "promptuser", &["prompt", "target", "comments"]);
        register(Kind::ClearError, "clear_error", &["comments"]);
        register(Kind::Continue, "continue", &["comments"]);
        register(Kind::Break, "break", &["comments"]);
        register(Kind::If, "if", &["condition", "body", "else_body", "comments"]);
        register(Kind::For, "for", &["variable", "collection", "body", "comments"]);
        register(Kind::While, "while", &["condition", "body", "comments"]);
        register(Kind::OnError, "on_error", &["body", "comments"]);
        register(Kind::ExpressionStatement, "expression_statement", &["expression", "comments"]);

        // Expressions
        register(Kind::Variable, "variable", &["name"]);
        register(Kind::NumberLiteral, "number", &["value"]);
        register(Kind::StringLiteral, "string", &["value", "is_raw"]);
        register(Kind::BooleanLiteral, "boolean", &["value"]);
        register(Kind::NilLiteral, "nil", &[]);
        register(Kind::ListLiteral, "list", &["elements"]);
        register(Kind::MapLiteral, "map", &["entries"]);
        register(Kind::UnaryOp, "unary_op", &["operator", "operand"]);
        register(Kind::BinaryOp, "binary_op", &["left", "operator", "right"]);
        register(Kind::ElementAccess, "element_access", &["collection", "accessor"]);
        register(Kind::Callable, "callable", &["is_tool", "name", "arguments"]);
        register(Kind::TypeOf, "typeof", &["operand"]);
        register(Kind::Eval, "eval", &["source"]);
        register(Kind::Placeholder, "placeholder", &["name"]);
        register(Kind::LastResult, "last", &[]);
        register(Kind::ErrorMarker, "error_marker", &["message"]);

        registry
    };
}

pub fn schema(kind: Kind) -> Option<&'static NodeSchema> {
    REGISTRY.get(&kind.id())
}

pub fn schema_by_id(id: u8) -> Option<&'static NodeSchema> {
    REGISTRY.get(&id)
}

/// Registered field count of `kind`, as written on the wire.
pub fn field_count(kind: Kind) -> u8 {
    schema(kind)
        .map(|schema| schema.field_count() as u8)
        .unwrap_or_default()
}
