//! Unit tests for the parser module.
//!
//! This module contains tests for parsing the language constructs including:
//! - Procedures, commands and event handlers
//! - Statements and nested blocks
//! - The shape of expression rules
//! - Syntax errors
//! - The listener walk

use super::{
    parser::parse,
    tree::{walk, BlockKind, ParseTree, ParseTreeListener, Rule, RuleNode},
};
use crate::lexer::{lexer::tokenize, tokens::Token, tokens::TokenKind};

fn parse_source(source: &str) -> Result<ParseTree, crate::errors::errors::Error> {
    let tokens = tokenize(source.to_string(), Some("test.ns".to_string())).unwrap();
    parse(&tokens)
}

fn program(source: &str) -> RuleNode {
    match parse_source(source).unwrap() {
        ParseTree::Rule(node) => node,
        ParseTree::Terminal(_) => panic!("expected a rule at the root"),
    }
}

/// Descends through single-rule chains until `rule` is found.
fn find_rule<'a>(node: &'a RuleNode, rule: Rule) -> Option<&'a RuleNode> {
    if node.rule == rule {
        return Some(node);
    }
    node.rule_children()
        .into_iter()
        .find_map(|child| find_rule(child, rule))
}

#[test]
fn test_parse_procedure() {
    let root = program("func add(needs a, b returns sum) means\n  return a + b\nendfunc\n");

    assert_eq!(root.rule, Rule::Program);
    let procedure = root.child_rule(Rule::ProcedureDefinition).unwrap();
    assert_eq!(procedure.terminal(TokenKind::Identifier).unwrap().value, "add");

    let signature = procedure.child_rule(Rule::Signature).unwrap();
    assert_eq!(signature.count_rules(Rule::NeedsClause), 1);
    assert_eq!(signature.count_rules(Rule::ReturnsClause), 1);

    let body = procedure
        .child_rule(Rule::Block(BlockKind::ProcedureBody))
        .unwrap();
    assert_eq!(body.count_rules(Rule::ReturnStmt), 1);
    assert_eq!(procedure.stop_token().unwrap().kind, TokenKind::EndFunc);
}

#[test]
fn test_parse_signature_without_parentheses() {
    let root = program("func greet needs name optional greeting means\n  emit name\nendfunc");
    let signature = find_rule(&root, Rule::Signature).unwrap();

    assert_eq!(signature.count_rules(Rule::NeedsClause), 1);
    assert_eq!(signature.count_rules(Rule::OptionalClause), 1);
}

#[test]
fn test_parse_command_with_metadata() {
    let root = program("command\n:: purpose: demo\n  emit \"hi\"\nendcommand\n");
    let command = root.child_rule(Rule::CommandBlock).unwrap();

    assert_eq!(command.count_rules(Rule::MetadataEntry), 1);
    assert!(command
        .child_rule(Rule::Block(BlockKind::CommandBody))
        .is_some());
}

#[test]
fn test_parse_event_handler() {
    let root = program("on event \"tick\" named \"ticker\" as payload do\n  emit payload\nendon\n");
    let handler = root.child_rule(Rule::EventHandler).unwrap();

    assert_eq!(handler.terminal(TokenKind::String).unwrap().value, "ticker");
    assert!(handler.has_terminal(TokenKind::As));
    assert_eq!(handler.count_rules(Rule::LogicalOrExpr), 1);
}

#[test]
fn test_parse_if_else_if_chain() {
    let source = "func f means\n  if a\n    emit 1\n  else if b\n    emit 2\n  else if c\n    emit 3\n  else\n    emit 4\n  endif\nendfunc\n";
    let root = program(source);
    let if_stmt = find_rule(&root, Rule::IfStmt).unwrap();

    assert_eq!(if_stmt.count_rules(Rule::ElseIfClause), 2);
    assert_eq!(if_stmt.count_rules(Rule::ElseClause), 1);
    assert_eq!(if_stmt.stop_token().unwrap().kind, TokenKind::EndIf);
}

#[test]
fn test_parse_loops_and_on_error() {
    let source = "func f means\n  for each x in items\n    continue\n  endfor\n  while true\n    break\n  endwhile\n  on error do\n    clear_error\n  endon\nendfunc\n";
    let root = program(source);
    let body = find_rule(&root, Rule::Block(BlockKind::ProcedureBody)).unwrap();

    let rules: Vec<Rule> = body.rule_children().iter().map(|n| n.rule).collect();
    assert_eq!(rules, vec![Rule::ForStmt, Rule::WhileStmt, Rule::OnErrorStmt]);
}

#[test]
fn test_binary_levels_are_flat() {
    let root = program("func f means\n  emit 1 + 2 - 3 + 4\nendfunc");
    let additive = find_rule(&root, Rule::AdditiveExpr).unwrap();

    assert_eq!(additive.count_rules(Rule::MultiplicativeExpr), 4);
    let operators: Vec<&str> = additive.terminals().iter().map(|t| t.value.as_str()).collect();
    assert_eq!(operators, vec!["+", "-", "+"]);
}

#[test]
fn test_power_recurses_on_the_right() {
    let root = program("func f means\n  emit 2 ** 3 ** 2\nendfunc");
    let power = find_rule(&root, Rule::PowerExpr).unwrap();

    assert!(power.has_terminal(TokenKind::StarStar));
    let right = power.child_rule(Rule::PowerExpr).unwrap();
    assert!(right.has_terminal(TokenKind::StarStar));
    assert!(!right.child_rule(Rule::PowerExpr).unwrap().has_terminal(TokenKind::StarStar));
}

#[test]
fn test_parse_tool_call() {
    let root = program("func f means\n  call tool.web.search(\"q\", 3)\nendfunc");
    let callable = find_rule(&root, Rule::CallableExpr).unwrap();
    let target = callable.child_rule(Rule::CallTarget).unwrap();

    assert!(target.has_terminal(TokenKind::Tool));
    assert_eq!(callable.count_rules(Rule::LogicalOrExpr), 2);
}

#[test]
fn test_parse_set_with_multiple_targets() {
    let root = program("func f means\n  set a, b.c[0] = pair()\nendfunc");
    let targets = find_rule(&root, Rule::LvalueList).unwrap();

    assert_eq!(targets.count_rules(Rule::Lvalue), 2);
}

#[test]
fn test_parse_ask_and_promptuser() {
    let source = "func f means\n  ask \"model\", \"prompt\" with {\"t\": 1} into answer\n  promptuser \"name?\" into name\nendfunc";
    let root = program(source);

    let ask = find_rule(&root, Rule::AskStmt).unwrap();
    assert!(ask.has_terminal(TokenKind::With));
    assert!(ask.has_terminal(TokenKind::Into));
    assert_eq!(ask.count_rules(Rule::LogicalOrExpr), 3);
    assert_eq!(ask.count_rules(Rule::Lvalue), 1);

    assert!(find_rule(&root, Rule::PromptUserStmt).is_some());
}

#[test]
fn test_parse_literals() {
    let source = "func f means\n  emit [1, \"a\", true, nil, {{who}}, {\"k\": last}, eval(\"1\")]\nendfunc";
    let root = program(source);

    assert!(find_rule(&root, Rule::ListLiteral).is_some());
    assert!(find_rule(&root, Rule::Placeholder).is_some());
    assert!(find_rule(&root, Rule::MapLiteral).is_some());
    assert!(find_rule(&root, Rule::EvalExpr).is_some());
}

#[test]
fn test_return_inside_command_is_rejected() {
    let error = parse_source("command\n  return 1\nendcommand\n").unwrap_err();
    assert_eq!(error.get_error_name(), "ReturnInCommand");
}

#[test]
fn test_empty_command_is_rejected() {
    let error = parse_source("command\n\nendcommand\n").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_missing_terminator() {
    let error = parse_source("func f means\n  emit 1\n").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_statement_outside_declaration() {
    assert!(parse_source("set a = 1\n").is_err());
}

#[test]
fn test_map_keys_must_be_strings() {
    assert!(parse_source("func f means\n  emit {a: 1}\nendfunc").is_err());
}

#[test]
fn test_comments_do_not_reach_the_tree() {
    let root = program("# leading\nfunc f means # trailing\n  emit 1\nendfunc\n");

    struct Collector(Vec<TokenKind>);
    impl ParseTreeListener for Collector {
        fn visit_terminal(&mut self, token: &Token) {
            self.0.push(token.kind);
        }
    }

    let mut collector = Collector(vec![]);
    walk(&mut collector, &ParseTree::Rule(root));
    assert!(!collector.0.contains(&TokenKind::Comment));
    assert!(!collector.0.contains(&TokenKind::Newline));
    assert_eq!(collector.0.last(), Some(&TokenKind::EOF));
}

#[test]
fn test_walk_order() {
    let root = program("func f means\n  emit 1\nendfunc");

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }
    impl ParseTreeListener for Recorder {
        fn enter_rule(&mut self, node: &RuleNode) {
            if matches!(node.rule, Rule::ProcedureDefinition | Rule::EmitStmt) {
                self.events.push(format!("enter {}", node.rule));
            }
        }
        fn exit_rule(&mut self, node: &RuleNode) {
            if matches!(node.rule, Rule::ProcedureDefinition | Rule::EmitStmt) {
                self.events.push(format!("exit {}", node.rule));
            }
        }
    }

    let mut recorder = Recorder::default();
    walk(&mut recorder, &ParseTree::Rule(root));
    assert_eq!(
        recorder.events,
        vec![
            "enter ProcedureDefinition",
            "enter EmitStmt",
            "exit EmitStmt",
            "exit ProcedureDefinition",
        ]
    );
}
