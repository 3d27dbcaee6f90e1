//! Integration tests for the whole pipeline.
//!
//! These tests drive source text through tokenizing, parsing, building and
//! the binary codec, checking the properties the tree must hold end to end.

use std::thread;

use nscript::{
    ast::{
        ast::{Kind, Program},
        expressions::Expression,
        statements::{AccessorKind, StepKind},
    },
    builder::{build, BuildOptions},
    codec::{decode, encode, encode_with_options, EncodeOptions, MAX_DEPTH},
    compile_source,
    lexer::{lexer::tokenize, tokens::TokenKind},
    parser::{
        parser::parse,
        tree::{ParseTree, Rule},
    },
};

const SCRIPT: &str = r#":: name: inventory
:: version: 2 # bumped for the new store
# Counts and stores items.
func count(needs items returns total) means
  set total = 0
  for each item in items
    if no item
      continue
    endif
    set total = total + 1
  endfor
  return total
endfunc

func store(needs items optional label) means
  -- write everything out
  set summary.count, summary["label"] = count(items)
  call tool.store.put(summary)
  emit summary
  on error do
    emit "store failed"
  endon
endfunc

command
:: owner: ops
  set items = [1, 2, 3]
  call store(items) // run it
endcommand

on event "restock" as batch do
  while some batch
    call store(batch)
    break
  endwhile
endon
"#;

fn compile(source: &str) -> Program {
    let compilation =
        compile_source(source, Some("script.ns".to_string()), &BuildOptions::default()).unwrap();
    if let Err(errors) = &compilation.result {
        panic!("build failed: {}", errors);
    }
    compilation.program
}

fn error_names(source: &str) -> Vec<String> {
    let compilation =
        compile_source(source, Some("script.ns".to_string()), &BuildOptions::default()).unwrap();
    compilation
        .result
        .unwrap_err()
        .errors()
        .iter()
        .map(|e| e.get_error_name().to_string())
        .collect()
}

fn emitted(expression: &str) -> String {
    let program = compile(&format!("func f means\n  emit {}\nendfunc\n", expression));
    match &program.procedures["f"].steps[0].kind {
        StepKind::Emit { value } => value.to_string(),
        other => panic!("expected an emit step, got {:?}", other),
    }
}

#[test]
fn test_script_shape() {
    let program = compile(SCRIPT);

    assert_eq!(program.procedures.len(), 2);
    assert_eq!(program.commands.len(), 1);
    assert_eq!(program.events.len(), 1);

    assert_eq!(program.metadata["name"], "inventory");
    assert_eq!(program.metadata["version"], "2");
    assert_eq!(program.commands[0].metadata["owner"], "ops");

    let count = &program.procedures["count"];
    assert_eq!(count.required_params, vec!["items"]);
    assert_eq!(count.return_params, vec!["total"]);

    let store = &program.procedures["store"];
    assert_eq!(store.optional_params, vec!["label"]);
    assert_eq!(store.steps.len(), 3);
    assert_eq!(store.error_handlers.len(), 1);

    assert_eq!(program.events[0].bound_var.as_deref(), Some("batch"));
    assert_eq!(program.events[0].event.to_string(), "\"restock\"");
}

#[test]
fn test_round_trip() {
    let program = compile(SCRIPT);

    let decoded = decode(&encode(&program)).unwrap();
    assert_eq!(decoded, program);

    let options = EncodeOptions {
        include_positions: true,
    };
    let decoded = decode(&encode_with_options(&program, options)).unwrap();
    assert_eq!(decoded, program);
    assert_eq!(
        decoded.procedures["store"].base.start,
        program.procedures["store"].base.start
    );
}

#[test]
fn test_long_sum_round_trip() {
    let sum = (1..=300).map(|n| n.to_string()).collect::<Vec<_>>().join(" + ");
    let program = compile(&format!("command\n  set total = {}\n  emit total\nendcommand\n", sum));

    let decoded = decode(&encode(&program)).unwrap();
    assert_eq!(decoded, program);
}

#[test]
fn test_too_deep_is_a_build_error() {
    let sum = (0..MAX_DEPTH + 1).map(|_| "1").collect::<Vec<_>>().join(" + ");
    assert_eq!(
        error_names(&format!("command\n  emit {}\nendcommand\n", sum)),
        vec!["NestingTooDeep"]
    );
}

#[test]
fn test_encoding_is_deterministic() {
    assert_eq!(encode(&compile(SCRIPT)), encode(&compile(SCRIPT)));
}

#[test]
fn test_stack_discipline() {
    let tokens = tokenize(SCRIPT.to_string(), None).unwrap();
    let tree = parse(&tokens).unwrap();
    let (_, result) = build(&tree, &tokens, &BuildOptions::default());
    assert!(result.is_ok());
}

#[test]
fn test_every_comment_is_attached_once() {
    let tokens = tokenize(SCRIPT.to_string(), None).unwrap();
    let expected = tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Comment)
        .count();

    let program = compile(SCRIPT);
    assert_eq!(expected, 3);
    assert_eq!(program.comment_count(), expected);

    let mut texts = vec![];
    texts.extend(program.comments.iter().map(|c| c.text.clone()));
    for procedure in program.procedures.values() {
        texts.extend(procedure.comments.iter().map(|c| c.text.clone()));
        for step in procedure.steps.iter().chain(&procedure.error_handlers) {
            texts.extend(step.comments.iter().map(|c| c.text.clone()));
        }
    }
    for command in &program.commands {
        texts.extend(command.comments.iter().map(|c| c.text.clone()));
        for step in &command.steps {
            texts.extend(step.comments.iter().map(|c| c.text.clone()));
        }
    }
    texts.sort();
    texts.dedup();
    assert_eq!(texts.len(), expected);
}

#[test]
fn test_associativity() {
    assert_eq!(emitted("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(emitted("5 - 3 + 1"), "((5 - 3) + 1)");
}

#[test]
fn test_precedence_ladder() {
    assert_eq!(
        emitted("a or b and c | d ^ e & f == g < h + i * -j ** k.l"),
        "(a or (b and (c | (d ^ (e & (f == (g < (h + (i * (- (j ** k[\"l\"])))))))))))"
    );
}

#[test]
fn test_duplicate_procedure() {
    let source = "func f means\n  emit 1\nendfunc\nfunc f means\n  emit 2\nendfunc\n";
    assert_eq!(error_names(source), vec!["DuplicateProcedure"]);

    let compilation = compile_source(source, None, &BuildOptions::default()).unwrap();
    let StepKind::Emit { value } = &compilation.program.procedures["f"].steps[0].kind else {
        panic!("expected an emit step");
    };
    assert_eq!(value.to_string(), "1");
}

#[test]
fn test_metadata_trailing_comment() {
    let program = compile(":: key: value # trailing comment\ncommand\n  emit 1\nendcommand\n");
    assert_eq!(program.metadata["key"], "value");
}

#[test]
fn test_file_metadata_matches_program() {
    let compilation =
        compile_source(SCRIPT, None, &BuildOptions::default()).unwrap();
    assert_eq!(compilation.file_metadata, compilation.program.metadata);
}

#[test]
fn test_error_handler_partition() {
    let program = compile(
        "func f means\n  emit 1\n  on error do\n    clear_error\n  endon\n  emit 2\n  emit 3\nendfunc\n",
    );
    let procedure = &program.procedures["f"];

    assert_eq!(procedure.steps.len(), 3);
    assert_eq!(procedure.error_handlers.len(), 1);
    assert!(procedure.error_handlers[0].is_on_error());
}

#[test]
fn test_accessor_chain_target() {
    let program = compile("func f means\n  set a.b[0][\"c\"].d[1] = 1\nendfunc\n");
    let StepKind::Set { targets, .. } = &program.procedures["f"].steps[0].kind else {
        panic!("expected a set step");
    };

    let target = &targets[0];
    assert_eq!(target.identifier, "a");
    assert_eq!(target.to_string(), "a.b[0][\"c\"].d[1]");

    let shape: Vec<String> = target
        .accessors
        .iter()
        .map(|accessor| match &accessor.kind {
            AccessorKind::Field(name) => format!("dot({})", name),
            AccessorKind::Index(index) => format!("bracket({})", index),
        })
        .collect();
    assert_eq!(
        shape,
        vec!["dot(b)", "bracket(0)", "bracket(\"c\")", "dot(d)", "bracket(1)"]
    );
    assert!(target
        .accessors
        .iter()
        .all(|accessor| accessor.base.kind == Kind::Accessor));
}

#[test]
fn test_loop_scoping() {
    assert_eq!(
        error_names("func f means\n  continue\nendfunc\n"),
        vec!["LoopControlOutsideLoop"]
    );
    compile("func f means\n  while true\n    break\n  endwhile\nendfunc\n");
}

#[test]
fn test_front_end_errors_abort() {
    let error = compile_source("func f means\n  set = 1\nendfunc\n", None, &BuildOptions::default())
        .unwrap_err();
    assert_eq!(error.get_position().line, 2);

    assert!(compile_source("command\n  emit $\nendcommand\n", None, &BuildOptions::default()).is_err());
}

fn strip_rule(tree: &mut ParseTree, rule: Rule) -> bool {
    let ParseTree::Rule(node) = tree else {
        return false;
    };
    if node.rule == rule {
        node.children
            .retain(|child| matches!(child, ParseTree::Terminal(_)));
        return true;
    }
    node.children.iter_mut().any(|child| strip_rule(child, rule))
}

#[test]
fn test_malformed_tree_does_not_panic() {
    let tokens = tokenize("func f means\n  emit 1 + 2\nendfunc\n".to_string(), None).unwrap();
    let mut tree = parse(&tokens).unwrap();
    assert!(strip_rule(&mut tree, Rule::AdditiveExpr));

    let (output, result) = build(&tree, &tokens, &BuildOptions::default());
    let errors = result.unwrap_err();
    let names: Vec<&str> = errors.errors().iter().map(|e| e.get_error_name()).collect();
    assert!(names.contains(&"StackUnderflow"));

    let StepKind::Emit { value } = &output.program.procedures["f"].steps[0].kind else {
        panic!("expected an emit step");
    };
    assert!(matches!(value, Expression::ErrorMarker(_)));
}

#[test]
fn test_builds_are_independent_across_threads() {
    let expected = compile(SCRIPT);
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| encode(&compile(SCRIPT))))
        .collect();

    for handle in handles {
        let bytes = handle.join().unwrap();
        assert_eq!(decode(&bytes).unwrap(), expected);
    }
}
