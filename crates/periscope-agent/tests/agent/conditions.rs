//! Condition compilation, filtering, runtime failures, and transpiled
//! dialects.

use super::*;
use periscope_agent::messages;
use periscope_agent::transform::{SourceTransformer, TransformError};
use rstest::rstest;
use std::cell::Cell;

#[rstest]
#[case::star("*")]
#[case::dangling_operator("j+")]
#[case::assignment("x = 1")]
#[case::var_declaration("var x = 1;")]
#[case::call("console.log(1)")]
#[case::loop_statement("while(true);")]
#[case::return_statement("return 3")]
#[case::throw_statement("throw new Error()")]
#[case::new_expression("new Error()")]
#[case::try_statement("try { 1 }")]
#[case::let_declaration("let me_pass = 1")]
#[case::debugger_statement("debugger")]
#[case::update("x++")]
#[case::arrow("() => { 1 }")]
fn test_condition_rejected(#[case] condition: &str) {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some(condition.to_string());

    agent.set(&bp, |result| assert!(result.is_err()));

    let status = bp.borrow().status.clone().expect("status populated");
    assert!(status.is_error, "{condition:?}");
    assert_eq!(
        status.description.format,
        messages::ERROR_COMPILING_CONDITION,
        "{condition:?}"
    );
    assert_clean(&host, &agent);
}

#[rstest]
#[case::null_literal("null")]
#[case::empty("")]
#[case::bare_semicolon(";")]
#[case::loose_equality("x==1")]
#[case::this_arithmetic("this+1")]
#[case::sequence_with_object("1,2,3,{f:2},4")]
fn test_condition_accepted(#[case] condition: &str) {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some(condition.to_string());

    agent.set(&bp, |result| assert!(result.is_ok(), "{condition:?}"));
    assert!(bp.borrow().status.is_none(), "{condition:?}");
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_condition_fires_only_when_true() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some("n===5".to_string());
    agent.set(&bp, |result| assert!(result.is_ok()));

    let fired = Rc::new(Cell::new(0u32));
    let hits = fired.clone();
    agent.wait(&bp, move |result| {
        assert!(result.is_ok());
        hits.set(hits.get() + 1);
    });

    call_foo(&host, &root, 4.0);
    assert_eq!(fired.get(), 0, "condition false, no capture");
    assert!(bp.borrow().stack_frames.is_empty());

    call_foo(&host, &root, 5.0);
    assert_eq!(fired.get(), 1, "condition true, exactly one capture");
    assert_eq!(
        bp.borrow().stack_frames[0].arguments[0].value.as_deref(),
        Some("5")
    );

    call_foo(&host, &root, 5.0);
    assert_eq!(fired.get(), 1, "completed breakpoint stays quiet");

    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_condition_runtime_error_reports_once() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    // Compiles fine, fails at the hit: the identifier does not exist
    bp.borrow_mut().condition = Some("qqq === 1".to_string());
    agent.set(&bp, |result| assert!(result.is_ok()));

    let failed = Rc::new(Cell::new(0u32));
    let failures = failed.clone();
    agent.wait(&bp, move |result| {
        assert!(result.is_err());
        failures.set(failures.get() + 1);
    });

    call_foo(&host, &root, 1.0);
    assert_eq!(failed.get(), 1, "waiter fires once with the error");
    let status = bp.borrow().status.clone().unwrap();
    assert!(status.is_error);
    assert!(status
        .description
        .format
        .contains(messages::ERROR_EVALUATING_CONDITION));
    assert!(bp.borrow().stack_frames.is_empty(), "no capture on error");

    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_expression_compile_error_keeps_parser_message() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().expressions = vec!["j+".to_string()];

    agent.set(&bp, |result| assert!(result.is_err()));

    let status = bp.borrow().status.clone().unwrap();
    assert!(status.is_error);
    assert!(status
        .description
        .format
        .contains(messages::ERROR_COMPILING_EXPRESSION));
    assert!(status.description.format.contains("Unexpected token"));
    assert_clean(&host, &agent);
}

// ── Transpiled dialects ──────────────────────────────────────────────────────

/// Stands in for a dialect front end that rejects everything it is given.
struct RefusingFrontEnd;

impl SourceTransformer for RefusingFrontEnd {
    fn transpile(&self, source: &str) -> Result<String, TransformError> {
        Err(TransformError::new(format!(
            "Unexpected token '->' in {source:?}"
        )))
    }
}

/// Dialect front end that lowers `is` to `===` and otherwise passes
/// through, enough to prove the routing works end to end.
struct LoweringFrontEnd;

impl SourceTransformer for LoweringFrontEnd {
    fn transpile(&self, source: &str) -> Result<String, TransformError> {
        Ok(source.replace(" is ", " === "))
    }
}

fn coffee_workspace(
    transformer: Box<dyn SourceTransformer>,
) -> (tempfile::TempDir, PathBuf, Rc<MockHost>, DebugAgent) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app/brew.coffee");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "# brew fixture\nserve = (n) ->\n  n + 1\n").unwrap();
    let root = dir.path().canonicalize().unwrap();

    let mut transformers = TransformerRegistry::new();
    transformers.register("coffee", transformer);
    let inventory = scan(&root, &transformers.extensions()).unwrap();
    let host = MockHost::new();
    let agent = DebugAgent::with_transformers(
        AgentConfig::default(),
        inventory,
        host.clone() as Rc<dyn periscope_agent::DebugHost>,
        transformers,
    );
    (dir, root, host, agent)
}

#[test]
fn test_transpiled_condition_failure_is_catalog_exact() {
    let (_dir, _root, host, agent) = coffee_workspace(Box::new(RefusingFrontEnd));
    let bp = bp_at(1, "brew.coffee", 3);
    bp.borrow_mut().condition = Some("n is 5".to_string());

    agent.set(&bp, |result| assert!(result.is_err()));
    let status = bp.borrow().status.clone().unwrap();
    assert_eq!(status.description.format, messages::ERROR_COMPILING_CONDITION);
    assert_clean(&host, &agent);
}

#[test]
fn test_transpiled_expression_failure_keeps_front_end_message() {
    let (_dir, _root, host, agent) = coffee_workspace(Box::new(RefusingFrontEnd));
    let bp = bp_at(1, "brew.coffee", 3);
    bp.borrow_mut().expressions = vec!["x ->".to_string()];

    agent.set(&bp, |result| assert!(result.is_err()));
    let status = bp.borrow().status.clone().unwrap();
    assert!(status.description.format.contains("Unexpected token"));
    assert_clean(&host, &agent);
}

#[test]
fn test_transpiled_condition_routes_through_front_end() {
    let (_dir, root, host, agent) = coffee_workspace(Box::new(LoweringFrontEnd));
    let bp = bp_at(1, "brew.coffee", 3);
    bp.borrow_mut().condition = Some("n is 5".to_string());
    agent.set(&bp, |result| assert!(result.is_ok()));

    let fired = Rc::new(Cell::new(0u32));
    let hits = fired.clone();
    agent.wait(&bp, move |_| hits.set(hits.get() + 1));

    let path = root.join("app/brew.coffee");
    for n in [4.0, 5.0] {
        host.fire(&BreakEvent {
            path: path.clone(),
            line: 3,
            frames: vec![HostFrame {
                function: Some("serve".to_string()),
                path: path.clone(),
                line: 3,
                this: None,
                arguments: vec![NamedValue::new("n", Value::Number(n))],
                locals: Vec::new(),
            }],
            globals: Vec::new(),
        });
    }
    assert_eq!(fired.get(), 1, "lowered condition fired on n === 5 only");

    agent.clear(&bp);
    assert_clean(&host, &agent);
}
