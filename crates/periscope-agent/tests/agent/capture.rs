//! Snapshot capture scenarios: frames, interning, bounds, expressions,
//! logpoints.

use super::*;
use periscope_agent::{Action, CaptureConfig};
use pretty_assertions::assert_eq;
use std::cell::Cell;

fn config_with(capture: CaptureConfig) -> AgentConfig {
    AgentConfig {
        capture,
        ..AgentConfig::default()
    }
}

#[test]
fn test_capture_top_frame_and_argument() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));

    let fired = Rc::new(Cell::new(0u32));
    let hits = fired.clone();
    agent.wait(&bp, move |result| {
        assert!(result.is_ok());
        hits.set(hits.get() + 1);
    });

    call_foo(&host, &root, 2.0);
    assert_eq!(fired.get(), 1);

    {
        let snapshot = bp.borrow();
        let top = &snapshot.stack_frames[0];
        assert_eq!(top.function, "foo");
        assert_eq!(top.location.line, 4);
        assert_eq!(top.arguments[0].name.as_deref(), Some("n"));
        assert_eq!(top.arguments[0].value.as_deref(), Some("2"));
        assert_table_indexes(&snapshot);
    }

    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_second_hit_suppressed() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));

    let fired = Rc::new(Cell::new(0u32));
    let hits = fired.clone();
    agent.wait(&bp, move |_| hits.set(hits.get() + 1));

    call_foo(&host, &root, 1.0);
    call_foo(&host, &root, 2.0);
    assert_eq!(fired.get(), 1, "only the first hit is reported");

    // The captured state is from the first call
    assert_eq!(
        bp.borrow().stack_frames[0].arguments[0].value.as_deref(),
        Some("1")
    );
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_locals_compounds_via_table() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 5);
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 2.0);

    {
        let snapshot = bp.borrow();
        let locals = &snapshot.stack_frames[0].locals;
        let a = locals.iter().find(|v| v.name.as_deref() == Some("A")).unwrap();
        let b = locals.iter().find(|v| v.name.as_deref() == Some("B")).unwrap();

        let a_entry = deref(&snapshot, a);
        assert_eq!(a_entry.type_name.as_deref(), Some("array"));
        assert_eq!(a_entry.members.len(), 3);
        assert_eq!(a_entry.members[0].value.as_deref(), Some("1"));

        let b_entry = deref(&snapshot, b);
        assert_eq!(b_entry.members.len(), 3);
        let b_member = b_entry
            .members
            .iter()
            .find(|m| m.name.as_deref() == Some("b"))
            .unwrap();
        assert_eq!(b_member.value.as_deref(), Some("6"));
        assert_table_indexes(&snapshot);
    }
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_expression_truncated_to_max_properties() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_with_config(
        inventory,
        config_with(CaptureConfig {
            max_properties: 1,
            ..CaptureConfig::default()
        }),
    );
    let bp = bp_at(1, "foo.js", 5);
    bp.borrow_mut().expressions = vec!["A".to_string()];
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 2.0);

    {
        let snapshot = bp.borrow();
        let a = &snapshot.evaluated_expressions[0];
        assert_eq!(a.name.as_deref(), Some("A"));
        let entry = deref(&snapshot, a);
        assert_eq!(entry.members.len(), 1);
        let status = entry.status.as_ref().expect("truncation status");
        assert!(!status.is_error);
        assert!(status.description.format.starts_with("Only first"));
    }
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_hazardous_globals_and_getter() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 9);
    bp.borrow_mut().expressions = vec!["process.env".to_string(), "hasGetter".to_string()];
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_bar(&host, &root);

    {
        let snapshot = bp.borrow();

        // Every member of process.env is refused, never invoked
        let env = deref(&snapshot, &snapshot.evaluated_expressions[0]);
        assert!(!env.members.is_empty());
        for member in &env.members {
            let resolved = deref(&snapshot, member);
            let status = resolved.status.as_ref().expect("env members carry errors");
            assert!(status.is_error);
            assert!(resolved.value.is_none());
        }

        // hasGetter: data property captured, getter refused
        let has_getter = deref(&snapshot, &snapshot.evaluated_expressions[1]);
        assert_eq!(has_getter.members.len(), 2);
        let a = has_getter
            .members
            .iter()
            .find(|m| m.name.as_deref() == Some("a"))
            .unwrap();
        assert_eq!(deref(&snapshot, a).value.as_deref(), Some("5"));
        let b = has_getter
            .members
            .iter()
            .find(|m| m.name.as_deref() == Some("b"))
            .unwrap();
        assert!(deref(&snapshot, b).status.as_ref().unwrap().is_error);
        assert_table_indexes(&snapshot);
    }
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_string_rendering_truncated() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_with_config(
        inventory,
        config_with(CaptureConfig {
            max_string_length: 3,
            ..CaptureConfig::default()
        }),
    );
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().expressions = vec!["\"hello world\"".to_string()];
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 2.0);

    assert_eq!(
        bp.borrow().evaluated_expressions[0].value.as_deref(),
        Some("hel...")
    );
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_frames_beyond_expand_cap_are_collapsed() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_with_config(
        inventory,
        config_with(CaptureConfig {
            max_expand_frames: 1,
            ..CaptureConfig::default()
        }),
    );
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 2.0);

    {
        let snapshot = bp.borrow();
        assert_eq!(snapshot.stack_frames.len(), 2);
        // Top frame expanded
        assert!(snapshot.stack_frames[0].arguments[0].value.is_some());
        // Outer frame deferred to a shared error entry
        let outer = &snapshot.stack_frames[1];
        assert_eq!(outer.function, "<anonymous>");
        let deferred = deref(&snapshot, &outer.locals[0]);
        assert!(deferred.status.as_ref().unwrap().is_error);
        assert_table_indexes(&snapshot);
    }
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_shared_value_interned_once_across_scopes() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 5);
    bp.borrow_mut().expressions = vec!["A".to_string()];
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 2.0);

    {
        let snapshot = bp.borrow();
        let local_a = snapshot.stack_frames[0]
            .locals
            .iter()
            .find(|v| v.name.as_deref() == Some("A"))
            .unwrap();
        let expr_a = &snapshot.evaluated_expressions[0];
        assert_eq!(
            local_a.var_table_index, expr_a.var_table_index,
            "the same array shares one table entry"
        );
    }
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_logpoint_expands_and_skips_capture() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    {
        let mut b = bp.borrow_mut();
        b.action = Action::Log;
        b.log_message_format = Some("n was $0".to_string());
        b.expressions = vec!["n".to_string()];
    }
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |result| assert!(result.is_ok()));
    call_foo(&host, &root, 7.0);

    {
        let snapshot = bp.borrow();
        assert_eq!(snapshot.log_message.as_deref(), Some("n was 7"));
        assert!(snapshot.stack_frames.is_empty());
        assert!(snapshot.variable_table.is_empty());
    }

    // One-shot: a second pass does not re-expand
    call_foo(&host, &root, 8.0);
    assert_eq!(bp.borrow().log_message.as_deref(), Some("n was 7"));

    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_clear_inside_wait_callback() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));

    let agent_handle = agent.clone();
    let bp_handle = bp.clone();
    agent.wait(&bp, move |result| {
        assert!(result.is_ok());
        agent_handle.clear(&bp_handle);
    });
    call_foo(&host, &root, 2.0);
    assert_clean(&host, &agent);
}

#[test]
#[should_panic(expected = "user callback exploded")]
fn test_waiter_panic_propagates() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.wait(&bp, |_| panic!("user callback exploded"));
    call_foo(&host, &root, 2.0);
}
