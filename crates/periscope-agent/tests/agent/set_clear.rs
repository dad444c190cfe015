//! Set/clear lifecycle, counters, and set-time error statuses.

use super::*;
use periscope_agent::messages;
use std::cell::Cell;

#[test]
fn test_set_then_clear_restores_cleanness() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);

    let ok = Rc::new(Cell::new(false));
    let flag = ok.clone();
    agent.set(&bp, move |result| {
        assert!(result.is_ok());
        flag.set(true);
    });
    assert!(ok.get(), "set completion callback must run");
    assert_eq!(agent.num_breakpoints(), 1);
    assert!(host.has_break_at(&root.join("a/foo.js"), 4));
    assert_eq!(host.listener_count(), 1);

    agent.clear(&bp);
    assert!(!host.has_break_at(&root.join("a/foo.js"), 4));
    assert_clean(&host, &agent);
}

#[test]
fn test_zero_id_is_valid() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(0, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    assert_eq!(agent.num_breakpoints(), 1);
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_clear_is_idempotent() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    agent.clear(&bp);
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_two_breakpoints_report_counts() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let first = bp_at(1, "foo.js", 4);
    let second = bp_at(2, "foo.js", 5);
    agent.set(&first, |result| assert!(result.is_ok()));
    agent.set(&second, |result| assert!(result.is_ok()));
    assert_eq!(agent.num_breakpoints(), 2);

    agent.clear(&first);
    assert_eq!(agent.num_breakpoints(), 1);
    agent.clear(&second);
    assert_eq!(agent.num_breakpoints(), 0);
    assert_clean(&host, &agent);
}

#[test]
fn test_ambiguous_path_fails_with_catalog_status() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "hello.js", 1);

    let failed = Rc::new(Cell::new(false));
    let flag = failed.clone();
    agent.set(&bp, move |result| {
        assert!(result.is_err());
        flag.set(true);
    });
    assert!(failed.get());

    let status = bp.borrow().status.clone().expect("status must be populated");
    assert!(status.is_error);
    assert_eq!(status.description.format, messages::SOURCE_FILE_AMBIGUOUS);
    assert_clean(&host, &agent);
}

#[test]
fn test_invalid_line_names_position() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 500);
    agent.set(&bp, |result| assert!(result.is_err()));

    let status = bp.borrow().status.clone().unwrap();
    assert!(status.is_error);
    assert!(status.description.format.contains(messages::INVALID_LINE_NUMBER));
    assert!(status.description.format.contains("foo.js:500"));
    assert_clean(&host, &agent);
}

#[test]
fn test_path_not_found() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "missing.js", 1);
    agent.set(&bp, |result| assert!(result.is_err()));
    assert!(bp.borrow().status.as_ref().unwrap().is_error);
    assert_clean(&host, &agent);
}

#[test]
fn test_unsupported_extension() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.rb", 1);
    agent.set(&bp, |result| assert!(result.is_err()));
    let status = bp.borrow().status.clone().unwrap();
    assert_eq!(status.description.format, messages::UNSUPPORTED_EXTENSION);
    assert_clean(&host, &agent);
}

#[test]
fn test_duplicate_id_rejected() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let first = bp_at(1, "foo.js", 4);
    let second = bp_at(1, "foo.js", 5);
    agent.set(&first, |result| assert!(result.is_ok()));
    agent.set(&second, |result| assert!(result.is_err()));
    assert_eq!(agent.num_breakpoints(), 1);
    agent.clear(&first);
    assert_clean(&host, &agent);
}

#[test]
fn test_line_zero_is_invalid() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 0);
    agent.set(&bp, |result| assert!(result.is_err()));
    assert_clean(&host, &agent);
}

#[test]
fn test_line_one_is_honored() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 1);
    agent.set(&bp, |result| assert!(result.is_ok()));
    assert!(host.has_break_at(&root.join("a/foo.js"), 1));
    agent.clear(&bp);
    assert_clean(&host, &agent);
}

#[test]
fn test_clear_before_hit_drops_waiter_unfired() {
    let (_dir, root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let bp = bp_at(1, "foo.js", 4);
    bp.borrow_mut().condition = Some("n===447".to_string());
    agent.set(&bp, |result| assert!(result.is_ok()));

    let fired = Rc::new(Cell::new(false));
    let flag = fired.clone();
    agent.wait(&bp, move |_| flag.set(true));
    assert_eq!(agent.num_listeners(), 1);

    call_foo(&host, &root, 6.0);
    assert!(!fired.get(), "condition never held, waiter must not fire");

    agent.clear(&bp);
    call_foo(&host, &root, 447.0);
    assert!(!fired.get(), "cleared waiter must never fire");
    assert_clean(&host, &agent);
}

#[test]
fn test_user_listeners_left_untouched() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let user_hits = Rc::new(Cell::new(0u32));
    let hits = user_hits.clone();
    host.add_listener(Rc::new(move |_event| hits.set(hits.get() + 1)));
    assert_eq!(host.listener_count(), 1);

    let bp = bp_at(1, "foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    assert_eq!(host.listener_count(), 2);
    agent.clear(&bp);

    // The agent detached only its own listener
    assert_eq!(host.listener_count(), 1);
    assert_eq!(agent.num_breakpoints(), 0);
}

#[test]
fn test_resolved_path_rewritten() {
    let (_dir, root, inventory) = fixture_workspace();
    let (_host, agent) = agent_over(inventory);
    let bp = bp_at(1, "./a/../a/foo.js", 4);
    agent.set(&bp, |result| assert!(result.is_ok()));
    assert_eq!(
        bp.borrow().location.path,
        root.join("a/foo.js").display().to_string()
    );
    agent.clear(&bp);
}

#[test]
fn test_completions_tolerated_out_of_order() {
    let (_dir, _root, inventory) = fixture_workspace();
    let (host, agent) = agent_over(inventory);
    let order = Rc::new(RefCell::new(Vec::new()));

    let first = bp_at(1, "foo.js", 4);
    let second = bp_at(2, "foo.js", 5);
    let log = order.clone();
    agent.set(&second, move |_| log.borrow_mut().push(2));
    let log = order.clone();
    agent.set(&first, move |_| log.borrow_mut().push(1));

    assert_eq!(*order.borrow(), vec![2, 1]);
    agent.clear(&first);
    agent.clear(&second);
    assert_clean(&host, &agent);
}
