use delta_diff::GraphSyncData;
use delta_runner::{EventStatus, NodeRef, RunnerError, RunnerEvent, RunnerOptions};
use delta_test_utils::{added, deleted, id, int, interpreter_runner, modified, runner, runner_with, subtree};
use delta_vm::MirrorData;
use pretty_assertions::assert_eq;

#[test]
fn test_update_then_query() {
    let (runner, sink) = runner();
    let report = runner.update_graph(&added(&[(1, "a = 2;"), (2, "b = a * 3;")])).unwrap();
    assert_eq!(report.modified_symbols, vec!["a".to_string(), "b".to_string()]);

    assert_eq!(runner.query_node_value("b").unwrap(), int(6));
    assert_eq!(runner.query_node_value(id(2)).unwrap(), int(6));
    assert_eq!(runner.get_core_dump().unwrap(), "a = 2\nb = 6\n");

    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        &events[0],
        RunnerEvent::GraphUpdateReady { status: EventStatus::Ok, report: Some(_), .. }
    ));
    assert!(matches!(&events[1], RunnerEvent::NodeValueReady { node: NodeRef::Name(n), .. } if n == "b"));
}

#[test]
fn test_add_modify_delete() {
    let (runner, _sink) = runner();
    runner.update_graph(&added(&[(1, "a = 2;")])).unwrap();
    assert_eq!(runner.query_node_value("a").unwrap(), int(2));
    let slots = runner.global_count().unwrap();

    runner.update_graph(&modified(1, "a = 3;")).unwrap();
    assert_eq!(runner.query_node_value("a").unwrap(), int(3));
    assert_eq!(runner.global_count().unwrap(), slots);

    runner.update_graph(&deleted(1)).unwrap();
    assert_eq!(runner.query_node_value("a").unwrap(), Some(MirrorData::Null));
    assert_eq!(runner.query_node_value(id(1)).unwrap(), None);
    assert_eq!(runner.global_count().unwrap(), slots);
}

#[test]
fn test_modification_reaches_dependents() {
    let (runner, _sink) = runner();
    runner
        .update_graph(&added(&[(1, "a = 1;"), (2, "b = a + 1;"), (3, "c = 7;")]))
        .unwrap();

    let report = runner.update_graph(&modified(1, "a = 10;")).unwrap();
    assert_eq!(report.modified_symbols, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(report.modified_nodes[1].subtree, Some(id(2)));
    assert_eq!(runner.query_node_value("b").unwrap(), int(11));
    assert_eq!(runner.query_node_value("c").unwrap(), int(7));
}

#[test]
fn test_deleting_a_dependency_nulls_readers() {
    let (runner, _sink) = runner();
    runner.update_graph(&added(&[(1, "a = 4;"), (2, "b = a;")])).unwrap();
    runner.update_graph(&deleted(1)).unwrap();
    assert_eq!(runner.query_node_value("b").unwrap(), Some(MirrorData::Null));
}

#[test]
fn test_empty_batch_changes_nothing() {
    let (runner, sink) = runner();
    runner.update_graph(&added(&[(1, "a = 1;"), (2, "b = a;")])).unwrap();
    let before = runner.globals().unwrap();

    let report = runner.update_graph(&GraphSyncData::default()).unwrap();
    assert!(report.modified_symbols.is_empty());
    assert_eq!(report.executed, 0);
    assert_eq!(runner.globals().unwrap(), before);
    assert_eq!(sink.statuses(), vec![EventStatus::Ok, EventStatus::Ok]);
}

#[test]
fn test_compile_failure_is_isolated() {
    let (runner, sink) = runner();
    runner
        .update_graph(&added(&[(1, "a = 1;"), (2, "def f() = 1;")]))
        .unwrap();

    let err = runner
        .update_graph(&added(&[(3, "b = 2;"), (4, "f = 2;")]))
        .unwrap_err();
    assert!(matches!(err, RunnerError::Compile { .. }));
    assert_eq!(sink.statuses().last(), Some(&EventStatus::Error));
    assert_eq!(runner.query_node_value("a").unwrap(), int(1));
    assert_eq!(runner.query_node_value("b").unwrap(), None);

    runner.update_graph(&added(&[(3, "b = f() + a;")])).unwrap();
    assert_eq!(runner.query_node_value(id(3)).unwrap(), int(2));
}

#[test]
fn test_runtime_fault_keeps_session_usable() {
    let (runner, _sink) = runner_with(RunnerOptions::default().with_max_update_passes(4));
    runner.update_graph(&added(&[(1, "a = 1;\nb = a + 1;")])).unwrap();

    let err = runner.update_graph(&added(&[(2, "a = b + 1;")])).unwrap_err();
    assert!(matches!(err, RunnerError::Execute(_)));
    assert!(err.is_recoverable());
    assert_eq!(runner.query_node_value(id(2)).unwrap(), None);

    runner.update_graph(&added(&[(3, "c = 2;")])).unwrap();
    assert_eq!(runner.query_node_value("c").unwrap(), int(2));
}

#[test]
fn test_warnings_are_reported() {
    let (runner, sink) = runner();
    let report = runner.update_graph(&added(&[(1, "a = 1 / 0;")])).unwrap();
    assert!(!report.warnings.is_empty());
    assert_eq!(sink.statuses(), vec![EventStatus::Warning]);
}

#[test]
fn test_queued_work_runs_before_sync_calls() {
    let (runner, _sink) = runner();
    let first = runner.begin_update_graph(added(&[(1, "a = 1;")])).unwrap();
    let second = runner.begin_update_graph(modified(1, "a = 5;")).unwrap();

    assert_eq!(runner.query_node_value("a").unwrap(), int(5));
    assert_eq!(first.blocking_wait().unwrap().modified_symbols, vec!["a".to_string()]);
    assert_eq!(second.blocking_wait().unwrap().global_count, 1);
}

#[tokio::test]
async fn test_async_completions() {
    let (runner, sink) = runner();
    let report = runner
        .begin_update_graph(added(&[(1, "x = 3;"), (2, "y = x * x;")]))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(report.executed, 2);

    let completions = runner
        .begin_query_node_values(vec!["x".into(), id(2).into(), "missing".into()])
        .unwrap();
    let mut values = Vec::new();
    for completion in completions {
        values.push(completion.wait().await.unwrap());
    }
    assert_eq!(values, vec![int(3), int(9), None]);
    assert_eq!(
        sink.statuses(),
        vec![EventStatus::Ok, EventStatus::Ok, EventStatus::Ok, EventStatus::Warning]
    );
}

#[tokio::test]
async fn test_async_failure_reaches_completion() {
    let (runner, _sink) = interpreter_runner();
    let err = runner
        .begin_update_graph(added(&[(1, "a = 1;")]))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::ModeMismatch { interpreter_mode: true, .. }));
}

#[test]
fn test_interpreter_mode() {
    let (runner, _sink) = interpreter_runner();
    runner.update_code("x = 4;").unwrap();
    runner.update_code("y = x * x;").unwrap();
    assert_eq!(runner.query_node_value("y").unwrap(), int(16));

    let report = runner.update_code("x = 5;").unwrap();
    assert_eq!(report.modified_symbols, vec!["x".to_string(), "y".to_string()]);
    assert_eq!(runner.query_node_value("y").unwrap(), int(25));

    assert!(matches!(
        runner.update_graph(&added(&[(1, "z = 1;")])),
        Err(RunnerError::ModeMismatch { .. })
    ));
}

#[test]
fn test_switching_modes_through_options() {
    let (runner, _sink) = runner();
    assert!(runner.update_code("a = 1;").is_err());
    runner
        .set_options(RunnerOptions::default().with_interpreter_mode(true))
        .unwrap();
    assert!(runner.options().unwrap().interpreter_mode);
    runner.update_code("a = 1;").unwrap();
    assert_eq!(runner.query_node_value("a").unwrap(), int(1));
}

#[test]
fn test_reexecute_all() {
    let (runner, _sink) = runner();
    runner.update_graph(&added(&[(1, "a = 1;"), (2, "b = a;")])).unwrap();
    let report = runner.reexecute_all().unwrap();
    assert_eq!(report.executed, 2);
    assert!(report.modified_symbols.is_empty());
}

#[test]
fn test_property_change_notifier() {
    let (runner, sink) = runner();
    runner.update_graph(&added(&[(1, "a = 1;"), (2, "b = a + 1;")])).unwrap();
    sink.clear();

    let notifier = runner.property_change_notifier();
    let remote = notifier.clone();
    std::thread::spawn(move || remote.notify(id(1)).unwrap())
        .join()
        .unwrap();
    notifier.notify(id(99)).unwrap();
    runner.wait_until_idle().unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 2);
    match &events[0] {
        RunnerEvent::GraphUpdateReady { report: Some(report), .. } => assert_eq!(report.executed, 1),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(runner.worker_failures().is_empty());

    drop(runner);
    assert!(matches!(notifier.notify(id(1)), Err(RunnerError::WorkerStopped)));
}

#[test]
fn test_nodes_to_code() {
    let (runner, sink) = runner();
    assert!(runner.begin_convert_nodes_to_code(Vec::new()).unwrap().is_none());
    assert!(sink.is_empty());

    let subtrees = vec![subtree(1, "a = 1;"), subtree(2, "b = a + 1;\nc = b * 2;")];
    let code = runner
        .begin_convert_nodes_to_code(subtrees.clone())
        .unwrap()
        .unwrap()
        .blocking_wait()
        .unwrap();
    assert_eq!(code, "a = 1;\nb = a + 1;\nc = b * 2;");
    assert_eq!(runner.convert_nodes_to_code(&subtrees).unwrap(), code);
    assert!(matches!(
        &sink.events()[0],
        RunnerEvent::NodesToCodeCompleted { subtrees, .. } if subtrees.len() == 2
    ));
}

#[test]
fn test_functions_across_subtrees() {
    let (runner, _sink) = runner();
    runner
        .update_graph(&added(&[(1, "y = square(3);"), (2, "def square(n) = n * n;")]))
        .unwrap();
    assert_eq!(runner.query_node_value("y").unwrap(), int(9));

    runner.update_graph(&modified(2, "def square(n) = n * n * n;")).unwrap();
    assert_eq!(runner.query_node_value("y").unwrap(), int(27));
}

#[test]
fn test_deleted_function_can_be_defined_again() {
    let (runner, _sink) = runner();
    runner
        .update_graph(&added(&[(1, "def f(x) = x + 1;"), (2, "y = f(1);")]))
        .unwrap();
    assert_eq!(runner.query_node_value("y").unwrap(), int(2));

    runner.update_graph(&deleted(1)).unwrap();
    assert_eq!(runner.query_node_value("f").unwrap(), None);

    runner.update_graph(&added(&[(3, "def f(x) = x + 10;")])).unwrap();
    assert_eq!(runner.query_node_value("y").unwrap(), int(11));
    assert_eq!(runner.get_core_dump().unwrap(), "y = 11\n");
}

#[test]
fn test_re_added_subtree_replaces_its_statements() {
    let (runner, _sink) = runner();
    runner.update_graph(&added(&[(1, "a = 1;"), (2, "b = a + 1;")])).unwrap();

    runner.update_graph(&added(&[(1, "a = 5;")])).unwrap();
    assert_eq!(runner.query_node_value("b").unwrap(), int(6));
    assert_eq!(runner.query_node_value(id(1)).unwrap(), int(5));

    let report = runner.reexecute_all().unwrap();
    assert_eq!(report.executed, 2);
}
