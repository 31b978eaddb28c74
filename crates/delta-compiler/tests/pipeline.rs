use delta_compiler::{AssociativeCompiler, CompileState, CompiledImage, Compiler, GraphCompiler, SubtreeGraphCompiler};
use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use pretty_assertions::assert_eq;

struct Pipeline {
    graph: SubtreeGraphCompiler,
    state: CompileState,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            graph: SubtreeGraphCompiler::new(),
            state: CompileState::new(),
        }
    }

    fn apply(&mut self, batch: &GraphSyncData) -> CompiledImage {
        self.state.reset_for_new_delta();
        let fragment = self.graph.build_fragment(batch);
        let outcome = AssociativeCompiler::new().compile(&fragment, &self.state);
        assert!(outcome.succeeded, "{:?}", outcome.diagnostics);
        let image = outcome.compiled.unwrap();
        self.state = image.state.clone();
        self.graph.reset_for_next_execution();
        image
    }
}

fn subtree(id: u128, code: &str) -> Subtree {
    Subtree::parse(SubtreeId::from_u128(id), code).unwrap()
}

#[test]
fn test_modify_replaces_owned_statements() {
    let mut pipeline = Pipeline::new();
    let first = pipeline.apply(&GraphSyncData::builder().add(subtree(1, "a = 1;\nb = a;")).build());
    assert_eq!(first.global_count, 2);

    let second = pipeline.apply(&GraphSyncData::builder().modify(subtree(1, "a = 2;")).build());
    let graph = second.executable.dependency_graph().unwrap();
    let owned: Vec<_> = graph
        .nodes_owned_by(SubtreeId::from_u128(1))
        .filter(|node| node.is_active)
        .collect();
    assert_eq!(owned.len(), 1);
    // `b` is no longer bound by anything and is reset
    assert_eq!(second.global_count, 2);
    assert_eq!(pipeline.graph.subtree_variable(SubtreeId::from_u128(1)), Some("a".to_string()));
    assert_eq!(pipeline.graph.node_for_variable("b"), None);
}

#[test]
fn test_delete_then_re_add_reuses_slots() {
    let mut pipeline = Pipeline::new();
    pipeline.apply(&GraphSyncData::builder().add(subtree(1, "x = 5;")).build());
    pipeline.apply(&GraphSyncData::builder().delete(SubtreeId::from_u128(1)).build());
    let image = pipeline.apply(&GraphSyncData::builder().add(subtree(2, "x = 6;")).build());
    assert_eq!(image.global_count, 1);
    assert_eq!(
        pipeline.graph.node_for_variable("x").map(|(subtree, _)| subtree),
        Some(SubtreeId::from_u128(2))
    );
}

#[test]
fn test_re_added_subtree_keeps_one_active_statement() {
    let mut pipeline = Pipeline::new();
    pipeline.apply(&GraphSyncData::builder().add(subtree(1, "a = 1;")).build());
    let image = pipeline.apply(&GraphSyncData::builder().add(subtree(1, "a = 5;")).build());

    let graph = image.executable.dependency_graph().unwrap();
    let active = graph
        .nodes_owned_by(SubtreeId::from_u128(1))
        .filter(|node| node.is_active)
        .count();
    assert_eq!(active, 1);
    assert_eq!(image.global_count, 1);
}

#[test]
fn test_function_can_be_redefined_after_delete() {
    let mut pipeline = Pipeline::new();
    pipeline.apply(&GraphSyncData::builder().add(subtree(1, "def f(x) = x + 1;")).build());
    pipeline.apply(&GraphSyncData::builder().delete(SubtreeId::from_u128(1)).build());
    let image = pipeline.apply(&GraphSyncData::builder().add(subtree(2, "def f(x) = x + 10;")).build());
    assert_eq!(image.global_count, 0);
}

#[test]
fn test_nodes_to_code_round_trips_through_parser() {
    let graph = SubtreeGraphCompiler::new();
    let subtrees = [subtree(1, "def twice(n) = n * 2;"), subtree(2, "y = twice(4);")];
    let code = graph.nodes_to_code(&subtrees);
    assert_eq!(delta_lang::parse_program(&code).unwrap().len(), 2);
}

proptest::proptest! {
    #[test]
    fn prop_one_slot_per_distinct_name(names in proptest::collection::vec(0..6u8, 1..20)) {
        let mut pipeline = Pipeline::new();
        let mut builder = GraphSyncData::builder();
        for (i, name) in names.iter().enumerate() {
            builder = builder.add(subtree(i as u128 + 1, &format!("v{name} = {i};")));
        }
        let image = pipeline.apply(&builder.build());

        let distinct: std::collections::BTreeSet<_> = names.iter().collect();
        proptest::prop_assert_eq!(image.global_count, distinct.len());
    }
}
