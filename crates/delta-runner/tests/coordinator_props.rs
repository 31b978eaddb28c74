use delta_diff::{GraphSyncData, Subtree, SubtreeId};
use delta_runner::{DeltaCoordinator, RunnerOptions, SessionState};
use delta_vm::MirrorData;
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Edit {
    Upsert(u8, i64),
    Delete(u8),
    Empty,
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..5u8, -100..100i64).prop_map(|(k, v)| Edit::Upsert(k, v)),
        1 => (0..5u8).prop_map(Edit::Delete),
        1 => Just(Edit::Empty),
    ]
}

fn id(k: u8) -> SubtreeId {
    SubtreeId::from_u128(u128::from(k) + 1)
}

fn statement(k: u8, value: i64) -> Subtree {
    Subtree::parse(id(k), &format!("v{k} = {value};")).unwrap()
}

proptest! {
    #[test]
    fn prop_slots_grow_and_values_follow_edits(edits in proptest::collection::vec(edit(), 1..25)) {
        let mut coordinator = DeltaCoordinator::with_reference_collaborators(RunnerOptions::default());
        let mut live: BTreeMap<u8, i64> = BTreeMap::new();
        let mut slots = 0;

        for edit in edits {
            let batch = match edit {
                Edit::Upsert(k, v) => {
                    let builder = if live.contains_key(&k) {
                        GraphSyncData::builder().modify(statement(k, v))
                    } else {
                        GraphSyncData::builder().add(statement(k, v))
                    };
                    live.insert(k, v);
                    builder.build()
                }
                Edit::Delete(k) => {
                    if live.remove(&k).is_none() {
                        continue;
                    }
                    GraphSyncData::builder().delete(id(k)).build()
                }
                Edit::Empty => GraphSyncData::default(),
            };
            coordinator.update_graph(&batch).unwrap();

            prop_assert!(coordinator.global_count() >= slots);
            slots = coordinator.global_count();
            prop_assert_eq!(coordinator.state(), SessionState::Idle);

            for k in 0..5u8 {
                let by_subtree = coordinator.query(&id(k).into());
                match live.get(&k) {
                    Some(v) => prop_assert_eq!(by_subtree, Some(MirrorData::Int(*v))),
                    None => prop_assert_eq!(by_subtree, None),
                }
            }
        }
        prop_assert!(slots <= 5);
    }

    #[test]
    fn prop_empty_batches_are_idempotent(values in proptest::collection::vec(-50..50i64, 1..6), repeats in 1..4usize) {
        let mut coordinator = DeltaCoordinator::with_reference_collaborators(RunnerOptions::default());
        let batch = values
            .iter()
            .enumerate()
            .fold(GraphSyncData::builder(), |b, (k, v)| b.add(statement(k as u8, *v)))
            .build();
        coordinator.update_graph(&batch).unwrap();
        let globals = coordinator.globals();

        for _ in 0..repeats {
            let report = coordinator.update_graph(&GraphSyncData::default()).unwrap();
            prop_assert!(report.modified_symbols.is_empty());
            prop_assert_eq!(coordinator.globals(), globals.clone());
        }
    }
}
