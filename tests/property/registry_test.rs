// tests/property/registry_test.rs

//! Property-based tests for connection id allocation.

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use zcli::core::state::{Connection, ConnectionRegistry};

#[derive(Debug, Clone)]
enum Op {
    Register,
    Deregister(usize),
    Kill(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Register),
        1 => any::<usize>().prop_map(Op::Deregister),
        1 => any::<usize>().prop_map(Op::Kill),
    ]
}

fn smallest_free(live: &BTreeMap<u32, Arc<Connection>>) -> u32 {
    (0..).find(|id| !live.contains_key(id)).unwrap_or_default()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_new_connections_take_the_smallest_free_id(
        ops in prop::collection::vec(op(), 1..120)
    ) {
        let registry = ConnectionRegistry::new();
        let mut live: BTreeMap<u32, Arc<Connection>> = BTreeMap::new();
        let mut receivers = Vec::new();

        for op in ops {
            match op {
                Op::Register => {
                    let expected = smallest_free(&live);
                    let (conn, rx) = registry.register("127.0.0.1:1");
                    prop_assert_eq!(conn.id, expected);
                    live.insert(conn.id, conn);
                    receivers.push(rx);
                }
                Op::Deregister(pick) if !live.is_empty() => {
                    let id = *live.keys().nth(pick % live.len()).unwrap();
                    let conn = live.remove(&id).unwrap();
                    prop_assert!(registry.deregister(&conn));
                    // A second removal is a no-op.
                    prop_assert!(!registry.deregister(&conn));
                }
                Op::Kill(pick) if !live.is_empty() => {
                    let id = *live.keys().nth(pick % live.len()).unwrap();
                    live.remove(&id);
                    prop_assert!(registry.kill(id).is_some());
                    prop_assert!(registry.kill(id).is_none());
                }
                _ => {}
            }
            prop_assert_eq!(registry.len(), live.len());
        }

        let mut listed: Vec<u32> = registry.list().iter().map(|c| c.id).collect();
        listed.sort_unstable();
        prop_assert_eq!(listed, live.keys().copied().collect::<Vec<_>>());
    }
}
