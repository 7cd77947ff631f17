//! Property tests: random sequences of pool operations against a simple model.

mod common;

use cistern_pool::{Lease, PoolConfig};
use common::{pool, TestManager};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Acquire,
    Close(usize),
    Drop(usize),
    Poison(usize),
    Empty,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Acquire),
        2 => any::<usize>().prop_map(Op::Close),
        2 => any::<usize>().prop_map(Op::Drop),
        1 => any::<usize>().prop_map(Op::Poison),
        1 => Just(Op::Empty),
    ]
}

/// A lease plus whether the pool should still be tracking it.
struct Held {
    lease: Lease<TestManager>,
    tracked: bool,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pool_bookkeeping_matches_model(
        capacity in 1usize..4,
        overflow in 0usize..3,
        ops in prop::collection::vec(op_strategy(), 1..60),
    ) {
        let (pool, tracker) = pool(PoolConfig::new(capacity).overflow(overflow));
        let max_size = capacity + overflow;
        let mut held: Vec<Held> = Vec::new();

        for op in ops {
            match op {
                Op::Acquire => {
                    let before = pool.status();
                    let can_serve = before.idle > 0 || before.live < max_size;
                    match pool.try_acquire() {
                        Ok(lease) => {
                            prop_assert!(can_serve);
                            prop_assert!(held.iter().all(|h| h.lease.serial != lease.serial));
                            prop_assert!(lease.session.is_empty());
                            held.push(Held { lease, tracked: true });
                        }
                        Err(err) => {
                            prop_assert!(!can_serve, "unexpected failure: {}", err);
                            prop_assert!(err.is_retryable());
                            prop_assert_eq!(pool.status(), before);
                        }
                    }
                }
                Op::Close(i) if !held.is_empty() => {
                    let mut h = held.remove(i % held.len());
                    h.lease.session.insert("dirty".into(), "yes".into());
                    let result = h.lease.close();
                    prop_assert_eq!(result.is_ok(), h.tracked);
                }
                Op::Drop(i) if !held.is_empty() => {
                    drop(held.remove(i % held.len()));
                }
                Op::Poison(i) if !held.is_empty() => {
                    let len = held.len();
                    held[i % len].lease.healthy = false;
                }
                Op::Empty => {
                    let idle = pool.status().idle;
                    prop_assert_eq!(pool.empty_pool(), idle);
                    for h in held.iter_mut() {
                        h.tracked = false;
                    }
                }
                _ => {}
            }

            let status = pool.status();
            let tracked = held.iter().filter(|h| h.tracked).count();
            let forgotten = held.len() - tracked;

            prop_assert!(status.live <= max_size);
            prop_assert!(status.idle <= capacity);
            prop_assert_eq!(status.pending, 0);
            prop_assert_eq!(status.leased, tracked);
            prop_assert_eq!(status.live, status.idle + status.leased);
            prop_assert_eq!(tracker.open(), status.live + forgotten);
            for h in held.iter() {
                prop_assert_eq!(h.lease.is_live(), h.tracked);
            }
        }

        drop(held);
        pool.empty_pool();
        prop_assert_eq!(tracker.open(), 0);
        prop_assert_eq!(tracker.created(), tracker.closed());
    }
}
