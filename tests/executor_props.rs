// tests/executor_props.rs

mod common;

use std::time::{Duration, Instant};

use proptest::prelude::*;
use racestart::engine::{Command, Executor, ExecutorOptions};
use racestart::procedure::template::{ABANDON, GENERAL_RECALL, INDIVIDUAL_RECALL, POSTPONE};
use racestart::types::{PrepFlag, RaceStatus};

#[derive(Debug, Clone)]
enum Op {
    Wait(u64),
    Apply(Command),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let special = prop_oneof![
        Just(POSTPONE),
        Just(GENERAL_RECALL),
        Just(INDIVIDUAL_RECALL),
        Just(ABANDON),
    ];
    prop_oneof![
        4 => (0u64..200).prop_map(Op::Wait),
        2 => prop_oneof![Just(PrepFlag::P), Just(PrepFlag::I), Just(PrepFlag::Black)].prop_map(
            |flag| Op::Apply(Command::Start {
                duration_minutes: None,
                prep_flag: Some(flag),
            })
        ),
        1 => special.prop_map(|id| Op::Apply(Command::TriggerSpecial {
            node_id: id.to_string(),
        })),
        1 => Just(Op::Apply(Command::Resume)),
        1 => Just(Op::Apply(Command::Reset)),
        1 => Just(Op::Apply(Command::Finish)),
        1 => any::<bool>().prop_map(|enabled| Op::Apply(Command::SetAutoRestart { enabled })),
        1 => (1u32..4, -90i64..120).prop_map(|(node, delta)| {
            Op::Apply(Command::MutateFutureDuration {
                node_id: node.to_string(),
                delta_seconds: delta,
            })
        }),
    ]
}

proptest! {
    #[test]
    fn flags_are_down_whenever_racing(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut now = Instant::now();
        let mut exec = Executor::standard(ExecutorOptions {
            restart_gap: Duration::from_secs(30),
            ..ExecutorOptions::default()
        });

        for op in ops {
            match op {
                Op::Wait(secs) => {
                    now += Duration::from_secs(secs);
                    exec.tick(now);
                }
                Op::Apply(command) => {
                    let before = exec.snapshot(now);
                    if exec.apply(command, now).is_err() {
                        prop_assert_eq!(exec.snapshot(now), before);
                    }
                }
            }

            let snap = exec.snapshot(now);
            if snap.status == RaceStatus::Racing {
                prop_assert!(snap.active_flags.is_empty(), "flags up while racing: {:?}", snap);
            }
            if !exec.needs_ticks() {
                prop_assert_eq!(snap.remaining_seconds.unwrap_or(0), 0);
            }
        }
    }
}
