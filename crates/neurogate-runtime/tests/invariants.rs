use neurogate_runtime::{
    ArenaConfig, NeuronId, PlasticityMode, PlasticityRule, StdpRule, Synapse, SynapseId,
    SynapseType, TrackedArena,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum ArenaOp {
    Allocate(usize),
    Resize(usize, usize),
    Release(usize),
}

fn arena_op() -> impl Strategy<Value = ArenaOp> {
    prop_oneof![
        (1usize..512).prop_map(ArenaOp::Allocate),
        (any::<usize>(), 0usize..512).prop_map(|(i, size)| ArenaOp::Resize(i, size)),
        any::<usize>().prop_map(ArenaOp::Release),
    ]
}

proptest! {
    #[test]
    fn arena_accounting_matches_live_blocks(ops in prop::collection::vec(arena_op(), 1..64)) {
        let mut arena = TrackedArena::new(ArenaConfig::default()).unwrap();
        let mut live = Vec::new();

        for op in ops {
            match op {
                ArenaOp::Allocate(size) => {
                    live.push((arena.allocate(size).unwrap(), size));
                }
                ArenaOp::Resize(i, size) if !live.is_empty() => {
                    let index = i % live.len();
                    let (handle, _) = live[index];
                    match arena.reallocate(Some(handle), size).unwrap() {
                        Some(same) => {
                            prop_assert_eq!(same, handle);
                            live[index].1 = size;
                        }
                        None => {
                            live.swap_remove(index);
                        }
                    }
                }
                ArenaOp::Release(i) if !live.is_empty() => {
                    let (handle, _) = live.swap_remove(i % live.len());
                    arena.release(handle).unwrap();
                    prop_assert!(arena.release(handle).is_err());
                }
                _ => {}
            }

            let expected: usize = live.iter().map(|(_, size)| size).sum();
            prop_assert_eq!(arena.used_bytes(), expected);
            prop_assert_eq!(arena.live_block_count(), live.len());
            prop_assert_eq!(arena.live_blocks().count(), live.len());
        }

        let report = arena.cleanup();
        prop_assert_eq!(report.blocks, live.len());
        prop_assert_eq!(arena.used_bytes(), 0);
        for (handle, _) in live {
            prop_assert!(!arena.contains(handle));
        }
    }

    #[test]
    fn stdp_never_leaves_bounds(
        timings in prop::collection::vec((-100.0f32..100.0, -100.0f32..100.0), 1..200),
        start in -1.0f32..=1.0,
    ) {
        let mut arena = TrackedArena::new(ArenaConfig::default()).unwrap();
        let mut synapse = Synapse::create(
            &mut arena,
            SynapseId::new(1),
            NeuronId::new(1),
            NeuronId::new(2),
            SynapseType::Excitatory,
        )
        .unwrap();
        synapse.plasticity = PlasticityMode::Stdp;
        synapse.set_weight(start);

        for (pre, post) in timings {
            synapse.update_weight(pre, post);
            let (min, max) = synapse.bounds();
            prop_assert!(synapse.weight() >= min && synapse.weight() <= max);
        }
    }

    #[test]
    fn stdp_sign_follows_spike_order(pre in -50.0f32..50.0, gap in 0.001f32..50.0) {
        let rule = StdpRule::default();
        prop_assert!(rule.weight_change(pre, pre + gap) > 0.0);
        prop_assert!(rule.weight_change(pre + gap, pre) < 0.0);
    }
}
