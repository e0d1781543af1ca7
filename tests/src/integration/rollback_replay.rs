//! Rolling back to any height and replaying the removed blocks in order
//! lands on the same tip hash and rollbacks hash.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_rollback_then_replay_reproduces_tip(
            amounts in prop::collection::vec(1u32..10_000, 2..8),
            pick in any::<prop::sample::Index>(),
        ) {
            let ctx = genesis_node();
            let mut blocks = Vec::new();
            for (i, amount) in amounts.iter().enumerate() {
                let id = i as i64 + 1;
                blocks.push(extend(&ctx, &[transfer(slot_time(id) - 1, 10 + id % 3, *amount)]));
            }
            let before = ctx.db.read(|t| t.info_block().cloned()).unwrap();
            let tip = before.block_id;

            // blocks[k] holds block k + 2
            let target = 1 + pick.index(tip as usize - 1) as i64;
            let removed = ctx.rollback.to_block_id(target).unwrap();
            prop_assert_eq!(removed as i64, tip - target);
            prop_assert_eq!(ctx.tip_id(), target);

            for block in &blocks[(target - 1) as usize..] {
                ctx.engine.insert_block_wo_forks(block, false, false).unwrap();
            }
            let after = ctx.db.read(|t| t.info_block().cloned()).unwrap();
            prop_assert_eq!(after.block_id, before.block_id);
            prop_assert_eq!(after.hash, before.hash);
            prop_assert_eq!(after.rollbacks_hash, before.rollbacks_hash);
            prop_assert_eq!(ctx.db.read(|t| t.pending_count()), 0);
        }
    }
}
