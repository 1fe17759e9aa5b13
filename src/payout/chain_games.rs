//! Chain-games lottery settlement: one winner drawn from the previous
//! block's stake hash, 80% of the pot to the winner, 2% to the operator.

use tracing::{debug, warn};

use crate::codec::SerCtx;
use crate::constants::{PayoutKind, COIN};
use crate::error::Result;
use crate::params::ChainParams;
use crate::state::bet::BetKey;
use crate::state::chain_games::{
    ChainGamesBetRecord, ChainGamesEventRecord, ChainGamesResultRecord,
};
use crate::state::payout_info::PayoutInfoRecord;
use crate::store::BettingStore;
use crate::types::{script_for_destination, Amount, BetOut, BlockRef};

pub(super) fn settle(
    store: &mut BettingStore,
    prev: &BlockRef,
    params: &ChainParams,
    outs: &mut Vec<BetOut>,
    infos: &mut Vec<PayoutInfoRecord>,
) -> Result<()> {
    let ctx: SerCtx = params.ser_ctx();
    let new_height = prev.height + 1;
    let last_height = prev.height;

    let results: Vec<ChainGamesResultRecord> = store
        .cg_results
        .scan_all::<u32, ChainGamesResultRecord>(&ctx)?
        .into_iter()
        .map(|(_, r)| r)
        .filter(|r| r.posted_height == last_height)
        .collect();

    let mut updates: Vec<(BetKey, ChainGamesBetRecord)> = Vec::new();
    for result in results {
        let Some(event) =
            store.cg_events.read::<_, ChainGamesEventRecord>(&ctx, &result.event_id)?
        else {
            warn!(target: "betting", event = result.event_id, "chain-games result without event");
            continue;
        };
        let entry_fee = event.entry_fee as Amount * COIN;

        let start = params.bet_search_start(last_height);
        let mut candidates: Vec<(BetKey, ChainGamesBetRecord)> = store
            .cg_bets
            .scan_from::<BetKey, _, ChainGamesBetRecord>(&ctx, &BetKey::range_start(start))?
            .into_iter()
            .filter(|(_, bet)| {
                !bet.completed && bet.event_id == result.event_id && bet.amount == entry_fee
            })
            .collect();

        debug!(
            target: "betting",
            event = result.event_id,
            entrants = candidates.len(),
            "drawing chain-games lottery"
        );

        if candidates.len() == 1 {
            // a one-ticket lottery refunds its entrant
            let (key, bet) = &mut candidates[0];
            if entry_fee > 0 {
                infos.push(PayoutInfoRecord::new(*key, PayoutKind::ChainGamesRefund));
                outs.push(BetOut::with_event(
                    entry_fee,
                    script_for_destination(&bet.player),
                    entry_fee,
                    result.event_id,
                ));
            }
            bet.complete(entry_fee, new_height);
            updates.push((*key, bet.clone()));
        } else if candidates.len() >= 2 {
            let seed = prev.draw_seed();
            let winner_index = seed.mod_index(candidates.len() as u64) as usize;
            let pot = if seed.is_zero() { 0 } else { candidates.len() as Amount * entry_fee };
            let winner_payout = pot / 10 * 8;
            let operator_fee = pot / 50;

            debug!(
                target: "betting",
                event = result.event_id,
                winner = winner_index,
                pot,
                winner_payout,
                "lottery drawn"
            );

            if winner_payout > 0 {
                let Some((_, operator_script)) = params.fee_payout_scripts(new_height) else {
                    warn!(target: "betting", height = new_height, "no fee scripts, skipping lottery");
                    continue;
                };
                let (winner_key, winner_bet) = &candidates[winner_index];
                infos.push(PayoutInfoRecord::new(*winner_key, PayoutKind::ChainGamesPayout));
                outs.push(BetOut::with_event(
                    winner_payout,
                    script_for_destination(&winner_bet.player),
                    entry_fee,
                    result.event_id,
                ));
                if operator_fee > 0 {
                    infos.push(PayoutInfoRecord::reward(new_height, PayoutKind::ChainGamesReward));
                    outs.push(BetOut::new(operator_fee, operator_script, 0));
                }
            }
            for (i, (key, bet)) in candidates.iter_mut().enumerate() {
                let payout = if i == winner_index { winner_payout } else { 0 };
                bet.complete(payout, new_height);
                updates.push((*key, bet.clone()));
            }
        }
    }
    for (key, bet) in updates {
        store.cg_bets.update(&ctx, &key, &bet);
    }
    Ok(())
}
