//! Quick-games settlement: every wager from the previous block resolves
//! against that block's stake hash through its game handler.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::constants::{BetResult, PayoutKind, ODDS_DIVISOR};
use crate::error::Result;
use crate::params::ChainParams;
use crate::state::bet::BetKey;
use crate::state::payout_info::PayoutInfoRecord;
use crate::state::quick_games::QuickGamesBetRecord;
use crate::store::BettingStore;
use crate::types::{script_for_destination, Amount, BetOut, BlockRef, Script};

const D: i128 = ODDS_DIVISOR as i128;

pub(super) fn settle(
    store: &mut BettingStore,
    prev: &BlockRef,
    params: &ChainParams,
    outs: &mut Vec<BetOut>,
    infos: &mut Vec<PayoutInfoRecord>,
) -> Result<()> {
    let last_height = prev.height;
    if last_height >= params.quick_games_end_height {
        return Ok(());
    }
    let ctx = params.ser_ctx();
    let new_height = prev.height + 1;
    let seed = prev.draw_seed();

    let entries: Vec<(BetKey, QuickGamesBetRecord)> = store
        .qg_bets
        .scan_from(&ctx, &BetKey::range_start(last_height))?
        .into_iter()
        .take_while(|(key, _): &(BetKey, QuickGamesBetRecord)| key.height == last_height)
        .collect();

    // rewards accumulate per destination and emit in script order
    let mut rewards: BTreeMap<Script, Amount> = BTreeMap::new();
    let mut updates: Vec<(BetKey, QuickGamesBetRecord)> = Vec::new();

    for (key, mut bet) in entries {
        if bet.completed {
            continue;
        }
        let Some(game) = params.quick_game(bet.game) else {
            continue;
        };

        let odds = (game.handler)(&bet.bet_info, &seed) as i128;
        let winnings_scaled = bet.amount as i128 * odds;
        let fee_scaled = if winnings_scaled > 0 && odds > D {
            bet.amount as i128 * (odds - D) / 1000 * game.fee_permille as i128
        } else {
            0
        };
        let payout = ((winnings_scaled - fee_scaled) / D).max(0) as Amount;

        if payout > 0 {
            let Some((_, operator_script)) = params.fee_payout_scripts(new_height) else {
                warn!(target: "betting", height = new_height, "no fee scripts, skipping quick game");
                continue;
            };
            let kind = if odds == D {
                (BetResult::Refund, PayoutKind::QuickGamesRefund)
            } else {
                (BetResult::Win, PayoutKind::QuickGamesPayout)
            };
            infos.push(PayoutInfoRecord::new(key, kind.1));
            outs.push(BetOut::new(payout, script_for_destination(&bet.player), bet.amount));
            bet.result = kind.0;

            let fee = (fee_scaled / D) as Amount;
            let dev_cut = fee * game.dev_reward_permille / 1000;
            let operator_cut = fee * game.operator_reward_permille / 1000;
            if dev_cut > 0 {
                *rewards.entry(game.dev_script.clone()).or_default() += dev_cut;
            }
            if operator_cut > 0 {
                *rewards.entry(operator_script).or_default() += operator_cut;
            }
        } else {
            bet.result = BetResult::Lose;
        }
        debug!(
            target: "betting",
            game = game.name,
            bet = %key.out,
            payout,
            "quick game settled"
        );
        bet.completed = true;
        bet.payout = payout;
        updates.push((key, bet));
    }

    for (script, reward) in rewards {
        if reward > 0 {
            infos.push(PayoutInfoRecord::reward(new_height, PayoutKind::QuickGamesReward));
            outs.push(BetOut::new(reward, script, 0));
        }
    }
    for (key, bet) in updates {
        store.qg_bets.update(&ctx, &key, &bet);
    }
    Ok(())
}
