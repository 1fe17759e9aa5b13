//! Per-block payout computation and block payout validation.
//!
//! `get_betting_payouts` is called once per block being built or
//! validated: it settles every bet resolved by the previous block's
//! results, marks those bets completed, records payout-info and returns
//! the ordered output vector the block must commit to. The output order
//! is consensus: peerless payouts, betting rewards, chain-games payouts
//! and rewards, quick-games payouts and rewards. Field bets keep their
//! own tables and liability accounting but never appear in this vector.

mod chain_games;
mod peerless;
mod quick_games;

use tracing::{debug, warn};

use crate::constants::{PayoutKind, ODDS_DIVISOR};
use crate::error::Result;
use crate::params::ChainParams;
use crate::state::payout_info::PayoutInfoRecord;
use crate::store::BettingStore;
use crate::types::{Amount, BetOut, BlockRef, TxOut};

/// Gross/effective accumulation over the peerless settlement pass; the
/// difference funds the v3 reward pool, settled v2 volume funds the
/// legacy pool.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SettleTotals {
    pub gross: i128,
    pub effective: i128,
    pub v2_volume: i128,
}

/// Compute the required payout outputs of the block at `prev.height + 1`.
pub fn get_betting_payouts(
    store: &mut BettingStore,
    prev: &BlockRef,
    params: &ChainParams,
) -> Result<(Vec<BetOut>, Vec<PayoutInfoRecord>)> {
    let new_height = prev.height + 1;
    let mut outs: Vec<BetOut> = Vec::new();
    let mut infos: Vec<PayoutInfoRecord> = Vec::new();

    debug!(target: "betting", height = new_height, "generating betting payouts");

    let totals = peerless::settle(store, new_height, params, &mut outs, &mut infos)?;
    let fee_pool = (totals.gross - totals.effective)
        + totals.v2_volume * params.house_edge_permille as i128 / 1000;
    emit_betting_rewards(new_height, fee_pool as Amount, params, &mut outs, &mut infos);

    chain_games::settle(store, prev, params, &mut outs, &mut infos)?;
    quick_games::settle(store, prev, params, &mut outs, &mut infos)?;

    let ctx = params.ser_ctx();
    for info in &infos {
        // duplicate reward keys at one height collapse onto one record
        store.payout_infos.write(&ctx, &info.bet_key, info);
    }

    debug!(target: "betting", height = new_height, outputs = outs.len(), "payouts generated");
    Ok((outs, infos))
}

/// 10% of the fee pool to the dev script, 40% to the operator script; the
/// remainder is burned by never being paid.
fn emit_betting_rewards(
    new_height: u32,
    fee_pool: Amount,
    params: &ChainParams,
    outs: &mut Vec<BetOut>,
    infos: &mut Vec<PayoutInfoRecord>,
) {
    if fee_pool <= 0 {
        return;
    }
    let Some((dev_script, operator_script)) = params.fee_payout_scripts(new_height) else {
        warn!(target: "betting", height = new_height, "no fee scripts, skipping rewards");
        return;
    };
    let dev_reward = fee_pool * 1000 / ODDS_DIVISOR as Amount;
    let operator_reward = fee_pool * 4000 / ODDS_DIVISOR as Amount;
    if dev_reward > 0 {
        outs.push(BetOut::new(dev_reward, dev_script, 0));
        infos.push(PayoutInfoRecord::reward(new_height, PayoutKind::BettingReward));
    }
    if operator_reward > 0 {
        outs.push(BetOut::new(operator_reward, operator_script, 0));
        infos.push(PayoutInfoRecord::reward(new_height, PayoutKind::BettingReward));
    }
}

/// Bit-exact validation of a block's payout outputs: the block's
/// coinstake must carry every required output, in order, after its
/// stake/subsidy head, and the head may not mint more than expected.
pub fn is_block_payouts_valid(
    expected: &[BetOut],
    block_outputs: &[TxOut],
    height: u32,
    expected_mint: Amount,
    expected_mn_reward: Amount,
) -> bool {
    if block_outputs.len() < expected.len() {
        warn!(
            target: "betting",
            height,
            expected = expected.len(),
            got = block_outputs.len(),
            "block carries fewer outputs than required payouts"
        );
        return false;
    }
    let head_len = block_outputs.len() - expected.len();
    for (i, (want, got)) in expected.iter().zip(&block_outputs[head_len..]).enumerate() {
        if want.value != got.value || want.script != got.script {
            warn!(
                target: "betting",
                height,
                index = i,
                want = want.value,
                got = got.value,
                "payout output mismatch"
            );
            return false;
        }
    }
    let head_value: Amount = block_outputs[..head_len].iter().map(|o| o.value).sum();
    if head_value > expected_mint + expected_mn_reward {
        warn!(target: "betting", height, head_value, "block mints more than expected");
        return false;
    }
    true
}

#[cfg(test)]
mod tests;
