//! Quick-games ingest handlers.

use crate::codec::SerCtx;
use crate::constants::QuickGameKind;
use crate::error::{BettingError, Result};
use crate::games::dice_bet_info_valid;
use crate::params::ChainParams;
use crate::state::bet::BetKey;
use crate::state::quick_games::QuickGamesBetRecord;
use crate::state::undo::UndoEntry;
use crate::store::BettingStore;
use crate::tx::{QuickGamesBetTx, TxEnvelope};
use crate::types::Amount;

pub(super) fn check_bet(
    tx: &QuickGamesBetTx,
    amount: Amount,
    height: u32,
    params: &ChainParams,
) -> Result<()> {
    if height >= params.quick_games_end_height {
        return Err(BettingError::MalformedTransaction("quick games have ended".into()));
    }
    if params.quick_game(tx.game).is_none() {
        return Err(BettingError::MalformedTransaction(format!("unknown game {:?}", tx.game)));
    }
    let info_valid = match tx.game {
        QuickGameKind::Dice => dice_bet_info_valid(&tx.bet_info),
    };
    if !info_valid {
        return Err(BettingError::MalformedTransaction("malformed wager info".into()));
    }
    if amount < params.min_bet_amount || amount > params.max_bet_amount {
        return Err(BettingError::MalformedTransaction(format!("stake {amount} out of window")));
    }
    Ok(())
}

pub(super) fn place_bet(
    store: &mut BettingStore,
    ctx: &SerCtx,
    env: &TxEnvelope,
    tx: &QuickGamesBetTx,
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<Vec<UndoEntry>> {
    check_bet(tx, env.amount, height, params)?;
    let key = BetKey::new(height, env.funding);
    let record = QuickGamesBetRecord::new(
        tx.game,
        tx.bet_info.clone(),
        env.amount,
        env.player.clone(),
        block_time,
    );
    if !store.qg_bets.write(ctx, &key, &record) {
        return Err(BettingError::DuplicateWrite(format!("quick-games bet {}", env.funding)));
    }
    Ok(Vec::new())
}
