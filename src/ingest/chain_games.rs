//! Chain-games lottery ingest handlers.

use crate::codec::SerCtx;
use crate::constants::COIN;
use crate::error::{BettingError, Result};
use crate::state::bet::BetKey;
use crate::state::chain_games::{
    ChainGamesBetRecord, ChainGamesEventRecord, ChainGamesResultRecord,
};
use crate::state::undo::UndoEntry;
use crate::store::BettingStore;
use crate::tx::{ChainGamesBetTx, ChainGamesEventTx, ChainGamesResultTx, TxEnvelope};
use crate::types::Amount;

pub(super) fn check_event(
    store: &BettingStore,
    _ctx: &SerCtx,
    tx: &ChainGamesEventTx,
) -> Result<()> {
    if store.cg_events.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!("chain-games event {}", tx.event_id)));
    }
    if tx.entry_fee == 0 {
        return Err(BettingError::MalformedTransaction("zero entry fee".into()));
    }
    Ok(())
}

pub(super) fn create_event(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &ChainGamesEventTx,
) -> Result<Vec<UndoEntry>> {
    check_event(store, ctx, tx)?;
    store.cg_events.write(
        ctx,
        &tx.event_id,
        &ChainGamesEventRecord { event_id: tx.event_id, entry_fee: tx.entry_fee },
    );
    Ok(Vec::new())
}

pub(super) fn check_bet(
    store: &BettingStore,
    ctx: &SerCtx,
    tx: &ChainGamesBetTx,
    amount: Amount,
) -> Result<()> {
    let event: ChainGamesEventRecord = store.cg_events.read(ctx, &tx.event_id)?.ok_or_else(|| {
        BettingError::MalformedTransaction(format!("unknown chain-games event {}", tx.event_id))
    })?;
    if store.cg_results.exists(&tx.event_id) {
        return Err(BettingError::MalformedTransaction(format!(
            "chain-games event {} already drawn",
            tx.event_id
        )));
    }
    let fee = event.entry_fee as Amount * COIN;
    if amount != fee {
        return Err(BettingError::MalformedTransaction(format!(
            "ticket {amount} does not match entry fee {fee}"
        )));
    }
    Ok(())
}

pub(super) fn place_bet(
    store: &mut BettingStore,
    ctx: &SerCtx,
    env: &TxEnvelope,
    tx: &ChainGamesBetTx,
    height: u32,
    block_time: i64,
) -> Result<Vec<UndoEntry>> {
    check_bet(store, ctx, tx, env.amount)?;
    let key = BetKey::new(height, env.funding);
    let record =
        ChainGamesBetRecord::new(tx.event_id, env.amount, env.player.clone(), block_time);
    if !store.cg_bets.write(ctx, &key, &record) {
        return Err(BettingError::DuplicateWrite(format!("chain-games bet {}", env.funding)));
    }
    Ok(Vec::new())
}

pub(super) fn check_result(
    store: &BettingStore,
    _ctx: &SerCtx,
    tx: &ChainGamesResultTx,
) -> Result<()> {
    if !store.cg_events.exists(&tx.event_id) {
        return Err(BettingError::MalformedTransaction(format!(
            "unknown chain-games event {}",
            tx.event_id
        )));
    }
    if store.cg_results.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!(
            "chain-games result for event {}",
            tx.event_id
        )));
    }
    Ok(())
}

pub(super) fn post_result(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &ChainGamesResultTx,
    height: u32,
) -> Result<Vec<UndoEntry>> {
    check_result(store, ctx, tx)?;
    store.cg_results.write(
        ctx,
        &tx.event_id,
        &ChainGamesResultRecord { event_id: tx.event_id, posted_height: height },
    );
    Ok(Vec::new())
}
