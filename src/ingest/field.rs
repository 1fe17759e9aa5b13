//! Field-event ingest handlers.

use crate::codec::SerCtx;
use crate::constants::MAX_PARLAY_LEGS;
use crate::error::{BettingError, Result};
use crate::params::ChainParams;
use crate::state::bet::BetKey;
use crate::state::field::{FieldBetRecord, FieldEventRecord, FieldLeg, FieldResultRecord};
use crate::state::undo::UndoEntry;
use crate::store::BettingStore;
use crate::tx::{FieldEventTx, FieldResultTx, TxEnvelope};
use crate::types::Amount;

pub(super) fn check_field_event_create(
    store: &BettingStore,
    _ctx: &SerCtx,
    tx: &FieldEventTx,
) -> Result<()> {
    if store.field_events.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!("field event {}", tx.event_id)));
    }
    Ok(())
}

pub(super) fn create_field_event(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &FieldEventTx,
) -> Result<Vec<UndoEntry>> {
    let record = FieldEventRecord::from_create(tx);
    if !store.field_events.write(ctx, &tx.event_id, &record) {
        return Err(BettingError::DuplicateWrite(format!("field event {}", tx.event_id)));
    }
    Ok(Vec::new())
}

pub(super) fn check_field_update(store: &BettingStore, _ctx: &SerCtx, event_id: u32) -> Result<()> {
    if !store.field_events.exists(&event_id) {
        return Err(BettingError::MalformedTransaction(format!("unknown field event {event_id}")));
    }
    if store.field_results.exists(&event_id) {
        return Err(BettingError::MalformedTransaction(format!(
            "field event {event_id} already resulted"
        )));
    }
    Ok(())
}

/// Mutate an extant, unresulted field event, logging its prior image.
/// Derived odds recompute inside the apply closure.
pub(super) fn update_field_event<F>(
    store: &mut BettingStore,
    ctx: &SerCtx,
    event_id: u32,
    height: u32,
    apply: F,
) -> Result<Vec<UndoEntry>>
where
    F: FnOnce(&mut FieldEventRecord),
{
    check_field_update(store, ctx, event_id)?;
    let mut event: FieldEventRecord = store.field_events.read(ctx, &event_id)?.ok_or_else(|| {
        BettingError::MalformedTransaction(format!("unknown field event {event_id}"))
    })?;
    let prior = event.clone();
    apply(&mut event);
    store.field_events.update(ctx, &event_id, &event);
    Ok(vec![UndoEntry::field(prior, height)])
}

pub(super) fn check_field_result(
    store: &BettingStore,
    _ctx: &SerCtx,
    tx: &FieldResultTx,
) -> Result<()> {
    if !store.field_events.exists(&tx.event_id) {
        return Err(BettingError::MalformedTransaction(format!(
            "unknown field event {}",
            tx.event_id
        )));
    }
    if store.field_results.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!(
            "field result for event {}",
            tx.event_id
        )));
    }
    Ok(())
}

pub(super) fn post_field_result(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &FieldResultTx,
    height: u32,
) -> Result<Vec<UndoEntry>> {
    check_field_result(store, ctx, tx)?;
    store.field_results.write(ctx, &tx.event_id, &FieldResultRecord::from_tx(tx, height));
    Ok(Vec::new())
}

pub(super) fn check_bet(
    store: &BettingStore,
    ctx: &SerCtx,
    legs: &[FieldLeg],
    amount: Amount,
    params: &ChainParams,
) -> Result<()> {
    if legs.is_empty() || legs.len() > MAX_PARLAY_LEGS {
        return Err(BettingError::MalformedTransaction(format!("{} legs", legs.len())));
    }
    if amount < params.min_bet_amount || amount > params.max_bet_amount {
        return Err(BettingError::MalformedTransaction(format!("stake {amount} out of window")));
    }
    for (i, leg) in legs.iter().enumerate() {
        if legs[..i].iter().any(|other| other.event_id == leg.event_id) {
            return Err(BettingError::MalformedTransaction(format!(
                "duplicate parlay event {}",
                leg.event_id
            )));
        }
        let event: FieldEventRecord =
            store.field_events.read(ctx, &leg.event_id)?.ok_or_else(|| {
                BettingError::MalformedTransaction(format!("unknown field event {}", leg.event_id))
            })?;
        if store.field_results.exists(&leg.event_id) {
            return Err(BettingError::MalformedTransaction(format!(
                "field event {} already resulted",
                leg.event_id
            )));
        }
        if !event.market_open(leg.market) {
            return Err(BettingError::MalformedTransaction(format!(
                "market closed on field event {}",
                leg.event_id
            )));
        }
        if event.odds_for(leg.market, leg.contender_id) == 0 {
            return Err(BettingError::MalformedTransaction(format!(
                "contender {} not bettable on field event {}",
                leg.contender_id, leg.event_id
            )));
        }
    }
    Ok(())
}

pub(super) fn place_bet(
    store: &mut BettingStore,
    ctx: &SerCtx,
    env: &TxEnvelope,
    legs: &[FieldLeg],
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<Vec<UndoEntry>> {
    check_bet(store, ctx, legs, env.amount, params)?;

    let mut updated: Vec<FieldEventRecord> = Vec::with_capacity(legs.len());
    let mut locked = Vec::with_capacity(legs.len());
    let mut undos = Vec::with_capacity(legs.len());
    for leg in legs {
        let mut event: FieldEventRecord =
            store.field_events.read(ctx, &leg.event_id)?.ok_or_else(|| {
                BettingError::MalformedTransaction(format!("unknown field event {}", leg.event_id))
            })?;
        undos.push(UndoEntry::field(event.clone(), height));
        locked.push(event.snapshot());
        event.add_bet(leg.market, leg.contender_id, env.amount)?;
        updated.push(event);
    }

    let key = BetKey::new(height, env.funding);
    let record =
        FieldBetRecord::new(env.amount, env.player.clone(), legs.to_vec(), locked, block_time);
    if !store.field_bets.write(ctx, &key, &record) {
        return Err(BettingError::DuplicateWrite(format!("field bet {}", env.funding)));
    }
    for event in &updated {
        store.field_events.update(ctx, &event.event_id, event);
    }
    Ok(undos)
}
