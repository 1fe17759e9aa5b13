//! Peerless (sportsbook) ingest handlers.

use crate::codec::SerCtx;
use crate::constants::MAX_PARLAY_LEGS;
use crate::error::{BettingError, Result};
use crate::params::ChainParams;
use crate::state::bet::{BetKey, BetRecord, Leg};
use crate::state::event::EventRecord;
use crate::state::mapping::{MappingKey, MappingRecord};
use crate::state::result::ResultRecord;
use crate::state::undo::UndoEntry;
use crate::store::BettingStore;
use crate::tx::{EventCreateTx, MappingTx, ResultTx, TxEnvelope};
use crate::types::Amount;

pub(super) fn check_mapping(store: &BettingStore, _ctx: &SerCtx, tx: &MappingTx) -> Result<()> {
    let key = MappingKey::new(tx.kind, tx.id);
    if store.mappings.exists(&key) {
        return Err(BettingError::DuplicateWrite(format!("mapping {:?}/{}", tx.kind, tx.id)));
    }
    Ok(())
}

pub(super) fn create_mapping(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &MappingTx,
) -> Result<Vec<UndoEntry>> {
    let key = MappingKey::new(tx.kind, tx.id);
    if !store.mappings.write(ctx, &key, &MappingRecord { name: tx.name.clone() }) {
        return Err(BettingError::DuplicateWrite(format!("mapping {:?}/{}", tx.kind, tx.id)));
    }
    Ok(Vec::new())
}

pub(super) fn check_event_create(
    store: &BettingStore,
    _ctx: &SerCtx,
    tx: &EventCreateTx,
) -> Result<()> {
    if store.events.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!("event {}", tx.event_id)));
    }
    Ok(())
}

pub(super) fn create_event(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &EventCreateTx,
    height: u32,
) -> Result<Vec<UndoEntry>> {
    let record = EventRecord::from_create(tx, height);
    if !store.events.write(ctx, &tx.event_id, &record) {
        return Err(BettingError::DuplicateWrite(format!("event {}", tx.event_id)));
    }
    Ok(Vec::new())
}

pub(super) fn check_event_update(store: &BettingStore, _ctx: &SerCtx, event_id: u32) -> Result<()> {
    if !store.events.exists(&event_id) {
        return Err(BettingError::MalformedTransaction(format!("unknown event {event_id}")));
    }
    if store.results.exists(&event_id) {
        return Err(BettingError::MalformedTransaction(format!("event {event_id} already resulted")));
    }
    Ok(())
}

/// Mutate an extant, unresulted event in place, logging its prior image.
pub(super) fn update_event<F>(
    store: &mut BettingStore,
    ctx: &SerCtx,
    event_id: u32,
    height: u32,
    apply: F,
) -> Result<Vec<UndoEntry>>
where
    F: FnOnce(&mut EventRecord),
{
    check_event_update(store, ctx, event_id)?;
    let mut event: EventRecord = store
        .events
        .read(ctx, &event_id)?
        .ok_or_else(|| BettingError::MalformedTransaction(format!("unknown event {event_id}")))?;
    let prior = event.clone();
    apply(&mut event);
    store.events.update(ctx, &event_id, &event);
    Ok(vec![UndoEntry::peerless(prior, height)])
}

pub(super) fn check_result(store: &BettingStore, _ctx: &SerCtx, tx: &ResultTx) -> Result<()> {
    if !store.events.exists(&tx.event_id) {
        return Err(BettingError::MalformedTransaction(format!("unknown event {}", tx.event_id)));
    }
    if store.results.exists(&tx.event_id) {
        return Err(BettingError::DuplicateWrite(format!("result for event {}", tx.event_id)));
    }
    Ok(())
}

pub(super) fn post_result(
    store: &mut BettingStore,
    ctx: &SerCtx,
    tx: &ResultTx,
    height: u32,
) -> Result<Vec<UndoEntry>> {
    check_result(store, ctx, tx)?;
    store.results.write(ctx, &tx.event_id, &ResultRecord::from_tx(tx, height));
    Ok(Vec::new())
}

pub(super) fn check_bet(
    store: &BettingStore,
    ctx: &SerCtx,
    legs: &[Leg],
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
        let event: EventRecord = store.events.read(ctx, &leg.event_id)?.ok_or_else(|| {
            BettingError::MalformedTransaction(format!("unknown event {}", leg.event_id))
        })?;
        if store.results.exists(&leg.event_id) {
            return Err(BettingError::MalformedTransaction(format!(
                "event {} already resulted",
                leg.event_id
            )));
        }
        if event.base.odds_for(leg.outcome) == 0 {
            return Err(BettingError::MalformedTransaction(format!(
                "market closed for event {}",
                leg.event_id
            )));
        }
    }
    Ok(())
}

pub(super) fn place_bet(
    store: &mut BettingStore,
    ctx: &SerCtx,
    env: &TxEnvelope,
    legs: &[Leg],
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<Vec<UndoEntry>> {
    check_bet(store, ctx, legs, env.amount, params)?;

    // validate against copies first, then write: a leg that overflows the
    // liability accumulator must leave no partial mutation behind
    let mut updated: Vec<EventRecord> = Vec::with_capacity(legs.len());
    let mut locked = Vec::with_capacity(legs.len());
    let mut undos = Vec::with_capacity(legs.len());
    for leg in legs {
        let mut event: EventRecord = store.events.read(ctx, &leg.event_id)?.ok_or_else(|| {
            BettingError::MalformedTransaction(format!("unknown event {}", leg.event_id))
        })?;
        undos.push(UndoEntry::peerless(event.clone(), height));
        locked.push(event.snapshot());
        event.add_bet(leg.outcome, env.amount)?;
        updated.push(event);
    }

    let key = BetKey::new(height, env.funding);
    let record = BetRecord::new(env.amount, env.player.clone(), legs.to_vec(), locked, block_time);
    if !store.bets.write(ctx, &key, &record) {
        return Err(BettingError::DuplicateWrite(format!("bet {}", env.funding)));
    }
    for event in &updated {
        store.events.update(ctx, &event.base.event_id, event);
    }
    Ok(undos)
}
