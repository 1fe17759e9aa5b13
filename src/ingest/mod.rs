//! Block ingest: classifies each typed betting transaction, validates it,
//! applies its mutations and records undo entries. The per-block pass
//! order is consensus-critical.

mod chain_games;
mod field;
mod peerless;
mod quick_games;

use tracing::debug;

use crate::error::{BettingError, Result};
use crate::params::ChainParams;
use crate::state::undo::UndoEntry;
use crate::store::BettingStore;
use crate::tx::{BettingTx, TxEnvelope};

/// Apply every betting transaction of a confirmed block, in the fixed
/// consensus order: mappings, then event creations, then event updates,
/// then field events, then results, then bets.
pub fn process_block(
    store: &mut BettingStore,
    txs: &[TxEnvelope],
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<()> {
    let passes: [fn(&BettingTx) -> bool; 6] = [
        |p| matches!(p, BettingTx::Mapping(_)),
        |p| matches!(p, BettingTx::EventCreate(_) | BettingTx::ChainGamesEvent(_)),
        |p| {
            matches!(
                p,
                BettingTx::UpdateOdds(_)
                    | BettingTx::Spreads(_)
                    | BettingTx::Totals(_)
                    | BettingTx::EventPatch(_)
            )
        },
        |p| {
            matches!(
                p,
                BettingTx::FieldEvent(_)
                    | BettingTx::FieldUpdateOdds(_)
                    | BettingTx::FieldUpdateMargin(_)
                    | BettingTx::FieldUpdateModifiers(_)
            )
        },
        |p| {
            matches!(
                p,
                BettingTx::Result(_) | BettingTx::FieldResult(_) | BettingTx::ChainGamesResult(_)
            )
        },
        |p| p.is_bet(),
    ];

    for pass in passes {
        for env in txs.iter().filter(|e| pass(&e.payload)) {
            process_betting_tx(store, env, height, block_time, params)?;
        }
    }
    store.set_last_height(height);
    Ok(())
}

/// Apply one betting transaction. Rejections land in the failed-tx set and
/// do not fail the block; only store corruption propagates.
pub fn process_betting_tx(
    store: &mut BettingStore,
    env: &TxEnvelope,
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<()> {
    if store.failed_tx_exists(env.txid) {
        debug!(target: "betting", txid = %env.txid, "skipping previously failed tx");
        return Ok(());
    }

    match dispatch(store, env, height, block_time, params) {
        Ok(undos) => {
            if !undos.is_empty() {
                store.save_undo(&params.ser_ctx(), env.txid, &undos);
            }
            Ok(())
        }
        Err(e) if e.is_tx_rejection() => {
            debug!(target: "betting", txid = %env.txid, reason = %e, "betting tx rejected");
            store.save_failed_tx(env.txid);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Mempool admission: the same validation the block pass applies, without
/// mutating anything.
pub fn check_betting_tx(
    store: &BettingStore,
    env: &TxEnvelope,
    height: u32,
    params: &ChainParams,
) -> Result<()> {
    gate_oracle(env, height, params)?;
    let ctx = params.ser_ctx();
    match &env.payload {
        BettingTx::Mapping(tx) => peerless::check_mapping(store, &ctx, tx),
        BettingTx::EventCreate(tx) => peerless::check_event_create(store, &ctx, tx),
        BettingTx::UpdateOdds(tx) => peerless::check_event_update(store, &ctx, tx.event_id),
        BettingTx::Spreads(tx) => peerless::check_event_update(store, &ctx, tx.event_id),
        BettingTx::Totals(tx) => peerless::check_event_update(store, &ctx, tx.event_id),
        BettingTx::EventPatch(tx) => peerless::check_event_update(store, &ctx, tx.event_id),
        BettingTx::Result(tx) => peerless::check_result(store, &ctx, tx),
        BettingTx::FieldEvent(tx) => field::check_field_event_create(store, &ctx, tx),
        BettingTx::FieldUpdateOdds(tx) => field::check_field_update(store, &ctx, tx.event_id),
        BettingTx::FieldUpdateMargin(tx) => field::check_field_update(store, &ctx, tx.event_id),
        BettingTx::FieldUpdateModifiers(tx) => field::check_field_update(store, &ctx, tx.event_id),
        BettingTx::FieldResult(tx) => field::check_field_result(store, &ctx, tx),
        BettingTx::PeerlessBet(leg) => {
            peerless::check_bet(store, &ctx, std::slice::from_ref(leg), env.amount, params)
        }
        BettingTx::ParlayBet(legs) => peerless::check_bet(store, &ctx, legs, env.amount, params),
        BettingTx::FieldBet(legs) => field::check_bet(store, &ctx, legs, env.amount, params),
        BettingTx::ChainGamesEvent(tx) => chain_games::check_event(store, &ctx, tx),
        BettingTx::ChainGamesBet(tx) => chain_games::check_bet(store, &ctx, tx, env.amount),
        BettingTx::ChainGamesResult(tx) => chain_games::check_result(store, &ctx, tx),
        BettingTx::QuickGamesBet(tx) => quick_games::check_bet(tx, env.amount, height, params),
    }
}

fn gate_oracle(env: &TxEnvelope, height: u32, params: &ChainParams) -> Result<()> {
    if env.payload.requires_oracle() && !params.is_oracle_script(&env.input_prev_script, height) {
        return Err(BettingError::OracleAuthorityMissing);
    }
    Ok(())
}

fn dispatch(
    store: &mut BettingStore,
    env: &TxEnvelope,
    height: u32,
    block_time: i64,
    params: &ChainParams,
) -> Result<Vec<UndoEntry>> {
    gate_oracle(env, height, params)?;
    let ctx = params.ser_ctx();
    match &env.payload {
        BettingTx::Mapping(tx) => peerless::create_mapping(store, &ctx, tx),
        BettingTx::EventCreate(tx) => peerless::create_event(store, &ctx, tx, height),
        BettingTx::UpdateOdds(tx) => {
            peerless::update_event(store, &ctx, tx.event_id, height, |ev| ev.apply_update_odds(tx))
        }
        BettingTx::Spreads(tx) => {
            peerless::update_event(store, &ctx, tx.event_id, height, |ev| ev.apply_spreads(tx))
        }
        BettingTx::Totals(tx) => {
            peerless::update_event(store, &ctx, tx.event_id, height, |ev| ev.apply_totals(tx))
        }
        BettingTx::EventPatch(tx) => {
            peerless::update_event(store, &ctx, tx.event_id, height, |ev| ev.apply_patch(tx))
        }
        BettingTx::Result(tx) => peerless::post_result(store, &ctx, tx, height),
        BettingTx::FieldEvent(tx) => field::create_field_event(store, &ctx, tx),
        BettingTx::FieldUpdateOdds(tx) => {
            field::update_field_event(store, &ctx, tx.event_id, height, |ev| {
                ev.apply_update_odds(&tx.contenders)
            })
        }
        BettingTx::FieldUpdateMargin(tx) => {
            field::update_field_event(store, &ctx, tx.event_id, height, |ev| {
                ev.apply_update_margin(tx.margin_percent)
            })
        }
        BettingTx::FieldUpdateModifiers(tx) => {
            field::update_field_event(store, &ctx, tx.event_id, height, |ev| {
                ev.apply_update_modifiers(&tx.modifiers)
            })
        }
        BettingTx::FieldResult(tx) => field::post_field_result(store, &ctx, tx, height),
        BettingTx::PeerlessBet(leg) => {
            peerless::place_bet(store, &ctx, env, std::slice::from_ref(leg), height, block_time, params)
        }
        BettingTx::ParlayBet(legs) => {
            peerless::place_bet(store, &ctx, env, legs, height, block_time, params)
        }
        BettingTx::FieldBet(legs) => {
            field::place_bet(store, &ctx, env, legs, height, block_time, params)
        }
        BettingTx::ChainGamesEvent(tx) => chain_games::create_event(store, &ctx, tx),
        BettingTx::ChainGamesBet(tx) => {
            chain_games::place_bet(store, &ctx, env, tx, height, block_time)
        }
        BettingTx::ChainGamesResult(tx) => chain_games::post_result(store, &ctx, tx, height),
        BettingTx::QuickGamesBet(tx) => {
            quick_games::place_bet(store, &ctx, env, tx, height, block_time, params)
        }
    }
}
