//! Block disconnect: invert every mutation a block caused, leaving the
//! store byte-identical to its pre-block state.

use tracing::debug;

use crate::codec::SerCtx;
use crate::error::{BettingError, Result};
use crate::params::ChainParams;
use crate::state::bet::{BetKey, BetRecord};
use crate::state::chain_games::ChainGamesBetRecord;
use crate::state::field::FieldBetRecord;
use crate::state::mapping::MappingKey;
use crate::state::quick_games::QuickGamesBetRecord;
use crate::state::undo::UndoVariant;
use crate::store::BettingStore;
use crate::tx::{BettingTx, TxEnvelope};
use crate::types::{BlockRef, Txid};

/// Disconnect the block at `block.height`: first invert the settlement
/// marks its payout pass applied, then replay the per-txid undo log in
/// reverse transaction order, then prune stale undo entries.
pub fn betting_undo(
    store: &mut BettingStore,
    block: &BlockRef,
    txs: &[TxEnvelope],
    params: &ChainParams,
) -> Result<()> {
    let height = block.height;
    let ctx = params.ser_ctx();
    debug!(target: "betting", height, "undoing betting block");

    undo_payout_marks(store, &ctx, height)?;

    for env in txs.iter().rev() {
        undo_tx(store, &ctx, env, height)?;
    }

    store.prune_undos_below(&ctx, height.saturating_sub(params.max_reorg_depth))?;
    store.set_last_height(height.saturating_sub(1));
    Ok(())
}

/// Reset every bet the block at `height` marked completed, and drop the
/// payout-info records written alongside. The coin outputs themselves are
/// unwound by the UTXO layer.
fn undo_payout_marks(store: &mut BettingStore, ctx: &SerCtx, height: u32) -> Result<()> {
    let bets: Vec<(BetKey, BetRecord)> = store.bets.scan_all(ctx)?;
    for (key, mut bet) in bets {
        if bet.completed && bet.payout_height == height {
            bet.reset_completion();
            store.bets.update(ctx, &key, &bet);
            store.payout_infos.erase(&key);
        }
    }

    let field_bets: Vec<(BetKey, FieldBetRecord)> = store.field_bets.scan_all(ctx)?;
    for (key, mut bet) in field_bets {
        if bet.completed && bet.payout_height == height {
            bet.reset_completion();
            store.field_bets.update(ctx, &key, &bet);
            store.payout_infos.erase(&key);
        }
    }

    let cg_bets: Vec<(BetKey, ChainGamesBetRecord)> = store.cg_bets.scan_all(ctx)?;
    for (key, mut bet) in cg_bets {
        if bet.completed && bet.payout_height == height {
            bet.reset_completion();
            store.cg_bets.update(ctx, &key, &bet);
            store.payout_infos.erase(&key);
        }
    }

    // quick-games wagers settle one block after placement
    if height > 0 {
        let qg_bets: Vec<(BetKey, QuickGamesBetRecord)> =
            store.qg_bets.scan_from(ctx, &BetKey::range_start(height - 1))?;
        for (key, mut bet) in qg_bets {
            if key.height != height - 1 {
                break;
            }
            if bet.completed {
                bet.reset_completion();
                store.qg_bets.update(ctx, &key, &bet);
                store.payout_infos.erase(&key);
            }
        }
    }

    // reward info records key on the zero outpoint at the payout height
    store.payout_infos.erase(&BetKey::range_start(height));
    Ok(())
}

/// Invert one transaction: erase the records it created and restore the
/// prior images of the records it mutated.
fn undo_tx(store: &mut BettingStore, ctx: &SerCtx, env: &TxEnvelope, height: u32) -> Result<()> {
    // a tx rejected at apply time caused no mutations
    if store.failed_tx_exists(env.txid) {
        store.erase_failed_tx(env.txid);
        return Ok(());
    }

    match &env.payload {
        BettingTx::Mapping(tx) => {
            store.mappings.erase(&MappingKey::new(tx.kind, tx.id));
        }
        BettingTx::EventCreate(tx) => {
            store.events.erase(&tx.event_id);
        }
        BettingTx::UpdateOdds(_)
        | BettingTx::Spreads(_)
        | BettingTx::Totals(_)
        | BettingTx::EventPatch(_)
        | BettingTx::FieldUpdateOdds(_)
        | BettingTx::FieldUpdateMargin(_)
        | BettingTx::FieldUpdateModifiers(_) => {
            restore_undo_images(store, ctx, env.txid)?;
        }
        BettingTx::Result(tx) => {
            store.results.erase(&tx.event_id);
        }
        BettingTx::FieldEvent(tx) => {
            store.field_events.erase(&tx.event_id);
        }
        BettingTx::FieldResult(tx) => {
            store.field_results.erase(&tx.event_id);
        }
        BettingTx::PeerlessBet(_) | BettingTx::ParlayBet(_) => {
            store.bets.erase(&BetKey::new(height, env.funding));
            restore_undo_images(store, ctx, env.txid)?;
        }
        BettingTx::FieldBet(_) => {
            store.field_bets.erase(&BetKey::new(height, env.funding));
            restore_undo_images(store, ctx, env.txid)?;
        }
        BettingTx::ChainGamesEvent(tx) => {
            store.cg_events.erase(&tx.event_id);
        }
        BettingTx::ChainGamesBet(_) => {
            store.cg_bets.erase(&BetKey::new(height, env.funding));
        }
        BettingTx::ChainGamesResult(tx) => {
            store.cg_results.erase(&tx.event_id);
        }
        BettingTx::QuickGamesBet(_) => {
            store.qg_bets.erase(&BetKey::new(height, env.funding));
        }
    }
    Ok(())
}

/// Write back the prior images a transaction logged, newest first. A
/// mutating transaction without undo data means the reorg reaches past
/// the pruning horizon and cannot be replayed.
fn restore_undo_images(store: &mut BettingStore, ctx: &SerCtx, txid: Txid) -> Result<()> {
    let Some(entries) = store.get_undo(ctx, txid)? else {
        return Err(BettingError::ConsensusViolation(format!("missing undo data for tx {txid}")));
    };
    for entry in entries.iter().rev() {
        match &entry.entry {
            UndoVariant::PeerlessEvent(event) => {
                if !store.events.update(ctx, &event.base.event_id, event) {
                    store.events.write(ctx, &event.base.event_id, event);
                }
            }
            UndoVariant::FieldEvent(event) => {
                if !store.field_events.update(ctx, &event.event_id, event) {
                    store.field_events.write(ctx, &event.event_id, event);
                }
            }
        }
    }
    store.erase_undo(txid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MappingKind, Outcome, QuickGameKind, COIN};
    use crate::games::DICE_ODD;
    use crate::ingest::process_block;
    use crate::params::ChainParams;
    use crate::payout::get_betting_payouts;
    use crate::state::event::EventRecord;
    use crate::store::StoreSnapshot;
    use crate::tx::{
        BettingTx, ChainGamesBetTx, ChainGamesEventTx, ChainGamesResultTx, EventCreateTx,
        FieldContenderInput, FieldEventTx, FieldResultTx, FieldUpdateOddsTx, MappingTx,
        QuickGamesBetTx, ResultTx, SpreadsEventTx, TotalsEventTx, UpdateOddsTx,
    };
    use crate::state::bet::Leg;
    use crate::state::field::FieldLeg;
    use crate::constants::{FieldMarket, FieldResultKind, ResultKind};
    use crate::types::{script_for_destination, Address, Amount, Hash256, OutPoint, Script, Txid};

    fn block_time(height: u32) -> i64 {
        height as i64 * 60
    }

    fn block_ref(height: u32) -> BlockRef {
        BlockRef {
            hash: Hash256::from_low_byte((height % 200) as u8 + 1),
            pos_hash: Hash256::from_low_byte((height % 100) as u8),
            height,
        }
    }

    fn oracle_script() -> Script {
        script_for_destination(&Address::new("ROracle"))
    }

    fn envelope(
        txid_byte: u8,
        script: Script,
        amount: Amount,
        player: &str,
        payload: BettingTx,
    ) -> TxEnvelope {
        TxEnvelope {
            txid: Txid::from_byte(txid_byte),
            funding: OutPoint::new(Txid::from_byte(txid_byte), 0),
            input_prev_script: script,
            amount,
            player: Address::new(player),
            payload,
        }
    }

    fn oracle_env(txid_byte: u8, payload: BettingTx) -> TxEnvelope {
        envelope(txid_byte, oracle_script(), 0, "ROracle", payload)
    }

    fn player_env(txid_byte: u8, player: &str, amount: Amount, payload: BettingTx) -> TxEnvelope {
        envelope(txid_byte, script_for_destination(&Address::new(player)), amount, player, payload)
    }

    fn connect_block(
        store: &mut BettingStore,
        params: &ChainParams,
        height: u32,
        txs: &[TxEnvelope],
    ) {
        get_betting_payouts(store, &block_ref(height - 1), params).unwrap();
        process_block(store, txs, height, block_time(height), params).unwrap();
        store.flush_all();
    }

    fn disconnect_block(
        store: &mut BettingStore,
        params: &ChainParams,
        height: u32,
        txs: &[TxEnvelope],
    ) {
        betting_undo(store, &block_ref(height), txs, params).unwrap();
        store.flush_all();
    }

    fn event_tx(event_id: u32, home_odds: u32, away_odds: u32) -> EventCreateTx {
        EventCreateTx {
            event_id,
            start_time: 1_000_000,
            sport: 1,
            tournament: 2,
            stage: 0,
            home_team: 10,
            away_team: 11,
            home_odds,
            away_odds,
            draw_odds: 32000,
        }
    }

    /// A fifty-block span with the full mix of betting activity, applied,
    /// disconnected in reverse and reapplied: the store must come back
    /// byte-identical at both ends.
    #[test]
    fn test_fifty_block_reorg_round_trip() {
        let params = ChainParams::regtest();
        let mut store = BettingStore::new();
        store.set_last_height(399);

        let mut blocks: Vec<(u32, Vec<TxEnvelope>)> = (400u32..450).map(|h| (h, Vec::new())).collect();
        fn txs_at(blocks: &mut [(u32, Vec<TxEnvelope>)], h: u32) -> &mut Vec<TxEnvelope> {
            &mut blocks.iter_mut().find(|(bh, _)| *bh == h).unwrap().1
        }

        txs_at(&mut blocks, 400).extend([
            oracle_env(0x01, BettingTx::Mapping(MappingTx {
                kind: MappingKind::Sport,
                id: 1,
                name: "football".into(),
            })),
            oracle_env(0x02, BettingTx::EventCreate(event_tx(1, 20000, 28000))),
            oracle_env(0x03, BettingTx::EventCreate(event_tx(2, 26000, 19000))),
            oracle_env(0x04, BettingTx::EventCreate(event_tx(3, 15000, 45000))),
            oracle_env(0x05, BettingTx::ChainGamesEvent(ChainGamesEventTx {
                event_id: 8,
                entry_fee: 10,
            })),
            oracle_env(0x06, BettingTx::FieldEvent(FieldEventTx {
                event_id: 900,
                start_time: 1_000_000,
                group_type: 1,
                market_type: 1,
                sport: 1,
                tournament: 2,
                stage: 0,
                margin_percent: 600,
                contenders: [
                    (1, FieldContenderInput { input_odds: 20000, modifier: 0 }),
                    (2, FieldContenderInput { input_odds: 30000, modifier: 0 }),
                    (3, FieldContenderInput { input_odds: 50000, modifier: 0 }),
                    (4, FieldContenderInput { input_odds: 100000, modifier: 0 }),
                ]
                .into_iter()
                .collect(),
            })),
        ]);

        txs_at(&mut blocks, 402).extend([
            oracle_env(0x10, BettingTx::Spreads(SpreadsEventTx {
                event_id: 1,
                points: 150,
                home_odds: 19000,
                away_odds: 19000,
            })),
            oracle_env(0x11, BettingTx::Totals(TotalsEventTx {
                event_id: 2,
                points: 250,
                over_odds: 18000,
                under_odds: 20000,
            })),
            oracle_env(0x12, BettingTx::UpdateOdds(UpdateOddsTx {
                event_id: 3,
                home_odds: 16000,
                away_odds: 42000,
                draw_odds: 33000,
            })),
            // duplicate event id: rejected, lands in the failed-tx set
            oracle_env(0x13, BettingTx::EventCreate(event_tx(1, 11000, 11000))),
        ]);

        txs_at(&mut blocks, 405).extend([
            player_env(0x20, "RAlice", 50 * COIN, BettingTx::PeerlessBet(Leg::new(
                1,
                Outcome::MoneyLineHome,
            ))),
            player_env(0x21, "RBob", 10 * COIN, BettingTx::ParlayBet(vec![
                Leg::new(1, Outcome::SpreadHome),
                Leg::new(2, Outcome::TotalOver),
                Leg::new(3, Outcome::MoneyLineAway),
            ])),
            player_env(0x22, "RCara", 10 * COIN, BettingTx::FieldBet(vec![FieldLeg::new(
                900,
                FieldMarket::Place,
                2,
            )])),
            player_env(0x23, "RDana", 10 * COIN, BettingTx::ChainGamesBet(ChainGamesBetTx {
                event_id: 8,
            })),
        ]);

        txs_at(&mut blocks, 406).extend([
            player_env(0x28, "REve", 10 * COIN, BettingTx::ChainGamesBet(ChainGamesBetTx {
                event_id: 8,
            })),
            oracle_env(0x29, BettingTx::FieldUpdateOdds(FieldUpdateOddsTx {
                event_id: 900,
                contenders: [(2u32, 25000u32)].into_iter().collect(),
            })),
        ]);

        txs_at(&mut blocks, 410).push(oracle_env(0x30, BettingTx::Result(ResultTx {
            event_id: 1,
            kind: ResultKind::Standard,
            home_score: 3,
            away_score: 1,
        })));

        txs_at(&mut blocks, 415).push(oracle_env(0x31, BettingTx::Result(ResultTx {
            event_id: 2,
            kind: ResultKind::TotalsRefund,
            home_score: 1,
            away_score: 1,
        })));

        txs_at(&mut blocks, 420).push(oracle_env(0x32, BettingTx::ChainGamesResult(
            ChainGamesResultTx { event_id: 8 },
        )));

        txs_at(&mut blocks, 425).push(oracle_env(0x33, BettingTx::FieldResult(FieldResultTx {
            event_id: 900,
            kind: FieldResultKind::Standard,
            places: [(1u32, 2u8), (2, 1), (3, 3), (4, 0)].into_iter().collect(),
        })));

        // a result and a late bet on the same event in one block: the
        // result pass runs first, so the bet is rejected deterministically
        txs_at(&mut blocks, 430).extend([
            oracle_env(0x34, BettingTx::Result(ResultTx {
                event_id: 3,
                kind: ResultKind::Standard,
                home_score: 0,
                away_score: 2,
            })),
            player_env(0x35, "RFred", 20 * COIN, BettingTx::PeerlessBet(Leg::new(
                3,
                Outcome::MoneyLineAway,
            ))),
        ]);

        txs_at(&mut blocks, 440).push(player_env(
            0x36,
            "RGina",
            5 * COIN,
            BettingTx::QuickGamesBet(QuickGamesBetTx {
                game: QuickGameKind::Dice,
                bet_info: vec![DICE_ODD],
            }),
        ));

        let initial: StoreSnapshot = store.snapshot();

        for (height, txs) in &blocks {
            connect_block(&mut store, &params, *height, txs);
        }
        let applied: StoreSnapshot = store.snapshot();
        assert_ne!(initial, applied);

        for (height, txs) in blocks.iter().rev() {
            disconnect_block(&mut store, &params, *height, txs);
        }
        assert_eq!(initial, store.snapshot(), "undo must restore the pre-chain image");

        for (height, txs) in &blocks {
            connect_block(&mut store, &params, *height, txs);
        }
        assert_eq!(applied, store.snapshot(), "reapply must reproduce the applied image");
    }

    /// Undoing a bet restores the event's liability accumulators to the
    /// prior image, not merely something equivalent.
    #[test]
    fn test_bet_undo_restores_event_image() {
        let params = ChainParams::regtest();
        let ctx = params.ser_ctx();
        let mut store = BettingStore::new();
        store.set_last_height(499);

        connect_block(
            &mut store,
            &params,
            500,
            &[oracle_env(0x01, BettingTx::EventCreate(event_tx(7, 21000, 24000)))],
        );
        let before: EventRecord = store.events.read(&ctx, &7u32).unwrap().unwrap();

        let bet_txs = [player_env(0x02, "RAlice", 10 * COIN, BettingTx::PeerlessBet(Leg::new(
            7,
            Outcome::MoneyLineHome,
        )))];
        connect_block(&mut store, &params, 501, &bet_txs);
        let during: EventRecord = store.events.read(&ctx, &7u32).unwrap().unwrap();
        assert_eq!(during.tally.ml_home.bets, 1);
        assert!(store.get_undo(&ctx, Txid::from_byte(0x02)).unwrap().is_some());

        disconnect_block(&mut store, &params, 501, &bet_txs);
        let after: EventRecord = store.events.read(&ctx, &7u32).unwrap().unwrap();
        assert_eq!(after, before);
        assert!(store.get_undo(&ctx, Txid::from_byte(0x02)).unwrap().is_none());
        assert!(!store.bets.exists(&crate::state::bet::BetKey::new(
            501,
            OutPoint::new(Txid::from_byte(0x02), 0)
        )));
    }

    /// A rejected transaction leaves only a failed-tx mark, and undoing
    /// its block purges the mark without touching anything else.
    #[test]
    fn test_failed_tx_purged_on_undo() {
        let params = ChainParams::regtest();
        let mut store = BettingStore::new();
        store.set_last_height(499);

        // bet on a nonexistent event: rejected at apply time
        let txs = [player_env(0x0a, "RAlice", 10 * COIN, BettingTx::PeerlessBet(Leg::new(
            999,
            Outcome::MoneyLineHome,
        )))];
        let initial = store.snapshot();
        connect_block(&mut store, &params, 500, &txs);
        assert!(store.failed_tx_exists(Txid::from_byte(0x0a)));

        disconnect_block(&mut store, &params, 500, &txs);
        assert!(!store.failed_tx_exists(Txid::from_byte(0x0a)));
        assert_eq!(initial, store.snapshot());
    }

    /// Settlement marks invert: after undoing the payout block the bet is
    /// open again and a repeated payout pass reproduces the same outputs.
    #[test]
    fn test_payout_marks_invert() {
        let params = ChainParams::regtest();
        let ctx = params.ser_ctx();
        let mut store = BettingStore::new();
        store.set_last_height(399);

        connect_block(
            &mut store,
            &params,
            400,
            &[oracle_env(0x01, BettingTx::EventCreate(event_tx(1, 20000, 28000)))],
        );
        let bet_txs = [player_env(0x02, "RAlice", 10 * COIN, BettingTx::PeerlessBet(Leg::new(
            1,
            Outcome::MoneyLineHome,
        )))];
        connect_block(&mut store, &params, 401, &bet_txs);
        let result_txs = [oracle_env(0x03, BettingTx::Result(ResultTx {
            event_id: 1,
            kind: ResultKind::Standard,
            home_score: 1,
            away_score: 0,
        }))];
        connect_block(&mut store, &params, 402, &result_txs);

        // block 403 carries the payouts
        let (outs_a, _) = get_betting_payouts(&mut store, &block_ref(402), &params).unwrap();
        process_block(&mut store, &[], 403, block_time(403), &params).unwrap();
        store.flush_all();

        let key = crate::state::bet::BetKey::new(401, OutPoint::new(Txid::from_byte(0x02), 0));
        let bet: crate::state::bet::BetRecord = store.bets.read(&ctx, &key).unwrap().unwrap();
        assert!(bet.completed);
        assert!(store.payout_infos.exists(&key));

        disconnect_block(&mut store, &params, 403, &[]);
        let bet: crate::state::bet::BetRecord = store.bets.read(&ctx, &key).unwrap().unwrap();
        assert!(!bet.completed);
        assert!(!store.payout_infos.exists(&key));

        let (outs_b, _) = get_betting_payouts(&mut store, &block_ref(402), &params).unwrap();
        assert_eq!(outs_a, outs_b);
    }
}
