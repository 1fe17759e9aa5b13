//! End-to-end settlement scenarios driven through ingest and payout.

use crate::constants::{
    BetResult, FieldMarket, FieldResultKind, MappingKind, Outcome, PayoutKind, QuickGameKind,
    COIN, ODDS_DIVISOR,
};
use crate::games::DICE_EVEN;
use crate::ingest::process_block;
use crate::params::ChainParams;
use crate::payout::{get_betting_payouts, is_block_payouts_valid};
use crate::state::bet::{BetKey, BetRecord, Leg};
use crate::state::field::{FieldBetRecord, FieldEventRecord, FieldLeg};
use crate::state::chain_games::ChainGamesBetRecord;
use crate::store::BettingStore;
use crate::tx::{
    BettingTx, ChainGamesBetTx, ChainGamesEventTx, ChainGamesResultTx, EventCreateTx,
    FieldContenderInput, FieldEventTx, FieldResultTx, MappingTx, QuickGamesBetTx, ResultTx,
    SpreadsEventTx, TxEnvelope,
};
use crate::types::{
    script_for_destination, Address, Amount, BlockRef, Hash256, OutPoint, Script, Txid,
};

fn block_time(height: u32) -> i64 {
    height as i64 * 60
}

fn prev_ref(height: u32, pos_low: u8) -> BlockRef {
    BlockRef {
        height,
        hash: Hash256::from_low_byte(0xee),
        pos_hash: Hash256::from_low_byte(pos_low),
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

fn apply_block(store: &mut BettingStore, params: &ChainParams, height: u32, txs: &[TxEnvelope]) {
    process_block(store, txs, height, block_time(height), params).unwrap();
    store.flush_all();
}

fn moneyline_event(event_id: u32, start_time: u64) -> EventCreateTx {
    EventCreateTx {
        event_id,
        start_time,
        sport: 1,
        tournament: 2,
        stage: 0,
        home_team: 10,
        away_team: 11,
        home_odds: 25000,
        away_odds: 20000,
        draw_odds: 35000,
    }
}

/// Single moneyline winner: the payout is stake times locked odds, the
/// bet completes as a win at the payout height.
#[test]
fn test_single_moneyline_win() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        400,
        &[oracle_env(0x01, BettingTx::EventCreate(moneyline_event(100, 1_000_000)))],
    );
    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(
            0xa1,
            "RAlice",
            100 * COIN,
            BettingTx::PeerlessBet(Leg::new(100, Outcome::MoneyLineHome)),
        )],
    );
    apply_block(
        &mut store,
        &params,
        600,
        &[oracle_env(0x02, BettingTx::Result(ResultTx {
            event_id: 100,
            kind: crate::constants::ResultKind::Standard,
            home_score: 2,
            away_score: 1,
        }))],
    );

    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(600, 7), &params).unwrap();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].value, 250 * COIN);
    assert_eq!(outs[0].script, script_for_destination(&Address::new("RAlice")));
    assert_eq!(outs[0].stake, 100 * COIN);
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].kind, PayoutKind::BettingPayout);
    assert_eq!(infos[0].bet_key, BetKey::new(500, OutPoint::new(Txid::from_byte(0xa1), 0)));

    let bet: BetRecord = store
        .bets
        .read(&params.ser_ctx(), &infos[0].bet_key)
        .unwrap()
        .unwrap();
    assert!(bet.completed);
    assert_eq!(bet.result, BetResult::Win);
    assert_eq!(bet.payout, 250 * COIN);
    assert_eq!(bet.payout_height, 601);
}

/// A bet landing inside the pre-start timeout refunds at even odds.
#[test]
fn test_pre_start_timeout_refund() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    // event starts 30 seconds after the bet block's time; timeout is 120
    let start_time = (block_time(500) + 30) as u64;
    apply_block(
        &mut store,
        &params,
        400,
        &[oracle_env(0x01, BettingTx::EventCreate(moneyline_event(100, start_time)))],
    );
    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(
            0xa1,
            "RAlice",
            100 * COIN,
            BettingTx::PeerlessBet(Leg::new(100, Outcome::MoneyLineHome)),
        )],
    );
    apply_block(
        &mut store,
        &params,
        600,
        &[oracle_env(0x02, BettingTx::Result(ResultTx {
            event_id: 100,
            kind: crate::constants::ResultKind::Standard,
            home_score: 2,
            away_score: 1,
        }))],
    );

    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(600, 7), &params).unwrap();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].value, 100 * COIN);
    assert_eq!(infos[0].kind, PayoutKind::BettingRefund);

    let bet: BetRecord = store
        .bets
        .read(&params.ser_ctx(), &infos[0].bet_key)
        .unwrap()
        .unwrap();
    assert_eq!(bet.result, BetResult::Refund);
}

/// Three-leg parlay with two moneyline wins and a spread push: the push
/// contributes even odds and the bet classifies as a partial win.
#[test]
fn test_parlay_with_push_is_partial_win() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    let mut ev1 = moneyline_event(1, 1_000_000);
    ev1.home_odds = 20000;
    let mut ev2 = moneyline_event(2, 1_000_000);
    ev2.away_odds = 30000;
    // home favorite gives exactly one goal: a 2-1 home win pushes
    let ev3 = moneyline_event(3, 1_000_000);
    apply_block(
        &mut store,
        &params,
        400,
        &[
            oracle_env(0x01, BettingTx::EventCreate(ev1)),
            oracle_env(0x02, BettingTx::EventCreate(ev2)),
            oracle_env(0x03, BettingTx::EventCreate(ev3)),
            oracle_env(0x04, BettingTx::Spreads(SpreadsEventTx {
                event_id: 3,
                points: 100,
                home_odds: 19000,
                away_odds: 19000,
            })),
        ],
    );
    // event 3's moneyline reads home as favorite (25000 > 20000 is away;
    // flip so home gives the points)
    apply_block(
        &mut store,
        &params,
        401,
        &[oracle_env(0x05, BettingTx::UpdateOdds(crate::tx::UpdateOddsTx {
            event_id: 3,
            home_odds: 15000,
            away_odds: 30000,
            draw_odds: 35000,
        }))],
    );

    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(
            0xb1,
            "RBob",
            10 * COIN,
            BettingTx::ParlayBet(vec![
                Leg::new(1, Outcome::MoneyLineHome),
                Leg::new(2, Outcome::MoneyLineAway),
                Leg::new(3, Outcome::SpreadHome),
            ]),
        )],
    );

    let standard = |txid: u8, event_id: u32, home: u32, away: u32| {
        oracle_env(txid, BettingTx::Result(ResultTx {
            event_id,
            kind: crate::constants::ResultKind::Standard,
            home_score: home,
            away_score: away,
        }))
    };
    apply_block(
        &mut store,
        &params,
        600,
        &[standard(0x06, 1, 3, 0), standard(0x07, 2, 0, 1), standard(0x08, 3, 2, 1)],
    );

    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(600, 7), &params).unwrap();
    assert_eq!(outs.len(), 1);
    // 2.0 x 3.0 x 1.0 on a 10 coin stake
    assert_eq!(outs[0].value, 60 * COIN);
    assert_eq!(infos[0].kind, PayoutKind::BettingPayout);

    let bet: BetRecord = store
        .bets
        .read(&params.ser_ctx(), &infos[0].bet_key)
        .unwrap()
        .unwrap();
    assert_eq!(bet.result, BetResult::PartialWin);
}

/// Two-ticket lottery: the stake hash picks the winner, who takes 80% of
/// the pot while the operator takes 2%.
#[test]
fn test_chain_games_two_entrants() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        150,
        &[oracle_env(0x01, BettingTx::ChainGamesEvent(ChainGamesEventTx {
            event_id: 8,
            entry_fee: 10,
        }))],
    );
    apply_block(
        &mut store,
        &params,
        200,
        &[player_env(0xa1, "RAnna", 10 * COIN, BettingTx::ChainGamesBet(ChainGamesBetTx {
            event_id: 8,
        }))],
    );
    apply_block(
        &mut store,
        &params,
        201,
        &[player_env(0xb1, "RBert", 10 * COIN, BettingTx::ChainGamesBet(ChainGamesBetTx {
            event_id: 8,
        }))],
    );
    apply_block(
        &mut store,
        &params,
        210,
        &[oracle_env(0x02, BettingTx::ChainGamesResult(ChainGamesResultTx { event_id: 8 }))],
    );

    // pos hash 7 mod 2 entrants = 1: the second ticket wins
    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(210, 7), &params).unwrap();
    assert_eq!(outs.len(), 2);
    assert_eq!(outs[0].value, 16 * COIN);
    assert_eq!(outs[0].script, script_for_destination(&Address::new("RBert")));
    assert_eq!(outs[0].event_id, 8);
    assert_eq!(outs[1].value, 4 * COIN / 10);
    assert_eq!(outs[1].script, script_for_destination(&Address::new("ROperator")));
    assert_eq!(infos[0].kind, PayoutKind::ChainGamesPayout);
    assert_eq!(infos[1].kind, PayoutKind::ChainGamesReward);

    // both tickets completed, only the winner carries a payout
    let ctx = params.ser_ctx();
    let anna: ChainGamesBetRecord = store
        .cg_bets
        .read(&ctx, &BetKey::new(200, OutPoint::new(Txid::from_byte(0xa1), 0)))
        .unwrap()
        .unwrap();
    let bert: ChainGamesBetRecord = store
        .cg_bets
        .read(&ctx, &BetKey::new(201, OutPoint::new(Txid::from_byte(0xb1), 0)))
        .unwrap()
        .unwrap();
    assert!(anna.completed && bert.completed);
    assert_eq!(anna.payout, 0);
    assert_eq!(bert.payout, 16 * COIN);
}

/// Single-ticket lottery refunds the entrant.
#[test]
fn test_chain_games_single_entrant_refund() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        150,
        &[oracle_env(0x01, BettingTx::ChainGamesEvent(ChainGamesEventTx {
            event_id: 8,
            entry_fee: 10,
        }))],
    );
    apply_block(
        &mut store,
        &params,
        200,
        &[player_env(0xa1, "RAnna", 10 * COIN, BettingTx::ChainGamesBet(ChainGamesBetTx {
            event_id: 8,
        }))],
    );
    apply_block(
        &mut store,
        &params,
        210,
        &[oracle_env(0x02, BettingTx::ChainGamesResult(ChainGamesResultTx { event_id: 8 }))],
    );

    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(210, 7), &params).unwrap();
    assert_eq!(outs.len(), 1);
    assert_eq!(outs[0].value, 10 * COIN);
    assert_eq!(infos[0].kind, PayoutKind::ChainGamesRefund);
}

/// Field bets live in their own tables with full liability accounting,
/// but the payout vector carries only peerless, chain-games and
/// quick-games outputs: a posted field result emits nothing.
#[test]
fn test_field_bets_emit_no_payout_outputs() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        400,
        &[
            oracle_env(0x01, BettingTx::Mapping(MappingTx {
                kind: MappingKind::IndividualSport,
                id: 5,
                name: "horse racing".into(),
            })),
            oracle_env(0x02, BettingTx::FieldEvent(FieldEventTx {
                event_id: 900,
                start_time: 1_000_000,
                group_type: 1,
                market_type: 1,
                sport: 5,
                tournament: 6,
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
        ],
    );
    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(
            0xc1,
            "RCara",
            10 * COIN,
            BettingTx::FieldBet(vec![FieldLeg::new(900, FieldMarket::Outright, 1)]),
        )],
    );
    apply_block(
        &mut store,
        &params,
        600,
        &[oracle_env(0x03, BettingTx::FieldResult(FieldResultTx {
            event_id: 900,
            kind: FieldResultKind::Standard,
            places: [(1u32, 1u8), (2, 2), (3, 3), (4, 0)].into_iter().collect(),
        }))],
    );

    let ctx = params.ser_ctx();
    let bet_key = BetKey::new(500, OutPoint::new(Txid::from_byte(0xc1), 0));
    let locked_odds = {
        let bet: FieldBetRecord = store.field_bets.read(&ctx, &bet_key).unwrap().unwrap();
        bet.locked_events[0].odds_for(FieldMarket::Outright, 1)
    };
    assert!(locked_odds > ODDS_DIVISOR);

    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(600, 7), &params).unwrap();
    assert!(outs.is_empty());
    assert!(infos.is_empty());

    // the record stays open and untouched by the payout pass
    let bet: FieldBetRecord = store.field_bets.read(&ctx, &bet_key).unwrap().unwrap();
    assert!(!bet.completed);
    assert_eq!(bet.result, BetResult::Unknown);

    // the live event accumulated the bet's liability at placement
    let event: FieldEventRecord = store.field_events.read(&ctx, &900u32).unwrap().unwrap();
    let contender = &event.contenders[&1];
    assert_eq!(contender.outright_bets, 1);
    assert_eq!(
        contender.outright_liability,
        10 * COIN * (locked_odds - ODDS_DIVISOR) as Amount / ODDS_DIVISOR as Amount
    );
}

/// Dice quick game: an even-sum wager settles against the next block's
/// stake hash, fee carved out of winnings and split into rewards.
#[test]
fn test_quick_games_dice_settlement() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(0xd1, "RDana", 10 * COIN, BettingTx::QuickGamesBet(QuickGamesBetTx {
            game: QuickGameKind::Dice,
            bet_info: vec![DICE_EVEN],
        }))],
    );

    // seed 14 rolls (3,3): even, odds 2.0x
    let (outs, infos) = get_betting_payouts(&mut store, &prev_ref(500, 14), &params).unwrap();
    let d = ODDS_DIVISOR as Amount;
    // fee: stake * (odds - D)/D * 2% of winnings
    let fee = 10 * COIN * d / d * 20 / 1000;
    let expected_payout = (10 * COIN * 2 * d - fee * d) / d;
    assert_eq!(outs[0].value, expected_payout);
    assert_eq!(infos[0].kind, PayoutKind::QuickGamesPayout);
    // dev and operator reward outputs follow, in script order
    let reward_sum: Amount = outs[1..].iter().map(|o| o.value).sum();
    assert_eq!(reward_sum, fee * 400 / 1000 + fee * 600 / 1000);
    assert!(infos[1..].iter().all(|i| i.kind == PayoutKind::QuickGamesReward));

    // a losing wager yields no output
    let mut store2 = BettingStore::new();
    apply_block(
        &mut store2,
        &params,
        500,
        &[player_env(0xd2, "RDana", 10 * COIN, BettingTx::QuickGamesBet(QuickGamesBetTx {
            game: QuickGameKind::Dice,
            bet_info: vec![DICE_EVEN],
        }))],
    );
    // seed 8 rolls (2,3): sum 5, odd, the even wager loses
    let (outs2, _) = get_betting_payouts(&mut store2, &prev_ref(500, 8), &params).unwrap();
    assert!(outs2.is_empty());
}

/// Payout computation is a pure function of the store snapshot.
#[test]
fn test_payout_determinism() {
    let params = ChainParams::regtest();
    let mut store = BettingStore::new();

    apply_block(
        &mut store,
        &params,
        400,
        &[oracle_env(0x01, BettingTx::EventCreate(moneyline_event(100, 1_000_000)))],
    );
    apply_block(
        &mut store,
        &params,
        500,
        &[player_env(
            0xa1,
            "RAlice",
            100 * COIN,
            BettingTx::PeerlessBet(Leg::new(100, Outcome::MoneyLineHome)),
        )],
    );
    apply_block(
        &mut store,
        &params,
        600,
        &[oracle_env(0x02, BettingTx::Result(ResultTx {
            event_id: 100,
            kind: crate::constants::ResultKind::Standard,
            home_score: 2,
            away_score: 1,
        }))],
    );

    let mut a = store.clone();
    let mut b = store.clone();
    let pa = get_betting_payouts(&mut a, &prev_ref(600, 7), &params).unwrap();
    let pb = get_betting_payouts(&mut b, &prev_ref(600, 7), &params).unwrap();
    assert_eq!(pa, pb);
    assert_eq!(a.snapshot(), b.snapshot());
}

/// Block validation accepts exactly the required outputs in order and
/// rejects reordering or value drift.
#[test]
fn test_block_payout_validation() {
    let alice = script_for_destination(&Address::new("RAlice"));
    let bob = script_for_destination(&Address::new("RBob"));
    let expected = vec![
        crate::types::BetOut::new(250 * COIN, alice.clone(), 100 * COIN),
        crate::types::BetOut::new(40 * COIN, bob.clone(), 0),
    ];
    let stake = crate::types::TxOut { value: 120 * COIN, script: script_for_destination(&Address::new("RMiner")) };

    let good = vec![
        stake.clone(),
        crate::types::TxOut { value: 250 * COIN, script: alice.clone() },
        crate::types::TxOut { value: 40 * COIN, script: bob.clone() },
    ];
    assert!(is_block_payouts_valid(&expected, &good, 601, 120 * COIN, 0));

    let reordered = vec![
        stake.clone(),
        crate::types::TxOut { value: 40 * COIN, script: bob.clone() },
        crate::types::TxOut { value: 250 * COIN, script: alice.clone() },
    ];
    assert!(!is_block_payouts_valid(&expected, &reordered, 601, 120 * COIN, 0));

    let short_paid = vec![
        stake.clone(),
        crate::types::TxOut { value: 249 * COIN, script: alice.clone() },
        crate::types::TxOut { value: 40 * COIN, script: bob.clone() },
    ];
    assert!(!is_block_payouts_valid(&expected, &short_paid, 601, 120 * COIN, 0));

    let missing = vec![stake.clone(), crate::types::TxOut { value: 250 * COIN, script: alice }];
    assert!(!is_block_payouts_valid(&expected, &missing, 601, 120 * COIN, 0));

    // over-minting in the stake head fails even with payouts intact
    assert!(!is_block_payouts_valid(&expected, &good, 601, 100 * COIN, 0));
}
