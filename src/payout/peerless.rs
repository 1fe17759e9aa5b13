//! Peerless bet settlement: scan the placement window for bets resolved
//! by the previous block's results, compute payouts, mark bets completed.

use tracing::debug;

use crate::constants::{PayoutKind, ODDS_DIVISOR, ResultKind};
use crate::error::Result;
use crate::params::ChainParams;
use crate::payout::SettleTotals;
use crate::state::bet::{BetKey, BetRecord};
use crate::state::payout_info::PayoutInfoRecord;
use crate::state::result::ResultRecord;
use crate::store::BettingStore;
use crate::types::{script_for_destination, Amount, BetOut};
use crate::utils::odds::{
    classify, leg_odds, parlay_odds, payout_amount, LegFlags, OddsPair,
};

const D: u64 = ODDS_DIVISOR as u64;

/// Whether the wager landed inside the pre-start timeout and refunds.
fn placed_too_late(bet_time: i64, start_time: u64, params: &ChainParams) -> bool {
    start_time > 0 && bet_time > start_time as i64 - params.place_timeout_secs as i64
}

pub(super) fn settle(
    store: &mut BettingStore,
    new_height: u32,
    params: &ChainParams,
    outs: &mut Vec<BetOut>,
    infos: &mut Vec<PayoutInfoRecord>,
) -> Result<SettleTotals> {
    let ctx = params.ser_ctx();
    let last_height = new_height - 1;
    let mut totals = SettleTotals::default();

    let results: Vec<ResultRecord> = store
        .results
        .scan_all::<u32, ResultRecord>(&ctx)?
        .into_iter()
        .map(|(_, r)| r)
        .filter(|r| r.posted_height == last_height)
        .collect();

    for result in results {
        if result.kind == ResultKind::EventClosed {
            continue;
        }
        debug!(target: "betting", event = result.event_id, "settling bets for result");

        let start = params.bet_search_start(last_height);
        let entries: Vec<(BetKey, BetRecord)> =
            store.bets.scan_from(&ctx, &BetKey::range_start(start))?;

        let mut updates: Vec<(BetKey, BetRecord)> = Vec::new();
        for (key, mut bet) in entries {
            let v3 = params.is_v3(key.height);
            if v3 && bet.completed {
                continue;
            }

            let mut flags = LegFlags::default();
            let mut completed = false;
            let mut final_odds = OddsPair::lose();

            if bet.is_parlay() {
                if bet.legs.iter().any(|l| l.event_id == result.event_id) {
                    // assume the parlay resolves now; drop the assumption if
                    // any leg is still missing its result
                    completed = true;
                    let mut pairs = Vec::with_capacity(bet.legs.len());
                    for (leg, locked) in bet.legs.iter().zip(&bet.locked_events) {
                        let Some(leg_result) =
                            store.results.read::<_, ResultRecord>(&ctx, &leg.event_id)?
                        else {
                            completed = false;
                            break;
                        };
                        let pair = if placed_too_late(bet.bet_time, locked.start_time, params) {
                            OddsPair::refund(v3)
                        } else {
                            let v3_event = params.is_v3(locked.creation_height);
                            leg_odds(
                                leg,
                                locked,
                                &leg_result,
                                v3,
                                v3_event,
                                params.house_edge_permille,
                            )
                        };
                        flags.note(pair, locked.odds_for(leg.outcome) as u64);
                        pairs.push(pair);
                    }
                    if completed {
                        final_odds = parlay_odds(&pairs);
                    }
                }
            } else if let (Some(leg), Some(locked)) = (bet.legs.first(), bet.locked_events.first())
            {
                if leg.event_id == result.event_id {
                    completed = true;
                    final_odds = if placed_too_late(bet.bet_time, locked.start_time, params) {
                        OddsPair::refund(v3)
                    } else if !v3
                        && last_height.saturating_sub(locked.creation_height)
                            > params.bet_window_v2
                    {
                        // stale v2 single bet: forced loss
                        OddsPair::lose()
                    } else {
                        let v3_event = params.is_v3(locked.creation_height);
                        leg_odds(leg, locked, &result, v3, v3_event, params.house_edge_permille)
                    };
                    flags.note(final_odds, locked.odds_for(leg.outcome) as u64);
                }
            }

            if !completed {
                continue;
            }

            if bet.amount < params.min_bet_payout_range || bet.amount > params.max_bet_payout_range
            {
                final_odds = OddsPair::refund(v3);
            }

            let effective: Amount;
            if v3 {
                effective = payout_amount(bet.amount, final_odds.effective);
                let gross = payout_amount(bet.amount, final_odds.onchain);
                totals.effective += effective as i128;
                totals.gross += gross as i128;
            } else {
                // legacy settlement: burn the house edge out of the winnings
                let gross = payout_amount(bet.amount, final_odds.onchain);
                let burn = if gross > bet.amount {
                    (gross - bet.amount) * params.house_edge_permille as Amount / 1000
                } else {
                    0
                };
                effective = gross - burn;
                totals.v2_volume += bet.amount as i128;
            }

            if effective > 0 {
                let kind = if final_odds.effective <= D {
                    PayoutKind::BettingRefund
                } else {
                    PayoutKind::BettingPayout
                };
                outs.push(BetOut::new(
                    effective,
                    script_for_destination(&bet.player),
                    bet.amount,
                ));
                infos.push(PayoutInfoRecord::new(key, kind));
            }

            let class =
                classify(bet.amount, effective, final_odds.onchain, bet.is_parlay(), flags);
            debug!(
                target: "betting",
                bet = %key.out,
                onchain = final_odds.onchain,
                effective_odds = final_odds.effective,
                payout = effective,
                "bet settled"
            );
            bet.complete(class, effective, new_height);
            updates.push((key, bet));
        }
        for (key, bet) in updates {
            store.bets.update(&ctx, &key, &bet);
        }
    }

    Ok(totals)
}
