//! Peerless odds resolution: per-leg win/push/half outcomes, house-edge
//! application, parlay combination and final bet classification.

use crate::constants::{BetResult, Outcome, ResultKind, ODDS_DIVISOR};
use crate::state::bet::Leg;
use crate::state::event::LockedEvent;
use crate::state::result::ResultRecord;
use crate::types::Amount;

const D: u64 = ODDS_DIVISOR as u64;

/// The advertised multiplier and the player-reaching multiplier of a leg
/// or a whole bet. u64: five-leg parlay products overflow u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OddsPair {
    pub onchain: u64,
    pub effective: u64,
}

impl OddsPair {
    pub fn lose() -> Self {
        OddsPair { onchain: 0, effective: 0 }
    }

    /// Refund representation: D under v3, 0 before it.
    pub fn refund(v3: bool) -> Self {
        if v3 {
            OddsPair { onchain: D, effective: D }
        } else {
            OddsPair::lose()
        }
    }
}

/// Resolution of one market line against a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Win,
    /// Quarter line: half the stake wins, half pushes.
    HalfWin,
    Push,
    /// Quarter line: half the stake pushes, half loses.
    HalfLose,
    Lose,
}

/// Classify a line by its adjusted margin in quarter-point units: 25 is a
/// quarter point. Scores land on a 100-multiple grid, lines on a
/// 25-multiple grid, so margins are 25-multiples.
fn line_outcome(margin: i32) -> LineOutcome {
    if margin > 25 {
        LineOutcome::Win
    } else if margin == 25 {
        LineOutcome::HalfWin
    } else if margin > 0 {
        LineOutcome::Win
    } else if margin == 0 {
        LineOutcome::Push
    } else if margin == -25 {
        LineOutcome::HalfLose
    } else {
        LineOutcome::Lose
    }
}

/// Which side the spread favors. Stored at creation before v3, re-derived
/// from the current moneyline odds afterwards.
pub fn favorite_is_home(locked: &LockedEvent, v3: bool) -> bool {
    if v3 {
        locked.home_odds <= locked.away_odds
    } else {
        locked.legacy_home_favorite
    }
}

/// Adjusted spread margin for the home side, quarter-point units.
fn spread_margin(locked: &LockedEvent, home_score: u32, away_score: u32, v3: bool) -> i32 {
    let delta = (home_score as i64 - away_score as i64) as i32 * 100;
    if favorite_is_home(locked, v3) {
        delta - locked.spread_points
    } else {
        delta + locked.spread_points
    }
}

/// Market grouping of an outcome, used for market-specific refunds.
fn is_moneyline(outcome: Outcome) -> bool {
    matches!(outcome, Outcome::MoneyLineHome | Outcome::MoneyLineAway | Outcome::MoneyLineDraw)
}

fn is_spread(outcome: Outcome) -> bool {
    matches!(outcome, Outcome::SpreadHome | Outcome::SpreadAway)
}

fn is_total(outcome: Outcome) -> bool {
    matches!(outcome, Outcome::TotalOver | Outcome::TotalUnder)
}

/// Apply the global house edge to the winnings portion of a multiplier.
pub fn effective_from_onchain(onchain: u64, house_edge_permille: u32) -> u64 {
    if onchain <= D {
        onchain
    } else {
        D + (onchain - D) * (1000 - house_edge_permille as u64) / 1000
    }
}

/// Resolve one leg against its locked event and posted result. `v3`
/// selects the refund representation (the bet's protocol era); `v3_event`
/// selects the spread-favorite rule (the event's era).
pub fn leg_odds(
    leg: &Leg,
    locked: &LockedEvent,
    result: &ResultRecord,
    v3: bool,
    v3_event: bool,
    house_edge_permille: u32,
) -> OddsPair {
    let refunded = match result.kind {
        ResultKind::EventRefund => true,
        // a closed event cannot cost the player the stake
        ResultKind::EventClosed => true,
        ResultKind::MoneyLineRefund => is_moneyline(leg.outcome),
        ResultKind::SpreadsRefund => is_spread(leg.outcome),
        ResultKind::TotalsRefund => is_total(leg.outcome),
        ResultKind::Standard => false,
    };
    if refunded {
        return OddsPair::refund(v3);
    }

    let hs = result.home_score;
    let aw = result.away_score;
    let outcome = match leg.outcome {
        Outcome::MoneyLineHome => {
            if hs > aw {
                LineOutcome::Win
            } else {
                LineOutcome::Lose
            }
        }
        Outcome::MoneyLineAway => {
            if aw > hs {
                LineOutcome::Win
            } else {
                LineOutcome::Lose
            }
        }
        Outcome::MoneyLineDraw => {
            if hs == aw {
                LineOutcome::Win
            } else {
                LineOutcome::Lose
            }
        }
        Outcome::SpreadHome => line_outcome(spread_margin(locked, hs, aw, v3_event)),
        Outcome::SpreadAway => line_outcome(-spread_margin(locked, hs, aw, v3_event)),
        Outcome::TotalOver => {
            line_outcome((hs + aw) as i32 * 100 - locked.total_points as i32)
        }
        Outcome::TotalUnder => {
            line_outcome(locked.total_points as i32 - (hs + aw) as i32 * 100)
        }
    };

    let full = locked.odds_for(leg.outcome) as u64;
    match outcome {
        LineOutcome::Win => {
            OddsPair { onchain: full, effective: effective_from_onchain(full, house_edge_permille) }
        }
        LineOutcome::HalfWin => {
            let eff = effective_from_onchain(full, house_edge_permille);
            OddsPair { onchain: (full + D) / 2, effective: (eff + D) / 2 }
        }
        LineOutcome::Push => OddsPair::refund(v3),
        LineOutcome::HalfLose => {
            if v3 {
                OddsPair { onchain: D / 2, effective: D / 2 }
            } else {
                OddsPair::lose()
            }
        }
        LineOutcome::Lose => OddsPair::lose(),
    }
}

/// Multiply parlay legs together, dividing by the odds divisor after each
/// multiplication. A zero leg zeroes the whole parlay.
pub fn parlay_odds(pairs: &[OddsPair]) -> OddsPair {
    let mut it = pairs.iter();
    let mut acc = match it.next() {
        Some(first) => *first,
        None => return OddsPair::lose(),
    };
    for p in it {
        acc.onchain = ((acc.onchain as u128 * p.onchain as u128) / D as u128) as u64;
        acc.effective = ((acc.effective as u128 * p.effective as u128) / D as u128) as u64;
    }
    acc
}

/// Payout at the given multiplier, floored to atoms.
pub fn payout_amount(amount: Amount, odds: u64) -> Amount {
    ((amount as i128 * odds as i128) / D as i128) as Amount
}

/// Flags gathered while resolving the legs of a bet, feeding the final
/// win/partial classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegFlags {
    pub any_refund: bool,
    pub any_half_win: bool,
    pub any_half_lose: bool,
}

impl LegFlags {
    /// Note one resolved leg, matching the settlement scan's dispositions:
    /// refund at D, half-lose at D/2, half-win strictly between D and the
    /// advertised odds.
    pub fn note(&mut self, pair: OddsPair, potential: u64) {
        if pair.onchain == 0 {
        } else if pair.onchain == D {
            self.any_refund = true;
        } else if pair.onchain == D / 2 {
            self.any_half_lose = true;
        } else if pair.onchain < potential {
            self.any_half_win = true;
        }
    }
}

/// Final classification of a settled bet.
pub fn classify(
    amount: Amount,
    payout: Amount,
    final_onchain: u64,
    is_parlay: bool,
    flags: LegFlags,
) -> BetResult {
    if payout == 0 {
        BetResult::Lose
    } else if payout < amount {
        BetResult::PartialLose
    } else if final_onchain == D {
        BetResult::Refund
    } else if (!is_parlay && flags.any_half_win)
        || (is_parlay && (flags.any_half_win || flags.any_half_lose || flags.any_refund))
    {
        BetResult::PartialWin
    } else {
        BetResult::Win
    }
}
