//! Field-event market odds derivation.
//!
//! From oracle input odds, a book margin and per-contender probability
//! modifiers, derives outright (win), place (top two) and show (top three)
//! odds. Place and show probabilities use the Harville race model over the
//! normalized win probabilities. Everything is unsigned 128-bit fixed-point
//! at 10^12 scale with round-half-to-even at the odds-divisor boundary;
//! binary floating point would fork the chain on platform libm drift.

use std::collections::BTreeMap;

use crate::constants::ODDS_DIVISOR;

/// Fixed-point probability scale.
const PREC: u128 = 1_000_000_000_000;

/// Oracle-supplied inputs for one contender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContenderInput {
    pub input_odds: u32,
    /// Signed additive probability adjustment, percent scaled by the odds
    /// divisor (600 = +6 percentage points).
    pub modifier: i32,
}

/// Derived market odds for one contender; 0 means the market is closed or
/// the contender is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivedOdds {
    pub outright: u32,
    pub place: u32,
    pub show: u32,
}

/// `num / den` rounded half to even.
fn div_round_half_even(num: u128, den: u128) -> u128 {
    let q = num / den;
    let r = num % den;
    match (2 * r).cmp(&den) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => {
            if q % 2 == 0 {
                q
            } else {
                q + 1
            }
        }
    }
}

/// Probability (PREC scale) to margin-loaded market odds (divisor scale).
fn odds_from_prob(prob: u128, margin: u32) -> u32 {
    if prob == 0 {
        return 0;
    }
    let d = ODDS_DIVISOR as u128;
    let num = PREC * d * d;
    let den = prob * (d + margin as u128);
    div_round_half_even(num, den) as u32
}

/// Derive outright/place/show odds for every contender.
///
/// Contenders with zero input odds are absent: they keep zero odds and are
/// excluded from every normalization denominator. Place requires at least
/// three live contenders and show at least four; below the threshold the
/// market's odds are all zero.
pub fn derive_field_odds(
    inputs: &BTreeMap<u32, ContenderInput>,
    margin: u32,
) -> BTreeMap<u32, DerivedOdds> {
    let mut out: BTreeMap<u32, DerivedOdds> =
        inputs.keys().map(|id| (*id, DerivedOdds::default())).collect();

    let live: Vec<(u32, &ContenderInput)> =
        inputs.iter().filter(|(_, c)| c.input_odds != 0).map(|(id, c)| (*id, c)).collect();
    let n = live.len();
    if n < 2 {
        return out;
    }

    // implied probabilities, normalized to PREC
    let raw: Vec<u128> =
        live.iter().map(|(_, c)| PREC * ODDS_DIVISOR as u128 / c.input_odds as u128).collect();
    let raw_sum: u128 = raw.iter().sum();
    if raw_sum == 0 {
        return out;
    }

    // apply modifiers on the normalized probabilities, clamp at zero,
    // then renormalize
    let adjusted: Vec<u128> = live
        .iter()
        .zip(raw.iter())
        .map(|((_, c), r)| {
            let norm = (r * PREC / raw_sum) as i128;
            let shift = c.modifier as i128 * PREC as i128 / ODDS_DIVISOR as i128;
            (norm + shift).max(0) as u128
        })
        .collect();
    let adj_sum: u128 = adjusted.iter().sum();
    if adj_sum == 0 {
        return out;
    }
    let probs: Vec<u128> = adjusted.iter().map(|a| a * PREC / adj_sum).collect();

    for (i, (id, _)) in live.iter().enumerate() {
        let entry = out.get_mut(id).expect("live ids come from inputs");
        entry.outright = odds_from_prob(probs[i], margin);
    }

    if n >= 3 {
        for (i, (id, _)) in live.iter().enumerate() {
            let p2 = top2_probability(&probs, i);
            out.get_mut(id).expect("live ids come from inputs").place =
                odds_from_prob(p2.min(PREC), margin);
        }
    }

    if n >= 4 {
        for (i, (id, _)) in live.iter().enumerate() {
            let p3 = top3_probability(&probs, i);
            out.get_mut(id).expect("live ids come from inputs").show =
                odds_from_prob(p3.min(PREC), margin);
        }
    }

    out
}

/// Harville probability that contender `i` finishes first or second.
fn top2_probability(probs: &[u128], i: usize) -> u128 {
    let mut p = probs[i];
    for (j, pj) in probs.iter().enumerate() {
        if j == i {
            continue;
        }
        let den = PREC - pj;
        if den == 0 {
            continue;
        }
        p += pj * probs[i] / den;
    }
    p
}

/// Harville probability that contender `i` finishes in the top three:
/// top-2 probability plus the sum over ordered (first, second) pairs of
/// the conditional probability of finishing third.
fn top3_probability(probs: &[u128], i: usize) -> u128 {
    let mut p = top2_probability(probs, i);
    for (j, pj) in probs.iter().enumerate() {
        if j == i {
            continue;
        }
        for (k, pk) in probs.iter().enumerate() {
            if k == i || k == j {
                continue;
            }
            let den1 = PREC - pj;
            if den1 == 0 {
                continue;
            }
            let first_two = pj * pk / den1;
            let den2 = PREC.saturating_sub(pj + pk);
            if den2 == 0 {
                continue;
            }
            p += first_two * probs[i] / den2;
        }
    }
    p
}
