//! Quick-games handlers: pure functions from (wager description, stake
//! hash) to a payout multiplier at the odds divisor.

use crate::constants::ODDS_DIVISOR;
use crate::types::Hash256;

/// Dice wager kinds carried in the first byte of the bet info.
pub const DICE_EXACT: u8 = 0;
pub const DICE_TOTAL_OVER: u8 = 1;
pub const DICE_TOTAL_UNDER: u8 = 2;
pub const DICE_EVEN: u8 = 3;
pub const DICE_ODD: u8 = 4;

/// Ways to roll each two-dice sum out of 36.
const WAYS: [u32; 13] = [0, 0, 1, 2, 3, 4, 5, 6, 5, 4, 3, 2, 1];

fn ways_over(target: u32) -> u32 {
    (target + 1..=12).map(|s| WAYS[s as usize]).sum()
}

fn ways_under(target: u32) -> u32 {
    (2..target.min(13)).map(|s| WAYS[s as usize]).sum()
}

/// Both dice of the roll seeded by the previous block's stake hash.
pub fn dice_roll(seed: &Hash256) -> (u32, u32) {
    let r = seed.mod_index(36) as u32;
    (r / 6 + 1, r % 6 + 1)
}

/// Whether a dice bet-info payload is well formed. Checked at admission so
/// a malformed wager never reaches settlement.
pub fn dice_bet_info_valid(info: &[u8]) -> bool {
    match info {
        [DICE_EXACT, t] => (2..=12).contains(t),
        [DICE_TOTAL_OVER, t] => (2..=11).contains(t),
        [DICE_TOTAL_UNDER, t] => (3..=12).contains(t),
        [DICE_EVEN] | [DICE_ODD] => true,
        _ => false,
    }
}

/// Dice settlement: odds are the fair 36-ways book for the wagered
/// proposition, zero for a loss or a malformed wager. The per-game fee
/// permille is applied by the payout engine, not here.
pub fn dice_handler(info: &[u8], seed: &Hash256) -> u32 {
    if !dice_bet_info_valid(info) {
        return 0;
    }
    let (d1, d2) = dice_roll(seed);
    let sum = d1 + d2;
    let d = ODDS_DIVISOR;
    match info {
        [DICE_EXACT, t] => {
            if sum == *t as u32 {
                36 * d / WAYS[sum as usize]
            } else {
                0
            }
        }
        [DICE_TOTAL_OVER, t] => {
            if sum > *t as u32 {
                36 * d / ways_over(*t as u32)
            } else {
                0
            }
        }
        [DICE_TOTAL_UNDER, t] => {
            if sum < *t as u32 {
                36 * d / ways_under(*t as u32)
            } else {
                0
            }
        }
        [DICE_EVEN] => {
            if sum % 2 == 0 {
                2 * d
            } else {
                0
            }
        }
        [DICE_ODD] => {
            if sum % 2 == 1 {
                2 * d
            } else {
                0
            }
        }
        _ => 0,
    }
}
