//! Per-network consensus parameters. Everything the engine branches on
//! lives here; tests instantiate the regtest set.

use crate::codec::SerCtx;
use crate::constants::{QuickGameKind, COIN};
use crate::games::dice_handler;
use crate::types::{script_for_destination, Address, Amount, Hash256, Script};

/// One entry of the height-indexed oracle allow-list. The authority check
/// is exact script equality against the entries covering a height.
#[derive(Debug, Clone)]
pub struct OracleEpoch {
    pub script: Script,
    pub start_height: u32,
    pub end_height: u32,
}

impl OracleEpoch {
    pub fn covers(&self, height: u32) -> bool {
        height >= self.start_height && height < self.end_height
    }
}

/// Fee payout destinations active from `start_height` on.
#[derive(Debug, Clone)]
pub struct FeeEpoch {
    pub start_height: u32,
    pub dev_script: Script,
    pub operator_script: Script,
}

/// Pure settlement function of a quick game: (bet info, stake hash) ->
/// odds at the divisor.
pub type QuickGameHandler = fn(&[u8], &Hash256) -> u32;

/// Registry entry for one quick game.
#[derive(Debug, Clone)]
pub struct QuickGameView {
    pub name: &'static str,
    pub game: QuickGameKind,
    pub handler: QuickGameHandler,
    pub fee_permille: i64,
    pub dev_reward_permille: i64,
    pub operator_reward_permille: i64,
    /// Per-game developer reward destination.
    pub dev_script: Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

#[derive(Debug, Clone)]
pub struct ChainParams {
    pub network: Network,
    /// Activation height of the v3 betting protocol.
    pub v3_height: u32,
    /// Quick games stop settling at this height.
    pub quick_games_end_height: u32,
    /// Bet search window before v3, in blocks.
    pub bet_window_v2: u32,
    /// Bet search window from v3 on, in blocks.
    pub bet_window_v3: u32,
    /// Admission window for bet stakes, atoms.
    pub min_bet_amount: Amount,
    pub max_bet_amount: Amount,
    /// Payout clamp window, atoms: stakes outside it settle as refunds.
    pub min_bet_payout_range: Amount,
    pub max_bet_payout_range: Amount,
    /// Bets placed within this many seconds of the start time refund.
    pub place_timeout_secs: u64,
    /// House edge on winnings, permille.
    pub house_edge_permille: u32,
    /// Deepest reorganization the undo log must survive.
    pub max_reorg_depth: u32,
    pub oracles: Vec<OracleEpoch>,
    pub fee_epochs: Vec<FeeEpoch>,
    pub quick_games: Vec<QuickGameView>,
}

impl ChainParams {
    pub fn mainnet() -> Self {
        let oracle = script_for_destination(&Address::new("CBookOracleMainV1"));
        let oracle_v2 = script_for_destination(&Address::new("CBookOracleMainV2"));
        ChainParams {
            network: Network::Mainnet,
            v3_height: 1_501_000,
            quick_games_end_height: 2_000_000,
            bet_window_v2: 1440 * 14,
            bet_window_v3: 1440 * 14,
            min_bet_amount: 25 * COIN,
            max_bet_amount: 10_000 * COIN,
            min_bet_payout_range: 25 * COIN,
            max_bet_payout_range: 10_000 * COIN,
            place_timeout_secs: 120,
            house_edge_permille: 60,
            max_reorg_depth: 100,
            oracles: vec![
                OracleEpoch { script: oracle, start_height: 0, end_height: 1_501_000 },
                OracleEpoch { script: oracle_v2, start_height: 1_501_000, end_height: u32::MAX },
            ],
            fee_epochs: vec![FeeEpoch {
                start_height: 0,
                dev_script: script_for_destination(&Address::new("CBookDevFundMain")),
                operator_script: script_for_destination(&Address::new("CBookOperatorMain")),
            }],
            quick_games: vec![QuickGameView {
                name: "dice",
                game: QuickGameKind::Dice,
                handler: dice_handler,
                fee_permille: 20,
                dev_reward_permille: 400,
                operator_reward_permille: 600,
                dev_script: script_for_destination(&Address::new("CBookDiceDevMain")),
            }],
        }
    }

    pub fn testnet() -> Self {
        let mut params = Self::mainnet();
        params.network = Network::Testnet;
        params.v3_height = 1_100;
        params.quick_games_end_height = 1_000_000;
        params.min_bet_amount = COIN;
        params.min_bet_payout_range = COIN;
        params.oracles = vec![OracleEpoch {
            script: script_for_destination(&Address::new("TBookOracleTest")),
            start_height: 0,
            end_height: u32::MAX,
        }];
        params.fee_epochs = vec![FeeEpoch {
            start_height: 0,
            dev_script: script_for_destination(&Address::new("TBookDevFundTest")),
            operator_script: script_for_destination(&Address::new("TBookOperatorTest")),
        }];
        params
    }

    /// Low heights and permissive windows for unit tests: v3 from block
    /// 300, no house edge, tight reorg depth.
    pub fn regtest() -> Self {
        ChainParams {
            network: Network::Regtest,
            v3_height: 300,
            quick_games_end_height: 100_000,
            bet_window_v2: 100,
            bet_window_v3: 1_000,
            min_bet_amount: COIN,
            max_bet_amount: 10_000 * COIN,
            min_bet_payout_range: COIN,
            max_bet_payout_range: 10_000 * COIN,
            place_timeout_secs: 120,
            house_edge_permille: 0,
            max_reorg_depth: 60,
            oracles: vec![OracleEpoch {
                script: script_for_destination(&Address::new("ROracle")),
                start_height: 0,
                end_height: u32::MAX,
            }],
            fee_epochs: vec![FeeEpoch {
                start_height: 0,
                dev_script: script_for_destination(&Address::new("RDevFund")),
                operator_script: script_for_destination(&Address::new("ROperator")),
            }],
            quick_games: vec![QuickGameView {
                name: "dice",
                game: QuickGameKind::Dice,
                handler: dice_handler,
                fee_permille: 20,
                dev_reward_permille: 400,
                operator_reward_permille: 600,
                dev_script: script_for_destination(&Address::new("RDiceDev")),
            }],
        }
    }

    pub fn ser_ctx(&self) -> SerCtx {
        SerCtx { v3_height: self.v3_height }
    }

    pub fn is_v3(&self, height: u32) -> bool {
        height >= self.v3_height
    }

    /// First height the settlement scan seeks to when looking for open
    /// bets at `last_height`.
    pub fn bet_search_start(&self, last_height: u32) -> u32 {
        if last_height >= self.v3_height {
            if last_height >= self.bet_window_v3 {
                last_height - self.bet_window_v3
            } else {
                self.v3_height
            }
        } else if last_height >= self.bet_window_v2 {
            last_height - self.bet_window_v2
        } else {
            0
        }
    }

    /// Exact-equality oracle script check at a height.
    pub fn is_oracle_script(&self, script: &Script, height: u32) -> bool {
        self.oracles.iter().any(|o| o.covers(height) && o.script == *script)
    }

    /// Developer and operator fee destinations at a height.
    pub fn fee_payout_scripts(&self, height: u32) -> Option<(Script, Script)> {
        self.fee_epochs
            .iter()
            .filter(|e| e.start_height <= height)
            .max_by_key(|e| e.start_height)
            .map(|e| (e.dev_script.clone(), e.operator_script.clone()))
    }

    pub fn quick_game(&self, game: QuickGameKind) -> Option<&QuickGameView> {
        self.quick_games.iter().find(|g| g.game == game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_search_start_windows() {
        let p = ChainParams::regtest();
        // pre-v3 heights use the short window
        assert_eq!(p.bet_search_start(250), 150);
        assert_eq!(p.bet_search_start(50), 0);
        // v3 heights use the long window, clamped at the activation height
        assert_eq!(p.bet_search_start(600), 300);
        assert_eq!(p.bet_search_start(2_000), 1_000);
    }

    #[test]
    fn test_oracle_epochs_by_height() {
        let p = ChainParams::mainnet();
        let v1 = script_for_destination(&Address::new("CBookOracleMainV1"));
        let v2 = script_for_destination(&Address::new("CBookOracleMainV2"));
        assert!(p.is_oracle_script(&v1, 100));
        assert!(!p.is_oracle_script(&v1, 1_501_000));
        assert!(p.is_oracle_script(&v2, 1_501_000));
        assert!(!p.is_oracle_script(&v2, 100));
    }

    #[test]
    fn test_fee_scripts_present_on_every_network() {
        for p in [ChainParams::mainnet(), ChainParams::testnet(), ChainParams::regtest()] {
            assert!(p.fee_payout_scripts(1).is_some());
        }
    }
}
