//! Typed betting transactions, as handed to the engine by the transaction
//! parser. Parsing raw script payloads is the caller's concern; the engine
//! only sees these shapes.

use std::collections::BTreeMap;

use crate::constants::{FieldResultKind, MappingKind, QuickGameKind, ResultKind};
use crate::state::bet::Leg;
use crate::state::field::FieldLeg;
use crate::types::{Address, Amount, OutPoint, Script, Txid};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTx {
    pub kind: MappingKind,
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCreateTx {
    pub event_id: u32,
    pub start_time: u64,
    pub sport: u32,
    pub tournament: u32,
    pub stage: u32,
    pub home_team: u32,
    pub away_team: u32,
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOddsTx {
    pub event_id: u32,
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
}

/// Spread market line. Points are quarter-point units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsEventTx {
    pub event_id: u32,
    pub points: i32,
    pub home_odds: u32,
    pub away_odds: u32,
}

/// Totals market line. Points are quarter-point units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsEventTx {
    pub event_id: u32,
    pub points: u32,
    pub over_odds: u32,
    pub under_odds: u32,
}

/// A patch may only move the start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPatchTx {
    pub event_id: u32,
    pub start_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTx {
    pub event_id: u32,
    pub kind: ResultKind,
    pub home_score: u32,
    pub away_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldContenderInput {
    pub input_odds: u32,
    pub modifier: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEventTx {
    pub event_id: u32,
    pub start_time: u64,
    pub group_type: u8,
    pub market_type: u8,
    pub sport: u32,
    pub tournament: u32,
    pub stage: u32,
    pub margin_percent: u32,
    pub contenders: BTreeMap<u32, FieldContenderInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdateOddsTx {
    pub event_id: u32,
    /// contenderId -> new input odds; 0 withdraws the contender.
    pub contenders: BTreeMap<u32, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdateMarginTx {
    pub event_id: u32,
    pub margin_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdateModifiersTx {
    pub event_id: u32,
    pub modifiers: BTreeMap<u32, i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldResultTx {
    pub event_id: u32,
    pub kind: FieldResultKind,
    pub places: BTreeMap<u32, u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesEventTx {
    pub event_id: u32,
    /// Ticket price in whole coins.
    pub entry_fee: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesBetTx {
    pub event_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesResultTx {
    pub event_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickGamesBetTx {
    pub game: QuickGameKind,
    pub bet_info: Vec<u8>,
}

/// Every betting operation a transaction can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BettingTx {
    Mapping(MappingTx),
    EventCreate(EventCreateTx),
    UpdateOdds(UpdateOddsTx),
    Spreads(SpreadsEventTx),
    Totals(TotalsEventTx),
    EventPatch(EventPatchTx),
    Result(ResultTx),
    FieldEvent(FieldEventTx),
    FieldUpdateOdds(FieldUpdateOddsTx),
    FieldUpdateMargin(FieldUpdateMarginTx),
    FieldUpdateModifiers(FieldUpdateModifiersTx),
    FieldResult(FieldResultTx),
    /// Single peerless bet.
    PeerlessBet(Leg),
    /// Parlay of 2..5 peerless legs.
    ParlayBet(Vec<Leg>),
    /// Field bet, single or parlay of up to 5 legs.
    FieldBet(Vec<FieldLeg>),
    ChainGamesEvent(ChainGamesEventTx),
    ChainGamesBet(ChainGamesBetTx),
    ChainGamesResult(ChainGamesResultTx),
    QuickGamesBet(QuickGamesBetTx),
}

impl BettingTx {
    /// Operations only the oracle may perform.
    pub fn requires_oracle(&self) -> bool {
        matches!(
            self,
            BettingTx::Mapping(_)
                | BettingTx::EventCreate(_)
                | BettingTx::UpdateOdds(_)
                | BettingTx::Spreads(_)
                | BettingTx::Totals(_)
                | BettingTx::EventPatch(_)
                | BettingTx::Result(_)
                | BettingTx::FieldEvent(_)
                | BettingTx::FieldUpdateOdds(_)
                | BettingTx::FieldUpdateMargin(_)
                | BettingTx::FieldUpdateModifiers(_)
                | BettingTx::FieldResult(_)
                | BettingTx::ChainGamesEvent(_)
                | BettingTx::ChainGamesResult(_)
        )
    }

    pub fn is_bet(&self) -> bool {
        matches!(
            self,
            BettingTx::PeerlessBet(_)
                | BettingTx::ParlayBet(_)
                | BettingTx::FieldBet(_)
                | BettingTx::ChainGamesBet(_)
                | BettingTx::QuickGamesBet(_)
        )
    }
}

/// A betting transaction plus the chain context the engine needs: the
/// funding outpoint that keys bet records, the previous-output script of
/// the first input (for the oracle gate), the staked value, and the return
/// address for payouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEnvelope {
    pub txid: Txid,
    pub funding: OutPoint,
    pub input_prev_script: Script,
    pub amount: Amount,
    pub player: Address,
    pub payload: BettingTx,
}
