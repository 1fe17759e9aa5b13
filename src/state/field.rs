use std::collections::BTreeMap;

use crate::codec::{
    get_contender_map, put_contender_map, BetDecode, BetEncode, Reader, SerCtx, Writer,
};
use crate::constants::{FieldMarket, FieldResultKind, ODDS_DIVISOR};
use crate::error::{BettingError, CodecError, Result};
use crate::tx::{FieldEventTx, FieldResultTx};
use crate::types::{Address, Amount};
use crate::utils::field_odds::{derive_field_odds, ContenderInput};

/// Per-contender odds and accumulators of a field event. Input odds and the
/// modifier come from the oracle; the market odds are derived.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContenderInfo {
    pub input_odds: u32,
    pub outright_odds: u32,
    pub outright_bets: u32,
    pub outright_liability: Amount,
    pub place_odds: u32,
    pub place_bets: u32,
    pub place_liability: Amount,
    pub show_odds: u32,
    pub show_bets: u32,
    pub show_liability: Amount,
    /// Signed additive adjustment to the contender's implied probability,
    /// in percent scaled by the odds divisor (600 = +6%).
    pub modifier: i32,
}

impl ContenderInfo {
    pub fn from_input(input_odds: u32, modifier: i32) -> Self {
        ContenderInfo { input_odds, modifier, ..Default::default() }
    }

    pub fn odds_for(&self, market: FieldMarket) -> u32 {
        match market {
            FieldMarket::Outright => self.outright_odds,
            FieldMarket::Place => self.place_odds,
            FieldMarket::Show => self.show_odds,
        }
    }
}

impl BetEncode for ContenderInfo {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.input_odds);
        w.put_u32(self.outright_odds);
        w.put_u32(self.outright_bets);
        w.put_i64(self.outright_liability);
        w.put_u32(self.place_odds);
        w.put_u32(self.place_bets);
        w.put_i64(self.place_liability);
        w.put_u32(self.show_odds);
        w.put_u32(self.show_bets);
        w.put_i64(self.show_liability);
        w.put_i32(self.modifier);
    }
}

impl BetDecode for ContenderInfo {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(ContenderInfo {
            input_odds: r.get_u32()?,
            outright_odds: r.get_u32()?,
            outright_bets: r.get_u32()?,
            outright_liability: r.get_i64()?,
            place_odds: r.get_u32()?,
            place_bets: r.get_u32()?,
            place_liability: r.get_i64()?,
            show_odds: r.get_u32()?,
            show_bets: r.get_u32()?,
            show_liability: r.get_i64()?,
            modifier: r.get_i32()?,
        })
    }
}

/// A field event: one market over a set of contenders (a race, a
/// tournament outright) with margin-loaded derived odds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldEventRecord {
    pub event_id: u32,
    pub start_time: u64,
    pub group_type: u8,
    pub market_type: u8,
    pub sport: u32,      // mapping id
    pub tournament: u32, // mapping id
    pub stage: u32,      // mapping id
    /// Book margin in percent scaled by the odds divisor (600 = 6%).
    pub margin_percent: u32,
    pub contenders: BTreeMap<u32, ContenderInfo>,
}

impl FieldEventRecord {
    pub fn from_create(tx: &FieldEventTx) -> Self {
        let mut ev = FieldEventRecord {
            event_id: tx.event_id,
            start_time: tx.start_time,
            group_type: tx.group_type,
            market_type: tx.market_type,
            sport: tx.sport,
            tournament: tx.tournament,
            stage: tx.stage,
            margin_percent: tx.margin_percent,
            contenders: tx
                .contenders
                .iter()
                .map(|(id, c)| (*id, ContenderInfo::from_input(c.input_odds, c.modifier)))
                .collect(),
        };
        ev.recalc_odds();
        ev
    }

    /// Independent value copy taken at bet placement.
    pub fn snapshot(&self) -> FieldEventRecord {
        self.clone()
    }

    /// Contenders with non-zero input odds take part in the market.
    pub fn live_contender_count(&self) -> u32 {
        self.contenders.values().filter(|c| c.input_odds != 0).count() as u32
    }

    /// Place needs at least three live contenders, show at least four.
    pub fn market_open(&self, market: FieldMarket) -> bool {
        let live = self.live_contender_count();
        match market {
            FieldMarket::Outright => live >= 2,
            FieldMarket::Place => live >= 3,
            FieldMarket::Show => live >= 4,
        }
    }

    /// Re-derive outright/place/show odds from the current inputs. Called
    /// after every oracle change to the inputs, margin or modifiers.
    pub fn recalc_odds(&mut self) {
        let inputs: BTreeMap<u32, ContenderInput> = self
            .contenders
            .iter()
            .map(|(id, c)| (*id, ContenderInput { input_odds: c.input_odds, modifier: c.modifier }))
            .collect();
        let derived = derive_field_odds(&inputs, self.margin_percent);
        for (id, c) in self.contenders.iter_mut() {
            let d = derived.get(id).copied().unwrap_or_default();
            c.outright_odds = d.outright;
            c.place_odds = d.place;
            c.show_odds = d.show;
        }
    }

    pub fn apply_update_odds(&mut self, contenders: &BTreeMap<u32, u32>) {
        for (id, input_odds) in contenders {
            self.contenders
                .entry(*id)
                .and_modify(|c| c.input_odds = *input_odds)
                .or_insert_with(|| ContenderInfo::from_input(*input_odds, 0));
        }
        self.recalc_odds();
    }

    pub fn apply_update_margin(&mut self, margin_percent: u32) {
        self.margin_percent = margin_percent;
        self.recalc_odds();
    }

    pub fn apply_update_modifiers(&mut self, modifiers: &BTreeMap<u32, i32>) {
        for (id, modifier) in modifiers {
            if let Some(c) = self.contenders.get_mut(id) {
                c.modifier = *modifier;
            }
        }
        self.recalc_odds();
    }

    pub fn odds_for(&self, market: FieldMarket, contender_id: u32) -> u32 {
        self.contenders.get(&contender_id).map(|c| c.odds_for(market)).unwrap_or(0)
    }

    /// Record an accepted bet on one contender in one market.
    pub fn add_bet(&mut self, market: FieldMarket, contender_id: u32, amount: Amount) -> Result<()> {
        let c = self.contenders.get_mut(&contender_id).ok_or_else(|| {
            BettingError::MalformedTransaction(format!("unknown contender {contender_id}"))
        })?;
        let odds = c.odds_for(market) as i64;
        let winnings = (amount as i128)
            .checked_mul((odds - ODDS_DIVISOR as i64) as i128)
            .map(|v| v / ODDS_DIVISOR as i128)
            .ok_or(BettingError::ArithmeticOverflow("field liability"))?;
        let winnings: Amount = winnings
            .try_into()
            .map_err(|_| BettingError::ArithmeticOverflow("field liability"))?;
        let (liability, bets) = match market {
            FieldMarket::Outright => (&mut c.outright_liability, &mut c.outright_bets),
            FieldMarket::Place => (&mut c.place_liability, &mut c.place_bets),
            FieldMarket::Show => (&mut c.show_liability, &mut c.show_bets),
        };
        *liability = liability
            .checked_add(winnings.max(0))
            .ok_or(BettingError::ArithmeticOverflow("field liability"))?;
        *bets = bets.checked_add(1).ok_or(BettingError::ArithmeticOverflow("field bet count"))?;
        Ok(())
    }
}

impl BetEncode for FieldEventRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u64(self.start_time);
        w.put_u8(self.group_type);
        w.put_u8(self.market_type);
        w.put_u32(self.sport);
        w.put_u32(self.tournament);
        w.put_u32(self.stage);
        w.put_u32(self.margin_percent);
        put_contender_map(w, ctx, &self.contenders);
    }
}

impl BetDecode for FieldEventRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(FieldEventRecord {
            event_id: r.get_u32()?,
            start_time: r.get_u64()?,
            group_type: r.get_u8()?,
            market_type: r.get_u8()?,
            sport: r.get_u32()?,
            tournament: r.get_u32()?,
            stage: r.get_u32()?,
            margin_percent: r.get_u32()?,
            contenders: get_contender_map(r, ctx)?,
        })
    }
}

/// Oracle-posted finishing order of a field event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldResultRecord {
    pub event_id: u32,
    pub kind: FieldResultKind,
    /// contenderId -> place (1..3), 0 for DNF, 255 for a single-contender
    /// refund.
    pub places: BTreeMap<u32, u8>,
    pub posted_height: u32,
}

impl FieldResultRecord {
    pub fn from_tx(tx: &FieldResultTx, height: u32) -> Self {
        FieldResultRecord {
            event_id: tx.event_id,
            kind: tx.kind,
            places: tx.places.clone(),
            posted_height: height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlaceByte(u8);

impl BetEncode for PlaceByte {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u8(self.0);
    }
}

impl BetDecode for PlaceByte {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(PlaceByte(r.get_u8()?))
    }
}

impl BetEncode for FieldResultRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u8(self.kind as u8);
        let places: BTreeMap<u32, PlaceByte> =
            self.places.iter().map(|(k, v)| (*k, PlaceByte(*v))).collect();
        put_contender_map(w, ctx, &places);
        w.put_u32(self.posted_height);
    }
}

impl BetDecode for FieldResultRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let event_id = r.get_u32()?;
        let raw = r.get_u8()?;
        let kind = FieldResultKind::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "field result kind", value: raw })?;
        let places: BTreeMap<u32, PlaceByte> = get_contender_map(r, ctx)?;
        Ok(FieldResultRecord {
            event_id,
            kind,
            places: places.into_iter().map(|(k, v)| (k, v.0)).collect(),
            posted_height: r.get_u32()?,
        })
    }
}

/// One (event, market, contender) pick of a field bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLeg {
    pub event_id: u32,
    pub market: FieldMarket,
    pub contender_id: u32,
}

impl FieldLeg {
    pub fn new(event_id: u32, market: FieldMarket, contender_id: u32) -> Self {
        FieldLeg { event_id, market, contender_id }
    }
}

impl BetEncode for FieldLeg {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u8(self.market as u8);
        w.put_u32(self.contender_id);
    }
}

impl BetDecode for FieldLeg {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        let event_id = r.get_u32()?;
        let raw = r.get_u8()?;
        let market = FieldMarket::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "field market", value: raw })?;
        Ok(FieldLeg { event_id, market, contender_id: r.get_u32()? })
    }
}

/// A recorded field bet, single or parlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBetRecord {
    pub amount: Amount,
    pub player: Address,
    pub legs: Vec<FieldLeg>,
    /// Field-event snapshots taken at placement, one per leg.
    pub locked_events: Vec<FieldEventRecord>,
    pub bet_time: i64,
    pub completed: bool,
    pub result: crate::constants::BetResult,
    pub payout: Amount,
    pub payout_height: u32,
}

impl FieldBetRecord {
    pub fn new(
        amount: Amount,
        player: Address,
        legs: Vec<FieldLeg>,
        locked_events: Vec<FieldEventRecord>,
        bet_time: i64,
    ) -> Self {
        debug_assert_eq!(legs.len(), locked_events.len());
        FieldBetRecord {
            amount,
            player,
            legs,
            locked_events,
            bet_time,
            completed: false,
            result: crate::constants::BetResult::Unknown,
            payout: 0,
            payout_height: 0,
        }
    }

    pub fn is_parlay(&self) -> bool {
        self.legs.len() > 1
    }

    pub fn complete(&mut self, result: crate::constants::BetResult, payout: Amount, height: u32) {
        self.completed = true;
        self.result = result;
        self.payout = payout;
        self.payout_height = height;
    }

    pub fn reset_completion(&mut self) {
        self.completed = false;
        self.result = crate::constants::BetResult::Unknown;
        self.payout = 0;
        self.payout_height = 0;
    }
}

impl BetEncode for FieldBetRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_i64(self.amount);
        self.player.encode(w, ctx);
        self.legs.encode(w, ctx);
        self.locked_events.encode(w, ctx);
        w.put_i64(self.bet_time);
        w.put_bool(self.completed);
        w.put_u8(self.result as u8);
        w.put_i64(self.payout);
        w.put_u32(self.payout_height);
    }
}

impl BetDecode for FieldBetRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let amount = r.get_i64()?;
        let player = Address::decode(r, ctx)?;
        let legs = Vec::<FieldLeg>::decode(r, ctx)?;
        let locked_events = Vec::<FieldEventRecord>::decode(r, ctx)?;
        let bet_time = r.get_i64()?;
        let completed = r.get_bool()?;
        let raw = r.get_u8()?;
        let result = crate::constants::BetResult::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "bet result", value: raw })?;
        Ok(FieldBetRecord {
            amount,
            player,
            legs,
            locked_events,
            bet_time,
            completed,
            result,
            payout: r.get_i64()?,
            payout_height: r.get_u32()?,
        })
    }
}
