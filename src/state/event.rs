use crate::codec::{BetDecode, BetEncode, Reader, SerCtx, Writer};
use crate::constants::{Outcome, ODDS_DIVISOR};
use crate::error::{BettingError, CodecError, Result};
use crate::tx::{EventCreateTx, EventPatchTx, SpreadsEventTx, TotalsEventTx, UpdateOddsTx};
use crate::types::Amount;

/// Value snapshot of a peerless event, embedded into every bet that
/// references it. Never aliased to the live event record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockedEvent {
    pub event_id: u32,
    pub start_time: u64,
    pub sport: u32,       // mapping id
    pub tournament: u32,  // mapping id
    pub stage: u32,       // mapping id
    pub home_team: u32,   // mapping id
    pub away_team: u32,   // mapping id
    pub home_odds: u32,
    pub away_odds: u32,
    pub draw_odds: u32,
    pub spread_points: i32, // quarter-point units
    pub spread_home_odds: u32,
    pub spread_away_odds: u32,
    pub total_points: u32, // quarter-point units
    pub total_over_odds: u32,
    pub total_under_odds: u32,
    pub creation_height: u32,
    /// Stored favorite flag for events created before v3; after v3 the
    /// favorite is re-derived from the current moneyline odds.
    pub legacy_home_favorite: bool,
}

impl LockedEvent {
    pub fn from_create(tx: &EventCreateTx, height: u32) -> Self {
        LockedEvent {
            event_id: tx.event_id,
            start_time: tx.start_time,
            sport: tx.sport,
            tournament: tx.tournament,
            stage: tx.stage,
            home_team: tx.home_team,
            away_team: tx.away_team,
            home_odds: tx.home_odds,
            away_odds: tx.away_odds,
            draw_odds: tx.draw_odds,
            spread_points: 0,
            spread_home_odds: 0,
            spread_away_odds: 0,
            total_points: 0,
            total_over_odds: 0,
            total_under_odds: 0,
            creation_height: height,
            legacy_home_favorite: tx.home_odds <= tx.away_odds,
        }
    }

    /// Advertised odds for one outcome against this snapshot.
    pub fn odds_for(&self, outcome: Outcome) -> u32 {
        match outcome {
            Outcome::MoneyLineHome => self.home_odds,
            Outcome::MoneyLineAway => self.away_odds,
            Outcome::MoneyLineDraw => self.draw_odds,
            Outcome::SpreadHome => self.spread_home_odds,
            Outcome::SpreadAway => self.spread_away_odds,
            Outcome::TotalOver => self.total_over_odds,
            Outcome::TotalUnder => self.total_under_odds,
        }
    }

    fn encode_core(&self, w: &mut Writer) {
        w.put_u32(self.event_id);
        w.put_u64(self.start_time);
        w.put_u32(self.sport);
        w.put_u32(self.tournament);
        w.put_u32(self.stage);
        w.put_u32(self.home_team);
        w.put_u32(self.away_team);
        w.put_u32(self.home_odds);
        w.put_u32(self.away_odds);
        w.put_u32(self.draw_odds);
        w.put_i32(self.spread_points);
        w.put_u32(self.spread_home_odds);
        w.put_u32(self.spread_away_odds);
        w.put_u32(self.total_points);
        w.put_u32(self.total_over_odds);
        w.put_u32(self.total_under_odds);
    }

    fn decode_core(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(LockedEvent {
            event_id: r.get_u32()?,
            start_time: r.get_u64()?,
            sport: r.get_u32()?,
            tournament: r.get_u32()?,
            stage: r.get_u32()?,
            home_team: r.get_u32()?,
            away_team: r.get_u32()?,
            home_odds: r.get_u32()?,
            away_odds: r.get_u32()?,
            draw_odds: r.get_u32()?,
            spread_points: r.get_i32()?,
            spread_home_odds: r.get_u32()?,
            spread_away_odds: r.get_u32()?,
            total_points: r.get_u32()?,
            total_over_odds: r.get_u32()?,
            total_under_odds: r.get_u32()?,
            creation_height: 0,
            legacy_home_favorite: true,
        })
    }

    fn encode_tail(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.creation_height);
        if self.creation_height < ctx.v3_height {
            w.put_bool(self.legacy_home_favorite);
        }
    }

    fn decode_tail(&mut self, r: &mut Reader<'_>, ctx: &SerCtx) -> Result<(), CodecError> {
        self.creation_height = r.get_u32()?;
        if self.creation_height < ctx.v3_height {
            self.legacy_home_favorite = r.get_bool()?;
        }
        Ok(())
    }
}

impl BetEncode for LockedEvent {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        self.encode_core(w);
        self.encode_tail(w, ctx);
    }
}

impl BetDecode for LockedEvent {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let mut ev = Self::decode_core(r)?;
        ev.decode_tail(r, ctx)?;
        Ok(ev)
    }
}

/// Per-outcome liability and bet-count accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub liability: Amount,
    pub bets: u32,
}

/// The nine per-market accumulators of a live event. Liabilities only grow
/// while a block applies; undo restores the prior image wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarketTallies {
    pub ml_home: Tally,
    pub ml_away: Tally,
    pub ml_draw: Tally,
    pub spread_home: Tally,
    pub spread_away: Tally,
    pub spread_push: Tally,
    pub total_over: Tally,
    pub total_under: Tally,
    pub total_push: Tally,
}

impl MarketTallies {
    fn slots(&self) -> [&Tally; 9] {
        [
            &self.ml_home,
            &self.ml_away,
            &self.ml_draw,
            &self.spread_home,
            &self.spread_away,
            &self.spread_push,
            &self.total_over,
            &self.total_under,
            &self.total_push,
        ]
    }

    fn slots_mut(&mut self) -> [&mut Tally; 9] {
        [
            &mut self.ml_home,
            &mut self.ml_away,
            &mut self.ml_draw,
            &mut self.spread_home,
            &mut self.spread_away,
            &mut self.spread_push,
            &mut self.total_over,
            &mut self.total_under,
            &mut self.total_push,
        ]
    }

    pub fn slot_mut(&mut self, outcome: Outcome) -> &mut Tally {
        match outcome {
            Outcome::MoneyLineHome => &mut self.ml_home,
            Outcome::MoneyLineAway => &mut self.ml_away,
            Outcome::MoneyLineDraw => &mut self.ml_draw,
            Outcome::SpreadHome => &mut self.spread_home,
            Outcome::SpreadAway => &mut self.spread_away,
            Outcome::TotalOver => &mut self.total_over,
            Outcome::TotalUnder => &mut self.total_under,
        }
    }
}

/// Full live event record: the bettable snapshot plus accumulators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventRecord {
    pub base: LockedEvent,
    pub tally: MarketTallies,
}

impl EventRecord {
    pub fn from_create(tx: &EventCreateTx, height: u32) -> Self {
        EventRecord { base: LockedEvent::from_create(tx, height), tally: MarketTallies::default() }
    }

    /// Independent value copy taken at bet placement.
    pub fn snapshot(&self) -> LockedEvent {
        self.base.clone()
    }

    pub fn apply_update_odds(&mut self, tx: &UpdateOddsTx) {
        self.base.home_odds = tx.home_odds;
        self.base.away_odds = tx.away_odds;
        self.base.draw_odds = tx.draw_odds;
    }

    pub fn apply_spreads(&mut self, tx: &SpreadsEventTx) {
        self.base.spread_points = tx.points;
        self.base.spread_home_odds = tx.home_odds;
        self.base.spread_away_odds = tx.away_odds;
    }

    pub fn apply_totals(&mut self, tx: &TotalsEventTx) {
        self.base.total_points = tx.points;
        self.base.total_over_odds = tx.over_odds;
        self.base.total_under_odds = tx.under_odds;
    }

    pub fn apply_patch(&mut self, tx: &EventPatchTx) {
        self.base.start_time = tx.start_time;
    }

    /// Record an accepted bet on one outcome: the outcome's liability grows
    /// by the potential winnings `amount * (odds - D) / D`.
    pub fn add_bet(&mut self, outcome: Outcome, amount: Amount) -> Result<()> {
        let odds = self.base.odds_for(outcome) as i64;
        let winnings = (amount as i128)
            .checked_mul((odds - ODDS_DIVISOR as i64) as i128)
            .map(|v| v / ODDS_DIVISOR as i128)
            .ok_or(BettingError::ArithmeticOverflow("event liability"))?;
        let winnings: Amount = winnings
            .try_into()
            .map_err(|_| BettingError::ArithmeticOverflow("event liability"))?;
        let slot = self.tally.slot_mut(outcome);
        slot.liability = slot
            .liability
            .checked_add(winnings.max(0))
            .ok_or(BettingError::ArithmeticOverflow("event liability"))?;
        slot.bets = slot
            .bets
            .checked_add(1)
            .ok_or(BettingError::ArithmeticOverflow("event bet count"))?;
        Ok(())
    }
}

impl BetEncode for EventRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        self.base.encode_core(w);
        for t in self.tally.slots() {
            w.put_i64(t.liability);
        }
        for t in self.tally.slots() {
            w.put_u32(t.bets);
        }
        self.base.encode_tail(w, ctx);
    }
}

impl BetDecode for EventRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let mut base = LockedEvent::decode_core(r)?;
        let mut tally = MarketTallies::default();
        for t in tally.slots_mut() {
            t.liability = r.get_i64()?;
        }
        for t in tally.slots_mut() {
            t.bets = r.get_u32()?;
        }
        base.decode_tail(r, ctx)?;
        Ok(EventRecord { base, tally })
    }
}
