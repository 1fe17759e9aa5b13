use crate::codec::{
    get_u32_be, put_u32_be, BetDecode, BetEncode, KeyDecode, KeyEncode, Reader, SerCtx, Writer,
};
use crate::constants::{BetResult, Outcome};
use crate::error::CodecError;
use crate::state::event::LockedEvent;
use crate::types::{Address, Amount, OutPoint};

/// Key of a bet record: placement height then funding outpoint, big-endian
/// so the payout engine can range-scan the placement window in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct BetKey {
    pub height: u32,
    pub out: OutPoint,
}

impl BetKey {
    pub fn new(height: u32, out: OutPoint) -> Self {
        BetKey { height, out }
    }

    /// Smallest key at `height`; seek target for range scans.
    pub fn range_start(height: u32) -> Self {
        BetKey { height, out: OutPoint::zero() }
    }
}

impl KeyEncode for BetKey {
    fn encode_key(&self, out: &mut Vec<u8>) {
        put_u32_be(out, self.height);
        self.out.encode_key(out);
    }
}

impl KeyDecode for BetKey {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let height = get_u32_be(r)?;
        let out = OutPoint::decode_key(r)?;
        Ok(BetKey { height, out })
    }
}

/// One (event, outcome) pair of a peerless bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leg {
    pub event_id: u32,
    pub outcome: Outcome,
}

impl Leg {
    pub fn new(event_id: u32, outcome: Outcome) -> Self {
        Leg { event_id, outcome }
    }
}

impl BetEncode for Leg {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u8(self.outcome as u8);
    }
}

impl BetDecode for Leg {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        let event_id = r.get_u32()?;
        let raw = r.get_u8()?;
        let outcome = Outcome::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "bet outcome", value: raw })?;
        Ok(Leg { event_id, outcome })
    }
}

/// A recorded peerless bet: single when one leg, parlay when 2..5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRecord {
    pub amount: Amount,
    pub player: Address,
    pub legs: Vec<Leg>,
    /// Event snapshots taken at placement, one per leg.
    pub locked_events: Vec<LockedEvent>,
    pub bet_time: i64,
    pub completed: bool,
    pub result: BetResult,
    pub payout: Amount,
    pub payout_height: u32,
}

impl BetRecord {
    pub fn new(
        amount: Amount,
        player: Address,
        legs: Vec<Leg>,
        locked_events: Vec<LockedEvent>,
        bet_time: i64,
    ) -> Self {
        debug_assert_eq!(legs.len(), locked_events.len());
        BetRecord {
            amount,
            player,
            legs,
            locked_events,
            bet_time,
            completed: false,
            result: BetResult::Unknown,
            payout: 0,
            payout_height: 0,
        }
    }

    pub fn is_parlay(&self) -> bool {
        self.legs.len() > 1
    }

    pub fn complete(&mut self, result: BetResult, payout: Amount, payout_height: u32) {
        self.completed = true;
        self.result = result;
        self.payout = payout;
        self.payout_height = payout_height;
    }

    /// Undo of `complete`.
    pub fn reset_completion(&mut self) {
        self.completed = false;
        self.result = BetResult::Unknown;
        self.payout = 0;
        self.payout_height = 0;
    }
}

impl BetEncode for BetRecord {
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

impl BetDecode for BetRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let amount = r.get_i64()?;
        let player = Address::decode(r, ctx)?;
        let legs = Vec::<Leg>::decode(r, ctx)?;
        let locked_events = Vec::<LockedEvent>::decode(r, ctx)?;
        let bet_time = r.get_i64()?;
        let completed = r.get_bool()?;
        let raw = r.get_u8()?;
        let result = BetResult::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "bet result", value: raw })?;
        Ok(BetRecord {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;
    use crate::types::Txid;

    #[test]
    fn test_bet_key_orders_by_height_then_outpoint() {
        let a = BetKey::new(500, OutPoint::new(Txid::from_byte(9), 0)).key_bytes();
        let b = BetKey::new(500, OutPoint::new(Txid::from_byte(9), 1)).key_bytes();
        let c = BetKey::new(501, OutPoint::new(Txid::from_byte(0), 0)).key_bytes();
        assert!(a < b && b < c);
        assert!(BetKey::range_start(500).key_bytes() <= a);
    }

    #[test]
    fn test_bet_record_round_trip() {
        let ctx = SerCtx { v3_height: 300 };
        let locked = LockedEvent { event_id: 7, creation_height: 600, ..Default::default() };
        let mut bet = BetRecord::new(
            25 * COIN,
            Address::new("TPlayer"),
            vec![Leg::new(7, Outcome::TotalOver)],
            vec![locked],
            1_600_000_000,
        );
        bet.complete(BetResult::Win, 50 * COIN, 777);
        let bytes = bet.to_bytes(&ctx);
        assert_eq!(BetRecord::from_bytes(&bytes, &ctx).unwrap(), bet);
    }

    #[test]
    fn test_parlay_round_trip_with_legacy_locked_event() {
        let ctx = SerCtx { v3_height: 300 };
        // one leg locked pre-v3 (carries the favorite flag), one post-v3
        let old = LockedEvent {
            event_id: 1,
            creation_height: 299,
            legacy_home_favorite: false,
            ..Default::default()
        };
        let new = LockedEvent { event_id: 2, creation_height: 301, ..Default::default() };
        let bet = BetRecord::new(
            10 * COIN,
            Address::new("TParlay"),
            vec![Leg::new(1, Outcome::MoneyLineHome), Leg::new(2, Outcome::SpreadAway)],
            vec![old, new],
            12345,
        );
        let bytes = bet.to_bytes(&ctx);
        let back = BetRecord::from_bytes(&bytes, &ctx).unwrap();
        assert_eq!(back, bet);
        assert!(!back.locked_events[0].legacy_home_favorite);
    }

    #[test]
    fn test_reset_completion_clears_settlement() {
        let mut bet = BetRecord::new(COIN, Address::new("a"), vec![], vec![], 0);
        bet.complete(BetResult::Refund, COIN, 10);
        bet.reset_completion();
        assert!(!bet.completed);
        assert_eq!(bet.result, BetResult::Unknown);
        assert_eq!(bet.payout, 0);
        assert_eq!(bet.payout_height, 0);
    }
}
