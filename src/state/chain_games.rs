use crate::codec::{BetDecode, BetEncode, Reader, SerCtx, Writer};
use crate::error::CodecError;
use crate::types::{Address, Amount};

/// A chain-games lottery: fixed entry fee, one winner drawn from the
/// proof-of-stake hash when the result posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesEventRecord {
    pub event_id: u32,
    /// Ticket price in whole coins.
    pub entry_fee: u32,
}

impl BetEncode for ChainGamesEventRecord {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u32(self.entry_fee);
    }
}

impl BetDecode for ChainGamesEventRecord {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(ChainGamesEventRecord { event_id: r.get_u32()?, entry_fee: r.get_u32()? })
    }
}

/// One lottery ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesBetRecord {
    pub event_id: u32,
    pub amount: Amount,
    pub player: Address,
    pub bet_time: i64,
    pub completed: bool,
    pub payout: Amount,
    pub payout_height: u32,
}

impl ChainGamesBetRecord {
    pub fn new(event_id: u32, amount: Amount, player: Address, bet_time: i64) -> Self {
        ChainGamesBetRecord {
            event_id,
            amount,
            player,
            bet_time,
            completed: false,
            payout: 0,
            payout_height: 0,
        }
    }

    pub fn complete(&mut self, payout: Amount, height: u32) {
        self.completed = true;
        self.payout = payout;
        self.payout_height = height;
    }

    pub fn reset_completion(&mut self) {
        self.completed = false;
        self.payout = 0;
        self.payout_height = 0;
    }
}

impl BetEncode for ChainGamesBetRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_bool(self.completed);
        w.put_i64(self.amount);
        self.player.encode(w, ctx);
        w.put_i64(self.bet_time);
        w.put_i64(self.payout);
        w.put_u32(self.payout_height);
    }
}

impl BetDecode for ChainGamesBetRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let event_id = r.get_u32()?;
        let completed = r.get_bool()?;
        let amount = r.get_i64()?;
        let player = Address::decode(r, ctx)?;
        Ok(ChainGamesBetRecord {
            event_id,
            amount,
            player,
            bet_time: r.get_i64()?,
            completed,
            payout: r.get_i64()?,
            payout_height: r.get_u32()?,
        })
    }
}

/// Draw marker for a lottery: posting it triggers settlement next block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainGamesResultRecord {
    pub event_id: u32,
    pub posted_height: u32,
}

impl BetEncode for ChainGamesResultRecord {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u32(self.posted_height);
    }
}

impl BetDecode for ChainGamesResultRecord {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(ChainGamesResultRecord { event_id: r.get_u32()?, posted_height: r.get_u32()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;

    #[test]
    fn test_chain_games_records_round_trip() {
        let ctx = SerCtx { v3_height: 0 };

        let ev = ChainGamesEventRecord { event_id: 8, entry_fee: 10 };
        assert_eq!(
            ChainGamesEventRecord::from_bytes(&ev.to_bytes(&ctx), &ctx).unwrap(),
            ev
        );

        let mut bet = ChainGamesBetRecord::new(8, 10 * COIN, Address::new("TLotto"), 999);
        bet.complete(16 * COIN, 210);
        assert_eq!(ChainGamesBetRecord::from_bytes(&bet.to_bytes(&ctx), &ctx).unwrap(), bet);

        let res = ChainGamesResultRecord { event_id: 8, posted_height: 210 };
        assert_eq!(
            ChainGamesResultRecord::from_bytes(&res.to_bytes(&ctx), &ctx).unwrap(),
            res
        );
    }
}
