use crate::codec::{BetDecode, BetEncode, Reader, SerCtx, Writer};
use crate::constants::{BetResult, QuickGameKind};
use crate::error::CodecError;
use crate::types::{Address, Amount};

/// A quick-games wager: settled against the next block's proof-of-stake
/// hash by the game's pure handler function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickGamesBetRecord {
    pub game: QuickGameKind,
    /// Opaque per-game wager description, interpreted by the handler.
    pub bet_info: Vec<u8>,
    pub amount: Amount,
    pub player: Address,
    pub bet_time: i64,
    pub result: BetResult,
    pub payout: Amount,
    pub completed: bool,
}

impl QuickGamesBetRecord {
    pub fn new(
        game: QuickGameKind,
        bet_info: Vec<u8>,
        amount: Amount,
        player: Address,
        bet_time: i64,
    ) -> Self {
        QuickGamesBetRecord {
            game,
            bet_info,
            amount,
            player,
            bet_time,
            result: BetResult::Unknown,
            payout: 0,
            completed: false,
        }
    }

    pub fn complete(&mut self, result: BetResult, payout: Amount) {
        self.completed = true;
        self.result = result;
        self.payout = payout;
    }

    pub fn reset_completion(&mut self) {
        self.completed = false;
        self.result = BetResult::Unknown;
        self.payout = 0;
    }
}

impl BetEncode for QuickGamesBetRecord {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u8(self.game as u8);
        w.put_bytes(&self.bet_info);
        w.put_i64(self.amount);
        self.player.encode(w, ctx);
        w.put_i64(self.bet_time);
        w.put_u8(self.result as u8);
        w.put_i64(self.payout);
        w.put_bool(self.completed);
    }
}

impl BetDecode for QuickGamesBetRecord {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let raw_game = r.get_u8()?;
        let game = QuickGameKind::from_u8(raw_game)
            .ok_or(CodecError::BadDiscriminant { what: "quick game", value: raw_game })?;
        let bet_info = r.get_bytes()?;
        let amount = r.get_i64()?;
        let player = Address::decode(r, ctx)?;
        let bet_time = r.get_i64()?;
        let raw_res = r.get_u8()?;
        let result = BetResult::from_u8(raw_res)
            .ok_or(CodecError::BadDiscriminant { what: "bet result", value: raw_res })?;
        Ok(QuickGamesBetRecord {
            game,
            bet_info,
            amount,
            player,
            bet_time,
            result,
            payout: r.get_i64()?,
            completed: r.get_bool()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::COIN;

    #[test]
    fn test_quick_games_bet_round_trip() {
        let ctx = SerCtx { v3_height: 0 };
        let mut bet = QuickGamesBetRecord::new(
            QuickGameKind::Dice,
            vec![0, 7],
            2 * COIN,
            Address::new("TDice"),
            1234,
        );
        bet.complete(BetResult::Win, 12 * COIN);
        assert_eq!(QuickGamesBetRecord::from_bytes(&bet.to_bytes(&ctx), &ctx).unwrap(), bet);
    }
}
