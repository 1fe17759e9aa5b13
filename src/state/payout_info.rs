use crate::codec::{BetDecode, BetEncode, KeyDecode, KeyEncode, Reader, SerCtx, Writer};
use crate::constants::PayoutKind;
use crate::error::CodecError;
use crate::state::bet::BetKey;

/// Why a payout output exists: which bet (by key) and what kind of payout.
/// Reward outputs use the zero outpoint at the payout height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PayoutInfoRecord {
    pub bet_key: BetKey,
    pub kind: PayoutKind,
}

impl PayoutInfoRecord {
    pub fn new(bet_key: BetKey, kind: PayoutKind) -> Self {
        PayoutInfoRecord { bet_key, kind }
    }

    /// Info record for a reward output emitted at `height`.
    pub fn reward(height: u32, kind: PayoutKind) -> Self {
        PayoutInfoRecord { bet_key: BetKey::range_start(height), kind }
    }
}

impl BetEncode for PayoutInfoRecord {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        let mut key = Vec::new();
        self.bet_key.encode_key(&mut key);
        w.put_raw(&key);
        w.put_u8(self.kind as u8);
    }
}

impl BetDecode for PayoutInfoRecord {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        let bet_key = BetKey::decode_key(r)?;
        let raw = r.get_u8()?;
        let kind = PayoutKind::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "payout kind", value: raw })?;
        Ok(PayoutInfoRecord { bet_key, kind })
    }
}
