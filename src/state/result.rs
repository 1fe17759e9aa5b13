use crate::codec::{BetDecode, BetEncode, Reader, SerCtx, Writer};
use crate::constants::ResultKind;
use crate::error::CodecError;
use crate::tx::ResultTx;

/// Oracle-posted outcome of a peerless event. At most one per event; once
/// written the event is resulted and no longer bettable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub event_id: u32,
    pub kind: ResultKind,
    pub home_score: u32,
    pub away_score: u32,
    /// Height of the block that carried the result; the payout engine at
    /// height H settles against results posted at H - 1.
    pub posted_height: u32,
}

impl ResultRecord {
    pub fn from_tx(tx: &ResultTx, height: u32) -> Self {
        ResultRecord {
            event_id: tx.event_id,
            kind: tx.kind,
            home_score: tx.home_score,
            away_score: tx.away_score,
            posted_height: height,
        }
    }
}

impl BetEncode for ResultRecord {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_u32(self.event_id);
        w.put_u8(self.kind as u8);
        w.put_u32(self.home_score);
        w.put_u32(self.away_score);
        w.put_u32(self.posted_height);
    }
}

impl BetDecode for ResultRecord {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        let event_id = r.get_u32()?;
        let raw = r.get_u8()?;
        let kind = ResultKind::from_u8(raw)
            .ok_or(CodecError::BadDiscriminant { what: "result kind", value: raw })?;
        Ok(ResultRecord {
            event_id,
            kind,
            home_score: r.get_u32()?,
            away_score: r.get_u32()?,
            posted_height: r.get_u32()?,
        })
    }
}
