use crate::codec::{BetDecode, BetEncode, Reader, SerCtx, Writer};
use crate::error::CodecError;
use crate::state::event::EventRecord;
use crate::state::field::FieldEventRecord;

/// Prior image of an event record mutated in place. The numeric tags are
/// part of the on-disk format and must not change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoVariant {
    PeerlessEvent(EventRecord),
    FieldEvent(FieldEventRecord),
}

const UNDO_PEERLESS_EVENT: u8 = 0;
const UNDO_FIELD_EVENT: u8 = 1;

/// One entry of a transaction's undo log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub height: u32,
    pub entry: UndoVariant,
}

impl UndoEntry {
    pub fn peerless(event: EventRecord, height: u32) -> Self {
        UndoEntry { height, entry: UndoVariant::PeerlessEvent(event) }
    }

    pub fn field(event: FieldEventRecord, height: u32) -> Self {
        UndoEntry { height, entry: UndoVariant::FieldEvent(event) }
    }
}

impl BetEncode for UndoEntry {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.height);
        match &self.entry {
            UndoVariant::PeerlessEvent(ev) => {
                w.put_u8(UNDO_PEERLESS_EVENT);
                ev.encode(w, ctx);
            }
            UndoVariant::FieldEvent(ev) => {
                w.put_u8(UNDO_FIELD_EVENT);
                ev.encode(w, ctx);
            }
        }
    }
}

impl BetDecode for UndoEntry {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let height = r.get_u32()?;
        let tag = r.get_u8()?;
        let entry = match tag {
            UNDO_PEERLESS_EVENT => UndoVariant::PeerlessEvent(EventRecord::decode(r, ctx)?),
            UNDO_FIELD_EVENT => UndoVariant::FieldEvent(FieldEventRecord::decode(r, ctx)?),
            _ => return Err(CodecError::BadDiscriminant { what: "undo variant", value: tag }),
        };
        Ok(UndoEntry { height, entry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::EventCreateTx;

    #[test]
    fn test_undo_entry_round_trip() {
        let ctx = SerCtx { v3_height: 100 };
        let event = EventRecord::from_create(
            &EventCreateTx {
                event_id: 3,
                start_time: 50,
                sport: 1,
                tournament: 1,
                stage: 1,
                home_team: 1,
                away_team: 2,
                home_odds: 18000,
                away_odds: 21000,
                draw_odds: 30000,
            },
            200,
        );
        let entry = UndoEntry::peerless(event, 200);
        let bytes = vec![entry.clone()].to_bytes(&ctx);
        let back = Vec::<UndoEntry>::from_bytes(&bytes, &ctx).unwrap();
        assert_eq!(back, vec![entry]);
    }

    #[test]
    fn test_legacy_tags_are_stable() {
        let ctx = SerCtx { v3_height: 0 };
        let entry = UndoEntry::field(FieldEventRecord::default(), 9);
        let bytes = entry.to_bytes(&ctx);
        // height u32, then the variant tag
        assert_eq!(bytes[4], 1);
        let entry = UndoEntry::peerless(EventRecord::default(), 9);
        let bytes = entry.to_bytes(&ctx);
        assert_eq!(bytes[4], 0);
    }
}
