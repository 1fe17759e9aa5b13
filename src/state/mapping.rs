use crate::codec::{
    get_u32_be, put_u32_be, BetDecode, BetEncode, KeyDecode, KeyEncode, Reader, SerCtx, Writer,
};
use crate::constants::MappingKind;
use crate::error::CodecError;

/// Key of a mapping entry: namespace plus numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MappingKey {
    pub kind: MappingKind,
    pub id: u32,
}

impl MappingKey {
    pub fn new(kind: MappingKind, id: u32) -> Self {
        MappingKey { kind, id }
    }
}

impl KeyEncode for MappingKey {
    fn encode_key(&self, out: &mut Vec<u8>) {
        put_u32_be(out, self.kind as u32);
        put_u32_be(out, self.id);
    }
}

impl KeyDecode for MappingKey {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let kind_raw = get_u32_be(r)?;
        let kind = MappingKind::from_u8(kind_raw as u8).ok_or(CodecError::BadDiscriminant {
            what: "mapping kind",
            value: kind_raw as u8,
        })?;
        let id = get_u32_be(r)?;
        Ok(MappingKey { kind, id })
    }
}

/// Display name attached to a mapping id. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    pub name: String,
}

impl BetEncode for MappingRecord {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_string(&self.name);
    }
}

impl BetDecode for MappingRecord {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(MappingRecord { name: r.get_string()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_key_orders_by_kind_then_id() {
        let a = MappingKey::new(MappingKind::Sport, 500).key_bytes();
        let b = MappingKey::new(MappingKind::Round, 0).key_bytes();
        let c = MappingKey::new(MappingKind::Round, 1).key_bytes();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_mapping_key_round_trip() {
        let key = MappingKey::new(MappingKind::Contender, 77);
        assert_eq!(MappingKey::from_key_bytes(&key.key_bytes()).unwrap(), key);
    }
}
