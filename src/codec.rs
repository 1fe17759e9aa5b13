//! Deterministic byte codec for every stored record.
//!
//! Keys serialize integers big-endian so lexicographic byte order equals
//! numeric order; the payout engine range-scans bet keys on this property.
//! Values use little-endian integers with u32 length prefixes for strings,
//! vectors and maps; map entries are emitted in ascending key order. Enum
//! discriminants are one byte. Event records created before the v3
//! activation height carry the legacy home-favorite flag after their
//! creation height, so encoding takes a context holding that height.

use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::types::{Address, Hash256, OutPoint, Txid};

/// Serialization context. The only protocol input the codec needs is the
/// v3 activation height, which gates the legacy event field suffix.
#[derive(Debug, Clone, Copy)]
pub struct SerCtx {
    pub v3_height: u32,
}

/// Byte sink for value encoding.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Writer { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bytes(&mut self, v: &[u8]) {
        self.put_u32(v.len() as u32);
        self.buf.extend_from_slice(v);
    }

    pub fn put_raw(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn put_string(&mut self, v: &str) {
        self.put_bytes(v.as_bytes());
    }
}

/// Byte source for value decoding.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof(self.pos));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn get_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn get_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn get_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn get_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.get_u32()? as usize;
        if len > self.remaining() {
            return Err(CodecError::OversizedLength { len, remaining: self.remaining() });
        }
        Ok(self.take(len)?.to_vec())
    }

    pub fn get_raw(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.take(n)
    }

    pub fn get_string(&mut self) -> Result<String, CodecError> {
        String::from_utf8(self.get_bytes()?).map_err(|_| CodecError::BadUtf8)
    }
}

/// Value encoding for stored records.
pub trait BetEncode {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx);

    fn to_bytes(&self, ctx: &SerCtx) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w, ctx);
        w.into_bytes()
    }
}

/// Value decoding for stored records.
pub trait BetDecode: Sized {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError>;

    /// Decode a full value buffer; trailing bytes are corruption.
    fn from_bytes(bytes: &[u8], ctx: &SerCtx) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let v = Self::decode(&mut r, ctx)?;
        if r.remaining() != 0 {
            return Err(CodecError::TrailingBytes(std::any::type_name::<Self>()));
        }
        Ok(v)
    }
}

impl<T: BetEncode> BetEncode for Vec<T> {
    fn encode(&self, w: &mut Writer, ctx: &SerCtx) {
        w.put_u32(self.len() as u32);
        for item in self {
            item.encode(w, ctx);
        }
    }
}

impl<T: BetDecode> BetDecode for Vec<T> {
    fn decode(r: &mut Reader<'_>, ctx: &SerCtx) -> Result<Self, CodecError> {
        let len = r.get_u32()? as usize;
        if len > r.remaining() {
            return Err(CodecError::OversizedLength { len, remaining: r.remaining() });
        }
        let mut v = Vec::with_capacity(len);
        for _ in 0..len {
            v.push(T::decode(r, ctx)?);
        }
        Ok(v)
    }
}

impl BetEncode for Address {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_string(&self.0);
    }
}

impl BetDecode for Address {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(Address(r.get_string()?))
    }
}

pub fn put_contender_map<V: BetEncode>(w: &mut Writer, ctx: &SerCtx, map: &BTreeMap<u32, V>) {
    w.put_u32(map.len() as u32);
    for (id, v) in map {
        w.put_u32(*id);
        v.encode(w, ctx);
    }
}

pub fn get_contender_map<V: BetDecode>(
    r: &mut Reader<'_>,
    ctx: &SerCtx,
) -> Result<BTreeMap<u32, V>, CodecError> {
    let len = r.get_u32()? as usize;
    if len > r.remaining() {
        return Err(CodecError::OversizedLength { len, remaining: r.remaining() });
    }
    let mut map = BTreeMap::new();
    for _ in 0..len {
        let id = r.get_u32()?;
        map.insert(id, V::decode(r, ctx)?);
    }
    Ok(map)
}

/// Key encoding: big-endian integers so byte order equals numeric order.
pub trait KeyEncode {
    fn encode_key(&self, out: &mut Vec<u8>);

    fn key_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_key(&mut out);
        out
    }
}

/// Key decoding, used when iterating ranges.
pub trait KeyDecode: Sized {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError>;

    fn from_key_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let v = Self::decode_key(&mut r)?;
        if r.remaining() != 0 {
            return Err(CodecError::TrailingBytes(std::any::type_name::<Self>()));
        }
        Ok(v)
    }
}

pub fn put_u32_be(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub fn get_u32_be(r: &mut Reader<'_>) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(r.get_raw(4)?.try_into().unwrap()))
}

impl KeyEncode for u32 {
    fn encode_key(&self, out: &mut Vec<u8>) {
        put_u32_be(out, *self);
    }
}

impl KeyDecode for u32 {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        get_u32_be(r)
    }
}

impl KeyEncode for Txid {
    fn encode_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl KeyDecode for Txid {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Txid(r.get_raw(32)?.try_into().unwrap()))
    }
}

impl KeyEncode for OutPoint {
    fn encode_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.txid.0);
        put_u32_be(out, self.n);
    }
}

impl KeyDecode for OutPoint {
    fn decode_key(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let txid = Txid::decode_key(r)?;
        let n = get_u32_be(r)?;
        Ok(OutPoint { txid, n })
    }
}

impl BetEncode for Hash256 {
    fn encode(&self, w: &mut Writer, _ctx: &SerCtx) {
        w.put_raw(&self.0);
    }
}

impl BetDecode for Hash256 {
    fn decode(r: &mut Reader<'_>, _ctx: &SerCtx) -> Result<Self, CodecError> {
        Ok(Hash256(r.get_raw(32)?.try_into().unwrap()))
    }
}
