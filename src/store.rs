//! Flushable key-value tables and the betting store view.
//!
//! Each logical table is an ordered map with an overlay: block processing
//! mutates the overlay, `flush` folds it into the base atomically and
//! `discard` drops it. Iteration merges base and overlay in key order,
//! which the payout engine relies on for its height-range scans.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::codec::{BetDecode, BetEncode, KeyDecode, KeyEncode, Reader, SerCtx};
use crate::error::Result;
use crate::state::undo::UndoEntry;
use crate::types::Txid;

/// Ordered byte map with a shadowing overlay. `None` in the overlay marks
/// a deletion pending flush.
#[derive(Debug, Default, Clone)]
pub struct FlushableKv {
    base: BTreeMap<Vec<u8>, Vec<u8>>,
    overlay: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl FlushableKv {
    pub fn exists(&self, key: &[u8]) -> bool {
        match self.overlay.get(key) {
            Some(slot) => slot.is_some(),
            None => self.base.contains_key(key),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        match self.overlay.get(key) {
            Some(slot) => slot.as_deref(),
            None => self.base.get(key).map(|v| v.as_slice()),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.overlay.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.overlay.insert(key, None);
    }

    /// Fold the overlay into the base.
    pub fn flush(&mut self) {
        let overlay = std::mem::take(&mut self.overlay);
        for (k, slot) in overlay {
            match slot {
                Some(v) => {
                    self.base.insert(k, v);
                }
                None => {
                    self.base.remove(&k);
                }
            }
        }
    }

    /// Drop the overlay without applying it.
    pub fn discard(&mut self) {
        self.overlay.clear();
    }

    /// Bytes held by the overlay, counted against the flush budget.
    pub fn overlay_bytes(&self) -> usize {
        self.overlay
            .iter()
            .map(|(k, v)| k.len() + v.as_ref().map(|v| v.len()).unwrap_or(0))
            .sum()
    }

    /// Ordered iteration over the merged view, starting at `start`.
    pub fn iter_from<'a>(&'a self, start: &[u8]) -> KvIter<'a> {
        KvIter {
            base: self.base.range(start.to_vec()..).peekable(),
            overlay: self.overlay.range(start.to_vec()..).peekable(),
        }
    }

    /// The fully merged table, for snapshot comparison in tests.
    pub fn merged(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.iter_from(&[]).map(|(k, v)| (k.to_vec(), v.to_vec())).collect()
    }
}

pub struct KvIter<'a> {
    base: std::iter::Peekable<btree_map::Range<'a, Vec<u8>, Vec<u8>>>,
    overlay: std::iter::Peekable<btree_map::Range<'a, Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> Iterator for KvIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        use std::cmp::Ordering;

        // 0 = take base, 1 = take overlay, 2 = overlay shadows base
        loop {
            let which = match (self.base.peek(), self.overlay.peek()) {
                (None, None) => return None,
                (Some(_), None) => 0,
                (None, Some(_)) => 1,
                (Some((bk, _)), Some((ok, _))) => match bk.cmp(ok) {
                    Ordering::Less => 0,
                    Ordering::Greater => 1,
                    Ordering::Equal => 2,
                },
            };
            if which == 0 {
                let (k, v) = self.base.next().expect("peeked");
                return Some((k.as_slice(), v.as_slice()));
            }
            if which == 2 {
                self.base.next();
            }
            let (k, slot) = self.overlay.next().expect("peeked");
            if let Some(v) = slot {
                return Some((k.as_slice(), v.as_slice()));
            }
        }
    }
}

/// One typed table of the betting store.
#[derive(Debug, Default, Clone)]
pub struct BettingDb {
    kv: FlushableKv,
}

impl BettingDb {
    pub fn exists<K: KeyEncode>(&self, key: &K) -> bool {
        self.kv.exists(&key.key_bytes())
    }

    /// Write-if-absent; `false` (not an error) when the key exists. Ingest
    /// leans on this for the id-uniqueness and result-written-once rules.
    pub fn write<K: KeyEncode, V: BetEncode>(&mut self, ctx: &SerCtx, key: &K, value: &V) -> bool {
        let k = key.key_bytes();
        if self.kv.exists(&k) {
            return false;
        }
        self.kv.put(k, value.to_bytes(ctx));
        true
    }

    /// Update-if-present; `false` when the key is missing.
    pub fn update<K: KeyEncode, V: BetEncode>(&mut self, ctx: &SerCtx, key: &K, value: &V) -> bool {
        let k = key.key_bytes();
        if !self.kv.exists(&k) {
            return false;
        }
        self.kv.put(k, value.to_bytes(ctx));
        true
    }

    /// Erase-if-present; `false` when the key is missing.
    pub fn erase<K: KeyEncode>(&mut self, key: &K) -> bool {
        let k = key.key_bytes();
        if !self.kv.exists(&k) {
            return false;
        }
        self.kv.delete(k);
        true
    }

    pub fn read<K: KeyEncode, V: BetDecode>(&self, ctx: &SerCtx, key: &K) -> Result<Option<V>> {
        match self.kv.get(&key.key_bytes()) {
            Some(bytes) => Ok(Some(V::from_bytes(bytes, ctx)?)),
            None => Ok(None),
        }
    }

    /// Decode every record from `start` to the end of the table, in key
    /// order. Settlement scans collect first and mutate after, the same
    /// shape as the original's iterate-then-update loops.
    pub fn scan_from<K, SK, V>(&self, ctx: &SerCtx, start: &SK) -> Result<Vec<(K, V)>>
    where
        K: KeyDecode,
        SK: KeyEncode,
        V: BetDecode,
    {
        let mut out = Vec::new();
        for (k, v) in self.kv.iter_from(&start.key_bytes()) {
            let mut r = Reader::new(k);
            let key = K::decode_key(&mut r)?;
            out.push((key, V::from_bytes(v, ctx)?));
        }
        Ok(out)
    }

    pub fn scan_all<K: KeyDecode, V: BetDecode>(&self, ctx: &SerCtx) -> Result<Vec<(K, V)>> {
        let mut out = Vec::new();
        for (k, v) in self.kv.iter_from(&[]) {
            let mut r = Reader::new(k);
            let key = K::decode_key(&mut r)?;
            out.push((key, V::from_bytes(v, ctx)?));
        }
        Ok(out)
    }

    pub fn flush(&mut self) {
        self.kv.flush();
    }

    pub fn discard(&mut self) {
        self.kv.discard();
    }

    pub fn overlay_bytes(&self) -> usize {
        self.kv.overlay_bytes()
    }

    pub fn merged(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.kv.merged()
    }

    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) -> bool {
        if self.kv.exists(&key) {
            return false;
        }
        self.kv.put(key, value);
        true
    }
}

/// Byte-exact image of every table, for the reorg identity checks.
pub type StoreSnapshot = BTreeMap<&'static str, BTreeMap<Vec<u8>, Vec<u8>>>;

/// The betting store: fourteen sub-databases plus the applied-height
/// marker. Callers hold exclusive access while a block applies; a single
/// `flush_all` commits the block's overlay atomically.
#[derive(Debug, Default, Clone)]
pub struct BettingStore {
    pub mappings: BettingDb,
    pub events: BettingDb,
    pub results: BettingDb,
    pub bets: BettingDb,
    pub field_events: BettingDb,
    pub field_results: BettingDb,
    pub field_bets: BettingDb,
    pub cg_events: BettingDb,
    pub cg_bets: BettingDb,
    pub cg_results: BettingDb,
    pub qg_bets: BettingDb,
    pub undos: BettingDb,
    pub payout_infos: BettingDb,
    pub failed_txs: BettingDb,
    last_height: u32,
    cache_budget_bytes: usize,
}

const DEFAULT_CACHE_BUDGET: usize = 4 << 20;

impl BettingStore {
    pub fn new() -> Self {
        Self::with_cache_budget(DEFAULT_CACHE_BUDGET)
    }

    pub fn with_cache_budget(cache_budget_bytes: usize) -> Self {
        BettingStore { cache_budget_bytes, ..Default::default() }
    }

    fn tables(&self) -> [(&'static str, &BettingDb); 14] {
        [
            ("mappings", &self.mappings),
            ("events", &self.events),
            ("results", &self.results),
            ("bets", &self.bets),
            ("fieldevents", &self.field_events),
            ("fieldresults", &self.field_results),
            ("fieldbets", &self.field_bets),
            ("cgevents", &self.cg_events),
            ("cgbets", &self.cg_bets),
            ("cgresults", &self.cg_results),
            ("qgbets", &self.qg_bets),
            ("undos", &self.undos),
            ("payoutsinfo", &self.payout_infos),
            ("failedtxs", &self.failed_txs),
        ]
    }

    fn tables_mut(&mut self) -> [&mut BettingDb; 14] {
        [
            &mut self.mappings,
            &mut self.events,
            &mut self.results,
            &mut self.bets,
            &mut self.field_events,
            &mut self.field_results,
            &mut self.field_bets,
            &mut self.cg_events,
            &mut self.cg_bets,
            &mut self.cg_results,
            &mut self.qg_bets,
            &mut self.undos,
            &mut self.payout_infos,
            &mut self.failed_txs,
        ]
    }

    /// Commit every table's overlay in one step.
    pub fn flush_all(&mut self) {
        for t in self.tables_mut() {
            t.flush();
        }
    }

    /// Drop every table's overlay.
    pub fn discard_all(&mut self) {
        for t in self.tables_mut() {
            t.discard();
        }
    }

    pub fn cache_bytes(&self) -> usize {
        self.tables().iter().map(|(_, t)| t.overlay_bytes()).sum()
    }

    /// Flush when the overlay outgrows the cache budget.
    pub fn flush_if_over_budget(&mut self) {
        if self.cache_bytes() > self.cache_budget_bytes {
            self.flush_all();
        }
    }

    pub fn set_last_height(&mut self, height: u32) {
        self.last_height = height;
    }

    pub fn last_height(&self) -> u32 {
        self.last_height
    }

    /// Fully merged byte image of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let mut snap: StoreSnapshot = self.tables().iter().map(|(n, t)| (*n, t.merged())).collect();
        snap.insert("lastheight", [(b"h".to_vec(), self.last_height.to_be_bytes().to_vec())].into());
        snap
    }

    // --- undo log ---

    pub fn save_undo(&mut self, ctx: &SerCtx, txid: Txid, entries: &Vec<UndoEntry>) -> bool {
        self.undos.write(ctx, &txid, entries)
    }

    pub fn get_undo(&self, ctx: &SerCtx, txid: Txid) -> Result<Option<Vec<UndoEntry>>> {
        self.undos.read(ctx, &txid)
    }

    pub fn erase_undo(&mut self, txid: Txid) -> bool {
        self.undos.erase(&txid)
    }

    /// Drop undo records whose every entry is older than `height`.
    pub fn prune_undos_below(&mut self, ctx: &SerCtx, height: u32) -> Result<()> {
        let all: Vec<(Txid, Vec<UndoEntry>)> = self.undos.scan_all(ctx)?;
        for (txid, entries) in all {
            if entries.iter().all(|e| e.height < height) {
                self.undos.erase(&txid);
            }
        }
        Ok(())
    }

    // --- failed-tx set ---

    pub fn save_failed_tx(&mut self, txid: Txid) -> bool {
        self.failed_txs.put_raw(txid.key_bytes(), vec![1])
    }

    pub fn failed_tx_exists(&self, txid: Txid) -> bool {
        self.failed_txs.exists(&txid)
    }

    pub fn erase_failed_tx(&mut self, txid: Txid) -> bool {
        self.failed_txs.erase(&txid)
    }
}
