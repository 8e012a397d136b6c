//! In-process bit store.
//!
//! [`MemoryStore`] executes the bit commands against a keyspace held in
//! memory, with the same bit ordering, range rules and overflow behaviour as
//! the remote server. Each call takes the keyspace lock once, so every
//! command (including a whole `BITFIELD` batch) is atomic.
//!
//! ```rust
//! use bit_store::{BitStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set_bit("visits", 7, true).unwrap();
//! assert_eq!(store.raw("visits"), Some(vec![0x01]));
//! assert!(store.get_bit("visits", 7).unwrap());
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::bit_ops;
use crate::{
    BitOp, BitRange, BitStore, Command, FieldOp, FieldType, Overflow, Result, StoreError,
    check_bit_offset,
};
use crate::trace;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    fn grow_to(&mut self, len: usize) {
        if self.bytes.len() < len {
            self.bytes.resize(len, 0);
        }
    }
}

type Keyspace = HashMap<String, Entry>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<Keyspace>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes currently stored under `key`.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        let mut keys = self.lock();
        live(&mut keys, key).map(|e| e.bytes.clone())
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Keyspace> {
        // Entries are only ever written through grown buffers, so a
        // poisoned keyspace is still consistent.
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run<T, F>(&self, command: Command<'_>, f: F) -> Result<T>
    where
        T: core::fmt::Debug,
        F: FnOnce(&mut Keyspace) -> Result<T>,
    {
        trace::command(BACKEND, &command.to_args());
        let mut keys = self.lock();
        let result = f(&mut *keys);
        drop(keys);
        trace::reply(BACKEND, &result);
        result
    }
}

/// Looks up `key`, dropping it first if its TTL has passed.
fn live<'a>(keys: &'a mut Keyspace, key: &str) -> Option<&'a mut Entry> {
    if keys.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
        keys.remove(key);
    }
    keys.get_mut(key)
}

fn live_or_create<'a>(keys: &'a mut Keyspace, key: &str) -> &'a mut Entry {
    if keys.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
        keys.remove(key);
    }
    keys.entry(key.to_owned()).or_default()
}

/// Applies `mode` to a value that may not fit in `ty`.
/// `None` means the `FAIL` policy refused the write.
fn fit(value: i128, ty: FieldType, mode: Overflow) -> Option<u64> {
    let max = ty.max_value() as i128;
    if (0..=max).contains(&value) {
        return Some(value as u64);
    }
    match mode {
        Overflow::Wrap => Some(value.rem_euclid(max + 1) as u64),
        Overflow::Sat => Some(if value < 0 { 0 } else { max as u64 }),
        Overflow::Fail => None,
    }
}

fn run_field_ops(keys: &mut Keyspace, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
    // Offsets are checked up front so a rejected batch changes nothing.
    let positions = ops
        .iter()
        .map(|op| match *op {
            FieldOp::Get { ty, offset }
            | FieldOp::Set { ty, offset, .. }
            | FieldOp::IncrBy { ty, offset, .. } => offset.resolve(ty),
            FieldOp::Overflow(_) => Ok(0),
        })
        .collect::<Result<Vec<u64>>>()?;

    let writes = ops.iter().any(|op| matches!(op, FieldOp::Set { .. } | FieldOp::IncrBy { .. }));
    let mut scratch = Entry::default();
    let entry = if writes {
        live_or_create(keys, key)
    } else {
        live(keys, key).unwrap_or(&mut scratch)
    };

    let mut mode = Overflow::default();
    let mut replies = Vec::with_capacity(ops.len());
    for (op, &pos) in ops.iter().zip(&positions) {
        match *op {
            FieldOp::Overflow(m) => mode = m,
            FieldOp::Get { ty, .. } => {
                let value = bit_ops::get_bits(&entry.bytes, pos, ty.bits() as u32);
                replies.push(Some(value as i64));
            }
            FieldOp::Set { ty, value, .. } => {
                let old = bit_ops::get_bits(&entry.bytes, pos, ty.bits() as u32);
                match fit(value as i128, ty, mode) {
                    Some(new) => {
                        entry.grow_to(bit_ops::bytes_for(pos, ty.bits() as u64));
                        bit_ops::set_bits(&mut entry.bytes, pos, ty.bits() as u32, new);
                        replies.push(Some(old as i64));
                    }
                    None => replies.push(None),
                }
            }
            FieldOp::IncrBy { ty, delta, .. } => {
                let old = bit_ops::get_bits(&entry.bytes, pos, ty.bits() as u32);
                match fit(old as i128 + delta as i128, ty, mode) {
                    Some(new) => {
                        entry.grow_to(bit_ops::bytes_for(pos, ty.bits() as u64));
                        bit_ops::set_bits(&mut entry.bytes, pos, ty.bits() as u32, new);
                        replies.push(Some(new as i64));
                    }
                    None => replies.push(None),
                }
            }
        }
    }
    Ok(replies)
}

impl BitStore for MemoryStore {
    fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool> {
        self.run(Command::SetBit { key, offset, on }, |keys| {
            check_bit_offset(offset)?;
            let entry = live_or_create(keys, key);
            entry.grow_to(bit_ops::bytes_for(offset, 1));
            Ok(bit_ops::set_bit(&mut entry.bytes, offset, on))
        })
    }

    fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        self.run(Command::GetBit { key, offset }, |keys| {
            check_bit_offset(offset)?;
            Ok(live(keys, key).is_some_and(|e| bit_ops::get_bit(&e.bytes, offset)))
        })
    }

    fn bit_count(&self, key: &str, range: Option<BitRange>) -> Result<u64> {
        self.run(Command::BitCount { key, range }, |keys| {
            let Some(entry) = live(keys, key) else {
                return Ok(0);
            };
            let total = entry.bytes.len() as u64 * 8;
            let span = match range {
                Some(range) => range.normalize(total),
                None if total == 0 => None,
                None => Some((0, total - 1)),
            };
            Ok(span.map_or(0, |(first, last)| bit_ops::count_ones(&entry.bytes, first, last)))
        })
    }

    fn bit_pos(&self, key: &str, bit: bool, range: Option<BitRange>) -> Result<i64> {
        self.run(Command::BitPos { key, bit, range }, |keys| {
            let Some(entry) = live(keys, key) else {
                return Ok(if bit { -1 } else { 0 });
            };
            let total = entry.bytes.len() as u64 * 8;
            let span = match range {
                Some(range) => range.normalize(total),
                None if total == 0 => None,
                None => Some((0, total - 1)),
            };
            let found = span.and_then(|(first, last)| {
                (first..=last).find(|&pos| bit_ops::get_bit(&entry.bytes, pos) == bit)
            });
            Ok(match found {
                Some(pos) => pos as i64,
                // Without an explicit range the value is treated as padded
                // with zeros on the right.
                None if !bit && range.is_none() => total as i64,
                None => -1,
            })
        })
    }

    fn bit_op(&self, op: BitOp, dest: &str, sources: &[&str]) -> Result<u64> {
        self.run(Command::BitOp { op, dest, sources }, |keys| {
            match (op, sources.len()) {
                (_, 0) => {
                    return Err(StoreError::InvalidArgument(
                        "BITOP requires at least one source key".into(),
                    ));
                }
                (BitOp::Not, n) if n != 1 => {
                    return Err(StoreError::InvalidArgument(
                        "BITOP NOT must be called with a single source key".into(),
                    ));
                }
                _ => {}
            }

            let inputs: Vec<Vec<u8>> = sources
                .iter()
                .map(|src| live(keys, src).map(|e| e.bytes.clone()).unwrap_or_default())
                .collect();
            let len = inputs.iter().map(Vec::len).max().unwrap_or(0);
            let byte_at = |input: &Vec<u8>, i: usize| input.get(i).copied().unwrap_or(0);

            let result: Vec<u8> = (0..len)
                .map(|i| {
                    let mut bytes = inputs.iter().map(|input| byte_at(input, i));
                    let first = bytes.next().unwrap_or(0);
                    match op {
                        BitOp::And => bytes.fold(first, |acc, b| acc & b),
                        BitOp::Or => bytes.fold(first, |acc, b| acc | b),
                        BitOp::Xor => bytes.fold(first, |acc, b| acc ^ b),
                        BitOp::Not => !first,
                    }
                })
                .collect();

            if result.is_empty() {
                keys.remove(dest);
            } else {
                keys.insert(dest.to_owned(), Entry { bytes: result, expires_at: None });
            }
            Ok(len as u64)
        })
    }

    fn bitfield(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
        self.run(Command::BitField { key, ops }, |keys| run_field_ops(keys, key, ops))
    }

    fn bitfield_ro(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
        self.run(Command::BitFieldRo { key, ops }, |keys| {
            if !ops.iter().all(FieldOp::is_read_only) {
                return Err(StoreError::InvalidArgument(
                    "BITFIELD_RO only supports the GET subcommand".into(),
                ));
            }
            run_field_ops(keys, key, ops)
        })
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let seconds = ttl.as_secs();
        self.run(Command::Expire { key, seconds }, |keys| {
            if live(keys, key).is_none() {
                return Ok(false);
            }
            if seconds == 0 {
                keys.remove(key);
            } else if let Some(entry) = keys.get_mut(key) {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
            }
            Ok(true)
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.run(Command::Del { key }, |keys| {
            let existed = live(keys, key).is_some();
            keys.remove(key);
            Ok(existed)
        })
    }
}
