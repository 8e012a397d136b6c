//! One boolean per integer offset, stored as a single bit string.
//!
//! Memory on the store side is driven by the highest offset touched:
//! roughly `max_offset / 8` bytes.
//!
//! # Examples
//!
//! ```rust
//! use packed_fields::{BitOp, FlagMap, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let monday = FlagMap::new(&store, "login:mon");
//! let tuesday = FlagMap::new(&store, "login:tue");
//!
//! // user ids as offsets
//! monday.set_bit(7, true).unwrap();
//! monday.set_bit(12, true).unwrap();
//! tuesday.set_bit(12, true).unwrap();
//!
//! assert!(monday.get_bit(7).unwrap());
//! assert!(!monday.get_bit(8).unwrap());
//!
//! // users seen on both days
//! let both = FlagMap::new(&store, "login:both");
//! both.combine(BitOp::And, &["login:mon", "login:tue"]).unwrap();
//! assert_eq!(both.count_all().unwrap(), 1);
//! assert_eq!(both.first(true).unwrap(), Some(12));
//! ```

use core::time::Duration;

use bit_store::{BitOp, BitRange, BitStore};

use crate::Result;

#[derive(Debug)]
pub struct FlagMap<S> {
    store: S,
    key: String,
}

impl<S: BitStore> FlagMap<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Sets the flag at `offset`, returning its previous state.
    pub fn set_bit(&self, offset: u32, on: bool) -> Result<bool> {
        Ok(self.store.set_bit(&self.key, offset as u64, on)?)
    }

    pub fn get_bit(&self, offset: u32) -> Result<bool> {
        Ok(self.store.get_bit(&self.key, offset as u64)?)
    }

    /// Set flags in the inclusive bit range `start..=end`. Negative bounds
    /// count back from the end of the value.
    pub fn bit_count(&self, start: i64, end: i64) -> Result<u64> {
        Ok(self
            .store
            .bit_count(&self.key, Some(BitRange::new(start, end)))?)
    }

    pub fn count_all(&self) -> Result<u64> {
        Ok(self.store.bit_count(&self.key, None)?)
    }

    /// First offset in `start..=end` whose flag equals `bit`.
    pub fn bit_pos(&self, bit: bool, start: i64, end: i64) -> Result<Option<u64>> {
        let pos = self
            .store
            .bit_pos(&self.key, bit, Some(BitRange::new(start, end)))?;
        Ok(u64::try_from(pos).ok())
    }

    /// First offset whose flag equals `bit`, searching the whole value.
    /// Looking for a clear flag in a value of all ones yields the offset
    /// just past its end.
    pub fn first(&self, bit: bool) -> Result<Option<u64>> {
        let pos = self.store.bit_pos(&self.key, bit, None)?;
        Ok(u64::try_from(pos).ok())
    }

    /// Overwrites this map with `op` applied to the values under `sources`
    /// and returns the resulting length in bytes. `NOT` takes exactly one
    /// source.
    ///
    /// Set an expiry on the result when it is only a temporary aggregate.
    pub fn combine(&self, op: BitOp, sources: &[&str]) -> Result<u64> {
        Ok(self.store.bit_op(op, &self.key, sources)?)
    }

    pub fn expire(&self, ttl: Duration) -> Result<bool> {
        Ok(self.store.expire(&self.key, ttl)?)
    }

    pub fn clear(&self) -> Result<bool> {
        Ok(self.store.delete(&self.key)?)
    }

    /// Offsets of every set flag, in ascending order. One round trip per
    /// set flag plus one.
    pub fn iter_set(&self) -> FlagsIter<'_, S> {
        FlagsIter { map: self, next: 0, done: false }
    }
}

pub struct FlagsIter<'a, S> {
    map: &'a FlagMap<S>,
    next: i64,
    done: bool,
}

impl<S: BitStore> Iterator for FlagsIter<'_, S> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.map.bit_pos(true, self.next, -1) {
            Ok(Some(pos)) => {
                self.next = pos as i64 + 1;
                Some(Ok(pos))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
