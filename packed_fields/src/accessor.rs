//! Manual access to one explicitly addressed segment.
//!
//! The caller picks the type and offset for every call; nothing stops two
//! calls from overlapping. Prefer [`PackedFields`](crate::PackedFields)
//! when the segments form a fixed record.
//!
//! ```rust
//! use packed_fields::{FieldAccessor, MemoryStore, Offset, Width};
//!
//! let stats = FieldAccessor::new(MemoryStore::new(), "stats");
//! let byte: Width = "u8".parse().unwrap();
//!
//! stats.set(byte, Offset::Bit(0), 200).unwrap();
//! assert_eq!(stats.incr_by(byte, Offset::Bit(0), 100).unwrap(), 255);
//! // third u8 segment, i.e. bit 16
//! stats.set(byte, Offset::Index(2), 7).unwrap();
//! assert_eq!(stats.get(byte, Offset::Bit(16)).unwrap(), 7);
//! ```

use bit_store::{BitStore, FieldOp, Offset, Overflow};

use crate::layout::single;
use crate::{Result, Width};

#[derive(Debug)]
pub struct FieldAccessor<S> {
    store: S,
    key: String,
}

impl<S: BitStore> FieldAccessor<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Writes `value` (saturated) and returns the previous value.
    pub fn set(&self, width: Width, offset: Offset, value: u32) -> Result<u32> {
        let op = FieldOp::Set {
            ty: width.field_type(),
            offset,
            value: value as i64,
        };
        self.write(op)
    }

    /// Adds `delta` (saturated) and returns the new value.
    pub fn incr_by(&self, width: Width, offset: Offset, delta: u32) -> Result<u32> {
        let op = FieldOp::IncrBy {
            ty: width.field_type(),
            offset,
            delta: delta as i64,
        };
        self.write(op)
    }

    pub fn get(&self, width: Width, offset: Offset) -> Result<u32> {
        let op = FieldOp::Get {
            ty: width.field_type(),
            offset,
        };
        let replies = self.store.bitfield_ro(&self.key, &[op])?;
        single(replies)
    }

    fn write(&self, op: FieldOp) -> Result<u32> {
        let replies = self
            .store
            .bitfield(&self.key, &[FieldOp::Overflow(Overflow::Sat), op])?;
        single(replies)
    }
}
