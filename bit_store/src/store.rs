use std::sync::Arc;
use std::time::Duration;

use crate::{BitOp, BitRange, FieldOp, Result};

/// Atomic bit commands against byte-string values addressed by key.
///
/// Every method is one command and one round trip. Implementations must
/// execute each call atomically with respect to other calls on the same key;
/// in particular a [`bitfield`](BitStore::bitfield) batch is applied as a
/// unit or not at all.
pub trait BitStore {
    /// `SETBIT`: returns the previous state of the bit.
    fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool>;

    /// `GETBIT`
    fn get_bit(&self, key: &str, offset: u64) -> Result<bool>;

    /// `BITCOUNT` over the whole value, or over `range` in bit units.
    fn bit_count(&self, key: &str, range: Option<BitRange>) -> Result<u64>;

    /// `BITPOS`: position of the first bit equal to `bit`, or `-1`.
    fn bit_pos(&self, key: &str, bit: bool, range: Option<BitRange>) -> Result<i64>;

    /// `BITOP`: writes the combination of `sources` into `dest` and returns
    /// the length of `dest` in bytes.
    fn bit_op(&self, op: BitOp, dest: &str, sources: &[&str]) -> Result<u64>;

    /// `BITFIELD`: one reply entry per non-`Overflow` op, `None` where the
    /// `FAIL` policy blocked a write.
    fn bitfield(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>>;

    /// `BITFIELD_RO`: only `Get` ops are accepted.
    fn bitfield_ro(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>>;

    /// `EXPIRE` with second granularity. Returns `false` if the key is missing.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// `DEL`: returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool>;
}

macro_rules! forward_bit_store {
    ($($ty:ty),*) => {$(
        impl<S: BitStore + ?Sized> BitStore for $ty {
            fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool> {
                (**self).set_bit(key, offset, on)
            }
            fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
                (**self).get_bit(key, offset)
            }
            fn bit_count(&self, key: &str, range: Option<BitRange>) -> Result<u64> {
                (**self).bit_count(key, range)
            }
            fn bit_pos(&self, key: &str, bit: bool, range: Option<BitRange>) -> Result<i64> {
                (**self).bit_pos(key, bit, range)
            }
            fn bit_op(&self, op: BitOp, dest: &str, sources: &[&str]) -> Result<u64> {
                (**self).bit_op(op, dest, sources)
            }
            fn bitfield(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
                (**self).bitfield(key, ops)
            }
            fn bitfield_ro(&self, key: &str, ops: &[FieldOp]) -> Result<Vec<Option<i64>>> {
                (**self).bitfield_ro(key, ops)
            }
            fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
                (**self).expire(key, ttl)
            }
            fn delete(&self, key: &str) -> Result<bool> {
                (**self).delete(key)
            }
        }
    )*};
}

forward_bit_store!(&S, Box<S>, Arc<S>);
