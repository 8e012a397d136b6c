//! Several unsigned fields packed into one stored value.
//!
//! # Examples
//!
//! ## A login record
//!
//! ```rust
//! use packed_fields::{MemoryStore, PackedFields};
//!
//! // 32 bits of address, 32 bits of timestamp
//! let login = PackedFields::new(MemoryStore::new(), "login:42", &[32, 32]).unwrap();
//!
//! assert_eq!(login.auto_set(&[100, 1000]).unwrap(), vec![0, 0]);
//! assert_eq!(login.auto_get().unwrap(), vec![100, 1000]);
//! assert_eq!(login.auto_incr_by(&[5, 5]).unwrap(), vec![105, 1005]);
//! ```
//!
//! ## Saturation
//!
//! ```rust
//! use packed_fields::{MemoryStore, PackedFields};
//!
//! let counters = PackedFields::new(MemoryStore::new(), "c", &[4, 8]).unwrap();
//! counters.auto_set(&[99, 99]).unwrap();
//! assert_eq!(counters.auto_get().unwrap(), vec![15, 99]);
//! assert_eq!(counters.auto_incr_by(&[1, 1000]).unwrap(), vec![15, 255]);
//! ```
use core::time::Duration;

use bit_store::BitStore;

use crate::layout::{get_op, incr_op, saturating, set_op, single};
use crate::{FieldError, FieldLayout, Result};

/// Packed multi-field record stored under one key.
///
/// Every multi-field operation is sent as a single batched command, so all
/// fields of one call are read or written atomically. Nothing is cached:
/// each call is one round trip.
#[derive(Debug)]
pub struct PackedFields<S> {
    store: S,
    key: String,
    layout: FieldLayout,
}

impl<S: BitStore> PackedFields<S> {
    /// Creates a record with one field per entry of `widths`.
    ///
    /// # Errors
    ///
    /// [`FieldError::EmptyLayout`] for an empty list and
    /// [`FieldError::InvalidWidth`] for a width outside `1..=32`.
    pub fn new(store: S, key: impl Into<String>, widths: &[u8]) -> Result<Self> {
        Ok(Self::with_layout(store, key, FieldLayout::new(widths)?))
    }

    pub fn with_layout(store: S, key: impl Into<String>, layout: FieldLayout) -> Self {
        Self {
            store,
            key: key.into(),
            layout,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Writes one value per field and returns the values they replace.
    ///
    /// Values above a field's maximum are stored as the maximum.
    ///
    /// # Errors
    ///
    /// [`FieldError::ArityMismatch`] (without contacting the store) when
    /// `values` does not have one entry per field.
    pub fn auto_set(&self, values: &[u32]) -> Result<Vec<u32>> {
        let ops = self.layout.set_ops(values)?;
        let replies = self.store.bitfield(&self.key, &ops)?;
        self.layout.decode(replies)
    }

    /// Adds one delta per field and returns the new values, each saturated at
    /// the field's maximum.
    pub fn auto_incr_by(&self, deltas: &[u32]) -> Result<Vec<u32>> {
        let ops = self.layout.incr_ops(deltas)?;
        let replies = self.store.bitfield(&self.key, &ops)?;
        self.layout.decode(replies)
    }

    /// Reads every field with one read-only command.
    pub fn auto_get(&self) -> Result<Vec<u32>> {
        let replies = self.store.bitfield_ro(&self.key, &self.layout.get_ops())?;
        self.layout.decode(replies)
    }

    pub fn auto_set_array<const N: usize>(&self, values: [u32; N]) -> Result<[u32; N]> {
        into_array(self.auto_set(&values)?)
    }

    pub fn auto_incr_by_array<const N: usize>(&self, deltas: [u32; N]) -> Result<[u32; N]> {
        into_array(self.auto_incr_by(&deltas)?)
    }

    pub fn get_field(&self, index: usize) -> Result<u32> {
        let (width, offset) = self.layout.check_index(index)?;
        let replies = self.store.bitfield_ro(&self.key, &[get_op(width, offset)])?;
        single(replies)
    }

    /// Writes a single field, returning its previous value.
    pub fn set_field(&self, index: usize, value: u32) -> Result<u32> {
        let (width, offset) = self.layout.check_index(index)?;
        let replies = self
            .store
            .bitfield(&self.key, &saturating(set_op(width, offset, value)))?;
        single(replies)
    }

    /// Increments a single field, returning the saturated result.
    pub fn incr_field(&self, index: usize, delta: u32) -> Result<u32> {
        let (width, offset) = self.layout.check_index(index)?;
        let replies = self
            .store
            .bitfield(&self.key, &saturating(incr_op(width, offset, delta)))?;
        single(replies)
    }

    /// Deletes the stored value; every field reads 0 afterwards.
    pub fn clear(&self) -> Result<bool> {
        Ok(self.store.delete(&self.key)?)
    }

    pub fn expire(&self, ttl: Duration) -> Result<bool> {
        Ok(self.store.expire(&self.key, ttl)?)
    }
}

fn into_array<const N: usize>(values: Vec<u32>) -> Result<[u32; N]> {
    values.try_into().map_err(|values: Vec<u32>| FieldError::ResponseLength {
        expected: N,
        found: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bit_store::MemoryStore;

    #[test]
    fn login_record_scenario() -> Result<()> {
        let record = PackedFields::new(MemoryStore::new(), "user:1", &[32, 32])?;
        assert_eq!(record.auto_set(&[100, 1000])?, vec![0, 0]);
        assert_eq!(record.auto_get()?, vec![100, 1000]);
        assert_eq!(record.auto_incr_by(&[5, 5])?, vec![105, 1005]);

        assert_eq!(record.auto_set(&[u32::MAX, 0])?, vec![105, 1005]);
        assert_eq!(record.auto_incr_by(&[10, 0])?, vec![u32::MAX, 0]);
        assert_eq!(record.auto_get()?, vec![u32::MAX, 0]);
        Ok(())
    }

    #[test]
    fn neighbouring_fields_are_disjoint() -> Result<()> {
        let store = MemoryStore::new();
        let record = PackedFields::new(&store, "k", &[4, 4])?;
        record.auto_set(&[0, 9])?;
        record.set_field(0, 15)?;
        assert_eq!(record.auto_get()?, vec![15, 9]);
        // field 0 at bits 0..4, guard bit 4, field 1 at bits 5..9
        assert_eq!(store.raw("k"), Some(vec![0b1111_0100, 0b1000_0000]));
        Ok(())
    }

    #[test]
    fn single_field_operations() -> Result<()> {
        let record = PackedFields::new(MemoryStore::new(), "k", &[3, 16, 1])?;
        assert_eq!(record.set_field(1, 70_000)?, 0);
        assert_eq!(record.get_field(1)?, u16::MAX as u32);
        assert_eq!(record.incr_field(2, 5)?, 1);
        assert_eq!(record.incr_field(0, 3)?, 3);
        assert_eq!(record.auto_get()?, vec![3, u16::MAX as u32, 1]);
        assert!(matches!(
            record.get_field(3),
            Err(FieldError::FieldIndexOutOfBounds { index: 3, len: 3 })
        ));
        Ok(())
    }

    #[test]
    fn array_variants() -> Result<()> {
        let record = PackedFields::new(MemoryStore::new(), "k", &[8, 8])?;
        assert_eq!(record.auto_set_array([1, 2])?, [0, 0]);
        assert_eq!(record.auto_incr_by_array([1, 300])?, [2, 255]);
        assert!(matches!(
            record.auto_set_array([1, 2, 3]),
            Err(FieldError::ArityMismatch { expected: 2, found: 3 })
        ));
        Ok(())
    }

    #[test]
    fn clear_resets_every_field() -> Result<()> {
        let store = MemoryStore::new();
        let record = PackedFields::new(&store, "k", &[8, 8])?;
        record.auto_set(&[7, 7])?;
        assert!(record.clear()?);
        assert_eq!(record.auto_get()?, vec![0, 0]);
        assert!(store.is_empty());
        Ok(())
    }
}
