// tests/proptest.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bit_store::{BitOp, BitRange, BitStore, FieldOp, MemoryStore, Result as StoreResult};
use packed_fields::{FieldError, FieldLayout, FlagMap, PackedFields};
use proptest::prelude::*;

//
// -----------------------------------------------------------------------------
// Helper Functions
// -----------------------------------------------------------------------------

/// Generate a valid layout: 1..8 fields of 1..=32 bits
fn widths() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=32, 1..8)
}

fn max_for(width: u8) -> u64 {
    (1u64 << width) - 1
}

/// MemoryStore that counts the commands reaching it.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl BitStore for CountingStore {
    fn set_bit(&self, key: &str, offset: u64, on: bool) -> StoreResult<bool> {
        self.hit();
        self.inner.set_bit(key, offset, on)
    }
    fn get_bit(&self, key: &str, offset: u64) -> StoreResult<bool> {
        self.hit();
        self.inner.get_bit(key, offset)
    }
    fn bit_count(&self, key: &str, range: Option<BitRange>) -> StoreResult<u64> {
        self.hit();
        self.inner.bit_count(key, range)
    }
    fn bit_pos(&self, key: &str, bit: bool, range: Option<BitRange>) -> StoreResult<i64> {
        self.hit();
        self.inner.bit_pos(key, bit, range)
    }
    fn bit_op(&self, op: BitOp, dest: &str, sources: &[&str]) -> StoreResult<u64> {
        self.hit();
        self.inner.bit_op(op, dest, sources)
    }
    fn bitfield(&self, key: &str, ops: &[FieldOp]) -> StoreResult<Vec<Option<i64>>> {
        self.hit();
        self.inner.bitfield(key, ops)
    }
    fn bitfield_ro(&self, key: &str, ops: &[FieldOp]) -> StoreResult<Vec<Option<i64>>> {
        self.hit();
        self.inner.bitfield_ro(key, ops)
    }
    fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.hit();
        self.inner.expire(key, ttl)
    }
    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.hit();
        self.inner.delete(key)
    }
}

//
// -----------------------------------------------------------------------------
// Layout Properties
// -----------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_offsets_are_running_sums(widths in widths()) {
        let layout = FieldLayout::new(&widths).unwrap();
        let mut expected = 0u64;
        for (i, &w) in widths.iter().enumerate() {
            prop_assert_eq!(layout.offset(i), Some(expected));
            expected += w as u64 + 1;
        }
        prop_assert_eq!(layout.offset(0), Some(0));
    }
}

proptest! {
    #[test]
    fn prop_fields_never_overlap(widths in widths()) {
        let layout = FieldLayout::new(&widths).unwrap();
        for pair in layout.iter().collect::<Vec<_>>().windows(2) {
            let (width, offset) = pair[0];
            let (_, next) = pair[1];
            prop_assert!(offset + (width.bits() as u64) < next);
        }
    }
}

proptest! {
    #[test]
    fn prop_invalid_widths_are_rejected(
        mut widths in widths(),
        bad in prop_oneof![Just(0u8), 33u8..=255],
        at in any::<prop::sample::Index>(),
    ) {
        let idx = at.index(widths.len() + 1);
        widths.insert(idx, bad);
        prop_assert!(matches!(FieldLayout::new(&widths), Err(FieldError::InvalidWidth(b)) if b == bad));
    }
}

//
// -----------------------------------------------------------------------------
// PackedFields Properties
// -----------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_set_then_get_is_clamped(
        (widths, values) in widths().prop_flat_map(|w| {
            let n = w.len();
            (Just(w), prop::collection::vec(any::<u32>(), n))
        })
    ) {
        let record = PackedFields::new(MemoryStore::new(), "k", &widths).unwrap();

        let previous = record.auto_set(&values).unwrap();
        prop_assert_eq!(previous, vec![0; widths.len()]);

        let expected: Vec<u32> = widths
            .iter()
            .zip(&values)
            .map(|(&w, &v)| (v as u64).min(max_for(w)) as u32)
            .collect();
        prop_assert_eq!(record.auto_get().unwrap(), expected.clone());

        // a second set hands back the clamped values it replaces
        prop_assert_eq!(record.auto_set(&vec![0; widths.len()]).unwrap(), expected);
    }
}

proptest! {
    #[test]
    fn prop_increments_saturate(
        (widths, rounds) in widths().prop_flat_map(|w| {
            let n = w.len();
            (Just(w), prop::collection::vec(prop::collection::vec(any::<u32>(), n), 1..6))
        })
    ) {
        let record = PackedFields::new(MemoryStore::new(), "k", &widths).unwrap();
        let mut model: Vec<u64> = vec![0; widths.len()];

        for deltas in rounds {
            let got = record.auto_incr_by(&deltas).unwrap();
            for (i, (&w, &d)) in widths.iter().zip(&deltas).enumerate() {
                model[i] = (model[i] + d as u64).min(max_for(w));
                prop_assert_eq!(got[i] as u64, model[i]);
                prop_assert!(got[i] as u64 <= max_for(w));
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_arity_mismatch_never_reaches_store(
        widths in widths(),
        extra in 1usize..4,
        shorter in any::<bool>(),
    ) {
        let store = CountingStore::default();
        let record = PackedFields::new(&store, "k", &widths).unwrap();
        let n = if shorter { widths.len() - 1 } else { widths.len() + extra };
        let values = vec![1u32; n];

        let set = record.auto_set(&values);
        let incr = record.auto_incr_by(&values);
        let is_arity = |r: &packed_fields::Result<Vec<u32>>| {
            matches!(r, Err(FieldError::ArityMismatch { found, .. }) if *found == n)
        };
        prop_assert!(is_arity(&set));
        prop_assert!(is_arity(&incr));
        prop_assert_eq!(store.calls(), 0);
    }
}

proptest! {
    #[test]
    fn prop_each_operation_is_one_round_trip(widths in widths()) {
        let store = CountingStore::default();
        let record = PackedFields::new(&store, "k", &widths).unwrap();
        let ones = vec![1u32; widths.len()];

        record.auto_set(&ones).unwrap();
        prop_assert_eq!(store.calls(), 1);
        record.auto_incr_by(&ones).unwrap();
        prop_assert_eq!(store.calls(), 2);
        record.auto_get().unwrap();
        prop_assert_eq!(store.calls(), 3);
    }
}

proptest! {
    #[test]
    fn prop_writing_one_field_leaves_others(
        (widths, values, target, new_value) in widths().prop_flat_map(|w| {
            let n = w.len();
            (Just(w), prop::collection::vec(any::<u32>(), n), 0..n, any::<u32>())
        })
    ) {
        let record = PackedFields::new(MemoryStore::new(), "k", &widths).unwrap();
        record.auto_set(&values).unwrap();
        let before = record.auto_get().unwrap();

        record.set_field(target, new_value).unwrap();
        let after = record.auto_get().unwrap();

        for i in 0..widths.len() {
            if i == target {
                prop_assert_eq!(after[i] as u64, (new_value as u64).min(max_for(widths[i])));
            } else {
                prop_assert_eq!(after[i], before[i]);
            }
        }
    }
}

//
// -----------------------------------------------------------------------------
// FlagMap Properties
// -----------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_flags_roundtrip(offsets in prop::collection::btree_set(0u32..4096, 0..100)) {
        let flags = FlagMap::new(MemoryStore::new(), "f");
        for &o in &offsets {
            flags.set_bit(o, true).unwrap();
        }
        prop_assert_eq!(flags.count_all().unwrap(), offsets.len() as u64);
        let set: Vec<u64> = flags.iter_set().collect::<packed_fields::Result<_>>().unwrap();
        let expected: Vec<u64> = offsets.iter().map(|&o| o as u64).collect();
        prop_assert_eq!(set, expected);
    }
}

//
// -----------------------------------------------------------------------------
// Concrete scenarios
// -----------------------------------------------------------------------------

#[test]
fn ip_and_timestamp_record() -> packed_fields::Result<()> {
    let record = PackedFields::new(MemoryStore::new(), "login", &[32, 32])?;
    assert_eq!(record.auto_set(&[100, 1000])?, vec![0, 0]);
    assert_eq!(record.auto_get()?, vec![100, 1000]);
    assert_eq!(record.auto_incr_by(&[5, 5])?, vec![105, 1005]);
    record.auto_set(&[4_294_967_295, 0])?;
    assert_eq!(record.auto_incr_by(&[10, 0])?, vec![4_294_967_295, 0]);
    Ok(())
}

#[test]
fn nibble_fields_do_not_bleed() -> packed_fields::Result<()> {
    let store = MemoryStore::new();
    let record = PackedFields::new(&store, "k", &[4, 4])?;
    assert_eq!(record.layout().offsets(), &[0, 5]);
    record.auto_set(&[0, 6])?;
    record.auto_set(&[15, 6])?;
    assert_eq!(record.auto_get()?, vec![15, 6]);
    // bit 4 is the unused guard bit
    let flags = FlagMap::new(&store, "k");
    assert!(!flags.get_bit(4)?);
    Ok(())
}

#[test]
fn shape_errors_are_not_papered_over() {
    struct ShortStore;
    impl BitStore for ShortStore {
        fn set_bit(&self, _: &str, _: u64, _: bool) -> StoreResult<bool> { Ok(false) }
        fn get_bit(&self, _: &str, _: u64) -> StoreResult<bool> { Ok(false) }
        fn bit_count(&self, _: &str, _: Option<BitRange>) -> StoreResult<u64> { Ok(0) }
        fn bit_pos(&self, _: &str, _: bool, _: Option<BitRange>) -> StoreResult<i64> { Ok(-1) }
        fn bit_op(&self, _: BitOp, _: &str, _: &[&str]) -> StoreResult<u64> { Ok(0) }
        fn bitfield(&self, _: &str, _: &[FieldOp]) -> StoreResult<Vec<Option<i64>>> { Ok(vec![Some(1)]) }
        fn bitfield_ro(&self, _: &str, _: &[FieldOp]) -> StoreResult<Vec<Option<i64>>> { Ok(vec![Some(1), Some(-5)]) }
        fn expire(&self, _: &str, _: Duration) -> StoreResult<bool> { Ok(false) }
        fn delete(&self, _: &str) -> StoreResult<bool> { Ok(false) }
    }

    let record = PackedFields::new(ShortStore, "k", &[8, 8]).unwrap();
    assert!(matches!(
        record.auto_set(&[1, 2]),
        Err(FieldError::ResponseLength { expected: 2, found: 1 })
    ));
    assert!(matches!(record.auto_get(), Err(FieldError::UnexpectedReply(Some(-5)))));
}
