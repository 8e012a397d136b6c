//! Property-based tests for MemoryStore

use bit_store::{BitOp, BitRange, BitStore, FieldOp, FieldType, MemoryStore, Offset, Overflow};
use proptest::prelude::*;

fn field_type() -> impl Strategy<Value = FieldType> {
    (1u8..=63).prop_map(|bits| FieldType::unsigned(bits).unwrap())
}

proptest! {
    // -------------------------------------------------------------
    // 1. A segment reads back what was written, clamped under SAT.
    // -------------------------------------------------------------
    #[test]
    fn prop_sat_set_then_get(ty in field_type(), offset in 0u64..512, value in any::<i64>()) {
        let store = MemoryStore::new();
        let at = Offset::Bit(offset);
        store.bitfield("k", &[
            FieldOp::Overflow(Overflow::Sat),
            FieldOp::Set { ty, offset: at, value },
        ]).unwrap();

        let expected = if value < 0 { 0 } else { (value as u64).min(ty.max_value()) };
        let got = store.bitfield_ro("k", &[FieldOp::Get { ty, offset: at }]).unwrap();
        prop_assert_eq!(got, vec![Some(expected as i64)]);
    }

    // -------------------------------------------------------------
    // 2. Writing a segment never disturbs bits outside it.
    // -------------------------------------------------------------
    #[test]
    fn prop_segment_writes_are_isolated(
        ty in field_type(),
        offset in 0u64..256,
        value in any::<i64>(),
        probe in 0u64..512,
    ) {
        let store = MemoryStore::new();
        store.bitfield("k", &[FieldOp::Set { ty, offset: Offset::Bit(offset), value }]).unwrap();

        let inside = probe >= offset && probe < offset + ty.bits() as u64;
        if !inside {
            prop_assert!(!store.get_bit("k", probe).unwrap());
        }
    }

    // -------------------------------------------------------------
    // 3. SETBIT and BITCOUNT agree.
    // -------------------------------------------------------------
    #[test]
    fn prop_bit_count_matches_set_bits(positions in prop::collection::btree_set(0u64..1024, 0..64)) {
        let store = MemoryStore::new();
        for &pos in &positions {
            store.set_bit("k", pos, true).unwrap();
        }
        prop_assert_eq!(store.bit_count("k", None).unwrap(), positions.len() as u64);
        let first = positions.iter().next().map_or(-1, |&p| p as i64);
        prop_assert_eq!(store.bit_pos("k", true, None).unwrap(), first);
        prop_assert_eq!(
            store.bit_count("k", Some(BitRange::new(0, 99))).unwrap(),
            positions.iter().filter(|&&p| p < 100).count() as u64
        );
    }

    // -------------------------------------------------------------
    // 4. XOR with itself clears every bit.
    // -------------------------------------------------------------
    #[test]
    fn prop_xor_self_is_zero(positions in prop::collection::vec(0u64..256, 1..32)) {
        let store = MemoryStore::new();
        for &pos in &positions {
            store.set_bit("a", pos, true).unwrap();
        }
        store.bit_op(BitOp::Xor, "dest", &["a", "a"]).unwrap();
        prop_assert_eq!(store.bit_count("dest", None).unwrap(), 0);
    }
}
