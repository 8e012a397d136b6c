use std::time::Duration;

use packed_fields::{BitOp, FieldAccessor, FlagMap, MemoryStore, Offset, PackedFields, Width};

fn main() {
    println!("=== Packed Fields Examples ===\n");

    // Example 1: A packed login record
    let _ = example_login_record();

    // Example 2: Daily activity flags
    let _ = example_activity_flags();

    // Example 3: Hand-placed counters
    let _ = example_manual_counters();
}

fn example_login_record() -> packed_fields::Result<()> {
    println!("Example 1: Address and timestamp in one value (32 bits each)");

    let store = MemoryStore::new();
    let login = PackedFields::new(&store, "login:42", &[32, 32])?;

    let previous = login.auto_set(&[0x7F00_0001, 1_700_000_000])?;
    println!("  Previous values: {:?}", previous);
    println!("  Current values:  {:?}", login.auto_get()?);
    println!("  Offsets:         {:?}", login.layout().offsets());
    println!("  Stored bytes:    {}", login.layout().byte_len());

    // Saturates instead of wrapping
    let bumped = login.auto_incr_by(&[u32::MAX, 60])?;
    println!("  After increment: {:?}", bumped);

    login.expire(Duration::from_secs(3600))?;
    println!();

    Ok(())
}

fn example_activity_flags() -> packed_fields::Result<()> {
    println!("Example 2: Users active per day, one bit per user id");

    let store = MemoryStore::new();
    let monday = FlagMap::new(&store, "active:mon");
    let tuesday = FlagMap::new(&store, "active:tue");

    for user in [3, 17, 42, 99] {
        monday.set_bit(user, true)?;
    }
    for user in [17, 99, 100] {
        tuesday.set_bit(user, true)?;
    }

    let both = FlagMap::new(&store, "active:both");
    both.combine(BitOp::And, &["active:mon", "active:tue"])?;
    both.expire(Duration::from_secs(60))?;

    println!("  Monday:  {} users", monday.count_all()?);
    println!("  Tuesday: {} users", tuesday.count_all()?);
    let ids: Vec<u64> = both.iter_set().collect::<packed_fields::Result<_>>()?;
    println!("  Both:    {:?}", ids);
    println!();

    Ok(())
}

fn example_manual_counters() -> packed_fields::Result<()> {
    println!("Example 3: u8 counters addressed by index");

    let counters = FieldAccessor::new(MemoryStore::new(), "counters");
    let byte: Width = "u8".parse()?;

    for slot in 0..4 {
        counters.incr_by(byte, Offset::Index(slot), 100 * (slot as u32 + 1))?;
    }
    for slot in 0..4 {
        println!("  Counter {}: {}", slot, counters.get(byte, Offset::Index(slot))?);
    }
    println!();

    Ok(())
}
