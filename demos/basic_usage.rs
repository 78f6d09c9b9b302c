use std::io;
use std::sync::Arc;

use futures_util::StreamExt;
use skip_scan::build_range_spec;
use skip_scan::impls::mem_store::MemStore;
use skip_scan::stream::merge_sorted;
use skip_scan::stream::split_scan;
use skip_scan::CompositeKey;
use skip_scan::FieldConstraint;
use skip_scan::FieldSpec;
use skip_scan::SkipScanCursor;

#[tokio::main]
async fn main() -> io::Result<()> {
    // A store keyed by (day, counter), both zero-padded hex
    let mut store = MemStore::new();
    for day in 0..16u32 {
        for counter in 0..256u32 {
            let key = CompositeKey::from_fields([format!("{:02x}", day), format!("{:02x}", counter)]);
            store.insert(key.as_bytes(), format!("event {}-{}", day, counter));
        }
    }

    // day in [3, 5] and counter in [0x10, 0x12]
    let spec = build_range_spec(
        "day_counter",
        &[
            FieldConstraint::ge("day", "03"),
            FieldConstraint::le("day", "05"),
            FieldConstraint::ge("counter", "10"),
            FieldConstraint::le("counter", "12"),
        ],
        vec![FieldSpec::hex("day"), FieldSpec::hex("counter")],
    )?;
    let spec = Arc::new(spec);

    // Synchronous scan
    let mut cursor = SkipScanCursor::new(spec.clone(), store.cursor());
    cursor.seek_all()?;
    while let Some((key, value)) = cursor.current() {
        println!("Key: {}, Value: {}", key, String::from_utf8_lossy(value));
        cursor.advance()?;
    }
    println!(
        "seeks: {}, advances: {}",
        store.stats().seeks(),
        store.stats().advances()
    );

    // Two sub-scans merged back into key order
    let split = CompositeKey::from_fields(["04", "00"]);
    let parts = split_scan(spec, &store.cursor(), [split]);
    let mut merged = merge_sorted(parts);
    while let Some(result) = merged.next().await {
        let (key, _value) = result?;
        println!("Merged key: {}", key);
    }

    Ok(())
}
