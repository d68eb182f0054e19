use tcc_monitor::core::monitor::{Pressure, Reading, SampleStore, ThermalState, DEFAULT_MAX_READINGS};

fn reading(n: usize) -> Reading {
    Reading::new(n as f64, 0.0, ThermalState::Nominal, Pressure::Normal)
}

#[test]
fn test_default_capacity() {
    assert_eq!(SampleStore::new().capacity(), DEFAULT_MAX_READINGS);
    assert_eq!(DEFAULT_MAX_READINGS, 500);
}

#[test]
fn test_overflow_keeps_last_max_readings_in_order() {
    let max = 500;
    let extra = 37;
    let mut store = SampleStore::with_capacity(max);

    for n in 0..max + extra {
        store.record(reading(n));
        assert!(store.count() <= max);
    }

    assert_eq!(store.count(), max);
    let values: Vec<usize> = store
        .export_all()
        .iter()
        .map(|r| r.available_memory_mb as usize)
        .collect();
    let expected: Vec<usize> = (extra..max + extra).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_recent_most_recent_first() {
    let mut store = SampleStore::with_capacity(10);
    for n in 0..6 {
        store.record(reading(n));
    }

    let recent: Vec<usize> = store
        .recent(3)
        .iter()
        .map(|r| r.available_memory_mb as usize)
        .collect();
    assert_eq!(recent, vec![5, 4, 3]);
}

#[test]
fn test_export_does_not_alias_store() {
    let mut store = SampleStore::with_capacity(10);
    store.record(reading(1));

    let exported = store.export_all();
    store.record(reading(2));

    assert_eq!(exported.len(), 1);
    assert_eq!(store.count(), 2);
}
