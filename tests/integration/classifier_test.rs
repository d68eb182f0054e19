use tcc_monitor::core::monitor::{classify, Pressure, PressureThresholds};

#[test]
fn test_below_critical_low_is_always_critical() {
    let thresholds = PressureThresholds::default();
    for (previous, baseline) in [(100.0, 100.0), (5000.0, 100.0), (100.0, 9000.0), (0.0, 0.0)] {
        assert_eq!(
            classify(149.0, previous, baseline, &thresholds),
            Pressure::Critical,
            "previous={} baseline={}",
            previous,
            baseline
        );
    }
}

#[test]
fn test_spike_drop_beats_elevated() {
    let pressure = classify(700.0, 1000.0, 1000.0, &PressureThresholds::default());
    assert_eq!(pressure, Pressure::SpikeDrop);
}

#[test]
fn test_high_from_baseline_with_small_step() {
    let pressure = classify(450.0, 470.0, 1000.0, &PressureThresholds::default());
    assert_eq!(pressure, Pressure::High);
}

#[test]
fn test_low_memory_beats_spike_drop() {
    let thresholds = PressureThresholds {
        critical_low_mb: 150.0,
        ..Default::default()
    };
    assert_eq!(classify(100.0, 500.0, 600.0, &thresholds), Pressure::Critical);
}

#[test]
fn test_classification_is_deterministic() {
    let thresholds = PressureThresholds::default();
    let first = classify(640.0, 900.0, 1200.0, &thresholds);
    for _ in 0..10 {
        assert_eq!(classify(640.0, 900.0, 1200.0, &thresholds), first);
    }
}
