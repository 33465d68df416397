use asi_core::{Gear, ParkFlag, Reading, PARK_SPEED_MARGIN};
use asi_status::{standing, MonitorOutcome, ParkMonitor};

#[test]
fn test_starts_not_park() {
    let monitor = ParkMonitor::new();
    assert_eq!(monitor.flag(), ParkFlag::NotPark);
}

#[test]
fn test_parked_and_standing_confirms() {
    let mut monitor = ParkMonitor::new();
    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(0.0));
    assert_eq!(outcome, MonitorOutcome::Confirmed);
    assert_eq!(monitor.flag(), ParkFlag::Park);
}

#[test]
fn test_margin_is_inclusive_and_symmetric() {
    assert!(standing(0.0));
    assert!(standing(PARK_SPEED_MARGIN));
    assert!(standing(-PARK_SPEED_MARGIN));
    assert!(!standing(PARK_SPEED_MARGIN + 0.01));
    assert!(!standing(-PARK_SPEED_MARGIN - 0.01));

    // Rollback creep just inside the margin still counts as standing
    let mut monitor = ParkMonitor::new();
    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(-0.15));
    assert_eq!(outcome, MonitorOutcome::Confirmed);
    assert_eq!(monitor.flag(), ParkFlag::Park);
}

#[test]
fn test_park_while_moving_is_a_mismatch() {
    let mut monitor = ParkMonitor::new();
    monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(0.0));
    assert_eq!(monitor.flag(), ParkFlag::Park);

    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(1.2));
    assert_eq!(outcome, MonitorOutcome::SpeedMismatch);
    assert_eq!(monitor.flag(), ParkFlag::NotPark);
}

#[test]
fn test_driving_clears_silently() {
    let mut monitor = ParkMonitor::new();
    monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(0.0));

    // Not-Park gear is normal operation, not a fault
    let outcome = monitor.evaluate(Reading::Fresh(Gear::Drive), Reading::Fresh(8.5));
    assert_eq!(outcome, MonitorOutcome::Confirmed);
    assert_eq!(monitor.flag(), ParkFlag::NotPark);
}

#[test]
fn test_invalid_speed_fails_closed() {
    let mut monitor = ParkMonitor::new();
    monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(0.0));

    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(f32::NAN));
    assert_eq!(outcome, MonitorOutcome::SourceInvalid);
    assert_eq!(monitor.flag(), ParkFlag::NotPark);

    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(f32::INFINITY));
    assert_eq!(outcome, MonitorOutcome::SourceInvalid);
    assert_eq!(monitor.flag(), ParkFlag::NotPark);
}

#[test]
fn test_stale_sources_hold_last_flag() {
    let mut monitor = ParkMonitor::new();
    monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Fresh(0.0));
    assert_eq!(monitor.flag(), ParkFlag::Park);

    // A dropout must not flip admission either way
    let outcome = monitor.evaluate(Reading::Stale, Reading::Fresh(0.0));
    assert_eq!(outcome, MonitorOutcome::SourcesStale);
    assert_eq!(monitor.flag(), ParkFlag::Park);

    let outcome = monitor.evaluate(Reading::Fresh(Gear::Park), Reading::Stale);
    assert_eq!(outcome, MonitorOutcome::SourcesStale);
    assert_eq!(monitor.flag(), ParkFlag::Park);

    let outcome = monitor.evaluate(Reading::Stale, Reading::Stale);
    assert_eq!(outcome, MonitorOutcome::SourcesStale);
    assert_eq!(monitor.flag(), ParkFlag::Park);
}
