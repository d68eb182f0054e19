use std::sync::Arc;
use std::time::Duration;

use tcc_monitor::core::monitor::{
    AlertKind, HostEvent, MonitorConfig, MonitorService, Pressure, ThermalState,
};
use tcc_monitor::platform::ChannelEventSource;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::FakeSource;

fn monitor(
    source: &Arc<FakeSource>,
    events: &ChannelEventSource,
    config: MonitorConfig,
) -> MonitorService {
    MonitorService::new(config, source.clone(), Arc::new(events.clone())).unwrap()
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_keeps_first_baseline() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());

    service.start().unwrap();
    source.set_available(500.0);
    service.start().unwrap();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.baseline_available_mb, 1000.0);
    assert_eq!(snapshot.count(), 1);
    assert!(snapshot.is_running);

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_ticks_measure_drop_from_previous_sample() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    service.start().unwrap();

    source.set_available(700.0);
    advance(2_100).await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.count(), 2);
    assert_eq!(snapshot.latest().unwrap().pressure, Pressure::SpikeDrop);
    let alert = snapshot.current_alert.clone().unwrap();
    assert_eq!(alert.kind, AlertKind::Pressure(Pressure::SpikeDrop));
    assert!(alert.message.contains("700 MB"));
    assert_eq!(snapshot.previous_available_mb, 700.0);

    // Previous is updated even though the last sample alerted
    source.set_available(650.0);
    advance(2_000).await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.count(), 3);
    assert_eq!(snapshot.latest().unwrap().pressure, Pressure::Elevated);
    assert_eq!(snapshot.current_alert.unwrap().raised_at, alert.raised_at);

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_low_memory_raises_critical_alert() {
    let source = Arc::new(FakeSource::new(400.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    service.start().unwrap();

    source.set_available(100.0);
    advance(2_100).await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.latest().unwrap().pressure, Pressure::Critical);
    let alert = snapshot.current_alert.unwrap();
    assert!(alert.message.contains("critical"));
    assert!(alert.message.contains("100 MB"));

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_history_is_bounded() {
    let source = Arc::new(FakeSource::new(2048.0));
    let events = ChannelEventSource::new();
    let config = MonitorConfig {
        sample_interval: Duration::from_secs(1),
        max_readings: 5,
        ..Default::default()
    };
    let mut service = monitor(&source, &events, config);
    service.start().unwrap();

    advance(10_500).await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.count(), 5);
    assert!(snapshot
        .readings
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_halts_ticks_and_events() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    service.start().unwrap();
    assert_eq!(events.subscriber_count(), 1);

    service.stop().await;
    assert!(!service.is_running());
    assert_eq!(events.subscriber_count(), 0);

    source.set_available(100.0);
    assert_eq!(events.emit(HostEvent::MemoryWarning), 0);
    advance(10_000).await;

    let snapshot = service.snapshot();
    assert_eq!(snapshot.count(), 1);
    assert!(snapshot.current_alert.is_none());
    assert!(!snapshot.is_running);
}

#[tokio::test(start_paused = true)]
async fn test_restart_captures_fresh_baseline() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());

    service.start().unwrap();
    advance(4_100).await;
    service.stop().await;
    assert_eq!(service.snapshot().count(), 3);

    source.set_available(800.0);
    service.start().unwrap();

    let snapshot = service.snapshot();
    assert_eq!(snapshot.baseline_available_mb, 800.0);
    assert_eq!(snapshot.count(), 1);
    assert_eq!(snapshot.latest().unwrap().pressure, Pressure::Normal);
    assert!(snapshot.current_alert.is_none());

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_memory_warning_event_alerts() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    service.start().unwrap();

    source.set_available(280.0);
    assert_eq!(events.emit(HostEvent::MemoryWarning), 1);
    advance(10).await;

    let alert = service.snapshot().current_alert.unwrap();
    assert_eq!(alert.kind, AlertKind::MemoryWarning);
    assert!(alert.message.contains("280 MB"));
    assert_eq!(alert.event_name(), "SYSTEM_MEMORY_WARNING");

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_thermal_events_alert_only_when_severe() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    service.start().unwrap();

    events.emit(HostEvent::ThermalChanged(ThermalState::Fair));
    advance(10).await;
    assert!(service.snapshot().current_alert.is_none());

    source.set_thermal(ThermalState::Critical);
    events.emit(HostEvent::ThermalChanged(ThermalState::Critical));
    advance(10).await;

    let alert = service.snapshot().current_alert.unwrap();
    assert_eq!(alert.kind, AlertKind::Thermal(ThermalState::Critical));
    assert!(alert.message.contains("critical"));
    assert_eq!(alert.event_name(), "THERMAL_CRITICAL");

    service.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_updates() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    let mut rx = service.subscribe();

    service.start().unwrap();
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().count(), 1);

    advance(2_100).await;
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().count(), 2);

    service.stop().await;
    assert!(!rx.borrow_and_update().is_running);
}

#[tokio::test(start_paused = true)]
async fn test_service_export() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let mut service = monitor(&source, &events, MonitorConfig::default());
    assert_eq!(service.export_json(), "[]");

    service.start().unwrap();
    advance(4_100).await;
    service.stop().await;

    let exported = tcc_monitor::core::monitor::import_json(&service.export_json()).unwrap();
    assert_eq!(exported, service.snapshot().readings);
    assert_eq!(exported.len(), 3);
}

async fn wait_for_event(server: &MockServer, event: &str) -> serde_json::Value {
    let found = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let requests = server.received_requests().await.unwrap_or_default();
            let hit = requests.iter().find_map(|request| {
                let body: serde_json::Value = serde_json::from_slice(&request.body).ok()?;
                (body["e"] == event).then_some(body)
            });
            if let Some(body) = hit {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    found.unwrap_or_else(|_| panic!("no {} beacon received", event))
}

#[tokio::test]
async fn test_heartbeat_on_start_and_urgent_beacon_on_alert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let config = MonitorConfig {
        sample_interval: Duration::from_millis(50),
        beacon_interval: Duration::from_secs(60),
        endpoint_base: server.uri(),
        webhook_token: "tok".to_string(),
        ..Default::default()
    };
    let mut service = monitor(&source, &events, config);
    service.start().unwrap();

    let heartbeat = wait_for_event(&server, "heartbeat").await;
    assert_eq!(heartbeat["urgent"], false);
    assert_eq!(heartbeat["baseline_mb"], 1000);

    source.set_available(100.0);
    let urgent = wait_for_event(&server, "CRITICAL").await;
    assert_eq!(urgent["urgent"], true);
    assert_eq!(urgent["mem_avail_mb"], 100);
    assert_eq!(urgent["drop_from_baseline_mb"], 900);

    events.emit(HostEvent::MemoryWarning);
    let warning = wait_for_event(&server, "SYSTEM_MEMORY_WARNING").await;
    assert_eq!(warning["urgent"], true);

    // Source still reports nominal; the beacon carries the state from the event
    events.emit(HostEvent::ThermalChanged(ThermalState::Serious));
    let thermal = wait_for_event(&server, "THERMAL_SERIOUS").await;
    assert_eq!(thermal["urgent"], true);
    assert_eq!(thermal["thermal"], "serious");

    service.stop().await;
    assert!(service.last_beacon_status().starts_with("Sent "));
}

#[tokio::test]
async fn test_token_can_be_set_while_running() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let config = MonitorConfig {
        beacon_interval: Duration::from_millis(100),
        endpoint_base: server.uri(),
        ..Default::default()
    };
    let mut service = monitor(&source, &events, config);
    service.start().unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(service.last_beacon_status(), "");

    service.set_webhook_token("late-token");
    let heartbeat = wait_for_event(&server, "heartbeat").await;
    assert_eq!(heartbeat["e"], "heartbeat");

    service.stop().await;
}

#[tokio::test]
async fn test_first_heartbeat_outcome_reaches_subscribers() {
    let source = Arc::new(FakeSource::new(1000.0));
    let events = ChannelEventSource::new();
    let config = MonitorConfig {
        sample_interval: Duration::from_secs(60),
        beacon_interval: Duration::from_secs(60),
        endpoint_base: "http://127.0.0.1:1".to_string(),
        webhook_token: "tok".to_string(),
        ..Default::default()
    };
    let mut service = monitor(&source, &events, config);
    let mut rx = service.subscribe();
    service.start().unwrap();

    // No tick fires in this window, so only the status change can publish
    let seen = tokio::time::timeout(
        Duration::from_secs(15),
        rx.wait_for(|snapshot| snapshot.last_beacon_status.starts_with("Failed: ")),
    )
    .await
    .is_ok_and(|result| result.is_ok());
    assert!(seen);

    service.stop().await;
}
