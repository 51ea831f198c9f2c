use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use siteguard_agent::start;
use siteguard_compliance::RuleCatalog;
use siteguard_core::Address;
use siteguard_events::{EnrichedBatch, Envelope, Schema, Transport};
use siteguard_infra::actors::{CameraFeed, DispatchMode, SampleFeed};
use siteguard_infra::{AgentConfig, InMemorySink};

const WAIT: Duration = Duration::from_secs(5);

fn catalog() -> Arc<RuleCatalog> {
    Arc::new(
        RuleCatalog::from_json_value(json!({
            "Michigan": {
                "hardhat": {"rule": "MIOSHA Part 6", "consequence": "Citation and fine"},
                "Mask": {"rule": "MIOSHA Part 451", "consequence": "Citation"}
            }
        }))
        .unwrap(),
    )
}

fn config() -> AgentConfig {
    AgentConfig {
        send_interval: Duration::from_millis(10),
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn sample_feed_flows_through_to_the_sink() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = start(&config(), catalog(), sink.clone(), Some(Box::new(SampleFeed::default())));

    let alerts = tokio::time::timeout(WAIT, sink.wait_for(2)).await.unwrap();
    assert_eq!(
        alerts[0],
        "⚠️ Compliance Alert - Frames 1-14 | State: Michigan | Persons: 1\n\
         1. 👤 Person 1: hardhat → MIOSHA Part 6, Consequence: Citation and fine\n\
         2. 👤 Person 1: mask → MIOSHA Part 451, Consequence: Citation\n\
         3. 👤 Person 1: safety vest → Unknown, Consequence: Unknown\n"
    );
    assert!(alerts[1].starts_with(
        "⚠️ Compliance Alert - Frames 28-57 | State: Michigan | Persons: 2\n"
    ));
    assert!(alerts[1].contains(
        "3. 👤 Person 2: safety vest → Unknown, Consequence: Unknown\n"
    ));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn camera_frames_are_migrated_and_enriched() {
    let sink = Arc::new(InMemorySink::new());
    let feed = CameraFeed::simulated("Michigan");
    let pipeline = start(&config(), catalog(), sink.clone(), Some(Box::new(feed)));

    let alerts = tokio::time::timeout(WAIT, sink.wait_for(1)).await.unwrap();
    assert!(alerts[0].starts_with(
        "⚠️ Compliance Alert - Frame 1 | State: Michigan | Persons: 2\n"
    ));
    assert!(alerts[0].contains(
        "2. 👤 Person 2: hardhat → MIOSHA Part 6, Consequence: Citation and fine\n"
    ));
    assert!(alerts[0].contains("3. 👤 Person 2: gloves → Unknown, Consequence: Unknown\n"));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn replies_reach_the_original_sender_and_bad_batches_are_dropped() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = start(&config(), catalog(), sink.clone(), None);
    let transport = pipeline.transport();

    let client = Address::new("agent1qclient");
    let mut inbox = transport.register(client.clone(), 8);

    let router = pipeline.router().clone();
    let missing_state = json!({"frame_start": 3, "frame_end": 4, "violations": []});
    let rejected =
        Envelope::raw(Schema::ViolationBatchV2, client.clone(), router.clone(), missing_state);
    transport.deliver(rejected).await.unwrap();

    let valid = json!({
        "frame_start": 28,
        "frame_end": 57,
        "state": "Michigan",
        "persons": 2,
        "violations": [
            {"person_id": 1, "missing": [{"item": "hardhat"}]},
            {"person_id": 2, "missing": ["mask", {"item": "safety vest"}]},
            {"person_id": "three", "missing": ["gloves"]}
        ]
    });
    let request = Envelope::raw(Schema::ViolationBatchV2, client.clone(), router, valid);
    transport.deliver(request).await.unwrap();

    let reply = inbox.recv_timeout(WAIT).await.expect("enriched reply");
    assert_eq!(reply.schema(), Schema::EnrichedBatchV2);
    assert_eq!(reply.sender(), pipeline.enricher());

    let enriched: EnrichedBatch = reply.open().unwrap();
    assert_eq!((enriched.frame_start, enriched.frame_end), (28, 57));
    assert_eq!(enriched.persons, 2);
    assert_eq!(enriched.violations.len(), 2);
    assert_eq!(enriched.violations[1].missing[0].rule, "MIOSHA Part 451");
    assert_eq!(enriched.violations[1].missing[1].rule, "Unknown");

    let alerts = tokio::time::timeout(WAIT, sink.wait_for(1)).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("⚠️ Compliance Alert - Frames 28-57"));

    // The rejected batch produced neither a reply nor an alert.
    assert!(inbox.recv_timeout(Duration::from_millis(100)).await.is_none());
    assert_eq!(sink.alerts().len(), 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn reply_only_mode_skips_the_sink() {
    let sink = Arc::new(InMemorySink::new());
    let config = AgentConfig {
        dispatch: DispatchMode::Reply,
        ..config()
    };
    let pipeline = start(&config, catalog(), sink.clone(), None);
    let transport = pipeline.transport();

    let client = Address::new("agent1qclient");
    let mut inbox = transport.register(client.clone(), 8);

    let empty = json!({"frame_id": 9, "state": "Ohio"});
    transport
        .deliver(Envelope::raw(Schema::ViolationFrameV1, client, pipeline.router().clone(), empty))
        .await
        .unwrap();

    let enriched: EnrichedBatch = inbox.recv_timeout(WAIT).await.unwrap().open().unwrap();
    assert_eq!((enriched.frame_start, enriched.frame_end), (9, 9));
    assert!(enriched.violations.is_empty());
    assert!(sink.alerts().is_empty());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_every_actor() {
    let sink = Arc::new(InMemorySink::new());
    let pipeline = start(&config(), catalog(), sink, Some(Box::new(SampleFeed::default())));
    let transport = pipeline.transport();
    let addresses = [
        pipeline.producer().clone(),
        pipeline.router().clone(),
        pipeline.enricher().clone(),
    ];

    pipeline.shutdown().await;

    for address in &addresses {
        assert!(!transport.is_registered(address));
    }
}
