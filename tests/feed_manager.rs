// tests/feed_manager.rs
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use geonetnz_quakes::manager::EntityEvent::{Generated, Removed, Updated};
use geonetnz_quakes::{
    EntityEvent, FeedConfig, FixedClock, FixtureResponse, FixtureSource, QuakesFeed, QuakesFeedManager,
    RecordingHandler, UpdateStatus,
};

const HOME: (f64, f64) = (-41.2, 174.7);

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("missing fixture")
}

fn manager(responses: Vec<FixtureResponse>) -> (QuakesFeedManager, Arc<RecordingHandler>) {
    let feed = QuakesFeed::new(
        FeedConfig::new(HOME).with_mmi(5),
        Box::new(FixtureSource::sequence(responses)),
    )
    .expect("valid feed");
    let handler = Arc::new(RecordingHandler::new());
    (QuakesFeedManager::new(feed, Box::new(handler.clone())), handler)
}

fn ev(f: fn(String) -> EntityEvent, id: &str) -> EntityEvent {
    f(id.to_string())
}

#[tokio::test]
async fn feed_manager_generates_all_entries_on_first_update() {
    let (mut mgr, handler) = manager(vec![FixtureResponse::Body(fixture("quakes-1.json"))]);
    assert_eq!(
        mgr.to_string(),
        "QuakesFeedManager(feed=QuakesFeed(home=(-41.2, 174.7), \
         url=https://api.geonet.org.nz/quake?MMI=5, radius=None, magnitude=None, time=None))"
    );

    let summary = mgr.update().await;
    assert_eq!(summary.status, UpdateStatus::Ok);
    assert_eq!(mgr.feed_entries().len(), 3);
    assert_eq!(
        mgr.last_timestamp(),
        Some(Utc.with_ymd_and_hms(2019, 7, 24, 19, 0, 0).unwrap())
    );
    assert_eq!(summary.last_timestamp, mgr.last_timestamp());
    assert_eq!(summary.generated.len(), 3);
    assert!(summary.updated.is_empty());
    assert!(summary.removed.is_empty());
    assert_eq!(
        handler.events(),
        vec![
            ev(Generated, "2019p111111"),
            ev(Generated, "2019p222222"),
            ev(Generated, "2019p333333"),
        ]
    );
    assert!(mgr.last_update().is_some());
    assert_eq!(mgr.last_update(), mgr.last_update_successful());
}

#[tokio::test]
async fn second_snapshot_updates_known_and_removes_missing() {
    let (mut mgr, handler) = manager(vec![
        FixtureResponse::Body(fixture("quakes-1.json")),
        FixtureResponse::Body(fixture("quakes-3.json")),
    ]);
    mgr.update().await;
    let summary = mgr.update().await;

    assert_eq!(summary.removed, vec!["2019p111111", "2019p333333"]);
    assert_eq!(summary.updated, vec!["2019p222222"]);
    // 2019p444444 has a malformed time and is skipped
    assert_eq!(summary.generated, vec!["2019p555555"]);
    assert_eq!(
        mgr.feed_entries().keys().collect::<Vec<_>>(),
        vec!["2019p222222", "2019p555555"]
    );

    let events = handler.events();
    assert_eq!(
        &events[3..],
        &[
            ev(Removed, "2019p111111"),
            ev(Removed, "2019p333333"),
            ev(Updated, "2019p222222"),
            ev(Generated, "2019p555555"),
        ]
    );
}

#[tokio::test]
async fn not_modified_changes_nothing() {
    let (mut mgr, handler) = manager(vec![
        FixtureResponse::Body(fixture("quakes-1.json")),
        FixtureResponse::NotModified,
    ]);
    mgr.update().await;
    let summary = mgr.update().await;

    assert_eq!(summary.status, UpdateStatus::OkNoData);
    assert!(summary.generated.is_empty() && summary.updated.is_empty() && summary.removed.is_empty());
    assert_eq!(mgr.feed_entries().len(), 3);
    assert_eq!(handler.events().len(), 3);
}

#[tokio::test]
async fn error_removes_everything_but_keeps_last_successful_time() {
    let (mut mgr, handler) = manager(vec![
        FixtureResponse::Body(fixture("quakes-1.json")),
        FixtureResponse::Error("timeout".into()),
    ]);
    mgr.update().await;
    let successful = mgr.last_update_successful();

    let summary = mgr.update().await;
    assert_eq!(summary.status, UpdateStatus::Error);
    assert_eq!(summary.removed.len(), 3);
    assert!(mgr.feed_entries().is_empty());
    assert_eq!(mgr.last_update_successful(), successful);
    assert!(mgr.last_update() >= successful);

    let removed: Vec<_> = handler
        .events()
        .into_iter()
        .filter(|e| matches!(e, Removed(_)))
        .collect();
    assert_eq!(removed.len(), 3);
}

#[tokio::test]
async fn empty_snapshot_removes_all_and_resets_timestamp() {
    let (mut mgr, _handler) = manager(vec![
        FixtureResponse::Body(fixture("quakes-1.json")),
        FixtureResponse::Body(fixture("quakes-2.json")),
    ]);
    mgr.update().await;
    let summary = mgr.update().await;

    assert_eq!(summary.status, UpdateStatus::Ok);
    assert_eq!(summary.removed.len(), 3);
    assert!(mgr.feed_entries().is_empty());
    assert_eq!(mgr.last_timestamp(), None);
}

#[tokio::test]
async fn channel_handler_forwards_events() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<EntityEvent>();
    let feed = QuakesFeed::new(
        FeedConfig::new(HOME).with_minimum_magnitude(6.0),
        Box::new(FixtureSource::from_fixture_str(&fixture("quakes-1.json"))),
    )
    .unwrap();
    let mut mgr = QuakesFeedManager::new(feed, Box::new(tx));

    mgr.update().await;
    assert_eq!(rx.recv().await, Some(ev(Generated, "2019p333333")));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn update_times_come_from_the_feed_clock() {
    let fixed = Utc.with_ymd_and_hms(2019, 7, 24, 19, 30, 0).unwrap();
    let feed = QuakesFeed::with_clock(
        FeedConfig::new(HOME),
        Box::new(FixtureSource::sequence(vec![
            FixtureResponse::Body(fixture("quakes-1.json")),
            FixtureResponse::Error("timeout".into()),
        ])),
        Arc::new(FixedClock(fixed)),
    )
    .unwrap();
    let mut mgr = QuakesFeedManager::new(feed, Box::new(RecordingHandler::new()));

    mgr.update().await;
    assert_eq!(mgr.last_update(), Some(fixed));
    assert_eq!(mgr.last_update_successful(), Some(fixed));

    mgr.update().await;
    assert_eq!(mgr.last_update(), Some(fixed));
    assert_eq!(mgr.last_update_successful(), Some(fixed));
}
