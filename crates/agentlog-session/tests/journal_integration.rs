#![allow(clippy::unwrap_used, clippy::expect_used)]

use agentlog_core::{Event, FIELD_SESSION_ID, FIELD_TASK, FIELD_TASK_ID, SESSION_ENDED, SESSION_STARTED};
use agentlog_session::{
    current_session_id, Classification, Document, DocumentStore, FileDocumentStore,
    JournalService,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Helper: a journal over a FileDocumentStore in a temp directory.
async fn temp_journal() -> (JournalService, Arc<FileDocumentStore>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(
        FileDocumentStore::new(tmp.path().join("data"))
            .await
            .unwrap(),
    );
    (JournalService::new(store.clone()), store, tmp)
}

fn started(id: &str, task: &str) -> Event {
    Event::new(SESSION_STARTED)
        .with(FIELD_SESSION_ID, id)
        .with(FIELD_TASK, task)
}

fn step(id: &str, n: u64) -> Event {
    Event::new("step").with(FIELD_SESSION_ID, id).with("n", n)
}

fn ended(id: &str) -> Event {
    Event::new(SESSION_ENDED).with(FIELD_SESSION_ID, id)
}

#[tokio::test]
async fn test_checkout_flow_scenario() {
    let (journal, _store, _tmp) = temp_journal().await;

    let ack = journal.ingest(started("s1", "Checkout Flow")).await.unwrap();
    assert_eq!(ack.event_count, 1);
    let live = journal.live_events().await.unwrap();
    assert_eq!(live[0].get_str(FIELD_TASK_ID), Some("CHECKOUT-FLOW-1"));

    let ack = journal.ingest(step("s1", 1)).await.unwrap();
    assert_eq!(ack.event_count, 2);
    let live = journal.live_events().await.unwrap();
    assert_eq!(live[1].get_str(FIELD_TASK_ID), Some("CHECKOUT-FLOW-1"));

    let ack = journal.ingest(ended("s1")).await.unwrap();
    assert_eq!(ack.event_count, 0);
    assert!(journal.live_events().await.unwrap().is_empty());

    let archive = journal.archived_events().await.unwrap();
    assert_eq!(archive.len(), 3);
    assert!(archive
        .iter()
        .all(|e| e.get_str(FIELD_TASK_ID) == Some("CHECKOUT-FLOW-1")));

    journal.ingest(started("s2", "Checkout Flow")).await.unwrap();
    let live = journal.live_events().await.unwrap();
    assert_eq!(live[0].get_str(FIELD_TASK_ID), Some("CHECKOUT-FLOW-2"));
}

#[tokio::test]
async fn test_foreign_event_is_acknowledged_but_dropped() {
    let (journal, _store, _tmp) = temp_journal().await;
    journal.ingest(started("s1", "Checkout Flow")).await.unwrap();
    journal.ingest(step("s1", 1)).await.unwrap();

    let ack = journal.ingest(step("s2", 1)).await.unwrap();
    assert_eq!(ack.outcome, Classification::Foreign);
    assert_eq!(ack.event_count, 2);

    let live = journal.live_events().await.unwrap();
    assert_eq!(live.len(), 2);
    assert!(live.iter().all(|e| e.session_id() == Some("s1")));
    assert!(journal.archived_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_flush_on_start_moves_prior_buffer_to_archive() {
    let (journal, _store, _tmp) = temp_journal().await;
    journal.ingest(started("s1", "Search")).await.unwrap();
    journal.ingest(step("s1", 1)).await.unwrap();
    journal.ingest(step("s1", 2)).await.unwrap();
    let before = journal.live_events().await.unwrap();

    let ack = journal.ingest(started("s2", "Search")).await.unwrap();
    assert_eq!(ack.event_count, 1);

    let live = journal.live_events().await.unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].session_id(), Some("s2"));
    assert_eq!(journal.archived_events().await.unwrap(), before);
}

#[tokio::test]
async fn test_flush_on_end_preserves_order() {
    let (journal, _store, _tmp) = temp_journal().await;
    journal.ingest(started("s1", "Search")).await.unwrap();
    for n in 1..=5 {
        journal.ingest(step("s1", n)).await.unwrap();
    }
    journal.ingest(ended("s1")).await.unwrap();

    let archive = journal.archived_events().await.unwrap();
    let kinds: Vec<_> = archive.iter().map(|e| e.kind().unwrap().to_string()).collect();
    assert_eq!(
        kinds,
        ["session_started", "step", "step", "step", "step", "step", "session_ended"]
    );
    let ns: Vec<_> = archive.iter().filter_map(|e| e.get("n")).cloned().collect();
    assert_eq!(ns, (1..=5).map(serde_json::Value::from).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_archive_accumulates_across_sessions() {
    let (journal, _store, _tmp) = temp_journal().await;
    for (id, task) in [("a", "Alpha"), ("b", "Beta"), ("c", "Alpha")] {
        journal.ingest(started(id, task)).await.unwrap();
        journal.ingest(step(id, 1)).await.unwrap();
        journal.ingest(ended(id)).await.unwrap();
    }

    let archive = journal.archived_events().await.unwrap();
    assert_eq!(archive.len(), 9);
    let ids: Vec<_> = archive
        .iter()
        .filter(|e| e.is_kind(SESSION_STARTED))
        .map(|e| e.get_str(FIELD_TASK_ID).unwrap().to_string())
        .collect();
    assert_eq!(ids, ["ALPHA-1", "BETA-1", "ALPHA-2"]);

    let counters = journal.task_counters().await.unwrap();
    assert_eq!(counters["ALPHA"], 2);
    assert_eq!(counters["BETA"], 1);
}

#[tokio::test]
async fn test_session_exclusivity_under_interleaving() {
    let (journal, store, _tmp) = temp_journal().await;
    let script = vec![
        step("x", 0),
        started("s1", "One"),
        step("s1", 1),
        step("s2", 1),
        started("s2", "Two"),
        step("s1", 2),
        step("s2", 2),
        ended("s2"),
        step("s3", 1),
        started("s3", "Three"),
        step("s3", 2),
    ];

    for event in script {
        journal.ingest(event).await.unwrap();
        let live = store.read_document(Document::Events).await.unwrap();
        let ids: HashSet<_> = live.iter().filter_map(Event::session_id).collect();
        assert!(ids.len() <= 1, "live buffer mixes sessions: {ids:?}");
        if let Some(current) = current_session_id(&live) {
            assert!(ids.contains(current));
        }
    }
}

#[tokio::test]
async fn test_state_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("data");

    {
        let store = Arc::new(FileDocumentStore::new(dir.clone()).await.unwrap());
        let journal = JournalService::new(store);
        journal.ingest(started("s1", "Checkout Flow")).await.unwrap();
        journal.ingest(step("s1", 1)).await.unwrap();
    }

    let store = Arc::new(FileDocumentStore::new(dir).await.unwrap());
    let journal = JournalService::new(store);
    let ack = journal.ingest(step("s1", 2)).await.unwrap();
    assert_eq!(ack.outcome, Classification::Continue);
    assert_eq!(ack.event_count, 3);

    journal.ingest(ended("s1")).await.unwrap();
    journal.ingest(started("s2", "Checkout Flow")).await.unwrap();
    let live = journal.live_events().await.unwrap();
    assert_eq!(live[0].get_str(FIELD_TASK_ID), Some("CHECKOUT-FLOW-2"));
}

#[tokio::test]
async fn test_corrupt_live_buffer_is_treated_as_empty() {
    let (journal, store, _tmp) = temp_journal().await;
    tokio::fs::write(store.path_for("events"), "{ definitely not an array")
        .await
        .unwrap();

    let ack = journal.ingest(started("s1", "Recover")).await.unwrap();
    assert_eq!(ack.event_count, 1);
    assert!(journal.archived_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_ingestion_loses_nothing() {
    let (journal, _store, _tmp) = temp_journal().await;
    let journal = Arc::new(journal);
    journal.ingest(started("s1", "Parallel")).await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let journal = journal.clone();
            tokio::spawn(async move { journal.ingest(step("s1", n)).await.unwrap() })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(journal.live_events().await.unwrap().len(), 21);
}
