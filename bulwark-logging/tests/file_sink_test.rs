use bulwark_logging::{EventCategory, EventLog, EventSink, JsonlFileSink, ServiceEvent};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_file_sink_appends_json_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("error_logs.jsonl");

    let sink = JsonlFileSink::open(&path).unwrap();
    sink.record(
        &ServiceEvent::new("ElevenLabs", EventCategory::TransientError, "503 again")
            .with_retry_count(3)
            .with_circuit_state("CLOSED"),
    )
    .unwrap();
    sink.record(&ServiceEvent::new("LLM", EventCategory::Success, "ok"))
        .unwrap();
    drop(sink);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: ServiceEvent = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.service_name, "ElevenLabs");
    assert_eq!(first.category, EventCategory::TransientError);
    assert_eq!(first.retry_count, 3);

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["category"], "SUCCESS");
}

#[test]
fn test_reopening_keeps_existing_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");

    {
        let log = EventLog::new().with_sink(Arc::new(JsonlFileSink::open(&path).unwrap()));
        log.record(&ServiceEvent::new("LLM", EventCategory::Success, "first"));
    }
    {
        let log = EventLog::new().with_sink(Arc::new(JsonlFileSink::open(&path).unwrap()));
        log.record(&ServiceEvent::new("LLM", EventCategory::Success, "second"));
    }

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[test]
fn test_queued_events_are_flushed_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");

    let sink = JsonlFileSink::open(&path).unwrap();
    assert_eq!(sink.path(), path.as_path());
    for i in 0..500 {
        sink.record(&ServiceEvent::new(
            "ElevenLabs",
            EventCategory::TransientError,
            format!("attempt {i}"),
        ))
        .unwrap();
    }
    drop(sink);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 500);
    let last: ServiceEvent = serde_json::from_str(lines[499]).unwrap();
    assert_eq!(last.message, "attempt 499");
}

#[tokio::test(flavor = "current_thread")]
async fn test_recording_from_async_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.jsonl");

    let log = EventLog::new().with_sink(Arc::new(JsonlFileSink::open(&path).unwrap()));
    log.record(&ServiceEvent::new("LLM", EventCategory::Success, "ok"));
    tokio::task::yield_now().await;
    drop(log);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
}
