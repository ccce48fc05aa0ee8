//! Call agent behaviour in simulated and live modes

use bulwark::session::{self, Step};
use bulwark::{build_agent, CallAgent, Contact, ServiceSet};
use bulwark_alerts::WebhookConfig;
use bulwark_config::{BulwarkConfig, ServiceMode};
use bulwark_logging::{EventCategory, EventLog, MemorySink};
use bulwark_resilience::{
    CircuitBreakerConfig, CircuitState, FailureKind, HealthConfig, HealthMonitor, ManualClock,
    ResilienceError, ResilientInvoker, RetryPolicy,
};
use bulwark_services::{FailureSchedule, LLM_SERVICE, SPEECH_SERVICE};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn simulated_agent(max_attempts: u32, failure_threshold: u32) -> (CallAgent, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new(64));
    let invoker = ResilientInvoker::builder()
        .retry_policy(RetryPolicy::new(Duration::from_secs(1), max_attempts, 2.0))
        .breaker_config(CircuitBreakerConfig {
            failure_threshold,
            open_timeout: Duration::from_secs(60),
            half_open_required_successes: 1,
        })
        .clock(Arc::new(ManualClock::new()))
        .events(EventLog::new().with_sink(sink.clone()))
        .build();

    let agent = CallAgent::new(
        Arc::new(invoker),
        ServiceSet::simulated(),
        HealthMonitor::new(HealthConfig::default()),
        "narrator",
    )
    .with_recent_events(sink.clone());
    (agent, sink)
}

fn contacts(n: usize) -> Vec<Contact> {
    (1..=n)
        .map(|i| Contact::new(format!("Contact {i}"), format!("+1-555-010{i}")))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn simulated_call_completes() {
    let (agent, sink) = simulated_agent(3, 5);

    let outcome = agent
        .make_call(&Contact::new("Ada Lovelace", "+1-555-0100"))
        .await
        .unwrap();

    assert_eq!(outcome.contact.name, "Ada Lovelace");
    assert!(!outcome.script.is_empty());
    assert_eq!(outcome.voice_id, "narrator");
    assert_eq!(outcome.audio_bytes, 1024);

    let successes = sink.by_category(EventCategory::Success);
    assert_eq!(successes.len(), 2);
    assert_eq!(successes[0].service_name, LLM_SERVICE);
    assert_eq!(successes[1].service_name, SPEECH_SERVICE);
}

#[tokio::test(start_paused = true)]
async fn short_outage_is_absorbed_by_retries() {
    let (agent, sink) = simulated_agent(4, 3);
    assert!(agent.simulate_speech_outage(FailureSchedule::first_calls(
        3,
        FailureKind::ServiceUnavailable
    )));

    agent
        .make_call(&Contact::new("Grace Hopper", "+1-555-0101"))
        .await
        .unwrap();

    let speech = agent.invoker().breaker(SPEECH_SERVICE).snapshot();
    assert_eq!(speech.state, CircuitState::Closed);
    assert_eq!(speech.failure_count, 0);
    assert_eq!(sink.last().unwrap().retry_count, 3);
    assert!(sink.by_category(EventCategory::CallFailed).is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_call_is_skipped_and_batch_continues() {
    let (agent, sink) = simulated_agent(2, 3);
    agent.simulate_speech_outage(FailureSchedule::first_calls(
        2,
        FailureKind::ServiceUnavailable,
    ));

    let report = agent.run_batch(&contacts(2)).await;

    assert_eq!(report.total(), 2);
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.success_rate(), 0.5);
    assert_eq!(report.failed[0].contact.name, "Contact 1");
    assert!(!report.failed[0].circuit_open);
    assert_eq!(report.completed[0].contact.name, "Contact 2");

    let failed = sink.by_category(EventCategory::CallFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].service_name, "CallAgent");
    assert_eq!(failed[0].metadata["contact"], "Contact 1");
    assert_eq!(failed[0].metadata["phone"], "+1-555-0101");
}

#[tokio::test(start_paused = true)]
async fn open_breaker_skips_calls_until_reset() {
    let (agent, sink) = simulated_agent(1, 2);
    agent.simulate_speech_outage(FailureSchedule::Always {
        kind: FailureKind::Timeout,
    });

    let report = agent.run_batch(&contacts(3)).await;
    assert_eq!(report.failed.len(), 3);
    assert!(!report.failed[1].circuit_open);
    assert!(report.failed[2].circuit_open);
    assert_eq!(sink.by_category(EventCategory::CircuitBreakerOpen).len(), 1);

    let status = agent.system_status();
    assert!(!status.all_clear());
    let speech = status
        .circuit_breakers
        .iter()
        .find(|b| b.service == SPEECH_SERVICE)
        .unwrap();
    assert_eq!(speech.state, CircuitState::Open);
    assert!(status.to_string().contains("Unavailable"));

    agent.reset();
    assert_eq!(
        agent.invoker().breaker(SPEECH_SERVICE).state(),
        CircuitState::Closed
    );
    agent.make_call(&contacts(1)[0]).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_not_retried() {
    let (agent, _sink) = simulated_agent(4, 3);
    agent.simulate_speech_outage(FailureSchedule::Always {
        kind: FailureKind::AuthenticationFailure,
    });

    let err = agent
        .make_call(&Contact::new("Alan Turing", "+1-555-0102"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResilienceError::Permanent(_)));
}

#[tokio::test(start_paused = true)]
async fn status_reports_health_after_check() {
    let (agent, _sink) = simulated_agent(3, 5);

    agent.health().check_now().await;
    let status = agent.system_status();
    assert_eq!(status.health.get(LLM_SERVICE), Some(&true));
    assert_eq!(status.health.get(SPEECH_SERVICE), Some(&true));
    assert_eq!(status.circuit_breakers.len(), 2);
    assert!(status.all_clear());

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["circuit_breakers"][0]["state"], "CLOSED");
}

#[tokio::test(start_paused = true)]
async fn session_keeps_breaker_state_between_commands() {
    let (agent, _sink) = simulated_agent(1, 2);
    let input = "\
outage 5 unavailable
call Ada Lovelace +1-555-0100
call Grace Hopper +1-555-0101
status
reset
quit
call Never Reached +1-555-0199
";
    let mut output = Vec::new();
    session::run(&agent, input.as_bytes(), &mut output)
        .await
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert!(output.contains("next 5 speech requests fail"));
    assert!(output.contains("call to Ada Lovelace skipped"));
    assert!(output.contains("call to Grace Hopper skipped"));
    assert!(output.contains("OPEN"));
    assert!(output.contains("Unavailable"));
    assert!(output.contains("all circuit breakers CLOSED"));
    assert!(!output.contains("Never Reached"));

    assert_eq!(
        agent.invoker().breaker(SPEECH_SERVICE).state(),
        CircuitState::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn session_rejects_malformed_commands() {
    let (agent, _sink) = simulated_agent(3, 5);

    assert_eq!(
        session::execute(&agent, "call +1-555-0100").await,
        Step::Reply("usage: call <name> <phone>".to_string())
    );
    assert_eq!(
        session::execute(&agent, "outage many").await,
        Step::Reply("usage: outage <n> [kind]".to_string())
    );
    assert_eq!(session::execute(&agent, "exit").await, Step::Quit);
    match session::execute(&agent, "frobnicate").await {
        Step::Reply(reply) => assert!(reply.contains("unknown command")),
        Step::Quit => panic!("unexpected quit"),
    }
}

fn live_config(server: &MockServer) -> BulwarkConfig {
    let mut config = BulwarkConfig::default();
    config.retry = RetryPolicy::new(Duration::from_millis(10), 2, 2.0);
    config.logging.event_log = None;
    config.logging.echo_events = false;
    config.alerts.log = false;

    config.services.mode = ServiceMode::Live;
    config.services.llm.url = format!("{}/v1/chat/completions", server.uri());
    config.services.llm.health_url = format!("{}/v1/models", server.uri());
    config.services.llm.api_key = Some("llm-key".to_string());
    config.services.speech.url = format!("{}/v1/text-to-speech", server.uri());
    config.services.speech.health_url = format!("{}/v1/voices", server.uri());
    config.services.speech.api_key = Some("speech-key".to_string());
    config.services.speech.default_voice_id = "narrator".to_string();
    config
}

async fn mock_llm(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer llm-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "Hi, this is a reminder call."}}],
            "usage": {"total_tokens": 42}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn live_call_goes_through_both_providers() {
    let server = MockServer::start().await;
    mock_llm(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/narrator"))
        .and(header("xi-api-key", "speech-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(vec![7u8; 256]),
        )
        .mount(&server)
        .await;

    let agent = build_agent(&live_config(&server)).unwrap();
    assert!(!agent.simulate_speech_outage(FailureSchedule::Never));

    let outcome = agent
        .make_call(&Contact::new("Ada Lovelace", "+1-555-0100"))
        .await
        .unwrap();
    assert_eq!(outcome.script, "Hi, this is a reminder call.");
    assert_eq!(outcome.audio_bytes, 256);

    let events = agent.system_status().recent_events;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.category == EventCategory::Success));
}

#[tokio::test]
async fn live_permanent_failure_raises_webhook_alert() {
    let server = MockServer::start().await;
    mock_llm(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/narrator"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = live_config(&server);
    config.alerts.webhook = Some(WebhookConfig::new(format!("{}/alerts", server.uri())));
    let agent = build_agent(&config).unwrap();

    let err = agent
        .make_call(&Contact::new("Ada Lovelace", "+1-555-0100"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResilienceError::Permanent(_)));
    agent.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    let alert = requests
        .iter()
        .find(|r| r.url.path() == "/alerts")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&alert.body).unwrap();
    assert_eq!(body["subject"], "ElevenLabs - Permanent Error");
    assert_eq!(body["severity"], "critical");
}

#[test]
fn event_log_appends_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs").join("error_logs.jsonl");
    let logging = bulwark_logging::LoggingConfig {
        event_log: Some(path.clone()),
        echo_events: false,
        ..Default::default()
    };

    let (events, memory) = bulwark::build_event_log(&logging).unwrap();
    events.record(&bulwark_logging::ServiceEvent::new(
        SPEECH_SERVICE,
        EventCategory::TransientError,
        "Service temporarily unavailable",
    ));

    assert_eq!(memory.len(), 1);
    drop(events);
    let content = std::fs::read_to_string(&path).unwrap();
    let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(line["service_name"], "ElevenLabs");
    assert_eq!(line["category"], "TRANSIENT_ERROR");
}
