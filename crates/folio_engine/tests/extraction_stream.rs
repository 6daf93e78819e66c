use std::sync::Mutex;

use folio_core::ProgressMessage;
use folio_engine::{
    stream_extraction, ClientSettings, ExtractionError, HttpBackend, START_FAILED_DEFAULT,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Recorded {
    messages: Mutex<Vec<ProgressMessage>>,
}

impl Recorded {
    fn sink(&self) -> impl Fn(&ProgressMessage) + Send + Sync + '_ {
        move |message: &ProgressMessage| self.messages.lock().unwrap().push(message.clone())
    }

    fn events(&self) -> Vec<&'static str> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(ProgressMessage::event_name)
            .collect()
    }
}

fn sse(records: &[serde_json::Value]) -> String {
    records
        .iter()
        .map(|record| format!("data: {record}\n\n"))
        .collect()
}

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .unwrap()
}

async fn mount_stream(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/documents/doc-1/extract-actionables"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_stream_returns_complete_payload() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            json!({"event": "start", "total_nodes": 50}),
            json!({"event": "prefilter_done", "candidate_count": 12, "total_nodes": 50}),
            json!({"event": "batches_planned", "total_batches": 1, "candidate_count": 12}),
            json!({"event": "batch_start", "batch": 1, "sections": ["A"]}),
            json!({"event": "batch_done", "batch": 1, "batch_actionables": 4, "cumulative_actionables": 4}),
            json!({"event": "validation_start", "total_actionables": 4}),
            json!({"event": "validation_done", "validated": 3, "flagged": 1}),
            json!({"event": "complete", "result": {"doc_id": "doc-1", "total_extracted": 4}}),
            json!({"event": "start", "total_nodes": 99}),
        ]),
    )
    .await;

    let recorded = Recorded::default();
    let result = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .expect("complete");

    assert_eq!(result, json!({"doc_id": "doc-1", "total_extracted": 4}));
    assert_eq!(
        recorded.events(),
        vec![
            "start",
            "prefilter_done",
            "batches_planned",
            "batch_start",
            "batch_done",
            "validation_start",
            "validation_done",
            "complete",
        ]
    );
}

#[tokio::test]
async fn stream_ending_after_validation_start_fails() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            json!({"event": "start", "total_nodes": 5}),
            json!({"event": "validation_start", "total_actionables": 2}),
        ]),
    )
    .await;

    let recorded = Recorded::default();
    let err = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, ExtractionError::EndedWithoutComplete);
    assert_eq!(recorded.events(), vec!["start", "validation_start"]);
}

#[tokio::test]
async fn malformed_terminal_record_counts_as_ended_without_complete() {
    let server = MockServer::start().await;
    let mut body = sse(&[json!({"event": "start", "total_nodes": 5})]);
    body.push_str("data: {\"event\":\"complete\",\"result\":\n\n");
    mount_stream(&server, body).await;

    let recorded = Recorded::default();
    let err = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err, ExtractionError::EndedWithoutComplete);
}

#[tokio::test]
async fn error_record_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        sse(&[
            json!({"event": "start", "total_nodes": 5}),
            json!({"event": "error", "message": "Document has no sections"}),
            json!({"event": "complete", "result": {}}),
        ]),
    )
    .await;

    let recorded = Recorded::default();
    let err = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        ExtractionError::Job {
            message: "Document has no sections".into()
        }
    );
    assert_eq!(err.failure_reason(), "Document has no sections");
    assert_eq!(recorded.events(), vec!["start", "error"]);
}

#[tokio::test]
async fn start_failure_uses_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/doc-1/extract-actionables"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Document not found"})),
        )
        .mount(&server)
        .await;

    let recorded = Recorded::default();
    let err = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err,
        ExtractionError::StartFailed {
            reason: "Document not found".into()
        }
    );
    assert!(recorded.events().is_empty());
}

#[tokio::test]
async fn start_failure_without_body_uses_default_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/doc-1/extract-actionables"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let recorded = Recorded::default();
    let err = stream_extraction(
        &backend(&server),
        "doc-1",
        false,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.failure_reason(), START_FAILED_DEFAULT);
}

#[tokio::test]
async fn forced_rerun_of_cached_result_streams_only_complete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/doc-1/extract-actionables"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse(&[json!({"event": "complete", "result": {"total_extracted": 0}})]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let recorded = Recorded::default();
    let result = stream_extraction(
        &backend(&server),
        "doc-1",
        true,
        &recorded.sink(),
        &CancellationToken::new(),
    )
    .await
    .expect("complete");

    assert_eq!(result, json!({"total_extracted": 0}));
}

#[tokio::test]
async fn cancelled_token_stops_before_opening_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let recorded = Recorded::default();
    let err = stream_extraction(&backend(&server), "doc-1", false, &recorded.sink(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ExtractionError::Cancelled);
}
