use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use ask_engine::{
    run_turn, AnswerSummary, AssistantApi, ClientSettings, EngineEvent, EngineHandle, EventSink,
    FailureKind, FetchError, ReqwestApi, Source, TurnId,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn answer_text(events: &[EngineEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::AnswerDelta { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn position(events: &[EngineEvent], pred: impl Fn(&EngineEvent) -> bool) -> usize {
    events.iter().position(pred).expect("event present")
}

fn api_for(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("client")
}

async fn mount_similar(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/getSimilarQuestions"))
        .and(body_json(json!({"question": "What is TCP?"})))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_streamed_answer(server: &MockServer, sources: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/getAnswer"))
        .and(body_json(json!({"question": "What is TCP?", "sources": sources})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"text\":\"TCP is \"}\n\ndata: {\"text\":\"a protocol.\"}\n\n",
            "text/event-stream",
        ))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_turn_streams_answer_with_retrieved_sources() {
    let server = MockServer::start().await;
    let sources = json!([{"name": "RFC793", "url": "https://www.rfc-editor.org/rfc/rfc793"}]);
    Mock::given(method("POST"))
        .and(path("/api/getSources"))
        .and(body_json(json!({"question": "What is TCP?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(sources.clone()))
        .mount(&server)
        .await;
    mount_streamed_answer(&server, sources).await;
    mount_similar(
        &server,
        ResponseTemplate::new(200).set_body_json(json!(["What is UDP?"])),
    )
    .await;

    let api = api_for(&server);
    let sink = TestSink::default();
    run_turn(&api, 1, "What is TCP?", &sink, &CancellationToken::new()).await;
    let events = sink.take();

    assert_eq!(answer_text(&events), "TCP is a protocol.");
    assert_eq!(events.last(), Some(&EngineEvent::TurnSettled { turn: 1 }));
    assert!(events.iter().all(|event| event.turn() == 1));

    let loaded = position(&events, |e| matches!(e, EngineEvent::SourcesLoaded { .. }));
    let requested = position(&events, |e| matches!(e, EngineEvent::AnswerRequested { .. }));
    let completed = position(&events, |e| matches!(e, EngineEvent::AnswerCompleted { .. }));
    assert!(loaded < requested && requested < completed);

    assert!(events.contains(&EngineEvent::SourcesLoaded {
        turn: 1,
        result: Ok(vec![Source {
            name: "RFC793".to_string(),
            url: "https://www.rfc-editor.org/rfc/rfc793".to_string(),
        }]),
    }));
    assert!(events.contains(&EngineEvent::SimilarQuestionsLoaded {
        turn: 1,
        result: Ok(vec!["What is UDP?".to_string()]),
    }));
}

#[tokio::test]
async fn failed_sources_degrade_to_empty_list_for_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/getSources"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_streamed_answer(&server, json!([])).await;
    mount_similar(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

    let api = api_for(&server);
    let sink = TestSink::default();
    run_turn(&api, 2, "What is TCP?", &sink, &CancellationToken::new()).await;
    let events = sink.take();

    let sources_failure = events.iter().find_map(|event| match event {
        EngineEvent::SourcesLoaded {
            result: Err(err), ..
        } => Some(err.kind.clone()),
        _ => None,
    });
    assert_eq!(sources_failure, Some(FailureKind::HttpStatus(503)));
    assert_eq!(answer_text(&events), "TCP is a protocol.");
    assert_eq!(events.last(), Some(&EngineEvent::TurnSettled { turn: 2 }));
}

#[tokio::test]
async fn similar_questions_failure_does_not_abort_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/getSources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_streamed_answer(&server, json!([])).await;
    mount_similar(&server, ResponseTemplate::new(500)).await;

    let api = api_for(&server);
    let sink = TestSink::default();
    run_turn(&api, 3, "What is TCP?", &sink, &CancellationToken::new()).await;
    let events = sink.take();

    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::SimilarQuestionsLoaded { result: Err(_), .. }
    )));
    assert!(events
        .iter()
        .any(|event| matches!(event, EngineEvent::AnswerCompleted { result: Ok(_), .. })));
    assert_eq!(events.last(), Some(&EngineEvent::TurnSettled { turn: 3 }));
}

#[tokio::test]
async fn cancelled_turn_emits_nothing() {
    let server = MockServer::start().await;
    let api = api_for(&server);
    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    run_turn(&api, 4, "What is TCP?", &sink, &cancel).await;

    assert!(sink.take().is_empty());
}

/// Answers instantly for the sources and similar endpoints and streams the
/// answer slowly, one delta per 20ms, until cancelled.
struct SlowApi;

#[async_trait::async_trait]
impl AssistantApi for SlowApi {
    async fn sources(&self, _question: &str) -> Result<Vec<Source>, FetchError> {
        Ok(Vec::new())
    }

    async fn answer(
        &self,
        turn: TurnId,
        _question: &str,
        _sources: &[Source],
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<AnswerSummary, FetchError> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(FetchError {
                        kind: FailureKind::Cancelled,
                        message: "cancelled".to_string(),
                    });
                }
                _ = tokio::time::sleep(Duration::from_millis(20)) => {
                    sink.emit(EngineEvent::AnswerDelta {
                        turn,
                        text: "x".to_string(),
                    });
                }
            }
        }
    }

    async fn similar_questions(&self, _question: &str) -> Result<Vec<String>, FetchError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn cancel_mid_answer_stops_the_turn_without_an_outcome() {
    let sink = TestSink::default();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(70)).await;
        trigger.cancel();
    });

    run_turn(&SlowApi, 6, "What is TCP?", &sink, &cancel).await;

    let events = sink.take();
    assert!(!answer_text(&events).is_empty());
    assert!(events.iter().all(|event| !matches!(
        event,
        EngineEvent::AnswerCompleted { .. } | EngineEvent::TurnSettled { .. }
    )));
}

struct ChannelSink {
    tx: Mutex<mpsc::Sender<EngineEvent>>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.lock().unwrap().send(event);
    }
}

#[test]
fn starting_a_new_turn_cancels_the_previous_one() {
    let (tx, rx) = mpsc::channel();
    let sink = Arc::new(ChannelSink { tx: Mutex::new(tx) });
    let engine = EngineHandle::with_api(Arc::new(SlowApi), sink).expect("engine");

    engine.start_turn(1, "first");
    let first = rx.recv_timeout(Duration::from_secs(2)).expect("first event");
    assert_eq!(first.turn(), 1);

    engine.start_turn(2, "second");
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    let mut saw_second = false;
    while std::time::Instant::now() < deadline {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) if event.turn() == 2 => {
                saw_second = true;
                break;
            }
            Ok(_) | Err(_) => {}
        }
    }
    assert!(saw_second);

    // Once turn 2 streams, turn 1 must stay silent.
    let late: Vec<_> = rx
        .try_iter()
        .chain(std::iter::from_fn(|| {
            rx.recv_timeout(Duration::from_millis(100)).ok()
        }))
        .take(5)
        .collect();
    assert!(late.iter().all(|event| event.turn() == 2));

    engine.cancel_turn(2);
}
