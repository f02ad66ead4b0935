use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::answer::{consume_answer, AnswerSettings};
use crate::orchestrator::EventSink;
use crate::{AnswerSummary, EngineError, FailureKind, FetchError, Source, TurnId};

const SOURCES_PATH: &str = "/api/getSources";
const ANSWER_PATH: &str = "/api/getAnswer";
const SIMILAR_QUESTIONS_PATH: &str = "/api/getSimilarQuestions";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Origin the `/api/*` paths are resolved against.
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout for the JSON endpoints; the answer stream uses
    /// `answer.idle_timeout` instead.
    pub request_timeout: Duration,
    pub answer: AnswerSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            answer: AnswerSettings::default(),
        }
    }
}

/// The three backend endpoints a turn talks to.
#[async_trait::async_trait]
pub trait AssistantApi: Send + Sync {
    async fn sources(&self, question: &str) -> Result<Vec<Source>, FetchError>;

    /// Requests an answer and drains it into `sink` until the stream ends.
    async fn answer(
        &self,
        turn: TurnId,
        question: &str,
        sources: &[Source],
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<AnswerSummary, FetchError>;

    async fn similar_questions(&self, question: &str) -> Result<Vec<String>, FetchError>;
}

#[derive(Serialize)]
struct QuestionBody<'a> {
    question: &'a str,
}

#[derive(Serialize)]
struct AnswerBody<'a> {
    question: &'a str,
    sources: &'a [Source],
}

#[derive(Debug, Clone)]
pub struct ReqwestApi {
    client: reqwest::Client,
    base_url: reqwest::Url,
    settings: ClientSettings,
}

impl ReqwestApi {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let base_url = reqwest::Url::parse(&settings.base_url).map_err(|err| {
            EngineError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                message: err.to_string(),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::InvalidBaseUrl {
                url: settings.base_url.clone(),
                message: "url cannot be a base".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .timeout(self.settings.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

#[async_trait::async_trait]
impl AssistantApi for ReqwestApi {
    async fn sources(&self, question: &str) -> Result<Vec<Source>, FetchError> {
        self.post_json(SOURCES_PATH, &QuestionBody { question }).await
    }

    async fn answer(
        &self,
        turn: TurnId,
        question: &str,
        sources: &[Source],
        sink: &dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<AnswerSummary, FetchError> {
        let request = self
            .client
            .post(self.endpoint(ANSWER_PATH)?)
            .json(&AnswerBody { question, sources })
            .send();

        let idle_timeout = self.settings.answer.idle_timeout;
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::cancelled()),
            sent = tokio::time::timeout(idle_timeout, request) => match sent {
                Err(_) => {
                    return Err(FetchError::new(
                        FailureKind::Timeout,
                        format!("no answer response within {idle_timeout:?}"),
                    ))
                }
                Ok(result) => result.map_err(map_reqwest_error)?,
            },
        };

        consume_answer(response, turn, &self.settings.answer, sink, cancel).await
    }

    async fn similar_questions(&self, question: &str) -> Result<Vec<String>, FetchError> {
        self.post_json(SIMILAR_QUESTIONS_PATH, &QuestionBody { question })
            .await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
