//! REST client for the contract drafting agent.
//!
//! Implements the core crate's [`AgentChannel`] and [`IntakeChannel`] seams
//! over HTTP. Error convention: connection failures are transport errors;
//! non-2xx responses carry `{"detail": ...}` which is surfaced verbatim when
//! present, else a generic message.

use crate::config::ClientConfig;
use async_trait::async_trait;
use draftsmith_core::catalog::{CatalogSubmission, ContractRecord, SavedContract, StatusUpdate};
use draftsmith_core::driver::AgentChannel;
use draftsmith_core::error::{DraftError, Result};
use draftsmith_core::intake::{
    DocumentAnalysis, DocumentUpload, FinalContract, IntakeChannel, NextQuestion,
};
use draftsmith_core::protocol::{AgentReply, TurnRequest, decode_event};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the drafting agent REST API.
#[derive(Clone)]
pub struct AgentApiClient {
    client: Client,
    base_url: String,
    turn_delay: Duration,
}

impl AgentApiClient {
    /// Creates a client against `base_url` with the default turn delay.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            turn_delay: crate::config::DEFAULT_TURN_DELAY,
        }
    }

    /// Creates a client from a resolved configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone()).with_turn_delay(config.turn_delay)
    }

    /// Overrides the cooperative delay before each conversational turn.
    /// Tests use zero.
    pub fn with_turn_delay(mut self, turn_delay: Duration) -> Self {
        self.turn_delay = turn_delay;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `scheme://host[:port]` of the base URL. The health probe lives at the
    /// service root, outside the API base path.
    fn origin(&self) -> &str {
        let base = self.base_url.trim_end_matches('/');
        match base.find("://") {
            Some(scheme_end) => match base[scheme_end + 3..].find('/') {
                Some(path_start) => &base[..scheme_end + 3 + path_start],
                None => base,
            },
            None => base,
        }
    }

    /// One conversational turn against `/chat`.
    ///
    /// The reply is server-streamed but carries a single event; the whole
    /// body is read and the `data:` envelope is handled by the protocol
    /// decoder. A fixed delay runs first so rapid turns do not overwhelm
    /// the upstream rate limits (cooperative backoff, not a retry).
    pub async fn chat_turn(&self, request: &TurnRequest) -> Result<AgentReply> {
        if !self.turn_delay.is_zero() {
            tokio::time::sleep(self.turn_delay).await;
        }
        let response = self
            .client
            .post(self.endpoint("chat"))
            .json(request)
            .send()
            .await
            .map_err(to_transport_error)?;
        let response = ensure_success(response).await?;
        let body = response.text().await.map_err(to_transport_error)?;
        decode_event(&body)
    }

    /// Uploads a document (and/or free text) for analysis.
    pub async fn analyze(&self, upload: &DocumentUpload) -> Result<DocumentAnalysis> {
        upload.validate()?;
        let mut form = Form::new();
        if let Some(file_name) = &upload.file_name {
            let part = Part::bytes(upload.bytes.clone()).file_name(file_name.clone());
            form = form.part("file", part);
        }
        if let Some(info) = &upload.additional_info {
            form = form.text("additional_info", info.clone());
        }
        let response = self
            .client
            .post(self.endpoint("generate-contract-with-questions"))
            .multipart(form)
            .send()
            .await
            .map_err(to_transport_error)?;
        read_json(response).await
    }

    /// Submits every missing-field answer at once.
    pub async fn submit_all_missing_data(
        &self,
        session_id: &str,
        answers: &HashMap<String, String>,
    ) -> Result<FinalContract> {
        #[derive(Serialize)]
        struct Body<'a> {
            session_id: &'a str,
            missing_data_responses: &'a HashMap<String, String>,
        }
        let response = self
            .client
            .post(self.endpoint("submit-all-missing-data"))
            .json(&Body {
                session_id,
                missing_data_responses: answers,
            })
            .send()
            .await
            .map_err(to_transport_error)?;
        let reply: FinalContractReply = read_json(response).await?;
        reply.into_contract()
    }

    /// Asks for the next question; when nothing is missing the reply is the
    /// final contract.
    pub async fn get_next_question(&self, session_id: &str) -> Result<NextQuestion> {
        #[derive(Serialize)]
        struct Body<'a> {
            session_id: &'a str,
        }
        let response = self
            .client
            .post(self.endpoint("get-next-question"))
            .json(&Body { session_id })
            .send()
            .await
            .map_err(to_transport_error)?;
        let reply: NextQuestionReply = read_json(response).await?;
        reply.into_next_question()
    }

    /// Persists a finished contract against its session.
    pub async fn save_contract(&self, session_id: &str, contract: &SavedContract) -> Result<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            session_id: &'a str,
            contract: &'a SavedContract,
        }
        let response = self
            .client
            .post(self.endpoint("save-contract"))
            .json(&Body {
                session_id,
                contract,
            })
            .send()
            .await
            .map_err(to_transport_error)?;
        let echo: SessionEcho = read_json(response).await?;
        Ok(echo.session_id)
    }

    /// Creates a new catalog record; returns the record's session id.
    pub async fn create_contract(&self, submission: &CatalogSubmission) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("contracts"))
            .json(submission)
            .send()
            .await
            .map_err(to_transport_error)?;
        let echo: SessionEcho = read_json(response).await?;
        Ok(echo.session_id)
    }

    /// Lists all saved contracts.
    pub async fn list_contracts(&self) -> Result<Vec<ContractRecord>> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            ideas: Vec<ContractRecord>,
        }
        let response = self
            .client
            .get(self.endpoint("contracts"))
            .send()
            .await
            .map_err(to_transport_error)?;
        let listing: Listing = read_json(response).await?;
        Ok(listing.ideas)
    }

    /// Updates the review status of an existing record.
    pub async fn update_contract_status(&self, update: &StatusUpdate) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("update-contract-status"))
            .json(update)
            .send()
            .await
            .map_err(to_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Service health probe.
    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self
            .client
            .get(format!("{}/health", self.origin()))
            .send()
            .await
            .map_err(to_transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl AgentChannel for AgentApiClient {
    async fn converse(&self, request: TurnRequest) -> Result<AgentReply> {
        self.chat_turn(&request).await
    }
}

#[async_trait]
impl IntakeChannel for AgentApiClient {
    async fn analyze_document(&self, upload: &DocumentUpload) -> Result<DocumentAnalysis> {
        self.analyze(upload).await
    }

    async fn submit_missing_data(
        &self,
        session_id: &str,
        answers: &HashMap<String, String>,
    ) -> Result<FinalContract> {
        self.submit_all_missing_data(session_id, answers).await
    }

    async fn next_question(&self, session_id: &str) -> Result<NextQuestion> {
        self.get_next_question(session_id).await
    }
}

/// Health probe response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub database: String,
}

#[derive(Deserialize)]
struct SessionEcho {
    session_id: String,
}

/// `{type: "end", final_contract}` reply shape.
#[derive(Deserialize)]
struct FinalContractReply {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    final_contract: Option<FinalContract>,
}

impl FinalContractReply {
    fn into_contract(self) -> Result<FinalContract> {
        if self.kind != "end" {
            return Err(DraftError::protocol(format!(
                "expected an end reply, got type \"{}\"",
                self.kind
            )));
        }
        self.final_contract
            .ok_or_else(|| DraftError::protocol("end reply is missing the final contract"))
    }
}

/// Reply shape of `get-next-question`: terminal or one more question.
#[derive(Deserialize)]
struct NextQuestionReply {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    final_contract: Option<FinalContract>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    current_field: Option<String>,
    #[serde(default)]
    remaining_questions: Option<usize>,
}

impl NextQuestionReply {
    fn into_next_question(self) -> Result<NextQuestion> {
        match self.kind.as_str() {
            "end" => {
                let contract = self.final_contract.ok_or_else(|| {
                    DraftError::protocol("end reply is missing the final contract")
                })?;
                Ok(NextQuestion::Completed(contract))
            }
            "interrupt" => Ok(NextQuestion::Question {
                question: self
                    .question
                    .ok_or_else(|| DraftError::protocol("interrupt reply is missing the question"))?,
                reason: self.reason,
                current_field: self.current_field,
                remaining_questions: self.remaining_questions.unwrap_or_default(),
            }),
            other => Err(DraftError::protocol(format!(
                "unrecognized reply type \"{}\"",
                other
            ))),
        }
    }
}

fn to_transport_error(err: reqwest::Error) -> DraftError {
    DraftError::transport(err.to_string())
}

/// `{"detail": ...}` error body convention.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Maps a non-2xx response body to an [`DraftError::Http`], surfacing the
/// server's `detail` verbatim when present.
fn error_from_body(status: StatusCode, body: &str) -> DraftError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|wrapper| wrapper.detail)
        .unwrap_or_else(|_| format!("the drafting service returned status {}", status.as_u16()));
    DraftError::http(status.as_u16(), detail)
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(%status, "request rejected by the drafting service");
    Err(error_from_body(status, &body))
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let response = ensure_success(response).await?;
    let body = response.text().await.map_err(to_transport_error)?;
    serde_json::from_str(&body)
        .map_err(|e| DraftError::protocol(format!("undecodable reply: {}", e)))
}
