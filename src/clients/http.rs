// src/clients/http.rs

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    clients::{ContentRepository, Deduction, LedgerService, ResultStore},
    error::CollaboratorError,
    models::{question::Question, submission::SubmissionPayload, test::Test},
};

fn unavailable(err: reqwest::Error) -> CollaboratorError {
    CollaboratorError::Unavailable(err.to_string())
}

/// Pulls the `error` field out of a JSON error body, falling back to the raw text.
async fn error_message(resp: Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("HTTP {}: {}", status.as_u16(), text))
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, CollaboratorError> {
    if !resp.status().is_success() {
        return Err(CollaboratorError::Unavailable(error_message(resp).await));
    }
    resp.json::<T>()
        .await
        .map_err(|e| CollaboratorError::Malformed(e.to_string()))
}

/// Appends `segments` to `base`. Each id is percent-encoded into exactly one segment.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, CollaboratorError> {
    if let Some(bad) = segments
        .iter()
        .find(|s| s.is_empty() || **s == "." || **s == "..")
    {
        return Err(CollaboratorError::Malformed(format!(
            "invalid path segment {:?}",
            bad
        )));
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CollaboratorError::Malformed(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Content repository over HTTP.
///
/// * `GET {base}/tests/{id}` → `Test` (404 means unknown)
/// * `GET {base}/tests/{id}/questions` → `[Question]`
/// * `GET {base}/tests/{id}/attempts/{student}` → `{"attempted": bool}`
#[derive(Debug, Clone)]
pub struct HttpContentRepository {
    client: Client,
    base_url: Url,
}

impl HttpContentRepository {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ContentRepository for HttpContentRepository {
    async fn get_test(&self, test_id: &str) -> Result<Option<Test>, CollaboratorError> {
        let resp = self
            .client
            .get(endpoint(&self.base_url, &["tests", test_id])?)
            .send()
            .await
            .map_err(unavailable)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(resp).await.map(Some)
    }

    async fn get_questions(&self, test_id: &str) -> Result<Vec<Question>, CollaboratorError> {
        let resp = self
            .client
            .get(endpoint(&self.base_url, &["tests", test_id, "questions"])?)
            .send()
            .await
            .map_err(unavailable)?;
        decode(resp).await
    }

    async fn has_prior_attempt(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<bool, CollaboratorError> {
        #[derive(Deserialize)]
        struct AttemptStatus {
            attempted: bool,
        }

        let resp = self
            .client
            .get(endpoint(
                &self.base_url,
                &["tests", test_id, "attempts", student_id],
            )?)
            .send()
            .await
            .map_err(unavailable)?;
        decode::<AttemptStatus>(resp).await.map(|s| s.attempted)
    }
}

/// Ledger over HTTP.
///
/// * `GET {base}/balances/{student}` → `{"balance": i64}`
/// * `POST {base}/balances/{student}/deductions` `{test_id, amount}` → `{"new_balance": i64}`;
///   4xx answers are refusals.
#[derive(Debug, Clone)]
pub struct HttpLedgerService {
    client: Client,
    base_url: Url,
}

impl HttpLedgerService {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
struct DeductionRequest<'a> {
    test_id: &'a str,
    amount: i64,
}

#[async_trait]
impl LedgerService for HttpLedgerService {
    async fn get_balance(&self, student_id: &str) -> Result<i64, CollaboratorError> {
        #[derive(Deserialize)]
        struct Balance {
            balance: i64,
        }

        let resp = self
            .client
            .get(endpoint(&self.base_url, &["balances", student_id])?)
            .send()
            .await
            .map_err(unavailable)?;
        decode::<Balance>(resp).await.map(|b| b.balance)
    }

    async fn deduct(
        &self,
        student_id: &str,
        test_id: &str,
        amount: i64,
    ) -> Result<Deduction, CollaboratorError> {
        let resp = self
            .client
            .post(endpoint(
                &self.base_url,
                &["balances", student_id, "deductions"],
            )?)
            .json(&DeductionRequest { test_id, amount })
            .send()
            .await
            .map_err(unavailable)?;

        if resp.status().is_client_error() {
            return Err(CollaboratorError::Rejected(error_message(resp).await));
        }
        decode(resp).await
    }
}

/// Result store over HTTP: `POST {base}/results` with the payload; 409 means duplicate.
#[derive(Debug, Clone)]
pub struct HttpResultStore {
    client: Client,
    base_url: Url,
}

impl HttpResultStore {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ResultStore for HttpResultStore {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), CollaboratorError> {
        let resp = self
            .client
            .post(endpoint(&self.base_url, &["results"])?)
            .json(payload)
            .send()
            .await
            .map_err(unavailable)?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CollaboratorError::Duplicate {
                student_id: payload.student_id.clone(),
                test_id: payload.test_id.clone(),
            }),
            _ => Err(CollaboratorError::Unavailable(error_message(resp).await)),
        }
    }
}
