//! Blocking Kinto client for one bucket/collection.
//!
//! | Call            | HTTP                                                    |
//! |-----------------|---------------------------------------------------------|
//! | server info     | `GET {server}/`                                         |
//! | list records    | `GET {server}/buckets/{b}/collections/{c}/records`      |
//! | write a batch   | `POST {server}/batch` (one `PUT`/`DELETE` per operation)|
//! | review / approve| `PATCH {server}/buckets/{b}/collections/{c}`            |
//!
//! A configured `user:password` is sent as HTTP Basic auth. Any other
//! `Authorization` value (`Bearer ...`) is sent exactly as configured.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use remsync_core::{Operation, Record, RecordId, SyncConfig, TransportError};
use remsync_sync::{Batch, BatchReceipt, Destination};

use crate::error::RemoteError;

const STATUS_TO_REVIEW: &str = "to-review";
const STATUS_TO_SIGN: &str = "to-sign";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Subset of the `GET /` payload we care about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_version: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    #[serde(default)]
    pub settings: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub batch_max_requests: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
    data: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct BatchBody {
    requests: Vec<BatchRequest>,
}

#[derive(Debug, Serialize, PartialEq)]
struct BatchRequest {
    method: &'static str,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    responses: Vec<SubResponse>,
}

#[derive(Debug, Deserialize)]
struct SubResponse {
    status: u16,
    #[serde(default)]
    path: String,
    #[serde(default)]
    body: Value,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client bound to the configured server, bucket and collection.
pub struct RemoteSettingsClient {
    agent: ureq::Agent,
    server: String,
    auth: Option<String>,
    bucket: String,
    collection: String,
}

impl RemoteSettingsClient {
    pub fn new(config: &SyncConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build();
        Self {
            agent,
            server: config.server_root().to_string(),
            auth: config.auth_token.as_deref().map(authorization_header),
            bucket: config.bucket_id.clone(),
            collection: config.collection_id.clone(),
        }
    }

    /// `/buckets/{b}/collections/{c}`, relative to the server root.
    pub fn collection_path(&self) -> String {
        format!(
            "/buckets/{}/collections/{}",
            urlencoding::encode(&self.bucket),
            urlencoding::encode(&self.collection)
        )
    }

    pub fn records_path(&self) -> String {
        format!("{}/records", self.collection_path())
    }

    pub fn record_path(&self, id: &RecordId) -> String {
        format!("{}/{}", self.records_path(), urlencoding::encode(id.as_str()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self.agent.request(method, url);
        match &self.auth {
            Some(auth) => request.set("Authorization", auth),
            None => request,
        }
    }

    /// `GET /`: who we are and what the server allows.
    pub fn server_info(&self) -> Result<ServerInfo, RemoteError> {
        let url = self.url("/");
        let response = send(self.request("GET", &url), None)?;
        decode(&url, response)
    }

    /// Every record in the collection, following `Next-Page` links.
    ///
    /// A missing collection (HTTP 404 on the first page) reads as empty.
    pub fn get_records(&self) -> Result<Vec<Record>, RemoteError> {
        let mut next = Some(self.url(&self.records_path()));
        let mut records = Vec::new();
        let mut first_page = true;

        while let Some(url) = next.take() {
            let response = match send(self.request("GET", &url), None) {
                Ok(response) => response,
                Err(RemoteError::Http { status: 404, .. }) if first_page => {
                    tracing::info!("collection {} does not exist yet", self.collection_path());
                    return Ok(Vec::new());
                }
                Err(err) => return Err(err),
            };
            next = response
                .header("Next-Page")
                .filter(|link| !link.is_empty())
                .map(str::to_string);
            first_page = false;
            let page: RecordsPage = decode(&url, response)?;
            tracing::debug!("fetched {} records from {url}", page.data.len());
            for value in page.data {
                records.push(Record::from_value(value)?);
            }
        }
        Ok(records)
    }

    /// `POST /batch` with one sub-request per operation.
    ///
    /// Returns the highest sub-response status on success.
    pub fn write_batch(&self, operations: &[Operation]) -> Result<u16, RemoteError> {
        let url = self.url("/batch");
        let body = serde_json::to_value(BatchBody {
            requests: operations.iter().map(|op| self.batch_request(op)).collect(),
        })?;
        let response = send(self.request("POST", &url), Some(&body))?;
        let parsed: BatchResponse = decode(&url, response)?;
        check_batch(parsed)
    }

    fn batch_request(&self, op: &Operation) -> BatchRequest {
        let path = self.record_path(op.id());
        match op {
            Operation::Create(record) | Operation::Update(record) => BatchRequest {
                method: "PUT",
                path,
                body: Some(json!({ "data": record.without_metadata().to_value() })),
            },
            Operation::Delete(_) => BatchRequest {
                method: "DELETE",
                path,
                body: None,
            },
        }
    }

    fn patch_collection(&self, data: Value) -> Result<(), RemoteError> {
        let url = self.url(&self.collection_path());
        send(self.request("PATCH", &url), Some(&json!({ "data": data })))?;
        Ok(())
    }

    /// Set the collection status to `to-review` with an editor comment.
    pub fn request_review_status(&self, message: &str) -> Result<(), RemoteError> {
        self.patch_collection(json!({
            "status": STATUS_TO_REVIEW,
            "last_editor_comment": message,
        }))
    }

    /// Set the collection status to `to-sign`.
    pub fn approve_status(&self) -> Result<(), RemoteError> {
        self.patch_collection(json!({ "status": STATUS_TO_SIGN }))
    }
}

impl Destination for RemoteSettingsClient {
    fn fetch_records(&self) -> Result<Vec<Record>, TransportError> {
        Ok(self.get_records()?)
    }

    fn submit_batch(&self, batch: &Batch) -> Result<BatchReceipt, TransportError> {
        let status = self.write_batch(batch.operations())?;
        Ok(BatchReceipt { status })
    }

    fn request_review(&self, message: &str) -> Result<(), TransportError> {
        Ok(self.request_review_status(message)?)
    }

    fn approve_changes(&self) -> Result<(), TransportError> {
        Ok(self.approve_status()?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn send(request: ureq::Request, body: Option<&Value>) -> Result<ureq::Response, RemoteError> {
    let url = request.url().to_string();
    let result = match body {
        Some(body) => request.send_json(body),
        None => request.call(),
    };
    result.map_err(|err| match err {
        ureq::Error::Status(status, response) => RemoteError::Http {
            status,
            url,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport {
            url,
            message: transport.to_string(),
        },
    })
}

fn decode<T: serde::de::DeserializeOwned>(
    url: &str,
    response: ureq::Response,
) -> Result<T, RemoteError> {
    response.into_json().map_err(|source| RemoteError::Decode {
        url: url.to_string(),
        source,
    })
}

/// `user:password` becomes Basic auth; anything else is used verbatim.
fn authorization_header(raw: &str) -> String {
    if raw.contains(':') && !raw.contains(char::is_whitespace) {
        format!("Basic {}", BASE64.encode(raw))
    } else {
        raw.to_string()
    }
}

/// Fail on the first rejected sub-request, else return the highest status.
fn check_batch(response: BatchResponse) -> Result<u16, RemoteError> {
    let mut worst = 200;
    for sub in response.responses {
        if sub.status >= 400 {
            return Err(RemoteError::BatchRejected {
                status: sub.status,
                path: sub.path,
                body: sub.body.to_string(),
            });
        }
        worst = worst.max(sub.status);
    }
    Ok(worst)
}
