//! Transaction broadcasting.
//!
//! A [`Broadcaster`] is a pluggable transport capability returning the
//! [`BroadcastResult`] sum type. The default implementation speaks an
//! ARC-style HTTP API and maps the service's JSON onto the failure-code
//! table.

use serde::Deserialize;

use txkit_transaction::Transaction;

/// Machine-readable broadcast failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastFailureCode {
    /// The network refused the transaction.
    RejectedByNetwork,
    /// An input is already spent by a competing transaction.
    DoubleSpend,
    /// The transaction itself is malformed or non-final.
    InvalidTransaction,
    /// The broadcast service could not be reached or errored.
    ServiceUnavailable,
    /// Anything the service reported that fits no other class.
    Unknown,
}

/// Outcome of a broadcast attempt.
#[derive(Debug, Clone)]
pub enum BroadcastResult {
    /// The service accepted the transaction.
    Success {
        /// TXID echoed by the service.
        txid: String,
        /// Human-readable status message.
        message: String,
    },
    /// The service rejected the transaction or was unreachable.
    Failure {
        /// Failure class.
        code: BroadcastFailureCode,
        /// Human-readable description.
        description: String,
    },
}

impl BroadcastResult {
    /// Whether the broadcast succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, BroadcastResult::Success { .. })
    }
}

/// Pluggable broadcast transport.
pub trait Broadcaster {
    /// Submit a transaction to the network.
    fn broadcast(&self, tx: &Transaction) -> BroadcastResult;
}

/// Broadcast helpers on [`Transaction`].
pub trait TransactionBroadcastExt {
    /// Broadcast through an explicit transport.
    fn broadcast(&self, broadcaster: &dyn Broadcaster) -> BroadcastResult;

    /// Broadcast through the default well-known service.
    fn broadcast_default(&self) -> BroadcastResult;
}

impl TransactionBroadcastExt for Transaction {
    fn broadcast(&self, broadcaster: &dyn Broadcaster) -> BroadcastResult {
        broadcaster.broadcast(self)
    }

    fn broadcast_default(&self) -> BroadcastResult {
        default_broadcaster().broadcast(self)
    }
}

/// Body returned by ARC-style services.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceResponse {
    #[serde(default)]
    txid: Option<String>,
    #[serde(default)]
    tx_status: Option<String>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ServiceResponse {
    fn description(&self) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| self.status.map(|s| format!("service status {}", s)))
            .unwrap_or_default()
    }
}

/// The default ARC-style HTTP broadcaster.
pub struct HttpBroadcaster {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

/// The well-known default service.
pub fn default_broadcaster() -> HttpBroadcaster {
    HttpBroadcaster::new("https://arc.taal.com/v1")
}

impl HttpBroadcaster {
    /// A broadcaster for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpBroadcaster {
            base_url: base_url.into(),
            api_key: None,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Attach a bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

impl Broadcaster for HttpBroadcaster {
    fn broadcast(&self, tx: &Transaction) -> BroadcastResult {
        // Extended Format when the source info is attached, legacy otherwise.
        let raw = match tx.to_ef_bytes().or_else(|_| tx.to_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                return BroadcastResult::Failure {
                    code: BroadcastFailureCode::InvalidTransaction,
                    description: e.to_string(),
                };
            }
        };

        let url = format!("{}/tx", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(raw);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(e) => {
                return BroadcastResult::Failure {
                    code: BroadcastFailureCode::ServiceUnavailable,
                    description: format!("transport error: {}", e),
                };
            }
        };

        let http_status = response.status().as_u16();
        match response.json::<ServiceResponse>() {
            Ok(body) => classify(http_status, &body),
            Err(e) => BroadcastResult::Failure {
                code: BroadcastFailureCode::Unknown,
                description: format!("unparseable service response: {}", e),
            },
        }
    }
}

/// Map an HTTP status and service body onto the failure-code table.
fn classify(http_status: u16, body: &ServiceResponse) -> BroadcastResult {
    let description = body.description();

    if let Some(ref tx_status) = body.tx_status {
        match tx_status.as_str() {
            "REJECTED" => {
                return BroadcastResult::Failure {
                    code: BroadcastFailureCode::RejectedByNetwork,
                    description,
                };
            }
            "DOUBLE_SPEND_ATTEMPTED" | "SEEN_IN_ORPHAN_MEMPOOL" => {
                return BroadcastResult::Failure {
                    code: BroadcastFailureCode::DoubleSpend,
                    description,
                };
            }
            _ => {}
        }
    }

    match http_status {
        200..=299 => BroadcastResult::Success {
            txid: body.txid.clone().unwrap_or_default(),
            message: body
                .tx_status
                .clone()
                .unwrap_or_else(|| "accepted".to_string()),
        },
        400 | 422 | 460..=469 => BroadcastResult::Failure {
            code: BroadcastFailureCode::InvalidTransaction,
            description,
        },
        500..=599 => BroadcastResult::Failure {
            code: BroadcastFailureCode::ServiceUnavailable,
            description,
        },
        _ => BroadcastResult::Failure {
            code: BroadcastFailureCode::Unknown,
            description,
        },
    }
}
