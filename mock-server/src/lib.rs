//! Mock Tutuka issuer speaking XML-RPC over HTTP.
//!
//! Decodes calls with the same codec the client uses, checks the trailing
//! checksum against the configured terminal secrets and answers from an
//! in-memory `Ledger`. A bad checksum or unknown terminal is a decline
//! (a normal response with a negative `resultCode`), never a fault.

pub mod ledger;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, routing::post, Router};
use tokio::{
    net::TcpListener,
    sync::{RwLock, RwLockReadGuard},
};
use tracing::{debug, warn};
use tutuka_core::{codec, http::XML_CONTENT_TYPE, verify_checksum, Method, Value};

use ledger::{
    decline, unsupported, Fault, Ledger, FAULT_INVALID_PARAMS, RESULT_INVALID_CHECKSUM,
    RESULT_UNKNOWN_TERMINAL,
};

pub const DEFAULT_PATH: &str = "/xmlrpc";
pub const FAULT_PARSE_ERROR: i32 = -32700;

/// Issuer state: terminal credentials plus the ledger.
#[derive(Debug)]
pub struct MockIssuer {
    terminals: HashMap<String, String>,
    ledger: RwLock<Ledger>,
}

impl MockIssuer {
    pub fn new(terminal_id: &str, terminal_secret: &str) -> Self {
        Self {
            terminals: HashMap::from([(terminal_id.to_string(), terminal_secret.to_string())]),
            ledger: RwLock::new(Ledger::new()),
        }
    }

    pub fn with_terminal(mut self, terminal_id: &str, terminal_secret: &str) -> Self {
        self.terminals
            .insert(terminal_id.to_string(), terminal_secret.to_string());
        self
    }

    pub fn with_profile(mut self, profile_number: &str, balance: i32) -> Self {
        self.ledger.get_mut().add_profile(profile_number, balance);
        self
    }

    /// Put an unlinked card into stock.
    pub fn with_card(mut self, card_identifier: &str, balance: i32) -> Self {
        self.ledger.get_mut().add_card(card_identifier, balance);
        self
    }

    pub async fn ledger(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().await
    }

    /// Answer one `<methodCall>` body with a `<methodResponse>` body.
    pub async fn handle_xml(&self, body: &str) -> String {
        match self.dispatch(body).await {
            Ok(value) => codec::encode_response(&value),
            Err(fault) => codec::encode_fault(fault.code, &fault.message),
        }
    }

    async fn dispatch(&self, body: &str) -> Result<Value, Fault> {
        let (name, params) = codec::decode_method_call(body).map_err(|e| Fault {
            code: FAULT_PARSE_ERROR,
            message: e.to_string(),
        })?;
        let method = Method::from_name(&name).ok_or_else(|| unsupported(&name))?;

        // [terminal id, business args..., transaction date, checksum]
        let n = params.len();
        if n < 3 {
            return Err(invalid_params(format!(
                "{name}: expected terminal id, transaction date and checksum"
            )));
        }
        let terminal_id = params[0]
            .as_str()
            .ok_or_else(|| invalid_params(format!("{name}: terminal id must be a string")))?;
        let checksum = params[n - 1]
            .as_str()
            .ok_or_else(|| invalid_params(format!("{name}: checksum must be a string")))?;
        let signed = &params[1..n - 1];
        let date = &params[n - 2];
        let business = &params[1..n - 2];
        let transaction_id = business.last().and_then(Value::as_str).unwrap_or_default();

        let Some(secret) = self.terminals.get(terminal_id) else {
            warn!(method = %name, terminal_id, "unknown terminal");
            return Ok(decline(RESULT_UNKNOWN_TERMINAL, "Unknown terminal", transaction_id));
        };
        if !verify_checksum(secret, &name, terminal_id, signed, checksum) {
            warn!(method = %name, terminal_id, "checksum mismatch");
            return Ok(decline(RESULT_INVALID_CHECKSUM, "Invalid checksum", transaction_id));
        }
        if date.as_datetime().is_none() {
            return Err(invalid_params(format!(
                "{name}: transaction date must be dateTime.iso8601"
            )));
        }

        debug!(method = %name, terminal_id, transaction_id, "applying call");
        self.ledger
            .write()
            .await
            .apply(terminal_id, method, business, date, secret)
    }
}

fn invalid_params(message: String) -> Fault {
    Fault {
        code: FAULT_INVALID_PARAMS,
        message,
    }
}

/// Router serving the issuer at `path`.
pub fn router(issuer: Arc<MockIssuer>, path: &str) -> Router {
    Router::new()
        .route(path, post(xmlrpc))
        .with_state(issuer)
}

/// Router serving `issuer` at `DEFAULT_PATH`.
pub fn app(issuer: MockIssuer) -> Router {
    router(Arc::new(issuer), DEFAULT_PATH)
}

pub async fn run(listener: TcpListener, issuer: Arc<MockIssuer>) -> Result<(), std::io::Error> {
    axum::serve(listener, router(issuer, DEFAULT_PATH)).await
}

async fn xmlrpc(State(issuer): State<Arc<MockIssuer>>, body: String) -> impl IntoResponse {
    let xml = issuer.handle_xml(&body).await;
    ([(header::CONTENT_TYPE, XML_CONTENT_TYPE)], xml)
}
