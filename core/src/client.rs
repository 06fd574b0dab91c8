//! Signed XML-RPC client for the issuer.
//!
//! # Design
//! `SignedRpcClient` holds the immutable `ClientConfig`, a `Transport` and a
//! `Clock`; it carries no per-call state, so one instance can be shared by
//! any number of concurrent callers.
//!
//! Every operation goes through the same two steps:
//! - `sign_at` (pure): stamp the business arguments with the transaction
//!   date, checksum `(method, terminal id, args..., date)` and assemble
//!   `[terminal id, args..., date, checksum]`.
//! - `invoke`: log the redacted call and hand it to the transport once.
//!
//! A host that wants to run the HTTP exchange itself can stop after
//! `sign_at`, turn the `CallRequest` into an `HttpRequest` and feed the
//! response to `http::parse_http_response`.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::checksum::compute_checksum;
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpRequest;
use crate::method::Method;
use crate::transport::{HttpTransport, Transport};
use crate::types::{AllocateCard, CreateVirtualCard, RegisterProfile, TransferFunds};
use crate::value::Value;

/// A fully assembled remote call, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub method: String,
    pub params: Vec<Value>,
}

impl CallRequest {
    /// The trailing checksum parameter.
    pub fn checksum(&self) -> Option<&str> {
        self.params.last().and_then(Value::as_str)
    }

    pub fn to_http(&self, config: &ClientConfig) -> HttpRequest {
        HttpRequest::method_call(&config.endpoint_url(), &self.method, &self.params)
    }
}

/// Client for the issuer's terminal API.
pub struct SignedRpcClient<T = HttpTransport> {
    config: ClientConfig,
    transport: T,
    clock: Arc<dyn Clock>,
}

impl SignedRpcClient<HttpTransport> {
    /// Validate `config` and connect over HTTP.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> SignedRpcClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to stamp calls.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Checksum of `method` over `args` for this terminal.
    pub fn compute_checksum(&self, method: &str, args: &[Value]) -> Result<String, ClientError> {
        compute_checksum(
            &self.config.terminal_secret,
            method,
            &self.config.terminal_id,
            args,
        )
    }

    /// Assemble and sign a call stamped with `at`.
    pub fn sign_at(
        &self,
        method: Method,
        business_args: Vec<Value>,
        at: NaiveDateTime,
    ) -> Result<CallRequest, ClientError> {
        if !method.is_implemented() {
            return Err(ClientError::UnimplementedOperation(method.name()));
        }

        let mut args = business_args;
        args.push(Value::DateTime(at));
        let checksum = self.compute_checksum(method.name(), &args)?;

        let mut params = Vec::with_capacity(args.len() + 2);
        params.push(Value::from(self.config.terminal_id.as_str()));
        params.extend(args);
        params.push(Value::String(checksum));

        Ok(CallRequest {
            method: method.name().to_string(),
            params,
        })
    }

    /// Assemble and sign a call stamped with the client's clock.
    pub fn sign(&self, method: Method, business_args: Vec<Value>) -> Result<CallRequest, ClientError> {
        self.sign_at(method, business_args, self.clock.now())
    }

    /// Send a prepared call. Exactly one transport round trip, no retries.
    pub async fn invoke(&self, request: CallRequest) -> Result<Value, ClientError> {
        debug!(
            method = %request.method,
            args = %RedactedArgs {
                params: &request.params,
                secret: &self.config.terminal_secret,
            },
            "outbound issuer call"
        );
        let CallRequest { method, params } = request;
        let value = self.transport.method_call(&method, params).await?;
        Ok(value)
    }

    async fn call(&self, method: Method, business_args: Vec<Value>) -> Result<Value, ClientError> {
        let request = self.sign(method, business_args)?;
        self.invoke(request).await
    }

    /// Retrieve the balance of a card.
    pub async fn balance(
        &self,
        profile_number: &str,
        card_number: &str,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_number),
            Value::from(transaction_id),
        ];
        self.call(Method::Balance, args).await
    }

    /// Allocate a card to a cardholder.
    pub async fn allocate_card(&self, request: &AllocateCard) -> Result<Value, ClientError> {
        self.call(Method::AllocateCard, request.business_args()).await
    }

    /// Link a card to a profile.
    pub async fn link_card(
        &self,
        profile_number: &str,
        card_identifier: &str,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_identifier),
            Value::from(transaction_id),
        ];
        self.call(Method::LinkCard, args).await
    }

    /// Deduct `amount` cents from a card and load it onto the profile.
    pub async fn deduct_card_load_profile(
        &self,
        profile_number: &str,
        card_identifier: &str,
        amount: i32,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_identifier),
            Value::from(amount),
            Value::from(transaction_id),
        ];
        self.call(Method::DeductCardLoadProfile, args).await
    }

    /// Load `amount` cents onto a card, deducting it from the profile.
    pub async fn load_card_deduct_profile(
        &self,
        profile_number: &str,
        card_identifier: &str,
        amount: i32,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_identifier),
            Value::from(amount),
            Value::from(transaction_id),
        ];
        self.call(Method::LoadCardDeductProfile, args).await
    }

    pub async fn transfer_funds(&self, request: &TransferFunds) -> Result<Value, ClientError> {
        self.call(Method::TransferFunds, request.business_args()).await
    }

    /// Register a new profile. The terminal secret is sent as the second
    /// business argument and is masked in logs.
    pub async fn register(&self, request: &RegisterProfile) -> Result<Value, ClientError> {
        let args = request.business_args(&self.config.terminal_secret);
        self.call(Method::Register, args).await
    }

    /// Full statement of a card.
    pub async fn statement(
        &self,
        profile_number: &str,
        card_number: &str,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_number),
            Value::from(transaction_id),
        ];
        self.call(Method::Statement, args).await
    }

    pub async fn stop_card(
        &self,
        profile_number: &str,
        card_identifier: &str,
        stop_reason_id: i32,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_identifier),
            Value::from(stop_reason_id),
            Value::from(transaction_id),
        ];
        self.call(Method::StopCard, args).await
    }

    /// Un-stop a card.
    pub async fn cancel_stop_card(
        &self,
        profile_number: &str,
        card_identifier: &str,
        transaction_id: &str,
    ) -> Result<Value, ClientError> {
        let args = vec![
            Value::from(profile_number),
            Value::from(card_identifier),
            Value::from(transaction_id),
        ];
        self.call(Method::CancelStopCard, args).await
    }

    pub async fn create_virtual_card(&self, request: &CreateVirtualCard) -> Result<Value, ClientError> {
        self.call(Method::CreateVirtualCard, request.business_args()).await
    }

    // The issuer publishes these without an argument layout, so they are
    // refused locally instead of guessed at.

    pub async fn link_cards_by_sequence_range(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::LinkCardsBySequenceRange.name()))
    }

    pub async fn update_profile(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::UpdateProfile.name()))
    }

    pub async fn statement_by_date_range(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::StatementByDateRange.name()))
    }

    pub async fn activate(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::Activate.name()))
    }

    pub async fn update_allocated_card(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::UpdateAllocatedCard.name()))
    }

    pub async fn status(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::Status.name()))
    }

    pub async fn check_authorisation(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::CheckAuthorisation.name()))
    }

    pub async fn check_load(&self) -> Result<Value, ClientError> {
        Err(ClientError::UnimplementedOperation(Method::CheckLoad.name()))
    }
}

impl<T> fmt::Debug for SignedRpcClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRpcClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Argument list rendering with the terminal secret masked.
struct RedactedArgs<'a> {
    params: &'a [Value],
    secret: &'a str,
}

impl fmt::Display for RedactedArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", redact(param, self.secret))?;
        }
        write!(f, "]")
    }
}

/// Copy of `value` with every occurrence of `secret` inside strings masked.
fn redact(value: &Value, secret: &str) -> Value {
    match value {
        Value::String(s) if s.contains(secret) => Value::String(s.replace(secret, "<redacted>")),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, secret)).collect()),
        Value::Struct(members) => Value::Struct(
            members
                .iter()
                .map(|(name, v)| (name.replace(secret, "<redacted>"), redact(v, secret)))
                .collect(),
        ),
        other => other.clone(),
    }
}
