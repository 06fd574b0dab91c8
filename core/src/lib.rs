//! Client for the Tutuka card-issuing terminal API.
//!
//! # Overview
//! Every issuer operation is an XML-RPC call whose positional arguments end
//! with a transaction timestamp and an HMAC-SHA1 checksum keyed by the
//! terminal's shared secret. `SignedRpcClient` shapes, signs and sends those
//! calls and hands back the issuer's response untouched.
//!
//! # Design
//! - Pure pieces (`checksum`, `codec`, `http`, `SignedRpcClient::sign_at`)
//!   never touch the network, so a host can run the HTTP exchange itself.
//! - `Transport` is the one async seam; `HttpTransport` implements it with
//!   reqwest, tests implement it with stubs.
//! - Business declines are response payloads, not errors. The client never
//!   inspects result codes.

pub mod checksum;
pub mod client;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod method;
pub mod transport;
pub mod types;
pub mod value;

pub use checksum::{compute_checksum, verify_checksum};
pub use client::{CallRequest, SignedRpcClient};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use http::{parse_http_response, HttpRequest, HttpResponse};
pub use method::Method;
pub use transport::{HttpTransport, Transport};
pub use types::{new_transaction_id, AllocateCard, CreateVirtualCard, RegisterProfile, TransferFunds};
pub use value::Value;
