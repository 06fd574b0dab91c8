//! HTTP carrier types for the host-does-IO pattern.
//!
//! # Design
//! XML-RPC always travels as an HTTP POST with a `text/xml` body. These
//! types describe that exchange as plain data: the core builds
//! `HttpRequest` values and parses `HttpResponse` values, and whoever holds
//! a socket (`HttpTransport`, or a host application with its own HTTP
//! stack) executes the round trip.

use crate::codec;
use crate::error::TransportError;
use crate::value::Value;

pub const XML_CONTENT_TYPE: &str = "text/xml";

/// An XML-RPC POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The endpoint's answer, constructed by whoever executed the request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn method_call(url: &str, method: &str, params: &[Value]) -> Self {
        Self {
            url: url.to_string(),
            headers: vec![("content-type".to_string(), XML_CONTENT_TYPE.to_string())],
            body: codec::encode_method_call(method, params),
        }
    }
}

/// Turn an HTTP response into the call's result value.
///
/// Non-200 statuses become `TransportError::Http`; faults and malformed
/// bodies come from `codec::decode_response`.
pub fn parse_http_response(response: HttpResponse) -> Result<Value, TransportError> {
    if response.status != 200 {
        return Err(TransportError::Http {
            status: response.status,
            body: response.body,
        });
    }
    codec::decode_response(&response.body)
}
