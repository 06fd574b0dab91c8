//! Outbound calls are logged at debug level without the terminal secret.

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tutuka_core::{
    ClientConfig, RegisterProfile, SignedRpcClient, Transport, TransportError, Value,
};

const SECRET: &str = "zq-terminal-secret-77";

/// In-memory log sink shared with the subscriber.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Approve;

#[async_trait]
impl Transport for Approve {
    async fn method_call(&self, _: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        Ok(Value::Int(params.len() as i32))
    }
}

fn profile() -> RegisterProfile {
    RegisterProfile {
        email_address: "sam@example.com".to_string(),
        first_name: "Sam".to_string(),
        last_name: "Naidoo".to_string(),
        id_or_passport: "A1234567".to_string(),
        contact_number: "0215550199".to_string(),
        cellphone_number: "0830000000".to_string(),
        is_company: true,
        vat_number: "4000000000".to_string(),
        company_name: "Naidoo Trading".to_string(),
        company_cc_number: "CK2001/000001/23".to_string(),
        address_line1: "3 Dock Rd".to_string(),
        address_line2: String::new(),
        city: "Durban".to_string(),
        postal_code: "4001".to_string(),
        transaction_id: "tx-log-1".to_string(),
    }
}

#[tokio::test]
async fn register_log_masks_secret() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let config = ClientConfig::new("0000000001", SECRET, "localhost", 8080, "/xmlrpc");
    let client = SignedRpcClient::with_transport(config, Approve).unwrap();

    // terminal id + 16 business args + date + checksum
    let reply = client.register(&profile()).await.unwrap();
    assert_eq!(reply, Value::Int(19));

    let logs = capture.contents();
    assert!(logs.contains("Register"), "method missing from: {logs}");
    assert!(logs.contains("sam@example.com"), "args missing from: {logs}");
    assert!(logs.contains("<redacted>"), "mask missing from: {logs}");
    assert!(!logs.contains(SECRET), "secret leaked: {logs}");
}
