//! End-to-end tests against the live mock issuer.
//!
//! # Design
//! Starts the mock issuer on a random port, then drives every implemented
//! operation through `SignedRpcClient` over real HTTP. A second test runs
//! the exchange on the host side with ureq, using only the pure pieces
//! (`sign`, `to_http`, `parse_http_response`).

use std::sync::Arc;

use chrono::NaiveDate;
use mock_server::ledger::{
    RESULT_APPROVED, RESULT_CARD_STOPPED, RESULT_DUPLICATE_TRANSACTION, RESULT_INVALID_CHECKSUM,
};
use mock_server::MockIssuer;
use tutuka_core::{
    new_transaction_id, parse_http_response, AllocateCard, ClientConfig, ClientError,
    CreateVirtualCard, HttpRequest, HttpResponse, Method, RegisterProfile, SignedRpcClient,
    TransferFunds, TransportError, Value,
};

const TERMINAL: &str = "0000000001";
const SECRET: &str = "integration-secret";
const PROFILE: &str = "1000000001";
const CARD_A: &str = "0000000000000001";
const CARD_B: &str = "0000000000000002";

fn issuer() -> Arc<MockIssuer> {
    Arc::new(
        MockIssuer::new(TERMINAL, SECRET)
            .with_profile(PROFILE, 50_000)
            .with_card(CARD_A, 0)
            .with_card(CARD_B, 0),
    )
}

fn config(port: u16, secret: &str) -> ClientConfig {
    ClientConfig::new(TERMINAL, secret, "127.0.0.1", port, mock_server::DEFAULT_PATH)
}

/// Serve `issuer` on a random local port from inside a tokio runtime.
async fn spawn_issuer(issuer: Arc<MockIssuer>) -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(mock_server::run(listener, issuer));
    port
}

fn result_code(value: &Value) -> i32 {
    value.get("resultCode").and_then(Value::as_i32).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn every_operation_over_http() {
    let issuer = issuer();
    let port = spawn_issuer(issuer.clone()).await;
    let client = SignedRpcClient::connect(config(port, SECRET)).unwrap();

    // Step 1: link both cards to the profile.
    for card in [CARD_A, CARD_B] {
        let linked = client
            .link_card(PROFILE, card, &new_transaction_id())
            .await
            .unwrap();
        assert_eq!(result_code(&linked), RESULT_APPROVED, "link {card}");
    }

    // Step 2: allocate card A to a cardholder.
    let allocated = client
        .allocate_card(&AllocateCard {
            profile_number: PROFILE.to_string(),
            card_identifier: CARD_A.to_string(),
            first_name: "Thandi".to_string(),
            last_name: "Mokoena".to_string(),
            id_number: "9001014800086".to_string(),
            mobile_number: "0821234567".to_string(),
            transaction_id: new_transaction_id(),
        })
        .await
        .unwrap();
    assert_eq!(result_code(&allocated), RESULT_APPROVED);

    // Step 3: move money profile -> A -> B -> profile.
    let loaded = client
        .load_card_deduct_profile(PROFILE, CARD_A, 20_000, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&loaded), RESULT_APPROVED);

    let transferred = client
        .transfer_funds(&TransferFunds {
            profile_number: PROFILE.to_string(),
            card_identifier_from: CARD_A.to_string(),
            card_identifier_to: CARD_B.to_string(),
            amount: 7_500,
            transaction_id: new_transaction_id(),
        })
        .await
        .unwrap();
    assert_eq!(result_code(&transferred), RESULT_APPROVED);

    let deducted = client
        .deduct_card_load_profile(PROFILE, CARD_B, 2_500, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&deducted), RESULT_APPROVED);

    let balance = client
        .balance(PROFILE, CARD_A, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&balance), RESULT_APPROVED);
    assert_eq!(balance.get("balance"), Some(&Value::Int(12_500)));

    // Step 4: a stopped card declines, a cancelled stop restores it.
    let stopped = client
        .stop_card(PROFILE, CARD_B, 1, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&stopped), RESULT_APPROVED);

    let declined = client
        .load_card_deduct_profile(PROFILE, CARD_B, 100, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&declined), RESULT_CARD_STOPPED);

    let resumed = client
        .cancel_stop_card(PROFILE, CARD_B, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&resumed), RESULT_APPROVED);

    let statement = client
        .statement(PROFILE, CARD_B, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(statement.get("balance"), Some(&Value::Int(5_000)));
    let entries = statement.get("transactions").and_then(Value::as_array).unwrap();
    assert_eq!(entries.len(), 2);

    // Step 5: register a profile and issue a virtual card.
    let registered = client
        .register(&RegisterProfile {
            email_address: "thandi@example.com".to_string(),
            first_name: "Thandi".to_string(),
            last_name: "Mokoena".to_string(),
            id_or_passport: "9001014800086".to_string(),
            contact_number: "0115550100".to_string(),
            cellphone_number: "0821234567".to_string(),
            is_company: false,
            vat_number: String::new(),
            company_name: String::new(),
            company_cc_number: String::new(),
            address_line1: "12 Long St".to_string(),
            address_line2: String::new(),
            city: "Johannesburg".to_string(),
            postal_code: "2001".to_string(),
            transaction_id: new_transaction_id(),
        })
        .await
        .unwrap();
    assert_eq!(result_code(&registered), RESULT_APPROVED);
    let profile_number = registered
        .get("profileNumber")
        .and_then(Value::as_str)
        .unwrap()
        .to_string();

    let expiry = NaiveDate::from_ymd_opt(2028, 6, 30)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let virtual_card = client
        .create_virtual_card(&CreateVirtualCard {
            campaign_uuid: "8c1f6a52-0b1e-4a53-9f0e-3b9a1f7d2c10".to_string(),
            reference: "order-77".to_string(),
            card_label: "Travel".to_string(),
            cellphone_number: "0821234567".to_string(),
            expiry_date: expiry,
            transaction_id: new_transaction_id(),
        })
        .await
        .unwrap();
    assert_eq!(result_code(&virtual_card), RESULT_APPROVED);
    assert_eq!(virtual_card.get("expiryDate"), Some(&Value::DateTime(expiry)));

    // Step 6: the issuer's books agree with what the responses said.
    let ledger = issuer.ledger().await;
    assert_eq!(ledger.profile_balance(PROFILE), Some(32_500));
    assert_eq!(ledger.card_balance(CARD_A), Some(12_500));
    assert_eq!(ledger.card_balance(CARD_B), Some(5_000));
    assert_eq!(ledger.card_holder(CARD_A), Some("Thandi Mokoena"));
    assert_eq!(ledger.profile_email(&profile_number), Some("thandi@example.com"));
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn client_is_shareable() {
    assert_send_sync::<SignedRpcClient>();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_on_one_client() {
    let port = spawn_issuer(issuer()).await;
    let client = Arc::new(SignedRpcClient::connect(config(port, SECRET)).unwrap());
    client.link_card(PROFILE, CARD_A, &new_transaction_id()).await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = Arc::clone(&client);
            let transaction_id = format!("concurrent-{i}");
            tokio::spawn(async move {
                let reply = client.balance(PROFILE, CARD_A, &transaction_id).await;
                (transaction_id, reply)
            })
        })
        .collect();

    for task in tasks {
        let (transaction_id, reply) = task.await.unwrap();
        let reply = reply.unwrap();
        assert_eq!(result_code(&reply), RESULT_APPROVED, "{transaction_id}");
        assert_eq!(
            reply.get("transactionId").and_then(Value::as_str),
            Some(transaction_id.as_str())
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn declines_come_back_as_values() {
    let port = spawn_issuer(issuer()).await;

    let wrong_secret = SignedRpcClient::connect(config(port, "not-the-secret")).unwrap();
    let value = wrong_secret
        .balance(PROFILE, CARD_A, &new_transaction_id())
        .await
        .unwrap();
    assert_eq!(result_code(&value), RESULT_INVALID_CHECKSUM);

    let client = SignedRpcClient::connect(config(port, SECRET)).unwrap();
    let transaction_id = new_transaction_id();
    client.link_card(PROFILE, CARD_A, &transaction_id).await.unwrap();
    let replay = client
        .link_card(PROFILE, CARD_B, &transaction_id)
        .await
        .unwrap();
    assert_eq!(result_code(&replay), RESULT_DUPLICATE_TRANSACTION);
}

#[tokio::test(flavor = "multi_thread")]
async fn unimplemented_operations_fail_locally() {
    let port = spawn_issuer(issuer()).await;
    let client = SignedRpcClient::connect(config(port, SECRET)).unwrap();

    let results = [
        client.link_cards_by_sequence_range().await,
        client.update_profile().await,
        client.statement_by_date_range().await,
        client.activate().await,
        client.update_allocated_card().await,
        client.status().await,
        client.check_authorisation().await,
        client.check_load().await,
    ];
    for result in results {
        assert!(matches!(result, Err(ClientError::UnimplementedOperation(_))));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_is_a_connect_error() {
    // Bind and drop to get a port with nothing listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = SignedRpcClient::connect(config(port, SECRET)).unwrap();

    let err = client
        .balance(PROFILE, CARD_A, &new_transaction_id())
        .await
        .unwrap_err();
    assert!(matches!(err.as_transport(), Some(TransportError::Connect(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_path_is_an_http_error() {
    let port = spawn_issuer(issuer()).await;
    let config = ClientConfig::new(TERMINAL, SECRET, "127.0.0.1", port, "/RPC2");
    let client = SignedRpcClient::connect(config).unwrap();

    let err = client
        .balance(PROFILE, CARD_A, &new_transaction_id())
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_transport(),
        Some(TransportError::Http { status: 404, .. })
    ));
}

/// Execute an `HttpRequest` with ureq and return the raw `HttpResponse`.
///
/// Status codes come back as data so `parse_http_response` decides what
/// counts as a failure.
fn execute(request: HttpRequest) -> HttpResponse {
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();

    let mut post = agent.post(&request.url);
    for (name, value) in &request.headers {
        post = post.header(name.as_str(), value.as_str());
    }
    let mut response = post
        .send(request.body.as_bytes())
        .expect("HTTP transport error");

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    HttpResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

#[test]
fn host_executed_round_trip() {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = std_listener.local_addr().unwrap().port();
    std_listener.set_nonblocking(true).unwrap();

    let issuer = issuer();
    let served = issuer.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, served).await
        })
        .unwrap();
    });

    // The default transport is never used: the host does the IO.
    let client = SignedRpcClient::connect(config(port, SECRET)).unwrap();
    let sign = |method: Method, args: &[&str]| {
        let mut args: Vec<Value> = args.iter().map(|a| Value::from(*a)).collect();
        args.push(Value::from(new_transaction_id()));
        client.sign(method, args).unwrap().to_http(client.config())
    };

    let linked = parse_http_response(execute(sign(Method::LinkCard, &[PROFILE, CARD_A]))).unwrap();
    assert_eq!(result_code(&linked), RESULT_APPROVED);

    let balance = parse_http_response(execute(sign(Method::Balance, &[PROFILE, CARD_A]))).unwrap();
    assert_eq!(result_code(&balance), RESULT_APPROVED);
    assert_eq!(balance.get("balance"), Some(&Value::Int(0)));

    // Missing business argument: the issuer faults instead of declining.
    let err = parse_http_response(execute(sign(Method::Balance, &[PROFILE]))).unwrap_err();
    assert!(matches!(err, TransportError::Fault { .. }));
}
