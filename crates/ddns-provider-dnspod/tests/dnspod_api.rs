//! Contract Test: DNSPod wire protocol
//!
//! Constraints verified:
//! - Every call is a sorted form POST carrying the login token and common parameters
//! - Record.Modify carries exactly the resolved ids, the label, type A, the default line and the new value
//! - An unchanged record issues no Record.Modify
//! - Provider status codes other than "1" are failures even on HTTP 200
//! - Unparsable bodies and HTTP errors are distinguished from rejections
//! - Concurrent tenants sharing a registry each send only their own login token

use ddns_core::config::ProviderConfig;
use ddns_core::traits::{Credentials, DnsProviderFactory};
use ddns_core::{ClientRegistry, ReconcileOutcome, ReconcileRequest, ReconcileStage, Reconciler};
use ddns_provider_dnspod::DnspodFactory;
use serde_json::json;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "10000,abcdef";

fn reconciler_for(server: &MockServer) -> Reconciler {
    let config = ProviderConfig::Dnspod {
        api_base: server.uri(),
        record_line: "默认".to_string(),
        user_agent: "ddns-relay-test/1.0".to_string(),
        timeout_secs: 5,
    };
    let factory = DnspodFactory::from_config(&config).unwrap();
    Reconciler::new(factory.create(&Credentials::token(TOKEN)).unwrap())
}

async fn mount_domain_list(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .and(body_string(
            "error_on_empty=no&format=json&lang=en&length=20&login_token=10000%2Cabcdef&offset=0&type=all",
        ))
        .and(header("user-agent", "ddns-relay-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "domains": [
                {"id": 11111, "name": "example.org"},
                {"id": 12345, "name": "example.com"}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_record_list(server: &MockServer, value: &str) {
    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .and(body_string(
            "domain_id=12345&error_on_empty=no&format=json&lang=en&length=1&login_token=10000%2Cabcdef\
             &offset=0&sub_domain=home",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "records": [
                {"id": "98765", "name": "home", "type": "A", "value": value}
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn divergent_record_is_modified_with_exact_form() {
    let server = MockServer::start().await;
    mount_domain_list(&server).await;
    mount_record_list(&server, "1.2.3.4").await;

    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .and(body_string(
            "domain_id=12345&error_on_empty=no&format=json&lang=en&login_token=10000%2Cabcdef\
             &record_id=98765&record_line=%E9%BB%98%E8%AE%A4&record_type=A&sub_domain=home&value=5.6.7.8",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "record": {"id": 98765, "name": "home", "value": "5.6.7.8", "status": "enable"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let outcome = reconciler_for(&server).reconcile(&request).await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Updated {
            previous: "1.2.3.4".to_string(),
            current: "5.6.7.8".to_string(),
        }
    );
}

#[tokio::test]
async fn matching_record_is_not_modified() {
    let server = MockServer::start().await;
    mount_domain_list(&server).await;
    mount_record_list(&server, "5.6.7.8").await;

    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let outcome = reconciler_for(&server).reconcile(&request).await.unwrap();

    assert!(!outcome.wrote());
}

#[tokio::test]
async fn unknown_domain_stops_before_record_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "domains": [{"id": 11111, "name": "example.org"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.stage, ReconcileStage::ResolveDomain);
    assert_eq!(err.source.kind(), "not_found");
}

#[tokio::test]
async fn login_failure_is_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "-1", "message": "Login failed"}
        })))
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.stage, ReconcileStage::ResolveDomain);
    assert_eq!(err.source.kind(), "provider_rejected");
    assert!(err.source.to_string().contains("Login failed"));
}

#[tokio::test]
async fn modify_rejected_on_http_200_is_failure() {
    let server = MockServer::start().await;
    mount_domain_list(&server).await;
    mount_record_list(&server, "1.2.3.4").await;

    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "-15", "message": "Domain is locked"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.stage, ReconcileStage::UpdateRecord);
    assert_eq!(err.source.kind(), "provider_rejected");
}

#[tokio::test]
async fn missing_record_is_not_found() {
    let server = MockServer::start().await;
    mount_domain_list(&server).await;

    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "records": []
        })))
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.stage, ReconcileStage::ResolveRecord);
    assert_eq!(err.source.kind(), "not_found");
}

#[tokio::test]
async fn unparsable_body_is_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.source.kind(), "malformed_response");
}

#[tokio::test]
async fn http_error_is_transport_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let err = reconciler_for(&server).reconcile(&request).await.unwrap_err();

    assert_eq!(err.source.kind(), "transport");
}

/// Mount the three calls of one tenant, matched on its own login token
async fn mount_tenant(server: &MockServer, encoded_token: &str, zone: &str, domain_id: u32, record_id: u32) {
    let token = format!("login_token={}", encoded_token);

    Mock::given(method("POST"))
        .and(path("/Domain.List"))
        .and(body_string_contains(token.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "domains": [{"id": domain_id, "name": zone}]
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Record.List"))
        .and(body_string_contains(token.as_str()))
        .and(body_string_contains(format!("domain_id={}", domain_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"},
            "records": [{"id": record_id, "name": "home", "type": "A", "value": "1.2.3.4"}]
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Record.Modify"))
        .and(body_string_contains(token.as_str()))
        .and(body_string_contains(format!("domain_id={}", domain_id)))
        .and(body_string_contains(format!("record_id={}", record_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"code": "1", "message": "Action completed successful"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn concurrent_tenants_send_only_their_own_token() {
    let server = MockServer::start().await;
    mount_tenant(&server, "10000%2Calpha", "example.com", 111, 1001).await;
    mount_tenant(&server, "20000%2Cbravo", "example.net", 222, 2002).await;

    let registry = ClientRegistry::new();
    ddns_provider_dnspod::register(
        &registry,
        &ProviderConfig::Dnspod {
            api_base: server.uri(),
            record_line: "默认".to_string(),
            user_agent: "ddns-relay-test/1.0".to_string(),
            timeout_secs: 5,
        },
    )
    .unwrap();

    let alpha = Reconciler::new(
        registry
            .client_for("dnspod", &Credentials::token("10000,alpha"))
            .unwrap(),
    );
    let bravo = Reconciler::new(
        registry
            .client_for("dnspod", &Credentials::token("20000,bravo"))
            .unwrap(),
    );
    let alpha_request = ReconcileRequest::new("example.com", "home", "5.6.7.8").unwrap();
    let bravo_request = ReconcileRequest::new("example.net", "home", "9.9.9.9").unwrap();

    let (alpha_outcome, bravo_outcome) = tokio::join!(
        alpha.reconcile(&alpha_request),
        bravo.reconcile(&bravo_request)
    );
    assert!(alpha_outcome.unwrap().wrote());
    assert!(bravo_outcome.unwrap().wrote());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 6);
    for request in requests {
        let body = String::from_utf8(request.body).unwrap();
        let alpha_body = body.contains("login_token=10000%2Calpha");
        let bravo_body = body.contains("login_token=20000%2Cbravo");
        assert!(alpha_body != bravo_body, "body carries the wrong token set: {}", body);
        if alpha_body {
            assert!(!body.contains("domain_id=222") && !body.contains("9.9.9.9"));
        } else {
            assert!(!body.contains("domain_id=111") && !body.contains("5.6.7.8"));
        }
    }
}
