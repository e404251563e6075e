use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::x509::{X509, X509NameBuilder};
use viisp_auth::{Config, Credential, ViispClient, crypto::rsa::RsaPrivateKey};

pub const SERVICE_ID: &str = "VSID000000000113";

pub const TICKET_RESPONSE: &str = include_str!("../../test_data/responses/ticket.xml");
pub const NO_TICKET_RESPONSE: &str = include_str!("../../test_data/responses/no-ticket.xml");
pub const FAULT_RESPONSE: &str = include_str!("../../test_data/responses/fault.xml");
pub const USER_INFO_RESPONSE: &str = include_str!("../../test_data/responses/user-info.xml");

/// A request as seen by the stub
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl Recorder {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn single(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

/// Canned answer returned for every request
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, String)>,
    pub body: String,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::ok(body)
        }
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

struct Stub {
    response: StubResponse,
    recorder: Recorder,
}

async fn respond(
    State(stub): State<Arc<Stub>>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    stub.recorder.0.lock().unwrap().push(RecordedRequest {
        path: uri.path().to_string(),
        headers,
        body,
    });

    if let Some(delay) = stub.response.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = (stub.response.status, stub.response.body.clone()).into_response();
    for (name, value) in &stub.response.headers {
        // append keeps repeated headers such as Set-Cookie apart
        response
            .headers_mut()
            .append(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    response
}

/// Spawns a stub of the remote service on a random port
pub async fn spawn_stub(response: StubResponse) -> (String, Recorder) {
    let recorder = Recorder::default();
    let stub = Arc::new(Stub {
        response,
        recorder: recorder.clone(),
    });
    let app = Router::new().fallback(respond).with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("failed to run stub");
    });

    (format!("http://{addr}"), recorder)
}

/// Configuration pointing both endpoints at `base_url`
pub fn config(base_url: &str, overrides: &[(&str, &str)]) -> Config {
    let mut env_vars = HashMap::new();
    env_vars.insert("viisp.service_id".to_string(), SERVICE_ID.to_string());
    env_vars.insert(
        "viisp.auth_service_url".to_string(),
        format!("{base_url}/auth"),
    );
    env_vars.insert(
        "viisp.redirect_service_url".to_string(),
        format!("{base_url}/redirect"),
    );
    for (key, value) in overrides {
        env_vars.insert(key.to_string(), value.to_string());
    }
    Config::load_with_sources(Some(env_vars)).unwrap()
}

/// Client signing with the embedded test credential
pub fn client(base_url: &str) -> ViispClient {
    ViispClient::new(&config(base_url, &[])).unwrap()
}

/// Fresh key pair with a self-signed certificate
pub fn generated_credential(common_name: &str) -> Credential {
    let private_key = RsaPrivateKey::generate(2048).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", common_name).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(private_key.pkey()).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder
        .sign(private_key.pkey(), MessageDigest::sha256())
        .unwrap();

    Credential::from_parts(private_key, builder.build()).unwrap()
}

/// Strips the SOAP envelope the client wraps documents in
pub fn soap_body(envelope: &str) -> &str {
    let start = envelope.find("<soap:Body>").unwrap() + "<soap:Body>".len();
    let end = envelope.rfind("</soap:Body>").unwrap();
    &envelope[start..end]
}
