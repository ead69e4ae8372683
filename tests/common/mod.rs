//! In-process mock Network Access Gateway for integration tests

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use certnotary::crypto::verify;
use certnotary::gateway::DiscoveryResolver;
use certnotary::tx::TransactionRequest;
use certnotary::{Account, HttpTransport, RetryPolicy};

pub const ADDRESS: &str = "0xbc6ea0d3a6bd9b1b0a1fa6bf4e4f5f1b2a8e93aa";
pub const PRIVATE_KEY: &str = "11842e4034999297038f59f054d1794389758469070e15999837078cec243f55";

#[derive(Debug, Default)]
pub struct NagState {
    /// Last nonce accepted for the wallet
    pub last_nonce: u64,
    /// Accepted transactions by ID
    pub transactions: HashMap<String, Value>,
    /// Number of upcoming calls answered with 503
    pub unavailable: u32,
    /// Status returned for every call while set
    pub forced_status: Option<StatusCode>,
    /// Queries answered `Pending` before a transaction reads `Executed`
    pub pending_polls: u32,
    /// Uncompressed public key used to check submitted signatures
    pub public_key: Option<String>,
    /// `cep` of every call received, in order
    pub calls: Vec<String>,
    /// Base URL the server is listening on
    pub base: String,
}

#[derive(Clone, Default)]
pub struct MockNag {
    pub state: Arc<Mutex<NagState>>,
}

impl MockNag {
    pub fn new(last_nonce: u64) -> Self {
        let nag = Self::default();
        nag.state.lock().unwrap().last_nonce = last_nonce;
        nag
    }

    pub fn with<F: FnOnce(&mut NagState)>(&self, f: F) -> &Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn last_nonce(&self) -> u64 {
        self.state.lock().unwrap().last_nonce
    }

    /// Serve on an ephemeral port; returns the base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/NAG.php", post(nag_handler))
            .route("/getNAG", get(discovery_handler))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let base = format!("http://{}", addr);
        self.state.lock().unwrap().base = base.clone();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }
}

async fn discovery_handler(
    State(nag): State<MockNag>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let base = nag.state.lock().unwrap().base.clone();
    match params.get("network").map(String::as_str) {
        Some("testnet") => Json(json!({"status": "success", "url": format!("{}/NAG.php?cep=", base)})),
        _ => Json(json!({"status": "error", "message": "Unknown network"})),
    }
}

async fn nag_handler(
    State(nag): State<MockNag>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = nag.state.lock().unwrap();
    let cep = params.get("cep").cloned().unwrap_or_default();
    state.calls.push(cep.clone());

    if state.unavailable > 0 {
        state.unavailable -= 1;
        return (StatusCode::SERVICE_UNAVAILABLE, "gateway busy").into_response();
    }
    if let Some(status) = state.forced_status {
        return (status, "forced failure").into_response();
    }

    let function = cep.trim_start_matches("Circular_");
    let reply = if function.starts_with("GetWalletNonce_") {
        json!({"Result": 200, "Response": {"Nonce": state.last_nonce}})
    } else if function.starts_with("AddTransaction_") {
        add_transaction(&mut state, body)
    } else if function.starts_with("GetTransactionbyID_") {
        get_transaction(&mut state, &body)
    } else {
        json!({"Result": 404, "Response": "Unknown function"})
    };
    Json(reply).into_response()
}

fn add_transaction(state: &mut NagState, body: Value) -> Value {
    let request: TransactionRequest = match serde_json::from_value(body.clone()) {
        Ok(request) => request,
        Err(e) => return json!({"Result": 108, "Response": format!("Bad request: {}", e)}),
    };
    if request.recompute_id() != request.id {
        return json!({"Result": 112, "Response": "Invalid ID"});
    }
    if let Some(key) = &state.public_key {
        if !verify(key, request.id.as_bytes(), &request.signature) {
            return json!({"Result": 114, "Response": "Invalid Signature"});
        }
    }
    if request.nonce != state.last_nonce + 1 {
        return json!({"Result": 118, "Response": "Invalid Nonce"});
    }

    state.last_nonce = request.nonce;
    state
        .transactions
        .insert(request.id.clone(), json!({"polls": 0, "tx": body}));
    json!({"Result": 200, "Response": {"TxID": request.id}})
}

fn get_transaction(state: &mut NagState, body: &Value) -> Value {
    let id = body["ID"].as_str().unwrap_or_default().to_string();
    let pending_polls = state.pending_polls;
    let Some(entry) = state.transactions.get_mut(&id) else {
        return json!({"Result": 118, "Response": "Transaction Not Found"});
    };

    let polls = entry["polls"].as_u64().unwrap_or(0) as u32;
    entry["polls"] = json!(polls + 1);
    let status = if polls < pending_polls { "Pending" } else { "Executed" };

    let tx = &entry["tx"];
    json!({
        "Result": 200,
        "Response": {
            "ID": id,
            "Status": status,
            "BlockID": if status == "Executed" { json!("0000b10c") } else { Value::Null },
            "From": tx["From"],
            "Nonce": tx["Nonce"],
            "Payload": tx["Payload"],
            "NagFee": "0.1",
            "ProtocolFee": 0.02
        }
    })
}

pub fn transport(max_retries: u32, delay: Duration) -> Arc<HttpTransport> {
    Arc::new(HttpTransport::new(Duration::from_secs(5), RetryPolicy::new(max_retries, delay)).unwrap())
}

/// Open account wired to the mock discovery endpoint; network not yet set
pub fn account(base: &str, transport: Arc<HttpTransport>) -> Account {
    let resolver = DiscoveryResolver::new(transport.clone(), format!("{}/getNAG", base));
    let mut account = Account::builder(transport)
        .resolver(Arc::new(resolver))
        .build();
    account.open(ADDRESS).unwrap();
    account
}
