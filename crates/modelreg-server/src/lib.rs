//! HTTP front-end for the modelreg registry.
//!
//! Exposes register, resolve, promote, verify, show and history over JSON,
//! backed by one shared [`Registry`]. Registry errors come back as
//! `{"ok": false, "error": ..., "kind": ...}` with a status derived from the
//! error kind.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

use modelreg_core::{CoreError, ErrorKind, RegisterOptions, Registry};
use modelreg_store::Metadata;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

pub const SERVICE_NAME: &str = "modelreg";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP server on {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error(transparent)]
    Registry(#[from] CoreError),
}

/// An error response: status code, message and machine-readable kind.
#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub kind: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
            kind: "bad_request".to_owned(),
        }
    }

    fn not_found_route() -> Self {
        Self {
            status: 404,
            message: "no such route".to_owned(),
            kind: "not_found".to_owned(),
        }
    }

    fn method_not_allowed() -> Self {
        Self {
            status: 405,
            message: "method not allowed".to_owned(),
            kind: "method_not_allowed".to_owned(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let kind = e.kind();
        let status = match kind {
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists => 409,
            ErrorKind::Unclassified => 500,
            _ => 400,
        };
        if status == 500 {
            error!("registry fault: {e}");
        }
        Self {
            status,
            message: e.to_string(),
            kind: kind.to_string(),
        }
    }
}

type ApiResult = Result<Value, ApiError>;

fn default_alias() -> Option<String> {
    Some("latest".to_owned())
}

fn default_api_reason() -> Option<String> {
    Some("api register".to_owned())
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub task: String,
    pub model_name: String,
    pub version: String,
    pub artifacts_dir: PathBuf,
    #[serde(default)]
    pub metadata: Metadata,
    /// Absent means `"latest"`; an explicit `null` skips promotion.
    #[serde(default = "default_alias")]
    pub set_alias: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default = "default_api_reason")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub task: String,
    pub model_name: String,
    pub alias: String,
    pub version: String,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub task: String,
    #[serde(rename = "ref")]
    pub model_ref: String,
}

/// Decode `%XX` escapes and `+` in a query component. Malformed escapes are
/// kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let escaped = bytes
                    .get(i + 1..i + 3)
                    .and_then(|pair| hex::decode(pair).ok());
                if let Some(decoded) = escaped {
                    out.extend_from_slice(&decoded);
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a request URL into its path and decoded query parameters.
pub fn split_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect();
    (path, params)
}

fn required<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str, ApiError> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing query parameter '{key}'")))
}

fn flag(params: &HashMap<String, String>, key: &str, default: bool) -> Result<bool, ApiError> {
    match params.get(key).map(String::as_str) {
        None | Some("") => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ApiError::bad_request(format!(
            "query parameter '{key}' must be a boolean, got '{other}'"
        ))),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(req: &mut Request) -> Result<T, ApiError> {
    let mut body = Vec::new();
    req.as_reader()
        .read_to_end(&mut body)
        .map_err(|e| ApiError::bad_request(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))
}

fn health(registry: &Registry) -> ApiResult {
    Ok(json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "registry_root": registry.root(),
    }))
}

fn register(registry: &Registry, req: &mut Request) -> ApiResult {
    let body: RegisterRequest = read_json(req)?;
    let options = RegisterOptions {
        set_alias: body.set_alias,
        actor: body.actor,
        reason: body.reason,
    };
    let out = registry.register(
        &body.task,
        &body.model_name,
        &body.version,
        &body.artifacts_dir,
        body.metadata,
        &options,
    )?;
    info!("registered {}/{}@{}", out.task, out.model_name, out.version);
    Ok(json!({
        "ok": true,
        "task": out.task,
        "model_name": out.model_name,
        "version": out.version,
        "package_path": out.package_path,
        "alias_set": out.alias_set,
    }))
}

fn resolve(registry: &Registry, params: &HashMap<String, String>) -> ApiResult {
    let task = required(params, "task")?;
    let model_ref = required(params, "ref")?;
    let verify = flag(params, "verify", true)?;
    let path = registry.resolve(task, model_ref, verify)?;
    Ok(json!({ "ok": true, "path": path }))
}

fn promote(registry: &Registry, req: &mut Request) -> ApiResult {
    let body: PromoteRequest = read_json(req)?;
    registry.promote(
        &body.task,
        &body.model_name,
        &body.alias,
        &body.version,
        body.actor.as_deref(),
        body.reason.as_deref(),
    )?;
    Ok(json!({ "ok": true }))
}

fn verify(registry: &Registry, req: &mut Request) -> ApiResult {
    let body: VerifyRequest = read_json(req)?;
    registry.verify(&body.task, &body.model_ref)?;
    Ok(json!({ "ok": true }))
}

fn show(registry: &Registry, params: &HashMap<String, String>) -> ApiResult {
    let task = required(params, "task")?;
    let model_ref = required(params, "ref")?;
    let verify = flag(params, "verify", false)?;
    let pkg = registry.read_metadata(task, model_ref, verify)?;
    Ok(json!({ "ok": true, "meta": pkg.meta, "package_dir": pkg.package_dir }))
}

fn history(registry: &Registry, params: &HashMap<String, String>) -> ApiResult {
    let task = required(params, "task")?;
    let model = required(params, "model")?;
    let events = registry.promotion_history(task, model)?;
    Ok(json!({ "ok": true, "events": events }))
}

fn respond_json(req: Request, status: u16, body: &Value) {
    let data = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::from_data(data).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response = response.with_header(header);
    }
    if let Err(e) = req.respond(response) {
        warn!("failed to send response: {e}");
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(registry: &Registry, mut req: Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let (path, params) = split_url(&url);
    let result = match (path, &method) {
        ("/health", Method::Get) => health(registry),
        ("/v1/register", Method::Post) => register(registry, &mut req),
        ("/v1/resolve", Method::Get) => resolve(registry, &params),
        ("/v1/promote", Method::Post) => promote(registry, &mut req),
        ("/v1/verify", Method::Post) => verify(registry, &mut req),
        ("/v1/show", Method::Get) => show(registry, &params),
        ("/v1/history", Method::Get) => history(registry, &params),
        (
            "/health" | "/v1/register" | "/v1/resolve" | "/v1/promote" | "/v1/verify"
            | "/v1/show" | "/v1/history",
            _,
        ) => Err(ApiError::method_not_allowed()),
        _ => Err(ApiError::not_found_route()),
    };

    match result {
        Ok(body) => respond_json(req, 200, &body),
        Err(e) => {
            debug!("{method} {path}: {} {}", e.status, e.message);
            let body = json!({ "ok": false, "error": e.message, "kind": e.kind });
            respond_json(req, e.status, &body);
        }
    }
}

fn bind(addr: &str) -> Result<Server, ServerError> {
    Server::http(addr).map_err(|e| ServerError::Bind {
        addr: addr.to_owned(),
        reason: e.to_string(),
    })
}

/// Start the server loop, blocking the current thread.
pub fn run_server(registry: &Arc<Registry>, addr: &str) -> Result<(), ServerError> {
    let server = bind(addr)?;
    info!("listening on {addr}");
    for request in server.incoming_requests() {
        handle_request(registry, request);
    }
    Ok(())
}

/// A test helper that starts a modelreg server on a random port in a background thread.
///
/// The server listens on `127.0.0.1:{port}`. Drop the `TestServer` to stop it.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub registry: Arc<Registry>,
    server: Arc<Server>,
    _handle: std::thread::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server over `registry`, bound to `127.0.0.1:0` (random port).
    pub fn start(registry: Registry) -> Result<Self, ServerError> {
        let server = Arc::new(bind("127.0.0.1:0")?);
        let port = server
            .server_addr()
            .to_ip()
            .map(|a| a.port())
            .ok_or_else(|| ServerError::Bind {
                addr: "127.0.0.1:0".to_owned(),
                reason: "not an IP address".to_owned(),
            })?;
        let url = format!("http://127.0.0.1:{port}");

        let registry = Arc::new(registry);
        let shared = Arc::clone(&registry);
        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&shared, request);
            }
        });

        Ok(Self {
            url,
            port,
            registry,
            server,
            _handle: handle,
        })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}
