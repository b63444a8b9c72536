//! HTTP adapter for a TL-JSON gateway in front of the Telegram API.
//!
//! Every raw method is posted to `<base>/invoke` as `{"method", "params"}`
//! with the session token as bearer credential. Calls are synchronous for the
//! callers: the adapter owns a current-thread runtime and blocks on it, with
//! the token bucket and the shutdown signal guarding each call.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize};
use serde_json::{json, Value};
use tokio::{
    runtime::{Builder, Runtime},
    sync::watch,
};

use crate::{
    domain::{cursor::DialogsOffset, peer::InputPeer},
    infra::{config::AppConfig, error::AppError, secrets::SessionToken},
    telegram::{
        rate_limit::{stopped, TokenBucket},
        tl::{
            decode_records, AffectedMessages, DialogsResponse, MessagesResponse, ResolvedPeer,
            UserClass,
        },
        UpstreamError,
    },
    usecases::{
        get_me::AccountSource, list_dialogs::DialogsSource, load_history::HistorySource,
        mark_read::HistoryReader, resolve_dialog::PeerLookup, send_message::MessageSender,
    },
};

const GATEWAY_CALL_FAILED: &str = "TELEGRAM_GATEWAY_CALL_FAILED";
const GATEWAY_CALL_CANCELLED: &str = "TELEGRAM_GATEWAY_CALL_CANCELLED";
const GATEWAY_SHUTDOWN_SIGNALLED: &str = "TELEGRAM_GATEWAY_SHUTDOWN_SIGNALLED";

const INVOKE_PATH: &str = "/invoke";
const UNKNOWN_RPC_ERROR: &str = "unknown error";

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub token: SessionToken,
    pub requests_per_second: u32,
    pub burst: u32,
    pub request_timeout: Duration,
}

impl GatewaySettings {
    pub fn from_config(config: &AppConfig, token: SessionToken) -> Self {
        Self {
            base_url: config.telegram.gateway_url.clone(),
            token,
            requests_per_second: config.limits.requests_per_second,
            burst: config.limits.burst,
            request_timeout: Duration::from_millis(config.limits.request_timeout_ms),
        }
    }
}

#[derive(Debug)]
pub struct GatewayApi {
    runtime: Runtime,
    http: reqwest::Client,
    invoke_url: String,
    token: SessionToken,
    limiter: TokenBucket,
    stop_rx: watch::Receiver<bool>,
    request_timeout: Duration,
    next_random_id: AtomicI64,
}

/// Cancels pending and future gateway calls once signalled.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.stop_tx.send_replace(true);
        tracing::info!(
            code = GATEWAY_SHUTDOWN_SIGNALLED,
            "gateway shutdown signal sent"
        );
    }

    /// Waits for `signal`, then cancels every call still waiting on the limiter
    /// or on the network.
    pub async fn cancel_on<F: Future<Output = ()>>(self, signal: F) {
        signal.await;
        self.shutdown();
    }
}

impl GatewayApi {
    pub fn connect(settings: GatewaySettings) -> Result<(Self, ShutdownHandle), AppError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AppError::RuntimeInit)?;

        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(AppError::HttpClientInit)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let seed = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let api = Self {
            runtime,
            http,
            invoke_url: format!("{}{INVOKE_PATH}", settings.base_url.trim_end_matches('/')),
            token: settings.token,
            limiter: TokenBucket::new(settings.requests_per_second, settings.burst),
            stop_rx,
            request_timeout: settings.request_timeout,
            next_random_id: AtomicI64::new(seed),
        };

        Ok((
            api,
            ShutdownHandle {
                stop_tx: Arc::new(stop_tx),
            },
        ))
    }

    fn invoke<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, UpstreamError> {
        let mut stop_rx = self.stop_rx.clone();
        let started = Instant::now();

        let result = self.runtime.block_on(async {
            self.limiter
                .acquire(&mut stop_rx)
                .await
                .map_err(|_| UpstreamError::Cancelled)?;

            tokio::select! {
                reply = self.post(method, params) => reply,
                _ = stopped(&mut stop_rx) => Err(UpstreamError::Cancelled),
            }
        });

        match &result {
            Ok(_) => tracing::debug!(
                method,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "gateway call finished"
            ),
            Err(UpstreamError::Cancelled) => tracing::info!(
                code = GATEWAY_CALL_CANCELLED,
                method,
                "gateway call cancelled"
            ),
            Err(error) => tracing::warn!(
                code = GATEWAY_CALL_FAILED,
                method,
                error = %error,
                "gateway call failed"
            ),
        }

        result
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, UpstreamError> {
        let response = self
            .http
            .post(&self.invoke_url)
            .bearer_auth(self.token.expose())
            .json(&json!({ "method": method, "params": params }))
            .send()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        decode_reply(&body)
    }

    fn map_transport_error(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            UpstreamError::Transport(error.to_string())
        }
    }

    fn random_id(&self) -> i64 {
        self.next_random_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<i32>,
    #[serde(default)]
    description: Option<String>,
}

fn decode_reply<T: DeserializeOwned>(body: &[u8]) -> Result<T, UpstreamError> {
    let reply: GatewayReply =
        serde_json::from_slice(body).map_err(|error| UpstreamError::Decode(error.to_string()))?;

    if !reply.ok {
        return Err(UpstreamError::Rpc {
            code: reply.error_code.unwrap_or_default(),
            message: reply
                .description
                .or(reply.error)
                .unwrap_or_else(|| UNKNOWN_RPC_ERROR.to_owned()),
        });
    }

    serde_json::from_value(reply.result).map_err(|error| UpstreamError::Decode(error.to_string()))
}

pub fn input_peer_json(peer: &InputPeer) -> Value {
    match *peer {
        InputPeer::Empty => json!({ "_": "inputPeerEmpty" }),
        InputPeer::SelfPeer => json!({ "_": "inputPeerSelf" }),
        InputPeer::User {
            user_id,
            access_hash,
        } => json!({ "_": "inputPeerUser", "user_id": user_id, "access_hash": access_hash }),
        InputPeer::Chat { chat_id } => json!({ "_": "inputPeerChat", "chat_id": chat_id }),
        InputPeer::Channel {
            channel_id,
            access_hash,
        } => json!({
            "_": "inputPeerChannel",
            "channel_id": channel_id,
            "access_hash": access_hash,
        }),
    }
}

fn input_channel_json(channel_id: i64, access_hash: i64) -> Value {
    json!({ "_": "inputChannel", "channel_id": channel_id, "access_hash": access_hash })
}

impl DialogsSource for GatewayApi {
    fn get_dialogs(
        &self,
        offset: DialogsOffset,
        limit: i32,
    ) -> Result<DialogsResponse, UpstreamError> {
        self.invoke(
            "messages.getDialogs",
            json!({
                "offset_date": offset.date,
                "offset_id": offset.message_id,
                "offset_peer": input_peer_json(&offset.peer),
                "limit": limit,
                "hash": 0,
            }),
        )
    }
}

impl HistorySource for GatewayApi {
    fn get_history(
        &self,
        peer: InputPeer,
        offset_id: i32,
        limit: i32,
    ) -> Result<MessagesResponse, UpstreamError> {
        self.invoke(
            "messages.getHistory",
            json!({
                "peer": input_peer_json(&peer),
                "offset_id": offset_id,
                "offset_date": 0,
                "add_offset": 0,
                "limit": limit,
                "max_id": 0,
                "min_id": 0,
                "hash": 0,
            }),
        )
    }
}

impl PeerLookup for GatewayApi {
    fn resolve_username(&self, username: &str) -> Result<ResolvedPeer, UpstreamError> {
        self.invoke("contacts.resolveUsername", json!({ "username": username }))
    }
}

impl MessageSender for GatewayApi {
    fn send_text(&self, peer: InputPeer, text: &str) -> Result<(), UpstreamError> {
        self.invoke::<IgnoredAny>(
            "messages.sendMessage",
            json!({
                "peer": input_peer_json(&peer),
                "message": text,
                "random_id": self.random_id(),
            }),
        )
        .map(|_| ())
    }

    fn save_draft(&self, peer: InputPeer, text: &str) -> Result<bool, UpstreamError> {
        self.invoke(
            "messages.saveDraft",
            json!({ "peer": input_peer_json(&peer), "message": text }),
        )
    }
}

impl HistoryReader for GatewayApi {
    fn read_history(&self, peer: InputPeer) -> Result<i32, UpstreamError> {
        let affected: AffectedMessages = self.invoke(
            "messages.readHistory",
            json!({ "peer": input_peer_json(&peer), "max_id": 0 }),
        )?;

        Ok(affected.pts_count)
    }

    fn read_channel_history(
        &self,
        channel_id: i64,
        access_hash: i64,
    ) -> Result<bool, UpstreamError> {
        self.invoke(
            "channels.readHistory",
            json!({ "channel": input_channel_json(channel_id, access_hash), "max_id": 0 }),
        )
    }
}

impl AccountSource for GatewayApi {
    fn get_self(&self) -> Result<Vec<UserClass>, UpstreamError> {
        let users: Vec<Value> =
            self.invoke("users.getUsers", json!({ "id": [{ "_": "inputUserSelf" }] }))?;

        Ok(decode_records(users))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        thread,
    };

    use super::*;

    /// Answers exactly one HTTP request with the given status and body and
    /// hands back the raw request text.
    fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let base_url = format!("http://{}", listener.local_addr().expect("bound address"));

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("client should connect");
            let request = read_request(&mut stream);
            let reply = format!(
                "HTTP/1.1 {status}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("reply should be written");
            request
        });

        (base_url, handle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut received = Vec::new();
        let mut chunk = [0_u8; 1024];

        loop {
            let read = stream.read(&mut chunk).expect("request should arrive");
            if read == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..read]);

            let text = String::from_utf8_lossy(&received);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let body_len = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if received.len() >= head_end + 4 + body_len {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&received).into_owned()
    }

    fn settings(base_url: &str) -> GatewaySettings {
        GatewaySettings {
            base_url: base_url.to_owned(),
            token: SessionToken::new("test-token"),
            requests_per_second: 0,
            burst: 1,
            request_timeout: Duration::from_millis(500),
        }
    }

    #[test]
    fn builds_invoke_url_without_double_slash() {
        let (api, _shutdown) = GatewayApi::connect(settings("http://127.0.0.1:8081/"))
            .expect("gateway should build");

        assert_eq!(api.invoke_url, "http://127.0.0.1:8081/invoke");
    }

    #[test]
    fn encodes_every_input_peer_kind() {
        assert_eq!(input_peer_json(&InputPeer::Empty), json!({"_": "inputPeerEmpty"}));
        assert_eq!(input_peer_json(&InputPeer::SelfPeer), json!({"_": "inputPeerSelf"}));
        assert_eq!(
            input_peer_json(&InputPeer::User {
                user_id: 1,
                access_hash: 2
            }),
            json!({"_": "inputPeerUser", "user_id": 1, "access_hash": 2})
        );
        assert_eq!(
            input_peer_json(&InputPeer::Chat { chat_id: 3 }),
            json!({"_": "inputPeerChat", "chat_id": 3})
        );
        assert_eq!(
            input_peer_json(&InputPeer::Channel {
                channel_id: 4,
                access_hash: -5
            }),
            json!({"_": "inputPeerChannel", "channel_id": 4, "access_hash": -5})
        );
    }

    #[test]
    fn decodes_successful_reply_into_typed_result() {
        let body =
            br#"{"ok": true, "result": {"_": "affectedMessages", "pts": 10, "pts_count": 2}}"#;

        let affected: AffectedMessages = decode_reply(body).expect("reply should decode");

        assert_eq!(affected.pts_count, 2);
    }

    #[test]
    fn rpc_failure_carries_code_and_description() {
        let body = br#"{"ok": false, "error_code": 420, "description": "FLOOD_WAIT_7"}"#;

        let err = decode_reply::<bool>(body).expect_err("must fail");

        assert_eq!(
            err,
            UpstreamError::Rpc {
                code: 420,
                message: "FLOOD_WAIT_7".to_owned()
            }
        );
    }

    #[test]
    fn rpc_failure_without_details_falls_back() {
        let err = decode_reply::<bool>(br#"{"ok": false, "error": "PEER_ID_INVALID"}"#)
            .expect_err("must fail");
        let bare = decode_reply::<bool>(br#"{"ok": false}"#).expect_err("must fail");

        assert_eq!(
            err,
            UpstreamError::Rpc {
                code: 0,
                message: "PEER_ID_INVALID".to_owned()
            }
        );
        assert_eq!(
            bare,
            UpstreamError::Rpc {
                code: 0,
                message: "unknown error".to_owned()
            }
        );
    }

    #[test]
    fn malformed_envelope_or_result_is_decode_error() {
        assert!(matches!(
            decode_reply::<bool>(b"<html>bad gateway</html>"),
            Err(UpstreamError::Decode(_))
        ));
        assert!(matches!(
            decode_reply::<bool>(br#"{"ok": true, "result": {"_": "updates"}}"#),
            Err(UpstreamError::Decode(_))
        ));
    }

    #[test]
    fn calls_after_shutdown_are_cancelled_without_network() {
        let (api, shutdown) = GatewayApi::connect(settings("http://127.0.0.1:9"))
            .expect("gateway should build");
        shutdown.shutdown();

        assert_eq!(api.get_self(), Err(UpstreamError::Cancelled));
        assert_eq!(api.save_draft(InputPeer::SelfPeer, "x"), Err(UpstreamError::Cancelled));
    }

    #[test]
    fn posts_method_with_bearer_token_and_keeps_well_formed_users() {
        let (base_url, server) = serve_once(
            "200 OK",
            concat!(
                r#"{"ok": true, "result": "#,
                r#"[{"_": "user", "id": 7, "first_name": "Ann"}, {"_": "user"}]}"#
            ),
        );
        let (api, _shutdown) =
            GatewayApi::connect(settings(&base_url)).expect("gateway should build");

        let users = api.get_self().expect("call should succeed");
        let request = server.join().expect("fixture thread should finish");

        assert_eq!(users.len(), 1);
        assert!(request.starts_with("POST /invoke "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer test-token"));
        assert!(request.contains(r#""method":"users.getUsers""#));
    }

    #[test]
    fn non_success_status_is_status_error() {
        let (base_url, server) = serve_once("502 Bad Gateway", "");
        let (api, _shutdown) =
            GatewayApi::connect(settings(&base_url)).expect("gateway should build");

        let result = api.save_draft(InputPeer::SelfPeer, "x");
        server.join().expect("fixture thread should finish");

        assert_eq!(result, Err(UpstreamError::Status(502)));
    }

    #[test]
    fn silent_gateway_times_out() {
        // Connections queue in the backlog but never get an answer.
        let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
        let base_url = format!("http://{}", listener.local_addr().expect("bound address"));
        let (api, _shutdown) =
            GatewayApi::connect(settings(&base_url)).expect("gateway should build");

        assert_eq!(api.get_self(), Err(UpstreamError::Timeout(500)));
        drop(listener);
    }

    #[test]
    fn signalled_shutdown_cancels_a_call_waiting_for_a_token() {
        let (api, shutdown) = GatewayApi::connect(GatewaySettings {
            requests_per_second: 1,
            ..settings("http://127.0.0.1:9")
        })
        .expect("gateway should build");
        let mut stop_rx = api.stop_rx.clone();
        api.runtime
            .block_on(api.limiter.acquire(&mut stop_rx))
            .expect("the only token is free");

        let signaller = thread::spawn(move || {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("signal runtime should build");
            let _guard = runtime.enter();
            runtime.block_on(shutdown.cancel_on(tokio::time::sleep(Duration::from_millis(50))));
        });

        let started = Instant::now();
        let result = api.get_self();
        signaller.join().expect("signaller should finish");

        assert_eq!(result, Err(UpstreamError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[test]
    fn random_ids_are_unique_per_call() {
        let (api, _shutdown) = GatewayApi::connect(settings("http://127.0.0.1:9"))
            .expect("gateway should build");

        let first = api.random_id();
        let second = api.random_id();

        assert_ne!(first, second);
    }
}
