//! MCP server exposing the Telegram tools over stdio.
//!
//! The use cases are synchronous and the gateway blocks on its own runtime,
//! so every tool call runs on the blocking pool, off the server's runtime.

mod tools;

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ErrorData, Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Serialize;

use crate::usecases::{
    get_me::{get_me, AccountSource},
    list_dialogs::{list_dialogs, DialogsSource, ListDialogsQuery},
    load_history::{load_history, HistorySource, LoadHistoryQuery},
    mark_read::{mark_read, HistoryReader, MarkReadCommand},
    resolve_dialog::PeerLookup,
    send_message::{send_message, MessageSender, SendMessageCommand},
};

use self::tools::{render, DialogArgs, DialogsArgs, ReadArgs, SendArgs};

const SERVER_NAME: &str = "telegram-mcp";
const SERVER_WORKER_FAILED: &str = "SERVER_WORKER_FAILED";
const INSTRUCTIONS: &str =
    "Telegram dialogs, history, drafts and read marks. Dialog names come from tg_dialogs.";

/// Everything the tools need from upstream.
pub trait TelegramBackend:
    DialogsSource
    + HistorySource
    + PeerLookup
    + MessageSender
    + HistoryReader
    + AccountSource
    + Send
    + Sync
{
}

impl<T> TelegramBackend for T where
    T: DialogsSource
        + HistorySource
        + PeerLookup
        + MessageSender
        + HistoryReader
        + AccountSource
        + Send
        + Sync
{
}

#[derive(Clone)]
pub struct TelegramTools {
    backend: Arc<dyn TelegramBackend>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl TelegramTools {
    pub fn new(backend: Arc<dyn TelegramBackend>) -> Self {
        Self {
            backend,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(name = "tg_me", description = "Get current telegram account info")]
    async fn tg_me(&self) -> Result<CallToolResult, ErrorData> {
        self.run("tg_me", |backend| get_me(&backend)).await
    }

    #[tool(
        name = "tg_dialogs",
        description = "Get list of telegram dialogs (chats, channels, users)"
    )]
    async fn tg_dialogs(
        &self,
        Parameters(args): Parameters<DialogsArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("tg_dialogs", move |backend| {
            list_dialogs(
                &backend,
                ListDialogsQuery {
                    offset: args.offset,
                    only_unread: args.only_unread,
                },
            )
        })
        .await
    }

    #[tool(name = "tg_dialog", description = "Get messages of telegram dialog")]
    async fn tg_dialog(
        &self,
        Parameters(args): Parameters<DialogArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("tg_dialog", move |backend| {
            load_history(
                &backend,
                &backend,
                LoadHistoryQuery {
                    name: args.name,
                    offset_id: args.offset,
                },
            )
        })
        .await
    }

    #[tool(name = "tg_send", description = "Send draft message to dialog")]
    async fn tg_send(
        &self,
        Parameters(args): Parameters<SendArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("tg_send", move |backend| {
            send_message(
                &backend,
                &backend,
                SendMessageCommand {
                    name: args.name,
                    text: args.text,
                    send: args.send,
                },
            )
        })
        .await
    }

    #[tool(name = "tg_read", description = "Mark dialog messages as read")]
    async fn tg_read(
        &self,
        Parameters(args): Parameters<ReadArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        self.run("tg_read", move |backend| {
            mark_read(&backend, &backend, MarkReadCommand { name: args.name })
        })
        .await
    }

    async fn run<T, E, F>(&self, tool: &'static str, work: F) -> Result<CallToolResult, ErrorData>
    where
        F: FnOnce(&dyn TelegramBackend) -> Result<T, E> + Send + 'static,
        T: Serialize + Send + 'static,
        E: std::error::Error + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let outcome = tokio::task::spawn_blocking(move || work(backend.as_ref()))
            .await
            .map_err(|error| {
                tracing::error!(
                    code = SERVER_WORKER_FAILED,
                    tool,
                    error = %error,
                    "tool worker did not finish"
                );
                ErrorData::internal_error(format!("{tool} worker failed: {error}"), None)
            })?;

        render(tool, outcome)
    }
}

#[tool_handler]
impl ServerHandler for TelegramTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_owned()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use super::*;
    use crate::{
        domain::{cursor::DialogsOffset, peer::InputPeer},
        telegram::{
            tl::{DialogsResponse, MessagesResponse, ResolvedPeer, UserClass},
            UpstreamError,
        },
    };

    /// Serves canned replies; every write-side call succeeds.
    #[derive(Default)]
    struct StubBackend {
        drafts: Mutex<Vec<(InputPeer, String)>>,
    }

    impl DialogsSource for StubBackend {
        fn get_dialogs(
            &self,
            _offset: DialogsOffset,
            _limit: i32,
        ) -> Result<DialogsResponse, UpstreamError> {
            Ok(serde_json::from_value(json!({
                "_": "messages.dialogs",
                "dialogs": [{
                    "_": "dialog",
                    "peer": {"_": "peerUser", "user_id": 1},
                    "unread_count": 3
                }],
                "messages": [{
                    "_": "message",
                    "id": 55,
                    "peer_id": {"_": "peerUser", "user_id": 1},
                    "date": 1_700_000_000,
                    "message": "hi"
                }],
                "users": [{"_": "user", "id": 1, "first_name": "Ann"}]
            }))
            .expect("fixture should decode"))
        }
    }

    impl HistorySource for StubBackend {
        fn get_history(
            &self,
            _peer: InputPeer,
            _offset_id: i32,
            _limit: i32,
        ) -> Result<MessagesResponse, UpstreamError> {
            Ok(serde_json::from_value(json!({"_": "messages.messages"}))
                .expect("fixture should decode"))
        }
    }

    impl PeerLookup for StubBackend {
        fn resolve_username(&self, _username: &str) -> Result<ResolvedPeer, UpstreamError> {
            Err(UpstreamError::Rpc {
                code: 400,
                message: "USERNAME_NOT_OCCUPIED".to_owned(),
            })
        }
    }

    impl MessageSender for StubBackend {
        fn send_text(&self, _peer: InputPeer, _text: &str) -> Result<(), UpstreamError> {
            Ok(())
        }

        fn save_draft(&self, peer: InputPeer, text: &str) -> Result<bool, UpstreamError> {
            self.drafts
                .lock()
                .expect("drafts lock")
                .push((peer, text.to_owned()));
            Ok(true)
        }
    }

    impl HistoryReader for StubBackend {
        fn read_history(&self, _peer: InputPeer) -> Result<i32, UpstreamError> {
            Ok(0)
        }

        fn read_channel_history(
            &self,
            _channel_id: i64,
            _access_hash: i64,
        ) -> Result<bool, UpstreamError> {
            Ok(true)
        }
    }

    impl AccountSource for StubBackend {
        fn get_self(&self) -> Result<Vec<UserClass>, UpstreamError> {
            Ok(serde_json::from_value(json!([
                {"_": "user", "id": 11, "first_name": "Ann", "username": "annlee"}
            ]))
            .expect("fixture should decode"))
        }
    }

    fn tools_with(backend: Arc<StubBackend>) -> TelegramTools {
        TelegramTools::new(backend)
    }

    fn as_json(result: &CallToolResult) -> Value {
        serde_json::to_value(result).expect("tool result should serialize")
    }

    fn payload(result: &CallToolResult) -> Value {
        let value = as_json(result);
        assert_ne!(value["isError"], json!(true), "unexpected tool error: {value}");
        let text = value["content"][0]["text"]
            .as_str()
            .expect("tool result carries text");
        serde_json::from_str(text).expect("tool text is JSON")
    }

    #[test]
    fn registers_five_tools_with_object_schemas() {
        let tools = TelegramTools::tool_router().list_all();

        let mut names: Vec<String> = tools.iter().map(|tool| tool.name.to_string()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["tg_dialog", "tg_dialogs", "tg_me", "tg_read", "tg_send"]);
        assert!(tools
            .iter()
            .all(|tool| tool.input_schema.get("type") == Some(&json!("object"))));
    }

    #[test]
    fn server_info_announces_tools() {
        let info = tools_with(Arc::default()).get_info();

        assert_eq!(info.server_info.name, "telegram-mcp");
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn dialogs_tool_returns_compact_json_page() {
        let tools = tools_with(Arc::default());

        let result = tools
            .tg_dialogs(Parameters(DialogsArgs {
                offset: String::new(),
                only_unread: true,
            }))
            .await
            .expect("tool should run");

        let page = payload(&result);
        assert_eq!(page["offset"], json!("user-1-55-1700000000"));
        assert_eq!(page["dialogs"][0]["name"], json!("usr[1]"));
        assert_eq!(page["dialogs"][0]["type"], json!("person"));
    }

    #[tokio::test]
    async fn me_dialog_and_read_tools_answer() {
        let tools = tools_with(Arc::default());

        let me = tools.tg_me().await.expect("tool should run");
        let history = tools
            .tg_dialog(Parameters(DialogArgs {
                name: "cht[9]".to_owned(),
                offset: 0,
            }))
            .await
            .expect("tool should run");
        let channel = tools
            .tg_read(Parameters(ReadArgs {
                name: "chn[5:77]".to_owned(),
            }))
            .await
            .expect("tool should run");
        let user = tools
            .tg_read(Parameters(ReadArgs {
                name: "usr[1]".to_owned(),
            }))
            .await
            .expect("tool should run");

        assert_eq!(payload(&me)["username"], json!("annlee"));
        assert_eq!(payload(&history), json!({"messages": []}));
        assert_eq!(payload(&channel), json!({"result": "done"}));
        assert_eq!(payload(&user), json!({"result": "unread messages not found"}));
    }

    #[tokio::test]
    async fn draft_reaches_the_backend_untouched() {
        let backend = Arc::new(StubBackend::default());
        let tools = tools_with(Arc::clone(&backend));

        let result = tools
            .tg_send(Parameters(SendArgs {
                name: "me".to_owned(),
                text: "  draft ".to_owned(),
                send: false,
            }))
            .await
            .expect("tool should run");

        assert_eq!(payload(&result), json!({"success": true}));
        assert_eq!(
            *backend.drafts.lock().expect("drafts lock"),
            vec![(InputPeer::SelfPeer, "  draft ".to_owned())]
        );
    }

    #[tokio::test]
    async fn workflow_failures_are_tool_errors() {
        let tools = tools_with(Arc::default());

        let blank = tools
            .tg_send(Parameters(SendArgs {
                name: "me".to_owned(),
                text: "  ".to_owned(),
                send: true,
            }))
            .await
            .expect("tool should run");
        let ghost = tools
            .tg_dialog(Parameters(DialogArgs {
                name: "ghost".to_owned(),
                offset: 0,
            }))
            .await
            .expect("tool should run");
        let bogus = tools
            .tg_dialogs(Parameters(DialogsArgs {
                offset: "bogus".to_owned(),
                only_unread: false,
            }))
            .await
            .expect("tool should run");

        for result in [&blank, &ghost, &bogus] {
            assert_eq!(as_json(result)["isError"], json!(true));
        }
        assert_eq!(as_json(&blank)["content"][0]["text"], json!("message text is empty"));
        assert_eq!(
            as_json(&ghost)["content"][0]["text"],
            json!("dialog \"ghost\" not found")
        );
    }
}
