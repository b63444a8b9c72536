//! Raw platform objects as delivered by the upstream, tagged by TL constructor
//! name under `"_"`. Constructors the core does not know deserialize into an
//! explicit `Unknown` variant instead of failing the whole response. Entity
//! lists decode record by record: a malformed record is logged and dropped.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::peer::PeerRef;

const TL_RECORD_DROPPED: &str = "TL_RECORD_DROPPED";

/// Decodes each record on its own, keeping the ones that are well formed.
pub fn decode_records<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                tracing::warn!(
                    code = TL_RECORD_DROPPED,
                    record_type = std::any::type_name::<T>(),
                    error = %error,
                    "dropping malformed record"
                );
                None
            }
        })
        .collect()
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let records = Vec::<Value>::deserialize(deserializer)?;
    Ok(decode_records(records))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum Peer {
    #[serde(rename = "peerUser")]
    User { user_id: i64 },
    #[serde(rename = "peerChat")]
    Chat { chat_id: i64 },
    #[serde(rename = "peerChannel")]
    Channel { channel_id: i64 },
    #[serde(other)]
    Unknown,
}

impl Peer {
    pub fn to_ref(self) -> Option<PeerRef> {
        match self {
            Self::User { user_id } => Some(PeerRef::User(user_id)),
            Self::Chat { chat_id } => Some(PeerRef::Chat(chat_id)),
            Self::Channel { channel_id } => Some(PeerRef::Channel(channel_id)),
            Self::Unknown => None,
        }
    }
}

impl From<PeerRef> for Peer {
    fn from(peer: PeerRef) -> Self {
        match peer {
            PeerRef::User(user_id) => Self::User { user_id },
            PeerRef::Chat(chat_id) => Self::Chat { chat_id },
            PeerRef::Channel(channel_id) => Self::Channel { channel_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum UserClass {
    #[serde(rename = "user")]
    User(User),
    #[serde(rename = "userEmpty")]
    Empty { id: i64 },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub access_hash: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum ChatClass {
    #[serde(rename = "chat")]
    Chat(Chat),
    #[serde(rename = "chatForbidden")]
    Forbidden {
        id: i64,
        #[serde(default)]
        title: String,
    },
    #[serde(rename = "chatEmpty")]
    Empty { id: i64 },
    #[serde(rename = "channel")]
    Channel(Channel),
    #[serde(rename = "channelForbidden")]
    ChannelForbidden {
        id: i64,
        #[serde(default)]
        title: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Channel {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub access_hash: i64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub megagroup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum MessageClass {
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "messageService")]
    Service {
        id: i32,
        #[serde(default)]
        peer_id: Option<Peer>,
    },
    #[serde(rename = "messageEmpty")]
    Empty {
        #[serde(default)]
        id: i32,
    },
    #[serde(other)]
    Unknown,
}

impl MessageClass {
    /// Real (non-service, non-empty) message, if this is one.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(message) => Some(message),
            Self::Service { .. } | Self::Empty { .. } | Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub id: i32,
    pub peer_id: Peer,
    #[serde(default)]
    pub from_id: Option<Peer>,
    pub date: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum DialogClass {
    #[serde(rename = "dialog")]
    Dialog(Dialog),
    #[serde(rename = "dialogFolder")]
    Folder,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Dialog {
    #[serde(default)]
    pub peer: Option<Peer>,
    #[serde(default)]
    pub top_message: i32,
    #[serde(default)]
    pub unread_count: i32,
    #[serde(default)]
    pub pinned: bool,
}

impl Dialog {
    pub fn peer_ref(&self) -> Option<PeerRef> {
        self.peer.and_then(Peer::to_ref)
    }
}

/// Result of `messages.getDialogs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum DialogsResponse {
    #[serde(rename = "messages.dialogs")]
    Dialogs(DialogsPayload),
    #[serde(rename = "messages.dialogsSlice")]
    Slice(DialogsSlice),
    #[serde(rename = "messages.dialogsNotModified")]
    NotModified {
        #[serde(default)]
        count: i32,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DialogsPayload {
    #[serde(default, deserialize_with = "lenient_list")]
    pub dialogs: Vec<DialogClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub messages: Vec<MessageClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub chats: Vec<ChatClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<UserClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DialogsSlice {
    #[serde(default)]
    pub count: i32,
    #[serde(default, deserialize_with = "lenient_list")]
    pub dialogs: Vec<DialogClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub messages: Vec<MessageClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub chats: Vec<ChatClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<UserClass>,
}

/// Result of `messages.getHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "_")]
pub enum MessagesResponse {
    #[serde(rename = "messages.messages")]
    Messages(MessagesPayload),
    #[serde(rename = "messages.messagesSlice")]
    Slice(MessagesPayload),
    #[serde(rename = "messages.channelMessages")]
    ChannelMessages(MessagesPayload),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct MessagesPayload {
    #[serde(default)]
    pub count: Option<i32>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub messages: Vec<MessageClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub chats: Vec<ChatClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<UserClass>,
}

/// Result of `contacts.resolveUsername`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolvedPeer {
    pub peer: Peer,
    #[serde(default, deserialize_with = "lenient_list")]
    pub chats: Vec<ChatClass>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub users: Vec<UserClass>,
}

/// Result of `messages.readHistory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct AffectedMessages {
    #[serde(default)]
    pub pts: i32,
    #[serde(default)]
    pub pts_count: i32,
}
