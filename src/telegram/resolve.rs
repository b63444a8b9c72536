//! Peer ⇄ display name mapping.
//!
//! Resolution turns a peer reference into a human title plus a handle the
//! caller can pass back; parsing turns such a handle back into an input peer.

use thiserror::Error;

use crate::{
    domain::peer::{InputPeer, PeerRef},
    telegram::{
        entities::EntityIndex,
        tl::{Channel, Chat, Peer, User},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub title: String,
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{0} is missing from the response entities")]
    NotFound(PeerRef),
    #[error("unsupported peer reference")]
    InvalidPeer,
}

/// Naming rules shared by every entity kind a peer can point at.
pub trait DisplayEntity {
    fn title(&self) -> String;
    fn handle(&self) -> String;
}

impl DisplayEntity for User {
    fn title(&self) -> String {
        match self.last_name.as_deref().filter(|last| !last.is_empty()) {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }

    fn handle(&self) -> String {
        non_empty(self.username.as_deref()).unwrap_or_else(|| format!("usr[{}]", self.id))
    }
}

impl DisplayEntity for Chat {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn handle(&self) -> String {
        format!("cht[{}]", self.id)
    }
}

impl DisplayEntity for Channel {
    fn title(&self) -> String {
        self.title.clone()
    }

    // Channels are unreachable by id alone, so the synthetic handle keeps the hash.
    fn handle(&self) -> String {
        non_empty(self.username.as_deref())
            .unwrap_or_else(|| format!("chn[{}:{}]", self.id, self.access_hash))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn describe(entity: &dyn DisplayEntity) -> Resolved {
    Resolved {
        title: entity.title(),
        handle: entity.handle(),
    }
}

pub fn resolve(peer: Peer, index: &EntityIndex<'_>) -> Result<Resolved, ResolveError> {
    let peer = peer.to_ref().ok_or(ResolveError::InvalidPeer)?;
    let not_found = || ResolveError::NotFound(peer);

    match peer {
        PeerRef::User(id) => index.user(id).map(|u| describe(u)).ok_or_else(not_found),
        PeerRef::Chat(id) => index.chat(id).map(|c| describe(c)).ok_or_else(not_found),
        PeerRef::Channel(id) => index.channel(id).map(|c| describe(c)).ok_or_else(not_found),
    }
}

/// A dialog name as typed by a tool caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogName {
    /// Synthetic handle or self reference, addressable without an upstream lookup.
    Direct(InputPeer),
    /// Public username, without the leading `@`.
    Username(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid dialog name {0:?}")]
pub struct InvalidDialogName(pub String);

pub fn parse_dialog_name(name: &str) -> Result<DialogName, InvalidDialogName> {
    let name = name.trim();
    let invalid = || InvalidDialogName(name.to_owned());

    if name.eq_ignore_ascii_case("me") || name.eq_ignore_ascii_case("self") {
        return Ok(DialogName::Direct(InputPeer::SelfPeer));
    }

    if let Some(inner) = bracketed(name, "usr") {
        let user_id = inner.parse().map_err(|_| invalid())?;
        return Ok(DialogName::Direct(InputPeer::User {
            user_id,
            access_hash: 0,
        }));
    }

    if let Some(inner) = bracketed(name, "cht") {
        let chat_id = inner.parse().map_err(|_| invalid())?;
        return Ok(DialogName::Direct(InputPeer::Chat { chat_id }));
    }

    if let Some(inner) = bracketed(name, "chn") {
        let (id, hash) = inner.split_once(':').ok_or_else(invalid)?;
        return Ok(DialogName::Direct(InputPeer::Channel {
            channel_id: id.parse().map_err(|_| invalid())?,
            access_hash: hash.parse().map_err(|_| invalid())?,
        }));
    }

    let username = name.strip_prefix('@').unwrap_or(name);
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(DialogName::Username(username.to_owned()))
}

fn bracketed<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::tl::{ChatClass, UserClass};

    fn index_fixture() -> (Vec<UserClass>, Vec<ChatClass>) {
        let users = vec![
            UserClass::User(User {
                id: 1,
                first_name: "Ann".to_owned(),
                last_name: Some("Lee".to_owned()),
                username: Some("annlee".to_owned()),
                ..User::default()
            }),
            UserClass::User(User {
                id: 2,
                first_name: "Bob".to_owned(),
                last_name: Some(String::new()),
                ..User::default()
            }),
        ];
        let chats = vec![
            ChatClass::Chat(Chat {
                id: 3,
                title: "Team".to_owned(),
            }),
            ChatClass::Channel(Channel {
                id: 4,
                title: "News".to_owned(),
                access_hash: -77,
                ..Channel::default()
            }),
            ChatClass::Channel(Channel {
                id: 5,
                title: "Public".to_owned(),
                access_hash: 1,
                username: Some("public".to_owned()),
                ..Channel::default()
            }),
        ];
        (users, chats)
    }

    #[test]
    fn resolves_every_entity_kind() {
        let (users, chats) = index_fixture();
        let index = EntityIndex::build(&users, &chats, &[]);

        let cases = [
            (Peer::User { user_id: 1 }, "Ann Lee", "annlee"),
            (Peer::User { user_id: 2 }, "Bob", "usr[2]"),
            (Peer::Chat { chat_id: 3 }, "Team", "cht[3]"),
            (Peer::Channel { channel_id: 4 }, "News", "chn[4:-77]"),
            (Peer::Channel { channel_id: 5 }, "Public", "public"),
        ];

        for (peer, title, handle) in cases {
            let resolved = resolve(peer, &index).expect("peer should resolve");
            assert_eq!(resolved.title, title);
            assert_eq!(resolved.handle, handle);
        }
    }

    #[test]
    fn missing_entity_is_not_found() {
        let index = EntityIndex::default();

        assert_eq!(
            resolve(Peer::Chat { chat_id: 8 }, &index),
            Err(ResolveError::NotFound(PeerRef::Chat(8)))
        );
    }

    #[test]
    fn unknown_peer_is_invalid() {
        let index = EntityIndex::default();

        assert_eq!(
            resolve(Peer::Unknown, &index),
            Err(ResolveError::InvalidPeer)
        );
    }

    #[test]
    fn parses_synthetic_handles() {
        assert_eq!(
            parse_dialog_name("usr[7]"),
            Ok(DialogName::Direct(InputPeer::User {
                user_id: 7,
                access_hash: 0
            }))
        );
        assert_eq!(
            parse_dialog_name("cht[4626931529]"),
            Ok(DialogName::Direct(InputPeer::Chat {
                chat_id: 4_626_931_529
            }))
        );
        assert_eq!(
            parse_dialog_name("chn[5:-77]"),
            Ok(DialogName::Direct(InputPeer::Channel {
                channel_id: 5,
                access_hash: -77
            }))
        );
        assert_eq!(
            parse_dialog_name("Me"),
            Ok(DialogName::Direct(InputPeer::SelfPeer))
        );
    }

    #[test]
    fn parses_usernames_with_or_without_at_sign() {
        assert_eq!(
            parse_dialog_name("@annlee"),
            Ok(DialogName::Username("annlee".to_owned()))
        );
        assert_eq!(
            parse_dialog_name("annlee"),
            Ok(DialogName::Username("annlee".to_owned()))
        );
    }

    #[test]
    fn rejects_malformed_handles() {
        for name in ["chn[5]", "cht[x]", "usr[]", "", "@", "two words", "chn[a:1]"] {
            assert!(parse_dialog_name(name).is_err(), "{name:?} must be rejected");
        }
    }
}
