use std::collections::HashMap;

use crate::{
    domain::peer::PeerRef,
    telegram::tl::{Channel, Chat, ChatClass, Message, MessageClass, User, UserClass},
};

/// Per-response lookup tables over the side-loaded entities of one upstream
/// reply. Built fresh for every call and dropped once the reply is normalized.
#[derive(Debug, Default)]
pub struct EntityIndex<'a> {
    users: HashMap<i64, &'a User>,
    chats: HashMap<i64, &'a Chat>,
    channels: HashMap<i64, &'a Channel>,
    previews: HashMap<PeerRef, &'a Message>,
}

impl<'a> EntityIndex<'a> {
    /// Never fails: malformed or unusable records are skipped.
    pub fn build(
        users: &'a [UserClass],
        chats: &'a [ChatClass],
        messages: &'a [MessageClass],
    ) -> Self {
        let mut index = Self::default();

        for user in users {
            match user {
                UserClass::User(user) => {
                    index.users.insert(user.id, user);
                }
                other => tracing::debug!(user = ?other, "skipping non-user record in users list"),
            }
        }

        for chat in chats {
            match chat {
                ChatClass::Chat(chat) => {
                    index.chats.insert(chat.id, chat);
                }
                ChatClass::Channel(channel) => {
                    index.channels.insert(channel.id, channel);
                }
                ChatClass::Forbidden { .. }
                | ChatClass::Empty { .. }
                | ChatClass::ChannelForbidden { .. }
                | ChatClass::Unknown => {}
            }
        }

        for message in messages.iter().filter_map(MessageClass::as_message) {
            let Some(peer) = message.peer_id.to_ref().filter(|peer| peer.id() != 0) else {
                continue;
            };
            index
                .previews
                .entry(peer)
                .and_modify(|current| {
                    if message.date >= current.date {
                        *current = message;
                    }
                })
                .or_insert(message);
        }

        index
    }

    /// Users-only index, for replies whose chats carry no useful data.
    pub fn users_only(users: &'a [UserClass]) -> Self {
        Self::build(users, &[], &[])
    }

    pub fn user(&self, id: i64) -> Option<&'a User> {
        self.users.get(&id).copied()
    }

    pub fn chat(&self, id: i64) -> Option<&'a Chat> {
        self.chats.get(&id).copied()
    }

    pub fn channel(&self, id: i64) -> Option<&'a Channel> {
        self.channels.get(&id).copied()
    }

    /// Most recent real message addressed to `peer` in this reply.
    pub fn preview(&self, peer: PeerRef) -> Option<&'a Message> {
        self.previews.get(&peer).copied()
    }
}
