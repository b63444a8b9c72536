use std::fmt;

/// Conversation partner a dialog or a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerRef {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl PeerRef {
    pub fn id(self) -> i64 {
        match self {
            Self::User(id) | Self::Chat(id) | Self::Channel(id) => id,
        }
    }

    /// Input form used as a pagination offset. Channels lose their access hash here,
    /// the upstream only compares ids for offsets.
    pub fn to_input_peer(self) -> InputPeer {
        match self {
            Self::User(user_id) => InputPeer::User {
                user_id,
                access_hash: 0,
            },
            Self::Chat(chat_id) => InputPeer::Chat { chat_id },
            Self::Channel(channel_id) => InputPeer::Channel {
                channel_id,
                access_hash: 0,
            },
        }
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Chat(id) => write!(f, "chat {id}"),
            Self::Channel(id) => write!(f, "channel {id}"),
        }
    }
}

/// Addressing form handed to upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPeer {
    #[default]
    Empty,
    SelfPeer,
    User {
        user_id: i64,
        access_hash: i64,
    },
    Chat {
        chat_id: i64,
    },
    Channel {
        channel_id: i64,
        access_hash: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_offset_peer_drops_access_hash() {
        assert_eq!(
            PeerRef::Channel(12).to_input_peer(),
            InputPeer::Channel {
                channel_id: 12,
                access_hash: 0
            }
        );
    }

    #[test]
    fn id_is_shared_across_variants() {
        assert_eq!(PeerRef::User(3).id(), 3);
        assert_eq!(PeerRef::Chat(4).id(), 4);
        assert_eq!(PeerRef::Channel(5).id(), 5);
    }
}
