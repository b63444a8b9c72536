use serde::Serialize;
use thiserror::Error;

use crate::telegram::{
    tl::{User, UserClass},
    UpstreamError,
};

/// Identity of the logged-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl From<&User> for AccountInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone().unwrap_or_default(),
            username: user.username.clone().unwrap_or_default(),
        }
    }
}

pub trait AccountSource {
    /// `users.getUsers` for the account itself.
    fn get_self(&self) -> Result<Vec<UserClass>, UpstreamError>;
}

impl<T: AccountSource + ?Sized> AccountSource for &T {
    fn get_self(&self) -> Result<Vec<UserClass>, UpstreamError> {
        (*self).get_self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetMeError {
    #[error("invalid session: {0}")]
    Upstream(UpstreamError),
    #[error("invalid session: account record missing from reply")]
    MissingAccount,
    #[error("call cancelled")]
    Cancelled,
}

pub fn get_me(source: &dyn AccountSource) -> Result<AccountInfo, GetMeError> {
    let users = source.get_self().map_err(map_source_error)?;

    users
        .iter()
        .find_map(|user| match user {
            UserClass::User(user) => Some(AccountInfo::from(user)),
            UserClass::Empty { .. } | UserClass::Unknown => None,
        })
        .ok_or(GetMeError::MissingAccount)
}

fn map_source_error(error: UpstreamError) -> GetMeError {
    match error {
        UpstreamError::Cancelled => GetMeError::Cancelled,
        other => GetMeError::Upstream(other),
    }
}
