//! Backend collaborator: the three GraphQL operations the login flow uses.

mod graphql;
pub mod types;

use std::future::Future;
use std::pin::Pin;

pub use graphql::GraphqlBackend;

use crate::error::AuthResult;

/// Boxed future returned by backend calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = AuthResult<T>> + Send + 'a>>;

/// Token and user id returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub user_id: String,
    pub token: String,
}

/// Login mutation input.
#[derive(Debug, Clone, Copy)]
pub struct LoginInput<'a> {
    /// Lowercased wallet address
    pub address: &'a str,
    pub signature: &'a str,
    pub invite_code: Option<&'a str>,
}

/// Remote operations consumed by the sequencer.
pub trait Backend: Send + Sync {
    /// Requests a one-time sign-in nonce for a lowercased address.
    fn get_nonce<'a>(&'a self, address: &'a str) -> BackendFuture<'a, String>;

    /// Exchanges an address and signature for a session token.
    fn login<'a>(&'a self, input: LoginInput<'a>) -> BackendFuture<'a, LoginGrant>;

    /// Resolves the display name of a user, authorized by `token`.
    fn get_user_detail<'a>(&'a self, user_id: &'a str, token: &'a str)
    -> BackendFuture<'a, String>;
}
