//! `reqwest` implementation of [`Backend`] against the GraphQL endpoint.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    GET_NONCE_QUERY, GET_USER_DETAIL_QUERY, GraphqlRequest, GraphqlResponse, LOGIN_MUTATION,
    LoginData, LoginRequest, LoginVariables, NonceData, NonceVariables, UserDetailData,
    UserDetailVariables,
};
use super::{Backend, BackendFuture, LoginGrant, LoginInput};
use crate::config::BackendConfig;
use crate::error::{AuthError, AuthResult};

/// Standard User-Agent header for apixlab API requests.
pub const USER_AGENT: &str = concat!("apixlab/", env!("CARGO_PKG_VERSION"));

const NONCE_FAILED: &str = "Failed to fetch nonce.";
const LOGIN_FAILED: &str = "Login failed.";
const PROFILE_FAILED: &str = "Failed to load profile.";

/// GraphQL backend client.
#[derive(Debug, Clone)]
pub struct GraphqlBackend {
    endpoint: String,
    http: reqwest::Client,
}

impl GraphqlBackend {
    /// Creates a client for `endpoint` with the configured request timeout.
    ///
    /// # Errors
    /// Returns an error if the endpoint is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &BackendConfig) -> anyhow::Result<Self> {
        let endpoint = config.resolve_endpoint()?;
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self::with_client(endpoint, http))
    }

    pub fn with_client(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
        }
    }

    /// Posts a GraphQL operation and decodes the envelope.
    ///
    /// Non-2xx statuses fail regardless of the body.
    async fn post<V, T>(
        &self,
        operation: &str,
        query: &str,
        variables: V,
        bearer: Option<&str>,
    ) -> AuthResult<GraphqlResponse<T>>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = GraphqlRequest { query, variables };
        let mut request = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!(operation, endpoint = %self.endpoint, "sending graphql request");
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::from_reqwest(operation, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "graphql request failed");
            return Err(AuthError::http_status(operation, status.as_u16(), &body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AuthError::from_reqwest(operation, &e))?;
        serde_json::from_str(&text).map_err(|e| {
            AuthError::protocol(format!("{operation} returned malformed JSON"))
                .with_details(e.to_string())
        })
    }
}

impl Backend for GraphqlBackend {
    fn get_nonce<'a>(&'a self, address: &'a str) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let resp: GraphqlResponse<NonceData> = self
                .post(
                    "Nonce request",
                    GET_NONCE_QUERY,
                    NonceVariables { address },
                    None,
                )
                .await?;

            let nonce = resp
                .data
                .as_ref()
                .and_then(|d| d.get_nonce.as_ref())
                .and_then(|p| p.data.clone())
                .filter(|n| !n.is_empty());

            nonce.ok_or_else(|| AuthError::protocol(resp.first_error().unwrap_or(NONCE_FAILED)))
        })
    }

    fn login<'a>(&'a self, input: LoginInput<'a>) -> BackendFuture<'a, LoginGrant> {
        Box::pin(async move {
            let variables = LoginVariables {
                req: LoginRequest {
                    eth_address: input.address,
                    signature: input.signature,
                    invited_code: input.invite_code,
                },
            };
            let resp: GraphqlResponse<LoginData> = self
                .post("Login request", LOGIN_MUTATION, variables, None)
                .await?;

            let result = resp
                .data
                .as_ref()
                .and_then(|d| d.login.as_ref())
                .and_then(|p| p.data.as_ref());

            match result {
                Some(r) => match (r.user_id.as_deref(), r.token.as_deref()) {
                    (Some(user_id), Some(token)) if !user_id.is_empty() && !token.is_empty() => {
                        Ok(LoginGrant {
                            user_id: user_id.to_string(),
                            token: token.to_string(),
                        })
                    }
                    _ => Err(AuthError::auth(resp.first_error().unwrap_or(LOGIN_FAILED))),
                },
                None => Err(AuthError::auth(resp.first_error().unwrap_or(LOGIN_FAILED))),
            }
        })
    }

    fn get_user_detail<'a>(
        &'a self,
        user_id: &'a str,
        token: &'a str,
    ) -> BackendFuture<'a, String> {
        Box::pin(async move {
            let resp: GraphqlResponse<UserDetailData> = self
                .post(
                    "Profile request",
                    GET_USER_DETAIL_QUERY,
                    UserDetailVariables { id: user_id },
                    Some(token),
                )
                .await?;

            let name = resp
                .data
                .as_ref()
                .and_then(|d| d.get_user_detail.as_ref())
                .and_then(|p| p.data.as_ref())
                .and_then(|u| u.name.clone())
                .filter(|n| !n.trim().is_empty());

            name.ok_or_else(|| AuthError::auth(resp.first_error().unwrap_or(PROFILE_FAILED)))
        })
    }
}
