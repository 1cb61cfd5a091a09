//! GraphQL request/response types for the three backend operations.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const GET_NONCE_QUERY: &str = r"query GetNonce($address: String!) {
  getNonce(address: $address) {
    data
  }
}";

pub const LOGIN_MUTATION: &str = r"mutation Login($req: LoginReq!) {
  login(req: $req) {
    data {
      userId
      token
    }
  }
}";

pub const GET_USER_DETAIL_QUERY: &str = r"query GetUserDetail($id: String!) {
  getUserDetail(id: $id) {
    data {
      name
    }
  }
}";

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V: Serialize> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Serialize)]
pub struct NonceVariables<'a> {
    pub address: &'a str,
}

#[derive(Debug, Serialize)]
pub struct LoginVariables<'a> {
    pub req: LoginRequest<'a>,
}

/// Input of the `login` mutation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub eth_address: &'a str,
    pub signature: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_code: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UserDetailVariables<'a> {
    pub id: &'a str,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

impl<T> GraphqlResponse<T> {
    /// Returns the first server-provided error message, if any.
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .first()
            .map(|e| e.message.as_str())
            .filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
}

/// `{ data: T }` wrapper used by every operation payload.
#[derive(Debug, Deserialize)]
pub struct Payload<T> {
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceData {
    pub get_nonce: Option<Payload<String>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub login: Option<Payload<LoginResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailData {
    pub get_user_detail: Option<Payload<UserDetail>>,
}

#[derive(Debug, Deserialize)]
pub struct UserDetail {
    #[serde(default)]
    pub name: Option<String>,
}

/// Accepts ids sent either as JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
