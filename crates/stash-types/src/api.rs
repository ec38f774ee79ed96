use serde::{Deserialize, Serialize};

use crate::models::{LinkId, UserId};

// -- JWT Claims --

/// Token payload shared by the API middleware and anything else that needs
/// to read an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

/// Missing fields deserialize as empty strings so handlers can answer 400
/// with a message instead of a body rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
}

// -- Links --

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub ordered_link_ids: Vec<LinkId>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LinkQuery {
    pub tag: Option<String>,
}

// -- Generic bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
