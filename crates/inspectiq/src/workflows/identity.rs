use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_CATEGORY_HEADER: &str = "x-actor-category";

/// Caller identity issued by the upstream session provider and trusted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            category: None,
        }
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(id) = header(parts, ACTOR_ID_HEADER) else {
            let payload = json!({ "error": format!("missing {ACTOR_ID_HEADER} header") });
            return Err((StatusCode::UNAUTHORIZED, Json(payload)).into_response());
        };

        Ok(Actor {
            name: header(parts, ACTOR_NAME_HEADER).unwrap_or_else(|| id.clone()),
            role: header(parts, ACTOR_ROLE_HEADER).unwrap_or_default(),
            category: header(parts, ACTOR_CATEGORY_HEADER),
            id,
        })
    }
}
