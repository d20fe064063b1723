use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use diary_core::{Credential, StoreCredentials, VerificationMode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::app_state::AppState;

use super::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/verify", post(verify).fallback(method_not_allowed))
}

/// Accepts either request shape; the configured mode decides which is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    password: Option<String>,
    hashed_password: Option<String>,
    salt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    success: bool,
    #[serde(flatten)]
    store: Option<StoreCredentials>,
}

impl VerifyRequest {
    fn into_credential(self, mode: VerificationMode) -> Result<Credential, ApiError> {
        match mode {
            VerificationMode::Direct => match present(self.password) {
                Some(password) => Ok(Credential::Plain { password }),
                None => Err(ApiError::bad_request("password is required")),
            },
            VerificationMode::Challenge => {
                match (present(self.hashed_password), present(self.salt)) {
                    (Some(hash), Some(salt)) => Ok(Credential::Hashed { hash, salt }),
                    _ => Err(ApiError::bad_request(
                        "hashedPassword and salt are required",
                    )),
                }
            }
        }
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[instrument(name = "verify", skip_all, fields(mode = %state.mode()))]
async fn verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let credential = request.into_credential(state.mode())?;
    let (verifier, store) = state.configured()?;

    let matched = verifier
        .check(&credential)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if matched {
        info!("password accepted");
        Ok(Json(VerifyResponse {
            success: true,
            store: Some(store.clone()),
        }))
    } else {
        warn!("password rejected");
        Ok(Json(VerifyResponse {
            success: false,
            store: None,
        }))
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
