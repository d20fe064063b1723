use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    credential::Credential,
    domain::{GateError, StoreCredentials},
    ports::{Verdict, VerificationBackend},
};

/// Talks to the `/api/verify` endpoint of the verification service.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    success: bool,
    supabase_url: Option<String>,
    supabase_key: Option<String>,
    message: Option<String>,
}

impl HttpVerifier {
    /// `api_url` is the service root; the verify path is appended.
    pub fn new(api_url: &Url) -> Result<Self, GateError> {
        let base = format!("{}/", api_url.as_str().trim_end_matches('/'));
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("api/verify"))
            .map_err(|e| GateError::Transport(format!("invalid API URL {api_url}: {e}")))?;

        let client = Client::builder()
            .build()
            .map_err(|e| GateError::Transport(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl VerificationBackend for HttpVerifier {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, mode = %credential.mode()))]
    async fn verify(&self, credential: &Credential) -> Result<Verdict, GateError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(credential)
            .send()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GateError::Transport(e.to_string()))?;
        debug!(%status, "verification service answered");

        interpret(status, &body)
    }
}

fn interpret(status: StatusCode, body: &str) -> Result<Verdict, GateError> {
    let parsed = serde_json::from_str::<VerifyResponse>(body);

    match status {
        StatusCode::INTERNAL_SERVER_ERROR => Err(GateError::Misconfigured),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(Verdict::rejected()),
        s if s.is_success() => {
            let response = parsed.map_err(|e| GateError::Server {
                status: s.as_u16(),
                message: format!("unexpected response: {e}"),
            })?;
            if !response.success {
                return Ok(Verdict::rejected());
            }
            let store = match (response.supabase_url, response.supabase_key) {
                (Some(url), Some(key)) => Some(StoreCredentials::new(url, key)),
                _ => None,
            };
            Ok(Verdict {
                success: true,
                store,
            })
        }
        s => {
            let message = parsed
                .ok()
                .and_then(|r| r.message)
                .or_else(|| s.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "request failed".to_string());
            Err(GateError::Server {
                status: s.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_verify_path() {
        let api = Url::parse("https://diary.example.com/").unwrap();
        let verifier = HttpVerifier::new(&api).unwrap();
        assert_eq!(
            verifier.endpoint().as_str(),
            "https://diary.example.com/api/verify"
        );
    }

    #[test]
    fn success_carries_store_credentials() {
        let verdict = interpret(
            StatusCode::OK,
            r#"{"success":true,"supabaseUrl":"https://abc.supabase.co","supabaseKey":"anon"}"#,
        )
        .unwrap();

        assert!(verdict.success);
        assert_eq!(
            verdict.store,
            Some(StoreCredentials::new("https://abc.supabase.co", "anon"))
        );
    }

    #[test]
    fn mismatch_is_a_rejection_not_an_error() {
        assert_eq!(
            interpret(StatusCode::OK, r#"{"success":false}"#),
            Ok(Verdict::rejected())
        );
        assert_eq!(
            interpret(StatusCode::UNAUTHORIZED, ""),
            Ok(Verdict::rejected())
        );
    }

    #[test]
    fn server_failures_map_to_gate_errors() {
        assert_eq!(
            interpret(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"success":false,"message":"server misconfigured"}"#
            ),
            Err(GateError::Misconfigured)
        );
        assert_eq!(
            interpret(
                StatusCode::BAD_REQUEST,
                r#"{"success":false,"message":"hashedPassword and salt are required"}"#
            ),
            Err(GateError::Server {
                status: 400,
                message: "hashedPassword and salt are required".to_string(),
            })
        );
        assert_eq!(
            interpret(StatusCode::BAD_GATEWAY, "<html>"),
            Err(GateError::Server {
                status: 502,
                message: "Bad Gateway".to_string(),
            })
        );
    }

    #[test]
    fn garbage_success_body_is_a_server_error() {
        assert!(matches!(
            interpret(StatusCode::OK, "not json"),
            Err(GateError::Server { status: 200, .. })
        ));
    }
}
