//! Authorization code flow used once to seed the token cache.

use super::token::{AuthError, OAuthApp};
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::Url;

const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";

pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

fn random_state(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn authorization_request(app: &OAuthApp) -> AuthorizationRequest {
    let state = random_state(16);
    let url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        SPOTIFY_AUTHORIZE_URL,
        urlencoding::encode(&app.client_id),
        urlencoding::encode(&app.redirect_uri),
        urlencoding::encode(&app.scope),
        state
    );
    AuthorizationRequest { url, state }
}

/// Pulls the authorization code out of the URL the browser was redirected to.
pub fn extract_code(redirected_url: &str, expected_state: &str) -> Result<String, AuthError> {
    let url = Url::parse(redirected_url.trim())
        .map_err(|e| AuthError::InvalidRedirect(e.to_string()))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(AuthError::Denied(value.into_owned())),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    code.ok_or_else(|| AuthError::InvalidRedirect("no `code` parameter".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> OAuthApp {
        OAuthApp {
            client_id: "my-client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8888/callback".to_string(),
            scope: "user-read-recently-played".to_string(),
        }
    }

    #[test]
    fn authorization_url_carries_encoded_parameters() {
        let request = authorization_request(&app());
        assert_eq!(request.state.len(), 16);
        assert!(request
            .url
            .starts_with("https://accounts.spotify.com/authorize?client_id=my-client"));
        assert!(request
            .url
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A8888%2Fcallback"));
        assert!(request.url.contains("scope=user-read-recently-played"));
        assert!(request.url.ends_with(&format!("state={}", request.state)));
    }

    #[test]
    fn extracts_code_when_state_matches() {
        let code = extract_code(
            "http://localhost:8888/callback?code=AQC123&state=abc",
            "abc",
        )
        .unwrap();
        assert_eq!(code, "AQC123");
    }

    #[test]
    fn rejects_state_mismatch() {
        let result = extract_code("http://localhost:8888/callback?code=AQC&state=zzz", "abc");
        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[test]
    fn reports_denied_authorization() {
        let result = extract_code(
            "http://localhost:8888/callback?error=access_denied&state=abc",
            "abc",
        );
        assert!(matches!(result, Err(AuthError::Denied(reason)) if reason == "access_denied"));
    }

    #[test]
    fn rejects_garbage_url() {
        assert!(matches!(
            extract_code("not a url", "abc"),
            Err(AuthError::InvalidRedirect(_))
        ));
    }
}
