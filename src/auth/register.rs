use oauth2::{CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use url::Url;

use super::client::{NsoClient, CLIENT_ID};
use crate::error::{Error, Result};
use crate::settings::Endpoints;

const SCOPES: &str = "openid user user.birthday user.mii user.screenName";

pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
    pub pkce_verifier: PkceCodeVerifier,
}

pub fn redirect_uri() -> String {
    format!("npf{}://auth", CLIENT_ID)
}

/// Builds the account-selection page URL with a fresh S256 challenge
pub fn create_authorization_request(endpoints: &Endpoints) -> Result<AuthorizationRequest> {
    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let state = CsrfToken::new_random();

    let auth_url = Url::parse_with_params(
        &endpoints.authorize_url,
        &[
            ("client_id", CLIENT_ID),
            ("redirect_uri", redirect_uri().as_str()),
            ("response_type", "session_token_code"),
            ("scope", SCOPES),
            ("session_token_code_challenge", pkce_challenge.as_str()),
            ("session_token_code_challenge_method", "S256"),
            ("state", state.secret().as_str()),
            ("theme", "login_form"),
        ],
    )?;

    Ok(AuthorizationRequest {
        auth_url: auth_url.to_string(),
        state: state.secret().clone(),
        pkce_verifier,
    })
}

fn link_param(link: &str, key: &str) -> Result<String> {
    let url = Url::parse(link.trim()).map_err(|_| Error::InvalidRegisterLink)?;

    let pairs = url.fragment().into_iter().chain(url.query());
    pairs
        .flat_map(|part| url::form_urlencoded::parse(part.as_bytes()))
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or(Error::InvalidRegisterLink)
}

/// Pulls `session_token_code` out of the pasted "Select this account" link
pub fn session_token_code(link: &str) -> Result<String> {
    link_param(link, "session_token_code")
}

/// Exchanges the pasted link for the account's session token.
///
/// The link must echo the `state` of this request.
pub async fn exchange_link(
    client: &NsoClient,
    link: &str,
    request: &AuthorizationRequest,
) -> Result<String> {
    let code = session_token_code(link)?;
    let state = link_param(link, "state")?;
    if state != request.state {
        tracing::warn!("Pasted link was issued for a different registration");
        return Err(Error::InvalidRegisterLink);
    }

    client
        .session_token(&code, request.pkce_verifier.secret())
        .await
}
