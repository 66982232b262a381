use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::account::Attestation;
use crate::error::{Error, Result};
use crate::logging::ExchangeLog;
use crate::presence::StatusRecord;
use crate::settings::Endpoints;

pub const CLIENT_ID: &str = "71b963c1b7b6d119";

const NASDK_USER_AGENT: &str = "OnlineLounge/1.0.4 NASDKAPI iOS";
const ATTESTATION_USER_AGENT: &str = concat!("nxsence/", env!("CARGO_PKG_VERSION"));
const TOKEN_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer-session-token";

/// What the presence login needs from the earlier bootstrap steps
pub struct LoginParameters<'a> {
    pub birthday: &'a str,
    pub id_token: &'a str,
    pub attestation: &'a Attestation,
}

pub struct LoginResult {
    pub web_api_credential: String,
    pub user: StatusRecord,
}

/// Thin wrapper over the account, attestation and presence endpoints.
///
/// Every call is a single request; nothing is retried here.
pub struct NsoClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    product_version: OnceCell<String>,
    exchange: ExchangeLog,
}

impl NsoClient {
    pub fn new(
        endpoints: Endpoints,
        product_version: Option<String>,
        exchange: ExchangeLog,
    ) -> Result<Self> {
        tracing::debug!("Initializing NsoClient");
        let http = reqwest::Client::builder().build()?;

        let cell = OnceCell::new();
        if let Some(version) = product_version {
            // A pinned version means the lookup never runs
            let _ = cell.set(version);
        }

        Ok(Self {
            http,
            endpoints,
            product_version: cell,
            exchange,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Exchanges the session token for a fresh access token and id token
    pub async fn access_id_token(&self, session_token: &str) -> Result<(String, String)> {
        tracing::debug!("Requesting access and id tokens");
        let url = &self.endpoints.token_url;
        let body = json!({
            "client_id": CLIENT_ID,
            "grant_type": TOKEN_GRANT_TYPE,
            "session_token": session_token,
        });

        let request = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US")
            .header("User-Agent", NASDK_USER_AGENT)
            .json(&body);
        let payload = self.send("POST", url, request, Some(&body)).await?;

        let access_token = required_str(&payload, "token", "/access_token")?;
        let id_token = required_str(&payload, "token", "/id_token")?;
        Ok((access_token, id_token))
    }

    pub async fn birthday(&self, access_token: &str) -> Result<String> {
        tracing::debug!("Fetching account profile");
        let url = &self.endpoints.user_info_url;

        let request = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US")
            .header("User-Agent", NASDK_USER_AGENT)
            .bearer_auth(access_token);
        let payload = self.send("GET", url, request, None).await?;

        required_str(&payload, "profile", "/birthday")
    }

    pub async fn attestation(&self, id_token: &str) -> Result<Attestation> {
        tracing::debug!("Requesting attestation value");
        let url = &self.endpoints.attestation_url;
        let body = json!({
            "token": id_token,
            "hash_method": 1,
        });

        let request = self
            .http
            .post(url)
            .header("User-Agent", ATTESTATION_USER_AGENT)
            .json(&body);
        let payload = self.send("POST", url, request, Some(&body)).await?;

        let f = required_str(&payload, "attestation", "/f")?;
        let request_id = required_str(&payload, "attestation", "/request_id")?;
        let timestamp = payload
            .pointer("/timestamp")
            .and_then(Value::as_i64)
            .ok_or_else(|| malformed("attestation", "/timestamp"))?;

        Ok(Attestation {
            f,
            request_id,
            timestamp,
        })
    }

    /// Signs in to the presence service, yielding the web-API credential and
    /// the account's own status record.
    pub async fn presence_login(&self, params: LoginParameters<'_>) -> Result<LoginResult> {
        tracing::debug!("Logging in to the presence service");
        let version = self.product_version().await?;
        let url = &self.endpoints.login_url;
        let body = json!({
            "parameter": {
                "language": "en-US",
                "naBirthday": params.birthday,
                "naCountry": "US",
                "naIdToken": params.id_token,
                "requestId": params.attestation.request_id,
                "timestamp": params.attestation.timestamp,
                "f": params.attestation.f,
            }
        });

        let request = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US")
            .header("User-Agent", format!("com.nintendo.znca/{} (iOS 16.2)", version))
            .header("X-ProductVersion", version.as_str())
            .header("X-Platform", "iOS")
            .header("Authorization", "Bearer")
            .json(&body);
        let payload = self.send("POST", url, request, Some(&body)).await?;

        let web_api_credential =
            required_str(&payload, "login", "/result/webApiServerCredential/accessToken")?;
        let user = payload
            .pointer("/result/user")
            .cloned()
            .and_then(|user| serde_json::from_value::<StatusRecord>(user).ok())
            .ok_or_else(|| malformed("login", "/result/user"))?;

        Ok(LoginResult {
            web_api_credential,
            user,
        })
    }

    pub async fn friends(&self, web_api_credential: &str) -> Result<Vec<StatusRecord>> {
        tracing::debug!("Fetching friends list");
        let url = &self.endpoints.friends_url;

        let request = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US")
            .header("User-Agent", "com.nintendo.znca/2.4.0 (iOS 16.2)")
            .bearer_auth(web_api_credential);
        let body = json!({});
        let request = request.json(&body);
        let payload = self.send("POST", url, request, Some(&body)).await?;

        payload
            .pointer("/result/friends")
            .cloned()
            .and_then(|friends| serde_json::from_value(friends).ok())
            .ok_or_else(|| malformed("friends", "/result/friends"))
    }

    /// Trades a pasted session token code for the long-lived session token
    pub async fn session_token(&self, code: &str, verifier: &str) -> Result<String> {
        tracing::debug!("Exchanging session token code");
        let url = &self.endpoints.session_token_url;
        let form = [
            ("client_id", CLIENT_ID),
            ("session_token_code", code),
            ("session_token_code_verifier", verifier),
        ];

        let request = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("User-Agent", "OnlineLounge/1.0.4 NASDKAPI Android")
            .form(&form);
        let payload = self.send("POST", url, request, None).await?;

        required_str(&payload, "session token", "/session_token")
            .map_err(|_| Error::InvalidRegisterLink)
    }

    /// Current companion app version, looked up once per client
    pub async fn product_version(&self) -> Result<&String> {
        self.product_version
            .get_or_try_init(|| async {
                let url = &self.endpoints.app_lookup_url;
                let request = self.http.get(url);
                let payload = self.send("GET", url, request, None).await?;
                let version = required_str(&payload, "app lookup", "/results/0/version")?;
                tracing::info!("Companion app version: {}", version);
                Ok::<_, Error>(version)
            })
            .await
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
        body: Option<&Value>,
    ) -> Result<Value> {
        self.exchange.request(method, url, body);

        let response = request.send().await.map_err(|e| {
            self.exchange.failure(url, &e);
            if e.is_connect() {
                tracing::error!("Connection to {} failed", url);
                Error::NetworkUnreachable {
                    url: url.to_string(),
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        let payload: Value = response.json().await?;
        self.exchange.response(url, status.as_u16(), &payload);

        Ok(payload)
    }
}

fn malformed(endpoint: &'static str, pointer: &str) -> Error {
    tracing::error!(
        "Invalid response received from {} endpoint: `{}` is missing",
        endpoint,
        pointer
    );
    Error::MalformedResponse {
        endpoint,
        key: pointer.to_string(),
    }
}

fn required_str(payload: &Value, endpoint: &'static str, pointer: &str) -> Result<String> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(endpoint, pointer))
}
