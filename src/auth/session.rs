use super::account::Account;
use super::client::{LoginParameters, NsoClient};
use crate::error::Result;
use crate::presence::StatusRecord;
use crate::settings::Settings;

/// How long (in seconds) each credential layer is trusted before renewal.
///
/// The token window sits below the upstream token lifetime so renewal
/// happens ahead of expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshWindows {
    pub tokens: i64,
    pub web_api: i64,
}

impl Default for RefreshWindows {
    fn default() -> Self {
        Self {
            tokens: 800,
            web_api: 5400,
        }
    }
}

impl RefreshWindows {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tokens: settings.token_refresh_secs,
            web_api: settings.web_api_refresh_secs,
        }
    }
}

/// Keeps an [`Account`]'s layered credentials usable.
///
/// Failures are handed straight back to the caller; nothing is retried.
pub struct NsoSession {
    client: NsoClient,
    account: Account,
    windows: RefreshWindows,
}

impl NsoSession {
    pub fn new(client: NsoClient, account: Account, windows: RefreshWindows) -> Self {
        Self {
            client,
            account,
            windows,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn into_account(self) -> Account {
        self.account
    }

    pub fn web_api_credential(&self) -> &str {
        &self.account.web_api_credential
    }

    /// Full sign-in: tokens, birthday, attestation, then presence login.
    /// Both refresh windows restart at `now`.
    pub async fn login(&mut self, now: i64) -> Result<()> {
        tracing::info!("Logging in");

        let (access_token, id_token) = self
            .client
            .access_id_token(&self.account.session_token)
            .await?;
        self.account.access_token = access_token;
        self.account.id_token = id_token;

        self.account.birthday = self.client.birthday(&self.account.access_token).await?;
        self.account.attestation = self.client.attestation(&self.account.id_token).await?;
        self.account.token_refreshed_at = now;

        self.presence_login(now).await?;
        self.account.web_api_refreshed_at = now;

        tracing::info!("Logged in as {}", self.account.name);
        Ok(())
    }

    /// Renews whichever credential layers have outlived their window
    pub async fn refresh_if_due(&mut self, now: i64) -> Result<()> {
        if self.account.tokens_due(now, self.windows.tokens) {
            self.renew_tokens(now).await?;
        }
        if self.account.web_api_credential_due(now, self.windows.web_api) {
            self.renew_web_api_credential(now).await?;
        }
        Ok(())
    }

    pub async fn friends(&mut self, now: i64) -> Result<Vec<StatusRecord>> {
        if self.account.web_api_credential_due(now, self.windows.web_api) {
            self.renew_web_api_credential(now).await?;
        }
        self.client.friends(&self.account.web_api_credential).await
    }

    /// The account's own status, re-read from a fresh presence login
    pub async fn own_status(&mut self, now: i64) -> Result<StatusRecord> {
        self.presence_login(now).await
    }

    async fn renew_tokens(&mut self, now: i64) -> Result<()> {
        tracing::info!("Refreshing access token and attestation");
        let (access_token, id_token) = self
            .client
            .access_id_token(&self.account.session_token)
            .await?;
        self.account.access_token = access_token;
        self.account.id_token = id_token;
        self.account.attestation = self.client.attestation(&self.account.id_token).await?;
        self.account.token_refreshed_at = now;
        Ok(())
    }

    async fn renew_web_api_credential(&mut self, now: i64) -> Result<()> {
        tracing::info!("Refreshing web API credential");
        self.presence_login(now).await?;
        self.account.web_api_refreshed_at = now;
        Ok(())
    }

    async fn presence_login(&mut self, now: i64) -> Result<StatusRecord> {
        if self.account.tokens_due(now, self.windows.tokens) {
            self.renew_tokens(now).await?;
        }

        let result = self
            .client
            .presence_login(LoginParameters {
                birthday: &self.account.birthday,
                id_token: &self.account.id_token,
                attestation: &self.account.attestation,
            })
            .await?;

        self.account.web_api_credential = result.web_api_credential;
        self.account.name = result.user.name.clone();
        self.account.image_uri = result.user.image_uri.clone();
        self.account.status = Some(result.user.clone());

        Ok(result.user)
    }
}
