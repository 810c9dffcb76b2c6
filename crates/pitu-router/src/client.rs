// Router web API client
//
// Wraps `reqwest::Client` with the router's session mechanics: a session
// cookie opened by `/sess_cd_tmp`, a per-session token published inside the
// status model, and HTML form posts whose outcome is encoded in the page
// they redirect to.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{Autoconnect, RouterStatus};
use crate::transport::TransportConfig;

const SESSION_PATH: &str = "/sess_cd_tmp";
const MODEL_PATH: &str = "/api/model.json";
const CONFIG_FORM_PATH: &str = "/Forms/config";

const LOGIN_OK: &str = "/index.html";
const LOGIN_FAILED: &str = "/index.html?loginfailed";
const FORM_OK: &str = "/success.json";
const FORM_FAILED: &str = "/error.json";

/// HTTP client for one router.
pub struct RouterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RouterClient {
    /// Create a client for the router at `base_url` (e.g. `http://192.168.1.1`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Check the router answers its session endpoint.
    pub async fn probe(&self) -> Result<(), Error> {
        let url = self.url(SESSION_PATH)?;
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Unreachable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::Unreachable {
                url: url.to_string(),
                reason: format!("unexpected HTTP {status}"),
            });
        }
        Ok(())
    }

    /// Log in with the router's admin password.
    ///
    /// Opens a session, reads the session token from the status model, and
    /// posts the login form. The router redirects to `/index.html` on
    /// success and to `/index.html?loginfailed` otherwise.
    pub async fn login(&self, password: &SecretString) -> Result<(), Error> {
        self.probe().await?;

        let status = self.status().await?;
        let token = status.session_token().ok_or(Error::MissingToken)?.to_owned();

        let form = [
            ("token", token.as_str()),
            ("err_redirect", LOGIN_FAILED),
            ("ok_redirect", LOGIN_OK),
            ("session.password", password.expose_secret()),
        ];

        let landed = self.post_form(&form).await?;
        if landed.path() == LOGIN_OK && landed.query().is_none() {
            debug!("router login successful");
            Ok(())
        } else {
            Err(Error::Authentication {
                message: format!("login redirected to {landed}; wrong password?"),
            })
        }
    }

    // ── Status ───────────────────────────────────────────────────────

    /// Fetch the full status model.
    pub async fn status(&self) -> Result<RouterStatus, Error> {
        let url = self.url(MODEL_PATH)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?.error_for_status()?;
        let body = resp.text().await?;

        let raw = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.clone(),
        })?;
        Ok(RouterStatus::new(raw))
    }

    // ── Link control ─────────────────────────────────────────────────

    /// Bounce the cellular link by switching autoconnect off and back to
    /// home-network mode. Requires a logged-in session.
    pub async fn reconnect(&self) -> Result<(), Error> {
        let status = self.status().await?;
        let token = status.session_token().ok_or(Error::MissingToken)?.to_owned();

        self.set_autoconnect(&token, Autoconnect::Never, "disconnect")
            .await?;
        self.set_autoconnect(&token, Autoconnect::HomeNetwork, "reconnect")
            .await?;

        debug!("router link reconnect requested");
        Ok(())
    }

    async fn set_autoconnect(
        &self,
        token: &str,
        mode: Autoconnect,
        action: &'static str,
    ) -> Result<(), Error> {
        let form = [
            ("token", token),
            ("err_redirect", FORM_FAILED),
            ("ok_redirect", FORM_OK),
            ("wwan.autoconnect", mode.as_str()),
        ];

        let landed = self.post_form(&form).await?;
        if landed.path() == FORM_OK {
            Ok(())
        } else {
            Err(Error::UnexpectedRedirect {
                action,
                expected: FORM_OK.to_owned(),
                landed: landed.to_string(),
            })
        }
    }

    /// Post the config form and return the URL the router redirected to.
    async fn post_form(&self, form: &[(&str, &str)]) -> Result<Url, Error> {
        let url = self.url(CONFIG_FORM_PATH)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).form(form).send().await?;
        Ok(resp.url().clone())
    }
}
