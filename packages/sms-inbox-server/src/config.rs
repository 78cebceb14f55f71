//! Server configuration.
//!
//! Built once from the command line / environment in `main` and shared
//! read-only through [`AppState`](crate::state::AppState).

/// Default page size for `GET /api/messages`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size the provider accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Default session TTL in seconds (24 hours).
pub const DEFAULT_SESSION_TTL_SECS: i64 = 24 * 3600;

/// HTTP-facing settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Prefix every auth/api route is mounted under, e.g. `/twilio-sms-web`.
    /// Empty when mounted at the root.
    pub base_path: String,
    /// Public URL of this server including the base path.
    pub backend_base_url: String,
    /// Public URL of the web frontend; also the only allowed CORS origin.
    pub frontend_base_url: String,
    pub session_ttl_secs: i64,
    /// Mark the session cookie `Secure` (and `SameSite=None`).
    pub secure_cookies: bool,
    pub page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            base_path: "/twilio-sms-web".to_string(),
            backend_base_url: "http://localhost:3001/twilio-sms-web".to_string(),
            frontend_base_url: "http://localhost:3000".to_string(),
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            secure_cookies: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Where the frontend lands after a successful login.
    pub fn inbox_url(&self) -> String {
        format!("{}/#/inbox", self.frontend_base_url.trim_end_matches('/'))
    }

    /// Local path of the login failure page.
    pub fn failure_path(&self) -> String {
        format!("{}/auth/failure", self.base_path)
    }

    /// Public login URL, used as the post-logout landing page.
    pub fn login_url(&self) -> String {
        format!("{}/auth/login", self.backend_base_url.trim_end_matches('/'))
    }

    /// Public OAuth redirect URI registered with the identity provider.
    pub fn callback_url(&self) -> String {
        format!("{}/auth/callback", self.backend_base_url.trim_end_matches('/'))
    }

    /// `scheme://host[:port]` of the frontend URL, for the CORS allow-list.
    pub fn frontend_origin(&self) -> &str {
        origin_of(&self.frontend_base_url)
    }

    /// Clamp a requested page size to what the provider accepts.
    pub fn page_size_for(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.page_size).clamp(1, MAX_PAGE_SIZE)
    }
}

/// Normalize a mount path: leading slash, no trailing slash, `""` for root.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn origin_of(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url.trim_end_matches('/');
    };
    let rest = &url[scheme_end + 3..];
    match rest.find('/') {
        Some(path_start) => &url[..scheme_end + 3 + path_start],
        None => url,
    }
}

/// OpenID Connect client settings for a Keycloak-style realm.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Identity server root, e.g. `https://sso.example.com`.
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub client_secret: String,
    /// Must match a redirect URI registered for the client.
    pub redirect_uri: String,
}

/// Scopes requested at login.
pub const OIDC_SCOPES: &[&str] = &["openid", "profile", "email"];

impl OidcConfig {
    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.base_url.trim_end_matches('/'), self.realm)
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{}", self.issuer(), name)
    }

    pub fn auth_url(&self) -> String {
        self.endpoint("auth")
    }

    pub fn token_url(&self) -> String {
        self.endpoint("token")
    }

    pub fn userinfo_url(&self) -> String {
        self.endpoint("userinfo")
    }

    pub fn logout_url(&self) -> String {
        self.endpoint("logout")
    }
}

/// Twilio account credentials and endpoints.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sync service holding the app document. `None` disables `/api/sync-document`.
    pub sync_service_sid: Option<String>,
    pub sync_document: String,
    /// REST API root; overridable for tests.
    pub api_base_url: String,
    pub sync_base_url: String,
}

impl TwilioConfig {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        Self {
            account_sid,
            auth_token,
            sync_service_sid: None,
            sync_document: "twilio_sms_web".to_string(),
            api_base_url: "https://api.twilio.com".to_string(),
            sync_base_url: "https://sync.twilio.com".to_string(),
        }
    }

    /// Account-scoped path prefix, e.g. `/2010-04-01/Accounts/AC123`.
    pub fn account_path(&self) -> String {
        format!("/2010-04-01/Accounts/{}", self.account_sid)
    }

    /// Path of the account's message listing; page cursors must point here.
    pub fn messages_path(&self) -> String {
        format!("{}/Messages.json", self.account_path())
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Document URL, or the collection URL when `name` is `None`.
    pub fn sync_documents_url(&self, service_sid: &str, name: Option<&str>) -> String {
        let base = format!(
            "{}/v1/Services/{}/Documents",
            self.sync_base_url.trim_end_matches('/'),
            urlencoding::encode(service_sid)
        );
        match name {
            Some(name) => format!("{}/{}", base, urlencoding::encode(name)),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oidc() -> OidcConfig {
        OidcConfig {
            base_url: "https://sso.example.com/".to_string(),
            realm: "staff".to_string(),
            client_id: "sms-web".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3001/twilio-sms-web/auth/callback".to_string(),
        }
    }

    #[test]
    fn test_oidc_endpoints() {
        let config = oidc();
        assert_eq!(config.issuer(), "https://sso.example.com/realms/staff");
        assert_eq!(
            config.token_url(),
            "https://sso.example.com/realms/staff/protocol/openid-connect/token"
        );
        assert_eq!(
            config.logout_url(),
            "https://sso.example.com/realms/staff/protocol/openid-connect/logout"
        );
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/twilio-sms-web/"), "/twilio-sms-web");
        assert_eq!(normalize_base_path("twilio-sms-web"), "/twilio-sms-web");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
    }

    #[test]
    fn test_derived_urls() {
        let config = ServerConfig::default();
        assert_eq!(config.inbox_url(), "http://localhost:3000/#/inbox");
        assert_eq!(config.failure_path(), "/twilio-sms-web/auth/failure");
        assert_eq!(
            config.login_url(),
            "http://localhost:3001/twilio-sms-web/auth/login"
        );
        assert_eq!(config.frontend_origin(), "http://localhost:3000");

        let nested = ServerConfig {
            frontend_base_url: "https://inbox.example.com/app/".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(nested.frontend_origin(), "https://inbox.example.com");
    }

    #[test]
    fn test_page_size_clamped() {
        let config = ServerConfig::default();
        assert_eq!(config.page_size_for(None), 10);
        assert_eq!(config.page_size_for(Some(0)), 1);
        assert_eq!(config.page_size_for(Some(5000)), 1000);
    }

    #[test]
    fn test_twilio_urls() {
        let mut config = TwilioConfig::new("AC123".to_string(), "token".to_string());
        assert_eq!(config.messages_path(), "/2010-04-01/Accounts/AC123/Messages.json");
        config.sync_service_sid = Some("IS1".to_string());
        assert_eq!(
            config.sync_documents_url("IS1", Some("twilio_sms_web")),
            "https://sync.twilio.com/v1/Services/IS1/Documents/twilio_sms_web"
        );
    }
}
