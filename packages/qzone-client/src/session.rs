//! Login state: account id, cookie secrets and the derived `g_tk` token.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::{BASE_URL, COOKIE_DOMAIN, USER_AGENT};
use crate::credentials::{CredentialSource, SecretString};
use crate::error::{QzoneError, Result};

/// Everything an authenticated request needs.
///
/// The token is recomputed from `p_skey` on every access and never stored.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub uin: i64,
    skey: SecretString,
    p_skey: SecretString,
}

impl SessionContext {
    pub fn new(uin: i64, skey: impl Into<String>, p_skey: impl Into<String>) -> Self {
        Self {
            uin,
            skey: SecretString::new(skey),
            p_skey: SecretString::new(p_skey),
        }
    }

    /// Parse a browser cookie string (`k=v; k=v`).
    ///
    /// `uin` is mandatory; its leading non-digit prefix (`o`) is dropped.
    /// Missing `skey` / `p_skey` default to empty.
    pub fn from_cookie_str(raw: &str) -> Result<Self> {
        let mut uin = None;
        let mut skey = String::new();
        let mut p_skey = String::new();

        for pair in raw.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "uin" => uin = Some(value.to_string()),
                "skey" => skey = value.to_string(),
                "p_skey" => p_skey = value.to_string(),
                _ => {}
            }
        }

        let uin = uin.ok_or_else(|| QzoneError::InvalidCookie("missing uin".into()))?;
        let uin: i64 = uin
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse()
            .map_err(|_| QzoneError::InvalidCookie("uin is not numeric".into()))?;
        if uin == 0 {
            return Err(QzoneError::InvalidCookie("uin is zero".into()));
        }

        Ok(Self::new(uin, skey, p_skey))
    }

    pub fn skey(&self) -> &str {
        self.skey.expose()
    }

    pub fn p_skey(&self) -> &str {
        self.p_skey.expose()
    }

    /// Anti-forgery token (`g_tk`) for the current `p_skey`.
    pub fn token(&self) -> String {
        gtk(self.p_skey.expose())
    }

    /// Cookie set attached to every authenticated request.
    pub fn cookies(&self) -> Vec<(String, String)> {
        vec![
            ("uin".to_string(), format!("o{}", self.uin)),
            ("skey".to_string(), self.skey.expose().to_string()),
            ("p_skey".to_string(), self.p_skey.expose().to_string()),
        ]
    }

    /// Default browser-style headers.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("referer".to_string(), format!("{BASE_URL}/{}", self.uin)),
            ("origin".to_string(), BASE_URL.to_string()),
            ("Host".to_string(), COOKIE_DOMAIN.to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
        ]
    }
}

/// Rolling hash over the code points of `p_skey`, masked to 31 bits.
pub fn gtk(p_skey: &str) -> String {
    let hash = p_skey
        .chars()
        .fold(5381u64, |h, c| h.wrapping_mul(33).wrapping_add(c as u64));
    (hash & 0x7FFF_FFFF).to_string()
}

/// Lazily derived, shared session.
///
/// The lock is held across derivation, so concurrent callers wait for a
/// single login instead of each running their own.
pub struct Session {
    source: Arc<dyn CredentialSource>,
    current: Mutex<Option<Arc<SessionContext>>>,
}

impl Session {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self {
            source,
            current: Mutex::new(None),
        }
    }

    /// Current context, logging in first if there is none.
    pub async fn get(&self) -> Result<Arc<SessionContext>> {
        let mut current = self.current.lock().await;
        if let Some(ctx) = current.as_ref() {
            return Ok(Arc::clone(ctx));
        }

        let ctx = Arc::new(self.login().await?);
        *current = Some(Arc::clone(&ctx));
        Ok(ctx)
    }

    /// Drop the cached context if it is still `stale`; the next
    /// [`Session::get`] logs in again.
    ///
    /// A context already replaced by another caller's re-login is kept, so
    /// requests that failed with the same expired context share one login.
    pub async fn invalidate(&self, stale: &Arc<SessionContext>) {
        let mut current = self.current.lock().await;
        match current.as_ref() {
            Some(ctx) if Arc::ptr_eq(ctx, stale) => {
                *current = None;
                debug!(uin = stale.uin, "Session invalidated");
            }
            _ => debug!("Session already refreshed, keeping it"),
        }
    }

    pub async fn uin(&self) -> Result<i64> {
        Ok(self.get().await?.uin)
    }

    async fn login(&self) -> Result<SessionContext> {
        info!("Logging in to Qzone");
        let raw = self.source.cookies(COOKIE_DOMAIN).await?;
        if raw.trim().is_empty() {
            return Err(QzoneError::Credentials("credential source returned no cookies".into()));
        }
        let ctx = SessionContext::from_cookie_str(&raw)?;
        info!(uin = ctx.uin, "Login succeeded");
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCredentials;

    #[test]
    fn test_gtk_known_vectors() {
        assert_eq!(gtk(""), "5381");
        assert_eq!(gtk("abc"), "193485963");
        // Deterministic across calls
        assert_eq!(gtk("@xYz-123"), gtk("@xYz-123"));
    }

    #[test]
    fn test_gtk_long_input_stays_in_range() {
        let long = "p_skey".repeat(200);
        let value: u64 = gtk(&long).parse().unwrap();
        assert!(value <= 0x7FFF_FFFF);
    }

    #[test]
    fn test_token_tracks_p_skey() {
        let ctx = SessionContext::new(1, "s", "abc");
        assert_eq!(ctx.token(), "193485963");
    }

    #[test]
    fn test_from_cookie_str() {
        let ctx = SessionContext::from_cookie_str("pt2gguin=o0; uin=o0012345; skey=@sk; p_skey=ps_1=").unwrap();
        assert_eq!(ctx.uin, 12345);
        assert_eq!(ctx.skey(), "@sk");
        assert_eq!(ctx.p_skey(), "ps_1=");
        assert_eq!(ctx.cookies()[0], ("uin".to_string(), "o12345".to_string()));
    }

    #[test]
    fn test_from_cookie_str_defaults_secrets() {
        let ctx = SessionContext::from_cookie_str("uin=o42").unwrap();
        assert_eq!(ctx.skey(), "");
        assert_eq!(ctx.token(), "5381");
    }

    #[test]
    fn test_from_cookie_str_rejects_bad_uin() {
        for raw in ["skey=a; p_skey=b", "uin=o0; skey=a", "uin=oabc"] {
            assert!(matches!(
                SessionContext::from_cookie_str(raw),
                Err(QzoneError::InvalidCookie(_))
            ));
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let ctx = SessionContext::new(7, "secret-skey", "secret-pskey");
        let debug = format!("{:?}", ctx);
        assert!(!debug.contains("secret-"));
    }

    #[test]
    fn test_headers_use_uin_referer() {
        let ctx = SessionContext::new(99, "", "");
        let headers = ctx.headers();
        assert!(headers
            .iter()
            .any(|(k, v)| k == "referer" && v == "https://user.qzone.qq.com/99"));
    }

    #[tokio::test]
    async fn test_session_caches_until_invalidated() {
        let creds = Arc::new(MockCredentials::new("uin=o555; skey=k; p_skey=p"));
        let session = Session::new(creds.clone());

        assert_eq!(session.uin().await.unwrap(), 555);
        assert_eq!(session.get().await.unwrap().uin, 555);
        assert_eq!(creds.call_count(), 1);

        let stale = session.get().await.unwrap();
        session.invalidate(&stale).await;
        let fresh = session.get().await.unwrap();
        assert_eq!(creds.call_count(), 2);

        // A late invalidation with the old context leaves the fresh one alone
        session.invalidate(&stale).await;
        assert!(Arc::ptr_eq(&session.get().await.unwrap(), &fresh));
        assert_eq!(creds.call_count(), 2);
    }

    #[tokio::test]
    async fn test_session_login_failures() {
        let session = Session::new(Arc::new(MockCredentials::new("skey=only")));
        assert!(matches!(
            session.get().await,
            Err(QzoneError::InvalidCookie(_))
        ));

        let session = Session::new(Arc::new(MockCredentials::failing("bridge offline")));
        assert!(matches!(session.get().await, Err(QzoneError::Credentials(_))));
    }
}
