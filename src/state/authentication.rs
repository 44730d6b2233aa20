use crate::crypto::verify_totp;
use crate::token::{now_unix_seconds, AuthenticationClaims};
use tracing::debug;

/// Identity established by a provider outside this service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
}

/// Who the authentication cookie says the caller is, for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthenticationState {
    user: Option<String>,
    expires: i64,
    remember: bool,
    logged_out: bool,
    external_identity: Option<ExternalIdentity>,
    two_factor_pending: bool,
    dirty: bool,
    invalid: bool,
}

impl AuthenticationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_claims(claims: AuthenticationClaims) -> Self {
        Self {
            user: Some(claims.subject),
            expires: claims.expires,
            remember: claims.remember,
            two_factor_pending: claims.two_factor,
            ..Self::default()
        }
    }

    /// Empty state standing in for a cookie that failed to parse.
    #[must_use]
    pub fn rejected() -> Self {
        Self {
            invalid: true,
            ..Self::default()
        }
    }

    /// Establish `user` as the authenticated subject. A blank name leaves the
    /// subject unchanged but still counts as a mutation.
    pub fn login(&mut self, user: &str, remember: bool) {
        if user.trim().is_empty() {
            debug!("ignoring login with a blank user name");
            self.touch();
            return;
        }
        self.user = Some(user.to_string());
        self.remember = remember;
        self.logged_out = false;
        self.touch();
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.external_identity = None;
        self.remember = false;
        self.two_factor_pending = false;
        self.logged_out = true;
        self.touch();
    }

    /// Record an external identity. The first one set wins.
    pub fn set_external_identity(&mut self, identity: ExternalIdentity) {
        if self.external_identity.is_some() {
            debug!(provider = %identity.provider, "external identity already set, ignoring");
            return;
        }
        self.external_identity = Some(identity);
        self.logged_out = false;
        self.touch();
    }

    pub fn two_factor_authentication(&mut self, pending: bool) {
        self.two_factor_pending = pending;
        self.touch();
    }

    /// Check a TOTP `code` against the user's base32 `secret`. A match clears
    /// the pending second factor.
    pub fn verify_second_factor(&mut self, secret: &str, code: &str) -> bool {
        let now = u64::try_from(now_unix_seconds()).unwrap_or_default();
        self.verify_second_factor_at(secret, code, now)
    }

    pub fn verify_second_factor_at(
        &mut self,
        secret: &str,
        code: &str,
        unix_seconds: u64,
    ) -> bool {
        if !verify_totp(secret, code, unix_seconds) {
            debug!("second factor rejected");
            return false;
        }
        self.two_factor_pending = false;
        self.touch();
        true
    }

    pub fn remember_me(&mut self, remember: bool) {
        self.remember = remember;
        self.touch();
    }

    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    #[must_use]
    pub fn has_authenticated_user(&self) -> bool {
        !self.logged_out && self.subject().is_some()
    }

    /// Exact match against the authenticated user.
    #[must_use]
    pub fn is_authenticated(&self, name: &str) -> bool {
        !self.logged_out && self.user.as_deref() == Some(name)
    }

    /// The direct user, falling back to the external identity's subject.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.user
            .as_deref()
            .filter(|user| !user.trim().is_empty())
            .or_else(|| {
                self.external_identity
                    .as_ref()
                    .map(|identity| identity.subject.as_str())
            })
    }

    #[must_use]
    pub fn authenticated_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    #[must_use]
    pub const fn external_identity(&self) -> Option<&ExternalIdentity> {
        self.external_identity.as_ref()
    }

    #[must_use]
    pub const fn is_two_factor_pending(&self) -> bool {
        self.two_factor_pending
    }

    #[must_use]
    pub const fn remember(&self) -> bool {
        self.remember
    }

    #[must_use]
    pub const fn is_logged_out(&self) -> bool {
        self.logged_out
    }

    #[must_use]
    pub const fn expires(&self) -> i64 {
        self.expires
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Claims for reissuing the cookie, if there is anyone to issue it for.
    #[must_use]
    pub fn to_claims(&self, expires: i64) -> Option<AuthenticationClaims> {
        if !self.has_authenticated_user() {
            return None;
        }
        Some(AuthenticationClaims {
            subject: self.subject()?.to_string(),
            two_factor: self.two_factor_pending,
            remember: self.remember,
            expires,
        })
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.invalid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github(subject: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: "github".to_string(),
            subject: subject.to_string(),
        }
    }

    #[test]
    fn login_and_logout() {
        let mut auth = AuthenticationState::new();
        assert!(!auth.has_authenticated_user());

        auth.login("alice", false);
        assert!(auth.has_authenticated_user());
        assert!(auth.is_authenticated("alice"));
        assert!(!auth.is_authenticated("Alice"));
        assert!(!auth.is_authenticated("alice "));
        assert!(auth.is_dirty());

        auth.logout();
        assert!(auth.is_logged_out());
        assert!(!auth.has_authenticated_user());
        assert!(!auth.is_authenticated("alice"));
        assert!(auth.to_claims(10).is_none());
    }

    #[test]
    fn blank_login_is_ignored() {
        let mut auth = AuthenticationState::new();
        auth.login("   ", true);
        assert!(!auth.has_authenticated_user());
        assert!(!auth.remember());
        assert!(auth.is_dirty());

        let mut auth = AuthenticationState::rejected();
        auth.login("", false);
        assert!(auth.is_dirty());
        assert!(!auth.is_invalid());
    }

    // RFC 6238 SHA512 seed, base32 encoded; 441116 is its code at 1234567890.
    const TOTP_SEED: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQGEZDGNA";

    fn pending() -> AuthenticationState {
        let mut auth = AuthenticationState::from_claims(AuthenticationClaims {
            subject: "dave".to_string(),
            two_factor: true,
            remember: false,
            expires: 100,
        });
        assert!(auth.is_two_factor_pending());
        assert!(!auth.is_dirty());
        auth
    }

    #[test]
    fn valid_second_factor_clears_pending() {
        let mut auth = pending();
        assert!(auth.verify_second_factor_at(TOTP_SEED, "441116", 1_234_567_890));
        assert!(!auth.is_two_factor_pending());
        assert!(auth.is_dirty());
        assert_eq!(
            auth.to_claims(200).map(|claims| claims.two_factor),
            Some(false)
        );
    }

    #[test]
    fn wrong_second_factor_keeps_pending() {
        let mut auth = pending();
        assert!(!auth.verify_second_factor_at(TOTP_SEED, "000000", 1_234_567_890));
        assert!(!auth.verify_second_factor_at("not base32!", "441116", 1_234_567_890));
        assert!(!auth.verify_second_factor(TOTP_SEED, "abcdef"));
        assert!(auth.is_two_factor_pending());
        assert!(!auth.is_dirty());
    }

    #[test]
    fn external_identity_is_write_once() {
        let mut auth = AuthenticationState::new();
        auth.set_external_identity(github("first"));
        auth.set_external_identity(github("second"));

        assert_eq!(auth.external_identity(), Some(&github("first")));
        assert!(auth.has_authenticated_user());
        assert_eq!(auth.subject(), Some("first"));
        assert!(auth.authenticated_user().is_none());
    }

    #[test]
    fn direct_user_takes_precedence() {
        let mut auth = AuthenticationState::new();
        auth.set_external_identity(github("octocat"));
        auth.login("alice", false);
        assert_eq!(auth.subject(), Some("alice"));
    }

    #[test]
    fn mutations_are_tracked() {
        let mut auth = AuthenticationState::from_claims(AuthenticationClaims {
            subject: "bob".to_string(),
            two_factor: false,
            remember: false,
            expires: 100,
        });
        assert!(!auth.is_dirty());
        assert_eq!(auth.expires(), 100);

        // same value, still a mutation
        auth.remember_me(false);
        assert!(auth.is_dirty());

        auth.two_factor_authentication(true);
        let claims = auth.to_claims(200);
        assert_eq!(
            claims,
            Some(AuthenticationClaims {
                subject: "bob".to_string(),
                two_factor: true,
                remember: false,
                expires: 200,
            })
        );
    }

    #[test]
    fn rejected_state_recovers_on_login() {
        let mut auth = AuthenticationState::rejected();
        assert!(auth.is_invalid());
        auth.login("carol", true);
        assert!(!auth.is_invalid());
        assert!(auth.remember());
    }
}
