use super::TokenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Claims carried by a signed cookie token.
///
/// `exp` is not optional: a payload without it fails to decode and the token
/// is rejected. Which of the optional claims must be present depends on the
/// shape the caller asks for ([`ClaimSet::into_session`] or
/// [`ClaimSet::into_authentication`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimSet {
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(
        rename = "twoFactor",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub two_factor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remember: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    #[serde(
        rename = "csrfToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub csrf_token: Option<String>,
}

/// Session shape: arbitrary key/value data plus the CSRF token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionClaims {
    pub data: BTreeMap<String, String>,
    pub csrf_token: Option<String>,
    pub expires: i64,
}

/// Authentication shape: the subject and its second-factor status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationClaims {
    pub subject: String,
    pub two_factor: bool,
    pub remember: bool,
    pub expires: i64,
}

impl ClaimSet {
    fn base(issuer: &str, audience: &str, issued_at: i64, expires: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            aud: audience.to_string(),
            iat: issued_at,
            exp: expires,
            sub: None,
            two_factor: None,
            remember: None,
            data: None,
            csrf_token: None,
        }
    }

    #[must_use]
    pub fn session(issuer: &str, audience: &str, issued_at: i64, claims: SessionClaims) -> Self {
        Self {
            data: Some(claims.data),
            csrf_token: claims.csrf_token,
            ..Self::base(issuer, audience, issued_at, claims.expires)
        }
    }

    #[must_use]
    pub fn authentication(
        issuer: &str,
        audience: &str,
        issued_at: i64,
        claims: AuthenticationClaims,
    ) -> Self {
        Self {
            sub: Some(claims.subject),
            two_factor: Some(claims.two_factor),
            remember: Some(claims.remember),
            ..Self::base(issuer, audience, issued_at, claims.expires)
        }
    }

    /// Read the claims as a session.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingClaim`] if `data` is absent.
    pub fn into_session(self) -> Result<SessionClaims, TokenError> {
        let data = self.data.ok_or(TokenError::MissingClaim("data"))?;
        Ok(SessionClaims {
            data,
            csrf_token: self.csrf_token.filter(|token| !token.is_empty()),
            expires: self.exp,
        })
    }

    /// Read the claims as an authentication.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::MissingClaim`] if `sub` is absent or blank.
    pub fn into_authentication(self) -> Result<AuthenticationClaims, TokenError> {
        let subject = self
            .sub
            .filter(|subject| !subject.trim().is_empty())
            .ok_or(TokenError::MissingClaim("sub"))?;
        Ok(AuthenticationClaims {
            subject,
            two_factor: self.two_factor.unwrap_or(false),
            remember: self.remember.unwrap_or(false),
            expires: self.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_protocol() -> Result<(), serde_json::Error> {
        let mut data = BTreeMap::new();
        data.insert("cart".to_string(), "3".to_string());
        let claims = ClaimSet::session(
            "tollgate",
            "tollgate-session",
            10,
            SessionClaims {
                data,
                csrf_token: Some("abc".to_string()),
                expires: 20,
            },
        );
        let json = serde_json::to_value(&claims)?;
        assert_eq!(json["exp"], 20);
        assert_eq!(json["csrfToken"], "abc");
        assert_eq!(json["data"]["cart"], "3");
        assert!(json.get("sub").is_none());
        assert!(json.get("twoFactor").is_none());

        let claims = ClaimSet::authentication(
            "tollgate",
            "tollgate-auth",
            10,
            AuthenticationClaims {
                subject: "alice".to_string(),
                two_factor: true,
                remember: false,
                expires: 20,
            },
        );
        let json = serde_json::to_value(&claims)?;
        assert_eq!(json["sub"], "alice");
        assert_eq!(json["twoFactor"], true);
        assert!(json.get("data").is_none());
        Ok(())
    }

    #[test]
    fn missing_expiry_fails_to_decode() {
        let result: Result<ClaimSet, _> =
            serde_json::from_str(r#"{"iss":"tollgate","aud":"x","iat":1,"sub":"alice"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn shape_selection_requires_shape_claims() {
        let session = ClaimSet::session("i", "a", 0, SessionClaims::default());
        assert!(matches!(
            session.clone().into_authentication(),
            Err(TokenError::MissingClaim("sub"))
        ));
        assert!(session.into_session().is_ok());

        let authentication = ClaimSet::authentication(
            "i",
            "a",
            0,
            AuthenticationClaims {
                subject: "bob".to_string(),
                two_factor: false,
                remember: true,
                expires: 5,
            },
        );
        assert!(matches!(
            authentication.clone().into_session(),
            Err(TokenError::MissingClaim("data"))
        ));
        let claims = authentication.into_authentication();
        assert_eq!(claims.map(|claims| claims.remember).ok(), Some(true));
    }
}
