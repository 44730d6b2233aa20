/// A cookie to emit in `Set-Cookie` at the end of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundCookie {
    Set {
        name: String,
        value: String,
        max_age: i64,
        secure: bool,
    },
    Clear {
        name: String,
        secure: bool,
    },
}

impl OutboundCookie {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Set { name, .. } | Self::Clear { name, .. } => name,
        }
    }

    /// Render the `Set-Cookie` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        let (mut cookie, secure) = match self {
            Self::Set {
                name,
                value,
                max_age,
                secure,
            } => (
                format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}"),
                *secure,
            ),
            Self::Clear { name, secure } => (
                format!("{name}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"),
                *secure,
            ),
        };
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_attributes() {
        let cookie = OutboundCookie::Set {
            name: "tollgate-auth".to_string(),
            value: "abc.def.ghi".to_string(),
            max_age: 3600,
            secure: true,
        };
        assert_eq!(
            cookie.header_value(),
            "tollgate-auth=abc.def.ghi; Path=/; HttpOnly; SameSite=Strict; Max-Age=3600; Secure"
        );
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = OutboundCookie::Clear {
            name: "tollgate-session".to_string(),
            secure: false,
        };
        assert_eq!(cookie.name(), "tollgate-session");
        assert_eq!(
            cookie.header_value(),
            "tollgate-session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
        );
    }
}
