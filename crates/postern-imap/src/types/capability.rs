//! Server capabilities.

/// Server capability as advertised by `CAPABILITY` or a `[CAPABILITY ...]`
/// response code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// STARTTLS support
    StartTls,
    /// LOGIN disabled until the connection is encrypted
    LoginDisabled,
    /// SASL mechanism (`AUTH=<mechanism>`)
    Auth(String),
    /// Any capability this engine does not act on
    Other(String),
}

impl Capability {
    /// Parses a capability atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ if upper.starts_with("AUTH=") => Self::Auth(s[5..].to_string()),
            _ => Self::Other(s.to_string()),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => write!(f, "IMAP4rev1"),
            Self::StartTls => write!(f, "STARTTLS"),
            Self::LoginDisabled => write!(f, "LOGINDISABLED"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mechanism_keeps_case() {
        assert_eq!(
            Capability::parse("auth=Login"),
            Capability::Auth("Login".to_string())
        );
    }

    #[test]
    fn display_round_trips_known_atoms() {
        for atom in ["IMAP4rev1", "STARTTLS", "LOGINDISABLED", "AUTH=PLAIN", "UIDPLUS"] {
            assert_eq!(Capability::parse(atom).to_string(), atom);
        }
    }
}
