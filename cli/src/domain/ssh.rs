//! Authorized public key parsing for appliance debug access.

use std::fmt;

use sha2::{Digest, Sha256};

/// Key types the appliance SSH server accepts.
const KEY_TYPES: &[&str] = &[
    "ssh-ed25519",
    "ssh-rsa",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// One OpenSSH public key line, validated and normalised to
/// `<type> <material> [comment]`.
///
/// The line ends up as a guest program argument, so every character is
/// restricted to a shell-safe set.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizedKey {
    line: String,
    key_type: String,
}

impl AuthorizedKey {
    /// Parses the content of a public key file.
    ///
    /// Blank lines and `#` comments are ignored. Returns `Ok(None)` when
    /// nothing remains, so an empty file means "no key supplied".
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the content is not exactly one
    /// well-formed public key.
    pub fn parse(content: &[u8]) -> Result<Option<Self>, String> {
        let text = std::str::from_utf8(content).map_err(|_| "file is not valid UTF-8".to_string())?;
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();

        match lines.as_slice() {
            [] => Ok(None),
            [line] => Self::parse_line(line).map(Some),
            many => Err(format!("expected a single public key, found {}", many.len())),
        }
    }

    fn parse_line(line: &str) -> Result<Self, String> {
        let mut fields = line.split_whitespace();
        let key_type = fields.next().unwrap_or_default();
        if !KEY_TYPES.contains(&key_type) {
            return Err(format!("unsupported key type '{key_type}'"));
        }

        let material = fields.next().ok_or_else(|| "key has no key material".to_string())?;
        if !material
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+/=".contains(c))
        {
            return Err("key material is not base64".to_string());
        }

        let comment: Vec<&str> = fields.collect();
        let comment = comment.join(" ");
        if !comment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " +/=@.-_:".contains(c))
        {
            return Err("key comment contains invalid characters".to_string());
        }

        let line = if comment.is_empty() {
            format!("{key_type} {material}")
        } else {
            format!("{key_type} {material} {comment}")
        };
        Ok(Self {
            line,
            key_type: key_type.to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.line
    }

    #[must_use]
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// `sha256:<hex>` over the normalised key line. Used for logging and
    /// for recording which key was installed.
    #[must_use]
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.line.as_bytes());
        let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
        format!("sha256:{hex}")
    }
}

impl fmt::Debug for AuthorizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedKey")
            .field("key_type", &self.key_type)
            .field("digest", &self.digest())
            .finish()
    }
}
