//! The debug request: target connection, appliance selector and the changes
//! to apply.

use std::fmt;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::domain::error::InputError;
use crate::domain::ssh::AuthorizedKey;

/// Overall budget for one debug run when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// API path appended to targets given as a bare host.
pub const SDK_PATH: &str = "/sdk";

// ── Selector ──────────────────────────────────────────────────────────────────

/// How the operator identifies the appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// Managed-object identifier, e.g. `vm-42`.
    Id(String),
    /// Inventory path of the compute resource plus the appliance display name.
    ComputePath {
        compute_path: String,
        display_name: String,
    },
}

impl TargetSelector {
    /// Builds a selector from the raw flag values.
    ///
    /// A non-empty id wins; the compute path and name are then ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::MissingSelector`] when nothing usable was given,
    /// or [`InputError::IncompleteSelector`] when only half of the
    /// compute-path pair was.
    pub fn from_parts(
        id: Option<&str>,
        compute_path: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, InputError> {
        if let Some(id) = non_empty(id) {
            return Ok(Self::Id(id));
        }
        match (non_empty(compute_path), non_empty(name)) {
            (Some(compute_path), Some(display_name)) => Ok(Self::ComputePath {
                compute_path,
                display_name,
            }),
            (Some(_), None) => Err(InputError::IncompleteSelector("--name")),
            (None, Some(_)) => Err(InputError::IncompleteSelector("--compute-resource")),
            (None, None) => Err(InputError::MissingSelector),
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id '{id}'"),
            Self::ComputePath {
                compute_path,
                display_name,
            } => write!(f, "'{display_name}' in {compute_path}"),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ── Connection ────────────────────────────────────────────────────────────────

/// Where and as whom to connect to the virtualization platform.
#[derive(Clone)]
pub struct TargetConnection {
    url: Url,
    user: String,
    password: String,
    thumbprint: Option<String>,
}

impl TargetConnection {
    /// Normalises a target given as a URL or bare host.
    ///
    /// A missing scheme becomes `https`, an empty path becomes `/sdk`, and
    /// credentials embedded in the URL are extracted (flags take precedence).
    /// The stored URL never carries credentials.
    ///
    /// # Errors
    ///
    /// Returns an [`InputError`] if the target is empty or unparsable, or if
    /// no user or password is available from either source.
    pub fn new(
        raw: &str,
        user: Option<&str>,
        password: Option<&str>,
        thumbprint: Option<&str>,
    ) -> Result<Self, InputError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(InputError::MissingTarget);
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };
        let invalid = |reason: &str| InputError::InvalidTarget {
            target: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid("scheme must be https"));
        }
        let host = url.host_str().ok_or_else(|| invalid("no host"))?.to_string();

        let embedded_user = decode(url.username());
        let embedded_password = url.password().map(decode);
        if url.set_username("").is_err() || url.set_password(None).is_err() {
            return Err(invalid("cannot strip credentials"));
        }
        if url.path().is_empty() || url.path() == "/" {
            url.set_path(SDK_PATH);
        }

        let user = non_empty(user)
            .or_else(|| Some(embedded_user).filter(|u| !u.is_empty()))
            .ok_or_else(|| InputError::MissingCredentials(host.clone()))?;
        let password = password
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or(embedded_password.filter(|p| !p.is_empty()))
            .ok_or(InputError::MissingCredentials(host))?;

        Ok(Self {
            url,
            user,
            password,
            thumbprint: non_empty(thumbprint),
        })
    }

    /// Target URL without credentials.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[must_use]
    pub fn thumbprint(&self) -> Option<&str> {
        self.thumbprint.as_deref()
    }
}

impl fmt::Debug for TargetConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConnection")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("thumbprint", &self.thumbprint)
            .finish()
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

// ── Request ───────────────────────────────────────────────────────────────────

/// Everything one debug run needs. Built once by the command layer and
/// borrowed by the workflow.
#[derive(Clone)]
pub struct DebugRequest {
    pub target: TargetConnection,
    pub selector: TargetSelector,
    pub enable_ssh: bool,
    /// Already loaded and validated; `None` when no key (or an empty file)
    /// was given.
    pub authorized_key: Option<AuthorizedKey>,
    /// Empty passwords are normalised to `None`.
    pub root_password: Option<String>,
    pub timeout: Duration,
    pub force: bool,
}

impl DebugRequest {
    /// Checks request-level invariants not covered by the field types.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::ZeroTimeout`] for a zero timeout.
    pub fn check(&self) -> Result<(), InputError> {
        if self.timeout.is_zero() {
            return Err(InputError::ZeroTimeout);
        }
        Ok(())
    }

    /// The appliance changes this request asks for.
    #[must_use]
    pub fn changes(&self) -> DebugChanges<'_> {
        DebugChanges {
            enable_ssh: self.enable_ssh,
            authorized_key: self.authorized_key.as_ref(),
            root_password: self.root_password.as_deref().filter(|p| !p.is_empty()),
        }
    }
}

impl fmt::Debug for DebugRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugRequest")
            .field("target", &self.target)
            .field("selector", &self.selector)
            .field("enable_ssh", &self.enable_ssh)
            .field("authorized_key", &self.authorized_key)
            .field(
                "root_password",
                &self.root_password.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .field("force", &self.force)
            .finish()
    }
}

/// Debug-access changes handed to the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugChanges<'a> {
    pub enable_ssh: bool,
    pub authorized_key: Option<&'a AuthorizedKey>,
    pub root_password: Option<&'a str>,
}

impl DebugChanges<'_> {
    /// Installing a key goes through the SSH enablement program, so a key
    /// implies SSH.
    #[must_use]
    pub fn enables_ssh(&self) -> bool {
        self.enable_ssh || self.authorized_key.is_some()
    }
}
