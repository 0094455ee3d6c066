//! Application service: turning raw inputs into a [`DebugRequest`].
//!
//! Everything here runs before the workflow starts, so every failure is an
//! [`InputError`] and no remote call has been made.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::application::ports::KeyFileReader;
use crate::domain::{AuthorizedKey, DebugRequest, InputError, TargetConnection, TargetSelector};

/// Raw values from flags, environment and the config file, already merged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestInputs<'a> {
    pub target: Option<&'a str>,
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
    pub thumbprint: Option<&'a str>,
    pub id: Option<&'a str>,
    pub compute_path: Option<&'a str>,
    pub name: Option<&'a str>,
    pub enable_ssh: bool,
    pub authorized_key: Option<&'a Path>,
    pub root_password: Option<&'a str>,
    pub timeout: Duration,
    pub force: bool,
}

/// Validates the inputs and loads the key file.
///
/// # Errors
///
/// Returns the first [`InputError`]: selector, then target and credentials,
/// then the key file, then the timeout.
pub async fn build_request(
    keys: &impl KeyFileReader,
    inputs: RequestInputs<'_>,
) -> Result<DebugRequest, InputError> {
    let selector = TargetSelector::from_parts(inputs.id, inputs.compute_path, inputs.name)?;
    let target = TargetConnection::new(
        inputs.target.ok_or(InputError::MissingTarget)?,
        inputs.user,
        inputs.password,
        inputs.thumbprint,
    )?;
    let authorized_key = match inputs.authorized_key {
        Some(path) => load_authorized_key(keys, path).await?,
        None => None,
    };

    let request = DebugRequest {
        target,
        selector,
        enable_ssh: inputs.enable_ssh,
        authorized_key,
        root_password: inputs
            .root_password
            .filter(|p| !p.is_empty())
            .map(str::to_string),
        timeout: inputs.timeout,
        force: inputs.force,
    };
    request.check()?;
    Ok(request)
}

/// Reads and parses a public key file. An empty file yields `None`.
///
/// # Errors
///
/// Returns [`InputError::UnreadableKey`] or [`InputError::InvalidKey`].
pub async fn load_authorized_key(
    keys: &impl KeyFileReader,
    path: &Path,
) -> Result<Option<AuthorizedKey>, InputError> {
    let content = keys
        .read_key_file(path)
        .await
        .map_err(|source| InputError::UnreadableKey {
            path: path.to_path_buf(),
            source,
        })?;
    let key = AuthorizedKey::parse(&content).map_err(|reason| InputError::InvalidKey {
        path: path.to_path_buf(),
        reason,
    })?;
    match &key {
        Some(k) => debug!(path = %path.display(), digest = %k.digest(), "loaded public key"),
        None => debug!(path = %path.display(), "public key file is empty; no key will be installed"),
    }
    Ok(key)
}
