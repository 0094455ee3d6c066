//! Application service: target resolution.

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::ports::ApplianceLocator;
use crate::domain::{ApplianceHandle, Session, TargetSelector, select_unique};

/// Resolves the selector to exactly one running VCH appliance.
///
/// An id selector ignores the compute path entirely. Only read-only
/// lookups are performed.
///
/// # Errors
///
/// Returns an error if the lookup fails or does not narrow to one running
/// appliance (the latter carries a [`crate::domain::ResolveError`]).
pub async fn resolve_appliance(
    locator: &impl ApplianceLocator,
    session: &Session,
    selector: &TargetSelector,
    cancel: &CancellationToken,
) -> Result<ApplianceHandle> {
    let candidates = match selector {
        TargetSelector::Id(id) => locator.find_by_id(session, id, cancel).await?,
        TargetSelector::ComputePath {
            compute_path,
            display_name,
        } => {
            locator
                .find_by_compute_path(session, compute_path, display_name, cancel)
                .await?
        }
    };
    debug!(%selector, candidates = candidates.len(), "appliance lookup returned");
    Ok(select_unique(candidates, selector)?)
}
