//! Bulk loading of registration windows.

use std::collections::HashSet;

use tracing::debug;

use crate::errors::RegPeriodResult;
use crate::evaluator::RegistrationWindow;
use crate::fields::RegistrationFields;
use crate::store::RegistrationStore;

/// Load every user with at least one registration bound set.
///
/// Issues a single bulk query, or none at all when neither field is provisioned.
/// Values of an unprovisioned field are ignored, cleared (`<= 0`) values become
/// `None`, and users are deduplicated by id.
pub async fn load_candidates<S>(
    store: &S,
    fields: RegistrationFields,
) -> RegPeriodResult<Vec<RegistrationWindow>>
where
    S: RegistrationStore + ?Sized,
{
    if fields.is_empty() {
        debug!("No registration fields provisioned, skipping load");
        return Ok(Vec::new());
    }

    let rows = store.load_registration_rows(fields.start, fields.end).await?;
    let fetched = rows.len();

    let mut seen = HashSet::with_capacity(fetched);
    let candidates: Vec<RegistrationWindow> = rows
        .into_iter()
        .map(|row| {
            let mut window = RegistrationWindow::from(row);
            if fields.start.is_none() {
                window.start_epoch = None;
            }
            if fields.end.is_none() {
                window.end_epoch = None;
            }
            window
        })
        .filter(|window| window.has_constraint() && seen.insert(window.user_id))
        .collect();

    debug!(
        fetched,
        candidates = candidates.len(),
        "Loaded registration candidates"
    );

    Ok(candidates)
}
