//! Ownership policy shared by every mutating operation.
//!
//! A resource may only be changed or deleted by the user recorded as its
//! owner: the host of a room, the author of a message.

use tracing::warn;
use uuid::Uuid;

use crate::shared::AppError;

/// Anything with a single owning user
pub trait Owned {
    fn owner_id(&self) -> Uuid;

    /// Short label used in logs and error messages
    fn kind(&self) -> &'static str;
}

pub fn is_owner(actor_id: Uuid, resource: &impl Owned) -> bool {
    resource.owner_id() == actor_id
}

/// Fails with `AppError::Forbidden` unless `actor_id` owns `resource`
pub fn ensure_owner(actor_id: Uuid, resource: &impl Owned) -> Result<(), AppError> {
    if is_owner(actor_id, resource) {
        return Ok(());
    }

    warn!(
        actor_id = %actor_id,
        owner_id = %resource.owner_id(),
        resource = resource.kind(),
        "Rejected mutation by non-owner"
    );
    Err(AppError::Forbidden(format!(
        "{} is owned by another user",
        resource.kind()
    )))
}
