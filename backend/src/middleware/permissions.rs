//! Access policies checked by handlers before touching a resource
//!
//! Every policy requires an authenticated user; reads are then open unless
//! the policy says otherwise.

use uuid::Uuid;

use super::AuthUser;
use crate::error::{AppError, AppResult};
use shared::{CountStatus, OrderStatus};

/// What a request wants to do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Field edits (PUT/PATCH)
    Update,
    /// Create, delete and state-changing actions
    Write,
}

fn allow(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

/// Catalog resources: anyone reads, staff write
pub fn staff_or_read_only(user: &AuthUser, access: Access) -> AppResult<()> {
    allow(access == Access::Read || user.is_staff())
}

pub fn admin_or_read_only(user: &AuthUser, access: Access) -> AppResult<()> {
    allow(access == Access::Read || user.is_superuser)
}

/// Owned resources (`created_by`/`performed_by`): anyone reads, owner or staff write
pub fn owner_or_staff_or_read_only(
    user: &AuthUser,
    access: Access,
    owner: Option<Uuid>,
) -> AppResult<()> {
    allow(access == Access::Read || user.is_staff() || user.owns(owner))
}

/// Private resources: only the owner or staff, even for reads
pub fn owner_or_staff(user: &AuthUser, owner: Uuid) -> AppResult<()> {
    allow(user.is_staff() || user.user_id == owner)
}

/// Counts: staff and the creator do anything, the assigned completer may
/// edit while the count is in progress
pub fn count_participant(
    user: &AuthUser,
    access: Access,
    created_by: Option<Uuid>,
    completed_by: Option<Uuid>,
    status: CountStatus,
) -> AppResult<()> {
    allow(
        access == Access::Read
            || user.is_staff()
            || user.owns(created_by)
            || (access == Access::Update && user.owns(completed_by) && status.is_open()),
    )
}

/// Orders: staff and the creator do anything, the last updater may edit
/// until the order is cancelled
pub fn order_participant(
    user: &AuthUser,
    access: Access,
    created_by: Option<Uuid>,
    updated_by: Option<Uuid>,
    status: OrderStatus,
) -> AppResult<()> {
    allow(
        access == Access::Read
            || user.is_staff()
            || user.owns(created_by)
            || (access == Access::Update
                && user.owns(updated_by)
                && status != OrderStatus::Cancelled),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_staff: bool, is_superuser: bool) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "bartender".to_string(),
            is_staff,
            is_superuser,
        }
    }

    #[test]
    fn test_staff_or_read_only() {
        let member = user(false, false);
        assert!(staff_or_read_only(&member, Access::Read).is_ok());
        assert!(staff_or_read_only(&member, Access::Write).is_err());
        assert!(staff_or_read_only(&user(true, false), Access::Write).is_ok());
        assert!(staff_or_read_only(&user(false, true), Access::Update).is_ok());
    }

    #[test]
    fn test_admin_or_read_only() {
        assert!(admin_or_read_only(&user(true, false), Access::Write).is_err());
        assert!(admin_or_read_only(&user(false, true), Access::Write).is_ok());
    }

    #[test]
    fn test_owner_policies() {
        let member = user(false, false);
        let other = Uuid::new_v4();
        assert!(owner_or_staff_or_read_only(&member, Access::Read, Some(other)).is_ok());
        assert!(owner_or_staff_or_read_only(&member, Access::Write, Some(other)).is_err());
        assert!(
            owner_or_staff_or_read_only(&member, Access::Write, Some(member.user_id)).is_ok()
        );
        assert!(owner_or_staff_or_read_only(&member, Access::Write, None).is_err());
        assert!(owner_or_staff(&member, other).is_err());
        assert!(owner_or_staff(&member, member.user_id).is_ok());
    }

    #[test]
    fn test_count_participant() {
        let counter = user(false, false);
        let creator = Some(Uuid::new_v4());
        let assigned = Some(counter.user_id);
        assert!(count_participant(
            &counter,
            Access::Update,
            creator,
            assigned,
            CountStatus::InProgress
        )
        .is_ok());
        assert!(count_participant(
            &counter,
            Access::Write,
            creator,
            assigned,
            CountStatus::InProgress
        )
        .is_err());
        assert!(count_participant(
            &counter,
            Access::Update,
            creator,
            assigned,
            CountStatus::Completed
        )
        .is_err());
    }

    #[test]
    fn test_order_participant() {
        let buyer = user(false, false);
        let creator = Some(Uuid::new_v4());
        let updater = Some(buyer.user_id);
        assert!(
            order_participant(&buyer, Access::Update, creator, updater, OrderStatus::Placed)
                .is_ok()
        );
        assert!(order_participant(
            &buyer,
            Access::Update,
            creator,
            updater,
            OrderStatus::Cancelled
        )
        .is_err());
        assert!(
            order_participant(&buyer, Access::Write, creator, updater, OrderStatus::Draft)
                .is_err()
        );
    }
}
