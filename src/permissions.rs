use failure::Fail;
use serde::{Deserialize, Serialize};
use std::iter::FromIterator;

use crate::error::ApiError;

bitflags! {
    /// Capabilities an actor holds across all subjects, as reported by the
    /// actor directory.
    pub struct PermissionBits: i32 {
        /// Permission holder may complete or abort an approval stage without
        /// quorum, take over locks held by other actors, and force-release
        /// them.
        const ADMIN_OVERRIDE = 0x00000001;
        /// Permission holder may schedule, reschedule, and complete reviews of
        /// subjects they don't own.
        const MANAGE_REVIEWS = 0x00000002;
        /// Permission holder may change assignments, reference links, and
        /// activation of subjects they don't own, and delete them.
        const MANAGE_SUBJECTS = 0x00000004;
    }
}

impl PermissionBits {
    /// Verify that all required permissions are present.
    ///
    /// This is the same check as `self.contains(permissions)`, but returns an
    /// [`ApiError`].
    pub fn require(&self, permissions: PermissionBits)
    -> Result<(), RequirePermissionsError> {
        if self.contains(permissions) {
            Ok(())
        } else {
            Err(RequirePermissionsError(permissions - *self))
        }
    }
}

/// Name of a single permission, as used in configuration files.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    AdminOverride,
    ManageReviews,
    ManageSubjects,
}

impl Permission {
    pub fn bits(self) -> PermissionBits {
        match self {
            Permission::AdminOverride => PermissionBits::ADMIN_OVERRIDE,
            Permission::ManageReviews => PermissionBits::MANAGE_REVIEWS,
            Permission::ManageSubjects => PermissionBits::MANAGE_SUBJECTS,
        }
    }
}

impl FromIterator<Permission> for PermissionBits {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        iter.into_iter()
            .fold(PermissionBits::empty(), |bits, p| bits | p.bits())
    }
}

impl<'a> FromIterator<&'a Permission> for PermissionBits {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = &'a Permission>,
    {
        iter.into_iter().copied().collect()
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "actor:insufficient-permissions")]
#[fail(display = "Missing required permissions: {:?}", _0)]
pub struct RequirePermissionsError(pub PermissionBits);
