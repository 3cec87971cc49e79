//! Subject targeting.

use std::collections::{BTreeMap, BTreeSet};

use uuid::Uuid;

/// Permission that exempts a subject from player-restrictive keys.
pub const UNRESTRICTED_PERMISSION: &str = "zones.unrestricted";

/// Answers permission checks for subjects.
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, subject: Uuid, permission: &str) -> bool;
}

impl<F> PermissionOracle for F
where
    F: Fn(Uuid, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, subject: Uuid, permission: &str) -> bool {
        self(subject, permission)
    }
}

/// Oracle that grants nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPermissions;

impl PermissionOracle for NoPermissions {
    fn has_permission(&self, _subject: Uuid, _permission: &str) -> bool {
        false
    }
}

/// Decides whether a value applies to a subject.
///
/// A target is a whitelist or blacklist of subject ids, plus permissions the
/// subject must (or must not) hold.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Target {
    subjects: BTreeSet<Uuid>,
    whitelist: bool,
    permissions: BTreeMap<String, bool>,
    indiscriminate: bool,
}

impl Target {
    /// Applies to everyone.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Applies to nobody.
    #[must_use]
    pub fn none() -> Self {
        Self {
            whitelist: true,
            ..Self::default()
        }
    }

    /// Applies only to the listed subjects.
    #[must_use]
    pub fn whitelist(subjects: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            subjects: subjects.into_iter().collect(),
            whitelist: true,
            ..Self::default()
        }
    }

    /// Applies to everyone except the listed subjects.
    #[must_use]
    pub fn blacklist(subjects: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            subjects: subjects.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Require the subject to hold (or lack) a permission.
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>, required: bool) -> Self {
        self.permissions.insert(permission.into(), required);
        self
    }

    /// Apply even to subjects holding [`UNRESTRICTED_PERMISSION`].
    #[must_use]
    pub fn indiscriminate(mut self, indiscriminate: bool) -> Self {
        self.indiscriminate = indiscriminate;
        self
    }

    #[must_use]
    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    #[must_use]
    pub fn is_indiscriminate(&self) -> bool {
        self.indiscriminate
    }

    #[must_use]
    pub fn subjects(&self) -> &BTreeSet<Uuid> {
        &self.subjects
    }

    #[must_use]
    pub fn permissions(&self) -> &BTreeMap<String, bool> {
        &self.permissions
    }

    /// Whether the target applies to `subject`.
    ///
    /// An anonymous subject (`None`) fails any whitelist and passes any
    /// blacklist; permissions are not consulted for it.
    pub fn test(
        &self,
        subject: Option<Uuid>,
        player_restrictive: bool,
        oracle: &dyn PermissionOracle,
    ) -> bool {
        let Some(id) = subject else {
            return !self.whitelist;
        };

        if player_restrictive
            && !self.indiscriminate
            && oracle.has_permission(id, UNRESTRICTED_PERMISSION)
        {
            return false;
        }

        let permissions_match = self
            .permissions
            .iter()
            .all(|(permission, &required)| oracle.has_permission(id, permission) == required);
        if !permissions_match {
            return false;
        }

        self.subjects.contains(&id) == self.whitelist
    }
}
