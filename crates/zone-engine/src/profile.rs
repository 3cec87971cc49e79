//! Profiles and per-host setting storage.

use std::fmt;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::{Setting, SettingValue, Target};

/// Arena id of a [`Profile`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileId(pub u32);

impl fmt::Debug for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Profile({})", self.0)
    }
}

/// Key id → setting.
#[derive(Clone, Debug, Default)]
pub struct SettingCollection {
    settings: HashMap<String, Setting, FxBuildHasher>,
}

impl SettingCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    /// Insert or replace a setting. Kind checking is the caller's job.
    pub fn set(&mut self, key: impl Into<String>, setting: Setting) -> Option<Setting> {
        self.settings.insert(key.into(), setting)
    }

    pub fn remove(&mut self, key: &str) -> Option<Setting> {
        self.settings.remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Setting)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A reusable bundle of settings, attachable to many hosts.
#[derive(Clone, Debug)]
pub struct Profile {
    id: ProfileId,
    name: String,
    pub(crate) settings: SettingCollection,
}

impl Profile {
    pub(crate) fn new(id: ProfileId, name: String) -> Self {
        Self {
            id,
            name,
            settings: SettingCollection::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> ProfileId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn settings(&self) -> &SettingCollection {
        &self.settings
    }
}

/// A profile attached to a host, optionally retargeted.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub profile: ProfileId,
    /// Replaces the profile's own targets on this host.
    pub target: Option<Target>,
}

/// The value a host contributes for one key.
#[derive(Clone, Copy, Debug)]
pub struct Contribution<'a> {
    pub value: &'a SettingValue,
    pub target: Option<&'a Target>,
}

impl PartialEq for Contribution<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.target == other.target
    }
}

/// Settings carried by one host: its own, then attached profiles.
#[derive(Clone, Debug, Default)]
pub struct HostSettings {
    pub(crate) direct: SettingCollection,
    pub(crate) attachments: Vec<Attachment>,
}

impl HostSettings {
    #[must_use]
    pub const fn direct(&self) -> &SettingCollection {
        &self.direct
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Resolve the host's value for `key`.
    ///
    /// Direct settings win; otherwise the most recently attached profile
    /// that sets the key, with the attachment's target taking precedence
    /// over the profile's.
    pub fn resolve<'s, 'p: 's>(
        &'s self,
        key: &str,
        profile: impl Fn(ProfileId) -> Option<&'p Profile>,
    ) -> Option<Contribution<'s>> {
        if let Some(setting) = self.direct.get(key) {
            return Some(Contribution {
                value: &setting.value,
                target: setting.target.as_ref(),
            });
        }

        self.attachments.iter().rev().find_map(|attachment| {
            let setting = profile(attachment.profile)?.settings.get(key)?;
            Some(Contribution {
                value: &setting.value,
                target: attachment.target.as_ref().or(setting.target.as_ref()),
            })
        })
    }
}
