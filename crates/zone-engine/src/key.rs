//! Setting keys.

use crate::{Data, ElementSet, Value, ValueKind};

/// One configuration dimension.
///
/// The key's kind follows from its default: a [`Data::Unary`] default makes
/// a Unary key, a [`Data::Set`] default a Poly key.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingKey {
    id: String,
    description: String,
    default: Data,
    player_restrictive: bool,
}

impl SettingKey {
    /// A Unary key.
    #[must_use]
    pub fn unary(id: impl Into<String>, default: Value) -> Self {
        Self::with_default(id, Data::Unary(default))
    }

    /// A Poly key.
    #[must_use]
    pub fn poly(id: impl Into<String>, default: ElementSet) -> Self {
        Self::with_default(id, Data::Set(default))
    }

    fn with_default(id: impl Into<String>, default: Data) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            default,
            player_restrictive: false,
        }
    }

    /// Mark the key as restricting players, so holders of the bypass
    /// permission are exempt unless a target is indiscriminate.
    #[must_use]
    pub fn player_restrictive(mut self) -> Self {
        self.player_restrictive = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn default_data(&self) -> &Data {
        &self.default
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.default.kind()
    }

    #[must_use]
    pub const fn is_player_restrictive(&self) -> bool {
        self.player_restrictive
    }
}
