//! Setting payloads.
//!
//! A key is either **Unary** (one value, highest-priority host wins) or
//! **Poly** (a set of elements merged across hosts). Hosts set Poly keys
//! either declaratively (replace the whole set) or manipulatively (add some
//! elements, remove others).

use std::collections::BTreeSet;
use std::fmt;

use crate::Target;

/// Elements of a Poly setting.
pub type ElementSet = BTreeSet<String>;

/// Build an [`ElementSet`] from string-likes.
pub fn elements<I, S>(items: I) -> ElementSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Whether a key replaces or merges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Unary,
    Poly,
}

/// A single Unary payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

/// A resolved payload: a key default or one step of an evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    Unary(Value),
    Set(ElementSet),
}

impl Data {
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Unary(_) => ValueKind::Unary,
            Self::Set(_) => ValueKind::Poly,
        }
    }

    #[must_use]
    pub const fn as_unary(&self) -> Option<&Value> {
        match self {
            Self::Unary(v) => Some(v),
            Self::Set(_) => None,
        }
    }

    #[must_use]
    pub const fn as_set(&self) -> Option<&ElementSet> {
        match self {
            Self::Set(s) => Some(s),
            Self::Unary(_) => None,
        }
    }
}

/// Additions and removals applied on top of lower-priority results.
///
/// The two sets are disjoint: an element listed in both is only added.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Manipulation {
    additive: ElementSet,
    subtractive: ElementSet,
}

impl Manipulation {
    #[must_use]
    pub fn new(additive: ElementSet, mut subtractive: ElementSet) -> Self {
        subtractive.retain(|e| !additive.contains(e));
        Self {
            additive,
            subtractive,
        }
    }

    #[must_use]
    pub fn additive(&self) -> &ElementSet {
        &self.additive
    }

    #[must_use]
    pub fn subtractive(&self) -> &ElementSet {
        &self.subtractive
    }

    /// Add then remove.
    pub fn apply(&self, running: &mut ElementSet) {
        running.extend(self.additive.iter().cloned());
        running.retain(|e| !self.subtractive.contains(e));
    }
}

/// A value as set on a host or profile.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    Unary(Value),
    Declarative(ElementSet),
    Manipulative(Manipulation),
}

impl SettingValue {
    /// Shorthand for a manipulative value.
    #[must_use]
    pub fn manipulative(additive: ElementSet, subtractive: ElementSet) -> Self {
        Self::Manipulative(Manipulation::new(additive, subtractive))
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Unary(_) => ValueKind::Unary,
            Self::Declarative(_) | Self::Manipulative(_) => ValueKind::Poly,
        }
    }

    /// Fold this value into a running Poly result.
    ///
    /// Returns `false` for Unary values, which have no set semantics.
    pub fn apply_to(&self, running: &mut ElementSet) -> bool {
        match self {
            Self::Declarative(set) => {
                running.clone_from(set);
                true
            }
            Self::Manipulative(m) => {
                m.apply(running);
                true
            }
            Self::Unary(_) => false,
        }
    }

    /// Whether this value leaves `default` exactly as it is.
    #[must_use]
    pub fn is_default_for(&self, default: &Data) -> bool {
        match (self, default) {
            (Self::Unary(v), Data::Unary(d)) => v == d,
            (_, Data::Set(d)) => {
                let mut running = d.clone();
                self.apply_to(&mut running) && running == *d
            }
            (_, Data::Unary(_)) => false,
        }
    }
}

/// A value with the target it applies to.
#[derive(Clone, Debug, PartialEq)]
pub struct Setting {
    pub value: SettingValue,
    pub target: Option<Target>,
}

impl Setting {
    #[must_use]
    pub const fn new(value: SettingValue, target: Option<Target>) -> Self {
        Self { value, target }
    }
}
