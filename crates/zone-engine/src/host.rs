//! Hosts: the Global, Domain and Scene containers of settings.
//!
//! The three kinds share one capability set (name, priority, settings,
//! containment) but differ in how they contain a location:
//!
//! | host   | contains                                  |
//! |--------|-------------------------------------------|
//! | Global | everything                                |
//! | Domain | every location in its world               |
//! | Scene  | locations inside any of its volumes       |

use std::fmt;
use std::sync::Arc;

use zone_spatial::{CachedIndex, DomainId, Point, Volume, VolumeId};

use crate::HostSettings;

/// Priority of the Global host.
pub const GLOBAL_PRIORITY: i32 = -2;
/// Priority of every Domain host.
pub const DOMAIN_PRIORITY: i32 = -1;

/// Arena id of a [`Scene`]. Allocation order is creation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(pub u32);

impl fmt::Debug for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scene({})", self.0)
    }
}

/// Identifies any host. Ordering puts older scenes before newer ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostId {
    Global,
    Domain(DomainId),
    Scene(SceneId),
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Domain(id) => write!(f, "domain {id}"),
            Self::Scene(id) => write!(f, "scene {}", id.0),
        }
    }
}

/// A position inside a domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub domain: DomainId,
    pub point: Point,
}

impl Location {
    #[must_use]
    pub const fn new(domain: DomainId, x: f64, y: f64, z: f64) -> Self {
        Self {
            domain,
            point: Point::new(x, y, z),
        }
    }
}

/// Settings that apply everywhere.
#[derive(Debug)]
pub struct Global {
    pub(crate) name: String,
    pub(crate) settings: HostSettings,
}

/// A world: owns the spatial index of every scene volume inside it.
pub struct Domain {
    pub(crate) id: DomainId,
    pub(crate) name: String,
    pub(crate) settings: HostSettings,
    pub(crate) index: CachedIndex<SceneId>,
}

impl Domain {
    #[must_use]
    pub const fn id(&self) -> DomainId {
        self.id
    }

    /// The domain's index and cache.
    #[must_use]
    pub const fn index(&self) -> &CachedIndex<SceneId> {
        &self.index
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("volumes", &self.index.index().len())
            .field("cached", &self.index.cache().len())
            .finish()
    }
}

/// One volume of a scene, with the id its domain's index gave it.
#[derive(Clone, Debug)]
pub struct SceneVolume {
    pub domain: DomainId,
    pub id: VolumeId,
    pub volume: Arc<dyn Volume>,
}

/// A named, prioritized region.
#[derive(Debug)]
pub struct Scene {
    pub(crate) id: SceneId,
    pub(crate) name: String,
    pub(crate) priority: i32,
    pub(crate) volumes: Vec<SceneVolume>,
    pub(crate) settings: HostSettings,
}

impl Scene {
    #[must_use]
    pub const fn id(&self) -> SceneId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn volumes(&self) -> &[SceneVolume] {
        &self.volumes
    }

    /// The single domain all volumes live in, if there is exactly one.
    #[must_use]
    pub fn sole_domain(&self) -> Option<DomainId> {
        let first = self.volumes.first()?.domain;
        self.volumes
            .iter()
            .all(|v| v.domain == first)
            .then_some(first)
    }
}

/// Borrowed view of any host.
#[derive(Clone, Copy, Debug)]
pub enum HostRef<'a> {
    Global(&'a Global),
    Domain(&'a Domain),
    Scene(&'a Scene),
}

impl<'a> HostRef<'a> {
    #[must_use]
    pub fn id(self) -> HostId {
        match self {
            Self::Global(_) => HostId::Global,
            Self::Domain(d) => HostId::Domain(d.id),
            Self::Scene(s) => HostId::Scene(s.id),
        }
    }

    #[must_use]
    pub fn name(self) -> &'a str {
        match self {
            Self::Global(g) => &g.name,
            Self::Domain(d) => &d.name,
            Self::Scene(s) => &s.name,
        }
    }

    #[must_use]
    pub fn priority(self) -> i32 {
        match self {
            Self::Global(_) => GLOBAL_PRIORITY,
            Self::Domain(_) => DOMAIN_PRIORITY,
            Self::Scene(s) => s.priority,
        }
    }

    #[must_use]
    pub fn settings(self) -> &'a HostSettings {
        match self {
            Self::Global(g) => &g.settings,
            Self::Domain(d) => &d.settings,
            Self::Scene(s) => &s.settings,
        }
    }

    /// Whether the host covers `location`.
    #[must_use]
    pub fn contains(self, location: Location) -> bool {
        match self {
            Self::Global(_) => true,
            Self::Domain(d) => d.id == location.domain,
            Self::Scene(s) => s
                .volumes
                .iter()
                .any(|v| v.domain == location.domain && v.volume.contains_point(location.point, false)),
        }
    }

    /// Evaluation order: higher priority first, then older hosts first.
    pub(crate) fn order_key(self) -> (std::cmp::Reverse<i32>, HostId) {
        (std::cmp::Reverse(self.priority()), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: u32, priority: i32) -> Scene {
        Scene {
            id: SceneId(id),
            name: format!("s{id}"),
            priority,
            volumes: Vec::new(),
            settings: HostSettings::default(),
        }
    }

    #[test]
    fn test_order_is_priority_then_age() {
        let global = Global {
            name: "_global".to_owned(),
            settings: HostSettings::default(),
        };
        let newer = scene(5, 1);
        let older = scene(2, 1);
        let top = scene(9, 4);

        let mut hosts = [
            HostRef::Global(&global),
            HostRef::Scene(&newer),
            HostRef::Scene(&top),
            HostRef::Scene(&older),
        ];
        hosts.sort_by_key(|h| h.order_key());

        let ids: Vec<HostId> = hosts.iter().map(|h| h.id()).collect();
        assert_eq!(
            ids,
            vec![
                HostId::Scene(SceneId(9)),
                HostId::Scene(SceneId(2)),
                HostId::Scene(SceneId(5)),
                HostId::Global,
            ]
        );
    }

    #[test]
    fn test_scene_without_volumes_contains_nothing() {
        let empty = scene(0, 0);
        let at = Location::new(DomainId(0), 0.0, 0.0, 0.0);

        assert!(!HostRef::Scene(&empty).contains(at));
        assert!(empty.sole_domain().is_none());
    }
}
