//! Setting evaluation.
//!
//! A lookup gathers every host covering a location, orders them by
//! descending priority, and walks them with a [`TargetState`]:
//!
//! ```text
//!   host lacks key ──────────────────────────────► skip
//!   Idle + host has target ─► Adopted(target)
//!   effective target fails ─► Idle, value absent
//!   otherwise ─────────────────────────────────────► value live
//! ```
//!
//! Unary keys stop at the first live value. Poly keys collect every live
//! value and replay them from lowest to highest priority, starting from the
//! key's default set.

use tracing::{error, warn};
use uuid::Uuid;
use zone_spatial::{BlockPos, DomainId, OwnerSet};

use crate::{
    Data, EngineError, EngineResult, HostId, HostRef, Location, PermissionOracle, SceneId,
    SettingKey, SettingValue, Target, ValueKind, ZoneSystem,
};

/// One step of an evaluation: the value after `host` was applied.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationEntry {
    pub host: HostId,
    pub data: Data,
}

/// Outcome of a lookup.
///
/// Unary lookups have at most one entry. Poly lookups have one entry per
/// live host, lowest priority first, each holding the running set.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    key: String,
    default: Data,
    entries: Vec<EvaluationEntry>,
}

impl Evaluation {
    fn empty(key: &SettingKey) -> Self {
        Self {
            key: key.id().to_owned(),
            default: key.default_data().clone(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The final value, or the key's default when nothing applied.
    #[must_use]
    pub fn result(&self) -> &Data {
        self.entries
            .last()
            .map_or(&self.default, |entry| &entry.data)
    }

    #[must_use]
    pub fn entries(&self) -> &[EvaluationEntry] {
        &self.entries
    }

    /// Whether no host contributed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Target adoption during one walk.
///
/// The first target met is adopted and applies to every following value
/// until a value fails it, at which point the state resets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetState<'t> {
    #[default]
    Idle,
    Adopted(&'t Target),
}

impl<'t> TargetState<'t> {
    /// Feed one host's target. Returns whether its value is live.
    pub fn admit(
        &mut self,
        target: Option<&'t Target>,
        subject: Option<Uuid>,
        player_restrictive: bool,
        oracle: &dyn PermissionOracle,
    ) -> bool {
        if let (Self::Idle, Some(target)) = (*self, target) {
            *self = Self::Adopted(target);
        }

        let passes = match self {
            Self::Adopted(target) => target.test(subject, player_restrictive, oracle),
            Self::Idle => Target::all().test(subject, player_restrictive, oracle),
        };
        if !passes {
            *self = Self::Idle;
        }
        passes
    }
}

/// Read-only evaluator over a [`ZoneSystem`].
#[derive(Clone, Copy, Debug)]
pub struct EvaluationEngine<'a> {
    system: &'a ZoneSystem,
}

impl<'a> EvaluationEngine<'a> {
    #[must_use]
    pub const fn new(system: &'a ZoneSystem) -> Self {
        Self { system }
    }

    /// Evaluate `key` for `subject` at an arbitrary location.
    pub fn lookup(
        &self,
        key: &str,
        subject: Option<Uuid>,
        location: Location,
    ) -> EngineResult<Evaluation> {
        let key = self.system.key(key)?;
        let mut hosts = vec![HostRef::Global(self.system.global())];

        match self.system.domain(location.domain) {
            Some(domain) => {
                hosts.push(HostRef::Domain(domain));
                let scenes = domain
                    .index()
                    .index()
                    .containing_point(location.point, false)?;
                self.push_scenes(&mut hosts, &scenes);
            }
            None => warn!(domain = %location.domain, key = key.id(), "lookup in unknown domain"),
        }

        self.walk(key, subject, hosts)
    }

    /// Evaluate `key` at a block, going through the domain's query cache.
    pub fn lookup_block(
        &self,
        key: &str,
        subject: Option<Uuid>,
        domain: DomainId,
        x: i32,
        y: i32,
        z: i32,
    ) -> EngineResult<Evaluation> {
        let key = self.system.key(key)?;
        let mut hosts = vec![HostRef::Global(self.system.global())];

        match self.system.domain(domain) {
            Some(d) => {
                hosts.push(HostRef::Domain(d));
                let scenes = d.index().containing_block(BlockPos::new(x, y, z))?;
                self.push_scenes(&mut hosts, &scenes);
            }
            None => warn!(%domain, key = key.id(), "lookup in unknown domain"),
        }

        self.walk(key, subject, hosts)
    }

    /// Evaluate `key` against the Global host alone.
    pub fn lookup_global(&self, key: &str, subject: Option<Uuid>) -> EngineResult<Evaluation> {
        let key = self.system.key(key)?;
        self.walk(key, subject, vec![HostRef::Global(self.system.global())])
    }

    /// Find a host that makes `host`'s value for `key` redundant.
    ///
    /// Returns the highest-priority containing host carrying an identical
    /// value and target, else `host` itself if its value is the key's
    /// default, else `None`.
    pub fn find_identical_superior(
        &self,
        host: HostId,
        key: &str,
    ) -> EngineResult<Option<HostId>> {
        let system = self.system;
        let key = system.key(key)?;
        let own_host = system.host(host)?;
        let Some(own) = own_host
            .settings()
            .resolve(key.id(), |id| system.profile(id))
        else {
            return Ok(None);
        };

        let mut superiors = self.containing_hosts(own_host)?;
        superiors.sort_by_key(|h| h.order_key());
        for superior in superiors {
            let theirs = superior
                .settings()
                .resolve(key.id(), |id| system.profile(id));
            if theirs == Some(own) {
                return Ok(Some(superior.id()));
            }
        }

        Ok(own
            .value
            .is_default_for(key.default_data())
            .then_some(host))
    }

    /// Hosts that wholly contain `host`.
    fn containing_hosts(&self, host: HostRef<'a>) -> EngineResult<Vec<HostRef<'a>>> {
        let system = self.system;
        let scene = match host {
            HostRef::Global(_) => return Ok(Vec::new()),
            HostRef::Domain(_) => return Ok(vec![HostRef::Global(system.global())]),
            HostRef::Scene(scene) => scene,
        };

        let mut hosts = vec![HostRef::Global(system.global())];
        if let Some(domain) = scene.sole_domain().and_then(|d| system.domain(d)) {
            hosts.push(HostRef::Domain(domain));
        }

        let mut common: Option<OwnerSet<SceneId>> = None;
        for volume in scene.volumes() {
            let found = match system.domain(volume.domain) {
                Some(domain) => domain
                    .index()
                    .index()
                    .containing_volume(volume.volume.as_ref(), false)?,
                None => OwnerSet::default(),
            };
            common = Some(match common {
                None => found,
                Some(mut prev) => {
                    prev.retain(|s| found.contains(s));
                    prev
                }
            });
        }

        let mut containing: Vec<SceneId> = common
            .unwrap_or_default()
            .into_iter()
            .filter(|&id| id != scene.id())
            .collect();
        containing.sort_unstable();
        hosts.extend(
            containing
                .into_iter()
                .filter_map(|id| system.scene(id))
                .map(HostRef::Scene),
        );
        Ok(hosts)
    }

    fn push_scenes(&self, hosts: &mut Vec<HostRef<'a>>, scenes: &OwnerSet<SceneId>) {
        hosts.extend(
            scenes
                .iter()
                .filter_map(|&id| self.system.scene(id))
                .map(HostRef::Scene),
        );
    }

    fn walk(
        &self,
        key: &'a SettingKey,
        subject: Option<Uuid>,
        mut hosts: Vec<HostRef<'a>>,
    ) -> EngineResult<Evaluation> {
        let system = self.system;
        hosts.sort_by_key(|h| h.order_key());

        let oracle = system.permissions();
        let restrictive = key.is_player_restrictive();
        let mut state = TargetState::Idle;
        let mut live: Vec<(HostId, &SettingValue)> = Vec::new();
        let mut evaluation = Evaluation::empty(key);

        for host in hosts {
            let Some(contribution) = host
                .settings()
                .resolve(key.id(), |id| system.profile(id))
            else {
                continue;
            };
            if !state.admit(contribution.target, subject, restrictive, oracle) {
                continue;
            }

            match (key.kind(), contribution.value) {
                (ValueKind::Unary, SettingValue::Unary(value)) => {
                    evaluation.entries.push(EvaluationEntry {
                        host: host.id(),
                        data: Data::Unary(value.clone()),
                    });
                    return Ok(evaluation);
                }
                (
                    ValueKind::Poly,
                    value @ (SettingValue::Declarative(_) | SettingValue::Manipulative(_)),
                ) => live.push((host.id(), value)),
                _ => return Err(inconsistent(host.id(), key)),
            }
        }

        let Data::Set(default) = key.default_data() else {
            return Ok(evaluation);
        };
        let mut running = default.clone();
        for (host, value) in live.into_iter().rev() {
            value.apply_to(&mut running);
            evaluation.entries.push(EvaluationEntry {
                host,
                data: Data::Set(running.clone()),
            });
        }
        Ok(evaluation)
    }
}

fn inconsistent(host: HostId, key: &SettingKey) -> EngineError {
    error!(%host, key = key.id(), "host value does not match key kind");
    EngineError::Inconsistent {
        host,
        key: key.id().to_owned(),
    }
}
