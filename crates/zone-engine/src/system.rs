//! The zone system: registry of keys, hosts and profiles.
//!
//! Everything that evaluation needs is reachable from a [`ZoneSystem`], and
//! callers pass it explicitly. Share it between worker threads as
//! `Arc<RwLock<ZoneSystem>>`: lookups take `&self`, edits take `&mut self`,
//! so edits are serialized against each other and against lookups.
//!
//! # Priority collisions
//!
//! Two scenes of equal priority that intersect would make evaluation order
//! depend on tie-breaking. Whenever a volume is added or a priority changes,
//! every equal-priority intersecting scene is bumped by one, and the bumped
//! scenes are checked in turn.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, info};
use zone_spatial::{CachedIndex, DomainId, SpatialError, Volume, VolumeId};

use crate::{
    Attachment, Domain, EngineConfig, EngineError, EngineResult, Global, HostId, HostRef,
    HostSettings, Location, PermissionOracle, Profile, ProfileId, Scene, SceneId, SceneVolume,
    Setting, SettingKey, SettingValue, Target,
};

pub struct ZoneSystem {
    config: EngineConfig,
    permissions: Arc<dyn PermissionOracle>,
    keys: HashMap<String, SettingKey, FxBuildHasher>,
    global: Global,
    domains: BTreeMap<DomainId, Domain>,
    scenes: BTreeMap<SceneId, Scene>,
    profiles: BTreeMap<ProfileId, Profile>,
    next_scene: u32,
    next_profile: u32,
}

impl ZoneSystem {
    /// Create an empty system.
    #[must_use]
    pub fn new(config: EngineConfig, permissions: Arc<dyn PermissionOracle>) -> Self {
        Self {
            config,
            permissions,
            keys: HashMap::default(),
            global: Global {
                name: "_global".to_owned(),
                settings: HostSettings::default(),
            },
            domains: BTreeMap::new(),
            scenes: BTreeMap::new(),
            profiles: BTreeMap::new(),
            next_scene: 0,
            next_profile: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn permissions(&self) -> &dyn PermissionOracle {
        self.permissions.as_ref()
    }

    // ==================== Keys ====================

    pub fn register_key(&mut self, key: SettingKey) -> EngineResult<()> {
        if self.keys.contains_key(key.id()) {
            return Err(EngineError::DuplicateName(key.id().to_owned()));
        }
        self.keys.insert(key.id().to_owned(), key);
        Ok(())
    }

    pub fn key(&self, id: &str) -> EngineResult<&SettingKey> {
        self.keys
            .get(id)
            .ok_or_else(|| EngineError::UnknownKey(id.to_owned()))
    }

    fn check_kind(&self, key: &str, value: &SettingValue) -> EngineResult<()> {
        let expected = self.key(key)?.kind();
        if value.kind() == expected {
            Ok(())
        } else {
            Err(EngineError::KindMismatch {
                key: key.to_owned(),
                expected,
            })
        }
    }

    // ==================== Hosts ====================

    #[must_use]
    pub const fn global(&self) -> &Global {
        &self.global
    }

    /// Register a world. Its index starts constructed and empty.
    pub fn create_domain(&mut self, id: DomainId, name: impl Into<String>) -> EngineResult<()> {
        let name = name.into();
        if self.domains.contains_key(&id) || self.domains.values().any(|d| d.name == name) {
            return Err(EngineError::DuplicateName(name));
        }
        self.domains.insert(
            id,
            Domain {
                id,
                name,
                settings: HostSettings::default(),
                index: CachedIndex::new(self.config.cache_capacity),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn domain(&self, id: DomainId) -> Option<&Domain> {
        self.domains.get(&id)
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    fn domain_mut(&mut self, id: DomainId) -> EngineResult<&mut Domain> {
        self.domains
            .get_mut(&id)
            .ok_or(EngineError::UnknownDomain(id))
    }

    pub fn create_scene(&mut self, name: impl Into<String>, priority: i32) -> EngineResult<SceneId> {
        let name = name.into();
        if priority < 0 {
            return Err(EngineError::NegativePriority(priority));
        }
        if self.scene_by_name(&name).is_some() {
            return Err(EngineError::DuplicateName(name));
        }

        let id = SceneId(self.next_scene);
        self.next_scene += 1;
        info!(scene = %name, priority, "created scene");
        self.scenes.insert(
            id,
            Scene {
                id,
                name,
                priority,
                volumes: Vec::new(),
                settings: HostSettings::default(),
            },
        );
        Ok(id)
    }

    #[must_use]
    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(&id)
    }

    #[must_use]
    pub fn scene_by_name(&self, name: &str) -> Option<&Scene> {
        self.scenes.values().find(|s| s.name == name)
    }

    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    fn scene_mut(&mut self, id: SceneId) -> EngineResult<&mut Scene> {
        self.scenes.get_mut(&id).ok_or(EngineError::UnknownScene(id))
    }

    /// Remove a scene and all of its volumes.
    ///
    /// Volumes are dropped without rebuilding, then each touched domain is
    /// reconstructed once.
    pub fn destroy_scene(&mut self, id: SceneId) -> EngineResult<Scene> {
        let scene = self.scenes.remove(&id).ok_or(EngineError::UnknownScene(id))?;

        let mut touched: Vec<DomainId> = Vec::new();
        for v in &scene.volumes {
            self.domain_mut(v.domain)?.index.remove(v.id, false)?;
            if !touched.contains(&v.domain) {
                touched.push(v.domain);
            }
        }
        for domain in touched {
            self.domain_mut(domain)?.index.construct();
        }

        info!(scene = %scene.name, volumes = scene.volumes.len(), "destroyed scene");
        Ok(scene)
    }

    /// Add a volume to a scene and register it in its domain's index.
    pub fn add_volume(&mut self, scene: SceneId, volume: Arc<dyn Volume>) -> EngineResult<VolumeId> {
        if !self.scenes.contains_key(&scene) {
            return Err(EngineError::UnknownScene(scene));
        }
        let domain = volume.domain();
        let id = self
            .domain_mut(domain)?
            .index
            .put(Arc::clone(&volume), scene, true);
        self.scene_mut(scene)?.volumes.push(SceneVolume { domain, id, volume });

        self.resolve_collisions(scene);
        Ok(id)
    }

    pub fn remove_volume(
        &mut self,
        scene: SceneId,
        domain: DomainId,
        volume: VolumeId,
    ) -> EngineResult<()> {
        let Some(pos) = self
            .scenes
            .get(&scene)
            .ok_or(EngineError::UnknownScene(scene))?
            .volumes
            .iter()
            .position(|v| v.domain == domain && v.id == volume)
        else {
            return Err(SpatialError::UnknownVolume(volume).into());
        };
        self.domain_mut(domain)?.index.remove(volume, true)?;
        self.scene_mut(scene)?.volumes.remove(pos);
        Ok(())
    }

    /// Change a scene's priority, then settle any collisions it causes.
    pub fn set_priority(&mut self, scene: SceneId, priority: i32) -> EngineResult<()> {
        if priority < 0 {
            return Err(EngineError::NegativePriority(priority));
        }
        self.scene_mut(scene)?.priority = priority;
        self.resolve_collisions(scene);
        Ok(())
    }

    /// Scenes other than `scene` with a volume intersecting one of its own.
    #[must_use]
    pub fn intersecting_scenes(&self, scene: SceneId) -> Vec<SceneId> {
        let Some(owned) = self.scenes.get(&scene) else {
            return Vec::new();
        };
        let mut hits: Vec<SceneId> = Vec::new();
        for domain in owned.volumes.iter().map(|v| v.domain) {
            if let Some(d) = self.domains.get(&domain) {
                hits.extend(d.index.index().intersecting_owner(scene));
            }
        }
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    fn resolve_collisions(&mut self, origin: SceneId) {
        let mut pending = VecDeque::from([origin]);
        while let Some(scene) = pending.pop_front() {
            let Some(priority) = self.scenes.get(&scene).map(|s| s.priority) else {
                continue;
            };
            for other in self.intersecting_scenes(scene) {
                let Some(s) = self.scenes.get_mut(&other) else {
                    continue;
                };
                if s.priority == priority {
                    s.priority += 1;
                    info!(
                        scene = %s.name,
                        from = priority,
                        to = s.priority,
                        "bumped colliding scene priority"
                    );
                    pending.push_back(other);
                }
            }
        }
    }

    // ==================== Profiles ====================

    pub fn create_profile(&mut self, name: impl Into<String>) -> EngineResult<ProfileId> {
        let name = name.into();
        if self.profiles.values().any(|p| p.name() == name) {
            return Err(EngineError::DuplicateName(name));
        }
        let id = ProfileId(self.next_profile);
        self.next_profile += 1;
        self.profiles.insert(id, Profile::new(id, name));
        Ok(id)
    }

    #[must_use]
    pub fn profile(&self, id: ProfileId) -> Option<&Profile> {
        self.profiles.get(&id)
    }

    pub fn set_profile_value(
        &mut self,
        profile: ProfileId,
        key: &str,
        value: SettingValue,
        target: Option<Target>,
    ) -> EngineResult<()> {
        self.check_kind(key, &value)?;
        self.profiles
            .get_mut(&profile)
            .ok_or(EngineError::UnknownProfile(profile))?
            .settings
            .set(key, Setting::new(value, target));
        Ok(())
    }

    // ==================== Host settings ====================

    /// Borrow any host.
    pub fn host(&self, id: HostId) -> EngineResult<HostRef<'_>> {
        Ok(match id {
            HostId::Global => HostRef::Global(&self.global),
            HostId::Domain(d) => {
                HostRef::Domain(self.domains.get(&d).ok_or(EngineError::UnknownDomain(d))?)
            }
            HostId::Scene(s) => {
                HostRef::Scene(self.scenes.get(&s).ok_or(EngineError::UnknownScene(s))?)
            }
        })
    }

    fn host_settings_mut(&mut self, id: HostId) -> EngineResult<&mut HostSettings> {
        Ok(match id {
            HostId::Global => &mut self.global.settings,
            HostId::Domain(d) => &mut self.domain_mut(d)?.settings,
            HostId::Scene(s) => &mut self.scene_mut(s)?.settings,
        })
    }

    /// Set a value directly on a host.
    pub fn set_value(
        &mut self,
        host: HostId,
        key: &str,
        value: SettingValue,
        target: Option<Target>,
    ) -> EngineResult<()> {
        self.check_kind(key, &value)?;
        self.host_settings_mut(host)?
            .direct
            .set(key, Setting::new(value, target));
        Ok(())
    }

    pub fn unset_value(&mut self, host: HostId, key: &str) -> EngineResult<Option<Setting>> {
        Ok(self.host_settings_mut(host)?.direct.remove(key))
    }

    /// Attach a profile to a host. Later attachments take precedence.
    pub fn attach_profile(
        &mut self,
        host: HostId,
        profile: ProfileId,
        target: Option<Target>,
    ) -> EngineResult<()> {
        if !self.profiles.contains_key(&profile) {
            return Err(EngineError::UnknownProfile(profile));
        }
        let settings = self.host_settings_mut(host)?;
        settings.attachments.retain(|a| a.profile != profile);
        settings.attachments.push(Attachment { profile, target });
        Ok(())
    }

    /// Detach a profile. Returns whether it was attached.
    pub fn detach_profile(&mut self, host: HostId, profile: ProfileId) -> EngineResult<bool> {
        let settings = self.host_settings_mut(host)?;
        let before = settings.attachments.len();
        settings.attachments.retain(|a| a.profile != profile);
        Ok(settings.attachments.len() < before)
    }

    /// Hosts covering `location`, found by testing every host directly.
    ///
    /// Slow; useful to cross-check the index.
    #[must_use]
    pub fn hosts_containing(&self, location: Location) -> Vec<HostId> {
        let global = std::iter::once(HostRef::Global(&self.global));
        let domains = self.domains.values().map(HostRef::Domain);
        let scenes = self.scenes.values().map(HostRef::Scene);
        global
            .chain(domains)
            .chain(scenes)
            .filter(|h| h.contains(location))
            .map(HostRef::id)
            .collect()
    }

    // ==================== Cache maintenance ====================

    /// Trim every domain cache. Returns the total number of evictions.
    pub fn trim_caches(&self) -> usize {
        let evicted: usize = self
            .domains
            .values()
            .map(|d| d.index.cache().trim())
            .sum();
        if evicted > 0 {
            debug!(evicted, "trimmed domain caches");
        }
        evicted
    }

    pub fn cache_len(&self, domain: DomainId) -> EngineResult<usize> {
        Ok(self
            .domains
            .get(&domain)
            .ok_or(EngineError::UnknownDomain(domain))?
            .index
            .cache()
            .len())
    }
}

impl std::fmt::Debug for ZoneSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneSystem")
            .field("keys", &self.keys.len())
            .field("domains", &self.domains.len())
            .field("scenes", &self.scenes.len())
            .field("profiles", &self.profiles.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoPermissions, Value};
    use zone_spatial::{BlockPos, Cuboid, Point, Sphere};

    const WORLD: DomainId = DomainId(0);

    fn system() -> ZoneSystem {
        let mut system = ZoneSystem::new(EngineConfig::default(), Arc::new(NoPermissions));
        system.create_domain(WORLD, "world").unwrap();
        system
    }

    fn cube(lo: i32, hi: i32) -> Arc<dyn Volume> {
        Arc::new(Cuboid::from_blocks(WORLD, BlockPos::new(lo, 0, lo), BlockPos::new(hi, 10, hi)).unwrap())
    }

    fn priority(system: &ZoneSystem, id: SceneId) -> i32 {
        system.scene(id).unwrap().priority
    }

    #[test]
    fn test_collision_bumps_existing_scene() {
        let mut system = system();
        let a = system.create_scene("a", 3).unwrap();
        let b = system.create_scene("b", 3).unwrap();
        system.add_volume(a, cube(0, 10)).unwrap();
        system.add_volume(b, cube(5, 15)).unwrap();

        assert_eq!(priority(&system, a), 4);
        assert_eq!(priority(&system, b), 3);
    }

    #[test]
    fn test_collision_cascades() {
        let mut system = system();
        let a = system.create_scene("a", 1).unwrap();
        let b = system.create_scene("b", 2).unwrap();
        let c = system.create_scene("c", 1).unwrap();
        system.add_volume(a, cube(0, 10)).unwrap();
        system.add_volume(b, cube(8, 20)).unwrap();

        // c hits a (1 -> 2), which now hits b (2 -> 3).
        system.add_volume(c, cube(2, 4)).unwrap();

        assert_eq!(priority(&system, c), 1);
        assert_eq!(priority(&system, a), 2);
        assert_eq!(priority(&system, b), 3);
    }

    #[test]
    fn test_disjoint_scenes_keep_priority() {
        let mut system = system();
        let a = system.create_scene("a", 0).unwrap();
        let b = system.create_scene("b", 0).unwrap();
        system.add_volume(a, cube(0, 4)).unwrap();
        // Touches a along x = 5 but shares no blocks.
        system.add_volume(b, cube(5, 9)).unwrap();

        assert_eq!(priority(&system, a), 0);
        assert_eq!(priority(&system, b), 0);
    }

    #[test]
    fn test_set_priority_resolves_collision() {
        let mut system = system();
        let a = system.create_scene("a", 0).unwrap();
        let b = system.create_scene("b", 5).unwrap();
        system.add_volume(a, cube(0, 10)).unwrap();
        system.add_volume(b, cube(5, 15)).unwrap();

        system.set_priority(a, 5).unwrap();
        assert_eq!(priority(&system, a), 5);
        assert_eq!(priority(&system, b), 6);
    }

    #[test]
    fn test_destroy_scene_unindexes_volumes() {
        let mut system = system();
        let a = system.create_scene("a", 0).unwrap();
        system.add_volume(a, cube(0, 10)).unwrap();
        system.add_volume(a, cube(20, 30)).unwrap();
        let at = Location::new(WORLD, 25.0, 5.0, 25.0);
        assert!(system.hosts_containing(at).contains(&HostId::Scene(a)));

        let removed = system.destroy_scene(a).unwrap();
        assert_eq!(removed.volumes().len(), 2);
        assert!(system.domain(WORLD).unwrap().index().index().is_empty());
        assert_eq!(system.hosts_containing(at), vec![HostId::Global, HostId::Domain(WORLD)]);
    }

    #[test]
    fn test_rejects_bad_edits() {
        let mut system = system();
        system
            .register_key(SettingKey::unary("pvp", Value::Bool(true)))
            .unwrap();

        assert!(matches!(
            system.create_scene("neg", -1),
            Err(EngineError::NegativePriority(-1))
        ));
        system.create_scene("dup", 0).unwrap();
        assert!(matches!(
            system.create_scene("dup", 1),
            Err(EngineError::DuplicateName(_))
        ));
        assert!(matches!(
            system.set_value(
                HostId::Global,
                "pvp",
                SettingValue::Declarative(crate::elements(["x"])),
                None
            ),
            Err(EngineError::KindMismatch { .. })
        ));
        assert!(matches!(
            system.set_value(HostId::Global, "missing", SettingValue::Unary(Value::Int(1)), None),
            Err(EngineError::UnknownKey(_))
        ));
        let elsewhere: Arc<dyn Volume> = Arc::new(
            Cuboid::from_blocks(DomainId(9), BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1))
                .unwrap(),
        );
        let dup = system.scene_by_name("dup").unwrap().id();
        assert!(matches!(
            system.add_volume(dup, elsewhere),
            Err(EngineError::UnknownDomain(DomainId(9)))
        ));
    }

    #[test]
    fn test_reattach_moves_profile_to_end() {
        let mut system = system();
        let p = system.create_profile("p").unwrap();
        let q = system.create_profile("q").unwrap();
        system.attach_profile(HostId::Global, p, None).unwrap();
        system.attach_profile(HostId::Global, q, None).unwrap();
        system.attach_profile(HostId::Global, p, Some(Target::none())).unwrap();

        let attached: Vec<ProfileId> = system
            .global()
            .settings
            .attachments()
            .iter()
            .map(|a| a.profile)
            .collect();
        assert_eq!(attached, vec![q, p]);

        assert!(system.detach_profile(HostId::Global, q).unwrap());
        assert!(!system.detach_profile(HostId::Global, q).unwrap());
    }

    #[test]
    fn test_remove_volume() {
        let mut system = system();
        let a = system.create_scene("a", 0).unwrap();
        let keep = system.add_volume(a, cube(0, 4)).unwrap();
        let gone = system.add_volume(a, cube(10, 14)).unwrap();

        system.remove_volume(a, WORLD, gone).unwrap();
        assert!(matches!(
            system.remove_volume(a, WORLD, gone),
            Err(EngineError::Spatial(zone_spatial::SpatialError::UnknownVolume(_)))
        ));

        let ids: Vec<VolumeId> = system.scene(a).unwrap().volumes().iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![keep]);
        let at = Location::new(WORLD, 12.0, 5.0, 12.0);
        assert_eq!(system.hosts_containing(at), vec![HostId::Global, HostId::Domain(WORLD)]);
    }

    #[test]
    fn test_disjoint_balls_keep_priority() {
        let mut system = system();
        let a = system.create_scene("a", 0).unwrap();
        let b = system.create_scene("b", 0).unwrap();
        system
            .add_volume(a, Arc::new(Sphere::new(WORLD, Point::new(0.0, 0.0, 0.0), 10.0).unwrap()))
            .unwrap();
        // Bounding boxes overlap, the balls are 26 apart.
        system
            .add_volume(
                b,
                Arc::new(Sphere::new(WORLD, Point::new(15.0, 15.0, 15.0), 10.0).unwrap()),
            )
            .unwrap();

        assert!(system.intersecting_scenes(a).is_empty());
        assert_eq!(priority(&system, a), 0);
        assert_eq!(priority(&system, b), 0);
    }
}
