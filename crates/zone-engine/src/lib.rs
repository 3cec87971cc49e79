//! Prioritized zone settings.
//!
//! Settings live on hosts: one Global host, one host per domain (world) and
//! any number of scenes, each a set of volumes with a priority. A lookup
//! resolves a key for a subject at a location by walking every host that
//! covers the location, highest priority first.
//!
//! # Usage
//!
//! ```ignore
//! use zone_engine::{EngineConfig, EvaluationEngine, HostId, NoPermissions, ZoneSystem};
//!
//! let mut system = ZoneSystem::new(EngineConfig::from_env()?, Arc::new(NoPermissions));
//! system.register_key(SettingKey::unary("pvp", Value::Bool(true)))?;
//! system.create_domain(DomainId(0), "world")?;
//!
//! let spawn = system.create_scene("spawn", 0)?;
//! system.add_volume(spawn, Arc::new(Cuboid::from_blocks(DomainId(0), lo, hi)?))?;
//! system.set_value(HostId::Scene(spawn), "pvp", SettingValue::Unary(Value::Bool(false)), None)?;
//!
//! let pvp = EvaluationEngine::new(&system).lookup_block("pvp", Some(player), DomainId(0), 0, 64, 0)?;
//! ```
//!
//! # Threading
//!
//! Share the system as `Arc<parking_lot::RwLock<ZoneSystem>>`. Lookups need
//! only a read lock; edits take the write lock. [`CacheMaintenance`] trims
//! domain caches from a background thread under the read lock.

mod config;
mod error;
mod evaluate;
mod host;
mod key;
mod maintenance;
mod profile;
mod system;
mod target;
mod value;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, EngineResult};
pub use evaluate::{Evaluation, EvaluationEngine, EvaluationEntry, TargetState};
pub use host::{
    DOMAIN_PRIORITY, Domain, GLOBAL_PRIORITY, Global, HostId, HostRef, Location, Scene, SceneId,
    SceneVolume,
};
pub use key::SettingKey;
pub use maintenance::CacheMaintenance;
pub use profile::{Attachment, Contribution, HostSettings, Profile, ProfileId, SettingCollection};
pub use system::ZoneSystem;
pub use target::{NoPermissions, PermissionOracle, Target, UNRESTRICTED_PERMISSION};
pub use value::{
    Data, ElementSet, Manipulation, Setting, SettingValue, Value, ValueKind, elements,
};

pub use zone_spatial::{BlockPos, Cuboid, Cylinder, DomainId, Point, Slab, Sphere, Volume, VolumeId};
