//! Content registry: loads projectile descriptors and links name references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::actions::{Action, ActionKind};
use super::descriptor::{AnimType, ProjectileDescriptor, TrailKind};
use super::events::Trigger;
use super::spawn::SpawnInfo;

/// Index of a descriptor inside a [`ContentRegistry`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DescriptorId(pub usize);

/// Errors raised while loading content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The content file could not be read.
    #[error("failed to read content: {0}")]
    Io(#[from] std::io::Error),

    /// The content is not valid JSON or does not match the schema.
    #[error("malformed content: {0}")]
    Json(#[from] serde_json::Error),

    /// A spawn or projectile-hit condition names a projectile that does not exist.
    #[error("projectile '{referenced_by}' references unknown projectile '{name}'")]
    UnknownProjectile {
        /// Descriptor holding the reference.
        referenced_by: String,
        /// Name that could not be resolved.
        name: String,
    },

    /// Two descriptors share a name.
    #[error("duplicate projectile name '{0}'")]
    DuplicateName(String),

    /// A worm-hit relation combines flags that can never match together.
    #[error("worm hit condition combines incompatible relations: {0}")]
    InvalidWormHitPolicy(String),
}

/// On-disk layout of a content file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContentFile {
    projectiles: Vec<ProjectileDescriptor>,
}

/// All projectile descriptors of a game, with name references resolved.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
    descriptors: Vec<ProjectileDescriptor>,
    by_name: BTreeMap<String, DescriptorId>,
}

impl ContentRegistry {
    /// Builds a registry from descriptors, resolving every name reference.
    ///
    /// # Arguments
    ///
    /// * `descriptors` - Descriptors in id order
    ///
    /// # Returns
    ///
    /// The linked registry, or an error for duplicate names and dangling references.
    pub fn new(descriptors: Vec<ProjectileDescriptor>) -> Result<Self, ContentError> {
        let mut by_name = BTreeMap::new();
        for (i, desc) in descriptors.iter().enumerate() {
            if by_name.insert(desc.name.clone(), DescriptorId(i)).is_some() {
                return Err(ContentError::DuplicateName(desc.name.clone()));
            }
        }

        let mut registry = Self {
            descriptors,
            by_name,
        };
        registry.link()?;
        debug!(count = registry.descriptors.len(), "projectile content loaded");
        Ok(registry)
    }

    /// Parses a JSON document of the form `{ "projectiles": [ ... ] }`.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        let file: ContentFile = serde_json::from_str(json)?;
        Self::new(file.projectiles)
    }

    /// Reads and parses a JSON content file.
    pub fn from_file(path: &str) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Descriptor for an id.
    ///
    /// # Panics
    ///
    /// Panics if the id did not come from this registry.
    pub fn get(&self, id: DescriptorId) -> &ProjectileDescriptor {
        &self.descriptors[id.0]
    }

    /// Id of the descriptor with the given name.
    pub fn id_of(&self, name: &str) -> Option<DescriptorId> {
        self.by_name.get(name).copied()
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Resolves the projectile name of a spawn built outside the content file, such as a
    /// weapon's shot.
    pub fn resolve_spawn(&self, spawn: &SpawnInfo) -> Result<SpawnInfo, ContentError> {
        let mut spawn = spawn.clone();
        resolve_spawn(&mut spawn, &self.by_name, "<shot>")?;
        Ok(spawn)
    }

    fn link(&mut self) -> Result<(), ContentError> {
        let by_name = &self.by_name;
        for desc in &mut self.descriptors {
            let owner = desc.name.clone();
            let resolve = |spawn: &mut SpawnInfo| -> Result<(), ContentError> {
                resolve_spawn(spawn, by_name, &owner)
            };

            resolve(&mut desc.spawn)?;
            resolve(&mut desc.trail.projectile)?;
            link_action(&mut desc.hit, &resolve)?;
            link_action(&mut desc.ply_hit, &resolve)?;
            link_action(&mut desc.timer.action, &resolve)?;
            for pair in &mut desc.actions {
                link_action(&mut pair.action, &resolve)?;
                for trigger in &mut pair.events {
                    if let Trigger::ProjHit(hit) = trigger {
                        hit.target_id = match &hit.target {
                            Some(name) => Some(lookup(by_name, name, &owner)?),
                            None => None,
                        };
                    }
                }
            }

            warn_unknown_kinds(desc);
            if desc.rotating && desc.rot_increment == 0 {
                warn!(projectile = %desc.name, "rotation increment is zero, using 1");
                desc.rot_increment = 1;
            }
            desc.derive_flags();
        }
        Ok(())
    }
}

fn lookup(
    by_name: &BTreeMap<String, DescriptorId>,
    name: &str,
    owner: &str,
) -> Result<DescriptorId, ContentError> {
    by_name
        .get(name)
        .copied()
        .ok_or_else(|| ContentError::UnknownProjectile {
            referenced_by: owner.to_string(),
            name: name.to_string(),
        })
}

fn resolve_spawn(
    spawn: &mut SpawnInfo,
    by_name: &BTreeMap<String, DescriptorId>,
    owner: &str,
) -> Result<(), ContentError> {
    spawn.target = if spawn.projectile.is_empty() {
        None
    } else {
        Some(lookup(by_name, &spawn.projectile, owner)?)
    };
    Ok(())
}

fn link_action(
    action: &mut Action,
    resolve: &impl Fn(&mut SpawnInfo) -> Result<(), ContentError>,
) -> Result<(), ContentError> {
    if let Some(spawn) = &mut action.spawn {
        resolve(spawn)?;
    }
    if let Some(next) = &mut action.additional {
        link_action(next, resolve)?;
    }
    Ok(())
}

/// Unknown kinds load as no-ops so that newer content still runs. Flag them once at load.
fn warn_unknown_kinds(desc: &ProjectileDescriptor) {
    let name = &desc.name;
    let mut actions = vec![&desc.hit, &desc.ply_hit, &desc.timer.action];
    actions.extend(desc.actions.iter().map(|pair| &pair.action));
    while let Some(action) = actions.pop() {
        if action.kind == ActionKind::Unknown {
            warn!(projectile = %name, "unknown action kind, ignored");
        }
        if let Some(next) = &action.additional {
            actions.push(next);
        }
    }
    for pair in &desc.actions {
        if pair.events.iter().any(|t| matches!(t, Trigger::Unknown)) {
            warn!(projectile = %name, "unknown event kind, condition never matches");
        }
    }
    if desc.trail.kind == TrailKind::Unknown {
        warn!(projectile = %name, "unknown trail kind, ignored");
    }
    if desc.animating && desc.anim_type == AnimType::Unknown {
        warn!(projectile = %name, "unknown animation type, ignored");
    }
}
