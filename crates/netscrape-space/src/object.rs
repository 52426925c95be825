use crate::attrs::Attrs;
use crate::entity::Entity;
use crate::resource::Resource;
use crate::uid::Uid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator of the two node kinds a topology holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Resource,
    Entity,
}

impl ObjectKind {
    /// Persisted type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Resource => "Resource",
            ObjectKind::Entity => "Entity",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Resource" => Ok(ObjectKind::Resource),
            "Entity" => Ok(ObjectKind::Entity),
            other => Err(format!("unknown object kind `{other}`")),
        }
    }
}

/// Anything a topology stores: a resource descriptor or an entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Internally tagged with `type`; `kind` is a resource field.
#[serde(tag = "type")]
pub enum Object {
    Resource(Resource),
    Entity(Entity),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Resource(_) => ObjectKind::Resource,
            Object::Entity(_) => ObjectKind::Entity,
        }
    }

    pub fn uid(&self) -> &Uid {
        match self {
            Object::Resource(r) => r.uid(),
            Object::Entity(e) => e.uid(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Object::Resource(r) => r.name(),
            Object::Entity(e) => e.name(),
        }
    }

    pub fn attrs(&self) -> &Attrs {
        match self {
            Object::Resource(r) => r.attrs(),
            Object::Entity(e) => e.attrs(),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Object::Entity(e) => Some(e),
            Object::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Object::Resource(r) => Some(r),
            Object::Entity(_) => None,
        }
    }
}

impl From<Resource> for Object {
    fn from(r: Resource) -> Self {
        Object::Resource(r)
    }
}

impl From<Entity> for Object {
    fn from(e: Entity) -> Self {
        Object::Entity(e)
    }
}
