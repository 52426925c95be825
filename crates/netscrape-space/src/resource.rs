use crate::attrs::Attrs;
use crate::error::SpaceError;
use crate::uid::Uid;
use serde::{Deserialize, Serialize};

/// A type descriptor for entities ("repo", "topic", ...), not an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    uid: Uid,
    name: String,
    group: String,
    version: String,
    kind: String,
    namespaced: bool,
    #[serde(default)]
    attrs: Attrs,
}

impl Resource {
    /// Create a descriptor whose uid is derived from its
    /// (name, group, version, kind) tuple.
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
        namespaced: bool,
    ) -> Result<Self, SpaceError> {
        let (name, group, version, kind) = (name.into(), group.into(), version.into(), kind.into());
        if name.trim().is_empty() {
            return Err(SpaceError::invalid("resource name", "must not be empty"));
        }
        let uid = Uid::hashed(&[&name, &group, &version, &kind]);
        Ok(Self {
            uid,
            name,
            group,
            version,
            kind,
            namespaced,
            attrs: Attrs::new(),
        })
    }

    /// Override the derived uid, e.g. when decoding a stored descriptor.
    pub fn with_uid(mut self, uid: Uid) -> Self {
        self.uid = uid;
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespaced(&self) -> bool {
        self.namespaced
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    /// `name/group/version/kind`, used in logs and error messages.
    pub fn key(&self) -> String {
        format!("{}/{}/{}/{}", self.name, self.group, self.version, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_follows_the_tuple() {
        let a = Resource::new("repo", "repos", "v3", "starred", true).unwrap();
        let b = Resource::new("repo", "repos", "v3", "starred", false).unwrap();
        let c = Resource::new("repo", "repos", "v4", "starred", true).unwrap();
        assert_eq!(a.uid(), b.uid());
        assert_ne!(a.uid(), c.uid());
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Resource::new("", "repos", "v3", "starred", true).unwrap_err();
        assert!(matches!(err, SpaceError::Invalid { .. }));
    }
}
