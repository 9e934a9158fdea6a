//! # Resource model.
//!
//! A [`Resource`] is a `/`-separated workspace path. A [`ResourceSet`] is the
//! ordered, deduplicated scope of one refresh; together with a [`Depth`] it
//! decides which resources a refresh covers.

use std::{fmt, sync::Arc};

/// Workspace resource identified by its path (e.g. `/project/src/lib.rs`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource(Arc<str>);

impl Resource {
    /// Creates a resource; a trailing `/` is dropped so `/p/` and `/p` are equal.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let trimmed = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Self(Arc::from(trimmed))
    }

    /// Returns the resource path.
    pub fn path(&self) -> &str {
        &self.0
    }

    /// Number of path segments between `root` and `self`, or `None` if `self` is not under `root`.
    fn distance_from(&self, root: &Resource) -> Option<usize> {
        let me = self.path();
        let base = root.path();
        if me == base {
            return Some(0);
        }
        let rest = if base == "/" {
            me.strip_prefix('/')?
        } else {
            me.strip_prefix(base)?.strip_prefix('/')?
        };
        Some(rest.split('/').filter(|s| !s.is_empty()).count())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Resource {
    fn from(path: &str) -> Self {
        Resource::new(path)
    }
}

/// How far below each root a refresh reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Depth {
    /// Only the roots themselves.
    Zero,
    /// Roots and their direct children.
    One,
    /// Roots and everything below them.
    #[default]
    Infinite,
}

impl Depth {
    fn admits(self, distance: usize) -> bool {
        match self {
            Depth::Zero => distance == 0,
            Depth::One => distance <= 1,
            Depth::Infinite => true,
        }
    }
}

/// Ordered, deduplicated set of refresh roots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceSet {
    roots: Vec<Resource>,
}

impl ResourceSet {
    /// Builds a set keeping the first occurrence of every resource.
    pub fn new<I, R>(resources: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Resource>,
    {
        let mut set = Self::default();
        for r in resources {
            set.insert(r.into());
        }
        set
    }

    /// Appends `resource` unless already present. Returns `true` if inserted.
    pub fn insert(&mut self, resource: Resource) -> bool {
        if self.roots.contains(&resource) {
            return false;
        }
        self.roots.push(resource);
        true
    }

    /// True if `resource` is one of the roots.
    pub fn contains(&self, resource: &Resource) -> bool {
        self.roots.contains(resource)
    }

    /// True if `resource` lies within any root at the given depth.
    pub fn covers(&self, resource: &Resource, depth: Depth) -> bool {
        self.roots
            .iter()
            .filter_map(|root| resource.distance_from(root))
            .any(|d| depth.admits(d))
    }

    /// Iterates roots in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.iter()
    }
}

/// Comparison outcome of a single resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    InSync,
    Incoming,
    Outgoing,
    Conflicting,
}

/// One sync-info change reported by a subscriber during a refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncChange {
    pub resource: Resource,
    pub kind: ChangeKind,
}

impl SyncChange {
    pub fn new(resource: impl Into<Resource>, kind: ChangeKind) -> Self {
        Self {
            resource: resource.into(),
            kind,
        }
    }

    /// True unless the resource ended up in sync.
    pub fn is_out_of_sync(&self) -> bool {
        self.kind != ChangeKind::InSync
    }
}
