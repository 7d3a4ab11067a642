use crate::spatial::PixelRect;
use std::collections::HashMap;
use std::fmt;

/// Content address of an artifact: which texture, which rectangle of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    /// Texture identity.
    pub texture: String,
    /// Bottom-up slice space.
    pub rect: PixelRect,
}

impl ArtifactKey {
    /// Key for `rect` of `texture`.
    pub fn new(texture: impl Into<String>, rect: PixelRect) -> Self {
        ArtifactKey {
            texture: texture.into(),
            rect,
        }
    }

    /// Stable artifact name. Depends only on the key, never on list position.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let PixelRect {
            x,
            y,
            width,
            height,
        } = self.rect;
        write!(f, "{}_{x}_{y}_{width}_{height}", self.texture)
    }
}

/// Insertion index of a cached artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(pub usize);

/// Keyed arena holding at most one value per [`ArtifactKey`].
///
/// One cache lives for one build; it is never shared between tilesets.
/// Values are kept in insertion order, so ids double as stable indices.
pub struct ArtifactCache<T> {
    entries: Vec<(ArtifactKey, T)>,
    by_key: HashMap<ArtifactKey, ArtifactId>,
    by_name: HashMap<String, ArtifactId>,
}

impl<T> Default for ArtifactCache<T> {
    fn default() -> Self {
        ArtifactCache {
            entries: Vec::new(),
            by_key: HashMap::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T> ArtifactCache<T> {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was built.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is cached.
    pub fn contains(&self, key: &ArtifactKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Id of a cached key.
    pub fn id_of(&self, key: &ArtifactKey) -> Option<ArtifactId> {
        self.by_key.get(key).copied()
    }

    /// Value cached for `key`.
    pub fn get(&self, key: &ArtifactKey) -> Option<&T> {
        self.id_of(key).and_then(|id| self.get_by_id(id))
    }

    /// Value by insertion index.
    pub fn get_by_id(&self, id: ArtifactId) -> Option<&T> {
        self.entries.get(id.0).map(|(_, v)| v)
    }

    /// Looks up by [`ArtifactKey::name`].
    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).and_then(|&id| self.get_by_id(id))
    }

    /// Id by artifact name.
    pub fn id_by_name(&self, name: &str) -> Option<ArtifactId> {
        self.by_name.get(name).copied()
    }

    /// Returns the existing value for `key`, or builds and stores one.
    /// The flag is true when `create` ran.
    pub fn get_or_create(
        &mut self,
        key: ArtifactKey,
        create: impl FnOnce(&ArtifactKey) -> T,
    ) -> (ArtifactId, bool) {
        if let Some(id) = self.id_of(&key) {
            return (id, false);
        }
        let value = create(&key);
        (self.insert_new(key, value), true)
    }

    /// Stores a value built elsewhere. Refuses to replace an existing key and
    /// hands back the id already holding it.
    pub fn commit(&mut self, key: ArtifactKey, value: T) -> Result<ArtifactId, ArtifactId> {
        match self.id_of(&key) {
            Some(existing) => Err(existing),
            None => Ok(self.insert_new(key, value)),
        }
    }

    fn insert_new(&mut self, key: ArtifactKey, value: T) -> ArtifactId {
        let id = ArtifactId(self.entries.len());
        self.by_name.insert(key.name(), id);
        self.by_key.insert(key.clone(), id);
        self.entries.push((key, value));
        id
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactKey, &T)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Mutable values in insertion order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &ArtifactKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}
