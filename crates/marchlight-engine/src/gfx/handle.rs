use std::collections::HashMap;

/// Compiled shader stage. Transient: released right after linking.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct StageHandle(pub(crate) u32);

/// Linked program (vertex + fragment stage, uniform block, volume binding).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Vertex buffer + index buffer + vertex layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GeometryHandle(pub(crate) u32);

/// 3-D texture + its sampler.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VolumeHandle(pub(crate) u32);

/// Id-keyed resource table used by backends.
///
/// Ids are never reused, so a stale handle can only miss, not alias a newer
/// resource.
#[derive(Debug)]
pub(crate) struct Slots<T> {
    next: u32,
    items: HashMap<u32, T>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self {
            next: 1,
            items: HashMap::new(),
        }
    }
}

impl<T> Slots<T> {
    pub(crate) fn insert(&mut self, item: T) -> u32 {
        let id = self.next;
        self.next += 1;
        self.items.insert(id, item);
        id
    }

    pub(crate) fn get(&self, id: u32) -> Option<&T> {
        self.items.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: u32) -> Option<T> {
        self.items.remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
