use std::any::Any;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique agent name. Allocated on the logic thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(NonZeroU64);

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

impl AgentId {
    pub(crate) fn allocate() -> Self {
        let raw = NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 allocations to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Render-thread owner of every live agent, keyed by [`AgentId`].
///
/// Agents of different types share one store; lookups are typed and return
/// `None` on a type mismatch.
#[derive(Default)]
pub struct AgentStore {
    agents: HashMap<AgentId, Box<dyn Any + Send>>,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<A: Send + 'static>(&mut self, id: AgentId, agent: A) {
        let previous = self.agents.insert(id, Box::new(agent));
        debug_assert!(previous.is_none(), "agent {id:?} created twice");
    }

    pub fn get<A: 'static>(&self, id: AgentId) -> Option<&A> {
        self.agents.get(&id)?.downcast_ref()
    }

    pub fn get_mut<A: 'static>(&mut self, id: AgentId) -> Option<&mut A> {
        self.agents.get_mut(&id)?.downcast_mut()
    }

    /// Takes ownership of the agent back out of the store.
    ///
    /// A type mismatch leaves the entry in place.
    pub fn remove<A: 'static>(&mut self, id: AgentId) -> Option<A> {
        let entry = self.agents.remove(&id)?;
        match entry.downcast::<A>() {
            Ok(agent) => Some(*agent),
            Err(entry) => {
                self.agents.insert(id, entry);
                None
            }
        }
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// A task context that owns an [`AgentStore`].
pub trait AgentHost {
    fn agents(&mut self) -> &mut AgentStore;
}

impl AgentHost for AgentStore {
    fn agents(&mut self) -> &mut AgentStore {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = AgentId::allocate();
        let b = AgentId::allocate();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn typed_lookup() {
        let mut store = AgentStore::new();
        let id = AgentId::allocate();
        store.insert(id, 7u32);

        assert_eq!(store.get::<u32>(id), Some(&7));
        assert_eq!(store.get::<i64>(id), None);

        *store.get_mut::<u32>(id).unwrap() += 1;
        assert_eq!(store.get::<u32>(id), Some(&8));
    }

    #[test]
    fn remove_with_wrong_type_keeps_entry() {
        let mut store = AgentStore::new();
        let id = AgentId::allocate();
        store.insert(id, String::from("agent"));

        assert_eq!(store.remove::<u8>(id), None);
        assert!(store.contains(id));
        assert_eq!(store.remove::<String>(id).as_deref(), Some("agent"));
        assert!(store.is_empty());
    }
}
