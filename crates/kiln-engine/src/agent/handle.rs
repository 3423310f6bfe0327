use std::marker::PhantomData;

use crate::worker::TaskRunner;

use super::{AgentHost, AgentId};

/// Logic-thread handle to a render-thread agent of type `A`.
///
/// The handle only names the agent. `is_live` tells the logic thread whether
/// GPU-visible work can currently be issued; the agent itself is reachable
/// only from tasks running on the render thread.
#[derive(Debug)]
pub struct AgentHandle<A> {
    id: Option<AgentId>,
    _agent: PhantomData<fn() -> A>,
}

impl<A: Send + 'static> AgentHandle<A> {
    /// Reserves an id and posts the task that builds the agent.
    pub fn create<C, F>(runner: &TaskRunner<C>, build: F) -> Self
    where
        C: AgentHost + 'static,
        F: FnOnce(&mut C) -> A + Send + 'static,
    {
        let id = AgentId::allocate();
        runner.post(move |cx| {
            let agent = build(cx);
            cx.agents().insert(id, agent);
        });

        Self {
            id: Some(id),
            _agent: PhantomData,
        }
    }

    /// A handle that never had an agent.
    pub fn detached() -> Self {
        Self {
            id: None,
            _agent: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> Option<AgentId> {
        self.id
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.id.is_some()
    }

    /// Copyable update-only reference, for node handlers that post per-frame
    /// work. `None` once destroyed.
    pub fn agent_ref(&self) -> Option<AgentRef<A>> {
        self.id.map(|id| AgentRef {
            id,
            _agent: PhantomData,
        })
    }

    /// Posts `f` against the agent. Returns `false` (posting nothing) once
    /// the handle has been destroyed.
    pub fn update<C, F>(&self, runner: &TaskRunner<C>, f: F) -> bool
    where
        C: AgentHost + 'static,
        F: FnOnce(&mut A, &mut C) + Send + 'static,
    {
        let Some(id) = self.id else { return false };
        runner.post(move |cx| with_agent(cx, id, f));
        true
    }

    /// Posts the destroy task and forgets the id.
    ///
    /// Callers must detach the owning scene node before calling this.
    pub fn destroy<C, F>(&mut self, runner: &TaskRunner<C>, teardown: F)
    where
        C: AgentHost + 'static,
        F: FnOnce(A, &mut C) + Send + 'static,
    {
        let Some(id) = self.id.take() else {
            debug_assert!(false, "agent destroyed twice");
            return;
        };

        runner.post(move |cx| match cx.agents().remove::<A>(id) {
            Some(agent) => teardown(agent, cx),
            None => log::warn!("destroy task found no agent {id:?}"),
        });
    }
}

/// Update-only view of a live agent.
///
/// Unlike [`AgentHandle`] it cannot destroy the agent, so it may be copied
/// into node handlers. The owner detaches the node before destroying the
/// agent, which keeps every posted update ahead of the destroy task.
#[derive(Debug)]
pub struct AgentRef<A> {
    id: AgentId,
    _agent: PhantomData<fn() -> A>,
}

impl<A> Clone for AgentRef<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for AgentRef<A> {}

impl<A: Send + 'static> AgentRef<A> {
    #[inline]
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn update<C, F>(&self, runner: &TaskRunner<C>, f: F)
    where
        C: AgentHost + 'static,
        F: FnOnce(&mut A, &mut C) + Send + 'static,
    {
        let id = self.id;
        runner.post(move |cx| with_agent(cx, id, f));
    }
}

/// Runs `f` with the agent temporarily lifted out of the store, so the task
/// can use the rest of the context alongside it.
pub(crate) fn with_agent<A, C, F>(cx: &mut C, id: AgentId, f: F)
where
    A: Send + 'static,
    C: AgentHost,
    F: FnOnce(&mut A, &mut C),
{
    let Some(mut agent) = cx.agents().remove::<A>(id) else {
        log::warn!("task for agent {id:?} ran after it was destroyed");
        return;
    };
    f(&mut agent, cx);
    cx.agents().insert(id, agent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct QuadAgent {
        vertices: Vec<[i32; 2]>,
        uploads: u32,
    }

    #[test]
    fn create_update_destroy_in_order() {
        let runner = TaskRunner::dedicated("agents", || Ok(AgentStore::new())).unwrap();

        let mut handle = AgentHandle::<QuadAgent>::create(&runner, |_| QuadAgent::default());
        assert!(handle.is_live());

        assert!(handle.update(&runner, |agent, _| {
            agent.vertices.push([0, 0]);
            agent.uploads += 1;
        }));

        let id = handle.id().unwrap();
        assert_eq!(
            runner.round_trip(move |store| store.get::<QuadAgent>(id).map(|a| a.uploads)),
            Some(Some(1))
        );

        let freed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&freed);
        handle.destroy(&runner, move |agent, _| {
            assert_eq!(agent.vertices, vec![[0, 0]]);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!handle.is_live());
        assert!(!handle.update(&runner, |_, _| unreachable!()));

        runner.wait_synchronize();
        assert_eq!(freed.load(Ordering::SeqCst), 1);
        assert_eq!(runner.round_trip(|store| store.len()), Some(0));
    }

    #[test]
    fn update_sees_rest_of_context() {
        struct Ctx {
            store: AgentStore,
            frame: u32,
        }
        impl AgentHost for Ctx {
            fn agents(&mut self) -> &mut AgentStore {
                &mut self.store
            }
        }

        let runner = TaskRunner::current_thread(Ctx { store: AgentStore::new(), frame: 41 });
        let handle = AgentHandle::<u32>::create(&runner, |cx: &mut Ctx| cx.frame);
        handle.update(&runner, |agent, cx| {
            cx.frame += 1;
            *agent += cx.frame;
        });

        let id = handle.id().unwrap();
        assert_eq!(runner.round_trip(move |cx| cx.store.get::<u32>(id).copied()), Some(Some(83)));
    }

    #[test]
    fn agent_ref_posts_updates() {
        let runner = TaskRunner::current_thread(AgentStore::new());
        let handle = AgentHandle::<Vec<u8>>::create(&runner, |_| Vec::new());
        let agent = handle.agent_ref().unwrap();
        let copy = agent;

        agent.update(&runner, |v, _| v.push(1));
        copy.update(&runner, |v, _| v.push(2));

        let id = agent.id();
        assert_eq!(
            runner.round_trip(move |store| store.get::<Vec<u8>>(id).cloned()),
            Some(Some(vec![1, 2]))
        );
    }

    #[test]
    fn detached_handle_posts_nothing() {
        let runner = TaskRunner::current_thread(AgentStore::new());
        let handle = AgentHandle::<u8>::detached();
        assert!(!handle.is_live());
        assert!(handle.agent_ref().is_none());
        assert!(!handle.update(&runner, |_, _| unreachable!()));
    }
}
