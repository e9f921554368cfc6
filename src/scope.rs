use futures::future::{AbortHandle, Abortable};
use futures::{Stream, StreamExt};
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

#[derive(Default)]
struct Inner {
    closed: Cell<bool>,
    next_id: Cell<u64>,
    running: RefCell<Vec<(u64, AbortHandle)>>,
}

/// Ties async work to the lifetime of a view.
///
/// Closing the scope aborts every future started through [`ViewScope::run`],
/// and anything that finishes afterwards is dropped instead of being handed
/// back to a view that no longer exists.
#[derive(Clone, Default)]
pub struct ViewScope {
    inner: Rc<Inner>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.inner.closed.get()
    }

    /// Resolves to `None` when the scope closes before `future` completes.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        if !self.is_active() {
            return None;
        }
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.running.borrow_mut().push((id, handle));

        let output = Abortable::new(future, registration).await.ok();

        self.inner
            .running
            .borrow_mut()
            .retain(|(running, _)| *running != id);
        output.filter(|_| self.is_active())
    }

    pub fn close(&self) {
        self.inner.closed.set(true);
        for (_, handle) in self.inner.running.borrow_mut().drain(..) {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.inner.running.borrow().len()
    }
}

/// Calls `on_tick` for every tick, waiting for each call to finish before
/// taking the next one. Ends when the tick stream does.
pub async fn poll_every<S, F, Fut>(ticks: S, mut on_tick: F)
where
    S: Stream<Item = ()>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticks = std::pin::pin!(ticks);
    while ticks.next().await.is_some() {
        on_tick().await;
    }
}
