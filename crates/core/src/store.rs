//! Observable application state.
//!
//! Every update replaces the state wholesale; subscribers see the latest value.

use tokio::sync::watch;

#[derive(Debug)]
pub struct Store<S> {
    tx: watch::Sender<S>,
}

impl<S: Clone> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Applies `reducer` to the current state and publishes the result.
    pub fn dispatch(&self, reducer: impl FnOnce(&S) -> S) {
        let next = reducer(&self.tx.borrow());
        self.tx.send_replace(next);
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<S: Clone + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[tokio::test]
    async fn test_dispatch_notifies_subscribers() {
        let store = Store::new(Counter::default());
        let mut rx = store.subscribe();

        store.dispatch(|s| Counter { value: s.value + 1 });
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().value, 1);
        assert_eq!(store.snapshot(), Counter { value: 1 });
    }

    #[test]
    fn test_last_dispatch_wins() {
        let store = Store::<Counter>::default();
        store.dispatch(|_| Counter { value: 5 });
        store.dispatch(|_| Counter { value: 2 });
        assert_eq!(store.snapshot().value, 2);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = Store::new(vec![1, 2]);
        let before = store.snapshot();
        store.dispatch(|v| v.iter().map(|x| x * 10).collect());
        assert_eq!(before, vec![1, 2]);
        assert_eq!(store.snapshot(), vec![10, 20]);
    }
}
