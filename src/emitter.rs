#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<S> = Box<dyn FnMut(&S)>;

/// A list of listeners called in subscription order on every `emit`.
pub struct Emitter<S> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<S>)>,
}

impl<S> Default for Emitter<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<S> Emitter<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&S) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, state: &S) {
        for (_, listener) in &mut self.listeners {
            listener(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_run_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = Emitter::<u32>::new();
        let a = Rc::clone(&seen);
        emitter.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&seen);
        emitter.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        emitter.emit(&3);
        assert_eq!(*seen.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let count = Rc::new(RefCell::new(0));
        let mut emitter = Emitter::<()>::new();
        let c = Rc::clone(&count);
        let id = emitter.subscribe(move |_| *c.borrow_mut() += 1);

        emitter.emit(&());
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        emitter.emit(&());
        assert_eq!(*count.borrow(), 1);
    }
}
