//! Observable UI state owned by an explicit context object.

use log::debug;

use crate::domain::mail::MailId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Box<dyn FnMut(&T) + Send>;

/// A value plus the callbacks that want to hear about it changing.
pub struct Store<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
}

impl<T> Store<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            next_id: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.update(|v| *v = value);
    }

    /// Mutate in place, then notify every subscriber with the new value.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        for (_, sub) in self.subscribers.iter_mut() {
            sub(&self.value);
        }
    }

    pub fn subscribe(&mut self, f: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        before != self.subscribers.len()
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailConfig {
    pub selected: Option<MailId>,
}

/// Everything the views share. Passed down explicitly.
#[derive(Debug, Default)]
pub struct AppContext {
    pub mail: Store<MailConfig>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.mail.get().selected.as_deref()
    }

    pub fn select(&mut self, id: Option<MailId>) {
        if self.mail.get().selected == id {
            return;
        }
        debug!("selected mail: {id:?}");
        self.mail.update(|m| m.selected = id);
    }
}
