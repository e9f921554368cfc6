use log::{info, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Persistent key-value capability holding the single auth token.
pub trait TokenStorage {
    fn load(&self) -> Option<String>;
    fn save(&self, token: &str);
    fn remove(&self);
}

/// `window.localStorage` under a fixed key.
pub struct BrowserStorage {
    key: String,
}

impl BrowserStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// False in private modes and sandboxed frames that refuse local storage.
    pub fn is_available() -> bool {
        matches!(leptos::window().local_storage(), Ok(Some(_)))
    }

    fn storage(&self) -> Option<web_sys::Storage> {
        match leptos::window().local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                warn!("Local storage unavailable {err:?}");
                None
            }
        }
    }
}

impl TokenStorage for BrowserStorage {
    fn load(&self) -> Option<String> {
        self.storage()?
            .get_item(&self.key)
            .ok()
            .flatten()
            .filter(|token| !token.is_empty())
    }

    fn save(&self, token: &str) {
        if let Some(storage) = self.storage() {
            if let Err(err) = storage.set_item(&self.key, token) {
                warn!("Could not persist token {err:?}");
            }
        }
    }

    fn remove(&self) {
        if let Some(storage) = self.storage() {
            if let Err(err) = storage.remove_item(&self.key) {
                warn!("Could not remove token {err:?}");
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    token: RefCell<Option<String>>,
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    fn save(&self, token: &str) {
        *self.token.borrow_mut() = Some(token.to_string());
    }

    fn remove(&self) {
        self.token.borrow_mut().take();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Rc<dyn Fn(SessionEvent)>;

/// Owner of the auth token. Every read and write of the token goes through
/// here, and listeners hear about sign-in and sign-out no matter who caused it.
#[derive(Clone)]
pub struct Session {
    storage: Rc<dyn TokenStorage>,
    listeners: Rc<RefCell<Vec<(Subscription, Listener)>>>,
    next_id: Rc<Cell<u64>>,
}

impl Session {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        Self {
            storage: Rc::new(storage),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(Cell::new(0)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    pub fn token(&self) -> Option<String> {
        self.storage.load()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Stores `token`, replacing any previous one.
    pub fn sign_in(&self, token: &str) {
        self.storage.save(token);
        info!("Session signed in");
        self.emit(SessionEvent::SignedIn);
    }

    /// Drops the token. Listeners only hear about it when there was a token to drop.
    pub fn clear(&self) {
        let had_token = self.is_authenticated();
        self.storage.remove();
        if had_token {
            info!("Session signed out");
            self.emit(SessionEvent::SignedOut);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(SessionEvent) + 'static) -> Subscription {
        let id = Subscription(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .borrow_mut()
            .retain(|(id, _)| *id != subscription);
    }

    fn emit(&self, event: SessionEvent) {
        // Snapshot so a listener may (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}
