//! Per-chat conversation state kept in memory.
//!
//! Sessions are bounded by an LRU capacity and expire after an idle TTL, so
//! abandoned chats do not accumulate.

use crate::cart::Cart;
use crate::conversation::ConversationState;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Product the user picked and is still configuring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLine {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

#[derive(Clone)]
pub struct BotSession {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub email: Option<String>,
    pub state: ConversationState,
    pub cart: Cart,
    pub pending: Option<PendingLine>,
    pub last_order_id: Option<i64>,
    pub last_payment_id: Option<i64>,
    touched_at: Instant,
}

impl BotSession {
    fn new(now: Instant) -> Self {
        Self {
            access: None,
            refresh: None,
            email: None,
            state: ConversationState::default(),
            cart: Cart::default(),
            pending: None,
            last_order_id: None,
            last_payment_id: None,
            touched_at: now,
        }
    }

    /// Back to the menu, keeping the sign-in.
    pub fn reset(&mut self) {
        self.state = ConversationState::Menu;
        self.cart.clear();
        self.pending = None;
    }
}

impl std::fmt::Debug for BotSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSession")
            .field("signed_in", &self.access.is_some())
            .field("email", &self.email)
            .field("state", &self.state)
            .field("cart", &self.cart)
            .field("pending", &self.pending)
            .field("last_order_id", &self.last_order_id)
            .field("last_payment_id", &self.last_payment_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<LruCache<i64, BotSession>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
            ttl,
        }
    }

    /// Runs `f` on the chat's session, creating a fresh one when it is
    /// missing or idle past the TTL.
    pub fn with_session<R>(
        &self,
        chat_id: i64,
        now: Instant,
        f: impl FnOnce(&mut BotSession) -> R,
    ) -> R {
        let mut cache = self.inner.lock();
        let expired = cache
            .peek(&chat_id)
            .is_some_and(|s| now.saturating_duration_since(s.touched_at) > self.ttl);
        if expired {
            cache.pop(&chat_id);
        }
        let session = cache.get_or_insert_mut(chat_id, || BotSession::new(now));
        session.touched_at = now;
        f(session)
    }

    /// A copy of the live session, if any.
    pub fn get(&self, chat_id: i64, now: Instant) -> Option<BotSession> {
        let cache = self.inner.lock();
        cache
            .peek(&chat_id)
            .filter(|s| now.saturating_duration_since(s.touched_at) <= self.ttl)
            .cloned()
    }

    pub fn remove(&self, chat_id: i64) -> Option<BotSession> {
        self.inner.lock().pop(&chat_id)
    }

    /// Drops every idle session; returns how many went.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut cache = self.inner.lock();
        let stale: Vec<i64> = cache
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.touched_at) > self.ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            cache.pop(id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
