//! Anti-forgery tokens for the editor form.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use uuid::Uuid;

pub trait NonceVerifier: Send + Sync {
    fn issue(&self, action: &str) -> String;
    /// Accepts a token once; a verified token cannot be replayed.
    fn verify(&self, action: &str, token: &str) -> bool;
}

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Default)]
struct Issued {
    actions: HashMap<String, String>,
    order: VecDeque<String>,
}

/// Single-use tokens bound to an action. The oldest unused tokens are
/// evicted once `capacity` are outstanding.
pub struct SessionNonces {
    capacity: usize,
    issued: Mutex<Issued>,
}

impl Default for SessionNonces {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SessionNonces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            issued: Mutex::new(Issued::default()),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.issued.lock().actions.len()
    }
}

impl NonceVerifier for SessionNonces {
    fn issue(&self, action: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut guard = self.issued.lock();
        let issued = &mut *guard;
        while issued.actions.len() >= self.capacity {
            match issued.order.pop_front() {
                Some(oldest) => {
                    issued.actions.remove(&oldest);
                }
                None => break,
            }
        }
        issued.actions.insert(token.clone(), action.to_string());
        issued.order.push_back(token.clone());
        token
    }

    fn verify(&self, action: &str, token: &str) -> bool {
        let mut issued = self.issued.lock();
        if issued.actions.get(token).map(String::as_str) != Some(action) {
            return false;
        }
        issued.actions.remove(token);
        issued.order.retain(|queued| queued != token);
        true
    }
}
