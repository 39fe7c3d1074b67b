//! Matches `permission_result` replies to the checks waiting on them.
//!
//! Each check registers a one-shot waiter under its `(player, permission,
//! op_bypass)` key before the request is written. The reader thread hands a
//! reply to the oldest waiter with the same key without blocking. A reply
//! with no waiter is dropped; replies never cross keys.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::Result;
use crate::outbound::Outbound;
use crate::protocol::{check_permission, PermissionQuery, PermissionReply};

/// Correlation identity of a permission check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionKey {
    pub player: String,
    pub permission: String,
    pub op_bypass: bool,
}

impl From<&PermissionQuery> for PermissionKey {
    fn from(query: &PermissionQuery) -> Self {
        Self {
            player: query.player.clone(),
            permission: query.permission.clone(),
            op_bypass: query.op_bypass,
        }
    }
}

impl From<&PermissionReply> for PermissionKey {
    fn from(reply: &PermissionReply) -> Self {
        Self {
            player: reply.player.clone(),
            permission: reply.permission.clone(),
            op_bypass: reply.op_bypass,
        }
    }
}

/// Counters for observing correlator behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelatorStats {
    /// Replies handed to a waiting check.
    pub delivered: u64,
    /// Replies that arrived with no matching waiter.
    pub dropped: u64,
    /// Checks that gave up waiting.
    pub timed_out: u64,
    /// Checks denied because too many were already outstanding.
    pub overflowed: u64,
}

struct Waiter {
    id: u64,
    tx: SyncSender<bool>,
}

#[derive(Default)]
struct WaiterTable {
    by_key: HashMap<PermissionKey, VecDeque<Waiter>>,
    len: usize,
}

impl WaiterTable {
    fn push(&mut self, key: PermissionKey, waiter: Waiter) {
        self.by_key.entry(key).or_default().push_back(waiter);
        self.len += 1;
    }

    fn pop(&mut self, key: &PermissionKey) -> Option<Waiter> {
        let queue = self.by_key.get_mut(key)?;
        let waiter = queue.pop_front();
        if queue.is_empty() {
            self.by_key.remove(key);
        }
        if waiter.is_some() {
            self.len -= 1;
        }
        waiter
    }

    fn remove(&mut self, key: &PermissionKey, id: u64) -> bool {
        let Some(queue) = self.by_key.get_mut(key) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|waiter| waiter.id != id);
        let removed = queue.len() < before;
        if queue.is_empty() {
            self.by_key.remove(key);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }
}

/// Issues permission checks and routes their replies.
pub struct PermissionCorrelator {
    timeout: Duration,
    max_pending: usize,
    waiters: Mutex<WaiterTable>,
    next_id: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    timed_out: AtomicU64,
    overflowed: AtomicU64,
}

impl PermissionCorrelator {
    pub fn new(timeout: Duration, max_pending: usize) -> Self {
        Self {
            timeout,
            max_pending,
            waiters: Mutex::new(WaiterTable::default()),
            next_id: AtomicU64::new(1),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            overflowed: AtomicU64::new(0),
        }
    }

    /// Ask the host whether the query holds and wait for the answer.
    ///
    /// Blocks the calling thread for at most the configured timeout. Returns
    /// `Ok(false)` on denial, timeout, or when too many checks are pending.
    /// Errors only if the request could not be written.
    pub fn check(&self, outbound: &Outbound, query: &PermissionQuery) -> Result<bool> {
        let key = PermissionKey::from(query);
        let request = check_permission(query)?;
        let (id, rx) = match self.register(key.clone()) {
            Some(registered) => registered,
            None => {
                self.overflowed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    player = %query.player,
                    permission = %query.permission,
                    max_pending = self.max_pending,
                    "too many pending permission checks, denying"
                );
                return Ok(false);
            }
        };

        if let Err(err) = outbound.send(&request) {
            self.lock().remove(&key, id);
            return Err(err);
        }

        match rx.recv_timeout(self.timeout) {
            Ok(granted) => Ok(granted),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                if self.lock().remove(&key, id) {
                    self.timed_out.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(
                        player = %query.player,
                        permission = %query.permission,
                        timeout = ?self.timeout,
                        "permission check timed out"
                    );
                    return Ok(false);
                }
                // Delivered between the timeout and the removal.
                Ok(rx.try_recv().unwrap_or(false))
            }
        }
    }

    /// Hand a reply to the oldest check waiting on the same key.
    ///
    /// Never blocks. Returns false if no check was waiting.
    pub fn deliver(&self, reply: &PermissionReply) -> bool {
        let key = PermissionKey::from(reply);
        let waiter = self.lock().pop(&key);

        let delivered = waiter
            .map(|waiter| waiter.tx.try_send(reply.has_permission).is_ok())
            .unwrap_or(false);

        if delivered {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                player = %reply.player,
                permission = %reply.permission,
                op_bypass = reply.op_bypass,
                "dropping permission reply with no waiting check"
            );
        }
        delivered
    }

    /// Number of checks currently waiting for a reply.
    pub fn pending(&self) -> usize {
        self.lock().len
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
        }
    }

    fn register(&self, key: PermissionKey) -> Option<(u64, Receiver<bool>)> {
        let mut table = self.lock();
        if table.len >= self.max_pending {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::sync_channel(1);
        table.push(key, Waiter { id, tx });
        Some((id, rx))
    }

    // Table updates never panic halfway; a poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, WaiterTable> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PermissionCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCorrelator")
            .field("timeout", &self.timeout)
            .field("max_pending", &self.max_pending)
            .field("pending", &self.pending())
            .field("stats", &self.stats())
            .finish()
    }
}
