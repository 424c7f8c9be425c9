//! Pending-work queue plus the session-wide visited set.
//!
//! Admission is decided once, at enqueue time: an identifier that was ever
//! admitted is never admitted again, so nothing is processed twice. The queue
//! is FIFO, which makes the traversal breadth-first: entries at depth `d` are
//! all dequeued before any depth `d + 1` entry discovered from them.

use std::collections::{HashMap, VecDeque};

use reach_common::{FrontierConfig, Identifier, Origin, OverflowPolicy};

/// One unit of pending work. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    pub identifier: Identifier,
    pub depth: u32,
    pub origin: Origin,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AlreadyVisited,
    /// Frontier at capacity; dropped as backpressure, not an error.
    AtCapacity,
}

pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    /// Every identifier ever admitted (or dropped under `MarkVisited`), with
    /// how it got here. Append-only for the life of the session.
    visited: HashMap<Identifier, Origin>,
    capacity: usize,
    overflow: OverflowPolicy,
    admitted_total: usize,
}

impl Frontier {
    pub fn new(config: &FrontierConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashMap::new(),
            capacity: config.capacity,
            overflow: config.overflow,
            admitted_total: 0,
        }
    }

    pub fn try_admit(&mut self, identifier: Identifier, depth: u32, origin: Origin) -> Admission {
        if self.visited.contains_key(&identifier) {
            return Admission::AlreadyVisited;
        }
        if self.queue.len() >= self.capacity {
            if self.overflow == OverflowPolicy::MarkVisited {
                self.visited.insert(identifier, origin);
            }
            return Admission::AtCapacity;
        }
        self.visited.insert(identifier.clone(), origin.clone());
        self.queue.push_back(FrontierEntry {
            identifier,
            depth,
            origin,
        });
        self.admitted_total += 1;
        Admission::Admitted
    }

    /// Returns false (and does nothing) if already visited or at capacity.
    pub fn admit(&mut self, identifier: impl Into<Identifier>, depth: u32, origin: Origin) -> bool {
        self.try_admit(identifier.into(), depth, origin) == Admission::Admitted
    }

    pub fn take_next(&mut self) -> Option<FrontierEntry> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn is_visited(&self, identifier: &str) -> bool {
        self.visited.contains_key(identifier)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Entries ever created. Never exceeds `visited_count()`.
    pub fn admitted_total(&self) -> usize {
        self.admitted_total
    }

    /// Provenance trail from the seed topic down to `identifier`,
    /// e.g. `#luxury > @a > @d`.
    pub fn discovery_path(&self, identifier: &str) -> String {
        let mut trail = vec![format!("@{identifier}")];
        let mut current = identifier;
        // parents are admitted before their children, so the walk ends at a
        // seed; the bound only guards against a corrupted map
        for _ in 0..=self.visited.len() {
            match self.visited.get(current) {
                Some(Origin::Account { parent }) => {
                    trail.push(format!("@{parent}"));
                    current = parent;
                }
                Some(seed @ Origin::Seed { .. }) => {
                    trail.push(seed.to_string());
                    break;
                }
                Some(Origin::Given) | None => break,
            }
        }
        trail.reverse();
        trail.join(" > ")
    }
}
