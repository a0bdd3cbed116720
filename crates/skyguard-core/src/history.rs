//! Bounded command history.
//!
//! Maps command id to the last recorded state. Re-recording an id replaces
//! the stored command but keeps its original position, so eviction is by
//! first insertion, not by last write.

use std::collections::{HashMap, VecDeque};

use crate::models::{Command, CommandStatus};

pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct CommandHistory {
    capacity: usize,
    entries: HashMap<String, Command>,
    order: VecDeque<String>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl CommandHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or overwrite `command`, evicting the oldest entry on overflow.
    pub fn record(&mut self, command: Command) {
        let id = command.command_id.clone();
        if self.entries.insert(id.clone(), command).is_none() {
            self.order.push_back(id);
        }

        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!("History full, evicted command {}", oldest);
            }
        }
    }

    pub fn get(&self, command_id: &str) -> Option<&Command> {
        self.entries.get(command_id)
    }

    pub fn status_of(&self, command_id: &str) -> Option<CommandStatus> {
        self.entries.get(command_id).map(|command| command.status)
    }

    /// Up to `limit` most recently inserted commands, newest first.
    pub fn recent(&self, limit: usize) -> Vec<Command> {
        self.order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }
}
