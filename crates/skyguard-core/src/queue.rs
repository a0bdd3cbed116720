//! Outbound dispatch queue.
//!
//! CRITICAL commands jump to the head; everything else is appended. This is
//! a single-tier rule, not a priority ordering: among CRITICAL commands the
//! most recent one wins the front.

use std::collections::VecDeque;

use crate::models::{Command, CommandPriority};

#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, command: Command) {
        if command.priority == CommandPriority::Critical {
            tracing::debug!("Queued CRITICAL command {} at head", command.command_id);
            self.commands.push_front(command);
        } else {
            tracing::debug!("Queued command {} at tail", command.command_id);
            self.commands.push_back(command);
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Copy of the queue, head first.
    pub fn snapshot(&self) -> Vec<Command> {
        self.commands.iter().cloned().collect()
    }

    /// First queued command addressed to `drone_id`, left in place.
    pub fn peek_for_drone(&self, drone_id: &str) -> Option<Command> {
        self.commands
            .iter()
            .find(|command| command.target_drone_id == drone_id)
            .cloned()
    }

    /// Remove the first queued entry with `command_id`. Commands are never
    /// dropped otherwise; consumers must acknowledge what they deliver.
    pub fn acknowledge(&mut self, command_id: &str) -> bool {
        match self
            .commands
            .iter()
            .position(|command| command.command_id == command_id)
        {
            Some(index) => {
                self.commands.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandPayload, CommandSource, MovementParams, SourceType};

    fn command(id: &str, drone: &str, priority: CommandPriority) -> Command {
        Command::new(
            id,
            drone,
            CommandPayload::Movement(MovementParams::Hold { duration_secs: 10 }),
            CommandSource::new("op-1", SourceType::User, "OPERATOR"),
        )
        .with_priority(priority)
    }

    fn ids(queue: &CommandQueue) -> Vec<String> {
        queue.snapshot().into_iter().map(|c| c.command_id).collect()
    }

    #[test]
    fn test_fifo_for_non_critical() {
        let mut queue = CommandQueue::new();
        queue.enqueue(command("A", "D1", CommandPriority::Low));
        queue.enqueue(command("B", "D1", CommandPriority::High));
        queue.enqueue(command("C", "D1", CommandPriority::Medium));
        assert_eq!(ids(&queue), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_critical_jumps_to_head() {
        let mut queue = CommandQueue::new();
        queue.enqueue(command("A", "D1", CommandPriority::Medium));
        queue.enqueue(command("B", "D1", CommandPriority::Medium));
        queue.enqueue(command("X", "D1", CommandPriority::Critical));
        queue.enqueue(command("Y", "D1", CommandPriority::Critical));
        assert_eq!(ids(&queue), vec!["Y", "X", "A", "B"]);
    }

    #[test]
    fn test_peek_and_acknowledge() {
        let mut queue = CommandQueue::new();
        queue.enqueue(command("A", "D1", CommandPriority::Medium));
        queue.enqueue(command("B", "D2", CommandPriority::Medium));

        let next = queue.peek_for_drone("D2").unwrap();
        assert_eq!(next.command_id, "B");
        assert_eq!(queue.len(), 2);

        assert!(queue.acknowledge("B"));
        assert!(!queue.acknowledge("B"));
        assert!(queue.peek_for_drone("D2").is_none());
        assert_eq!(queue.len(), 1);
    }
}
