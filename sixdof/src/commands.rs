use std::collections::BTreeMap;

/// The latest value written to a command mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// increases with every write to the channel
    pub sequence: u64,
    pub values: Vec<f64>,
}

/// Delivers commanded inputs keyed by subsystem name: wheel motor torques
/// (N·m) or thruster on-time requests (s), one value per actuator.
pub trait CommandSource {
    fn latest(&self, subsystem: &str) -> Option<&Command>;
}

/// Mailbox holding the most recent command for each subsystem.
#[derive(Debug, Clone, Default)]
pub struct CommandChannel {
    next_sequence: u64,
    commands: BTreeMap<String, Command>,
}

impl CommandChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the command for `subsystem`. Returns the sequence number of the write.
    pub fn write(&mut self, subsystem: &str, values: &[f64]) -> u64 {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.commands.insert(
            subsystem.to_string(),
            Command {
                sequence,
                values: values.to_vec(),
            },
        );
        sequence
    }
}

impl CommandSource for CommandChannel {
    fn latest(&self, subsystem: &str) -> Option<&Command> {
        self.commands.get(subsystem)
    }
}

/// A source that never has anything to say.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommands;

impl CommandSource for NoCommands {
    fn latest(&self, _subsystem: &str) -> Option<&Command> {
        None
    }
}

/// Whether a command read now is new, relative to the last sequence consumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Freshness<'a> {
    Fresh(&'a Command),
    Stale,
}

pub(crate) fn freshness<'a>(command: Option<&'a Command>, last_seen: Option<u64>) -> Freshness<'a> {
    match (command, last_seen) {
        (Some(c), Some(seen)) if c.sequence <= seen => Freshness::Stale,
        (Some(c), _) => Freshness::Fresh(c),
        (None, _) => Freshness::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sequences() {
        let mut channel = CommandChannel::new();
        assert!(channel.latest("rw").is_none());
        let s1 = channel.write("rw", &[0.02, 0.01, -0.05]);
        let s2 = channel.write("thrusters", &[10.0]);
        assert!(s2 > s1);
        assert_eq!(channel.latest("rw").map(|c| c.values.len()), Some(3));
        assert!(NoCommands.latest("rw").is_none());
    }

    #[test]
    fn test_freshness() {
        let mut channel = CommandChannel::new();
        assert_eq!(freshness(channel.latest("rw"), None), Freshness::Stale);
        let s = channel.write("rw", &[1.0]);
        assert!(matches!(freshness(channel.latest("rw"), None), Freshness::Fresh(_)));
        assert_eq!(freshness(channel.latest("rw"), Some(s)), Freshness::Stale);
        channel.write("rw", &[2.0]);
        assert!(matches!(freshness(channel.latest("rw"), Some(s)), Freshness::Fresh(c) if c.values == vec![2.0]));
    }
}
