use std::collections::BTreeMap;

use crate::{MessageSink, ResultErrors, StateMessage};

/// Keeps every message in memory. Used by tests and short scenarios.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    states: Vec<StateMessage>,
    observables: BTreeMap<String, Vec<(u64, Vec<f64>)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> &[StateMessage] {
        &self.states
    }

    pub fn last_state(&self) -> Option<&StateMessage> {
        self.states.last()
    }

    /// Time history of one observable, empty if it was never recorded.
    pub fn observable(&self, name: &str) -> &[(u64, Vec<f64>)] {
        self.observables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn observable_names(&self) -> impl Iterator<Item = &str> {
        self.observables.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.observables.clear();
    }
}

impl MessageSink for MemoryLog {
    fn publish_state(&mut self, message: &StateMessage) -> Result<(), ResultErrors> {
        self.states.push(message.clone());
        Ok(())
    }

    fn record_observable(
        &mut self,
        time_ns: u64,
        name: &str,
        values: &[f64],
    ) -> Result<(), ResultErrors> {
        let history = self.observables.entry(name.to_string()).or_default();
        if let Some((_, first)) = history.first() {
            if first.len() != values.len() {
                return Err(ResultErrors::ObservableLength {
                    name: name.to_string(),
                    expected: first.len(),
                    found: values.len(),
                });
            }
        }
        history.push((time_ns, values.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_message;

    #[test]
    fn test_memory_log() {
        let mut log = MemoryLog::new();
        log.publish_state(&sample_message(0)).unwrap();
        log.publish_state(&sample_message(100)).unwrap();
        assert_eq!(log.states().len(), 2);
        assert_eq!(log.last_state().map(|m| m.time_ns), Some(100));

        log.record_observable(0, "hinge_angle", &[0.1, 0.0]).unwrap();
        log.record_observable(10, "hinge_angle", &[0.2, 0.1]).unwrap();
        assert!(log.record_observable(20, "hinge_angle", &[0.3]).is_err());
        assert_eq!(log.observable("hinge_angle").len(), 2);
        assert!(log.observable("missing").is_empty());
        assert_eq!(log.observable_names().collect::<Vec<_>>(), vec!["hinge_angle"]);

        log.clear();
        assert!(log.states().is_empty());
    }
}
