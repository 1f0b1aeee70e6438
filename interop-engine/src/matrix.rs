//! Results of a sweep, keyed by (scenario, server, client).

use std::collections::BTreeMap;

use interop_core::ScenarioId;

use crate::outcome::{Outcome, RunResult};

/// Owned by the orchestrator while runs report in, then handed to the
/// reporter. Iteration follows catalog order, then server and client
/// registration order, whatever order runs finished in.
#[derive(Debug, Clone)]
pub struct ResultMatrix {
    scenarios: Vec<ScenarioId>,
    servers: Vec<String>,
    clients: Vec<String>,
    results: BTreeMap<(usize, usize, usize), RunResult>,
}

impl ResultMatrix {
    pub fn new(scenarios: Vec<ScenarioId>, servers: Vec<String>, clients: Vec<String>) -> Self {
        Self {
            scenarios,
            servers,
            clients,
            results: BTreeMap::new(),
        }
    }

    fn key(&self, scenario: ScenarioId, server: &str, client: &str) -> Option<(usize, usize, usize)> {
        let s = self.scenarios.iter().position(|id| *id == scenario)?;
        let srv = self.servers.iter().position(|name| name == server)?;
        let cli = self.clients.iter().position(|name| name == client)?;
        Some((s, srv, cli))
    }

    /// Records a result. Returns `false` for a combination outside the sweep.
    pub fn insert(&mut self, result: RunResult) -> bool {
        match self.key(result.scenario, &result.server, &result.client) {
            Some(key) => {
                self.results.insert(key, result);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, scenario: ScenarioId, server: &str, client: &str) -> Option<&RunResult> {
        self.key(scenario, server, client)
            .and_then(|key| self.results.get(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of combinations in the sweep.
    pub fn capacity(&self) -> usize {
        self.scenarios.len() * self.servers.len() * self.clients.len()
    }

    pub fn is_complete(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Combinations without a result, in report order.
    pub fn missing(&self) -> Vec<(ScenarioId, String, String)> {
        let mut missing = Vec::new();
        for (s, scenario) in self.scenarios.iter().enumerate() {
            for (srv, server) in self.servers.iter().enumerate() {
                for (cli, client) in self.clients.iter().enumerate() {
                    if !self.results.contains_key(&(s, srv, cli)) {
                        missing.push((*scenario, server.clone(), client.clone()));
                    }
                }
            }
        }
        missing
    }

    pub fn has_defects(&self) -> bool {
        self.iter().any(|r| r.outcome.is_defect())
    }

    /// Counts of success, unimplemented, failure and timeout.
    pub fn tally(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for result in self.iter() {
            let slot = match result.outcome {
                Outcome::Success => 0,
                Outcome::Unimplemented => 1,
                Outcome::Failure(_) => 2,
                Outcome::Timeout => 3,
            };
            counts[slot] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(scenario: ScenarioId, server: &str, client: &str, outcome: Outcome) -> RunResult {
        RunResult {
            scenario,
            client: client.into(),
            server: server.into(),
            outcome,
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut matrix = ResultMatrix::new(
            vec![ScenarioId::Handshake, ScenarioId::Greeting],
            vec!["s2n-tls".into(), "openssl".into()],
            vec!["rustls".into(), "java".into()],
        );
        // finish in reverse
        for scenario in [ScenarioId::Greeting, ScenarioId::Handshake] {
            for server in ["openssl", "s2n-tls"] {
                for client in ["java", "rustls"] {
                    assert!(matrix.insert(result(scenario, server, client, Outcome::Success)));
                }
            }
        }
        assert!(matrix.is_complete());

        let order: Vec<_> = matrix
            .iter()
            .map(|r| (r.scenario, r.server.as_str(), r.client.as_str()))
            .collect();
        assert_eq!(order[0], (ScenarioId::Handshake, "s2n-tls", "rustls"));
        assert_eq!(order[1], (ScenarioId::Handshake, "s2n-tls", "java"));
        assert_eq!(order[2], (ScenarioId::Handshake, "openssl", "rustls"));
        assert_eq!(order[7], (ScenarioId::Greeting, "openssl", "java"));
    }

    #[test]
    fn foreign_results_are_rejected_and_gaps_reported() {
        let mut matrix = ResultMatrix::new(
            vec![ScenarioId::Handshake],
            vec!["openssl".into()],
            vec!["rustls".into(), "go".into()],
        );
        assert!(!matrix.insert(result(ScenarioId::Greeting, "openssl", "rustls", Outcome::Success)));
        assert!(matrix.insert(result(ScenarioId::Handshake, "openssl", "go", Outcome::Timeout)));

        assert_eq!(
            matrix.missing(),
            vec![(ScenarioId::Handshake, "openssl".to_string(), "rustls".to_string())]
        );
        assert!(matrix.has_defects());
        assert_eq!(matrix.tally(), [0, 0, 0, 1]);
    }
}
