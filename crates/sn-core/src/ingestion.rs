//! Alert ingestion.
//!
//! Producers push alerts into a bounded channel; the orchestrator drains
//! it. A closed channel is not reopened.

use crate::incident::{Alert, AlertSeverity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

pub type AlertSender = mpsc::Sender<Alert>;
pub type AlertReceiver = mpsc::Receiver<Alert>;

/// Creates the bounded alert channel.
pub fn alert_channel(capacity: usize) -> (AlertSender, AlertReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Default chance that a simulator tick emits an alert.
pub const DEFAULT_EMISSION_PROBABILITY: f64 = 0.7;

/// Emits synthetic infrastructure alerts at a fixed interval.
pub struct AlertSimulator {
    interval: Duration,
    probability: f64,
    rng: StdRng,
}

impl AlertSimulator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            probability: DEFAULT_EMISSION_PROBABILITY,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixes the random sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Sets the per-tick emission probability, clamped to `[0, 1]`.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Number of distinct scenarios.
    pub fn scenario_count() -> usize {
        5
    }

    /// Builds scenario `index` (modulo the scenario count) as a fresh alert.
    pub fn scenario(index: usize) -> Alert {
        match index % Self::scenario_count() {
            0 => Alert::new("web-server-01", AlertSeverity::Critical, "High CPU usage detected (95%)")
                .with_metadata("cpu_usage", 95)
                .with_metadata("component", "cpu"),
            1 => Alert::new("api-gateway", AlertSeverity::Warning, "Memory leak detected in service")
                .with_metadata("memory_free", "128MB")
                .with_metadata("component", "memory"),
            2 => Alert::new("db-primary", AlertSeverity::Warning, "Disk space low (/var/log)")
                .with_metadata("disk_usage", "92%")
                .with_metadata("mount", "/var/log"),
            3 => Alert::new(
                "search-service",
                AlertSeverity::Info,
                "Service responding slowly (>2s latency)",
            )
            .with_metadata("latency_ms", json!(2500)),
            _ => Alert::new("inventory-db", AlertSeverity::Fatal, "Database connection refused")
                .with_metadata("error_code", 5003),
        }
    }

    /// One tick: maybe an alert.
    pub fn next_alert(&mut self) -> Option<Alert> {
        if self.rng.gen::<f64>() < self.probability {
            let index = self.rng.gen_range(0..Self::scenario_count());
            Some(Self::scenario(index))
        } else {
            None
        }
    }

    /// Emits alerts until shutdown is signalled or the receiver is dropped.
    /// Returns how many alerts were sent.
    pub async fn run(mut self, sender: AlertSender, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;
        let mut sent = 0u64;

        info!(interval_ms = self.interval.as_millis() as u64, "Alert simulator started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let Some(alert) = self.next_alert() else {
                continue;
            };
            debug!(alert_id = %alert.id, source = %alert.source, "Simulated alert");
            if sender.send(alert).await.is_err() {
                debug!("Alert receiver closed, stopping simulator");
                break;
            }
            sent += 1;
        }

        info!(sent, "Alert simulator stopped");
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenarios_cover_reference_alerts() {
        let messages: Vec<String> = (0..AlertSimulator::scenario_count())
            .map(|i| AlertSimulator::scenario(i).message)
            .collect();
        assert!(messages[0].contains("CPU"));
        assert!(messages[2].contains("Disk"));
        assert!(messages[4].contains("connection"));
        assert_eq!(
            AlertSimulator::scenario(2).metadata_text("mount").as_deref(),
            Some("/var/log")
        );
    }

    #[test]
    fn test_probability_bounds() {
        let mut never = AlertSimulator::new(Duration::from_secs(1))
            .with_seed(7)
            .with_probability(0.0);
        let mut always = AlertSimulator::new(Duration::from_secs(1))
            .with_seed(7)
            .with_probability(1.5);
        for _ in 0..50 {
            assert!(never.next_alert().is_none());
            assert!(always.next_alert().is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_until_shutdown() {
        let (tx, mut rx) = alert_channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let simulator = AlertSimulator::new(Duration::from_secs(5))
            .with_seed(42)
            .with_probability(1.0);

        let handle = tokio::spawn(simulator.run(tx, shutdown_rx));

        for _ in 0..3 {
            assert!(rx.recv().await.is_some());
        }
        shutdown_tx.send(true).unwrap();
        let sent = handle.await.unwrap();
        assert!(sent >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_receiver_dropped() {
        let (tx, rx) = alert_channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(rx);

        let sent = AlertSimulator::new(Duration::from_millis(10))
            .with_probability(1.0)
            .run(tx, shutdown_rx)
            .await;
        assert_eq!(sent, 0);
    }
}
