use crate::alerts::{Alert, AlertSubscriber};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Bounded alert history
///
/// Fixed-capacity FIFO: once full, each insert evicts the oldest alert.
pub struct AlertHistory {
    capacity: usize,
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, alert: Alert) {
        if self.capacity == 0 {
            return;
        }
        let mut alerts = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
        while alerts.len() >= self.capacity {
            alerts.pop_front();
        }
        alerts.push_back(alert);
    }

    pub fn len(&self) -> usize {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `n` most recent alerts, oldest first
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        let alerts = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = alerts.len().saturating_sub(n);
        alerts.iter().skip(skip).cloned().collect()
    }

    /// Whole buffer, most recent first
    pub fn newest_first(&self) -> Vec<Alert> {
        let alerts = self.alerts.lock().unwrap_or_else(PoisonError::into_inner);
        alerts.iter().rev().cloned().collect()
    }
}

impl AlertSubscriber for AlertHistory {
    fn on_alert(&self, alert: &Alert) {
        self.push(alert.clone());
    }
}
