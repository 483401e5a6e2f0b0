//! Incident resolution bus
//!
//! Publish/subscribe channel that lets independently polling components
//! prune a resolved incident before their next scheduled fetch.

use tokio::sync::broadcast;

/// Broadcast when an incident has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct IncidentResolved {
    pub id: i64,
}

#[derive(Clone)]
pub struct ResolutionBus {
    tx: broadcast::Sender<IncidentResolved>,
}

impl ResolutionBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Returns the number of subscribers that will see the event
    pub fn publish(&self, id: i64) -> usize {
        self.tx.send(IncidentResolved { id }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IncidentResolved> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ResolutionBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = ResolutionBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(42), 2);
        assert_eq!(a.recv().await.unwrap(), IncidentResolved { id: 42 });
        assert_eq!(b.recv().await.unwrap().id, 42);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = ResolutionBus::new();
        assert_eq!(bus.publish(1), 0);
    }
}
