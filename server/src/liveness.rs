//! Liveness monitoring
//!
//! Neither transport reliably reports a vanished client: UDP has no close
//! event at all, and a WebSocket peer can disappear without a close frame.
//! Every successfully parsed message refreshes the sender's contact time,
//! and a periodic check evicts anyone silent for longer than the timeout of
//! the transport they arrived on.

use crate::context::ServerContext;
use crate::link::TransportKind;
use log::debug;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_UDP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WS_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    pub udp_timeout: Duration,
    pub ws_timeout: Duration,
    pub check_interval: Duration,
}

impl LivenessPolicy {
    pub fn timeout_for(&self, kind: TransportKind) -> Duration {
        match kind {
            TransportKind::Udp => self.udp_timeout,
            TransportKind::WebSocket => self.ws_timeout,
        }
    }
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self {
            udp_timeout: DEFAULT_UDP_TIMEOUT,
            ws_timeout: DEFAULT_WS_TIMEOUT,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Spawns the periodic eviction task.
pub fn spawn_liveness_monitor(context: Arc<ServerContext>) -> JoinHandle<()> {
    let check_interval = context.policy().check_interval;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let evicted = context.evict_stale(Instant::now()).await;
            if !evicted.is_empty() {
                debug!("Liveness check evicted {:?}", evicted);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::Link;
    use shared::ServerEvent;

    #[test]
    fn test_default_policy() {
        let policy = LivenessPolicy::default();
        assert_eq!(policy.timeout_for(TransportKind::Udp), Duration::from_secs(10));
        assert_eq!(
            policy.timeout_for(TransportKind::WebSocket),
            Duration::from_secs(30)
        );
        assert!(policy.check_interval * 2 <= policy.udp_timeout);
    }

    #[tokio::test]
    async fn test_monitor_evicts_silent_participant() {
        let policy = LivenessPolicy {
            udp_timeout: Duration::from_millis(60),
            ws_timeout: Duration::from_secs(30),
            check_interval: Duration::from_millis(20),
        };
        let context = Arc::new(ServerContext::new(policy));

        let (quiet, mut quiet_inbox) = Link::channel(TransportKind::Udp);
        let (chatty, mut chatty_inbox) = Link::channel(TransportKind::WebSocket);
        context.admit("QUIET", quiet).await.unwrap();
        let chatty_id = context.admit("CHATTY", chatty).await.unwrap().participant_id;

        let monitor = spawn_liveness_monitor(Arc::clone(&context));
        tokio::time::sleep(Duration::from_millis(250)).await;
        monitor.abort();

        assert_eq!(context.snapshot().await.len(), 1);
        assert!(context.snapshot().await.participants()[0].id == chatty_id);

        // The evicted participant's channel is closed once drained
        while quiet_inbox.try_recv().is_ok() {}
        assert!(matches!(
            quiet_inbox.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));

        // The survivor saw a roster with only itself in it
        let mut last_count = None;
        while let Ok(event) = chatty_inbox.try_recv() {
            if let ServerEvent::GameState { player_count, .. } = event {
                last_count = Some(player_count);
            }
        }
        assert_eq!(last_count, Some(1));
    }
}
