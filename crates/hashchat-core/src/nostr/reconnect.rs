//! Reconnection state machine for the active relay.
//!
//! Pure: it is driven by `on_closed` and `on_timer_fired` and only answers with
//! what the runtime should do next. It never touches the pool itself.

use std::time::Duration;

use crate::constants::{CLOSED_BY_US, RECONNECT_DELAY_SECS};
use crate::tlog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No relay, or we closed it ourselves
    Stopped,
    Connecting,
    Connected,
    /// Dropped; a reconnect timer is pending
    Disconnected,
    /// Timer fired, new pool is being opened
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Intentional local close. Stay down.
    Terminate,
    /// Arm the reconnect timer for this delay.
    Schedule(Duration),
    /// Already handled (timer pending, attempt in flight, or stopped).
    Ignore,
}

#[derive(Debug)]
pub struct ReconnectController {
    state: ConnectionState,
    relay_url: Option<String>,
    delay: Duration,
    attempts: u32,
}

impl ReconnectController {
    pub fn new() -> Self {
        Self::with_delay(Duration::from_secs(RECONNECT_DELAY_SECS))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: ConnectionState::Stopped,
            relay_url: None,
            delay,
            attempts: 0,
        }
    }

    // ===== Query Methods =====

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn relay_url(&self) -> Option<&str> {
        self.relay_url.as_deref()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reconnect attempts since the last successful connection
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    // ===== Transitions =====

    pub fn on_connecting(&mut self, relay_url: &str) {
        self.relay_url = Some(relay_url.to_string());
        self.state = ConnectionState::Connecting;
    }

    pub fn on_connected(&mut self) {
        if self.attempts > 0 {
            tlog!("RECONNECT", "Reconnected after {} attempt(s)", self.attempts);
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
    }

    /// A close signal arrived with these reasons.
    pub fn on_closed<S: AsRef<str>>(&mut self, reasons: &[S]) -> CloseDecision {
        if reasons.iter().any(|r| r.as_ref() == CLOSED_BY_US) {
            tlog!("RECONNECT", "Closed by us, not reconnecting");
            self.state = ConnectionState::Stopped;
            return CloseDecision::Terminate;
        }

        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                let joined: Vec<&str> = reasons.iter().map(AsRef::as_ref).collect();
                tlog!(
                    "RECONNECT",
                    "Relay closed ({}), reconnecting in {:?}",
                    joined.join(", "),
                    self.delay
                );
                self.state = ConnectionState::Disconnected;
                CloseDecision::Schedule(self.delay)
            }
            ConnectionState::Stopped
            | ConnectionState::Disconnected
            | ConnectionState::Reconnecting => CloseDecision::Ignore,
        }
    }

    /// Opening the pool failed. Counts as a close so retries continue.
    pub fn on_connect_failed(&mut self, error: &str) -> CloseDecision {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                tlog!("RECONNECT", "Connect failed: {}", error);
                self.state = ConnectionState::Disconnected;
                CloseDecision::Schedule(self.delay)
            }
            _ => CloseDecision::Ignore,
        }
    }

    /// Returns the relay to reconnect to, or `None` if the timer is stale.
    pub fn on_timer_fired(&mut self) -> Option<String> {
        if self.state != ConnectionState::Disconnected {
            return None;
        }
        let url = self.relay_url.clone()?;
        self.state = ConnectionState::Reconnecting;
        self.attempts += 1;
        tlog!("RECONNECT", "Reconnect attempt {} to {}", self.attempts, url);
        Some(url)
    }

    pub fn on_intentional_close(&mut self) {
        self.state = ConnectionState::Stopped;
    }
}

impl Default for ReconnectController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELAY: &str = "wss://relay.example.com";

    fn connected() -> ReconnectController {
        let mut controller = ReconnectController::new();
        controller.on_connecting(RELAY);
        controller.on_connected();
        controller
    }

    #[test]
    fn test_unexpected_close_schedules_exactly_one_attempt() {
        let mut controller = connected();

        let decision = controller.on_closed(&["connection reset"]);
        assert_eq!(decision, CloseDecision::Schedule(Duration::from_secs(5)));
        assert_eq!(controller.state(), ConnectionState::Disconnected);

        // a second close while the timer is pending changes nothing
        assert_eq!(controller.on_closed(&["eof"]), CloseDecision::Ignore);

        assert_eq!(controller.on_timer_fired().as_deref(), Some(RELAY));
        assert_eq!(controller.state(), ConnectionState::Reconnecting);
        assert_eq!(controller.on_timer_fired(), None);
        assert_eq!(controller.attempts(), 1);
    }

    #[test]
    fn test_sentinel_close_terminates() {
        let mut controller = connected();
        let decision = controller.on_closed(&["other", CLOSED_BY_US]);
        assert_eq!(decision, CloseDecision::Terminate);
        assert_eq!(controller.state(), ConnectionState::Stopped);
        assert_eq!(controller.on_timer_fired(), None);
    }

    #[test]
    fn test_failed_reconnect_keeps_retrying() {
        let mut controller = connected();
        controller.on_closed(&["eof"]);
        controller.on_timer_fired();

        let decision = controller.on_connect_failed("refused");
        assert!(matches!(decision, CloseDecision::Schedule(_)));
        assert_eq!(controller.on_timer_fired().as_deref(), Some(RELAY));
        assert_eq!(controller.attempts(), 2);

        controller.on_connected();
        assert_eq!(controller.state(), ConnectionState::Connected);
        assert_eq!(controller.attempts(), 0);
    }

    #[test]
    fn test_close_while_stopped_is_ignored() {
        let mut controller = ReconnectController::new();
        assert_eq!(controller.on_closed(&["eof"]), CloseDecision::Ignore);

        let mut controller = connected();
        controller.on_intentional_close();
        assert_eq!(controller.on_closed(&["eof"]), CloseDecision::Ignore);
    }
}
