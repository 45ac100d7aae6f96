//! Port session management
//!
//! A [`SensorSession`] owns one serial handle for the length of one
//! transaction. Opening applies the sensor's power-up timing; closing runs
//! exactly once, either explicitly or from `Drop`, on every exit path.

use super::transport::{PortOpener, SerialLink, TransportError};
use crate::config::PortConfiguration;
use std::time::Duration;

/// Pause before addressing the port, so the sensor has left whatever state
/// a previous session put it in.
pub const PRE_OPEN_SETTLE: Duration = Duration::from_millis(150);

/// Pause after the handle is opened, before touching the line.
pub const POST_OPEN_SETTLE: Duration = Duration::from_millis(150);

/// Pause after asserting DTR. The sensor draws power from DTR and needs this
/// long to start transmitting.
pub const DTR_SETTLE: Duration = Duration::from_millis(150);

/// Pause before closing, so a transmission in flight can finish.
pub const PRE_CLOSE_SETTLE: Duration = Duration::from_millis(150);

/// Pause between closing the handle and releasing it.
pub const POST_CLOSE_SETTLE: Duration = Duration::from_millis(150);

/// Pause after release, so the next session finds the line idle.
pub const POST_RELEASE_SETTLE: Duration = Duration::from_millis(150);

/// Settle delays applied around line state changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimings {
    /// Before opening
    pub pre_open: Duration,
    /// After opening
    pub post_open: Duration,
    /// After asserting DTR
    pub dtr: Duration,
    /// Before closing
    pub pre_close: Duration,
    /// After closing
    pub post_close: Duration,
    /// After releasing
    pub post_release: Duration,
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            pre_open: PRE_OPEN_SETTLE,
            post_open: POST_OPEN_SETTLE,
            dtr: DTR_SETTLE,
            pre_close: PRE_CLOSE_SETTLE,
            post_close: POST_CLOSE_SETTLE,
            post_release: POST_RELEASE_SETTLE,
        }
    }
}

impl SettleTimings {
    /// No delays at all. Only useful against simulated devices.
    pub fn none() -> Self {
        Self {
            pre_open: Duration::ZERO,
            post_open: Duration::ZERO,
            dtr: Duration::ZERO,
            pre_close: Duration::ZERO,
            post_close: Duration::ZERO,
            post_release: Duration::ZERO,
        }
    }

    /// Total time spent settling in one open/close cycle
    pub fn total(&self) -> Duration {
        self.pre_open + self.post_open + self.dtr + self.pre_close + self.post_close + self.post_release
    }
}

fn settle(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing opened yet
    Idle,
    /// Handle open, DTR asserted
    Ready,
    /// Closed and released; terminal
    Closed,
}

/// One open serial handle, exclusively owned by one transaction
pub struct SensorSession {
    link: Option<Box<dyn SerialLink>>,
    timings: SettleTimings,
    state: SessionState,
}

impl std::fmt::Debug for SensorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSession")
            .field("state", &self.state)
            .field("has_link", &self.link.is_some())
            .finish()
    }
}

impl SensorSession {
    /// Open `config`'s port and run the DTR handshake.
    ///
    /// On failure the close sequence has already run for whatever part of
    /// the session was set up.
    pub fn open(
        opener: &dyn PortOpener,
        config: &PortConfiguration,
        timings: SettleTimings,
    ) -> Result<Self, TransportError> {
        let mut session = Self {
            link: None,
            timings,
            state: SessionState::Idle,
        };
        session.connect(opener, config)?;
        Ok(session)
    }

    fn connect(
        &mut self,
        opener: &dyn PortOpener,
        config: &PortConfiguration,
    ) -> Result<(), TransportError> {
        settle(self.timings.pre_open);

        tracing::debug!("Opening {}", config.connection_info());
        self.link = Some(opener.open(config)?);
        settle(self.timings.post_open);

        let link = self.link_mut()?;
        // Stale bytes from before the handshake must not be mistaken for a reply
        link.clear_input()?;
        link.set_dtr(true)?;
        tracing::debug!("DTR asserted on {}", config.port_name());
        settle(self.timings.dtr);

        self.state = SessionState::Ready;
        Ok(())
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The open handle
    pub fn link_mut(&mut self) -> Result<&mut (dyn SerialLink + 'static), TransportError> {
        self.link.as_deref_mut().ok_or(TransportError::NotConnected)
    }

    /// Close and release the handle.
    ///
    /// Idempotent and infallible: close errors are reported as warnings and
    /// never replace the transaction's own outcome.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;

        settle(self.timings.pre_close);
        if let Some(link) = self.link.as_deref_mut() {
            if let Err(e) = link.close() {
                tracing::warn!("Failed to close serial port: {}", e);
            }
        }
        settle(self.timings.post_close);

        if self.link.take().is_some() {
            tracing::debug!("Serial port released");
        }
        settle(self.timings.post_release);
    }
}

impl Drop for SensorSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockSerialLink;
    use mockall::Sequence;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct OneShot(Mutex<Option<Box<dyn SerialLink>>>);

    impl OneShot {
        fn new(link: MockSerialLink) -> Self {
            Self(Mutex::new(Some(Box::new(link))))
        }
    }

    impl PortOpener for OneShot {
        fn open(&self, config: &PortConfiguration) -> Result<Box<dyn SerialLink>, TransportError> {
            self.0
                .lock()
                .take()
                .ok_or_else(|| TransportError::PortInUse(config.port_name().to_string()))
        }
    }

    fn config() -> PortConfiguration {
        #[cfg(windows)]
        let name = "COM3";
        #[cfg(not(windows))]
        let name = "/dev/ttyUSB0";
        PortConfiguration::new(name).unwrap()
    }

    #[test]
    fn test_default_timings() {
        let timings = SettleTimings::default();
        assert_eq!(timings.pre_open, Duration::from_millis(150));
        assert_eq!(timings.total(), Duration::from_millis(900));
        assert_eq!(SettleTimings::none().total(), Duration::ZERO);
    }

    #[test]
    fn test_discard_before_dtr() {
        let mut seq = Sequence::new();
        let mut link = MockSerialLink::new();
        link.expect_clear_input().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        link.expect_set_dtr()
            .withf(|level| *level)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        link.expect_close().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let opener = OneShot::new(link);
        let mut session = SensorSession::open(&opener, &config(), SettleTimings::none()).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut link = MockSerialLink::new();
        link.expect_clear_input().returning(|| Ok(()));
        link.expect_set_dtr().returning(|_| Ok(()));
        link.expect_close().times(1).returning(|| Ok(()));

        let opener = OneShot::new(link);
        let mut session = SensorSession::open(&opener, &config(), SettleTimings::none()).unwrap();
        session.close();
        session.close();
        drop(session);
    }

    #[test]
    fn test_drop_closes() {
        let closed = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&closed);

        let mut link = MockSerialLink::new();
        link.expect_clear_input().returning(|| Ok(()));
        link.expect_set_dtr().returning(|_| Ok(()));
        link.expect_close().returning(move || {
            *counter.lock() += 1;
            Ok(())
        });

        let opener = OneShot::new(link);
        {
            let _session = SensorSession::open(&opener, &config(), SettleTimings::none()).unwrap();
        }
        assert_eq!(*closed.lock(), 1);
    }

    #[test]
    fn test_handshake_failure_still_closes() {
        let mut link = MockSerialLink::new();
        link.expect_clear_input().returning(|| Ok(()));
        link.expect_set_dtr()
            .returning(|_| Err(TransportError::LineControl("DTR not supported".into())));
        link.expect_close().times(1).returning(|| Ok(()));

        let opener = OneShot::new(link);
        let err = SensorSession::open(&opener, &config(), SettleTimings::none()).unwrap_err();
        assert!(matches!(err, TransportError::LineControl(_)));
    }

    #[test]
    fn test_close_error_is_swallowed() {
        let mut link = MockSerialLink::new();
        link.expect_clear_input().returning(|| Ok(()));
        link.expect_set_dtr().returning(|_| Ok(()));
        link.expect_close()
            .times(1)
            .returning(|| Err(TransportError::LineControl("device vanished".into())));

        let opener = OneShot::new(link);
        let mut session = SensorSession::open(&opener, &config(), SettleTimings::none()).unwrap();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.link_mut(), Err(TransportError::NotConnected)));
    }
}
