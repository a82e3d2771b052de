//! Broker link state shared by both daemons.
//!
//! The transport reports connect acknowledgements and disconnects with a
//! numeric return code. The state always follows the latest report, but a
//! failure code that repeats is only logged the first time so a broker that
//! stays unreachable does not flood the log.

use std::fmt;

use tracing::{info, warn};

/// Return code of a successful connect or a clean disconnect.
pub const CODE_OK: u8 = 0;

/// Connection state of the broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Tracks the link state and suppresses repeated status logging.
#[derive(Debug, Clone, Default)]
pub struct LinkMonitor {
    state: LinkState,
    last_connect: u8,
    last_disconnect: u8,
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Record a connect acknowledgement. Returns `true` when the link is up.
    pub fn on_connect(&mut self, code: u8) -> bool {
        if code == CODE_OK {
            info!("Connected OK, Returned code = {}", code);
            self.state = LinkState::Connected;
            self.last_disconnect = CODE_OK;
        } else {
            if self.last_connect != code {
                warn!("Bad connection, Returned code = {}", code);
            }
            self.state = LinkState::Disconnected;
        }
        self.last_connect = code;
        self.is_connected()
    }

    /// Record a disconnect.
    pub fn on_disconnect(&mut self, code: u8) {
        if code == CODE_OK || self.last_disconnect != code {
            info!("Disconnected, Returned code = {}", code);
            self.last_connect = CODE_OK;
        }
        self.state = LinkState::Disconnected;
        self.last_disconnect = code;
    }
}
