//! Shared defaults and well-known names.

/// Directory holding the daemons' configuration documents.
pub const CONFIG_DIR: &str = "/etc";

/// Well-known configuration keys.
pub mod keys {
    pub const BROKER: &str = "broker";
    pub const PORT: &str = "port";
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const HA_TOPIC: &str = "hatopic";
    pub const NODE_ID: &str = "nodeid";
    pub const DEVICES: &str = "devices";
}

/// MQTT defaults.
pub mod mqtt {
    /// Broker port when `port` is not configured.
    pub const DEFAULT_PORT: u16 = 1883;
    /// Keep-alive interval in seconds.
    pub const KEEP_ALIVE_SECS: u64 = 60;
    /// Capacity of the client request channel.
    pub const REQUEST_CAPACITY: usize = 64;
}

/// Environment variables read by the binaries.
pub mod env_vars {
    /// `true` switches log output to JSON lines.
    pub const LOG_JSON: &str = "MQTT433_LOG_JSON";
}

/// Join two topic levels with `/`.
pub fn join_topic(main: &str, sub: &str) -> String {
    format!("{}/{}", main, sub)
}
