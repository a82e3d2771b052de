//! RF frames.
//!
//! A frame is a short list of integers. Its length tells which codes are
//! present:
//!
//! | length | layout                                  |
//! |--------|-----------------------------------------|
//! | 2      | `[device, value]`                       |
//! | 3      | `[sys, device, value]`                  |
//! | 4      | `[sys, group, device, value]`           |
//!
//! Any other length is invalid and the frame is discarded.

use std::fmt;

use crate::error::FrameError;

/// RF identity of a configured device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RfIdentity {
    pub sys_code: Option<i64>,
    pub group_code: Option<i64>,
    pub device_code: i64,
}

impl RfIdentity {
    pub fn new(sys_code: Option<i64>, group_code: Option<i64>, device_code: i64) -> Self {
        Self {
            sys_code,
            group_code,
            device_code,
        }
    }

    /// Compare against decoded codes; absent codes count as 0.
    pub fn matches(&self, code: &RfCode) -> bool {
        self.sys_code.unwrap_or(0) == code.sys_code
            && self.group_code.unwrap_or(0) == code.group_code
            && self.device_code == code.device_code
    }
}

/// Codes and value decoded from a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfCode {
    pub sys_code: i64,
    pub group_code: i64,
    pub device_code: i64,
    pub value: i64,
}

/// Raw RF frame as exchanged with the transceiver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RfFrame(Vec<i64>);

impl RfFrame {
    pub fn new(values: Vec<i64>) -> Self {
        Self(values)
    }

    /// Build the frame to send `value` to `identity`.
    ///
    /// System and group codes are left out when absent or not positive.
    pub fn encode(identity: &RfIdentity, value: i64) -> Self {
        let mut values = Vec::with_capacity(4);
        if let Some(sys) = identity.sys_code.filter(|c| *c > 0) {
            values.push(sys);
        }
        if let Some(group) = identity.group_code.filter(|c| *c > 0) {
            values.push(group);
        }
        values.push(identity.device_code);
        values.push(value);
        Self(values)
    }

    /// Assign the frame's values to codes by length.
    pub fn decode(&self) -> Result<RfCode, FrameError> {
        match *self.0.as_slice() {
            [device_code, value] => Ok(RfCode {
                sys_code: 0,
                group_code: 0,
                device_code,
                value,
            }),
            [sys_code, device_code, value] => Ok(RfCode {
                sys_code,
                group_code: 0,
                device_code,
                value,
            }),
            [sys_code, group_code, device_code, value] => Ok(RfCode {
                sys_code,
                group_code,
                device_code,
                value,
            }),
            _ => Err(FrameError::UnsupportedArity(self.0.len())),
        }
    }

    pub fn values(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for RfFrame {
    fn from(values: Vec<i64>) -> Self {
        Self(values)
    }
}

impl fmt::Display for RfFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}
