//! Testing utilities for mqtt433
//!
//! This crate provides:
//! - A scripted MQTT broker for driving the daemons' event loops

pub mod broker;

pub use broker::{BrokerBehaviour, BrokerStats, FakeBroker, ReceivedPublish};
