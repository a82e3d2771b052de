//! Shape of the RF bridge configuration document.

use mqtt433_core::DocumentSchema;

/// File name of the bridge configuration under `/etc`.
pub const CONFIG_FILE: &str = "mqtt433MHz.xml";

/// Root element and inline documentation of the bridge configuration.
pub const BRIDGE_SCHEMA: DocumentSchema = DocumentSchema {
    root: "mqtt433MHz",
    default_annotation: "This XML file describes the topics to relay.
            Add an item to add a relay.
            <mqtt433MHz> Main element, do not change name
                <broker> Address of MQTT broker
                <port> MQTT port
                <username> MQTT username
                <password> MQTT password
                <hatopic> home assistant topic (default homeassistant)
                <rfdevice> RF transceiver device node (default /dev/rf433)
                <rfreceive> separate node to receive from, e.g. when rfdevice is a FIFO
                <devices>
                    <device1> devicename is key
                        <RFout> true if output device, false if input device
                        <item433>
                            <SysCode> 433MHz sys-code
                            <GroupCode> 433MHz group-code (if used)
                            <DeviceCode> 433MHz device-code
                        <hadevice>  (ids is autogenerated)
                            <name> device name
                            <mf> manufacturer
                            <mdl> model
                        <itemmqtt>
                            <maintopic> main mqtt topic for device
                            <cmd_t> only for output device
                            <stat_t> only for input device, for output device the current value is copied
                        <hatype> switch or event
                        <hadisco> (uniq_id, pl_off, pl_on is autogenerated)
                            <name> just a name
                            <dev_cla> none if omitted, outlet or switch (only for switch), doorbell or button (only for event)
                    <device2> ... ",
};

/// Device attribute keys.
pub mod keys {
    pub const RF_OUT: &str = "RFout";
    pub const ITEM_433: &str = "item433";
    pub const SYS_CODE: &str = "SysCode";
    pub const GROUP_CODE: &str = "GroupCode";
    pub const DEVICE_CODE: &str = "DeviceCode";
    pub const ITEM_MQTT: &str = "itemmqtt";
    pub const MAIN_TOPIC: &str = "maintopic";
    /// Command suffix key names, preferred first.
    pub const COMMAND_SUFFIX: [&str; 2] = ["cmd_t", "command_topic"];
    /// Status suffix key names, preferred first.
    pub const STATUS_SUFFIX: [&str; 2] = ["stat_t", "status_topic"];
    pub const HA_TYPE: &str = "hatype";
    pub const HA_DISCO: &str = "hadisco";
    pub const HA_DEVICE: &str = "hadevice";
    pub const NAME: &str = "name";
    pub const DEVICE_CLASS: &str = "dev_cla";
    /// Path of the RF transceiver device node.
    pub const RF_DEVICE: &str = "rfdevice";
    /// Separate path frames are received from, when `rfdevice` only sends.
    pub const RF_RECEIVE: &str = "rfreceive";
}

/// Device node used when `rfdevice` is not configured.
pub const DEFAULT_RF_DEVICE: &str = "/dev/rf433";
