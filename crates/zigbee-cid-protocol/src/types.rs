//! Common types shared by several responses.

use std::fmt;

use crate::bits::{bit, read_u16, read_u64, read_u8};
use crate::constants::*;
use crate::error::ProtocolError;

/// MAC capability flags reported for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacCapability {
    /// Node can act as a PAN coordinator.
    pub alternate_coordinator: bool,
    /// Full-function device.
    pub full_function_device: bool,
    /// Node is mains powered.
    pub mains_powered: bool,
    /// Receiver stays on while idle.
    pub rx_on_when_idle: bool,
    /// Node supports high security.
    pub high_security: bool,
    /// Node wants a network address allocated.
    pub allocate_address: bool,
}

impl MacCapability {
    /// The raw flags byte.
    pub fn to_byte(self) -> u8 {
        (self.alternate_coordinator as u8)
            | (self.full_function_device as u8) << 1
            | (self.mains_powered as u8) << 2
            | (self.rx_on_when_idle as u8) << 3
            | (self.high_security as u8) << 6
            | (self.allocate_address as u8) << 7
    }
}

impl From<u8> for MacCapability {
    fn from(b: u8) -> Self {
        MacCapability {
            alternate_coordinator: bit(b, 0),
            full_function_device: bit(b, 1),
            mains_powered: bit(b, 2),
            rx_on_when_idle: bit(b, 3),
            high_security: bit(b, 6),
            allocate_address: bit(b, 7),
        }
    }
}

/// Network services a node provides (ping response).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerFlags {
    /// Primary trust center.
    pub primary_trust_center: bool,
    /// Backup trust center.
    pub backup_trust_center: bool,
    /// Primary binding table cache.
    pub primary_binding_cache: bool,
    /// Backup binding table cache.
    pub backup_binding_cache: bool,
    /// Primary discovery cache.
    pub primary_discovery_cache: bool,
    /// Backup discovery cache.
    pub backup_discovery_cache: bool,
    /// Network manager.
    pub network_manager: bool,
    /// Node is in the running state.
    pub running: bool,
}

impl From<u8> for ServerFlags {
    fn from(b: u8) -> Self {
        ServerFlags {
            primary_trust_center: bit(b, 0),
            backup_trust_center: bit(b, 1),
            primary_binding_cache: bit(b, 2),
            backup_binding_cache: bit(b, 3),
            primary_discovery_cache: bit(b, 4),
            backup_discovery_cache: bit(b, 5),
            network_manager: bit(b, 6),
            running: bit(b, 7),
        }
    }
}

/// Coordinator identity returned by a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingInfo {
    /// MAC capability flags.
    pub mac_capability: MacCapability,
    /// Services the node runs.
    pub server_flags: ServerFlags,
    /// Firmware version byte.
    pub firmware_version: u8,
    /// ZigBee profile id.
    pub profile_id: u16,
    /// 16-bit network address.
    pub network_address: u16,
    /// 64-bit IEEE address.
    pub ieee_address: u64,
}

/// Payload size of a ping response.
pub const PING_PAYLOAD_SIZE: usize = 15;

impl PingInfo {
    pub(crate) fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        if p.len() < PING_PAYLOAD_SIZE {
            return Err(ProtocolError::Truncated {
                needed: PING_PAYLOAD_SIZE,
                available: p.len(),
            });
        }
        Ok(PingInfo {
            mac_capability: MacCapability::from(p[0]),
            server_flags: ServerFlags::from(p[1]),
            firmware_version: p[2],
            profile_id: read_u16(p, 3)?,
            network_address: read_u16(p, 5)?,
            ieee_address: read_u64(p, 7)?,
        })
    }
}

/// Device identity carried by join and announce notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAnnounce {
    /// 16-bit network address.
    pub network_address: u16,
    /// 64-bit IEEE address.
    pub ieee_address: u64,
    /// MAC capability flags.
    pub capability: MacCapability,
}

impl DeviceAnnounce {
    pub(crate) fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        Ok(DeviceAnnounce {
            network_address: read_u16(p, 0)?,
            ieee_address: read_u64(p, 2)?,
            capability: MacCapability::from(read_u8(p, 10)?),
        })
    }
}

/// A one-byte status where zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u8);

impl Status {
    /// Whether the operation succeeded.
    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "SUCCESS")
        } else {
            write!(f, "FAILED (0x{:02X})", self.0)
        }
    }
}

/// Status of a bind request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    /// Binding created.
    Success,
    /// The target does not support binding.
    NotSupported,
    /// The binding table is full.
    TableFull,
    /// Any other status byte.
    Other(u8),
}

impl From<u8> for BindStatus {
    fn from(b: u8) -> Self {
        match b {
            0 => BindStatus::Success,
            1 => BindStatus::NotSupported,
            2 => BindStatus::TableFull,
            other => BindStatus::Other(other),
        }
    }
}

/// Network parameters reported when the coordinator forms a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Radio channel.
    pub channel: u8,
    /// 16-bit PAN id.
    pub pan_id: u16,
    /// 64-bit extended PAN id.
    pub extended_pan_id: u64,
}

impl NetworkInfo {
    pub(crate) fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        Ok(NetworkInfo {
            channel: read_u8(p, 0)?,
            pan_id: read_u16(p, 1)?,
            extended_pan_id: read_u64(p, 3)?,
        })
    }
}

/// ZDO node descriptor summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Request status.
    pub status: Status,
    /// Address of the node that answered.
    pub source_address: u16,
    /// MAC capability flags.
    pub mac_capability: MacCapability,
}

impl NodeDescriptor {
    pub(crate) fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        Ok(NodeDescriptor {
            status: Status(read_u8(p, 0)?),
            source_address: read_u16(p, 1)?,
            mac_capability: MacCapability::from(read_u8(p, 5)?),
        })
    }
}

/// ZDO simple descriptor summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleDescriptor {
    /// Request status.
    pub status: Status,
    /// Address the descriptor belongs to.
    pub destination_address: u16,
    /// Application endpoint.
    pub endpoint: u8,
    /// Endpoint profile id.
    pub profile_id: u16,
    /// Endpoint device id.
    pub device_id: u16,
}

impl SimpleDescriptor {
    pub(crate) fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        Ok(SimpleDescriptor {
            status: Status(read_u8(p, 0)?),
            destination_address: read_u16(p, 1)?,
            endpoint: read_u8(p, 4)?,
            profile_id: read_u16(p, 5)?,
            device_id: read_u16(p, 7)?,
        })
    }
}

/// Header of an incoming ZCL message.
///
/// Byte 0 is the ZCL frame control; when its manufacturer-specific bit is set
/// the fields after it move one position later and a manufacturer code is
/// present at offset 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZclHeader {
    /// Raw frame control byte.
    pub frame_control: u8,
    /// Manufacturer code, for manufacturer-specific frames.
    pub manufacturer_code: Option<u16>,
    /// Address of the sending node.
    pub source_address: u16,
    /// Sending endpoint.
    pub source_endpoint: u8,
    /// Cluster the message belongs to.
    pub cluster_id: u16,
    /// ZCL command id.
    pub command_id: u8,
}

impl ZclHeader {
    /// Offset of the command id in a plain (not manufacturer-specific) frame.
    pub const COMMAND_ID_OFFSET: usize = 6;

    /// Whether a frame control byte marks a manufacturer-specific frame.
    pub fn is_manufacturer_specific(frame_control: u8) -> bool {
        bit(frame_control, ZCL_MANUFACTURER_SPECIFIC_BIT)
    }

    /// Decode the header from the start of an incoming message payload.
    pub fn decode(p: &[u8]) -> Result<Self, ProtocolError> {
        let frame_control = read_u8(p, 0)?;
        let mfr = Self::is_manufacturer_specific(frame_control);
        let shift = mfr as usize;
        Ok(ZclHeader {
            frame_control,
            manufacturer_code: if mfr { Some(read_u16(p, 1)?) } else { None },
            source_address: read_u16(p, 1 + shift)?,
            source_endpoint: read_u8(p, 3 + shift)?,
            cluster_id: read_u16(p, 4 + shift)?,
            command_id: read_u8(p, Self::COMMAND_ID_OFFSET + shift)?,
        })
    }

    /// Whether this is a manufacturer-specific frame.
    pub fn manufacturer_specific(&self) -> bool {
        self.manufacturer_code.is_some()
    }

    /// Offset of the first byte after the command id.
    pub fn body_offset(&self) -> usize {
        Self::COMMAND_ID_OFFSET + 1 + self.manufacturer_specific() as usize
    }
}

impl fmt::Display for ZclHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "src=0x{:04X}/{} cluster=0x{:04X} cmd=0x{:02X}",
            self.source_address, self.source_endpoint, self.cluster_id, self.command_id
        )?;
        if let Some(code) = self.manufacturer_code {
            write!(f, " mfr=0x{:04X}", code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_capability_bits() {
        let cap = MacCapability::from(0b1100_0101);
        assert!(cap.alternate_coordinator);
        assert!(!cap.full_function_device);
        assert!(cap.mains_powered);
        assert!(!cap.rx_on_when_idle);
        assert!(cap.high_security);
        assert!(cap.allocate_address);
        assert_eq!(cap.to_byte(), 0b1100_0101);
    }

    #[test]
    fn test_zcl_header_plain() {
        let p = [0x18, 0x12, 0x34, 0x01, 0x04, 0x02, 0x0A, 0x01];
        let h = ZclHeader::decode(&p).unwrap();
        assert_eq!(h.manufacturer_code, None);
        assert_eq!(h.source_address, 0x1234);
        assert_eq!(h.source_endpoint, 1);
        assert_eq!(h.cluster_id, 0x0402);
        assert_eq!(h.command_id, 0x0A);
        assert_eq!(h.body_offset(), 7);
    }

    #[test]
    fn test_zcl_header_manufacturer_specific() {
        let p = [0x40, 0x10, 0x2B, 0x7E, 0x05, 0x04, 0x05, 0x0D, 0x02];
        let h = ZclHeader::decode(&p).unwrap();
        assert_eq!(h.manufacturer_code, Some(0x102B));
        assert_eq!(h.source_address, 0x2B7E);
        assert_eq!(h.source_endpoint, 5);
        assert_eq!(h.cluster_id, 0x0405);
        assert_eq!(h.command_id, 0x0D);
        assert_eq!(h.body_offset(), 8);
    }

    #[test]
    fn test_bind_status() {
        assert_eq!(BindStatus::from(0), BindStatus::Success);
        assert_eq!(BindStatus::from(2), BindStatus::TableFull);
        assert_eq!(BindStatus::from(9), BindStatus::Other(9));
    }
}
