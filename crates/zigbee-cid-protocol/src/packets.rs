//! Packets sent to the coordinator.

use chrono::{DateTime, Utc};

use crate::attribute::to_zigbee_secs;
use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::encode_frame;

/// A command word and its body, ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidPacket {
    /// Command word.
    pub command: u16,
    /// Body bytes, possibly empty.
    pub body: Vec<u8>,
}

impl CidPacket {
    /// Create a packet.
    pub fn new(command: u16, body: Vec<u8>) -> Self {
        CidPacket { command, body }
    }

    /// Ping the coordinator to check it is alive and read its capabilities.
    pub fn ping() -> Self {
        CidPacket::new(CMD_SYS_PING, Vec::new())
    }

    /// Read the coordinator clock.
    pub fn get_system_time() -> Self {
        CidPacket::new(CMD_SYS_GET_TIME, Vec::new())
    }

    /// Set the coordinator clock.
    ///
    /// Fails for times before 2000-01-01T00:00:00Z or past the 32-bit range.
    pub fn set_system_time(time: DateTime<Utc>) -> Result<Self, ProtocolError> {
        let secs = to_zigbee_secs(time)?;
        Ok(CidPacket::new(CMD_SYS_SET_TIME, secs.to_be_bytes().to_vec()))
    }

    /// Serialize to a wire frame.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_frame(self.command, &self.body)
    }
}

/// APS addressing mode of an outgoing ZCL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressMode(pub u8);

impl AddressMode {
    /// Deliver through the binding table; the address is ignored.
    pub const BOUND: AddressMode = AddressMode(0x00);
    /// 16-bit group address.
    pub const GROUP: AddressMode = AddressMode(0x01);
    /// 16-bit network address of one node.
    pub const SHORT: AddressMode = AddressMode(0x02);
    /// Broadcast to every node.
    pub const BROADCAST: AddressMode = AddressMode(0x0F);
}

impl Default for AddressMode {
    fn default() -> Self {
        AddressMode::SHORT
    }
}

/// A ZCL command addressed to a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZclCommand {
    /// How `address` is interpreted.
    pub address_mode: AddressMode,
    /// Set for manufacturer-specific commands.
    pub manufacturer_code: Option<u16>,
    /// Destination address.
    pub address: u16,
    /// Destination endpoint.
    pub endpoint: u8,
    /// Target cluster.
    pub cluster_id: u16,
    /// ZCL command id.
    pub command_id: u8,
    /// Command payload.
    pub payload: Vec<u8>,
}

impl ZclCommand {
    /// Build the packet carrying this command.
    pub fn to_packet(&self) -> Result<CidPacket, ProtocolError> {
        let mut body = Vec::with_capacity(9 + self.payload.len());
        body.push(self.address_mode.0);
        if let Some(code) = self.manufacturer_code {
            body.extend_from_slice(&code.to_be_bytes());
        }
        body.extend_from_slice(&self.address.to_be_bytes());
        body.push(self.endpoint);
        body.extend_from_slice(&self.cluster_id.to_be_bytes());
        body.push(self.command_id);
        body.extend_from_slice(&self.payload);

        if body.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::InvalidArgument(format!(
                "ZCL command body of {} bytes exceeds {}",
                body.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        Ok(CidPacket::new(CMD_ZCL_SEND_COMMAND, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_packets() {
        assert_eq!(CidPacket::ping().encode().unwrap(), vec![0x02, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(
            CidPacket::get_system_time().encode().unwrap(),
            vec![0x02, 0x00, 0x02, 0x00, 0x02]
        );
    }

    #[test]
    fn test_set_system_time() {
        let time = Utc.with_ymd_and_hms(2000, 1, 2, 0, 0, 0).unwrap();
        let packet = CidPacket::set_system_time(time).unwrap();
        assert_eq!(packet.command, CMD_SYS_SET_TIME);
        assert_eq!(packet.body, vec![0x00, 0x01, 0x51, 0x80]);

        let encoded = packet.encode().unwrap();
        assert_eq!(&encoded[..4], &[0x02, 0x00, 0x03, 0x04]);
        assert_eq!(encoded[8], 0x03 ^ 0x04 ^ 0x01 ^ 0x51 ^ 0x80);
    }

    #[test]
    fn test_set_system_time_before_epoch() {
        let time = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        assert!(matches!(
            CidPacket::set_system_time(time),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zcl_command_body_order() {
        let cmd = ZclCommand {
            address_mode: AddressMode::SHORT,
            manufacturer_code: None,
            address: 0x1234,
            endpoint: 0x01,
            cluster_id: 0x0006,
            command_id: 0x01,
            payload: vec![0xAA],
        };
        let packet = cmd.to_packet().unwrap();
        assert_eq!(packet.command, CMD_ZCL_SEND_COMMAND);
        assert_eq!(
            packet.body,
            vec![0x02, 0x12, 0x34, 0x01, 0x00, 0x06, 0x01, 0xAA]
        );
    }

    #[test]
    fn test_zcl_command_manufacturer_code() {
        let cmd = ZclCommand {
            manufacturer_code: Some(0x117C),
            address: 0xBEEF,
            endpoint: 0x0B,
            cluster_id: 0xFC00,
            command_id: 0x00,
            ..Default::default()
        };
        let packet = cmd.to_packet().unwrap();
        assert_eq!(
            packet.body,
            vec![0x02, 0x11, 0x7C, 0xBE, 0xEF, 0x0B, 0xFC, 0x00, 0x00]
        );
    }

    #[test]
    fn test_zcl_command_too_long() {
        let cmd = ZclCommand {
            payload: vec![0; 250],
            ..Default::default()
        };
        assert!(matches!(cmd.to_packet(), Err(ProtocolError::InvalidArgument(_))));

        let cmd = ZclCommand {
            payload: vec![0; MAX_PAYLOAD_SIZE - 7],
            ..Default::default()
        };
        assert_eq!(cmd.to_packet().unwrap().body.len(), MAX_PAYLOAD_SIZE);
    }
}
