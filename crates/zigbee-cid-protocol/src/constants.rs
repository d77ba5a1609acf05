//! Protocol constants
//!
//! Command codes, header bits and ZCL identifiers used on the coordinator's
//! CID serial interface.

// ============================================================================
// Framing
// ============================================================================

/// Start-of-packet marker that begins every frame.
pub const SOP: u8 = 0x02;
/// Bytes before the payload: SOP, two command bytes, length.
pub const FRAME_HEADER_SIZE: usize = 4;
/// Header plus the trailing FCS byte.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_SIZE + 1;
/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = 255;
/// Largest complete frame on the wire.
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MAX_PAYLOAD_SIZE;

// ============================================================================
// Command word bits
// ============================================================================

/// Set when the coordinator rejected the command.
pub const CMD_FLAG_NACK: u16 = 0x8000;
/// Set when the coordinator acknowledged the command.
pub const CMD_FLAG_ACK: u16 = 0x4000;
/// Set on every coordinator → host response.
pub const CMD_FLAG_RESPONSE: u16 = 0x1000;
/// Mask selecting the command number.
pub const CMD_NUMBER_MASK: u16 = 0x0FFF;

// ============================================================================
// Command codes (host → coordinator)
// ============================================================================

/// Ping the coordinator to check it is alive and read its capabilities.
pub const CMD_SYS_PING: u16 = 0x0000;
/// Read the coordinator clock.
pub const CMD_SYS_GET_TIME: u16 = 0x0002;
/// Set the coordinator clock.
pub const CMD_SYS_SET_TIME: u16 = 0x0003;
/// Send a ZCL command to a remote endpoint.
pub const CMD_ZCL_SEND_COMMAND: u16 = 0x0031;

// ============================================================================
// Response codes (coordinator → host)
// ============================================================================

/// Ping reply with MAC capability and node identity.
pub const RESP_SYS_PING: u16 = 0x1000;
/// Current coordinator time.
pub const RESP_SYS_GET_TIME: u16 = 0x1002;
/// Status of a set-time request.
pub const RESP_SYS_SET_TIME: u16 = 0x1003;
/// Network formed: channel and PAN identifiers.
pub const RESP_SYS_START_NETWORK: u16 = 0x1005;
/// Permit-join window changed.
pub const RESP_SYS_PERMIT_JOIN: u16 = 0x1010;
/// A device joined the network.
pub const RESP_DEVICE_JOINED: u16 = 0x1011;
/// ZDO node descriptor.
pub const RESP_NODE_DESCRIPTOR: u16 = 0x1014;
/// ZDO simple descriptor.
pub const RESP_SIMPLE_DESCRIPTOR: u16 = 0x1015;
/// End device announcement.
pub const RESP_END_DEVICE_ANNOUNCE: u16 = 0x101B;
/// Result of a bind request.
pub const RESP_BIND: u16 = 0x1020;
/// Incoming ZCL message (attribute family).
pub const RESP_ZCL_INCOMING: u16 = 0x1031;

// ============================================================================
// ZCL general command ids (attribute-family sub-discriminant)
// ============================================================================

/// Read Attributes Response.
pub const ZCL_READ_ATTRIBUTES_RESPONSE: u8 = 0x01;
/// Report Attributes.
pub const ZCL_REPORT_ATTRIBUTES: u8 = 0x0A;
/// Default Response.
pub const ZCL_DEFAULT_RESPONSE: u8 = 0x0B;
/// Discover Attributes Response.
pub const ZCL_DISCOVER_ATTRIBUTES_RESPONSE: u8 = 0x0D;

/// Bit of the ZCL frame-control byte flagging a manufacturer-specific frame.
pub const ZCL_MANUFACTURER_SPECIFIC_BIT: u8 = 6;

// ============================================================================
// Time
// ============================================================================

/// Seconds between the Unix epoch and the ZigBee epoch (2000-01-01T00:00:00Z).
pub const ZIGBEE_EPOCH_UNIX_SECS: i64 = 946_684_800;
