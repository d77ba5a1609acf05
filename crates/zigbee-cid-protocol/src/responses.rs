//! Responses from the coordinator.
//!
//! [`decode_response`] is the dispatch table: a `match` over the command code
//! selecting a decoder for the payload. Codes that are not in the table decode
//! to [`Response::Unknown`], and a known code whose payload is too short for
//! its shape decodes to [`Response::Malformed`]. Neither is an error: every
//! frame yields exactly one response.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::attribute::{decode_attribute_list, AttributeList, DataType, ListTruncation};
use crate::bits::{read_u16, read_u32, read_u8};
use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::types::*;

/// Responses and notifications received from the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Ping reply.
    Ping(PingInfo),

    /// Current coordinator time.
    SystemTime {
        /// Coordinator clock.
        time: DateTime<Utc>,
    },

    /// Result of a set-time request.
    SetSystemTime(Status),

    /// Network formed.
    NetworkStarted(NetworkInfo),

    /// Permit-join window.
    PermitJoin {
        /// Seconds joining stays open (0 = closed, 0xFF = always).
        permit_time: u8,
    },

    /// A device joined.
    DeviceJoined(DeviceAnnounce),

    /// Node descriptor.
    NodeDescriptor(NodeDescriptor),

    /// Simple descriptor.
    SimpleDescriptor(SimpleDescriptor),

    /// End device announcement.
    EndDeviceAnnounce(DeviceAnnounce),

    /// Result of a bind request.
    Bind {
        /// Bind status.
        status: BindStatus,
        /// Node that answered.
        source_address: u16,
    },

    /// ZCL Read Attributes Response.
    ReadAttributes {
        /// ZCL header.
        header: ZclHeader,
        /// Number of attributes the device reported.
        attribute_count: u8,
        /// Whether the device reported the list as complete.
        list_complete: bool,
    },

    /// ZCL Report Attributes.
    ReportAttributes(AttributeReport),

    /// ZCL Discover Attributes Response.
    DiscoverAttributes {
        /// ZCL header.
        header: ZclHeader,
        /// Number of attributes the device reported.
        attribute_count: u8,
        /// Whether discovery is complete.
        list_complete: bool,
        /// Attribute ids and types that could be read.
        discovered: Vec<(u16, DataType)>,
    },

    /// Any other incoming ZCL message.
    ZclMessage {
        /// ZCL header.
        header: ZclHeader,
        /// Full payload, header included.
        payload: Vec<u8>,
    },

    /// A known code whose payload did not match its shape.
    Malformed {
        /// Raw command code.
        code: u16,
        /// Raw payload.
        payload: Vec<u8>,
        /// What was wrong.
        reason: ProtocolError,
    },

    /// A code not in the dispatch table.
    Unknown {
        /// Raw command code.
        code: u16,
        /// Raw payload.
        payload: Vec<u8>,
    },
}

/// Decoded ZCL Report Attributes message.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeReport {
    /// ZCL header.
    pub header: ZclHeader,
    /// Number of records the device declared.
    pub attribute_count: u8,
    /// Records decoded, keyed by attribute id.
    pub attributes: AttributeList,
    /// Set when decoding stopped before `attribute_count` records.
    pub truncated: Option<ListTruncation>,
}

/// The variant of a [`Response`], without its data.
///
/// Used to say which response a request is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Ping reply.
    Ping,
    /// Coordinator clock reading.
    SystemTime,
    /// Clock set acknowledgement.
    SetSystemTime,
    /// Network formed.
    NetworkStarted,
    /// Permit-join window opened or closed.
    PermitJoin,
    /// A device joined the network.
    DeviceJoined,
    /// Node descriptor reply.
    NodeDescriptor,
    /// Simple descriptor reply.
    SimpleDescriptor,
    /// End device announcement.
    EndDeviceAnnounce,
    /// Bind reply.
    Bind,
    /// ZCL read attributes response.
    ReadAttributes,
    /// ZCL attribute report.
    ReportAttributes,
    /// ZCL discover attributes response.
    DiscoverAttributes,
    /// Any other incoming ZCL message.
    ZclMessage,
    /// Known code with a payload too short to decode.
    Malformed,
    /// Unmapped command code.
    Unknown,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Response {
    /// Decode the response carried by a frame.
    pub fn from_frame(frame: &Frame) -> Self {
        decode_response(frame.command().raw(), frame.payload())
    }

    /// The variant of this response.
    pub fn kind(&self) -> ResponseKind {
        match self {
            Response::Ping(_) => ResponseKind::Ping,
            Response::SystemTime { .. } => ResponseKind::SystemTime,
            Response::SetSystemTime(_) => ResponseKind::SetSystemTime,
            Response::NetworkStarted(_) => ResponseKind::NetworkStarted,
            Response::PermitJoin { .. } => ResponseKind::PermitJoin,
            Response::DeviceJoined(_) => ResponseKind::DeviceJoined,
            Response::NodeDescriptor(_) => ResponseKind::NodeDescriptor,
            Response::SimpleDescriptor(_) => ResponseKind::SimpleDescriptor,
            Response::EndDeviceAnnounce(_) => ResponseKind::EndDeviceAnnounce,
            Response::Bind { .. } => ResponseKind::Bind,
            Response::ReadAttributes { .. } => ResponseKind::ReadAttributes,
            Response::ReportAttributes(_) => ResponseKind::ReportAttributes,
            Response::DiscoverAttributes { .. } => ResponseKind::DiscoverAttributes,
            Response::ZclMessage { .. } => ResponseKind::ZclMessage,
            Response::Malformed { .. } => ResponseKind::Malformed,
            Response::Unknown { .. } => ResponseKind::Unknown,
        }
    }

    /// The command code this response arrived with.
    pub fn code(&self) -> u16 {
        match self {
            Response::Ping(_) => RESP_SYS_PING,
            Response::SystemTime { .. } => RESP_SYS_GET_TIME,
            Response::SetSystemTime(_) => RESP_SYS_SET_TIME,
            Response::NetworkStarted(_) => RESP_SYS_START_NETWORK,
            Response::PermitJoin { .. } => RESP_SYS_PERMIT_JOIN,
            Response::DeviceJoined(_) => RESP_DEVICE_JOINED,
            Response::NodeDescriptor(_) => RESP_NODE_DESCRIPTOR,
            Response::SimpleDescriptor(_) => RESP_SIMPLE_DESCRIPTOR,
            Response::EndDeviceAnnounce(_) => RESP_END_DEVICE_ANNOUNCE,
            Response::Bind { .. } => RESP_BIND,
            Response::ReadAttributes { .. }
            | Response::ReportAttributes(_)
            | Response::DiscoverAttributes { .. }
            | Response::ZclMessage { .. } => RESP_ZCL_INCOMING,
            Response::Malformed { code, .. } | Response::Unknown { code, .. } => *code,
        }
    }

    /// The ZCL header, for incoming ZCL messages.
    pub fn zcl_header(&self) -> Option<&ZclHeader> {
        match self {
            Response::ReadAttributes { header, .. }
            | Response::DiscoverAttributes { header, .. }
            | Response::ZclMessage { header, .. } => Some(header),
            Response::ReportAttributes(report) => Some(&report.header),
            _ => None,
        }
    }
}

/// Decode a response from its command code and payload.
pub fn decode_response(code: u16, payload: &[u8]) -> Response {
    let decoded = match code {
        RESP_SYS_PING => PingInfo::decode(payload).map(Response::Ping),
        RESP_SYS_GET_TIME => read_u32(payload, 0).map(|secs| Response::SystemTime {
            time: crate::attribute::zigbee_time(secs),
        }),
        RESP_SYS_SET_TIME => read_u8(payload, 0).map(|s| Response::SetSystemTime(Status(s))),
        RESP_SYS_START_NETWORK => NetworkInfo::decode(payload).map(Response::NetworkStarted),
        RESP_SYS_PERMIT_JOIN => {
            read_u8(payload, 0).map(|permit_time| Response::PermitJoin { permit_time })
        }
        RESP_DEVICE_JOINED => DeviceAnnounce::decode(payload).map(Response::DeviceJoined),
        RESP_NODE_DESCRIPTOR => NodeDescriptor::decode(payload).map(Response::NodeDescriptor),
        RESP_SIMPLE_DESCRIPTOR => {
            SimpleDescriptor::decode(payload).map(Response::SimpleDescriptor)
        }
        RESP_END_DEVICE_ANNOUNCE => {
            DeviceAnnounce::decode(payload).map(Response::EndDeviceAnnounce)
        }
        RESP_BIND => decode_bind(payload),
        RESP_ZCL_INCOMING => decode_zcl_incoming(payload),
        _ => {
            log::debug!("no decoder for command 0x{:04X}, {} byte payload", code, payload.len());
            return Response::Unknown {
                code,
                payload: payload.to_vec(),
            };
        }
    };

    decoded.unwrap_or_else(|reason| {
        log::warn!("malformed payload for command 0x{:04X}: {}", code, reason);
        Response::Malformed {
            code,
            payload: payload.to_vec(),
            reason,
        }
    })
}

fn decode_bind(payload: &[u8]) -> Result<Response, ProtocolError> {
    Ok(Response::Bind {
        status: BindStatus::from(read_u8(payload, 0)?),
        source_address: read_u16(payload, 1)?,
    })
}

/// Incoming ZCL messages delegate on the ZCL command id inside the payload.
fn decode_zcl_incoming(payload: &[u8]) -> Result<Response, ProtocolError> {
    let header = ZclHeader::decode(payload)?;
    let body = header.body_offset();

    match header.command_id {
        ZCL_READ_ATTRIBUTES_RESPONSE => Ok(Response::ReadAttributes {
            header,
            attribute_count: read_u8(payload, body)?,
            list_complete: read_u8(payload, body + 1)? == 0x01,
        }),

        ZCL_REPORT_ATTRIBUTES => {
            let attribute_count = read_u8(payload, body)?;
            let (attributes, truncated) =
                decode_attribute_list(payload, body + 1, attribute_count as usize);
            Ok(Response::ReportAttributes(AttributeReport {
                header,
                attribute_count,
                attributes,
                truncated,
            }))
        }

        ZCL_DISCOVER_ATTRIBUTES_RESPONSE => {
            let attribute_count = read_u8(payload, body)?;
            let list_complete = read_u8(payload, body + 1)? == 0x01;
            let discovered = payload
                .get(body + 2..)
                .unwrap_or_default()
                .chunks_exact(3)
                .take(attribute_count as usize)
                .map(|c| (u16::from_be_bytes([c[0], c[1]]), DataType::from(c[2])))
                .collect();
            Ok(Response::DiscoverAttributes {
                header,
                attribute_count,
                list_complete,
                discovered,
            })
        }

        _ => Ok(Response::ZclMessage {
            header,
            payload: payload.to_vec(),
        }),
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "[")?;
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{:02X}", b)?;
    }
    write!(f, "]")
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ping(info) => write!(
                f,
                "Ping: fw={} profile=0x{:04X} nwk=0x{:04X} ieee={:016X}",
                info.firmware_version, info.profile_id, info.network_address, info.ieee_address
            ),
            Response::SystemTime { time } => write!(f, "SystemTime: {}", time.to_rfc3339()),
            Response::SetSystemTime(status) => write!(f, "SetSystemTime: {}", status),
            Response::NetworkStarted(net) => write!(
                f,
                "NetworkStarted: pan=0x{:04X} extpan={:016X} channel={}",
                net.pan_id, net.extended_pan_id, net.channel
            ),
            Response::PermitJoin { permit_time } => write!(f, "PermitJoin: {}s", permit_time),
            Response::DeviceJoined(dev) => write!(
                f,
                "DeviceJoined: nwk=0x{:04X} ieee={:016X}",
                dev.network_address, dev.ieee_address
            ),
            Response::NodeDescriptor(desc) => write!(
                f,
                "NodeDescriptor: {} src=0x{:04X} mac=0x{:02X}",
                desc.status,
                desc.source_address,
                desc.mac_capability.to_byte()
            ),
            Response::SimpleDescriptor(desc) => write!(
                f,
                "SimpleDescriptor: {} dst=0x{:04X} ep={} profile=0x{:04X} device=0x{:04X}",
                desc.status, desc.destination_address, desc.endpoint, desc.profile_id, desc.device_id
            ),
            Response::EndDeviceAnnounce(dev) => write!(
                f,
                "EndDeviceAnnounce: nwk=0x{:04X} ieee={:016X}",
                dev.network_address, dev.ieee_address
            ),
            Response::Bind {
                status,
                source_address,
            } => write!(f, "Bind: {:?} src=0x{:04X}", status, source_address),
            Response::ReadAttributes {
                header,
                attribute_count,
                list_complete,
            } => write!(
                f,
                "ReadAttributes: {} count={} complete={}",
                header, attribute_count, list_complete
            ),
            Response::ReportAttributes(report) => {
                write!(f, "ReportAttributes: {}", report.header)?;
                for record in &report.attributes {
                    write!(f, "\n\t{}", record)?;
                }
                if let Some(reason) = &report.truncated {
                    write!(f, "\n\t(list truncated: {:?})", reason)?;
                }
                Ok(())
            }
            Response::DiscoverAttributes {
                header,
                attribute_count,
                list_complete,
                discovered,
            } => {
                write!(
                    f,
                    "DiscoverAttributes: {} count={} complete={}",
                    header, attribute_count, list_complete
                )?;
                for (id, dt) in discovered {
                    write!(f, "\n\t0x{:04X} ({:?})", id, dt)?;
                }
                Ok(())
            }
            Response::ZclMessage { header, payload } => {
                write!(f, "ZclMessage: {} PAYL=", header)?;
                write_hex(f, payload)
            }
            Response::Malformed {
                code,
                payload,
                reason,
            } => {
                write!(f, "Malformed CMD=0x{:04X} ({}) PAYL=", code, reason)?;
                write_hex(f, payload)
            }
            Response::Unknown { code, payload } => {
                write!(f, "CMD=0x{:04X},PAYL=", code)?;
                write_hex(f, payload)
            }
        }
    }
}
