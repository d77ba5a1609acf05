//! ZigBee Coordinator CID Protocol
//!
//! This crate provides types and utilities for talking to a ZigBee
//! coordinator module over its serial command interface (CID). It does no
//! I/O: bytes go in through a [`StreamReassembler`] and come out as
//! [`Response`] values, and outgoing [`CidPacket`]s encode to byte vectors.
//!
//! # Protocol Overview
//!
//! Every message in both directions is one frame:
//!
//! ```text
//! [0x02][cmd_hi][cmd_lo][len][payload...][fcs]
//! ```
//!
//! - **Commands** (host → coordinator) use codes below 0x1000
//! - **Responses** (coordinator → host) have bit 12 set (`0x1xxx`)
//! - Incoming ZCL messages (`0x1031`) carry attribute records whose values
//!   are self-describing; see [`decode_attribute`]
//!
//! # Example
//!
//! ```rust,ignore
//! use zigbee_cid_protocol::{CidPacket, StreamReassembler};
//!
//! let frame = CidPacket::ping().encode()?;
//! port.write_all(&frame)?;
//!
//! let mut reassembler = StreamReassembler::new();
//! reassembler.on_bytes_received(&received, |response| println!("{}", response));
//! ```

mod attribute;
mod bits;
mod clusters;
mod constants;
mod error;
mod frame;
mod packets;
mod reassembler;
mod responses;
mod types;

pub use attribute::*;
pub use bits::*;
pub use clusters::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use packets::*;
pub use reassembler::*;
pub use responses::*;
pub use types::*;
