//! Async client for ZigBee coordinator CID links.
//!
//! Builds on [`zigbee_cid_protocol`]: the protocol crate turns bytes into
//! responses, this crate adds the parts that need shared state. It owns the
//! byte sink, fans responses out to subscribers and pairs requests with
//! their replies under a timeout.
//!
//! # Example
//!
//! ```rust,ignore
//! use zigbee_cid_client::{CidClient, ClientConfig};
//!
//! let client = Arc::new(CidClient::new(port_writer, ClientConfig::default()));
//!
//! // reader task
//! let reader = client.clone();
//! std::thread::spawn(move || loop {
//!     let n = port_reader.read(&mut buf)?;
//!     reader.on_bytes_received(&buf[..n]);
//! });
//!
//! let info = client.ping().await?;
//! ```

mod client;
mod config;
mod correlator;
mod error;

pub use client::CidClient;
pub use config::ClientConfig;
pub use correlator::{Correlator, PendingReply};
pub use error::{ClientError, ClientResult};

pub use zigbee_cid_protocol as protocol;
