//! ZCL attribute records.
//!
//! An attribute record on the wire is a 16-bit attribute id, a one-byte data
//! type tag, and a value whose width is determined by the tag alone:
//!
//! ```text
//! +--------+--------+------+-----------------+
//! | id_hi  | id_lo  | type | value (by type) |
//! +--------+--------+------+-----------------+
//! ```
//!
//! [`decode_attribute`] is a pure function over a byte slice. An unknown type
//! tag cannot be skipped (its width is unknown), so it decodes to
//! [`AttributeValue::Unrecognized`] with zero value bytes and list decoding
//! stops there.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::bits::{read_int, read_u16, read_u32, read_u8, read_uint, slice_at};
use crate::constants::ZIGBEE_EPOCH_UNIX_SECS;
use crate::error::ProtocolError;

/// ZCL data type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No data.
    Null,
    /// General data of 1..=8 bytes (0x08..=0x0F).
    GeneralData(u8),
    /// Boolean.
    Boolean,
    /// Bitmap of 1..=4 bytes (0x18..=0x1B).
    Bitmap(u8),
    /// Unsigned integer of 1..=8 bytes (0x20..=0x27).
    UInt(u8),
    /// Signed integer of 1..=8 bytes (0x28..=0x2F).
    Int(u8),
    /// 8-bit enumeration.
    Enum8,
    /// 16-bit enumeration.
    Enum16,
    /// Half-precision float.
    Float16,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// Octet string with a 1-byte length.
    OctetString,
    /// Character string with a 1-byte length.
    CharString,
    /// Octet string with a 2-byte length.
    LongOctetString,
    /// Character string with a 2-byte length.
    LongCharString,
    /// Array (sent with a 2-byte length).
    Array,
    /// Structure.
    Structure,
    /// Set collection.
    Set,
    /// Bag collection.
    Bag,
    /// Time of day.
    TimeOfDay,
    /// Date.
    Date,
    /// UTC time, seconds since 2000-01-01.
    UtcTime,
    /// Cluster id.
    ClusterId,
    /// Attribute id.
    AttributeId,
    /// BACnet object identifier.
    BacnetOid,
    /// IEEE (EUI-64) address.
    IeeeAddress,
    /// Explicit invalid marker (0xFF).
    Invalid,
    /// A tag outside the enumeration.
    Unknown(u8),
}

impl DataType {
    /// The wire tag for this type.
    pub fn tag(self) -> u8 {
        match self {
            DataType::Null => 0x00,
            DataType::GeneralData(n) => 0x07 + n,
            DataType::Boolean => 0x10,
            DataType::Bitmap(n) => 0x17 + n,
            DataType::UInt(n) => 0x1F + n,
            DataType::Int(n) => 0x27 + n,
            DataType::Enum8 => 0x30,
            DataType::Enum16 => 0x31,
            DataType::Float16 => 0x38,
            DataType::Float32 => 0x39,
            DataType::Float64 => 0x3A,
            DataType::OctetString => 0x41,
            DataType::CharString => 0x42,
            DataType::LongOctetString => 0x43,
            DataType::LongCharString => 0x44,
            DataType::Array => 0x48,
            DataType::Structure => 0x4C,
            DataType::Set => 0x50,
            DataType::Bag => 0x51,
            DataType::TimeOfDay => 0xE0,
            DataType::Date => 0xE1,
            DataType::UtcTime => 0xE2,
            DataType::ClusterId => 0xE8,
            DataType::AttributeId => 0xE9,
            DataType::BacnetOid => 0xEA,
            DataType::IeeeAddress => 0xF0,
            DataType::Invalid => 0xFF,
            DataType::Unknown(tag) => tag,
        }
    }

    /// Width in bytes of a value of this type, when it is fixed.
    ///
    /// Strings and arrays carry their own length prefix and return `None`, as
    /// do types this codec cannot size.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::Null => Some(0),
            DataType::GeneralData(n)
            | DataType::Bitmap(n)
            | DataType::UInt(n)
            | DataType::Int(n) => Some(n as usize),
            DataType::Boolean | DataType::Enum8 => Some(1),
            DataType::Enum16
            | DataType::Float16
            | DataType::ClusterId
            | DataType::AttributeId => Some(2),
            DataType::Date => Some(3),
            DataType::Float32 | DataType::TimeOfDay | DataType::UtcTime | DataType::BacnetOid => {
                Some(4)
            }
            DataType::Float64 | DataType::IeeeAddress => Some(8),
            _ => None,
        }
    }
}

impl From<u8> for DataType {
    fn from(tag: u8) -> Self {
        match tag {
            0x00 => DataType::Null,
            0x08..=0x0F => DataType::GeneralData(tag - 0x07),
            0x10 => DataType::Boolean,
            0x18..=0x1B => DataType::Bitmap(tag - 0x17),
            0x20..=0x27 => DataType::UInt(tag - 0x1F),
            0x28..=0x2F => DataType::Int(tag - 0x27),
            0x30 => DataType::Enum8,
            0x31 => DataType::Enum16,
            0x38 => DataType::Float16,
            0x39 => DataType::Float32,
            0x3A => DataType::Float64,
            0x41 => DataType::OctetString,
            0x42 => DataType::CharString,
            0x43 => DataType::LongOctetString,
            0x44 => DataType::LongCharString,
            0x48 => DataType::Array,
            0x4C => DataType::Structure,
            0x50 => DataType::Set,
            0x51 => DataType::Bag,
            0xE0 => DataType::TimeOfDay,
            0xE1 => DataType::Date,
            0xE2 => DataType::UtcTime,
            0xE8 => DataType::ClusterId,
            0xE9 => DataType::AttributeId,
            0xEA => DataType::BacnetOid,
            0xF0 => DataType::IeeeAddress,
            0xFF => DataType::Invalid,
            other => DataType::Unknown(other),
        }
    }
}

impl From<DataType> for u8 {
    fn from(dt: DataType) -> Self {
        dt.tag()
    }
}

/// A ZCL boolean.
///
/// Only 0x01 is true and only 0x00 is false; every other byte, including the
/// 0xFF "invalid" sentinel, is kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZclBool {
    /// 0x00.
    False,
    /// 0x01.
    True,
    /// Any other byte.
    Invalid(u8),
}

impl ZclBool {
    /// The sentinel the ZCL uses for "no valid value".
    pub const SENTINEL: u8 = 0xFF;

    /// `Some(bool)` for a valid value, `None` otherwise.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            ZclBool::False => Some(false),
            ZclBool::True => Some(true),
            ZclBool::Invalid(_) => None,
        }
    }
}

impl From<u8> for ZclBool {
    fn from(b: u8) -> Self {
        match b {
            0x00 => ZclBool::False,
            0x01 => ZclBool::True,
            other => ZclBool::Invalid(other),
        }
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Zero-width null value.
    Null,
    /// Opaque general data.
    Data(Vec<u8>),
    /// Boolean.
    Boolean(ZclBool),
    /// Bitmap.
    Bitmap(u64),
    /// Unsigned integer, cluster/attribute id, BACnet OID or IEEE address.
    Unsigned(u64),
    /// Signed integer.
    Signed(i64),
    /// Enumeration.
    Enum(u16),
    /// Floating point (all widths widened to `f64`).
    Float(f64),
    /// Octet string.
    Octets(Vec<u8>),
    /// Character string.
    Text(String),
    /// Array contents, undecoded.
    Array(Vec<u8>),
    /// Time of day.
    TimeOfDay {
        /// Hours (0-23).
        hours: u8,
        /// Minutes (0-59).
        minutes: u8,
        /// Seconds (0-59).
        seconds: u8,
        /// Hundredths of a second (0-99).
        hundredths: u8,
    },
    /// Calendar date.
    Date {
        /// Years since 1900.
        year_offset: u8,
        /// Month (1-12).
        month: u8,
        /// Day of month (1-31).
        day: u8,
    },
    /// UTC time.
    UtcTime(DateTime<Utc>),
    /// The type tag could not be decoded; no value bytes were consumed.
    Unrecognized,
}

impl AttributeValue {
    /// Unsigned view of integer-like values.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttributeValue::Unsigned(v) | AttributeValue::Bitmap(v) => Some(*v),
            AttributeValue::Enum(v) => Some(*v as u64),
            AttributeValue::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Signed view of integer-like values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Signed(v) => Some(*v),
            AttributeValue::Unsigned(v) | AttributeValue::Bitmap(v) => i64::try_from(*v).ok(),
            AttributeValue::Enum(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Full calendar year of a [`AttributeValue::Date`].
    pub fn year(&self) -> Option<u16> {
        match self {
            AttributeValue::Date { year_offset, .. } => Some(1900 + *year_offset as u16),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Data(b) | AttributeValue::Octets(b) | AttributeValue::Array(b) => {
                write!(f, "[")?;
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:02X}", byte)?;
                }
                write!(f, "]")
            }
            AttributeValue::Boolean(ZclBool::True) => write!(f, "true"),
            AttributeValue::Boolean(ZclBool::False) => write!(f, "false"),
            AttributeValue::Boolean(ZclBool::Invalid(b)) => write!(f, "invalid(0x{:02X})", b),
            AttributeValue::Bitmap(v) => write!(f, "0b{:b}", v),
            AttributeValue::Unsigned(v) => write!(f, "{}", v),
            AttributeValue::Signed(v) => write!(f, "{}", v),
            AttributeValue::Enum(v) => write!(f, "enum({})", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Text(s) => write!(f, "{:?}", s),
            AttributeValue::TimeOfDay {
                hours,
                minutes,
                seconds,
                hundredths,
            } => write!(f, "{:02}:{:02}:{:02}.{:02}", hours, minutes, seconds, hundredths),
            AttributeValue::Date {
                year_offset,
                month,
                day,
            } => write!(f, "{:04}-{:02}-{:02}", 1900 + *year_offset as u16, month, day),
            AttributeValue::UtcTime(t) => write!(f, "{}", t.to_rfc3339()),
            AttributeValue::Unrecognized => write!(f, "?"),
        }
    }
}

/// One decoded attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    /// Attribute id within the cluster.
    pub id: u16,
    /// Wire type tag.
    pub data_type: DataType,
    /// Decoded value.
    pub value: AttributeValue,
}

impl AttributeRecord {
    /// Whether the codec could not decode this record's type.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self.value, AttributeValue::Unrecognized)
    }
}

impl fmt::Display for AttributeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}: {} ({:?})", self.id, self.value, self.data_type)
    }
}

/// Attributes keyed by id, in first-seen order.
///
/// Inserting an id that is already present replaces its record in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeList {
    records: Vec<AttributeRecord>,
}

impl AttributeList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record; a later duplicate id wins.
    pub fn insert(&mut self, record: AttributeRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Look up an attribute by id.
    pub fn get(&self, id: u16) -> Option<&AttributeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Whether an attribute id is present.
    pub fn contains(&self, id: u16) -> bool {
        self.get(id).is_some()
    }

    /// Number of distinct attributes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.records.iter()
    }
}

impl FromIterator<AttributeRecord> for AttributeList {
    fn from_iter<I: IntoIterator<Item = AttributeRecord>>(iter: I) -> Self {
        let mut list = AttributeList::new();
        for record in iter {
            list.insert(record);
        }
        list
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a AttributeRecord;
    type IntoIter = std::slice::Iter<'a, AttributeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Why attribute list decoding stopped before the declared count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListTruncation {
    /// A record carried a type tag the codec cannot size.
    UnrecognizedType {
        /// Attribute id of the offending record.
        attribute_id: u16,
        /// The tag.
        tag: u8,
    },
    /// A record ran past the end of the payload.
    Truncated(ProtocolError),
}

/// Decode one attribute record starting at `offset`.
///
/// Returns the record and the number of bytes it occupied (id, tag and value).
pub fn decode_attribute(
    payload: &[u8],
    offset: usize,
) -> Result<(AttributeRecord, usize), ProtocolError> {
    let id = read_u16(payload, offset)?;
    let tag = read_u8(payload, offset + 2)?;
    let data_type = DataType::from(tag);
    let start = offset + 3;
    let (value, width) = decode_value(payload, start, data_type)?;
    if matches!(value, AttributeValue::Unrecognized) {
        log::debug!(
            "attribute 0x{:04X}: unrecognized data type 0x{:02X}, value not decoded",
            id,
            tag
        );
    }
    Ok((
        AttributeRecord {
            id,
            data_type,
            value,
        },
        3 + width,
    ))
}

fn decode_value(
    payload: &[u8],
    at: usize,
    data_type: DataType,
) -> Result<(AttributeValue, usize), ProtocolError> {
    let value = match data_type {
        DataType::Null => return Ok((AttributeValue::Null, 0)),
        DataType::GeneralData(n) => {
            AttributeValue::Data(slice_at(payload, at, n as usize)?.to_vec())
        }
        DataType::Boolean => AttributeValue::Boolean(ZclBool::from(read_u8(payload, at)?)),
        DataType::Bitmap(n) => AttributeValue::Bitmap(read_uint(payload, at, n as usize)?),
        DataType::UInt(n) => AttributeValue::Unsigned(read_uint(payload, at, n as usize)?),
        DataType::Int(n) => AttributeValue::Signed(read_int(payload, at, n as usize)?),
        DataType::Enum8 => AttributeValue::Enum(read_u8(payload, at)? as u16),
        DataType::Enum16 => AttributeValue::Enum(read_u16(payload, at)?),
        DataType::Float16 => AttributeValue::Float(half_to_f32(read_u16(payload, at)?) as f64),
        DataType::Float32 => AttributeValue::Float(f32::from_bits(read_u32(payload, at)?) as f64),
        DataType::Float64 => AttributeValue::Float(f64::from_bits(read_uint(payload, at, 8)?)),
        DataType::OctetString => {
            let len = read_u8(payload, at)? as usize;
            let bytes = slice_at(payload, at + 1, len)?.to_vec();
            return Ok((AttributeValue::Octets(bytes), 1 + len));
        }
        DataType::CharString => {
            let len = read_u8(payload, at)? as usize;
            let text = String::from_utf8_lossy(slice_at(payload, at + 1, len)?).to_string();
            return Ok((AttributeValue::Text(text), 1 + len));
        }
        DataType::LongOctetString => {
            let len = read_u16(payload, at)? as usize;
            let bytes = slice_at(payload, at + 2, len)?.to_vec();
            return Ok((AttributeValue::Octets(bytes), 2 + len));
        }
        DataType::LongCharString => {
            let len = read_u16(payload, at)? as usize;
            let text = String::from_utf8_lossy(slice_at(payload, at + 2, len)?).to_string();
            return Ok((AttributeValue::Text(text), 2 + len));
        }
        DataType::Array => {
            let len = read_u16(payload, at)? as usize;
            let bytes = slice_at(payload, at + 2, len)?.to_vec();
            return Ok((AttributeValue::Array(bytes), 2 + len));
        }
        DataType::TimeOfDay => {
            let b = slice_at(payload, at, 4)?;
            AttributeValue::TimeOfDay {
                hours: b[0],
                minutes: b[1],
                seconds: b[2],
                hundredths: b[3],
            }
        }
        DataType::Date => {
            let b = slice_at(payload, at, 3)?;
            AttributeValue::Date {
                year_offset: b[0],
                month: b[1],
                day: b[2],
            }
        }
        DataType::UtcTime => AttributeValue::UtcTime(zigbee_time(read_u32(payload, at)?)),
        DataType::ClusterId | DataType::AttributeId => {
            AttributeValue::Unsigned(read_u16(payload, at)? as u64)
        }
        DataType::BacnetOid => AttributeValue::Unsigned(read_u32(payload, at)? as u64),
        DataType::IeeeAddress => AttributeValue::Unsigned(read_uint(payload, at, 8)?),
        DataType::Structure
        | DataType::Set
        | DataType::Bag
        | DataType::Invalid
        | DataType::Unknown(_) => return Ok((AttributeValue::Unrecognized, 0)),
    };
    // All remaining arms are fixed width.
    let width = data_type.fixed_width().unwrap_or(0);
    Ok((value, width))
}

/// Decode up to `count` records starting at `offset`.
///
/// Stops early, returning the reason, after the first record with an
/// unrecognized type (included in the list) or when a record is truncated.
pub fn decode_attribute_list(
    payload: &[u8],
    mut offset: usize,
    count: usize,
) -> (AttributeList, Option<ListTruncation>) {
    let mut list = AttributeList::new();
    for _ in 0..count {
        match decode_attribute(payload, offset) {
            Ok((record, consumed)) => {
                offset += consumed;
                if record.is_unrecognized() {
                    let reason = ListTruncation::UnrecognizedType {
                        attribute_id: record.id,
                        tag: record.data_type.tag(),
                    };
                    list.insert(record);
                    return (list, Some(reason));
                }
                list.insert(record);
            }
            Err(e) => {
                log::warn!("attribute list cut short at offset {}: {}", offset, e);
                return (list, Some(ListTruncation::Truncated(e)));
            }
        }
    }
    (list, None)
}

/// Convert seconds since the ZigBee epoch to a UTC timestamp.
pub fn zigbee_time(secs: u32) -> DateTime<Utc> {
    // u32 seconds past 2000 always fit chrono's range
    Utc.timestamp_opt(ZIGBEE_EPOCH_UNIX_SECS + secs as i64, 0)
        .single()
        .unwrap_or_default()
}

/// Convert a UTC timestamp to seconds since the ZigBee epoch.
pub fn to_zigbee_secs(time: DateTime<Utc>) -> Result<u32, ProtocolError> {
    let secs = time.timestamp() - ZIGBEE_EPOCH_UNIX_SECS;
    u32::try_from(secs).map_err(|_| {
        ProtocolError::InvalidArgument(format!(
            "{} is outside the ZigBee time range",
            time.to_rfc3339()
        ))
    })
}

/// Widen an IEEE 754 half-precision value.
fn half_to_f32(bits: u16) -> f32 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = ((bits >> 10) & 0x1F) as i32;
    let frac = (bits & 0x03FF) as f32;
    match exp {
        0 => sign * frac * 2f32.powi(-24),
        0x1F if frac == 0.0 => sign * f32::INFINITY,
        0x1F => f32::NAN,
        _ => sign * (1.0 + frac / 1024.0) * 2f32.powi(exp - 15),
    }
}
