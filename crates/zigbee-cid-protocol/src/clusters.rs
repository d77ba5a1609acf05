//! ZCL cluster ids and measurement helpers.

use std::fmt;

use crate::attribute::{AttributeList, AttributeValue, DataType};

/// Well-known ZCL cluster ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ClusterId {
    // General
    Basic = 0x0000,
    PowerConfiguration = 0x0001,
    DeviceTemperatureConfiguration = 0x0002,
    Identify = 0x0003,
    Groups = 0x0004,
    Scenes = 0x0005,
    OnOff = 0x0006,
    OnOffSwitchConfiguration = 0x0007,
    LevelControl = 0x0008,
    Alarms = 0x0009,
    Time = 0x000A,
    RssiLocation = 0x000B,
    AnalogInput = 0x000C,
    AnalogOutput = 0x000D,
    AnalogValue = 0x000E,
    BinaryInput = 0x000F,
    BinaryOutput = 0x0010,
    BinaryValue = 0x0011,
    MultiStateInput = 0x0012,
    MultiStateOutput = 0x0013,
    MultiStateValue = 0x0014,

    // Closures
    ShadeConfiguration = 0x0100,
    DoorLock = 0x0101,

    // HVAC
    PumpConfigurationAndControl = 0x0200,
    Thermostat = 0x0201,
    FanControl = 0x0202,
    DehumidificationControl = 0x0203,
    ThermostatUserInterfaceConfiguration = 0x0204,

    // Lighting
    ColorControl = 0x0300,
    BallastConfiguration = 0x0301,

    // Measurement and sensing
    IlluminanceMeasurement = 0x0400,
    IlluminanceLevelSensing = 0x0401,
    TemperatureMeasurement = 0x0402,
    PressureMeasurement = 0x0403,
    FlowMeasurement = 0x0404,
    RelativeHumidityMeasurement = 0x0405,
    OccupancySensing = 0x0406,

    // Security and safety
    IasWarningDevice = 0x0500,
    IasZone = 0x0501,
    IasAce = 0x0502,

    // Smart energy
    Price = 0x0700,
    DemandResponseAndLoadControl = 0x0701,
    Metering = 0x0702,
    Messaging = 0x0703,
    SmartEnergyTunneling = 0x0704,
    Prepayment = 0x0705,
    KeyEstablishment = 0x0800,
}

impl ClusterId {
    const ALL: &'static [ClusterId] = &[
        ClusterId::Basic,
        ClusterId::PowerConfiguration,
        ClusterId::DeviceTemperatureConfiguration,
        ClusterId::Identify,
        ClusterId::Groups,
        ClusterId::Scenes,
        ClusterId::OnOff,
        ClusterId::OnOffSwitchConfiguration,
        ClusterId::LevelControl,
        ClusterId::Alarms,
        ClusterId::Time,
        ClusterId::RssiLocation,
        ClusterId::AnalogInput,
        ClusterId::AnalogOutput,
        ClusterId::AnalogValue,
        ClusterId::BinaryInput,
        ClusterId::BinaryOutput,
        ClusterId::BinaryValue,
        ClusterId::MultiStateInput,
        ClusterId::MultiStateOutput,
        ClusterId::MultiStateValue,
        ClusterId::ShadeConfiguration,
        ClusterId::DoorLock,
        ClusterId::PumpConfigurationAndControl,
        ClusterId::Thermostat,
        ClusterId::FanControl,
        ClusterId::DehumidificationControl,
        ClusterId::ThermostatUserInterfaceConfiguration,
        ClusterId::ColorControl,
        ClusterId::BallastConfiguration,
        ClusterId::IlluminanceMeasurement,
        ClusterId::IlluminanceLevelSensing,
        ClusterId::TemperatureMeasurement,
        ClusterId::PressureMeasurement,
        ClusterId::FlowMeasurement,
        ClusterId::RelativeHumidityMeasurement,
        ClusterId::OccupancySensing,
        ClusterId::IasWarningDevice,
        ClusterId::IasZone,
        ClusterId::IasAce,
        ClusterId::Price,
        ClusterId::DemandResponseAndLoadControl,
        ClusterId::Metering,
        ClusterId::Messaging,
        ClusterId::SmartEnergyTunneling,
        ClusterId::Prepayment,
        ClusterId::KeyEstablishment,
    ];

    /// Look up a cluster by its numeric id.
    pub fn from_u16(id: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| *c as u16 == id)
    }

    /// The numeric id.
    pub fn id(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:04X})", self, *self as u16)
    }
}

/// Attribute value scaled by 1/100 when its type matches `expected`.
fn hundredths(attrs: &AttributeList, id: u16, expected: DataType) -> Option<f32> {
    let record = attrs.get(id)?;
    if record.data_type != expected {
        return None;
    }
    match record.value {
        AttributeValue::Signed(v) => Some(v as f32 / 100.0),
        AttributeValue::Unsigned(v) => Some(v as f32 / 100.0),
        _ => None,
    }
}

/// Temperature Measurement cluster (0x0402) readings, in °C.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureMeasurement {
    /// Current reading.
    pub measured_value: Option<f32>,
    /// Lowest value the sensor can report.
    pub min_measured_value: Option<f32>,
    /// Highest value the sensor can report.
    pub max_measured_value: Option<f32>,
    /// Accuracy of `measured_value`, as plus or minus.
    pub tolerance: Option<f32>,
}

impl TemperatureMeasurement {
    /// Read the measurement attributes out of an attribute report.
    ///
    /// Values are signed 16-bit, tolerance is unsigned 16-bit; attributes
    /// that are missing or carry another type stay `None`.
    pub fn from_attributes(attrs: &AttributeList) -> Self {
        TemperatureMeasurement {
            measured_value: hundredths(attrs, 0x0000, DataType::Int(2)),
            min_measured_value: hundredths(attrs, 0x0001, DataType::Int(2)),
            max_measured_value: hundredths(attrs, 0x0002, DataType::Int(2)),
            tolerance: hundredths(attrs, 0x0003, DataType::UInt(2)),
        }
    }
}

impl fmt::Display for TemperatureMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Temperature: ")?;
        write_reading(f, self.measured_value, "C", self.tolerance)
    }
}

/// Relative Humidity Measurement cluster (0x0405) readings, in %.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RelativeHumidity {
    /// Current reading.
    pub measured_value: Option<f32>,
    /// Lowest value the sensor can report.
    pub min_measured_value: Option<f32>,
    /// Highest value the sensor can report.
    pub max_measured_value: Option<f32>,
    /// Accuracy of `measured_value`, as plus or minus.
    pub tolerance: Option<f32>,
}

impl RelativeHumidity {
    /// Read the measurement attributes; all four are unsigned 16-bit.
    pub fn from_attributes(attrs: &AttributeList) -> Self {
        RelativeHumidity {
            measured_value: hundredths(attrs, 0x0000, DataType::UInt(2)),
            min_measured_value: hundredths(attrs, 0x0001, DataType::UInt(2)),
            max_measured_value: hundredths(attrs, 0x0002, DataType::UInt(2)),
            tolerance: hundredths(attrs, 0x0003, DataType::UInt(2)),
        }
    }
}

impl fmt::Display for RelativeHumidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Humidity: ")?;
        write_reading(f, self.measured_value, "%", self.tolerance)
    }
}

fn write_reading(
    f: &mut fmt::Formatter<'_>,
    value: Option<f32>,
    unit: &str,
    tolerance: Option<f32>,
) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{}{}", v, unit)?,
        None => write!(f, "n/a")?,
    }
    if let Some(t) = tolerance {
        write!(f, " (+/- {})", t)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::decode_attribute_list;

    #[test]
    fn test_cluster_lookup() {
        assert_eq!(ClusterId::from_u16(0x0402), Some(ClusterId::TemperatureMeasurement));
        assert_eq!(ClusterId::from_u16(0x0800), Some(ClusterId::KeyEstablishment));
        assert_eq!(ClusterId::from_u16(0x0600), None);
        assert_eq!(ClusterId::OnOff.id(), 0x0006);
        for c in ClusterId::ALL {
            assert_eq!(ClusterId::from_u16(c.id()), Some(*c));
        }
    }

    #[test]
    fn test_temperature_from_attributes() {
        let payload = [
            0x00, 0x00, 0x29, 0xFF, 0x38, // -2.00
            0x00, 0x01, 0x29, 0xF0, 0x60, // -40.00
            0x00, 0x03, 0x21, 0x00, 0x32, // 0.50
        ];
        let (attrs, truncated) = decode_attribute_list(&payload, 0, 3);
        assert!(truncated.is_none());
        let t = TemperatureMeasurement::from_attributes(&attrs);
        assert_eq!(t.measured_value, Some(-2.0));
        assert_eq!(t.min_measured_value, Some(-40.0));
        assert_eq!(t.max_measured_value, None);
        assert_eq!(t.tolerance, Some(0.5));
        assert_eq!(t.to_string(), "Temperature: -2C (+/- 0.5)");
    }

    #[test]
    fn test_wrong_type_is_ignored() {
        // measured value sent as uint16 instead of int16
        let payload = [0x00, 0x00, 0x21, 0x08, 0x34];
        let (attrs, _) = decode_attribute_list(&payload, 0, 1);
        let t = TemperatureMeasurement::from_attributes(&attrs);
        assert_eq!(t.measured_value, None);

        let h = RelativeHumidity::from_attributes(&attrs);
        assert_eq!(h.measured_value, Some(21.0));
        assert_eq!(h.to_string(), "Humidity: 21%");
    }
}
