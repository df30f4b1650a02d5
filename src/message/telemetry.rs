//! Telemetry responses of the charge controller.
//!
//! Every poll produces notifications of two kinds on the same characteristic:
//! a short acknowledgement of the write (`01 06 ...`) and the telemetry frame
//! itself (`01 03 <len> ...`, at least 42 bytes). Values are big-endian.
//!
//! Byte    | Meaning
//! ------- | ------------------------------------
//! 0..2    | Header `[0x01, 0x03]`
//! 2       | Length (not checked)
//! 5..7    | Battery voltage, V/10
//! 7..9    | Battery current, A/100
//! 9..11   | Battery power, W
//! 11      | Controller temperature, ºC
//! 13..15  | Load voltage, V/10
//! 15..17  | Load current, A/100
//! 17..19  | Load power, W/10
//! 19..21  | Panel voltage, V/10
//! 21..23  | Max charge power today, W
//! 23..25  | Energy charged today, Wh
//! 31..33  | Running days
//! 35..37  | Total energy charged, Wh
//!
//! The remaining bytes are not modelled and ignored. The trailing CRC is not verified.

use crate::error::DecodeError;
use crate::sample::Sample;

/// Header of a telemetry response to a read request
pub const TELEMETRY_HEADER: [u8; 2] = [0x01, 0x03];
/// Header of the acknowledgement the controller sends after each write
pub const WRITE_ACK_HEADER: [u8; 2] = [0x01, 0x06];
/// Shortest frame that can carry a full reading
pub const TELEMETRY_FRAME_LEN: usize = 42;

/// Byte offsets of the modelled fields within a telemetry frame
pub(crate) struct Offsets {}

impl Offsets {
    pub const BATTERY_VOLTAGE: usize = 5;
    pub const BATTERY_CURRENT: usize = 7;
    pub const BATTERY_POWER: usize = 9;
    pub const CONTROLLER_TEMPERATURE: usize = 11;
    pub const LOAD_VOLTAGE: usize = 13;
    pub const LOAD_CURRENT: usize = 15;
    pub const LOAD_POWER: usize = 17;
    pub const PANEL_VOLTAGE: usize = 19;
    pub const MAX_CHARGE_POWER: usize = 21;
    pub const ENERGY_TODAY: usize = 23;
    pub const RUNNING_DAYS: usize = 31;
    pub const TOTAL_ENERGY: usize = 35;
}

const DECIVOLTS: f32 = 10.0;
const CENTIAMPS: f32 = 100.0;
const DECIWATTS: f32 = 10.0;

/// The result of interpreting one notification payload
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryMessage {
    /// A complete telemetry frame
    Sample(Sample),
    /// A write acknowledgement; carries no reading
    NotTelemetry,
    /// A payload that is neither of the above
    Malformed(DecodeError),
}

impl TelemetryMessage {
    pub fn parse(data: &[u8]) -> Self {
        decode(data).into()
    }

    pub fn into_result(self) -> Result<Option<Sample>, DecodeError> {
        match self {
            TelemetryMessage::Sample(sample) => Ok(Some(sample)),
            TelemetryMessage::NotTelemetry => Ok(None),
            TelemetryMessage::Malformed(err) => Err(err),
        }
    }
}

impl From<Result<Option<Sample>, DecodeError>> for TelemetryMessage {
    fn from(result: Result<Option<Sample>, DecodeError>) -> Self {
        match result {
            Ok(Some(sample)) => TelemetryMessage::Sample(sample),
            Ok(None) => TelemetryMessage::NotTelemetry,
            Err(err) => TelemetryMessage::Malformed(err),
        }
    }
}

/// Decode one notification payload.
///
/// Returns `Ok(None)` for write acknowledgements. Short frames are classified
/// by their first two bytes before the telemetry header is considered, so a
/// truncated `01 03` frame is an [`DecodeError::InvalidResponse`].
pub fn decode(data: &[u8]) -> Result<Option<Sample>, DecodeError> {
    if data.len() < TELEMETRY_FRAME_LEN {
        if data.len() < 2 {
            return Err(DecodeError::FrameTooShort {
                required: TELEMETRY_FRAME_LEN,
                actual: data.len(),
            });
        }
        if data[0..2] == WRITE_ACK_HEADER {
            return Ok(None);
        }
        return Err(DecodeError::InvalidResponse { data: data.to_vec() });
    }

    if data[0..2] != TELEMETRY_HEADER {
        return Err(DecodeError::InvalidHeader { data: data.to_vec() });
    }

    Ok(Some(Sample {
        battery_voltage: word(data, Offsets::BATTERY_VOLTAGE) as f32 / DECIVOLTS,
        battery_current: word(data, Offsets::BATTERY_CURRENT) as f32 / CENTIAMPS,
        battery_power: word(data, Offsets::BATTERY_POWER),
        controller_temperature: data[Offsets::CONTROLLER_TEMPERATURE] as f32,
        load_voltage: word(data, Offsets::LOAD_VOLTAGE) as f32 / DECIVOLTS,
        load_current: word(data, Offsets::LOAD_CURRENT) as f32 / CENTIAMPS,
        load_power: word(data, Offsets::LOAD_POWER) as f32 / DECIWATTS,
        panel_voltage: word(data, Offsets::PANEL_VOLTAGE) as f32 / DECIVOLTS,
        max_charge_power: word(data, Offsets::MAX_CHARGE_POWER),
        energy_today: word(data, Offsets::ENERGY_TODAY),
        running_days: word(data, Offsets::RUNNING_DAYS),
        total_energy: word(data, Offsets::TOTAL_ENERGY),
    }))
}

fn word(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Vec<u8> {
        let mut data = vec![0u8; TELEMETRY_FRAME_LEN];
        data[0..3].copy_from_slice(&[0x01, 0x03, 0x26]);
        data
    }

    fn put(data: &mut [u8], offset: usize, value: u16) {
        data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }

    #[test]
    fn test_empty_and_single_byte_are_too_short() {
        assert_eq!(
            decode(&[]),
            Err(DecodeError::FrameTooShort { required: 42, actual: 0 })
        );
        assert_eq!(
            decode(&[0x01]),
            Err(DecodeError::FrameTooShort { required: 42, actual: 1 })
        );
    }

    #[test]
    fn test_write_ack_is_not_telemetry() {
        assert_eq!(decode(&[0x01, 0x06]), Ok(None));
        let ack = hex::decode("0106010100134dfa").unwrap();
        assert_eq!(decode(&ack), Ok(None));
        let mut long_ack = vec![0u8; 41];
        long_ack[0..2].copy_from_slice(&WRITE_ACK_HEADER);
        assert_eq!(decode(&long_ack), Ok(None));
    }

    #[test]
    fn test_unknown_short_frame_is_invalid_response() {
        assert_eq!(
            decode(&[0x01, 0x02]),
            Err(DecodeError::InvalidResponse { data: vec![0x01, 0x02] })
        );
    }

    #[test]
    fn test_truncated_telemetry_is_invalid_response() {
        let mut data = frame();
        data.truncate(41);
        assert_eq!(
            decode(&data),
            Err(DecodeError::InvalidResponse { data: data.clone() })
        );
    }

    #[test]
    fn test_long_frame_with_wrong_header_is_invalid_header() {
        let mut data = frame();
        data[0] = 0x02;
        assert_eq!(
            decode(&data),
            Err(DecodeError::InvalidHeader { data: data.clone() })
        );

        let mut ack_sized_wrong = frame();
        ack_sized_wrong[1] = 0x06;
        assert!(matches!(
            decode(&ack_sized_wrong),
            Err(DecodeError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_battery_voltage_scaling() {
        let mut data = frame();
        data[5] = 0x00;
        data[6] = 0x96;
        let sample = decode(&data).unwrap().unwrap();
        assert_eq!(sample.battery_voltage, 15.0);
    }

    #[test]
    fn test_every_field_from_its_offset() {
        let mut data = frame();
        put(&mut data, 5, 136);
        put(&mut data, 7, 425);
        put(&mut data, 9, 57);
        data[11] = 31;
        put(&mut data, 13, 135);
        put(&mut data, 15, 50);
        put(&mut data, 17, 68);
        put(&mut data, 19, 182);
        put(&mut data, 21, 120);
        put(&mut data, 23, 340);
        put(&mut data, 31, 12);
        put(&mut data, 35, 0xfedc);

        let sample = decode(&data).unwrap().unwrap();
        assert_eq!(
            sample,
            Sample {
                battery_voltage: 13.6,
                battery_current: 4.25,
                battery_power: 57,
                controller_temperature: 31.0,
                load_voltage: 13.5,
                load_current: 0.5,
                load_power: 6.8,
                panel_voltage: 18.2,
                max_charge_power: 120,
                energy_today: 340,
                running_days: 12,
                total_energy: 0xfedc,
            }
        );
    }

    #[test]
    fn test_reserved_bytes_are_ignored() {
        let mut data = frame();
        put(&mut data, 5, 128);
        let baseline = decode(&data).unwrap();

        for offset in [12usize, 25, 26, 27, 28, 29, 30, 33, 34, 37, 38, 39, 40, 41] {
            data[offset] = 0xff;
        }
        data.extend_from_slice(&[0xaa, 0xbb, 0xcc]);
        assert_eq!(decode(&data).unwrap(), baseline);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let mut data = frame();
        put(&mut data, 7, 1234);
        put(&mut data, 19, 211);
        let first = decode(&data).unwrap().unwrap();
        let second = decode(&data).unwrap().unwrap();
        assert_eq!(first.battery_current.to_bits(), second.battery_current.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_tri_state() {
        let mut data = frame();
        put(&mut data, 5, 150);
        assert!(matches!(TelemetryMessage::parse(&data), TelemetryMessage::Sample(_)));
        assert_eq!(TelemetryMessage::parse(&[0x01, 0x06]), TelemetryMessage::NotTelemetry);
        assert_eq!(
            TelemetryMessage::parse(&[0x01]),
            TelemetryMessage::Malformed(DecodeError::FrameTooShort { required: 42, actual: 1 })
        );
        assert_eq!(TelemetryMessage::parse(&data).into_result(), decode(&data));
    }
}
