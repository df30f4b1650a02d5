use crc16::{State, MODBUS};

/// Modbus function code for "read holding registers"
const READ_HOLDING_REGISTERS: u8 = 0x03;

/// A verbatim message to send which requests a telemetry frame
pub const POLL: [u8; 8] = [0x01, 0x03, 0x01, 0x01, 0x00, 0x13, 0x54, 0x3b];

/// Build a Modbus RTU read-holding-registers request.
///
/// Start Byte | End Byte | Meaning
/// 0          | 0        | Slave address
/// 1          | 1        | Function code 0x03
/// 2          | 3        | First register, big-endian
/// 4          | 5        | Register count, big-endian
/// 6          | 7        | MODBUS CRC over bytes 0-5, little-endian
pub fn read_holding_registers(slave: u8, start: u16, count: u16) -> [u8; 8] {
    let [start_hi, start_lo] = start.to_be_bytes();
    let [count_hi, count_lo] = count.to_be_bytes();
    let body = [slave, READ_HOLDING_REGISTERS, start_hi, start_lo, count_hi, count_lo];
    let [crc_lo, crc_hi] = crc(&body);
    [body[0], body[1], body[2], body[3], body[4], body[5], crc_lo, crc_hi]
}

/// Compute the CRC check value for the given bytes
fn crc(data: &[u8]) -> [u8; 2] {
    State::<MODBUS>::calculate(data).to_le_bytes()
}

#[test]
fn test_poll_request_matches_builder() {
    assert_eq!(read_holding_registers(0x01, 0x0101, 0x0013), POLL);
}

#[test]
fn test_poll_request_bytes() {
    assert_eq!(hex::encode(POLL), "010301010013543b");
}

#[test]
fn test_checksum() {
    let payload = [0x01, 0x03, 0x01, 0x01, 0x00, 0x13];
    assert_eq!(State::<MODBUS>::calculate(&payload), 0x3b54);
}

#[test]
fn test_other_register_window() {
    assert_eq!(
        read_holding_registers(0x01, 0xd026, 0x0019),
        [0x01, 0x03, 0xd0, 0x26, 0x00, 0x19, 0x5d, 0x0b]
    );
}
