use thiserror::Error;

/// Why a notification payload could not be decoded into a [`Sample`](crate::Sample).
///
/// Acknowledgements of poll writes are not errors, see
/// [`TelemetryMessage::NotTelemetry`](crate::TelemetryMessage::NotTelemetry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The transport delivered fewer than the two bytes needed to tell frame kinds apart.
    #[error("invalid response data: too short, expected at least {required} bytes, got {actual}")]
    FrameTooShort { required: usize, actual: usize },

    /// A short frame whose first two bytes are not a known response marker.
    #[error("invalid response data: {}", hex::encode(.data))]
    InvalidResponse { data: Vec<u8> },

    /// A frame long enough to be telemetry without the `01 03` header.
    ///
    /// The controller emits these while it is warming up or mid-transaction.
    #[error("{}", describe_header(.data))]
    InvalidHeader { data: Vec<u8> },
}

impl DecodeError {
    /// True for failures a caller may drop silently.
    pub fn is_suppressible(&self) -> bool {
        matches!(self, DecodeError::InvalidHeader { .. })
    }

    /// The offending payload, when the error carries one.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            DecodeError::FrameTooShort { .. } => None,
            DecodeError::InvalidResponse { data } | DecodeError::InvalidHeader { data } => Some(data),
        }
    }
}

fn describe_header(data: &[u8]) -> String {
    if data.len() < 2 {
        return "invalid header in response data: too short".to_string();
    }
    format!(
        "invalid header in response data (want 0x01 0x03): 0x{:x} 0x{:x}",
        data[0], data[1]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_too_short_message() {
        let err = DecodeError::FrameTooShort { required: 42, actual: 1 };
        assert_eq!(
            err.to_string(),
            "invalid response data: too short, expected at least 42 bytes, got 1"
        );
    }

    #[test]
    fn test_invalid_response_message_is_hex() {
        let err = DecodeError::InvalidResponse { data: vec![0x01, 0x02, 0xab] };
        assert_eq!(err.to_string(), "invalid response data: 0102ab");
    }

    #[test]
    fn test_invalid_header_message() {
        let mut data = vec![0u8; 42];
        data[0] = 0x02;
        data[1] = 0x03;
        let err = DecodeError::InvalidHeader { data };
        assert_eq!(
            err.to_string(),
            "invalid header in response data (want 0x01 0x03): 0x2 0x3"
        );
    }

    #[test]
    fn test_invalid_header_message_short_data() {
        let err = DecodeError::InvalidHeader { data: vec![0x01] };
        assert_eq!(err.to_string(), "invalid header in response data: too short");
    }

    #[test]
    fn test_only_invalid_header_is_suppressible() {
        assert!(DecodeError::InvalidHeader { data: vec![] }.is_suppressible());
        assert!(!DecodeError::InvalidResponse { data: vec![] }.is_suppressible());
        assert!(!DecodeError::FrameTooShort { required: 42, actual: 0 }.is_suppressible());
    }
}
