use crate::error::ConnectionError;
use std::fmt;

/// A negotiated bolt protocol version (spec.md §4.F, §6).
///
/// Wire encoding of the 4-byte handshake reply differs by era: for
/// protocol ≤ 3.x the low byte is the major version; for 4.x and above
/// the low byte is the *minor* and the second-low byte is the *major*
/// (so 4.3 is wire-encoded `00 00 03 04`). [`ProtocolVersion::decode`]
/// and [`ProtocolVersion::encode_proposal`] apply this split themselves
/// so callers never touch the raw byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    pub const V1: ProtocolVersion = ProtocolVersion { major: 1, minor: 0 };
    pub const V2: ProtocolVersion = ProtocolVersion { major: 2, minor: 0 };
    pub const V3: ProtocolVersion = ProtocolVersion { major: 3, minor: 0 };
    pub const V4_0: ProtocolVersion = ProtocolVersion { major: 4, minor: 0 };
    pub const V4_1: ProtocolVersion = ProtocolVersion { major: 4, minor: 1 };
    pub const V4_3: ProtocolVersion = ProtocolVersion { major: 4, minor: 3 };

    /// The four proposals this driver offers in the handshake, high to
    /// low, covering every adapter implemented below. The wire only has
    /// room for four slots; V2 is intentionally omitted from the
    /// proposal set (it differs from V1 only in its codec struct-mapper
    /// registrations, never in wire message shape) in favour of keeping
    /// a V1 floor for the oldest servers this driver still talks to.
    pub const PROPOSALS: [ProtocolVersion; 4] =
        [ProtocolVersion::V4_3, ProtocolVersion::V4_0, ProtocolVersion::V3, ProtocolVersion::V1];

    pub fn is_v1_or_v2(&self) -> bool {
        self.major <= 2
    }

    pub fn supports_explicit_begin(&self) -> bool {
        self.major >= 3
    }

    pub fn supports_qid_pull(&self) -> bool {
        self.major > 4 || (self.major == 4 && self.minor >= 0)
    }

    pub fn supports_database_selector(&self) -> bool {
        self.major > 4 || (self.major == 4 && self.minor >= 0)
    }

    pub fn supports_routing_context_in_hello(&self) -> bool {
        self.major > 4 || (self.major == 4 && self.minor >= 1)
    }

    pub fn supports_route_message(&self) -> bool {
        self.major > 4 || (self.major == 4 && self.minor >= 3)
    }

    /// Big-endian 4-byte handshake proposal for this version, high to
    /// low as spec.md §6 requires: `[0, 0, minor, major]`. Versions ≤ 3.x
    /// also fit this shape since `minor` is always 0 there.
    pub fn encode_proposal(&self) -> [u8; 4] {
        [0, 0, self.minor, self.major]
    }

    /// Decode the server's 4-byte handshake reply. `0x48545450` ("HTTP"
    /// in ASCII) is the well-known wrong-endpoint response; any other
    /// value that doesn't match a proposal we made is fatal.
    pub fn decode(reply: u32) -> Result<ProtocolVersion, ConnectionError> {
        if reply == 0x4854_5450 {
            return Err(ConnectionError::WrongEndpoint);
        }
        if reply == 0 {
            return Err(ConnectionError::NoAgreedVersion(reply));
        }
        let bytes = reply.to_be_bytes();
        let (major, minor) = if bytes[0] == 0 && bytes[1] == 0 {
            // `[0, 0, minor, major]` for 4.x+, or `[0, 0, 0, major]` for ≤3.x.
            if bytes[2] == 0 {
                (bytes[3], 0)
            } else {
                (bytes[3], bytes[2])
            }
        } else {
            return Err(ConnectionError::NoAgreedVersion(reply));
        };
        let version = ProtocolVersion { major, minor };
        if !ProtocolVersion::PROPOSALS.contains(&version) && !is_known_intermediate(version) {
            return Err(ConnectionError::NoAgreedVersion(reply));
        }
        Ok(version)
    }
}

/// Versions this driver can still speak (has an adapter for) even though
/// they weren't offered in [`ProtocolVersion::PROPOSALS`] directly — a
/// server that only understands plain 4.1 but not 4.3/4.0 could in
/// principle still reply with it from our proposal set, since the
/// handshake only requires the reply to be an exact one of the four
/// bytes we proposed; this exists defensively for alternate proposal
/// sets a caller might configure.
fn is_known_intermediate(v: ProtocolVersion) -> bool {
    matches!(v, ProtocolVersion::V2 | ProtocolVersion::V4_1)
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pre_v4_as_major_only() {
        let v = ProtocolVersion::decode(3).unwrap();
        assert_eq!(v, ProtocolVersion::V3);
    }

    #[test]
    fn decodes_v4_3_from_minor_major_byte_order() {
        let reply = u32::from_be_bytes([0x00, 0x00, 0x03, 0x04]);
        let v = ProtocolVersion::decode(reply).unwrap();
        assert_eq!(v, ProtocolVersion::V4_3);
    }

    #[test]
    fn http_magic_is_wrong_endpoint() {
        let err = ProtocolVersion::decode(0x4854_5450).unwrap_err();
        assert!(matches!(err, ConnectionError::WrongEndpoint));
    }

    #[test]
    fn zero_reply_is_fatal() {
        assert!(ProtocolVersion::decode(0).is_err());
    }

    #[test]
    fn proposal_bytes_are_big_endian_high_to_low() {
        assert_eq!(ProtocolVersion::V4_3.encode_proposal(), [0, 0, 3, 4]);
        assert_eq!(ProtocolVersion::V1.encode_proposal(), [0, 0, 0, 1]);
    }
}
