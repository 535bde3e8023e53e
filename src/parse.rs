use std::fmt;

/// Why a line was rejected as an IPv4 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnexpectedByte(u8),
    OctetCount,
    OctetOutOfRange,
    LeadingZero,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty line"),
            Self::UnexpectedByte(b) => write!(f, "unexpected byte {:?}", *b as char),
            Self::OctetCount => f.write_str("expected exactly four octets"),
            Self::OctetOutOfRange => f.write_str("octet out of range"),
            Self::LeadingZero => f.write_str("octet has a leading zero"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parses a dotted-decimal IPv4 address into its big-endian `u32` value,
/// so `1.2.3.4` becomes `0x01020304`.
///
/// Octets are 1 to 3 digits in `0..=255`, without sign or leading zero.
pub fn parse_ipv4(line: &[u8]) -> Result<u32, ParseError> {
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut result = 0u32;
    let mut octets = 0;
    let mut current = 0u32;
    let mut digits = 0;

    for &c in line {
        match c {
            b'0'..=b'9' => {
                if digits == 1 && current == 0 {
                    return Err(ParseError::LeadingZero);
                }
                current = current * 10 + (c - b'0') as u32;
                digits += 1;
                if current > 255 {
                    return Err(ParseError::OctetOutOfRange);
                }
            }
            b'.' => {
                if digits == 0 || octets == 3 {
                    return Err(ParseError::OctetCount);
                }
                result = result << 8 | current;
                octets += 1;
                current = 0;
                digits = 0;
            }
            _ => return Err(ParseError::UnexpectedByte(c)),
        }
    }

    if digits == 0 || octets != 3 {
        return Err(ParseError::OctetCount);
    }
    Ok(result << 8 | current)
}

/// Strips the line terminator left over from `\r\n` input.
#[inline]
pub fn trim_cr(line: &[u8]) -> &[u8] {
    match line {
        [rest @ .., b'\r'] => rest,
        _ => line,
    }
}
