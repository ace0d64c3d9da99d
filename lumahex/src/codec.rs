use byteorder::{ByteOrder, LittleEndian};

/// Width of one encoded float, in hex characters (4 bytes).
pub const HEX_WIDTH: usize = 8;

const FLOAT_BYTES: usize = HEX_WIDTH / 2;

quick_error! {
    #[derive(Debug, Clone, PartialEq)]
    pub enum FormatError {
        WrongLength(len: usize) {
            display("expected {} hex characters, got {}", HEX_WIDTH, len)
        }
        InvalidCharacter(found: char, position: usize) {
            display("invalid hex character {:?} at position {}", found, position)
        }
    }
}

#[inline]
pub(crate) fn is_lower_hex(c: char) -> bool {
    c.is_ascii_digit() || ('a'..='f').contains(&c)
}

/// Packs `value` as a little-endian binary32 and returns its lowercase hex.
pub fn encode(value: f32) -> String {
    let mut buf = [0u8; FLOAT_BYTES];
    LittleEndian::write_f32(&mut buf, value);
    hex::encode(buf)
}

/// Narrows to binary32 first. Out-of-range values go to infinity, extra
/// precision is dropped; that's IEEE behaviour and we don't check for it.
pub fn encode_f64(value: f64) -> String {
    encode(value as f32)
}

/// Inverse of [`encode`]. Only accepts exactly 8 lowercase hex digits.
pub fn decode(input: &str) -> Result<f32, FormatError> {
    let len = input.chars().count();
    if len != HEX_WIDTH {
        return Err(FormatError::WrongLength(len));
    }
    if let Some((position, found)) = input.chars().enumerate().find(|(_, c)| !is_lower_hex(*c)) {
        return Err(FormatError::InvalidCharacter(found, position));
    }
    let mut buf = [0u8; FLOAT_BYTES];
    // Can't fail: we just checked length and alphabet.
    hex::decode_to_slice(input, &mut buf).map_err(|_| FormatError::WrongLength(len))?;
    Ok(LittleEndian::read_f32(&buf))
}
