//! Length-prefixed strings in the JVM "modified UTF-8" layout.
//!
//! Historical ledger blobs were written with `DataOutputStream::writeUTF`, so
//! strings are a big-endian `u16` byte length followed by UTF-16 code units
//! packed as 1 to 3 bytes each. NUL takes two bytes (`C0 80`) and characters
//! outside the BMP are written as two 3-byte surrogates.

use bytes::{Buf, BufMut};

use crate::codec::CodecError;

pub const MAX_UTF_BYTES: usize = u16::MAX as usize;

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

pub fn encoded_utf_len(value: &str) -> usize {
    value.encode_utf16().map(unit_len).sum()
}

pub fn write_utf<B: BufMut>(buf: &mut B, value: &str) -> Result<(), CodecError> {
    let len = encoded_utf_len(value);
    if len > MAX_UTF_BYTES {
        return Err(CodecError::StringTooLong {
            len,
            max: MAX_UTF_BYTES,
        });
    }
    buf.put_u16(len as u16);
    for unit in value.encode_utf16() {
        match unit_len(unit) {
            1 => buf.put_u8(unit as u8),
            2 => {
                buf.put_u8(0xC0 | ((unit >> 6) & 0x1F) as u8);
                buf.put_u8(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                buf.put_u8(0xE0 | ((unit >> 12) & 0x0F) as u8);
                buf.put_u8(0x80 | ((unit >> 6) & 0x3F) as u8);
                buf.put_u8(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    Ok(())
}

pub fn read_utf<B: Buf>(buf: &mut B) -> Result<String, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Truncated {
            field: "string length",
        });
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated {
            field: "string body",
        });
    }
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);

    let continuation = |offset: usize| -> Result<u16, CodecError> {
        match raw.get(offset) {
            Some(byte) if byte & 0xC0 == 0x80 => Ok(u16::from(byte & 0x3F)),
            _ => Err(CodecError::MalformedString { offset }),
        }
    };

    let mut units = Vec::with_capacity(len);
    let mut offset = 0;
    while offset < len {
        let lead = raw[offset];
        match lead >> 4 {
            0x0..=0x7 => {
                units.push(u16::from(lead));
                offset += 1;
            }
            0xC | 0xD => {
                let low = continuation(offset + 1)?;
                units.push((u16::from(lead & 0x1F) << 6) | low);
                offset += 2;
            }
            0xE => {
                let mid = continuation(offset + 1)?;
                let low = continuation(offset + 2)?;
                units.push((u16::from(lead & 0x0F) << 12) | (mid << 6) | low);
                offset += 3;
            }
            _ => return Err(CodecError::MalformedString { offset }),
        }
    }

    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| CodecError::MalformedString { offset: len })
}
