//! Versioned binary layout of an entity's mitigation ledger.
//!
//! ```text
//! u16 protocol_version            (0)
//! u32 effect_count
//! effect_count times:
//!   utf  id
//!   i64  initial_duration_ms
//!   i64  remaining_ms
//!   i32  zone_id_count            (0 = applies everywhere)
//!   zone_id_count times: utf zone_id
//! ```
//!
//! All integers are big-endian; `utf` is the modified UTF-8 string from
//! [`crate::mutf8`].

use bytes::{Buf, BufMut};

use crate::effect::MitigationEffect;
use crate::mutf8::{read_utf, write_utf};

pub const LEDGER_PROTOCOL_VERSION: u16 = 0;

// id length prefix + two durations + zone count
const MIN_EFFECT_LEN: usize = 2 + 8 + 8 + 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported ledger protocol version {found} (newest known is {known})")]
    UnsupportedProtocol { found: u16, known: u16 },
    #[error("ledger blob truncated while reading {field}")]
    Truncated { field: &'static str },
    #[error("string of {len} encoded bytes exceeds the {max} byte limit")]
    StringTooLong { len: usize, max: usize },
    #[error("malformed modified UTF-8 string at byte {offset}")]
    MalformedString { offset: usize },
    #[error("{field} count {count} does not fit the ledger layout")]
    CountOverflow { field: &'static str, count: usize },
}

pub fn encode_effects(effects: &[MitigationEffect]) -> Result<Vec<u8>, CodecError> {
    let effect_count = u32::try_from(effects.len()).map_err(|_| CodecError::CountOverflow {
        field: "effect",
        count: effects.len(),
    })?;

    let mut out = Vec::with_capacity(6 + effects.len() * MIN_EFFECT_LEN);
    out.put_u16(LEDGER_PROTOCOL_VERSION);
    out.put_u32(effect_count);
    for effect in effects {
        write_utf(&mut out, &effect.id)?;
        out.put_i64(effect.initial_duration_ms);
        out.put_i64(effect.remaining_ms);
        match &effect.zone_ids {
            None => out.put_i32(0),
            Some(zone_ids) => {
                let zone_count =
                    i32::try_from(zone_ids.len()).map_err(|_| CodecError::CountOverflow {
                        field: "zone id",
                        count: zone_ids.len(),
                    })?;
                out.put_i32(zone_count);
                for zone_id in zone_ids {
                    write_utf(&mut out, zone_id)?;
                }
            }
        }
    }
    Ok(out)
}

/// Decodes a stored ledger blob. An empty blob is an empty ledger. Bytes
/// after the last effect are ignored, as the historical reader did.
pub fn decode_effects(bytes: &[u8]) -> Result<Vec<MitigationEffect>, CodecError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut buf = bytes;

    let version = read_u16(&mut buf, "protocol version")?;
    if version != LEDGER_PROTOCOL_VERSION {
        return Err(CodecError::UnsupportedProtocol {
            found: version,
            known: LEDGER_PROTOCOL_VERSION,
        });
    }

    let effect_count = read_u32(&mut buf, "effect count")? as usize;
    let mut effects = Vec::with_capacity(effect_count.min(buf.remaining() / MIN_EFFECT_LEN));
    for _ in 0..effect_count {
        let id = read_utf(&mut buf)?;
        let initial_duration_ms = read_i64(&mut buf, "initial duration")?;
        let remaining_ms = read_i64(&mut buf, "remaining duration")?;
        // A non-positive count means "applies everywhere".
        let zone_count = read_i32(&mut buf, "zone id count")?;
        let zone_ids = if zone_count > 0 {
            let mut zone_ids = Vec::with_capacity((zone_count as usize).min(buf.remaining() / 2));
            for _ in 0..zone_count {
                zone_ids.push(read_utf(&mut buf)?);
            }
            Some(zone_ids)
        } else {
            None
        };
        effects.push(MitigationEffect {
            id,
            initial_duration_ms,
            remaining_ms,
            zone_ids,
        });
    }
    Ok(effects)
}

fn ensure(buf: &&[u8], len: usize, field: &'static str) -> Result<(), CodecError> {
    if buf.remaining() < len {
        Err(CodecError::Truncated { field })
    } else {
        Ok(())
    }
}

fn read_u16(buf: &mut &[u8], field: &'static str) -> Result<u16, CodecError> {
    ensure(buf, 2, field)?;
    Ok(buf.get_u16())
}

fn read_u32(buf: &mut &[u8], field: &'static str) -> Result<u32, CodecError> {
    ensure(buf, 4, field)?;
    Ok(buf.get_u32())
}

fn read_i32(buf: &mut &[u8], field: &'static str) -> Result<i32, CodecError> {
    ensure(buf, 4, field)?;
    Ok(buf.get_i32())
}

fn read_i64(buf: &mut &[u8], field: &'static str) -> Result<i64, CodecError> {
    ensure(buf, 8, field)?;
    Ok(buf.get_i64())
}
