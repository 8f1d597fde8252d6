//! Wire-level types shared by the hazard world engine and host adapters:
//! the mitigation effect record and the versioned ledger blob codec.

mod codec;
mod effect;
mod mutf8;

pub use codec::{decode_effects, encode_effects, CodecError, LEDGER_PROTOCOL_VERSION};
pub use effect::{EffectId, MitigationEffect, ZoneId};
pub use mutf8::{encoded_utf_len, read_utf, write_utf, MAX_UTF_BYTES};
