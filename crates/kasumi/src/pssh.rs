//! Protection System Specific Header boxes.
//!
//! Only the common single-KID Widevine layout is ever built:
//!
//! ```text
//! offset  size  field
//!      0     4  box size (52, big endian)
//!      4     4  "pssh"
//!      8     4  version (0) and flags (0)
//!     12    16  system id edef8ba9-79d6-4ace-a3c8-27dcd51d21ed
//!     28     4  data size (20)
//!     32     4  08 01 12 10  (algorithm = AESCTR, key_id length 16)
//!     36    16  key identifier
//! ```
use std::{
    fmt::{self, Display, Formatter},
    io::{Cursor, Read},
    str::FromStr,
};

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    error::{KasumiError, KasumiResult},
    manifest::Manifest,
};

pub const WIDEVINE_SYSTEM_ID: [u8; 16] = [
    0xed, 0xef, 0x8b, 0xa9, 0x79, 0xd6, 0x4a, 0xce, 0xa3, 0xc8, 0x27, 0xdc, 0xd5, 0x1d, 0x21, 0xed,
];

/// Total size of a box built by [`PsshBox::for_key_id`].
pub const SINGLE_KID_BOX_SIZE: usize = 52;

const BOX_TYPE: &[u8; 4] = b"pssh";
const HEADER_SIZE: usize = 32;

/// Padded on encode, padding optional on decode.
const PSSH_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A 128-bit key identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 16]);

impl KeyId {
    pub fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl FromStr for KeyId {
    type Err = KasumiError;

    /// Accepts both `edef8ba979d64acea3c827dcd51d21ed` and the hyphenated GUID form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_kid: String = s.trim().chars().filter(|c| *c != '-').collect();
        if hex_kid.len() != 32 {
            return Err(KasumiError::PsshError(format!(
                "key id must be 32 hex characters: {s}"
            )));
        }

        let mut kid = [0u8; 16];
        hex::decode_to_slice(&hex_kid, &mut kid)?;
        Ok(Self(kid))
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsshBox {
    pub version: u8,
    pub flags: u32,
    pub system_id: [u8; 16],
    /// Key ids listed in the box header, version 1 only.
    pub kids: Vec<KeyId>,
    pub data: Vec<u8>,
}

impl PsshBox {
    /// Widevine box carrying `kid` as its only key id.
    pub fn for_key_id(kid: &KeyId) -> Self {
        let mut data = Vec::with_capacity(20);
        // field 1 (algorithm): varint AESCTR
        data.extend_from_slice(&[0x08, 0x01]);
        // field 2 (key_id): 16 bytes
        data.extend_from_slice(&[0x12, 0x10]);
        data.extend_from_slice(kid.as_bytes());

        Self {
            version: 0,
            flags: 0,
            system_id: WIDEVINE_SYSTEM_ID,
            kids: Vec::new(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        let kids = if self.version > 0 {
            4 + 16 * self.kids.len()
        } else {
            0
        };
        HEADER_SIZE + kids + self.data.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        buf.extend_from_slice(&(self.size() as u32).to_be_bytes());
        buf.extend_from_slice(BOX_TYPE);
        let version_flags = (self.version as u32) << 24 | (self.flags & 0x00ff_ffff);
        buf.extend_from_slice(&version_flags.to_be_bytes());
        buf.extend_from_slice(&self.system_id);
        if self.version > 0 {
            buf.extend_from_slice(&(self.kids.len() as u32).to_be_bytes());
            for kid in &self.kids {
                buf.extend_from_slice(kid.as_bytes());
            }
        }
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn to_base64(&self) -> String {
        PSSH_BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(input: &str) -> KasumiResult<Self> {
        let buf = PSSH_BASE64.decode(input.trim())?;
        Self::try_from(buf.as_slice())
    }

    pub fn is_widevine(&self) -> bool {
        self.system_id == WIDEVINE_SYSTEM_ID
    }

    /// Key ids carried by this box: the header list for version 1 boxes, otherwise the
    /// `key_id` fields of the Widevine init data.
    pub fn key_ids(&self) -> Vec<KeyId> {
        if !self.kids.is_empty() {
            return self.kids.clone();
        }
        if self.is_widevine() {
            return widevine_key_ids(&self.data);
        }
        Vec::new()
    }
}

impl TryFrom<&[u8]> for PsshBox {
    type Error = KasumiError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() < HEADER_SIZE || &value[4..8] != BOX_TYPE {
            return Err(KasumiError::PsshError("invalid pssh header".to_string()));
        }

        let mut buf = Cursor::new(value);
        let size = buf.read_u32::<BigEndian>()? as usize;
        if size != value.len() {
            return Err(KasumiError::PsshError(format!(
                "box size {size} does not match buffer length {}",
                value.len()
            )));
        }
        buf.set_position(8);

        let version_flags = buf.read_u32::<BigEndian>()?;
        let version = (version_flags >> 24) as u8;
        let flags = version_flags & 0x00ff_ffff;

        let mut system_id = [0u8; 16];
        buf.read_exact(&mut system_id)?;

        let mut kids = Vec::new();
        if version > 0 {
            let kid_count = buf.read_u32::<BigEndian>()?;
            for _ in 0..kid_count {
                let mut kid = [0u8; 16];
                buf.read_exact(&mut kid)?;
                kids.push(KeyId(kid));
            }
        }

        let data_length = buf.read_u32::<BigEndian>()? as usize;
        if data_length > size {
            return Err(KasumiError::PsshError(format!(
                "data size {data_length} exceeds box size {size}"
            )));
        }
        let mut data = vec![0u8; data_length];
        buf.read_exact(&mut data)?;

        Ok(Self {
            version,
            flags,
            system_id,
            kids,
            data,
        })
    }
}

/// Walks the protobuf fields of Widevine init data and collects every 16-byte `key_id` (field 2).
fn widevine_key_ids(data: &[u8]) -> Vec<KeyId> {
    fn read_varint(buf: &[u8], pos: &mut usize) -> Option<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *buf.get(*pos)?;
            *pos += 1;
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
        }
        None
    }

    let mut kids = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let Some(tag) = read_varint(data, &mut pos) else {
            break;
        };
        match tag & 0x07 {
            0 => {
                if read_varint(data, &mut pos).is_none() {
                    break;
                }
            }
            2 => {
                let Some(len) = read_varint(data, &mut pos) else {
                    break;
                };
                let Some(end) = pos.checked_add(len as usize).filter(|end| *end <= data.len())
                else {
                    break;
                };
                if tag >> 3 == 2 && len == 16 {
                    let mut kid = [0u8; 16];
                    kid.copy_from_slice(&data[pos..end]);
                    kids.push(KeyId(kid));
                }
                pos = end;
            }
            // fixed64 / fixed32
            1 => pos += 8,
            5 => pos += 4,
            _ => break,
        }
    }
    kids
}

/// Builds the base64 PSSH for the default key id of `manifest`.
pub fn build_pssh(manifest: &Manifest) -> KasumiResult<String> {
    let kid = manifest.default_key_id()?;
    log::debug!("Building PSSH for KID {kid}");
    Ok(PsshBox::for_key_id(&kid).to_base64())
}
