//! ICC Profile Header
//!
//! The profile header is 128 bytes, immediately followed by the 4-byte tag
//! count; both are decoded together since every valid profile carries both.
//! See ICC.1:2010 Section 7.2.

use crate::error::{Error, Result};
use crate::icc::bytes;
use crate::icc::types::{ColorSpace, DateTimeNumber, ProfileClass, RenderingIntent, XyzNumber};

/// Profile file signature - must be 'acsp'
pub const PROFILE_SIGNATURE: u32 = 0x61637370;

/// Header plus tag count
pub const HEADER_SIZE: usize = 132;

/// Size of one tag directory entry
pub const TAG_ENTRY_SIZE: usize = 12;

/// The D50 white point every accepted profile must carry
pub const D50: [f64; 3] = [0.9642, 1.0, 0.8249];

/// How far each illuminant axis may sit from D50
const ILLUMINANT_SLACK: f64 = 0.01;

/// Decoded profile header
///
/// Four-character codes are kept as raw big-endian u32 values the way the
/// file stores them; the typed accessors interpret the known ones without
/// making unknown codes a parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Profile size in bytes
    pub size: u32,
    /// Preferred CMM type signature
    pub cmm_type: u32,
    /// Profile version (major byte, then minor/patch nibbles)
    pub version: u32,
    /// Device class signature
    pub profile_class: u32,
    /// Color space of device data
    pub data_color_space: u32,
    /// Profile connection space (XYZ or Lab)
    pub pcs: u32,
    /// Date and time the profile was created
    pub creation_date: DateTimeNumber,
    /// Profile file signature (must be 'acsp')
    pub signature: u32,
    /// Primary platform signature
    pub platform: u32,
    /// Profile flags
    pub flags: u32,
    /// Device manufacturer signature
    pub device_manufacturer: u32,
    /// Device model signature
    pub device_model: u32,
    /// Device attributes
    pub device_attributes: u64,
    /// Rendering intent
    pub rendering_intent: u32,
    /// PCS illuminant (must be D50)
    pub illuminant: XyzNumber,
    /// Profile creator signature
    pub creator: u32,
    /// Profile ID (MD5 hash, or zero)
    pub profile_id: [u8; 16],
    /// Number of tag directory entries
    pub tag_count: u32,
}

impl Header {
    /// Decode the header fields from the front of a profile buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::TooSmall {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut profile_id = [0u8; 16];
        profile_id.copy_from_slice(&data[84..100]);

        Ok(Self {
            size: bytes::read_u32(data, 0),
            cmm_type: bytes::read_u32(data, 4),
            version: bytes::read_u32(data, 8),
            profile_class: bytes::read_u32(data, 12),
            data_color_space: bytes::read_u32(data, 16),
            pcs: bytes::read_u32(data, 20),
            creation_date: DateTimeNumber::from_bytes(&data[24..36]).unwrap_or_default(),
            signature: bytes::read_u32(data, 36),
            platform: bytes::read_u32(data, 40),
            flags: bytes::read_u32(data, 44),
            device_manufacturer: bytes::read_u32(data, 48),
            device_model: bytes::read_u32(data, 52),
            device_attributes: bytes::read_u64(data, 56),
            rendering_intent: bytes::read_u32(data, 64),
            illuminant: XyzNumber::from_bytes(&data[68..80]).unwrap_or_default(),
            creator: bytes::read_u32(data, 80),
            profile_id,
            tag_count: bytes::read_u32(data, 128),
        })
    }

    /// Validate the decoded header against the buffer it came from.
    ///
    /// Checks the preamble, that the declared size fits the buffer and
    /// holds the tag directory, the major version, and the D50 illuminant.
    pub fn validate(&self, data_len: usize) -> Result<()> {
        if self.signature != PROFILE_SIGNATURE {
            return Err(Error::InvalidSignature(self.signature));
        }

        if self.size as usize > data_len {
            return Err(Error::SizeMismatch {
                header_size: self.size,
                actual_size: data_len,
            });
        }

        // Widened so tag_count near u32::MAX cannot wrap.
        let directory_end = HEADER_SIZE as u64 + TAG_ENTRY_SIZE as u64 * self.tag_count as u64;
        if (self.size as u64) < directory_end {
            return Err(Error::TooSmall {
                expected: directory_end as usize,
                actual: self.size as usize,
            });
        }

        if self.version_major() > 4 {
            return Err(Error::UnsupportedVersion(self.version_major()));
        }

        let [x, y, z] = self.illuminant.to_array();
        if (x - D50[0]).abs() > ILLUMINANT_SLACK
            || (y - D50[1]).abs() > ILLUMINANT_SLACK
            || (z - D50[2]).abs() > ILLUMINANT_SLACK
        {
            return Err(Error::IlluminantNotD50 { x, y, z });
        }

        Ok(())
    }

    /// Major version number
    pub fn version_major(&self) -> u8 {
        (self.version >> 24) as u8
    }

    /// Minor version number
    pub fn version_minor(&self) -> u8 {
        ((self.version >> 20) & 0x0F) as u8
    }

    /// Device class, when the code is a known one
    pub fn profile_class(&self) -> Option<ProfileClass> {
        ProfileClass::from_u32(self.profile_class)
    }

    /// Device color space, when the code is a known one
    pub fn data_color_space(&self) -> Option<ColorSpace> {
        ColorSpace::from_u32(self.data_color_space)
    }

    /// Profile connection space, when the code is a known one
    pub fn pcs(&self) -> Option<ColorSpace> {
        ColorSpace::from_u32(self.pcs)
    }

    /// Rendering intent, when the value is a known one
    pub fn rendering_intent(&self) -> Option<RenderingIntent> {
        RenderingIntent::from_u32(self.rendering_intent)
    }
}
