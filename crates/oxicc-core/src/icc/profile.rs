//! ICC Profile Parsing
//!
//! `Profile` is a zero-copy view over a caller-supplied buffer: the header
//! is decoded up front, the tag directory is validated but read on demand,
//! and every decoded payload borrows the buffer for the profile's lifetime.
//!
//! Parsing pre-decodes the tags needed to reconstruct the two logical
//! transforms:
//! - `kTRC`, or the `rTRC`/`gTRC`/`bTRC` triple, into three tone curves
//! - `rXYZ`/`gXYZ`/`bXYZ` into the RGB→XYZ D50 colorant matrix
//! - `A2B1` (preferred) or `A2B0` into the A2B pipeline
//!
//! A present-but-malformed pre-parsed tag fails the whole parse; a missing
//! one simply leaves its slot empty.

use crate::error::{Error, Result};
use crate::icc::a2b::A2b;
use crate::icc::bytes;
use crate::icc::curve::Curve;
use crate::icc::header::{Header, HEADER_SIZE, TAG_ENTRY_SIZE};
use crate::icc::types::{TagSignature, TypeSignature, XyzNumber};
use crate::math::matrix::Matrix3x3;

/// A parsed ICC profile borrowing its input buffer
#[derive(Debug, Clone)]
pub struct Profile<'a> {
    buffer: &'a [u8],
    /// Decoded header fields
    pub header: Header,
    /// Tone reproduction curves for the three channels; populated together
    /// from `kTRC` or the full `rTRC`/`gTRC`/`bTRC` triple
    pub trc: Option<[Curve<'a>; 3]>,
    /// RGB→XYZ D50 colorant matrix
    pub to_xyz_d50: Option<Matrix3x3>,
    /// Device-to-PCS pipeline from `A2B1`/`A2B0`
    pub a2b: Option<A2b<'a>>,
}

/// A borrowed handle to one tag's payload
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    /// The directory signature naming the tag
    pub signature: TagSignature,
    /// The payload's type signature (its first four bytes)
    pub type_sig: TypeSignature,
    /// The payload, including the type signature
    pub data: &'a [u8],
}

impl<'a> Profile<'a> {
    /// Parse a profile from a byte buffer.
    ///
    /// The returned profile borrows `buffer`; nothing is copied out of it.
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let header = Header::parse(buffer)?;
        header.validate(buffer.len())?;

        // Every directory entry must land inside the declared profile
        // size. The sum is widened so offset + size cannot wrap.
        for index in 0..header.tag_count {
            let entry = HEADER_SIZE + TAG_ENTRY_SIZE * index as usize;
            let signature = bytes::read_u32(buffer, entry);
            let offset = bytes::read_u32(buffer, entry + 4);
            let size = bytes::read_u32(buffer, entry + 8);
            if size < 4 || offset as u64 + size as u64 > header.size as u64 {
                return Err(Error::TagOutOfBounds {
                    tag: signature,
                    offset,
                    size,
                    profile_size: header.size,
                });
            }
        }

        let mut profile = Self {
            buffer,
            header,
            trc: None,
            to_xyz_d50: None,
            a2b: None,
        };
        profile.decode_known_tags()?;
        Ok(profile)
    }

    /// The raw bytes the profile was parsed from.
    pub fn raw_data(&self) -> &'a [u8] {
        self.buffer
    }

    /// Number of tags in the directory.
    pub fn tag_count(&self) -> u32 {
        self.header.tag_count
    }

    /// Look up a tag by directory position.
    pub fn tag_by_index(&self, index: u32) -> Option<Tag<'a>> {
        if index >= self.header.tag_count {
            return None;
        }
        let entry = HEADER_SIZE + TAG_ENTRY_SIZE * index as usize;
        let signature = TagSignature(bytes::read_u32(self.buffer, entry));
        let offset = bytes::read_u32(self.buffer, entry + 4) as usize;
        let size = bytes::read_u32(self.buffer, entry + 8) as usize;
        // In bounds by the directory validation in parse()
        let data = &self.buffer[offset..offset + size];
        Some(Tag {
            signature,
            type_sig: TypeSignature(bytes::read_u32(data, 0)),
            data,
        })
    }

    /// Find the first tag carrying `signature`.
    pub fn tag_by_signature(&self, signature: TagSignature) -> Option<Tag<'a>> {
        self.tags().find(|tag| tag.signature == signature)
    }

    /// Iterate over all tags in directory order.
    pub fn tags(&self) -> impl Iterator<Item = Tag<'a>> + '_ {
        (0..self.header.tag_count).filter_map(move |i| self.tag_by_index(i))
    }

    /// Pre-decode the well-known tags. Order matters: a gray TRC wins over
    /// per-channel TRCs, and A2B1 wins over A2B0.
    fn decode_known_tags(&mut self) -> Result<()> {
        if let Some(tag) = self.tag_by_signature(TagSignature::GRAY_TRC) {
            let curve = Curve::from_tag(&tag)?;
            self.trc = Some([curve.clone(), curve.clone(), curve]);
            // Monochrome profiles scale the illuminant directly.
            let [x, y, z] = self.header.illuminant.to_array();
            self.to_xyz_d50 = Some(Matrix3x3::diagonal(x, y, z));
        } else if let (Some(r), Some(g), Some(b)) = (
            self.tag_by_signature(TagSignature::RED_TRC),
            self.tag_by_signature(TagSignature::GREEN_TRC),
            self.tag_by_signature(TagSignature::BLUE_TRC),
        ) {
            self.trc = Some([
                Curve::from_tag(&r)?,
                Curve::from_tag(&g)?,
                Curve::from_tag(&b)?,
            ]);
        }

        if let (Some(r), Some(g), Some(b)) = (
            self.tag_by_signature(TagSignature::RED_COLORANT),
            self.tag_by_signature(TagSignature::GREEN_COLORANT),
            self.tag_by_signature(TagSignature::BLUE_COLORANT),
        ) {
            let [rx, ry, rz] = read_tag_xyz(&r)?.to_array();
            let [gx, gy, gz] = read_tag_xyz(&g)?.to_array();
            let [bx, by, bz] = read_tag_xyz(&b)?.to_array();
            // Colorants fill the matrix columnwise.
            self.to_xyz_d50 = Some(Matrix3x3::new([
                [rx, gx, bx],
                [ry, gy, by],
                [rz, gz, bz],
            ]));
        }

        // A2B1 is relative colorimetric, which matches how the TRC/matrix
        // side is used; prefer it over the perceptual A2B0.
        for signature in [TagSignature::A2B1, TagSignature::A2B0] {
            if let Some(tag) = self.tag_by_signature(signature) {
                self.a2b = Some(A2b::from_tag(&tag)?);
                break;
            }
        }

        Ok(())
    }
}

/// Read a single XYZ triple from an `XYZ ` payload.
fn read_tag_xyz(tag: &Tag<'_>) -> Result<XyzNumber> {
    if tag.type_sig != TypeSignature::XYZ || tag.data.len() < 20 {
        return Err(Error::InvalidTagType {
            tag: tag.signature.0,
            type_sig: tag.type_sig.0,
        });
    }
    // from_bytes cannot fail on the 12 bytes just checked
    XyzNumber::from_bytes(&tag.data[8..20]).ok_or_else(|| Error::InvalidTagType {
        tag: tag.signature.0,
        type_sig: tag.type_sig.0,
    })
}
