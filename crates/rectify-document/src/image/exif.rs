// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal EXIF surgery: read and reset the orientation tag, and splice an
// EXIF block into an encoded JPEG.
//
// Only IFD0 is touched. Every other byte of the payload is copied verbatim.

use rectify_core::{RectifyError, Result};

/// APP1 identifier that precedes the TIFF structure inside a JPEG.
pub const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

const ORIENTATION_TAG: u16 = 0x0112;
const TYPE_SHORT: u16 = 3;
const ENTRY_LEN: usize = 12;

const MARKER_SOI: [u8; 2] = [0xFF, 0xD8];
const MARKER_APP0: [u8; 2] = [0xFF, 0xE0];
const MARKER_APP1: [u8; 2] = [0xFF, 0xE1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, b: &[u8]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes([b[0], b[1]]),
            Self::Big => u16::from_be_bytes([b[0], b[1]]),
        }
    }

    fn u32(self, b: &[u8]) -> u32 {
        match self {
            Self::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            Self::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        }
    }

    fn write_u16(self, b: &mut [u8], v: u16) {
        let bytes = match self {
            Self::Little => v.to_le_bytes(),
            Self::Big => v.to_be_bytes(),
        };
        b[..2].copy_from_slice(&bytes);
    }
}

/// The TIFF structure inside an EXIF blob, with any `Exif\0\0` prefix removed.
pub fn tiff_payload(exif: &[u8]) -> &[u8] {
    exif.strip_prefix(EXIF_HEADER.as_slice()).unwrap_or(exif)
}

/// Byte offset of the orientation value inside `tiff`, if IFD0 carries one.
fn orientation_offset(tiff: &[u8]) -> Result<Option<(ByteOrder, usize)>> {
    let malformed = |what: &str| RectifyError::Metadata(format!("malformed EXIF: {what}"));

    let order = match tiff.get(..4) {
        Some([b'I', b'I', 42, 0]) => ByteOrder::Little,
        Some([b'M', b'M', 0, 42]) => ByteOrder::Big,
        _ => return Err(malformed("missing TIFF header")),
    };
    let ifd = tiff
        .get(4..8)
        .map(|b| order.u32(b) as usize)
        .ok_or_else(|| malformed("truncated header"))?;
    let count = tiff
        .get(ifd..ifd + 2)
        .map(|b| order.u16(b) as usize)
        .ok_or_else(|| malformed("IFD0 offset out of range"))?;

    for i in 0..count {
        let start = ifd + 2 + i * ENTRY_LEN;
        let entry = tiff
            .get(start..start + ENTRY_LEN)
            .ok_or_else(|| malformed("truncated IFD0"))?;
        if order.u16(&entry[0..2]) == ORIENTATION_TAG {
            if order.u16(&entry[2..4]) != TYPE_SHORT {
                return Err(malformed("orientation tag is not a SHORT"));
            }
            return Ok(Some((order, start + 8)));
        }
    }
    Ok(None)
}

/// Orientation stored in IFD0, if present.
pub fn read_orientation(exif: &[u8]) -> Result<Option<u16>> {
    let tiff = tiff_payload(exif);
    Ok(orientation_offset(tiff)?.map(|(order, at)| order.u16(&tiff[at..at + 2])))
}

/// Copy of the TIFF payload with the orientation tag set to 1 (upright).
/// A payload without the tag is returned unchanged.
pub fn reset_orientation(exif: &[u8]) -> Result<Vec<u8>> {
    let mut tiff = tiff_payload(exif).to_vec();
    if let Some((order, at)) = orientation_offset(&tiff)? {
        order.write_u16(&mut tiff[at..at + 2], 1);
    }
    Ok(tiff)
}

/// Insert an APP1 EXIF segment into an encoded JPEG, after SOI and any
/// JFIF APP0 segment.
pub fn embed_in_jpeg(jpeg: &[u8], exif_tiff: &[u8]) -> Result<Vec<u8>> {
    if jpeg.get(..2) != Some(MARKER_SOI.as_slice()) {
        return Err(RectifyError::Metadata("not a JPEG stream".into()));
    }

    let segment_len = 2 + EXIF_HEADER.len() + exif_tiff.len();
    let segment_len = u16::try_from(segment_len).map_err(|_| {
        RectifyError::Metadata(format!(
            "EXIF block of {} bytes does not fit in one APP1 segment",
            exif_tiff.len()
        ))
    })?;

    let mut insert_at = 2;
    if jpeg.get(2..4) == Some(MARKER_APP0.as_slice()) {
        let app0_len = jpeg
            .get(4..6)
            .map(|b| u16::from_be_bytes([b[0], b[1]]) as usize)
            .ok_or_else(|| RectifyError::Metadata("truncated APP0 segment".into()))?;
        insert_at = 4 + app0_len;
        if insert_at > jpeg.len() {
            return Err(RectifyError::Metadata("truncated APP0 segment".into()));
        }
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&MARKER_APP1);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(exif_tiff);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}
