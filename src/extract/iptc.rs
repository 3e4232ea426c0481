//! IPTC-IIM fallback for files without an XMP packet.
//!
//! Older cameras and some scanners write only the legacy IIM record. Three
//! Record 2 datasets map onto the catalog fields:
//!
//! | Dataset | Name | Field |
//! |---|---|---|
//! | 2:05 | ObjectName | title |
//! | 2:25 | Keywords (repeatable) | subject |
//! | 2:120 | Caption-Abstract | description |
//!
//! JPEG carries the record in APP13 (Photoshop 8BIM resource 0x0404); TIFF in
//! IFD tag 33723 (raw IIM) or 34377 (8BIM block).

use super::EmbeddedMetadata;

const TAG_MARKER: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;
const DATASET_OBJECT_NAME: u8 = 5;
const DATASET_KEYWORDS: u8 = 25;
const DATASET_CAPTION: u8 = 120;

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

const TIFF_TAG_IPTC_NAA: u16 = 33723;
const TIFF_TAG_PHOTOSHOP: u16 = 34377;
// Bounds the IFD chain walk; a cyclic chain would otherwise never end.
const MAX_IFDS: usize = 16;

/// Read the IIM record of a JPEG. `None` when absent or carrying no known field.
pub fn from_jpeg(data: &[u8]) -> Option<EmbeddedMetadata> {
    jpeg_app13_segments(data)
        .filter_map(find_8bim_iptc)
        .map(parse_iim)
        .find(|meta| !meta.is_empty())
}

/// Read the IIM record of a TIFF. `None` when absent or carrying no known field.
pub fn from_tiff(data: &[u8]) -> Option<EmbeddedMetadata> {
    let order = ByteOrder::detect(data)?;
    if order.u16_at(data, 2)? != 42 {
        return None;
    }

    let mut ifd_offset = order.u32_at(data, 4)? as usize;
    for _ in 0..MAX_IFDS {
        if ifd_offset == 0 {
            break;
        }
        let entry_count = order.u16_at(data, ifd_offset)? as usize;
        let entries_start = ifd_offset + 2;

        for i in 0..entry_count {
            let entry = entries_start + i * 12;
            let tag = order.u16_at(data, entry)?;
            if tag != TIFF_TAG_IPTC_NAA && tag != TIFF_TAG_PHOTOSHOP {
                continue;
            }
            let typ = order.u16_at(data, entry + 2)?;
            let count = order.u32_at(data, entry + 4)? as usize;
            let offset = order.u32_at(data, entry + 8)? as usize;
            let Some(value) = count
                .checked_mul(tiff_type_size(typ))
                .and_then(|len| data.get(offset..offset.checked_add(len)?))
            else {
                continue;
            };

            let iim = if tag == TIFF_TAG_IPTC_NAA {
                Some(value)
            } else {
                find_8bim_iptc(value)
            };
            if let Some(meta) = iim.map(parse_iim).filter(|m| !m.is_empty()) {
                return Some(meta);
            }
        }

        ifd_offset = order.u32_at(data, entries_start + entry_count * 12)? as usize;
    }
    None
}

/// Decode Record 2 datasets. Each dataset is
/// `0x1C, record, dataset, length (u16 BE), data`.
fn parse_iim(data: &[u8]) -> EmbeddedMetadata {
    let mut meta = EmbeddedMetadata::default();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != TAG_MARKER {
            pos += 1;
            continue;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let length = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;

        let Some(raw) = data.get(pos..pos + length) else {
            break;
        };
        pos += length;

        if record != APPLICATION_RECORD {
            continue;
        }
        let value = String::from_utf8_lossy(raw).trim().to_string();
        if value.is_empty() {
            continue;
        }
        match dataset {
            DATASET_OBJECT_NAME => meta.title = Some(value),
            DATASET_KEYWORDS => meta.subject.get_or_insert_with(Vec::new).push(value),
            DATASET_CAPTION => meta.description = Some(value),
            _ => {}
        }
    }
    meta
}

/// Payloads of every APP13 segment before the start of scan.
fn jpeg_app13_segments(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut pos = 2; // past SOI
    std::iter::from_fn(move || {
        while pos + 4 <= data.len() {
            if data[pos] != 0xFF {
                return None;
            }
            let marker = data[pos + 1];
            match marker {
                // Fill bytes
                0xFF => pos += 1,
                // Standalone markers
                0x01 | 0xD0..=0xD7 => pos += 2,
                // Start of scan: metadata segments are all before it
                0xDA | 0xD9 => return None,
                _ => {
                    let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                    let start = pos + 4;
                    let end = (pos + 2 + len).min(data.len());
                    pos += 2 + len;
                    if marker == 0xED && start <= end {
                        return Some(&data[start..end]);
                    }
                }
            }
        }
        None
    })
}

/// Locate resource 0x0404 inside a Photoshop 8BIM resource block.
///
/// Each resource is `"8BIM"`, id (u16), Pascal name padded to even length,
/// data length (u32), data padded to even length.
fn find_8bim_iptc(segment: &[u8]) -> Option<&[u8]> {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);
    let mut pos = 0;

    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        let name_len = *data.get(pos)? as usize;
        pos += 1 + name_len + ((1 + name_len) % 2);

        let len_bytes = data.get(pos..pos + 4)?;
        let res_len =
            u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        pos += 4;

        let body = data.get(pos..pos.checked_add(res_len)?)?;
        if resource_id == IPTC_RESOURCE_ID {
            return Some(body);
        }
        pos += res_len + (res_len % 2);
    }
    None
}

/// Size in bytes of one value of a TIFF field type.
fn tiff_type_size(typ: u16) -> usize {
    match typ {
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 => 8,
        // BYTE, ASCII, SBYTE, UNDEFINED and unknown types
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn detect(data: &[u8]) -> Option<Self> {
        match data.get(0..2)? {
            b"MM" => Some(Self::Big),
            b"II" => Some(Self::Little),
            _ => None,
        }
    }

    fn u16_at(self, data: &[u8], offset: usize) -> Option<u16> {
        let b: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
        Some(match self {
            Self::Big => u16::from_be_bytes(b),
            Self::Little => u16::from_le_bytes(b),
        })
    }

    fn u32_at(self, data: &[u8], offset: usize) -> Option<u32> {
        let b: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
        Some(match self {
            Self::Big => u32::from_be_bytes(b),
            Self::Little => u32::from_le_bytes(b),
        })
    }
}
