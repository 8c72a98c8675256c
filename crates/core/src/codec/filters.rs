//! Stream decompression filters.
//!
//! Covers the filters that structural streams (cross-reference streams,
//! object streams) use in practice: FlateDecode, LZWDecode, and the PNG
//! row predictor. Unknown filters surface as `DecodeError`, which the
//! resolver treats as an ordinary per-object miss.

use crate::error::{PdfError, Result};
use crate::model::{Dict, Object, dict_direct_int};

/// Inflate `data`. Falls back to byte-at-a-time lenient decompression for
/// corrupted streams, returning whatever decoded cleanly before the error
/// (CRC damage near the end is common in the wild).
pub fn flate_decode(data: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    if decoder.read_to_end(&mut out).is_ok() {
        return out;
    }
    log::warn!("zlib stream is corrupted, retrying leniently");
    flate_decode_lenient(data)
}

fn flate_decode_lenient(data: &[u8]) -> Vec<u8> {
    use flate2::{Decompress, FlushDecompress, Status};
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        if produced > 0 {
            out.extend_from_slice(&buf[..produced]);
        }
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

/// LZW decompression (MSB-first, 8-bit codes, as PDF specifies).
pub fn lzw_decode(data: &[u8]) -> Result<Vec<u8>> {
    weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
        .decode(data)
        .map_err(|e| PdfError::DecodeError(format!("LZW: {e}")))
}

/// Decode one named filter application, including any predictor declared
/// in its decode parameters.
pub fn decode(data: &[u8], filter: &str, parms: Option<&Dict>) -> Result<Vec<u8>> {
    let decoded = match filter {
        "FlateDecode" | "Fl" => flate_decode(data),
        "LZWDecode" | "LZW" => lzw_decode(data)?,
        other => {
            return Err(PdfError::DecodeError(format!("unsupported filter {other}")));
        }
    };

    let Some(parms) = parms else {
        return Ok(decoded);
    };
    let predictor = dict_direct_int(parms, "Predictor").unwrap_or(1);
    if predictor < 10 {
        // 1 = none; 2 = TIFF, which structural streams do not use.
        return Ok(decoded);
    }
    let columns = dict_direct_int(parms, "Columns").unwrap_or(1).max(1) as usize;
    let colors = dict_direct_int(parms, "Colors").unwrap_or(1).max(1) as usize;
    let bits = dict_direct_int(parms, "BitsPerComponent").unwrap_or(8).max(1) as usize;
    apply_png_predictor(&decoded, columns, colors, bits)
}

/// Extract the filter name list from a /Filter entry (name or array of
/// names). Indirect references must be resolved by the caller first.
pub fn filter_names(filter: &Object) -> Vec<String> {
    match filter {
        Object::Name(name) => vec![name.clone()],
        Object::Array(arr) => arr
            .iter()
            .filter_map(|item| item.as_name().ok().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode-parameter dict for filter `index` out of a /DecodeParms entry
/// (dict, or array parallel to the filter array).
pub fn parms_at<'a>(parms: Option<&'a Object>, index: usize) -> Option<&'a Dict> {
    match parms? {
        Object::Dict(d) if index == 0 => Some(d),
        Object::Array(arr) => match arr.get(index) {
            Some(Object::Dict(d)) => Some(d),
            _ => None,
        },
        _ => None,
    }
}

/// Reverse PNG row prediction. Each row carries a leading filter-type
/// byte; rows 0-4 are None/Sub/Up/Average/Paeth.
pub fn apply_png_predictor(
    data: &[u8],
    columns: usize,
    colors: usize,
    bits_per_component: usize,
) -> Result<Vec<u8>> {
    let row_bytes = colors
        .checked_mul(columns)
        .and_then(|v| v.checked_mul(bits_per_component))
        .map(|v| v / 8)
        .ok_or(PdfError::Overflow("predictor row size"))?;
    if row_bytes == 0 {
        return Ok(Vec::new());
    }
    let bpp = std::cmp::max(1, colors * bits_per_component / 8);
    let row_size = row_bytes + 1;

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for row_start in (0..data.len()).step_by(row_size) {
        if row_start + row_size > data.len() {
            break;
        }
        let filter_type = data[row_start];
        let row_data = &data[row_start + 1..row_start + row_size];
        let mut current_row = vec![0u8; row_bytes];

        match filter_type {
            0 => current_row.copy_from_slice(row_data),
            1 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..row_bytes {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp {
                        u16::from(current_row[i - bpp])
                    } else {
                        0
                    };
                    let above = u16::from(prev_row[i]);
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    let paeth = paeth_predictor(left, above, upper_left);
                    current_row[i] = row_data[i].wrapping_add(paeth);
                }
            }
            _ => current_row.copy_from_slice(row_data),
        }

        result.extend_from_slice(&current_row);
        prev_row = current_row;
    }

    Ok(result)
}

const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}
