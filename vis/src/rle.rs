//! Zero run length coding of visibility rows. Any non-zero byte is stored as
//! is, a run of zero bytes becomes `0x00` followed by the run length.

use crate::error::{VisError, VisResult};

/// Append the compressed form of `row` to `out`
pub fn compress_row(row: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < row.len() {
        let byte = row[i];
        out.push(byte);
        i += 1;
        if byte != 0 {
            continue;
        }
        let mut rep = 1u8;
        while i < row.len() && row[i] == 0 && rep < u8::MAX {
            rep += 1;
            i += 1;
        }
        out.push(rep);
    }
}

/// Expand the row starting at the beginning of `data` back to `row_bytes`
/// bytes
pub fn decompress_row(data: &[u8], row_bytes: usize) -> VisResult<Vec<u8>> {
    let mut row = Vec::with_capacity(row_bytes);
    let mut i = 0;
    while row.len() < row_bytes {
        let byte = *data.get(i).ok_or(VisError::RowOverrun { offset: i })?;
        i += 1;
        if byte != 0 {
            row.push(byte);
            continue;
        }
        let rep = *data.get(i).ok_or(VisError::RowOverrun { offset: i })? as usize;
        i += 1;
        let rep = rep.min(row_bytes - row.len());
        row.resize(row.len() + rep, 0);
    }
    Ok(row)
}
