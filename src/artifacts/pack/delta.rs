//! Git delta instruction stream
//!
//! A delta rebuilds a target object from a base object:
//!
//! ```text
//! <base-size varint> <target-size varint> <instruction>*
//! ```
//!
//! - `1xxxxxxx`: copy. The low four bits select which offset bytes follow,
//!   the next three bits select which size bytes follow (little endian).
//!   A size of zero means `0x10000`.
//! - `0xxxxxxx` (non-zero): insert the next `x` literal bytes.
//! - `00000000`: reserved, always an error.

const COPY_ZERO_SIZE: usize = 0x10000;

/// Largest buffer reserved up front from a size read off disk
pub(crate) const MAX_PREALLOCATION: usize = 1 << 20;

/// Read a little-endian base-128 size.
fn read_size(delta: &[u8], pos: &mut usize) -> Option<usize> {
    let mut size = 0usize;
    let mut shift = 0;

    loop {
        let byte = *delta.get(*pos)?;
        *pos += 1;
        size |= ((byte & 0x7f) as usize).checked_shl(shift)?;
        shift += 7;

        if byte & 0x80 == 0 {
            return Some(size);
        }
    }
}

/// Read the bytes selected by `mask` bits (starting at bit `first_bit`) as a
/// little-endian integer.
fn read_masked(
    delta: &[u8],
    pos: &mut usize,
    op: u8,
    first_bit: u8,
    count: u8,
) -> Option<usize> {
    let mut value = 0usize;

    for i in 0..count {
        if op & (1 << (first_bit + i)) != 0 {
            let byte = *delta.get(*pos)?;
            *pos += 1;
            value |= (byte as usize) << (8 * i);
        }
    }

    Some(value)
}

/// Replay `delta` against `base`, returning the reconstructed target bytes.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, String> {
    let mut pos = 0;

    let base_size = read_size(delta, &mut pos).ok_or("truncated delta header")?;
    if base_size != base.len() {
        return Err(format!(
            "delta expects base of {base_size} bytes, found {}",
            base.len()
        ));
    }
    let target_size = read_size(delta, &mut pos).ok_or("truncated delta header")?;
    let mut target = Vec::with_capacity(target_size.min(MAX_PREALLOCATION));

    while pos < delta.len() {
        let op = delta[pos];
        pos += 1;

        if op & 0x80 != 0 {
            let offset = read_masked(delta, &mut pos, op, 0, 4).ok_or("truncated copy offset")?;
            let size = match read_masked(delta, &mut pos, op, 4, 3).ok_or("truncated copy size")? {
                0 => COPY_ZERO_SIZE,
                size => size,
            };

            let end = offset
                .checked_add(size)
                .filter(|&end| end <= base.len())
                .ok_or_else(|| {
                    format!(
                        "copy of {size} bytes at {offset} exceeds base of {} bytes",
                        base.len()
                    )
                })?;
            if target.len() + size > target_size {
                return Err(format!("delta overruns its target size {target_size}"));
            }
            target.extend_from_slice(&base[offset..end]);
        } else if op != 0 {
            let size = op as usize;
            let literal = delta
                .get(pos..pos + size)
                .ok_or("truncated insert instruction")?;
            if target.len() + size > target_size {
                return Err(format!("delta overruns its target size {target_size}"));
            }
            target.extend_from_slice(literal);
            pos += size;
        } else {
            return Err("reserved delta opcode 0".to_string());
        }
    }

    if target.len() != target_size {
        return Err(format!(
            "delta produced {} bytes, expected {target_size}",
            target.len()
        ));
    }

    Ok(target)
}
