//! Little-endian `i32` payload codec.

use crate::ELEMENT_SIZE;

/// Encode elements into a fresh byte vector.
pub fn encode(values: &[i32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * ELEMENT_SIZE);
    encode_into(values, &mut out);
    out
}

/// Append the little-endian encoding of `values` to `out`.
#[inline]
pub fn encode_into(values: &[i32], out: &mut Vec<u8>) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Decode `bytes` into `out`, returning the number of elements written.
///
/// Returns `None` if `bytes` is not a whole number of elements or holds
/// more elements than `out` can take.
pub fn decode_into(bytes: &[u8], out: &mut [i32]) -> Option<usize> {
    if bytes.len() % ELEMENT_SIZE != 0 {
        return None;
    }
    let count = bytes.len() / ELEMENT_SIZE;
    if count > out.len() {
        return None;
    }
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(ELEMENT_SIZE)) {
        *slot = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_and_extreme_values() {
        let values = [i32::MIN, -1, 0, 1001, i32::MAX];
        let bytes = encode(&values);
        assert_eq!(bytes.len(), 20);

        let mut out = [0i32; 5];
        assert_eq!(decode_into(&bytes, &mut out), Some(5));
        assert_eq!(out, values);
    }

    #[test]
    fn test_decode_rejects_partial_element() {
        let mut out = [0i32; 4];
        assert_eq!(decode_into(&[1, 2, 3], &mut out), None);
    }

    #[test]
    fn test_decode_rejects_overflowing_buffer() {
        let bytes = encode(&[1, 2, 3]);
        let mut out = [0i32; 2];
        assert_eq!(decode_into(&bytes, &mut out), None);
    }

    #[test]
    fn test_decode_short_message_leaves_tail() {
        let bytes = encode(&[7]);
        let mut out = [-1i32; 3];
        assert_eq!(decode_into(&bytes, &mut out), Some(1));
        assert_eq!(out, [7, -1, -1]);
    }
}
