//! # Hardware CRC32
//!
//! Bit-exact software model of the STM32 CRC peripheral. This is a plain
//! MSB-first polynomial division over 32-bit little-endian words:
//! no input or output reflection and no final XOR, so it does **not** agree
//! with the zip/ethernet CRC-32.
//!
//! A trailing chunk shorter than four bytes is zero-padded on the *left* and
//! the padded group is then byte-reversed before the little-endian read, so
//! the tail behaves as a big-endian number (`[a, b]` feeds `0x0000_aabb`).
//! The device loader checks resources this way, so the padding must not be
//! "fixed".

/// Generator polynomial (CRC-32/MPEG-2 form).
pub const CRC_POLY: u32 = 0x04C1_1DB7;

/// Reset value of the CRC data register.
pub const CRC_INIT: u32 = 0xFFFF_FFFF;

/// Feed one word (1 to 4 bytes) into the running register.
pub fn process_word(data: &[u8], crc: u32) -> u32 {
    debug_assert!(data.len() <= 4);

    let value = match <[u8; 4]>::try_from(data) {
        Ok(full) => u32::from_le_bytes(full),
        Err(_) => {
            let mut padded = [0u8; 4];
            padded[4 - data.len()..].copy_from_slice(data);
            u32::from_be_bytes(padded)
        }
    };

    let mut crc = crc ^ value;
    for _ in 0..32 {
        crc = if crc & 0x8000_0000 != 0 {
            (crc << 1) ^ CRC_POLY
        } else {
            crc << 1
        };
    }
    crc
}

/// Continue a checksum over `buf` starting from register value `crc`.
pub fn process_buffer(buf: &[u8], crc: u32) -> u32 {
    buf.chunks(4).fold(crc, |acc, chunk| process_word(chunk, acc))
}

/// Checksum `data` from the reset value.
pub fn crc32(data: &[u8]) -> u32 {
    process_buffer(data, CRC_INIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(crc32(b"123 567 901 34"), 0x89f3_bab2);
        assert_eq!(crc32(b"123456789"), 0xaff1_9057);
        assert_eq!(crc32(&[0xfe, 0xff, 0xfe, 0xff]), 0x0519_b130);
    }

    #[test]
    fn test_short_tail_is_left_padded() {
        assert_eq!(crc32(&[0xfe, 0xff, 0xfe, 0xff, 0x88]), 0x495e_02ca);
        let head = process_buffer(&[0xfe, 0xff, 0xfe, 0xff], CRC_INIT);
        assert_eq!(process_word(&[0x88], head), process_word(&[0x88, 0, 0, 0], head));
        assert_eq!(process_word(&[0x33, 0x34], head), process_word(&[0x34, 0x33, 0, 0], head));
    }

    #[test]
    fn test_empty_buffer_keeps_register() {
        assert_eq!(crc32(&[]), CRC_INIT);
        assert_eq!(process_buffer(&[], 0x1234_5678), 0x1234_5678);
    }

    #[test]
    fn test_split_buffer_continues() {
        let data = b"123 567 901 34";
        let first = process_buffer(&data[..8], CRC_INIT);
        assert_eq!(process_buffer(&data[8..], first), crc32(data));
    }
}
