// Mon Jan 19 2026 - Alex

pub struct BinaryUtils;

impl BinaryUtils {
    pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
        data.get(offset).copied()
    }

    pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
        let bytes = data.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
        let bytes = data.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
        let bytes = data.get(offset..offset.checked_add(8)?)?;
        Some(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub fn read_i32_le(data: &[u8], offset: usize) -> Option<i32> {
        Self::read_u32_le(data, offset).map(|v| v as i32)
    }

    pub fn read_i64_le(data: &[u8], offset: usize) -> Option<i64> {
        Self::read_u64_le(data, offset).map(|v| v as i64)
    }

    /// Reads a NUL-terminated string starting at `offset`. Returns `None` if no
    /// terminator is found before the end of the buffer.
    pub fn read_c_string(data: &[u8], offset: usize) -> Option<String> {
        let tail = data.get(offset..)?;
        let len = tail.iter().position(|&b| b == 0)?;
        String::from_utf8(tail[..len].to_vec()).ok()
    }

    pub fn write_u16_le(data: &mut [u8], offset: usize, value: u16) -> bool {
        Self::write_bytes(data, offset, &value.to_le_bytes())
    }

    pub fn write_u32_le(data: &mut [u8], offset: usize, value: u32) -> bool {
        Self::write_bytes(data, offset, &value.to_le_bytes())
    }

    pub fn write_u64_le(data: &mut [u8], offset: usize, value: u64) -> bool {
        Self::write_bytes(data, offset, &value.to_le_bytes())
    }

    pub fn write_bytes(data: &mut [u8], offset: usize, bytes: &[u8]) -> bool {
        let end = match offset.checked_add(bytes.len()) {
            Some(end) => end,
            None => return false,
        };
        match data.get_mut(offset..end) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Writes `s` followed by a NUL byte. Returns the number of bytes written.
    pub fn write_c_string(data: &mut [u8], offset: usize, s: &str) -> Option<usize> {
        let len = s.len() + 1;
        let dst = data.get_mut(offset..offset.checked_add(len)?)?;
        dst[..s.len()].copy_from_slice(s.as_bytes());
        dst[s.len()] = 0;
        Some(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_bounds_checked() {
        let data = [0x78, 0x56, 0x34, 0x12, 0xff];
        assert_eq!(BinaryUtils::read_u32_le(&data, 0), Some(0x12345678));
        assert_eq!(BinaryUtils::read_u32_le(&data, 1), Some(0xff123456));
        assert_eq!(BinaryUtils::read_u32_le(&data, 2), None);
        assert_eq!(BinaryUtils::read_u64_le(&data, 0), None);
        assert_eq!(BinaryUtils::read_u16_le(&data, usize::MAX), None);
        assert_eq!(BinaryUtils::read_u8(&data, 5), None);
    }

    #[test]
    fn test_signed_read() {
        let data = (-5i32).to_le_bytes();
        assert_eq!(BinaryUtils::read_i32_le(&data, 0), Some(-5));
    }

    #[test]
    fn test_c_string_round_trip() {
        let mut buf = vec![0xAAu8; 16];
        assert_eq!(BinaryUtils::write_c_string(&mut buf, 2, "abc"), Some(4));
        assert_eq!(BinaryUtils::read_c_string(&buf, 2).as_deref(), Some("abc"));
        assert_eq!(BinaryUtils::write_c_string(&mut buf, 14, "abc"), None);
    }

    #[test]
    fn test_write_out_of_range() {
        let mut buf = [0u8; 4];
        assert!(!BinaryUtils::write_u32_le(&mut buf, 1, 7));
        assert!(BinaryUtils::write_u32_le(&mut buf, 0, 7));
        assert_eq!(buf, [7, 0, 0, 0]);
    }
}
