use sensible_hashes::HasherBase;

pub mod sighash;
pub mod sighash_type;
pub mod tx;

pub trait HasherExtensions {
    /// Writes a length as a compact-size integer
    fn write_len(&mut self, len: usize) -> &mut Self;

    fn write_u8(&mut self, el: u8) -> &mut Self;

    fn write_u32(&mut self, el: u32) -> &mut Self;

    fn write_u64(&mut self, el: u64) -> &mut Self;

    /// Writes the number of bytes followed by the bytes themselves
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self;
}

/// Fails at compile time if `usize::MAX > u64::MAX`.
const _: usize = u64::MAX as usize - usize::MAX;

impl<T: HasherBase> HasherExtensions for T {
    #[inline(always)]
    fn write_len(&mut self, len: usize) -> &mut Self {
        match len as u64 {
            n @ 0..0xfd => self.update([n as u8]),
            n @ 0xfd..=0xffff => self.update([0xfd]).update((n as u16).to_le_bytes()),
            n @ 0x10000..=0xffff_ffff => self.update([0xfe]).update((n as u32).to_le_bytes()),
            n => self.update([0xff]).update(n.to_le_bytes()),
        }
    }

    #[inline(always)]
    fn write_u8(&mut self, el: u8) -> &mut Self {
        self.update(el.to_le_bytes())
    }

    #[inline(always)]
    fn write_u32(&mut self, el: u32) -> &mut Self {
        self.update(el.to_le_bytes())
    }

    #[inline(always)]
    fn write_u64(&mut self, el: u64) -> &mut Self {
        self.update(el.to_le_bytes())
    }

    #[inline(always)]
    fn write_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_len(bytes.len()).update(bytes)
    }
}

/// Size in bytes of a compact-size integer.
pub fn var_int_size(n: u64) -> usize {
    match n {
        0..0xfd => 1,
        0xfd..=0xffff => 3,
        0x10000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// A "hasher" that collects the written bytes, used wherever the exact
/// preimage is needed rather than its digest.
#[derive(Clone, Default)]
pub struct BytesWriter(Vec<u8>);

impl BytesWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl HasherBase for BytesWriter {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.extend_from_slice(data.as_ref());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_len() {
        struct Test {
            len: usize,
            expected: Vec<u8>,
        }

        let tests = vec![
            Test { len: 0, expected: vec![0x00] },
            Test { len: 0xfc, expected: vec![0xfc] },
            Test { len: 0xfd, expected: vec![0xfd, 0xfd, 0x00] },
            Test { len: 0xffff, expected: vec![0xfd, 0xff, 0xff] },
            Test { len: 0x10000, expected: vec![0xfe, 0x00, 0x00, 0x01, 0x00] },
            Test { len: 0x1_0000_0000, expected: vec![0xff, 0, 0, 0, 0, 1, 0, 0, 0] },
        ];

        for test in tests {
            let mut writer = BytesWriter::default();
            writer.write_len(test.len);
            assert_eq!(writer.into_bytes(), test.expected, "len {}", test.len);
            assert_eq!(var_int_size(test.len as u64), test.expected.len());
        }
    }
}
