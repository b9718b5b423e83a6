/// MSB-first bit cursor over a byte slice.
///
/// Reads return `None` past the end of the slice, so header parsers can
/// bail with `?` instead of tracking remaining lengths themselves.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        BitReader { data, pos: 0 }
    }

    pub(crate) fn read(&mut self, count: u32) -> Option<u32> {
        debug_assert!(count <= 32);
        let mut value = 0u32;
        for _ in 0..count {
            let byte = self.data.get(self.pos >> 3)?;
            let bit = (byte >> (7 - (self.pos & 7))) & 1;
            value = (value << 1) | u32::from(bit);
            self.pos += 1;
        }
        Some(value)
    }

    pub(crate) fn skip(&mut self, count: u32) -> Option<()> {
        let end = self.pos + count as usize;
        if end > self.data.len() * 8 {
            return None;
        }
        self.pos = end;
        Some(())
    }
}

/// Packs `(value, bits)` fields MSB-first, padding the last byte with zeros.
#[cfg(test)]
pub(crate) fn pack_bits(fields: &[(u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc = 0u8;
    let mut used = 0u32;
    for &(value, bits) in fields {
        for i in (0..bits).rev() {
            let bit = ((value >> i) & 1) as u8;
            acc = (acc << 1) | bit;
            used += 1;
            if used == 8 {
                out.push(acc);
                acc = 0;
                used = 0;
            }
        }
    }
    if used > 0 {
        out.push(acc << (8 - used));
    }
    out
}
