//! Compiled character set using bitmap for fast matching.

/// Compiled character set using bitmap for fast matching
#[derive(Clone)]
pub struct CompiledCharSet {
    /// Bitmap for the first 256 code points (256 bits = 32 bytes)
    bitmap: [u64; 4],
    negated: bool,
}

impl CompiledCharSet {
    pub fn new(ranges: &[(char, char)], negated: bool) -> Self {
        let mut bitmap = [0u64; 4];
        for &(lo, hi) in ranges {
            for c in (lo as u32)..=(hi as u32) {
                if c < 256 {
                    let idx = (c / 64) as usize;
                    let bit = c % 64;
                    bitmap[idx] |= 1u64 << bit;
                }
            }
        }
        Self { bitmap, negated }
    }

    #[inline]
    pub fn matches(&self, c: char) -> bool {
        let code = c as u32;
        if code >= 256 {
            return self.negated;
        }
        let idx = (code / 64) as usize;
        let bit = code % 64;
        let in_set = (self.bitmap[idx] & (1u64 << bit)) != 0;
        if self.negated {
            !in_set
        } else {
            in_set
        }
    }

    /// Check if this charset is negated
    pub fn is_negated(&self) -> bool {
        self.negated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_membership() {
        let set = CompiledCharSet::new(&[('a', 'f'), ('0', '0')], false);
        assert!(set.matches('a'));
        assert!(set.matches('f'));
        assert!(set.matches('0'));
        assert!(!set.matches('g'));
        assert!(!set.matches('1'));
    }

    #[test]
    fn negated_set() {
        let set = CompiledCharSet::new(&[('0', '9')], true);
        assert!(!set.matches('5'));
        assert!(set.matches('x'));
    }

    #[test]
    fn beyond_bitmap_only_matches_negated() {
        let positive = CompiledCharSet::new(&[('a', 'z')], false);
        let negative = CompiledCharSet::new(&[('a', 'z')], true);
        assert!(!positive.matches('日'));
        assert!(negative.matches('日'));
    }
}
