/// Per-row null flags for a fixed-capacity column vector.
///
/// A set bit means the slot is null. The bitmap is sized once to the batch
/// capacity and never grows; stale bits beyond the live rows are simply
/// ignored by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct NullBitmap {
    data: Vec<u64>,
    len: usize,
}

impl NullBitmap {
    pub fn new_valid(len: usize) -> Self {
        let num_words = len.div_ceil(64);
        Self {
            data: vec![0; num_words],
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        if index >= self.len {
            return true;
        }
        let word = index / 64;
        let bit = index % 64;
        (self.data[word] >> bit) & 1 == 1
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    #[inline]
    pub fn set(&mut self, index: usize, is_null: bool) {
        if index >= self.len {
            return;
        }
        let word = index / 64;
        let bit = index % 64;
        if is_null {
            self.data[word] |= 1 << bit;
        } else {
            self.data[word] &= !(1 << bit);
        }
    }

    #[inline]
    pub fn set_valid(&mut self, index: usize) {
        self.set(index, false);
    }

    #[inline]
    pub fn set_null(&mut self, index: usize) {
        self.set(index, true);
    }

    /// Marks slots `0..n` as valid, word at a time.
    pub fn fill_valid(&mut self, n: usize) {
        let n = n.min(self.len);
        let full_words = n / 64;
        for word in &mut self.data[..full_words] {
            *word = 0;
        }
        let remaining_bits = n % 64;
        if remaining_bits > 0 {
            let mask = (1u64 << remaining_bits) - 1;
            self.data[full_words] &= !mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn test_new_valid() {
        let bitmap = NullBitmap::new_valid(100);
        assert_eq!(bitmap.len(), 100);
        for i in 0..100 {
            assert!(bitmap.is_valid(i));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_set() {
        let mut bitmap = NullBitmap::new_valid(10);
        bitmap.set(5, true);
        assert!(bitmap.is_null(5));
        bitmap.set(5, false);
        assert!(bitmap.is_valid(5));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_is_null_out_of_bounds() {
        let bitmap = NullBitmap::new_valid(10);
        assert!(bitmap.is_null(10));
        assert!(bitmap.is_null(usize::MAX));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_set_out_of_bounds_is_ignored() {
        let mut bitmap = NullBitmap::new_valid(10);
        bitmap.set(100, true);
        assert!((0..10).all(|i| bitmap.is_valid(i)));
    }

    fn all_null(len: usize) -> NullBitmap {
        let mut bitmap = NullBitmap::new_valid(len);
        for i in 0..len {
            bitmap.set_null(i);
        }
        bitmap
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fill_valid_partial_word() {
        let mut bitmap = all_null(100);
        bitmap.fill_valid(10);
        for i in 0..10 {
            assert!(bitmap.is_valid(i));
        }
        for i in 10..100 {
            assert!(bitmap.is_null(i));
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fill_valid_across_word_boundary() {
        let mut bitmap = all_null(200);
        bitmap.fill_valid(130);
        assert_eq!((0..200).filter(|i| bitmap.is_null(*i)).count(), 70);
        assert!(bitmap.is_valid(129));
        assert!(bitmap.is_null(130));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fill_valid_exact_word() {
        let mut bitmap = all_null(128);
        bitmap.fill_valid(64);
        assert!(bitmap.is_valid(63));
        assert!(bitmap.is_null(64));
        assert!(bitmap.is_null(127));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_set_at_word_boundary() {
        let mut bitmap = NullBitmap::new_valid(130);
        bitmap.set_null(63);
        bitmap.set_null(64);
        assert!(bitmap.is_null(63));
        assert!(bitmap.is_null(64));
        assert!(bitmap.is_valid(62));
        assert!(bitmap.is_valid(65));
    }
}
