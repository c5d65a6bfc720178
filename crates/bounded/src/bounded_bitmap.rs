use super::{
    Index,
    OutOfBoundsAccess,
};
use alloc::vec::Vec;
use core::marker::PhantomData;

/// The number of bits of a single chunk.
const CHUNK_LEN: usize = 64;

/// A flag per key, packed into 64-bit chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedBitmap<K> {
    len: usize,
    chunks: Vec<u64>,
    marker: PhantomData<fn() -> K>,
}

impl<K> Default for BoundedBitmap<K> {
    fn default() -> Self {
        Self {
            len: 0,
            chunks: Vec::default(),
            marker: PhantomData,
        }
    }
}

impl<K> BoundedBitmap<K>
where
    K: Index,
{
    /// Returns the number of keys of the bounded bitmap.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bounded bitmap is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grows the bounded bitmap to the new length.
    ///
    /// New flags start out as `false`.
    ///
    /// # Panics
    ///
    /// If the new length shrinks the bounded bitmap.
    pub fn resize_to_len(&mut self, new_len: usize) {
        assert!(
            new_len >= self.len,
            "tried to shrink a bounded bitmap from length {} to {}",
            self.len,
            new_len,
        );
        self.len = new_len;
        let chunks = (new_len + CHUNK_LEN - 1) / CHUNK_LEN;
        self.chunks.resize(chunks, 0);
    }

    fn split_index(&self, key: K) -> Result<(usize, u32), OutOfBoundsAccess> {
        let index = key.into_index();
        if index >= self.len {
            return Err(OutOfBoundsAccess)
        }
        Ok((index / CHUNK_LEN, (index % CHUNK_LEN) as u32))
    }

    /// Returns the flag of the given key.
    ///
    /// # Errors
    ///
    /// If the key is out of bounds for the bounded bitmap.
    pub fn get(&self, key: K) -> Result<bool, OutOfBoundsAccess> {
        let (chunk, bit) = self.split_index(key)?;
        Ok(self.chunks[chunk] & (1 << bit) != 0)
    }

    /// Sets the flag of the given key.
    ///
    /// # Errors
    ///
    /// If the key is out of bounds for the bounded bitmap.
    pub fn set(&mut self, key: K, flag: bool) -> Result<(), OutOfBoundsAccess> {
        let (chunk, bit) = self.split_index(key)?;
        if flag {
            self.chunks[chunk] |= 1 << bit;
        } else {
            self.chunks[chunk] &= !(1 << bit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flags_are_false() {
        let mut bitmap = <BoundedBitmap<usize>>::default();
        bitmap.resize_to_len(100);
        for key in 0..100 {
            assert_eq!(bitmap.get(key), Ok(false));
        }
    }

    #[test]
    fn set_and_clear_across_chunks() {
        let mut bitmap = <BoundedBitmap<usize>>::default();
        bitmap.resize_to_len(130);
        for key in [0, 63, 64, 129] {
            bitmap.set(key, true).unwrap();
            assert_eq!(bitmap.get(key), Ok(true));
        }
        assert_eq!(bitmap.get(65), Ok(false));
        bitmap.set(64, false).unwrap();
        assert_eq!(bitmap.get(64), Ok(false));
        assert_eq!(bitmap.get(63), Ok(true));
    }

    #[test]
    fn out_of_bounds_key_is_rejected() {
        let mut bitmap = <BoundedBitmap<usize>>::default();
        bitmap.resize_to_len(64);
        assert_eq!(bitmap.get(64), Err(OutOfBoundsAccess));
        assert_eq!(bitmap.set(64, true), Err(OutOfBoundsAccess));
    }
}
