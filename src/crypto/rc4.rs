//! RC4 keystream generator.
//!
//! Plain ARC4 with a configurable number of discarded initial keystream
//! bytes. State advances monotonically; there is no way to rewind.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// RC4 generator state.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Rc4 {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl Rc4 {
    /// Run the key schedule and discard `drop` keystream bytes.
    ///
    /// `key` must not be empty.
    pub fn new(key: &[u8], drop: usize) -> Self {
        debug_assert!(!key.is_empty(), "RC4 key must not be empty");

        let mut s = [0u8; 256];
        for (idx, slot) in s.iter_mut().enumerate() {
            *slot = idx as u8;
        }

        let mut j: u8 = 0;
        for i in 0..256 {
            j = j
                .wrapping_add(key[i % key.len()])
                .wrapping_add(s[i]);
            s.swap(i, j as usize);
        }

        let mut rc4 = Self { s, i: 0, j: 0 };
        for _ in 0..drop {
            rc4.next_byte();
        }
        rc4
    }

    #[inline]
    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let idx = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[idx as usize]
    }

    /// XOR the next `buf.len()` keystream bytes into `buf`.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte ^= self.next_byte();
        }
    }

    /// Cipher a copy of `data`.
    pub fn cipher(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply_keystream(&mut out);
        out
    }
}

impl fmt::Debug for Rc4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rc4([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_rc4_vector_with_drop() {
        let mut rc4 = Rc4::new(&hex!("7a1fb3b37abe7247af7363e53ddc8aa5964575bc"), 256);
        let out = rc4.cipher(&hex!(
            "f80790cb1276fc0654686f6d61734dfc1570726573656e63652d313339313938353938312d32"
        ));
        assert_eq!(
            out,
            hex!("35be4eb77f495de73d952cc9c910041450114e12efbe1422ac85e021e15d9e26ca7689fea70b")
        );
    }

    #[test]
    fn test_rc4_symmetric() {
        let plaintext = b"attack at dawn";
        let mut enc = Rc4::new(b"Secret", 0);
        let mut dec = Rc4::new(b"Secret", 0);

        let ciphertext = enc.cipher(plaintext);
        assert_ne!(&ciphertext[..], &plaintext[..]);
        assert_eq!(dec.cipher(&ciphertext), plaintext);
    }

    #[test]
    fn test_rc4_classic_vector() {
        // Well-known ARC4 test vector (no drop)
        let mut rc4 = Rc4::new(b"Key", 0);
        assert_eq!(rc4.cipher(b"Plaintext"), hex!("bbf316e8d940af0ad3"));
    }

    #[test]
    fn test_rc4_state_advances() {
        let mut rc4 = Rc4::new(b"key", 256);
        let first = rc4.cipher(&[0u8; 8]);
        let second = rc4.cipher(&[0u8; 8]);
        assert_ne!(first, second);
    }

    #[test]
    fn test_rc4_debug_redacted() {
        let rc4 = Rc4::new(b"key", 0);
        assert_eq!(format!("{:?}", rc4), "Rc4([REDACTED])");
    }
}
