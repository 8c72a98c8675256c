//! AES-CBC helpers for the standard security handler.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cbc::{Decryptor, Encryptor};

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;

/// Decrypt with AES-CBC (128 or 256 bit key, 16 byte IV, block-aligned
/// data). Trailing partial blocks are dropped rather than decrypted.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    assert!(iv.len() == 16, "AES IV must be 16 bytes");
    let mut buf = data[..data.len() - data.len() % 16].to_vec();
    match key.len() {
        16 => {
            let cipher = Aes128CbcDec::new(key.into(), iv.into());
            cipher
                .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
                .expect("block-aligned buffer");
        }
        32 => {
            let cipher = Aes256CbcDec::new(key.into(), iv.into());
            cipher
                .decrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf)
                .expect("block-aligned buffer");
        }
        _ => panic!("AES key must be 16 or 32 bytes"),
    }
    buf
}

/// Encrypt with AES-128-CBC, no padding. Only needed by the revision 6
/// password hash, which always feeds block-aligned input.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    assert!(key.len() == 16, "AES-128 key must be 16 bytes");
    assert!(iv.len() == 16, "AES IV must be 16 bytes");
    let mut buf = data.to_vec();
    let cipher = Aes128CbcEnc::new(key.into(), iv.into());
    cipher
        .encrypt_padded_mut::<aes::cipher::block_padding::NoPadding>(&mut buf, data.len())
        .expect("block-aligned buffer");
    buf
}

/// Strip PKCS#7 padding, returning the input unchanged when the padding
/// is not well formed (tolerated: real producers get this wrong).
pub fn unpad(data: &[u8]) -> &[u8] {
    if data.is_empty() {
        return data;
    }
    let pad_len = data[data.len() - 1] as usize;
    if pad_len == 0 || pad_len > 16 || pad_len > data.len() {
        return data;
    }
    let start = data.len() - pad_len;
    if data[start..].iter().all(|&b| b as usize == pad_len) {
        &data[..start]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let plain = [0x42u8; 32];
        let enc = aes_cbc_encrypt(&key, &iv, &plain);
        assert_ne!(enc[..], plain[..]);
        let dec = aes_cbc_decrypt(&key, &iv, &enc);
        assert_eq!(dec[..], plain[..]);
    }

    #[test]
    fn unpad_validates() {
        assert_eq!(unpad(&[1, 2, 3, 2, 2]), &[1, 2, 3]);
        // Claimed pad longer than data: unchanged.
        assert_eq!(unpad(&[9, 9]), &[9, 9]);
        // Inconsistent pad bytes: unchanged.
        assert_eq!(unpad(&[1, 2, 3, 1, 2]), &[1, 2, 3, 1, 2]);
        assert_eq!(unpad(&[]), &[] as &[u8]);
    }
}
