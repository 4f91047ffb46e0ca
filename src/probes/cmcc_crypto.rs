// Copyright (c) 2026 PanCheck
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use aes::Aes128;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// 中国移动云盘接口固定密钥
const KEY: &[u8; 16] = b"PVGDwmcvfs1uV3d1";

/// 加解密错误类型
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("base64解码失败: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("加密数据长度不足")]
    TooShort,
    #[error("密文长度不是块大小的倍数")]
    BadBlockLength,
    #[error("去除填充失败")]
    Padding,
    #[error("明文不是有效的UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// 中国移动云加密
///
/// AES-128-CBC + PKCS#7，随机16字节IV置于密文之前，整体base64编码
pub fn encrypt(plaintext: &str) -> String {
    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = Aes128CbcEnc::new(KEY.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut payload = iv.to_vec();
    payload.extend_from_slice(&ciphertext);
    BASE64.encode(payload)
}

/// 中国移动云解密
///
/// 前16字节为IV，其余为密文，逆向 `encrypt` 的编码
pub fn decrypt(encoded: &str) -> Result<String, CryptoError> {
    let payload = BASE64.decode(encoded.trim())?;
    if payload.len() < 16 {
        return Err(CryptoError::TooShort);
    }

    let (iv, ciphertext) = payload.split_at(16);
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::BadBlockLength);
    }
    let mut iv_block = [0u8; 16];
    iv_block.copy_from_slice(iv);

    let mut buffer = ciphertext.to_vec();
    let plaintext = Aes128CbcDec::new(KEY.into(), &iv_block.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::Padding)?
        .to_vec();

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let payload = r#"{"getOutLinkInfoReq":{"linkID":"abc123"}}"#;
        let encrypted = encrypt(payload);
        assert_ne!(encrypted, payload);
        let decrypted = decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, payload);
    }

    #[test]
    fn test_random_iv_varies_ciphertext() {
        let payload = "same plaintext";
        assert_ne!(encrypt(payload), encrypt(payload));
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        assert!(decrypt("not base64 at all !!!").is_err());
        assert!(decrypt(&BASE64.encode([0u8; 8])).is_err());
    }
}
