//! # 口令加密
//!
//! AES-256-CBC + PKCS#7 填充，密钥由口令的 SHA-256 摘要再经过若干轮额外哈希拉伸得到。
//! 每次加密使用随机 IV，IV 拼接在密文之前，整体以 Base64 文本输出。
//!
//! 这里没有任何认证标签：错误的口令通常会在去填充或后续的 Base64/UTF-8 解析时失败，
//! 但并不保证一定失败。

use crate::error::{Result, StegoError};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES 块大小，也是 IV 的长度。
const IV_LEN: usize = 16;

/// 由口令派生 256 位密钥：一次基础 SHA-256，之后再迭代 `additional_iterations` 轮。
pub fn derive_key(password: &str, additional_iterations: u32) -> [u8; 32] {
    let mut key: [u8; 32] = Sha256::digest(password.as_bytes()).into();
    for _ in 0..additional_iterations {
        key = Sha256::digest(key).into();
    }
    key
}

/// 加密文本，返回 `Base64(IV || 密文)`。
pub fn encrypt(plaintext: &str, password: &str, additional_iterations: u32) -> String {
    let key = derive_key(password, additional_iterations);
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut framed = Vec::with_capacity(IV_LEN + ciphertext.len());
    framed.extend_from_slice(&iv);
    framed.extend_from_slice(&ciphertext);
    BASE64.encode(framed)
}

/// 解密由 [`encrypt`] 生成的文本。
///
/// # Errors
///
/// 输入不是合法的 Base64、长度不对、去填充失败或明文不是 UTF-8 时返回
/// [`StegoError::Transformation`]。
pub fn decrypt(encoded: &str, password: &str, additional_iterations: u32) -> Result<String> {
    let framed = BASE64
        .decode(encoded)
        .map_err(|e| StegoError::transformation("Ciphertext is not valid base64", e))?;

    if framed.len() < IV_LEN * 2 || framed.len() % IV_LEN != 0 {
        return Err(StegoError::Transformation(format!(
            "Ciphertext has invalid length {}",
            framed.len()
        )));
    }

    let (iv, ciphertext) = framed.split_at(IV_LEN);
    let key = derive_key(password, additional_iterations);
    let mut iv_block = [0u8; IV_LEN];
    iv_block.copy_from_slice(iv);

    let plaintext = Aes256CbcDec::new(&key.into(), &iv_block.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| StegoError::transformation("Decryption failed (wrong password?)", e))?;

    String::from_utf8(plaintext)
        .map_err(|e| StegoError::transformation("Decrypted text is not valid UTF-8", e))
}
