// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Payload Cipher (AES-128-CFB)
//!
//! Symmetric wrapping of query payloads once the digest handshake succeeded.
//!
//! Wire format: `base64(AES-128-CFB(key, IV, plaintext))` with the fixed
//! device IV. Every message starts a fresh cipher at the IV; there is no
//! running stream across messages. The fixed IV is a known weakness of the
//! device protocol and must stay for compatibility.

use aes::Aes128;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroize;

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;

/// Fixed IV shared with the device firmware.
pub const AES_IV: &[u8; 16] = b"0123456789abcdef";

/// Key size in bytes (16 ASCII hex characters).
pub const KEY_SIZE: usize = 16;

/// Upper bound on the counter pool size a device may request.
pub const MAX_COUNTER_SLOTS: usize = 256;

/// Crypto error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid digest challenge: {0}")]
    InvalidChallenge(String),
    #[error("Ciphertext is not valid base64")]
    InvalidBase64,
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("Invalid key length")]
    InvalidKeyLength,
    #[error("No free counter slot")]
    NoFreeSlot,
    #[error("Counter slot {0} out of range")]
    SlotOutOfRange(usize),
    #[error("Counter slot {0} exhausted")]
    CounterExhausted(usize),
    #[error("Random number generation failed")]
    Rng,
}

/// 128-bit key negotiated by the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Don't expose key bytes in debug output
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        CipherKey { bytes }
    }

    /// Creates a key from a slice of exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength)?;
        Ok(CipherKey { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

/// Encrypts raw bytes with a fresh cipher at the fixed IV.
pub fn encrypt_bytes(key: &CipherKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut buffer = plaintext.to_vec();
    Aes128CfbEnc::new_from_slices(key.as_bytes(), AES_IV)
        .map_err(|_| CryptoError::InvalidKeyLength)?
        .encrypt(&mut buffer);
    Ok(buffer)
}

/// Decrypts raw bytes with a fresh cipher at the fixed IV.
pub fn decrypt_bytes(key: &CipherKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut buffer = ciphertext.to_vec();
    Aes128CfbDec::new_from_slices(key.as_bytes(), AES_IV)
        .map_err(|_| CryptoError::InvalidKeyLength)?
        .decrypt(&mut buffer);
    Ok(buffer)
}

/// Encrypts a string and returns base64 text.
pub fn encrypt(key: &CipherKey, plaintext: &str) -> Result<String, CryptoError> {
    Ok(STANDARD.encode(encrypt_bytes(key, plaintext.as_bytes())?))
}

/// Decodes base64 text, decrypts it and returns the UTF-8 plaintext.
pub fn decrypt(key: &CipherKey, ciphertext: &str) -> Result<String, CryptoError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| CryptoError::InvalidBase64)?;
    String::from_utf8(decrypt_bytes(key, &raw)?).map_err(|_| CryptoError::InvalidUtf8)
}

/// One anti-replay counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSlot {
    pub val: u64,
    pub free: bool,
}

/// A counter value reserved for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterLease {
    pub slot: usize,
    pub value: u64,
    /// True if the slot was taken from the free pool and must be released.
    pub pooled: bool,
}

/// Negotiated key plus the anti-replay counter pool.
#[derive(Debug)]
pub struct CipherSession {
    key: CipherKey,
    slots: Vec<CounterSlot>,
}

impl CipherSession {
    /// Session without counters (token response carried no `countTotal`).
    pub fn new(key: CipherKey) -> Self {
        CipherSession {
            key,
            slots: Vec::new(),
        }
    }

    /// Session with `count_total` free slots, each seeded to `check_basic`.
    ///
    /// `count_total` comes from the device and is capped at [`MAX_COUNTER_SLOTS`].
    pub fn with_counters(key: CipherKey, check_basic: u64, count_total: usize) -> Self {
        if count_total > MAX_COUNTER_SLOTS {
            warn!(count_total, cap = MAX_COUNTER_SLOTS, "counter pool capped");
        }
        let count_total = count_total.min(MAX_COUNTER_SLOTS);
        CipherSession {
            key,
            slots: vec![
                CounterSlot {
                    val: check_basic,
                    free: true,
                };
                count_total
            ],
        }
    }

    pub fn key(&self) -> &CipherKey {
        &self.key
    }

    pub fn slots(&self) -> &[CounterSlot] {
        &self.slots
    }

    pub fn has_counters(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Increments and reserves a counter.
    ///
    /// With `fixed`, that exact slot is used and stays in the pool; otherwise
    /// the first free slot is taken until [`release`](Self::release).
    pub fn acquire(&mut self, fixed: Option<usize>) -> Result<CounterLease, CryptoError> {
        let (slot, pooled) = match fixed {
            Some(id) if id < self.slots.len() => (id, false),
            Some(id) => return Err(CryptoError::SlotOutOfRange(id)),
            None => {
                let id = self
                    .slots
                    .iter()
                    .position(|s| s.free)
                    .ok_or(CryptoError::NoFreeSlot)?;
                (id, true)
            }
        };

        let counter = &mut self.slots[slot];
        counter.val = counter
            .val
            .checked_add(1)
            .ok_or(CryptoError::CounterExhausted(slot))?;
        if pooled {
            counter.free = false;
        }
        Ok(CounterLease {
            slot,
            value: counter.val,
            pooled,
        })
    }

    /// Returns a pooled slot to the free list.
    pub fn release(&mut self, lease: CounterLease) {
        if lease.pooled {
            if let Some(slot) = self.slots.get_mut(lease.slot) {
                slot.free = true;
            }
        }
    }

    /// Encrypts `countId=..&checkNum=..&<query>`.
    ///
    /// Returns the base64 ciphertext and the lease to release once the call
    /// completes. Without a counter pool the bare query is encrypted.
    pub fn encrypt_query(
        &mut self,
        query: &str,
        fixed: Option<usize>,
    ) -> Result<(String, Option<CounterLease>), CryptoError> {
        if !self.has_counters() {
            return Ok((encrypt(&self.key, query)?, None));
        }

        let lease = self.acquire(fixed)?;
        let plaintext = format!("countId={}&checkNum={}&{}", lease.slot, lease.value, query);
        match encrypt(&self.key, &plaintext) {
            Ok(ciphertext) => Ok((ciphertext, Some(lease))),
            Err(err) => {
                self.release(lease);
                Err(err)
            }
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        encrypt(&self.key, plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        decrypt(&self.key, ciphertext)
    }
}
