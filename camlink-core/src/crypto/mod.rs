// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod cipher;
pub mod digest;
pub mod handshake;

pub use cipher::{
    decrypt, encrypt, CipherKey, CipherSession, CounterLease, CounterSlot, CryptoError, AES_IV,
    MAX_COUNTER_SLOTS,
};
pub use digest::{generate_cnonce, md5_hex, DigestChallenge};
pub use handshake::{EncryptedHandshake, HandshakeState};
