//! Hash helpers.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use sha2::Sha256;

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Blake2b with a 28-byte digest (Cardano key hashes).
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    Blake2b224::digest(data).into()
}

/// Blake2b with a 32-byte digest (Cardano transaction ids and auxiliary data hashes).
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    Blake2b256::digest(data).into()
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}
