use crate::{Hash, Hash160, HASH160_SIZE, HASH_SIZE};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Incremental hashing with chainable updates.
pub trait HasherBase {
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self;
}

pub trait Hasher: HasherBase + Clone + Default {
    fn finalize(self) -> Hash;

    fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline(always)]
    fn hash<A: AsRef<[u8]>>(data: A) -> Hash {
        let mut hasher = Self::default();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Single round SHA-256.
#[derive(Clone, Default)]
pub struct Sha256Hasher(Sha256);

impl HasherBase for Sha256Hasher {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for Sha256Hasher {
    #[inline(always)]
    fn finalize(self) -> Hash {
        Hash::from_bytes(self.0.finalize().into())
    }
}

/// Double SHA-256, used for transaction ids and signature hashes.
#[derive(Clone, Default)]
pub struct TransactionHash(Sha256);

impl HasherBase for TransactionHash {
    #[inline(always)]
    fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }
}

impl Hasher for TransactionHash {
    #[inline(always)]
    fn finalize(self) -> Hash {
        let first: [u8; HASH_SIZE] = self.0.finalize().into();
        Hash::from_bytes(Sha256::digest(first).into())
    }
}

#[inline]
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

#[inline]
pub fn sha256d(data: &[u8]) -> Hash {
    TransactionHash::hash(data)
}

#[inline]
pub fn ripemd160(data: &[u8]) -> [u8; HASH160_SIZE] {
    Ripemd160::digest(data).into()
}

/// `RIPEMD160(SHA256(data))`
#[inline]
pub fn hash160(data: &[u8]) -> Hash160 {
    Hash160::from_bytes(ripemd160(&sha256(data)))
}
