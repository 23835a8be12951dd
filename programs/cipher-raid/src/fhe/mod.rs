use anchor_lang::prelude::*;

pub mod attestation;
pub mod symbolic;

#[cfg(test)]
pub mod plaintext;

pub use attestation::{input_digest, Ed25519InputVerifier, InputVerifier, NoInputs};
pub use symbolic::*;

/// Caller-supplied ciphertext, decoded into an engine value by the co-processor.
pub type ExternalCiphertext = [u8; 32];

/// Kind tag stored in the last byte of every handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueKind {
    Uint16 = 1,
    Bool = 2,
}

/// Opaque reference to a ciphertext held by the co-processor.
/// Safe to publish; resolving it to plaintext goes through the ACL-gated decryption path.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Handle(pub [u8; 32]);

impl Handle {
    pub const ZERO: Handle = Handle([0u8; 32]);
    pub const SIZE: usize = 32;

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self.0[31] {
            1 => Some(ValueKind::Uint16),
            2 => Some(ValueKind::Bool),
            _ => None,
        }
    }
}

/// Encrypted 16-bit unsigned integer.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
)]
pub struct Euint16(pub Handle);

/// Encrypted boolean.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash,
)]
pub struct Ebool(pub Handle);

impl Euint16 {
    pub const ZERO: Euint16 = Euint16(Handle::ZERO);

    pub fn handle(&self) -> Handle {
        self.0
    }
}

impl Ebool {
    pub const ZERO: Ebool = Ebool(Handle::ZERO);

    pub fn handle(&self) -> Handle {
        self.0
    }
}

/// Homomorphic operations offered by the confidential co-processor.
///
/// Implementations never hand plaintext back to the engine. Integer arithmetic
/// wraps at 16 bits like the encrypted type it models.
pub trait Coprocessor {
    /// Decode caller-supplied ciphertexts. `proof` must attest exactly these
    /// inputs for `caller`, otherwise the whole batch is rejected. Accepted
    /// proofs travel with the decode request to the backend.
    fn decode<const N: usize>(
        &mut self,
        inputs: &[ExternalCiphertext; N],
        proof: &[u8],
        caller: &Pubkey,
    ) -> Result<[Euint16; N]>;

    /// Lift a plaintext constant into the encrypted domain.
    fn lift(&mut self, value: u16) -> Result<Euint16>;

    fn add(&mut self, a: Euint16, b: Euint16) -> Result<Euint16>;

    fn sub(&mut self, a: Euint16, b: Euint16) -> Result<Euint16>;

    /// Integer division by a plaintext constant. A zero divisor is rejected.
    fn div_scalar(&mut self, a: Euint16, divisor: u16) -> Result<Euint16>;

    fn gt(&mut self, a: Euint16, b: Euint16) -> Result<Ebool>;

    fn equal(&mut self, a: Euint16, b: Euint16) -> Result<Ebool>;

    fn select(&mut self, cond: Ebool, if_true: Euint16, if_false: Euint16) -> Result<Euint16>;
}
