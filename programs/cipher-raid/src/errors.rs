use anchor_lang::prelude::*;

#[error_code]
pub enum CipherRaidError {
    // Authorization
    #[msg("Caller is not the raid owner")]
    NotOwner,

    #[msg("Fighter account does not belong to the signer")]
    FighterAuthorityMismatch,

    // State
    #[msg("Boss not configured")]
    BossNotConfigured,

    #[msg("Not in fight")]
    NotInFight,

    // Validation
    #[msg("Encrypted input proof is missing")]
    MissingInputProof,

    #[msg("Encrypted input proof does not match the submitted ciphertexts")]
    InvalidInputProof,

    #[msg("New owner cannot be the default address")]
    InvalidNewOwner,

    #[msg("Input verifier cannot be the default address")]
    InvalidInputVerifier,

    // Reentrancy
    #[msg("Reentrant call into a state-mutating instruction")]
    ReentrantCall,

    // Co-processor
    #[msg("Unknown ciphertext handle")]
    UnknownCiphertext,

    #[msg("Invalid operand for ciphertext operation")]
    InvalidCiphertextOperand,

    // Capacity
    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,

    #[msg("Access grant set is full")]
    GrantCapacityExceeded,
}

/// Coarse failure taxonomy shared with clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    Authorization,
    State,
    Validation,
    Reentrancy,
    Coprocessor,
    Capacity,
}

impl CipherRaidError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotOwner | Self::FighterAuthorityMismatch => ErrorClass::Authorization,
            Self::BossNotConfigured | Self::NotInFight => ErrorClass::State,
            Self::MissingInputProof
            | Self::InvalidInputProof
            | Self::InvalidNewOwner
            | Self::InvalidInputVerifier => ErrorClass::Validation,
            Self::ReentrantCall => ErrorClass::Reentrancy,
            Self::UnknownCiphertext | Self::InvalidCiphertextOperand => ErrorClass::Coprocessor,
            Self::ArithmeticOverflow | Self::GrantCapacityExceeded => ErrorClass::Capacity,
        }
    }
}

/// Program error code carried by an anchor error, if it is one of ours or Anchor's.
#[cfg(test)]
pub(crate) fn error_code_of(err: &anchor_lang::error::Error) -> Option<u32> {
    match err {
        anchor_lang::error::Error::AnchorError(e) => Some(e.error_code_number),
        anchor_lang::error::Error::ProgramError(_) => None,
    }
}

#[cfg(test)]
pub(crate) fn code(e: CipherRaidError) -> u32 {
    anchor_lang::error::ERROR_CODE_OFFSET + e as u32
}
