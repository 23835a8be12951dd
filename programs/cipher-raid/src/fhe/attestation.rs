use anchor_lang::prelude::*;
use solana_sdk_ids::ed25519_program;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::sysvar::instructions::{
    load_current_index_checked, load_instruction_at_checked,
};

use super::ExternalCiphertext;
use crate::errors::CipherRaidError;

/// Domain tag for input digests.
pub const INPUT_PROOF_DOMAIN: &[u8] = b"cipher-raid/input-proof/v1";

/// Ed25519 signature length; on-chain input proofs are verifier signatures.
pub const SIGNATURE_LEN: usize = 64;

// Ed25519 precompile instruction layout
const SIGNATURE_OFFSETS_START: usize = 2;
const PUBKEY_LEN: usize = 32;
const CURRENT_INSTRUCTION: u16 = u16::MAX;

/// Message the input verifier signs: a batch of ciphertexts bound to the
/// identity submitting them and to this program.
pub fn input_digest(caller: &Pubkey, inputs: &[ExternalCiphertext]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(INPUT_PROOF_DOMAIN);
    hasher.update(crate::ID.as_ref());
    hasher.update(caller.as_ref());
    hasher.update(&(inputs.len() as u32).to_le_bytes());
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Checks input proofs before ciphertexts are decoded.
pub trait InputVerifier {
    /// Accept `proof` only if it attests exactly `inputs` for `caller`.
    fn verify(&self, caller: &Pubkey, inputs: &[ExternalCiphertext], proof: &[u8]) -> Result<()>;
}

/// On-chain verifier. The transaction must carry an Ed25519 precompile
/// instruction right before the current one, in which the configured input
/// verifier signed the input digest; `proof` is that signature.
pub struct Ed25519InputVerifier<'info> {
    verifier: Pubkey,
    instructions: AccountInfo<'info>,
}

impl<'info> Ed25519InputVerifier<'info> {
    pub fn new(verifier: Pubkey, instructions: AccountInfo<'info>) -> Self {
        Self {
            verifier,
            instructions,
        }
    }
}

impl InputVerifier for Ed25519InputVerifier<'_> {
    fn verify(&self, caller: &Pubkey, inputs: &[ExternalCiphertext], proof: &[u8]) -> Result<()> {
        let current = load_current_index_checked(&self.instructions)?;
        require!(current > 0, CipherRaidError::InvalidInputProof);
        let signed = load_instruction_at_checked(usize::from(current - 1), &self.instructions)?;
        check_signed_digest(&signed, &self.verifier, &input_digest(caller, inputs), proof)
    }
}

/// Verifier for instructions that take no encrypted inputs; rejects every proof.
pub struct NoInputs;

impl InputVerifier for NoInputs {
    fn verify(&self, _caller: &Pubkey, _inputs: &[ExternalCiphertext], _proof: &[u8]) -> Result<()> {
        err!(CipherRaidError::InvalidInputProof)
    }
}

/// Validate an Ed25519 precompile instruction against the expected signer,
/// digest and signature. The precompile itself already verified the signature.
pub fn check_signed_digest(
    instruction: &Instruction,
    verifier: &Pubkey,
    digest: &[u8; 32],
    proof: &[u8],
) -> Result<()> {
    require_keys_eq!(
        instruction.program_id,
        ed25519_program::ID,
        CipherRaidError::InvalidInputProof
    );
    let signed = parse_ed25519(&instruction.data).ok_or(CipherRaidError::InvalidInputProof)?;
    require!(
        signed.public_key == verifier.as_ref(),
        CipherRaidError::InvalidInputProof
    );
    require!(
        signed.message == digest.as_slice(),
        CipherRaidError::InvalidInputProof
    );
    require!(signed.signature == proof, CipherRaidError::InvalidInputProof);
    Ok(())
}

struct SignedMessage<'a> {
    public_key: &'a [u8],
    signature: &'a [u8],
    message: &'a [u8],
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Exactly one signature, with every offset pointing into the precompile
/// instruction itself.
fn parse_ed25519(data: &[u8]) -> Option<SignedMessage<'_>> {
    if data.first() != Some(&1) {
        return None;
    }
    let at = SIGNATURE_OFFSETS_START;
    let signature_offset = usize::from(read_u16(data, at)?);
    let signature_instruction = read_u16(data, at + 2)?;
    let public_key_offset = usize::from(read_u16(data, at + 4)?);
    let public_key_instruction = read_u16(data, at + 6)?;
    let message_offset = usize::from(read_u16(data, at + 8)?);
    let message_size = usize::from(read_u16(data, at + 10)?);
    let message_instruction = read_u16(data, at + 12)?;

    if [signature_instruction, public_key_instruction, message_instruction]
        .iter()
        .any(|index| *index != CURRENT_INSTRUCTION)
    {
        return None;
    }

    Some(SignedMessage {
        signature: data.get(signature_offset..signature_offset + SIGNATURE_LEN)?,
        public_key: data.get(public_key_offset..public_key_offset + PUBKEY_LEN)?,
        message: data.get(message_offset..message_offset + message_size)?,
    })
}

/// Keyed stand-in for the input verifier: only the holder of `secret` can attest.
#[cfg(test)]
pub struct KeyedInputVerifier {
    secret: [u8; 32],
}

#[cfg(test)]
impl KeyedInputVerifier {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    pub fn attest(&self, caller: &Pubkey, inputs: &[ExternalCiphertext]) -> Vec<u8> {
        blake3::keyed_hash(&self.secret, &input_digest(caller, inputs))
            .as_bytes()
            .to_vec()
    }
}

#[cfg(test)]
impl InputVerifier for KeyedInputVerifier {
    fn verify(&self, caller: &Pubkey, inputs: &[ExternalCiphertext], proof: &[u8]) -> Result<()> {
        require!(
            proof == self.attest(caller, inputs).as_slice(),
            CipherRaidError::InvalidInputProof
        );
        Ok(())
    }
}

/// Ed25519 precompile instruction carrying one self-contained signature.
#[cfg(test)]
pub fn ed25519_instruction(
    verifier: &Pubkey,
    signature: &[u8; SIGNATURE_LEN],
    message: &[u8],
) -> Instruction {
    let header = SIGNATURE_OFFSETS_START + 14;
    let public_key_offset = header;
    let signature_offset = public_key_offset + PUBKEY_LEN;
    let message_offset = signature_offset + SIGNATURE_LEN;

    let mut data = vec![1u8, 0];
    for field in [
        signature_offset as u16,
        CURRENT_INSTRUCTION,
        public_key_offset as u16,
        CURRENT_INSTRUCTION,
        message_offset as u16,
        message.len() as u16,
        CURRENT_INSTRUCTION,
    ] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    data.extend_from_slice(verifier.as_ref());
    data.extend_from_slice(signature);
    data.extend_from_slice(message);

    Instruction {
        program_id: ed25519_program::ID,
        accounts: Vec::new(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{code, error_code_of};

    fn rejected(result: Result<()>) -> bool {
        matches!(
            result.map_err(|err| error_code_of(&err)),
            Err(Some(c)) if c == code(CipherRaidError::InvalidInputProof)
        )
    }

    #[test]
    fn digest_binds_caller_and_inputs() {
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();
        let inputs = [[7u8; 32], [9u8; 32]];
        let digest = input_digest(&alice, &inputs);

        assert_ne!(digest, input_digest(&bob, &inputs));
        assert_ne!(digest, input_digest(&alice, &[[9u8; 32], [7u8; 32]]));
        assert_ne!(digest, input_digest(&alice, &inputs[..1]));
    }

    #[test]
    fn signed_digest_from_the_verifier_is_accepted() {
        let verifier = Pubkey::new_unique();
        let digest = input_digest(&Pubkey::new_unique(), &[[1u8; 32]]);
        let signature = [42u8; SIGNATURE_LEN];
        let instruction = ed25519_instruction(&verifier, &signature, &digest);

        assert!(check_signed_digest(&instruction, &verifier, &digest, &signature).is_ok());
    }

    #[test]
    fn signer_digest_and_signature_must_all_match() {
        let verifier = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let mallory = Pubkey::new_unique();
        let inputs = [[1u8; 32]];
        let digest = input_digest(&alice, &inputs);
        let signature = [42u8; SIGNATURE_LEN];
        let instruction = ed25519_instruction(&verifier, &signature, &digest);

        let impostor = Pubkey::new_unique();
        assert!(rejected(check_signed_digest(
            &instruction,
            &impostor,
            &digest,
            &signature
        )));
        assert!(rejected(check_signed_digest(
            &instruction,
            &verifier,
            &input_digest(&mallory, &inputs),
            &signature
        )));
        assert!(rejected(check_signed_digest(
            &instruction,
            &verifier,
            &digest,
            &[7u8; SIGNATURE_LEN]
        )));
        assert!(rejected(check_signed_digest(&instruction, &verifier, &digest, &[])));
    }

    #[test]
    fn only_self_contained_precompile_calls_count() {
        let verifier = Pubkey::new_unique();
        let digest = input_digest(&Pubkey::new_unique(), &[[1u8; 32]]);
        let signature = [42u8; SIGNATURE_LEN];

        let mut foreign = ed25519_instruction(&verifier, &signature, &digest);
        foreign.program_id = Pubkey::new_unique();
        assert!(rejected(check_signed_digest(&foreign, &verifier, &digest, &signature)));

        let mut elsewhere = ed25519_instruction(&verifier, &signature, &digest);
        elsewhere.data[SIGNATURE_OFFSETS_START + 2..SIGNATURE_OFFSETS_START + 4]
            .copy_from_slice(&0u16.to_le_bytes());
        assert!(rejected(check_signed_digest(&elsewhere, &verifier, &digest, &signature)));

        let mut truncated = ed25519_instruction(&verifier, &signature, &digest);
        truncated.data.truncate(40);
        assert!(rejected(check_signed_digest(&truncated, &verifier, &digest, &signature)));
    }

    #[test]
    fn input_free_instructions_accept_no_proof() {
        let caller = Pubkey::new_unique();
        let inputs = [[3u8; 32]];
        let keyed = KeyedInputVerifier::new([5u8; 32]);
        assert!(rejected(NoInputs.verify(&caller, &inputs, &keyed.attest(&caller, &inputs))));
        assert!(rejected(NoInputs.verify(&caller, &[], &[])));
    }

    #[test]
    fn keyed_verifier_cannot_be_satisfied_by_the_public_digest() {
        let verifier = KeyedInputVerifier::new([5u8; 32]);
        let alice = Pubkey::new_unique();
        let mallory = Pubkey::new_unique();
        let inputs = [[3u8; 32]];

        let proof = verifier.attest(&alice, &inputs);
        assert!(verifier.verify(&alice, &inputs, &proof).is_ok());
        assert!(rejected(verifier.verify(&mallory, &inputs, &proof)));
        assert!(rejected(verifier.verify(
            &mallory,
            &inputs,
            &input_digest(&mallory, &inputs)
        )));
    }
}
