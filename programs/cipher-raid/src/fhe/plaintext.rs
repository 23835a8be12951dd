use std::collections::HashMap;

use anchor_lang::prelude::*;

use super::attestation::KeyedInputVerifier;
use super::{Coprocessor, Ebool, Euint16, ExternalCiphertext, Handle, InputVerifier, ValueKind};
use crate::acl::AccessControl;
use crate::errors::CipherRaidError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Plain {
    Uint(u16),
    Bool(bool),
}

/// Plaintext stand-in for the confidential backend.
///
/// Also plays the client together with the input verifier (`encrypt_inputs`)
/// and the ACL-gated decryption oracle (`decrypt_u16`, `decrypt_bool`).
pub struct PlaintextCoprocessor {
    values: HashMap<Handle, Plain>,
    inputs: HashMap<ExternalCiphertext, u16>,
    gateway: KeyedInputVerifier,
    counter: u64,
}

impl PlaintextCoprocessor {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            inputs: HashMap::new(),
            gateway: KeyedInputVerifier::new([0x5Au8; 32]),
            counter: 0,
        }
    }

    fn store(&mut self, value: Plain) -> Handle {
        self.counter += 1;
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&self.counter.to_le_bytes());
        bytes[31] = match value {
            Plain::Uint(_) => ValueKind::Uint16 as u8,
            Plain::Bool(_) => ValueKind::Bool as u8,
        };
        let handle = Handle(bytes);
        self.values.insert(handle, value);
        handle
    }

    fn uint(&self, value: Euint16) -> Result<u16> {
        match self.values.get(&value.0) {
            Some(Plain::Uint(v)) => Ok(*v),
            _ => err!(CipherRaidError::UnknownCiphertext),
        }
    }

    fn boolean(&self, value: Ebool) -> Result<bool> {
        match self.values.get(&value.0) {
            Some(Plain::Bool(v)) => Ok(*v),
            _ => err!(CipherRaidError::UnknownCiphertext),
        }
    }

    /// Client side: encrypt `values` for `caller`, returning the ciphertexts and
    /// the verifier attestation the engine must be given alongside them. The
    /// verifier only attests ciphertexts to the identity that encrypted them.
    pub fn encrypt_inputs<const N: usize>(
        &mut self,
        caller: &Pubkey,
        values: [u16; N],
    ) -> ([ExternalCiphertext; N], Vec<u8>) {
        let mut inputs = [[0u8; 32]; N];
        for (slot, value) in inputs.iter_mut().zip(values) {
            self.counter += 1;
            let mut ciphertext = [0xA5u8; 32];
            ciphertext[..8].copy_from_slice(&self.counter.to_le_bytes());
            self.inputs.insert(ciphertext, value);
            *slot = ciphertext;
        }
        let proof = self.gateway.attest(caller, &inputs);
        (inputs, proof)
    }

    /// Decryption oracle: plaintext only for identities the ACL allows.
    pub fn decrypt_u16<A: AccessControl>(
        &self,
        value: Euint16,
        requester: &Pubkey,
        acl: &A,
    ) -> Option<u16> {
        if !acl.is_allowed(&value.0, requester) {
            return None;
        }
        self.uint(value).ok()
    }

    pub fn decrypt_bool<A: AccessControl>(
        &self,
        value: Ebool,
        requester: &Pubkey,
        acl: &A,
    ) -> Option<bool> {
        if !acl.is_allowed(&value.0, requester) {
            return None;
        }
        self.boolean(value).ok()
    }
}

impl Coprocessor for PlaintextCoprocessor {
    fn decode<const N: usize>(
        &mut self,
        inputs: &[ExternalCiphertext; N],
        proof: &[u8],
        caller: &Pubkey,
    ) -> Result<[Euint16; N]> {
        self.gateway.verify(caller, inputs, proof)?;

        let mut decoded = [Euint16::ZERO; N];
        for (slot, input) in decoded.iter_mut().zip(inputs.iter()) {
            let value = *self
                .inputs
                .get(input)
                .ok_or(CipherRaidError::InvalidInputProof)?;
            *slot = Euint16(self.store(Plain::Uint(value)));
        }
        Ok(decoded)
    }

    fn lift(&mut self, value: u16) -> Result<Euint16> {
        Ok(Euint16(self.store(Plain::Uint(value))))
    }

    fn add(&mut self, a: Euint16, b: Euint16) -> Result<Euint16> {
        let sum = self.uint(a)?.wrapping_add(self.uint(b)?);
        Ok(Euint16(self.store(Plain::Uint(sum))))
    }

    fn sub(&mut self, a: Euint16, b: Euint16) -> Result<Euint16> {
        let difference = self.uint(a)?.wrapping_sub(self.uint(b)?);
        Ok(Euint16(self.store(Plain::Uint(difference))))
    }

    fn div_scalar(&mut self, a: Euint16, divisor: u16) -> Result<Euint16> {
        require!(divisor != 0, CipherRaidError::InvalidCiphertextOperand);
        let quotient = self.uint(a)? / divisor;
        Ok(Euint16(self.store(Plain::Uint(quotient))))
    }

    fn gt(&mut self, a: Euint16, b: Euint16) -> Result<Ebool> {
        let greater = self.uint(a)? > self.uint(b)?;
        Ok(Ebool(self.store(Plain::Bool(greater))))
    }

    fn equal(&mut self, a: Euint16, b: Euint16) -> Result<Ebool> {
        let same = self.uint(a)? == self.uint(b)?;
        Ok(Ebool(self.store(Plain::Bool(same))))
    }

    fn select(&mut self, cond: Ebool, if_true: Euint16, if_false: Euint16) -> Result<Euint16> {
        let chosen = if self.boolean(cond)? {
            self.uint(if_true)?
        } else {
            self.uint(if_false)?
        };
        Ok(Euint16(self.store(Plain::Uint(chosen))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::AclLedger;

    #[test]
    fn arithmetic_wraps_like_u16() {
        let mut fhe = PlaintextCoprocessor::new();
        let mut acl = AclLedger::default();
        let reader = Pubkey::new_unique();

        let max = fhe.lift(u16::MAX).unwrap();
        let one = fhe.lift(1).unwrap();
        let wrapped = fhe.add(max, one).unwrap();
        let under = fhe.sub(one, max).unwrap();
        acl.allow_each(&[wrapped.0, under.0], &[reader]);

        assert_eq!(fhe.decrypt_u16(wrapped, &reader, &acl), Some(0));
        assert_eq!(fhe.decrypt_u16(under, &reader, &acl), Some(2));
    }

    #[test]
    fn decryption_requires_a_grant() {
        let mut fhe = PlaintextCoprocessor::new();
        let mut acl = AclLedger::default();
        let owner = Pubkey::new_unique();
        let stranger = Pubkey::new_unique();

        let secret = fhe.lift(1234).unwrap();
        assert_eq!(fhe.decrypt_u16(secret, &owner, &acl), None);

        acl.allow(secret.0, owner);
        assert_eq!(fhe.decrypt_u16(secret, &owner, &acl), Some(1234));
        assert_eq!(fhe.decrypt_u16(secret, &stranger, &acl), None);
    }

    #[test]
    fn decode_requires_inputs_issued_for_the_caller() {
        let mut fhe = PlaintextCoprocessor::new();
        let alice = Pubkey::new_unique();
        let mallory = Pubkey::new_unique();
        let (inputs, proof) = fhe.encrypt_inputs(&alice, [800, 1]);

        assert!(fhe.decode(&inputs, &proof, &mallory).is_err());
        assert!(fhe.decode(&inputs, &[], &alice).is_err());

        let recomputed = crate::fhe::input_digest(&mallory, &inputs);
        assert!(fhe.decode(&inputs, &recomputed, &mallory).is_err());

        let [power, spell] = fhe.decode(&inputs, &proof, &alice).unwrap();
        let mut acl = AclLedger::default();
        acl.allow_each(&[power.0, spell.0], &[alice]);
        assert_eq!(fhe.decrypt_u16(power, &alice, &acl), Some(800));
        assert_eq!(fhe.decrypt_u16(spell, &alice, &acl), Some(1));
    }

    #[test]
    fn booleans_and_integers_do_not_mix() {
        let mut fhe = PlaintextCoprocessor::new();
        let a = fhe.lift(3).unwrap();
        let b = fhe.lift(2).unwrap();
        let flag = fhe.gt(a, b).unwrap();

        assert!(fhe.add(Euint16(flag.0), a).is_err());
        assert!(fhe.select(Ebool(a.0), a, b).is_err());
    }
}
