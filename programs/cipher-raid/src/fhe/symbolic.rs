use anchor_lang::prelude::*;

use super::{Coprocessor, Ebool, Euint16, ExternalCiphertext, Handle, InputVerifier, ValueKind};
use crate::errors::CipherRaidError;

/// Domain tag for derived ciphertext handles.
pub const HANDLE_DOMAIN: &[u8] = b"cipher-raid/handle/v1";

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Decode,
    Lift,
    Add,
    Sub,
    DivScalar,
    Gt,
    Eq,
    Select,
}

/// One node of the operation graph the co-processor evaluates off-chain.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct OpRecord {
    pub opcode: Opcode,
    pub operands: Vec<Handle>,
    /// Plaintext scalar (lifted constant, divisor, or decode index).
    pub scalar: u64,
    /// Input proof forwarded with `Decode`; empty for every other opcode.
    pub proof: Vec<u8>,
    pub result: Handle,
}

/// On-chain co-processor front end.
///
/// Result handles are derived symbolically, so the program never holds ciphertext
/// material; the recorded trace is published for the confidential backend, which
/// computes the values behind each handle.
pub struct SymbolicCoprocessor<V: InputVerifier> {
    domain: Pubkey,
    nonce: u64,
    verifier: V,
    ops: Vec<OpRecord>,
}

impl<V: InputVerifier> SymbolicCoprocessor<V> {
    /// `domain` scopes handles to one raid; `nonce` resumes the persisted counter.
    pub fn new(domain: Pubkey, nonce: u64, verifier: V) -> Self {
        Self {
            domain,
            nonce,
            verifier,
            ops: Vec::new(),
        }
    }

    /// Counter value to persist once the instruction succeeds.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn ops(&self) -> &[OpRecord] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<OpRecord> {
        self.ops
    }

    fn record(
        &mut self,
        opcode: Opcode,
        operands: Vec<Handle>,
        scalar: u64,
        proof: Vec<u8>,
        kind: ValueKind,
    ) -> Result<Handle> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN);
        hasher.update(self.domain.as_ref());
        hasher.update(&self.nonce.to_le_bytes());
        hasher.update(&[opcode as u8]);
        for operand in &operands {
            hasher.update(&operand.0);
        }
        hasher.update(&scalar.to_le_bytes());

        let mut bytes = *hasher.finalize().as_bytes();
        bytes[31] = kind as u8;
        let result = Handle(bytes);

        self.nonce = self
            .nonce
            .checked_add(1)
            .ok_or(CipherRaidError::ArithmeticOverflow)?;
        self.ops.push(OpRecord {
            opcode,
            operands,
            scalar,
            proof,
            result,
        });
        Ok(result)
    }

    fn uint(&mut self, opcode: Opcode, operands: Vec<Handle>, scalar: u64) -> Result<Euint16> {
        self.record(opcode, operands, scalar, Vec::new(), ValueKind::Uint16)
            .map(Euint16)
    }

    fn boolean(&mut self, opcode: Opcode, operands: Vec<Handle>) -> Result<Ebool> {
        self.record(opcode, operands, 0, Vec::new(), ValueKind::Bool)
            .map(Ebool)
    }
}

fn defined(handle: Handle) -> Result<Handle> {
    require!(!handle.is_zero(), CipherRaidError::UnknownCiphertext);
    Ok(handle)
}

impl<V: InputVerifier> Coprocessor for SymbolicCoprocessor<V> {
    fn decode<const N: usize>(
        &mut self,
        inputs: &[ExternalCiphertext; N],
        proof: &[u8],
        caller: &Pubkey,
    ) -> Result<[Euint16; N]> {
        self.verifier.verify(caller, inputs, proof)?;

        let mut decoded = [Euint16::ZERO; N];
        for (index, (slot, input)) in decoded.iter_mut().zip(inputs.iter()).enumerate() {
            *slot = self
                .record(
                    Opcode::Decode,
                    vec![Handle(*input)],
                    index as u64,
                    proof.to_vec(),
                    ValueKind::Uint16,
                )
                .map(Euint16)?;
        }
        Ok(decoded)
    }

    fn lift(&mut self, value: u16) -> Result<Euint16> {
        self.uint(Opcode::Lift, Vec::new(), value as u64)
    }

    fn add(&mut self, a: Euint16, b: Euint16) -> Result<Euint16> {
        let operands = vec![defined(a.0)?, defined(b.0)?];
        self.uint(Opcode::Add, operands, 0)
    }

    fn sub(&mut self, a: Euint16, b: Euint16) -> Result<Euint16> {
        let operands = vec![defined(a.0)?, defined(b.0)?];
        self.uint(Opcode::Sub, operands, 0)
    }

    fn div_scalar(&mut self, a: Euint16, divisor: u16) -> Result<Euint16> {
        require!(divisor != 0, CipherRaidError::InvalidCiphertextOperand);
        let operands = vec![defined(a.0)?];
        self.uint(Opcode::DivScalar, operands, divisor as u64)
    }

    fn gt(&mut self, a: Euint16, b: Euint16) -> Result<Ebool> {
        let operands = vec![defined(a.0)?, defined(b.0)?];
        self.boolean(Opcode::Gt, operands)
    }

    fn equal(&mut self, a: Euint16, b: Euint16) -> Result<Ebool> {
        let operands = vec![defined(a.0)?, defined(b.0)?];
        self.boolean(Opcode::Eq, operands)
    }

    fn select(&mut self, cond: Ebool, if_true: Euint16, if_false: Euint16) -> Result<Euint16> {
        let operands = vec![defined(cond.0)?, defined(if_true.0)?, defined(if_false.0)?];
        self.uint(Opcode::Select, operands, 0)
    }
}
