use std::cell::{RefCell, RefMut};

use anchor_lang::prelude::*;

use crate::acl::{AclGrant, AclLedger};
use crate::fhe::{InputVerifier, OpRecord, SymbolicCoprocessor};
use crate::guard::{persist_lock, release_lock};
use crate::raid::Raid;
use crate::state::RaidConfig;
use crate::{AccessGranted, CiphertextOps};

/// What one instruction hands to the co-processor and the grant indexer.
#[derive(Debug, Default)]
pub struct SideEffects {
    pub caller: Pubkey,
    pub ops: Vec<OpRecord>,
    pub grants: Vec<AclGrant>,
}

impl SideEffects {
    /// Emit the operation trace and the grants, skipping empty ones.
    pub fn publish(self) {
        let SideEffects {
            caller,
            ops,
            grants,
        } = self;
        if !ops.is_empty() {
            emit!(CiphertextOps { caller, ops });
        }
        if !grants.is_empty() {
            emit!(AccessGranted { grants });
        }
    }
}

/// Run a state-mutating instruction body against the raid account.
///
/// The lock is stored in `data` for the duration of `body`, so a nested
/// invocation that loads the raid account sees it held. The handle counter
/// resumes from `config.op_nonce` and is written back on success.
pub fn run<V, T>(
    raid: Pubkey,
    config: &mut RaidConfig,
    data: &RefCell<&mut [u8]>,
    caller: Pubkey,
    verifier: V,
    body: impl FnOnce(&mut Raid<'_, SymbolicCoprocessor<V>, AclLedger>, &mut RaidConfig) -> Result<T>,
) -> Result<(T, SideEffects)>
where
    V: InputVerifier,
{
    persist_lock(config, &mut borrow(data)?)?;

    let mut fhe = SymbolicCoprocessor::new(raid, config.op_nonce, verifier);
    let mut acl = AclLedger::default();
    let outcome = body(&mut Raid::new(crate::ID, &mut fhe, &mut acl), &mut *config);

    let output = match outcome {
        Ok(output) => output,
        Err(err) => {
            release_lock(config, &mut borrow(data)?)?;
            return Err(err);
        }
    };

    config.op_nonce = fhe.nonce();
    release_lock(config, &mut borrow(data)?)?;

    Ok((
        output,
        SideEffects {
            caller,
            ops: fhe.into_ops(),
            grants: acl.into_grants(),
        },
    ))
}

fn borrow<'a, 'd>(data: &'a RefCell<&'d mut [u8]>) -> Result<RefMut<'a, &'d mut [u8]>> {
    data.try_borrow_mut()
        .map_err(|_| ProgramError::AccountBorrowFailed.into())
}
