use std::collections::BTreeSet;

use anchor_lang::prelude::*;

use crate::errors::CipherRaidError;
use crate::fhe::Handle;

/// Permission for `identity` to request the plaintext behind `handle`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AclGrant {
    pub handle: Handle,
    pub identity: Pubkey,
}

impl AclGrant {
    pub const SIZE: usize = Handle::SIZE + 32;
}

/// Every `(handle, identity)` pair, in order.
pub fn grants_for(handles: &[Handle], identities: &[Pubkey]) -> Vec<AclGrant> {
    handles
        .iter()
        .flat_map(|handle| {
            identities.iter().map(move |identity| AclGrant {
                handle: *handle,
                identity: *identity,
            })
        })
        .collect()
}

/// Decrypt permissions over ciphertext handles. Grants are additive; nothing revokes them.
pub trait AccessControl {
    fn allow(&mut self, handle: Handle, identity: Pubkey);

    fn is_allowed(&self, handle: &Handle, identity: &Pubkey) -> bool;

    fn allow_each(&mut self, handles: &[Handle], identities: &[Pubkey]) {
        for handle in handles {
            for identity in identities {
                self.allow(*handle, *identity);
            }
        }
    }
}

/// Ordered, append-only grant set collected during one call.
///
/// On-chain each instruction fills a fresh ledger and publishes it as an
/// `AccessGranted` notification; the stored grants live in [`GrantSet`]s.
#[derive(Clone, Debug, Default)]
pub struct AclLedger {
    grants: BTreeSet<AclGrant>,
}

impl AclLedger {
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn grants(&self) -> impl Iterator<Item = &AclGrant> {
        self.grants.iter()
    }

    pub fn into_grants(self) -> Vec<AclGrant> {
        self.grants.into_iter().collect()
    }
}

impl AccessControl for AclLedger {
    fn allow(&mut self, handle: Handle, identity: Pubkey) {
        self.grants.insert(AclGrant { handle, identity });
    }

    fn is_allowed(&self, handle: &Handle, identity: &Pubkey) -> bool {
        self.grants.contains(&AclGrant {
            handle: *handle,
            identity: *identity,
        })
    }
}

/// Grants stored on an account, covering the handles that account holds.
///
/// Grants on handles the account still holds are never dropped. Handles the
/// account no longer holds leave the set on the next update; their grants
/// remain in the `AccessGranted` history.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct GrantSet {
    grants: Vec<AclGrant>,
}

impl GrantSet {
    /// Serialized size of a set holding at most `capacity` grants.
    pub const fn space(capacity: usize) -> usize {
        4 + capacity * AclGrant::SIZE
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AclGrant> {
        self.grants.iter()
    }

    /// The set after an update: existing and `added` grants on `live` handles,
    /// ordered and deduplicated. Leaves `self` untouched.
    pub fn updated(&self, live: &[Handle], added: &[AclGrant], capacity: usize) -> Result<GrantSet> {
        let grants: BTreeSet<AclGrant> = self
            .grants
            .iter()
            .chain(added)
            .filter(|grant| !grant.handle.is_zero() && live.contains(&grant.handle))
            .copied()
            .collect();
        require!(
            grants.len() <= capacity,
            CipherRaidError::GrantCapacityExceeded
        );
        Ok(GrantSet {
            grants: grants.into_iter().collect(),
        })
    }
}

impl AccessControl for GrantSet {
    fn allow(&mut self, handle: Handle, identity: Pubkey) {
        let grant = AclGrant { handle, identity };
        if let Err(at) = self.grants.binary_search(&grant) {
            self.grants.insert(at, grant);
        }
    }

    fn is_allowed(&self, handle: &Handle, identity: &Pubkey) -> bool {
        self.grants
            .binary_search(&AclGrant {
                handle: *handle,
                identity: *identity,
            })
            .is_ok()
    }
}
