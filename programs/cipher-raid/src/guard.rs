use anchor_lang::prelude::*;

use crate::errors::CipherRaidError;
use crate::state::RaidConfig;

/// Privileged operations are restricted to the stored owner.
pub fn only_owner(owner: &Pubkey, caller: &Pubkey) -> Result<()> {
    require_keys_eq!(*caller, *owner, CipherRaidError::NotOwner);
    Ok(())
}

/// Scoped lock over a state-mutating entry point.
///
/// Acquiring a held lock fails; dropping the guard releases it on every exit path.
pub struct ReentrancyLock<'a> {
    flag: &'a mut bool,
}

impl<'a> ReentrancyLock<'a> {
    pub fn acquire(flag: &'a mut bool) -> Result<Self> {
        require!(!*flag, CipherRaidError::ReentrantCall);
        *flag = true;
        Ok(Self { flag })
    }
}

impl Drop for ReentrancyLock<'_> {
    fn drop(&mut self) {
        *self.flag = false;
    }
}

/// Store `config` with the lock held into the raid account data, so that a
/// nested invocation deserializes a locked config. The in-memory copy is
/// left unlocked for the engine's own [`ReentrancyLock`].
pub fn persist_lock(config: &RaidConfig, data: &mut [u8]) -> Result<()> {
    require!(!config.locked, CipherRaidError::ReentrantCall);
    let mut held = config.clone();
    held.locked = true;
    write_config(&held, data)
}

/// Store `config` unlocked into the raid account data.
pub fn release_lock(config: &RaidConfig, data: &mut [u8]) -> Result<()> {
    let mut released = config.clone();
    released.locked = false;
    write_config(&released, data)
}

fn write_config(config: &RaidConfig, data: &mut [u8]) -> Result<()> {
    let mut writer: &mut [u8] = data;
    config.try_serialize(&mut writer)
}
