use anchor_lang::prelude::*;

use crate::acl::GrantSet;
use crate::fhe::{Euint16, Handle};

/// Encrypted boss template. Replaced as a whole by each configuration.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BossStats {
    pub max_hp: Euint16,
    pub defense: Euint16,
    pub attack: Euint16,
}

impl BossStats {
    pub const SIZE: usize = 3 * Handle::SIZE;

    pub fn handles(&self) -> [Handle; 3] {
        [self.max_hp.0, self.defense.0, self.attack.0]
    }
}

/// Raid-wide configuration: ownership, the boss template and the mutation lock.
/// Seeds: [b"raid_config"]
#[account]
#[derive(Debug, Default)]
pub struct RaidConfig {
    /// Identity allowed to configure the boss and transfer ownership
    pub owner: Pubkey,
    /// Ed25519 key whose signatures attest encrypted inputs
    pub input_verifier: Pubkey,
    /// Boss template; `None` until the first configuration
    pub boss: Option<BossStats>,
    /// Stored grants on the template handles
    pub template_grants: GrantSet,
    /// Held while a state-mutating instruction runs
    pub locked: bool,
    /// Incremented on every configuration
    pub template_version: u64,
    /// Running counter for symbolic ciphertext handles
    pub op_nonce: u64,
    /// PDA bump seed
    pub bump: u8,
}

impl RaidConfig {
    pub const SIZE: usize = 8 + // discriminator
        32 + // owner
        32 + // input_verifier
        1 + BossStats::SIZE + // boss (Option tag + stats)
        GrantSet::space(Self::MAX_TEMPLATE_GRANTS) + // template_grants
        1 +  // locked
        8 +  // template_version
        8 +  // op_nonce
        1;   // bump
    // Total: 383 bytes

    pub const SEED_PREFIX: &'static [u8] = b"raid_config";

    /// The engine holds one grant per template handle.
    pub const MAX_TEMPLATE_GRANTS: usize = 3;

    pub fn new(owner: Pubkey, input_verifier: Pubkey, bump: u8) -> Self {
        Self {
            owner,
            input_verifier,
            bump,
            ..Self::default()
        }
    }

    /// Whether a boss template exists.
    pub fn boss_exists(&self) -> bool {
        self.boss.is_some()
    }
}
