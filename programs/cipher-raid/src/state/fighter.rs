use anchor_lang::prelude::*;

use crate::acl::GrantSet;
use crate::fhe::{Ebool, Euint16, Handle};

/// Per-participant encrypted combat state.
/// Seeds: [b"fighter", authority.key()]
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Fighter {
    /// Participant this state belongs to
    pub authority: Pubkey,
    /// Participant vitality
    pub hp: Euint16,
    /// This participant's private copy of the boss vitality
    pub boss_hp: Euint16,
    /// Outcome of the most recent attack
    pub last_hit_success: Ebool,
    /// Set on first join, never cleared
    pub joined: bool,
    /// Whether an attack has resolved in the current run
    pub has_last_result: bool,
    /// Template version the current run started against
    pub template_version: u64,
    /// Number of joins (runs started)
    pub runs: u64,
    /// Attacks resolved in the current run
    pub attacks: u32,
    /// Stored grants on the handles this run holds
    pub grants: GrantSet,
    /// PDA bump seed
    pub bump: u8,
}

impl Fighter {
    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        Handle::SIZE + // hp
        Handle::SIZE + // boss_hp
        Handle::SIZE + // last_hit_success
        1 +  // joined
        1 +  // has_last_result
        8 +  // template_version
        8 +  // runs
        4 +  // attacks
        GrantSet::space(Self::MAX_GRANTS) + // grants
        1;   // bump
    // Total: 675 bytes

    pub const SEED_PREFIX: &'static [u8] = b"fighter";

    /// Engine and authority on hp, boss_hp, last_hit_success and the template max_hp.
    pub const MAX_GRANTS: usize = 8;

    /// Handles whose grants this account stores.
    pub fn live_handles(&self, template_max_hp: Euint16) -> [Handle; 4] {
        [
            self.hp.0,
            self.boss_hp.0,
            self.last_hit_success.0,
            template_max_hp.0,
        ]
    }

    /// Whether the current run started against an older boss template.
    pub fn is_stale(&self, template_version: u64) -> bool {
        self.joined && self.template_version != template_version
    }
}

/// Lifecycle view of a participant slot. A missing account and an
/// account that never joined are the same thing.
#[derive(Clone, Copy, Debug)]
pub enum Participation<'a> {
    Unjoined,
    Active(&'a Fighter),
}

impl<'a> Participation<'a> {
    pub fn of(fighter: Option<&'a Fighter>) -> Self {
        match fighter {
            Some(fighter) if fighter.joined => Participation::Active(fighter),
            _ => Participation::Unjoined,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Participation::Active(_))
    }
}
