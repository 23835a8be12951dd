use anchor_lang::prelude::*;

use crate::acl::{grants_for, AccessControl, AclGrant, GrantSet};
use crate::combat;
use crate::errors::CipherRaidError;
use crate::fhe::{Coprocessor, Ebool, Euint16, ExternalCiphertext, Handle};
use crate::guard::{only_owner, ReentrancyLock};
use crate::state::{BossStats, Fighter, Participation, RaidConfig};
use crate::{
    AttackResolved, BossConfigured, FightJoined, InputVerifierUpdated, OwnershipTransferred,
};

/// Encrypted boss template as submitted by the owner.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BossInputs {
    pub max_hp: ExternalCiphertext,
    pub defense: ExternalCiphertext,
    pub attack: ExternalCiphertext,
}

/// Encrypted attack parameters as submitted by a fighter.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrikeInputs {
    pub attack_power: ExternalCiphertext,
    pub spell_id: ExternalCiphertext,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BossMeta {
    pub exists: bool,
    pub template_version: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BossHpHandles {
    /// Template max HP, the baseline of the caller's boss HP bar
    pub max_hp: Euint16,
    /// Caller's private boss HP; zero when the caller never joined
    pub boss_hp: Euint16,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombatStateView {
    pub hp: Euint16,
    pub last_hit_success: Ebool,
    pub joined: bool,
    pub has_last_result: bool,
    pub template_version: u64,
}

/// State-mutating raid operations, wired to a co-processor and an ACL.
///
/// `engine` is the identity that keeps standing permission on every stored
/// ciphertext; on-chain it is the program id. `acl` collects the grants made
/// by one call; the grants themselves are stored on the config and fighter
/// accounts.
pub struct Raid<'a, C: Coprocessor, A: AccessControl> {
    engine: Pubkey,
    fhe: &'a mut C,
    acl: &'a mut A,
}

impl<'a, C: Coprocessor, A: AccessControl> Raid<'a, C, A> {
    pub fn new(engine: Pubkey, fhe: &'a mut C, acl: &'a mut A) -> Self {
        Self { engine, fhe, acl }
    }

    pub fn configure_boss(
        &mut self,
        config: &mut RaidConfig,
        caller: &Pubkey,
        inputs: &BossInputs,
        proof: &[u8],
    ) -> Result<BossConfigured> {
        let _lock = ReentrancyLock::acquire(&mut config.locked)?;
        only_owner(&config.owner, caller)?;
        require!(!proof.is_empty(), CipherRaidError::MissingInputProof);

        let [max_hp, defense, attack] =
            self.fhe
                .decode(&[inputs.max_hp, inputs.defense, inputs.attack], proof, caller)?;
        let boss = BossStats {
            max_hp,
            defense,
            attack,
        };
        let template_version = config
            .template_version
            .checked_add(1)
            .ok_or(CipherRaidError::ArithmeticOverflow)?;
        let handles = boss.handles();
        let granted = grants_for(&handles, &[self.engine]);
        let template_grants = config.template_grants.updated(
            &handles,
            &granted,
            RaidConfig::MAX_TEMPLATE_GRANTS,
        )?;

        self.record(&granted);
        config.boss = Some(boss);
        config.template_grants = template_grants;
        config.template_version = template_version;

        msg!("Boss template configured (version {})", template_version);

        Ok(BossConfigured {
            owner: *caller,
            template_version,
            max_hp,
            defense,
            attack,
        })
    }

    pub fn transfer_ownership(
        &mut self,
        config: &mut RaidConfig,
        caller: &Pubkey,
        new_owner: Pubkey,
    ) -> Result<OwnershipTransferred> {
        let _lock = ReentrancyLock::acquire(&mut config.locked)?;
        only_owner(&config.owner, caller)?;
        require!(
            new_owner != Pubkey::default(),
            CipherRaidError::InvalidNewOwner
        );

        let previous_owner = config.owner;
        config.owner = new_owner;

        msg!("Ownership transferred: {} -> {}", previous_owner, new_owner);

        Ok(OwnershipTransferred {
            previous_owner,
            new_owner,
        })
    }

    pub fn set_input_verifier(
        &mut self,
        config: &mut RaidConfig,
        caller: &Pubkey,
        input_verifier: Pubkey,
    ) -> Result<InputVerifierUpdated> {
        let _lock = ReentrancyLock::acquire(&mut config.locked)?;
        only_owner(&config.owner, caller)?;
        require!(
            input_verifier != Pubkey::default(),
            CipherRaidError::InvalidInputVerifier
        );

        let previous = config.input_verifier;
        config.input_verifier = input_verifier;

        msg!("Input verifier rotated: {} -> {}", previous, input_verifier);

        Ok(InputVerifierUpdated {
            previous,
            input_verifier,
        })
    }

    /// Start a fresh run for `caller`, discarding any previous one.
    pub fn join_fight(
        &mut self,
        config: &mut RaidConfig,
        fighter: &mut Fighter,
        caller: &Pubkey,
        hp_input: &ExternalCiphertext,
        proof: &[u8],
    ) -> Result<FightJoined> {
        let _lock = ReentrancyLock::acquire(&mut config.locked)?;
        let boss = config.boss.ok_or(CipherRaidError::BossNotConfigured)?;
        if fighter.joined {
            require_keys_eq!(
                fighter.authority,
                *caller,
                CipherRaidError::FighterAuthorityMismatch
            );
        }
        require!(!proof.is_empty(), CipherRaidError::MissingInputProof);

        let [hp] = self.fhe.decode(&[*hp_input], proof, caller)?;
        let runs = fighter
            .runs
            .checked_add(1)
            .ok_or(CipherRaidError::ArithmeticOverflow)?;

        // boss_hp aliases the template max_hp handle until the first hit
        let granted = grants_for(&[hp.0, boss.max_hp.0], &[self.engine, *caller]);
        let mut next = Fighter {
            authority: *caller,
            hp,
            boss_hp: boss.max_hp,
            last_hit_success: Ebool::ZERO,
            joined: true,
            has_last_result: false,
            template_version: config.template_version,
            runs,
            attacks: 0,
            grants: GrantSet::default(),
            bump: fighter.bump,
        };
        next.grants =
            fighter
                .grants
                .updated(&next.live_handles(boss.max_hp), &granted, Fighter::MAX_GRANTS)?;

        self.record(&granted);
        *fighter = next;

        msg!("Fighter {} joined (run {})", caller, runs);

        Ok(FightJoined {
            player: *caller,
            hp,
            boss_hp: boss.max_hp,
            template_version: config.template_version,
            run: runs,
        })
    }

    pub fn attack_boss(
        &mut self,
        config: &mut RaidConfig,
        fighter: Option<&mut Fighter>,
        caller: &Pubkey,
        inputs: &StrikeInputs,
        proof: &[u8],
    ) -> Result<AttackResolved> {
        let _lock = ReentrancyLock::acquire(&mut config.locked)?;
        let boss = config.boss.ok_or(CipherRaidError::BossNotConfigured)?;
        let fighter = match fighter {
            Some(fighter) if fighter.joined => fighter,
            _ => return err!(CipherRaidError::NotInFight),
        };
        require_keys_eq!(
            fighter.authority,
            *caller,
            CipherRaidError::FighterAuthorityMismatch
        );
        require!(!proof.is_empty(), CipherRaidError::MissingInputProof);

        let [attack_power, spell_id] =
            self.fhe
                .decode(&[inputs.attack_power, inputs.spell_id], proof, caller)?;
        let strike = combat::resolve_strike(
            &mut *self.fhe,
            &boss,
            attack_power,
            spell_id,
            fighter.boss_hp,
            fighter.hp,
        )?;
        let attack_number = fighter
            .attacks
            .checked_add(1)
            .ok_or(CipherRaidError::ArithmeticOverflow)?;

        let granted = grants_for(
            &[
                attack_power.0,
                spell_id.0,
                strike.boss_hp.0,
                strike.hp.0,
                strike.hit_success.0,
                boss.max_hp.0,
            ],
            &[self.engine, *caller],
        );
        let mut next = Fighter {
            hp: strike.hp,
            boss_hp: strike.boss_hp,
            last_hit_success: strike.hit_success,
            has_last_result: true,
            attacks: attack_number,
            ..fighter.clone()
        };
        next.grants =
            fighter
                .grants
                .updated(&next.live_handles(boss.max_hp), &granted, Fighter::MAX_GRANTS)?;

        self.record(&granted);
        *fighter = next;

        msg!("Fighter {} resolved attack {}", caller, attack_number);

        Ok(AttackResolved {
            player: *caller,
            hp: strike.hp,
            boss_hp: strike.boss_hp,
            hit_success: strike.hit_success,
            attack_number,
            template_version: fighter.template_version,
        })
    }

    fn record(&mut self, granted: &[AclGrant]) {
        for grant in granted {
            self.acl.allow(grant.handle, grant.identity);
        }
    }
}

pub fn boss_meta(config: &RaidConfig) -> BossMeta {
    BossMeta {
        exists: config.boss_exists(),
        template_version: config.template_version,
    }
}

pub fn boss_hp_handles(config: &RaidConfig, fighter: Option<&Fighter>) -> BossHpHandles {
    let max_hp = config.boss.map(|boss| boss.max_hp).unwrap_or_default();
    let boss_hp = match Participation::of(fighter) {
        Participation::Active(fighter) => fighter.boss_hp,
        Participation::Unjoined => Euint16::ZERO,
    };
    BossHpHandles { max_hp, boss_hp }
}

pub fn combat_state(fighter: Option<&Fighter>) -> CombatStateView {
    match Participation::of(fighter) {
        Participation::Active(fighter) => CombatStateView {
            hp: fighter.hp,
            last_hit_success: fighter.last_hit_success,
            joined: true,
            has_last_result: fighter.has_last_result,
            template_version: fighter.template_version,
        },
        Participation::Unjoined => CombatStateView {
            hp: Euint16::ZERO,
            last_hit_success: Ebool::ZERO,
            joined: false,
            has_last_result: false,
            template_version: 0,
        },
    }
}

/// Whether the stored grants let `identity` decrypt `handle`.
pub fn has_access(
    config: &RaidConfig,
    fighter: Option<&Fighter>,
    handle: &Handle,
    identity: &Pubkey,
) -> bool {
    config.template_grants.is_allowed(handle, identity)
        || fighter.is_some_and(|fighter| fighter.grants.is_allowed(handle, identity))
}
