use anchor_lang::prelude::*;

pub mod acl;
pub mod combat;
pub mod errors;
pub mod fhe;
pub mod guard;
pub mod outcome;
pub mod raid;
pub mod session;
pub mod state;

use acl::AclGrant;
use errors::CipherRaidError;
use fhe::{Ebool, Ed25519InputVerifier, Euint16, ExternalCiphertext, Handle, NoInputs, OpRecord};
use raid::{BossHpHandles, BossInputs, BossMeta, CombatStateView, StrikeInputs};
use state::{Fighter, RaidConfig};

declare_id!("FPpnxuVo7aEUe2M5GyQQzCV5rbYo5nNiWGSCPAYQwLJt");

#[program]
pub mod cipher_raid {
    use super::*;

    // ============================================================
    // Raid Administration
    // ============================================================

    pub fn initialize_raid(ctx: Context<InitializeRaid>, input_verifier: Pubkey) -> Result<()> {
        require!(
            input_verifier != Pubkey::default(),
            CipherRaidError::InvalidInputVerifier
        );
        let raid_config = &mut ctx.accounts.raid_config;
        let owner = ctx.accounts.owner.key();

        raid_config.set_inner(RaidConfig::new(
            owner,
            input_verifier,
            ctx.bumps.raid_config,
        ));

        msg!("Raid initialized, owner {}", owner);

        emit!(RaidInitialized {
            raid_config: raid_config.key(),
            owner,
            input_verifier,
        });

        Ok(())
    }

    pub fn configure_boss(
        ctx: Context<ConfigureBoss>,
        max_hp: ExternalCiphertext,
        defense: ExternalCiphertext,
        attack: ExternalCiphertext,
        proof: Vec<u8>,
    ) -> Result<()> {
        let caller = ctx.accounts.owner.key();
        let accounts = &mut *ctx.accounts;
        let raid_info = accounts.raid_config.to_account_info();
        let verifier = Ed25519InputVerifier::new(
            accounts.raid_config.input_verifier,
            accounts.instructions_sysvar.to_account_info(),
        );
        let inputs = BossInputs {
            max_hp,
            defense,
            attack,
        };

        let (event, effects) = session::run(
            raid_info.key(),
            &mut accounts.raid_config,
            &raid_info.data,
            caller,
            verifier,
            |raid, config| raid.configure_boss(config, &caller, &inputs, &proof),
        )?;

        effects.publish();
        emit!(event);

        Ok(())
    }

    pub fn transfer_ownership(ctx: Context<TransferOwnership>, new_owner: Pubkey) -> Result<()> {
        let caller = ctx.accounts.owner.key();
        let accounts = &mut *ctx.accounts;
        let raid_info = accounts.raid_config.to_account_info();

        let (event, _) = session::run(
            raid_info.key(),
            &mut accounts.raid_config,
            &raid_info.data,
            caller,
            NoInputs,
            |raid, config| raid.transfer_ownership(config, &caller, new_owner),
        )?;

        emit!(event);

        Ok(())
    }

    pub fn set_input_verifier(ctx: Context<SetInputVerifier>, input_verifier: Pubkey) -> Result<()> {
        let caller = ctx.accounts.owner.key();
        let accounts = &mut *ctx.accounts;
        let raid_info = accounts.raid_config.to_account_info();

        let (event, _) = session::run(
            raid_info.key(),
            &mut accounts.raid_config,
            &raid_info.data,
            caller,
            NoInputs,
            |raid, config| raid.set_input_verifier(config, &caller, input_verifier),
        )?;

        emit!(event);

        Ok(())
    }

    // ============================================================
    // Combat
    // ============================================================

    pub fn join_fight(ctx: Context<JoinFight>, hp: ExternalCiphertext, proof: Vec<u8>) -> Result<()> {
        let caller = ctx.accounts.player.key();
        let accounts = &mut *ctx.accounts;
        accounts.fighter.bump = ctx.bumps.fighter;
        let raid_info = accounts.raid_config.to_account_info();
        let verifier = Ed25519InputVerifier::new(
            accounts.raid_config.input_verifier,
            accounts.instructions_sysvar.to_account_info(),
        );
        let fighter = &mut accounts.fighter;

        let (event, effects) = session::run(
            raid_info.key(),
            &mut accounts.raid_config,
            &raid_info.data,
            caller,
            verifier,
            |raid, config| raid.join_fight(config, fighter, &caller, &hp, &proof),
        )?;

        effects.publish();
        emit!(event);

        Ok(())
    }

    pub fn attack_boss(
        ctx: Context<AttackBoss>,
        attack_power: ExternalCiphertext,
        spell_id: ExternalCiphertext,
        proof: Vec<u8>,
    ) -> Result<()> {
        let caller = ctx.accounts.player.key();
        let accounts = &mut *ctx.accounts;
        let raid_info = accounts.raid_config.to_account_info();
        let verifier = Ed25519InputVerifier::new(
            accounts.raid_config.input_verifier,
            accounts.instructions_sysvar.to_account_info(),
        );
        let fighter = accounts.fighter.as_deref_mut();
        let inputs = StrikeInputs {
            attack_power,
            spell_id,
        };

        let (event, effects) = session::run(
            raid_info.key(),
            &mut accounts.raid_config,
            &raid_info.data,
            caller,
            verifier,
            |raid, config| raid.attack_boss(config, fighter, &caller, &inputs, &proof),
        )?;

        effects.publish();
        emit!(event);

        Ok(())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn get_boss_meta(ctx: Context<ReadRaid>) -> Result<BossMeta> {
        Ok(raid::boss_meta(&ctx.accounts.raid_config))
    }

    pub fn get_boss_hp_handles(ctx: Context<ReadFighter>, _caller: Pubkey) -> Result<BossHpHandles> {
        Ok(raid::boss_hp_handles(
            &ctx.accounts.raid_config,
            ctx.accounts.fighter.as_deref(),
        ))
    }

    pub fn get_my_combat_state(ctx: Context<ReadFighter>, _caller: Pubkey) -> Result<CombatStateView> {
        Ok(raid::combat_state(ctx.accounts.fighter.as_deref()))
    }

    /// Whether `identity` holds a stored grant on `handle`, looking at the
    /// template and at `caller`'s fighter.
    pub fn check_access(
        ctx: Context<ReadFighter>,
        _caller: Pubkey,
        handle: Handle,
        identity: Pubkey,
    ) -> Result<bool> {
        Ok(raid::has_access(
            &ctx.accounts.raid_config,
            ctx.accounts.fighter.as_deref(),
            &handle,
            &identity,
        ))
    }
}

// ============================================================
// Account Contexts - Raid Administration
// ============================================================

#[derive(Accounts)]
pub struct InitializeRaid<'info> {
    #[account(mut)]
    pub owner: Signer<'info>,

    #[account(
        init,
        payer = owner,
        space = RaidConfig::SIZE,
        seeds = [RaidConfig::SEED_PREFIX],
        bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,

    pub system_program: Program<'info, System>,
}

/// Ownership is checked by the engine, after the reentrancy lock. The
/// instructions sysvar exposes the Ed25519 attestation of the inputs.
#[derive(Accounts)]
pub struct ConfigureBoss<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [RaidConfig::SEED_PREFIX],
        bump = raid_config.bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,

    #[account(address = ::anchor_lang::solana_program::sysvar::instructions::ID)]
    /// CHECK: instructions_sysvar
    pub instructions_sysvar: AccountInfo<'info>,
}

#[derive(Accounts)]
pub struct TransferOwnership<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [RaidConfig::SEED_PREFIX],
        bump = raid_config.bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,
}

#[derive(Accounts)]
pub struct SetInputVerifier<'info> {
    pub owner: Signer<'info>,

    #[account(
        mut,
        seeds = [RaidConfig::SEED_PREFIX],
        bump = raid_config.bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,
}

// ============================================================
// Account Contexts - Combat
// ============================================================

#[derive(Accounts)]
pub struct JoinFight<'info> {
    #[account(mut)]
    pub player: Signer<'info>,

    #[account(
        mut,
        seeds = [RaidConfig::SEED_PREFIX],
        bump = raid_config.bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,

    #[account(
        init_if_needed,
        payer = player,
        space = Fighter::SIZE,
        seeds = [Fighter::SEED_PREFIX, player.key().as_ref()],
        bump,
    )]
    pub fighter: Account<'info, Fighter>,

    pub system_program: Program<'info, System>,

    #[account(address = ::anchor_lang::solana_program::sysvar::instructions::ID)]
    /// CHECK: instructions_sysvar
    pub instructions_sysvar: AccountInfo<'info>,
}

/// The fighter account is optional so that attacking without a prior join
/// surfaces as `NotInFight` instead of an account resolution failure.
#[derive(Accounts)]
pub struct AttackBoss<'info> {
    pub player: Signer<'info>,

    #[account(
        mut,
        seeds = [RaidConfig::SEED_PREFIX],
        bump = raid_config.bump,
    )]
    pub raid_config: Account<'info, RaidConfig>,

    #[account(
        mut,
        seeds = [Fighter::SEED_PREFIX, player.key().as_ref()],
        bump,
    )]
    pub fighter: Option<Account<'info, Fighter>>,

    #[account(address = ::anchor_lang::solana_program::sysvar::instructions::ID)]
    /// CHECK: instructions_sysvar
    pub instructions_sysvar: AccountInfo<'info>,
}

// ============================================================
// Account Contexts - Queries
// ============================================================

#[derive(Accounts)]
pub struct ReadRaid<'info> {
    #[account(seeds = [RaidConfig::SEED_PREFIX], bump = raid_config.bump)]
    pub raid_config: Account<'info, RaidConfig>,
}

#[derive(Accounts)]
#[instruction(caller: Pubkey)]
pub struct ReadFighter<'info> {
    #[account(seeds = [RaidConfig::SEED_PREFIX], bump = raid_config.bump)]
    pub raid_config: Account<'info, RaidConfig>,

    #[account(seeds = [Fighter::SEED_PREFIX, caller.as_ref()], bump)]
    pub fighter: Option<Account<'info, Fighter>>,
}

// ============================================================
// Events
// ============================================================

#[event]
#[derive(Debug)]
pub struct RaidInitialized {
    pub raid_config: Pubkey,
    pub owner: Pubkey,
    pub input_verifier: Pubkey,
}

#[event]
#[derive(Debug)]
pub struct BossConfigured {
    pub owner: Pubkey,
    pub template_version: u64,
    pub max_hp: Euint16,
    pub defense: Euint16,
    pub attack: Euint16,
}

#[event]
#[derive(Debug)]
pub struct OwnershipTransferred {
    pub previous_owner: Pubkey,
    pub new_owner: Pubkey,
}

#[event]
#[derive(Debug)]
pub struct InputVerifierUpdated {
    pub previous: Pubkey,
    pub input_verifier: Pubkey,
}

#[event]
#[derive(Debug)]
pub struct FightJoined {
    pub player: Pubkey,
    pub hp: Euint16,
    pub boss_hp: Euint16,
    pub template_version: u64,
    /// 1-based run counter for this player
    pub run: u64,
}

#[event]
#[derive(Debug)]
pub struct AttackResolved {
    pub player: Pubkey,
    pub hp: Euint16,
    pub boss_hp: Euint16,
    pub hit_success: Ebool,
    /// 1-based attack counter within the current run
    pub attack_number: u32,
    /// Template version the run started against
    pub template_version: u64,
}

/// Symbolic operation trace the co-processor must evaluate for this instruction.
#[event]
#[derive(Debug)]
pub struct CiphertextOps {
    pub caller: Pubkey,
    pub ops: Vec<OpRecord>,
}

/// Decryption permissions granted by this instruction. Grants are never
/// revoked; the ones on handles an account still holds are also stored on it.
#[event]
#[derive(Debug)]
pub struct AccessGranted {
    pub grants: Vec<AclGrant>,
}
