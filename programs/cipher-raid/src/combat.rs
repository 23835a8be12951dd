use anchor_lang::prelude::*;

use crate::fhe::{Coprocessor, Ebool, Euint16};
use crate::state::BossStats;

/// Spell id that buffs the attack by half. Every other id is the basic spell.
pub const POWER_STRIKE_ID: u16 = 1;

/// Power Strike adds `attack_power / POWER_STRIKE_DIVISOR`.
pub const POWER_STRIKE_DIVISOR: u16 = 2;

/// Encrypted result of one attack exchange.
#[derive(Clone, Copy, Debug)]
pub struct StrikeOutcome {
    pub effective_attack: Euint16,
    pub hit_success: Ebool,
    pub damage_to_boss: Euint16,
    /// Boss vitality after the player's hit
    pub boss_hp: Euint16,
    /// Player vitality after the boss counter-attack
    pub hp: Euint16,
}

/// Subtract `damage` from `current_hp`, saturating at zero.
pub fn apply_damage<C: Coprocessor>(
    fhe: &mut C,
    current_hp: Euint16,
    damage: Euint16,
) -> Result<Euint16> {
    let overkill = fhe.gt(damage, current_hp)?;
    let clamped = fhe.select(overkill, current_hp, damage)?;
    fhe.sub(current_hp, clamped)
}

/// Spell-modified attack: Power Strike is `power + power / 2`, anything else is `power`.
pub fn effective_attack<C: Coprocessor>(
    fhe: &mut C,
    attack_power: Euint16,
    spell_id: Euint16,
) -> Result<Euint16> {
    let half_attack = fhe.div_scalar(attack_power, POWER_STRIKE_DIVISOR)?;
    let buffed_attack = fhe.add(attack_power, half_attack)?;
    let power_strike = fhe.lift(POWER_STRIKE_ID)?;
    let is_power_strike = fhe.equal(spell_id, power_strike)?;
    fhe.select(is_power_strike, buffed_attack, attack_power)
}

/// Resolve one exchange entirely in the encrypted domain.
///
/// The hit lands only when the effective attack is strictly greater than the
/// boss defense, and then deals the full effective attack. The boss always
/// counter-attacks for its template attack, hit or miss.
pub fn resolve_strike<C: Coprocessor>(
    fhe: &mut C,
    boss: &BossStats,
    attack_power: Euint16,
    spell_id: Euint16,
    boss_hp: Euint16,
    hp: Euint16,
) -> Result<StrikeOutcome> {
    let effective_attack = effective_attack(fhe, attack_power, spell_id)?;
    let hit_success = fhe.gt(effective_attack, boss.defense)?;
    let no_damage = fhe.lift(0)?;
    let damage_to_boss = fhe.select(hit_success, effective_attack, no_damage)?;

    let boss_hp = apply_damage(fhe, boss_hp, damage_to_boss)?;
    let hp = apply_damage(fhe, hp, boss.attack)?;

    Ok(StrikeOutcome {
        effective_attack,
        hit_success,
        damage_to_boss,
        boss_hp,
        hp,
    })
}
