use anchor_lang::prelude::*;

/// Result of a run as seen by a client holding the decrypted vitality values.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FightOutcome {
    Ongoing,
    Victory,
    Defeat,
    /// Both sides reached zero in the same exchange
    Draw,
}

impl FightOutcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, FightOutcome::Ongoing)
    }
}

/// Classify a run from decrypted values. The engine itself never does this.
pub fn classify(player_hp: u16, boss_hp: u16) -> FightOutcome {
    match (player_hp, boss_hp) {
        (0, 0) => FightOutcome::Draw,
        (_, 0) => FightOutcome::Victory,
        (0, _) => FightOutcome::Defeat,
        _ => FightOutcome::Ongoing,
    }
}
