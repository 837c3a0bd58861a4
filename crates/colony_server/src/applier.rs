//! Writes a resolved battle back to colony state.

use std::sync::Arc;
use std::time::Duration;

use colony_core::colony::{ColonyId, ColonySnapshot, ResourceBundle};
use colony_core::combat::{BattleOutcome, Victor};
use colony_core::planning::AttackType;
use colony_core::rewards::calculate_battle_rewards;

use crate::error::{Result, WarfareError};
use crate::registry::AttackId;
use crate::store::{bounded, BattleSummary, ColonyStore};

/// Who fought whom, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engagement {
    /// Scheduled attack being resolved, if any.
    pub attack_id: Option<AttackId>,
    /// Kind of attack.
    pub attack_type: AttackType,
    /// Attacking colony.
    pub attacker_id: ColonyId,
    /// Defending colony.
    pub target_id: ColonyId,
    /// When the outcome is applied.
    pub fought_at_ms: u64,
}

/// Applies battle outcomes through a [`ColonyStore`].
///
/// Writes run in order: attacker casualties, defender casualties, resource
/// transfer (attacker victories only), battle record. The first failing
/// write stops the sequence and is returned.
pub struct OutcomeApplier<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for OutcomeApplier<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: ColonyStore> OutcomeApplier<S> {
    /// Create an applier whose store calls are bounded by `timeout`.
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Apply `outcome` to both colonies and record the battle.
    pub async fn apply(
        &self,
        engagement: &Engagement,
        outcome: &BattleOutcome,
    ) -> Result<BattleSummary> {
        bounded(
            self.timeout,
            "apply_casualties",
            self.store
                .apply_casualties(engagement.attacker_id, &outcome.total_casualties.attacker),
        )
        .await?;
        bounded(
            self.timeout,
            "apply_casualties",
            self.store
                .apply_casualties(engagement.target_id, &outcome.total_casualties.defender),
        )
        .await?;

        let resources_transferred = if outcome.victor == Victor::Attacker {
            self.transfer_spoils(engagement, outcome).await?
        } else {
            ResourceBundle::ZERO
        };

        let summary = BattleSummary {
            attack_id: engagement.attack_id,
            attacker_id: engagement.attacker_id,
            defender_id: engagement.target_id,
            attack_type: engagement.attack_type,
            outcome: outcome.outcome,
            victor: outcome.victor,
            tactical_rating: outcome.battle_efficiency.tactical_rating,
            attacker_casualties: outcome.total_casualties.attacker.clone(),
            defender_casualties: outcome.total_casualties.defender.clone(),
            resources_transferred,
            phases: outcome.phases_fought(),
            fought_at_ms: engagement.fought_at_ms,
        };
        bounded(
            self.timeout,
            "create_battle_record",
            self.store.create_battle_record(&summary),
        )
        .await?;
        Ok(summary)
    }

    /// Compute rewards from fresh snapshots, capped at what the loser holds.
    async fn transfer_spoils(
        &self,
        engagement: &Engagement,
        outcome: &BattleOutcome,
    ) -> Result<ResourceBundle> {
        let winner = self.fetch(engagement.attacker_id, "colony").await?;
        let loser = self.fetch(engagement.target_id, "target").await?;

        let reward = calculate_battle_rewards(outcome, &winner, &loser).min(loser.resources);
        if reward.is_empty() {
            return Ok(reward);
        }
        bounded(
            self.timeout,
            "transfer_resources",
            self.store
                .transfer_resources(engagement.target_id, engagement.attacker_id, reward),
        )
        .await?;
        Ok(reward)
    }

    async fn fetch(&self, id: ColonyId, kind: &'static str) -> Result<ColonySnapshot> {
        bounded(self.timeout, "get_colony_details", self.store.get_colony_details(id))
            .await?
            .ok_or(WarfareError::NotFound { kind, id: id.0 })
    }
}
