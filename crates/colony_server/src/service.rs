//! Request/response facade over the scheduler, for an outer transport to
//! route to.

use colony_core::army::Army;
use colony_core::colony::{ColonyId, ResourceBundle};
use colony_core::combat::{raw_strength, simulate_battle, BattleConditions, BattleOutcome, Side};
use colony_core::config::Formation;
use colony_core::planning::{attack_type_for, AttackType};
use colony_core::retreat::{retreat_from_battle, RetreatResult};
use colony_core::targeting::{rank_targets, ScoredTarget};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::applier::Engagement;
use crate::error::{Result, WarfareError};
use crate::registry::{AttackId, AttackRecord, AttackStatus};
use crate::scheduler::{AttackScheduler, ColonyStatus, SchedulerStatistics};
use crate::store::{bounded, BattleSummary, ColonyStore};

/// One-off battle between two armies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateRequest {
    /// Attacking army.
    pub attacker_army: Army,
    /// Defending army.
    pub defender_army: Army,
    /// Terrain and formations.
    #[serde(default)]
    pub conditions: BattleConditions,
    /// Seed for a reproducible battle. Without one the scheduler's RNG is used.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Player-initiated raid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidRequest {
    /// Raiding colony.
    pub attacker_id: ColonyId,
    /// Raided colony.
    pub target_id: ColonyId,
    /// Units sent. Must be a subset of the attacker's army.
    pub forces: Army,
    /// Defaults to the target's terrain, balanced attacker, defensive defender.
    #[serde(default)]
    pub conditions: Option<BattleConditions>,
}

/// Result of a raid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaidResponse {
    /// Full battle result.
    pub outcome: BattleOutcome,
    /// What was written to the store.
    pub summary: BattleSummary,
}

/// Retreat from a battle in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetreatRequest {
    /// Units still standing.
    pub remaining_army: Army,
    /// Resources being carried home.
    #[serde(default)]
    pub carried_resources: ResourceBundle,
}

/// What a defender may see about an attack heading its way.
///
/// The precomputed outcome stays hidden until the attack lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingAttack {
    /// Attack identifier.
    pub id: AttackId,
    /// Attacking colony.
    pub attacker_colony_id: ColonyId,
    /// Kind of attack.
    pub attack_type: AttackType,
    /// Units on their way.
    pub forces_sent: Army,
    /// When the attack was launched.
    pub created_at_ms: u64,
    /// When the attack lands.
    pub estimated_arrival_ms: u64,
    /// Current status.
    pub status: AttackStatus,
}

impl From<&AttackRecord> for IncomingAttack {
    fn from(record: &AttackRecord) -> Self {
        Self {
            id: record.id,
            attacker_colony_id: record.attacker_colony_id,
            attack_type: record.attack_type,
            forces_sent: record.forces_sent.clone(),
            created_at_ms: record.created_at_ms,
            estimated_arrival_ms: record.estimated_arrival_ms,
            status: record.status,
        }
    }
}

/// Warfare operations exposed to the outside.
pub struct WarfareService<S> {
    scheduler: AttackScheduler<S>,
}

impl<S> Clone for WarfareService<S> {
    fn clone(&self) -> Self {
        Self {
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<S: ColonyStore> WarfareService<S> {
    /// Wrap a scheduler.
    pub fn new(scheduler: AttackScheduler<S>) -> Self {
        Self { scheduler }
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &AttackScheduler<S> {
        &self.scheduler
    }

    /// Fight one battle without touching any colony.
    ///
    /// # Errors
    ///
    /// Returns [`WarfareError::Validation`] if either army is empty.
    pub fn simulate(&self, request: &SimulateRequest) -> Result<BattleOutcome> {
        let combat = &self.scheduler.config().combat;
        let outcome = match request.seed {
            Some(seed) => simulate_battle(
                &request.attacker_army,
                &request.defender_army,
                &request.conditions,
                combat,
                &mut ChaCha8Rng::seed_from_u64(seed),
            )?,
            None => self.scheduler.with_rng(|rng| {
                simulate_battle(
                    &request.attacker_army,
                    &request.defender_army,
                    &request.conditions,
                    combat,
                    rng,
                )
            })?,
        };
        Ok(outcome)
    }

    /// Targets in range of a colony, best first, with score breakdowns.
    pub async fn available_targets(&self, colony_id: ColonyId) -> Result<Vec<ScoredTarget>> {
        let colony = self.scheduler.colony(colony_id).await?;
        let store = self.scheduler.store();
        let timeout = self.scheduler.config().store_timeout();
        let difficulty = bounded(
            timeout,
            "get_difficulty_settings",
            store.get_difficulty_settings(colony.user_id),
        )
        .await?;
        let colonies =
            bounded(timeout, "get_active_colonies", store.get_active_colonies())
                .await?;

        let config = self.scheduler.config();
        Ok(rank_targets(
            &colony,
            &colonies,
            difficulty.aggression_multiplier,
            &config.combat,
            &config.targeting_rules(),
        ))
    }

    /// Fight a player raid now and apply the result.
    ///
    /// # Errors
    ///
    /// - [`WarfareError::Validation`] on `forces` if it is empty or exceeds
    ///   the attacker's army
    /// - [`WarfareError::NotFound`] if either colony is missing
    /// - [`WarfareError::TransientStore`] if a store write fails
    pub async fn execute_raid(&self, request: &RaidRequest) -> Result<RaidResponse> {
        if request.forces.is_empty() {
            return Err(WarfareError::validation("forces", "no units sent"));
        }
        if request.attacker_id == request.target_id {
            return Err(WarfareError::validation("target_id", "cannot raid own colony"));
        }
        let attacker = self.scheduler.colony(request.attacker_id).await?;
        let target = self
            .scheduler
            .colony(request.target_id)
            .await
            .map_err(|e| match e {
                WarfareError::NotFound { id, .. } => WarfareError::NotFound { kind: "target", id },
                other => other,
            })?;
        if !attacker.army.covers(&request.forces) {
            return Err(WarfareError::validation(
                "forces",
                "exceeds the attacker's available units",
            ));
        }

        let conditions = request.conditions.unwrap_or(BattleConditions {
            terrain: target.terrain,
            attacker_formation: Formation::Balanced,
            defender_formation: Formation::Defensive,
        });
        let combat = &self.scheduler.config().combat;
        let outcome = self.scheduler.with_rng(|rng| {
            simulate_battle(&request.forces, &target.army, &conditions, combat, rng)
        })?;
        let attack_type = attack_type_for(
            raw_strength(&request.forces, Side::Attacker, combat),
            target.military_strength(combat),
        );

        let engagement = Engagement {
            attack_id: None,
            attack_type,
            attacker_id: attacker.id,
            target_id: target.id,
            fought_at_ms: self.scheduler.now_ms(),
        };
        let summary = self.scheduler.applier().apply(&engagement, &outcome).await?;
        tracing::info!(
            attacker = %attacker.id,
            target = %target.id,
            %attack_type,
            victor = ?outcome.victor,
            "Raid executed"
        );
        Ok(RaidResponse { outcome, summary })
    }

    /// Attacks heading for a colony, soonest first.
    pub async fn incoming_attacks(&self, colony_id: ColonyId) -> Vec<IncomingAttack> {
        self.scheduler
            .incoming_attacks_against(colony_id)
            .await
            .iter()
            .map(IncomingAttack::from)
            .collect()
    }

    /// A single live attack.
    ///
    /// # Errors
    ///
    /// Returns [`WarfareError::NotFound`] once the attack has resolved.
    pub async fn attack(&self, id: AttackId) -> Result<AttackRecord> {
        self.scheduler
            .attack(id)
            .await
            .ok_or(WarfareError::NotFound {
                kind: "attack",
                id: id.0,
            })
    }

    /// Apply retreat penalties.
    ///
    /// # Errors
    ///
    /// Returns [`WarfareError::Validation`] if nothing is left to retreat.
    pub fn retreat(&self, request: &RetreatRequest) -> Result<RetreatResult> {
        Ok(retreat_from_battle(
            &request.remaining_army,
            request.carried_resources,
        )?)
    }

    /// Registry counters plus live counts.
    pub async fn statistics(&self) -> SchedulerStatistics {
        self.scheduler.statistics().await
    }

    /// Start scheduling every active AI colony.
    pub async fn start(&self) -> Result<usize> {
        self.scheduler.initialize().await
    }

    /// Stop scheduling. Returns the attacks abandoned mid-flight.
    pub async fn stop(&self) -> Vec<AttackRecord> {
        self.scheduler.shutdown_all().await
    }

    /// Scheduling status of every running colony.
    pub async fn status(&self) -> Vec<ColonyStatus> {
        self.scheduler.status().await
    }
}
