//! Colony store interface.
//!
//! Colony persistence lives outside this crate. The scheduler reads
//! snapshots and writes battle results through [`ColonyStore`];
//! [`MemoryColonyStore`] is an in-process implementation used by the
//! binary and by tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use colony_core::army::{Army, UnitType};
use colony_core::colony::{ColonyId, ColonySnapshot, DifficultySettings, ResourceBundle, UserId};
use colony_core::combat::{OutcomeKind, TacticalRating, Victor};
use colony_core::planning::AttackType;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarfareError};
use crate::registry::{AttackId, AttackRecord};

/// Battle history entry written after an outcome is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Scheduled attack this battle resolved, if any. Player raids have none.
    pub attack_id: Option<AttackId>,
    /// Attacking colony.
    pub attacker_id: ColonyId,
    /// Defending colony.
    pub defender_id: ColonyId,
    /// Kind of attack.
    pub attack_type: AttackType,
    /// Result category.
    pub outcome: OutcomeKind,
    /// Winning side.
    pub victor: Victor,
    /// Tactical rating from the attacker's point of view.
    pub tactical_rating: TacticalRating,
    /// Units the attacker lost.
    pub attacker_casualties: Army,
    /// Units the defender lost.
    pub defender_casualties: Army,
    /// Resources moved from defender to attacker.
    pub resources_transferred: ResourceBundle,
    /// Phases fought.
    pub phases: u32,
    /// When the outcome was applied.
    pub fought_at_ms: u64,
}

/// Read and write access to colony state.
///
/// Every method may fail with [`WarfareError::TransientStore`]. Snapshots
/// are point-in-time copies and may be stale as soon as they are returned.
pub trait ColonyStore: Send + Sync + 'static {
    /// Active AI colonies that should run a decision loop.
    fn get_active_ai_colonies(&self) -> impl Future<Output = Result<Vec<ColonySnapshot>>> + Send;

    /// Every active colony, AI or not. Used to find targets.
    fn get_active_colonies(&self) -> impl Future<Output = Result<Vec<ColonySnapshot>>> + Send;

    /// One colony, if it exists.
    fn get_colony_details(
        &self,
        id: ColonyId,
    ) -> impl Future<Output = Result<Option<ColonySnapshot>>> + Send;

    /// Difficulty tuning for a user.
    fn get_difficulty_settings(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<DifficultySettings>> + Send;

    /// Persist a newly scheduled attack.
    fn store_attack(&self, record: &AttackRecord) -> impl Future<Output = Result<()>> + Send;

    /// Remove casualties from a colony's army.
    fn apply_casualties(
        &self,
        colony: ColonyId,
        casualties: &Army,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Move resources between colonies.
    fn transfer_resources(
        &self,
        from: ColonyId,
        to: ColonyId,
        bundle: ResourceBundle,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Append a battle history entry.
    fn create_battle_record(
        &self,
        summary: &BattleSummary,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Run a store call under a timeout. Elapsed calls become transient errors.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(WarfareError::TransientStore(format!(
            "{operation} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    /// `get_active_ai_colonies`
    ListAiColonies,
    /// `get_active_colonies`
    ListColonies,
    /// `get_colony_details`
    GetColony,
    /// `get_difficulty_settings`
    GetDifficulty,
    /// `store_attack`
    StoreAttack,
    /// `apply_casualties`
    ApplyCasualties,
    /// `transfer_resources`
    TransferResources,
    /// `create_battle_record`
    CreateBattleRecord,
}

#[derive(Debug, Default)]
struct MemoryState {
    colonies: BTreeMap<ColonyId, ColonySnapshot>,
    difficulty: HashMap<UserId, DifficultySettings>,
    attacks: Vec<AttackRecord>,
    battles: Vec<BattleSummary>,
    failing: BTreeSet<StoreOp>,
    latency: Duration,
    ack_delays: BTreeMap<StoreOp, Duration>,
}

/// In-memory colony store with fault injection.
#[derive(Debug, Default)]
pub struct MemoryColonyStore {
    state: Mutex<MemoryState>,
}

impl MemoryColonyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a colony.
    pub fn upsert_colony(&self, colony: ColonySnapshot) {
        self.lock().colonies.insert(colony.id, colony);
    }

    /// Set a user's difficulty. Users without one get the defaults.
    pub fn set_difficulty(&self, user: UserId, settings: DifficultySettings) {
        self.lock().difficulty.insert(user, settings);
    }

    /// Make every call of `op` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: StoreOp) {
        self.lock().failing.remove(&op);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Hold back the acknowledgement of `op` for `delay` after its write
    /// has landed.
    pub fn delay_ack(&self, op: StoreOp, delay: Duration) {
        self.lock().ack_delays.insert(op, delay);
    }

    /// Delete a colony.
    pub fn remove_colony(&self, id: ColonyId) -> Option<ColonySnapshot> {
        self.lock().colonies.remove(&id)
    }

    /// Current copy of a colony.
    #[must_use]
    pub fn colony(&self, id: ColonyId) -> Option<ColonySnapshot> {
        self.lock().colonies.get(&id).cloned()
    }

    /// Attacks written through `store_attack`.
    #[must_use]
    pub fn stored_attacks(&self) -> Vec<AttackRecord> {
        self.lock().attacks.clone()
    }

    /// Battle history written through `create_battle_record`.
    #[must_use]
    pub fn battles(&self) -> Vec<BattleSummary> {
        self.lock().battles.clone()
    }

    /// Wait out the injected latency, then check for an injected fault.
    async fn enter(&self, op: StoreOp) -> Result<()> {
        let latency = self.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.lock().failing.contains(&op) {
            return Err(WarfareError::TransientStore(format!("{op:?} failed")));
        }
        Ok(())
    }

    /// Wait out any acknowledgement delay for a write that already landed.
    async fn acknowledge(&self, op: StoreOp) {
        let delay = self.lock().ack_delays.get(&op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn missing(id: ColonyId) -> WarfareError {
    WarfareError::NotFound {
        kind: "colony",
        id: id.0,
    }
}

impl ColonyStore for MemoryColonyStore {
    async fn get_active_ai_colonies(&self) -> Result<Vec<ColonySnapshot>> {
        self.enter(StoreOp::ListAiColonies).await?;
        Ok(self
            .lock()
            .colonies
            .values()
            .filter(|c| c.is_ai && c.is_active)
            .cloned()
            .collect())
    }

    async fn get_active_colonies(&self) -> Result<Vec<ColonySnapshot>> {
        self.enter(StoreOp::ListColonies).await?;
        Ok(self
            .lock()
            .colonies
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn get_colony_details(&self, id: ColonyId) -> Result<Option<ColonySnapshot>> {
        self.enter(StoreOp::GetColony).await?;
        Ok(self.lock().colonies.get(&id).cloned())
    }

    async fn get_difficulty_settings(&self, user: UserId) -> Result<DifficultySettings> {
        self.enter(StoreOp::GetDifficulty).await?;
        Ok(self
            .lock()
            .difficulty
            .get(&user)
            .copied()
            .unwrap_or_default())
    }

    async fn store_attack(&self, record: &AttackRecord) -> Result<()> {
        self.enter(StoreOp::StoreAttack).await?;
        self.lock().attacks.push(record.clone());
        self.acknowledge(StoreOp::StoreAttack).await;
        Ok(())
    }

    async fn apply_casualties(&self, colony: ColonyId, casualties: &Army) -> Result<()> {
        self.enter(StoreOp::ApplyCasualties).await?;
        {
            let mut state = self.lock();
            let snapshot = state.colonies.get_mut(&colony).ok_or_else(|| missing(colony))?;

            let lost = casualties.total();
            let military_lost: u32 = casualties
                .iter()
                .filter(|&(unit, _)| unit != UnitType::Worker)
                .map(|(_, count)| count)
                .sum();
            snapshot.army.apply_casualties(casualties);
            snapshot.population = snapshot.population.saturating_sub(lost);
            snapshot.used_military_capacity =
                snapshot.used_military_capacity.saturating_sub(military_lost);
        }
        self.acknowledge(StoreOp::ApplyCasualties).await;
        Ok(())
    }

    async fn transfer_resources(
        &self,
        from: ColonyId,
        to: ColonyId,
        bundle: ResourceBundle,
    ) -> Result<()> {
        self.enter(StoreOp::TransferResources).await?;
        {
            let mut state = self.lock();
            if !state.colonies.contains_key(&to) {
                return Err(missing(to));
            }
            let source = state.colonies.get_mut(&from).ok_or_else(|| missing(from))?;
            let moved = bundle.min(source.resources);
            source.resources = source.resources.saturating_sub(moved);
            if let Some(target) = state.colonies.get_mut(&to) {
                target.resources = target.resources.saturating_add(moved);
            }
        }
        self.acknowledge(StoreOp::TransferResources).await;
        Ok(())
    }

    async fn create_battle_record(&self, summary: &BattleSummary) -> Result<()> {
        self.enter(StoreOp::CreateBattleRecord).await?;
        self.lock().battles.push(summary.clone());
        self.acknowledge(StoreOp::CreateBattleRecord).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colony_test_utils::fixtures::{soldiers, ColonyBuilder};

    #[tokio::test]
    async fn test_casualties_and_transfers_saturate() {
        let store = MemoryColonyStore::new();
        store.upsert_colony(
            ColonyBuilder::new(1)
                .army(soldiers(10).with(UnitType::Worker, 5))
                .population(15)
                .resources(ResourceBundle::new(10, 10, 10, 10))
                .build(),
        );
        store.upsert_colony(ColonyBuilder::new(2).build());

        store
            .apply_casualties(ColonyId(1), &soldiers(4).with(UnitType::Worker, 9))
            .await
            .expect("apply");
        let colony = store.colony(ColonyId(1)).expect("exists");
        assert_eq!(colony.army.count(UnitType::Soldier), 6);
        assert_eq!(colony.army.count(UnitType::Worker), 0);
        assert_eq!(colony.population, 2);

        store
            .transfer_resources(ColonyId(1), ColonyId(2), ResourceBundle::new(5, 50, 0, 0))
            .await
            .expect("transfer");
        assert_eq!(
            store.colony(ColonyId(1)).map(|c| c.resources),
            Some(ResourceBundle::new(5, 0, 10, 10))
        );
        assert_eq!(
            store.colony(ColonyId(2)).map(|c| c.resources),
            Some(ResourceBundle::new(5, 10, 0, 0))
        );
    }

    #[tokio::test]
    async fn test_injected_fault_and_heal() {
        let store = MemoryColonyStore::new();
        store.upsert_colony(ColonyBuilder::new(1).build());
        store.fail(StoreOp::GetColony);
        assert!(matches!(
            store.get_colony_details(ColonyId(1)).await,
            Err(WarfareError::TransientStore(_))
        ));
        store.heal(StoreOp::GetColony);
        assert!(store
            .get_colony_details(ColonyId(1))
            .await
            .expect("healed")
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_ack_lands_write_first() {
        let store = MemoryColonyStore::new();
        store.upsert_colony(ColonyBuilder::new(1).army(soldiers(5)).build());
        store.delay_ack(StoreOp::ApplyCasualties, Duration::from_secs(10));

        let result = bounded(
            Duration::from_secs(1),
            "apply_casualties",
            store.apply_casualties(ColonyId(1), &soldiers(2)),
        )
        .await;
        assert!(matches!(result, Err(WarfareError::TransientStore(_))));
        assert_eq!(
            store.colony(ColonyId(1)).map(|c| c.army.count(UnitType::Soldier)),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_missing_colony_write() {
        let store = MemoryColonyStore::new();
        assert!(matches!(
            store.apply_casualties(ColonyId(3), &soldiers(1)).await,
            Err(WarfareError::NotFound { kind: "colony", id: 3 })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let store = MemoryColonyStore::new();
        store.set_latency(Duration::from_secs(10));
        let result = bounded(
            Duration::from_secs(5),
            "get_active_colonies",
            store.get_active_colonies(),
        )
        .await;
        assert!(matches!(result, Err(WarfareError::TransientStore(msg)) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_ai_listing_filters() {
        let store = MemoryColonyStore::new();
        store.upsert_colony(ColonyBuilder::new(1).ai().build());
        store.upsert_colony(ColonyBuilder::new(2).build());
        store.upsert_colony(ColonyBuilder::new(3).ai().inactive().build());
        let ids: Vec<ColonyId> = store
            .get_active_ai_colonies()
            .await
            .expect("list")
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![ColonyId(1)]);
        assert_eq!(store.get_active_colonies().await.expect("list").len(), 2);
    }
}
