//! Per-colony attack decision loops and deferred resolution.
//!
//! Each AI colony gets one tokio task that ticks at the colony's decision
//! interval. A tick that commits to an attack runs the battle immediately,
//! stores the record as incoming, and spawns one more task that sleeps for
//! the travel time before applying the precomputed outcome.
//!
//! The registry sits behind an async mutex that is never held across a
//! colony store call.
//!
//! Loops are stopped by signal, never aborted: a tick that has started runs
//! to completion, so an attack written to the store is always registered.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use colony_core::army::Army;
use colony_core::colony::{ColonyId, ColonySnapshot};
use colony_core::combat::{raw_strength, simulate_battle, BattleConditions, BattleOutcome, Side};
use colony_core::config::Formation;
use colony_core::planning::{
    attack_type_for, choose_forces, decision_interval_ms, formation_for, travel_time_ms,
};
use colony_core::targeting::{check_eligibility, select_target, EligibilityCheck};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::applier::{Engagement, OutcomeApplier};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{Result, WarfareError};
use crate::registry::{
    AttackId, AttackRecord, AttackRegistry, AttackStatus, DeadLetter, RegistryStats,
    SchedulerDescriptor,
};
use crate::store::{bounded, BattleSummary, ColonyStore};

/// Scheduling status of one colony.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColonyStatus {
    /// Colony being scheduled.
    pub colony_id: ColonyId,
    /// Time between decision ticks.
    pub interval_ms: u64,
    /// When the colony last attacked.
    pub last_attack_ms: Option<u64>,
    /// When the next tick is due.
    pub next_attack_window_ms: u64,
    /// Attacks this colony has in flight.
    pub incoming_attacks: u32,
    /// Whether the loop task is alive.
    pub running: bool,
}

/// Registry counters plus live counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatistics {
    /// Running totals.
    pub totals: RegistryStats,
    /// Attacks currently in the registry.
    pub live_attacks: usize,
    /// Colonies with a decision loop.
    pub running_colonies: usize,
    /// Failed resolutions retained for reconciliation.
    pub dead_letters: usize,
}

/// Handle to one colony's decision loop.
struct DecisionLoop {
    generation: u64,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DecisionLoop {
    /// Ask the loop to exit before its next tick.
    fn signal_stop(&self) {
        self.stop.send_replace(true);
    }

    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }
}

struct SchedulerState {
    registry: AttackRegistry,
    loops: HashMap<ColonyId, DecisionLoop>,
    generations: u64,
}

struct Shared<S> {
    store: Arc<S>,
    applier: OutcomeApplier<S>,
    config: SchedulerConfig,
    clock: Clock,
    rng: StdMutex<ChaCha8Rng>,
    state: Mutex<SchedulerState>,
}

/// Cloneable handle to the attack scheduler.
///
/// All clones share the same registry, loops, and RNG.
pub struct AttackScheduler<S> {
    inner: Arc<Shared<S>>,
}

impl<S> Clone for AttackScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ColonyStore> AttackScheduler<S> {
    /// Create a scheduler. Nothing runs until [`initialize`](Self::initialize)
    /// or [`start_for_colony`](Self::start_for_colony) is called.
    pub fn new(store: Arc<S>, config: SchedulerConfig, seed: u64) -> Self {
        let applier = OutcomeApplier::new(Arc::clone(&store), config.store_timeout());
        let registry = AttackRegistry::new(config.dead_letter_capacity);
        Self {
            inner: Arc::new(Shared {
                store,
                applier,
                config,
                clock: Clock::new(),
                rng: StdMutex::new(ChaCha8Rng::seed_from_u64(seed)),
                state: Mutex::new(SchedulerState {
                    registry,
                    loops: HashMap::new(),
                    generations: 0,
                }),
            }),
        }
    }

    /// The colony store.
    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    /// The active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// The outcome applier sharing this scheduler's store and timeout.
    pub fn applier(&self) -> &OutcomeApplier<S> {
        &self.inner.applier
    }

    /// Current time in milliseconds since the Unix epoch.
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Run `f` with the scheduler's seeded RNG.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.inner.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        bounded(self.inner.config.store_timeout(), operation, call).await
    }

    /// Fetch a colony, failing with `NotFound` if it does not exist.
    pub async fn colony(&self, id: ColonyId) -> Result<ColonySnapshot> {
        self.call("get_colony_details", self.inner.store.get_colony_details(id))
            .await?
            .ok_or(WarfareError::NotFound {
                kind: "colony",
                id: id.0,
            })
    }

    /// Start a loop for every active AI colony.
    ///
    /// Returns how many loops started. A colony that fails to start is
    /// logged and skipped.
    pub async fn initialize(&self) -> Result<usize> {
        let colonies = self
            .call(
                "get_active_ai_colonies",
                self.inner.store.get_active_ai_colonies(),
            )
            .await
            .map_err(|e| WarfareError::SchedulingInit(e.to_string()))?;

        let mut started = 0;
        for colony in &colonies {
            match self.start_for_colony(colony.id).await {
                Ok(()) => started += 1,
                Err(error) => {
                    tracing::warn!(colony = %colony.id, %error, "Failed to start attack loop");
                }
            }
        }
        tracing::info!(started, total = colonies.len(), "Attack scheduling initialized");
        Ok(started)
    }

    /// Start (or restart) the decision loop for one colony.
    ///
    /// Any previous loop for the colony is told to stop first, so calling
    /// this twice leaves exactly one loop ticking. A tick the old loop has
    /// already started still finishes.
    pub async fn start_for_colony(&self, colony_id: ColonyId) -> Result<()> {
        let colony = self.colony(colony_id).await?;
        let difficulty = self
            .call(
                "get_difficulty_settings",
                self.inner.store.get_difficulty_settings(colony.user_id),
            )
            .await?;
        let interval_ms = decision_interval_ms(
            &difficulty,
            colony.total_ticks,
            &self.inner.config.planning_rules(),
        );
        let now = self.now_ms();

        let mut state = self.inner.state.lock().await;
        if let Some(previous) = state.loops.remove(&colony_id) {
            previous.signal_stop();
        }
        let last_attack_ms = state
            .registry
            .descriptor(colony_id)
            .and_then(|d| d.last_attack_ms);
        state.registry.upsert_descriptor(SchedulerDescriptor {
            colony_id,
            difficulty,
            interval_ms,
            last_attack_ms,
            next_attack_window_ms: now.saturating_add(interval_ms),
        });
        state.generations += 1;
        let generation = state.generations;
        let (stop, stopped) = watch::channel(false);
        let span = tracing::info_span!("colony", id = %colony_id);
        let task = tokio::spawn(
            self.clone()
                .run_loop(colony_id, interval_ms, generation, stopped)
                .instrument(span),
        );
        state.loops.insert(
            colony_id,
            DecisionLoop {
                generation,
                stop,
                task,
            },
        );
        drop(state);

        tracing::info!(colony = %colony_id, interval_ms, "Attack loop started");
        Ok(())
    }

    /// Stop a colony's decision loop. No further ticks run; a tick already
    /// under way finishes, and attacks already in flight still resolve.
    ///
    /// Returns whether a loop was running.
    pub async fn stop_for_colony(&self, colony_id: ColonyId) -> bool {
        let mut state = self.inner.state.lock().await;
        let stopped = state.loops.remove(&colony_id);
        state.registry.remove_descriptor(colony_id);
        drop(state);

        let Some(stopped) = stopped else {
            return false;
        };
        stopped.signal_stop();
        tracing::info!(colony = %colony_id, "Attack loop stopped");
        true
    }

    /// Stop every loop and abandon every attack still travelling.
    ///
    /// Waits for ticks already under way, so an attack they commit is
    /// registered and abandoned with the rest. Abandoned attacks are
    /// returned (and logged) so they can be reconciled against the store.
    /// Attacks already being applied are left to finish.
    pub async fn shutdown_all(&self) -> Vec<AttackRecord> {
        let loops: Vec<(ColonyId, DecisionLoop)> =
            self.inner.state.lock().await.loops.drain().collect();
        for (_, stopped) in &loops {
            stopped.signal_stop();
        }
        for (colony_id, stopped) in loops {
            if let Err(error) = stopped.task.await {
                tracing::warn!(colony = %colony_id, %error, "Attack loop ended abnormally");
            }
        }

        let mut state = self.inner.state.lock().await;
        state.registry.clear_descriptors();
        let abandoned = state.registry.abandon_incoming();
        drop(state);

        for record in &abandoned {
            tracing::warn!(
                attack = %record.id,
                attacker = %record.attacker_colony_id,
                target = %record.target_colony_id,
                arrival_ms = record.estimated_arrival_ms,
                "Abandoned in-flight attack"
            );
        }
        tracing::info!(abandoned = abandoned.len(), "Attack scheduler shut down");
        abandoned
    }

    async fn run_loop(
        self,
        colony_id: ColonyId,
        interval_ms: u64,
        generation: u64,
        mut stopped: watch::Receiver<bool>,
    ) {
        let period = Duration::from_millis(interval_ms);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            // Stop signals are only seen here, between ticks.
            tokio::select! {
                biased;
                _ = stopped.changed() => break,
                _ = ticker.tick() => {}
            }
            if !self.tick(colony_id, interval_ms).await {
                self.retire(colony_id, generation).await;
                break;
            }
        }
        tracing::debug!("Attack loop exited");
    }

    /// Drop the bookkeeping of a loop that ended on its own, unless a newer
    /// loop has replaced it.
    async fn retire(&self, colony_id: ColonyId, generation: u64) {
        let mut state = self.inner.state.lock().await;
        if state
            .loops
            .get(&colony_id)
            .is_some_and(|current| current.generation == generation)
        {
            state.loops.remove(&colony_id);
            state.registry.remove_descriptor(colony_id);
        }
    }

    /// Run one scheduled decision. Returns `false` once the colony is gone
    /// from the store.
    async fn tick(&self, colony_id: ColonyId, interval_ms: u64) -> bool {
        match self.evaluate(colony_id).await {
            Ok(_) => {}
            Err(WarfareError::NotFound { kind: "colony", .. }) => {
                tracing::info!("Colony no longer exists, stopping attack loop");
                return false;
            }
            Err(error) => tracing::warn!(%error, "Attack evaluation failed"),
        }
        let next = self.now_ms().saturating_add(interval_ms);
        if let Some(descriptor) = self
            .inner
            .state
            .lock()
            .await
            .registry
            .descriptor_mut(colony_id)
        {
            descriptor.next_attack_window_ms = next;
        }
        true
    }

    /// Run one decision for a colony.
    ///
    /// Returns the id of the scheduled attack, or `None` when the colony is
    /// not eligible, finds no worthwhile target, or fails its attack roll.
    pub async fn evaluate(&self, colony_id: ColonyId) -> Result<Option<AttackId>> {
        let colony = self.colony(colony_id).await?;
        if !colony.is_active {
            tracing::debug!("Colony inactive");
            return Ok(None);
        }
        let difficulty = self
            .call(
                "get_difficulty_settings",
                self.inner.store.get_difficulty_settings(colony.user_id),
            )
            .await?;
        let combat = &self.inner.config.combat;
        let targeting = self.inner.config.targeting_rules();
        let planning = self.inner.config.planning_rules();
        let now = self.now_ms();

        let (incoming_attacks, last_attack_ms) = {
            let state = self.inner.state.lock().await;
            (
                state.registry.incoming_attacks_for(colony_id),
                state
                    .registry
                    .descriptor(colony_id)
                    .and_then(|d| d.last_attack_ms),
            )
        };
        let check = EligibilityCheck {
            incoming_attacks,
            settings: &difficulty,
            military_strength: colony.military_strength(combat),
            last_attack_ms,
            now_ms: now,
        };
        if let Err(reason) = check_eligibility(&check, &targeting) {
            tracing::debug!(%reason, "Not eligible to attack");
            return Ok(None);
        }

        let colonies = self
            .call("get_active_colonies", self.inner.store.get_active_colonies())
            .await?;
        let Some(best) = select_target(
            &colony,
            &colonies,
            difficulty.aggression_multiplier,
            combat,
            &targeting,
        ) else {
            tracing::debug!("No target worth attacking");
            return Ok(None);
        };
        let target = colonies
            .iter()
            .find(|c| c.id == best.target_id)
            .ok_or(WarfareError::NotFound {
                kind: "target",
                id: best.target_id.0,
            })?;

        let Some((forces, outcome)) = self.commit_battle(&colony, target, difficulty.attack_chance)?
        else {
            return Ok(None);
        };

        let attack_type = attack_type_for(
            raw_strength(&forces, Side::Attacker, combat),
            target.military_strength(combat),
        );
        let travel_ms = travel_time_ms(best.distance, &planning);
        let target_id = target.id;

        let record = {
            let mut state = self.inner.state.lock().await;
            AttackRecord {
                id: state.registry.next_attack_id(),
                attacker_colony_id: colony_id,
                target_colony_id: target_id,
                attack_type,
                forces_sent: forces,
                created_at_ms: now,
                estimated_arrival_ms: now.saturating_add(travel_ms),
                status: AttackStatus::Incoming,
                precomputed_outcome: outcome,
            }
        };
        self.call("store_attack", self.inner.store.store_attack(&record))
            .await?;

        let id = record.id;
        let victor = record.precomputed_outcome.victor;
        let mut state = self.inner.state.lock().await;
        state.registry.insert(record);
        if let Some(descriptor) = state.registry.descriptor_mut(colony_id) {
            descriptor.last_attack_ms = Some(now);
        }
        let span = tracing::info_span!("attack", id = %id);
        let handle = tokio::spawn(
            self.clone()
                .resolve_after(id, Duration::from_millis(travel_ms))
                .instrument(span),
        );
        state.registry.attach_resolution(id, handle);
        drop(state);

        tracing::info!(
            attack = %id,
            target = %target_id,
            %attack_type,
            travel_ms,
            ?victor,
            "Attack scheduled"
        );
        Ok(Some(id))
    }

    /// Roll the attack chance, pick forces, and fight the battle now.
    fn commit_battle(
        &self,
        colony: &ColonySnapshot,
        target: &ColonySnapshot,
        attack_chance: u32,
    ) -> Result<Option<(Army, BattleOutcome)>> {
        let combat = &self.inner.config.combat;
        let planning = self.inner.config.planning_rules();
        self.with_rng(|rng| {
            if rng.gen_range(0..1000) >= attack_chance {
                tracing::debug!("Attack roll failed");
                return Ok(None);
            }
            let forces = choose_forces(&colony.army, rng, &planning);
            if forces.is_empty() {
                tracing::debug!("No military units to send");
                return Ok(None);
            }
            let conditions = BattleConditions {
                terrain: target.terrain,
                attacker_formation: formation_for(colony.personality),
                defender_formation: Formation::Defensive,
            };
            let outcome = simulate_battle(&forces, &target.army, &conditions, combat, rng)?;
            Ok(Some((forces, outcome)))
        })
    }

    async fn resolve_after(self, id: AttackId, delay: Duration) {
        tokio::time::sleep(delay).await;
        // Failures are logged and dead-lettered inside `resolve`.
        let _ = self.resolve(id).await;
    }

    /// Apply a scheduled attack's precomputed outcome and drop the record.
    ///
    /// The record is removed whether or not the writes succeed. Failures
    /// are not retried; they land in the dead-letter list instead.
    pub async fn resolve(&self, attack_id: AttackId) -> Result<BattleSummary> {
        let record = self
            .inner
            .state
            .lock()
            .await
            .registry
            .mark_resolved(attack_id)?
            .clone();

        let engagement = Engagement {
            attack_id: Some(attack_id),
            attack_type: record.attack_type,
            attacker_id: record.attacker_colony_id,
            target_id: record.target_colony_id,
            fought_at_ms: self.now_ms(),
        };
        let result = self
            .inner
            .applier
            .apply(&engagement, &record.precomputed_outcome)
            .await;

        let mut state = self.inner.state.lock().await;
        state.registry.remove(attack_id);
        match result {
            Ok(summary) => {
                state.registry.record_outcome(&record.precomputed_outcome);
                drop(state);
                tracing::info!(
                    attack = %attack_id,
                    victor = ?summary.victor,
                    transferred = summary.resources_transferred.total(),
                    "Attack resolved"
                );
                Ok(summary)
            }
            Err(error) => {
                state
                    .registry
                    .record_failure(record, error.to_string(), engagement.fought_at_ms);
                drop(state);
                tracing::error!(attack = %attack_id, %error, "Attack resolution failed, dead-lettered");
                Err(error)
            }
        }
    }

    /// A live attack, if it has not been resolved and removed yet.
    pub async fn attack(&self, id: AttackId) -> Option<AttackRecord> {
        self.inner.state.lock().await.registry.get(id).cloned()
    }

    /// Live attacks targeting a colony, soonest arrival first.
    pub async fn incoming_attacks_against(&self, colony_id: ColonyId) -> Vec<AttackRecord> {
        self.inner
            .state
            .lock()
            .await
            .registry
            .incoming_attacks_against(colony_id)
    }

    /// Failed resolutions, oldest first.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner
            .state
            .lock()
            .await
            .registry
            .dead_letters()
            .cloned()
            .collect()
    }

    /// Whether a colony has a live decision loop.
    pub async fn is_running(&self, colony_id: ColonyId) -> bool {
        self.inner
            .state
            .lock()
            .await
            .loops
            .get(&colony_id)
            .is_some_and(DecisionLoop::is_live)
    }

    /// Status of every scheduled colony.
    pub async fn status(&self) -> Vec<ColonyStatus> {
        let state = self.inner.state.lock().await;
        state
            .registry
            .descriptors()
            .map(|d| ColonyStatus {
                colony_id: d.colony_id,
                interval_ms: d.interval_ms,
                last_attack_ms: d.last_attack_ms,
                next_attack_window_ms: d.next_attack_window_ms,
                incoming_attacks: state.registry.incoming_attacks_for(d.colony_id),
                running: state
                    .loops
                    .get(&d.colony_id)
                    .is_some_and(DecisionLoop::is_live),
            })
            .collect()
    }

    /// Registry counters plus live counts.
    pub async fn statistics(&self) -> SchedulerStatistics {
        let state = self.inner.state.lock().await;
        SchedulerStatistics {
            totals: state.registry.stats(),
            live_attacks: state.registry.live_count(),
            running_colonies: state.loops.len(),
            dead_letters: state.registry.dead_letters().count(),
        }
    }
}
