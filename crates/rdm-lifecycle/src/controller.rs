// controller.rs — LifecycleController: drives goals from creation to settlement.
//
// Every mutating operation on a goal runs inside that goal's exclusive
// section (GoalLocks) and commits through the store's compare-and-set.
// Different goals never share a section.
//
// The ledger entry for a step is written before the goal record is
// committed. Pledge, activation, claim and payment entries go through
// `record_once`, so a retry after a failed commit reuses the entry already
// on disk and the ledger never lacks a committed transition.
//
// Settlement order:
//   1. evaluate → distribute → badge   (pure, safe to recompute)
//   2. ledger.record_terminal          (at most one terminal entry per goal)
//   3. store.compare_and_set           (goal becomes Verified / Expired)
//   4. events, then payment
//
// If step 3 fails the ledger already holds the terminal entry. The next
// settle call finds it and commits the recorded settlement instead of
// computing a new one, so a goal is settled exactly once no matter how
// often the request is retried.

use std::path::Path;
use std::sync::Arc;

use rdm_goal::{
    EventDispatcher, Goal, GoalEvent, GoalState, GoalStore, JsonGoalStore, LogSink, NewGoal,
    NotificationSink, ReflectionEntry, ReflectionLog, ReflectionSubmission,
};
use rdm_ledger::{LedgerEntry, LedgerEventType, LedgerRecorder};
use rdm_settlement::{EvidencePackage, Settlement, SettlementEngine};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::{PledgeConfig, RdmConfig, StoreLayout};
use crate::error::LifecycleError;
use crate::locks::GoalLocks;
use crate::payment::{PaymentProvider, TransferReceipt, TransferRequest};
use crate::status::GoalStatus;

pub struct LifecycleController {
    store: Box<dyn GoalStore>,
    reflections: ReflectionLog,
    ledger: LedgerRecorder,
    engine: SettlementEngine,
    pledge: PledgeConfig,
    locks: GoalLocks,
    clock: Arc<dyn Clock>,
    events: EventDispatcher,
    payments: Option<Box<dyn PaymentProvider>>,
}

impl LifecycleController {
    pub fn new(
        store: Box<dyn GoalStore>,
        reflections: ReflectionLog,
        ledger: LedgerRecorder,
        config: &RdmConfig,
    ) -> Self {
        Self {
            store,
            reflections,
            ledger,
            engine: SettlementEngine::new(&config.settlement()),
            pledge: config.pledge.clone(),
            locks: GoalLocks::new(config.lifecycle.lock_timeout()),
            clock: Arc::new(SystemClock),
            events: EventDispatcher::new(),
            payments: None,
        }
    }

    /// Open the file-backed stores of a project layout, with a JSONL event
    /// log at `layout.events_log`.
    pub fn open(layout: &StoreLayout, config: &RdmConfig) -> Result<Self, LifecycleError> {
        let store = JsonGoalStore::new(&layout.goals_dir)?;
        let reflections = ReflectionLog::open(&layout.reflections_dir)?;
        let ledger = LedgerRecorder::open(&layout.ledger_dir)?;
        Ok(Self::new(Box::new(store), reflections, ledger, config)
            .with_sink(Box::new(LogSink::new(&layout.events_log))))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_payment_provider(mut self, provider: Box<dyn PaymentProvider>) -> Self {
        self.payments = Some(provider);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.events.add_sink(sink);
        self
    }

    pub fn ledger_dir(&self) -> &Path {
        self.ledger.dir()
    }

    // ── Lifecycle operations ────────────────────────────────────

    /// Record a new goal in the Created state.
    pub fn create_goal(&self, spec: NewGoal) -> Result<Goal, LifecycleError> {
        let now = self.clock.now();
        let goal = Goal::new(spec, now)?;
        self.ledger.record_once(
            goal.goal_id,
            LedgerEventType::GoalCreated,
            serde_json::json!({
                "description": goal.description,
                "pledge_amount": goal.pledge_amount,
                "duration_days": goal.duration_days,
                "deadline": goal.deadline,
                "verification_method": goal.verification_method,
                "impact_tags": goal.impact_tags,
            }),
            now,
        )?;
        self.store.insert(&goal)?;
        tracing::info!(goal_id = %goal.goal_id, pledge = goal.pledge_amount, deadline = %goal.deadline, "goal created");
        self.events.dispatch(&GoalEvent::goal_created(&goal));
        Ok(goal)
    }

    /// Created → Pledged. The pledge amount must be within the configured bounds.
    pub fn pledge(&self, goal_id: Uuid) -> Result<Goal, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load_live(goal_id)?;
        if goal.state == GoalState::Created {
            self.pledge.validate(goal.pledge_amount)?;
        }
        let payload = serde_json::json!({ "pledge_amount": goal.pledge_amount });
        self.advance(goal, GoalState::Pledged, LedgerEventType::Pledged, payload)
    }

    /// Pledged → Active. Reflections are accepted from here on.
    pub fn activate(&self, goal_id: Uuid) -> Result<Goal, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load_live(goal_id)?;
        let payload = serde_json::json!({ "deadline": goal.deadline });
        self.advance(goal, GoalState::Active, LedgerEventType::Activated, payload)
    }

    /// Append a check-in to an Active goal.
    pub fn append_reflection(
        &self,
        goal_id: Uuid,
        submission: ReflectionSubmission,
    ) -> Result<ReflectionEntry, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load_live(goal_id)?;
        if goal.state != GoalState::Active {
            return Err(LifecycleError::InvalidTransition {
                goal_id,
                from: goal.state.to_string(),
                to: "reflection".to_string(),
            });
        }

        let now = self.clock.now();
        let entry = self.reflections.append(goal_id, submission, now)?;
        tracing::info!(%goal_id, sequence = entry.sequence, status = ?entry.status, "reflection recorded");
        self.events.dispatch(&GoalEvent::ReflectionAppended {
            goal_id,
            sequence: entry.sequence,
            status: entry.status,
            timestamp: now,
        });
        Ok(entry)
    }

    /// Active → PendingVerification, accepting the evidence for settlement.
    ///
    /// The evidence is bound to `goal_id` regardless of the ID it carries.
    pub fn submit_claim(
        &self,
        goal_id: Uuid,
        mut evidence: EvidencePackage,
    ) -> Result<Goal, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load(goal_id)?;
        if goal.state == GoalState::PendingVerification || goal.state.is_terminal() {
            return Err(LifecycleError::AlreadyClaimed {
                goal_id,
                state: goal.state.to_string(),
            });
        }
        let goal = self.expire_if_due(goal)?;

        evidence.goal_id = goal_id;
        if evidence.completion().is_none() {
            return Err(LifecycleError::MissingEvidence { goal_id });
        }

        let now = self.clock.now();
        let from = goal.state;
        let mut next = goal;
        next.transition(GoalState::PendingVerification, now)?;

        let write = self.ledger.record_once(
            goal_id,
            LedgerEventType::ClaimSubmitted,
            serde_json::to_value(&evidence)?,
            now,
        )?;
        if !write.created {
            // An earlier attempt recorded its claim but never committed it.
            tracing::info!(%goal_id, "resuming claim from recorded ledger entry");
            evidence = write.entry.payload_as()?;
        }
        next.evidence = Some(evidence.clone());
        next.claimed_at = Some(write.entry.timestamp);
        let committed = self.store.compare_and_set(&next)?;

        tracing::info!(%goal_id, self_assessment = ?evidence.self_assessment, "completion claim accepted");
        self.events.dispatch(&GoalEvent::goal_state_changed(
            goal_id,
            from,
            committed.state,
            now,
        ));
        Ok(committed)
    }

    /// Settle a goal exactly once.
    ///
    /// - PendingVerification: evaluate the claim and commit Verified.
    /// - Overdue without a claim: commit the expiry settlement.
    /// - Already Verified/Expired: return the recorded settlement unchanged.
    pub fn settle(&self, goal_id: Uuid) -> Result<Settlement, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load(goal_id)?;

        if goal.state.is_terminal() {
            return self.replay(goal);
        }
        if goal.is_due_for_expiry(self.clock.now()) {
            return self.settle_expired(goal);
        }
        if goal.state != GoalState::PendingVerification {
            return Err(LifecycleError::InvalidTransition {
                goal_id,
                from: goal.state.to_string(),
                to: GoalState::Verified.to_string(),
            });
        }

        if let Some(recorded) = self.ledger.terminal(goal_id)? {
            tracing::info!(%goal_id, "resuming settlement from recorded ledger entry");
            return self.commit_recorded(goal, &recorded);
        }

        let evidence = goal
            .evidence
            .as_ref()
            .ok_or(LifecycleError::MissingEvidence { goal_id })?;
        let reflections = self.reflections.statuses(goal_id)?;
        let settlement = self
            .engine
            .settle(goal.pledge_amount, evidence, &reflections)?;
        tracing::debug!(
            %goal_id,
            category = %settlement.outcome.category,
            completion = %settlement.outcome.completion,
            confidence = settlement.outcome.confidence,
            reasoning = %settlement.outcome.reasoning,
            "claim evaluated"
        );
        self.commit_terminal(goal, settlement, LedgerEventType::Verified)
    }

    /// Settle an overdue goal as expired. A goal that is already settled
    /// returns its recorded settlement.
    pub fn expire(&self, goal_id: Uuid) -> Result<Settlement, LifecycleError> {
        let _guard = self.locks.acquire(goal_id)?;
        let goal = self.load(goal_id)?;
        if goal.state.is_terminal() {
            return self.replay(goal);
        }
        if !goal.is_due_for_expiry(self.clock.now()) {
            return Err(LifecycleError::InvalidTransition {
                goal_id,
                from: goal.state.to_string(),
                to: GoalState::Expired.to_string(),
            });
        }
        self.settle_expired(goal)
    }

    /// Expire every overdue goal that has no accepted claim.
    ///
    /// Goals that fail with a retryable error are skipped and left for the
    /// next sweep. Fatal errors stop the sweep.
    pub fn sweep_expired(&self) -> Result<Vec<Settlement>, LifecycleError> {
        let now = self.clock.now();
        let mut settled = Vec::new();
        for goal in self.store.list()? {
            if !goal.is_due_for_expiry(now) {
                continue;
            }
            match self.expire(goal.goal_id) {
                Ok(settlement) => settled.push(settlement),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(goal_id = %goal.goal_id, kind = %e.kind(), "expiry skipped: {}", e)
                }
            }
        }
        if !settled.is_empty() {
            tracing::info!(count = settled.len(), "expired overdue goals");
        }
        Ok(settled)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn goal(&self, goal_id: Uuid) -> Result<Goal, LifecycleError> {
        self.load(goal_id)
    }

    pub fn status(&self, goal_id: Uuid) -> Result<GoalStatus, LifecycleError> {
        let goal = self.load(goal_id)?;
        let reflections = self.reflections.list(goal_id)?;
        Ok(GoalStatus::new(&goal, &reflections, self.clock.now()))
    }

    /// All goals (newest first), optionally filtered by state.
    pub fn list(&self, state: Option<GoalState>) -> Result<Vec<Goal>, LifecycleError> {
        Ok(match state {
            Some(state) => self.store.list_by_state(state)?,
            None => self.store.list()?,
        })
    }

    pub fn reflections(&self, goal_id: Uuid) -> Result<Vec<ReflectionEntry>, LifecycleError> {
        Ok(self.reflections.list(goal_id)?)
    }

    pub fn ledger(&self, goal_id: Uuid) -> Result<Vec<LedgerEntry>, LifecycleError> {
        Ok(self.ledger.entries(goal_id)?)
    }

    /// Check a goal's ledger chain. A broken chain is `LedgerIntegrity`.
    pub fn verify_ledger(&self, goal_id: Uuid) -> Result<(), LifecycleError> {
        Ok(self.ledger.verify_chain(goal_id)?)
    }

    // ── Internals ───────────────────────────────────────────────

    fn load(&self, goal_id: Uuid) -> Result<Goal, LifecycleError> {
        self.store
            .get(goal_id)?
            .ok_or(LifecycleError::NotFound(goal_id))
    }

    /// Load a goal, applying expiry first if its deadline has passed.
    fn load_live(&self, goal_id: Uuid) -> Result<Goal, LifecycleError> {
        let goal = self.load(goal_id)?;
        self.expire_if_due(goal)
    }

    /// Pass the goal through unchanged unless it is overdue, in which case
    /// settle it as expired and report GoalExpired.
    fn expire_if_due(&self, goal: Goal) -> Result<Goal, LifecycleError> {
        if !goal.is_due_for_expiry(self.clock.now()) {
            return Ok(goal);
        }
        let goal_id = goal.goal_id;
        let deadline = goal.deadline;
        self.settle_expired(goal)?;
        Err(LifecycleError::GoalExpired { goal_id, deadline })
    }

    /// Record a non-terminal forward transition in the ledger, then commit it.
    fn advance(
        &self,
        goal: Goal,
        next_state: GoalState,
        event_type: LedgerEventType,
        payload: serde_json::Value,
    ) -> Result<Goal, LifecycleError> {
        let now = self.clock.now();
        let goal_id = goal.goal_id;
        let from = goal.state;
        let mut next = goal;
        next.transition(next_state, now)?;
        let write = self.ledger.record_once(goal_id, event_type, payload, now)?;
        if !write.created {
            tracing::info!(%goal_id, event = %event_type, "committing previously recorded ledger entry");
        }
        let committed = self.store.compare_and_set(&next)?;
        tracing::info!(%goal_id, from = %from, to = %next_state, "goal state changed");
        self.events
            .dispatch(&GoalEvent::goal_state_changed(goal_id, from, next_state, now));
        Ok(committed)
    }

    fn settle_expired(&self, goal: Goal) -> Result<Settlement, LifecycleError> {
        let settlement = self.engine.settle_expired(goal.goal_id, goal.pledge_amount)?;
        self.commit_terminal(goal, settlement, LedgerEventType::ExpiredFailed)
    }

    /// Write the terminal ledger entry, then commit whichever settlement the
    /// ledger holds. If another attempt got there first, its settlement wins.
    fn commit_terminal(
        &self,
        goal: Goal,
        settlement: Settlement,
        event_type: LedgerEventType,
    ) -> Result<Settlement, LifecycleError> {
        settlement.distribution.verify()?;
        let write = self.ledger.record_terminal(
            goal.goal_id,
            event_type,
            serde_json::to_value(&settlement)?,
            self.clock.now(),
        )?;
        self.commit_recorded(goal, &write.entry)
    }

    /// Move the goal to the terminal state named by a ledger entry and
    /// attach the settlement stored in it.
    fn commit_recorded(
        &self,
        goal: Goal,
        recorded: &LedgerEntry,
    ) -> Result<Settlement, LifecycleError> {
        let goal_id = goal.goal_id;
        let settlement: Settlement = recorded.payload_as()?;
        settlement.distribution.verify()?;

        let target = match recorded.event_type {
            LedgerEventType::ExpiredFailed => GoalState::Expired,
            _ => GoalState::Verified,
        };
        let now = self.clock.now();
        let from = goal.state;
        let mut next = goal;
        next.transition(target, now)?;
        next.settlement = Some(settlement.clone());
        let committed = self.store.compare_and_set(&next)?;

        let d = &settlement.distribution;
        tracing::info!(
            %goal_id,
            state = %target,
            category = %settlement.outcome.category,
            completion = %d.completion,
            reward = d.reward,
            remorse = d.remorse,
            bonus = d.bonus,
            badge = %settlement.badge.tier,
            "goal settled"
        );
        self.events
            .dispatch(&GoalEvent::goal_state_changed(goal_id, from, target, now));
        self.events.dispatch(&GoalEvent::goal_settled(&settlement, now));

        self.ensure_payment(committed)?;
        Ok(settlement)
    }

    /// Return the recorded settlement of a terminal goal, retrying payment
    /// if it has not gone through yet.
    fn replay(&self, goal: Goal) -> Result<Settlement, LifecycleError> {
        let goal_id = goal.goal_id;
        let settlement = match goal.settlement.clone() {
            Some(s) => s,
            None => self
                .ledger
                .terminal(goal_id)?
                .ok_or_else(|| {
                    LifecycleError::retryable(format!(
                        "goal {} is {} but has no recorded settlement",
                        goal_id, goal.state
                    ))
                })?
                .payload_as()?,
        };
        tracing::debug!(%goal_id, state = %goal.state, "settlement replayed");
        self.ensure_payment(goal)?;
        Ok(settlement)
    }

    /// Pay out a settled goal once. A transfer is only attempted while the
    /// goal has no payment reference and the ledger holds no payment entry;
    /// a failed transfer is logged and left for the next settle call.
    fn ensure_payment(&self, goal: Goal) -> Result<Goal, LifecycleError> {
        let Some(provider) = self.payments.as_deref() else {
            return Ok(goal);
        };
        if goal.payment_reference.is_some() {
            return Ok(goal);
        }
        let Some(settlement) = goal.settlement.as_ref() else {
            return Ok(goal);
        };

        let goal_id = goal.goal_id;
        let now = self.clock.now();
        let recorded = match self.ledger.find(goal_id, LedgerEventType::PaymentRecorded)? {
            Some(entry) => {
                tracing::info!(%goal_id, "resuming payment from recorded ledger entry");
                entry
            }
            None => {
                let request = TransferRequest::for_distribution(&settlement.distribution);
                let receipt = match provider.transfer(&request) {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        tracing::warn!(%goal_id, provider = provider.name(), "payment transfer failed, will retry on next settle: {}", e);
                        return Ok(goal);
                    }
                };
                self.ledger
                    .record_once(
                        goal_id,
                        LedgerEventType::PaymentRecorded,
                        serde_json::json!({
                            "provider": provider.name(),
                            "reference": receipt.reference,
                            "amount": receipt.amount,
                            "idempotency_key": request.idempotency_key,
                        }),
                        now,
                    )?
                    .entry
            }
        };
        let receipt: TransferReceipt = recorded.payload_as()?;

        let mut next = goal;
        next.payment_reference = Some(receipt.reference.clone());
        next.updated_at = now;
        let committed = self.store.compare_and_set(&next)?;
        tracing::info!(%goal_id, reference = %receipt.reference, amount = receipt.amount, "payment recorded");
        self.events.dispatch(&GoalEvent::PaymentRecorded {
            goal_id,
            reference: receipt.reference,
            amount: receipt.amount,
            timestamp: now,
        });
        Ok(committed)
    }
}

