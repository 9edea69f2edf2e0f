//! Quill session simulator
//!
//! Drives one document session with a seeded stream of user actions and
//! service replies, including replies that arrive after the user deleted
//! or cancelled the slice they were meant for.
//!
//! Invariants checked after every operation:
//! - Slice ids are unique and deleted slices never come back
//! - Accepted text is never blank
//! - Export is exactly the accepted text joined by blank lines
//! - No slice is left loading once its request settled
//! - An open alternative exists iff the slice is proposed or editing
//! - Late responses never land on a deleted or cancelled slice

use quill_core::{
    ActionOutcome, ClientError, ExtendOutcome, GenerationOrchestrator, Ignored, QuillConfig,
    QuillError, SliceAction, SliceId, SliceState, SLICE_SEPARATOR,
};
use quill_test_utils::{text_payload, GatedClient, Reply};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::future::Future;

const WORDS: &[&str] = &[
    "the", "lighthouse", "keeper", "watched", "storm", "rolled", "over", "quiet", "harbour",
    "ships", "waited", "for", "morning", "light", "well-worn", "stairs", "lamp", "-", "sea",
];

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of user operations to simulate
    pub operations: u64,
    /// Stop on the first violation
    pub stop_on_first_violation: bool,
    /// Topic of the simulated document
    pub topic: String,
    /// Session configuration
    pub quill: QuillConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            operations: 1000,
            stop_on_first_violation: true,
            topic: "Lighthouses".to_string(),
            quill: QuillConfig::default(),
        }
    }
}

/// Something the user does while a slice request is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interference {
    /// Delete the loading slice
    Delete,
    /// Cancel the loading slice's request
    Cancel,
    /// Fire a second generation action at the loading slice
    Compete(SliceAction),
}

/// Simulated user operation
#[derive(Debug, Clone)]
pub enum SimulatedOperation {
    ExtendDocument,
    Revise { slice: SliceId, action: SliceAction },
    Interleaved {
        slice: SliceId,
        action: SliceAction,
        interference: Interference,
    },
    Edit(SliceId),
    EditInput(SliceId, String),
    Accept(SliceId),
    Discard(SliceId),
    Cancel(SliceId),
    Delete(SliceId),
}

/// A violation detected during simulation
#[derive(Debug, Clone)]
pub enum Violation {
    DuplicateSliceId { id: SliceId },
    ResurrectedSlice { id: SliceId },
    BlankAcceptedText { id: SliceId },
    ExportMismatch { expected: String, actual: String },
    SliceStuckLoading { id: SliceId },
    AlternativeMismatch { id: SliceId, state: SliceState },
    ExtendIndicatorStuck,
    FailedExtendChangedDocument,
    LateResponseApplied { operation: SimulatedOperation },
    UnexpectedOutcome {
        operation: SimulatedOperation,
        outcome: String,
    },
}

/// Statistics for simulation
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    pub operations: u64,
    pub applied: u64,
    pub ignored: u64,
    pub failed: u64,
    pub replies: u64,
    pub stale_responses: u64,
    pub slices_inserted: u64,
    pub slices_deleted: u64,
}

/// Final report from simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    pub violations: Vec<Violation>,
    pub final_slices: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let s = &self.stats;

        report.push_str("=== Quill Simulator Report ===\n\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Operations: {}", s.operations);
        let _ = writeln!(report, "Applied: {}", s.applied);
        let _ = writeln!(report, "Ignored: {}", s.ignored);
        let _ = writeln!(report, "Failed Requests: {}", s.failed);
        let _ = writeln!(report, "Service Replies: {}", s.replies);
        let _ = writeln!(report, "Stale Responses Dropped: {}", s.stale_responses);
        let _ = writeln!(report, "Slices Inserted: {}", s.slices_inserted);
        let _ = writeln!(report, "Slices Deleted: {}", s.slices_deleted);
        let _ = writeln!(report, "Final Slices: {}", self.final_slices);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {v:?}", i + 1);
            }
        }

        let _ = write!(
            report,
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the Quill simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let quill =
        GenerationOrchestrator::with_prompt(GatedClient::new(), config.quill.clone(), &config.topic);

    let mut sim = Session {
        quill: &quill,
        stats: SimulatorStats::default(),
        violations: Vec::new(),
        deleted: HashSet::new(),
    };

    for _ in 0..config.operations {
        let operation = generate_operation(&mut rng, &quill);
        sim.stats.operations += 1;
        tracing::debug!(?operation, "simulating");

        let before = sim.violations.len();
        sim.execute(&mut rng, operation).await;
        sim.check_invariants();

        if config.stop_on_first_violation && sim.violations.len() > before {
            tracing::warn!(violations = sim.violations.len(), "stopping on violation");
            break;
        }
    }

    let Session {
        stats, violations, ..
    } = sim;
    SimulatorReport {
        final_slices: quill.slice_ids().len(),
        config,
        stats,
        violations,
    }
}

struct Session<'a> {
    quill: &'a GenerationOrchestrator<GatedClient>,
    stats: SimulatorStats,
    violations: Vec<Violation>,
    deleted: HashSet<SliceId>,
}

impl Session<'_> {
    async fn execute(&mut self, rng: &mut StdRng, operation: SimulatedOperation) {
        let quill = self.quill;
        match &operation {
            SimulatedOperation::ExtendDocument => {
                let before = quill.export_text();
                let reply = generate_reply(rng, true);
                match self.drive(quill.extend_document(), reply).await {
                    Ok(ExtendOutcome::Appended(ids)) => {
                        self.stats.applied += 1;
                        self.stats.slices_inserted += ids.len() as u64;
                    }
                    outcome => {
                        if outcome.is_ok() {
                            self.stats.ignored += 1;
                        } else {
                            self.stats.failed += 1;
                        }
                        if quill.export_text() != before {
                            self.violations.push(Violation::FailedExtendChangedDocument);
                        }
                    }
                }
            }
            SimulatedOperation::Revise { slice, action } => {
                let reply = generate_reply(rng, false);
                let result = self.drive(quill.revise(*slice, *action), reply).await;
                self.record(&operation, result);
            }
            SimulatedOperation::Interleaved {
                slice,
                action,
                interference,
            } => {
                let reply = generate_reply(rng, false);
                self.interleave(&operation, *slice, *action, *interference, reply)
                    .await;
            }
            SimulatedOperation::Edit(id) => self.record(&operation, Ok(quill.edit(*id))),
            SimulatedOperation::EditInput(id, text) => {
                self.record(&operation, Ok(quill.on_edit_input(*id, text.as_str())));
            }
            SimulatedOperation::Accept(id) => self.record(&operation, Ok(quill.accept(*id))),
            SimulatedOperation::Discard(id) => self.record(&operation, Ok(quill.discard(*id))),
            SimulatedOperation::Cancel(id) => self.record(&operation, Ok(quill.cancel(*id))),
            SimulatedOperation::Delete(id) => {
                let outcome = quill.delete(*id);
                if outcome.is_applied() {
                    self.deleted.insert(*id);
                    self.stats.slices_deleted += 1;
                }
                self.record(&operation, Ok(outcome));
            }
        }
    }

    /// Run `op`, answering the request it makes (if any) with `reply`
    async fn drive<F: Future>(&mut self, op: F, reply: Reply) -> F::Output {
        let quill = self.quill;
        let client = quill.client();
        tokio::pin!(op);
        let mut reply = Some(reply);
        loop {
            tokio::select! {
                biased;
                out = &mut op => return out,
                () = client.wait_for_requests(1), if reply.is_some() => {
                    if let Some(reply) = reply.take() {
                        client.release(reply);
                        self.stats.replies += 1;
                    }
                }
            }
        }
    }

    /// Run a slice action and interfere with it while it is loading
    async fn interleave(
        &mut self,
        operation: &SimulatedOperation,
        id: SliceId,
        action: SliceAction,
        interference: Interference,
        reply: Reply,
    ) {
        let quill = self.quill;
        let client = quill.client();

        let (result, competing) = tokio::join!(quill.revise(id, action), async {
            client.wait_for_requests(1).await;
            let competing = match interference {
                Interference::Delete => Some(quill.delete(id)),
                Interference::Cancel => Some(quill.cancel(id)),
                Interference::Compete(other) => quill.revise(id, other).await.ok(),
            };
            client.release(reply);
            competing
        });
        self.stats.replies += 1;

        match interference {
            Interference::Delete | Interference::Cancel => {
                if interference == Interference::Delete {
                    self.deleted.insert(id);
                    self.stats.slices_deleted += 1;
                }
                if matches!(competing, Some(ActionOutcome::Applied(_)))
                    && matches!(result, Ok(ActionOutcome::Ignored(Ignored::StaleResponse(_))))
                {
                    self.stats.applied += 1;
                    self.stats.stale_responses += 1;
                } else {
                    self.violations.push(Violation::LateResponseApplied {
                        operation: operation.clone(),
                    });
                }
            }
            Interference::Compete(_) => {
                if !matches!(
                    competing,
                    Some(ActionOutcome::Ignored(Ignored::InvalidTransition {
                        state: SliceState::Loading,
                        ..
                    }))
                ) {
                    self.violations.push(Violation::UnexpectedOutcome {
                        operation: operation.clone(),
                        outcome: format!("competing action: {competing:?}"),
                    });
                }
                self.record(operation, result);
            }
        }
    }

    fn record(&mut self, operation: &SimulatedOperation, result: Result<ActionOutcome, QuillError>) {
        match result {
            Ok(ActionOutcome::Applied(_)) => self.stats.applied += 1,
            Ok(ActionOutcome::Ignored(Ignored::StaleResponse(_))) => {
                // Nothing interfered, so nothing can be stale.
                self.violations.push(Violation::UnexpectedOutcome {
                    operation: operation.clone(),
                    outcome: "stale response without interference".to_string(),
                });
            }
            Ok(ActionOutcome::Ignored(_)) => self.stats.ignored += 1,
            Err(_) => self.stats.failed += 1,
        }
    }

    fn check_invariants(&mut self) {
        let quill = self.quill;
        let snapshot = quill.snapshot();

        let mut ids = HashSet::new();
        for view in &snapshot.slices {
            if !ids.insert(view.id) {
                self.violations.push(Violation::DuplicateSliceId { id: view.id });
            }
            if self.deleted.contains(&view.id) {
                self.violations.push(Violation::ResurrectedSlice { id: view.id });
            }
            if view.current_text.trim().is_empty() {
                self.violations.push(Violation::BlankAcceptedText { id: view.id });
            }
            if view.state == SliceState::Loading {
                self.violations.push(Violation::SliceStuckLoading { id: view.id });
            }
            let open = matches!(view.state, SliceState::Proposed | SliceState::Editing);
            if open != view.pending_text.is_some() {
                self.violations.push(Violation::AlternativeMismatch {
                    id: view.id,
                    state: view.state,
                });
            }
        }

        let expected = snapshot
            .slices
            .iter()
            .map(|v| v.current_text.as_str())
            .collect::<Vec<_>>()
            .join(SLICE_SEPARATOR);
        let actual = quill.export_text();
        if expected != actual {
            self.violations
                .push(Violation::ExportMismatch { expected, actual });
        }

        if quill.is_extending() {
            self.violations.push(Violation::ExtendIndicatorStuck);
        }
    }
}

/// Generate a random user operation against the current document
fn generate_operation(
    rng: &mut StdRng,
    quill: &GenerationOrchestrator<GatedClient>,
) -> SimulatedOperation {
    let ids = quill.slice_ids();
    if ids.is_empty() || rng.gen_bool(0.15) {
        return SimulatedOperation::ExtendDocument;
    }

    let id = ids[rng.gen_range(0..ids.len())];
    let idle = quill.view(id).is_some_and(|v| v.state == SliceState::Idle);

    match rng.gen_range(0..10) {
        0..=2 => {
            let action = generation_action(rng);
            if idle && rng.gen_bool(0.3) {
                let interference = match rng.gen_range(0..3) {
                    0 => Interference::Delete,
                    1 => Interference::Cancel,
                    _ => Interference::Compete(generation_action(rng)),
                };
                SimulatedOperation::Interleaved {
                    slice: id,
                    action,
                    interference,
                }
            } else {
                SimulatedOperation::Revise { slice: id, action }
            }
        }
        3 => SimulatedOperation::Edit(id),
        4 => SimulatedOperation::EditInput(id, sentence(rng)),
        5 | 6 => SimulatedOperation::Accept(id),
        7 => SimulatedOperation::Discard(id),
        8 => SimulatedOperation::Cancel(id),
        _ => {
            // Occasionally target an id that no longer exists
            if rng.gen_bool(0.2) {
                SimulatedOperation::Delete(SliceId::new())
            } else {
                SimulatedOperation::Delete(id)
            }
        }
    }
}

fn generation_action(rng: &mut StdRng) -> SliceAction {
    match rng.gen_range(0..3) {
        0 => SliceAction::Summarize,
        1 => SliceAction::Regenerate,
        _ => SliceAction::ExtendSlice,
    }
}

/// Generate a service reply; document extensions may span paragraphs
fn generate_reply(rng: &mut StdRng, paragraphs: bool) -> Reply {
    match rng.gen_range(0..20) {
        0 | 1 => Err(ClientError::Transport("simulated outage".to_string())),
        2 => Err(ClientError::Timeout { duration_secs: 30 }),
        3 => Ok(json!({ "error": "unrecognised" })),
        4 => Ok(text_payload(" - \n\n ")),
        _ => {
            let count = if paragraphs { rng.gen_range(1..=3) } else { 1 };
            let text = (0..count)
                .map(|_| sentence(rng))
                .collect::<Vec<_>>()
                .join("\n\n");
            Ok(text_payload(&text))
        }
    }
}

fn sentence(rng: &mut StdRng) -> String {
    let len = rng.gen_range(1..8);
    let mut words: Vec<&str> = (0..len)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect();
    if rng.gen_bool(0.1) {
        words.clear();
    }
    let mut text = words.join(" ");
    if !text.is_empty() {
        text.push('.');
    }
    text
}
