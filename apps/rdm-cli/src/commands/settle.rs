// settle.rs — Check-ins, claims, settlement and the expiry sweep.

use clap::{Args, ValueEnum};
use rdm_goal::{ReflectionEntry, ReflectionSubmission};
use rdm_lifecycle::{LifecycleController, SettlementSummary};
use rdm_settlement::{EvidencePackage, ReflectionStatus, SelfAssessment, Settlement};
use serde::Serialize;
use uuid::Uuid;

use super::{parse_id, Context};

#[derive(Args)]
pub struct ReflectArgs {
    /// Goal ID.
    pub id: String,
    /// How things are going.
    #[arg(long, value_enum)]
    pub status: StatusArg,
    /// Check-in sequence; defaults to the next one.
    #[arg(long)]
    pub sequence: Option<u64>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub challenges: Option<String>,
}

#[derive(Args)]
pub struct ClaimArgs {
    /// Goal ID.
    pub id: String,
    /// Your own verdict.
    #[arg(long, value_enum)]
    pub assessment: AssessmentArg,
    /// Completion percentage from the evaluator (0-100).
    #[arg(long)]
    pub completion: f64,
    /// Evaluator confidence (0-100).
    #[arg(long)]
    pub confidence: Option<u8>,
    /// Peer verifier rating (0-100); requires --peer-source.
    #[arg(long, requires = "peer_source")]
    pub peer_score: Option<u8>,
    #[arg(long)]
    pub peer_source: Option<String>,
    /// Quantitative measurement score (0-100).
    #[arg(long)]
    pub measured: Option<u8>,
    /// Mark the approach as innovative.
    #[arg(long)]
    pub innovation: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    NotStarted,
    InProgress,
    Done,
    PartiallyDone,
    NotDone,
}

impl From<StatusArg> for ReflectionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::NotStarted => ReflectionStatus::NotStarted,
            StatusArg::InProgress => ReflectionStatus::InProgress,
            StatusArg::Done => ReflectionStatus::Done,
            StatusArg::PartiallyDone => ReflectionStatus::PartiallyDone,
            StatusArg::NotDone => ReflectionStatus::NotDone,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AssessmentArg {
    Done,
    PartiallyDone,
    NotDone,
}

impl From<AssessmentArg> for SelfAssessment {
    fn from(arg: AssessmentArg) -> Self {
        match arg {
            AssessmentArg::Done => SelfAssessment::Done,
            AssessmentArg::PartiallyDone => SelfAssessment::PartiallyDone,
            AssessmentArg::NotDone => SelfAssessment::NotDone,
        }
    }
}

/// A settled goal as printed by `settle` and `sweep`.
#[derive(Serialize)]
struct SettledGoal {
    goal_id: Uuid,
    #[serde(flatten)]
    summary: SettlementSummary,
}

impl From<&Settlement> for SettledGoal {
    fn from(s: &Settlement) -> Self {
        Self {
            goal_id: s.distribution.goal_id,
            summary: SettlementSummary::from(s),
        }
    }
}

pub fn reflect(args: &ReflectArgs, ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;
    let entry = record_reflection(&rdm, args)?;
    ctx.emit(&entry, |e| {
        println!("Reflection #{} recorded for {}", e.sequence, e.goal_id)
    })
}

pub fn claim(args: &ClaimArgs, ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;
    let goal_id = parse_id(&args.id)?;
    let goal = rdm.submit_claim(goal_id, evidence_from(goal_id, args))?;
    ctx.emit(&goal, |g| {
        println!("Claim submitted for {}; goal is {}", g.goal_id, g.state);
        println!("Run `rdm settle {}` to settle it.", g.goal_id);
    })
}

pub fn settle(id: &str, ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;
    let settlement = rdm.settle(parse_id(id)?)?;
    ctx.emit(&SettledGoal::from(&settlement), print_settled)
}

pub fn sweep(ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;
    let settled: Vec<SettledGoal> = rdm.sweep_expired()?.iter().map(SettledGoal::from).collect();
    ctx.emit(&settled, |all| {
        if all.is_empty() {
            println!("No overdue goals.");
            return;
        }
        for s in all {
            print_settled(s);
            println!();
        }
        println!("{} goal(s) expired.", all.len());
    })
}

fn record_reflection(
    rdm: &LifecycleController,
    args: &ReflectArgs,
) -> anyhow::Result<ReflectionEntry> {
    let goal_id = parse_id(&args.id)?;
    let sequence = match args.sequence {
        Some(seq) => seq,
        None => rdm.reflections(goal_id)?.last().map_or(1, |r| r.sequence + 1),
    };
    let mut submission = ReflectionSubmission::new(sequence, args.status.into());
    if let Some(ref notes) = args.notes {
        submission = submission.with_notes(notes.as_str());
    }
    if let Some(ref challenges) = args.challenges {
        submission = submission.with_challenges(challenges.as_str());
    }
    Ok(rdm.append_reflection(goal_id, submission)?)
}

fn evidence_from(goal_id: Uuid, args: &ClaimArgs) -> EvidencePackage {
    let mut evidence = EvidencePackage::new(goal_id, args.assessment.into(), args.completion);
    if let Some(confidence) = args.confidence {
        evidence = evidence.with_confidence(confidence);
    }
    if let (Some(score), Some(source)) = (args.peer_score, args.peer_source.as_ref()) {
        evidence = evidence.with_peer(score, source.as_str());
    }
    if let Some(score) = args.measured {
        evidence = evidence.with_quantitative(score);
    }
    if args.innovation {
        evidence = evidence.with_innovation();
    }
    evidence
}

fn print_settled(s: &SettledGoal) {
    let summary = &s.summary;
    println!("Goal {} settled: {}", s.goal_id, summary.category);
    println!("  Completion: {}", summary.completion);
    println!("  Reward:     {} tokens ({})", summary.reward, summary.reward_share);
    println!("  Remorse:    {} tokens ({})", summary.remorse, summary.remorse_share);
    if summary.bonus > 0 {
        println!("  Bonus:      {} tokens", summary.bonus);
    }
    println!("  Received:   {} tokens", summary.total_received);
    println!("  Badge:      {}", summary.badge);
}
