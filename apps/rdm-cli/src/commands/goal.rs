// goal.rs — Goal subcommands: create, pledge, activate, status, list.

use clap::{Subcommand, ValueEnum};
use rdm_goal::{Goal, GoalState, NewGoal};
use rdm_lifecycle::{GoalStatus, LifecycleController};

use super::{parse_id, truncate, Context};

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a new goal.
    Create {
        /// What the goal is (e.g., "Run 5k three times a week").
        description: String,
        /// Tokens to pledge.
        #[arg(long)]
        pledge: u64,
        /// Days until the deadline.
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// How completion will be verified.
        #[arg(long, default_value = "self_verification")]
        verification: String,
        /// Impact tag (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Commit the pledge on a created goal.
    Pledge {
        /// Goal ID.
        id: String,
    },
    /// Start tracking a pledged goal.
    Activate {
        /// Goal ID.
        id: String,
    },
    /// Show details for one goal.
    Status {
        /// Goal ID.
        id: String,
    },
    /// List goals, newest first.
    List {
        /// Only goals in this state.
        #[arg(long, value_enum)]
        state: Option<StateArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateArg {
    Created,
    Pledged,
    Active,
    PendingVerification,
    Verified,
    Expired,
}

impl From<StateArg> for GoalState {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Created => GoalState::Created,
            StateArg::Pledged => GoalState::Pledged,
            StateArg::Active => GoalState::Active,
            StateArg::PendingVerification => GoalState::PendingVerification,
            StateArg::Verified => GoalState::Verified,
            StateArg::Expired => GoalState::Expired,
        }
    }
}

pub fn execute(cmd: &GoalCommands, ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;

    match cmd {
        GoalCommands::Create {
            description,
            pledge,
            days,
            verification,
            tags,
        } => {
            let goal = create_goal(&rdm, description, *pledge, *days, verification, tags)?;
            ctx.emit(&goal, |g| {
                println!("Goal created: {}", g.goal_id);
                println!("  Pledge:   {} tokens", g.pledge_amount);
                println!("  Deadline: {}", g.deadline.to_rfc3339());
            })
        }
        GoalCommands::Pledge { id } => {
            let goal = rdm.pledge(parse_id(id)?)?;
            ctx.emit(&goal, |g| println!("Goal {} is now {}", g.goal_id, g.state))
        }
        GoalCommands::Activate { id } => {
            let goal = rdm.activate(parse_id(id)?)?;
            ctx.emit(&goal, |g| println!("Goal {} is now {}", g.goal_id, g.state))
        }
        GoalCommands::Status { id } => {
            let status = rdm.status(parse_id(id)?)?;
            ctx.emit(&status, print_status)
        }
        GoalCommands::List { state } => {
            let goals = rdm.list(state.map(GoalState::from))?;
            ctx.emit(&goals, |g| print_table(g))
        }
    }
}

fn create_goal(
    rdm: &LifecycleController,
    description: &str,
    pledge: u64,
    days: u32,
    verification: &str,
    tags: &[String],
) -> anyhow::Result<Goal> {
    let spec = tags.iter().fold(
        NewGoal::new(description, pledge, days).with_verification_method(verification),
        |spec, tag| spec.with_tag(tag.as_str()),
    );
    Ok(rdm.create_goal(spec)?)
}

fn print_table(goals: &[Goal]) {
    if goals.is_empty() {
        println!("No goals found.");
        return;
    }

    println!(
        "{:<38} {:<30} {:<22} {:>7} {:<12}",
        "ID", "DESCRIPTION", "STATE", "PLEDGE", "DEADLINE"
    );
    println!("{}", "-".repeat(112));

    for g in goals {
        println!(
            "{:<38} {:<30} {:<22} {:>7} {:<12}",
            g.goal_id,
            truncate(&g.description, 28),
            g.state.to_string(),
            g.pledge_amount,
            g.deadline.format("%Y-%m-%d"),
        );
    }
    println!("\n{} goal(s) total.", goals.len());
}

fn print_status(s: &GoalStatus) {
    println!("Goal:         {}", s.goal_id);
    println!("Description:  {}", s.description);
    println!("State:        {}", s.state);
    println!("Pledge:       {} tokens", s.pledge_amount);
    println!("Verification: {}", s.verification_method);
    if !s.impact_tags.is_empty() {
        let tags: Vec<&str> = s.impact_tags.iter().map(String::as_str).collect();
        println!("Tags:         {}", tags.join(", "));
    }
    println!("Created:      {}", s.created_at.to_rfc3339());
    println!(
        "Deadline:     {} ({} day(s) remaining)",
        s.deadline.to_rfc3339(),
        s.days_remaining
    );
    println!("Reflections:  {}", s.reflection_count);
    if let Some(ref last) = s.last_reflection {
        println!("  Last:       #{} {:?}", last.sequence, last.status);
    }
    if let Some(ref settled) = s.settlement {
        println!();
        println!("Outcome:      {} ({})", settled.category, settled.completion);
        println!("Reasoning:    {}", settled.reasoning);
        println!(
            "Reward:       {} tokens ({})",
            settled.reward, settled.reward_share
        );
        println!(
            "Remorse:      {} tokens ({})",
            settled.remorse, settled.remorse_share
        );
        for line in &settled.bonus_lines {
            println!("  Bonus:      +{} {:?}", line.amount, line.kind);
        }
        println!("Received:     {} tokens", settled.total_received);
        println!("Badge:        {}", settled.badge);
    }
    if let Some(ref reference) = s.payment_reference {
        println!("Payment:      {}", reference);
    }
}
