// ledger.rs — Ledger subcommands: show, verify.

use clap::Subcommand;
use rdm_ledger::LedgerEntry;
use rdm_lifecycle::{LifecycleController, LifecycleError};
use serde::Serialize;
use uuid::Uuid;

use super::{parse_id, Context};

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// Show a goal's ledger entries in order.
    Show {
        /// Goal ID.
        id: String,
    },
    /// Check a goal's ledger hash chain and sequence.
    Verify {
        /// Goal ID.
        id: String,
    },
}

#[derive(Serialize)]
struct VerifyReport {
    goal_id: Uuid,
    entries: usize,
    intact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

pub fn execute(cmd: &LedgerCommands, ctx: &Context) -> anyhow::Result<()> {
    let rdm = ctx.controller()?;

    match cmd {
        LedgerCommands::Show { id } => {
            let entries = rdm.ledger(parse_id(id)?)?;
            ctx.emit(&entries, |e| print_entries(e))
        }
        LedgerCommands::Verify { id } => {
            let report = verify(&rdm, parse_id(id)?)?;
            ctx.emit(&report, |r| {
                if r.intact {
                    println!(
                        "Ledger verified: {} entry(ies), hash chain intact.",
                        r.entries
                    );
                } else {
                    println!("INTEGRITY VIOLATION in ledger for {}:", r.goal_id);
                    if let Some(ref detail) = r.detail {
                        println!("  {}", detail);
                    }
                    println!();
                    println!("The ledger may have been tampered with.");
                }
            })?;
            if !report.intact {
                anyhow::bail!("Ledger integrity check failed");
            }
            Ok(())
        }
    }
}

fn verify(rdm: &LifecycleController, goal_id: Uuid) -> anyhow::Result<VerifyReport> {
    match rdm.verify_ledger(goal_id) {
        Ok(()) => Ok(VerifyReport {
            goal_id,
            entries: rdm.ledger(goal_id)?.len(),
            intact: true,
            detail: None,
        }),
        Err(e @ LifecycleError::LedgerIntegrity { .. }) => Ok(VerifyReport {
            goal_id,
            entries: 0,
            intact: false,
            detail: Some(e.to_string()),
        }),
        Err(e) => Err(e.into()),
    }
}

fn print_entries(entries: &[LedgerEntry]) {
    if entries.is_empty() {
        println!("No ledger entries.");
        return;
    }

    println!("{:<5} {:<18} {:<26} PAYLOAD", "SEQ", "EVENT", "TIMESTAMP");
    println!("{}", "-".repeat(90));

    for e in entries {
        println!(
            "{:<5} {:<18} {:<26} {}",
            e.sequence,
            e.event_type.to_string(),
            e.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            e.payload,
        );
    }
}
