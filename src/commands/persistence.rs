//! Snapshot file commands

use super::{expect_no_args, Command, Context, Outcome};
use crate::error::Result;

pub struct Save;

impl Command for Save {
    fn name(&self) -> &'static str {
        "save"
    }

    fn usage(&self) -> &'static str {
        "save"
    }

    fn description(&self) -> &'static str {
        "write the collection to the snapshot file"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let count = ctx.snapshots.save_store(ctx.store)?;
        tracing::info!("Saved {} record(s) to {}", count, ctx.snapshots.path().display());
        Ok(Outcome::ok(format!(
            "Saved {} record(s) to {}",
            count,
            ctx.snapshots.path().display()
        )))
    }
}

pub struct Load;

impl Command for Load {
    fn name(&self) -> &'static str {
        "load"
    }

    fn usage(&self) -> &'static str {
        "load"
    }

    fn description(&self) -> &'static str {
        "reload the collection from the snapshot file"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let reloaded = match ctx.snapshots.reload_into(ctx.store)? {
            Some(reloaded) => reloaded,
            None => {
                return Ok(Outcome::fail(format!(
                    "Snapshot file {} not found",
                    ctx.snapshots.path().display()
                )))
            }
        };

        let mut message = format!("Loaded {} record(s)", reloaded.loaded);
        if !reloaded.skipped.is_empty() {
            message.push_str(&format!(
                ", skipped {} invalid:\n{}",
                reloaded.skipped.len(),
                reloaded.skipped.join("\n")
            ));
        }
        Ok(Outcome::ok(message))
    }
}
