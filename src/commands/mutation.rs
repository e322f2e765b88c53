//! Commands that change the collection

use std::cmp::Ordering;

use super::{expect_no_args, parse_draft, parse_key, usage_error, Command, Context, Outcome};
use crate::error::Result;
use crate::model::{HumanBeing, Key, RecordDraft};
use crate::store::Replacement;

/// Placeholder key for threshold records; the comparator ignores keys
const THRESHOLD_KEY: Key = 1;

/// `<key> field=value...`
fn key_and_draft(command: &dyn Command, args: &[String]) -> Result<(Key, RecordDraft)> {
    let key = parse_key(command, args)?;
    let draft = parse_draft(command, &args[1..])?;
    Ok((key, draft))
}

pub struct Add;

impl Command for Add {
    fn name(&self) -> &'static str {
        "add"
    }

    fn usage(&self) -> &'static str {
        "add {element}"
    }

    fn description(&self) -> &'static str {
        "add a new record under the next free key"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        let draft = parse_draft(self, args)?;
        let key = ctx.store.insert_new(|key| HumanBeing::create(key, draft))?;
        Ok(Outcome::ok(format!("HumanBeing added with key {}", key)))
    }
}

pub struct Insert;

impl Command for Insert {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn usage(&self) -> &'static str {
        "insert <key> {element}"
    }

    fn description(&self) -> &'static str {
        "add a new record under the given key"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        let (key, draft) = key_and_draft(self, args)?;
        let record = HumanBeing::create(key, draft)?;
        if ctx.store.insert(record)? {
            Ok(Outcome::ok(format!("HumanBeing inserted with key {}", key)))
        } else {
            Ok(Outcome::fail(format!("A record with key {} already exists", key)))
        }
    }
}

pub struct Update;

impl Command for Update {
    fn name(&self) -> &'static str {
        "update"
    }

    fn usage(&self) -> &'static str {
        "update <key> {element}"
    }

    fn description(&self) -> &'static str {
        "replace the record with the given key"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        let (key, draft) = key_and_draft(self, args)?;
        let record = HumanBeing::create(key, draft)?;
        if ctx.store.update(record)? {
            Ok(Outcome::ok(format!("HumanBeing with key {} updated", key)))
        } else {
            Ok(Outcome::fail(format!("No record with key {}", key)))
        }
    }
}

pub struct RemoveKey;

impl Command for RemoveKey {
    fn name(&self) -> &'static str {
        "remove_key"
    }

    fn usage(&self) -> &'static str {
        "remove_key <key>"
    }

    fn description(&self) -> &'static str {
        "remove the record with the given key"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        if args.len() != 1 {
            return Err(usage_error(self));
        }
        let key = parse_key(self, args)?;
        if ctx.store.remove_by_key(key)? {
            Ok(Outcome::ok(format!("HumanBeing with key {} removed", key)))
        } else {
            Ok(Outcome::fail(format!("No record with key {}", key)))
        }
    }
}

pub struct Clear;

impl Command for Clear {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn usage(&self) -> &'static str {
        "clear"
    }

    fn description(&self) -> &'static str {
        "remove every record"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        ctx.store.clear()?;
        Ok(Outcome::ok("Collection cleared"))
    }
}

/// Remove every record ordered `direction` relative to the threshold
fn remove_by_threshold(
    command: &dyn Command,
    args: &[String],
    ctx: &mut Context<'_>,
    direction: Ordering,
) -> Result<Outcome> {
    let draft = parse_draft(command, args)?;
    let threshold = HumanBeing::create(THRESHOLD_KEY, draft)?;
    let removed = ctx
        .store
        .remove_where(|record| record.compare(&threshold) == direction)?;
    Ok(Outcome::ok(format!("Removed {} record(s)", removed)))
}

pub struct RemoveGreater;

impl Command for RemoveGreater {
    fn name(&self) -> &'static str {
        "remove_greater"
    }

    fn usage(&self) -> &'static str {
        "remove_greater {element}"
    }

    fn description(&self) -> &'static str {
        "remove every record greater than the given one"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        remove_by_threshold(self, args, ctx, Ordering::Greater)
    }
}

pub struct RemoveLower;

impl Command for RemoveLower {
    fn name(&self) -> &'static str {
        "remove_lower"
    }

    fn usage(&self) -> &'static str {
        "remove_lower {element}"
    }

    fn description(&self) -> &'static str {
        "remove every record lower than the given one"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        remove_by_threshold(self, args, ctx, Ordering::Less)
    }
}

pub struct ReplaceIfGreater;

impl Command for ReplaceIfGreater {
    fn name(&self) -> &'static str {
        "replace_if_greater"
    }

    fn usage(&self) -> &'static str {
        "replace_if_greater <key> {element}"
    }

    fn description(&self) -> &'static str {
        "replace the record with the given key if the new one is greater"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        let (key, draft) = key_and_draft(self, args)?;
        let candidate = HumanBeing::create(key, draft)?;

        let replacement = ctx
            .store
            .replace_where(candidate, |old, new| new.compare(old) == Ordering::Greater)?;
        Ok(match replacement {
            Replacement::Absent => Outcome::fail(format!("No record with key {}", key)),
            Replacement::Replaced => Outcome::ok(format!("HumanBeing with key {} replaced", key)),
            Replacement::Rejected => Outcome::ok(format!(
                "HumanBeing with key {} kept: the new value is not greater",
                key
            )),
        })
    }
}
