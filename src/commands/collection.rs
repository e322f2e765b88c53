//! Read-only commands over the collection

use super::{expect_no_args, usage_error, Command, Context, Outcome};
use crate::error::Result;
use crate::model::WeaponType;

pub struct Help;

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn usage(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "show the available commands"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let lines: Vec<String> = ctx
            .registry
            .commands()
            .map(|c| format!(" {:<45}{}", c.usage(), c.description()))
            .collect();
        Ok(Outcome::ok(lines.join("\n")))
    }
}

pub struct Info;

impl Command for Info {
    fn name(&self) -> &'static str {
        "info"
    }

    fn usage(&self) -> &'static str {
        "info"
    }

    fn description(&self) -> &'static str {
        "show collection type, initialization time and size"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        Ok(Outcome::ok(format!(
            "Collection type: BTreeMap<u32, HumanBeing>\nInitialized: {}\nRecords: {}",
            ctx.store.initialized_at().format("%Y-%m-%d %H:%M:%S"),
            ctx.store.len()?
        )))
    }
}

pub struct Show;

impl Command for Show {
    fn name(&self) -> &'static str {
        "show"
    }

    fn usage(&self) -> &'static str {
        "show"
    }

    fn description(&self) -> &'static str {
        "show every record"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let lines = ctx
            .store
            .with_values(|records| records.map(|r| r.to_string()).collect::<Vec<_>>())?;
        if lines.is_empty() {
            return Ok(Outcome::ok("Collection is empty"));
        }
        Ok(Outcome::ok(lines.join("\n")))
    }
}

pub struct SumOfImpactSpeed;

impl Command for SumOfImpactSpeed {
    fn name(&self) -> &'static str {
        "sum_of_impact_speed"
    }

    fn usage(&self) -> &'static str {
        "sum_of_impact_speed"
    }

    fn description(&self) -> &'static str {
        "show the sum of impact_speed over all records"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let sum = ctx
            .store
            .with_values(|records| records.map(|r| f64::from(r.impact_speed())).sum::<f64>())?;
        Ok(Outcome::ok(format!("Sum of impact_speed: {}", sum)))
    }
}

pub struct FilterLessThanCar;

impl Command for FilterLessThanCar {
    fn name(&self) -> &'static str {
        "filter_less_than_car"
    }

    fn usage(&self) -> &'static str {
        "filter_less_than_car <car>"
    }

    fn description(&self) -> &'static str {
        "show records whose car name sorts before the given one"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        if args.is_empty() {
            return Err(usage_error(self));
        }
        // Car names may contain spaces
        let car = args.join(" ");

        let lines = ctx.store.with_values(|records| {
            records
                .filter(|r| r.car().is_some_and(|c| c.name() < car.as_str()))
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
        })?;

        if lines.is_empty() {
            return Ok(Outcome::ok(format!("No records with car less than '{}'", car)));
        }
        Ok(Outcome::ok(lines.join("\n")))
    }
}

pub struct PrintFieldDescendingWeaponType;

impl Command for PrintFieldDescendingWeaponType {
    fn name(&self) -> &'static str {
        "print_field_descending_weapon_type"
    }

    fn usage(&self) -> &'static str {
        "print_field_descending_weapon_type"
    }

    fn description(&self) -> &'static str {
        "show every record's weapon_type in descending order"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        let mut weapons: Vec<WeaponType> =
            ctx.store.with_values(|records| records.map(|r| r.weapon_type()).collect())?;
        if weapons.is_empty() {
            return Ok(Outcome::ok("Collection is empty"));
        }
        weapons.sort_unstable_by(|a, b| b.cmp(a));
        let lines: Vec<&str> = weapons.iter().map(|w| w.as_str()).collect();
        Ok(Outcome::ok(lines.join("\n")))
    }
}

pub struct ShowCommandHistory;

impl Command for ShowCommandHistory {
    fn name(&self) -> &'static str {
        "show_command_history"
    }

    fn usage(&self) -> &'static str {
        "show_command_history"
    }

    fn description(&self) -> &'static str {
        "show the most recent commands"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        Ok(Outcome::ok(ctx.registry.history().join("\n")))
    }
}
