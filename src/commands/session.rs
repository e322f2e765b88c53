//! Scripting and session commands

use std::fs;
use std::path::Path;

use super::{expect_no_args, usage_error, Caller, Command, Context, Effect, Outcome};
use crate::error::{BeingError, Result};

pub struct ExecuteScript;

impl Command for ExecuteScript {
    fn name(&self) -> &'static str {
        "execute_script"
    }

    fn usage(&self) -> &'static str {
        "execute_script <file_name>"
    }

    fn description(&self) -> &'static str {
        "run the commands listed in a file, one per line"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        if args.len() != 1 {
            return Err(usage_error(self));
        }

        let path = fs::canonicalize(Path::new(&args[0])).map_err(|e| {
            BeingError::Validation(format!("cannot open script '{}': {}", args[0], e))
        })?;
        if ctx.script_stack.contains(&path) {
            return Ok(Outcome::fail(format!(
                "Recursion detected: '{}' is already running",
                path.display()
            )));
        }
        let script = fs::read_to_string(&path)?;

        ctx.script_stack.push(path);
        let outcome = run_lines(&script, ctx);
        ctx.script_stack.pop();

        Ok(outcome)
    }
}

/// Run each non-empty, non-comment line; stops early on a shutdown request
fn run_lines(script: &str, ctx: &mut Context<'_>) -> Outcome {
    let registry = ctx.registry;
    let mut report = Vec::new();
    let mut all_succeeded = true;

    for line in script.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let name = match tokens.next() {
            Some(name) => name,
            None => continue,
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let outcome = registry.execute(name, &args, ctx);
        all_succeeded &= outcome.success;
        report.push(format!("> {}\n{}", line, outcome.message));

        if outcome.effect == Effect::Shutdown {
            return Outcome {
                success: all_succeeded,
                message: report.join("\n"),
                effect: Effect::Shutdown,
            };
        }
    }

    if report.is_empty() {
        return Outcome::ok("Script is empty");
    }

    Outcome {
        success: all_succeeded,
        message: report.join("\n"),
        effect: Effect::None,
    }
}

pub struct Exit;

impl Command for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn usage(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "stop the server (console) or end the session (client)"
    }

    fn execute(&self, args: &[String], ctx: &mut Context<'_>) -> Result<Outcome> {
        expect_no_args(self, args)?;
        match ctx.caller {
            Caller::Console => Ok(Outcome::shutdown("Shutting down")),
            Caller::Remote(_) => Ok(Outcome::ok("Goodbye")),
        }
    }
}
