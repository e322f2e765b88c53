//! Command registry
//!
//! Insertion-ordered name → handler table plus the command history.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use super::{collection, mutation, persistence, session, Command, Context, Outcome};
use crate::error::{BeingError, Result};

/// Number of command names kept for `show_command_history`
pub const HISTORY_LIMIT: usize = 10;

/// Lookup table of commands
///
/// Registration needs `&mut self`, so once the registry is shared behind an
/// `Arc` it can no longer change.
pub struct Registry {
    /// Commands in registration order (`help` lists them in this order)
    commands: Vec<Box<dyn Command>>,

    /// Name → position in `commands`
    index: HashMap<&'static str, usize>,

    /// Most recent command names, oldest first
    history: Mutex<VecDeque<String>>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            index: HashMap::new(),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LIMIT)),
        }
    }

    /// Registry with every built-in command
    pub fn with_default_commands() -> Self {
        let mut registry = Self::new();
        let builtins: Vec<Box<dyn Command>> = vec![
            Box::new(collection::Help),
            Box::new(mutation::Add),
            Box::new(persistence::Load),
            Box::new(collection::Info),
            Box::new(collection::Show),
            Box::new(mutation::Insert),
            Box::new(mutation::Update),
            Box::new(mutation::RemoveKey),
            Box::new(mutation::Clear),
            Box::new(persistence::Save),
            Box::new(session::ExecuteScript),
            Box::new(session::Exit),
            Box::new(mutation::RemoveGreater),
            Box::new(mutation::RemoveLower),
            Box::new(mutation::ReplaceIfGreater),
            Box::new(collection::SumOfImpactSpeed),
            Box::new(collection::FilterLessThanCar),
            Box::new(collection::PrintFieldDescendingWeaponType),
            Box::new(collection::ShowCommandHistory),
        ];
        for command in builtins {
            // Built-in names are distinct
            let _ = registry.register(command);
        }
        registry
    }

    /// Add a command; fails if the name is taken
    pub fn register(&mut self, command: Box<dyn Command>) -> Result<()> {
        let name = command.name();
        if self.index.contains_key(name) {
            return Err(BeingError::Config(format!(
                "command '{}' is already registered",
                name
            )));
        }
        self.index.insert(name, self.commands.len());
        self.commands.push(command);
        Ok(())
    }

    /// Run the command called `name`
    pub fn execute(&self, name: &str, args: &[String], ctx: &mut Context<'_>) -> Outcome {
        let command = match self.get(name) {
            Some(command) => command,
            None => {
                return Outcome::fail(format!(
                    "Unknown command '{}'. Type 'help' for the list of commands",
                    name
                ))
            }
        };

        self.remember(name);

        match command.execute(args, ctx) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!("Command '{}' failed: {}", name, e);
                Outcome::fail(e.to_string())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.index.get(name).map(|&i| self.commands[i].as_ref())
    }

    /// Commands in registration order
    pub fn commands(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }

    /// Most recent command names, oldest first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().iter().cloned().collect()
    }

    fn remember(&self, name: &str) {
        let mut history = self.history.lock();
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(name.to_string());
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
