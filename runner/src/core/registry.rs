//! Declaration registry and execution plans

use shared::unit_debug;

use super::declaration::{Body, Declaration, DeclarationKind, HookPhase};
use super::filter::TitleFilter;
use super::resolver::{ExecutionUnit, ExpectedOutcome, MacroResolver};
use crate::error::{RegistrationError, RegistryResult};

/// A resolved hook with its phase and ordering slot
#[derive(Debug, Clone)]
pub struct HookBinding {
    pub phase: HookPhase,
    /// Declaration order within the phase
    pub slot: usize,
    pub unit: ExecutionUnit,
}

/// What a run executes, in declaration order
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub tests: Vec<ExecutionUnit>,
    /// Titles of `skip` tests, reported without running
    pub skipped: Vec<String>,
    /// Titles of `todo` tests, reported as pending
    pub todo: Vec<String>,
    pub hooks: Vec<HookBinding>,
    /// Whether `.only` restricted the plan
    pub exclusive: bool,
}

impl ExecutionPlan {
    /// Hooks of one phase in slot order
    pub fn hooks(&self, phase: HookPhase) -> impl Iterator<Item = &HookBinding> {
        self.hooks.iter().filter(move |binding| binding.phase == phase)
    }

    pub fn contains_test(&self, title: &str) -> bool {
        self.tests.iter().any(|unit| unit.title == title)
    }
}

/// Records every declaration of one suite in registration order
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
    resolver: MacroResolver,
    tests: Vec<ExecutionUnit>,
    hooks: Vec<HookBinding>,
    rejections: Vec<RegistrationError>,
    position: usize,
}

impl DeclarationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and resolve a declaration; returns the number of units registered
    pub fn register(&mut self, declaration: Declaration) -> RegistryResult<usize> {
        let position = self.position;
        self.position += 1;

        if let Err(error) = validate(&declaration) {
            self.rejections.push(error.clone());
            return Err(error);
        }

        let mut registered = 0;
        let mut failures = Vec::new();
        for resolved in self.resolver.resolve(&declaration, position) {
            match resolved {
                Ok(unit) => {
                    self.add(unit);
                    registered += 1;
                }
                Err(error) => failures.push(error),
            }
        }

        if failures.is_empty() {
            return Ok(registered);
        }
        let error = if registered == 0 && failures.len() == 1 {
            failures.remove(0)
        } else {
            RegistrationError::PartiallyRegistered { registered, failures }
        };
        self.rejections.push(error.clone());
        Err(error)
    }

    fn add(&mut self, unit: ExecutionUnit) {
        unit_debug!(unit.title, "📝 registered");
        match unit.kind {
            DeclarationKind::Test => self.tests.push(unit),
            DeclarationKind::Hook(phase) => {
                let slot = self.hooks.iter().filter(|binding| binding.phase == phase).count();
                self.hooks.push(HookBinding { phase, slot, unit });
            }
        }
    }

    /// Declarations rejected so far
    pub fn rejections(&self) -> &[RegistrationError] {
        &self.rejections
    }

    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    pub fn build_plan(&self) -> ExecutionPlan {
        self.build_plan_with(&TitleFilter::default())
    }

    /// Build the runnable set.
    ///
    /// With any `.only` test registered, every other test is left out
    /// entirely; the title filter then narrows what remains.
    pub fn build_plan_with(&self, filter: &TitleFilter) -> ExecutionPlan {
        let exclusive = self.tests.iter().any(|unit| unit.modifiers.only);
        let mut plan = ExecutionPlan {
            exclusive,
            hooks: self
                .hooks
                .iter()
                .filter(|binding| !binding.unit.modifiers.skip)
                .cloned()
                .collect(),
            ..Default::default()
        };

        let selected = self
            .tests
            .iter()
            .filter(|unit| !exclusive || unit.modifiers.only)
            .filter(|unit| filter.matches(&unit.title));
        for unit in selected {
            match unit.expected {
                ExpectedOutcome::Todo => plan.todo.push(unit.title.clone()),
                ExpectedOutcome::Skip => plan.skipped.push(unit.title.clone()),
                ExpectedOutcome::Normal | ExpectedOutcome::Failing => plan.tests.push(unit.clone()),
            }
        }
        plan
    }
}

fn validate(declaration: &Declaration) -> RegistryResult<()> {
    let title = declaration.display_title();
    if let Some(reason) = declaration.modifiers.conflict(declaration.kind) {
        return Err(RegistrationError::invalid(title, reason));
    }
    match (&declaration.body, declaration.modifiers.todo) {
        (Body::Missing, false) => Err(RegistrationError::MissingImplementation { title }),
        (Body::Plain(_) | Body::Macros(_), true) => {
            Err(RegistrationError::invalid(title, "todo cannot have an implementation"))
        }
        (Body::Macros(macros), false) if macros.is_empty() => {
            Err(RegistrationError::MissingImplementation { title })
        }
        _ => Ok(()),
    }
}
