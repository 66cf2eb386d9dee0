//! Macro resolution
//!
//! Turns a [`Declaration`] into one [`ExecutionUnit`] per implementation:
//! plain bodies yield a single unit, macro bodies yield one unit per macro,
//! all bound to the declaration's trailing arguments.

use futures_util::FutureExt;
use shared::Value;
use std::collections::HashSet;

use super::context::ExecutionContext;
use super::declaration::{Body, Declaration, DeclarationKind, Implementation, Macro, Modifiers, UnitFuture};
use crate::error::{RegistrationError, RegistryResult};

/// Title given to the single test that derives no title at all
pub const ANONYMOUS_TITLE: &str = "[anonymous]";

/// How the unit's result is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedOutcome {
    Normal,
    /// Pass/fail is inverted
    Failing,
    /// Never executes; reported as pending
    Todo,
    /// Never executes; reported as skipped
    Skip,
}

impl ExpectedOutcome {
    fn from_modifiers(modifiers: &Modifiers) -> Self {
        if modifiers.todo {
            ExpectedOutcome::Todo
        } else if modifiers.skip {
            ExpectedOutcome::Skip
        } else if modifiers.failing {
            ExpectedOutcome::Failing
        } else {
            ExpectedOutcome::Normal
        }
    }
}

/// Resolved, invocable form of a declaration
#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    pub title: String,
    pub kind: DeclarationKind,
    pub modifiers: Modifiers,
    pub expected: ExpectedOutcome,
    /// Registration position of the originating declaration
    pub order: usize,
    implementation: Option<Implementation>,
    args: Vec<Value>,
}

impl ExecutionUnit {
    pub fn is_test(&self) -> bool {
        self.kind == DeclarationKind::Test
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Start the body against a context
    pub(crate) fn invoke(&self, t: ExecutionContext) -> UnitFuture {
        match &self.implementation {
            Some(implementation) => implementation.invoke(t, self.args.clone()),
            None => futures_util::future::ready(Ok(())).boxed(),
        }
    }
}

/// Test titles claimed so far in one suite
#[derive(Debug, Default)]
pub struct TitleLedger {
    claimed: HashSet<String>,
}

impl TitleLedger {
    pub fn contains(&self, title: &str) -> bool {
        self.claimed.contains(title)
    }

    fn claim(&mut self, title: &str) -> RegistryResult<()> {
        if self.claimed.insert(title.to_string()) {
            Ok(())
        } else {
            Err(RegistrationError::DuplicateTitle {
                title: title.to_string(),
            })
        }
    }

    /// The anonymous title can be claimed once; a second untitled test has nothing to fall back on
    fn claim_anonymous(&mut self, position: usize) -> RegistryResult<String> {
        if self.claimed.insert(ANONYMOUS_TITLE.to_string()) {
            Ok(ANONYMOUS_TITLE.to_string())
        } else {
            Err(RegistrationError::MissingTitle { position })
        }
    }
}

/// Expands declarations into execution units, enforcing title uniqueness
#[derive(Debug, Default)]
pub struct MacroResolver {
    ledger: TitleLedger,
}

impl MacroResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &TitleLedger {
        &self.ledger
    }

    /// Resolve one declaration; each produced unit succeeds or fails on its own
    pub fn resolve(&mut self, declaration: &Declaration, position: usize) -> Vec<RegistryResult<ExecutionUnit>> {
        match &declaration.body {
            Body::Plain(implementation) => {
                vec![self.unit(declaration, position, declaration.title.clone(), Some(implementation.clone()))]
            }
            Body::Missing => vec![self.unit(declaration, position, declaration.title.clone(), None)],
            Body::Macros(macros) => macros
                .iter()
                .map(|m| {
                    let title = macro_title(m, declaration);
                    self.unit(declaration, position, title, Some(m.exec.clone()))
                })
                .collect(),
        }
    }

    fn unit(
        &mut self,
        declaration: &Declaration,
        position: usize,
        title: Option<String>,
        implementation: Option<Implementation>,
    ) -> RegistryResult<ExecutionUnit> {
        let title = match (declaration.kind, title) {
            (DeclarationKind::Hook(phase), title) => title.unwrap_or_else(|| format!("{phase} hook")),
            (DeclarationKind::Test, Some(title)) => {
                self.ledger.claim(&title)?;
                title
            }
            (DeclarationKind::Test, None) => self.ledger.claim_anonymous(position)?,
        };

        Ok(ExecutionUnit {
            title,
            kind: declaration.kind,
            modifiers: declaration.modifiers,
            expected: ExpectedOutcome::from_modifiers(&declaration.modifiers),
            order: position,
            implementation,
            args: declaration.args.clone(),
        })
    }
}

/// The declared title wins; a macro's title function only fills in for
/// untitled declarations
fn macro_title(m: &Macro, declaration: &Declaration) -> Option<String> {
    if let Some(title) = &declaration.title {
        return Some(title.clone());
    }
    m.title.as_ref().and_then(|derive| derive(None, &declaration.args))
}
