//! Declarations: what a suite registers before it runs
//!
//! A [`Declaration`] is immutable once registered. Its body is either a plain
//! [`Implementation`] or one or more [`Macro`]s; the registry resolves it into
//! concrete execution units at registration time.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use shared::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::context::ExecutionContext;

/// Future returned by a unit body; `Err` carries the thrown value
pub type UnitFuture = BoxFuture<'static, Result<(), Value>>;

type ImplementationFn = dyn Fn(ExecutionContext, Vec<Value>) -> UnitFuture + Send + Sync;

/// A test or hook body
#[derive(Clone)]
pub struct Implementation(Arc<ImplementationFn>);

impl Implementation {
    /// Wrap an asynchronous body
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(ExecutionContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Value>> + Send + 'static,
    {
        Self(Arc::new(move |t, args| body(t, args).boxed()))
    }

    /// Wrap a synchronous body; it runs when the returned future is first polled
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&ExecutionContext, &[Value]) -> Result<(), Value> + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        Self(Arc::new(move |t, args| {
            let body = body.clone();
            async move { body(&t, &args) }.boxed()
        }))
    }

    pub(crate) fn invoke(&self, t: ExecutionContext, args: Vec<Value>) -> UnitFuture {
        (self.0)(t, args)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Implementation(..)")
    }
}

/// Derives a title from the provided title and the arguments; consulted only for untitled declarations
pub type TitleFn = Arc<dyn Fn(Option<&str>, &[Value]) -> Option<String> + Send + Sync>;

/// A reusable implementation that may derive its own title
#[derive(Clone)]
pub struct Macro {
    pub(crate) exec: Implementation,
    pub(crate) title: Option<TitleFn>,
}

impl Macro {
    pub fn new(exec: Implementation) -> Self {
        Self { exec, title: None }
    }

    /// Attach a title function
    pub fn with_title<F>(mut self, title: F) -> Self
    where
        F: Fn(Option<&str>, &[Value]) -> Option<String> + Send + Sync + 'static,
    {
        self.title = Some(Arc::new(title));
        self
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Macro")
            .field("has_title", &self.title.is_some())
            .finish()
    }
}

/// Body of a declaration, tagged explicitly so no shape sniffing is needed
#[derive(Debug, Clone)]
pub enum Body {
    Plain(Implementation),
    Macros(Vec<Macro>),
    /// Only valid for `todo` declarations
    Missing,
}

/// Hook phase and ordering family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Before,
    BeforeEach,
    AfterEach,
    AfterEachAlways,
    After,
    AfterAlways,
}

impl HookPhase {
    pub fn is_always(&self) -> bool {
        matches!(self, HookPhase::AfterEachAlways | HookPhase::AfterAlways)
    }

    /// Whether the hook runs once per test rather than once per suite
    pub fn is_per_test(&self) -> bool {
        matches!(
            self,
            HookPhase::BeforeEach | HookPhase::AfterEach | HookPhase::AfterEachAlways
        )
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::Before => "before",
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::AfterEach => "afterEach",
            HookPhase::AfterEachAlways => "afterEach.always",
            HookPhase::After => "after",
            HookPhase::AfterAlways => "after.always",
        };
        f.write_str(name)
    }
}

/// Whether a declaration is a test or a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Test,
    Hook(HookPhase),
}

/// Modifier set attached to a declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub serial: bool,
    pub only: bool,
    pub skip: bool,
    pub todo: bool,
    pub failing: bool,
    pub cb: bool,
}

impl Modifiers {
    /// Reason the combination is invalid for the given kind, if it is
    pub(crate) fn conflict(&self, kind: DeclarationKind) -> Option<&'static str> {
        if self.skip && self.only {
            return Some("skip cannot be combined with only");
        }
        if self.todo && (self.only || self.skip || self.failing || self.cb) {
            return Some("todo cannot be combined with only, skip, failing or cb");
        }
        if let DeclarationKind::Hook(_) = kind {
            if self.only {
                return Some("hooks cannot be marked only");
            }
            if self.todo {
                return Some("hooks cannot be marked todo");
            }
            if self.failing {
                return Some("hooks cannot be marked failing");
            }
        }
        None
    }
}

/// One registered unit, before macro resolution
#[derive(Debug, Clone)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub title: Option<String>,
    pub modifiers: Modifiers,
    pub body: Body,
    pub args: Vec<Value>,
}

impl Declaration {
    /// Declare a titled test
    pub fn test(title: impl Into<String>) -> Self {
        Self::new(DeclarationKind::Test, Some(title.into()))
    }

    /// Declare a test whose title is derived by its macro(s)
    pub fn untitled_test() -> Self {
        Self::new(DeclarationKind::Test, None)
    }

    /// Declare a `todo` test
    pub fn todo(title: impl Into<String>) -> Self {
        let mut declaration = Self::test(title);
        declaration.modifiers.todo = true;
        declaration
    }

    /// Declare a hook for the given phase
    pub fn hook(phase: HookPhase) -> Self {
        Self::new(DeclarationKind::Hook(phase), None)
    }

    fn new(kind: DeclarationKind, title: Option<String>) -> Self {
        Self {
            kind,
            title,
            modifiers: Modifiers::default(),
            body: Body::Missing,
            args: Vec::new(),
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn serial(mut self) -> Self {
        self.modifiers.serial = true;
        self
    }

    pub fn only(mut self) -> Self {
        self.modifiers.only = true;
        self
    }

    pub fn skip(mut self) -> Self {
        self.modifiers.skip = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.modifiers.failing = true;
        self
    }

    pub fn cb(mut self) -> Self {
        self.modifiers.cb = true;
        self
    }

    pub fn mark_todo(mut self) -> Self {
        self.modifiers.todo = true;
        self
    }

    /// Use a plain implementation
    pub fn implementation(mut self, implementation: Implementation) -> Self {
        self.body = Body::Plain(implementation);
        self
    }

    /// Use a single macro
    pub fn using(mut self, m: Macro) -> Self {
        self.body = Body::Macros(vec![m]);
        self
    }

    /// Use several macros, each producing its own unit
    pub fn macros(mut self, macros: Vec<Macro>) -> Self {
        self.body = Body::Macros(macros);
        self
    }

    /// Trailing arguments bound to the implementation
    pub fn args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Title used in error messages before resolution
    pub(crate) fn display_title(&self) -> String {
        match (&self.title, self.kind) {
            (Some(title), _) => title.clone(),
            (None, DeclarationKind::Test) => "[untitled test]".to_string(),
            (None, DeclarationKind::Hook(phase)) => format!("{phase} hook"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_conflicts() {
        let test = DeclarationKind::Test;
        let hook = DeclarationKind::Hook(HookPhase::Before);

        let skip_only = Modifiers { skip: true, only: true, ..Default::default() };
        assert!(skip_only.conflict(test).is_some());

        let todo_failing = Modifiers { todo: true, failing: true, ..Default::default() };
        assert!(todo_failing.conflict(test).is_some());

        let serial_failing = Modifiers { serial: true, failing: true, ..Default::default() };
        assert!(serial_failing.conflict(test).is_none());
        assert!(serial_failing.conflict(hook).is_some());

        let hook_cb = Modifiers { cb: true, skip: true, ..Default::default() };
        assert!(hook_cb.conflict(hook).is_none());
    }

    #[test]
    fn test_builder_chain() {
        let declaration = Declaration::test("adds")
            .serial()
            .failing()
            .args([1, 2]);
        assert_eq!(declaration.title.as_deref(), Some("adds"));
        assert!(declaration.modifiers.serial && declaration.modifiers.failing);
        assert_eq!(declaration.args.len(), 2);
        assert!(matches!(declaration.body, Body::Missing));
    }

    #[test]
    fn test_phase_families() {
        assert!(HookPhase::AfterAlways.is_always());
        assert!(!HookPhase::After.is_always());
        assert!(HookPhase::AfterEachAlways.is_per_test());
        assert!(!HookPhase::Before.is_per_test());
        assert_eq!(HookPhase::AfterEachAlways.to_string(), "afterEach.always");
    }
}
