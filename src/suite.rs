//! Suites and their registered methods.
//!
//! A [`Suite`] owns the user's suite state and an ordered list of methods:
//! at most one of each [`FixtureKind`] and any number of tests. Registration
//! order is execution and listing order.

use std::{
    borrow::Cow,
    fmt::{self, Debug, Display},
    panic::Location,
    sync::Arc,
};

use crate::{context::Context, util};

/// Lifecycle hooks that run around tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    SetUpSuite,
    TearDownSuite,
    SetUpTest,
    TearDownTest,
}

impl FixtureKind {
    pub fn name(self) -> &'static str {
        match self {
            FixtureKind::SetUpSuite => "SetUpSuite",
            FixtureKind::TearDownSuite => "TearDownSuite",
            FixtureKind::SetUpTest => "SetUpTest",
            FixtureKind::TearDownTest => "TearDownTest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Test,
    Fixture(FixtureKind),
}

/// Where a method was registered, rendered as `<file name>:<line>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodLocation {
    pub file: &'static str,
    pub line: u32,
}

impl MethodLocation {
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl Display for MethodLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", util::file_name(self.file), self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    pub suite: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub kind: MethodKind,
    pub location: MethodLocation,
}

impl MethodMeta {
    /// The dotted `Suite.Method` name used for filtering, listing and output.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.suite, self.name)
    }

    pub fn is_test(&self) -> bool {
        matches!(self.kind, MethodKind::Test)
    }
}

impl Display for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.suite, self.name)
    }
}

pub type MethodFn<S> = dyn Fn(&S, &Context) + Send + Sync;

pub struct Method<S> {
    function: Box<MethodFn<S>>,
    pub meta: MethodMeta,
}

impl<S> Method<S> {
    pub(crate) fn call(&self, state: &S, c: &Context) {
        (self.function)(state, c)
    }
}

impl<S> Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("function", &"Fn(...)")
            .field("meta", &self.meta)
            .finish()
    }
}

pub struct Suite<S> {
    name: Cow<'static, str>,
    state: Arc<S>,
    set_up_suite: Option<Method<S>>,
    tear_down_suite: Option<Method<S>>,
    set_up_test: Option<Method<S>>,
    tear_down_test: Option<Method<S>>,
    tests: Vec<Method<S>>,
}

impl<S> Suite<S> {
    /// Creates an empty suite named after the type of `state`.
    pub fn new(state: S) -> Self {
        Self::from_arc(Arc::new(state))
    }

    pub fn from_arc(state: Arc<S>) -> Self {
        Self {
            name: Cow::Borrowed(util::short_type_name::<S>()),
            state,
            set_up_suite: None,
            tear_down_suite: None,
            set_up_test: None,
            tear_down_test: None,
            tests: Vec::new(),
        }
    }

    /// Renames the suite. Methods registered before keep their old suite name
    /// in their metadata, so call this first.
    pub fn with_name(self, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &Arc<S> {
        &self.state
    }

    pub fn tests(&self) -> &[Method<S>] {
        &self.tests
    }

    pub fn fixture(&self, kind: FixtureKind) -> Option<&Method<S>> {
        match kind {
            FixtureKind::SetUpSuite => self.set_up_suite.as_ref(),
            FixtureKind::TearDownSuite => self.tear_down_suite.as_ref(),
            FixtureKind::SetUpTest => self.set_up_test.as_ref(),
            FixtureKind::TearDownTest => self.tear_down_test.as_ref(),
        }
    }

    fn method<F>(
        &self,
        name: Cow<'static, str>,
        kind: MethodKind,
        location: MethodLocation,
        f: F,
    ) -> Method<S>
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        Method {
            function: Box::new(f),
            meta: MethodMeta {
                suite: self.name.clone(),
                name,
                kind,
                location,
            },
        }
    }

    #[track_caller]
    fn with_fixture<F>(mut self, kind: FixtureKind, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        let method = self.method(
            Cow::Borrowed(kind.name()),
            MethodKind::Fixture(kind),
            MethodLocation::caller(),
            f,
        );
        let slot = match kind {
            FixtureKind::SetUpSuite => &mut self.set_up_suite,
            FixtureKind::TearDownSuite => &mut self.tear_down_suite,
            FixtureKind::SetUpTest => &mut self.set_up_test,
            FixtureKind::TearDownTest => &mut self.tear_down_test,
        };
        *slot = Some(method);
        self
    }

    #[track_caller]
    pub fn set_up_suite<F>(self, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        self.with_fixture(FixtureKind::SetUpSuite, f)
    }

    #[track_caller]
    pub fn tear_down_suite<F>(self, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        self.with_fixture(FixtureKind::TearDownSuite, f)
    }

    #[track_caller]
    pub fn set_up_test<F>(self, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        self.with_fixture(FixtureKind::SetUpTest, f)
    }

    #[track_caller]
    pub fn tear_down_test<F>(self, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        self.with_fixture(FixtureKind::TearDownTest, f)
    }

    /// Appends a test. Tests run and list in the order they were added.
    #[track_caller]
    pub fn test<F>(mut self, name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&S, &Context) + Send + Sync + 'static,
    {
        let method = self.method(name.into(), MethodKind::Test, MethodLocation::caller(), f);
        self.tests.push(method);
        self
    }
}

impl<S: Default> Default for Suite<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Debug for Suite<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("set_up_suite", &self.set_up_suite.is_some())
            .field("tear_down_suite", &self.tear_down_suite.is_some())
            .field("set_up_test", &self.set_up_test.is_some())
            .field("tear_down_test", &self.tear_down_test.is_some())
            .field("tests", &self.tests)
            .finish()
    }
}
