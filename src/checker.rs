//! The comparator seam used by [`Context::check`](crate::context::Context::check)
//! and [`Context::assert`](crate::context::Context::assert).
//!
//! The engine ships no checkers of its own. A checker carries whatever it
//! compares against (an expected value, a pattern, ...) and only judges the
//! obtained value it is handed.

use crate::util;

pub trait Checker<T: ?Sized> {
    /// Name shown in the diagnostic block of a failed check.
    fn name(&self) -> &str {
        util::short_type_name::<Self>()
    }

    /// Returns `Err` with an explanation (possibly empty) when `obtained`
    /// does not match.
    fn check(&self, obtained: &T) -> Result<(), String>;
}

impl<T, F> Checker<T> for F
where
    T: ?Sized,
    F: Fn(&T) -> Result<(), String>,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn check(&self, obtained: &T) -> Result<(), String> {
        self(obtained)
    }
}
