//! Test selection by dotted name.
//!
//! A filter decides which tests of a suite take part in a run or a listing.
//! Both go through [`NameFilter::filter`], so what is listed is exactly what
//! would run. Fixtures are never filtered, they run whenever at least one
//! test of their suite does.

use std::{slice, vec};

use regex::Regex;

use crate::{
    result::RunError,
    suite::{Method, Suite},
};

/// Keeps the tests whose `Suite.Test` name matches a regular expression.
#[derive(Debug, Default, Clone)]
pub struct NameFilter {
    pattern: Option<Regex>,
}

impl NameFilter {
    /// Compiles `pattern`. An empty pattern keeps every test.
    pub fn new(pattern: &str) -> Result<Self, RunError> {
        if pattern.is_empty() {
            return Ok(Self::default());
        }

        let regex = Regex::new(pattern).map_err(|source| RunError::InvalidFilter {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: Some(regex),
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        match &self.pattern {
            None => true,
            Some(regex) => regex.is_match(name),
        }
    }

    pub fn filter<'t, S>(&self, suite: &'t Suite<S>) -> FilteredTests<'t, S> {
        let tests = suite.tests();
        if self.pattern.is_none() {
            return FilteredTests {
                tests: FilteredIter::Slice(tests.iter()),
                filtered_out: 0,
            };
        }

        let mut remaining = Vec::new();
        let mut filtered_out = 0;
        for test in tests {
            match self.matches(&test.meta.full_name()) {
                true => remaining.push(test),
                false => filtered_out += 1,
            }
        }

        FilteredTests {
            tests: FilteredIter::Vec(remaining.into_iter()),
            filtered_out,
        }
    }
}

/// The tests selected by a [`NameFilter`], in declaration order.
#[derive(Debug)]
pub struct FilteredTests<'t, S> {
    pub tests: FilteredIter<'t, S>,

    /// How many tests did not match.
    pub filtered_out: usize,
}

#[derive(Debug)]
pub enum FilteredIter<'t, S> {
    Slice(slice::Iter<'t, Method<S>>),
    Vec(vec::IntoIter<&'t Method<S>>),
}

impl<'t, S> Iterator for FilteredIter<'t, S> {
    type Item = &'t Method<S>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FilteredIter::Slice(iter) => iter.next(),
            FilteredIter::Vec(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            FilteredIter::Slice(iter) => iter.size_hint(),
            FilteredIter::Vec(iter) => iter.size_hint(),
        }
    }
}

impl<'t, S> ExactSizeIterator for FilteredIter<'t, S> {}
