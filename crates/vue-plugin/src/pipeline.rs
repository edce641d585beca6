//! Ordered processor chains.
//!
//! Every extension point of the plugin is a [`Chain`] of user processors.
//! How the stages combine depends on the extension point:
//!
//! | combinator        | stage contract                         | used by                 |
//! |-------------------|----------------------------------------|-------------------------|
//! | [`Chain::fold`]   | each stage transforms the previous one | component load          |
//! | [`Chain::first_some`] | first `Some` wins, rest are skipped | resolve, stylesheet load |
//! | [`Chain::try_for_each`] | all run in order, first error stops | start, end            |
//! | [`Chain::for_each`] | all run, cannot fail                  | dispose                 |

use std::fmt;

/// An ordered list of processors.
#[derive(Clone)]
pub struct Chain<P> {
    stages: Vec<P>,
}

impl<P> Default for Chain<P> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<P> fmt::Debug for Chain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<P> Chain<P> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn push(&mut self, stage: P) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Thread a value through every stage in order.
    pub fn fold<T, E>(&self, init: T, mut f: impl FnMut(&P, T) -> Result<T, E>) -> Result<T, E> {
        self.stages.iter().try_fold(init, |value, stage| f(stage, value))
    }

    /// Run stages until one produces a value.
    pub fn first_some<T, E>(&self, mut f: impl FnMut(&P) -> Result<Option<T>, E>) -> Result<Option<T>, E> {
        for stage in &self.stages {
            if let Some(value) = f(stage)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Run every stage, stopping at the first error.
    pub fn try_for_each<E>(&self, f: impl FnMut(&P) -> Result<(), E>) -> Result<(), E> {
        self.stages.iter().try_for_each(f)
    }

    /// Run every stage.
    pub fn for_each(&self, f: impl FnMut(&P)) {
        self.stages.iter().for_each(f)
    }
}

impl<P> FromIterator<P> for Chain<P> {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}
