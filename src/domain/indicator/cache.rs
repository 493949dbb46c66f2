//! Memoizing evaluation engine.
//!
//! A [`Formula`] says how to compute one index; [`Cached`] owns the slot
//! array and decides when to call it. Values are computed on first access and
//! never recomputed.
//!
//! Recursive formulas (those that read their own value at `index - 1`) are
//! resolved bottom-up: before computing `index`, every slot from the first
//! unresolved one up to `index - 1` is filled in a plain loop. A request for
//! bar 100_000 on a cold cache therefore never nests more than one level of
//! `calculate` deep.

use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::indicator::Indicator;
use crate::domain::series::BarSeries;

pub trait Formula: Sized + Send + Sync + 'static {
    type Output: Clone + Send + Sync;

    /// Whether `calculate(i)` reads `cached.value(i - 1)`.
    const RECURSIVE: bool = false;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> Self::Output;

    fn unstable_bars(&self) -> usize;
}

struct Slots<T> {
    values: Vec<Option<T>>,
    /// Length of the fully resolved prefix.
    resolved: usize,
}

impl<T> Slots<T> {
    fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(Option::as_ref)
    }

    fn store(&mut self, index: usize, value: T) {
        if self.values.len() <= index {
            self.values.resize_with(index + 1, || None);
        }
        if self.values[index].is_none() {
            self.values[index] = Some(value);
        }
        while self.resolved < self.values.len() && self.values[self.resolved].is_some() {
            self.resolved += 1;
        }
    }
}

pub struct Cached<F: Formula> {
    series: Arc<BarSeries>,
    formula: F,
    slots: RwLock<Slots<F::Output>>,
}

impl<F: Formula> Cached<F> {
    pub fn from_formula(series: Arc<BarSeries>, formula: F) -> Self {
        Self {
            series,
            formula,
            slots: RwLock::new(Slots {
                values: Vec::new(),
                resolved: 0,
            }),
        }
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }

    fn lookup(&self, index: usize) -> Option<F::Output> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(index).cloned()
    }

    fn compute_and_store(&self, index: usize) -> F::Output {
        // The lock is released while calculating: formulas re-enter `value`.
        let value = self.formula.calculate(index, self);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.store(index, value.clone());
        value
    }

    fn resolved_prefix(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolved
    }
}

impl<F: Formula> Indicator for Cached<F> {
    type Output = F::Output;

    fn value(&self, index: usize) -> F::Output {
        if index >= self.series.bar_count() {
            panic!(
                "indicator index {} out of range for series '{}' of {} bars",
                index,
                self.series.name(),
                self.series.bar_count()
            );
        }
        if let Some(value) = self.lookup(index) {
            return value;
        }
        if F::RECURSIVE {
            for i in self.resolved_prefix()..index {
                if self.lookup(i).is_none() {
                    self.compute_and_store(i);
                }
            }
        }
        self.compute_and_store(index)
    }

    fn unstable_bars(&self) -> usize {
        self.formula.unstable_bars()
    }

    fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }
}
