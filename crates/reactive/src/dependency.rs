//! Dependency sets.

use crate::access::AccessDescriptor;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use liveq_storage::TableDiff;

/// The reads recorded during one query execution.
///
/// Rebuilt from scratch on every execution; never merged across runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DependencySet {
    descriptors: Vec<AccessDescriptor>,
}

impl DependencySet {
    /// Creates an empty dependency set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a read. Identical reads are kept once.
    pub fn record(&mut self, descriptor: AccessDescriptor) {
        if !self.descriptors.contains(&descriptor) {
            self.descriptors.push(descriptor);
        }
    }

    /// Returns the recorded descriptors in recording order.
    pub fn descriptors(&self) -> &[AccessDescriptor] {
        &self.descriptors
    }

    /// Returns the number of distinct reads.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if nothing was read.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the distinct tables read.
    pub fn tables(&self) -> BTreeSet<&str> {
        self.descriptors.iter().map(|d| d.table()).collect()
    }

    /// Returns true if any read of this set is affected by `diff`.
    pub fn intersects(&self, diff: &TableDiff) -> bool {
        self.descriptors.iter().any(|d| d.intersects(diff))
    }

    /// Adds a whole-table read for every table in `declared` that no recorded
    /// read covers. Returns the tables that had to be added.
    pub fn ensure_tables(&mut self, declared: &[String]) -> Vec<String> {
        let missing: Vec<String> = {
            let covered = self.tables();
            declared
                .iter()
                .filter(|t| !covered.contains(t.as_str()))
                .cloned()
                .collect()
        };
        for table in &missing {
            self.record(AccessDescriptor::full(table.clone()));
        }
        missing
    }
}
