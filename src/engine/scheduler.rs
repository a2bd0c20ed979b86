use std::collections::{BTreeMap, HashMap, VecDeque};

use super::models::DownloadUnit;

/// Bounded-concurrency admission over a batch of download units.
///
/// Units are admitted first-in first-out; the lookup map is independent of the
/// queue so completions can be matched by id in any order.
#[derive(Debug)]
pub(crate) struct Scheduler {
    units: HashMap<String, DownloadUnit>,
    queue: VecDeque<String>,
    failed: BTreeMap<String, DownloadUnit>,
    in_flight: usize,
    max_concurrent: usize,
}

impl Scheduler {
    pub(crate) fn new(max_concurrent: usize) -> Self {
        Self {
            units: HashMap::new(),
            queue: VecDeque::new(),
            failed: BTreeMap::new(),
            in_flight: 0,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Replace the batch. The failed set is left alone.
    pub(crate) fn load(&mut self, units: impl IntoIterator<Item = DownloadUnit>) {
        self.units = units
            .into_iter()
            .map(|unit| (unit.custom_id.clone(), unit))
            .collect();
        self.queue.clear();
    }

    pub(crate) fn clear_batch(&mut self) {
        self.units.clear();
        self.queue.clear();
    }

    pub(crate) fn clear_failed(&mut self) {
        self.failed.clear();
    }

    /// Queue every unit of the batch in key order; returns the known byte
    /// total and how many units contributed to it.
    pub(crate) fn seed_queue(&mut self) -> (u64, usize) {
        let mut keys: Vec<&String> = self.units.keys().collect();
        keys.sort();
        self.queue = keys.into_iter().cloned().collect();
        self.units
            .values()
            .filter(|unit| unit.expected_size > 0)
            .fold((0, 0), |(bytes, count), unit| {
                (bytes + unit.expected_size, count + 1)
            })
    }

    /// Take the next unit if a slot is free.
    pub(crate) fn admit(&mut self) -> Option<DownloadUnit> {
        if self.in_flight >= self.max_concurrent {
            return None;
        }
        while let Some(key) = self.queue.pop_front() {
            if let Some(unit) = self.units.get(&key) {
                self.in_flight += 1;
                return Some(unit.clone());
            }
        }
        None
    }

    pub(crate) fn release(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn unit(&self, id: &str) -> Option<&DownloadUnit> {
        self.units.get(id)
    }

    pub(crate) fn record_failure(&mut self, unit: DownloadUnit) {
        self.failed.insert(unit.custom_id.clone(), unit);
    }

    pub(crate) fn clear_failure(&mut self, id: &str) -> bool {
        self.failed.remove(id).is_some()
    }

    pub(crate) fn failed(&self) -> &BTreeMap<String, DownloadUnit> {
        &self.failed
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }
}
