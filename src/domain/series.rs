// Rolling series buffer - bounded per-channel history with a shared label axis
use super::channel::ChannelId;
use std::collections::VecDeque;

/// A bounded window of readings for the registered channel set.
///
/// One label tick is stored per received batch and shared across all
/// channels, so the same index in every array refers to the same batch.
/// Invariant: the label axis and every channel's series always have equal
/// length; eviction at capacity removes the front of all of them together.
#[derive(Debug)]
pub struct SeriesBuffer {
    capacity: usize,
    channels: Vec<ChannelId>,
    labels: VecDeque<String>,
    series: Vec<VecDeque<Option<f64>>>,
}

impl SeriesBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Vec::new(),
            labels: VecDeque::new(),
            series: Vec::new(),
        }
    }

    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn labels(&self) -> &VecDeque<String> {
        &self.labels
    }

    pub fn series(&self) -> &[VecDeque<Option<f64>>] {
        &self.series
    }

    /// Number of batches currently held.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Discard all history and allocate one empty series per key, in the
    /// given order. Called on a channel-set change or an explicit reset.
    pub fn rebuild(&mut self, keys: &[ChannelId]) {
        self.channels = keys.to_vec();
        self.labels.clear();
        self.series = keys.iter().map(|_| VecDeque::new()).collect();
    }

    /// Push one label tick and one positional value per registered series.
    ///
    /// A batch carrying more values than there are registered series is
    /// dropped whole: it belongs to a channel set this buffer was not
    /// rebuilt for, and the registry will trigger the rebuild on its own.
    /// Returns whether the batch was appended.
    pub fn append(&mut self, label: String, values: &[Option<f64>]) -> bool {
        if values.len() > self.series.len() {
            return false;
        }

        self.labels.push_back(label);
        for (i, series) in self.series.iter_mut().enumerate() {
            series.push_back(values.get(i).copied().flatten());
        }

        while self.labels.len() > self.capacity {
            self.labels.pop_front();
            for series in self.series.iter_mut() {
                series.pop_front();
            }
        }

        true
    }

    /// Latest value per channel, for scalar displays.
    pub fn latest(&self) -> impl Iterator<Item = (ChannelId, Option<f64>)> + '_ {
        self.channels
            .iter()
            .zip(self.series.iter())
            .map(|(&channel, series)| (channel, series.back().copied().flatten()))
    }
}
