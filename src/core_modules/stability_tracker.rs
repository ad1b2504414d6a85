// THEORY:
// The `StabilityTracker` is the temporal layer of the counter. Single-frame
// counts are noisy: a hand over the tray, a shadow, or a blob that splits for
// one frame all change the instantaneous number. The tracker keeps a sliding
// window of the most recent counts and only commits to a value once the window
// has settled.
//
// Key architectural principles:
// 1.  **Cold start**: Nothing is reported until the window has filled once.
// 2.  **Strict settling test**: The window is stable only when its population
//     standard deviation is below 1.0, which in practice means the counts are
//     all equal or carry rare single-unit jitter.
// 3.  **Robust center**: A stable window reports its median (the element at
//     index MAX_HISTORY / 2 of a sorted copy), so one outlier frame inside an
//     otherwise settled window cannot move the displayed value.
// 4.  **No hysteresis**: The verdict is recomputed from scratch every tick. A
//     single outlier entering the window can flip STABLE back to UNSTABLE on the
//     very next tick.

use crate::config::MAX_HISTORY;
use std::collections::VecDeque;

const STABLE_STD_DEV_THRESHOLD: f64 = 1.0;

/// The two states of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    #[default]
    Unstable,
    Stable,
}

/// The tracker's judgment for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityVerdict {
    pub is_stable: bool,
    /// The window median, present only when stable.
    pub display_value: Option<u32>,
    /// Window statistics, present once the window is full.
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl StabilityVerdict {
    fn warming_up() -> Self {
        Self {
            is_stable: false,
            display_value: None,
            mean: None,
            std_dev: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    history: VecDeque<u32>,
    state: TrackerState,
}

impl StabilityTracker {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(MAX_HISTORY + 1),
            state: TrackerState::Unstable,
        }
    }

    /// Records one tick's count and judges the window.
    pub fn update(&mut self, count: u32) -> StabilityVerdict {
        self.history.push_back(count);
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        if self.history.len() < MAX_HISTORY {
            self.state = TrackerState::Unstable;
            return StabilityVerdict::warming_up();
        }

        let (mean, std_dev) = self.window_statistics();
        let is_stable = std_dev < STABLE_STD_DEV_THRESHOLD;
        self.state = if is_stable {
            TrackerState::Stable
        } else {
            TrackerState::Unstable
        };

        StabilityVerdict {
            is_stable,
            display_value: is_stable.then(|| self.median()),
            mean: Some(mean),
            std_dev: Some(std_dev),
        }
    }

    /// The window in push order, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.history.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Forgets the window, e.g. after the camera resolution changes.
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = TrackerState::Unstable;
    }

    /// Population mean and standard deviation of the window.
    fn window_statistics(&self) -> (f64, f64) {
        let count = self.history.len() as f64;
        let mean = self.history.iter().map(|&v| v as f64).sum::<f64>() / count;
        let variance = self
            .history
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / count;
        (mean, variance.sqrt())
    }

    fn median(&self) -> u32 {
        let mut sorted: Vec<u32> = self.history.iter().copied().collect();
        sorted.sort_unstable();
        sorted[MAX_HISTORY / 2]
    }
}
