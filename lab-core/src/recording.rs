//! Motion-detector recordings.
//!
//! A [`Recorder`] collects one range sample per tick until its duration has
//! elapsed in real frame time, then is flushed into a [`Recording`] with
//! velocity and acceleration reconstructed from the positions.

use serde::{Deserialize, Serialize};

use crate::analysis::derivative;
use crate::types::ItemId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub detector: Option<ItemId>,
    /// Seconds since the recording started.
    pub times: Vec<f64>,
    /// Meters from the detector face.
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub accelerations: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Recorder {
    detector: ItemId,
    duration: f64,
    elapsed: f64,
    times: Vec<f64>,
    positions: Vec<f64>,
}

impl Recorder {
    pub fn new(detector: ItemId, duration: f64) -> Self {
        Self {
            detector,
            duration: duration.max(0.0),
            elapsed: 0.0,
            times: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn detector(&self) -> ItemId {
        self.detector
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Take this tick's reading, then advance the clock by `dt`.
    /// Absent readings advance the clock without a sample.
    pub fn record(&mut self, dt: f64, reading: Option<f64>) {
        if self.is_finished() {
            return;
        }
        if let Some(position) = reading {
            self.times.push(self.elapsed);
            self.positions.push(position);
        }
        self.elapsed += dt.max(0.0);
    }

    pub fn finish(self) -> Recording {
        let velocities = derivative(&self.positions, &self.times);
        let accelerations = derivative(&velocities, &self.times);
        Recording {
            detector: Some(self.detector),
            times: self.times,
            positions: self.positions,
            velocities,
            accelerations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_until_duration() {
        let mut rec = Recorder::new(ItemId(1), 1.0);
        let mut ticks = 0;
        while !rec.is_finished() {
            rec.record(0.25, Some(1.0 + ticks as f64 * 0.5));
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        rec.record(0.25, Some(99.0));

        let out = rec.finish();
        assert_eq!(out.times.len(), 4);
        assert!(!out.positions.contains(&99.0));
        for v in &out.velocities {
            assert!((v - 2.0).abs() < 1e-9);
        }
        for a in &out.accelerations {
            assert!(a.abs() < 1e-6);
        }
    }

    #[test]
    fn test_absent_readings_are_skipped() {
        let mut rec = Recorder::new(ItemId(1), 1.0);
        rec.record(0.25, None);
        rec.record(0.25, Some(2.0));
        rec.record(0.25, None);
        let out = rec.finish();
        assert_eq!(out.times.len(), 1);
        assert_eq!(out.times[0], 0.25);
        assert_eq!(out.velocities, vec![0.0]);
    }
}
