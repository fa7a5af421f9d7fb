use std::sync::Arc;
use std::time::Instant;

use super::rate::RateMonitor;
use crate::capture::{
    CaptureSample, DepthFrame, InfraredFrame, Modality, MotionEvent, SynchronizedFrames,
    VisibleFrame,
};

/// Latest sample and arrival rate for one modality.
#[derive(Debug)]
pub struct ModalitySlot<T> {
    latest: Option<Arc<T>>,
    rate: f64,
}

impl<T> Default for ModalitySlot<T> {
    fn default() -> Self {
        Self {
            latest: None,
            rate: 0.0,
        }
    }
}

impl<T> Clone for ModalitySlot<T> {
    fn clone(&self) -> Self {
        Self {
            latest: self.latest.clone(),
            rate: self.rate,
        }
    }
}

impl<T> ModalitySlot<T> {
    pub fn new_sample(&mut self, payload: Arc<T>, rate: f64) {
        self.latest = Some(payload);
        self.rate = rate;
    }

    pub fn latest(&self) -> Option<&Arc<T>> {
        self.latest.as_ref()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// Most recent sample of every modality.
///
/// Payloads are shared behind `Arc`, so cloning the set is cheap and a clone
/// never changes after it is taken.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    pub depth: ModalitySlot<DepthFrame>,
    pub visible: ModalitySlot<VisibleFrame>,
    pub infrared: ModalitySlot<InfraredFrame>,
    pub accelerometer: ModalitySlot<MotionEvent>,
    pub gyroscope: ModalitySlot<MotionEvent>,
}

impl SampleSet {
    pub fn rate(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Depth => self.depth.rate(),
            Modality::Visible => self.visible.rate(),
            Modality::Infrared => self.infrared.rate(),
            Modality::Accelerometer => self.accelerometer.rate(),
            Modality::Gyroscope => self.gyroscope.rate(),
        }
    }

    pub fn has_sample(&self, modality: Modality) -> bool {
        match modality {
            Modality::Depth => self.depth.latest().is_some(),
            Modality::Visible => self.visible.latest().is_some(),
            Modality::Infrared => self.infrared.latest().is_some(),
            Modality::Accelerometer => self.accelerometer.latest().is_some(),
            Modality::Gyroscope => self.gyroscope.latest().is_some(),
        }
    }
}

#[derive(Debug, Default)]
struct RateMonitors {
    depth: RateMonitor,
    visible: RateMonitor,
    infrared: RateMonitor,
    accelerometer: RateMonitor,
    gyroscope: RateMonitor,
}

/// Folds incoming samples into a [`SampleSet`] and keeps per-modality rates.
#[derive(Debug, Default)]
pub struct SampleAggregator {
    samples: SampleSet,
    monitors: RateMonitors,
}

fn accept<T>(slot: &mut ModalitySlot<T>, monitor: &mut RateMonitor, payload: T, now: Instant) {
    monitor.tick_at(now);
    slot.new_sample(Arc::new(payload), monitor.rate());
}

impl SampleAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `sample` as received at `now`. Returns the number of modalities updated.
    pub fn ingest(&mut self, sample: CaptureSample, now: Instant) -> usize {
        let samples = &mut self.samples;
        let monitors = &mut self.monitors;
        match sample {
            CaptureSample::Depth(frame) => {
                accept(&mut samples.depth, &mut monitors.depth, frame, now);
                1
            }
            CaptureSample::Visible(frame) => {
                accept(&mut samples.visible, &mut monitors.visible, frame, now);
                1
            }
            CaptureSample::Infrared(frame) => {
                accept(&mut samples.infrared, &mut monitors.infrared, frame, now);
                1
            }
            CaptureSample::Accelerometer(event) => {
                accept(&mut samples.accelerometer, &mut monitors.accelerometer, event, now);
                1
            }
            CaptureSample::Gyroscope(event) => {
                accept(&mut samples.gyroscope, &mut monitors.gyroscope, event, now);
                1
            }
            CaptureSample::Synchronized(SynchronizedFrames {
                depth,
                visible,
                infrared,
            }) => {
                let mut updated = 0;
                if let Some(frame) = depth.filter(|f| f.is_valid()) {
                    accept(&mut samples.depth, &mut monitors.depth, frame, now);
                    updated += 1;
                }
                if let Some(frame) = visible.filter(|f| f.is_valid()) {
                    accept(&mut samples.visible, &mut monitors.visible, frame, now);
                    updated += 1;
                }
                if let Some(frame) = infrared.filter(|f| f.is_valid()) {
                    accept(&mut samples.infrared, &mut monitors.infrared, frame, now);
                    updated += 1;
                }
                updated
            }
        }
    }

    pub fn snapshot(&self) -> SampleSet {
        self.samples.clone()
    }

    /// Forgets arrival history; the last samples stay available for display.
    pub fn reset_rates(&mut self) {
        self.monitors = RateMonitors::default();
    }
}
