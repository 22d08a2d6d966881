//! Frame-time and rate measurements for the main loop's building blocks.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Instant;

use tracing::warn;

/// Points kept per element.
pub const NUM_POINTS: usize = 512;
/// Timer ticks per second.
pub const TIMESTAMP_PRECISION: u64 = 1_000_000;
/// Marks a pause in a series of measurements.
pub const INVALID_DURATION: u64 = u64::MAX;

/// The sound queue holds start/end pairs; once full new measurements are dropped.
pub const SOUND_QUEUE_CAPACITY: usize = NUM_POINTS * 2;

static SOUND_QUEUE_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_sound_queue_poison_once(operation: &'static str) {
    if SOUND_QUEUE_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "sound perf queue poisoned; recovered inner value");
    }
}

/// Microseconds since the first call in this process.
pub fn perf_timer() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_micros() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceElement {
    GameLoop,
    GlVehicles,
    Drawing,
    DrawWorld,
    Video,
    Sound,
}

impl PerformanceElement {
    pub const ALL: [PerformanceElement; 6] = [
        PerformanceElement::GameLoop,
        PerformanceElement::GlVehicles,
        PerformanceElement::Drawing,
        PerformanceElement::DrawWorld,
        PerformanceElement::Video,
        PerformanceElement::Sound,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PerformanceElement::GameLoop => "game loop",
            PerformanceElement::GlVehicles => "  vehicle ticks",
            PerformanceElement::Drawing => "graphics rendering",
            PerformanceElement::DrawWorld => "  world viewports",
            PerformanceElement::Video => "video output",
            PerformanceElement::Sound => "sound mixing",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Ring buffer of timestamps and durations for one element.
#[derive(Debug, Clone)]
pub struct PerformanceData {
    durations: Box<[u64; NUM_POINTS]>,
    timestamps: Box<[u64; NUM_POINTS]>,
    /// Cycles per second when nothing is slowing the element down.
    pub expected_rate: f64,
    next_index: usize,
    prev_index: usize,
    num_valid: usize,
    acc_duration: u64,
    acc_timestamp: u64,
}

impl PerformanceData {
    pub fn new(expected_rate: f64) -> Self {
        Self {
            durations: Box::new([0; NUM_POINTS]),
            timestamps: Box::new([0; NUM_POINTS]),
            expected_rate,
            next_index: 0,
            prev_index: 0,
            num_valid: 0,
            acc_duration: 0,
            acc_timestamp: 0,
        }
    }

    pub fn num_valid(&self) -> usize {
        self.num_valid
    }

    fn push(&mut self, timestamp: u64, duration: u64) {
        self.timestamps[self.next_index] = timestamp;
        self.durations[self.next_index] = duration;
        self.prev_index = self.next_index;
        self.next_index = (self.next_index + 1) % NUM_POINTS;
        self.num_valid = (self.num_valid + 1).min(NUM_POINTS);
    }

    /// Records one complete cycle.
    pub fn add(&mut self, start_time: u64, end_time: u64) {
        self.push(start_time, end_time.saturating_sub(start_time));
    }

    /// Stores the running accumulation as a point and starts a new one.
    pub fn begin_accumulate(&mut self, start_time: u64) {
        self.push(self.acc_timestamp, self.acc_duration);
        self.acc_duration = 0;
        self.acc_timestamp = start_time;
    }

    pub fn add_accumulate(&mut self, duration: u64) {
        self.acc_duration = self.acc_duration.saturating_add(duration);
    }

    /// Records a gap, unless the last point already is one.
    pub fn add_pause(&mut self, start_time: u64) {
        if self.num_valid > 0 && self.durations[self.prev_index] == INVALID_DURATION {
            return;
        }
        self.push(start_time, INVALID_DURATION);
    }

    pub fn set_inactive(&mut self) {
        self.num_valid = 0;
        self.next_index = 0;
        self.prev_index = 0;
    }

    /// Mean duration of the last `count` points in milliseconds. Gaps are
    /// left out of both the sum and the divisor.
    pub fn average_duration_ms(&self, count: usize) -> f64 {
        let count = count.min(self.num_valid);
        let first = (self.prev_index + NUM_POINTS + 1 - count) % NUM_POINTS;

        let mut sum = 0.0;
        let mut valid = 0usize;
        for offset in 0..count {
            let duration = self.durations[(first + offset) % NUM_POINTS];
            if duration != INVALID_DURATION {
                sum += duration as f64;
                valid += 1;
            }
        }

        if valid == 0 {
            return 0.0;
        }
        sum * 1000.0 / valid as f64 / TIMESTAMP_PRECISION as f64
    }

    /// Cycles per second over roughly the last second of points. Gaps are
    /// skipped as if the points on either side were adjacent.
    pub fn rate(&self) -> f64 {
        if self.num_valid < 2 {
            return 0.0;
        }

        let mut point = self.prev_index;
        let last_point = (self.next_index + NUM_POINTS - self.num_valid) % NUM_POINTS;
        let mut last = self.timestamps[point];
        let mut total = 0u64;
        let mut count = 0u64;

        point = (point + NUM_POINTS - 1) % NUM_POINTS;
        while point != last_point {
            if self.durations[point] != INVALID_DURATION {
                total = total.saturating_add(last.saturating_sub(self.timestamps[point]));
                count += 1;
            }
            last = self.timestamps[point];
            if total >= TIMESTAMP_PRECISION {
                break;
            }
            point = (point + NUM_POINTS - 1) % NUM_POINTS;
        }

        if total == 0 || count == 0 {
            return 0.0;
        }
        count as f64 * TIMESTAMP_PRECISION as f64 / total as f64
    }
}

/// Measurement records for every element, owned by the main thread.
#[derive(Debug)]
pub struct PerformanceRegistry {
    data: [RefCell<PerformanceData>; 6],
    sound: SoundPerfQueue,
}

impl PerformanceRegistry {
    pub fn new(ticks_per_second: f64) -> Self {
        let rate = |elem: PerformanceElement| match elem {
            PerformanceElement::GameLoop => ticks_per_second,
            PerformanceElement::Drawing => 1000.0 / 30.0,
            PerformanceElement::Video => 60.0,
            PerformanceElement::Sound => 1000.0 * 8192.0 / 44100.0,
            PerformanceElement::GlVehicles | PerformanceElement::DrawWorld => 1.0,
        };
        Self {
            data: PerformanceElement::ALL.map(|elem| RefCell::new(PerformanceData::new(rate(elem)))),
            sound: SoundPerfQueue::default(),
        }
    }

    fn slot(&self, elem: PerformanceElement) -> &RefCell<PerformanceData> {
        &self.data[elem.index()]
    }

    /// Times one cycle of `elem` until the guard drops.
    pub fn measure(&self, elem: PerformanceElement) -> PerformanceMeasurer<'_> {
        PerformanceMeasurer {
            data: self.slot(elem),
            start_time: perf_timer(),
        }
    }

    /// Adds the time until the guard drops onto the running accumulation.
    pub fn accumulate(&self, elem: PerformanceElement) -> PerformanceAccumulator<'_> {
        PerformanceAccumulator {
            data: self.slot(elem),
            start_time: perf_timer(),
        }
    }

    /// Closes the current accumulation cycle. Call once per frame.
    pub fn reset_accumulator(&self, elem: PerformanceElement) {
        self.slot(elem).borrow_mut().begin_accumulate(perf_timer());
    }

    pub fn set_inactive(&self, elem: PerformanceElement) {
        self.slot(elem).borrow_mut().set_inactive();
    }

    pub fn paused(&self, elem: PerformanceElement) {
        let mut data = self.slot(elem).borrow_mut();
        data.set_inactive();
        data.add_pause(perf_timer());
    }

    pub fn set_expected_rate(&self, elem: PerformanceElement, rate: f64) {
        self.slot(elem).borrow_mut().expected_rate = rate;
    }

    pub fn expected_rate(&self, elem: PerformanceElement) -> f64 {
        self.slot(elem).borrow().expected_rate
    }

    pub fn average_duration_ms(&self, elem: PerformanceElement, count: usize) -> f64 {
        self.slot(elem).borrow().average_duration_ms(count)
    }

    pub fn rate(&self, elem: PerformanceElement) -> f64 {
        self.slot(elem).borrow().rate()
    }

    /// Handle for the mixer thread.
    pub fn sound_queue(&self) -> SoundPerfQueue {
        self.sound.clone()
    }

    /// Moves measurements made on other threads into their records.
    pub fn process_pending(&self) {
        self.sound.drain_into(&mut self.slot(PerformanceElement::Sound).borrow_mut());
    }
}

impl Default for PerformanceRegistry {
    fn default() -> Self {
        Self::new(30.0)
    }
}

#[must_use = "the measurement is recorded when the guard drops"]
pub struct PerformanceMeasurer<'r> {
    data: &'r RefCell<PerformanceData>,
    start_time: u64,
}

impl Drop for PerformanceMeasurer<'_> {
    fn drop(&mut self) {
        self.data.borrow_mut().add(self.start_time, perf_timer());
    }
}

#[must_use = "the measurement is recorded when the guard drops"]
pub struct PerformanceAccumulator<'r> {
    data: &'r RefCell<PerformanceData>,
    start_time: u64,
}

impl Drop for PerformanceAccumulator<'_> {
    fn drop(&mut self) {
        self.data
            .borrow_mut()
            .add_accumulate(perf_timer().saturating_sub(self.start_time));
    }
}

/// Sound mixing timings, handed from the mixer thread to the main thread.
#[derive(Debug, Clone, Default)]
pub struct SoundPerfQueue {
    shared: Arc<SoundPerfShared>,
}

#[derive(Debug, Default)]
struct SoundPerfShared {
    measurements: Mutex<Vec<u64>>,
    pending: AtomicBool,
}

impl SoundPerfShared {
    fn lock(&self, operation: &'static str) -> MutexGuard<'_, Vec<u64>> {
        match self.measurements.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_sound_queue_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}

impl SoundPerfQueue {
    /// Times one mixing cycle until the guard drops.
    pub fn measure(&self) -> SoundMeasurer {
        SoundMeasurer {
            queue: self.clone(),
            start_time: perf_timer(),
        }
    }

    pub fn push(&self, start_time: u64, end_time: u64) {
        let mut measurements = self.shared.lock("push");
        if measurements.len() >= SOUND_QUEUE_CAPACITY {
            return;
        }
        measurements.push(start_time);
        measurements.push(end_time);
        self.shared.pending.store(true, Ordering::Release);
    }

    pub fn has_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    fn drain_into(&self, data: &mut PerformanceData) {
        if !self.has_pending() {
            return;
        }
        let mut measurements = self.shared.lock("drain");
        for pair in measurements.chunks_exact(2) {
            data.add(pair[0], pair[1]);
        }
        measurements.clear();
        self.shared.pending.store(false, Ordering::Relaxed);
    }
}

#[must_use = "the measurement is recorded when the guard drops"]
pub struct SoundMeasurer {
    queue: SoundPerfQueue,
    start_time: u64,
}

impl Drop for SoundMeasurer {
    fn drop(&mut self) {
        self.queue.push(self.start_time, perf_timer());
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_queue(queue: &SoundPerfQueue) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = queue.shared.measurements.lock().expect("queue guard");
                    panic!("poison sound queue");
                })
                .join();
        });
    }

    #[test]
    fn average_covers_the_most_recent_points() {
        let mut data = PerformanceData::new(1.0);
        data.add(0, 1_000);
        data.add(10_000, 12_000);
        data.add(20_000, 24_000);
        assert!((data.average_duration_ms(2) - 3.0).abs() < 1e-9);
        assert!((data.average_duration_ms(100) - 7.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn average_skips_gaps() {
        let mut data = PerformanceData::new(1.0);
        data.add(0, 2_000);
        data.add_pause(5_000);
        data.add(10_000, 14_000);
        assert!((data.average_duration_ms(3) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        let data = PerformanceData::new(1.0);
        assert_eq!(data.average_duration_ms(10), 0.0);
    }

    #[test]
    fn consecutive_pauses_collapse_into_one_gap() {
        let mut data = PerformanceData::new(1.0);
        data.add(0, 10);
        data.add_pause(100);
        data.add_pause(200);
        assert_eq!(data.num_valid(), 2);
    }

    #[test]
    fn rate_counts_points_per_second() {
        let mut data = PerformanceData::new(30.0);
        for i in 0..40 {
            let start = i * 10_000;
            data.add(start, start + 1_000);
        }
        assert!((data.rate() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn rate_ignores_gaps() {
        let mut data = PerformanceData::new(30.0);
        data.add(0, 1);
        data.add(20_000, 20_001);
        data.add_pause(40_000);
        data.add(40_000, 40_001);
        data.add(60_000, 60_001);
        // The oldest point only anchors the first interval; the gap adds nothing.
        let rate = data.rate();
        assert!((rate - 2.0 * TIMESTAMP_PRECISION as f64 / 40_000.0).abs() < 1e-6);
    }

    #[test]
    fn ring_wraps_without_growing() {
        let mut data = PerformanceData::new(1.0);
        for i in 0..(NUM_POINTS as u64 + 10) {
            data.add(i * 100, i * 100 + 50);
        }
        assert_eq!(data.num_valid(), NUM_POINTS);
        assert!((data.average_duration_ms(NUM_POINTS) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn accumulation_lands_on_the_next_reset() {
        let mut data = PerformanceData::new(1.0);
        data.begin_accumulate(1_000);
        data.add_accumulate(300);
        data.add_accumulate(700);
        data.begin_accumulate(2_000);
        assert!((data.average_duration_ms(1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn set_inactive_forgets_every_point() {
        let registry = PerformanceRegistry::default();
        {
            let _guard = registry.measure(PerformanceElement::Drawing);
        }
        registry.set_inactive(PerformanceElement::Drawing);
        assert_eq!(registry.average_duration_ms(PerformanceElement::Drawing, 8), 0.0);
        assert_eq!(registry.rate(PerformanceElement::Drawing), 0.0);
    }

    #[test]
    fn guards_record_on_drop() {
        let registry = PerformanceRegistry::default();
        {
            let _guard = registry.measure(PerformanceElement::GameLoop);
            let _inner = registry.accumulate(PerformanceElement::GlVehicles);
        }
        assert_eq!(registry.slot(PerformanceElement::GameLoop).borrow().num_valid(), 1);
        registry.reset_accumulator(PerformanceElement::GlVehicles);
        assert_eq!(registry.slot(PerformanceElement::GlVehicles).borrow().num_valid(), 1);
    }

    #[test]
    fn sound_measurements_cross_threads() {
        let registry = PerformanceRegistry::default();
        let queue = registry.sound_queue();
        thread::spawn(move || {
            queue.push(0, 500);
            queue.push(1_000, 1_500);
            drop(queue.measure());
        })
        .join()
        .expect("mixer thread");

        registry.process_pending();
        let sound = registry.slot(PerformanceElement::Sound).borrow();
        assert_eq!(sound.num_valid(), 3);
        assert!(!registry.sound.has_pending());
    }

    #[test]
    fn full_sound_queue_drops_new_measurements() {
        let queue = SoundPerfQueue::default();
        for i in 0..(SOUND_QUEUE_CAPACITY as u64) {
            queue.push(i, i + 1);
        }
        assert_eq!(queue.shared.lock("test").len(), SOUND_QUEUE_CAPACITY);
    }

    #[test]
    fn poisoned_sound_queue_still_drains() {
        let registry = PerformanceRegistry::default();
        let queue = registry.sound_queue();
        poison_queue(&queue);
        queue.push(0, 250);
        registry.process_pending();
        assert!((registry.average_duration_ms(PerformanceElement::Sound, 1) - 0.25).abs() < 1e-9);
    }
}
