use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::queue::{BoundedFrameQueue, QueueEntry};
use crate::sample::{AudioHandle, VideoHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Empty,
    HasData,
}

/// Everything the gate mutex protects: both sample queues plus the wakeup
/// state. Queue fields are public so the reader can run its selection and
/// dequeue steps under one lock hold.
pub struct GateSlot {
    pub video: BoundedFrameQueue<VideoHandle>,
    pub audio: BoundedFrameQueue<AudioHandle>,
    state: GateState,
    closed: bool,
}

impl GateSlot {
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Producer/consumer rendezvous shared by both queues.
///
/// One mutex serializes every queue operation; a condvar wakes the single
/// blocked reader. Lock holds cover list mutation only: sample payloads
/// are never copied under the gate.
pub struct SyncGate {
    slot: Mutex<GateSlot>,
    data_ready: Condvar,
}

impl SyncGate {
    pub fn new(video_capacity: usize, audio_capacity: usize) -> Self {
        Self {
            slot: Mutex::new(GateSlot {
                video: BoundedFrameQueue::new(video_capacity),
                audio: BoundedFrameQueue::new(audio_capacity),
                state: GateState::Empty,
                closed: false,
            }),
            data_ready: Condvar::new(),
        }
    }

    /// Never blocks. Returns the entry evicted to make room, if any.
    /// After `close()` the sample is dropped on the floor.
    pub fn enqueue_video(
        &self,
        sample: VideoHandle,
        pts: i64,
    ) -> Option<QueueEntry<VideoHandle>> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return None;
        }
        let evicted = slot.video.push(sample, pts);
        slot.state = GateState::HasData;
        self.data_ready.notify_one();
        evicted
    }

    pub fn enqueue_audio(
        &self,
        sample: AudioHandle,
        pts: i64,
    ) -> Option<QueueEntry<AudioHandle>> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return None;
        }
        let evicted = slot.audio.push(sample, pts);
        slot.state = GateState::HasData;
        self.data_ready.notify_one();
        evicted
    }

    /// Blocks until a producer signals data, then returns holding the
    /// lock. `None` once the gate has been closed.
    pub fn wait_for_data(&self) -> Option<MutexGuard<'_, GateSlot>> {
        let mut slot = self.slot.lock();
        self.data_ready
            .wait_while(&mut slot, |s| s.state == GateState::Empty && !s.closed);
        if slot.closed {
            return None;
        }
        Some(slot)
    }

    /// Unlocks after a dequeue round. With `empty_now` false the state
    /// stays `HasData`, so the next wait returns immediately instead of
    /// cycling through a sleep while entries remain.
    pub fn release(mut guard: MutexGuard<'_, GateSlot>, empty_now: bool) {
        guard.state = if empty_now {
            GateState::Empty
        } else {
            GateState::HasData
        };
    }

    /// Marks the gate closed, drains both queues (dropping entries
    /// releases their samples), and wakes every waiter. Returns how many
    /// entries of each kind were discarded.
    pub fn close(&self) -> (usize, usize) {
        let mut slot = self.slot.lock();
        slot.closed = true;
        let video_dropped = slot.video.clear();
        let audio_dropped = slot.audio.clear();
        slot.state = GateState::Empty;
        self.data_ready.notify_all();
        (video_dropped, audio_dropped)
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }
}
