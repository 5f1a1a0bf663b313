use super::context::ArmatureId;

/// Registration list driving every armature from one shared time source.
///
/// Removal leaves a tombstone instead of shifting neighbors, so armatures can
/// leave the clock mid pass without another registration being skipped. The
/// next pass compacts the holes away.
#[derive(Clone, Debug)]
pub struct WorldClock {
    /// Accumulated time in seconds. Grows by the magnitude of every scaled
    /// step, even when stepping backwards.
    pub time: f32,
    /// 0 stops playback, values below 1 slow it, values above 1 speed it up.
    pub time_scale: f32,
    pub(crate) slots: Vec<Option<ArmatureId>>,
}

impl Default for WorldClock {
    fn default() -> WorldClock {
        WorldClock::new(0.0)
    }
}

impl WorldClock {
    pub fn new(time: f32) -> WorldClock {
        WorldClock {
            time,
            time_scale: 1.0,
            slots: Vec::new(),
        }
    }

    /// Scales the step and moves the clock, returning the step registrations
    /// tick by. A zero step still ticks everyone; scrubbed poses settle on a
    /// zero-length frame.
    pub(crate) fn advance(&mut self, passed_time: f32) -> f32 {
        let mut passed_time = passed_time;
        if passed_time.is_nan() {
            passed_time = 0.0;
        }
        if self.time_scale != 1.0 {
            passed_time *= self.time_scale;
        }

        self.time += passed_time.abs();
        passed_time
    }

    /// Registers an armature. Already registered ids are left alone.
    pub fn add(&mut self, id: ArmatureId) {
        if !self.contains(id) {
            self.slots.push(Some(id));
        }
    }

    /// Unregisters an armature, leaving a tombstone for the next pass.
    pub fn remove(&mut self, id: ArmatureId) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| **slot == Some(id)) {
            *slot = None;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn contains(&self, id: ArmatureId) -> bool {
        self.slots.contains(&Some(id))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
