use super::armature::Armature;
use super::clock::WorldClock;
use super::event::{EventKind, EventListener, EventObject};
use super::slot::DisplayFrame;
use crate::{DisplayData, DragonBonesData, Error};
use log::warn;
use std::collections::VecDeque;
use std::sync::Arc;

/// Handle to an armature living in the [`Runtime`] arena.
///
/// Handles stay cheap to copy and safe to keep: once the armature is disposed
/// the slot's generation moves on and stale handles simply stop resolving.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ArmatureId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

#[derive(Debug)]
struct ArmatureSlot {
    generation: u32,
    entry: Option<Armature>,
}

/// Owner of every armature instance, the shared clock and the event buffer.
///
/// All playback goes through [`Runtime::advance_time`]: disposed armatures are
/// reclaimed first, then every clock registration ticks, then buffered events
/// reach the listeners. Events raised while armatures tick are therefore never
/// observed mid pose; by the time a listener runs, the whole frame is settled.
pub struct Runtime {
    pub clock: WorldClock,
    slots: Vec<ArmatureSlot>,
    free_list: Vec<usize>,
    events: VecDeque<EventObject>,
    pending_events: VecDeque<EventObject>,
    dispose_queue: VecDeque<ArmatureId>,
    listener: Option<Box<dyn EventListener>>,
    sound_listener: Option<Box<dyn EventListener>>,
    draining_events: bool,
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime {
            clock: WorldClock::new(0.0),
            slots: Vec::new(),
            free_list: Vec::new(),
            events: VecDeque::new(),
            pending_events: VecDeque::new(),
            dispose_queue: VecDeque::new(),
            listener: None,
            sound_listener: None,
            draining_events: false,
        }
    }

    /// Builds an armature instance from its data, registers it on the clock
    /// and buffers its default actions.
    ///
    /// Display frames come from the named skin where it covers a slot and
    /// from the default skin everywhere else; `None` selects the default skin
    /// outright. Armature displays build their child armatures recursively.
    /// The new instance takes one zero step before returning, so it comes
    /// back posed and with its default actions underway.
    pub fn build_armature(
        &mut self,
        data: &Arc<DragonBonesData>,
        armature_name: &str,
        skin_name: Option<&str>,
    ) -> Result<ArmatureId, Error> {
        let id = self.build_armature_display(data, armature_name, skin_name)?;
        self.clock.add(id);
        if let Some(mut armature) = self.take(id) {
            let actions = armature.armature_data().default_actions.clone();
            for action in actions {
                armature.buffer_action(action, true);
            }
            armature.advance_time(0.0, self);
            self.put_back(id, armature);
        }
        Ok(id)
    }

    /// Builds an armature without touching the clock or its default actions.
    /// Nested armature displays go through here; the host attaches them when
    /// their frame is shown.
    fn build_armature_display(
        &mut self,
        data: &Arc<DragonBonesData>,
        armature_name: &str,
        skin_name: Option<&str>,
    ) -> Result<ArmatureId, Error> {
        let Some((armature_index, armature_data)) = data.armature(armature_name) else {
            warn!("no armature data {}", armature_name);
            return Err(Error::UnknownArmature {
                name: armature_name.to_string(),
            });
        };

        let skin_index = match skin_name {
            Some(name) => match armature_data.skins.iter().position(|skin| skin.name == name) {
                Some(index) => index,
                None => {
                    warn!("no skin {} in armature {}", name, armature_name);
                    return Err(Error::UnknownSkin {
                        name: name.to_string(),
                    });
                }
            },
            None => armature_data.default_skin,
        };

        let id = self.alloc(Arc::clone(data), armature_index);
        let Some(mut armature) = self.take(id) else {
            return Err(Error::StaleArmature {
                index: id.index,
                generation: id.generation,
            });
        };

        let armature_data = &data.armatures[armature_index];
        let skin = armature_data.skins.get(skin_index);
        let default_skin = armature_data.skins.get(armature_data.default_skin);
        let is_default_skin = skin_index == armature_data.default_skin;

        for slot_index in 0..armature_data.slots.len() {
            let named = if is_default_skin {
                None
            } else {
                skin.and_then(|skin| skin.displays(slot_index))
            };
            let resolved = match named {
                Some(displays) => Some((displays, false)),
                None => default_skin
                    .and_then(|skin| skin.displays(slot_index))
                    .map(|displays| (displays, true)),
            };

            if let Some((displays, from_default)) = resolved {
                let mut frames: Vec<DisplayFrame> = displays
                    .iter()
                    .map(|display| DisplayFrame {
                        raw_display_data: display.clone(),
                        ..DisplayFrame::default()
                    })
                    .collect();

                for frame in &mut frames {
                    let child_id = {
                        let Some(DisplayData::Armature(armature_display)) = &frame.raw_display_data
                        else {
                            continue;
                        };
                        let Ok(child_id) =
                            self.build_armature_display(data, &armature_display.armature, None)
                        else {
                            continue;
                        };
                        if let Some(child) = self.armature_mut(child_id) {
                            child.inherit_animation = armature_display.inherit_animation;
                            if !armature_display.inherit_animation {
                                // Standalone children run their own playback
                                // from the start, attached or not.
                                let actions = if armature_display.actions.is_empty() {
                                    child.armature_data().default_actions.clone()
                                } else {
                                    armature_display.actions.clone()
                                };
                                if actions.is_empty() {
                                    child.play(None, -1).ok();
                                } else {
                                    for action in actions {
                                        child.buffer_action(action, true);
                                    }
                                }
                            }
                        }
                        child_id
                    };
                    frame.child_armature = Some(child_id);
                }

                let slot = &mut armature.slots[slot_index];
                slot.from_default_skin = from_default;
                slot.display_frames = frames;
            }

            armature.slots[slot_index]
                .set_display_index(armature_data.slots[slot_index].display_index, true);
        }

        self.put_back(id, armature);
        Ok(id)
    }

    pub fn armature(&self, id: ArmatureId) -> Option<&Armature> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn armature_mut(&mut self, id: ArmatureId) -> Option<&mut Armature> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Lifts the armature out of its slot for a mutation window. The id keeps
    /// resolving to nothing until [`Runtime::put_back`] returns it.
    pub(crate) fn take(&mut self, id: ArmatureId) -> Option<Armature> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.take()
    }

    pub(crate) fn put_back(&mut self, id: ArmatureId, armature: Armature) {
        if let Some(slot) = self.slots.get_mut(id.index) {
            if slot.generation == id.generation {
                slot.entry = Some(armature);
            }
        }
    }

    /// Enables pose caching on an armature at `frames_per_second`, cascading
    /// to nested armature displays. Caching pays off for looping animations
    /// played one at a time; blended playback bypasses the cache.
    pub fn set_cache_frame_rate(&mut self, id: ArmatureId, frames_per_second: f32) {
        if let Some(mut armature) = self.take(id) {
            armature.set_cache_frame_rate(frames_per_second, self);
            self.put_back(id, armature);
        }
    }

    /// Marks an armature for removal. The slot is reclaimed at the start of
    /// the next [`Runtime::advance_time`]; until then the handle still
    /// resolves and buffered events still mention it.
    pub fn dispose(&mut self, id: ArmatureId) {
        let Some(armature) = self.armature_mut(id) else {
            warn!("dispose of an unknown armature");
            return;
        };
        if armature.disposed {
            warn!("the armature has already been disposed");
            return;
        }
        armature.disposed = true;
        self.dispose_queue.push_back(id);
    }

    fn alloc(&mut self, data: Arc<DragonBonesData>, armature_index: usize) -> ArmatureId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index];
            let id = ArmatureId {
                index,
                generation: slot.generation,
            };
            slot.entry = Some(Armature::new(id, data, armature_index));
            id
        } else {
            let index = self.slots.len();
            let id = ArmatureId {
                index,
                generation: 0,
            };
            self.slots.push(ArmatureSlot {
                generation: 0,
                entry: Some(Armature::new(id, data, armature_index)),
            });
            id
        }
    }

    fn free_disposed(&mut self) {
        while let Some(id) = self.dispose_queue.pop_front() {
            let armature = {
                let Some(slot) = self.slots.get_mut(id.index) else {
                    continue;
                };
                if slot.generation != id.generation {
                    continue;
                }
                let Some(armature) = slot.entry.take() else {
                    continue;
                };
                slot.generation = slot.generation.wrapping_add(1);
                armature
            };
            self.free_list.push(id.index);
            self.clock.remove(id);

            // Nested displays go down with their host, joining this drain.
            for armature_slot in &armature.slots {
                for frame in &armature_slot.display_frames {
                    let Some(child_id) = frame.child_armature else {
                        continue;
                    };
                    let mut queue_child = false;
                    if let Some(child) = self.armature_mut(child_id) {
                        if !child.disposed {
                            child.disposed = true;
                            queue_child = true;
                        }
                    }
                    if queue_child {
                        self.dispose_queue.push_back(child_id);
                    }
                }
            }
        }
    }

    /// One frame step: reclaims disposed armatures, ticks every clock
    /// registration by the scaled time, then hands buffered events over.
    pub fn advance_time(&mut self, passed_time: f32) {
        self.free_disposed();

        let passed_time = self.clock.advance(passed_time);
        let ticked = self.clock.slots.len();
        let mut index = 0;
        let mut removed = 0;
        while index < ticked {
            match self.clock.slots[index] {
                Some(id) => {
                    if removed > 0 {
                        self.clock.slots[index - removed] = Some(id);
                        self.clock.slots[index] = None;
                    }
                    if let Some(mut armature) = self.take(id) {
                        armature.advance_time(passed_time, self);
                        self.put_back(id, armature);
                    }
                }
                None => removed += 1,
            }
            index += 1;
        }

        if removed > 0 {
            // Registrations made during the pass compact here and take
            // their first step next frame.
            let total = self.clock.slots.len();
            while index < total {
                match self.clock.slots[index] {
                    Some(id) => self.clock.slots[index - removed] = Some(id),
                    None => removed += 1,
                }
                index += 1;
            }
            self.clock.slots.truncate(total - removed);
        }

        self.dispatch_events();
    }

    pub(crate) fn buffer_event(&mut self, event: EventObject) {
        self.events.push_back(event);
    }

    fn dispatch_events(&mut self) {
        if self.draining_events {
            return;
        }
        self.draining_events = true;

        while let Some(event) = self.events.pop_front() {
            if self.armature(event.armature).is_none() {
                // Disposed while the event sat in the buffer.
                continue;
            }

            let delivered = if let Some(mut listener) = self.listener.take() {
                listener.on_event(self, &event);
                if self.listener.is_none() {
                    self.listener = Some(listener);
                }
                true
            } else {
                false
            };

            if event.kind == EventKind::SoundEvent {
                if let Some(mut listener) = self.sound_listener.take() {
                    listener.on_event(self, &event);
                    if self.sound_listener.is_none() {
                        self.sound_listener = Some(listener);
                    }
                }
            }

            if !delivered {
                self.pending_events.push_back(event);
            }
        }

        self.draining_events = false;
    }

    /// Drains events kept for poll style consumers. Stays empty while a
    /// listener is installed, because events go to it instead.
    pub fn poll_events(&mut self) -> impl Iterator<Item = EventObject> + '_ {
        self.pending_events.drain(..)
    }

    /// Installs the event receiver. From the next frame step on, buffered
    /// events flow to it instead of the poll queue.
    pub fn set_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Installs the receiver that additionally gets every sound event, no
    /// matter which armature raised it.
    pub fn set_sound_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.sound_listener = Some(Box::new(listener));
    }

    pub fn clear_sound_listener(&mut self) {
        self.sound_listener = None;
    }
}
