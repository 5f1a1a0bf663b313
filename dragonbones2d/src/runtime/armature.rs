use super::animation::{Animation, StateId};
use super::bone::{Bone, BoneSolver};
use super::constraint::Constraint;
use super::context::{ArmatureId, Runtime};
use super::slot::{Slot, SlotDisplay};
use crate::{
    ActionData, ActionType, AnimationConfig, AnimationData, AnimationFadeOutMode, ArmatureData,
    DisplayData, DragonBonesData, Error, Matrix, Point, Transform, UserData,
};
use log::warn;
use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

/// World poses sampled once at a fixed rate and replayed on later loops.
///
/// Records are ten floats: the world matrix, then rotation, skew and the two
/// scales. The pool lives on the armature instance, so two armatures playing
/// the same data never see each other's samples.
#[derive(Clone, Debug, Default)]
pub(crate) struct PoseCache {
    pub cache_frame_rate: f32,
    pub animations: Vec<AnimationCache>,
    frames: Vec<f32>,
}

impl PoseCache {
    pub(crate) fn enable(&mut self, armature_data: &ArmatureData, frame_rate: f32) {
        if self.cache_frame_rate > 0.0 {
            // TODO rebuild instead of keeping the first rate when it changes.
            return;
        }

        self.cache_frame_rate = frame_rate;
        let bone_count = armature_data.bones.len();
        let slot_count = armature_data.slots.len();
        self.animations = armature_data
            .animations
            .iter()
            .map(|animation| AnimationCache::new(animation, frame_rate, bone_count, slot_count))
            .collect();
    }

    pub(crate) fn set_frame(&mut self, matrix: &Matrix, transform: &Transform) -> i32 {
        let offset = self.frames.len() as i32;
        self.frames.extend_from_slice(&[
            matrix.a,
            matrix.b,
            matrix.c,
            matrix.d,
            matrix.tx,
            matrix.ty,
            transform.rotation,
            transform.skew,
            transform.scale_x,
            transform.scale_y,
        ]);
        offset
    }

    pub(crate) fn get_frame(&self, offset: i32, matrix: &mut Matrix, transform: &mut Transform) {
        let offset = offset as usize;
        matrix.a = self.frames[offset];
        matrix.b = self.frames[offset + 1];
        matrix.c = self.frames[offset + 2];
        matrix.d = self.frames[offset + 3];
        matrix.tx = self.frames[offset + 4];
        matrix.ty = self.frames[offset + 5];
        transform.rotation = self.frames[offset + 6];
        transform.skew = self.frames[offset + 7];
        transform.scale_x = self.frames[offset + 8];
        transform.scale_y = self.frames[offset + 9];
        transform.x = matrix.tx;
        transform.y = matrix.ty;
    }
}

/// Per-animation cache bookkeeping: which quantized frames have been filled,
/// and per bone and slot the pool offset of each frame's record.
#[derive(Clone, Debug)]
pub(crate) struct AnimationCache {
    pub cache_frame_rate: f32,
    pub frame_count: usize,
    pub cached_frames: Vec<bool>,
    bone_indices: Vec<i32>,
    slot_indices: Vec<i32>,
}

impl AnimationCache {
    fn new(
        animation: &AnimationData,
        frame_rate: f32,
        bone_count: usize,
        slot_count: usize,
    ) -> AnimationCache {
        let cache_frame_rate = (frame_rate * animation.scale).ceil().max(1.0);
        // One extra frame so the duration's end has a sample.
        let frame_count = (cache_frame_rate * animation.duration).ceil() as usize + 1;
        AnimationCache {
            cache_frame_rate,
            frame_count,
            cached_frames: vec![false; frame_count],
            bone_indices: vec![-1; bone_count * frame_count],
            slot_indices: vec![-1; slot_count * frame_count],
        }
    }

    fn bone_index(&self, bone: usize, frame: usize) -> i32 {
        self.bone_indices[bone * self.frame_count + frame]
    }

    fn set_bone_index(&mut self, bone: usize, frame: usize, value: i32) {
        self.bone_indices[bone * self.frame_count + frame] = value;
    }

    fn slot_index(&self, slot: usize, frame: usize) -> i32 {
        self.slot_indices[slot * self.frame_count + frame]
    }

    fn set_slot_index(&mut self, slot: usize, frame: usize, value: i32) {
        self.slot_indices[slot * self.frame_count + frame] = value;
    }
}

/// A posed instance of one armature's data: bones, slots, constraints and an
/// animation manager, stepped as a unit.
///
/// Armatures live in the [`Runtime`] arena and are addressed by
/// [`ArmatureId`]. Nested armature displays tick on the same clock as their
/// host and follow its flip, alpha and cache settings.
#[derive(Debug)]
pub struct Armature {
    /// When false, a nested armature keeps its own playback instead of
    /// reacting to display attach and detach.
    pub inherit_animation: bool,
    pub(crate) id: ArmatureId,
    pub(crate) data: Arc<DragonBonesData>,
    pub(crate) armature_index: usize,
    pub(crate) animation: Animation,
    pub(crate) bones: Vec<Bone>,
    pub(crate) slots: Vec<Slot>,
    pub(crate) sorted_slot_indices: Vec<usize>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) actions: VecDeque<ActionData>,
    pub(crate) cache: PoseCache,
    /// Animation whose cache the bones and slots consult, when exactly one
    /// cached state is active.
    pub(crate) cache_animation: Option<usize>,
    pub(crate) cache_frame_index: i32,
    /// Host slot when this armature is a nested display.
    pub(crate) parent: Option<(ArmatureId, usize)>,
    pub(crate) flip_x: bool,
    pub(crate) flip_y: bool,
    pub(crate) alpha: f32,
    pub(crate) global_alpha: f32,
    pub(crate) lock_update: bool,
    pub(crate) slots_dirty: bool,
    pub(crate) z_order_dirty: bool,
    pub(crate) z_index_dirty: bool,
    pub(crate) alpha_dirty: bool,
    pub(crate) disposed: bool,
}

impl Armature {
    pub(crate) fn new(id: ArmatureId, data: Arc<DragonBonesData>, armature_index: usize) -> Armature {
        let armature_data = &data.armatures[armature_index];
        let mut bones: Vec<Bone> = armature_data.bones.iter().map(Bone::new).collect();
        let slots: Vec<Slot> = armature_data.slots.iter().map(Slot::new).collect();
        let sorted_slot_indices: Vec<usize> = (0..slots.len()).collect();
        let constraints: Vec<Constraint> = (0..armature_data.constraints.len())
            .map(|index| Constraint::new(armature_data, index))
            .collect();
        for constraint in &constraints {
            if let Some(bone) = bones.get_mut(constraint.root()) {
                bone.has_constraint = true;
            }
        }

        Armature {
            inherit_animation: true,
            id,
            data,
            armature_index,
            animation: Animation::default(),
            bones,
            slots,
            sorted_slot_indices,
            constraints,
            actions: VecDeque::new(),
            cache: PoseCache::default(),
            cache_animation: None,
            cache_frame_index: -1,
            parent: None,
            flip_x: false,
            flip_y: false,
            alpha: 1.0,
            global_alpha: 1.0,
            lock_update: false,
            slots_dirty: true,
            z_order_dirty: false,
            z_index_dirty: false,
            alpha_dirty: true,
            disposed: false,
        }
    }

    /// Steps animation, pose and deferred actions by `passed_time` seconds.
    pub(crate) fn advance_time(&mut self, passed_time: f32, rt: &mut Runtime) {
        if self.lock_update {
            return;
        }
        self.lock_update = true;

        if self.disposed {
            warn!("the armature has been disposed");
            return;
        }

        let data = Arc::clone(&self.data);
        let armature_data = &data.armatures[self.armature_index];
        let prev_cache_frame_index = self.cache_frame_index;

        // Animation first; it marks everything below dirty.
        let mut animation = mem::take(&mut self.animation);
        animation.advance_time(self, rt, passed_time);
        self.animation = animation;

        // Sort slots.
        if self.slots_dirty || self.z_index_dirty {
            self.sort_slots();
            if self.z_index_dirty {
                for position in 0..self.sorted_slot_indices.len() {
                    let index = self.sorted_slot_indices[position];
                    self.slots[index].set_z_order(position as i32);
                }
            }
            self.slots_dirty = false;
            self.z_index_dirty = false;
        }

        // Update alpha.
        if self.alpha_dirty {
            self.alpha_dirty = false;
            let parent_alpha = match self.parent {
                Some((parent_id, parent_slot)) => rt
                    .armature(parent_id)
                    .and_then(|parent| parent.slots.get(parent_slot))
                    .map_or(1.0, |slot| slot.global_alpha),
                None => 1.0,
            };
            self.global_alpha = self.alpha * parent_alpha;

            for position in 0..armature_data.sorted_bone_indices.len() {
                let index = armature_data.sorted_bone_indices[position];
                let parent_alpha = match self.bones[index].parent {
                    Some(parent) => self.bones[parent].global_alpha,
                    None => self.global_alpha,
                };
                let bone = &mut self.bones[index];
                bone.global_alpha = bone.alpha * parent_alpha;
            }

            for index in 0..self.slots.len() {
                let parent_alpha = self.bones[self.slots[index].parent].global_alpha;
                let slot = &mut self.slots[index];
                let global_alpha = slot.alpha * parent_alpha;
                if slot.global_alpha != global_alpha {
                    slot.global_alpha = global_alpha;
                    slot.color_dirty = true;
                }
            }
        }

        // Update bones and slots.
        if self.cache_frame_index < 0 || self.cache_frame_index != prev_cache_frame_index {
            let cache_frame_index = self.cache_frame_index;
            for position in 0..armature_data.sorted_bone_indices.len() {
                let index = armature_data.sorted_bone_indices[position];
                self.update_bone(&data, armature_data, index, cache_frame_index);
            }
            for position in 0..self.sorted_slot_indices.len() {
                let index = self.sorted_slot_indices[position];
                self.update_slot(index, cache_frame_index, rt);
            }
        }

        // Do actions.
        if !self.actions.is_empty() {
            let actions = mem::take(&mut self.actions);
            for action in actions {
                if action.action_type != ActionType::Play {
                    continue;
                }
                if let Some(slot_index) = action.slot {
                    let child = self
                        .slots
                        .get(slot_index)
                        .and_then(|slot| slot.child_armature);
                    if let Some(child_id) = child {
                        fade_in_child(rt, child_id, &action.name);
                    }
                } else if let Some(bone_index) = action.bone {
                    for index in 0..self.slots.len() {
                        if self.slots[index].parent != bone_index {
                            continue;
                        }
                        if let Some(child_id) = self.slots[index].child_armature {
                            fade_in_child(rt, child_id, &action.name);
                        }
                    }
                } else {
                    let mut animation = mem::take(&mut self.animation);
                    animation
                        .fade_in(
                            self,
                            &action.name,
                            -1.0,
                            -1,
                            0,
                            None,
                            AnimationFadeOutMode::SameLayerAndGroup,
                        )
                        .ok();
                    self.animation = animation;
                }
            }
        }

        self.lock_update = false;
    }

    /// One bone's tick: constraints, the cache ladder, then the world matrix.
    fn update_bone(
        &mut self,
        data: &DragonBonesData,
        armature_data: &ArmatureData,
        index: usize,
        mut cache_frame_index: i32,
    ) {
        let animation_index = if cache_frame_index >= 0 {
            self.cache_animation
        } else {
            None
        };

        if let Some(animation_index) = animation_index {
            let cached_frame_index =
                self.cache.animations[animation_index].bone_index(index, cache_frame_index as usize);
            if cached_frame_index >= 0 && self.bones[index].cached_frame_index == cached_frame_index
            {
                // Same cache.
                self.bones[index].transform_dirty = false;
            } else if cached_frame_index >= 0 {
                // Switched to a frame someone already filled.
                self.bones[index].transform_dirty = true;
                self.bones[index].cached_frame_index = cached_frame_index;
            } else {
                if self.bones[index].has_constraint {
                    self.update_constraints_for(data, armature_data, index);
                }
                let parent_moved = match self.bones[index].parent {
                    Some(parent) => self.bones[parent].children_transform_dirty,
                    None => false,
                };
                if self.bones[index].transform_dirty || parent_moved {
                    self.bones[index].transform_dirty = true;
                    self.bones[index].cached_frame_index = -1;
                } else if self.bones[index].cached_frame_index >= 0 {
                    // Same pose, but this frame's index was never written.
                    self.bones[index].transform_dirty = false;
                    let value = self.bones[index].cached_frame_index;
                    self.cache.animations[animation_index].set_bone_index(
                        index,
                        cache_frame_index as usize,
                        value,
                    );
                } else {
                    self.bones[index].transform_dirty = true;
                    self.bones[index].cached_frame_index = -1;
                }
            }
        } else {
            if self.bones[index].has_constraint {
                self.update_constraints_for(data, armature_data, index);
            }
            let parent_moved = match self.bones[index].parent {
                Some(parent) => self.bones[parent].children_transform_dirty,
                None => false,
            };
            if self.bones[index].transform_dirty || parent_moved {
                cache_frame_index = -1;
                self.bones[index].transform_dirty = true;
                self.bones[index].cached_frame_index = -1;
            }
        }

        if self.bones[index].transform_dirty {
            self.bones[index].transform_dirty = false;
            self.bones[index].children_transform_dirty = true;
            if self.bones[index].cached_frame_index < 0 {
                let is_cache = cache_frame_index >= 0;
                if self.bones[index].local_dirty {
                    let mut solver = BoneSolver {
                        bones: &mut self.bones,
                        armature_data,
                        flip_x: self.flip_x,
                        flip_y: self.flip_y,
                    };
                    solver.update_global_transform_matrix(index, is_cache);
                }
                if is_cache {
                    if let Some(animation_index) = self.cache_animation {
                        let frame = self
                            .cache
                            .set_frame(&self.bones[index].global_transform_matrix, &self.bones[index].global);
                        self.bones[index].cached_frame_index = frame;
                        self.cache.animations[animation_index].set_bone_index(
                            index,
                            cache_frame_index as usize,
                            frame,
                        );
                    }
                }
            } else {
                let bone = &mut self.bones[index];
                self.cache.get_frame(
                    bone.cached_frame_index,
                    &mut bone.global_transform_matrix,
                    &mut bone.global,
                );
            }
        } else if self.bones[index].children_transform_dirty {
            self.bones[index].children_transform_dirty = false;
        }

        self.bones[index].local_dirty = true;
    }

    fn update_constraints_for(
        &mut self,
        data: &DragonBonesData,
        armature_data: &ArmatureData,
        root: usize,
    ) {
        let mut constraints = mem::take(&mut self.constraints);
        for constraint in &mut constraints {
            if constraint.root() != root {
                continue;
            }
            let mut solver = BoneSolver {
                bones: &mut self.bones,
                armature_data,
                flip_x: self.flip_x,
                flip_y: self.flip_y,
            };
            constraint.update(&mut solver, &mut self.slots, data);
        }
        self.constraints = constraints;
    }

    /// One slot's tick: display resolution, render dirty flags, the mesh
    /// gate, then the same cache ladder bones use.
    fn update_slot(&mut self, index: usize, mut cache_frame_index: i32, rt: &mut Runtime) {
        if self.slots[index].display_data_dirty {
            self.slots[index].update_display_data();
            self.slots[index].display_data_dirty = false;
        }

        if self.slots[index].display_dirty {
            self.update_slot_display(index, rt);
            self.slots[index].display_dirty = false;
        }

        if self.slots[index].geometry_dirty {
            // Vertex buffers are the renderer's to rebuild.
            self.slots[index].geometry_dirty = false;
        }

        if self.slots[index].display.is_none() {
            return;
        }

        {
            let slot = &mut self.slots[index];
            if slot.visible_dirty {
                slot.visible_dirty = false;
            }
            if slot.blend_mode_dirty {
                slot.blend_mode_dirty = false;
            }
            if slot.color_dirty {
                slot.color_dirty = false;
            }
            if slot.z_order_dirty {
                slot.z_order_dirty = false;
            }
        }

        if self.slots[index].geometry_data.is_some() && self.slots[index].is_visual_display() {
            let is_skinned = self.slots[index]
                .geometry_data
                .as_ref()
                .is_some_and(|geometry| geometry.weight.is_some());
            let bones_moved = is_skinned && self.slots[index].is_bones_update(&self.bones);
            if self.slots[index].vertices_dirty || bones_moved {
                self.slots[index].vertices_dirty = false;
            }
            if is_skinned {
                // Skinned meshes follow their weight bones, not the parent.
                return;
            }
        }

        let animation_index = if cache_frame_index >= 0 && self.slots[index].from_default_skin {
            self.cache_animation
        } else {
            None
        };

        if let Some(animation_index) = animation_index {
            let cached_frame_index =
                self.cache.animations[animation_index].slot_index(index, cache_frame_index as usize);
            let parent_moved = self.bones[self.slots[index].parent].children_transform_dirty;
            let slot = &mut self.slots[index];
            if cached_frame_index >= 0 && slot.cached_frame_index == cached_frame_index {
                slot.transform_dirty = false;
            } else if cached_frame_index >= 0 {
                slot.transform_dirty = true;
                slot.cached_frame_index = cached_frame_index;
            } else if slot.transform_dirty || parent_moved {
                slot.transform_dirty = true;
                slot.cached_frame_index = -1;
            } else if slot.cached_frame_index >= 0 {
                slot.transform_dirty = false;
                let value = slot.cached_frame_index;
                self.cache.animations[animation_index].set_slot_index(
                    index,
                    cache_frame_index as usize,
                    value,
                );
            } else {
                slot.transform_dirty = true;
                slot.cached_frame_index = -1;
            }
        } else {
            let parent_moved = self.bones[self.slots[index].parent].children_transform_dirty;
            let slot = &mut self.slots[index];
            if slot.transform_dirty || parent_moved {
                cache_frame_index = -1;
                slot.transform_dirty = true;
                slot.cached_frame_index = -1;
            }
        }

        if self.slots[index].transform_dirty {
            self.slots[index].transform_dirty = false;
            if self.slots[index].cached_frame_index < 0 {
                let is_cache = cache_frame_index >= 0;
                let parent_matrix = self.bones[self.slots[index].parent].global_transform_matrix;
                self.slots[index].update_global_transform_matrix(is_cache, &parent_matrix);
                if is_cache && self.slots[index].from_default_skin {
                    if let Some(animation_index) = self.cache_animation {
                        let frame = self
                            .cache
                            .set_frame(&self.slots[index].global_transform_matrix, &self.slots[index].global);
                        self.slots[index].cached_frame_index = frame;
                        self.cache.animations[animation_index].set_slot_index(
                            index,
                            cache_frame_index as usize,
                            frame,
                        );
                    }
                }
            } else {
                let slot = &mut self.slots[index];
                self.cache.get_frame(
                    slot.cached_frame_index,
                    &mut slot.global_transform_matrix,
                    &mut slot.global,
                );
            }
        }
    }

    /// Swaps the slot's visible content and wires nested armatures onto the
    /// clock. Armature displays may carry attach actions; those buffer onto
    /// this armature and run at the front of this tick's action flush.
    pub(crate) fn update_slot_display(&mut self, index: usize, rt: &mut Runtime) {
        let (prev_display, prev_child_armature, display, child_armature) = {
            let slot = &mut self.slots[index];
            let prev_display = slot.display;
            let prev_child_armature = slot.child_armature;
            let display = slot
                .current_frame
                .and_then(|frame| slot.display_frames[frame].display(frame));
            let child_armature = match display {
                Some(SlotDisplay::ChildArmature(id)) => Some(id),
                _ => None,
            };
            slot.display = display;
            slot.child_armature = child_armature;
            (prev_display, prev_child_armature, display, child_armature)
        };

        if display != prev_display {
            let slot = &mut self.slots[index];
            slot.visible_dirty = true;
            slot.blend_mode_dirty = true;
            slot.color_dirty = true;
            slot.transform_dirty = true;
        }

        if child_armature == prev_child_armature {
            return;
        }

        if let Some(prev_id) = prev_child_armature {
            if let Some(mut child) = rt.take(prev_id) {
                child.parent = None;
                rt.clock.remove(prev_id);
                if child.inherit_animation {
                    child.animation.reset();
                }
                rt.put_back(prev_id, child);
            }
        }

        let Some(child_id) = child_armature else {
            return;
        };
        let Some(mut child) = rt.take(child_id) else {
            return;
        };
        child.parent = Some((self.id, index));
        rt.clock.add(child_id);
        if child.inherit_animation {
            if child.cache.cache_frame_rate == 0.0 && self.cache.cache_frame_rate != 0.0 {
                let cache_frame_rate = self.cache.cache_frame_rate;
                child.set_cache_frame_rate(cache_frame_rate, rt);
            }

            let mut attach_actions: Vec<ActionData> = Vec::new();
            if let Some(frame) = self.slots[index].current_frame {
                let frame_data = &self.slots[index].display_frames[frame];
                if let Some(DisplayData::Armature(armature_display)) = frame_data.effective_display()
                {
                    attach_actions = armature_display.actions.clone();
                }
            }
            if attach_actions.is_empty() {
                child.play(None, -1).ok();
            } else {
                for mut action in attach_actions {
                    action.slot = Some(index);
                    self.buffer_action(action, false);
                }
            }
        }
        rt.put_back(child_id, child);
    }

    fn sort_slots(&mut self) {
        let slots = &self.slots;
        self.sorted_slot_indices
            .sort_by_key(|&index| slots[index].z_index * 1000 + slots[index].z_order);
    }

    /// Applies a z-order timeline permutation, or restores the authored order
    /// when `slot_indices` is `None`.
    pub(crate) fn sort_z_order(&mut self, slot_indices: Option<&[i16]>, offset: usize) {
        let total = self.slots.len();
        let is_original = slot_indices.is_none();
        if self.z_order_dirty || !is_original {
            for position in 0..total {
                let slot_index = match slot_indices {
                    Some(indices) => indices
                        .get(offset + position)
                        .map_or(-1, |&value| i32::from(value)),
                    None => position as i32,
                };
                if slot_index < 0 || slot_index >= total as i32 {
                    continue;
                }
                self.slots[slot_index as usize].set_z_order(position as i32);
            }
            self.slots_dirty = true;
            self.z_order_dirty = !is_original;
        }
    }

    pub(crate) fn buffer_action(&mut self, action: ActionData, append: bool) {
        if append {
            self.actions.push_back(action);
        } else {
            self.actions.push_front(action);
        }
    }

    /// Forces bones (one by name, or all) to resolve their transforms on the
    /// next tick, optionally with their slots.
    pub fn invalid_update(&mut self, bone_name: Option<&str>, update_slots: bool) {
        match bone_name {
            Some(name) if !name.is_empty() => {
                let Some(index) = self.armature_data().bone(name).map(|(index, _)| index) else {
                    return;
                };
                self.bones[index].invalid_update();
                if update_slots {
                    for slot in &mut self.slots {
                        if slot.parent == index {
                            slot.invalid_update();
                        }
                    }
                }
            }
            _ => {
                for bone in &mut self.bones {
                    bone.invalid_update();
                }
                if update_slots {
                    for slot in &mut self.slots {
                        slot.invalid_update();
                    }
                }
            }
        }
    }

    /// First slot in draw order whose bounding box contains the point, in
    /// armature space.
    pub fn contains_point(&mut self, x: f32, y: f32) -> Option<usize> {
        for position in 0..self.sorted_slot_indices.len() {
            let index = self.sorted_slot_indices[position];
            let parent_matrix = self.bones[self.slots[index].parent].global_transform_matrix;
            if self.slots[index].contains_point(x, y, &parent_matrix) {
                return Some(index);
            }
        }
        None
    }

    /// Casts a segment across all bounding box slots. With out-params, picks
    /// the entry nearest A and the exit farthest from A and returns the entry
    /// slot; without them, returns the first hit in draw order.
    #[allow(clippy::too_many_arguments)]
    pub fn intersects_segment(
        &mut self,
        x_a: f32,
        y_a: f32,
        x_b: f32,
        y_b: f32,
        mut intersection_point_a: Option<&mut Point>,
        mut intersection_point_b: Option<&mut Point>,
        mut normal_radians: Option<&mut Point>,
    ) -> Option<usize> {
        let is_vertical = x_a == x_b;
        let mut d_min = 0.0;
        let mut d_max = 0.0;
        let mut int_x_a = 0.0;
        let mut int_y_a = 0.0;
        let mut int_x_b = 0.0;
        let mut int_y_b = 0.0;
        let mut int_radian_a = 0.0;
        let mut int_radian_b = 0.0;
        let mut int_slot_a: Option<usize> = None;
        let mut int_slot_b: Option<usize> = None;

        for position in 0..self.sorted_slot_indices.len() {
            let index = self.sorted_slot_indices[position];
            let parent_matrix = self.bones[self.slots[index].parent].global_transform_matrix;
            let count = self.slots[index].intersects_segment(
                x_a,
                y_a,
                x_b,
                y_b,
                intersection_point_a.as_deref_mut(),
                intersection_point_b.as_deref_mut(),
                normal_radians.as_deref_mut(),
                &parent_matrix,
            );
            if count <= 0 {
                continue;
            }

            if intersection_point_a.is_none() && intersection_point_b.is_none() {
                int_slot_a = Some(index);
                break;
            }

            if let Some(point) = intersection_point_a.as_deref_mut() {
                let mut d = if is_vertical { point.y - y_a } else { point.x - x_a };
                if d < 0.0 {
                    d = -d;
                }
                if int_slot_a.is_none() || d < d_min {
                    d_min = d;
                    int_x_a = point.x;
                    int_y_a = point.y;
                    int_slot_a = Some(index);
                    if let Some(normals) = normal_radians.as_deref_mut() {
                        int_radian_a = normals.x;
                    }
                }
            }

            if let Some(point) = intersection_point_b.as_deref_mut() {
                let mut d = point.x - x_a;
                if d < 0.0 {
                    d = -d;
                }
                if int_slot_b.is_none() || d > d_max {
                    d_max = d;
                    int_x_b = point.x;
                    int_y_b = point.y;
                    int_slot_b = Some(index);
                    if let Some(normals) = normal_radians.as_deref_mut() {
                        int_radian_b = normals.y;
                    }
                }
            }
        }

        if int_slot_a.is_some() {
            if let Some(point) = intersection_point_a.as_deref_mut() {
                point.x = int_x_a;
                point.y = int_y_a;
                if let Some(normals) = normal_radians.as_deref_mut() {
                    normals.x = int_radian_a;
                }
            }
        }
        if int_slot_b.is_some() {
            if let Some(point) = intersection_point_b.as_deref_mut() {
                point.x = int_x_b;
                point.y = int_y_b;
                if let Some(normals) = normal_radians.as_deref_mut() {
                    normals.y = int_radian_b;
                }
            }
        }
        int_slot_a
    }

    fn with_animation<R>(&mut self, action: impl FnOnce(&mut Animation, &mut Armature) -> R) -> R {
        let mut animation = mem::take(&mut self.animation);
        let result = action(&mut animation, self);
        self.animation = animation;
        result
    }

    /// Plays an animation from the start, or with no name resumes or replays
    /// the last one (falling back to the default animation).
    pub fn play(
        &mut self,
        animation_name: Option<&str>,
        play_times: i32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.play(armature, animation_name, play_times)
        })
    }

    /// Cross-fades to an animation, fading out states per `fade_out_mode`.
    pub fn fade_in(
        &mut self,
        animation_name: &str,
        fade_in_time: f32,
        play_times: i32,
        layer: i32,
        group: Option<&str>,
        fade_out_mode: AnimationFadeOutMode,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.fade_in(
                armature,
                animation_name,
                fade_in_time,
                play_times,
                layer,
                group,
                fade_out_mode,
            )
        })
    }

    /// Plays from a full playback request; the escape hatch behind the
    /// shorthand methods.
    pub fn play_config(&mut self, config: &AnimationConfig) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| animation.play_config(armature, config))
    }

    pub fn goto_and_play_by_time(
        &mut self,
        animation_name: &str,
        time: f32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_play_by_time(armature, animation_name, time, play_times)
        })
    }

    pub fn goto_and_play_by_frame(
        &mut self,
        animation_name: &str,
        frame: u32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_play_by_frame(armature, animation_name, frame, play_times)
        })
    }

    pub fn goto_and_play_by_progress(
        &mut self,
        animation_name: &str,
        progress: f32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_play_by_progress(armature, animation_name, progress, play_times)
        })
    }

    pub fn goto_and_stop_by_time(
        &mut self,
        animation_name: &str,
        time: f32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_stop_by_time(armature, animation_name, time)
        })
    }

    pub fn goto_and_stop_by_frame(
        &mut self,
        animation_name: &str,
        frame: u32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_stop_by_frame(armature, animation_name, frame)
        })
    }

    pub fn goto_and_stop_by_progress(
        &mut self,
        animation_name: &str,
        progress: f32,
    ) -> Result<StateId, Error> {
        self.with_animation(|animation, armature| {
            animation.goto_and_stop_by_progress(armature, animation_name, progress)
        })
    }

    /// Pauses one state by name, or every state.
    pub fn stop(&mut self, animation_name: Option<&str>) {
        self.animation.stop(animation_name);
    }

    /// Restricts a state to one bone, and with `recursive` to its subtree.
    pub fn add_bone_mask(&mut self, state: StateId, name: &str, recursive: bool) {
        self.with_animation(|animation, armature| {
            if let Some(state) = animation.state_mut(state) {
                state.add_bone_mask(armature, name, recursive);
            }
        });
    }

    /// Removes a bone from a state's mask, and with `recursive` its subtree.
    pub fn remove_bone_mask(&mut self, state: StateId, name: &str, recursive: bool) {
        self.with_animation(|animation, armature| {
            if let Some(state) = animation.state_mut(state) {
                state.remove_bone_mask(armature, name, recursive);
            }
        });
    }

    /// Changes a slot's display immediately, outside the armature tick.
    pub(crate) fn set_slot_display_index(&mut self, slot_index: usize, value: i32, rt: &mut Runtime) {
        if slot_index >= self.slots.len() {
            return;
        }
        self.slots[slot_index].set_display_index(value, false);
        self.update_slot(slot_index, -1, rt);
    }

    /// Enables pose caching at `value` frames per second and pushes the rate
    /// down to nested armatures.
    pub(crate) fn set_cache_frame_rate(&mut self, value: f32, rt: &mut Runtime) {
        if self.cache.cache_frame_rate == value {
            return;
        }
        let data = Arc::clone(&self.data);
        self.cache.enable(&data.armatures[self.armature_index], value);

        for index in 0..self.slots.len() {
            if let Some(child_id) = self.slots[index].child_armature {
                if let Some(mut child) = rt.take(child_id) {
                    child.set_cache_frame_rate(value, rt);
                    rt.put_back(child_id, child);
                }
            }
        }
    }

    pub fn cache_frame_rate(&self) -> f32 {
        self.cache.cache_frame_rate
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn set_flip_x(&mut self, value: bool) {
        if self.flip_x != value {
            self.flip_x = value;
            self.invalid_update(None, false);
        }
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    pub fn set_flip_y(&mut self, value: bool) {
        if self.flip_y != value {
            self.flip_y = value;
            self.invalid_update(None, false);
        }
    }

    pub fn id(&self) -> ArmatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.armature_data().name
    }

    pub fn data(&self) -> &DragonBonesData {
        &self.data
    }

    pub fn armature_data(&self) -> &ArmatureData {
        &self.data.armatures[self.armature_index]
    }

    pub fn has_animation(&self, animation_name: &str) -> bool {
        self.armature_data()
            .animation_index
            .contains_key(animation_name)
    }

    /// Names of the armature's animations, in data order.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.armature_data()
            .animations
            .iter()
            .map(|animation| animation.name.as_str())
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.armature_data().user_data.as_ref()
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut Animation {
        &mut self.animation
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    pub fn bone_by_name(&self, name: &str) -> Option<&Bone> {
        let (index, _) = self.armature_data().bone(name)?;
        self.bones.get(index)
    }

    pub fn bone_by_name_mut(&mut self, name: &str) -> Option<&mut Bone> {
        let index = self.armature_data().bone(name)?.0;
        self.bones.get_mut(index)
    }

    pub fn slot_by_name(&self, name: &str) -> Option<&Slot> {
        let (index, _) = self.armature_data().slot(name)?;
        self.slots.get(index)
    }

    pub fn slot_by_name_mut(&mut self, name: &str) -> Option<&mut Slot> {
        let index = self.armature_data().slot(name)?.0;
        self.slots.get_mut(index)
    }

    /// Slot indices in draw order, back to front.
    pub fn sorted_slot_indices(&self) -> &[usize] {
        &self.sorted_slot_indices
    }

    /// Host armature and slot when this is a nested display.
    pub fn parent(&self) -> Option<(ArmatureId, usize)> {
        self.parent
    }

    pub fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    pub fn disposed(&self) -> bool {
        self.disposed
    }
}

fn fade_in_child(rt: &mut Runtime, id: ArmatureId, animation_name: &str) {
    if let Some(mut child) = rt.take(id) {
        child
            .fade_in(
                animation_name,
                -1.0,
                -1,
                0,
                None,
                AnimationFadeOutMode::SameLayerAndGroup,
            )
            .ok();
        rt.put_back(id, child);
    }
}
