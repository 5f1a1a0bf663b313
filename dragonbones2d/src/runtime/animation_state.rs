use super::animation::StateId;
use super::armature::Armature;
use super::context::Runtime;
use super::event::{EventKind, EventObject};
use super::timeline::{ChildOp, Timeline, TimelineKind, TimelinePass};
use crate::{
    AnimationBlendType, AnimationConfig, ArmatureData, DEFORM_VERTEX_OFFSET, DragonBonesData,
    TIMELINE_FRAME_VALUE_COUNT, TimelineData, TimelineType,
};
use std::collections::{HashMap, HashSet};

/// Weight accumulator for one animated target.
///
/// The first state to claim the target on a tick assigns, later states
/// accumulate, and a higher layer consumes the weight budget before lower
/// layers get a share. `dirty` counts the claims taken this tick.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct BlendState {
    pub dirty: i32,
    pub layer: i32,
    pub left_weight: f32,
    pub layer_weight: f32,
    pub blend_weight: f32,
}

impl BlendState {
    pub(crate) fn update(&mut self, layer: i32, weight: f32) -> bool {
        let mut weight = weight;

        if self.dirty > 0 {
            if self.left_weight > 0.0 {
                if self.layer != layer {
                    if self.layer_weight >= self.left_weight {
                        self.dirty += 1;
                        self.layer = layer;
                        self.left_weight = 0.0;
                        self.blend_weight = 0.0;
                        return false;
                    }

                    self.layer = layer;
                    self.left_weight -= self.layer_weight;
                    self.layer_weight = 0.0;
                }

                weight *= self.left_weight;
                self.dirty += 1;
                self.blend_weight = weight;
                self.layer_weight += self.blend_weight;
                return true;
            }

            return false;
        }

        self.dirty += 1;
        self.layer = layer;
        self.left_weight = 1.0;
        self.blend_weight = weight;
        self.layer_weight = weight;
        true
    }

    pub(crate) fn reset(&mut self) {
        self.dirty = 0;
        self.layer = 0;
        self.left_weight = 0.0;
        self.layer_weight = 0.0;
        self.blend_weight = 0.0;
    }
}

/// Accumulators for every blended target of one armature, shared by all of
/// its states and cleared at the top of each manager tick.
#[derive(Debug, Default)]
pub(crate) struct BlendPool {
    pub bone_transform: Vec<BlendState>,
    pub bone_alpha: Vec<BlendState>,
    pub slot_alpha: Vec<BlendState>,
    pub slot_z_index: Vec<BlendState>,
    pub slot_deform: HashMap<(usize, usize), BlendState>,
}

impl BlendPool {
    pub(crate) fn resize(&mut self, bone_count: usize, slot_count: usize) {
        self.bone_transform.resize(bone_count, BlendState::default());
        self.bone_alpha.resize(bone_count, BlendState::default());
        self.slot_alpha.resize(slot_count, BlendState::default());
        self.slot_z_index.resize(slot_count, BlendState::default());
    }

    pub(crate) fn reset(&mut self) {
        for state in &mut self.bone_transform {
            state.reset();
        }
        for state in &mut self.bone_alpha {
            state.reset();
        }
        for state in &mut self.slot_alpha {
            state.reset();
        }
        for state in &mut self.slot_z_index {
            state.reset();
        }
        for state in self.slot_deform.values_mut() {
            state.reset();
        }
    }
}

/// Playback fields of one state, shared read-only with its timelines while
/// they evaluate.
///
/// `playhead_state` packs two bits: bit 2 set while the playhead advances,
/// bit 1 set once the fade-in has committed. `fade_state` is -1 fading in,
/// 0 settled, 1 fading out, with `sub_fade_state` stepping -1 (about to
/// start) through 0 (running) to 1 (just finished).
#[derive(Debug)]
pub(crate) struct StateCore {
    pub id: StateId,
    pub name: String,
    pub group: String,
    pub animation_index: usize,
    pub action_enabled: bool,
    pub additive: bool,
    pub display_control: bool,
    pub reset_to_pose: bool,
    pub blend_type: AnimationBlendType,
    pub layer: i32,
    pub play_times: u32,
    pub time_scale: f32,
    pub weight: f32,
    pub parameter_x: f32,
    pub parameter_y: f32,
    pub position_x: f32,
    pub position_y: f32,
    pub auto_fade_out_time: f32,
    pub fade_total_time: f32,
    pub playhead_state: i32,
    pub fade_state: i32,
    pub sub_fade_state: i32,
    pub position: f32,
    pub duration: f32,
    pub fade_time: f32,
    pub time: f32,
    pub fade_progress: f32,
    pub weight_result: f32,
    pub parent: Option<StateId>,
}

/// One playing animation on one armature: a playhead, a fade envelope and
/// the timelines that drive bones, slots, constraints and child states.
///
/// States never touch the armature pose directly; every sample goes through
/// the [`BlendPool`] accumulators so layered and faded states mix by weight.
#[derive(Debug)]
pub struct AnimationState {
    pub(crate) core: StateCore,
    /// 2 rebuilds every timeline list, 1 only the bone and slot lists.
    pub(crate) timeline_dirty: u8,
    pub(crate) children: Vec<StateId>,
    pub(crate) action_timeline: Timeline,
    animation_duration: f32,
    bone_mask: Vec<String>,
    z_order_timeline: Option<Timeline>,
    bone_timelines: Vec<Timeline>,
    bone_blend_timelines: Vec<Timeline>,
    slot_timelines: Vec<Timeline>,
    slot_blend_timelines: Vec<Timeline>,
    constraint_timelines: Vec<Timeline>,
    animation_timelines: Vec<Timeline>,
    active_child_a: Option<StateId>,
    active_child_b: Option<StateId>,
}

impl AnimationState {
    pub(crate) fn new(
        armature: &Armature,
        animation_index: usize,
        config: &AnimationConfig,
        id: StateId,
    ) -> AnimationState {
        let animation_data = &armature.armature_data().animations[animation_index];

        let mut core = StateCore {
            id,
            name: if config.name.is_empty() {
                config.animation.clone()
            } else {
                config.name.clone()
            },
            group: config.group.clone(),
            animation_index,
            action_enabled: config.action_enabled,
            additive: config.additive,
            display_control: config.display_control,
            reset_to_pose: config.reset_to_pose,
            blend_type: animation_data.blend_type,
            layer: config.layer,
            play_times: config.play_times.max(0) as u32,
            time_scale: config.time_scale,
            weight: config.weight,
            parameter_x: 0.0,
            parameter_y: 0.0,
            position_x: 0.0,
            position_y: 0.0,
            auto_fade_out_time: config.auto_fade_out_time,
            fade_total_time: config.fade_in_time,
            playhead_state: if config.pause_fade_in { 2 } else { 3 },
            fade_state: -1,
            sub_fade_state: -1,
            position: 0.0,
            duration: 0.0,
            fade_time: 0.0,
            time: 0.0,
            fade_progress: 0.0,
            weight_result: 0.0,
            parent: None,
        };

        if config.duration < 0.0 {
            core.position = 0.0;
            core.duration = animation_data.duration;
            if config.position != 0.0 {
                if core.time_scale >= 0.0 {
                    core.time = config.position;
                } else {
                    core.time = config.position - core.duration;
                }
            }
        } else {
            core.position = config.position;
            core.duration = config.duration;
        }

        if core.time_scale < 0.0 && core.time == 0.0 {
            // Start reversed playback from the end.
            core.time = -0.000001;
        }

        if core.fade_total_time <= 0.0 {
            core.fade_progress = 0.999999;
        }

        let mut action_timeline = Timeline::new(
            TimelineKind::Action,
            animation_data.action_timeline,
            armature,
            &core,
        );
        action_timeline.current_time = core.time;
        if action_timeline.current_time < 0.0 {
            action_timeline.current_time = core.duration - action_timeline.current_time;
        }

        let z_order_timeline = animation_data.z_order_timeline.map(|timeline_data| {
            Timeline::new(TimelineKind::ZOrder, Some(timeline_data), armature, &core)
        });

        AnimationState {
            core,
            timeline_dirty: 2,
            children: Vec::new(),
            action_timeline,
            animation_duration: animation_data.duration,
            bone_mask: config.bone_mask.clone(),
            z_order_timeline,
            bone_timelines: Vec::new(),
            bone_blend_timelines: Vec::new(),
            slot_timelines: Vec::new(),
            slot_blend_timelines: Vec::new(),
            constraint_timelines: Vec::new(),
            animation_timelines: Vec::new(),
            active_child_a: None,
            active_child_b: None,
        }
    }

    /// Steps fade, playhead and every timeline. Returns true when the state
    /// just began its automatic fade out, so the caller can cascade it to
    /// blend-tree children.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn advance_time(
        &mut self,
        passed_time: f32,
        cache_frame_rate: f32,
        parent_weight_result: Option<f32>,
        data: &DragonBonesData,
        armature: &mut Armature,
        blend: &mut BlendPool,
        rt: &mut Runtime,
        ops: &mut Vec<ChildOp>,
    ) -> bool {
        if self.core.fade_state != 0 || self.core.sub_fade_state != 0 {
            self.advance_fade_time(passed_time, armature, rt);
        }

        if self.core.playhead_state == 3 {
            let mut passed = passed_time;
            if self.core.time_scale != 1.0 {
                passed *= self.core.time_scale;
            }
            self.core.time += passed;
        }

        if self.timeline_dirty != 0 {
            if self.timeline_dirty == 2 {
                self.update_timelines(data, armature);
            }
            self.timeline_dirty = 0;
            self.update_bone_and_slot_timelines(data, armature);
        }

        let is_blend_dirty = self.core.fade_state != 0 || self.core.sub_fade_state == 0;
        let is_cache_enabled = self.core.fade_state == 0 && cache_frame_rate > 0.0;
        let mut is_update_timeline = true;
        let mut is_update_bone_timeline = true;
        let time = self.core.time;

        self.core.weight_result = self.core.weight * self.core.fade_progress;
        if let Some(parent_weight_result) = parent_weight_result {
            self.core.weight_result *= parent_weight_result;
        }

        {
            let animation_data =
                &data.armatures[armature.armature_index].animations[self.core.animation_index];
            let mut pass = TimelinePass {
                data,
                animation_data,
                armature: &mut *armature,
                blend: &mut *blend,
                rt: &mut *rt,
                state: &self.core,
                ops: &mut *ops,
            };

            if self.action_timeline.play_state <= 0 {
                self.action_timeline.update(time, None, &mut pass);
            }

            if self.core.weight == 0.0 {
                return false;
            }

            if is_cache_enabled {
                // Snap to half cache frames so neighbors share samples.
                let interval = cache_frame_rate * 2.0;
                self.action_timeline.current_time =
                    (self.action_timeline.current_time * interval).floor() / interval;
            }

            let action_progress = self.action_timeline.progress();

            if let Some(timeline) = self.z_order_timeline.as_mut() {
                if timeline.play_state <= 0 {
                    timeline.update(time, Some(&action_progress), &mut pass);
                }
            }

            if is_cache_enabled {
                let cache_frame_index =
                    (self.action_timeline.current_time * cache_frame_rate).floor() as i32;
                if pass.armature.cache_frame_index == cache_frame_index {
                    is_update_timeline = false;
                    is_update_bone_timeline = false;
                } else {
                    pass.armature.cache_frame_index = cache_frame_index;
                    let cached = &mut pass.armature.cache.animations[self.core.animation_index]
                        .cached_frames[cache_frame_index as usize];
                    if *cached {
                        is_update_bone_timeline = false;
                    } else {
                        *cached = true;
                    }
                }
            }

            if is_update_timeline {
                let mut is_blend = false;
                let mut prev_target: Option<usize> = None;

                if is_update_bone_timeline {
                    for timeline in &mut self.bone_timelines {
                        if timeline.play_state <= 0 {
                            timeline.update(time, Some(&action_progress), &mut pass);
                        }

                        if let Some(bone) = timeline.kind.bone_target() {
                            if prev_target != Some(bone) {
                                let blend_state = &mut pass.blend.bone_transform[bone];
                                is_blend =
                                    blend_state.update(self.core.layer, self.core.weight_result);
                                prev_target = Some(bone);

                                if blend_state.dirty == 1 {
                                    // First claim this tick starts from scratch.
                                    let pose = &mut pass.armature.bones[bone].animation_pose;
                                    pose.x = 0.0;
                                    pose.y = 0.0;
                                    pose.rotation = 0.0;
                                    pose.skew = 0.0;
                                    pose.scale_x = 1.0;
                                    pose.scale_y = 1.0;
                                }
                            }

                            if is_blend {
                                timeline.blend(is_blend_dirty, &mut pass);
                            }
                        }
                    }
                }

                for timeline in &mut self.bone_blend_timelines {
                    if timeline.play_state <= 0 {
                        timeline.update(time, Some(&action_progress), &mut pass);
                    }
                    if let Some(bone) = timeline.kind.bone_target() {
                        if pass.blend.bone_alpha[bone]
                            .update(self.core.layer, self.core.weight_result)
                        {
                            timeline.blend(is_blend_dirty, &mut pass);
                        }
                    }
                }

                if self.core.display_control {
                    for timeline in &mut self.slot_timelines {
                        if timeline.play_state <= 0 {
                            let Some(slot) = timeline.kind.slot_target() else {
                                continue;
                            };
                            let allowed = match &pass.armature.slots[slot].display_controller {
                                None => true,
                                Some(controller) => {
                                    *controller == self.core.name || *controller == self.core.group
                                }
                            };
                            if allowed {
                                timeline.update(time, Some(&action_progress), &mut pass);
                            }
                        }
                    }
                }

                for timeline in &mut self.slot_blend_timelines {
                    if timeline.play_state <= 0 {
                        timeline.update(time, Some(&action_progress), &mut pass);

                        let claimed = match timeline.kind {
                            TimelineKind::SlotZIndex(slot) => pass.blend.slot_z_index[slot]
                                .update(self.core.layer, self.core.weight_result),
                            TimelineKind::SlotAlpha(slot) => pass.blend.slot_alpha[slot]
                                .update(self.core.layer, self.core.weight_result),
                            TimelineKind::SlotDeform {
                                slot,
                                display_frame,
                            } => pass
                                .blend
                                .slot_deform
                                .entry((slot, display_frame))
                                .or_default()
                                .update(self.core.layer, self.core.weight_result),
                            _ => false,
                        };
                        if claimed {
                            timeline.blend(is_blend_dirty, &mut pass);
                        }
                    }
                }

                for timeline in &mut self.constraint_timelines {
                    if timeline.play_state <= 0 {
                        timeline.update(time, Some(&action_progress), &mut pass);
                    }
                }

                if !self.animation_timelines.is_empty() {
                    let mut d_left = 100.0;
                    let mut d_right = 100.0;
                    let mut left_state: Option<StateId> = None;
                    let mut right_state: Option<StateId> = None;

                    for timeline in &mut self.animation_timelines {
                        if timeline.play_state <= 0 {
                            timeline.update(time, Some(&action_progress), &mut pass);
                        }

                        if self.core.blend_type == AnimationBlendType::E1D {
                            if let TimelineKind::AnimationProgress(child) = timeline.kind {
                                let d = self.core.parameter_x - timeline.blend_position();
                                if d >= 0.0 {
                                    if d < d_left {
                                        d_left = d;
                                        left_state = Some(child);
                                    }
                                } else if -d < d_right {
                                    d_right = -d;
                                    right_state = Some(child);
                                }
                            }
                        }
                    }

                    if let Some(left) = left_state {
                        if self.active_child_a != left_state {
                            if let Some(previous) = self.active_child_a {
                                pass.ops.push(ChildOp::SetWeight(previous, 0.0));
                            }
                            self.active_child_a = left_state;
                            pass.ops.push(ChildOp::Activate(left));
                        }
                        if self.active_child_b != right_state {
                            if let Some(previous) = self.active_child_b {
                                pass.ops.push(ChildOp::SetWeight(previous, 0.0));
                            }
                            self.active_child_b = right_state;
                        }

                        let left_weight = d_right / (d_left + d_right);
                        pass.ops.push(ChildOp::SetWeight(left, left_weight));
                        if let Some(right) = right_state {
                            pass.ops.push(ChildOp::SetWeight(right, 1.0 - left_weight));
                        }
                    }
                }
            }
        }

        let mut cascade_fade = false;

        if self.core.fade_state == 0 {
            if self.core.sub_fade_state > 0 {
                self.core.sub_fade_state = 0;
                self.remove_pose_timelines();
            }

            if self.action_timeline.play_state > 0 && self.core.auto_fade_out_time >= 0.0 {
                cascade_fade = self.fade_out(self.core.auto_fade_out_time, true);
            }
        }

        cascade_fade
    }

    fn advance_fade_time(&mut self, mut passed_time: f32, armature: &Armature, rt: &mut Runtime) {
        let is_fade_out = self.core.fade_state > 0;
        let event_active = self.core.parent.is_none() && self.core.action_enabled;

        if self.core.sub_fade_state < 0 {
            self.core.sub_fade_state = 0;
            if event_active {
                let kind = if is_fade_out {
                    EventKind::FadeOut
                } else {
                    EventKind::FadeIn
                };
                rt.buffer_event(EventObject::for_state(kind, armature.id(), self.core.id));
            }
        }

        if passed_time < 0.0 {
            passed_time = -passed_time;
        }
        self.core.fade_time += passed_time;

        if self.core.fade_time >= self.core.fade_total_time {
            self.core.sub_fade_state = 1;
            self.core.fade_progress = if is_fade_out { 0.0 } else { 1.0 };
        } else if self.core.fade_time > 0.0 {
            self.core.fade_progress = if is_fade_out {
                1.0 - self.core.fade_time / self.core.fade_total_time
            } else {
                self.core.fade_time / self.core.fade_total_time
            };
        } else {
            self.core.fade_progress = if is_fade_out { 1.0 } else { 0.0 };
        }

        if self.core.sub_fade_state > 0 {
            if !is_fade_out {
                self.core.playhead_state |= 1;
                self.core.fade_state = 0;
            }
            if event_active {
                let kind = if is_fade_out {
                    EventKind::FadeOutComplete
                } else {
                    EventKind::FadeInComplete
                };
                rt.buffer_event(EventObject::for_state(kind, armature.id(), self.core.id));
            }
        }
    }

    /// Builds the constraint timelines; runs once per timeline reset.
    fn update_timelines(&mut self, data: &DragonBonesData, armature: &Armature) {
        let armature_data = &data.armatures[armature.armature_index];
        let animation_data = &armature_data.animations[self.core.animation_index];

        for (constraint_index, constraint_data) in armature_data.constraints.iter().enumerate() {
            match animation_data.constraint_timelines.get(constraint_data.name()) {
                Some(timeline_datas) => {
                    for timeline_data in timeline_datas {
                        if timeline_data.timeline_type == TimelineType::IkConstraint {
                            self.constraint_timelines.push(Timeline::new(
                                TimelineKind::IkConstraint(constraint_index),
                                Some(*timeline_data),
                                armature,
                                &self.core,
                            ));
                        }
                    }
                }
                None => {
                    if self.core.reset_to_pose {
                        self.constraint_timelines.push(Timeline::new(
                            TimelineKind::IkConstraint(constraint_index),
                            None,
                            armature,
                            &self.core,
                        ));
                    }
                }
            }
        }
    }

    /// Reconciles the bone and slot timeline lists against the armature and
    /// the bone mask: keeps what still applies, builds what is missing,
    /// drops what the mask excludes. With `reset_to_pose`, targets the
    /// animation does not key get pose timelines that restore the setup
    /// value until the fade-in completes.
    fn update_bone_and_slot_timelines(&mut self, data: &DragonBonesData, armature: &mut Armature) {
        let armature_data = &data.armatures[armature.armature_index];
        let animation_data = &armature_data.animations[self.core.animation_index];

        {
            let mut leftover: HashSet<usize> = HashSet::new();
            for timeline in self.bone_timelines.iter().chain(&self.bone_blend_timelines) {
                if let Some(bone) = timeline.kind.bone_target() {
                    leftover.insert(bone);
                }
            }

            for (bone_index, bone_data) in armature_data.bones.iter().enumerate() {
                if !self.contains_bone_mask(&bone_data.name) {
                    continue;
                }
                if leftover.remove(&bone_index) {
                    continue;
                }

                match animation_data.bone_timelines.get(&bone_data.name) {
                    Some(timeline_datas) => {
                        for timeline_data in timeline_datas {
                            let (kind, blended) = match timeline_data.timeline_type {
                                TimelineType::BoneAll => {
                                    (TimelineKind::BoneAll(bone_index), false)
                                }
                                TimelineType::BoneTranslate => {
                                    (TimelineKind::BoneTranslate(bone_index), false)
                                }
                                TimelineType::BoneRotate => {
                                    (TimelineKind::BoneRotate(bone_index), false)
                                }
                                TimelineType::BoneScale => {
                                    (TimelineKind::BoneScale(bone_index), false)
                                }
                                TimelineType::BoneAlpha => {
                                    (TimelineKind::BoneAlpha(bone_index), true)
                                }
                                _ => continue,
                            };
                            let timeline =
                                Timeline::new(kind, Some(*timeline_data), armature, &self.core);
                            if blended {
                                self.bone_blend_timelines.push(timeline);
                            } else {
                                self.bone_timelines.push(timeline);
                            }
                        }
                    }
                    None => {
                        if self.core.reset_to_pose {
                            self.bone_timelines.push(Timeline::new(
                                TimelineKind::BoneAll(bone_index),
                                None,
                                armature,
                                &self.core,
                            ));
                        }
                    }
                }
            }

            if !leftover.is_empty() {
                self.bone_timelines.retain(|timeline| {
                    timeline
                        .kind
                        .bone_target()
                        .map_or(true, |bone| !leftover.contains(&bone))
                });
                self.bone_blend_timelines.retain(|timeline| {
                    timeline
                        .kind
                        .bone_target()
                        .map_or(true, |bone| !leftover.contains(&bone))
                });
            }
        }

        {
            let mut leftover: HashSet<usize> = HashSet::new();
            for timeline in self.slot_timelines.iter().chain(&self.slot_blend_timelines) {
                if let Some(slot) = timeline.kind.slot_target() {
                    leftover.insert(slot);
                }
            }

            let mut ffd_flags: Vec<usize> = Vec::new();

            for (slot_index, slot_data) in armature_data.slots.iter().enumerate() {
                let parent_bone_name = &armature_data.bones[slot_data.parent].name;
                if !self.contains_bone_mask(parent_bone_name) {
                    continue;
                }
                if leftover.remove(&slot_index) {
                    continue;
                }

                let mut display_index_flag = false;
                let mut color_flag = false;
                ffd_flags.clear();

                if let Some(timeline_datas) = animation_data.slot_timelines.get(&slot_data.name) {
                    for timeline_data in timeline_datas {
                        match timeline_data.timeline_type {
                            TimelineType::SlotDisplay => {
                                self.slot_timelines.push(Timeline::new(
                                    TimelineKind::SlotDisplay(slot_index),
                                    Some(*timeline_data),
                                    armature,
                                    &self.core,
                                ));
                                display_index_flag = true;
                            }
                            TimelineType::SlotZIndex => {
                                self.slot_blend_timelines.push(Timeline::new(
                                    TimelineKind::SlotZIndex(slot_index),
                                    Some(*timeline_data),
                                    armature,
                                    &self.core,
                                ));
                            }
                            TimelineType::SlotColor => {
                                self.slot_timelines.push(Timeline::new(
                                    TimelineKind::SlotColor(slot_index),
                                    Some(*timeline_data),
                                    armature,
                                    &self.core,
                                ));
                                color_flag = true;
                            }
                            TimelineType::SlotDeform => {
                                let frame_int_offset = animation_data.frame_int_offset
                                    + data.timeline_array
                                        [timeline_data.offset + TIMELINE_FRAME_VALUE_COUNT]
                                        as usize;
                                let mut geometry_offset = data.frame_int_array
                                    [frame_int_offset + DEFORM_VERTEX_OFFSET]
                                    as i32;
                                if geometry_offset < 0 {
                                    // Offsets past 32767 wrap in the packed stream.
                                    geometry_offset += 65536;
                                }
                                let geometry_offset = geometry_offset as usize;

                                let matched = armature.slots[slot_index]
                                    .display_frames
                                    .iter()
                                    .position(|frame| {
                                        frame.geometry_data().is_some_and(|geometry| {
                                            geometry.offset == geometry_offset
                                        })
                                    });
                                if let Some(display_frame_index) = matched {
                                    armature.slots[slot_index].display_frames
                                        [display_frame_index]
                                        .update_deform_vertices(&data.int_array);
                                    self.slot_blend_timelines.push(Timeline::new(
                                        TimelineKind::SlotDeform {
                                            slot: slot_index,
                                            display_frame: display_frame_index,
                                        },
                                        Some(*timeline_data),
                                        armature,
                                        &self.core,
                                    ));
                                    ffd_flags.push(geometry_offset);
                                }
                            }
                            TimelineType::SlotAlpha => {
                                self.slot_blend_timelines.push(Timeline::new(
                                    TimelineKind::SlotAlpha(slot_index),
                                    Some(*timeline_data),
                                    armature,
                                    &self.core,
                                ));
                            }
                            _ => {}
                        }
                    }
                }

                if self.core.reset_to_pose {
                    if !display_index_flag {
                        self.slot_timelines.push(Timeline::new(
                            TimelineKind::SlotDisplay(slot_index),
                            None,
                            armature,
                            &self.core,
                        ));
                    }
                    if !color_flag {
                        self.slot_timelines.push(Timeline::new(
                            TimelineKind::SlotColor(slot_index),
                            None,
                            armature,
                            &self.core,
                        ));
                    }

                    for display_frame_index in 0..armature.slots[slot_index].display_frames.len()
                    {
                        let frame = &armature.slots[slot_index].display_frames[display_frame_index];
                        if frame.deform.is_empty() {
                            continue;
                        }
                        let unkeyed = frame
                            .geometry_data()
                            .is_some_and(|geometry| !ffd_flags.contains(&geometry.offset));
                        if unkeyed {
                            self.slot_blend_timelines.push(Timeline::new(
                                TimelineKind::SlotDeform {
                                    slot: slot_index,
                                    display_frame: display_frame_index,
                                },
                                None,
                                armature,
                                &self.core,
                            ));
                        }
                    }
                }
            }

            if !leftover.is_empty() {
                self.slot_timelines.retain(|timeline| {
                    timeline
                        .kind
                        .slot_target()
                        .map_or(true, |slot| !leftover.contains(&slot))
                });
                self.slot_blend_timelines.retain(|timeline| {
                    timeline
                        .kind
                        .slot_target()
                        .map_or(true, |slot| !leftover.contains(&slot))
                });
            }
        }
    }

    /// Drops the pose timelines once the fade-in has restored the targets.
    fn remove_pose_timelines(&mut self) {
        self.bone_timelines.retain(|timeline| !timeline.is_pose());
        self.bone_blend_timelines.retain(|timeline| !timeline.is_pose());
        self.slot_timelines.retain(|timeline| !timeline.is_pose());
        self.slot_blend_timelines.retain(|timeline| !timeline.is_pose());
        self.constraint_timelines.retain(|timeline| !timeline.is_pose());
    }

    /// Wires the parent-side timelines that drive a blend-tree child.
    pub(crate) fn add_child_timelines(
        &mut self,
        child: StateId,
        timeline_datas: &[TimelineData],
        armature: &Armature,
    ) {
        for timeline_data in timeline_datas {
            match timeline_data.timeline_type {
                TimelineType::AnimationProgress => {
                    self.animation_timelines.push(Timeline::new(
                        TimelineKind::AnimationProgress(child),
                        Some(*timeline_data),
                        armature,
                        &self.core,
                    ));
                    self.core.reset_to_pose = false;
                }
                TimelineType::AnimationWeight => {
                    self.animation_timelines.push(Timeline::new(
                        TimelineKind::AnimationWeight(child),
                        Some(*timeline_data),
                        armature,
                        &self.core,
                    ));
                }
                TimelineType::AnimationParameter => {
                    self.animation_timelines.push(Timeline::new(
                        TimelineKind::AnimationParameters(child),
                        Some(*timeline_data),
                        armature,
                        &self.core,
                    ));
                }
                _ => {}
            }
        }

        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    /// Forces the slot timelines to resample; called when a blend space
    /// hands display control to this state.
    pub(crate) fn active_timeline(&mut self) {
        for timeline in &mut self.slot_timelines {
            timeline.dirty = true;
            timeline.current_time = -1.0;
        }
    }

    /// Resumes the playhead.
    pub fn play(&mut self) {
        self.core.playhead_state = 3;
    }

    /// Pauses the playhead; fades keep running.
    pub fn stop(&mut self) {
        self.core.playhead_state &= 1;
    }

    /// Starts fading the state out over `fade_out_time` seconds. Returns
    /// true when the fade just began; a weaker fade over an already fading
    /// state is ignored.
    pub(crate) fn fade_out(&mut self, mut fade_out_time: f32, pause_playhead: bool) -> bool {
        if fade_out_time < 0.0 {
            fade_out_time = 0.0;
        }

        if pause_playhead {
            self.core.playhead_state &= 2;
        }

        let mut newly_fading = false;
        if self.core.fade_state > 0 {
            if fade_out_time > self.core.fade_total_time - self.core.fade_time {
                return false;
            }
        } else {
            newly_fading = true;
            self.core.fade_state = 1;
            self.core.sub_fade_state = -1;

            if fade_out_time <= 0.0 || self.core.fade_progress <= 0.0 {
                // Keep the progress distinguishable from a finished fade.
                self.core.fade_progress = 0.000001;
            }

            for timeline in &mut self.bone_timelines {
                timeline.fade_out();
            }
            for timeline in &mut self.bone_blend_timelines {
                timeline.fade_out();
            }
            for timeline in &mut self.slot_timelines {
                timeline.fade_out();
            }
            for timeline in &mut self.slot_blend_timelines {
                timeline.fade_out();
            }
            for timeline in &mut self.constraint_timelines {
                timeline.fade_out();
            }
            for timeline in &mut self.animation_timelines {
                timeline.fade_out();
            }
        }

        self.core.display_control = false;
        self.core.fade_total_time = if self.core.fade_progress > 0.000001 {
            fade_out_time / self.core.fade_progress
        } else {
            0.0
        };
        self.core.fade_time = self.core.fade_total_time * (1.0 - self.core.fade_progress);

        newly_fading
    }

    /// True when the animation plays on this bone, either because the mask
    /// is empty or because it lists the bone.
    pub fn contains_bone_mask(&self, name: &str) -> bool {
        self.bone_mask.is_empty() || self.bone_mask.iter().any(|masked| masked == name)
    }

    /// Restricts the state to `name`, and with `recursive` to its subtree.
    pub(crate) fn add_bone_mask(&mut self, armature: &Armature, name: &str, recursive: bool) {
        let armature_data = armature.armature_data();
        let Some(target) = armature_data.bones.iter().position(|bone| bone.name == name) else {
            return;
        };

        if !self.bone_mask.iter().any(|masked| masked == name) {
            self.bone_mask.push(name.to_string());
        }

        if recursive {
            for (index, bone) in armature_data.bones.iter().enumerate() {
                if !self.bone_mask.iter().any(|masked| *masked == bone.name)
                    && bone_is_descendant(armature_data, index, target)
                {
                    self.bone_mask.push(bone.name.clone());
                }
            }
        }

        self.timeline_dirty = self.timeline_dirty.max(1);
    }

    /// Removes `name` from the mask. With `recursive` the subtree goes too;
    /// removing the last masked bone this way inverts into a mask of
    /// everything outside the subtree.
    pub(crate) fn remove_bone_mask(&mut self, armature: &Armature, name: &str, recursive: bool) {
        if let Some(index) = self.bone_mask.iter().position(|masked| masked == name) {
            self.bone_mask.remove(index);
        }

        if recursive {
            let armature_data = armature.armature_data();
            if let Some(target) = armature_data.bones.iter().position(|bone| bone.name == name) {
                if !self.bone_mask.is_empty() {
                    for (index, bone) in armature_data.bones.iter().enumerate() {
                        if bone_is_descendant(armature_data, index, target) {
                            if let Some(masked) =
                                self.bone_mask.iter().position(|masked| *masked == bone.name)
                            {
                                self.bone_mask.remove(masked);
                            }
                        }
                    }
                } else {
                    for (index, bone) in armature_data.bones.iter().enumerate() {
                        if index == target {
                            continue;
                        }
                        if !bone_is_descendant(armature_data, index, target) {
                            self.bone_mask.push(bone.name.clone());
                        }
                    }
                }
            }
        }

        self.timeline_dirty = self.timeline_dirty.max(1);
    }

    pub fn remove_all_bone_masks(&mut self) {
        self.bone_mask.clear();
        self.timeline_dirty = self.timeline_dirty.max(1);
    }

    /// Scrubs to an absolute time within the current loop.
    pub fn set_current_time(&mut self, value: f32) {
        let current_play_times = self
            .action_timeline
            .current_play_times
            .saturating_sub(if self.action_timeline.play_state > 0 { 1 } else { 0 });

        let mut value = value;
        if value < 0.0 || self.core.duration < value {
            value = (value % self.core.duration) + current_play_times as f32 * self.core.duration;
            if value < 0.0 {
                value += self.core.duration;
            }
        }

        if self.core.play_times > 0
            && current_play_times == self.core.play_times - 1
            && value == self.core.duration
            && self.core.parent.is_none()
        {
            // Keep the playhead short of the end so it does not complete.
            value = self.core.duration - 0.000001;
        }

        if self.core.time == value {
            return;
        }

        self.core.time = value;
        self.action_timeline
            .set_time(value, &self.core, self.animation_duration);

        if let Some(timeline) = self.z_order_timeline.as_mut() {
            timeline.play_state = -1;
        }
        for timeline in &mut self.bone_timelines {
            timeline.play_state = -1;
        }
        for timeline in &mut self.slot_timelines {
            timeline.play_state = -1;
        }
    }

    /// Sets the blend weight and marks the blended timelines for reapply.
    pub fn set_weight(&mut self, value: f32) {
        if self.core.weight == value {
            return;
        }

        self.core.weight = value;

        for timeline in &mut self.bone_timelines {
            timeline.dirty = true;
        }
        for timeline in &mut self.bone_blend_timelines {
            timeline.dirty = true;
        }
        for timeline in &mut self.slot_blend_timelines {
            timeline.dirty = true;
        }
    }

    /// Positions the playhead of a blend space; `x` picks between children.
    pub fn set_parameters(&mut self, x: f32, y: f32) {
        self.core.parameter_x = x;
        self.core.parameter_y = y;
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn group(&self) -> &str {
        &self.core.group
    }

    pub fn layer(&self) -> i32 {
        self.core.layer
    }

    pub fn weight(&self) -> f32 {
        self.core.weight
    }

    pub fn blend_type(&self) -> AnimationBlendType {
        self.core.blend_type
    }

    pub fn is_fade_in(&self) -> bool {
        self.core.fade_state < 0
    }

    pub fn is_fade_out(&self) -> bool {
        self.core.fade_state > 0
    }

    pub fn is_fade_complete(&self) -> bool {
        self.core.fade_state == 0
    }

    pub fn is_playing(&self) -> bool {
        (self.core.playhead_state & 2) != 0 && self.action_timeline.play_state <= 0
    }

    pub fn is_completed(&self) -> bool {
        self.action_timeline.play_state > 0
    }

    pub fn current_play_times(&self) -> u32 {
        self.action_timeline.current_play_times
    }

    /// The duration this state plays of its animation, in seconds.
    pub fn total_time(&self) -> f32 {
        self.core.duration
    }

    pub fn current_time(&self) -> f32 {
        self.action_timeline.current_time
    }
}

/// Whether `bone` sits strictly below `ancestor` in the hierarchy.
fn bone_is_descendant(armature_data: &ArmatureData, bone: usize, ancestor: usize) -> bool {
    if bone == ancestor {
        return false;
    }
    let mut current = armature_data.bones[bone].parent;
    while let Some(index) = current {
        if index == ancestor {
            return true;
        }
        current = armature_data.bones[index].parent;
    }
    false
}
