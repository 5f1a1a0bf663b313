use super::animation::StateId;
use super::animation_state::{BlendPool, StateCore};
use super::armature::Armature;
use super::constraint::Constraint;
use super::context::Runtime;
use super::event::{EventKind, EventObject};
use crate::{
    ActionType, AnimationData, ConstraintData, DEFORM_COUNT, DEFORM_FLOAT_OFFSET,
    DEFORM_VALUE_COUNT, DEFORM_VALUE_OFFSET, DragonBonesData, FRAME_CURVE_SAMPLES,
    FRAME_TWEEN_EASING_OR_CURVE_SAMPLE_COUNT, FRAME_TWEEN_TYPE, TIMELINE_FRAME_OFFSET,
    TIMELINE_FRAME_VALUE_COUNT, TIMELINE_FRAME_VALUE_OFFSET, TIMELINE_KEY_FRAME_COUNT,
    TIMELINE_OFFSET, TIMELINE_SCALE, TimelineData, TweenType, normalize_radian,
};
use std::f32::consts::PI;

/// Mirror of a state's main timeline progress. Every other timeline of the
/// same state reads it to inherit looping and play-state decisions.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ActionProgress {
    pub play_state: i32,
    pub current_play_times: u32,
    pub current_time: f32,
}

/// Deferred write to a blend-tree child state. Collected while the parent's
/// timelines run, applied by the manager before the child itself advances.
#[derive(Copy, Clone, Debug)]
pub(crate) enum ChildOp {
    SetProgress(StateId, f32),
    SetWeight(StateId, f32),
    SetParameters(StateId, f32, f32),
    /// Force the child's slot timelines to resample after it takes over.
    Activate(StateId),
}

/// Everything a timeline may touch while evaluating one tick.
pub(crate) struct TimelinePass<'a> {
    pub data: &'a DragonBonesData,
    pub animation_data: &'a AnimationData,
    pub armature: &'a mut Armature,
    pub blend: &'a mut BlendPool,
    pub rt: &'a mut Runtime,
    pub state: &'a StateCore,
    pub ops: &'a mut Vec<ChildOp>,
}

/// What a timeline drives, and the instance it drives it on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum TimelineKind {
    Action,
    ZOrder,
    BoneAll(usize),
    BoneTranslate(usize),
    BoneRotate(usize),
    BoneScale(usize),
    BoneAlpha(usize),
    SlotDisplay(usize),
    SlotColor(usize),
    SlotZIndex(usize),
    SlotAlpha(usize),
    SlotDeform { slot: usize, display_frame: usize },
    IkConstraint(usize),
    AnimationProgress(StateId),
    AnimationWeight(StateId),
    AnimationParameters(StateId),
}

impl TimelineKind {
    pub(crate) fn bone_target(&self) -> Option<usize> {
        match *self {
            TimelineKind::BoneAll(bone)
            | TimelineKind::BoneTranslate(bone)
            | TimelineKind::BoneRotate(bone)
            | TimelineKind::BoneScale(bone)
            | TimelineKind::BoneAlpha(bone) => Some(bone),
            _ => None,
        }
    }

    pub(crate) fn slot_target(&self) -> Option<usize> {
        match *self {
            TimelineKind::SlotDisplay(slot)
            | TimelineKind::SlotColor(slot)
            | TimelineKind::SlotZIndex(slot)
            | TimelineKind::SlotAlpha(slot)
            | TimelineKind::SlotDeform { slot, .. } => Some(slot),
            _ => None,
        }
    }
}

/// One decoder over a packed timeline, or over the bind pose when the state
/// has to restore a target its animation does not key (`timeline_data` is
/// `None` then and every sample yields the setup value).
///
/// The decoder tracks which key frame the playhead is inside, decodes the
/// tween described by that frame on arrival, and interpolates a small result
/// buffer every tick. `blend` folds the result into the armature through the
/// per-target weight accumulators; non-blended kinds apply directly where
/// noted on [`TimelineKind`].
#[derive(Debug)]
pub(crate) struct Timeline {
    pub kind: TimelineKind,
    /// A result is waiting that the target has not consumed yet.
    pub dirty: bool,
    /// -1 before the first sample, 0 while playing, 1 after the last loop.
    pub play_state: i32,
    pub current_play_times: u32,
    pub current_time: f32,
    timeline_data: Option<TimelineData>,
    is_tween: bool,
    frame_rate: u32,
    frame_rate_r: f32,
    frame_count: usize,
    frame_index: i32,
    frame_offset: usize,
    frame_value_offset: usize,
    position: f32,
    duration: f32,
    time_scale: f32,
    time_offset: f32,
    value_offset: usize,
    value_count: usize,
    value_scale: f32,
    tween_type: TweenType,
    curve_count: usize,
    frame_position: f32,
    frame_duration_r: f32,
    tween_easing: f32,
    tween_progress: f32,
    current: [f32; 2],
    difference: [f32; 2],
    result: [f32; 2],
    /// Wide results. Transform timelines keep values then deltas; color
    /// timelines keep current, next and the blended output back to back.
    rd: Vec<f32>,
    deform_count: usize,
    deform_offset: usize,
    same_value_offset: usize,
}

/// Offset of the blended color output inside `rd`.
const COLOR_RESULT: usize = 16;

impl Timeline {
    pub(crate) fn new(
        kind: TimelineKind,
        timeline_data: Option<TimelineData>,
        armature: &Armature,
        state: &StateCore,
    ) -> Timeline {
        let data = armature.data();
        let armature_data = armature.armature_data();
        let animation_data = &armature_data.animations[state.animation_index];
        let frame_rate = armature_data.frame_rate;

        let mut timeline = Timeline {
            kind,
            dirty: false,
            play_state: -1,
            current_play_times: 0,
            current_time: -1.0,
            timeline_data,
            is_tween: false,
            frame_rate,
            frame_rate_r: 1.0 / frame_rate as f32,
            frame_count: 0,
            frame_index: -1,
            frame_offset: 0,
            frame_value_offset: 0,
            position: state.position,
            duration: state.duration,
            time_scale: 1.0,
            time_offset: 0.0,
            value_offset: 0,
            value_count: 0,
            value_scale: 1.0,
            tween_type: TweenType::None,
            curve_count: 0,
            frame_position: 0.0,
            frame_duration_r: 0.0,
            tween_easing: 0.0,
            tween_progress: 0.0,
            current: [0.0; 2],
            difference: [0.0; 2],
            result: [0.0; 2],
            rd: Vec::new(),
            deform_count: 0,
            deform_offset: 0,
            same_value_offset: 0,
        };

        if let Some(timeline_data) = timeline_data {
            let offset = timeline_data.offset;
            timeline.frame_count = data.timeline_array[offset + TIMELINE_KEY_FRAME_COUNT] as usize;
            timeline.frame_value_offset =
                data.timeline_array[offset + TIMELINE_FRAME_VALUE_OFFSET] as usize;
            timeline.time_scale = 100.0 / data.timeline_array[offset + TIMELINE_SCALE] as f32;
            timeline.time_offset = data.timeline_array[offset + TIMELINE_OFFSET] as f32 * 0.01;
        }

        match kind {
            TimelineKind::Action | TimelineKind::ZOrder | TimelineKind::SlotDisplay(_) => {}
            TimelineKind::BoneAll(_) => {
                timeline.value_offset = animation_data.frame_float_offset;
                timeline.value_count = 6;
                timeline.rd = vec![0.0; 12];
            }
            TimelineKind::BoneTranslate(_)
            | TimelineKind::BoneRotate(_)
            | TimelineKind::BoneScale(_) => {
                timeline.value_offset = animation_data.frame_float_offset;
            }
            TimelineKind::BoneAlpha(_) | TimelineKind::SlotAlpha(_) => {
                timeline.value_offset = animation_data.frame_int_offset;
                timeline.value_scale = 0.01;
            }
            TimelineKind::SlotZIndex(_) => {
                timeline.value_offset = animation_data.frame_int_offset;
            }
            TimelineKind::SlotColor(_) => {
                timeline.value_offset = animation_data.frame_int_offset;
                timeline.rd = vec![0.0; 24];
            }
            TimelineKind::SlotDeform {
                slot,
                display_frame,
            } => {
                if let Some(timeline_data) = timeline_data {
                    let frame_int_offset = animation_data.frame_int_offset
                        + data.timeline_array[timeline_data.offset + TIMELINE_FRAME_VALUE_COUNT]
                            as usize;
                    timeline.value_count =
                        data.frame_int_array[frame_int_offset + DEFORM_VALUE_COUNT] as usize;
                    timeline.deform_count =
                        data.frame_int_array[frame_int_offset + DEFORM_COUNT] as usize;
                    timeline.deform_offset =
                        data.frame_int_array[frame_int_offset + DEFORM_VALUE_OFFSET] as usize;
                    let mut same_value_offset =
                        data.frame_int_array[frame_int_offset + DEFORM_FLOAT_OFFSET] as i32;
                    if same_value_offset < 0 {
                        // Offsets past 32767 wrap in the packed stream.
                        same_value_offset += 65536;
                    }
                    timeline.same_value_offset =
                        same_value_offset as usize + animation_data.frame_float_offset;
                    timeline.value_offset = animation_data.frame_float_offset;
                    timeline.value_scale = armature_data.scale;
                    timeline.rd = vec![0.0; timeline.value_count * 2];
                } else {
                    timeline.deform_count =
                        armature.slots[slot].display_frames[display_frame].deform.len();
                }
            }
            TimelineKind::IkConstraint(_) => {
                timeline.value_offset = animation_data.frame_int_offset;
                timeline.value_scale = 0.01;
            }
            TimelineKind::AnimationProgress(_)
            | TimelineKind::AnimationWeight(_)
            | TimelineKind::AnimationParameters(_) => {
                timeline.value_offset = animation_data.frame_int_offset;
                timeline.value_scale = 0.0001;
            }
        }

        timeline
    }

    pub(crate) fn progress(&self) -> ActionProgress {
        ActionProgress {
            play_state: self.play_state,
            current_play_times: self.current_play_times,
            current_time: self.current_time,
        }
    }

    /// True for timelines that only restore the bind pose.
    pub(crate) fn is_pose(&self) -> bool {
        self.timeline_data.is_none()
    }

    /// This child's coordinate in the parent's blend space.
    pub(crate) fn blend_position(&self) -> f32 {
        self.timeline_data.map_or(0.0, |timeline_data| timeline_data.x)
    }

    pub(crate) fn fade_out(&mut self) {
        match self.kind {
            TimelineKind::BoneAll(_) => {
                self.dirty = false;
                self.rd[2] = normalize_radian(self.rd[2]);
                self.rd[3] = normalize_radian(self.rd[3]);
            }
            TimelineKind::BoneRotate(_) => {
                self.dirty = false;
                self.result[0] = normalize_radian(self.result[0]);
                self.result[1] = normalize_radian(self.result[1]);
            }
            TimelineKind::SlotColor(_) => {
                // Keep dirty: the fade keeps easing the color out.
                self.is_tween = false;
            }
            _ => {
                self.dirty = false;
            }
        }
    }

    /// Scrub to an absolute state time and force a clean resample.
    pub(crate) fn set_time(&mut self, value: f32, state: &StateCore, animation_duration: f32) {
        self.set_current_time(value, state, animation_duration, None);
        self.frame_index = -1;
    }

    /// Resolves the playhead. Timelines that run at the animation's own pace
    /// copy the main timeline; scaled or offset ones resolve independently.
    fn set_current_time(
        &mut self,
        mut passed_time: f32,
        state: &StateCore,
        animation_duration: f32,
        action: Option<&ActionProgress>,
    ) -> bool {
        let prev_state = self.play_state;
        let prev_play_times = self.current_play_times;
        let prev_time = self.current_time;

        match action {
            Some(action) if self.frame_count <= 1 => {
                self.play_state = if action.play_state >= 0 { 1 } else { -1 };
                self.current_play_times = 1;
                self.current_time = action.current_time;
            }
            Some(action) if self.time_scale == 1.0 && self.time_offset == 0.0 => {
                self.play_state = action.play_state;
                self.current_play_times = action.current_play_times;
                self.current_time = action.current_time;
            }
            _ => {
                let play_times = state.play_times;
                let total_time = play_times as f32 * self.duration;

                passed_time *= self.time_scale;
                if self.time_offset != 0.0 {
                    passed_time += self.time_offset * animation_duration;
                }

                if play_times > 0 && (passed_time >= total_time || passed_time <= -total_time) {
                    if self.play_state <= 0 && state.playhead_state == 3 {
                        self.play_state = 1;
                    }
                    self.current_play_times = play_times;
                    if passed_time < 0.0 {
                        self.current_time = 0.0;
                    } else {
                        // Land just past the end so the final frame samples.
                        self.current_time = if self.play_state == 1 {
                            self.duration + 0.000001
                        } else {
                            self.duration
                        };
                    }
                } else {
                    if self.play_state != 0 && state.playhead_state == 3 {
                        self.play_state = 0;
                    }
                    if passed_time < 0.0 {
                        passed_time = -passed_time;
                        self.current_play_times = (passed_time / self.duration) as u32;
                        self.current_time = self.duration - passed_time % self.duration;
                    } else {
                        self.current_play_times = (passed_time / self.duration) as u32;
                        self.current_time = passed_time % self.duration;
                    }
                }

                self.current_time += self.position;
            }
        }

        if self.current_play_times == prev_play_times && self.current_time == prev_time {
            return false;
        }

        // Resample from scratch on start and on every loop wrap.
        if (prev_state < 0 && self.play_state != prev_state)
            || (self.play_state <= 0 && self.current_play_times != prev_play_times)
        {
            self.frame_index = -1;
        }

        true
    }

    pub(crate) fn update(
        &mut self,
        passed_time: f32,
        action: Option<&ActionProgress>,
        pass: &mut TimelinePass<'_>,
    ) {
        if self.kind == TimelineKind::Action {
            self.update_action(passed_time, pass);
            return;
        }

        if self.set_current_time(passed_time, pass.state, pass.animation_data.duration, action) {
            if self.frame_count > 1 {
                if let Some(timeline_data) = self.timeline_data {
                    let timeline_frame_index =
                        (self.current_time * self.frame_rate as f32) as usize;
                    let indices_offset = timeline_data.frame_indices_offset.unwrap_or(0);
                    let frame_index =
                        pass.data.frame_indices[indices_offset + timeline_frame_index] as i32;

                    if self.frame_index != frame_index {
                        self.frame_index = frame_index;
                        self.frame_offset = pass.animation_data.frame_offset
                            + pass.data.timeline_array
                                [timeline_data.offset + TIMELINE_FRAME_OFFSET + frame_index as usize]
                                as usize;
                        self.arrive_at_frame(action, pass);
                    }
                }
            } else if self.frame_index < 0 {
                self.frame_index = 0;
                if let Some(timeline_data) = self.timeline_data {
                    self.frame_offset = pass.animation_data.frame_offset
                        + pass.data.timeline_array[timeline_data.offset + TIMELINE_FRAME_OFFSET]
                            as usize;
                }
                self.arrive_at_frame(action, pass);
            }

            if self.is_tween || self.dirty {
                self.update_frame(pass);
            }
        }

        // Colors keep easing while their state fades, even on a still frame.
        if let TimelineKind::SlotColor(_) = self.kind {
            self.apply_color(pass);
        }
    }

    fn arrive_at_frame(&mut self, action: Option<&ActionProgress>, pass: &mut TimelinePass<'_>) {
        match self.kind {
            TimelineKind::Action => {}
            TimelineKind::ZOrder => self.apply_z_order(pass),
            TimelineKind::SlotDisplay(slot) => self.apply_display(slot, pass),
            _ => {
                self.tween_arrive(action, pass);
                match self.kind {
                    TimelineKind::BoneAll(_) => {
                        self.arrive_multiple(pass);
                        if self.is_tween && self.frame_index == self.frame_count as i32 - 1 {
                            // Loop wrap takes the short way around.
                            let count = self.value_count;
                            self.rd[count + 2] = normalize_radian(self.rd[count + 2]);
                            self.rd[count + 3] = normalize_radian(self.rd[count + 3]);
                        }
                        if self.timeline_data.is_none() {
                            self.rd[4] = 1.0;
                            self.rd[5] = 1.0;
                        }
                    }
                    TimelineKind::BoneTranslate(_) => self.arrive_double(pass),
                    TimelineKind::BoneRotate(_) => {
                        self.arrive_double(pass);
                        if self.is_tween && self.frame_index == self.frame_count as i32 - 1 {
                            self.difference[0] = normalize_radian(self.difference[0]);
                            self.difference[1] = normalize_radian(self.difference[1]);
                        }
                    }
                    TimelineKind::BoneScale(_) => {
                        self.arrive_double(pass);
                        if self.timeline_data.is_none() {
                            self.result = [1.0, 1.0];
                        }
                    }
                    TimelineKind::BoneAlpha(_) | TimelineKind::SlotAlpha(_) => {
                        self.arrive_single(pass);
                        if self.timeline_data.is_none() {
                            self.result[0] = 1.0;
                        }
                    }
                    TimelineKind::SlotZIndex(slot) => {
                        self.arrive_single(pass);
                        if self.timeline_data.is_none() {
                            self.result[0] =
                                pass.armature.armature_data().slots[slot].z_index as f32;
                        }
                    }
                    TimelineKind::SlotColor(slot) => self.arrive_color(slot, pass),
                    TimelineKind::SlotDeform { .. } => self.arrive_multiple(pass),
                    TimelineKind::IkConstraint(_) => self.arrive_double(pass),
                    TimelineKind::AnimationProgress(_) | TimelineKind::AnimationWeight(_) => {
                        self.arrive_single(pass);
                    }
                    TimelineKind::AnimationParameters(_) => self.arrive_double(pass),
                    TimelineKind::Action | TimelineKind::ZOrder | TimelineKind::SlotDisplay(_) => {}
                }
            }
        }
    }

    fn update_frame(&mut self, pass: &mut TimelinePass<'_>) {
        self.tween_update_progress(pass);

        match self.kind {
            TimelineKind::BoneAll(_) | TimelineKind::SlotDeform { .. } => {
                self.update_multiple(pass);
            }
            TimelineKind::BoneTranslate(_)
            | TimelineKind::BoneRotate(_)
            | TimelineKind::BoneScale(_) => self.update_double(),
            TimelineKind::BoneAlpha(_)
            | TimelineKind::SlotAlpha(_)
            | TimelineKind::SlotZIndex(_) => self.update_single(),
            TimelineKind::SlotColor(_) => self.update_color(),
            TimelineKind::IkConstraint(constraint) => {
                self.update_double();
                self.apply_ik(constraint, pass);
            }
            TimelineKind::AnimationProgress(child) => {
                self.update_single();
                pass.ops.push(ChildOp::SetProgress(child, self.result[0]));
                self.dirty = false;
            }
            TimelineKind::AnimationWeight(child) => {
                self.update_single();
                pass.ops.push(ChildOp::SetWeight(child, self.result[0]));
                self.dirty = false;
            }
            TimelineKind::AnimationParameters(child) => {
                self.update_double();
                pass.ops
                    .push(ChildOp::SetParameters(child, self.result[0], self.result[1]));
                self.dirty = false;
            }
            TimelineKind::Action | TimelineKind::ZOrder | TimelineKind::SlotDisplay(_) => {}
        }
    }

    /// Decodes the tween tag of the current frame. The last frame only
    /// tweens back to the first while another loop is still coming.
    fn tween_arrive(&mut self, action: Option<&ActionProgress>, pass: &TimelinePass<'_>) {
        let play_times = pass.state.play_times;
        let state_play_times =
            action.map_or(self.current_play_times, |action| action.current_play_times);

        if self.frame_count > 1
            && (self.frame_index != self.frame_count as i32 - 1
                || play_times == 0
                || state_play_times < play_times - 1)
        {
            let frame_array = &pass.data.frame_array;
            self.tween_type =
                TweenType::from_raw(frame_array[self.frame_offset + FRAME_TWEEN_TYPE]);
            self.is_tween = self.tween_type != TweenType::None;

            if self.is_tween {
                if self.tween_type == TweenType::Curve {
                    self.curve_count = frame_array
                        [self.frame_offset + FRAME_TWEEN_EASING_OR_CURVE_SAMPLE_COUNT]
                        as usize;
                } else if self.tween_type != TweenType::Line {
                    self.tween_easing = frame_array
                        [self.frame_offset + FRAME_TWEEN_EASING_OR_CURVE_SAMPLE_COUNT]
                        as f32
                        * 0.01;
                }
            } else {
                self.dirty = true;
            }

            self.frame_position = frame_array[self.frame_offset] as f32 * self.frame_rate_r;

            if self.frame_index == self.frame_count as i32 - 1 {
                self.frame_duration_r = 1.0 / (pass.animation_data.duration - self.frame_position);
            } else if let Some(timeline_data) = self.timeline_data {
                let next_frame_offset = pass.animation_data.frame_offset
                    + pass.data.timeline_array
                        [timeline_data.offset + TIMELINE_FRAME_OFFSET + self.frame_index as usize + 1]
                        as usize;
                let frame_duration =
                    frame_array[next_frame_offset] as f32 * self.frame_rate_r - self.frame_position;
                self.frame_duration_r = if frame_duration > 0.0 {
                    1.0 / frame_duration
                } else {
                    0.0
                };
            }
        } else {
            self.dirty = true;
            self.is_tween = false;
        }
    }

    fn tween_update_progress(&mut self, pass: &TimelinePass<'_>) {
        if !self.is_tween {
            return;
        }

        self.dirty = true;
        self.tween_progress = (self.current_time - self.frame_position) * self.frame_duration_r;

        if self.tween_type == TweenType::Curve {
            self.tween_progress = get_easing_curve_value(
                self.tween_progress,
                &pass.data.frame_array,
                self.curve_count,
                self.frame_offset + FRAME_CURVE_SAMPLES,
            );
        } else if self.tween_type != TweenType::Line {
            self.tween_progress =
                get_easing_value(self.tween_type, self.tween_progress, self.tween_easing);
        }
    }

    fn value_at(&self, data: &DragonBonesData, index: usize) -> f32 {
        match self.kind {
            TimelineKind::BoneAll(_)
            | TimelineKind::BoneTranslate(_)
            | TimelineKind::BoneRotate(_)
            | TimelineKind::BoneScale(_)
            | TimelineKind::SlotDeform { .. } => data.frame_float_array[index],
            _ => data.frame_int_array[index] as f32,
        }
    }

    fn arrive_single(&mut self, pass: &TimelinePass<'_>) {
        if self.timeline_data.is_some() {
            let value_offset = self.value_offset + self.frame_value_offset + self.frame_index as usize;
            if self.is_tween {
                let next_value_offset = if self.frame_index == self.frame_count as i32 - 1 {
                    self.value_offset + self.frame_value_offset
                } else {
                    value_offset + 1
                };
                self.current[0] = self.value_at(pass.data, value_offset) * self.value_scale;
                self.difference[0] =
                    self.value_at(pass.data, next_value_offset) * self.value_scale - self.current[0];
            } else {
                self.result[0] = self.value_at(pass.data, value_offset) * self.value_scale;
            }
        } else {
            self.result[0] = 0.0;
        }
    }

    fn update_single(&mut self) {
        if self.is_tween {
            self.result[0] = self.current[0] + self.difference[0] * self.tween_progress;
        }
    }

    fn arrive_double(&mut self, pass: &TimelinePass<'_>) {
        if self.timeline_data.is_some() {
            let value_offset =
                self.value_offset + self.frame_value_offset + self.frame_index as usize * 2;
            if self.is_tween {
                let next_value_offset = if self.frame_index == self.frame_count as i32 - 1 {
                    self.value_offset + self.frame_value_offset
                } else {
                    value_offset + 2
                };
                self.current[0] = self.value_at(pass.data, value_offset) * self.value_scale;
                self.current[1] = self.value_at(pass.data, value_offset + 1) * self.value_scale;
                self.difference[0] =
                    self.value_at(pass.data, next_value_offset) * self.value_scale - self.current[0];
                self.difference[1] = self.value_at(pass.data, next_value_offset + 1)
                    * self.value_scale
                    - self.current[1];
            } else {
                self.result[0] = self.value_at(pass.data, value_offset) * self.value_scale;
                self.result[1] = self.value_at(pass.data, value_offset + 1) * self.value_scale;
            }
        } else {
            self.result = [0.0, 0.0];
        }
    }

    fn update_double(&mut self) {
        if self.is_tween {
            self.result[0] = self.current[0] + self.difference[0] * self.tween_progress;
            self.result[1] = self.current[1] + self.difference[1] * self.tween_progress;
        }
    }

    fn arrive_multiple(&mut self, pass: &TimelinePass<'_>) {
        let value_count = self.value_count;
        if self.timeline_data.is_some() {
            let value_offset =
                self.value_offset + self.frame_value_offset + self.frame_index as usize * value_count;
            if self.is_tween {
                let next_value_offset = if self.frame_index == self.frame_count as i32 - 1 {
                    self.value_offset + self.frame_value_offset
                } else {
                    value_offset + value_count
                };
                for i in 0..value_count {
                    self.rd[value_count + i] = (self.value_at(pass.data, next_value_offset + i)
                        - self.value_at(pass.data, value_offset + i))
                        * self.value_scale;
                }
            } else {
                for i in 0..value_count {
                    self.rd[i] = self.value_at(pass.data, value_offset + i) * self.value_scale;
                }
            }
        } else {
            for i in 0..value_count {
                self.rd[i] = 0.0;
            }
        }
    }

    fn update_multiple(&mut self, pass: &TimelinePass<'_>) {
        if !self.is_tween {
            return;
        }

        let value_count = self.value_count;
        let value_offset =
            self.value_offset + self.frame_value_offset + self.frame_index as usize * value_count;
        for i in 0..value_count {
            self.rd[i] = self.value_at(pass.data, value_offset + i) * self.value_scale
                + self.rd[value_count + i] * self.tween_progress;
        }
    }

    fn arrive_color(&mut self, slot: usize, pass: &TimelinePass<'_>) {
        if self.timeline_data.is_some() {
            let color_array = &pass.data.color_array;
            let frame_int_array = &pass.data.frame_int_array;
            let value_offset = self.value_offset + self.frame_value_offset + self.frame_index as usize;

            let mut color_offset = frame_int_array[value_offset] as i32;
            if color_offset < 0 {
                // Offsets past 32767 wrap in the packed stream.
                color_offset += 65536;
            }
            let color_offset = color_offset as usize;

            if self.is_tween {
                for i in 0..8 {
                    self.rd[i] = color_array[color_offset + i] as f32;
                }

                let mut next_offset = if self.frame_index == self.frame_count as i32 - 1 {
                    frame_int_array[self.value_offset + self.frame_value_offset] as i32
                } else {
                    frame_int_array[value_offset + 1] as i32
                };
                if next_offset < 0 {
                    next_offset += 65536;
                }
                let next_offset = next_offset as usize;

                for i in 0..8 {
                    self.rd[8 + i] = color_array[next_offset + i] as f32 - self.rd[i];
                }
            } else {
                for i in 0..4 {
                    self.rd[COLOR_RESULT + i] = color_array[color_offset + i] as f32 * 0.01;
                }
                for i in 4..8 {
                    self.rd[COLOR_RESULT + i] = color_array[color_offset + i] as f32;
                }
            }
        } else {
            let color = &pass.armature.armature_data().slots[slot].color;
            self.rd[COLOR_RESULT] = color.alpha_multiplier;
            self.rd[COLOR_RESULT + 1] = color.red_multiplier;
            self.rd[COLOR_RESULT + 2] = color.green_multiplier;
            self.rd[COLOR_RESULT + 3] = color.blue_multiplier;
            self.rd[COLOR_RESULT + 4] = color.alpha_offset;
            self.rd[COLOR_RESULT + 5] = color.red_offset;
            self.rd[COLOR_RESULT + 6] = color.green_offset;
            self.rd[COLOR_RESULT + 7] = color.blue_offset;
        }
    }

    fn update_color(&mut self) {
        if !self.is_tween {
            return;
        }

        self.dirty = true;
        let progress = self.tween_progress;
        for i in 0..4 {
            self.rd[COLOR_RESULT + i] = (self.rd[i] + self.rd[8 + i] * progress) * 0.01;
        }
        for i in 4..8 {
            self.rd[COLOR_RESULT + i] = self.rd[i] + self.rd[8 + i] * progress;
        }
    }

    fn apply_color(&mut self, pass: &mut TimelinePass<'_>) {
        let TimelineKind::SlotColor(slot) = self.kind else {
            return;
        };
        if !(self.is_tween || self.dirty) {
            return;
        }

        let mut value = [0.0_f32; 8];
        value.copy_from_slice(&self.rd[COLOR_RESULT..COLOR_RESULT + 8]);
        let fading = pass.state.fade_state != 0 || pass.state.sub_fade_state != 0;
        let fade_progress = pass.state.fade_progress;

        let slot = &mut pass.armature.slots[slot];
        let color = &mut slot.color_transform;
        let changed = color.alpha_multiplier != value[0]
            || color.red_multiplier != value[1]
            || color.green_multiplier != value[2]
            || color.blue_multiplier != value[3]
            || color.alpha_offset != value[4]
            || color.red_offset != value[5]
            || color.green_offset != value[6]
            || color.blue_offset != value[7];

        if fading {
            if changed {
                // Ease toward this state's color along the fade curve.
                let fade = fade_progress * fade_progress * fade_progress * fade_progress;
                color.alpha_multiplier += (value[0] - color.alpha_multiplier) * fade;
                color.red_multiplier += (value[1] - color.red_multiplier) * fade;
                color.green_multiplier += (value[2] - color.green_multiplier) * fade;
                color.blue_multiplier += (value[3] - color.blue_multiplier) * fade;
                color.alpha_offset += (value[4] - color.alpha_offset) * fade;
                color.red_offset += (value[5] - color.red_offset) * fade;
                color.green_offset += (value[6] - color.green_offset) * fade;
                color.blue_offset += (value[7] - color.blue_offset) * fade;
                slot.color_dirty = true;
            }
        } else if self.dirty {
            self.dirty = false;
            if changed {
                color.alpha_multiplier = value[0];
                color.red_multiplier = value[1];
                color.green_multiplier = value[2];
                color.blue_multiplier = value[3];
                color.alpha_offset = value[4];
                color.red_offset = value[5];
                color.green_offset = value[6];
                color.blue_offset = value[7];
                slot.color_dirty = true;
            }
        }
    }

    fn apply_z_order(&mut self, pass: &mut TimelinePass<'_>) {
        if self.play_state < 0 {
            return;
        }

        let count = pass.data.frame_array[self.frame_offset + 1] as usize;
        if count > 0 {
            let start = self.frame_offset + 2;
            pass.armature
                .sort_z_order(Some(&pass.data.frame_array[start..start + count]), 0);
        } else {
            pass.armature.sort_z_order(None, 0);
        }
    }

    fn apply_display(&mut self, slot: usize, pass: &mut TimelinePass<'_>) {
        if self.play_state < 0 {
            return;
        }

        let display_index = match self.timeline_data {
            Some(_) => pass.data.frame_array[self.frame_offset + 1] as i32,
            None => pass.armature.armature_data().slots[slot].display_index,
        };
        let slot = &mut pass.armature.slots[slot];
        if slot.display_index != display_index {
            slot.set_display_index(display_index, true);
        }
    }

    fn apply_ik(&mut self, constraint: usize, pass: &mut TimelinePass<'_>) {
        let (bend_positive, weight) = if self.timeline_data.is_some() {
            // The bend flag never interpolates; read the current key.
            let raw = if self.is_tween {
                self.current[0]
            } else {
                self.result[0]
            };
            (raw > 0.0, self.result[1])
        } else {
            let data_index = match &pass.armature.constraints[constraint] {
                Constraint::Ik(state) => state.constraint_index,
                Constraint::Path(state) => state.constraint_index,
            };
            match &pass.armature.armature_data().constraints[data_index] {
                ConstraintData::Ik(data) => (data.bend_positive, data.weight),
                ConstraintData::Path(_) => return,
            }
        };

        let armature = &mut *pass.armature;
        if let Some(state) = armature.constraints[constraint].as_ik_mut() {
            state.bend_positive = bend_positive;
            state.weight = weight;
        }
        let (constraints, bones) = (&mut armature.constraints, &mut armature.bones);
        constraints[constraint].invalid_update(bones);
        self.dirty = false;
    }

    /// Main-timeline tick: resolves time, fires actions for every key frame
    /// the playhead crossed since the previous tick, and queues the state's
    /// lifecycle events in crossing order.
    fn update_action(&mut self, passed_time: f32, pass: &mut TimelinePass<'_>) {
        let prev_state = self.play_state;
        let mut prev_play_times = self.current_play_times;
        let prev_time = self.current_time;

        if !self.set_current_time(passed_time, pass.state, pass.animation_data.duration, None) {
            return;
        }

        let event_active = pass.state.parent.is_none() && pass.state.action_enabled;

        if prev_state < 0 {
            if self.play_state == prev_state {
                return;
            }
            if pass.state.display_control && pass.state.reset_to_pose {
                // Undo draw-order changes left by whatever played before.
                pass.armature.sort_z_order(None, 0);
            }
            prev_play_times = self.current_play_times;
            if event_active {
                let event =
                    EventObject::for_state(EventKind::Start, pass.armature.id(), pass.state.id);
                pass.rt.buffer_event(event);
            }
        }

        let is_reverse = pass.state.time_scale < 0.0;
        let mut loop_complete = event_active && self.current_play_times != prev_play_times;
        let complete = loop_complete && self.play_state > 0;

        if self.frame_count > 1 {
            if let Some(timeline_data) = self.timeline_data {
                let timeline_frame_index = (self.current_time * self.frame_rate as f32) as usize;
                let indices_offset = timeline_data.frame_indices_offset.unwrap_or(0);
                let frame_index =
                    pass.data.frame_indices[indices_offset + timeline_frame_index] as i32;

                if self.frame_index != frame_index {
                    let mut crossed = self.frame_index;
                    self.frame_index = frame_index;
                    self.frame_offset = pass.animation_data.frame_offset
                        + pass.data.timeline_array
                            [timeline_data.offset + TIMELINE_FRAME_OFFSET + frame_index as usize]
                            as usize;

                    if is_reverse {
                        if crossed < 0 {
                            let prev_frame_index = (prev_time * self.frame_rate as f32) as usize;
                            crossed =
                                pass.data.frame_indices[indices_offset + prev_frame_index] as i32;
                            if self.current_play_times == prev_play_times && crossed == frame_index
                            {
                                // Still inside the starting frame.
                                crossed = -1;
                            }
                        }

                        while crossed >= 0 {
                            let frame_offset = pass.animation_data.frame_offset
                                + pass.data.timeline_array[timeline_data.offset
                                    + TIMELINE_FRAME_OFFSET
                                    + crossed as usize] as usize;
                            let frame_position =
                                pass.data.frame_array[frame_offset] as f32 / self.frame_rate as f32;

                            if self.position <= frame_position
                                && frame_position <= self.position + self.duration
                            {
                                self.cross_frame(crossed as usize, pass);
                            }

                            if loop_complete && crossed == 0 {
                                let event = EventObject::for_state(
                                    EventKind::LoopComplete,
                                    pass.armature.id(),
                                    pass.state.id,
                                );
                                pass.rt.buffer_event(event);
                                loop_complete = false;
                            }

                            if crossed > 0 {
                                crossed -= 1;
                            } else {
                                crossed = self.frame_count as i32 - 1;
                            }

                            if crossed == frame_index {
                                break;
                            }
                        }
                    } else {
                        if crossed < 0 {
                            let prev_frame_index = (prev_time * self.frame_rate as f32) as usize;
                            crossed =
                                pass.data.frame_indices[indices_offset + prev_frame_index] as i32;
                            let frame_offset = pass.animation_data.frame_offset
                                + pass.data.timeline_array[timeline_data.offset
                                    + TIMELINE_FRAME_OFFSET
                                    + crossed as usize] as usize;
                            let frame_position =
                                pass.data.frame_array[frame_offset] as f32 / self.frame_rate as f32;

                            if self.current_play_times == prev_play_times {
                                if prev_time <= frame_position {
                                    // The playhead sat on this frame; cross it too.
                                    if crossed > 0 {
                                        crossed -= 1;
                                    } else {
                                        crossed = self.frame_count as i32 - 1;
                                    }
                                } else if crossed == frame_index {
                                    // Still inside the starting frame.
                                    crossed = -1;
                                }
                            }
                        }

                        while crossed >= 0 {
                            if crossed < self.frame_count as i32 - 1 {
                                crossed += 1;
                            } else {
                                crossed = 0;
                            }

                            let frame_offset = pass.animation_data.frame_offset
                                + pass.data.timeline_array[timeline_data.offset
                                    + TIMELINE_FRAME_OFFSET
                                    + crossed as usize] as usize;
                            let frame_position =
                                pass.data.frame_array[frame_offset] as f32 / self.frame_rate as f32;

                            if self.position <= frame_position
                                && frame_position <= self.position + self.duration
                            {
                                self.cross_frame(crossed as usize, pass);
                            }

                            if loop_complete && crossed == 0 {
                                // The wrap is crossed before the first frame.
                                let event = EventObject::for_state(
                                    EventKind::LoopComplete,
                                    pass.armature.id(),
                                    pass.state.id,
                                );
                                pass.rt.buffer_event(event);
                                loop_complete = false;
                            }

                            if crossed == frame_index {
                                break;
                            }
                        }
                    }
                }
            }
        } else if self.frame_index < 0 {
            self.frame_index = 0;
            if self.timeline_data.is_some() {
                if let Some(timeline_data) = self.timeline_data {
                    self.frame_offset = pass.animation_data.frame_offset
                        + pass.data.timeline_array[timeline_data.offset + TIMELINE_FRAME_OFFSET]
                            as usize;
                }
                let frame_position =
                    pass.data.frame_array[self.frame_offset] as f32 / self.frame_rate as f32;

                if self.current_play_times == prev_play_times {
                    if prev_time <= frame_position {
                        self.cross_frame(0, pass);
                    }
                } else if self.position <= frame_position {
                    if !is_reverse && loop_complete {
                        let event = EventObject::for_state(
                            EventKind::LoopComplete,
                            pass.armature.id(),
                            pass.state.id,
                        );
                        pass.rt.buffer_event(event);
                        loop_complete = false;
                    }
                    self.cross_frame(0, pass);
                }
            }
        }

        if loop_complete {
            let event =
                EventObject::for_state(EventKind::LoopComplete, pass.armature.id(), pass.state.id);
            pass.rt.buffer_event(event);
        }
        if complete {
            let event =
                EventObject::for_state(EventKind::Complete, pass.armature.id(), pass.state.id);
            pass.rt.buffer_event(event);
        }
    }

    fn cross_frame(&self, frame_index: usize, pass: &mut TimelinePass<'_>) {
        if !pass.state.action_enabled {
            return;
        }
        let Some(timeline_data) = self.timeline_data else {
            return;
        };

        let frame_offset = pass.animation_data.frame_offset
            + pass.data.timeline_array[timeline_data.offset + TIMELINE_FRAME_OFFSET + frame_index]
                as usize;
        let action_count = pass.data.frame_array[frame_offset + 1] as usize;

        for i in 0..action_count {
            let action_index = pass.data.frame_array[frame_offset + 2 + i] as usize;
            let Some(action) = pass
                .armature
                .armature_data()
                .actions
                .get(action_index)
                .cloned()
            else {
                continue;
            };

            if action.action_type == ActionType::Play {
                pass.armature.buffer_action(action, true);
            } else {
                let kind = if action.action_type == ActionType::Frame {
                    EventKind::FrameEvent
                } else {
                    EventKind::SoundEvent
                };
                let event = EventObject {
                    kind,
                    name: action.name,
                    time: pass.data.frame_array[frame_offset] as f32 / self.frame_rate as f32,
                    armature: pass.armature.id(),
                    bone: action.bone,
                    slot: action.slot,
                    state: Some(pass.state.id),
                    data: action.data,
                };
                pass.rt.buffer_event(event);
            }
        }
    }

    /// Folds the decoded result into the armature through this target's
    /// weight accumulator. Only meaningful for the blended kinds; the state
    /// calls it right after the accumulator accepted this state's share.
    pub(crate) fn blend(&mut self, is_dirty: bool, pass: &mut TimelinePass<'_>) {
        match self.kind {
            TimelineKind::BoneAll(bone) => {
                let blend_state = &pass.blend.bone_transform[bone];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;
                let scale = pass.armature.armature_data().scale;

                let pose = &mut pass.armature.bones[bone].animation_pose;
                if accumulate {
                    pose.x += self.rd[0] * blend_weight * scale;
                    pose.y += self.rd[1] * blend_weight * scale;
                    pose.rotation += self.rd[2] * blend_weight;
                    pose.skew += self.rd[3] * blend_weight;
                    pose.scale_x += (self.rd[4] - 1.0) * blend_weight;
                    pose.scale_y += (self.rd[5] - 1.0) * blend_weight;
                } else {
                    pose.x = self.rd[0] * blend_weight * scale;
                    pose.y = self.rd[1] * blend_weight * scale;
                    pose.rotation = self.rd[2] * blend_weight;
                    pose.skew = self.rd[3] * blend_weight;
                    pose.scale_x = (self.rd[4] - 1.0) * blend_weight + 1.0;
                    pose.scale_y = (self.rd[5] - 1.0) * blend_weight + 1.0;
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    pass.armature.bones[bone].transform_dirty = true;
                }
            }
            TimelineKind::BoneTranslate(bone) => {
                let blend_state = &pass.blend.bone_transform[bone];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;
                let scale = pass.armature.armature_data().scale;

                let pose = &mut pass.armature.bones[bone].animation_pose;
                if accumulate {
                    pose.x += self.result[0] * blend_weight * scale;
                    pose.y += self.result[1] * blend_weight * scale;
                } else {
                    pose.x = self.result[0] * blend_weight * scale;
                    pose.y = self.result[1] * blend_weight * scale;
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    pass.armature.bones[bone].transform_dirty = true;
                }
            }
            TimelineKind::BoneRotate(bone) => {
                let blend_state = &pass.blend.bone_transform[bone];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;

                let pose = &mut pass.armature.bones[bone].animation_pose;
                if accumulate {
                    pose.rotation += self.result[0] * blend_weight;
                    pose.skew += self.result[1] * blend_weight;
                } else {
                    pose.rotation = self.result[0] * blend_weight;
                    pose.skew = self.result[1] * blend_weight;
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    pass.armature.bones[bone].transform_dirty = true;
                }
            }
            TimelineKind::BoneScale(bone) => {
                let blend_state = &pass.blend.bone_transform[bone];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;

                let pose = &mut pass.armature.bones[bone].animation_pose;
                if accumulate {
                    pose.scale_x += (self.result[0] - 1.0) * blend_weight;
                    pose.scale_y += (self.result[1] - 1.0) * blend_weight;
                } else {
                    pose.scale_x = (self.result[0] - 1.0) * blend_weight + 1.0;
                    pose.scale_y = (self.result[1] - 1.0) * blend_weight + 1.0;
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    pass.armature.bones[bone].transform_dirty = true;
                }
            }
            TimelineKind::BoneAlpha(bone) => {
                let blend_state = &pass.blend.bone_alpha[bone];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;

                let target = &mut pass.armature.bones[bone];
                if accumulate {
                    target.alpha += self.result[0] * blend_weight;
                    if target.alpha > 1.0 {
                        target.alpha = 1.0;
                    }
                } else {
                    target.alpha = self.result[0] * blend_weight;
                }

                pass.armature.alpha_dirty = true;
                if is_dirty || self.dirty {
                    self.dirty = false;
                }
            }
            TimelineKind::SlotAlpha(slot) => {
                let blend_state = &pass.blend.slot_alpha[slot];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;

                let target = &mut pass.armature.slots[slot];
                if accumulate {
                    target.alpha += self.result[0] * blend_weight;
                    if target.alpha > 1.0 {
                        target.alpha = 1.0;
                    }
                } else {
                    target.alpha = self.result[0] * blend_weight;
                }

                pass.armature.alpha_dirty = true;
                if is_dirty || self.dirty {
                    self.dirty = false;
                }
            }
            TimelineKind::SlotZIndex(slot) => {
                let blend_state = &pass.blend.slot_z_index[slot];
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;

                let value = self.result[0] * blend_weight;
                let target = &mut pass.armature.slots[slot];
                if accumulate {
                    target.z_index += value.round() as i32;
                } else {
                    target.z_index = value.round() as i32;
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    pass.armature.z_index_dirty = true;
                }
            }
            TimelineKind::SlotDeform {
                slot,
                display_frame,
            } => {
                let Some(blend_state) = pass.blend.slot_deform.get(&(slot, display_frame)) else {
                    return;
                };
                let blend_weight = blend_state.blend_weight;
                let accumulate = blend_state.dirty > 1;
                let reset = blend_state.dirty == 1;

                let frame = &mut pass.armature.slots[slot].display_frames[display_frame];
                if self.timeline_data.is_some() {
                    for i in 0..self.deform_count {
                        // Only a window of the vertices is keyed; the rest
                        // comes from the shared still stream.
                        let value = if i < self.deform_offset {
                            pass.data.frame_float_array[self.same_value_offset + i]
                        } else if i < self.deform_offset + self.value_count {
                            self.rd[i - self.deform_offset]
                        } else {
                            pass.data.frame_float_array
                                [self.same_value_offset + i - self.value_count]
                        };

                        if accumulate {
                            frame.deform[i] += value * blend_weight;
                        } else {
                            frame.deform[i] = value * blend_weight;
                        }
                    }
                } else if reset {
                    for i in 0..self.deform_count {
                        frame.deform[i] = 0.0;
                    }
                }

                if is_dirty || self.dirty {
                    self.dirty = false;
                    let target = &mut pass.armature.slots[slot];
                    if target.display_index == display_frame as i32 {
                        target.geometry_dirty = true;
                    }
                }
            }
            _ => {}
        }
    }
}

fn get_easing_value(tween_type: TweenType, progress: f32, easing: f32) -> f32 {
    let value = match tween_type {
        TweenType::QuadIn => progress * progress,
        TweenType::QuadOut => 1.0 - (1.0 - progress) * (1.0 - progress),
        TweenType::QuadInOut => 0.5 * (1.0 - (progress * PI).cos()),
        _ => progress,
    };
    (value - progress) * easing + progress
}

/// Samples a baked easing curve. Interior samples are stored per segment;
/// the end points are implied as 0 and 10000.
fn get_easing_curve_value(progress: f32, samples: &[i16], count: usize, offset: usize) -> f32 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let segment_count = count + 1;
    let value_index = (progress * segment_count as f32) as usize;
    let from_value = if value_index == 0 {
        0.0
    } else {
        samples[offset + value_index - 1] as f32
    };
    let to_value = if value_index == segment_count - 1 {
        10000.0
    } else {
        samples[offset + value_index] as f32
    };

    (from_value + (to_value - from_value) * (progress * segment_count as f32 - value_index as f32))
        * 0.0001
}
