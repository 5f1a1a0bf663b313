use super::animation_state::{AnimationState, BlendPool};
use super::armature::Armature;
use super::context::Runtime;
use super::timeline::ChildOp;
use crate::{AnimationBlendType, AnimationConfig, AnimationFadeOutMode, Error, TimelineType};
use log::warn;
use std::sync::Arc;

/// Handle to one playing [`AnimationState`]. Never reused within an
/// armature; lookups on a removed state simply return nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateId(u32);

/// Plays animation data and manages the armature's animation states.
///
/// States are kept ordered by layer, highest first, with blend-tree parents
/// ahead of their children so a parent's sampled weights reach the children
/// within the same tick.
#[derive(Debug)]
pub struct Animation {
    /// Play speed of all states. 1 is normal, 0 stops, above 1 is faster.
    pub time_scale: f32,
    pub(crate) inherit_time_scale: f32,
    states: Vec<AnimationState>,
    blend: BlendPool,
    animation_dirty: bool,
    last_state: Option<StateId>,
    next_state_id: u32,
    /// Animation names queued for nested armatures, drained on the next tick.
    child_fades: Vec<String>,
}

impl Default for Animation {
    fn default() -> Self {
        Animation {
            time_scale: 1.0,
            inherit_time_scale: 1.0,
            states: Vec::new(),
            blend: BlendPool::default(),
            animation_dirty: false,
            last_state: None,
            next_state_id: 0,
            child_fades: Vec::new(),
        }
    }
}

impl Animation {
    fn next_id(&mut self) -> StateId {
        let id = StateId(self.next_state_id);
        self.next_state_id = self.next_state_id.wrapping_add(1);
        id
    }

    pub(crate) fn advance_time(
        &mut self,
        armature: &mut Armature,
        rt: &mut Runtime,
        passed_time: f32,
    ) {
        let mut passed_time = passed_time;
        if passed_time < 0.0 {
            // Only states play in reverse; the manager always moves forward.
            passed_time = -passed_time;
        }

        self.inherit_time_scale = match armature.parent {
            Some((parent_id, _)) if armature.inherit_animation => rt
                .armature(parent_id)
                .map_or(self.time_scale, |parent| {
                    parent.animation.inherit_time_scale * self.time_scale
                }),
            _ => self.time_scale,
        };
        if self.inherit_time_scale != 1.0 {
            passed_time *= self.inherit_time_scale;
        }

        if !self.child_fades.is_empty() {
            let names: Vec<String> = self.child_fades.drain(..).collect();
            for name in &names {
                for index in 0..armature.slots.len() {
                    let Some(child_id) = armature.slots[index].child_armature else {
                        continue;
                    };
                    if let Some(mut child) = rt.take(child_id) {
                        if child.inherit_animation
                            && child.has_animation(name)
                            && child.animation.get_state(name).is_none()
                        {
                            child
                                .fade_in(
                                    name,
                                    -1.0,
                                    -1,
                                    0,
                                    None,
                                    AnimationFadeOutMode::SameLayerAndGroup,
                                )
                                .ok();
                        }
                        rt.put_back(child_id, child);
                    }
                }
            }
        }

        self.blend.resize(armature.bones.len(), armature.slots.len());
        self.blend.reset();

        let data = Arc::clone(&armature.data);
        let mut ops: Vec<ChildOp> = Vec::new();

        if self.states.len() == 1 {
            let fade_done = {
                let state = &self.states[0];
                state.core.fade_state > 0 && state.core.sub_fade_state > 0
            };
            if fade_done {
                if let Some(removed) = self.states.pop() {
                    if self.last_state == Some(removed.core.id) {
                        self.last_state = None;
                    }
                    self.release_children(&removed.children);
                }
            } else {
                let animation_index = self.states[0].core.animation_index;
                let cache_frame_rate = if armature.cache.cache_frame_rate > 0.0 {
                    armature.cache.animations[animation_index].cache_frame_rate
                } else {
                    0.0
                };

                if self.animation_dirty && cache_frame_rate > 0.0 {
                    self.animation_dirty = false;
                    armature.cache_animation = Some(animation_index);
                }

                let cascade = self.states[0].advance_time(
                    passed_time,
                    cache_frame_rate,
                    None,
                    &data,
                    armature,
                    &mut self.blend,
                    rt,
                    &mut ops,
                );
                if cascade {
                    let id = self.states[0].core.id;
                    self.fade_out_subtree(id);
                }
                self.apply_child_ops(&mut ops);
            }
        } else if self.states.len() > 1 {
            let mut orphans: Vec<StateId> = Vec::new();
            let mut removed_any = false;
            let mut index = 0;

            while index < self.states.len() {
                let fade_done = {
                    let state = &self.states[index];
                    state.core.fade_state > 0 && state.core.sub_fade_state > 0
                };
                if fade_done {
                    let removed = self.states.remove(index);
                    orphans.extend(removed.children.iter().copied());
                    removed_any = true;
                    self.animation_dirty = true;
                    if self.last_state == Some(removed.core.id) {
                        self.last_state = None;
                    }
                    continue;
                }

                let parent_weight = self.states[index].core.parent.and_then(|parent_id| {
                    self.states
                        .iter()
                        .find(|state| state.core.id == parent_id)
                        .map(|parent| parent.core.weight_result)
                });

                let cascade = self.states[index].advance_time(
                    passed_time,
                    0.0,
                    parent_weight,
                    &data,
                    armature,
                    &mut self.blend,
                    rt,
                    &mut ops,
                );
                if cascade {
                    let id = self.states[index].core.id;
                    self.fade_out_subtree(id);
                }
                self.apply_child_ops(&mut ops);

                index += 1;
            }

            // Orphans fade out on their own and get swept next tick.
            self.release_children(&orphans);

            if removed_any && self.last_state.is_none() {
                self.last_state = self.states.last().map(|state| state.core.id);
            }

            armature.cache_frame_index = -1;
        } else {
            armature.cache_frame_index = -1;
        }
    }

    fn release_children(&mut self, children: &[StateId]) {
        for &child_id in children {
            if let Some(child) = self.state_mut(child_id) {
                child.core.fade_state = 1;
                child.core.sub_fade_state = 1;
                child.core.parent = None;
            }
        }
    }

    fn fade_out_subtree(&mut self, parent_id: StateId) {
        let children = match self.state(parent_id) {
            Some(parent) => parent.children.clone(),
            None => return,
        };
        for child_id in children {
            let newly_fading = match self.state_mut(child_id) {
                Some(child) => child.fade_out(999_999.0, true),
                None => continue,
            };
            if newly_fading {
                self.fade_out_subtree(child_id);
            }
        }
    }

    fn apply_child_ops(&mut self, ops: &mut Vec<ChildOp>) {
        for op in ops.drain(..) {
            match op {
                ChildOp::SetProgress(id, progress) => {
                    if let Some(child) = self.state_mut(id) {
                        let value = progress * child.total_time();
                        child.set_current_time(value);
                    }
                }
                ChildOp::SetWeight(id, weight) => {
                    if let Some(child) = self.state_mut(id) {
                        child.set_weight(weight);
                    }
                }
                ChildOp::SetParameters(id, x, y) => {
                    if let Some(child) = self.state_mut(id) {
                        child.set_parameters(x, y);
                    }
                }
                ChildOp::Activate(id) => {
                    if let Some(child) = self.state_mut(id) {
                        child.active_timeline();
                    }
                }
            }
        }
    }

    fn fade_out_states(&mut self, config: &AnimationConfig) {
        let mut targets: Vec<StateId> = Vec::new();
        for state in &self.states {
            if state.core.parent.is_some() {
                continue;
            }
            let matched = match config.fade_out_mode {
                AnimationFadeOutMode::SameLayer => state.core.layer == config.layer,
                AnimationFadeOutMode::SameGroup => state.core.group == config.group,
                AnimationFadeOutMode::SameLayerAndGroup => {
                    state.core.layer == config.layer && state.core.group == config.group
                }
                AnimationFadeOutMode::All => true,
                AnimationFadeOutMode::None | AnimationFadeOutMode::Single => false,
            };
            if matched {
                targets.push(state.core.id);
            }
        }

        for id in targets {
            let newly_fading = match self.state_mut(id) {
                Some(state) => state.fade_out(config.fade_out_time, config.pause_fade_out),
                None => continue,
            };
            if newly_fading {
                self.fade_out_subtree(id);
            }
        }
    }

    /// Removes every state without fading.
    pub fn reset(&mut self) {
        self.states.clear();
        self.animation_dirty = false;
        self.last_state = None;
        self.child_fades.clear();
    }

    /// Pauses one state by name, or every state.
    pub fn stop(&mut self, animation_name: Option<&str>) {
        match animation_name {
            Some(name) => {
                if let Some(state) = self
                    .states
                    .iter_mut()
                    .rev()
                    .find(|state| state.core.name == name)
                {
                    state.stop();
                }
            }
            None => {
                for state in &mut self.states {
                    state.stop();
                }
            }
        }
    }

    /// Starts playing from a full playback request.
    pub(crate) fn play_config(
        &mut self,
        armature: &mut Armature,
        config: &AnimationConfig,
    ) -> Result<StateId, Error> {
        let data = Arc::clone(&armature.data);
        let armature_data = &data.armatures[armature.armature_index];

        let Some(&animation_index) = armature_data.animation_index.get(config.animation.as_str())
        else {
            warn!(
                "unknown animation {} in armature {}",
                config.animation, armature_data.name
            );
            return Err(Error::UnknownAnimation {
                name: config.animation.clone(),
            });
        };
        let animation_data = &armature_data.animations[animation_index];

        if config.fade_out_mode == AnimationFadeOutMode::Single {
            for state in &self.states {
                if state.core.fade_state < 1
                    && state.core.layer == config.layer
                    && state.core.animation_index == animation_index
                {
                    return Ok(state.core.id);
                }
            }
        }

        let mut config = config.clone();

        if self.states.is_empty() {
            config.fade_in_time = 0.0;
        } else if config.fade_in_time < 0.0 {
            config.fade_in_time = animation_data.fade_in_time;
        }
        if config.fade_out_time < 0.0 {
            config.fade_out_time = config.fade_in_time;
        }
        if config.time_scale <= -100.0 {
            config.time_scale = 1.0 / animation_data.scale;
        }

        if animation_data.frame_count > 0 {
            if config.position < 0.0 {
                config.position %= animation_data.duration;
                config.position = animation_data.duration - config.position;
            } else if config.position == animation_data.duration {
                // Start a hair before the end so the first tick still samples.
                config.position -= 0.000001;
            } else if config.position > animation_data.duration {
                config.position %= animation_data.duration;
            }

            if config.duration > 0.0 && config.position + config.duration > animation_data.duration
            {
                config.duration = animation_data.duration - config.position;
            }

            if config.play_times < 0 {
                config.play_times = animation_data.play_times as i32;
            }
        } else {
            config.play_times = 1;
            config.position = 0.0;
            if config.duration > 0.0 {
                config.duration = 0.0;
            }
        }
        if config.duration == 0.0 {
            config.duration = -1.0;
        }

        self.fade_out_states(&config);

        let id = self.next_id();
        let state = AnimationState::new(armature, animation_index, &config, id);
        self.animation_dirty = true;
        armature.cache_frame_index = -1;

        match self
            .states
            .iter()
            .position(|existing| state.core.layer > existing.core.layer)
        {
            Some(position) => self.states.insert(position, state),
            None => self.states.push(state),
        }

        // Nested armatures pick the animation up on the next tick.
        self.child_fades.push(config.animation.clone());

        if !animation_data.animation_timelines.is_empty() {
            let mut child_names: Vec<&String> =
                animation_data.animation_timelines.keys().collect();
            child_names.sort_unstable();

            for child_name in child_names {
                let Ok(child_id) = self.fade_in(
                    armature,
                    child_name,
                    0.0,
                    1,
                    config.layer,
                    None,
                    AnimationFadeOutMode::Single,
                ) else {
                    continue;
                };

                let timelines = &animation_data.animation_timelines[child_name];
                let has_progress = timelines
                    .iter()
                    .any(|timeline| timeline.timeline_type == TimelineType::AnimationProgress);

                let Some(parent) = self.state_mut(id) else {
                    break;
                };
                parent.add_child_timelines(child_id, timelines, armature);
                let parent_blend_type = parent.core.blend_type;

                if let Some(child) = self.state_mut(child_id) {
                    child.core.action_enabled = false;
                    child.core.reset_to_pose = false;
                    child.stop();

                    if parent_blend_type != AnimationBlendType::None {
                        if let Some(timeline_data) = timelines.iter().find(|timeline| {
                            timeline.timeline_type == TimelineType::AnimationProgress
                        }) {
                            child.core.position_x = timeline_data.x;
                            child.core.position_y = timeline_data.y;
                        }
                        child.set_weight(0.0);
                    }

                    if has_progress || child.core.parent.is_none() {
                        child.core.parent = Some(id);
                    }
                }

                // The parent must advance before its children.
                let parent_index = self.states.iter().position(|state| state.core.id == id);
                let child_index = self
                    .states
                    .iter()
                    .position(|state| state.core.id == child_id);
                if let (Some(parent_index), Some(child_index)) = (parent_index, child_index) {
                    if child_index < parent_index {
                        let parent_state = self.states.remove(parent_index);
                        self.states.insert(child_index, parent_state);
                    }
                }
            }
        }

        self.last_state = Some(id);
        Ok(id)
    }

    /// Plays an animation from the start. With no name, resumes the paused
    /// last state, replays the finished one, or falls back to the default
    /// animation.
    pub(crate) fn play(
        &mut self,
        armature: &mut Armature,
        animation_name: Option<&str>,
        play_times: i32,
    ) -> Result<StateId, Error> {
        let mut config = AnimationConfig {
            reset_to_pose: true,
            play_times,
            fade_in_time: 0.0,
            ..AnimationConfig::default()
        };

        if let Some(name) = animation_name.filter(|name| !name.is_empty()) {
            config.animation = name.to_string();
            return self.play_config(armature, &config);
        }

        let last = self.last_state.and_then(|id| {
            self.state(id).map(|state| {
                (
                    id,
                    state.is_playing(),
                    state.is_completed(),
                    state.name().to_string(),
                )
            })
        });

        match last {
            None => {
                if let Some(default_index) = armature.armature_data().default_animation {
                    config.animation =
                        armature.armature_data().animations[default_index].name.clone();
                    self.play_config(armature, &config)
                } else {
                    Err(Error::UnknownAnimation {
                        name: String::new(),
                    })
                }
            }
            Some((id, playing, completed, _)) if !playing && !completed => {
                if let Some(last) = self.state_mut(id) {
                    last.play();
                }
                Ok(id)
            }
            Some((_, _, _, name)) => {
                config.animation = name;
                self.play_config(armature, &config)
            }
        }
    }

    /// Cross-fades to an animation, fading out current states per
    /// `fade_out_mode`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fade_in(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        fade_in_time: f32,
        play_times: i32,
        layer: i32,
        group: Option<&str>,
        fade_out_mode: AnimationFadeOutMode,
    ) -> Result<StateId, Error> {
        let config = AnimationConfig {
            fade_out_mode,
            play_times,
            layer,
            fade_in_time,
            animation: animation_name.to_string(),
            group: group.unwrap_or("").to_string(),
            ..AnimationConfig::default()
        };
        self.play_config(armature, &config)
    }

    pub(crate) fn goto_and_play_by_time(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        time: f32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        let config = AnimationConfig {
            reset_to_pose: true,
            play_times,
            position: time,
            fade_in_time: 0.0,
            animation: animation_name.to_string(),
            ..AnimationConfig::default()
        };
        self.play_config(armature, &config)
    }

    pub(crate) fn goto_and_play_by_frame(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        frame: u32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        let armature_data = armature.armature_data();
        let position = match armature_data.animation_index.get(animation_name) {
            Some(&index) => {
                let animation_data = &armature_data.animations[index];
                if animation_data.frame_count > 0 {
                    animation_data.duration * frame as f32 / animation_data.frame_count as f32
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        let config = AnimationConfig {
            reset_to_pose: true,
            play_times,
            position,
            fade_in_time: 0.0,
            animation: animation_name.to_string(),
            ..AnimationConfig::default()
        };
        self.play_config(armature, &config)
    }

    pub(crate) fn goto_and_play_by_progress(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        progress: f32,
        play_times: i32,
    ) -> Result<StateId, Error> {
        let armature_data = armature.armature_data();
        let position = match armature_data.animation_index.get(animation_name) {
            Some(&index) => armature_data.animations[index].duration * progress.max(0.0),
            None => 0.0,
        };

        let config = AnimationConfig {
            reset_to_pose: true,
            play_times,
            position,
            fade_in_time: 0.0,
            animation: animation_name.to_string(),
            ..AnimationConfig::default()
        };
        self.play_config(armature, &config)
    }

    pub(crate) fn goto_and_stop_by_time(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        time: f32,
    ) -> Result<StateId, Error> {
        let id = self.goto_and_play_by_time(armature, animation_name, time, 1)?;
        if let Some(state) = self.state_mut(id) {
            state.stop();
        }
        Ok(id)
    }

    pub(crate) fn goto_and_stop_by_frame(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        frame: u32,
    ) -> Result<StateId, Error> {
        let id = self.goto_and_play_by_frame(armature, animation_name, frame, 1)?;
        if let Some(state) = self.state_mut(id) {
            state.stop();
        }
        Ok(id)
    }

    pub(crate) fn goto_and_stop_by_progress(
        &mut self,
        armature: &mut Armature,
        animation_name: &str,
        progress: f32,
    ) -> Result<StateId, Error> {
        let id = self.goto_and_play_by_progress(armature, animation_name, progress, 1)?;
        if let Some(state) = self.state_mut(id) {
            state.stop();
        }
        Ok(id)
    }

    pub fn state(&self, id: StateId) -> Option<&AnimationState> {
        self.states.iter().find(|state| state.core.id == id)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut AnimationState> {
        self.states.iter_mut().find(|state| state.core.id == id)
    }

    /// Latest state playing under this name.
    pub fn get_state(&self, animation_name: &str) -> Option<&AnimationState> {
        self.get_state_in_layer(animation_name, -1)
    }

    /// Latest state playing under this name on the given layer. A negative
    /// layer matches every layer.
    pub fn get_state_in_layer(
        &self,
        animation_name: &str,
        layer: i32,
    ) -> Option<&AnimationState> {
        self.states.iter().rev().find(|state| {
            state.core.name == animation_name && (layer < 0 || state.core.layer == layer)
        })
    }

    /// All states, ordered by layer with parents ahead of children.
    pub fn states(&self) -> &[AnimationState] {
        &self.states
    }

    pub fn is_playing(&self) -> bool {
        self.states.iter().any(|state| state.is_playing())
    }

    /// True once every state has finished playing.
    pub fn is_completed(&self) -> bool {
        !self.states.is_empty() && self.states.iter().all(|state| state.is_completed())
    }

    pub fn last_animation_state(&self) -> Option<&AnimationState> {
        self.last_state.and_then(|id| self.state(id))
    }

    pub fn last_animation_name(&self) -> Option<&str> {
        self.last_animation_state().map(|state| state.name())
    }
}
