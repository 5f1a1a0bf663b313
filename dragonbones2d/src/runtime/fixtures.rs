use crate::{
    ActionData, ActionType, AnimationData, ArmatureData, ArmatureDisplayData, BoneData,
    BoundingBoxData, BoundingBoxDisplayData, ConstraintData, DisplayData, DragonBonesData,
    GeometryData, IkConstraintData, ImageDisplayData, MeshDisplayData, PathDisplayData, SkinData,
    SlotData, TimelineData, TimelineType, Transform, TweenType, WeightData,
};
use std::sync::Arc;

pub(crate) const FRAME_RATE: u32 = 24;

pub(crate) fn assert_approx(actual: f32, expected: f32) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= 1.0e-3,
        "expected {expected}, got {actual} (diff {diff})"
    );
}

/// One authored key frame: a position in frame ticks, the tween out of the
/// frame, and the raw values the timeline kind expects.
pub(crate) struct Key {
    pub position: u32,
    pub tween: TweenType,
    pub easing: f32,
    pub curve: Vec<i16>,
    pub values: Vec<f32>,
}

pub(crate) fn key(position: u32, values: &[f32]) -> Key {
    Key {
        position,
        tween: TweenType::Line,
        easing: 0.0,
        curve: Vec::new(),
        values: values.to_vec(),
    }
}

pub(crate) fn stepped_key(position: u32, values: &[f32]) -> Key {
    Key {
        tween: TweenType::None,
        ..key(position, values)
    }
}

pub(crate) fn eased_key(position: u32, tween: TweenType, easing: f32, values: &[f32]) -> Key {
    Key {
        tween,
        easing,
        ..key(position, values)
    }
}

pub(crate) fn curve_key(position: u32, samples: &[i16], values: &[f32]) -> Key {
    Key {
        tween: TweenType::Curve,
        curve: samples.to_vec(),
        ..key(position, values)
    }
}

pub(crate) fn image_display(name: &str) -> Option<DisplayData> {
    Some(DisplayData::Image(ImageDisplayData {
        name: name.to_string(),
        path: name.to_string(),
        ..ImageDisplayData::default()
    }))
}

pub(crate) fn armature_display(name: &str, armature: &str) -> Option<DisplayData> {
    Some(DisplayData::Armature(ArmatureDisplayData {
        name: name.to_string(),
        armature: armature.to_string(),
        inherit_animation: true,
        ..ArmatureDisplayData::default()
    }))
}

pub(crate) fn rect_display(name: &str, width: f32, height: f32) -> Option<DisplayData> {
    Some(DisplayData::BoundingBox(BoundingBoxDisplayData {
        name: name.to_string(),
        transform: Transform::default(),
        bounding_box: BoundingBoxData::Rectangle { width, height },
    }))
}

pub(crate) fn polygon_display(name: &str, vertices: Vec<f32>) -> Option<DisplayData> {
    Some(DisplayData::BoundingBox(BoundingBoxDisplayData {
        name: name.to_string(),
        transform: Transform::default(),
        bounding_box: BoundingBoxData::polygon(vertices),
    }))
}

fn tween_raw(tween: TweenType) -> i16 {
    match tween {
        TweenType::None => 0,
        TweenType::Line => 1,
        TweenType::Curve => 2,
        TweenType::QuadIn => 3,
        TweenType::QuadOut => 4,
        TweenType::QuadInOut => 5,
    }
}

fn positions(keys: &[Key]) -> Vec<u32> {
    keys.iter().map(|key| key.position).collect()
}

/// Builds a data set the way the exporter packs one: display geometry in the
/// shared `int_array`/`float_array` pools, key frames in `frame_array`, frame
/// values in the per-type value streams, and a header per timeline in
/// `timeline_array` whose offsets are relative to the owning animation.
///
/// Armatures and animations are assembled in order: `begin_armature` opens an
/// armature, `animation` opens an animation inside it, and the timeline
/// writers append to whichever animation is open. `build` finalizes the data
/// set and rebuilds its lookup tables.
pub(crate) struct ArmatureFixture {
    data: DragonBonesData,
    armature: Option<ArmatureData>,
    animation: Option<AnimationData>,
    last_timeline: usize,
}

impl ArmatureFixture {
    pub(crate) fn new(name: &str) -> ArmatureFixture {
        ArmatureFixture {
            data: DragonBonesData {
                name: name.to_string(),
                version: "5.5".to_string(),
                frame_rate: FRAME_RATE,
                ..DragonBonesData::default()
            },
            armature: None,
            animation: None,
            last_timeline: 0,
        }
    }

    /// Re-times the most recently written timeline so it no longer runs at
    /// the animation's own pace: `scale` multiplies its speed and `offset`
    /// shifts it by that fraction of the animation.
    pub(crate) fn retime(&mut self, scale: f32, offset: f32) {
        self.data.timeline_array[self.last_timeline] = (100.0 / scale).round() as u16;
        self.data.timeline_array[self.last_timeline + 1] = (offset * 100.0).round() as u16;
    }

    pub(crate) fn begin_armature(&mut self, name: &str) {
        self.end_armature();
        self.armature = Some(ArmatureData {
            name: name.to_string(),
            frame_rate: FRAME_RATE,
            skins: vec![SkinData {
                name: "default".to_string(),
                displays: Vec::new(),
            }],
            ..ArmatureData::default()
        });
    }

    pub(crate) fn build(mut self) -> Arc<DragonBonesData> {
        self.end_armature();
        self.data.finish();
        Arc::new(self.data)
    }

    fn end_armature(&mut self) {
        self.end_animation();
        if let Some(armature) = self.armature.take() {
            self.data.armatures.push(armature);
        }
    }

    fn end_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            self.armature_mut().animations.push(animation);
        }
    }

    pub(crate) fn armature_mut(&mut self) -> &mut ArmatureData {
        self.armature.as_mut().expect("no armature in progress")
    }

    pub(crate) fn animation_mut(&mut self) -> &mut AnimationData {
        self.animation.as_mut().expect("no animation in progress")
    }

    pub(crate) fn bone(&mut self, name: &str, parent: Option<&str>) -> usize {
        self.bone_with(name, parent, Transform::default(), 0.0)
    }

    pub(crate) fn bone_with(
        &mut self,
        name: &str,
        parent: Option<&str>,
        transform: Transform,
        length: f32,
    ) -> usize {
        let armature = self.armature_mut();
        let parent = parent.map(|parent_name| {
            armature
                .bones
                .iter()
                .position(|bone| bone.name == parent_name)
                .expect("unknown parent bone")
        });
        armature.bones.push(BoneData {
            name: name.to_string(),
            parent,
            transform,
            length,
            ..BoneData::default()
        });
        armature.bones.len() - 1
    }

    pub(crate) fn slot(&mut self, name: &str, parent_bone: &str) -> usize {
        let armature = self.armature_mut();
        let parent = armature
            .bones
            .iter()
            .position(|bone| bone.name == parent_bone)
            .expect("unknown parent bone");
        armature.slots.push(SlotData {
            name: name.to_string(),
            parent,
            ..SlotData::default()
        });
        // Skin display lists stay dense by slot index.
        for skin in &mut armature.skins {
            skin.displays.push(Vec::new());
        }
        armature.slots.len() - 1
    }

    pub(crate) fn displays(&mut self, slot: usize, displays: Vec<Option<DisplayData>>) {
        let armature = self.armature_mut();
        let default_skin = armature.default_skin;
        armature.skins[default_skin].displays[slot] = displays;
    }

    pub(crate) fn skin_displays(
        &mut self,
        skin_name: &str,
        slot: usize,
        displays: Vec<Option<DisplayData>>,
    ) {
        let armature = self.armature_mut();
        let found = armature.skins.iter().position(|skin| skin.name == skin_name);
        let skin_index = match found {
            Some(index) => index,
            None => {
                let slots = armature.slots.len();
                armature.skins.push(SkinData {
                    name: skin_name.to_string(),
                    displays: vec![Vec::new(); slots],
                });
                armature.skins.len() - 1
            }
        };
        armature.skins[skin_index].displays[slot] = displays;
    }

    pub(crate) fn mesh_display(
        &mut self,
        name: &str,
        vertices: &[f32],
        triangles: &[i16],
    ) -> Option<DisplayData> {
        let float_offset = self.data.float_array.len();
        self.data.float_array.extend_from_slice(vertices);
        let offset = self.data.int_array.len();
        self.data.int_array.push((vertices.len() / 2) as i16);
        self.data.int_array.push((triangles.len() / 3) as i16);
        self.data.int_array.push(float_offset as i16);
        self.data.int_array.push(0);
        self.data.int_array.extend_from_slice(triangles);
        Some(DisplayData::Mesh(MeshDisplayData {
            name: name.to_string(),
            path: name.to_string(),
            geometry: GeometryData {
                offset,
                weight: None,
            },
            ..MeshDisplayData::default()
        }))
    }

    pub(crate) fn path_display(
        &mut self,
        name: &str,
        vertices: &[f32],
        curve_lengths: &[f32],
        closed: bool,
        constant_speed: bool,
    ) -> Option<DisplayData> {
        let float_offset = self.data.float_array.len();
        self.data.float_array.extend_from_slice(vertices);
        let offset = self.data.int_array.len();
        self.data.int_array.push((vertices.len() / 2) as i16);
        self.data.int_array.push(0);
        self.data.int_array.push(float_offset as i16);
        self.data.int_array.push(0);
        Some(DisplayData::Path(PathDisplayData {
            name: name.to_string(),
            closed,
            constant_speed,
            geometry: GeometryData {
                offset,
                weight: None,
            },
            curve_lengths: curve_lengths.to_vec(),
            ..PathDisplayData::default()
        }))
    }

    /// A skinned path. Each vertex is a list of `(bone, weight, x, y)`
    /// influences, with `bone` an index into `bones` and the position in that
    /// bone's local space. `bones` are armature bone indices.
    pub(crate) fn weighted_path_display(
        &mut self,
        name: &str,
        bones: &[usize],
        vertices: &[Vec<(usize, f32, f32, f32)>],
        curve_lengths: &[f32],
        closed: bool,
        constant_speed: bool,
    ) -> Option<DisplayData> {
        let float_offset = self.data.float_array.len();
        for vertex in vertices {
            for &(_, weight, x, y) in vertex {
                self.data.float_array.push(weight);
                self.data.float_array.push(x);
                self.data.float_array.push(y);
            }
        }

        let weight_offset = self.data.int_array.len();
        self.data.int_array.push(bones.len() as i16);
        self.data.int_array.push(float_offset as i16);
        for &bone in bones {
            self.data.int_array.push(bone as i16);
        }
        for vertex in vertices {
            self.data.int_array.push(vertex.len() as i16);
            for &(bone, _, _, _) in vertex {
                self.data.int_array.push(bone as i16);
            }
        }

        let offset = self.data.int_array.len();
        self.data.int_array.push(vertices.len() as i16);
        self.data.int_array.push(0);
        // Positions come from the weight stream, not the plain vertex pool.
        self.data.int_array.push(0);
        self.data.int_array.push(weight_offset as i16);

        let count = vertices.iter().map(Vec::len).sum();
        Some(DisplayData::Path(PathDisplayData {
            name: name.to_string(),
            closed,
            constant_speed,
            geometry: GeometryData {
                offset,
                weight: Some(WeightData {
                    count,
                    offset: weight_offset,
                    bones: bones.to_vec(),
                }),
            },
            curve_lengths: curve_lengths.to_vec(),
            ..PathDisplayData::default()
        }))
    }

    pub(crate) fn ik(
        &mut self,
        name: &str,
        root: &str,
        bone: Option<&str>,
        target: &str,
        bend_positive: bool,
        weight: f32,
    ) {
        let armature = self.armature_mut();
        let root = bone_index(&armature.bones, root);
        let bone = bone.map(|bone| bone_index(&armature.bones, bone));
        let target = bone_index(&armature.bones, target);
        let order = armature.constraints.len() as i32;
        armature.constraints.push(ConstraintData::Ik(IkConstraintData {
            name: name.to_string(),
            order,
            target,
            root,
            bone,
            scale_enabled: false,
            bend_positive,
            weight,
        }));
    }

    pub(crate) fn constraint(&mut self, constraint: ConstraintData) {
        self.armature_mut().constraints.push(constraint);
    }

    /// Registers a key-frame action and returns the index action timelines
    /// reference it by.
    pub(crate) fn frame_action(&mut self, action_type: ActionType, name: &str) -> usize {
        let armature = self.armature_mut();
        armature.actions.push(ActionData {
            action_type,
            name: name.to_string(),
            ..ActionData::default()
        });
        armature.actions.len() - 1
    }

    pub(crate) fn default_action(&mut self, animation_name: &str) {
        self.armature_mut().default_actions.push(ActionData {
            action_type: ActionType::Play,
            name: animation_name.to_string(),
            ..ActionData::default()
        });
    }

    /// Opens an animation. The value streams written from here on are
    /// relative to the array lengths captured now.
    pub(crate) fn animation(&mut self, name: &str, frame_count: u32, play_times: u32) {
        self.end_animation();
        self.animation = Some(AnimationData {
            name: name.to_string(),
            frame_count,
            play_times,
            duration: frame_count as f32 / FRAME_RATE as f32,
            frame_int_offset: self.data.frame_int_array.len(),
            frame_float_offset: self.data.frame_float_array.len(),
            frame_offset: self.data.frame_array.len(),
            ..AnimationData::default()
        });
    }

    pub(crate) fn translate_timeline(&mut self, bone: &str, keys: &[Key]) {
        let value_offset = self.write_floats(keys);
        let timeline = self.write_tweened(TimelineType::BoneTranslate, keys, value_offset);
        self.bone_timeline(bone, timeline);
    }

    pub(crate) fn rotate_timeline(&mut self, bone: &str, keys: &[Key]) {
        let value_offset = self.write_floats(keys);
        let timeline = self.write_tweened(TimelineType::BoneRotate, keys, value_offset);
        self.bone_timeline(bone, timeline);
    }

    pub(crate) fn scale_timeline(&mut self, bone: &str, keys: &[Key]) {
        let value_offset = self.write_floats(keys);
        let timeline = self.write_tweened(TimelineType::BoneScale, keys, value_offset);
        self.bone_timeline(bone, timeline);
    }

    /// Whole-transform keys: `[x, y, rotation, skew, scale_x, scale_y]`.
    pub(crate) fn bone_all_timeline(&mut self, bone: &str, keys: &[Key]) {
        let value_offset = self.write_floats(keys);
        let timeline = self.write_tweened(TimelineType::BoneAll, keys, value_offset);
        self.bone_timeline(bone, timeline);
    }

    pub(crate) fn bone_alpha_timeline(&mut self, bone: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 100.0);
        let timeline = self.write_tweened(TimelineType::BoneAlpha, keys, value_offset);
        self.bone_timeline(bone, timeline);
    }

    pub(crate) fn slot_alpha_timeline(&mut self, slot: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 100.0);
        let timeline = self.write_tweened(TimelineType::SlotAlpha, keys, value_offset);
        self.slot_timeline(slot, timeline);
    }

    pub(crate) fn slot_zindex_timeline(&mut self, slot: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 1.0);
        let timeline = self.write_tweened(TimelineType::SlotZIndex, keys, value_offset);
        self.slot_timeline(slot, timeline);
    }

    /// Color keys: `[aM, rM, gM, bM, aO, rO, gO, bO]`, multipliers in 0..1
    /// and offsets in raw channel units.
    pub(crate) fn slot_color_timeline(&mut self, slot: &str, keys: &[Key]) {
        let base = self.animation_mut().frame_int_offset;
        let value_offset = (self.data.frame_int_array.len() - base) as u16;
        for key in keys {
            let record = self.data.color_array.len();
            for i in 0..4 {
                self.data
                    .color_array
                    .push((key.values[i] * 100.0).round() as i16);
            }
            for i in 4..8 {
                self.data.color_array.push(key.values[i].round() as i16);
            }
            self.data.frame_int_array.push(record as i16);
        }
        let timeline = self.write_tweened(TimelineType::SlotColor, keys, value_offset);
        self.slot_timeline(slot, timeline);
    }

    /// Deform keys covering `value_count` floats starting at `window_offset`
    /// inside the display's deform buffer; `same` holds the floats outside
    /// the keyed window, in order.
    pub(crate) fn slot_deform_timeline(
        &mut self,
        slot: &str,
        geometry_offset: usize,
        window_offset: usize,
        same: &[f32],
        keys: &[Key],
    ) {
        let value_count = keys[0].values.len();
        let deform_count = value_count + same.len();
        let value_offset = self.write_floats(keys);

        let float_base = self.animation_mut().frame_float_offset;
        let same_offset = (self.data.frame_float_array.len() - float_base) as i16;
        self.data.frame_float_array.extend_from_slice(same);

        let int_base = self.animation_mut().frame_int_offset;
        let header_offset = (self.data.frame_int_array.len() - int_base) as u16;
        self.data.frame_int_array.push(geometry_offset as i16);
        self.data.frame_int_array.push(deform_count as i16);
        self.data.frame_int_array.push(value_count as i16);
        self.data.frame_int_array.push(window_offset as i16);
        self.data.frame_int_array.push(same_offset);

        let frame_rels = self.write_keys(keys);
        let timeline = self.write_header(
            TimelineType::SlotDeform,
            &positions(keys),
            &frame_rels,
            header_offset,
            value_offset,
        );
        self.slot_timeline(slot, timeline);
    }

    /// Display keys: `(position, display index)` pairs, stepped.
    pub(crate) fn slot_display_timeline(&mut self, slot: &str, keys: &[(u32, i32)]) {
        let frame_base = self.animation_mut().frame_offset;
        let mut frame_rels = Vec::with_capacity(keys.len());
        let mut key_positions = Vec::with_capacity(keys.len());
        for &(position, display_index) in keys {
            frame_rels.push((self.data.frame_array.len() - frame_base) as u16);
            key_positions.push(position);
            self.data.frame_array.push(position as i16);
            self.data.frame_array.push(display_index as i16);
        }
        let timeline =
            self.write_header(TimelineType::SlotDisplay, &key_positions, &frame_rels, 0, 0);
        self.slot_timeline(slot, timeline);
    }

    /// IK keys: `[bend, weight]` with bend 1.0 for positive, 0.0 for
    /// negative.
    pub(crate) fn ik_timeline(&mut self, constraint: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 100.0);
        let timeline = self.write_tweened(TimelineType::IkConstraint, keys, value_offset);
        self.animation_mut()
            .constraint_timelines
            .entry(constraint.to_string())
            .or_default()
            .push(timeline);
    }

    /// Action keys: `(position, registered action indices)`.
    pub(crate) fn action_timeline(&mut self, keys: &[(u32, Vec<usize>)]) {
        let frame_base = self.animation_mut().frame_offset;
        let mut frame_rels = Vec::with_capacity(keys.len());
        let mut key_positions = Vec::with_capacity(keys.len());
        for (position, actions) in keys {
            frame_rels.push((self.data.frame_array.len() - frame_base) as u16);
            key_positions.push(*position);
            self.data.frame_array.push(*position as i16);
            self.data.frame_array.push(actions.len() as i16);
            for &action in actions {
                self.data.frame_array.push(action as i16);
            }
        }
        let timeline = self.write_header(TimelineType::Action, &key_positions, &frame_rels, 0, 0);
        self.animation_mut().action_timeline = Some(timeline);
    }

    /// Z-order keys: `(position, permutation)` where `permutation[i]` is the
    /// slot drawn at position `i`. An empty permutation restores the authored
    /// order.
    pub(crate) fn z_order_timeline(&mut self, keys: &[(u32, Vec<i16>)]) {
        let frame_base = self.animation_mut().frame_offset;
        let mut frame_rels = Vec::with_capacity(keys.len());
        let mut key_positions = Vec::with_capacity(keys.len());
        for (position, permutation) in keys {
            frame_rels.push((self.data.frame_array.len() - frame_base) as u16);
            key_positions.push(*position);
            self.data.frame_array.push(*position as i16);
            self.data.frame_array.push(permutation.len() as i16);
            self.data.frame_array.extend_from_slice(permutation);
        }
        let timeline = self.write_header(TimelineType::ZOrder, &key_positions, &frame_rels, 0, 0);
        self.animation_mut().z_order_timeline = Some(timeline);
    }

    /// Drives `child`'s progress from this animation; `x` is the child's
    /// coordinate in the parent's blend space.
    pub(crate) fn progress_timeline(&mut self, child: &str, x: f32, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 10000.0);
        let mut timeline = self.write_tweened(TimelineType::AnimationProgress, keys, value_offset);
        timeline.x = x;
        self.animation_timeline(child, timeline);
    }

    pub(crate) fn weight_timeline(&mut self, child: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 10000.0);
        let timeline = self.write_tweened(TimelineType::AnimationWeight, keys, value_offset);
        self.animation_timeline(child, timeline);
    }

    /// Parameter keys: `[x, y]` pairs driving a blend-tree child's inputs.
    pub(crate) fn parameters_timeline(&mut self, child: &str, keys: &[Key]) {
        let value_offset = self.write_ints(keys, 10000.0);
        let timeline = self.write_tweened(TimelineType::AnimationParameter, keys, value_offset);
        self.animation_timeline(child, timeline);
    }

    fn bone_timeline(&mut self, bone: &str, timeline: TimelineData) {
        self.animation_mut()
            .bone_timelines
            .entry(bone.to_string())
            .or_default()
            .push(timeline);
    }

    fn slot_timeline(&mut self, slot: &str, timeline: TimelineData) {
        self.animation_mut()
            .slot_timelines
            .entry(slot.to_string())
            .or_default()
            .push(timeline);
    }

    fn animation_timeline(&mut self, child: &str, timeline: TimelineData) {
        self.animation_mut()
            .animation_timelines
            .entry(child.to_string())
            .or_default()
            .push(timeline);
    }

    fn write_tweened(
        &mut self,
        timeline_type: TimelineType,
        keys: &[Key],
        frame_value_offset: u16,
    ) -> TimelineData {
        let frame_rels = self.write_keys(keys);
        self.write_header(
            timeline_type,
            &positions(keys),
            &frame_rels,
            0,
            frame_value_offset,
        )
    }

    /// Writes tweened key records and returns their offsets relative to the
    /// animation's frame base.
    fn write_keys(&mut self, keys: &[Key]) -> Vec<u16> {
        let frame_base = self.animation_mut().frame_offset;
        let mut frame_rels = Vec::with_capacity(keys.len());
        for key in keys {
            frame_rels.push((self.data.frame_array.len() - frame_base) as u16);
            self.data.frame_array.push(key.position as i16);
            self.data.frame_array.push(tween_raw(key.tween));
            if key.tween == TweenType::Curve {
                self.data.frame_array.push(key.curve.len() as i16);
                self.data.frame_array.extend_from_slice(&key.curve);
            } else {
                self.data
                    .frame_array
                    .push((key.easing * 100.0).round() as i16);
            }
        }
        frame_rels
    }

    fn write_floats(&mut self, keys: &[Key]) -> u16 {
        let base = self.animation_mut().frame_float_offset;
        let frame_value_offset = (self.data.frame_float_array.len() - base) as u16;
        for key in keys {
            self.data.frame_float_array.extend_from_slice(&key.values);
        }
        frame_value_offset
    }

    fn write_ints(&mut self, keys: &[Key], raw_scale: f32) -> u16 {
        let base = self.animation_mut().frame_int_offset;
        let frame_value_offset = (self.data.frame_int_array.len() - base) as u16;
        for key in keys {
            for &value in &key.values {
                self.data
                    .frame_int_array
                    .push((value * raw_scale).round() as i16);
            }
        }
        frame_value_offset
    }

    /// Writes a timeline header and, for multi-key timelines, the per-tick
    /// frame index table covering every tick of the animation plus the one
    /// past the end a completed playhead lands on.
    fn write_header(
        &mut self,
        timeline_type: TimelineType,
        key_positions: &[u32],
        frame_rels: &[u16],
        frame_value_count: u16,
        frame_value_offset: u16,
    ) -> TimelineData {
        let frame_count = self.animation_mut().frame_count;
        let offset = self.data.timeline_array.len();
        self.last_timeline = offset;
        self.data.timeline_array.push(100);
        self.data.timeline_array.push(0);
        self.data.timeline_array.push(key_positions.len() as u16);
        self.data.timeline_array.push(frame_value_count);
        self.data.timeline_array.push(frame_value_offset);
        self.data.timeline_array.extend_from_slice(frame_rels);

        let mut frame_indices_offset = None;
        if key_positions.len() > 1 {
            frame_indices_offset = Some(self.data.frame_indices.len());
            for tick in 0..=frame_count {
                let ordinal = key_positions
                    .iter()
                    .rposition(|&position| position <= tick)
                    .unwrap_or(0);
                self.data.frame_indices.push(ordinal as u32);
            }
        }

        TimelineData {
            timeline_type,
            offset,
            frame_indices_offset,
            x: 0.0,
            y: 0.0,
        }
    }
}

fn bone_index(bones: &[BoneData], name: &str) -> usize {
    bones
        .iter()
        .position(|bone| bone.name == name)
        .expect("unknown bone")
}
