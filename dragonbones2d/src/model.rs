use std::collections::HashMap;

use log::warn;

use crate::geometry::{
    ellipse_contains_point, polygon_contains_point, rectangle_contains_point,
    segment_intersects_ellipse, segment_intersects_polygon, segment_intersects_rectangle,
    ColorTransform, Point, Rectangle, Transform,
};

// Packed-buffer record layouts. Geometry and weight records live in
// `int_array`, timeline headers in `timeline_array`, key frame records in
// `frame_array`, sampled values in the typed value arrays.

pub const GEOMETRY_VERTEX_COUNT: usize = 0;
pub const GEOMETRY_TRIANGLE_COUNT: usize = 1;
pub const GEOMETRY_FLOAT_OFFSET: usize = 2;
pub const GEOMETRY_WEIGHT_OFFSET: usize = 3;
pub const GEOMETRY_VERTEX_INDICES: usize = 4;

pub const WEIGHT_BONE_COUNT: usize = 0;
pub const WEIGHT_FLOAT_OFFSET: usize = 1;
pub const WEIGHT_BONE_INDICES: usize = 2;

pub const TIMELINE_SCALE: usize = 0;
pub const TIMELINE_OFFSET: usize = 1;
pub const TIMELINE_KEY_FRAME_COUNT: usize = 2;
pub const TIMELINE_FRAME_VALUE_COUNT: usize = 3;
pub const TIMELINE_FRAME_VALUE_OFFSET: usize = 4;
pub const TIMELINE_FRAME_OFFSET: usize = 5;

pub const FRAME_POSITION: usize = 0;
pub const FRAME_TWEEN_TYPE: usize = 1;
pub const FRAME_TWEEN_EASING_OR_CURVE_SAMPLE_COUNT: usize = 2;
pub const FRAME_CURVE_SAMPLES: usize = 3;

pub const DEFORM_VERTEX_OFFSET: usize = 0;
pub const DEFORM_COUNT: usize = 1;
pub const DEFORM_VALUE_COUNT: usize = 2;
pub const DEFORM_VALUE_OFFSET: usize = 3;
pub const DEFORM_FLOAT_OFFSET: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BoneKind {
    #[default]
    Bone,
    Surface,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Alpha,
    Darken,
    Difference,
    Erase,
    HardLight,
    Invert,
    Layer,
    Lighten,
    Multiply,
    Overlay,
    Screen,
    Subtract,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TweenType {
    #[default]
    None,
    Line,
    Curve,
    QuadIn,
    QuadOut,
    QuadInOut,
}

impl TweenType {
    /// Decodes the tween tag stored in a key frame record.
    pub fn from_raw(value: i16) -> TweenType {
        match value {
            1 => TweenType::Line,
            2 => TweenType::Curve,
            3 => TweenType::QuadIn,
            4 => TweenType::QuadOut,
            5 => TweenType::QuadInOut,
            _ => TweenType::None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimelineType {
    Action,
    ZOrder,
    BoneAll,
    BoneTranslate,
    BoneRotate,
    BoneScale,
    Surface,
    BoneAlpha,
    SlotDisplay,
    SlotColor,
    SlotDeform,
    SlotZIndex,
    SlotAlpha,
    IkConstraint,
    AnimationProgress,
    AnimationWeight,
    AnimationParameter,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ActionType {
    #[default]
    Play,
    Frame,
    Sound,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnimationFadeOutMode {
    None,
    SameLayer,
    SameGroup,
    SameLayerAndGroup,
    All,
    Single,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AnimationBlendType {
    #[default]
    None,
    E1D,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PositionMode {
    Fixed,
    #[default]
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SpacingMode {
    #[default]
    Length,
    Fixed,
    Percent,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum RotateMode {
    #[default]
    Tangent,
    Chain,
    ChainScale,
}

/// Custom ints, floats and strings attached to data objects and frame events.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserData {
    pub ints: Vec<i32>,
    pub floats: Vec<f32>,
    pub strings: Vec<String>,
}

impl UserData {
    pub fn int(&self, index: usize) -> i32 {
        self.ints.get(index).copied().unwrap_or(0)
    }

    pub fn float(&self, index: usize) -> f32 {
        self.floats.get(index).copied().unwrap_or(0.0)
    }

    pub fn string(&self, index: usize) -> &str {
        self.strings.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A play, frame event or sound event action. `bone` and `slot` are indices
/// into the owning armature.
#[derive(Clone, Debug, Default)]
pub struct ActionData {
    pub action_type: ActionType,
    pub name: String,
    pub bone: Option<usize>,
    pub slot: Option<usize>,
    pub data: Option<UserData>,
}

#[derive(Clone, Debug)]
pub struct BoneData {
    pub name: String,
    pub parent: Option<usize>,
    pub kind: BoneKind,
    pub transform: Transform,
    pub length: f32,
    pub alpha: f32,
    pub inherit_translation: bool,
    pub inherit_rotation: bool,
    pub inherit_scale: bool,
    pub inherit_reflection: bool,
    pub user_data: Option<UserData>,
}

impl Default for BoneData {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            kind: BoneKind::Bone,
            transform: Transform::default(),
            length: 0.0,
            alpha: 1.0,
            inherit_translation: true,
            inherit_rotation: true,
            inherit_scale: true,
            inherit_reflection: false,
            user_data: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SlotData {
    pub name: String,
    /// Parent bone index.
    pub parent: usize,
    pub display_index: i32,
    pub z_order: i32,
    pub z_index: i32,
    pub blend_mode: BlendMode,
    pub alpha: f32,
    pub color: ColorTransform,
    pub user_data: Option<UserData>,
}

impl Default for SlotData {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: 0,
            display_index: 0,
            z_order: 0,
            z_index: 0,
            blend_mode: BlendMode::Normal,
            alpha: 1.0,
            color: ColorTransform::default(),
            user_data: None,
        }
    }
}

/// Vertex weights for a skinned mesh or path. `bones` are armature bone
/// indices; the per-vertex bone counts and weights live in the packed
/// buffers starting at `offset`.
#[derive(Clone, Debug, Default)]
pub struct WeightData {
    pub count: usize,
    pub offset: usize,
    pub bones: Vec<usize>,
}

/// Header location of a mesh or path geometry inside `int_array`.
#[derive(Clone, Debug, Default)]
pub struct GeometryData {
    pub offset: usize,
    pub weight: Option<WeightData>,
}

impl GeometryData {
    pub fn vertex_count(&self, int_array: &[i16]) -> usize {
        int_array[self.offset + GEOMETRY_VERTEX_COUNT] as usize
    }

    pub fn triangle_count(&self, int_array: &[i16]) -> usize {
        int_array[self.offset + GEOMETRY_TRIANGLE_COUNT] as usize
    }

    pub fn float_offset(&self, int_array: &[i16]) -> usize {
        let value = int_array[self.offset + GEOMETRY_FLOAT_OFFSET] as i32;
        if value < 0 {
            (value + 65536) as usize
        } else {
            value as usize
        }
    }
}

/// Hit test shape in slot-local space. Rectangles and ellipses are centered
/// on the origin; polygons carry their own axis-aligned bounds.
#[derive(Clone, Debug)]
pub enum BoundingBoxData {
    Rectangle {
        width: f32,
        height: f32,
    },
    Ellipse {
        width: f32,
        height: f32,
    },
    Polygon {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        vertices: Vec<f32>,
    },
}

impl BoundingBoxData {
    /// Builds a polygon box and derives its axis-aligned bounds.
    pub fn polygon(vertices: Vec<f32>) -> BoundingBoxData {
        let mut x_min = f32::MAX;
        let mut y_min = f32::MAX;
        let mut x_max = -f32::MAX;
        let mut y_max = -f32::MAX;

        let mut i = 0;
        while i + 1 < vertices.len() {
            let x = vertices[i];
            let y = vertices[i + 1];
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
            i += 2;
        }

        if vertices.is_empty() {
            x_min = 0.0;
            y_min = 0.0;
            x_max = 0.0;
            y_max = 0.0;
        }

        BoundingBoxData::Polygon {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
            vertices,
        }
    }

    pub fn contains_point(&self, p_x: f32, p_y: f32) -> bool {
        match self {
            BoundingBoxData::Rectangle { width, height } => {
                rectangle_contains_point(p_x, p_y, *width, *height)
            }
            BoundingBoxData::Ellipse { width, height } => {
                ellipse_contains_point(p_x, p_y, *width, *height)
            }
            BoundingBoxData::Polygon {
                x,
                y,
                width,
                height,
                vertices,
            } => {
                if p_x >= *x && p_x <= x + width && p_y >= *y && p_y <= y + height {
                    return polygon_contains_point(p_x, p_y, vertices);
                }
                false
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn intersects_segment(
        &self,
        x_a: f32,
        y_a: f32,
        x_b: f32,
        y_b: f32,
        intersection_point_a: Option<&mut Point>,
        intersection_point_b: Option<&mut Point>,
        normal_radians: Option<&mut Point>,
    ) -> i32 {
        match self {
            BoundingBoxData::Rectangle { width, height } => {
                let width_h = width * 0.5;
                let height_h = height * 0.5;
                segment_intersects_rectangle(
                    x_a,
                    y_a,
                    x_b,
                    y_b,
                    -width_h,
                    -height_h,
                    width_h,
                    height_h,
                    intersection_point_a,
                    intersection_point_b,
                    normal_radians,
                )
            }
            BoundingBoxData::Ellipse { width, height } => segment_intersects_ellipse(
                x_a,
                y_a,
                x_b,
                y_b,
                0.0,
                0.0,
                width * 0.5,
                height * 0.5,
                intersection_point_a,
                intersection_point_b,
                normal_radians,
            ),
            BoundingBoxData::Polygon {
                x,
                y,
                width,
                height,
                vertices,
            } => {
                let gate = segment_intersects_rectangle(
                    x_a,
                    y_a,
                    x_b,
                    y_b,
                    *x,
                    *y,
                    x + width,
                    y + height,
                    None,
                    None,
                    None,
                );
                if gate != 0 {
                    return segment_intersects_polygon(
                        x_a,
                        y_a,
                        x_b,
                        y_b,
                        vertices,
                        intersection_point_a,
                        intersection_point_b,
                        normal_radians,
                    );
                }
                0
            }
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ImageDisplayData {
    pub name: String,
    pub path: String,
    pub transform: Transform,
    pub pivot: Point,
}

/// A nested armature display. `armature` names an armature in the same data
/// set; `actions` run when the display is shown, falling back to the child
/// armature's default actions.
#[derive(Clone, Debug, Default)]
pub struct ArmatureDisplayData {
    pub name: String,
    pub transform: Transform,
    pub armature: String,
    pub inherit_animation: bool,
    pub actions: Vec<ActionData>,
}

#[derive(Clone, Debug, Default)]
pub struct MeshDisplayData {
    pub name: String,
    pub path: String,
    pub transform: Transform,
    pub geometry: GeometryData,
}

#[derive(Clone, Debug)]
pub struct BoundingBoxDisplayData {
    pub name: String,
    pub transform: Transform,
    pub bounding_box: BoundingBoxData,
}

#[derive(Clone, Debug, Default)]
pub struct PathDisplayData {
    pub name: String,
    pub transform: Transform,
    pub closed: bool,
    pub constant_speed: bool,
    pub geometry: GeometryData,
    pub curve_lengths: Vec<f32>,
}

#[derive(Clone, Debug)]
pub enum DisplayData {
    Image(ImageDisplayData),
    Armature(ArmatureDisplayData),
    Mesh(MeshDisplayData),
    BoundingBox(BoundingBoxDisplayData),
    Path(PathDisplayData),
}

impl DisplayData {
    pub fn name(&self) -> &str {
        match self {
            DisplayData::Image(display) => &display.name,
            DisplayData::Armature(display) => &display.name,
            DisplayData::Mesh(display) => &display.name,
            DisplayData::BoundingBox(display) => &display.name,
            DisplayData::Path(display) => &display.name,
        }
    }

    pub fn transform(&self) -> &Transform {
        match self {
            DisplayData::Image(display) => &display.transform,
            DisplayData::Armature(display) => &display.transform,
            DisplayData::Mesh(display) => &display.transform,
            DisplayData::BoundingBox(display) => &display.transform,
            DisplayData::Path(display) => &display.transform,
        }
    }

    pub fn geometry(&self) -> Option<&GeometryData> {
        match self {
            DisplayData::Mesh(display) => Some(&display.geometry),
            DisplayData::Path(display) => Some(&display.geometry),
            _ => None,
        }
    }

    pub fn bounding_box(&self) -> Option<&BoundingBoxData> {
        match self {
            DisplayData::BoundingBox(display) => Some(&display.bounding_box),
            _ => None,
        }
    }
}

/// Display lists per slot, dense by slot index. An empty list means the skin
/// does not cover that slot and the default skin applies.
#[derive(Clone, Debug, Default)]
pub struct SkinData {
    pub name: String,
    pub displays: Vec<Vec<Option<DisplayData>>>,
}

impl SkinData {
    pub fn displays(&self, slot_index: usize) -> Option<&[Option<DisplayData>]> {
        let displays = self.displays.get(slot_index)?;
        if displays.is_empty() {
            return None;
        }
        Some(displays)
    }

    pub fn display(&self, slot_index: usize, display_index: usize) -> Option<&DisplayData> {
        self.displays(slot_index)?.get(display_index)?.as_ref()
    }
}

#[derive(Clone, Debug)]
pub struct IkConstraintData {
    pub name: String,
    pub order: i32,
    /// Effector bone index.
    pub target: usize,
    /// Chain root bone index.
    pub root: usize,
    /// Optional second chain bone index; two-bone IK when set.
    pub bone: Option<usize>,
    pub scale_enabled: bool,
    pub bend_positive: bool,
    pub weight: f32,
}

#[derive(Clone, Debug)]
pub struct PathConstraintData {
    pub name: String,
    pub order: i32,
    /// The path slot's parent bone index.
    pub target: usize,
    /// Bone whose movement invalidates the sampled path.
    pub root: usize,
    /// Slot carrying the path display.
    pub path_slot: usize,
    /// Display index of the path geometry in the default skin.
    pub path_display_index: usize,
    /// Constrained bone chain, armature bone indices.
    pub bones: Vec<usize>,
    pub position_mode: PositionMode,
    pub spacing_mode: SpacingMode,
    pub rotate_mode: RotateMode,
    pub position: f32,
    pub spacing: f32,
    pub rotate_offset: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
}

#[derive(Clone, Debug)]
pub enum ConstraintData {
    Ik(IkConstraintData),
    Path(PathConstraintData),
}

impl ConstraintData {
    pub fn name(&self) -> &str {
        match self {
            ConstraintData::Ik(constraint) => &constraint.name,
            ConstraintData::Path(constraint) => &constraint.name,
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            ConstraintData::Ik(constraint) => constraint.order,
            ConstraintData::Path(constraint) => constraint.order,
        }
    }

    pub fn target_bone(&self) -> usize {
        match self {
            ConstraintData::Ik(constraint) => constraint.target,
            ConstraintData::Path(constraint) => constraint.target,
        }
    }

    pub fn root_bone(&self) -> usize {
        match self {
            ConstraintData::Ik(constraint) => constraint.root,
            ConstraintData::Path(constraint) => constraint.root,
        }
    }
}

/// Location of one packed timeline: a header in `timeline_array` plus an
/// optional per-tick frame index table. `x`/`y` position a child animation
/// inside a 1D blend space and are zero elsewhere.
#[derive(Copy, Clone, Debug)]
pub struct TimelineData {
    pub timeline_type: TimelineType,
    pub offset: usize,
    pub frame_indices_offset: Option<usize>,
    pub x: f32,
    pub y: f32,
}

impl Default for TimelineData {
    fn default() -> Self {
        Self {
            timeline_type: TimelineType::BoneAll,
            offset: 0,
            frame_indices_offset: None,
            x: 0.0,
            y: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationData {
    pub name: String,
    pub frame_count: u32,
    /// 0 loops forever.
    pub play_times: u32,
    pub duration: f32,
    /// Authoring-time scale already applied to the packed values.
    pub scale: f32,
    pub fade_in_time: f32,
    pub blend_type: AnimationBlendType,
    pub frame_int_offset: usize,
    pub frame_float_offset: usize,
    pub frame_offset: usize,
    pub action_timeline: Option<TimelineData>,
    pub z_order_timeline: Option<TimelineData>,
    pub bone_timelines: HashMap<String, Vec<TimelineData>>,
    pub slot_timelines: HashMap<String, Vec<TimelineData>>,
    pub constraint_timelines: HashMap<String, Vec<TimelineData>>,
    pub animation_timelines: HashMap<String, Vec<TimelineData>>,
    pub user_data: Option<UserData>,
}

impl Default for AnimationData {
    fn default() -> Self {
        Self {
            name: String::new(),
            frame_count: 0,
            play_times: 0,
            duration: 0.0,
            scale: 1.0,
            fade_in_time: 0.0,
            blend_type: AnimationBlendType::None,
            frame_int_offset: 0,
            frame_float_offset: 0,
            frame_offset: 0,
            action_timeline: None,
            z_order_timeline: None,
            bone_timelines: HashMap::new(),
            slot_timelines: HashMap::new(),
            constraint_timelines: HashMap::new(),
            animation_timelines: HashMap::new(),
            user_data: None,
        }
    }
}

impl AnimationData {
    pub fn timelines_for_bone(&self, name: &str) -> Option<&[TimelineData]> {
        self.bone_timelines.get(name).map(Vec::as_slice)
    }

    pub fn timelines_for_slot(&self, name: &str) -> Option<&[TimelineData]> {
        self.slot_timelines.get(name).map(Vec::as_slice)
    }

    pub fn timelines_for_constraint(&self, name: &str) -> Option<&[TimelineData]> {
        self.constraint_timelines.get(name).map(Vec::as_slice)
    }
}

#[derive(Clone, Debug)]
pub struct ArmatureData {
    pub name: String,
    pub frame_rate: u32,
    /// Global scale applied to animated translations and deforms.
    pub scale: f32,
    pub aabb: Rectangle,
    pub bones: Vec<BoneData>,
    /// Bone update order, parents and constraint targets first.
    pub sorted_bone_indices: Vec<usize>,
    /// Slots in authored draw order.
    pub slots: Vec<SlotData>,
    pub constraints: Vec<ConstraintData>,
    pub skins: Vec<SkinData>,
    pub default_skin: usize,
    pub animations: Vec<AnimationData>,
    pub animation_index: HashMap<String, usize>,
    pub default_animation: Option<usize>,
    /// Played when the armature is attached as a display without its own
    /// actions.
    pub default_actions: Vec<ActionData>,
    /// Actions and events referenced by animation key frames.
    pub actions: Vec<ActionData>,
    pub user_data: Option<UserData>,
}

impl Default for ArmatureData {
    fn default() -> Self {
        Self {
            name: String::new(),
            frame_rate: 0,
            scale: 1.0,
            aabb: Rectangle::default(),
            bones: Vec::new(),
            sorted_bone_indices: Vec::new(),
            slots: Vec::new(),
            constraints: Vec::new(),
            skins: Vec::new(),
            default_skin: 0,
            animations: Vec::new(),
            animation_index: HashMap::new(),
            default_animation: None,
            default_actions: Vec::new(),
            actions: Vec::new(),
            user_data: None,
        }
    }
}

impl ArmatureData {
    pub fn bone(&self, name: &str) -> Option<(usize, &BoneData)> {
        let index = self.bones.iter().position(|bone| bone.name == name)?;
        Some((index, &self.bones[index]))
    }

    pub fn slot(&self, name: &str) -> Option<(usize, &SlotData)> {
        let index = self.slots.iter().position(|slot| slot.name == name)?;
        Some((index, &self.slots[index]))
    }

    pub fn constraint(&self, name: &str) -> Option<(usize, &ConstraintData)> {
        let index = self
            .constraints
            .iter()
            .position(|constraint| constraint.name() == name)?;
        Some((index, &self.constraints[index]))
    }

    pub fn skin(&self, name: &str) -> Option<&SkinData> {
        self.skins.iter().find(|skin| skin.name == name)
    }

    pub fn animation(&self, name: &str) -> Option<(usize, &AnimationData)> {
        let index = *self.animation_index.get(name)?;
        Some((index, &self.animations[index]))
    }

    /// Resolves a slot's display list, falling back to the default skin for
    /// slots the named skin does not cover.
    pub fn skin_displays(
        &self,
        skin_name: Option<&str>,
        slot_index: usize,
    ) -> Option<&[Option<DisplayData>]> {
        if let Some(name) = skin_name {
            if let Some(skin) = self.skin(name) {
                if let Some(displays) = skin.displays(slot_index) {
                    return Some(displays);
                }
            }
        }
        self.skins.get(self.default_skin)?.displays(slot_index)
    }

    /// Rebuilds the animation name table and the bone update order. Call
    /// after the bone, constraint or animation lists change.
    pub fn finish(&mut self) {
        self.animation_index.clear();
        for (index, animation) in self.animations.iter().enumerate() {
            if self.animation_index.contains_key(&animation.name) {
                warn!("duplicate animation: {}", animation.name);
                continue;
            }
            self.animation_index.insert(animation.name.clone(), index);
        }

        if self.default_animation.is_none() && !self.animations.is_empty() {
            self.default_animation = Some(0);
        }

        self.sort_bones();
    }

    fn sort_bones(&mut self) {
        let total = self.bones.len();
        self.sorted_bone_indices.clear();
        if total == 0 {
            return;
        }

        let mut placed = vec![false; total];
        loop {
            let mut progressed = false;
            for index in 0..total {
                if placed[index] {
                    continue;
                }

                let bone = &self.bones[index];
                if let Some(parent) = bone.parent {
                    if !placed[parent] {
                        continue;
                    }
                }

                // A constraint root waits for its target bone.
                let waiting = self.constraints.iter().any(|constraint| {
                    constraint.root_bone() == index && !placed[constraint.target_bone()]
                });
                if waiting {
                    continue;
                }

                placed[index] = true;
                self.sorted_bone_indices.push(index);
                progressed = true;
            }

            if self.sorted_bone_indices.len() >= total || !progressed {
                break;
            }
        }

        if self.sorted_bone_indices.len() < total {
            warn!("bone hierarchy cycle in armature: {}", self.name);
            for index in 0..total {
                if !placed[index] {
                    self.sorted_bone_indices.push(index);
                }
            }
        }
    }
}

/// One exported data set: shared packed buffers plus the armatures decoded
/// against them.
#[derive(Clone, Debug, Default)]
pub struct DragonBonesData {
    pub name: String,
    pub version: String,
    pub frame_rate: u32,
    pub int_array: Vec<i16>,
    pub float_array: Vec<f32>,
    pub frame_int_array: Vec<i16>,
    pub frame_float_array: Vec<f32>,
    pub frame_array: Vec<i16>,
    pub timeline_array: Vec<u16>,
    pub color_array: Vec<i16>,
    pub frame_indices: Vec<u32>,
    pub armatures: Vec<ArmatureData>,
    pub armature_index: HashMap<String, usize>,
    pub user_data: Option<UserData>,
}

impl DragonBonesData {
    pub fn armature(&self, name: &str) -> Option<(usize, &ArmatureData)> {
        let index = *self.armature_index.get(name)?;
        Some((index, &self.armatures[index]))
    }

    /// Rebuilds lookup tables on the data set and every armature in it.
    pub fn finish(&mut self) {
        self.armature_index.clear();
        for (index, armature) in self.armatures.iter_mut().enumerate() {
            armature.finish();
            if self.armature_index.contains_key(&armature.name) {
                warn!("duplicate armature: {}", armature.name);
                continue;
            }
            self.armature_index.insert(armature.name.clone(), index);
        }
    }
}

/// Playback request passed to the animation manager. Negative sentinels mean
/// "use the animation data's value".
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationConfig {
    pub pause_fade_out: bool,
    pub fade_out_mode: AnimationFadeOutMode,
    pub fade_out_tween_type: TweenType,
    pub fade_out_time: f32,
    pub action_enabled: bool,
    pub additive: bool,
    pub display_control: bool,
    pub pause_fade_in: bool,
    pub reset_to_pose: bool,
    pub fade_in_tween_type: TweenType,
    pub play_times: i32,
    pub layer: i32,
    pub position: f32,
    pub duration: f32,
    /// At or below -100 the animation data's own scale applies.
    pub time_scale: f32,
    pub weight: f32,
    pub fade_in_time: f32,
    pub auto_fade_out_time: f32,
    pub name: String,
    pub animation: String,
    pub group: String,
    pub bone_mask: Vec<String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            pause_fade_out: true,
            fade_out_mode: AnimationFadeOutMode::All,
            fade_out_tween_type: TweenType::Line,
            fade_out_time: -1.0,
            action_enabled: true,
            additive: false,
            display_control: true,
            pause_fade_in: true,
            reset_to_pose: true,
            fade_in_tween_type: TweenType::Line,
            play_times: -1,
            layer: 0,
            position: 0.0,
            duration: -1.0,
            time_scale: -100.0,
            weight: 1.0,
            fade_in_time: -1.0,
            auto_fade_out_time: -1.0,
            name: String::new(),
            animation: String::new(),
            group: String::new(),
            bone_mask: Vec::new(),
        }
    }
}
