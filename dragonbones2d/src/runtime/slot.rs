use super::bone::Bone;
use super::context::ArmatureId;
use crate::{
    BlendMode, BoundingBoxData, ColorTransform, DisplayData, GeometryData, Matrix, Point,
    SlotData, Transform,
};

/// One entry in a slot's display list.
///
/// `raw_display_data` is what the skin shipped for this position;
/// `display_data` is an optional runtime replacement that wins geometry and
/// bounding box lookups. `deform` holds the offsets deform timelines write on
/// top of the packed mesh or path vertices.
#[derive(Clone, Debug, Default)]
pub struct DisplayFrame {
    pub raw_display_data: Option<DisplayData>,
    pub display_data: Option<DisplayData>,
    pub deform: Vec<f32>,
    pub(crate) child_armature: Option<ArmatureId>,
}

impl DisplayFrame {
    /// Sizes the deform buffer to the raw geometry, zero-filled. Does nothing
    /// for frames without mesh or path geometry or when already sized.
    pub(crate) fn update_deform_vertices(&mut self, int_array: &[i16]) {
        if !self.deform.is_empty() {
            return;
        }
        let Some(geometry) = self.raw_display_data.as_ref().and_then(DisplayData::geometry)
        else {
            return;
        };
        let count = match &geometry.weight {
            Some(weight) => weight.count * 2,
            None => geometry.vertex_count(int_array) * 2,
        };
        self.deform.resize(count, 0.0);
    }

    /// The replacement display when set, otherwise the skin's own.
    pub fn effective_display(&self) -> Option<&DisplayData> {
        self.display_data.as_ref().or(self.raw_display_data.as_ref())
    }

    pub fn geometry_data(&self) -> Option<&GeometryData> {
        if let Some(geometry) = self.display_data.as_ref().and_then(DisplayData::geometry) {
            return Some(geometry);
        }
        self.raw_display_data.as_ref().and_then(DisplayData::geometry)
    }

    pub fn bounding_box(&self) -> Option<&BoundingBoxData> {
        if let Some(bounding_box) = self.display_data.as_ref().and_then(DisplayData::bounding_box)
        {
            return Some(bounding_box);
        }
        self.raw_display_data.as_ref().and_then(DisplayData::bounding_box)
    }

    pub fn child_armature(&self) -> Option<ArmatureId> {
        self.child_armature
    }

    /// What this frame shows when selected. Bounding boxes and paths carry
    /// data but draw nothing, so they resolve to `None`.
    pub(crate) fn display(&self, index: usize) -> Option<SlotDisplay> {
        if let Some(child) = self.child_armature {
            return Some(SlotDisplay::ChildArmature(child));
        }
        match self.effective_display() {
            Some(DisplayData::Image(_)) | Some(DisplayData::Mesh(_)) => {
                Some(SlotDisplay::Visual(index))
            }
            _ => None,
        }
    }
}

/// The visible content of a slot. `Visual` keeps the display list index so
/// two image frames never compare equal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SlotDisplay {
    Visual(usize),
    ChildArmature(ArmatureId),
}

/// A display attachment point under a bone.
///
/// A slot owns a display list and shows at most one entry at a time. Its
/// world transform is the display origin plus `offset`, concatenated with the
/// parent bone's matrix.
#[derive(Clone, Debug)]
pub struct Slot {
    /// Extra transform between the display origin and the parent bone.
    pub offset: Transform,
    pub global: Transform,
    pub global_transform_matrix: Matrix,
    /// When set, only the animation state with this name may drive the
    /// display index.
    pub display_controller: Option<String>,
    pub(crate) parent: usize,
    pub(crate) display_frames: Vec<DisplayFrame>,
    pub(crate) display: Option<SlotDisplay>,
    pub(crate) child_armature: Option<ArmatureId>,
    pub(crate) display_index: i32,
    pub(crate) animation_display_index: i32,
    pub(crate) current_frame: Option<usize>,
    pub(crate) geometry_data: Option<GeometryData>,
    pub(crate) bounding_box_data: Option<BoundingBoxData>,
    /// Bones weighted into the current geometry, in weight order.
    pub(crate) geometry_bones: Vec<usize>,
    pub(crate) origin: Option<Transform>,
    pub(crate) local_matrix: Matrix,
    pub(crate) color_transform: ColorTransform,
    pub(crate) blend_mode: BlendMode,
    pub(crate) z_order: i32,
    pub(crate) z_index: i32,
    pub(crate) alpha: f32,
    pub(crate) global_alpha: f32,
    pub(crate) visible: bool,
    pub(crate) from_default_skin: bool,
    pub(crate) display_data_dirty: bool,
    pub(crate) display_dirty: bool,
    pub(crate) geometry_dirty: bool,
    pub(crate) vertices_dirty: bool,
    pub(crate) visible_dirty: bool,
    pub(crate) blend_mode_dirty: bool,
    pub(crate) color_dirty: bool,
    pub(crate) z_order_dirty: bool,
    pub(crate) transform_dirty: bool,
    pub(crate) global_dirty: bool,
    pub(crate) cached_frame_index: i32,
}

impl Slot {
    pub(crate) fn new(slot_data: &SlotData) -> Slot {
        Slot {
            offset: Transform::default(),
            global: Transform::default(),
            global_transform_matrix: Matrix::default(),
            display_controller: None,
            parent: slot_data.parent,
            display_frames: Vec::new(),
            display: None,
            child_armature: None,
            display_index: -1,
            animation_display_index: -1,
            current_frame: None,
            geometry_data: None,
            bounding_box_data: None,
            geometry_bones: Vec::new(),
            origin: None,
            local_matrix: Matrix::default(),
            color_transform: slot_data.color,
            blend_mode: slot_data.blend_mode,
            z_order: slot_data.z_order,
            z_index: slot_data.z_index,
            alpha: slot_data.alpha,
            global_alpha: 1.0,
            visible: true,
            from_default_skin: false,
            display_data_dirty: false,
            display_dirty: false,
            geometry_dirty: false,
            vertices_dirty: false,
            visible_dirty: false,
            blend_mode_dirty: true,
            color_dirty: true,
            z_order_dirty: false,
            transform_dirty: false,
            global_dirty: false,
            cached_frame_index: -1,
        }
    }

    /// Identity of the active geometry: display frame, whether a replacement
    /// provides it, and its packed offset. Two frames never share one.
    fn geometry_identity(&self) -> Option<(usize, bool, usize)> {
        let index = self.current_frame?;
        let frame = &self.display_frames[index];
        if let Some(geometry) = frame.display_data.as_ref().and_then(DisplayData::geometry) {
            return Some((index, true, geometry.offset));
        }
        let geometry = frame.raw_display_data.as_ref().and_then(DisplayData::geometry)?;
        Some((index, false, geometry.offset))
    }

    /// Re-resolves the active display frame into geometry, bounding box and
    /// local matrix. Runs whenever the display index or a frame's data
    /// changed.
    pub(crate) fn update_display_data(&mut self) {
        let prev_frame = self.current_frame;
        let prev_geometry = self.geometry_identity();

        self.current_frame = None;
        self.geometry_data = None;
        self.bounding_box_data = None;

        if self.display_index >= 0 && (self.display_index as usize) < self.display_frames.len() {
            let index = self.display_index as usize;
            let frame = &self.display_frames[index];
            self.current_frame = Some(index);
            self.geometry_data = frame.geometry_data().cloned();
            self.bounding_box_data = frame.bounding_box().cloned();
        }

        let geometry = self.geometry_identity();
        if self.current_frame != prev_frame || geometry != prev_geometry {
            let frame = self.current_frame.map(|index| &self.display_frames[index]);
            let raw = frame.and_then(|frame| frame.raw_display_data.as_ref());
            let replaced = frame.and_then(|frame| frame.display_data.as_ref());
            self.origin = match (raw, replaced) {
                (Some(display), _) => Some(*display.transform()),
                (None, Some(display)) => Some(*display.transform()),
                (None, None) => None,
            };

            match &self.origin {
                Some(origin) => {
                    self.global.copy_from(origin);
                    self.global.add(&self.offset);
                }
                None => self.global.copy_from(&self.offset),
            }
            self.global.to_matrix(&mut self.local_matrix);

            if geometry != prev_geometry {
                self.geometry_dirty = true;
                self.vertices_dirty = true;

                self.geometry_bones.clear();
                if let Some(weight) =
                    self.geometry_data.as_ref().and_then(|geometry| geometry.weight.as_ref())
                {
                    self.geometry_bones.extend_from_slice(&weight.bones);
                }
            }

            self.transform_dirty = true;
        }
    }

    pub(crate) fn set_display_index(&mut self, value: i32, is_animation: bool) {
        if is_animation {
            if self.animation_display_index == value {
                return;
            }
            self.animation_display_index = value;
        }

        if self.display_index == value {
            return;
        }

        let count = self.display_frames.len() as i32;
        self.display_index = if value < count { value } else { count - 1 };
        self.display_data_dirty = true;
        self.display_dirty = self.display_index < 0 || {
            let index = self.display_index as usize;
            self.display != self.display_frames[index].display(index)
        };
    }

    pub(crate) fn set_z_order(&mut self, value: i32) {
        self.z_order = value;
        self.z_order_dirty = true;
    }

    pub(crate) fn set_color(&mut self, value: &ColorTransform) {
        self.color_transform = *value;
        self.color_dirty = true;
    }

    /// Swaps the skin-provided data of one display frame. `None` is restored
    /// from `fallback`, the default skin's display for that position.
    pub(crate) fn replace_raw_display_data(
        &mut self,
        display: Option<DisplayData>,
        index: usize,
        fallback: Option<&DisplayData>,
    ) {
        let frame = &mut self.display_frames[index];
        frame.deform.clear();
        frame.raw_display_data = display.or_else(|| fallback.cloned());
        if index as i32 == self.display_index {
            self.display_data_dirty = true;
        }
    }

    /// Overrides one display frame without touching the skin's data.
    pub(crate) fn replace_display_data(&mut self, display: Option<DisplayData>, index: usize) {
        self.display_frames[index].display_data = display;
        if index as i32 == self.display_index {
            self.display_data_dirty = true;
        }
    }

    pub(crate) fn update_global_transform_matrix(
        &mut self,
        is_cache: bool,
        parent_matrix: &Matrix,
    ) {
        self.global_transform_matrix.copy_from(&self.local_matrix);
        self.global_transform_matrix.concat(parent_matrix);

        if is_cache {
            self.global.from_matrix(&self.global_transform_matrix);
        } else {
            self.global_dirty = true;
        }
    }

    /// Decomposes the world matrix into `global` if a cheaper update deferred
    /// it.
    pub fn update_global_transform(&mut self) {
        if self.global_dirty {
            self.global_dirty = false;
            self.global.from_matrix(&self.global_transform_matrix);
        }
    }

    /// Brings the world matrix up to date outside the armature tick, so hit
    /// tests see pending local changes.
    pub(crate) fn update_transform_and_matrix(&mut self, parent_matrix: &Matrix) {
        if self.transform_dirty {
            self.transform_dirty = false;
            self.update_global_transform_matrix(false, parent_matrix);
        }
    }

    /// Hit test in armature space against the active bounding box display.
    pub(crate) fn contains_point(&mut self, x: f32, y: f32, parent_matrix: &Matrix) -> bool {
        if self.bounding_box_data.is_none() {
            return false;
        }
        self.update_transform_and_matrix(parent_matrix);

        let mut matrix = self.global_transform_matrix;
        matrix.invert();
        let (local_x, local_y) = matrix.transform_point(x, y);
        match &self.bounding_box_data {
            Some(bounding_box) => bounding_box.contains_point(local_x, local_y),
            None => false,
        }
    }

    /// Intersects a segment with the active bounding box display. Entry and
    /// exit points and normals come back in armature space.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn intersects_segment(
        &mut self,
        x_a: f32,
        y_a: f32,
        x_b: f32,
        y_b: f32,
        mut intersection_point_a: Option<&mut Point>,
        mut intersection_point_b: Option<&mut Point>,
        mut normal_radians: Option<&mut Point>,
        parent_matrix: &Matrix,
    ) -> i32 {
        if self.bounding_box_data.is_none() {
            return 0;
        }
        self.update_transform_and_matrix(parent_matrix);

        let mut matrix = self.global_transform_matrix;
        matrix.invert();
        let (x_a, y_a) = matrix.transform_point(x_a, y_a);
        let (x_b, y_b) = matrix.transform_point(x_b, y_b);

        let Some(bounding_box) = self.bounding_box_data.as_ref() else {
            return 0;
        };
        let count = bounding_box.intersects_segment(
            x_a,
            y_a,
            x_b,
            y_b,
            intersection_point_a.as_deref_mut(),
            intersection_point_b.as_deref_mut(),
            normal_radians.as_deref_mut(),
        );
        if count > 0 {
            if count == 1 || count == 2 {
                if let Some(point) = intersection_point_a.as_deref_mut() {
                    let (x, y) = self.global_transform_matrix.transform_point(point.x, point.y);
                    point.x = x;
                    point.y = y;
                    if let Some(point) = intersection_point_b.as_deref_mut() {
                        point.x = x;
                        point.y = y;
                    }
                } else if let Some(point) = intersection_point_b.as_deref_mut() {
                    let (x, y) = self.global_transform_matrix.transform_point(point.x, point.y);
                    point.x = x;
                    point.y = y;
                }
            } else {
                if let Some(point) = intersection_point_a.as_deref_mut() {
                    let (x, y) = self.global_transform_matrix.transform_point(point.x, point.y);
                    point.x = x;
                    point.y = y;
                }
                if let Some(point) = intersection_point_b.as_deref_mut() {
                    let (x, y) = self.global_transform_matrix.transform_point(point.x, point.y);
                    point.x = x;
                    point.y = y;
                }
            }
            if let Some(normals) = normal_radians.as_deref_mut() {
                let (x, y) = self
                    .global_transform_matrix
                    .transform_delta(normals.x.cos(), normals.x.sin());
                normals.x = y.atan2(x);
                let (x, y) = self
                    .global_transform_matrix
                    .transform_delta(normals.y.cos(), normals.y.sin());
                normals.y = y.atan2(x);
            }
        }
        count
    }

    pub(crate) fn is_bones_update(&self, bones: &[Bone]) -> bool {
        self.geometry_bones.iter().any(|&bone| bones[bone].children_transform_dirty)
    }

    pub(crate) fn is_visual_display(&self) -> bool {
        matches!(self.display, Some(SlotDisplay::Visual(_)))
    }

    /// Forces the display and transform to refresh on the next armature
    /// update.
    pub fn invalid_update(&mut self) {
        self.display_data_dirty = true;
        self.display_dirty = true;
        self.transform_dirty = true;
    }

    pub fn set_visible(&mut self, value: bool) {
        if self.visible == value {
            return;
        }
        self.visible = value;
        self.visible_dirty = true;
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> usize {
        self.parent
    }

    pub fn display_index(&self) -> i32 {
        self.display_index
    }

    pub fn display(&self) -> Option<SlotDisplay> {
        self.display
    }

    pub fn child_armature(&self) -> Option<ArmatureId> {
        self.child_armature
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn color_transform(&self) -> &ColorTransform {
        &self.color_transform
    }

    pub fn z_order(&self) -> i32 {
        self.z_order
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn global_alpha(&self) -> f32 {
        self.global_alpha
    }

    pub fn bounding_box_data(&self) -> Option<&BoundingBoxData> {
        self.bounding_box_data.as_ref()
    }

    pub fn display_frame_count(&self) -> usize {
        self.display_frames.len()
    }

    pub fn display_frame_at(&self, index: usize) -> Option<&DisplayFrame> {
        self.display_frames.get(index)
    }
}
