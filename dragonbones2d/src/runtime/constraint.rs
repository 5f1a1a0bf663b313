use super::bone::{Bone, BoneSolver};
use super::slot::Slot;
use crate::{
    ArmatureData, ConstraintData, DEG_RAD, DisplayData, DragonBonesData, GeometryData,
    IkConstraintData, PI_D, PathConstraintData, PathDisplayData, PositionMode, RotateMode,
    SpacingMode, WEIGHT_BONE_INDICES, WEIGHT_FLOAT_OFFSET, normalize_radian,
};
use log::warn;
use std::f32::consts::PI;

/// A live constraint. Constraints run during the update of their root bone,
/// after timelines have written local poses but before children read the
/// world matrices.
#[derive(Clone, Debug)]
pub(crate) enum Constraint {
    Ik(IkConstraintState),
    Path(PathConstraintState),
}

impl Constraint {
    pub(crate) fn new(armature_data: &ArmatureData, index: usize) -> Constraint {
        match &armature_data.constraints[index] {
            ConstraintData::Ik(data) => Constraint::Ik(IkConstraintState::new(data, index)),
            ConstraintData::Path(data) => {
                let path_offset = armature_data
                    .skin_displays(None, data.path_slot)
                    .and_then(|displays| displays.get(data.path_display_index)?.as_ref())
                    .and_then(DisplayData::geometry)
                    .map(|geometry| geometry.offset);
                let path_offset = match path_offset {
                    Some(offset) => offset,
                    None => {
                        warn!("path constraint {} has no path geometry", data.name);
                        usize::MAX
                    }
                };
                Constraint::Path(PathConstraintState::new(data, index, path_offset))
            }
        }
    }

    /// The bone whose update drives this constraint.
    pub(crate) fn root(&self) -> usize {
        match self {
            Constraint::Ik(constraint) => constraint.root,
            Constraint::Path(constraint) => constraint.root,
        }
    }

    pub(crate) fn update(
        &mut self,
        solver: &mut BoneSolver<'_>,
        slots: &mut [Slot],
        data: &DragonBonesData,
    ) {
        match self {
            Constraint::Ik(constraint) => constraint.update(solver),
            Constraint::Path(constraint) => constraint.update(solver, slots, data),
        }
    }

    pub(crate) fn invalid_update(&mut self, bones: &mut [Bone]) {
        match self {
            Constraint::Ik(constraint) => constraint.invalid_update(bones),
            Constraint::Path(_) => {}
        }
    }

    pub(crate) fn as_ik_mut(&mut self) -> Option<&mut IkConstraintState> {
        match self {
            Constraint::Ik(constraint) => Some(constraint),
            Constraint::Path(_) => None,
        }
    }
}

/// Aims one or two bones at a target bone's position.
#[derive(Clone, Debug)]
pub(crate) struct IkConstraintState {
    pub constraint_index: usize,
    pub target: usize,
    pub root: usize,
    /// Second chain bone; two bone IK when present.
    pub bone: Option<usize>,
    pub bend_positive: bool,
    pub weight: f32,
}

impl IkConstraintState {
    fn new(data: &IkConstraintData, constraint_index: usize) -> IkConstraintState {
        IkConstraintState {
            constraint_index,
            target: data.target,
            root: data.root,
            bone: data.bone,
            bend_positive: data.bend_positive,
            weight: data.weight,
        }
    }

    fn update(&mut self, solver: &mut BoneSolver<'_>) {
        solver.update_by_constraint(self.root);
        match self.bone {
            Some(bone) => {
                solver.update_by_constraint(bone);
                self.compute_two_bones(solver, bone);
            }
            None => self.compute_single_bone(solver),
        }
    }

    fn invalid_update(&mut self, bones: &mut [Bone]) {
        bones[self.root].invalid_update();
        if let Some(bone) = self.bone {
            bones[bone].invalid_update();
        }
    }

    fn compute_single_bone(&self, solver: &mut BoneSolver<'_>) {
        let ik_global = solver.bones[self.target].global;
        let root = &mut solver.bones[self.root];
        let global = &mut root.global;

        let mut radian = (ik_global.y - global.y).atan2(ik_global.x - global.x);
        if global.scale_x < 0.0 {
            radian += PI;
        }

        global.rotation += normalize_radian(radian - global.rotation) * self.weight;
        global.to_matrix(&mut root.global_transform_matrix);
    }

    fn compute_two_bones(&self, solver: &mut BoneSolver<'_>, bone_index: usize) {
        let bone_length = solver.armature_data.bones[bone_index].length;
        let parent = self.root;

        let ik_global = solver.bones[self.target].global;
        let mut global = solver.bones[bone_index].global;
        let matrix = solver.bones[bone_index].global_transform_matrix;
        let mut parent_global = solver.bones[parent].global;

        let x = matrix.a * bone_length;
        let y = matrix.b * bone_length;
        let l_ll = x * x + y * y;
        let l_l = l_ll.sqrt();

        let mut d_x = global.x - parent_global.x;
        let mut d_y = global.y - parent_global.y;
        let l_pp = d_x * d_x + d_y * d_y;
        let l_p = l_pp.sqrt();
        let raw_radian = global.rotation;
        let raw_parent_radian = parent_global.rotation;
        let raw_radian_a = d_y.atan2(d_x);

        d_x = ik_global.x - parent_global.x;
        d_y = ik_global.y - parent_global.y;
        let l_tt = d_x * d_x + d_y * d_y;
        let l_t = l_tt.sqrt();

        let radian_a;
        if l_l + l_p <= l_t || l_t + l_l <= l_p || l_t + l_p <= l_l {
            // Degenerate triangle, the chain can only point at the target.
            let mut radian = (ik_global.y - parent_global.y).atan2(ik_global.x - parent_global.x);
            if l_l + l_p > l_t && l_p < l_l {
                radian += PI;
            }
            radian_a = radian;
        } else {
            let h = (l_pp - l_ll + l_tt) / (2.0 * l_tt);
            let r = (l_pp - h * h * l_tt).sqrt() / l_t;
            let h_x = parent_global.x + d_x * h;
            let h_y = parent_global.y + d_y * h;
            let r_x = -d_y * r;
            let r_y = d_x * r;

            // A reflected grandparent flips which side counts as positive.
            let reflected = match solver.bones[parent].parent {
                Some(grand) => {
                    solver.bones[grand].global_transform_matrix.determinant() < 0.0
                }
                None => false,
            };
            if reflected != self.bend_positive {
                global.x = h_x - r_x;
                global.y = h_y - r_y;
            } else {
                global.x = h_x + r_x;
                global.y = h_y + r_y;
            }

            radian_a = (global.y - parent_global.y).atan2(global.x - parent_global.x);
        }

        let d_r = normalize_radian(radian_a - raw_radian_a);
        parent_global.rotation = raw_parent_radian + d_r * self.weight;
        {
            let parent_bone = &mut solver.bones[parent];
            parent_bone.global.rotation = parent_global.rotation;
            parent_bone.global.to_matrix(&mut parent_bone.global_transform_matrix);
        }

        let current_radian_a = raw_radian_a + d_r * self.weight;
        global.x = parent_global.x + current_radian_a.cos() * l_p;
        global.y = parent_global.y + current_radian_a.sin() * l_p;

        let mut radian_b = (ik_global.y - global.y).atan2(ik_global.x - global.x);
        if global.scale_x < 0.0 {
            radian_b += PI;
        }

        global.rotation = parent_global.rotation + raw_radian - raw_parent_radian
            + normalize_radian(radian_b - d_r - raw_radian) * self.weight;

        let bone = &mut solver.bones[bone_index];
        bone.global.x = global.x;
        bone.global.y = global.y;
        bone.global.rotation = global.rotation;
        bone.global.to_matrix(&mut bone.global_transform_matrix);
    }
}

/// Distributes a bone chain along a path slot's sampled curve.
#[derive(Clone, Debug)]
pub(crate) struct PathConstraintState {
    pub constraint_index: usize,
    pub dirty: bool,
    /// Packed offset of the path geometry this constraint was built against.
    pub path_offset: usize,
    pub position: f32,
    pub spacing: f32,
    pub rotate_offset: f32,
    pub rotate_mix: f32,
    pub translate_mix: f32,
    pub root: usize,
    pub path_slot: usize,
    pub bones: Vec<usize>,
    spaces: Vec<f32>,
    positions: Vec<f32>,
    curves: Vec<f32>,
    bone_lengths: Vec<f32>,
    path_global_vertices: Vec<f32>,
    curve_vertices: Vec<f32>,
    segments: [f32; 10],
}

impl PathConstraintState {
    fn new(data: &PathConstraintData, constraint_index: usize, path_offset: usize) -> Self {
        PathConstraintState {
            constraint_index,
            dirty: false,
            path_offset,
            position: data.position,
            spacing: data.spacing,
            rotate_offset: data.rotate_offset,
            rotate_mix: data.rotate_mix,
            translate_mix: data.translate_mix,
            root: data.root,
            path_slot: data.path_slot,
            bones: data.bones.clone(),
            spaces: Vec::new(),
            positions: Vec::new(),
            curves: Vec::new(),
            bone_lengths: vec![0.0; if data.rotate_mode == RotateMode::ChainScale {
                data.bones.len()
            } else {
                0
            }],
            path_global_vertices: Vec::new(),
            curve_vertices: Vec::new(),
            segments: [0.0; 10],
        }
    }

    fn update(
        &mut self,
        solver: &mut BoneSolver<'_>,
        slots: &mut [Slot],
        data: &DragonBonesData,
    ) {
        let armature_data = solver.armature_data;
        let ConstraintData::Path(constraint_data) =
            &armature_data.constraints[self.constraint_index]
        else {
            return;
        };

        // The path slot must still carry the geometry this constraint was
        // built against.
        let path_slot = self.path_slot;
        let geometry = match &slots[path_slot].geometry_data {
            Some(geometry) if geometry.offset == self.path_offset => geometry.clone(),
            _ => return,
        };

        let mut path_vertices_dirty = false;
        if solver.bones[self.root].children_transform_dirty {
            self.update_path_vertices(solver, slots, data, &geometry);
            path_vertices_dirty = true;
        } else if slots[path_slot].vertices_dirty
            || slots[path_slot].is_bones_update(solver.bones)
        {
            self.update_path_vertices(solver, slots, data, &geometry);
            slots[path_slot].vertices_dirty = false;
            path_vertices_dirty = true;
        }

        if !path_vertices_dirty && !self.dirty {
            return;
        }

        let position_mode = constraint_data.position_mode;
        let spacing_mode = constraint_data.spacing_mode;
        let rotate_mode = constraint_data.rotate_mode;

        let is_length_mode = spacing_mode == SpacingMode::Length;
        let is_chain_scale_mode = rotate_mode == RotateMode::ChainScale;
        let is_tangent_mode = rotate_mode == RotateMode::Tangent;
        let bone_count = self.bones.len();
        let space_count = if is_tangent_mode { bone_count } else { bone_count + 1 };

        let spacing = self.spacing;
        self.spaces.resize(space_count, 0.0);

        if is_chain_scale_mode || is_length_mode {
            self.spaces[0] = 0.0;
            for i in 0..space_count.saturating_sub(1) {
                let bone_index = self.bones[i];
                solver.update_by_constraint(bone_index);
                let bone_length = armature_data.bones[bone_index].length;
                let matrix = &solver.bones[bone_index].global_transform_matrix;
                let x = bone_length * matrix.a;
                let y = bone_length * matrix.b;

                let length = (x * x + y * y).sqrt();
                if is_chain_scale_mode {
                    self.bone_lengths[i] = length;
                }
                self.spaces[i + 1] = (bone_length + spacing) * length / bone_length;
            }
        } else {
            for space in self.spaces.iter_mut() {
                *space = spacing;
            }
        }

        {
            let slot = &slots[path_slot];
            let path_display = match slot
                .current_frame
                .and_then(|frame| slot.display_frames[frame].raw_display_data.as_ref())
            {
                Some(DisplayData::Path(display)) => display,
                _ => return,
            };
            self.compute_bezier_curve(
                path_display,
                data,
                space_count,
                is_tangent_mode,
                position_mode == PositionMode::Percent,
                spacing_mode == SpacingMode::Percent,
            );
        }

        let mut bone_x = self.positions[0];
        let mut bone_y = self.positions[1];
        let mut rotate_offset = self.rotate_offset;
        let tip;
        if rotate_offset == 0.0 {
            tip = rotate_mode == RotateMode::Chain;
        } else {
            tip = false;
            let parent_bone = slots[path_slot].parent;
            let matrix = &solver.bones[parent_bone].global_transform_matrix;
            rotate_offset *= if matrix.determinant() > 0.0 { DEG_RAD } else { -DEG_RAD };
        }

        let rotate_mix = self.rotate_mix;
        let translate_mix = self.translate_mix;
        let mut p = 3;
        for i in 0..bone_count {
            let bone_index = self.bones[i];
            solver.update_by_constraint(bone_index);

            let x = self.positions[p];
            let y = self.positions[p + 1];
            let d_x = x - bone_x;
            let d_y = y - bone_y;

            let bone = &mut solver.bones[bone_index];
            let matrix = &mut bone.global_transform_matrix;
            matrix.tx += (bone_x - matrix.tx) * translate_mix;
            matrix.ty += (bone_y - matrix.ty) * translate_mix;

            if is_chain_scale_mode {
                let length = self.bone_lengths[i];
                let s = ((d_x * d_x + d_y * d_y).sqrt() / length - 1.0) * rotate_mix + 1.0;
                matrix.a *= s;
                matrix.b *= s;
            }

            bone_x = x;
            bone_y = y;
            if rotate_mix > 0.0 {
                let a = matrix.a;
                let b = matrix.b;
                let c = matrix.c;
                let d = matrix.d;
                let mut r = if is_tangent_mode {
                    self.positions[p - 1]
                } else {
                    d_y.atan2(d_x)
                };

                r -= b.atan2(a);

                if tip {
                    let cos = r.cos();
                    let sin = r.sin();

                    let length = armature_data.bones[bone_index].length;
                    bone_x += (length * (cos * a - sin * b) - d_x) * rotate_mix;
                    bone_y += (length * (sin * a + cos * b) - d_y) * rotate_mix;
                } else {
                    r += rotate_offset;
                }

                if r > PI {
                    r -= PI_D;
                } else if r < -PI {
                    r += PI_D;
                }

                r *= rotate_mix;

                let cos = r.cos();
                let sin = r.sin();
                matrix.a = cos * a - sin * b;
                matrix.b = sin * a + cos * b;
                matrix.c = cos * c - sin * d;
                matrix.d = sin * c + cos * d;
            }

            bone.global.from_matrix(&bone.global_transform_matrix);
            p += 3;
        }

        self.dirty = false;
    }

    /// Transforms the path's packed vertices into armature space, through the
    /// weight bones when the path is skinned.
    fn update_path_vertices(
        &mut self,
        solver: &mut BoneSolver<'_>,
        slots: &[Slot],
        data: &DragonBonesData,
        geometry: &GeometryData,
    ) {
        let scale = solver.armature_data.scale;
        let path_vertex_count = geometry.vertex_count(&data.int_array);
        let path_vertex_offset = geometry.float_offset(&data.int_array);

        self.path_global_vertices.resize(path_vertex_count * 2, 0.0);

        let Some(weight) = &geometry.weight else {
            let parent_bone = slots[self.path_slot].parent;
            solver.update_by_constraint(parent_bone);

            let matrix = solver.bones[parent_bone].global_transform_matrix;
            let mut i_v = path_vertex_offset;
            for i in 0..path_vertex_count {
                let v_x = data.float_array[i_v] * scale;
                let v_y = data.float_array[i_v + 1] * scale;
                i_v += 2;

                self.path_global_vertices[i * 2] = matrix.a * v_x + matrix.c * v_y + matrix.tx;
                self.path_global_vertices[i * 2 + 1] = matrix.b * v_x + matrix.d * v_y + matrix.ty;
            }
            return;
        };

        let bones = &slots[self.path_slot].geometry_bones;
        let weight_bone_count = weight.bones.len();
        let weight_offset = weight.offset;
        let float_offset = {
            let value = data.int_array[weight_offset + WEIGHT_FLOAT_OFFSET] as i32;
            if value < 0 { (value + 65536) as usize } else { value as usize }
        };

        let mut i_v = float_offset;
        let mut i_b = weight_offset + WEIGHT_BONE_INDICES + weight_bone_count;
        let mut i_w = 0;

        for _ in 0..path_vertex_count {
            let vertex_bone_count = data.int_array[i_b] as usize;
            i_b += 1;

            let mut x_g = 0.0;
            let mut y_g = 0.0;
            for _ in 0..vertex_bone_count {
                let bone_index = data.int_array[i_b] as usize;
                i_b += 1;
                let Some(&bone) = bones.get(bone_index) else {
                    i_v += 3;
                    continue;
                };

                solver.update_by_constraint(bone);
                let matrix = solver.bones[bone].global_transform_matrix;
                let weight_value = data.float_array[i_v];
                let v_x = data.float_array[i_v + 1] * scale;
                let v_y = data.float_array[i_v + 2] * scale;
                i_v += 3;
                x_g += (matrix.a * v_x + matrix.c * v_y + matrix.tx) * weight_value;
                y_g += (matrix.b * v_x + matrix.d * v_y + matrix.ty) * weight_value;
            }

            self.path_global_vertices[i_w] = x_g;
            self.path_global_vertices[i_w + 1] = y_g;
            i_w += 2;
        }
    }

    /// Resamples the path into `positions`: x, y and a tangent slot per
    /// space, plus a trailing pair.
    fn compute_bezier_curve(
        &mut self,
        path_display: &PathDisplayData,
        data: &DragonBonesData,
        space_count: usize,
        tangents: bool,
        percent_position: bool,
        percent_spacing: bool,
    ) {
        let is_closed = path_display.closed;
        let vertex_count = path_display.geometry.vertex_count(&data.int_array);
        let mut vertices_length = vertex_count * 2;
        let mut curve_count = vertices_length / 6;
        let mut pre_curve: i32 = -1;
        let mut position = self.position;

        self.positions.resize(space_count * 3 + 2, 0.0);

        if !path_display.constant_speed {
            let lengths = &path_display.curve_lengths;
            curve_count -= if is_closed { 1 } else { 2 };
            let path_length = lengths[curve_count];

            if percent_position {
                position *= path_length;
            }
            if percent_spacing {
                for space in self.spaces.iter_mut() {
                    *space *= path_length;
                }
            }

            self.curve_vertices.clear();
            self.curve_vertices.resize(8, 0.0);
            let mut curve = 0;
            let mut o = 0;
            for i in 0..space_count {
                let space = self.spaces[i];
                position += space;

                if is_closed {
                    position %= path_length;
                    if position < 0.0 {
                        position += path_length;
                    }
                    curve = 0;
                } else if position < 0.0 || position > path_length {
                    o += 3;
                    continue;
                }

                let mut length = lengths[curve];
                while position > length {
                    curve += 1;
                    length = lengths[curve];
                }
                let percent = if curve == 0 {
                    position / length
                } else {
                    let pre_length = lengths[curve - 1];
                    (position - pre_length) / (length - pre_length)
                };

                if curve as i32 != pre_curve {
                    pre_curve = curve as i32;
                    if is_closed && curve == curve_count {
                        copy_path_vertices(
                            &self.path_global_vertices,
                            vertices_length - 4,
                            4,
                            0,
                            &mut self.curve_vertices,
                        );
                        copy_path_vertices(
                            &self.path_global_vertices,
                            0,
                            4,
                            4,
                            &mut self.curve_vertices,
                        );
                    } else {
                        copy_path_vertices(
                            &self.path_global_vertices,
                            curve * 6 + 2,
                            8,
                            0,
                            &mut self.curve_vertices,
                        );
                    }
                }

                add_curve_position(
                    percent,
                    self.curve_vertices[0],
                    self.curve_vertices[1],
                    self.curve_vertices[2],
                    self.curve_vertices[3],
                    self.curve_vertices[4],
                    self.curve_vertices[5],
                    self.curve_vertices[6],
                    self.curve_vertices[7],
                    &mut self.positions,
                    o,
                    tangents,
                );
                o += 3;
            }
            return;
        }

        // Constant speed: measure each curve with four samples, then walk a
        // ten segment table per curve.
        if is_closed {
            vertices_length += 2;
            self.curve_vertices.clear();
            self.curve_vertices.resize(vertices_length, 0.0);
            copy_path_vertices(
                &self.path_global_vertices,
                2,
                vertices_length - 4,
                0,
                &mut self.curve_vertices,
            );
            copy_path_vertices(
                &self.path_global_vertices,
                0,
                2,
                vertices_length - 4,
                &mut self.curve_vertices,
            );
            self.curve_vertices[vertices_length - 2] = self.curve_vertices[0];
            self.curve_vertices[vertices_length - 1] = self.curve_vertices[1];
        } else {
            curve_count -= 1;
            vertices_length -= 4;
            self.curve_vertices.clear();
            self.curve_vertices.resize(vertices_length, 0.0);
            copy_path_vertices(
                &self.path_global_vertices,
                2,
                vertices_length,
                0,
                &mut self.curve_vertices,
            );
        }

        self.curves.clear();
        self.curves.resize(curve_count, 0.0);
        let mut path_length = 0.0;
        let mut x1 = self.curve_vertices[0];
        let mut y1 = self.curve_vertices[1];
        let mut cx1 = 0.0;
        let mut cy1 = 0.0;
        let mut cx2 = 0.0;
        let mut cy2 = 0.0;
        let mut x2 = 0.0;
        let mut y2 = 0.0;

        let mut w = 2;
        for i in 0..curve_count {
            cx1 = self.curve_vertices[w];
            cy1 = self.curve_vertices[w + 1];
            cx2 = self.curve_vertices[w + 2];
            cy2 = self.curve_vertices[w + 3];
            x2 = self.curve_vertices[w + 4];
            y2 = self.curve_vertices[w + 5];
            let tmp_x = (x1 - cx1 * 2.0 + cx2) * 0.1875;
            let tmp_y = (y1 - cy1 * 2.0 + cy2) * 0.1875;
            let dddf_x = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.09375;
            let dddf_y = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.09375;
            let mut ddf_x = tmp_x * 2.0 + dddf_x;
            let mut ddf_y = tmp_y * 2.0 + dddf_y;
            let mut df_x = (cx1 - x1) * 0.75 + tmp_x + dddf_x * 0.16666667;
            let mut df_y = (cy1 - y1) * 0.75 + tmp_y + dddf_y * 0.16666667;
            path_length += (df_x * df_x + df_y * df_y).sqrt();
            df_x += ddf_x;
            df_y += ddf_y;
            ddf_x += dddf_x;
            ddf_y += dddf_y;
            path_length += (df_x * df_x + df_y * df_y).sqrt();
            df_x += ddf_x;
            df_y += ddf_y;
            path_length += (df_x * df_x + df_y * df_y).sqrt();
            df_x += ddf_x + dddf_x;
            df_y += ddf_y + dddf_y;
            path_length += (df_x * df_x + df_y * df_y).sqrt();
            self.curves[i] = path_length;
            x1 = x2;
            y1 = y2;
            w += 6;
        }

        if percent_position {
            position *= path_length;
        }
        if percent_spacing {
            for space in self.spaces.iter_mut() {
                *space *= path_length;
            }
        }

        let mut curve_length = 0.0;
        let mut curve = 0;
        let mut segment = 0;
        let mut o = 0;
        for i in 0..space_count {
            let space = self.spaces[i];
            position += space;
            let mut p = position;

            if is_closed {
                p %= path_length;
                if p < 0.0 {
                    p += path_length;
                }
                curve = 0;
            } else if p < 0.0 || p > path_length {
                o += 3;
                continue;
            }

            let mut length = self.curves[curve];
            while p > length {
                curve += 1;
                length = self.curves[curve];
            }
            if curve == 0 {
                p /= length;
            } else {
                let prev = self.curves[curve - 1];
                p = (p - prev) / (length - prev);
            }

            if curve as i32 != pre_curve {
                pre_curve = curve as i32;
                let ii = curve * 6;
                x1 = self.curve_vertices[ii];
                y1 = self.curve_vertices[ii + 1];
                cx1 = self.curve_vertices[ii + 2];
                cy1 = self.curve_vertices[ii + 3];
                cx2 = self.curve_vertices[ii + 4];
                cy2 = self.curve_vertices[ii + 5];
                x2 = self.curve_vertices[ii + 6];
                y2 = self.curve_vertices[ii + 7];
                let tmp_x = (x1 - cx1 * 2.0 + cx2) * 0.03;
                let tmp_y = (y1 - cy1 * 2.0 + cy2) * 0.03;
                let dddf_x = ((cx1 - cx2) * 3.0 - x1 + x2) * 0.006;
                let dddf_y = ((cy1 - cy2) * 3.0 - y1 + y2) * 0.006;
                let mut ddf_x = tmp_x * 2.0 + dddf_x;
                let mut ddf_y = tmp_y * 2.0 + dddf_y;
                let mut df_x = (cx1 - x1) * 0.3 + tmp_x + dddf_x * 0.16666667;
                let mut df_y = (cy1 - y1) * 0.3 + tmp_y + dddf_y * 0.16666667;
                curve_length = (df_x * df_x + df_y * df_y).sqrt();
                self.segments[0] = curve_length;
                for ii in 1..8 {
                    df_x += ddf_x;
                    df_y += ddf_y;
                    ddf_x += dddf_x;
                    ddf_y += dddf_y;
                    curve_length += (df_x * df_x + df_y * df_y).sqrt();
                    self.segments[ii] = curve_length;
                }
                df_x += ddf_x;
                df_y += ddf_y;
                curve_length += (df_x * df_x + df_y * df_y).sqrt();
                self.segments[8] = curve_length;
                df_x += ddf_x + dddf_x;
                df_y += ddf_y + dddf_y;
                curve_length += (df_x * df_x + df_y * df_y).sqrt();
                self.segments[9] = curve_length;
                segment = 0;
            }

            p *= curve_length;
            let mut segment_length = self.segments[segment];
            while p > segment_length {
                segment += 1;
                segment_length = self.segments[segment];
            }
            if segment == 0 {
                p /= segment_length;
            } else {
                let prev = self.segments[segment - 1];
                p = segment as f32 + (p - prev) / (segment_length - prev);
            }

            add_curve_position(
                p * 0.1,
                x1,
                y1,
                cx1,
                cy1,
                cx2,
                cy2,
                x2,
                y2,
                &mut self.positions,
                o,
                tangents,
            );
            o += 3;
        }
    }
}

/// Copies `count` sampled floats into `out` starting at `offset`.
fn copy_path_vertices(source: &[f32], start: usize, count: usize, offset: usize, out: &mut [f32]) {
    let mut i_w = start;
    for i in (offset..offset + count).step_by(2) {
        out[i] = source[i_w];
        out[i + 1] = source[i_w + 1];
        i_w += 2;
    }
}

/// Evaluates one cubic bezier at `t`, writing x, y and optionally the tangent
/// angle.
#[allow(clippy::too_many_arguments)]
fn add_curve_position(
    t: f32,
    x1: f32,
    y1: f32,
    cx1: f32,
    cy1: f32,
    cx2: f32,
    cy2: f32,
    x2: f32,
    y2: f32,
    out: &mut [f32],
    offset: usize,
    tangents: bool,
) {
    if t == 0.0 {
        out[offset] = x1;
        out[offset + 1] = y1;
        out[offset + 2] = 0.0;
        return;
    }

    if t == 1.0 {
        out[offset] = x2;
        out[offset + 1] = y2;
        out[offset + 2] = 0.0;
        return;
    }

    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let t2 = t * t;
    let a = mt2 * mt;
    let b = mt2 * t * 3.0;
    let c = mt * t2 * 3.0;
    let d = t * t2;

    let x = a * x1 + b * cx1 + c * cx2 + d * x2;
    let y = a * y1 + b * cy1 + c * cy2 + d * y2;

    out[offset] = x;
    out[offset + 1] = y;
    if tangents {
        out[offset + 2] =
            (y - (a * y1 + b * cy1 + c * cy2)).atan2(x - (a * x1 + b * cx1 + c * cx2));
    } else {
        out[offset + 2] = 0.0;
    }
}
