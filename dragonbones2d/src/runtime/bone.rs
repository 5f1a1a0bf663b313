use crate::geometry::{Matrix, Transform};
use crate::model::{ArmatureData, BoneData};

/// How a bone's `offset` transform combines with its animated pose.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OffsetMode {
    None,
    #[default]
    Additive,
    Override,
}

/// Runtime state of one bone. The bind pose and inherit flags stay in
/// [`BoneData`]; everything here changes frame to frame.
#[derive(Clone, Debug)]
pub struct Bone {
    pub offset_mode: OffsetMode,
    /// User offset, combined per `offset_mode`.
    pub offset: Transform,
    /// Accumulated animation result in parent space.
    pub animation_pose: Transform,
    /// Solved world-space transform. Call [`Bone::update_global_transform`]
    /// before reading after a solve that only produced the matrix.
    pub global: Transform,
    pub global_transform_matrix: Matrix,
    pub(crate) parent: Option<usize>,
    pub(crate) alpha: f32,
    pub(crate) global_alpha: f32,
    pub(crate) global_dirty: bool,
    pub(crate) transform_dirty: bool,
    pub(crate) children_transform_dirty: bool,
    pub(crate) local_dirty: bool,
    pub(crate) has_constraint: bool,
    pub(crate) visible: bool,
    pub(crate) cached_frame_index: i32,
}

impl Bone {
    pub(crate) fn new(bone_data: &BoneData) -> Bone {
        Bone {
            offset_mode: OffsetMode::Additive,
            offset: Transform::default(),
            animation_pose: Transform::default(),
            global: Transform::default(),
            global_transform_matrix: Matrix::default(),
            parent: bone_data.parent,
            alpha: bone_data.alpha,
            global_alpha: 1.0,
            global_dirty: false,
            transform_dirty: false,
            children_transform_dirty: false,
            local_dirty: true,
            has_constraint: false,
            visible: true,
            cached_frame_index: -1,
        }
    }

    /// Decomposes the solved matrix back into `global` when the last solve
    /// deferred it.
    pub fn update_global_transform(&mut self) {
        if self.global_dirty {
            self.global_dirty = false;
            let matrix = self.global_transform_matrix;
            self.global.from_matrix(&matrix);
        }
    }

    /// Forces a solve on the next armature update even when no animation
    /// touches this bone.
    pub fn invalid_update(&mut self) {
        self.transform_dirty = true;
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn global_alpha(&self) -> f32 {
        self.global_alpha
    }
}

/// Walks `descendant`'s parents looking for `ancestor`. A bone does not
/// contain itself.
pub(crate) fn bone_contains(bones: &[Bone], ancestor: usize, descendant: usize) -> bool {
    if ancestor == descendant {
        return false;
    }

    let mut hops = 0;
    let mut current = bones[descendant].parent;
    while let Some(index) = current {
        if index == ancestor {
            return true;
        }
        hops += 1;
        if hops > bones.len() {
            break;
        }
        current = bones[index].parent;
    }

    false
}

/// Borrowed view used to solve bone world transforms, shared between the
/// armature update loop and the constraints.
pub(crate) struct BoneSolver<'a> {
    pub bones: &'a mut [Bone],
    pub armature_data: &'a ArmatureData,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl BoneSolver<'_> {
    /// Composes the local pose and concatenates the parent transform into
    /// `global_transform_matrix`. With `is_cache` the decomposed `global` is
    /// produced immediately instead of on demand.
    pub fn update_global_transform_matrix(&mut self, index: usize, is_cache: bool) {
        let bone_data = &self.armature_data.bones[index];
        let origin = bone_data.transform;
        let flip_x = self.flip_x;
        let flip_y = self.flip_y;

        let mut inherit = self.bones[index].parent.is_some();
        {
            let bone = &mut self.bones[index];
            let offset = bone.offset;
            let pose = bone.animation_pose;

            match bone.offset_mode {
                OffsetMode::Additive => {
                    bone.global.x = origin.x + offset.x + pose.x;
                    bone.global.y = origin.y + offset.y + pose.y;
                    bone.global.skew = origin.skew + offset.skew + pose.skew;
                    bone.global.rotation = origin.rotation + offset.rotation + pose.rotation;
                    bone.global.scale_x = origin.scale_x * offset.scale_x * pose.scale_x;
                    bone.global.scale_y = origin.scale_y * offset.scale_y * pose.scale_y;
                }
                OffsetMode::None => {
                    bone.global = origin;
                    bone.global.add(&pose);
                }
                OffsetMode::Override => {
                    inherit = false;
                    bone.global = offset;
                }
            }
        }

        if inherit {
            let parent_index = self.bones[index].parent.unwrap_or(index);
            self.bones[parent_index].update_global_transform();
            let parent_global = self.bones[parent_index].global;
            let parent_matrix = self.bones[parent_index].global_transform_matrix;
            let bone = &mut self.bones[index];

            if bone_data.inherit_scale {
                if !bone_data.inherit_rotation {
                    let rotation = if flip_x && flip_y {
                        bone.global.rotation - (parent_global.rotation + std::f32::consts::PI)
                    } else if flip_x {
                        bone.global.rotation + parent_global.rotation + std::f32::consts::PI
                    } else if flip_y {
                        bone.global.rotation + parent_global.rotation
                    } else {
                        bone.global.rotation - parent_global.rotation
                    };
                    bone.global.rotation = rotation;
                }

                bone.global.to_matrix(&mut bone.global_transform_matrix);
                bone.global_transform_matrix.concat(&parent_matrix);

                if bone_data.inherit_translation {
                    bone.global.x = bone.global_transform_matrix.tx;
                    bone.global.y = bone.global_transform_matrix.ty;
                } else {
                    bone.global_transform_matrix.tx = bone.global.x;
                    bone.global_transform_matrix.ty = bone.global.y;
                }

                if is_cache {
                    let matrix = bone.global_transform_matrix;
                    bone.global.from_matrix(&matrix);
                } else {
                    bone.global_dirty = true;
                }
            } else {
                if bone_data.inherit_translation {
                    let x = bone.global.x;
                    let y = bone.global.y;
                    bone.global.x = parent_matrix.a * x + parent_matrix.c * y + parent_matrix.tx;
                    bone.global.y = parent_matrix.b * x + parent_matrix.d * y + parent_matrix.ty;
                } else {
                    if flip_x {
                        bone.global.x = -bone.global.x;
                    }
                    if flip_y {
                        bone.global.y = -bone.global.y;
                    }
                }

                if bone_data.inherit_rotation {
                    let mut rotation = if parent_global.scale_x < 0.0 {
                        bone.global.rotation + parent_global.rotation + std::f32::consts::PI
                    } else {
                        bone.global.rotation + parent_global.rotation
                    };

                    if parent_matrix.determinant() < 0.0 {
                        rotation -= bone.global.rotation * 2.0;

                        if flip_x != flip_y || bone_data.inherit_reflection {
                            bone.global.skew += std::f32::consts::PI;
                        }
                    }

                    bone.global.rotation = rotation;
                } else if flip_x || flip_y {
                    apply_flip_rotation(&mut bone.global, flip_x, flip_y);
                }

                bone.global.to_matrix(&mut bone.global_transform_matrix);
            }
        } else {
            let bone = &mut self.bones[index];
            if flip_x || flip_y {
                if flip_x {
                    bone.global.x = -bone.global.x;
                }
                if flip_y {
                    bone.global.y = -bone.global.y;
                }

                apply_flip_rotation(&mut bone.global, flip_x, flip_y);
            }

            bone.global.to_matrix(&mut bone.global_transform_matrix);
        }
    }

    /// Early solve requested by a constraint, ahead of the bone's own slot in
    /// the update order. The result stays flagged dirty so dependents still
    /// refresh.
    pub fn update_by_constraint(&mut self, index: usize) {
        if !self.bones[index].local_dirty {
            return;
        }
        self.bones[index].local_dirty = false;

        let parent_children_dirty = self.bones[index]
            .parent
            .map(|parent| self.bones[parent].children_transform_dirty)
            .unwrap_or(false);

        if self.bones[index].transform_dirty || parent_children_dirty {
            self.update_global_transform_matrix(index, true);
        }

        self.bones[index].transform_dirty = true;
    }
}

fn apply_flip_rotation(global: &mut Transform, flip_x: bool, flip_y: bool) {
    let rotation = if flip_x && flip_y {
        global.rotation + std::f32::consts::PI
    } else if flip_x {
        global.skew += std::f32::consts::PI;
        std::f32::consts::PI - global.rotation
    } else {
        global.skew += std::f32::consts::PI;
        -global.rotation
    };
    global.rotation = rotation;
}
