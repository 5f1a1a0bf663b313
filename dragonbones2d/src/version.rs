//! Target DragonBones export version.

/// Target DragonBones major version for exported data.
pub const DRAGONBONES_EXPORT_MAJOR: u32 = 5;

/// Target DragonBones minor version for exported data.
pub const DRAGONBONES_EXPORT_MINOR: u32 = 7;
