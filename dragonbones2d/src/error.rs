use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown armature: {name}")]
    UnknownArmature { name: String },

    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    #[error("unknown bone: {name}")]
    UnknownBone { name: String },

    #[error("unknown slot: {name}")]
    UnknownSlot { name: String },

    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("unknown constraint: {name}")]
    UnknownConstraint { name: String },

    #[error("stale armature handle: {index}v{generation}")]
    StaleArmature { index: usize, generation: u32 },

    #[error("stale animation state handle: {index}v{generation}")]
    StaleState { index: usize, generation: u32 },

    #[error("invalid display data for slot '{slot}': {message}")]
    InvalidDisplayData { slot: String, message: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },
}
