mod animation;
mod animation_state;
mod armature;
mod bone;
mod clock;
mod constraint;
mod context;
mod event;
mod slot;
mod timeline;

pub use animation::*;
pub use animation_state::*;
pub use armature::*;
pub use bone::*;
pub use clock::*;
pub use constraint::*;
pub use context::*;
pub use event::*;
pub use slot::*;

#[cfg(test)]
mod fixtures;



#[cfg(test)]
mod timeline_tests;

#[cfg(test)]
mod animation_state_tests;



#[cfg(test)]
mod constraint_tests;
