use super::animation::StateId;
use super::context::{ArmatureId, Runtime};
use crate::UserData;

/// What a buffered notification reports, named as the runtime names them on
/// the wire.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Start,
    LoopComplete,
    Complete,
    FadeIn,
    FadeInComplete,
    FadeOut,
    FadeOutComplete,
    FrameEvent,
    SoundEvent,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::LoopComplete => "loopComplete",
            EventKind::Complete => "complete",
            EventKind::FadeIn => "fadeIn",
            EventKind::FadeInComplete => "fadeInComplete",
            EventKind::FadeOut => "fadeOut",
            EventKind::FadeOutComplete => "fadeOutComplete",
            EventKind::FrameEvent => "frameEvent",
            EventKind::SoundEvent => "soundEvent",
        }
    }
}

/// One buffered notification.
///
/// Playback notifications carry their state and nothing else. Frame and sound
/// events add the keyframe name, its time inside the animation and whatever
/// bone, slot and custom payload the frame was authored with.
#[derive(Clone, Debug)]
pub struct EventObject {
    pub kind: EventKind,
    pub name: String,
    pub time: f32,
    pub armature: ArmatureId,
    pub bone: Option<usize>,
    pub slot: Option<usize>,
    pub state: Option<StateId>,
    pub data: Option<UserData>,
}

impl EventObject {
    pub(crate) fn for_state(kind: EventKind, armature: ArmatureId, state: StateId) -> EventObject {
        EventObject {
            kind,
            name: String::new(),
            time: 0.0,
            armature,
            bone: None,
            slot: None,
            state: Some(state),
            data: None,
        }
    }
}

/// Receiver for buffered events.
///
/// Called during [`Runtime::advance_time`] once every armature has ticked,
/// with the runtime handed back for reentrant calls: a listener may start
/// animations or dispose armatures while it runs.
pub trait EventListener {
    fn on_event(&mut self, rt: &mut Runtime, event: &EventObject);
}
