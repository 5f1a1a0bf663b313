use super::animation_state::BlendState;
use super::context::{ArmatureId, Runtime};
use super::event::{EventKind, EventListener, EventObject};
use super::fixtures::{ArmatureFixture, assert_approx, key};
use crate::{AnimationFadeOutMode, DragonBonesData};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[test]
fn first_claim_assigns_then_accumulates() {
    let mut state = BlendState::default();

    assert!(state.update(0, 0.6));
    assert_eq!(state.dirty, 1);
    assert_approx(state.blend_weight, 0.6);
    assert_approx(state.left_weight, 1.0);

    assert!(state.update(0, 0.5));
    assert_eq!(state.dirty, 2);
    assert_approx(state.blend_weight, 0.5);
    assert_approx(state.layer_weight, 1.1);
}

#[test]
fn a_lower_layer_shares_what_the_higher_one_left() {
    let mut state = BlendState::default();

    assert!(state.update(1, 0.6));
    assert_approx(state.blend_weight, 0.6);

    // Layer 1 spent 0.6 of the budget, so layer 0 gets 0.4 of its ask.
    assert!(state.update(0, 1.0));
    assert_approx(state.blend_weight, 0.4);

    // Layer 0 in turn spent the rest.
    assert!(!state.update(-1, 1.0));
    assert_approx(state.blend_weight, 0.0);
}

#[test]
fn a_saturated_layer_blocks_everything_below() {
    let mut state = BlendState::default();

    assert!(state.update(5, 1.0));
    assert!(!state.update(0, 0.5));
    assert_approx(state.blend_weight, 0.0);

    state.reset();
    assert!(state.update(0, 0.5));
    assert_approx(state.blend_weight, 0.5);
}

/// Hero whose arm, hand and leg all slide 12 units over the first half of
/// `move`.
fn limbed_hero() -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    fixture.bone("arm", Some("root"));
    fixture.bone("hand", Some("arm"));
    fixture.bone("leg", Some("root"));
    fixture.animation("move", 24, 0);
    for bone in ["arm", "hand", "leg"] {
        fixture.translate_timeline(bone, &[key(0, &[0.0, 0.0]), key(12, &[12.0, 0.0])]);
    }
    fixture.build()
}

fn fading_hero() -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    fixture.bone("arm", Some("root"));
    fixture.animation("idle", 24, 0);
    fixture.animation("move", 24, 0);
    fixture.translate_timeline("arm", &[key(0, &[10.0, 0.0])]);
    fixture.build()
}

fn build(data: &Arc<DragonBonesData>) -> (Runtime, ArmatureId) {
    let mut rt = Runtime::new();
    let id = rt.build_armature(data, "hero", None).unwrap();
    (rt, id)
}

fn bone_x(rt: &Runtime, id: ArmatureId, bone: usize) -> f32 {
    rt.armature(id).unwrap().bones()[bone].animation_pose.x
}

#[test]
fn fade_in_holds_the_playhead_and_scales_the_pose() {
    let data = fading_hero();
    let (mut rt, id) = build(&data);
    rt.armature_mut(id).unwrap().play(Some("idle"), -1).unwrap();
    rt.advance_time(0.1);

    rt.armature_mut(id)
        .unwrap()
        .fade_in(
            "move",
            1.0,
            -1,
            0,
            None,
            AnimationFadeOutMode::SameLayerAndGroup,
        )
        .unwrap();
    rt.advance_time(0.5);

    {
        let armature = rt.armature(id).unwrap();
        let incoming = armature.animation().get_state("move").unwrap();
        assert!(incoming.is_fade_in());
        assert!(!incoming.is_fade_complete());
        // The playhead waits for the fade; only the weight moves.
        assert_approx(incoming.current_time(), 0.0);
        assert!(armature.animation().get_state("idle").unwrap().is_fade_out());
    }
    assert_approx(bone_x(&rt, id, 1), 5.0);

    rt.advance_time(0.6);

    {
        let armature = rt.armature(id).unwrap();
        let incoming = armature.animation().get_state("move").unwrap();
        assert!(incoming.is_fade_complete());
        assert_approx(incoming.current_time(), 0.6);
        assert!(armature.animation().get_state("idle").is_none());
    }
    assert_approx(bone_x(&rt, id, 1), 10.0);
}

#[derive(Clone, Default)]
struct KindRecorder {
    seen: Rc<RefCell<Vec<EventKind>>>,
}

impl EventListener for KindRecorder {
    fn on_event(&mut self, _rt: &mut Runtime, event: &EventObject) {
        self.seen.borrow_mut().push(event.kind);
    }
}

#[test]
fn fade_events_bracket_a_timed_fade() {
    let data = fading_hero();
    let (mut rt, id) = build(&data);
    let recorder = KindRecorder::default();
    let seen = Rc::clone(&recorder.seen);
    rt.set_listener(recorder);

    rt.armature_mut(id).unwrap().play(Some("idle"), -1).unwrap();
    rt.advance_time(0.1);
    assert_eq!(
        *seen.borrow(),
        vec![EventKind::FadeIn, EventKind::FadeInComplete, EventKind::Start]
    );
    seen.borrow_mut().clear();

    rt.armature_mut(id)
        .unwrap()
        .fade_in(
            "move",
            0.5,
            -1,
            0,
            None,
            AnimationFadeOutMode::SameLayerAndGroup,
        )
        .unwrap();
    rt.advance_time(0.25);
    assert_eq!(
        *seen.borrow(),
        vec![EventKind::FadeOut, EventKind::FadeIn, EventKind::Start]
    );
    seen.borrow_mut().clear();

    rt.advance_time(0.3);
    assert_eq!(
        *seen.borrow(),
        vec![EventKind::FadeOutComplete, EventKind::FadeInComplete]
    );
}

#[test]
fn mask_limits_a_state_to_its_bones_and_their_children() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();

    rt.advance_time(0.25);
    assert_approx(bone_x(&rt, id, 1), 6.0);
    assert_approx(bone_x(&rt, id, 3), 6.0);

    rt.armature_mut(id).unwrap().add_bone_mask(state, "arm", true);
    rt.advance_time(0.15);

    // Arm and hand keep going; the leg froze where the mask left it.
    assert_approx(bone_x(&rt, id, 1), 9.6);
    assert_approx(bone_x(&rt, id, 2), 9.6);
    assert_approx(bone_x(&rt, id, 3), 6.0);

    let armature = rt.armature(id).unwrap();
    let state = armature.animation().state(state).unwrap();
    assert!(state.contains_bone_mask("arm"));
    assert!(state.contains_bone_mask("hand"));
    assert!(!state.contains_bone_mask("leg"));
    assert!(!state.contains_bone_mask("root"));
}

#[test]
fn removing_the_last_masked_bone_keeps_everything_outside_the_subtree() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();

    let armature = rt.armature_mut(id).unwrap();
    armature.add_bone_mask(state, "arm", false);
    armature.remove_bone_mask(state, "arm", true);

    let state = armature.animation().state(state).unwrap();
    assert!(state.contains_bone_mask("root"));
    assert!(state.contains_bone_mask("leg"));
    assert!(!state.contains_bone_mask("arm"));
    assert!(!state.contains_bone_mask("hand"));
}

#[test]
fn clearing_the_mask_reopens_every_bone() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();

    let armature = rt.armature_mut(id).unwrap();
    armature.add_bone_mask(state, "leg", false);
    let masked = armature.animation_mut().state_mut(state).unwrap();
    assert!(!masked.contains_bone_mask("arm"));

    masked.remove_all_bone_masks();
    assert!(masked.contains_bone_mask("arm"));
    assert!(masked.contains_bone_mask("leg"));
}

#[test]
fn scrubbing_wraps_time_into_the_loop() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();
    rt.advance_time(0.1);

    let armature = rt.armature_mut(id).unwrap();
    armature
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .set_current_time(2.3);
    assert_approx(
        armature.animation().state(state).unwrap().current_time(),
        0.3,
    );
    rt.advance_time(0.0);
    assert_approx(bone_x(&rt, id, 1), 7.2);

    let armature = rt.armature_mut(id).unwrap();
    armature
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .set_current_time(-0.25);
    assert_approx(
        armature.animation().state(state).unwrap().current_time(),
        0.75,
    );
    rt.advance_time(0.0);
    assert_approx(bone_x(&rt, id, 1), 6.0);
}

#[test]
fn scrubbing_to_the_very_end_does_not_complete() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), 1)
        .unwrap();
    rt.advance_time(0.1);

    rt.armature_mut(id)
        .unwrap()
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .set_current_time(1.0);
    rt.advance_time(0.0);

    {
        let armature = rt.armature(id).unwrap();
        let state = armature.animation().state(state).unwrap();
        assert!(!state.is_completed());
        assert!(state.is_playing());
        assert_approx(state.current_time(), 1.0);
    }

    rt.advance_time(0.1);
    let armature = rt.armature(id).unwrap();
    assert!(armature.animation().state(state).unwrap().is_completed());
}

#[test]
fn set_weight_rescales_the_applied_pose() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();

    rt.advance_time(0.25);
    assert_approx(bone_x(&rt, id, 1), 6.0);

    rt.armature_mut(id)
        .unwrap()
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .set_weight(0.5);
    rt.advance_time(0.0);
    assert_approx(bone_x(&rt, id, 1), 3.0);
}

#[test]
fn stop_and_play_toggle_the_playhead() {
    let data = limbed_hero();
    let (mut rt, id) = build(&data);
    let state = rt
        .armature_mut(id)
        .unwrap()
        .play(Some("move"), -1)
        .unwrap();
    rt.advance_time(0.2);

    rt.armature_mut(id)
        .unwrap()
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .stop();
    rt.advance_time(0.3);

    {
        let armature = rt.armature(id).unwrap();
        let state = armature.animation().state(state).unwrap();
        assert!(!state.is_playing());
        assert_approx(state.current_time(), 0.2);
    }

    rt.armature_mut(id)
        .unwrap()
        .animation_mut()
        .state_mut(state)
        .unwrap()
        .play();
    rt.advance_time(0.2);

    let armature = rt.armature(id).unwrap();
    assert_approx(
        armature.animation().state(state).unwrap().current_time(),
        0.4,
    );
    assert_approx(bone_x(&rt, id, 1), 9.6);
}
