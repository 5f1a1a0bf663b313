use super::constraint::Constraint;
use super::context::{ArmatureId, Runtime};
use super::fixtures::{
    ArmatureFixture, assert_approx, curve_key, eased_key, image_display, key, stepped_key,
};
use crate::{DragonBonesData, Transform, TweenType};
use std::f32::consts::PI;
use std::sync::Arc;

fn play(data: &Arc<DragonBonesData>, animation: &str) -> (Runtime, ArmatureId) {
    let mut rt = Runtime::new();
    let id = rt.build_armature(data, "hero", None).unwrap();
    rt.armature_mut(id)
        .unwrap()
        .play(Some(animation), -1)
        .unwrap();
    (rt, id)
}

fn arm_pose(rt: &Runtime, id: ArmatureId) -> Transform {
    rt.armature(id).unwrap().bones()[1].animation_pose
}

/// Hero with one animated arm; `build` adds the timelines.
fn armed_hero(
    frame_count: u32,
    play_times: u32,
    build: impl FnOnce(&mut ArmatureFixture),
) -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    fixture.bone("arm", Some("root"));
    fixture.animation("move", frame_count, play_times);
    build(&mut fixture);
    fixture.build()
}

#[test]
fn translate_timeline_interpolates_between_keys() {
    let data = armed_hero(24, 0, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[key(0, &[0.0, 0.0]), key(12, &[10.0, -20.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let pose = arm_pose(&rt, id);
    assert_approx(pose.x, 5.0);
    assert_approx(pose.y, -10.0);
}

#[test]
fn looping_last_key_tweens_back_to_the_first() {
    let data = armed_hero(24, 0, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[key(0, &[0.0, 0.0]), key(12, &[10.0, -20.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.75);
    let pose = arm_pose(&rt, id);
    assert_approx(pose.x, 5.0);
    assert_approx(pose.y, -10.0);

    // Same phase one loop later.
    rt.advance_time(1.0);
    let pose = arm_pose(&rt, id);
    assert_approx(pose.x, 5.0);
}

#[test]
fn single_play_holds_the_last_key() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[key(0, &[0.0, 0.0]), key(12, &[10.0, -20.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.75);
    assert_approx(arm_pose(&rt, id).x, 10.0);

    rt.advance_time(0.75);
    let armature = rt.armature(id).unwrap();
    assert!(armature.animation().is_completed());
    assert_approx(arm_pose(&rt, id).x, 10.0);
}

#[test]
fn stepped_keys_hold_until_the_next_key() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[stepped_key(0, &[0.0, 0.0]), key(12, &[10.0, 0.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    assert_approx(arm_pose(&rt, id).x, 0.0);

    rt.advance_time(0.3);
    assert_approx(arm_pose(&rt, id).x, 10.0);
}

#[test]
fn quad_easing_bends_the_tween() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[
                eased_key(0, TweenType::QuadIn, 1.0, &[0.0, 0.0]),
                key(12, &[10.0, 0.0]),
            ],
        );
    });
    let (mut rt, id) = play(&data, "move");

    // Halfway through the tween a full quadratic ease-in sits at 0.25.
    rt.advance_time(0.25);
    assert_approx(arm_pose(&rt, id).x, 2.5);
}

#[test]
fn curve_samples_shape_the_tween() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[curve_key(0, &[2500], &[0.0, 0.0]), key(12, &[10.0, 0.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    // One interior sample at 0.25 with implied end points 0 and 1; the
    // halfway progress lands exactly on the sample.
    rt.advance_time(0.25);
    assert_approx(arm_pose(&rt, id).x, 2.5);
}

#[test]
fn uneven_keys_resolve_through_the_index_table() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[
                key(0, &[0.0, 0.0]),
                key(6, &[60.0, 0.0]),
                key(18, &[180.0, 0.0]),
            ],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.5);
    assert_approx(arm_pose(&rt, id).x, 120.0);

    rt.advance_time(0.4);
    assert_approx(arm_pose(&rt, id).x, 180.0);
}

#[test]
fn rotate_timeline_wraps_the_short_way_on_loop() {
    let data = armed_hero(24, 0, |fixture| {
        fixture.rotate_timeline(
            "arm",
            &[key(0, &[0.0, 0.0]), key(12, &[1.5 * PI, 0.0])],
        );
    });
    let (mut rt, id) = play(&data, "move");

    // Between authored keys the rotation takes the authored long way.
    rt.advance_time(0.25);
    assert_approx(arm_pose(&rt, id).rotation, 0.75 * PI);

    // Wrapping back to the first key goes the short way, through a full
    // turn instead of unwinding.
    rt.advance_time(0.5);
    assert_approx(arm_pose(&rt, id).rotation, 1.75 * PI);
}

#[test]
fn scale_timeline_blends_around_identity() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.scale_timeline("arm", &[key(0, &[1.0, 1.0]), key(12, &[2.0, 0.5])]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let pose = arm_pose(&rt, id);
    assert_approx(pose.scale_x, 1.5);
    assert_approx(pose.scale_y, 0.75);
}

#[test]
fn whole_transform_timeline_drives_every_channel() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.bone_all_timeline(
            "arm",
            &[
                key(0, &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0]),
                key(12, &[10.0, 20.0, 0.5 * PI, 0.0, 2.0, 2.0]),
            ],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let pose = arm_pose(&rt, id);
    assert_approx(pose.x, 5.0);
    assert_approx(pose.y, 10.0);
    assert_approx(pose.rotation, 0.25 * PI);
    assert_approx(pose.scale_x, 1.5);
    assert_approx(pose.scale_y, 1.5);
}

#[test]
fn single_key_timelines_sample_once() {
    let data = armed_hero(24, 0, |fixture| {
        fixture.translate_timeline("arm", &[key(0, &[5.0, 0.0])]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.3);
    assert_approx(arm_pose(&rt, id).x, 5.0);

    rt.advance_time(0.4);
    assert_approx(arm_pose(&rt, id).x, 5.0);
}

#[test]
fn bone_alpha_timeline_fades_the_hierarchy() {
    let data = armed_hero(24, 1, |fixture| {
        fixture.bone_alpha_timeline("arm", &[key(0, &[1.0]), key(12, &[0.5])]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    assert_approx(armature.bones()[1].global_alpha(), 0.75);
}

fn dressed_hero(
    frame_count: u32,
    play_times: u32,
    build: impl FnOnce(&mut ArmatureFixture, usize),
) -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    let body = fixture.slot("body", "root");
    fixture.displays(body, vec![image_display("a"), image_display("b")]);
    fixture.animation("move", frame_count, play_times);
    build(&mut fixture, body);
    fixture.build()
}

#[test]
fn slot_alpha_timeline_fades_the_slot() {
    let data = dressed_hero(24, 1, |fixture, _| {
        fixture.slot_alpha_timeline("body", &[key(0, &[1.0]), key(12, &[0.0])]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    assert_approx(armature.slots()[0].global_alpha(), 0.5);
}

#[test]
fn z_index_timeline_rounds_to_whole_layers() {
    let data = dressed_hero(24, 1, |fixture, _| {
        fixture.slot_zindex_timeline("body", &[key(0, &[0.0]), key(12, &[10.0])]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    assert_eq!(armature.slots()[0].z_index(), 5);
}

#[test]
fn color_timeline_tweens_the_whole_record() {
    let data = dressed_hero(24, 1, |fixture, _| {
        fixture.slot_color_timeline(
            "body",
            &[
                key(0, &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
                key(12, &[0.5, 1.0, 1.0, 1.0, 0.0, -100.0, 0.0, 0.0]),
            ],
        );
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    let color = armature.slots()[0].color_transform();
    assert_approx(color.alpha_multiplier, 0.75);
    assert_approx(color.red_offset, -50.0);
    assert_approx(color.red_multiplier, 1.0);
}

#[test]
fn display_timeline_switches_the_shown_frame() {
    let data = dressed_hero(24, 1, |fixture, _| {
        fixture.slot_display_timeline("body", &[(0, 0), (6, 1), (18, -1)]);
    });
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.35);
    assert_eq!(rt.armature(id).unwrap().slots()[0].display_index(), 1);

    rt.advance_time(0.45);
    let armature = rt.armature(id).unwrap();
    assert_eq!(armature.slots()[0].display_index(), -1);
    assert!(armature.slots()[0].display().is_none());
}

#[test]
fn z_order_timeline_permutes_and_restores() {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    for name in ["back", "mid", "front"] {
        let slot = fixture.slot(name, "root");
        fixture.displays(slot, vec![image_display(name)]);
    }
    fixture.animation("move", 24, 1);
    fixture.z_order_timeline(&[(0, vec![2, 1, 0]), (12, vec![])]);
    let data = fixture.build();
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    assert_eq!(rt.armature(id).unwrap().sorted_slot_indices(), &[2, 1, 0]);

    rt.advance_time(0.3);
    assert_eq!(rt.armature(id).unwrap().sorted_slot_indices(), &[0, 1, 2]);
}

#[test]
fn deform_timeline_moves_only_the_keyed_window() {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    let body = fixture.slot("body", "root");
    let mesh = fixture.mesh_display(
        "cloth",
        &[0.0, 0.0, 10.0, 0.0, 0.0, 10.0],
        &[0, 1, 2],
    );
    let geometry_offset = mesh.as_ref().unwrap().geometry().unwrap().offset;
    fixture.displays(body, vec![mesh]);
    fixture.animation("move", 24, 1);
    fixture.slot_deform_timeline(
        "body",
        geometry_offset,
        2,
        &[0.0, 0.0, 0.0, 0.0],
        &[key(0, &[0.0, 0.0]), key(12, &[4.0, 8.0])],
    );
    let data = fixture.build();
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    let deform = &armature.slots()[0].display_frame_at(0).unwrap().deform;
    assert_eq!(deform.len(), 6);
    assert_approx(deform[0], 0.0);
    assert_approx(deform[2], 2.0);
    assert_approx(deform[3], 4.0);
    assert_approx(deform[5], 0.0);
}

#[test]
fn ik_timeline_steps_the_bend_and_tweens_the_weight() {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("hero");
    fixture.bone("root", None);
    fixture.bone("upper", Some("root"));
    fixture.bone("lower", Some("upper"));
    fixture.bone("target", Some("root"));
    fixture.ik("aim", "upper", Some("lower"), "target", true, 1.0);
    fixture.animation("move", 24, 1);
    fixture.ik_timeline(
        "aim",
        &[key(0, &[1.0, 1.0]), key(12, &[0.0, 0.0])],
    );
    let data = fixture.build();
    let (mut rt, id) = play(&data, "move");

    rt.advance_time(0.25);
    let armature = rt.armature(id).unwrap();
    let Constraint::Ik(state) = &armature.constraints[0] else {
        panic!("expected an ik constraint");
    };
    // The bend flag holds its key while the weight interpolates.
    assert!(state.bend_positive);
    assert_approx(state.weight, 0.5);
}

#[test]
fn retimed_timeline_runs_at_its_own_pace() {
    let data = armed_hero(24, 0, |fixture| {
        fixture.translate_timeline(
            "arm",
            &[key(0, &[0.0, 0.0]), key(12, &[10.0, 0.0])],
        );
        fixture.retime(0.5, 0.0);
    });
    let (mut rt, id) = play(&data, "move");

    // The state sits at 0.5s but the half pace timeline only reached 0.25s.
    rt.advance_time(0.5);
    assert_approx(arm_pose(&rt, id).x, 5.0);
}
