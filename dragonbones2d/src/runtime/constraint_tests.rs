use super::context::{ArmatureId, Runtime};
use super::fixtures::{ArmatureFixture, assert_approx, key};
use crate::{
    ConstraintData, DragonBonesData, PathConstraintData, PositionMode, RotateMode, SpacingMode,
    Transform,
};
use std::f32::consts::PI;
use std::sync::Arc;

fn start(data: &Arc<DragonBonesData>) -> (Runtime, ArmatureId) {
    let mut rt = Runtime::new();
    let id = rt.build_armature(data, "rig", None).unwrap();
    rt.armature_mut(id).unwrap().play(Some("idle"), -1).unwrap();
    (rt, id)
}

fn at(x: f32, y: f32) -> Transform {
    Transform {
        x,
        y,
        ..Transform::default()
    }
}

/// A needle at the origin aimed at a mark ten units out on both axes.
fn aim_rig(weight: f32) -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    fixture.bone_with("mark", Some("root"), at(10.0, 10.0), 0.0);
    fixture.bone("needle", Some("root"));
    fixture.ik("aim", "needle", None, "mark", true, weight);
    fixture.animation("idle", 24, 0);
    fixture.build()
}

#[test]
fn single_bone_ik_aims_at_the_target() {
    let data = aim_rig(1.0);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);

    let needle = &rt.armature(id).unwrap().bones()[2];
    assert_approx(needle.global.rotation, PI / 4.0);
}

#[test]
fn ik_weight_scales_the_correction() {
    let data = aim_rig(0.5);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);

    let needle = &rt.armature(id).unwrap().bones()[2];
    assert_approx(needle.global.rotation, PI / 8.0);
}

#[test]
fn an_ik_timeline_drives_the_weight() {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    fixture.bone_with("mark", Some("root"), at(10.0, 10.0), 0.0);
    fixture.bone("needle", Some("root"));
    fixture.ik("aim", "needle", None, "mark", true, 0.0);
    fixture.animation("raise", 24, 0);
    fixture.ik_timeline("aim", &[key(0, &[1.0, 0.0]), key(24, &[1.0, 1.0])]);
    let data = fixture.build();

    let mut rt = Runtime::new();
    let id = rt.build_armature(&data, "rig", None).unwrap();
    rt.armature_mut(id)
        .unwrap()
        .play(Some("raise"), -1)
        .unwrap();
    rt.advance_time(0.5);

    let needle = &rt.armature(id).unwrap().bones()[2];
    assert_approx(needle.global.rotation, PI / 8.0);
}

/// Upper and lower arm, twenty five units each, reaching for a mark.
fn arm_rig(bend_positive: bool, target_x: f32, target_y: f32) -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    fixture.bone_with("mark", Some("root"), at(target_x, target_y), 0.0);
    fixture.bone_with("upper", Some("root"), Transform::default(), 25.0);
    fixture.bone_with("lower", Some("upper"), at(25.0, 0.0), 25.0);
    fixture.ik("reach", "upper", Some("lower"), "mark", bend_positive, 1.0);
    fixture.animation("idle", 24, 0);
    fixture.build()
}

#[test]
fn two_bone_ik_reaches_the_target() {
    let data = arm_rig(true, 40.0, 0.0);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    let upper = &armature.bones()[2];
    let lower = &armature.bones()[3];

    // Isosceles triangle: the elbow drops below the line to the mark.
    assert_approx(upper.global.rotation, -0.6435011);
    assert_approx(lower.global.x, 20.0);
    assert_approx(lower.global.y, -15.0);
    assert_approx(lower.global.rotation, 0.6435011);

    let matrix = &lower.global_transform_matrix;
    assert_approx(matrix.tx + matrix.a * 25.0, 40.0);
    assert_approx(matrix.ty + matrix.b * 25.0, 0.0);
}

#[test]
fn flipping_bend_positive_mirrors_the_elbow() {
    let data = arm_rig(false, 40.0, 0.0);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    let upper = &armature.bones()[2];
    let lower = &armature.bones()[3];
    assert_approx(upper.global.rotation, 0.6435011);
    assert_approx(lower.global.x, 20.0);
    assert_approx(lower.global.y, 15.0);
    assert_approx(lower.global.rotation, -0.6435011);
}

#[test]
fn an_unreachable_target_straightens_the_chain() {
    let data = arm_rig(true, 0.0, 100.0);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    let upper = &armature.bones()[2];
    let lower = &armature.bones()[3];
    assert_approx(upper.global.rotation, PI / 2.0);
    assert_approx(lower.global.x, 0.0);
    assert_approx(lower.global.y, 25.0);
    assert_approx(lower.global.rotation, PI / 2.0);
}

/// A straight horizontal run from the origin to x = 100, packed the way the
/// exporter writes one open curve: a leading control pair, four on-curve and
/// control points, and a trailing pair.
fn straight_track() -> Vec<f32> {
    vec![
        0.0,
        0.0,
        0.0,
        0.0,
        100.0 / 3.0,
        0.0,
        200.0 / 3.0,
        0.0,
        100.0,
        0.0,
        0.0,
        0.0,
    ]
}

fn chain_constraint(
    path_slot: usize,
    bones: Vec<usize>,
    position: f32,
    spacing: f32,
    rotate_mode: RotateMode,
    rotate_mix: f32,
) -> ConstraintData {
    ConstraintData::Path(PathConstraintData {
        name: "track".to_string(),
        order: 0,
        target: 0,
        root: bones[0],
        path_slot,
        path_display_index: 0,
        bones,
        position_mode: PositionMode::Fixed,
        spacing_mode: SpacingMode::Fixed,
        rotate_mode,
        position,
        spacing,
        rotate_offset: 0.0,
        rotate_mix,
        translate_mix: 1.0,
    })
}

/// Two free bones pinned to a horizontal path slot on the root.
fn track_rig(constant_speed: bool) -> Arc<DragonBonesData> {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    let first = fixture.bone("first", Some("root"));
    let second = fixture.bone("second", Some("root"));
    let track = fixture.slot("track", "root");
    let display = fixture.path_display("track", &straight_track(), &[100.0], false, constant_speed);
    fixture.displays(track, vec![display]);
    fixture.constraint(chain_constraint(
        track,
        vec![first, second],
        10.0,
        30.0,
        RotateMode::Chain,
        0.0,
    ));
    fixture.animation("idle", 24, 0);
    fixture.build()
}

#[test]
fn fixed_position_and_spacing_lay_the_chain_along_the_path() {
    let data = track_rig(false);
    let (mut rt, id) = start(&data);
    // The path slot resolves its display on the first tick; the constraint
    // samples on the next.
    rt.advance_time(0.1);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    assert_approx(armature.bones()[1].global.x, 40.0);
    assert_approx(armature.bones()[1].global.y, 0.0);
    assert_approx(armature.bones()[2].global.x, 70.0);
    assert_approx(armature.bones()[2].global.y, 0.0);
}

#[test]
fn constant_speed_resampling_lands_on_the_same_points() {
    let data = track_rig(true);
    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    assert_approx(armature.bones()[1].global.x, 40.0);
    assert_approx(armature.bones()[2].global.x, 70.0);
}

#[test]
fn tangent_mode_turns_the_bone_along_the_path() {
    let diagonal = vec![
        0.0,
        0.0,
        0.0,
        0.0,
        100.0 / 3.0,
        100.0 / 3.0,
        200.0 / 3.0,
        200.0 / 3.0,
        100.0,
        100.0,
        0.0,
        0.0,
    ];
    let length = 2.0_f32.sqrt() * 100.0;

    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    let rider = fixture.bone("rider", Some("root"));
    let track = fixture.slot("track", "root");
    let display = fixture.path_display("track", &diagonal, &[length], false, false);
    fixture.displays(track, vec![display]);
    fixture.constraint(chain_constraint(
        track,
        vec![rider],
        0.0,
        length / 2.0,
        RotateMode::Tangent,
        1.0,
    ));
    fixture.animation("idle", 24, 0);
    let data = fixture.build();

    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);
    rt.advance_time(0.1);

    let rider = &rt.armature(id).unwrap().bones()[1];
    assert_approx(rider.global.x, 50.0);
    assert_approx(rider.global.y, 50.0);
    assert_approx(rider.global.rotation, PI / 4.0);
}

#[test]
fn a_skinned_path_follows_its_weight_bones() {
    let mut fixture = ArmatureFixture::new("test");
    fixture.begin_armature("rig");
    fixture.bone("root", None);
    let carrier = fixture.bone_with("carrier", Some("root"), at(0.0, 50.0), 0.0);
    let first = fixture.bone("first", Some("root"));
    let second = fixture.bone("second", Some("root"));
    let track = fixture.slot("track", "root");

    // The same horizontal run, authored in the carrier's local space.
    let vertices: Vec<Vec<(usize, f32, f32, f32)>> = vec![
        vec![(0, 1.0, 0.0, 0.0)],
        vec![(0, 1.0, 0.0, 0.0)],
        vec![(0, 1.0, 100.0 / 3.0, 0.0)],
        vec![(0, 1.0, 200.0 / 3.0, 0.0)],
        vec![(0, 1.0, 100.0, 0.0)],
        vec![(0, 1.0, 0.0, 0.0)],
    ];
    let display = fixture.weighted_path_display(
        "track",
        &[carrier],
        &vertices,
        &[100.0],
        false,
        false,
    );
    fixture.displays(track, vec![display]);
    fixture.constraint(chain_constraint(
        track,
        vec![first, second],
        10.0,
        30.0,
        RotateMode::Chain,
        0.0,
    ));
    fixture.animation("idle", 24, 0);
    let data = fixture.build();

    let (mut rt, id) = start(&data);
    rt.advance_time(0.1);
    rt.advance_time(0.1);

    let armature = rt.armature(id).unwrap();
    assert_approx(armature.bones()[2].global.x, 40.0);
    assert_approx(armature.bones()[2].global.y, 50.0);
    assert_approx(armature.bones()[3].global.x, 70.0);
    assert_approx(armature.bones()[3].global.y, 50.0);
}
