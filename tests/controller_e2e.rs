use std::f32::consts::PI;

use glam::{Quat, Vec3};

use stroll::assets::{LoadedModel, StaticProvider};
use stroll::config::StrollConfig;
use stroll::controller::{FrameLoopContext, InputEvent, InputTracker, OverlayStatus};
use stroll::error::AssetError;
use stroll::model::animation::{AnimationClip, Channel, ChannelValues, Interpolation};
use stroll::model::scene_graph::{MeshData, Node, NodeTransform, Primitive, SceneGraph};

const DT: f32 = 1.0 / 60.0;

/// One hip node with a triangle and a "Walk" clip swinging it around Y.
fn walking_model() -> LoadedModel {
    let scene = SceneGraph {
        nodes: vec![Node {
            name: Some("hips".into()),
            rest: NodeTransform::IDENTITY,
            mesh: Some(0),
            ..Default::default()
        }],
        roots: vec![0],
        meshes: vec![MeshData {
            name: Some("body".into()),
            primitives: vec![Primitive {
                positions: vec![[0.0, 0.0, 0.0], [0.5, 0.0, 0.0], [0.0, 1.8, 0.0]],
                color: [0.8, 0.6, 0.4, 1.0],
                ..Default::default()
            }],
        }],
        skins: vec![],
    };
    let swing = Channel {
        node: 0,
        times: vec![0.0, 0.5, 1.0],
        values: ChannelValues::Rotation(vec![
            Quat::IDENTITY,
            Quat::from_rotation_y(0.3),
            Quat::IDENTITY,
        ]),
        interpolation: Interpolation::Linear,
    };
    LoadedModel {
        scene,
        clips: vec![
            AnimationClip::new("Idle", vec![]),
            AnimationClip::new("Walk", vec![swing]),
        ],
    }
}

fn context(outcome: Result<LoadedModel, AssetError>) -> FrameLoopContext {
    let config = StrollConfig::default();
    let input = InputTracker::new(config.keys.clone());
    FrameLoopContext::new(config, input, Box::new(StaticProvider::new(outcome)), 1280, 720)
}

#[test]
fn one_second_of_forward_walks_two_and_a_half_units() {
    let mut ctx = context(Ok(walking_model()));
    ctx.input.handle(&InputEvent::KeyDown("W".into()));

    for _ in 0..60 {
        ctx.update(DT);
    }

    assert_eq!(ctx.status(), OverlayStatus::Ready);
    let rig = ctx.rig().expect("character mounted");
    let p = rig.transform.position;
    assert!(p.distance(Vec3::new(0.0, 1.0, -2.5)) < 1e-3, "ended at {p}");

    let facing = rig.transform.facing;
    assert!(facing > 0.0 && facing < PI, "facing {facing}");
    assert!(facing < PI - facing, "facing {facing} should be nearer 0 than pi");

    let model = rig.model.as_ref().unwrap();
    assert_eq!(model.walk_clip.as_deref(), Some("Walk"));
    assert!(!model.player.is_paused());
    assert!((model.player.time() - 1.0).abs() < 1e-3 || model.player.time() < 1e-3);

    // camera target trails the character's head height
    let target = ctx.orbit.target();
    assert!(target.z < 0.0 && target.z > -2.5);
    assert!(target.y > 1.0 && target.y < 2.0);
}

#[test]
fn releasing_keys_freezes_the_walk_cycle() {
    let mut ctx = context(Ok(walking_model()));
    ctx.input.handle(&InputEvent::KeyDown("d".into()));
    for _ in 0..10 {
        ctx.update(DT);
    }
    ctx.input.handle(&InputEvent::KeyUp("d".into()));
    ctx.update(DT);

    let rig = ctx.rig().unwrap();
    let model = rig.model.as_ref().unwrap();
    let frozen_at = model.player.time();
    assert!(model.player.is_paused());

    let x = rig.transform.position.x;
    ctx.update(DT);
    let rig = ctx.rig().unwrap();
    assert_eq!(rig.transform.position.x, x);
    assert_eq!(rig.model.as_ref().unwrap().player.time(), frozen_at);
}

#[test]
fn losing_focus_stops_the_character() {
    let mut ctx = context(Ok(walking_model()));
    ctx.input.handle(&InputEvent::KeyDown("a".into()));
    ctx.input.handle(&InputEvent::KeyDown("shift".into()));
    ctx.update(DT);
    ctx.input.handle(&InputEvent::FocusLost);
    let x = ctx.rig().unwrap().transform.position.x;
    assert!((x + 5.0 * DT).abs() < 1e-5);

    ctx.update(DT);
    assert_eq!(ctx.rig().unwrap().transform.position.x, x);
}

#[test]
fn unresolvable_model_degrades_and_ignores_input() {
    let mut ctx = context(Err(AssetError::Http { status: 404, url: "models/character.glb".into() }));
    ctx.input.handle(&InputEvent::KeyDown("w".into()));
    for _ in 0..30 {
        ctx.update(DT);
    }

    assert!(matches!(ctx.status(), OverlayStatus::Degraded(reason) if reason.contains("404")));
    let rig = ctx.rig().unwrap();
    assert_eq!(rig.transform.position, Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(rig.transform.facing, PI);
    assert_eq!(ctx.orbit.target(), Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(ctx.character_mesh().vertices.len(), 24);
}
