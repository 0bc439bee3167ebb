use drawpipe::driver::{DriverCall, TexImageTarget};
use drawpipe::{
    AttributeSource, ClearPolicy, ColorSource, CompileError, Context, ContextConfig,
    DrawDescriptor, FramebufferOptions, RecordingDriver, TargetSource, TextureData, TextureOptions,
};

const VERT: &str = "\
attribute vec2 position;
void main() { gl_Position = vec4(position, 0.0, 1.0); }
";

const FRAG: &str = "void main() { gl_FragColor = vec4(1.0); }";

fn context() -> Context<RecordingDriver> {
    Context::new(RecordingDriver::new(), ContextConfig::default())
}

fn quad_descriptor() -> DrawDescriptor {
    DrawDescriptor::new(VERT, FRAG)
        .attribute(
            "position",
            AttributeSource::data(vec![[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        )
        .count(3)
}

fn blank_faces() -> [TextureData; 6] {
    std::array::from_fn(|_| TextureData::Blank)
}

#[test]
fn cube_color_attachment_expands_to_six_framebuffers() {
    let mut ctx = context();
    let cube = ctx
        .texture_cube(16, &blank_faces(), TextureOptions::default())
        .unwrap();
    ctx.driver_mut().clear_calls();

    ctx.framebuffer(&FramebufferOptions {
        colors: vec![ColorSource::Texture(cube)],
        ..Default::default()
    })
    .unwrap();

    let created = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::CreateFramebuffer(_)));
    assert_eq!(created, 6);
    let attached_faces: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::FramebufferTexture2d { target, .. } => Some(*target),
            _ => None,
        })
        .collect();
    assert_eq!(attached_faces, TexImageTarget::CUBE_FACES.to_vec());
}

#[test]
fn cube_face_target_selects_the_matching_framebuffer() {
    let mut ctx = context();
    let cube = ctx
        .texture_cube(16, &blank_faces(), TextureOptions::default())
        .unwrap();
    ctx.driver_mut().clear_calls();
    let fb = ctx
        .framebuffer(&FramebufferOptions {
            colors: vec![ColorSource::Texture(cube)],
            ..Default::default()
        })
        .unwrap();
    let raws: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::CreateFramebuffer(raw) => Some(*raw),
            _ => None,
        })
        .collect();

    let cmd = ctx
        .compile(quad_descriptor().target(TargetSource::CubeFace {
            framebuffer: fb,
            face: 3,
        }))
        .unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();

    let bound: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::BindFramebuffer(raw) => Some(*raw),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![Some(raws[3])]);
}

#[test]
fn cube_face_out_of_range_is_a_compile_error() {
    let mut ctx = context();
    let cube = ctx
        .texture_cube(16, &blank_faces(), TextureOptions::default())
        .unwrap();
    let fb = ctx
        .framebuffer(&FramebufferOptions {
            colors: vec![ColorSource::Texture(cube)],
            ..Default::default()
        })
        .unwrap();

    let result = ctx.compile(quad_descriptor().target(TargetSource::CubeFace {
        framebuffer: fb,
        face: 6,
    }));
    assert!(matches!(result, Err(CompileError::CubeFaceOutOfRange(6))));
}

#[test]
fn flat_framebuffer_rejects_face_selection() {
    let mut ctx = context();
    let color = ctx
        .texture_2d(64, 64, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let fb = ctx
        .framebuffer(&FramebufferOptions {
            colors: vec![ColorSource::Texture(color)],
            ..Default::default()
        })
        .unwrap();

    let result = ctx.compile(quad_descriptor().target(TargetSource::CubeFace {
        framebuffer: fb,
        face: 1,
    }));
    assert!(matches!(result, Err(CompileError::CubeFaceOutOfRange(1))));
}

#[test]
fn repeat_draws_to_the_same_target_bind_it_once() {
    let mut ctx = context();
    let color = ctx
        .texture_2d(64, 64, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let fb = ctx
        .framebuffer(&FramebufferOptions {
            colors: vec![ColorSource::Texture(color)],
            ..Default::default()
        })
        .unwrap();
    let cmd = ctx
        .compile(quad_descriptor().target(TargetSource::Framebuffer(fb)))
        .unwrap();

    cmd.draw(&mut ctx).unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();

    let binds = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::BindFramebuffer(_)));
    assert_eq!(binds, 0);
}

#[test]
fn screen_draw_after_an_offscreen_draw_restores_the_default_target() {
    let mut ctx = context();
    let color = ctx
        .texture_2d(64, 64, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let fb = ctx
        .framebuffer(&FramebufferOptions {
            colors: vec![ColorSource::Texture(color)],
            ..Default::default()
        })
        .unwrap();
    let offscreen = ctx
        .compile(quad_descriptor().target(TargetSource::Framebuffer(fb)))
        .unwrap();
    let onscreen = ctx.compile(quad_descriptor()).unwrap();

    offscreen.draw(&mut ctx).unwrap();
    ctx.driver_mut().clear_calls();
    onscreen.draw(&mut ctx).unwrap();

    let bound: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::BindFramebuffer(raw) => Some(*raw),
            _ => None,
        })
        .collect();
    assert_eq!(bound, vec![None]);
}

#[test]
fn clear_policy_runs_on_every_invocation() {
    let mut ctx = context();
    let cmd = ctx
        .compile(quad_descriptor().clear(ClearPolicy::color_depth([0.0, 0.0, 0.0, 1.0], 1.0)))
        .unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();
    cmd.draw(&mut ctx).unwrap();

    let clears: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter(|call| matches!(call, DriverCall::Clear { .. }))
        .collect();
    assert_eq!(
        clears,
        vec![
            &DriverCall::Clear {
                color: Some([0.0, 0.0, 0.0, 1.0]),
                depth: Some(1.0),
                stencil: None,
            };
            2
        ]
    );
}

#[test]
fn standalone_clear_targets_the_desired_framebuffer() {
    let mut ctx = context();
    ctx.clear(&ClearPolicy::color([0.1, 0.2, 0.3, 1.0]));
    let calls = ctx.driver().calls();
    assert!(calls
        .iter()
        .any(|call| matches!(call, DriverCall::Clear { .. })));

    ctx.driver_mut().clear_calls();
    ctx.clear(&ClearPolicy::default());
    assert!(ctx.driver().calls().is_empty());
}

#[test]
fn empty_framebuffers_are_rejected() {
    let mut ctx = context();
    let result = ctx.framebuffer(&FramebufferOptions::default());
    assert!(matches!(result, Err(CompileError::EmptyFramebuffer)));
}

#[test]
fn attachment_sizes_must_agree() {
    let mut ctx = context();
    let small = ctx
        .texture_2d(32, 32, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let large = ctx
        .texture_2d(64, 64, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let result = ctx.framebuffer(&FramebufferOptions {
        colors: vec![ColorSource::Texture(small), ColorSource::Texture(large)],
        ..Default::default()
    });
    assert!(matches!(result, Err(CompileError::AttachmentSizeMismatch)));
}
