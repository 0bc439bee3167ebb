use drawpipe::caps::DeviceLimits;
use drawpipe::driver::{BufferTarget, DriverCall, IndexWidth, Primitive};
use drawpipe::{
    AttributeSource, Capabilities, Capability, CompileError, Context, ContextConfig,
    DrawDescriptor, DrawError, RecordingDriver, TextureData, TextureOptions, UniformSource,
    VaoAttribute, VaoOptions,
};

const VERT: &str = "\
attribute vec2 position;
void main() { gl_Position = vec4(position, 0.0, 1.0); }
";

const FRAG: &str = "void main() { gl_FragColor = vec4(1.0); }";

fn context() -> Context<RecordingDriver> {
    Context::new(RecordingDriver::new(), ContextConfig::default())
}

fn triangle_positions() -> Vec<[f32; 2]> {
    vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
}

#[test]
fn wide_indices_promote_to_u32() {
    let mut ctx = context();
    let indices: Vec<u32> = (0..70_000).collect();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, FRAG)
                .attribute("position", AttributeSource::data(triangle_positions()))
                .elements(drawpipe::IndexData::Flat(indices)),
        )
        .unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();

    let dispatched = ctx.driver().calls().iter().any(|call| {
        matches!(
            call,
            DriverCall::DrawElements {
                primitive: Primitive::Points,
                count: 70_000,
                width: IndexWidth::U32,
                byte_offset: 0,
            }
        )
    });
    assert!(dispatched);
}

#[test]
fn wide_indices_need_the_capability() {
    let driver =
        RecordingDriver::with_capabilities(Capabilities::all().without(Capability::WideElementIndex));
    let mut ctx = Context::new(driver, ContextConfig::default());
    let indices: Vec<u32> = (0..70_000).collect();
    let result = ctx.elements(indices);
    assert!(matches!(
        result,
        Err(CompileError::WideIndexUnsupported(69_999))
    ));
}

#[test]
fn narrow_indices_upload_as_u16() {
    let mut ctx = context();
    ctx.driver_mut().clear_calls();
    ctx.elements(vec![[0u32, 1, 2]]).unwrap();

    let uploaded = ctx.driver().calls().iter().any(|call| {
        matches!(
            call,
            DriverCall::BufferData {
                target: BufferTarget::ElementArray,
                len: 6,
                ..
            }
        )
    });
    assert!(uploaded);
}

#[test]
fn sampler_uniform_pins_a_unit_and_stays_pinned() {
    let mut ctx = context();
    let texture = ctx
        .texture_2d(8, 8, &TextureData::Pixels(vec![255; 8 * 8 * 4]), TextureOptions::default())
        .unwrap();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(
                VERT,
                "uniform sampler2D tex;\nvoid main() { gl_FragColor = texture2D(tex, vec2(0.5)); }",
            )
            .attribute("position", AttributeSource::data(triangle_positions()))
            .uniform("tex", UniformSource::value(texture))
            .count(3),
        )
        .unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();

    let activations: Vec<_> = ctx
        .driver()
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::ActiveTexture(unit) => Some(*unit),
            _ => None,
        })
        .collect();
    assert_eq!(activations, vec![0]);

    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();
    assert_eq!(ctx.driver().state_change_count(), 0);
}

#[test]
fn pinned_units_exhaust_instead_of_evicting() {
    let driver = RecordingDriver::new().with_limits(DeviceLimits {
        max_combined_texture_units: 1,
        ..DeviceLimits::default()
    });
    let mut ctx = Context::new(driver, ContextConfig::default());
    let first = ctx
        .texture_2d(8, 8, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let second = ctx
        .texture_2d(8, 8, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(
                VERT,
                "uniform sampler2D base;\nuniform sampler2D detail;\nvoid main() { gl_FragColor = vec4(1.0); }",
            )
            .attribute("position", AttributeSource::data(triangle_positions()))
            .uniform("base", UniformSource::value(first))
            .uniform("detail", UniformSource::value(second))
            .count(3),
        )
        .unwrap();

    let result = cmd.draw(&mut ctx);
    assert!(matches!(result, Err(DrawError::TextureUnitsExhausted(1))));
}

#[test]
fn destroyed_handles_go_stale() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    ctx.destroy_buffer(buffer).unwrap();
    assert!(matches!(
        ctx.destroy_buffer(buffer),
        Err(CompileError::StaleHandle { kind: "buffer" })
    ));

    let result = ctx.compile(
        DrawDescriptor::new(VERT, FRAG)
            .attribute("position", AttributeSource::buffer(buffer))
            .count(3),
    );
    assert!(matches!(
        result,
        Err(CompileError::StaleHandle { kind: "buffer" })
    ));
}

#[test]
fn stats_track_live_resources() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let elements = ctx.elements(vec![[0u32, 1, 2]]).unwrap();
    let texture = ctx
        .texture_2d(8, 8, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let stats = ctx.stats();
    assert_eq!(stats.buffers, 1);
    assert_eq!(stats.elements, 1);
    assert_eq!(stats.textures, 1);

    ctx.destroy_buffer(buffer).unwrap();
    ctx.destroy_elements(elements).unwrap();
    ctx.destroy_texture(texture).unwrap();
    let stats = ctx.stats();
    assert_eq!(stats.buffers, 0);
    assert_eq!(stats.elements, 0);
    assert_eq!(stats.textures, 0);
}

#[test]
fn buffer_writes_are_bounds_checked() {
    let mut ctx = context();
    let buffer = ctx
        .buffer(vec![1.0f32, 2.0, 3.0], Default::default())
        .unwrap();

    ctx.buffer_write(buffer, vec![9.0f32], 4).unwrap();
    let updated = ctx.driver().calls().iter().any(|call| {
        matches!(
            call,
            DriverCall::BufferSubData {
                target: BufferTarget::Array,
                offset: 4,
                len: 4,
            }
        )
    });
    assert!(updated);

    let result = ctx.buffer_write(buffer, vec![9.0f32, 9.0], 8);
    assert!(matches!(
        result,
        Err(CompileError::WriteOutOfBounds {
            offset: 8,
            len: 8,
            capacity: 12,
        })
    ));
}

#[test]
fn vao_pipelines_bind_one_object() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let vao = ctx
        .vao(&VaoOptions {
            attributes: vec![VaoAttribute::new(buffer)],
            count: Some(3),
            ..Default::default()
        })
        .unwrap();
    let cmd = ctx
        .compile(DrawDescriptor::new(VERT, FRAG).vao(vao))
        .unwrap();
    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();

    let binds = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::BindVertexArray(Some(_))));
    assert_eq!(binds, 1);
    let pointers = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::AttributePointer { .. }));
    assert_eq!(pointers, 0);
    assert_eq!(ctx.driver().draw_count(), 1);

    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();
    assert_eq!(ctx.driver().state_change_count(), 0);
}

#[test]
fn vao_must_cover_every_active_attribute() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let vao = ctx
        .vao(&VaoOptions {
            attributes: vec![VaoAttribute::new(buffer)],
            count: Some(3),
            ..Default::default()
        })
        .unwrap();

    let result = ctx.compile(
        DrawDescriptor::new(
            "attribute vec2 position;\nattribute vec3 normal;\nvoid main() { gl_Position = vec4(position, 0.0, 1.0); }",
            FRAG,
        )
        .vao(vao),
    );
    assert!(matches!(
        result,
        Err(CompileError::MissingRecord {
            kind: "attribute",
            ..
        })
    ));
}

#[test]
fn vao_pipelines_rebind_after_another_vao_is_created() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let vao = ctx
        .vao(&VaoOptions {
            attributes: vec![VaoAttribute::new(buffer)],
            count: Some(3),
            ..Default::default()
        })
        .unwrap();
    let cmd = ctx
        .compile(DrawDescriptor::new(VERT, FRAG).vao(vao))
        .unwrap();
    cmd.draw(&mut ctx).unwrap();

    // Building another vao moves the driver off the pipeline's vao.
    let other = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    ctx.vao(&VaoOptions {
        attributes: vec![VaoAttribute::new(other)],
        count: Some(3),
        ..Default::default()
    })
    .unwrap();

    ctx.driver_mut().clear_calls();
    cmd.draw(&mut ctx).unwrap();
    let rebinds = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::BindVertexArray(Some(_))));
    assert_eq!(rebinds, 1);
}

#[test]
fn vao_conflicts_with_a_separate_attribute_section() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let vao = ctx
        .vao(&VaoOptions {
            attributes: vec![VaoAttribute::new(buffer)],
            count: Some(3),
            ..Default::default()
        })
        .unwrap();

    let result = ctx.compile(
        DrawDescriptor::new(VERT, FRAG)
            .attribute("position", AttributeSource::data(triangle_positions()))
            .vao(vao),
    );
    assert!(matches!(result, Err(CompileError::VaoConflict("attributes"))));
}

#[test]
fn vao_conflicts_with_a_separate_element_section() {
    let mut ctx = context();
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let vao = ctx
        .vao(&VaoOptions {
            attributes: vec![VaoAttribute::new(buffer)],
            count: Some(3),
            ..Default::default()
        })
        .unwrap();

    let result = ctx.compile(
        DrawDescriptor::new(VERT, FRAG)
            .vao(vao)
            .elements(drawpipe::IndexData::Triples(vec![[0, 1, 2]])),
    );
    assert!(matches!(result, Err(CompileError::VaoConflict("elements"))));
}

#[test]
fn dispose_deletes_every_driver_object() {
    let mut ctx = context();
    let _texture = ctx
        .texture_2d(8, 8, &TextureData::Blank, TextureOptions::default())
        .unwrap();
    let _cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, FRAG)
                .attribute("position", AttributeSource::data(triangle_positions()))
                .count(3),
        )
        .unwrap();

    let driver = ctx.dispose();
    assert_eq!(
        driver.count_matching(|c| matches!(c, DriverCall::DeleteProgram(_))),
        1
    );
    assert_eq!(
        driver.count_matching(|c| matches!(c, DriverCall::DeleteShader(_))),
        2
    );
    assert_eq!(
        driver.count_matching(|c| matches!(c, DriverCall::DeleteTexture(_))),
        1
    );
    assert!(driver.count_matching(|c| matches!(c, DriverCall::DeleteBuffer(_))) >= 1);
}

#[test]
fn vao_needs_the_capability() {
    let driver = RecordingDriver::with_capabilities(
        Capabilities::all().without(Capability::VertexArrayObjects),
    );
    let mut ctx = Context::new(driver, ContextConfig::default());
    let buffer = ctx.buffer(triangle_positions(), Default::default()).unwrap();
    let result = ctx.vao(&VaoOptions {
        attributes: vec![VaoAttribute::new(buffer)],
        ..Default::default()
    });
    assert!(matches!(result, Err(CompileError::VaoUnsupported)));
}
