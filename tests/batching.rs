use std::collections::HashMap;

use drawpipe::driver::{BufferTarget, DriverCall, UniformData};
use drawpipe::{
    AttributeSource, Context, ContextConfig, DrawDescriptor, DrawError, PropValue, RecordingDriver,
    ShapedData, UniformSource,
};

const VERT: &str = "\
attribute vec2 position;
void main() { gl_Position = vec4(position, 0.0, 1.0); }
";

const TINT_FRAG: &str = "\
uniform vec4 tint;
void main() { gl_FragColor = tint; }
";

const PLAIN_FRAG: &str = "void main() { gl_FragColor = vec4(1.0); }";

fn context() -> Context<RecordingDriver> {
    Context::new(RecordingDriver::new(), ContextConfig::default())
}

fn tinted_descriptor() -> DrawDescriptor {
    DrawDescriptor::new(VERT, TINT_FRAG)
        .attribute(
            "position",
            AttributeSource::data(vec![[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        )
        .uniform("tint", UniformSource::prop("tint"))
        .count(3)
}

fn vec4_uploads(driver: &RecordingDriver) -> Vec<[f32; 4]> {
    driver
        .calls()
        .iter()
        .filter_map(|call| match call {
            DriverCall::SetUniform {
                data: UniformData::Vec4(value),
                ..
            } => Some(*value),
            _ => None,
        })
        .collect()
}

#[test]
fn batch_uploads_one_value_per_element_in_order() {
    let mut ctx = context();
    let cmd = ctx.compile(tinted_descriptor()).unwrap();
    ctx.driver_mut().clear_calls();

    let elements = vec![
        HashMap::from([("tint", PropValue::from([1.0f32, 0.0, 0.0, 1.0]))]),
        HashMap::from([("tint", PropValue::from([0.0f32, 1.0, 0.0, 1.0]))]),
        HashMap::from([("tint", PropValue::from([0.0f32, 0.0, 1.0, 1.0]))]),
    ];
    cmd.batch(&mut ctx, &elements).unwrap();

    assert_eq!(
        vec4_uploads(ctx.driver()),
        vec![
            [1.0, 0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
        ]
    );
    assert_eq!(ctx.driver().draw_count(), 3);
    assert_eq!(ctx.ticks(), 3);
}

#[test]
fn equal_prop_values_hit_the_upload_cache() {
    let mut ctx = context();
    let cmd = ctx.compile(tinted_descriptor()).unwrap();
    ctx.driver_mut().clear_calls();

    let elements = vec![
        HashMap::from([("tint", PropValue::from([0.5f32, 0.5, 0.5, 1.0]))]),
        HashMap::from([("tint", PropValue::from([0.5f32, 0.5, 0.5, 1.0]))]),
    ];
    cmd.batch(&mut ctx, &elements).unwrap();

    assert_eq!(vec4_uploads(ctx.driver()).len(), 1);
    assert_eq!(ctx.driver().draw_count(), 2);
}

#[test]
fn fallback_covers_elements_without_the_key() {
    let mut ctx = context();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, TINT_FRAG)
                .attribute(
                    "position",
                    AttributeSource::data(vec![[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]]),
                )
                .uniform("tint", UniformSource::prop_or("tint", [0.0f32, 0.0, 0.0, 1.0]))
                .count(3),
        )
        .unwrap();
    ctx.driver_mut().clear_calls();

    let elements: Vec<HashMap<&str, PropValue>> = vec![
        HashMap::from([("tint", PropValue::from([1.0f32, 1.0, 1.0, 1.0]))]),
        HashMap::new(),
    ];
    cmd.batch(&mut ctx, &elements).unwrap();

    assert_eq!(
        vec4_uploads(ctx.driver()),
        vec![[1.0, 1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0]]
    );
}

#[test]
fn missing_prop_without_fallback_fails_the_batch() {
    let mut ctx = context();
    let cmd = ctx.compile(tinted_descriptor()).unwrap();

    let elements: Vec<HashMap<&str, PropValue>> = vec![HashMap::new()];
    let result = cmd.batch(&mut ctx, &elements);
    assert!(matches!(result, Err(DrawError::MissingProp(key)) if key == "tint"));
}

#[test]
fn plain_draw_cannot_satisfy_a_prop_record() {
    let mut ctx = context();
    let cmd = ctx.compile(tinted_descriptor()).unwrap();
    let result = cmd.draw(&mut ctx);
    assert!(matches!(result, Err(DrawError::MissingProp(key)) if key == "tint"));
}

#[test]
fn prop_attribute_data_streams_through_one_recycled_buffer() {
    let mut ctx = context();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, PLAIN_FRAG)
                .attribute("position", AttributeSource::prop("corners"))
                .count(3),
        )
        .unwrap();
    ctx.driver_mut().clear_calls();

    let element =
        |s: f32| HashMap::from([("corners", PropValue::from(ShapedData::from(vec![[0.0f32, 0.0], [s, 0.0], [0.0, s]])))]);
    let elements = vec![element(1.0), element(2.0), element(3.0)];
    cmd.batch(&mut ctx, &elements).unwrap();

    let created = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::CreateBuffer(_)));
    assert_eq!(created, 1);
    let initial_fills = ctx.driver().count_matching(|call| {
        matches!(
            call,
            DriverCall::BufferData {
                target: BufferTarget::Array,
                ..
            }
        )
    });
    assert_eq!(initial_fills, 1);
    let refills = ctx.driver().count_matching(|call| {
        matches!(
            call,
            DriverCall::BufferSubData {
                target: BufferTarget::Array,
                ..
            }
        )
    });
    assert_eq!(refills, 2);
    // Raw buffer and layout never change, so the pointer is set up once.
    let pointers = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::AttributePointer { .. }));
    assert_eq!(pointers, 1);
    assert_eq!(ctx.driver().draw_count(), 3);
}

#[test]
fn prop_attribute_accepts_existing_buffers() {
    let mut ctx = context();
    let quad = ctx
        .buffer(
            vec![[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]],
            Default::default(),
        )
        .unwrap();
    let tri = ctx
        .buffer(
            vec![[0.0f32, 0.0], [2.0, 0.0], [0.0, 2.0]],
            Default::default(),
        )
        .unwrap();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, PLAIN_FRAG)
                .attribute("position", AttributeSource::prop("corners"))
                .count(3),
        )
        .unwrap();
    ctx.driver_mut().clear_calls();

    let elements = vec![
        HashMap::from([("corners", PropValue::from(quad))]),
        HashMap::from([("corners", PropValue::from(tri))]),
    ];
    cmd.batch(&mut ctx, &elements).unwrap();

    let pointers = ctx
        .driver()
        .count_matching(|call| matches!(call, DriverCall::AttributePointer { .. }));
    assert_eq!(pointers, 2);
    assert_eq!(ctx.driver().draw_count(), 2);
}

#[test]
fn uniform_prop_value_for_an_attribute_is_a_mismatch() {
    let mut ctx = context();
    let cmd = ctx
        .compile(
            DrawDescriptor::new(VERT, PLAIN_FRAG)
                .attribute("position", AttributeSource::prop("corners"))
                .count(3),
        )
        .unwrap();

    let elements = vec![HashMap::from([("corners", PropValue::from(1.0f32))])];
    let result = cmd.batch(&mut ctx, &elements);
    assert!(matches!(
        result,
        Err(DrawError::ValueMismatch {
            kind: "attribute",
            ..
        })
    ));
}
