use approx::assert_relative_eq;
use engine_core::{Material, MeshId, Vertex, VERTEX_PERMUTATION, matrix_from_rows};
use engine_render::{
    GpuCommand, HEADLESS_SHADER, MeshData, MeshPack, Primitive, RecordingGpu, RenderConfig,
    RenderError, Renderer, TexEnv, TexFilter, Uniform,
};
use glam::{Mat4, Vec3, Vec4};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([40, 40, 40, 255])
        }
    });
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn triangle() -> [Vertex; 3] {
    [
        Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0], [0.0, 0.0, 1.0]),
        Vertex::new([0.5, -0.5, 0.0], [1.0, 0.0], [0.0, 0.0, 1.0]),
        Vertex::new([0.0, 0.5, 0.0], [0.5, 1.0], [0.0, 0.0, 1.0]),
    ]
}

fn renderer() -> Renderer<RecordingGpu> {
    Renderer::new(RecordingGpu::new(), RenderConfig::default(), HEADLESS_SHADER).unwrap()
}

fn mat_uniform(value: Option<Uniform>) -> Mat4 {
    match value {
        Some(Uniform::Mat4(rows)) => matrix_from_rows(rows),
        other => panic!("expected a matrix uniform, got {other:?}"),
    }
}

#[test]
fn init_configures_shared_state() {
    let r = renderer();
    let commands = r.gpu().commands();

    assert!(matches!(commands[0], GpuCommand::LoadProgram(_)));
    assert!(matches!(commands[1], GpuCommand::BindProgram(_)));
    match &commands[2] {
        GpuCommand::SetAttrInfo(attrs) => {
            let layout: Vec<_> = attrs.iter().map(|a| (a.register, a.components)).collect();
            assert_eq!(layout, vec![(0, 3), (1, 2), (2, 3)]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        commands[3],
        GpuCommand::SetTexEnv {
            stage: 0,
            env: TexEnv::ModulateTexture
        }
    );
    assert_eq!(r.gpu().bound_program(), Some(r.program()));
}

#[test]
fn init_fails_on_missing_uniform() {
    let gpu = RecordingGpu::new().without_uniform("lightHalfVec");
    let err = Renderer::new(gpu, RenderConfig::default(), HEADLESS_SHADER).err();
    assert!(matches!(err, Some(RenderError::MissingUniform("lightHalfVec"))));
}

#[test]
fn init_fails_on_bad_shader() {
    let err = Renderer::new(RecordingGpu::new(), RenderConfig::default(), b"not a shader").err();
    assert!(matches!(err, Some(RenderError::ShaderParse(_))));
}

#[test]
fn mesh_ids_are_dense_from_zero() {
    let mut r = renderer();
    let texture = png(2, 2);
    let ids: Vec<MeshId> = (0..12)
        .map(|_| r.register_mesh(&triangle(), &texture, Material::DEFAULT).unwrap())
        .collect();

    for (i, id) in ids.iter().enumerate() {
        assert_eq!(id.index(), i);
    }
    assert_eq!(r.mesh_count(), 12);
    assert_eq!(r.mesh_capacity(), 15);
}

#[test]
fn registration_uploads_a_copy_of_the_vertices() {
    let mut r = renderer();
    let mut vertices = triangle();
    let id = r
        .register_mesh(&vertices, &png(2, 2), Material::DEFAULT)
        .unwrap();
    let expected: Vec<u8> = bytemuck::cast_slice(&vertices).to_vec();
    vertices[0].position = [9.0; 3];

    let mesh = *r.mesh(id).unwrap();
    assert_eq!(mesh.vertex_count, 3);
    assert_eq!(r.gpu().linear_bytes(mesh.vertices), Some(expected.as_slice()));

    let info = r.gpu().buf_info(mesh.buf_info).unwrap();
    assert_eq!(info.buffer, mesh.vertices);
    assert_eq!(info.stride, 32);
    assert_eq!(info.attribute_count, 3);
    assert_eq!(info.permutation, VERTEX_PERMUTATION);

    let texture = r.gpu().texture(mesh.texture.unwrap()).unwrap();
    assert_eq!((texture.width, texture.height), (2, 2));
    assert_eq!(texture.filter, Some((TexFilter::Linear, TexFilter::Nearest)));
}

#[test]
fn empty_vertices_are_a_precondition_violation() {
    let mut r = renderer();
    let err = r
        .register_mesh(&[], &png(1, 1), Material::DEFAULT)
        .unwrap_err();

    match err {
        RenderError::Precondition {
            condition,
            location,
        } => {
            assert!(condition.contains("vertices"));
            assert!(location.file.ends_with("renderer.rs"));
            assert!(location.line > 0);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(r.mesh_count(), 0);
}

#[test]
fn empty_texture_is_a_precondition_violation() {
    let mut r = renderer();
    let err = r
        .register_mesh(&triangle(), &[], Material::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, RenderError::Precondition { .. }));
    assert_eq!(r.mesh_count(), 0);
    assert_eq!(r.gpu().linear_allocated(), 0);
}

#[test]
fn undecodable_texture_registers_nothing() {
    let mut r = renderer();
    let err = r
        .register_mesh(&triangle(), b"garbage", Material::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, RenderError::TextureImport(_)));
    assert_eq!(r.mesh_count(), 0);
}

#[test]
fn failed_allocation_registers_nothing() {
    let mut r = renderer();
    r.gpu_mut().fail_next_alloc();
    let err = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap_err();
    assert!(matches!(err, RenderError::LinearAlloc { bytes: 96 }));
    assert_eq!(r.mesh_count(), 0);

    // the next attempt goes through and still gets id 0
    let id = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();
    assert_eq!(id.index(), 0);
}

#[test]
fn out_of_range_index_is_rejected() {
    let mut r = renderer();
    let err = r
        .register_indexed_mesh(&triangle(), Some(&[0, 1, 3]), None, Material::DEFAULT)
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::IndexOutOfRange {
            index: 3,
            vertex_count: 3
        }
    ));
    assert_eq!(r.mesh_count(), 0);
}

#[test]
fn single_triangle_frame() {
    let mut r = renderer();
    let id = r
        .register_mesh(&triangle(), &png(4, 4), Material::DEFAULT)
        .unwrap();
    r.submit(id, Mat4::IDENTITY).unwrap();
    let stats = r.render().unwrap();

    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.vertices, 3);

    let draws = r.gpu().draws();
    assert_eq!(draws.len(), 1);
    let draw = &draws[0];
    assert_eq!(draw.primitive, Primitive::Triangles);
    assert_eq!((draw.first, draw.count), (0, 3));
    assert_eq!(draw.indices, None);

    let mesh = *r.mesh(id).unwrap();
    assert_eq!(draw.buf_info, Some(mesh.buf_info));
    assert_eq!(draw.texture, mesh.texture);
    assert_eq!(draw.tex_env, Some(TexEnv::ModulateTexture));

    let loc = r.uniform_locations();
    assert_eq!(mat_uniform(draw.uniform(loc.model_view)), Mat4::IDENTITY);
    assert_eq!(
        draw.uniform(loc.material),
        Some(Uniform::Mat4([[0.2, 0.2, 0.2, 0.0]; 4]))
    );
    assert_eq!(
        draw.uniform(loc.light_vec),
        Some(Uniform::Vec4([0.0, 0.0, -1.0, 0.0]))
    );
    assert_eq!(
        draw.uniform(loc.light_half_vec),
        Some(Uniform::Vec4([0.0, 0.0, -1.0, 0.0]))
    );
    assert_eq!(
        draw.uniform(loc.light_color),
        Some(Uniform::Vec4([1.0, 1.0, 1.0, 1.0]))
    );

    let projection = mat_uniform(draw.uniform(loc.projection));
    assert_eq!(projection, r.projection());

    assert_eq!(r.queued_requests().len(), 0);
    assert_eq!(r.gpu().frames(), 1);
}

#[test]
fn projection_depth_spans_minus_one_to_zero() {
    let r = renderer();
    let projection = r.projection();

    let near = projection * Vec4::new(0.0, 0.0, -0.01, 1.0);
    let far = projection * Vec4::new(0.0, 0.0, -1000.0, 1.0);
    assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);
    assert_relative_eq!(far.z / far.w, 0.0, epsilon = 1e-4);
}

#[test]
fn uploaded_projection_is_wider_than_tall() {
    let mut r = renderer();
    let id = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();
    r.submit(id, Mat4::IDENTITY).unwrap();
    r.render().unwrap();

    let loc = r.uniform_locations();
    let projection = mat_uniform(r.gpu().draws()[0].uniform(loc.projection));
    let tan = 40.0_f32.to_radians().tan();

    // world y lands on clip x and world x on clip y (rotated panel)
    let vertical = (projection * Vec4::new(0.0, 1.0, -1.0, 1.0)).x.abs();
    let horizontal = (projection * Vec4::new(1.0, 0.0, -1.0, 1.0)).y.abs();
    assert_relative_eq!(vertical, 1.0 / tan, epsilon = 1e-5);
    assert_relative_eq!(horizontal, 1.0 / (tan * 400.0 / 240.0), epsilon = 1e-5);
}

#[test]
fn draws_follow_submission_order() {
    let mut r = renderer();
    let texture = png(1, 1);
    let a = r.register_mesh(&triangle(), &texture, Material::DEFAULT).unwrap();
    let b = r
        .register_mesh(
            &triangle(),
            &texture,
            Material::with_diffuse([1.0, 0.0, 0.0, 1.0]),
        )
        .unwrap();

    let order = [b, a, b, b, a];
    for (i, id) in order.iter().enumerate() {
        r.submit(*id, Mat4::from_translation(Vec3::new(i as f32, 0.0, -3.0)))
            .unwrap();
    }
    let stats = r.render().unwrap();
    assert_eq!(stats.draw_calls, 5);

    let loc = r.uniform_locations();
    for (i, (draw, id)) in r.gpu().draws().iter().zip(order).enumerate() {
        let mesh = r.mesh(id).unwrap();
        assert_eq!(draw.buf_info, Some(mesh.buf_info));
        assert_eq!(
            draw.uniform(loc.material),
            Some(Uniform::Mat4(mesh.material.as_rows()))
        );
        let model = mat_uniform(draw.uniform(loc.model_view));
        assert_relative_eq!(model.w_axis.x, i as f32);
    }
}

#[test]
fn queue_empties_but_keeps_capacity() {
    let mut r = renderer();
    let id = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();

    for _ in 0..10 {
        r.submit(id, Mat4::IDENTITY).unwrap();
    }
    assert_eq!(r.request_capacity(), 10);
    r.submit(id, Mat4::IDENTITY).unwrap();
    assert_eq!(r.request_capacity(), 15);
    assert!(r.queued_requests().iter().all(|req| req.mesh == id));

    let stats = r.render().unwrap();
    assert_eq!(stats.draw_calls, 11);
    assert_eq!(r.queued_requests().len(), 0);
    assert_eq!(r.request_capacity(), 15);
}

#[test]
fn empty_frames_draw_nothing() {
    let mut r = renderer();
    r.register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();

    assert_eq!(r.render().unwrap(), Default::default());
    assert_eq!(r.render().unwrap(), Default::default());
    assert!(r.gpu().draws().is_empty());
    assert_eq!(r.gpu().frames(), 2);

    let clears: Vec<_> = r
        .gpu()
        .commands()
        .iter()
        .filter_map(|c| match c {
            GpuCommand::BeginFrame { clear_color } => Some(*clear_color),
            _ => None,
        })
        .collect();
    assert_eq!(clears, vec![0x68b0d8ff, 0x68b0d8ff]);
}

#[test]
fn unknown_mesh_drops_the_frame() {
    let mut r = renderer();
    let id = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();
    r.submit(id, Mat4::IDENTITY).unwrap();
    r.submit(MeshId::from_index(4), Mat4::IDENTITY).unwrap();

    let err = r.render().unwrap_err();
    assert!(matches!(err, RenderError::UnknownMesh { registered: 1, .. }));
    assert!(r.gpu().draws().is_empty());
    assert_eq!(r.gpu().frames(), 0);
    assert_eq!(r.queued_requests().len(), 0);

    // the next frame is unaffected
    r.submit(id, Mat4::IDENTITY).unwrap();
    assert_eq!(r.render().unwrap().draw_calls, 1);
}

#[test]
fn indexed_untextured_meshes_use_vertex_color() {
    let mut r = renderer();
    let cube = MeshData::cube();
    let textured = r
        .register_mesh(&triangle(), &png(1, 1), Material::DEFAULT)
        .unwrap();
    let plain = r.register_mesh_data(&cube).unwrap();

    let mesh = *r.mesh(plain).unwrap();
    let indices = mesh.indices.unwrap();
    assert_eq!(indices.count, 36);
    assert_eq!(
        r.gpu().linear_bytes(indices.buffer),
        Some(bytemuck::cast_slice::<u16, u8>(&cube.indices))
    );
    assert_eq!(r.mesh_texture(plain), None);

    r.submit(textured, Mat4::IDENTITY).unwrap();
    r.submit(plain, Mat4::IDENTITY).unwrap();
    r.submit(plain, Mat4::IDENTITY).unwrap();
    r.submit(textured, Mat4::IDENTITY).unwrap();
    r.gpu_mut().clear_log();
    let stats = r.render().unwrap();
    assert_eq!(stats.vertices, 3 + 36 + 36 + 3);

    let draws = r.gpu().draws();
    let envs: Vec<_> = draws.iter().map(|d| d.tex_env).collect();
    assert_eq!(
        envs,
        vec![
            Some(TexEnv::ModulateTexture),
            Some(TexEnv::VertexColor),
            Some(TexEnv::VertexColor),
            Some(TexEnv::ModulateTexture),
        ]
    );
    assert_eq!(draws[1].indices, Some(indices.buffer));
    assert_eq!(draws[1].count, 36);

    // only the two changes are issued
    let switches = r
        .gpu()
        .commands()
        .iter()
        .filter(|c| matches!(c, GpuCommand::SetTexEnv { .. }))
        .count();
    assert_eq!(switches, 2);
}

#[test]
fn packs_register_in_order() {
    let mut tri = MeshData {
        name: "tri".into(),
        vertices: triangle().to_vec(),
        texture: Some(png(2, 2)),
        material: Material::with_diffuse([0.0, 1.0, 0.0, 1.0]),
        ..Default::default()
    };
    tri.indices = vec![0, 1, 2];
    let pack = MeshPack::new(vec![tri, MeshData::cube()]);

    let mut bytes = Vec::new();
    pack.write(&mut bytes).unwrap();
    let pack = MeshPack::read(bytes.as_slice()).unwrap();

    let mut r = renderer();
    let ids = r.register_pack(&pack).unwrap();
    assert_eq!(ids, vec![MeshId::from_index(0), MeshId::from_index(1)]);
    assert_eq!(
        r.mesh(ids[0]).unwrap().material.diffuse,
        [0.0, 1.0, 0.0, 1.0]
    );
    assert!(r.mesh_texture(ids[0]).is_some());
    assert!(r.mesh_texture(ids[1]).is_none());
}

#[test]
fn cube_triangle_list_registers_as_plain_mesh() {
    let mut r = renderer();
    let cube = MeshData::cube().to_triangle_list();
    let id = r
        .register_mesh(&cube, &png(8, 8), Material::DEFAULT)
        .unwrap();
    r.submit(id, Mat4::from_rotation_y(0.5)).unwrap();
    r.render().unwrap();

    let draw = &r.gpu().draws()[0];
    assert_eq!((draw.first, draw.count, draw.indices), (0, 36, None));
}
