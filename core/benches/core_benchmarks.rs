use criterion::{Criterion, black_box, criterion_group, criterion_main};

use deqp_core::math::{Vec3, Vec4};
use deqp_core::sampler::{FilterMode, Sampler, WrapMode};
use deqp_core::texture::{CubeFace, Texture2D, TextureCube, TextureFormat};

fn checker_texture(size: u32) -> Texture2D {
    let mut tex = Texture2D::new(TextureFormat::RGBA8, size, size).unwrap();
    for level in 0..tex.num_levels() {
        tex.level_mut(level).unwrap().fill_with(|x, y, _| {
            if (x + y) % 2 == 0 {
                Vec4::new(1.0, 1.0, 1.0, 1.0)
            } else {
                Vec4::new(0.0, 0.0, 0.0, 1.0)
            }
        });
    }
    tex
}

// ---------------------------------------------------------------------------
// 2D sampling
// ---------------------------------------------------------------------------

fn bench_sample_2d_nearest(c: &mut Criterion) {
    let tex = checker_texture(64);
    let sampler = Sampler::nearest().with_wrap(WrapMode::Repeat);
    c.bench_function("sample_2d_nearest", |b| {
        b.iter(|| tex.view().sample(&sampler, black_box(0.37), black_box(0.81), 0.0));
    });
}

fn bench_sample_2d_trilinear(c: &mut Criterion) {
    let tex = checker_texture(64);
    let sampler = Sampler::new(
        WrapMode::MirroredRepeat,
        FilterMode::LinearMipmapLinear,
        FilterMode::Linear,
    );
    c.bench_function("sample_2d_trilinear", |b| {
        b.iter(|| tex.view().sample(&sampler, black_box(0.37), black_box(0.81), black_box(2.3)));
    });
}

// ---------------------------------------------------------------------------
// Cube sampling
// ---------------------------------------------------------------------------

fn bench_sample_cube_linear(c: &mut Criterion) {
    let mut cube = TextureCube::new(TextureFormat::RGBA8, 32).unwrap();
    for face in CubeFace::ALL {
        cube.face_level_mut(face, 0)
            .unwrap()
            .clear(&Vec4::new(0.5, 0.25, 0.75, 1.0));
    }
    let sampler = Sampler::linear();
    c.bench_function("sample_cube_linear", |b| {
        b.iter(|| {
            cube.view()
                .sample(&sampler, &black_box(Vec3::new(0.3, -0.9, 0.2)), 0.0)
        });
    });
}

criterion_group!(
    benches,
    bench_sample_2d_nearest,
    bench_sample_2d_trilinear,
    bench_sample_cube_linear,
);
criterion_main!(benches);
