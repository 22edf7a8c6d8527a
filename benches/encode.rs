use criterion::{black_box, criterion_group, criterion_main, Criterion};
use face_attendance::capture::{solid_frame, PixelFormat};
use face_attendance::encoding::FrameEncoder;

fn bench_encode(c: &mut Criterion) {
    let rgb = solid_frame(640, 480, PixelFormat::Rgb, 128);
    let gray = solid_frame(640, 480, PixelFormat::Gray, 128);
    let encoder = FrameEncoder::default();

    c.bench_function("encode_rgb_640x480", |b| {
        b.iter(|| encoder.encode(black_box(&rgb)).unwrap());
    });
    c.bench_function("encode_gray_640x480", |b| {
        b.iter(|| encoder.encode(black_box(&gray)).unwrap());
    });
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
