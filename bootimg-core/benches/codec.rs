use bootimg_core::{
    checksum::crc_ccitt, decode_bootimg_from_bytes, decode_updata_from_bytes, BootImageBuilder,
    PaddingStrategy, UpdataBuilder, UpdataDecodeOptions,
};
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SIZES: [usize; 4] = [4096, 65536, 1 << 20, 8 << 20];

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc_ccitt");

    for size in [256, 4096, 65536] {
        let data = vec![0x42u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| crc_ccitt(black_box(data)));
        });
    }

    group.finish();
}

fn bench_bootimg(c: &mut Criterion) {
    let mut group = c.benchmark_group("bootimg");

    for size in SIZES {
        let kernel = Bytes::from(vec![0x42u8; size]);
        let ramdisk = Bytes::from(vec![0x17u8; size / 2]);
        let image = BootImageBuilder::new()
            .kernel(kernel.clone())
            .ramdisk(ramdisk.clone())
            .build()
            .unwrap();

        group.throughput(Throughput::Bytes(image.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &size, |b, _| {
            b.iter(|| {
                BootImageBuilder::new()
                    .kernel(kernel.clone())
                    .ramdisk(ramdisk.clone())
                    .build()
                    .unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &image, |b, data| {
            b.iter(|| decode_bootimg_from_bytes(black_box(data), PaddingStrategy::Detect).unwrap());
        });
    }

    group.finish();
}

fn bench_updata(c: &mut Criterion) {
    let mut group = c.benchmark_group("updata");

    for size in SIZES {
        let payload = Bytes::from(vec![0x42u8; size]);
        let data = UpdataBuilder::new()
            .partition(0x3000_0000, payload.clone())
            .partition(0x4000_0000, payload.clone())
            .build()
            .unwrap();

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &size, |b, _| {
            b.iter(|| {
                UpdataBuilder::new()
                    .partition(0x3000_0000, payload.clone())
                    .partition(0x4000_0000, payload.clone())
                    .build()
                    .unwrap()
            });
        });
        for (label, options) in [
            ("decode", UpdataDecodeOptions::default()),
            ("decode_verify", UpdataDecodeOptions::verifying()),
        ] {
            group.bench_with_input(BenchmarkId::new(label, size), &data, |b, data| {
                b.iter(|| decode_updata_from_bytes(black_box(data), options).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_crc, bench_bootimg, bench_updata);
criterion_main!(benches);
