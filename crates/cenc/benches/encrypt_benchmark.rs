use std::hint::black_box;

use cenc::{EncryptionConfig, Scheme, TrackEncryptor};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use h264::{NalFormat, ZeroPadding};

const SLICE_SIZE: usize = 64 * 1024;

fn benchmark_encryption(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sample Encryption");

    let extradata = create_extradata();
    let (length_prefixed, annexb) = create_samples();
    group.throughput(Throughput::Bytes(length_prefixed.len() as u64));

    for scheme in [Scheme::Cenc, Scheme::Cbcs] {
        let config = EncryptionConfig::builder([0x3c; 16], [0x01; 16])
            .scheme(scheme)
            .bitexact(true)
            .build();

        let mut encryptor = TrackEncryptor::new(config.clone(), &extradata).unwrap();
        let mut out = Vec::with_capacity(length_prefixed.len());
        group.bench_function(format!("{scheme} length prefixed"), |b| {
            b.iter(|| {
                out.clear();
                encryptor
                    .encrypt_sample(
                        black_box(&length_prefixed),
                        NalFormat::LengthPrefixed { length_size: 4 },
                        &mut out,
                    )
                    .unwrap();
            })
        });

        let mut encryptor = TrackEncryptor::new(config, &extradata).unwrap();
        group.bench_function(format!("{scheme} annex b"), |b| {
            b.iter(|| {
                out.clear();
                encryptor
                    .encrypt_sample(
                        black_box(&annexb),
                        NalFormat::AnnexB(ZeroPadding::NextUnit),
                        &mut out,
                    )
                    .unwrap();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_encryption);
criterion_main!(benches);

fn create_extradata() -> Vec<u8> {
    let mut extradata = vec![0x00, 0x00, 0x00, 0x01];
    // Main profile SPS, 1920x1088
    extradata.extend_from_slice(&[
        0x67, 0x4d, 0x40, 0x29, 0x96, 0x52, 0x80, 0xf0, 0x04, 0x4f, 0xcb, 0x35, 0x01, 0x01, 0x01,
        0x40, 0x00, 0x00, 0xfa, 0x40, 0x00, 0x2e, 0xe0, 0x21,
    ]);
    extradata.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    extradata.extend_from_slice(&[0x68, 0xe9, 0x09, 0x35, 0x20]);
    extradata
}

/// One access unit with an AUD and a large IDR slice, in both framings.
fn create_samples() -> (Vec<u8>, Vec<u8>) {
    let aud = [0x09, 0xf0];
    let mut slice = vec![0x65, 0x88, 0x80, 0x40, 0x02, 0xdb, 0xaa, 0xe2];
    // Slice data without start code emulation
    slice.extend((0..SLICE_SIZE).map(|i| (i % 251) as u8 | 0x01));

    let mut length_prefixed = Vec::new();
    let mut annexb = Vec::new();
    for unit in [&aud[..], &slice[..]] {
        length_prefixed.extend_from_slice(&(unit.len() as u32).to_be_bytes());
        length_prefixed.extend_from_slice(unit);
        annexb.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
        annexb.extend_from_slice(unit);
    }

    (length_prefixed, annexb)
}
