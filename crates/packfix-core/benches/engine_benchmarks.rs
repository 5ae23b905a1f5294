use criterion::{criterion_group, criterion_main, Criterion};
use packfix_archive::{DosDateTime, ZipStreamWriter};
use packfix_core::{Engine, RepairOutcome};

fn create_test_pack(textures: usize, manifest: &[u8]) -> Vec<u8> {
    let mut writer = ZipStreamWriter::new(Vec::new());
    writer.add_directory("textures/", DosDateTime::EPOCH).unwrap();
    for i in 0..textures {
        let data: Vec<u8> = (0..4096u32).map(|b| ((b ^ i as u32) % 251) as u8).collect();
        writer
            .add_bytes(&format!("textures/t{i}.png"), DosDateTime::EPOCH, &data)
            .unwrap();
    }
    writer.add_bytes("pack_icon.png", DosDateTime::EPOCH, b"png").unwrap();
    writer.add_bytes("manifest.json", DosDateTime::EPOCH, manifest).unwrap();
    writer.finish().unwrap()
}

const VALID_MANIFEST: &[u8] = br#"{
    "format_version": 2,
    "header": {
        "name": "Bench",
        "description": "",
        "uuid": "5f1a8c3e-2b7d-4e9f-a0c1-d2e3f4a5b6c7",
        "version": [1, 0, 0],
        "min_engine_version": [1, 20, 0]
    },
    "modules": [{
        "type": "resources",
        "uuid": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
        "version": [1, 0, 0]
    }]
}"#;

fn bench_validate(c: &mut Criterion) {
    let pack = create_test_pack(200, VALID_MANIFEST);
    let engine = Engine::default();
    c.bench_function("engine_validate_200_entries", |b| {
        b.iter(|| {
            let result = engine.validate(&pack).unwrap();
            assert!(result.is_valid);
        });
    });
}

fn bench_repair(c: &mut Criterion) {
    let pack = create_test_pack(200, b"{\"format_version\": 2}");
    let engine = Engine::default();
    let validation = engine.validate(&pack).unwrap();
    c.bench_function("engine_repair_200_entries", |b| {
        b.iter_with_setup(
            || Vec::with_capacity(pack.len()),
            |mut out| {
                let outcome = engine.repair_into(&pack, &validation, &mut out).unwrap();
                assert!(matches!(outcome, RepairOutcome::Repaired(_)));
            },
        );
    });
}

fn bench_extract_fixed(c: &mut Criterion) {
    let pack = create_test_pack(50, b"not json");
    let engine = Engine::default();
    c.bench_function("engine_extract_repairing_50_entries", |b| {
        b.iter(|| {
            let info = engine.extract(&pack).unwrap();
            assert!(info.was_fixed);
        });
    });
}

criterion_group!(benches, bench_validate, bench_repair, bench_extract_fixed);
criterion_main!(benches);
