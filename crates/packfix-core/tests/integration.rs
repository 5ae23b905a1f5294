//! End-to-end validate/repair/extract over archives on disk.

use packfix_archive::{DosDateTime, ZipStreamReader, ZipStreamWriter};
use packfix_core::{CoreError, Engine, EngineConfig, RecordingObserver, RepairOutcome};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write_pack(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = ZipStreamWriter::new(BufWriter::new(File::create(&path).unwrap()));
    for (entry, data) in entries {
        if entry.ends_with('/') {
            writer.add_directory(entry, DosDateTime::now()).unwrap();
        } else {
            writer.add_bytes(entry, DosDateTime::now(), data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner().unwrap();
    path
}

fn read_entries(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut reader = ZipStreamReader::new(File::open(path).unwrap());
    let mut entries = BTreeMap::new();
    while let Some(entry) = reader.next_entry().unwrap() {
        let mut data = Vec::new();
        if !entry.is_dir() {
            reader.read_data(&mut data).unwrap();
        }
        entries.insert(entry.name, data);
    }
    entries
}

fn manifest_of(path: &Path) -> Value {
    let entries = read_entries(path);
    serde_json::from_slice(&entries["manifest.json"]).unwrap()
}

fn broken_pack(dir: &Path) -> PathBuf {
    let texture: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 256) as u8).collect();
    write_pack(
        dir,
        "broken.mcpack",
        &[
            ("Vivid/", b""),
            (
                "Vivid/manifest.json",
                br#"{"format_version": 2, "header": {"name": "Vivid", "version": [2, 1]}}"#,
            ),
            ("Vivid/pack_icon.png", b"\x89PNG"),
            ("Vivid/textures/blocks/", b""),
            ("Vivid/textures/blocks/dirt.png", texture.as_slice()),
            ("Vivid/texts/en_US.lang", b"pack.name=Vivid"),
        ],
    )
}

#[test]
fn repair_preserves_every_other_entry() {
    let dir = tempfile::tempdir().unwrap();
    let input = broken_pack(dir.path());
    let output = dir.path().join("fixed.mcpack");

    let engine = Engine::default();
    let validation = engine.validate(&input).unwrap();
    assert!(!validation.is_valid);
    assert!(validation.has_pack_icon);
    let outcome = engine
        .repair_to_file(&input, &validation, &output)
        .unwrap();
    assert!(matches!(outcome, RepairOutcome::Repaired(_)));

    let before = read_entries(&input);
    let after = read_entries(&output);
    assert_eq!(after.len(), before.len());
    for (name, data) in &before {
        if name == "Vivid/manifest.json" {
            assert!(!after.contains_key(name));
        } else {
            assert_eq!(after.get(name), Some(data), "{name} was altered");
        }
    }

    let text = String::from_utf8(after["manifest.json"].clone()).unwrap();
    assert!(text.contains("\n    \"format_version\": 2"), "4-space indent");
    let manifest: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(manifest["header"]["name"], "Vivid");
    assert_eq!(manifest["header"]["version"], serde_json::json!([2, 1, 0]));
    assert_eq!(
        manifest["header"]["min_engine_version"],
        serde_json::json!([1, 20, 0])
    );
    assert_ne!(manifest["header"]["uuid"], manifest["modules"][0]["uuid"]);

    assert!(engine.validate(&output).unwrap().is_valid);
}

#[test]
fn repeated_repairs_agree_except_for_uuids() {
    let dir = tempfile::tempdir().unwrap();
    let input = broken_pack(dir.path());
    let engine = Engine::default();
    let validation = engine.validate(&input).unwrap();

    let first = dir.path().join("one.mcpack");
    let second = dir.path().join("two.mcpack");
    engine.repair_to_file(&input, &validation, &first).unwrap();
    engine.repair_to_file(&input, &validation, &second).unwrap();

    let mut a = manifest_of(&first);
    let mut b = manifest_of(&second);
    for doc in [&mut a, &mut b] {
        doc["header"]["uuid"] = Value::Null;
        doc["modules"][0]["uuid"] = Value::Null;
    }
    assert_eq!(a, b);
}

#[test]
fn extract_through_engine_paths() {
    let dir = tempfile::tempdir().unwrap();
    let input = broken_pack(dir.path());
    let obs = Arc::new(RecordingObserver::new());
    let engine = Engine::default().with_observer(obs.clone());

    let info = engine.extract(&input).unwrap();
    assert!(info.was_fixed);
    assert_eq!(info.name, "Vivid");
    assert_eq!(info.version, vec![2, 1, 0]);
    assert!(obs.contains("header section"));
    assert!(obs.contains("repair:"));
}

#[test]
fn configured_defaults_flow_into_repair() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pack(dir.path(), "bare.mcpack", &[("textures/x.png", b"x")]);
    let config = EngineConfig::from_toml_str(
        r#"
pack_name = "Imported"
min_engine_version = "1.21.0"
"#,
    )
    .unwrap();
    let engine = Engine::new(config);
    let output = dir.path().join("bare_fixed.mcpack");
    let validation = engine.validate(&input).unwrap();
    assert!(!validation.manifest_found);
    engine.repair_to_file(&input, &validation, &output).unwrap();

    let manifest = manifest_of(&output);
    assert_eq!(manifest["header"]["name"], "Imported");
    assert_eq!(
        manifest["header"]["min_engine_version"],
        serde_json::json!([1, 21, 0])
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.mcpack");
    let err = Engine::default().try_extract(&missing).unwrap_err();
    assert!(matches!(err, CoreError::Io(_)));
}

#[test]
fn existing_destination_is_replaced_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let input = broken_pack(dir.path());
    let output = dir.path().join("out.mcpack");
    std::fs::write(&output, b"old contents").unwrap();

    let engine = Engine::default();
    let validation = engine.validate(&input).unwrap();
    engine.repair_to_file(&input, &validation, &output).unwrap();
    assert!(engine.validate(&output).unwrap().is_valid);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers.len(), 2, "{leftovers:?}");
}
