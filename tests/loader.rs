extern crate stockpile;
extern crate tempfile;

use std::fs;
use std::sync::Arc;

use stockpile::build::Description;
use stockpile::errors::Error;
use stockpile::loader::{FileLoader, FileReader, NativeFileReader, PathPrefix};
use stockpile::pack::{PackFileGenerator, PackFileReader};

#[test]
fn native() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a"), b"a").unwrap();

    let reader = NativeFileReader::new();
    let dir = tmp.path().to_str().unwrap();
    assert_eq!(reader.read_file(dir, "a").unwrap(), b"a");

    match reader.read_file(dir, "b") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn search_order() {
    let tmp = tempfile::tempdir().unwrap();
    let (lhs, rhs) = (tmp.path().join("lhs"), tmp.path().join("rhs"));
    fs::create_dir_all(&lhs).unwrap();
    fs::create_dir_all(&rhs).unwrap();

    fs::write(lhs.join("both"), b"lhs").unwrap();
    fs::write(rhs.join("both"), b"rhs").unwrap();
    fs::write(rhs.join("only"), b"rhs").unwrap();

    let native = Arc::new(NativeFileReader::new());
    let loader = FileLoader::new();
    loader.add_prefix(PathPrefix::new(native.clone(), lhs.to_str().unwrap()));
    loader.add_prefix(PathPrefix::new(native, rhs.to_str().unwrap()));
    assert_eq!(loader.prefixes().len(), 2);

    assert_eq!(loader.read("both").unwrap(), b"lhs");
    assert_eq!(loader.read("only").unwrap(), b"rhs");
    assert!(loader.read("none").is_err());

    loader.clear_prefixes();
    assert!(loader.read("both").is_err());
}

#[test]
fn corrupt_pack_falls_through() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a"), vec![1u8; 2048]).unwrap();

    let mut generator = PackFileGenerator::new();
    generator.add_file_compressed(tmp.path().join("a"), "a", 9).unwrap();
    let pack = tmp.path().join("a.pack");
    generator.compile(&pack).unwrap();

    // Flips the last byte of the compressed stream.
    let mut bytes = fs::read(&pack).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&pack, &bytes).unwrap();

    let loader = FileLoader::with_prefixes(vec![
        PathPrefix::new(Arc::new(PackFileReader::new()), pack.to_str().unwrap()),
        PathPrefix::new(Arc::new(NativeFileReader::new()), tmp.path().to_str().unwrap()),
    ]);

    assert_eq!(loader.read("a").unwrap(), vec![1u8; 2048]);
}

#[test]
fn description_entries() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
    fs::write(tmp.path().join("b.bin"), vec![0u8; 10000]).unwrap();

    let json = r#"{ "sections": [{ "name": "assets", "entries": [
        { "external_path": "a.txt", "lookup": "descriptor_dir", "internal_path": "a.txt" },
        { "external_path": "b.bin", "lookup": "descriptor_dir", "internal_path": "b.bin",
          "compression_level": 9 },
        { "external_path": "missing", "lookup": "descriptor_dir", "internal_path": "missing" }
    ]}]}"#;

    let path = tmp.path().join("assets.json");
    fs::write(&path, json).unwrap();
    let desc = Description::load(&path).unwrap();

    let mut generator = PackFileGenerator::new();
    let mut failures = 0;
    for v in &desc.section("assets").unwrap().entries {
        if generator.add_entry(&v.to_pack_file_entry(), tmp.path()).is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 1);

    let pack = tmp.path().join("assets.pack");
    let report = generator.compile(&pack).unwrap();
    assert_eq!(report.entries, 2);

    let reader = PackFileReader::new();
    let prefix = pack.to_str().unwrap();
    assert_eq!(reader.read_file(prefix, "a.txt").unwrap(), b"hello");
    assert_eq!(reader.read_file(prefix, "b.bin").unwrap(), vec![0u8; 10000]);
    assert!(reader.metadata(prefix).unwrap().find("b.bin").unwrap().is_compressed());
}
