extern crate stockpile;
extern crate tempfile;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use stockpile::errors::Error;
use stockpile::loader::FileReader;
use stockpile::pack::{PackFileGenerator, PackFileMetaData, PackFileReader};
use stockpile::stream::prelude::*;

fn write<P: AsRef<Path>>(path: P, bytes: &[u8]) {
    fs::write(path, bytes).unwrap();
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn hello_and_zeroes() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path().join("a.txt"), b"hello");
    write(tmp.path().join("b.bin"), &[0; 10000]);

    let mut generator = PackFileGenerator::new();
    generator.add_file(tmp.path().join("a.txt"), "a.txt").unwrap();
    generator
        .add_file_compressed(tmp.path().join("b.bin"), "b.bin", 9)
        .unwrap();

    let output = tmp.path().join("assets.pack");
    let report = generator.compile(&output).unwrap();
    assert_eq!(report.entries, 2);
    assert_eq!(report.bytes, fs::metadata(&output).unwrap().len());
    assert!(report.bytes < 10000);

    let reader = PackFileReader::new();
    let prefix = path_str(&output);
    assert_eq!(reader.read_file(prefix, "a.txt").unwrap(), b"hello");
    assert_eq!(reader.read_file(prefix, "b.bin").unwrap(), vec![0; 10000]);

    match reader.read_file(prefix, "missing") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    let meta = reader.metadata(prefix).unwrap();
    assert_eq!(meta.len(), 2);
    assert!(!meta.find("a.txt").unwrap().is_compressed());
    assert!(meta.find("b.bin").unwrap().is_compressed());
}

#[test]
fn offsets_within_file_and_disjoint() {
    let tmp = tempfile::tempdir().unwrap();

    let mut generator = PackFileGenerator::new();
    for i in 0..20 {
        let path = tmp.path().join(format!("{}.bin", i));
        write(&path, &vec![i as u8; i * 37]);

        if i % 3 == 0 {
            generator
                .add_file_compressed(&path, format!("entry-{}", i), i as i32 % 10)
                .unwrap();
        } else {
            generator.add_file(&path, format!("entry-{}", i)).unwrap();
        }
    }

    let output = tmp.path().join("many.pack");
    generator.compile(&output).unwrap();

    let bytes = fs::read(&output).unwrap();
    let mut s = SliceInput::new(&bytes);
    let meta = PackFileMetaData::read_from(&mut s).unwrap();
    assert_eq!(meta.len(), 20);

    let header = s.tell();
    assert_eq!(header, meta.encoded_size());

    let mut ranges: Vec<_> = meta
        .elements
        .iter()
        .map(|v| (v.offset, v.offset + v.stored_size()))
        .collect();
    ranges.sort();

    let mut end = header;
    for (from, to) in ranges {
        assert!(from >= end);
        assert!(to <= bytes.len() as u64);
        end = to;
    }

    assert_eq!(end, bytes.len() as u64);

    let reader = PackFileReader::new();
    for i in 0..20 {
        let v = reader
            .read_file(path_str(&output), &format!("entry-{}", i))
            .unwrap();
        assert_eq!(v, vec![i as u8; i * 37]);
    }
}

#[test]
fn generator_errors() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path().join("a"), b"a");

    let mut generator = PackFileGenerator::new();
    generator.add_file(tmp.path().join("a"), "a").unwrap();

    match generator.add_file(tmp.path().join("a"), "a") {
        Err(Error::Logic(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match generator.add_file(tmp.path().join("missing"), "b") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(generator.len(), 1);

    // A source file that changed after it was added.
    write(tmp.path().join("a"), b"abc");
    match generator.compile(tmp.path().join("out.pack")) {
        Err(Error::IO(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn corruption_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path().join("z"), &[0; 4096]);

    let mut generator = PackFileGenerator::new();
    generator.add_file_compressed(tmp.path().join("z"), "z", 6).unwrap();

    let output = tmp.path().join("corrupt.pack");
    generator.compile(&output).unwrap();

    let mut bytes = fs::read(&output).unwrap();
    let last = bytes.len() - 1;
    bytes.truncate(last);
    write(&output, &bytes);

    let reader = PackFileReader::new();
    match reader.read_file(path_str(&output), "z") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match reader.read_file(path_str(&tmp.path().join("nope.pack")), "z") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn pooled_streams() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path().join("x"), &[7; 1024]);

    let mut generator = PackFileGenerator::new();
    generator.add_file(tmp.path().join("x"), "x").unwrap();
    let output = tmp.path().join("pooled.pack");
    generator.compile(&output).unwrap();

    let reader = Arc::new(PackFileReader::new());
    let prefix = path_str(&output).to_owned();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let reader = reader.clone();
        let prefix = prefix.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..16 {
                assert_eq!(reader.read_file(&prefix, "x").unwrap(), vec![7; 1024]);
            }
        }));
    }

    for v in handles {
        v.join().unwrap();
    }

    let opened = reader.streams().len(&prefix);
    assert!(opened >= 1 && opened <= 9);

    reader.close(&prefix);
    assert_eq!(reader.streams().len(&prefix), 0);
    assert_eq!(reader.read_file(&prefix, "x").unwrap(), vec![7; 1024]);
}

#[test]
fn close_retires_leased_streams() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("rebuilt.pack");

    write(tmp.path().join("x"), b"old contents");
    let mut generator = PackFileGenerator::new();
    generator.add_file(tmp.path().join("x"), "x").unwrap();
    generator.compile(&output).unwrap();

    let reader = PackFileReader::new();
    let prefix = path_str(&output).to_owned();
    assert_eq!(reader.read_file(&prefix, "x").unwrap(), b"old contents");

    let lease = reader.streams().acquire(&prefix).unwrap();
    assert_eq!(reader.streams().len(&prefix), 1);

    // Rebuilds the pack with a different layout while the old handle is still leased.
    fs::remove_file(&output).unwrap();
    write(tmp.path().join("pad"), &[9; 100]);
    write(tmp.path().join("x"), b"new contents!");
    let mut generator = PackFileGenerator::new();
    generator.add_file(tmp.path().join("pad"), "pad").unwrap();
    generator.add_file(tmp.path().join("x"), "x").unwrap();
    generator.compile(&output).unwrap();

    reader.close(&prefix);
    assert_eq!(reader.streams().len(&prefix), 0);

    drop(lease);
    assert_eq!(reader.streams().len(&prefix), 0);

    assert_eq!(reader.read_file(&prefix, "x").unwrap(), b"new contents!");
    assert_eq!(reader.read_file(&prefix, "pad").unwrap(), vec![9; 100]);
}

#[test]
fn scratch_buffers_survive_corrupt_entries() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path().join("z"), &[0; 4096]);

    let mut generator = PackFileGenerator::new();
    generator.add_file_compressed(tmp.path().join("z"), "z", 6).unwrap();
    let output = tmp.path().join("garbled.pack");
    generator.compile(&output).unwrap();

    let (offset, stored) = {
        let bytes = fs::read(&output).unwrap();
        let meta = PackFileMetaData::read_from(&mut SliceInput::new(&bytes)).unwrap();
        let element = meta.find("z").unwrap();
        (element.offset as usize, element.stored_size() as usize)
    };

    let mut bytes = fs::read(&output).unwrap();
    for v in &mut bytes[offset..offset + stored] {
        *v = 0xff;
    }
    write(&output, &bytes);

    let reader = PackFileReader::new();
    assert_eq!(reader.idle_buffers(), 0);

    match reader.read_file(path_str(&output), "z") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(reader.idle_buffers(), 1);
}
