extern crate env_logger;
extern crate stockpile;
extern crate tempfile;

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use stockpile::asset::{Asset, AssetClaim};
use stockpile::loader::{Declined, LoadResult, PathPrefix};
use stockpile::prelude::*;

#[derive(Default)]
struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    fail_with: Option<Error>,
}

impl MemoryLoader {
    fn with<T: Into<String>>(mut self, name: T, bytes: &[u8]) -> Self {
        self.files.insert(name.into(), bytes.to_vec());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Loader for MemoryLoader {
    fn load(&self, claim: AssetClaim) -> LoadResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if let Some(ref err) = self.fail_with {
            return Err(Declined::new(claim, err.clone()));
        }

        match self.files.get(claim.name()) {
            Some(bytes) => {
                claim.complete(Ok(Buffer::new(bytes.clone())));
                Ok(())
            }
            None => {
                let err = Error::NotFound(claim.name().to_owned());
                Err(Declined::new(claim, err))
            }
        }
    }
}

struct PanicLoader;

impl Loader for PanicLoader {
    fn load(&self, _: AssetClaim) -> LoadResult {
        panic!("loader exploded");
    }
}

fn manager() -> AssetManager {
    let _ = env_logger::try_init();

    let mut params = ManagerParams::default();
    params.workers = Some(4);
    AssetManager::new(params).unwrap()
}

#[test]
fn load_at_most_once() {
    let manager = Arc::new(manager());
    let loader = Arc::new(MemoryLoader {
        delay: Some(Duration::from_millis(20)),
        ..MemoryLoader::default()
    }.with("x", b"shared bytes"));

    manager.add_loader(loader.clone());

    let barrier = Arc::new(Barrier::new(16));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                manager.load_sync("x").unwrap()
            })
        })
        .collect();

    let results: Vec<Buffer> = handles.into_iter().map(|v| v.join().unwrap()).collect();
    assert_eq!(loader.calls(), 1);

    for v in &results {
        assert_eq!(*v, &b"shared bytes"[..]);
        assert!(v.shares_owner(&results[0]));
    }

    // Terminal states are never loaded again.
    assert_eq!(manager.load_sync("x").unwrap(), &b"shared bytes"[..]);
    assert_eq!(loader.calls(), 1);
}

#[test]
fn mixed_apis_share_one_load() {
    let manager = manager();
    let loader = Arc::new(MemoryLoader {
        delay: Some(Duration::from_millis(20)),
        ..MemoryLoader::default()
    }.with("x", b"abc"));

    manager.add_loader(loader.clone());

    let futures: Vec<_> = (0..8).map(|_| manager.load_future("x")).collect();

    let (tx, rx) = mpsc::channel();
    for i in 0..8 {
        let tx = tx.clone();
        manager.load_async(
            "x",
            move |bytes| tx.send((i, bytes.to_vec())).unwrap(),
            |err| panic!("unexpected {}", err),
        );
    }

    assert_eq!(manager.load_sync("x").unwrap(), &b"abc"[..]);

    for v in futures {
        assert_eq!(v.wait().unwrap(), &b"abc"[..]);
    }

    let mut seen = Vec::new();
    for _ in 0..8 {
        let (i, bytes) = rx.recv().unwrap();
        assert_eq!(bytes, b"abc");
        seen.push(i);
    }

    seen.sort();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
    assert_eq!(loader.calls(), 1);
}

#[test]
fn handlers_in_registration_order() {
    let asset = Arc::new(Asset::new("a"));
    let claim = asset.try_claim().unwrap();
    assert!(asset.try_claim().is_none());
    assert_eq!(asset.state(), AsyncState::Loading);

    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..16 {
        let order = order.clone();
        asset.run_when_ready(
            move |_| order.lock().unwrap().push(i),
            |err| panic!("unexpected {}", err),
        );
    }

    claim.complete(Ok(Buffer::new(b"a".to_vec())));
    assert_eq!(*order.lock().unwrap(), (0..16).collect::<Vec<_>>());

    // Terminal assets run new handlers right away.
    let order2 = order.clone();
    asset.run_when_ready(move |_| order2.lock().unwrap().push(16), |_| {});
    assert_eq!(order.lock().unwrap().len(), 17);
    assert_eq!(asset.state(), AsyncState::Ready);
}

#[test]
fn load_future_of_a_missing_asset() {
    let manager = manager();
    let mut future = manager.load_future("missing");
    assert_eq!(future.name(), "missing");

    while !future.is_ready() {
        thread::sleep(Duration::from_millis(1));
    }

    match future.try_take() {
        Some(Err(Error::NotFound(_))) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert!(future.try_take().is_none());
}

#[test]
fn no_loader_found() {
    let manager = manager();
    match manager.load_sync("x") {
        Err(Error::NotFound(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(manager.state("x"), Some(AsyncState::Error));

    // Errors are terminal as well, until the asset is evicted.
    manager.add_loader(Arc::new(MemoryLoader::default().with("x", b"x")));
    assert!(manager.load_sync("x").is_err());

    assert_eq!(manager.sweep(), 1);
    assert_eq!(manager.load_sync("x").unwrap(), &b"x"[..]);
}

#[test]
fn loader_chain() {
    let manager = manager();
    let first = Arc::new(MemoryLoader::default().with("a", b"first"));
    let second = Arc::new(
        MemoryLoader::default()
            .with("a", b"second")
            .with("b", b"second"),
    );

    manager.add_loader(first.clone());
    manager.add_loader(second.clone());
    assert_eq!(manager.loaders_len(), 2);

    assert_eq!(manager.load_sync("a").unwrap(), &b"first"[..]);
    assert_eq!(manager.load_sync("b").unwrap(), &b"second"[..]);
    assert_eq!(first.calls(), 2);
    assert_eq!(second.calls(), 1);

    manager.clear_loaders();
    assert_eq!(manager.loaders_len(), 0);
    assert!(manager.load_sync("c").is_err());
}

#[test]
fn unrecoverable_errors_stop_the_chain() {
    let manager = manager();
    let broken = Arc::new(MemoryLoader {
        fail_with: Some(Error::Logic("broken".into())),
        ..MemoryLoader::default()
    });
    let fallback = Arc::new(MemoryLoader::default().with("a", b"a"));

    manager.add_loader(broken.clone());
    manager.add_loader(fallback.clone());

    assert_eq!(
        manager.load_sync("a"),
        Err(Error::Logic("broken".into()))
    );
    assert_eq!(fallback.calls(), 0);

    let corrupt = Arc::new(MemoryLoader {
        fail_with: Some(Error::Corrupt("bad".into())),
        ..MemoryLoader::default()
    });

    manager.clear_loaders();
    manager.add_loader(corrupt.clone());
    manager.add_loader(fallback.clone());
    assert_eq!(manager.load_sync("b").is_err(), true);
    assert_eq!(fallback.calls(), 1);

    manager.sweep();
    let fallback = Arc::new(MemoryLoader::default().with("b", b"b"));
    manager.add_loader(fallback.clone());
    assert_eq!(manager.load_sync("b").unwrap(), &b"b"[..]);
}

#[test]
fn panicking_loaders_fail_the_asset() {
    let manager = manager();
    manager.add_loader(Arc::new(PanicLoader));

    match manager.load_future("a").wait() {
        Err(Error::Logic(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    match manager.load_sync("c") {
        Err(Error::Logic(_)) => {}
        other => panic!("unexpected {:?}", other),
    }

    assert_eq!(manager.state("c"), Some(AsyncState::Error));

    let (tx, rx) = mpsc::channel();
    manager.load_async("b", |_| {}, move |err| tx.send(err.clone()).unwrap());
    match rx.recv().unwrap() {
        Error::Logic(_) => {}
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn sweep_keeps_held_assets() {
    let manager = manager();
    let loader = Arc::new(
        MemoryLoader::default()
            .with("a", b"aaa")
            .with("b", b"bbb"),
    );

    manager.add_loader(loader.clone());

    let a = manager.load_sync("a").unwrap();
    manager.load_sync("b").unwrap();
    let held: Arc<Asset> = manager.get("a").unwrap();
    assert_eq!(manager.len(), 2);

    assert_eq!(manager.sweep(), 1);
    assert!(manager.contains("a"));
    assert!(!manager.contains("b"));
    assert_eq!(held.bytes().unwrap(), a);

    // Bytes outlive their asset.
    drop(held);
    assert_eq!(manager.sweep(), 1);
    assert!(manager.is_empty());
    assert_eq!(a, &b"aaa"[..]);

    assert_eq!(manager.load_sync("a").unwrap(), &b"aaa"[..]);
    assert_eq!(loader.calls(), 3);
}

#[test]
fn listeners() {
    let manager = manager();
    manager.add_loader(Arc::new(MemoryLoader::default().with("a", b"a")));

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    let handle = manager.add_listener(move |name, result| {
        log.lock().unwrap().push((name.to_owned(), result.is_ok()));
    });

    let other = manager.add_listener(|_, _| panic!("listeners may panic"));
    assert_ne!(handle, other);

    manager.load_sync("a").unwrap();
    assert!(manager.load_sync("b").is_err());

    assert!(manager.remove_listener(handle));
    assert!(!manager.remove_listener(handle));
    manager.load_sync("c").unwrap_err();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![("a".to_owned(), true), ("b".to_owned(), false)]
    );
}

#[test]
fn files_and_load_units() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("plain.txt"), b"plain").unwrap();
    fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
    fs::write(tmp.path().join("b.bin"), &[2u8; 64]).unwrap();

    let mut generator = LoadUnitGenerator::new();
    generator.add_file(tmp.path().join("a.txt"), "unit/a.txt").unwrap();
    generator.add_file(tmp.path().join("b.bin"), "unit/b.bin").unwrap();
    generator.compile(tmp.path(), "level").unwrap();

    let dir = tmp.path().to_str().unwrap();
    let native = Arc::new(NativeFileReader::new());

    let manager = manager();
    let units = Arc::new(LoadUnitLoader::new(PathPrefix::new(native.clone(), dir)));
    manager.add_loader(units.clone());
    manager.add_loader(Arc::new(FileLoader::with_prefixes(vec![PathPrefix::new(
        native, dir,
    )])));

    assert!(manager.load_sync("unit/a.txt").is_err());
    manager.sweep();

    assert!(manager.pin_load_unit("level"));
    let unit = units.unit("level").unwrap();

    let futures: Vec<_> = (0..4).map(|_| manager.load_future("unit/b.bin")).collect();
    let a = manager.load_sync("unit/a.txt").unwrap();
    assert_eq!(a, &b"hello"[..]);

    for v in futures {
        let b = v.wait().unwrap();
        assert_eq!(b, &[2u8; 64][..]);
        assert!(b.shares_owner(&a));
    }

    assert_eq!(manager.load_sync("plain.txt").unwrap(), &b"plain"[..]);

    assert!(manager.unpin_load_unit("level"));
    assert!(units.pinned().is_empty());

    // Views keep the payload alive after the unit is gone.
    drop(unit);
    manager.sweep();
    assert_eq!(a, &b"hello"[..]);
}

struct CountingReader {
    inner: NativeFileReader,
    reads: Mutex<HashMap<String, usize>>,
}

impl CountingReader {
    fn reads(&self, name: &str) -> usize {
        self.reads.lock().unwrap().get(name).cloned().unwrap_or(0)
    }
}

impl FileReader for CountingReader {
    fn read_file(&self, prefix: &str, name: &str) -> Result<Vec<u8>> {
        *self.reads.lock().unwrap().entry(name.to_owned()).or_insert(0) += 1;
        thread::sleep(Duration::from_millis(10));
        self.inner.read_file(prefix, name)
    }
}

#[test]
fn load_unit_phases_load_once() {
    let tmp = tempfile::tempdir().unwrap();

    let mut generator = LoadUnitGenerator::new();
    for i in 0..32 {
        let path = tmp.path().join(format!("{}.bin", i));
        fs::write(&path, vec![i as u8; 16 + i]).unwrap();
        generator.add_file(&path, format!("asset-{}", i)).unwrap();
    }

    generator.compile(tmp.path(), "level").unwrap();

    let reader = Arc::new(CountingReader {
        inner: NativeFileReader::new(),
        reads: Mutex::new(HashMap::new()),
    });

    let manager = Arc::new(manager());
    let units = Arc::new(LoadUnitLoader::new(PathPrefix::new(
        reader.clone(),
        tmp.path().to_str().unwrap(),
    )));

    manager.add_loader(units);
    assert!(manager.pin_load_unit("level"));

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();

                let futures: Vec<_> = (0..4)
                    .map(|j| manager.load_future(&format!("asset-{}", t * 4 + j)))
                    .collect();

                for j in 0..4 {
                    let i = (t * 4 + j + 16) % 32;
                    let bytes = manager.load_sync(&format!("asset-{}", i)).unwrap();
                    assert_eq!(bytes, &vec![i as u8; 16 + i][..]);
                }

                for (j, v) in futures.into_iter().enumerate() {
                    let i = t * 4 + j;
                    assert_eq!(v.wait().unwrap(), &vec![i as u8; 16 + i][..]);
                }
            })
        })
        .collect();

    for v in handles {
        v.join().unwrap();
    }

    assert_eq!(manager.len(), 32);
    assert_eq!(reader.reads("level.lum"), 1);
    assert_eq!(reader.reads("level.lup"), 1);
}
