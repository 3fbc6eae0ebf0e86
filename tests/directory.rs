//! Concurrent use of a shared directory.

use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;

use uds_router::{Directory, Error, Keeper};

#[test]
fn test_single_winner_per_hostname() {
    const WRITERS: usize = 16;

    let directory = Arc::new(Directory::new());
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let directory = Arc::clone(&directory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let path = PathBuf::from(format!("/run/writer-{i}.sock"));
                directory.add_path("service", &path).map(|()| path)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<&PathBuf> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

    assert_eq!(winners.len(), 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, Error::HostnameAlreadyExists(ref h) if h == "service"));
        }
    }
    assert_eq!(&directory.lookup_path("service").unwrap(), winners[0]);
}

#[test]
fn test_same_path_races_all_succeed() {
    let directory = Arc::new(Directory::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || directory.add_path("service", "/run/service.sock"))
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(directory.len(), 1);
}

#[test]
fn test_readers_and_writers() {
    let directory = Arc::new(Directory::new());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || {
                for i in 0..250 {
                    let host = format!("host-{w}-{i}");
                    directory.add_path(&host, format!("/run/{host}.sock")).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let directory = Arc::clone(&directory);
            thread::spawn(move || {
                for i in 0..250 {
                    // Either not there yet or exactly the written value.
                    match directory.lookup_path(&format!("host-0-{i}")) {
                        Ok(path) => assert_eq!(path, PathBuf::from(format!("/run/host-0-{i}.sock"))),
                        Err(err) => assert!(err.is_path_not_found()),
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(directory.len(), 1000);
}

#[test]
fn test_keeper_trait_object() {
    let keeper: Arc<dyn Keeper> = Arc::new(Directory::new());

    uds_router::Collector::add_path(keeper.as_ref(), "service", "/run/service.sock".as_ref())
        .unwrap();

    assert_eq!(
        uds_router::Resolver::lookup_path(keeper.as_ref(), "service").unwrap(),
        PathBuf::from("/run/service.sock")
    );
}
