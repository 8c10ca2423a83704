//! End-to-end tests for the inode ordering policies.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use blockpack::config::{FileOrderMode, FileOrderOptions, InodeOptions};
use blockpack::inode::{InodeRef, SourceFile};
use blockpack::mapper::{FileMapper, FileMapping};
use blockpack::ordering::InodeManager;
use blockpack::progress::ProgressSnapshot;

/// In-memory mapper serving per-path contents.
struct MapStore {
    contents: HashMap<PathBuf, Vec<u8>>,
}

struct StoreMapping<'a> {
    data: &'a [u8],
}

impl FileMapping for StoreMapping<'_> {
    fn view_bytes_at(&self, offset: usize) -> &[u8] {
        &self.data[offset..]
    }

    fn release_up_to(&self, _offset: usize) {}
}

impl FileMapper for MapStore {
    fn map_file(&self, path: &Path, _size: u64) -> io::Result<Box<dyn FileMapping + '_>> {
        let data = self
            .contents
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown path"))?;
        Ok(Box::new(StoreMapping { data }))
    }
}

/// Build a manager with one inode per `(path, content)` pair, scanned
/// with the given options against an in-memory store.
fn build_manager(
    specs: &[(&str, Vec<u8>)],
    options: &InodeOptions,
) -> (InodeManager, MapStore) {
    let store = MapStore {
        contents: specs
            .iter()
            .map(|(p, c)| (PathBuf::from(p), c.clone()))
            .collect(),
    };

    let mut manager = InodeManager::new();
    for (path, content) in specs {
        let ino = manager.create_inode();
        ino.set_files(vec![SourceFile::new(
            PathBuf::from(path),
            content.len() as u64,
        )])
        .unwrap();
        ino.scan(&store, options).unwrap();
    }
    (manager, store)
}

fn nilsimsa_options(depth: usize, min_depth: usize, limit: u32) -> FileOrderOptions {
    FileOrderOptions {
        mode: FileOrderMode::Nilsimsa,
        nilsimsa_depth: depth,
        nilsimsa_min_depth: min_depth,
        nilsimsa_limit: limit,
    }
}

fn emitted(manager: &InodeManager) -> Vec<(u32, u64, String)> {
    let mut out = Vec::new();
    manager.for_each_inode(|ino| {
        let file = ino.any().unwrap();
        out.push((
            ino.num(),
            file.size,
            file.path.to_string_lossy().into_owned(),
        ));
    });
    out
}

fn run_order(
    manager: &mut InodeManager,
    options: &FileOrderOptions,
    first_inode: u32,
) -> Vec<String> {
    let progress = ProgressSnapshot::default();
    let mut order = Vec::new();
    manager
        .order_inodes(None, options, &progress, first_inode, &mut |ino: &InodeRef| {
            order.push(ino.any().unwrap().path.to_string_lossy().into_owned());
            0
        })
        .unwrap();
    order
}

#[test]
fn test_path_policy_assigns_contiguous_numbers() {
    let specs = [
        ("/b", b"bbbbbbbbbb".to_vec()),
        ("/c", b"cccccccccc".to_vec()),
        ("/a", b"aaaaaaaaaa".to_vec()),
    ];
    let (mut manager, _store) = build_manager(&specs, &InodeOptions::default());

    let options = FileOrderOptions {
        mode: FileOrderMode::Path,
        ..Default::default()
    };
    let order = run_order(&mut manager, &options, 5);

    assert_eq!(order, vec!["/a", "/b", "/c"]);
    assert_eq!(
        emitted(&manager),
        vec![
            (5, 10, "/a".to_string()),
            (6, 10, "/b".to_string()),
            (7, 10, "/c".to_string()),
        ]
    );
}

#[test]
fn test_similarity_policy_ties_break_by_size_then_path() {
    // Without a scan all coarse hashes are zero, so every inode lands
    // in one band and the size/path tiebreaks decide everything.
    let specs = [
        ("/p", vec![1u8; 20]),
        ("/q", vec![2u8; 30]),
        ("/r", vec![3u8; 40]),
        ("/s", vec![4u8; 40]),
    ];
    let (mut manager, _store) = build_manager(&specs, &InodeOptions::default());

    let options = FileOrderOptions {
        mode: FileOrderMode::Similarity,
        ..Default::default()
    };
    let order = run_order(&mut manager, &options, 0);

    assert_eq!(order, vec!["/r", "/s", "/q", "/p"]);
}

#[test]
fn test_similarity_policy_sorts_by_hash_band() {
    let scan = InodeOptions {
        with_similarity: true,
        with_nilsimsa: false,
    };
    let specs: Vec<(String, Vec<u8>)> = (0..12)
        .map(|i| {
            let content: Vec<u8> = (0u32..256)
                .map(|j| (j.wrapping_mul(i * 13 + 7) % 251) as u8)
                .collect();
            (format!("/f{i:02}"), content)
        })
        .collect();
    let spec_refs: Vec<(&str, Vec<u8>)> = specs
        .iter()
        .map(|(p, c)| (p.as_str(), c.clone()))
        .collect();
    let (mut manager, _store) = build_manager(&spec_refs, &scan);

    let options = FileOrderOptions {
        mode: FileOrderMode::Similarity,
        ..Default::default()
    };
    run_order(&mut manager, &options, 0);

    // Adjacent pairs must obey (hash asc, size desc, path asc).
    let mut keys = Vec::new();
    manager.for_each_inode(|ino| {
        keys.push((
            ino.similarity_hash().unwrap(),
            std::cmp::Reverse(ino.size().unwrap()),
            ino.any().unwrap().path.clone(),
        ));
    });
    for pair in keys.windows(2) {
        assert!(pair[0] <= pair[1], "ordering violated: {pair:?}");
    }
}

#[test]
fn test_nilsimsa_near_pair_ends_up_adjacent() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };

    let base: Vec<u8> = std::iter::repeat(b"shared content block. ")
        .take(200)
        .flatten()
        .copied()
        .collect();
    let mut near = base.clone();
    near[100] ^= 0xff;
    let far: Vec<u8> = (0..base.len() as u32)
        .map(|i| (i.wrapping_mul(2654435761) >> 11) as u8)
        .collect();

    let specs = [
        ("/far", far),
        ("/near_a", base),
        ("/near_b", near),
    ];
    let (mut manager, _store) = build_manager(&specs, &scan);

    let order = run_order(&mut manager, &nilsimsa_options(100, 10, 255), 0);

    let pos_a = order.iter().position(|p| p == "/near_a").unwrap();
    let pos_b = order.iter().position(|p| p == "/near_b").unwrap();
    assert_eq!(
        pos_a.abs_diff(pos_b),
        1,
        "near-identical inodes must be emitted adjacently: {order:?}"
    );
}

#[test]
fn test_nilsimsa_empty_inode_is_emitted_first() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs = [
        ("/data1", vec![1u8; 512]),
        ("/empty", Vec::new()),
        ("/data2", vec![2u8; 256]),
        ("/data3", vec![3u8; 128]),
    ];
    let (mut manager, _store) = build_manager(&specs, &scan);

    let order = run_order(&mut manager, &nilsimsa_options(100, 10, 255), 7);

    assert_eq!(order[0], "/empty");
    assert_eq!(order.len(), 4);

    // The empty inode got the first number.
    manager.for_each_inode(|ino| {
        if ino.size().unwrap() == 0 {
            assert_eq!(ino.num(), 7);
        } else {
            assert!(ino.num() > 7);
        }
    });
}

#[test]
fn test_nilsimsa_single_inode() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs = [("/only", vec![9u8; 64])];
    let (mut manager, _store) = build_manager(&specs, &scan);

    let order = run_order(&mut manager, &nilsimsa_options(2000, 500, 255), 42);
    assert_eq!(order, vec!["/only"]);
    manager.for_each_inode(|ino| assert_eq!(ino.num(), 42));
}

#[test]
fn test_nilsimsa_limit_zero_stops_at_first_candidate() {
    // With the early-exit threshold at zero, every window scan accepts
    // the tail candidate, so emission is exactly the reversed presort:
    // (size desc, name asc, path asc).
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs = [
        ("/dir/bb", vec![1u8; 300]),
        ("/dir/aa", vec![2u8; 300]),
        ("/dir/cc", vec![3u8; 100]),
        ("/dir/dd", vec![4u8; 200]),
    ];
    let (mut manager, _store) = build_manager(&specs, &scan);

    let order = run_order(&mut manager, &nilsimsa_options(100, 10, 0), 0);
    assert_eq!(order, vec!["/dir/aa", "/dir/bb", "/dir/dd", "/dir/cc"]);
}

#[test]
fn test_nilsimsa_is_deterministic_with_constant_fill() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs: Vec<(String, Vec<u8>)> = (0..60)
        .map(|i: u32| {
            let content: Vec<u8> = (0..512u32)
                .map(|j| (j.wrapping_mul(i + 3).wrapping_add(i * 17) % 255) as u8)
                .collect();
            (format!("/n{i:03}"), content)
        })
        .collect();
    let spec_refs: Vec<(&str, Vec<u8>)> = specs
        .iter()
        .map(|(p, c)| (p.as_str(), c.clone()))
        .collect();

    let options = nilsimsa_options(16, 4, 250);

    let (mut first, _s1) = build_manager(&spec_refs, &scan);
    let first_order = run_order(&mut first, &options, 0);

    let (mut second, _s2) = build_manager(&spec_refs, &scan);
    let second_order = run_order(&mut second, &options, 0);

    assert_eq!(first_order, second_order);
}

#[test]
fn test_nilsimsa_emits_every_inode_exactly_once() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs: Vec<(String, Vec<u8>)> = (0..200)
        .map(|i: u32| {
            let content: Vec<u8> = (0..64u32).map(|j| ((i * 31 + j * 7) % 256) as u8).collect();
            (format!("/m{i:03}"), content)
        })
        .collect();
    let spec_refs: Vec<(&str, Vec<u8>)> = specs
        .iter()
        .map(|(p, c)| (p.as_str(), c.clone()))
        .collect();
    let (mut manager, _store) = build_manager(&spec_refs, &scan);

    let order = run_order(&mut manager, &nilsimsa_options(8, 2, 255), 100);

    assert_eq!(order.len(), 200);
    let mut sorted = order.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 200, "every inode must be emitted once");

    let nums: Vec<u32> = {
        let mut nums = Vec::new();
        manager.for_each_inode(|ino| nums.push(ino.num()));
        nums
    };
    assert_eq!(nums, (100..300).collect::<Vec<u32>>());
}

#[test]
fn test_nilsimsa_min_depth_clamped_to_max() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    let specs: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i: u32| (format!("/c{i:02}"), vec![(i % 256) as u8; 128]))
        .collect();
    let spec_refs: Vec<(&str, Vec<u8>)> = specs
        .iter()
        .map(|(p, c)| (p.as_str(), c.clone()))
        .collect();
    let (mut manager, _store) = build_manager(&spec_refs, &scan);

    // min_depth larger than depth: must clamp instead of panicking,
    // and the published depth never exceeds the maximum.
    let progress = ProgressSnapshot::default();
    let mut calls = 0;
    manager
        .order_inodes(
            None,
            &nilsimsa_options(5, 5000, 255),
            &progress,
            0,
            &mut |_: &InodeRef| {
                calls += 1;
                1024
            },
        )
        .unwrap();

    assert_eq!(calls, 20);
    assert_eq!(progress.nilsimsa_depth.load(Ordering::Relaxed), 5);
}

#[test]
fn test_depth_adapts_toward_fill_target() {
    let scan = InodeOptions {
        with_similarity: false,
        with_nilsimsa: true,
    };
    // Enough inodes to get past the adaptation warmup.
    let specs: Vec<(String, Vec<u8>)> = (0..6000)
        .map(|i: u32| {
            let content: Vec<u8> = (0..32u32)
                .map(|j| (i.wrapping_mul(97).wrapping_add(j * 11) % 256) as u8)
                .collect();
            (format!("/g{i:05}"), content)
        })
        .collect();
    let spec_refs: Vec<(&str, Vec<u8>)> = specs
        .iter()
        .map(|(p, c)| (p.as_str(), c.clone()))
        .collect();
    let (mut manager, _store) = build_manager(&spec_refs, &scan);

    let progress = ProgressSnapshot::default();
    let mut depth_trace = Vec::new();
    {
        let trace = &mut depth_trace;
        let progress_ref = &progress;
        manager
            .order_inodes(
                None,
                &nilsimsa_options(2000, 500, 0),
                progress_ref,
                0,
                &mut |_: &InodeRef| {
                    trace.push(progress_ref.nilsimsa_depth.load(Ordering::Relaxed));
                    // Constant fill of half scale targets depth 1000.
                    1024
                },
            )
            .unwrap();
    }

    // Depth starts at the maximum, decreases monotonically toward the
    // target, and never leaves [min_depth, max_depth].
    assert_eq!(depth_trace[0], 2000);
    for pair in depth_trace.windows(2) {
        assert!(pair[1] <= pair[0], "depth must not rebound: {pair:?}");
    }
    let last = *depth_trace.last().unwrap();
    assert!(last < 2000, "depth must have adapted");
    assert!((500..=2000).contains(&last));
}
