use dupetree::duplicates::{DetectError, DetectorConfig, PairSim, RedundancyDetector};
use dupetree::progress::ProgressCallback;
use dupetree::scanner::path_utils::is_descendant_or_equal;
use dupetree::scanner::source::MemorySource;
use dupetree::scanner::{FingerprintIndex, Fingerprinter, Walker, WalkerConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn index_of(source: &MemorySource) -> FingerprintIndex {
    Walker::new(WalkerConfig::default())
        .walk(source, &Fingerprinter::default())
        .unwrap()
        .index
}

/// Two photo albums that mostly overlap, plus an unrelated folder.
fn albums() -> MemorySource {
    MemorySource::new()
        .with_file("2019/beach.jpg", b"sand and sea")
        .with_file("2019/city.jpg", b"tall buildings")
        .with_file("2019/forest.jpg", b"trees")
        .with_file("2019-backup/beach.jpg", b"sand and sea")
        .with_file("2019-backup/city.jpg", b"tall buildings")
        .with_file("2019-backup/extra.jpg", b"only in the backup")
        .with_file("taxes/2019.pdf", b"numbers")
}

fn pair<'a>(pairs: &'a [PairSim], a: &str, b: &str) -> Option<&'a PairSim> {
    pairs.iter().find(|p| p.path_a == a && p.path_b == b)
}

#[test]
fn test_partial_overlap_is_reported_with_ratio() {
    let pairs = RedundancyDetector::with_defaults()
        .detect(&index_of(&albums()))
        .unwrap();

    let albums = pair(&pairs, "2019", "2019-backup").unwrap();
    let sim = albums.similarity;
    assert_eq!(sim.bytes_same, 12 + 14);
    assert_eq!(sim.bytes_diff, 5 + 18);
    assert_eq!(sim.path_similarity, 1.0);
    assert!(!sim.is_identical());

    // taxes shares nothing with either album
    assert!(pairs.iter().all(|p| p.path_a != "taxes" && p.path_b != "taxes"));
    assert_eq!(pairs.len(), 1);
}

#[test]
fn test_disjoint_pairs_when_requested() {
    let detector = RedundancyDetector::new(DetectorConfig::default().with_include_disjoint(true));
    let pairs = detector.detect(&index_of(&albums())).unwrap();

    assert_eq!(pairs.len(), 3);
    // zero overlap sorts first
    assert_eq!(pairs[0].similarity.bytes_same, 0);
    assert_eq!(pairs[1].similarity.bytes_same, 0);
    assert_eq!(pairs[2].path_a, "2019");
}

#[test]
fn test_identical_copies_hide_their_contents() {
    let source = MemorySource::new()
        .with_file("projects/app/src/main.rs", b"fn main() {}")
        .with_file("projects/app/README", b"readme")
        .with_file("projects/notes.txt", b"todo")
        .with_file("old/projects/app/src/main.rs", b"fn main() {}")
        .with_file("old/projects/app/README", b"readme")
        .with_file("old/projects/notes.txt", b"todo")
        .with_file("old/misc", b"misc");

    let pairs = RedundancyDetector::with_defaults()
        .detect(&index_of(&source))
        .unwrap();

    let top = pairs.last().unwrap();
    assert_eq!((top.path_a.as_str(), top.path_b.as_str()), ("old/projects", "projects"));
    assert!(top.similarity.is_identical());

    // nothing inside either copy is reported against the other
    for p in &pairs {
        let inside_a = is_descendant_or_equal("projects", &p.path_a)
            || is_descendant_or_equal("old/projects", &p.path_a);
        let inside_b = is_descendant_or_equal("projects", &p.path_b)
            || is_descendant_or_equal("old/projects", &p.path_b);
        if (p.path_a.as_str(), p.path_b.as_str()) != ("old/projects", "projects") {
            assert!(!(inside_a && inside_b), "unexpected pair {}", p);
        }
    }
    // the parent of one copy against the other copy is dropped too
    assert!(pair(&pairs, "old", "projects").is_none());
}

#[test]
fn test_parallel_detection_matches_sequential() {
    let source = albums()
        .with_file("2019-copy/beach.jpg", b"sand and sea")
        .with_file("2019-copy/city.jpg", b"tall buildings")
        .with_file("2019-copy/forest.jpg", b"trees")
        .with_file("archive/2019/beach.jpg", b"sand and sea");
    let index = index_of(&source);

    let sequential = RedundancyDetector::with_defaults().detect(&index).unwrap();
    let parallel = RedundancyDetector::new(DetectorConfig::default().with_threads(4))
        .detect(&index)
        .unwrap();
    assert_eq!(sequential, parallel);
    assert!(!sequential.is_empty());
}

#[derive(Default)]
struct Counter {
    phases: Mutex<Vec<(String, usize)>>,
    ticks: AtomicUsize,
}

impl ProgressCallback for Counter {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.phases.lock().unwrap().push((phase.to_string(), total));
    }

    fn on_progress(&self, _current: usize, _path: &str) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn on_phase_end(&self, phase: &str) {
        self.phases.lock().unwrap().push((format!("end {phase}"), 0));
    }
}

#[test]
fn test_progress_reports_compare_phase() {
    let counter = Arc::new(Counter::default());
    let detector = RedundancyDetector::new(
        DetectorConfig::default().with_progress_callback(counter.clone() as Arc<dyn ProgressCallback>),
    );
    detector.detect(&index_of(&albums())).unwrap();

    let phases = counter.phases.lock().unwrap().clone();
    // ".", "2019", "2019-backup", "taxes": root is an ancestor of all
    assert_eq!(
        phases,
        vec![("compare".to_string(), 3), ("end compare".to_string(), 0)]
    );
    assert_eq!(counter.ticks.load(Ordering::SeqCst), 3);
}

#[test]
fn test_raised_flag_interrupts_detection() {
    let flag = Arc::new(AtomicBool::new(true));
    let detector = RedundancyDetector::new(DetectorConfig::default().with_shutdown_flag(flag));
    let result = detector.detect(&index_of(&albums()));
    assert!(matches!(result, Err(DetectError::Interrupted)));
}
