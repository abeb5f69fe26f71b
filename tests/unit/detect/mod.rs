use std::sync::atomic::AtomicUsize;

use super::*;
use crate::foundation::core::Point;
use crate::landmarks::normalize::ContourKind;
use crate::landmarks::synthetic::synthetic_face_contours;

struct SlowDetector(Duration);

impl LandmarkDetector for SlowDetector {
    fn detect(&self, _frame: &Frame) -> BitterResult<Vec<NativeContours>> {
        std::thread::sleep(self.0);
        Ok(vec![synthetic_face_contours(Point::new(8.0, 8.0), 10.0)])
    }
}

struct FailingDetector;

impl LandmarkDetector for FailingDetector {
    fn detect(&self, _frame: &Frame) -> BitterResult<Vec<NativeContours>> {
        Err(BitterError::detection("model not loaded"))
    }
}

fn frame() -> Arc<Frame> {
    Arc::new(Frame::rgba8(16, 16, vec![0; 16 * 16 * 4]).unwrap())
}

/// Blocks its first call until released; counts every call.
struct GatedDetector {
    calls: AtomicUsize,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
}

impl LandmarkDetector for GatedDetector {
    fn detect(&self, _frame: &Frame) -> BitterResult<Vec<NativeContours>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gate.lock().take() {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        Ok(Vec::new())
    }
}

struct PanickingDetector(AtomicUsize);

impl LandmarkDetector for PanickingDetector {
    fn detect(&self, _frame: &Frame) -> BitterResult<Vec<NativeContours>> {
        if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("detector crashed");
        }
        Ok(Vec::new())
    }
}

fn wait_idle(worker: &DetectionWorker) {
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while worker.is_busy() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!worker.is_busy());
}

#[test]
fn fast_detection_returns_faces() {
    let worker = DetectionWorker::new(Arc::new(SlowDetector(Duration::ZERO)));
    let out = worker.detect(frame(), Duration::from_secs(2));
    assert!(!out.timed_out());
    assert_eq!(out.into_faces().len(), 1);
}

#[test]
fn overrun_counts_as_zero_faces() {
    let worker = DetectionWorker::new(Arc::new(SlowDetector(Duration::from_millis(500))));
    let started = std::time::Instant::now();
    let out = worker.detect(frame(), Duration::from_millis(50));
    assert!(out.timed_out());
    assert!(out.into_faces().is_empty());
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[test]
fn detector_errors_become_zero_faces() {
    let worker = DetectionWorker::new(Arc::new(FailingDetector));
    let out = worker.detect(frame(), Duration::from_secs(1));
    assert!(matches!(out, DetectionOutcome::Failed(_)));
    assert!(out.into_faces().is_empty());
}

#[test]
fn hung_detection_is_never_stacked() {
    let (release, gate) = mpsc::channel();
    let detector = Arc::new(GatedDetector {
        calls: AtomicUsize::new(0),
        gate: Mutex::new(Some(gate)),
    });
    let worker = DetectionWorker::new(detector.clone());

    assert!(worker.detect(frame(), Duration::from_millis(5)).timed_out());
    for _ in 0..20 {
        let out = worker.detect(frame(), Duration::from_millis(5));
        assert!(out.is_busy(), "{out:?}");
    }
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);

    release.send(()).unwrap();
    wait_idle(&worker);
    let out = worker.detect(frame(), Duration::from_secs(2));
    assert!(matches!(out, DetectionOutcome::Faces(_)), "{out:?}");
    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn worker_survives_a_panicking_detector() {
    let worker = DetectionWorker::new(Arc::new(PanickingDetector(AtomicUsize::new(0))));
    let out = worker.detect(frame(), Duration::from_secs(2));
    assert!(matches!(out, DetectionOutcome::Failed(_)), "{out:?}");
    wait_idle(&worker);
    let out = worker.detect(frame(), Duration::from_secs(2));
    assert!(matches!(out, DetectionOutcome::Faces(_)), "{out:?}");
}

#[test]
fn incomplete_faces_are_skipped() {
    let good = synthetic_face_contours(Point::new(100.0, 100.0), 80.0);
    let mut bad = good.clone();
    bad.remove(ContourKind::NoseBottom);
    let sets = landmark_sets(&[good, bad]);
    assert_eq!(sets.len(), 1);
}

#[test]
fn contour_file_accepts_one_face_or_many() {
    let face = synthetic_face_contours(Point::new(50.0, 50.0), 40.0);
    let one = serde_json::to_string(&face).unwrap();
    let many = serde_json::to_string(&vec![face.clone(), face.clone()]).unwrap();

    assert_eq!(ContourFileDetector::from_json(&one).unwrap().faces().len(), 1);
    let det = ContourFileDetector::from_json(&many).unwrap();
    assert_eq!(det.detect(&frame()).unwrap(), vec![face.clone(), face]);

    assert!(ContourFileDetector::from_json("{\"face_oval\": 3}").is_err());
}

#[test]
fn contour_file_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("face.json");
    let face = synthetic_face_contours(Point::new(50.0, 50.0), 40.0);
    std::fs::write(&path, serde_json::to_string(&face).unwrap()).unwrap();
    let det = ContourFileDetector::from_path(&path).unwrap();
    assert_eq!(det.faces(), &[face]);

    assert!(ContourFileDetector::from_path(&dir.path().join("missing.json")).is_err());
}
