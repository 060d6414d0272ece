//! Threaded pipeline tests with scripted panorama sources

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::render_loop::RenderLoop;
use super::*;
use crate::camera::CameraKind;
use crate::core::PipelineConfig;
use crate::scene::{Node, NodeValue};

const DEADLINE: Duration = Duration::from_secs(10);

fn config() -> PipelineConfig {
    PipelineConfig { idle_backoff_ms: 1 }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

/// Emits one solid-color frame per entry of `colors`, then reports no change
struct SolidColorSource {
    size: FrameSize,
    colors: Vec<u32>,
    next: usize,
    frame: Vec<u32>,
    render_time: Duration,
    started: Option<Sender<()>>,
    unmaps: Arc<AtomicUsize>,
}

impl SolidColorSource {
    fn new(size: FrameSize, colors: Vec<u32>) -> Self {
        Self {
            size,
            colors,
            next: 0,
            frame: vec![0; size.pixel_count()],
            render_time: Duration::ZERO,
            started: None,
            unmaps: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PanoramaSource for SolidColorSource {
    fn frame_size(&self) -> FrameSize {
        self.size
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        if let Some(started) = &self.started {
            let _ = started.try_send(());
        }
        let Some(&color) = self.colors.get(self.next) else {
            return Ok(FrameStatus::Unchanged);
        };
        self.frame.fill(color);
        std::thread::sleep(self.render_time);
        self.next += 1;
        Ok(FrameStatus::Rendered)
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.frame)
    }

    fn unmap(&mut self) {
        self.unmaps.fetch_add(1, Ordering::SeqCst);
    }
}

/// Source with a scene graph that counts its commits
struct CountingSource {
    root: Node,
    commits: Arc<AtomicUsize>,
    frame: Vec<u32>,
}

impl CountingSource {
    fn new(commits: Arc<AtomicUsize>) -> Self {
        let root = Node::group("renderer").with_child(
            Node::group("camera")
                .with_child(Node::group("panoramic").with_child(Node::leaf("fovy", NodeValue::Float(60.0))))
                .with_child(Node::leaf("active", NodeValue::String("panoramic".into()))),
        );
        Self {
            root,
            commits,
            frame: vec![0; FrameSize::panorama(2).pixel_count()],
        }
    }
}

impl PanoramaSource for CountingSource {
    fn frame_size(&self) -> FrameSize {
        FrameSize::panorama(2)
    }

    fn scene_graph(&self) -> Option<&Node> {
        Some(&self.root)
    }

    fn scene_graph_mut(&mut self) -> Option<&mut Node> {
        Some(&mut self.root)
    }

    fn commit(&mut self) -> Result<(), SourceError> {
        self.root.commit();
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn apply(&mut self, command: SceneCommand) -> Result<(), SourceError> {
        if let SceneCommand::MarkModified(kind) = command {
            self.root
                .find_mut(&["camera", kind.node_name()])
                .ok_or_else(|| SourceError::Render("no camera".into()))?
                .mark_as_modified();
        }
        Ok(())
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        Ok(FrameStatus::Rendered)
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.frame)
    }
}

fn render_loop(source: impl PanoramaSource + 'static) -> (RenderLoop, Arc<PixelRelay>, Sender<SceneCommand>) {
    let relay = Arc::new(PixelRelay::new(source.frame_size()));
    let (tx, rx): (Sender<SceneCommand>, Receiver<SceneCommand>) = crossbeam_channel::unbounded();
    let render_loop = RenderLoop::new(Box::new(source), Arc::clone(&relay), rx, Duration::ZERO);
    (render_loop, relay, tx)
}

#[test]
fn test_rendered_frame_raises_flag() {
    let size = FrameSize::panorama(4);
    let (mut render_loop, relay, _tx) = render_loop(SolidColorSource::new(size, vec![0xff00_00ff]));

    assert_eq!(render_loop.run_iteration().unwrap(), FrameStatus::Rendered);
    assert!(relay.has_new_frame());
    assert!(relay.acquire_for_read().iter().all(|&p| p == 0xff00_00ff));
    assert!(!relay.has_new_frame());

    // Source is exhausted: nothing new is published
    assert_eq!(render_loop.run_iteration().unwrap(), FrameStatus::Unchanged);
    assert!(!relay.has_new_frame());
    assert_eq!(relay.published_frames(), 1);
}

#[test]
fn test_unmap_runs_when_publish_fails() {
    let mut source = SolidColorSource::new(FrameSize::panorama(4), vec![1]);
    source.frame.truncate(3);
    let unmaps = Arc::clone(&source.unmaps);
    let (mut render_loop, relay, _tx) = render_loop(source);

    let result = render_loop.run_iteration();
    assert!(matches!(result, Err(PipelineError::FrameSizeMismatch { expected: 32, actual: 3 })));
    assert_eq!(unmaps.load(Ordering::SeqCst), 1);
    assert!(!relay.has_new_frame());
}

#[test]
fn test_recommit_only_after_modification() {
    let commits = Arc::new(AtomicUsize::new(0));
    let (mut render_loop, _relay, tx) = render_loop(CountingSource::new(Arc::clone(&commits)));

    // First iteration always commits
    render_loop.run_iteration().unwrap();
    assert_eq!(commits.load(Ordering::SeqCst), 1);
    let first_commit = render_loop.last_commit();
    assert!(first_commit.is_some());

    render_loop.run_iteration().unwrap();
    render_loop.run_iteration().unwrap();
    assert_eq!(commits.load(Ordering::SeqCst), 1);

    tx.send(SceneCommand::MarkModified(CameraKind::Panoramic)).unwrap();
    render_loop.run_iteration().unwrap();
    assert_eq!(commits.load(Ordering::SeqCst), 2);
    assert!(render_loop.last_commit() > first_commit);

    render_loop.run_iteration().unwrap();
    assert_eq!(commits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reader_never_sees_torn_frame() {
    const FRAMES: u32 = 200;
    let size = FrameSize::panorama(32);
    let source = SolidColorSource::new(size, (1..=FRAMES).collect());
    let mut controller = PipelineController::start(Box::new(source), &config()).unwrap();
    let handle = controller.handle();

    let reader = std::thread::spawn(move || {
        let relay = handle.relay();
        let mut reads = 0;
        let mut last_seen = 0;
        while relay.published_frames() < u64::from(FRAMES) || relay.has_new_frame() {
            if relay.has_new_frame() {
                let pixels = relay.acquire_for_read();
                let first = pixels[0];
                assert!(pixels.iter().all(|&p| p == first), "torn frame starting with {first}");
                assert!(first >= last_seen, "frame {first} arrived after {last_seen}");
                last_seen = first;
                reads += 1;
            }
            std::hint::spin_loop();
        }
        (reads, last_seen)
    });

    let (reads, last_seen) = reader.join().unwrap();
    assert!(reads >= 1);
    assert_eq!(last_seen, FRAMES);
    controller.shutdown();
    assert_eq!(controller.health(), PipelineHealth::Stopped);
}

#[test]
fn test_shutdown_waits_for_frame_in_flight() {
    let render_time = Duration::from_millis(200);
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let mut source = SolidColorSource::new(FrameSize::panorama(8), vec![7; 100]);
    source.render_time = render_time;
    source.started = Some(started_tx);

    let mut controller = PipelineController::start(Box::new(source), &config()).unwrap();
    started_rx.recv_timeout(DEADLINE).unwrap();

    let requested = Instant::now();
    controller.shutdown();
    let waited = requested.elapsed();

    assert!(waited < render_time + Duration::from_secs(2), "shutdown took {waited:?}");
    assert_eq!(controller.health(), PipelineHealth::Stopped);
    // A second call is a no-op
    controller.shutdown();
}

#[test]
fn test_five_frame_scenario_with_twenty_polls() {
    let size = FrameSize::panorama(1024);
    assert_eq!(size, FrameSize::new(2048, 1024));
    let colors: Vec<u32> = (1..=5u8).map(|i| pack_rgba(i * 40, 255 - i * 40, i, 255)).collect();
    let mut source = SolidColorSource::new(size, colors.clone());
    source.render_time = Duration::from_millis(5);

    let controller = PipelineController::start(Box::new(source), &config()).unwrap();
    let relay = Arc::clone(controller.relay());

    let mut texture: Option<u32> = None;
    let mut uploaded = 0;
    let mut skipped = 0;
    for poll in 0..20 {
        if poll == 19 {
            // Make the last poll observe the final frame
            assert!(wait_until(|| relay.published_frames() == 5));
        }
        if relay.has_new_frame() {
            let pixels = relay.acquire_for_read();
            assert_eq!(pixels.len(), size.pixel_count());
            texture = Some(pixels[pixels.len() - 1]);
            uploaded += 1;
        } else {
            skipped += 1;
        }
        std::thread::sleep(Duration::from_millis(3));
    }

    assert_eq!(texture, Some(colors[4]));
    assert!((1..=5).contains(&uploaded));
    assert_eq!(uploaded + skipped, 20);
    assert!(skipped >= 15);
}

struct FailingSource {
    fail_after: usize,
    rendered: usize,
    panic: bool,
    frame: Vec<u32>,
}

impl PanoramaSource for FailingSource {
    fn frame_size(&self) -> FrameSize {
        FrameSize::panorama(2)
    }

    fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
        if self.rendered == self.fail_after {
            if self.panic {
                panic!("renderer exploded");
            }
            return Err(SourceError::Render("out of memory".into()));
        }
        self.frame.fill(self.rendered as u32 + 1);
        self.rendered += 1;
        Ok(FrameStatus::Rendered)
    }

    fn map_completed(&mut self) -> Result<&[u32], SourceError> {
        Ok(&self.frame)
    }
}

#[test]
fn test_source_failure_degrades_pipeline() {
    let source = FailingSource { fail_after: 2, rendered: 0, panic: false, frame: vec![0; 8] };
    let controller = PipelineController::start(Box::new(source), &config()).unwrap();
    let handle = controller.handle();

    assert!(wait_until(|| handle.health() != PipelineHealth::Running));
    match handle.health() {
        PipelineHealth::Degraded(reason) => assert!(reason.contains("out of memory"), "{reason}"),
        other => panic!("unexpected health {other:?}"),
    }
    // Last good frame is still there
    assert_eq!(handle.relay().published_frames(), 2);
    assert!(handle.relay().acquire_for_read().iter().all(|&p| p == 2));
    // Render thread is gone, commands are dropped
    assert!(!handle.send(SceneCommand::ActivateCamera(CameraKind::Panoramic)));
}

#[test]
fn test_source_panic_degrades_pipeline() {
    let source = FailingSource { fail_after: 0, rendered: 0, panic: true, frame: vec![0; 8] };
    let controller = PipelineController::start(Box::new(source), &config()).unwrap();

    assert!(wait_until(|| controller.health() != PipelineHealth::Running));
    match controller.health() {
        PipelineHealth::Degraded(reason) => assert!(reason.contains("renderer exploded"), "{reason}"),
        other => panic!("unexpected health {other:?}"),
    }
}

#[test]
fn test_dropping_controller_stops_thread() {
    let stopped = Arc::new(AtomicBool::new(false));

    struct DropFlag(Arc<AtomicBool>);
    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Wrapped {
        inner: SolidColorSource,
        _flag: DropFlag,
    }
    impl PanoramaSource for Wrapped {
        fn frame_size(&self) -> FrameSize {
            self.inner.frame_size()
        }
        fn render_one_frame(&mut self) -> Result<FrameStatus, SourceError> {
            self.inner.render_one_frame()
        }
        fn map_completed(&mut self) -> Result<&[u32], SourceError> {
            self.inner.map_completed()
        }
    }

    let source = Wrapped {
        inner: SolidColorSource::new(FrameSize::panorama(2), vec![]),
        _flag: DropFlag(Arc::clone(&stopped)),
    };
    let controller = PipelineController::start(Box::new(source), &config()).unwrap();
    drop(controller);
    // The join in Drop guarantees the source was dropped on the render thread
    assert!(stopped.load(Ordering::SeqCst));
}
