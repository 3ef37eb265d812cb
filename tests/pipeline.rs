// tests/pipeline.rs

//! Drives the public API the way an emulator host does: size, update,
//! publish, resize, and checks a mirroring consumer stays in sync.

use dosframe::encoder::{encode_change_runs, full_frame_runs};
use dosframe::{
    BusyReason, FrameSink, MirrorSink, RecordingSink, Rgb, SinkEvent, SurfaceError, VideoOutput,
};
use test_log::test;

/// Sink that forwards to two sinks, so one run can be both recorded and
/// mirrored.
struct Tee<A, B>(A, B);

impl<A: FrameSink, B: FrameSink> FrameSink for Tee<A, B> {
    fn on_resize(&mut self, width: usize, height: usize) {
        self.0.on_resize(width, height);
        self.1.on_resize(width, height);
    }

    fn on_frame_open(&mut self) {
        self.0.on_frame_open();
        self.1.on_frame_open();
    }

    fn on_frame_rows(&mut self, start_row: usize, row_count: usize, pixels: &[u8]) {
        self.0.on_frame_rows(start_row, row_count, pixels);
        self.1.on_frame_rows(start_row, row_count, pixels);
    }

    fn on_frame_close(&mut self) {
        self.0.on_frame_close();
        self.1.on_frame_close();
    }
}

fn render<S: FrameSink>(
    video: &mut VideoOutput<S>,
    previous: &mut Vec<u8>,
    paint: impl Fn(usize, usize) -> Rgb,
) {
    let (current, pitch, height) = {
        let mut view = video.begin_update().expect("session should open");
        for y in 0..view.height() {
            for x in 0..view.width() {
                view.put_pixel(x, y, paint(x, y));
            }
        }
        let (pitch, height) = (view.pitch(), view.height());
        (view.pixels_mut().to_vec(), pitch, height)
    };
    let runs = encode_change_runs(previous, &current, pitch, height);
    video.end_update(Some(runs.as_slice())).expect("session was open");
    *previous = current;
}

#[test]
fn mirror_tracks_the_surface_across_a_resize() {
    let mut video = VideoOutput::new(Tee(RecordingSink::default(), MirrorSink::new()));
    let mut previous = Vec::new();

    video.ensure_size(32, 20).unwrap();
    render(&mut video, &mut previous, |x, y| Rgb::new(x as u8, y as u8, 0));
    render(&mut video, &mut previous, |x, y| {
        Rgb::new(x as u8, y as u8, if y == 7 { 0xff } else { 0 })
    });

    {
        let Tee(recorder, mirror) = video.sink();
        assert_eq!(mirror.pixels(), video.surface().unwrap().pixels());
        // The second frame only touched row 7.
        let last_rows: Vec<_> = recorder
            .events
            .iter()
            .rev()
            .take_while(|e| **e != SinkEvent::FrameOpen)
            .filter_map(|e| match e {
                SinkEvent::FrameRows {
                    start_row,
                    row_count,
                    ..
                } => Some((*start_row, *row_count)),
                _ => None,
            })
            .collect();
        assert_eq!(last_rows, vec![(7, 1)]);
    }

    video.ensure_size(64, 40).unwrap();
    render(&mut video, &mut previous, |x, y| Rgb::new(y as u8, x as u8, 1));

    let Tee(recorder, mirror) = video.sink();
    assert_eq!(mirror.dimensions(), (64, 40));
    assert_eq!(mirror.pixels(), video.surface().unwrap().pixels());
    assert_eq!(
        recorder.resizes().collect::<Vec<_>>(),
        vec![(32, 20), (64, 40)]
    );
    assert_eq!(mirror.frames(), 3);
    assert_eq!(video.frames_published(), 3);
}

#[test]
fn busy_session_skips_the_attempt_without_corrupting_output() {
    let mut video = VideoOutput::new(MirrorSink::new());
    video.ensure_size(4, 4).unwrap();

    {
        let mut view = video.begin_update().unwrap();
        view.fill(Rgb::new(3, 3, 3));
    }
    // A second producer tries to start a frame before the first closes.
    assert!(matches!(
        video.begin_update(),
        Err(SurfaceError::Busy(BusyReason::SessionOpen))
    ));
    video.end_update(Some(full_frame_runs(4).as_slice())).unwrap();

    assert_eq!(video.sink().pixels(), video.surface().unwrap().pixels());
    assert_eq!(video.sink().frames(), 1);
}

#[test]
fn frames_without_changes_publish_nothing() {
    let mut video = VideoOutput::new(RecordingSink::default());
    video.ensure_size(8, 8).unwrap();
    video.sink_mut().clear();

    video.begin_update().unwrap();
    let stats = video.end_update(None).unwrap();
    assert_eq!(stats.rows, 0);

    video.begin_update().unwrap();
    video.end_update(Some(&[][..])).unwrap();

    assert!(video.sink().events.is_empty());
}
