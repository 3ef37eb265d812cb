// src/encoder.rs

//! Builds change-run sequences on the renderer side by comparing the frame
//! just drawn with the one before it.
//!
//! The output alternates skip and copy counts, always starting with a skip
//! (possibly 0), and covers exactly `height` rows. A run longer than
//! `u16::MAX` rows is split by a zero-length run of the other kind so the
//! parity stays correct.

/// Compares `previous` and `current` row by row.
///
/// When the two buffers differ in length (first frame, or the frame after a
/// resize) every row is reported as changed.
pub fn encode_change_runs(previous: &[u8], current: &[u8], pitch: usize, height: usize) -> Vec<u16> {
    let all_dirty = previous.len() != current.len() || pitch == 0;
    let mut encoder = RunEncoder::default();
    for y in 0..height {
        let dirty = all_dirty || {
            let range = y * pitch..(y + 1) * pitch;
            previous.get(range.clone()) != current.get(range)
        };
        encoder.push(dirty);
    }
    encoder.finish()
}

/// Every row of a `height`-row surface changed.
pub fn full_frame_runs(height: usize) -> Vec<u16> {
    let mut encoder = RunEncoder::default();
    for _ in 0..height {
        encoder.push(true);
    }
    encoder.finish()
}

/// Accumulates per-row dirty flags into alternating counts.
#[derive(Debug, Default)]
struct RunEncoder {
    runs: Vec<u16>,
    /// Length of the run currently being counted.
    current: u16,
    /// Kind of the run being counted: false = skip, true = copy.
    copying: bool,
}

impl RunEncoder {
    fn push(&mut self, dirty: bool) {
        if dirty != self.copying {
            self.runs.push(self.current);
            self.current = 0;
            self.copying = dirty;
        }
        if self.current == u16::MAX {
            self.runs.push(u16::MAX);
            self.runs.push(0);
            self.current = 0;
        }
        self.current += 1;
    }

    fn finish(mut self) -> Vec<u16> {
        if self.current > 0 || self.runs.is_empty() {
            self.runs.push(self.current);
        }
        self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::dirty_rows;
    use test_log::test;

    fn frame(rows: &[u8], pitch: usize) -> Vec<u8> {
        rows.iter().flat_map(|&v| vec![v; pitch]).collect()
    }

    #[test]
    fn identical_frames_skip_everything() {
        let a = frame(&[1, 2, 3], 4);
        assert_eq!(encode_change_runs(&a, &a, 4, 3), vec![3]);
    }

    #[test]
    fn changed_rows_become_copy_runs() {
        let a = frame(&[1, 2, 3, 4, 5], 4);
        let b = frame(&[9, 2, 3, 9, 9], 4);
        assert_eq!(encode_change_runs(&a, &b, 4, 5), vec![0, 1, 2, 2]);
    }

    #[test]
    fn trailing_skip_is_kept() {
        let a = frame(&[1, 2, 3], 4);
        let b = frame(&[1, 7, 3], 4);
        assert_eq!(encode_change_runs(&a, &b, 4, 3), vec![1, 1, 1]);
    }

    #[test]
    fn size_mismatch_marks_everything_dirty() {
        let b = frame(&[1, 2], 4);
        assert_eq!(encode_change_runs(&[], &b, 4, 2), vec![0, 2]);
        assert_eq!(full_frame_runs(2), vec![0, 2]);
    }

    #[test]
    fn zero_height_is_a_single_empty_skip() {
        assert_eq!(encode_change_runs(&[], &[], 4, 0), vec![0]);
    }

    #[test]
    fn long_runs_split_without_breaking_parity() {
        let height = usize::from(u16::MAX) + 10;
        let runs = full_frame_runs(height);
        assert_eq!(runs, vec![0, u16::MAX, 0, 10]);

        let total: usize = dirty_rows(&runs, height).map(|s| s.row_count).sum();
        assert_eq!(total, height);
    }

    #[test]
    fn encoded_runs_decode_to_the_changed_rows() {
        let a = frame(&[0, 0, 0, 0, 0, 0, 0, 0], 8);
        let b = frame(&[0, 1, 1, 0, 0, 1, 0, 1], 8);
        let runs = encode_change_runs(&a, &b, 8, 8);
        let spans: Vec<_> = dirty_rows(&runs, 8)
            .map(|s| (s.start_row, s.row_count))
            .collect();
        assert_eq!(spans, vec![(1, 2), (5, 1), (7, 1)]);
    }
}
