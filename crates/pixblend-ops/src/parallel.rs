//! Data-parallel pixel mapping.
//!
//! With the `parallel` feature the work is split across Rayon's pool in
//! fixed-size blocks; without it the same closure runs sequentially.
//! Both paths produce identical output.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Pixels handed to one task.
const PIXELS_PER_TASK: usize = 4096;

/// Maps every pixel of `src` into a new buffer.
///
/// `f` receives the global pixel index, the source pixel
/// (`src_channels` floats) and the destination pixel (`dst_channels` floats).
pub(crate) fn map_pixels<F>(src: &[f32], src_channels: usize, dst_channels: usize, f: F) -> Vec<f32>
where
    F: Fn(usize, &[f32], &mut [f32]) + Send + Sync,
{
    let pixels = src.len() / src_channels;
    let mut dst = vec![0.0f32; pixels * dst_channels];
    let block = PIXELS_PER_TASK * dst_channels;

    let run = |(task, out): (usize, &mut [f32])| {
        let first = task * PIXELS_PER_TASK;
        for (i, px) in out.chunks_exact_mut(dst_channels).enumerate() {
            let idx = first + i;
            f(idx, &src[idx * src_channels..(idx + 1) * src_channels], px);
        }
    };

    #[cfg(feature = "parallel")]
    dst.par_chunks_mut(block).enumerate().for_each(run);
    #[cfg(not(feature = "parallel"))]
    dst.chunks_mut(block).enumerate().for_each(run);

    dst
}

/// Fills `dst` row by row; `f` receives the row index and the row slice.
pub(crate) fn for_each_row<F>(dst: &mut [f32], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    #[cfg(feature = "parallel")]
    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
    #[cfg(not(feature = "parallel"))]
    dst.chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_pixels_visits_every_index() {
        let src: Vec<f32> = (0..10_000).map(|i| i as f32).collect();
        let dst = map_pixels(&src, 1, 2, |idx, s, d| {
            d[0] = s[0];
            d[1] = idx as f32;
        });
        assert_eq!(dst.len(), 20_000);
        for (i, px) in dst.chunks_exact(2).enumerate() {
            assert_eq!(px[0], i as f32);
            assert_eq!(px[1], i as f32);
        }
    }

    #[test]
    fn test_rows_get_their_index() {
        let mut dst = vec![0.0f32; 12];
        for_each_row(&mut dst, 3, |y, row| row.fill(y as f32));
        assert_eq!(&dst[9..], &[3.0, 3.0, 3.0]);
    }
}
