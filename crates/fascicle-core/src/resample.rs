//! Arc-length resampling of streamlines and per-point scalar sequences

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::types::{point_distance, Point3, ResampledStreamline, Streamline};

/// Resample a streamline to exactly `points` vertices spaced at equal
/// fractions of its total arc length, interpolating linearly between the
/// native vertices. `index` identifies the streamline in any error.
pub fn resample(index: usize, streamline: &Streamline, points: usize) -> Result<ResampledStreamline> {
    if points < 2 {
        return Err(Error::degenerate(
            index,
            format!("target point count {points} is below 2"),
        ));
    }
    let native = streamline.points();
    if native.len() < 2 {
        return Err(Error::degenerate(
            index,
            format!("{} point(s), need at least 2", native.len()),
        ));
    }

    let cumulative = cumulative_lengths(native);
    let total = *cumulative.last().unwrap_or(&0.0);
    if total <= 0.0 {
        return Err(Error::degenerate(index, "zero arc length"));
    }

    let mut out = Vec::with_capacity(points);
    // Walk the native segments once; targets are monotone in arc length.
    let mut seg = 0usize;
    for k in 0..points {
        let target = total * k as f32 / (points - 1) as f32;
        while seg + 1 < cumulative.len() - 1 && cumulative[seg + 1] < target {
            seg += 1;
        }
        out.push(interpolate(native, &cumulative, seg, target));
    }

    Ok(ResampledStreamline::from_parts(out, total))
}

/// Resample every streamline in the set; parallel across streamlines.
/// Errors carry the index of the offending streamline.
pub fn resample_all(streamlines: &[Streamline], points: usize) -> Result<Vec<ResampledStreamline>> {
    streamlines
        .par_iter()
        .enumerate()
        .map(|(i, s)| resample(i, s, points))
        .collect()
}

/// Map a per-native-point scalar sequence onto the same equal-arc-length
/// parameterization `resample` uses, so externally sampled scalar fields
/// line up with the resampled geometry. The scalar count must equal the
/// streamline's native point count.
pub fn resample_scalars(
    index: usize,
    streamline: &Streamline,
    scalars: &[f32],
    points: usize,
) -> Result<Vec<f32>> {
    let native = streamline.points();
    if scalars.len() != native.len() {
        return Err(Error::mismatch(index, native.len(), scalars.len()));
    }
    if points < 2 {
        return Err(Error::degenerate(
            index,
            format!("target point count {points} is below 2"),
        ));
    }
    if native.len() < 2 {
        return Err(Error::degenerate(
            index,
            format!("{} point(s), need at least 2", native.len()),
        ));
    }

    let cumulative = cumulative_lengths(native);
    let total = *cumulative.last().unwrap_or(&0.0);
    if total <= 0.0 {
        return Err(Error::degenerate(index, "zero arc length"));
    }

    let mut out = Vec::with_capacity(points);
    let mut seg = 0usize;
    for k in 0..points {
        let target = total * k as f32 / (points - 1) as f32;
        while seg + 1 < cumulative.len() - 1 && cumulative[seg + 1] < target {
            seg += 1;
        }
        let span = cumulative[seg + 1] - cumulative[seg];
        let t = if span > 0.0 {
            ((target - cumulative[seg]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.push(scalars[seg] + t * (scalars[seg + 1] - scalars[seg]));
    }
    Ok(out)
}

/// Cumulative arc length at each native vertex; `out[0] == 0`.
fn cumulative_lengths(points: &[Point3]) -> Vec<f32> {
    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    out.push(0.0);
    for w in points.windows(2) {
        acc += point_distance(&w[0], &w[1]);
        out.push(acc);
    }
    out
}

fn interpolate(points: &[Point3], cumulative: &[f32], seg: usize, target: f32) -> Point3 {
    let span = cumulative[seg + 1] - cumulative[seg];
    let t = if span > 0.0 {
        ((target - cumulative[seg]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let a = &points[seg];
    let b = &points[seg + 1];
    [
        a[0] + t * (b[0] - a[0]),
        a[1] + t * (b[1] - a[1]),
        a[2] + t * (b[2] - a[2]),
    ]
}
