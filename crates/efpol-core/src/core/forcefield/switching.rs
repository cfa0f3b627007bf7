//! Smooth cutoff switching applied per fragment pair.

const SWITCHING_ONSET_FRACTION: f64 = 0.8;

#[inline]
fn window(cutoff: f64) -> (f64, f64) {
    let start = SWITCHING_ONSET_FRACTION * cutoff;
    let inv_width = 1.0 / (cutoff * cutoff - start * start);
    (start, inv_width)
}

/// Smooth taper `1 - 10D^3 + 15D^4 - 6D^5` with `D = (r^2 - start^2) / (cutoff^2 - start^2)`
/// and `start = 0.8 * cutoff`.
///
/// Exactly 1 below `start`, exactly 0 beyond `cutoff`.
#[inline]
pub fn swf(r: f64, cutoff: f64) -> f64 {
    let (start, inv_width) = window(cutoff);

    if r < start {
        return 1.0;
    }
    if r > cutoff {
        return 0.0;
    }

    let d = (r * r - start * start) * inv_width;
    let d3 = d * d * d;

    1.0 - 10.0 * d3 + 15.0 * d3 * d - 6.0 * d3 * d * d
}

/// Derivative of [`swf`] with respect to `r`.
#[inline]
pub fn dswf(r: f64, cutoff: f64) -> f64 {
    r * dswf_over_r(r, cutoff)
}

/// `(1/r) d swf / dr`, the factor that turns a displacement vector into the swf gradient.
#[inline]
pub fn dswf_over_r(r: f64, cutoff: f64) -> f64 {
    let (start, inv_width) = window(cutoff);

    if r < start || r > cutoff {
        return 0.0;
    }

    let d = (r * r - start * start) * inv_width;
    let d2 = d * d;

    // dD/dr = 2 r / (cutoff^2 - start^2)
    2.0 * inv_width * (-30.0 * d2 + 60.0 * d2 * d - 30.0 * d2 * d2)
}
