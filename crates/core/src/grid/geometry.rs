//! Plane geometry helpers for sight lines.

use super::*;

/// Segment between two points in map units; square `(x, y)` spans `x ± 0.5`.
pub type Segment = ((f64, f64), (f64, f64));

struct Line {
    slope: f64,
    intercept: f64,
}

/// Slope/intercept form; `None` for vertical segments.
fn line_of(s: &Segment) -> Option<Line> {
    let ((x0, y0), (x1, y1)) = *s;
    let dx = x1 - x0;
    if dx == 0.0 {
        return None;
    }
    let slope = (y1 - y0) / dx;
    Some(Line { slope, intercept: y0 - slope * x0 })
}

fn within(value: f64, a: f64, b: f64) -> bool {
    a.min(b) <= value && value <= a.max(b)
}

/// Point where two segments cross, if any. Parallel segments, including two
/// vertical ones, never cross; touching an endpoint counts as crossing.
pub fn segment_crossing(s1: Segment, s2: Segment) -> Option<(f64, f64)> {
    let (x, y) = match (line_of(&s1), line_of(&s2)) {
        (None, None) => return None,
        (Some(l1), Some(l2)) => {
            if l1.slope == l2.slope {
                return None;
            }
            let x = (l2.intercept - l1.intercept) / (l1.slope - l2.slope);
            (x, l1.slope * x + l1.intercept)
        }
        (None, Some(l2)) => {
            let x = s1.0.0;
            (x, l2.slope * x + l2.intercept)
        }
        (Some(l1), None) => {
            let x = s2.0.0;
            (x, l1.slope * x + l1.intercept)
        }
    };
    for ((x0, y0), (x1, y1)) in [s1, s2] {
        if !within(x, x0, x1) || !within(y, y0, y1) {
            return None;
        }
    }
    Some((x, y))
}

/// The four edges of a square, clockwise from its top-left corner.
pub fn square_sides(pos: Pos) -> [Segment; 4] {
    let (x, y) = (f64::from(pos.x), f64::from(pos.y));
    let tl = (x - 0.5, y + 0.5);
    let tr = (x + 0.5, y + 0.5);
    let br = (x + 0.5, y - 0.5);
    let bl = (x - 0.5, y - 0.5);
    [(tl, tr), (tr, br), (br, bl), (bl, tl)]
}
