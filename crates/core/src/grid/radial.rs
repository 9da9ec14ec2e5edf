//! Arc search around a pivot square, used to swing a dragged body around its carrier.

use super::*;

/// Squares at Chebyshev distance `k` from `center`, clockwise from due north.
fn ring(center: Pos, k: i32) -> Vec<Pos> {
    let mut cells = Vec::with_capacity(8 * k as usize);
    cells.extend((0..=k).map(|x| center.offset(x, k)));
    cells.extend((-k..k).rev().map(|y| center.offset(k, y)));
    cells.extend((-k..k).rev().map(|x| center.offset(x, -k)));
    cells.extend((-k + 1..=k).map(|y| center.offset(-k, y)));
    cells.extend((-k + 1..0).map(|x| center.offset(x, k)));
    cells
}

/// Squares on the ray from `center` through `toward`, sampled at Chebyshev
/// distances `1..=length`.
fn ray(center: Pos, toward: Pos, length: i32) -> impl Iterator<Item = Pos> {
    let steps = f64::from(center.chebyshev(toward).max(1));
    let dx = f64::from(toward.x - center.x) / steps;
    let dy = f64::from(toward.y - center.y) / steps;
    (1..=length).map(move |i| {
        let i = f64::from(i);
        center.offset((dx * i).round() as i32, (dy * i).round() as i32)
    })
}

struct Sweep {
    path: Vec<Pos>,
    reached: bool,
}

impl GridMap {
    /// Squares visited while swinging a point from `from` to `to` around `center`
    /// on the ring through `from`, excluding `from`. Each ring step must pass
    /// `check_square` and keep the whole ray out to `radius` inside the map and
    /// passing `pred`. Both rotations are tried: the one that reaches `to` wins
    /// (shorter first, clockwise on ties), otherwise the one that got farther.
    /// An empty result means no step can be taken.
    pub fn radial_path<P>(&self, center: Pos, from: Pos, to: Pos, pred: P, radius: i32) -> Vec<Pos>
    where
        P: Fn(Pos) -> bool,
    {
        let k = center.chebyshev(from);
        if from == to || k == 0 {
            return Vec::new();
        }
        let ring = ring(center, k);
        let Some(start) = ring.iter().position(|p| *p == from) else {
            return Vec::new();
        };
        let clockwise = self.sweep(center, &ring, start, 1, to, &pred, radius);
        let counter = self.sweep(center, &ring, start, -1, to, &pred, radius);
        let pick_counter = match (clockwise.reached, counter.reached) {
            (true, true) => counter.path.len() < clockwise.path.len(),
            (true, false) => false,
            (false, true) => true,
            (false, false) => counter.path.len() > clockwise.path.len(),
        };
        if pick_counter { counter.path } else { clockwise.path }
    }

    #[allow(clippy::too_many_arguments)]
    fn sweep<P>(
        &self,
        center: Pos,
        ring: &[Pos],
        start: usize,
        step: isize,
        to: Pos,
        pred: P,
        radius: i32,
    ) -> Sweep
    where
        P: Fn(Pos) -> bool,
    {
        let n = ring.len() as isize;
        let mut path = Vec::new();
        let mut prev = ring[start];
        for i in 1..n {
            let cur = ring[(start as isize + step * i).rem_euclid(n) as usize];
            let clear = self.check_square(prev, cur, &pred)
                && ray(center, cur, radius).all(|p| self.contains(p) && pred(p));
            if !clear {
                break;
            }
            path.push(cur);
            if cur == to {
                return Sweep { path, reached: true };
            }
            prev = cur;
        }
        Sweep { path, reached: false }
    }
}
