//! Cone-of-sight queries with occlusion by opaque squares.
//! This module exists to keep NPC sight rules deterministic and separate from movement.
//! It does not own alerting or any reaction to what is seen.
//!
//! Opaque squares are collected in wave order while the cone is scanned, and a
//! candidate is hidden when the segment from the viewer to it crosses an edge of
//! any opaque square collected so far. Farther obstacles therefore never hide
//! squares scanned before them.

use std::collections::BTreeSet;

use super::*;

/// Bearing from `from` to `to` in degrees, shifted into the same turn as a cone
/// facing `angle` so cones that straddle east compare without wrapping.
fn bearing(from: Pos, to: Pos, angle: f64) -> f64 {
    let raw = f64::from(to.y - from.y).atan2(f64::from(to.x - from.x)).to_degrees();
    if angle > 90.0 && angle < 270.0 {
        raw.rem_euclid(360.0)
    } else if angle >= 270.0 {
        raw + 360.0
    } else {
        raw
    }
}

fn occluded(from: Pos, to: Pos, obstacles: &[Pos]) -> bool {
    let sight = ((f64::from(from.x), f64::from(from.y)), (f64::from(to.x), f64::from(to.y)));
    obstacles
        .iter()
        .flat_map(|o| square_sides(*o))
        .any(|side| segment_crossing(sight, side).is_some())
}

impl GridMap {
    /// Squares within `radius` of `pos` whose bearing lies strictly inside the cone
    /// of width `cone` centred on `angle`, that pass `pred` and are not hidden
    /// behind squares failing it.
    ///
    /// Obstacles are collected in wave order, so a square is only hidden by
    /// obstacles found in earlier frontiers.
    ///
    /// # Panics
    ///
    /// Panics if `angle` is outside `[0, 360)` or `cone` outside `(0, 180)`.
    pub fn view_field<P>(&self, pos: Pos, angle: f64, cone: f64, radius: f64, pred: P) -> BTreeSet<Pos>
    where
        P: Fn(Pos) -> bool,
    {
        assert!((0.0..360.0).contains(&angle), "view angle {angle} must be in [0, 360)");
        assert!(cone > 0.0 && cone < 180.0, "view cone {cone} must be in (0, 180)");
        let start = angle - cone / 2.0;
        let end = angle + cone / 2.0;
        let in_range = |sq: Pos| pos.distance(sq) <= radius;

        let mut obstacles = Vec::new();
        let mut field = BTreeSet::new();
        for frontier in self.wave(pos, in_range) {
            for sq in frontier {
                let a = bearing(pos, sq, angle);
                if !(start < a && a < end) {
                    continue;
                }
                if !pred(sq) {
                    obstacles.push(sq);
                    continue;
                }
                if !occluded(pos, sq, &obstacles) {
                    field.insert(sq);
                }
            }
        }
        field
    }
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::grid::test_support::*;
    use crate::*;

    fn assert_field(rows: &[&str], angle: f64, cone: f64, radius: f64) {
        let map = map_from_rows(rows, &[]);
        let start = first(&map, "st");
        let field = map.view_field(start, angle, cone, radius, |_| true);
        let expected: BTreeSet<Pos> = map.group("fd").iter().copied().collect();
        let marks: Vec<(Pos, char)> = field.iter().map(|p| (*p, 'v')).collect();
        assert_eq!(field, expected, "\n{}", draw_map_diag(&map, &marks));
    }

    #[test]
    fn cone_facing_north() {
        let rows = [
            "ss fd fd fd fd fd fd fd ss",
            "ss ss fd fd fd fd fd ss ss",
            "ss ss ss fd fd fd ss ss ss",
            "ss ss ss ss st ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
        ];
        assert_field(&rows, 90.0, 92.0, 10.0);
    }

    #[test]
    fn narrow_cone_facing_west() {
        let rows = [
            "ss ss ss ss st ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
            "ss ss fd ss ss ss ss ss ss",
            "ss fd fd fd fd fd fd fd st",
            "ss ss fd ss ss ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
        ];
        assert_field(&rows, 180.0, 20.0, 7.0);
    }

    #[test]
    fn cone_facing_east_from_the_edge() {
        let rows = [
            "ss ss ss ss ss ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
            "ss ss ss fd fd fd ss ss ss",
            "st fd fd fd fd fd fd ss ss",
            "ss ss ss fd fd fd ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
        ];
        assert_field(&rows, 0.0, 40.0, 6.0);
    }

    #[test]
    fn cone_facing_south_east_wraps_past_east() {
        let rows = [
            "st ss ss ss ss ss ss ss ss",
            "ss fd fd fd ss ss ss ss ss",
            "ss fd fd fd fd ss ss ss ss",
            "ss fd fd fd fd ss ss ss ss",
            "ss ss fd fd ss ss ss ss ss",
            "ss ss ss ss ss ss ss ss ss",
        ];
        assert_field(&rows, 315.0, 60.0, 5.0);
    }

    #[test]
    fn square_behind_an_obstacle_is_hidden() {
        let mut map = open_map(9, 3);
        let eye = Pos::new(0, 1);
        let behind = Pos::new(5, 1);
        let see = |m: &GridMap| {
            m.view_field(eye, 0.0, 60.0, 8.0, |p| m.allows(p, Capabilities::SEE))
        };
        assert!(see(&map).contains(&behind));

        wall(&mut map, Pos::new(3, 1));
        let field = see(&map);
        assert!(!field.contains(&behind), "\n{}", draw_map_diag(&map, &[(eye, '@')]));
        assert!(!field.contains(&Pos::new(3, 1)), "opaque squares are never reported");
        assert!(field.contains(&Pos::new(2, 1)));
    }

    #[test]
    fn open_fan_matches_brute_force_cone() {
        let map = open_map(25, 25);
        let eye = Pos::new(12, 12);
        let field = map.view_field(eye, 0.0, 92.0, 10.0, |p| map.allows(p, Capabilities::SEE));

        let mut expected = BTreeSet::new();
        for (sq, _) in map.cells() {
            if sq == eye || eye.distance(sq) > 10.0 {
                continue;
            }
            let a = f64::from(sq.y - eye.y).atan2(f64::from(sq.x - eye.x)).to_degrees();
            if -46.0 < a && a < 46.0 {
                expected.insert(sq);
            }
        }
        assert!(!expected.is_empty());
        assert_eq!(field, expected);
    }

    #[test]
    #[should_panic(expected = "view cone")]
    fn rejects_cone_of_half_turn() {
        let map = open_map(3, 3);
        map.view_field(Pos::new(1, 1), 0.0, 180.0, 2.0, |_| true);
    }
}
