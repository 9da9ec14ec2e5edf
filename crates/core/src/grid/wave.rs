//! Lazy breadth-first frontiers over the grid.

use std::collections::HashSet;

use super::*;

/// Successive frontiers grown from a start square. The start square itself is
/// never yielded and every square appears in at most one frontier.
pub struct Wave<'a, P> {
    map: &'a GridMap,
    pred: P,
    visited: HashSet<Pos>,
    frontier: Vec<Pos>,
}

impl<'a, P> Wave<'a, P>
where
    P: Fn(Pos) -> bool,
{
    pub(super) fn new(map: &'a GridMap, start: Pos, pred: P) -> Self {
        Self { map, pred, visited: HashSet::from([start]), frontier: vec![start] }
    }
}

impl<P> Iterator for Wave<'_, P>
where
    P: Fn(Pos) -> bool,
{
    type Item = Vec<Pos>;

    fn next(&mut self) -> Option<Vec<Pos>> {
        let mut next = Vec::new();
        for &cell in &self.frontier {
            for n in self.map.neighbors(cell, false) {
                if !self.visited.contains(&n) && (self.pred)(n) {
                    self.visited.insert(n);
                    next.push(n);
                }
            }
            for n in self.map.corners(cell) {
                if !self.visited.contains(&n)
                    && (self.pred)(n)
                    && self.map.is_free_corner(cell, n, &self.pred)
                {
                    self.visited.insert(n);
                    next.push(n);
                }
            }
        }
        if next.is_empty() {
            self.frontier.clear();
            return None;
        }
        self.frontier.clone_from(&next);
        Some(next)
    }
}

impl GridMap {
    /// Frontiers reachable from `start` through squares passing `pred`; diagonal
    /// steps obey the corner rule.
    pub fn wave<P>(&self, start: Pos, pred: P) -> Wave<'_, P>
    where
        P: Fn(Pos) -> bool,
    {
        Wave::new(self, start, pred)
    }
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::grid::test_support::*;
    use crate::*;

    #[test]
    fn first_frontiers_skip_walls_and_cut_corners() {
        let map = map_from_rows(&WAVE_TOPOLOGY, &[]);
        let start = first(&map, "st");
        assert_eq!(start, Pos::new(2, 2));
        let mut wave = map.wave(start, not_in_group(&map, "WL"));

        let p = |x, y| Pos::new(x, y);
        assert_eq!(wave.next(), Some(vec![p(2, 3), p(1, 2), p(1, 3)]));
        assert_eq!(
            wave.next(),
            Some(vec![p(2, 4), p(3, 3), p(3, 4), p(1, 1), p(0, 2), p(0, 1), p(0, 3)])
        );
        assert_eq!(
            wave.next(),
            Some(vec![p(2, 5), p(3, 5), p(4, 3), p(4, 4), p(4, 5), p(1, 0), p(0, 0), p(0, 4)])
        );
    }

    #[test]
    fn frontiers_match_chebyshev_rings_on_open_ground() {
        let map = open_map(9, 9);
        let start = Pos::new(4, 4);
        let mut seen = HashSet::new();
        let mut count = 0;
        for (k, frontier) in map.wave(start, |_| true).enumerate() {
            for cell in &frontier {
                assert_eq!(cell.chebyshev(start), k as i32 + 1, "{cell} in frontier {k}");
                assert!(seen.insert(*cell), "{cell} appeared twice");
            }
            count += 1;
        }
        assert_eq!(count, 4);
        assert_eq!(seen.len(), 80);
    }

    #[test]
    fn isolated_start_yields_nothing() {
        let map = open_map(1, 1);
        assert_eq!(map.wave(Pos::new(0, 0), |_| true).next(), None);

        let map = open_map(3, 1);
        assert_eq!(map.wave(Pos::new(0, 0), |_| false).count(), 0);
    }
}
