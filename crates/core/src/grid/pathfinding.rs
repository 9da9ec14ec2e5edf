//! Shortest-path extraction and jump targets on the square grid.
//! This module exists so walking agents and the jump selector share one set of step rules.
//! It does not own route patrol policy or occupancy of other agents; callers fold
//! those into the predicate they pass in.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::f64::consts::SQRT_2;

use super::*;
use crate::config::PathAlgorithm;

/// Forward wave distances recorded until the goal square was reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSearch {
    /// Frontiers expanded to reach the goal; equals the length of every shortest path.
    pub frontiers: usize,
    distances: HashMap<Pos, usize>,
}

impl PathSearch {
    /// Steps from the start square, or `None` for squares the search never reached.
    pub fn distance(&self, pos: Pos) -> Option<usize> {
        self.distances.get(&pos).copied()
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    f: f64,
    seq: u64,
    pos: Pos,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f.total_cmp(&other.f).then(self.seq.cmp(&other.seq))
    }
}

fn euclid(a: Pos, b: Pos) -> f64 {
    let dx = f64::from(a.x - b.x);
    let dy = f64::from(a.y - b.y);
    (dx * dx + dy * dy).sqrt()
}

impl GridMap {
    /// Runs the wave from `start` until `end` shows up. `start == end` is reached
    /// after zero frontiers.
    pub fn find_path<P>(&self, start: Pos, end: Pos, pred: P) -> Option<PathSearch>
    where
        P: Fn(Pos) -> bool,
    {
        let mut distances = HashMap::new();
        if start == end {
            return Some(PathSearch { frontiers: 0, distances });
        }
        for (index, frontier) in self.wave(start, &pred).enumerate() {
            let steps = index + 1;
            distances.extend(frontier.iter().map(|cell| (*cell, steps)));
            if distances.contains_key(&end) {
                return Some(PathSearch { frontiers: steps, distances });
            }
        }
        None
    }

    /// One shortest path from `start` to `end`, excluding `start` and including
    /// `end`. Walking back from `end`, each step takes the first neighbor (N, E,
    /// S, W, then NE, SE, SW, NW) that sits one frontier closer to the start.
    pub fn get_path<P>(&self, start: Pos, end: Pos, pred: P) -> Option<Vec<Pos>>
    where
        P: Fn(Pos) -> bool,
    {
        let search = self.find_path(start, end, &pred)?;
        if search.frontiers == 0 {
            return Some(vec![]);
        }
        let mut path = Vec::with_capacity(search.frontiers);
        let mut cur = end;
        path.push(cur);
        for wanted in (1..search.frontiers).rev() {
            let prev = Direction::ORTHOGONAL
                .iter()
                .chain(Direction::DIAGONAL.iter())
                .map(|dir| cur.step(*dir))
                .find(|p| {
                    search.distance(*p) == Some(wanted)
                        && (!self.is_corner(cur, *p) || self.is_free_corner(cur, *p, &pred))
                })?;
            path.push(prev);
            cur = prev;
        }
        path.reverse();
        Some(path)
    }

    /// A* with unit orthogonal steps, `sqrt(2)` diagonal steps and a Euclidean
    /// heuristic. Open nodes with equal estimates pop in insertion order.
    pub fn weighted_path<P>(&self, start: Pos, end: Pos, pred: P) -> Option<Vec<Pos>>
    where
        P: Fn(Pos) -> bool,
    {
        if start == end {
            return Some(vec![]);
        }
        if !self.contains(end) {
            return None;
        }
        let mut open = BTreeSet::new();
        let mut g_score = HashMap::from([(start, 0.0_f64)]);
        let mut came_from = HashMap::new();
        let mut closed = HashSet::new();
        let mut seq = 0;
        open.insert(OpenNode { f: euclid(start, end), seq, pos: start });

        while let Some(node) = open.pop_first() {
            let p = node.pos;
            if !closed.insert(p) {
                continue;
            }
            if p == end {
                let mut path = vec![end];
                let mut cur = end;
                while let Some(prev) = came_from.get(&cur).copied() {
                    if prev == start {
                        break;
                    }
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                return Some(path);
            }
            let g = g_score.get(&p).copied().unwrap_or(f64::INFINITY);
            for dir in Direction::ALL {
                let q = p.step(dir);
                if closed.contains(&q) || !self.check_square(p, q, &pred) {
                    continue;
                }
                let cost = if dir.is_diagonal() { SQRT_2 } else { 1.0 };
                let tentative = g + cost;
                if tentative < g_score.get(&q).copied().unwrap_or(f64::INFINITY) {
                    g_score.insert(q, tentative);
                    came_from.insert(q, p);
                    seq += 1;
                    open.insert(OpenNode { f: tentative + euclid(q, end), seq, pos: q });
                }
            }
        }
        None
    }

    pub fn path<P>(&self, algorithm: PathAlgorithm, start: Pos, end: Pos, pred: P) -> Option<Vec<Pos>>
    where
        P: Fn(Pos) -> bool,
    {
        match algorithm {
            PathAlgorithm::Wave => self.get_path(start, end, pred),
            PathAlgorithm::Weighted => self.weighted_path(start, end, pred),
        }
    }

    /// Squares a single jump from `pos` can land on: a diagonal neighbor that can
    /// be walked and jumped over a corner whose flanks can be jumped, or the
    /// walkable square behind an orthogonal jumpable neighbor.
    pub fn jump_field(&self, pos: Pos) -> Vec<Pos> {
        let jumpable = |p: Pos| self.allows(p, Capabilities::JUMP);
        let mut field = Vec::new();
        for nb in self.neighbors(pos, true) {
            if self.is_corner(pos, nb) {
                if self.allows(nb, Capabilities::WALK | Capabilities::JUMP)
                    && self.is_free_corner(pos, nb, jumpable)
                {
                    field.push(nb);
                }
            } else if jumpable(nb) {
                let far = Pos::new(2 * nb.x - pos.x, 2 * nb.y - pos.y);
                if self.allows(far, Capabilities::WALK) {
                    field.push(far);
                }
            }
        }
        field
    }
}
