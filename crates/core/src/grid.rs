//! Sparse square-grid storage and the adjacency rules every query builds on.
//! This module exists to keep cell ownership, group membership and square reservations
//! in one place so movement, sight and planning all agree on what a legal step is.
//! It does not own agents, bodies or any decision about who moves where.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::*;

mod geometry;
mod pathfinding;
mod radial;
#[cfg(test)]
pub(crate) mod test_support;
mod visibility;
mod wave;

pub use geometry::{Segment, segment_crossing, square_sides};
pub use pathfinding::PathSearch;
pub use wave::Wave;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("square {0} is not part of the map")]
    NotOnMap(Pos),
    #[error("square {0} is already blocked")]
    AlreadyBlocked(Pos),
    #[error("square {0} is not blocked")]
    NotBlocked(Pos),
}

/// Render-side description of a cell. The engine only reads `Cell::actions`.
#[derive(Clone, Debug, PartialEq)]
pub enum CellKind {
    Texture { texture: String },
    Model { model: String, angle: i32, size: f64 },
    ChainModel { vertical_model: String, left_bottom_model: String },
    Sprite { texture: String, size: f64 },
    Substrate { texture: String },
    Empty,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub kind: CellKind,
    /// Group tag; `None` only for substrate cells.
    pub ident: Option<String>,
    pub actions: Capabilities,
}

impl Cell {
    pub fn substrate(texture: &str, actions: Capabilities) -> Self {
        Self { kind: CellKind::Substrate { texture: texture.to_string() }, ident: None, actions }
    }

    pub fn can(&self, actions: Capabilities) -> bool {
        self.actions.contains(actions)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GridMap {
    cells: BTreeMap<Pos, Cell>,
    groups: BTreeMap<String, Vec<Pos>>,
    blocked: BTreeSet<Pos>,
}

impl GridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from topology rows using a three-character stride. The last
    /// textual row becomes `y == 0`. `..` tokens are holes; every other token is
    /// resolved through `resolve`, and `None` leaves the square off the map.
    pub fn from_topology<S, F>(rows: &[S], mut resolve: F) -> Self
    where
        S: AsRef<str>,
        F: FnMut(&str) -> Option<Cell>,
    {
        let mut map = GridMap::new();
        for (y, row) in rows.iter().rev().enumerate() {
            let row = row.as_ref();
            for (x, start) in (0..row.len()).step_by(3).enumerate() {
                let Some(token) = row.get(start..start + 2) else {
                    continue;
                };
                if token == ".." {
                    continue;
                }
                if let Some(cell) = resolve(token) {
                    map.insert(Pos::new(x as i32, y as i32), cell);
                }
            }
        }
        map
    }

    pub fn insert(&mut self, pos: Pos, cell: Cell) {
        if let Some(old) = self.cells.remove(&pos) {
            self.forget_group(pos, old.ident.as_deref());
        }
        if let Some(ident) = &cell.ident {
            self.groups.entry(ident.clone()).or_default().push(pos);
        }
        self.cells.insert(pos, cell);
    }

    pub fn remove(&mut self, pos: Pos) -> Option<Cell> {
        let cell = self.cells.remove(&pos)?;
        self.forget_group(pos, cell.ident.as_deref());
        self.blocked.remove(&pos);
        Some(cell)
    }

    fn forget_group(&mut self, pos: Pos, ident: Option<&str>) {
        let Some(ident) = ident else {
            return;
        };
        if let Some(members) = self.groups.get_mut(ident) {
            members.retain(|p| *p != pos);
            if members.is_empty() {
                self.groups.remove(ident);
            }
        }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains_key(&pos)
    }

    pub fn cell(&self, pos: Pos) -> Option<&Cell> {
        self.cells.get(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = (Pos, &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `pos` is on the map and grants every capability in `actions`.
    pub fn allows(&self, pos: Pos, actions: Capabilities) -> bool {
        self.cells.get(&pos).is_some_and(|cell| cell.can(actions))
    }

    pub fn group(&self, ident: &str) -> &[Pos] {
        self.groups.get(ident).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_of(&self, pos: Pos) -> Option<&str> {
        self.cells.get(&pos).and_then(|cell| cell.ident.as_deref())
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[Pos])> + '_ {
        self.groups.iter().map(|(ident, members)| (ident.as_str(), members.as_slice()))
    }

    /// Inclusive `(min, max)` corners of the occupied area.
    pub fn bounds(&self) -> Option<(Pos, Pos)> {
        let mut cells = self.cells.keys();
        let first = *cells.next()?;
        Some(cells.fold((first, first), |(lo, hi), p| {
            (Pos::new(lo.x.min(p.x), lo.y.min(p.y)), Pos::new(hi.x.max(p.x), hi.y.max(p.y)))
        }))
    }

    /// Present neighbors of `pos` in N, NE, E, SE, S, SW, W, NW order, or the
    /// orthogonal subset when `diagonals` is false.
    pub fn neighbors(&self, pos: Pos, diagonals: bool) -> impl Iterator<Item = Pos> + '_ {
        let dirs: &'static [Direction] =
            if diagonals { &Direction::ALL } else { &Direction::ORTHOGONAL };
        dirs.iter().map(move |dir| pos.step(*dir)).filter(|p| self.contains(*p))
    }

    /// Present diagonal neighbors of `pos`.
    pub fn corners(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        Direction::DIAGONAL.iter().map(move |dir| pos.step(*dir)).filter(|p| self.contains(*p))
    }

    pub fn is_corner(&self, a: Pos, b: Pos) -> bool {
        (a.x - b.x).abs() == 1 && (a.y - b.y).abs() == 1
    }

    /// Both squares flanking the diagonal step `a -> b` exist and pass `pred`.
    pub fn is_free_corner<P>(&self, a: Pos, b: Pos, pred: P) -> bool
    where
        P: Fn(Pos) -> bool,
    {
        [Pos::new(b.x, a.y), Pos::new(a.x, b.y)]
            .into_iter()
            .all(|flank| self.contains(flank) && pred(flank))
    }

    /// The one gate for a step or a line-of-sight hop from `origin` to `target`.
    pub fn check_square<P>(&self, origin: Pos, target: Pos, pred: P) -> bool
    where
        P: Fn(Pos) -> bool,
    {
        if !self.contains(target) || !pred(target) {
            return false;
        }
        !self.is_corner(origin, target) || self.is_free_corner(origin, target, pred)
    }

    pub fn block(&mut self, pos: Pos) -> Result<(), GridError> {
        if !self.contains(pos) {
            return Err(GridError::NotOnMap(pos));
        }
        if !self.blocked.insert(pos) {
            return Err(GridError::AlreadyBlocked(pos));
        }
        Ok(())
    }

    pub fn unblock(&mut self, pos: Pos) -> Result<(), GridError> {
        if !self.blocked.remove(&pos) {
            return Err(GridError::NotBlocked(pos));
        }
        Ok(())
    }

    pub fn is_blocked(&self, pos: Pos) -> bool {
        self.blocked.contains(&pos)
    }

    /// On the map and not reserved by an in-flight move.
    pub fn is_available(&self, pos: Pos) -> bool {
        self.contains(pos) && !self.blocked.contains(&pos)
    }

    pub fn blocked(&self) -> impl Iterator<Item = Pos> + '_ {
        self.blocked.iter().copied()
    }
}

/// Text dump of the map, top row first. `marks` override the cell glyph;
/// otherwise walkable cells print `.`, see-through cells `_`, the rest `#`.
pub fn draw_map_diag(map: &GridMap, marks: &[(Pos, char)]) -> String {
    let mut text = String::new();
    let Some((lo, hi)) = map.bounds() else {
        return text;
    };
    for y in (lo.y..=hi.y).rev() {
        for x in lo.x..=hi.x {
            let p = Pos::new(x, y);
            let glyph = if let Some((_, mark)) = marks.iter().rev().find(|(pos, _)| *pos == p) {
                *mark
            } else {
                match map.cell(p) {
                    None => ' ',
                    Some(_) if map.is_blocked(p) => 'x',
                    Some(cell) if cell.can(Capabilities::WALK) => '.',
                    Some(cell) if cell.can(Capabilities::SEE) => '_',
                    Some(_) => '#',
                }
            };
            text.push(glyph);
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::grid::test_support::*;
    use crate::*;

    #[test]
    fn topology_rows_are_reversed_and_grouped() {
        let map = map_from_rows(&["ss WL ..", "ss ss WL"], &[("WL", Capabilities::empty())]);
        assert_eq!(map.len(), 5);
        assert!(!map.contains(Pos::new(2, 1)));
        assert_eq!(map.group("WL"), &[Pos::new(2, 0), Pos::new(1, 1)]);
        assert_eq!(map.group_of(Pos::new(1, 1)), Some("WL"));
        assert_eq!(map.group_of(Pos::new(0, 0)), None);
        assert!(map.allows(Pos::new(0, 1), Capabilities::WALK | Capabilities::SEE));
        assert!(!map.allows(Pos::new(1, 1), Capabilities::SEE));
    }

    #[test]
    fn replacing_a_cell_moves_its_group_membership() {
        let mut map = map_from_rows(&["ss WL"], &[("WL", Capabilities::empty())]);
        map.insert(Pos::new(1, 0), Cell::substrate("floor", Capabilities::WALK));
        assert!(map.group("WL").is_empty());
        assert_eq!(map.groups().count(), 0);
    }

    #[test]
    fn neighbors_follow_compass_order_and_skip_holes() {
        let map = open_map(3, 3);
        let center = Pos::new(1, 1);
        let all: Vec<Pos> = map.neighbors(center, true).collect();
        assert_eq!(
            all,
            vec![
                Pos::new(1, 2),
                Pos::new(2, 2),
                Pos::new(2, 1),
                Pos::new(2, 0),
                Pos::new(1, 0),
                Pos::new(0, 0),
                Pos::new(0, 1),
                Pos::new(0, 2),
            ]
        );
        let orth: Vec<Pos> = map.neighbors(center, false).collect();
        assert_eq!(orth, vec![Pos::new(1, 2), Pos::new(2, 1), Pos::new(1, 0), Pos::new(0, 1)]);

        let corner: Vec<Pos> = map.corners(Pos::new(0, 0)).collect();
        assert_eq!(corner, vec![Pos::new(1, 1)]);
    }

    #[test]
    fn diagonal_step_needs_both_flanks() {
        let mut map = open_map(3, 3);
        let walk = |p: Pos| p != Pos::new(1, 0);
        let a = Pos::new(0, 0);
        let b = Pos::new(1, 1);
        assert!(map.is_corner(a, b));
        assert!(!map.is_corner(a, Pos::new(0, 1)));
        assert!(!map.is_free_corner(a, b, walk));
        assert!(!map.check_square(a, b, walk), "wall flank must stop the diagonal");
        assert!(map.check_square(a, b, |_| true));

        map.remove(Pos::new(0, 1));
        assert!(!map.check_square(a, b, |_| true), "missing flank must stop the diagonal");
        assert!(map.check_square(a, Pos::new(1, 0), |_| true));
        assert!(!map.check_square(a, Pos::new(5, 5), |_| true));
    }

    #[test]
    fn block_and_unblock_are_strictly_paired() {
        let mut map = open_map(2, 2);
        let p = Pos::new(1, 1);
        assert!(map.is_available(p));
        map.block(p).expect("first block");
        assert!(!map.is_available(p));
        assert_eq!(map.block(p), Err(GridError::AlreadyBlocked(p)));
        map.unblock(p).expect("matching unblock");
        assert_eq!(map.unblock(p), Err(GridError::NotBlocked(p)));
        assert_eq!(map.block(Pos::new(9, 9)), Err(GridError::NotOnMap(Pos::new(9, 9))));
        assert!(!map.is_available(Pos::new(9, 9)));
    }

    #[test]
    fn diag_dump_marks_cells() {
        let map = map_from_rows(&["ss WL", "ss .."], &[("WL", Capabilities::empty())]);
        let text = draw_map_diag(&map, &[(Pos::new(0, 0), '@')]);
        assert_eq!(text, ".#\n@ \n");
    }
}
