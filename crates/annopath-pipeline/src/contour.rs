//! Contour tracing: extract closed boundaries from a binary class mask.
//!
//! This module defines the [`ContourTracer`] trait for pluggable contour
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! # Border following
//!
//! The only strategy is Suzuki-Abe topological border following over an
//! 8-connected foreground. The mask is copied into a label grid with a
//! one-pixel background frame, then scanned in raster order. Each newly
//! met outer border (a `1` pixel with background on its left) or hole
//! border (a foreground pixel with background on its right) gets a
//! fresh label and is walked until the walk returns to its first two
//! pixels. Walked pixels are relabelled so that no border is traced twice.
//!
//! Borders are reported in discovery order, which puts every outer border
//! before the holes it encloses. The hierarchy is flattened to two levels:
//! outer borders have no parent, and each hole points at the outer border
//! directly around it.
//!
//! Straight runs are collapsed so that only points where the walk changes
//! direction are kept.

use crate::types::{GrayImage, Point, Polygon};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following with direction-change vertex reduction.
    #[default]
    BorderFollowing,
}

/// Trait for contour tracing strategies.
///
/// Input: a binary mask (non-zero = foreground).
/// Output: every outer and hole border of the foreground.
pub trait ContourTracer {
    /// Trace the borders of the given binary mask.
    fn trace(&self, mask: &GrayImage) -> ContourSet;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, mask: &GrayImage) -> ContourSet {
        match *self {
            Self::BorderFollowing => follow_borders(mask),
        }
    }
}

/// Whether a border surrounds a foreground component or a hole in one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Boundary between a foreground component and the background around it.
    Outer,
    /// Boundary between a foreground component and a background hole inside it.
    Hole,
}

/// One traced border.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Boundary vertices, one per direction change.
    pub polygon: Polygon,
    /// Outer or hole border.
    pub kind: BorderKind,
    /// Index of the enclosing outer border for holes; `None` for outer borders.
    pub parent: Option<usize>,
}

/// The result of tracing one mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContourSet {
    /// Closed borders in discovery order.
    pub contours: Vec<Contour>,
    /// Number of walks that failed to close and were dropped.
    pub discarded: usize,
}

impl ContourSet {
    /// Consumes the set and returns the non-empty polygons in discovery order.
    #[must_use]
    pub fn into_polygons(self) -> Vec<Polygon> {
        self.contours
            .into_iter()
            .map(|c| c.polygon)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Trace `mask` with the default strategy and return only the polygons.
#[must_use = "returns the traced polygons"]
pub fn trace(mask: &GrayImage) -> Vec<Polygon> {
    ContourTracerKind::default().trace(mask).into_polygons()
}

/// Neighbor directions, clockwise on screen starting from east.
///
/// Index arithmetic relies on this order: `d + 1` is the next clockwise
/// direction, `d + 7` the next counter-clockwise one and `d + 4` the
/// opposite.
const DIRECTIONS: [(isize, isize); 8] = [
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
    (0, -1),  // N
    (1, -1),  // NE
];

const EAST: usize = 0;
const WEST: usize = 4;

/// Label grid with a one-pixel background frame.
///
/// `0` is background, `1` is untouched foreground, and `±n` (`n >= 2`)
/// marks a pixel on border `n`. A negative label means the pixel's east
/// neighbor is background, so no hole border can start there.
struct LabelGrid {
    stride: usize,
    cells: Vec<i32>,
    offsets: [isize; 8],
}

impl LabelGrid {
    fn from_mask(mask: &GrayImage) -> Self {
        let (w, h) = (mask.width() as usize, mask.height() as usize);
        let stride = w + 2;
        let mut cells = vec![0; stride * (h + 2)];
        for (x, y, p) in mask.enumerate_pixels() {
            if p.0[0] != 0 {
                cells[(y as usize + 1) * stride + x as usize + 1] = 1;
            }
        }
        #[allow(clippy::cast_possible_wrap)]
        let offsets = DIRECTIONS.map(|(dx, dy)| dy * stride as isize + dx);
        Self {
            stride,
            cells,
            offsets,
        }
    }

    /// Cell index of the neighbor of `cell` in direction `dir`.
    ///
    /// Only called for foreground cells, which never lie on the frame, so
    /// the result is always in bounds.
    fn neighbor(&self, cell: usize, dir: usize) -> usize {
        cell.wrapping_add_signed(self.offsets[dir])
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn point(&self, cell: usize) -> Point {
        let x = (cell % self.stride) as i32 - 1;
        let y = (cell / self.stride) as i32 - 1;
        Point::new(x, y)
    }

    /// Walk one border starting at `start`, searching first from the
    /// background neighbor in direction `from`.
    ///
    /// Returns the visited cells in walk order, or `None` when the walk
    /// does not close within `max_steps`.
    fn follow(
        &mut self,
        start: usize,
        from: usize,
        label: i32,
        max_steps: usize,
    ) -> Option<Vec<usize>> {
        // Find the first foreground neighbor clockwise from `from`.
        let Some(first_dir) = (0..8)
            .map(|k| (from + k) % 8)
            .find(|&d| self.cells[self.neighbor(start, d)] != 0)
        else {
            // Isolated pixel.
            self.cells[start] = -label;
            return Some(vec![start]);
        };
        let second = self.neighbor(start, first_dir);

        let mut path = Vec::new();
        let mut current = start;
        // Direction from `current` back to the previously visited cell.
        let mut back = first_dir;

        for _ in 0..max_steps {
            path.push(current);

            // Search counter-clockwise, starting just after `back`.
            let mut east_is_background = false;
            let mut next_dir = None;
            for k in 1..=8 {
                let d = (back + 8 - k) % 8;
                if self.cells[self.neighbor(current, d)] != 0 {
                    next_dir = Some(d);
                    break;
                }
                if d == EAST {
                    east_is_background = true;
                }
            }
            let next_dir = next_dir?;

            if east_is_background {
                self.cells[current] = -label;
            } else if self.cells[current] == 1 {
                self.cells[current] = label;
            }

            let next = self.neighbor(current, next_dir);
            if next == start && current == second {
                return Some(path);
            }
            back = (next_dir + 4) % 8;
            current = next;
        }

        None
    }
}

/// Bookkeeping for one border label.
#[derive(Clone, Copy)]
struct BorderInfo {
    kind: BorderKind,
    /// Label of the parent border in the full Suzuki-Abe hierarchy.
    parent: Option<usize>,
    /// Index in the output, if the border was kept.
    output: Option<usize>,
}

/// Suzuki-Abe border following over the whole mask.
fn follow_borders(mask: &GrayImage) -> ContourSet {
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let mut set = ContourSet::default();
    if w == 0 || h == 0 {
        return set;
    }

    let mut grid = LabelGrid::from_mask(mask);
    // A border pixel is visited at most four times per walk.
    let max_steps = 4 * w * h + 8;

    // Label 1 is the frame, which behaves as a hole border with no parent.
    let mut borders = vec![
        BorderInfo {
            kind: BorderKind::Hole,
            parent: None,
            output: None,
        };
        2
    ];
    let mut label: i32 = 1;

    for y in 1..=h {
        let mut last_label: usize = 1;
        for x in 1..=w {
            let cell = y * grid.stride + x;
            let value = grid.cells[cell];
            if value == 0 {
                continue;
            }

            let start = if value == 1 && grid.cells[cell - 1] == 0 {
                Some((BorderKind::Outer, WEST))
            } else if value >= 1 && grid.cells[cell + 1] == 0 {
                if value > 1 {
                    last_label = value.unsigned_abs() as usize;
                }
                Some((BorderKind::Hole, EAST))
            } else {
                None
            };

            if let Some((kind, from)) = start {
                label += 1;
                let previous = borders[last_label];
                let parent = if previous.kind == kind {
                    previous.parent
                } else {
                    Some(last_label)
                };

                let output = match grid.follow(cell, from, label, max_steps) {
                    Some(cells) => {
                        let points = cells.into_iter().map(|c| grid.point(c)).collect();
                        let two_level_parent = match kind {
                            BorderKind::Outer => None,
                            BorderKind::Hole => parent.and_then(|p| borders[p].output),
                        };
                        set.contours.push(Contour {
                            polygon: Polygon::new(reduce_collinear(points)),
                            kind,
                            parent: two_level_parent,
                        });
                        Some(set.contours.len() - 1)
                    }
                    None => {
                        tracing::warn!(
                            x = x - 1,
                            y = y - 1,
                            "border walk did not close; discarding"
                        );
                        set.discarded += 1;
                        None
                    }
                };
                borders.push(BorderInfo {
                    kind,
                    parent,
                    output,
                });
            }

            let value = grid.cells[cell];
            if value != 1 {
                last_label = value.unsigned_abs() as usize;
            }
        }
    }

    set
}

/// Keep only the points where the boundary changes direction.
///
/// The polygon is treated as closed, so the first point is dropped too
/// when it lies in the middle of a straight run.
fn reduce_collinear(points: Vec<Point>) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BACKGROUND, FOREGROUND};

    fn mask_from(rows: &[&str]) -> GrayImage {
        let h = u32::try_from(rows.len()).unwrap();
        let w = u32::try_from(rows[0].len()).unwrap();
        GrayImage::from_fn(w, h, |x, y| {
            if rows[y as usize].as_bytes()[x as usize] == b'#' {
                image::Luma([FOREGROUND])
            } else {
                image::Luma([BACKGROUND])
            }
        })
    }

    fn pts(coords: &[(i32, i32)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn default_is_border_following() {
        assert_eq!(
            ContourTracerKind::default(),
            ContourTracerKind::BorderFollowing
        );
    }

    #[test]
    fn empty_mask_produces_no_contours() {
        let mask = GrayImage::new(10, 10);
        assert!(trace(&mask).is_empty());
    }

    #[test]
    fn zero_sized_mask_produces_no_contours() {
        assert!(trace(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn two_by_two_block_has_four_corners() {
        let mask = mask_from(&["....", ".##.", ".##.", "...."]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(1, 1), (1, 2), (2, 2), (2, 1)]));
    }

    #[test]
    fn straight_runs_collapse_to_corners() {
        let mask = mask_from(&[
            "........",
            ".######.",
            ".######.",
            ".######.",
            "........",
        ]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(1, 1), (1, 3), (6, 3), (6, 1)]));
    }

    #[test]
    fn full_mask_follows_image_border() {
        let mask = mask_from(&["#####", "#####", "#####"]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(0, 0), (0, 2), (4, 2), (4, 0)]));
    }

    #[test]
    fn single_pixel_is_one_point() {
        let mask = mask_from(&["...", ".#.", "..."]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(1, 1)]));
    }

    #[test]
    fn horizontal_line_is_two_endpoints() {
        let mask = mask_from(&[".....", ".###.", "....."]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(1, 1), (3, 1)]));
    }

    #[test]
    fn diagonal_line_is_two_endpoints() {
        let mask = mask_from(&["#...", ".#..", "..#.", "...#"]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].points(), pts(&[(0, 0), (3, 3)]));
    }

    #[test]
    fn diagonal_neighbors_form_one_component() {
        let mask = mask_from(&["##..", "##..", "..##", "..##"]);
        let set = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(set.contours.len(), 1);
        assert_eq!(set.contours[0].kind, BorderKind::Outer);
    }

    #[test]
    fn ring_has_outer_border_and_hole() {
        let mask = mask_from(&[
            ".......",
            ".#####.",
            ".#####.",
            ".##.##.",
            ".#####.",
            ".#####.",
            ".......",
        ]);
        let set = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(set.discarded, 0);
        assert_eq!(set.contours.len(), 2);

        let outer = &set.contours[0];
        assert_eq!(outer.kind, BorderKind::Outer);
        assert_eq!(outer.parent, None);
        assert_eq!(outer.polygon.points(), pts(&[(1, 1), (1, 5), (5, 5), (5, 1)]));

        let hole = &set.contours[1];
        assert_eq!(hole.kind, BorderKind::Hole);
        assert_eq!(hole.parent, Some(0));
        assert_eq!(hole.polygon.points(), pts(&[(2, 3), (3, 2), (4, 3), (3, 4)]));
    }

    #[test]
    fn island_inside_hole_is_top_level() {
        let mask = mask_from(&[
            ".........",
            ".#######.",
            ".#.....#.",
            ".#.....#.",
            ".#..#..#.",
            ".#.....#.",
            ".#.....#.",
            ".#######.",
            ".........",
        ]);
        let set = ContourTracerKind::BorderFollowing.trace(&mask);
        let kinds: Vec<_> = set.contours.iter().map(|c| (c.kind, c.parent)).collect();
        assert_eq!(
            kinds,
            vec![
                (BorderKind::Outer, None),
                (BorderKind::Hole, Some(0)),
                (BorderKind::Outer, None),
            ]
        );
        assert_eq!(set.contours[2].polygon.points(), pts(&[(4, 4)]));
    }

    #[test]
    fn separate_blobs_in_raster_order() {
        let mask = mask_from(&["...##", "...##", ".....", "##...", "##..."]);
        let polygons = trace(&mask);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].points()[0], Point::new(3, 0));
        assert_eq!(polygons[1].points()[0], Point::new(0, 3));
    }

    #[test]
    fn tracing_is_deterministic() {
        let mask = mask_from(&[
            "#.##.#..",
            "######.#",
            "#..#.###",
            "##.#####",
            ".#..#..#",
        ]);
        let first = ContourTracerKind::BorderFollowing.trace(&mask);
        let second = ContourTracerKind::BorderFollowing.trace(&mask);
        assert_eq!(first, second);
        for contour in &first.contours {
            assert!(!contour.polygon.is_empty());
        }
    }

    #[test]
    fn matches_reference_border_follower_topology() {
        let mask = mask_from(&[
            "..........",
            ".########.",
            ".#......#.",
            ".#.####.#.",
            ".#.#..#.#.",
            ".#.####.#.",
            ".#......#.",
            ".########.",
            "......#...",
            "..........",
        ]);
        let ours = ContourTracerKind::BorderFollowing.trace(&mask);
        let reference = imageproc::contours::find_contours::<i32>(&mask);

        assert_eq!(ours.contours.len(), reference.len());
        for (mine, theirs) in ours.contours.iter().zip(&reference) {
            let expected_kind = match theirs.border_type {
                imageproc::contours::BorderType::Outer => BorderKind::Outer,
                imageproc::contours::BorderType::Hole => BorderKind::Hole,
            };
            assert_eq!(mine.kind, expected_kind);
            for p in mine.polygon.points() {
                assert!(
                    theirs.points.iter().any(|q| q.x == p.x && q.y == p.y),
                    "vertex ({}, {}) is not a reference border pixel",
                    p.x,
                    p.y,
                );
            }
        }
    }

    #[test]
    fn reduce_keeps_short_polygons() {
        assert_eq!(reduce_collinear(pts(&[(0, 0)])), pts(&[(0, 0)]));
        assert_eq!(
            reduce_collinear(pts(&[(0, 0), (1, 0)])),
            pts(&[(0, 0), (1, 0)])
        );
    }

    #[test]
    fn reduce_drops_collinear_start() {
        // Closed square walked from the middle of its top edge.
        let square = pts(&[
            (1, 0),
            (2, 0),
            (2, 1),
            (2, 2),
            (1, 2),
            (0, 2),
            (0, 1),
            (0, 0),
        ]);
        assert_eq!(
            reduce_collinear(square),
            pts(&[(2, 0), (2, 2), (0, 2), (0, 0)])
        );
    }
}
