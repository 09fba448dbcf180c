// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadtree with Kurbo geometry.
//!
//! Store labelled rectangles in a 2D tree and look them up with Kurbo points
//! and rectangles.
//!
//! Run:
//! - `cargo run -p understory_demos --example quadtree_kurbo`

use kurbo::{Point, Rect};
use understory_octree::{Aabb, OctreeConfig, OctreeObject, Quadtree, point_from_kurbo};

#[derive(Clone, Debug)]
struct Label {
    id: u32,
    bounds: Rect,
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Label {}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl OctreeObject<f64, 2> for Label {
    fn overlaps(&self, region: &Aabb<f64, 2>) -> bool {
        Aabb::from(self.bounds).intersects(region)
    }
}

fn main() {
    let config = OctreeConfig::default()
        .with_initial_height(2)
        .with_split_threshold(4);
    let tree: Quadtree<Label> =
        Quadtree::with_config(Rect::new(0.0, 0.0, 800.0, 600.0).into(), config)
            .expect("valid bounds");

    let mut id = 0;
    for row in 0..6 {
        for col in 0..8 {
            let x = 20.0 + f64::from(col) * 95.0;
            let y = 15.0 + f64::from(row) * 95.0;
            tree.insert(Label {
                id,
                bounds: Rect::new(x, y, x + 60.0, y + 30.0),
            });
            id += 1;
        }
    }
    // A wide banner straddles many cells.
    tree.insert(Label {
        id,
        bounds: Rect::new(100.0, 280.0, 700.0, 320.0),
    });
    tree.optimize();
    println!("{:#?}", tree.stats());

    let cursor = point_from_kurbo(Point::new(130.0, 125.0));
    let under_cursor: Vec<u32> = tree
        .find_exact(&cursor)
        .into_iter()
        .filter(|label| label.bounds.contains(Point::new(cursor[0], cursor[1])))
        .map(|label| label.id)
        .collect();
    println!("under cursor: {under_cursor:?}");

    let viewport = Rect::new(0.0, 0.0, 250.0, 200.0);
    let mut visible: Vec<u32> = tree
        .find_intersecting(&viewport.into())
        .into_iter()
        .filter(|label| label.bounds.intersect(viewport).area() > 0.0)
        .map(|label| label.id)
        .collect();
    visible.dedup();
    println!("visible in {viewport:?}: {visible:?}");

    let nearest: Vec<u32> = tree
        .find_nearest(&point_from_kurbo(Point::new(790.0, 590.0)))
        .into_iter()
        .map(|label| label.id)
        .collect();
    println!("nearest to the far corner: {nearest:?}");
}
