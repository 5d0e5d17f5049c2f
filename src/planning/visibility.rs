//! Shortest paths inside a fence polygon over its visibility graph.
//!
//! Nodes are the start, the goal and every fence vertex (exterior and
//! holes). An edge exists where the straight segment stays inside the fence,
//! or within `buffer` of its boundary, along its whole length. Paths are
//! found with Dijkstra's algorithm; vertex-to-vertex visibility is computed
//! on demand and memoised.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::core::Point2D;
use crate::geometry::Polygon;

/// State for Dijkstra's algorithm priority queue.
#[derive(Clone, Copy, Debug)]
struct DijkstraState {
    /// Current path length.
    cost: f64,
    /// Fence vertex index.
    node: usize,
}

impl PartialEq for DijkstraState {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for DijkstraState {}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Visibility-graph planner over a fixed fence.
pub struct VisibilityPlanner {
    fence: Polygon,
    buffer: f64,
    vertices: Vec<Point2D>,
    /// Memoised vertex-to-vertex visibility
    visible: Vec<Vec<Option<bool>>>,
}

impl VisibilityPlanner {
    pub fn new(fence: Polygon, buffer: f64) -> Self {
        let vertices = fence.vertices();
        let n = vertices.len();
        Self {
            fence,
            buffer,
            vertices,
            visible: vec![vec![None; n]; n],
        }
    }

    pub fn fence(&self) -> &Polygon {
        &self.fence
    }

    /// Whether `p` lies inside the fence or within the buffer of its boundary.
    pub fn covers(&self, p: Point2D) -> bool {
        self.fence.covers(p, self.buffer)
    }

    /// Whether the straight segment is a legal path leg.
    pub fn is_legal(&self, a: Point2D, b: Point2D) -> bool {
        self.fence.contains_segment(a, b, self.buffer)
    }

    fn vertex_visible(&mut self, i: usize, j: usize) -> bool {
        if let Some(known) = self.visible[i][j] {
            return known;
        }
        let legal = self.is_legal(self.vertices[i], self.vertices[j]);
        self.visible[i][j] = Some(legal);
        self.visible[j][i] = Some(legal);
        legal
    }

    /// Shortest legal polyline from `start` to `goal`, both included.
    ///
    /// `None` when no such path exists through the fence vertices.
    pub fn plan(&mut self, start: Point2D, goal: Point2D) -> Option<Vec<Point2D>> {
        if self.is_legal(start, goal) {
            return Some(vec![start, goal]);
        }

        let n = self.vertices.len();
        let mut dist = vec![f64::INFINITY; n];
        // None: reached straight from the start
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        for (i, v) in self.vertices.iter().enumerate() {
            if self.fence.contains_segment(start, *v, self.buffer) {
                dist[i] = start.distance(v);
                heap.push(DijkstraState {
                    cost: dist[i],
                    node: i,
                });
            }
        }

        while let Some(DijkstraState { cost, node }) = heap.pop() {
            // Skip if we've found a better path
            if cost > dist[node] {
                continue;
            }
            for next in 0..n {
                if next == node {
                    continue;
                }
                let new_dist = cost + self.vertices[node].distance(&self.vertices[next]);
                if new_dist < dist[next] && self.vertex_visible(node, next) {
                    dist[next] = new_dist;
                    prev[next] = Some(node);
                    heap.push(DijkstraState {
                        cost: new_dist,
                        node: next,
                    });
                }
            }
        }

        // best final leg: try candidates from shortest total length
        let mut candidates: Vec<(f64, usize)> = (0..n)
            .filter(|&i| dist[i].is_finite())
            .map(|i| (dist[i] + self.vertices[i].distance(&goal), i))
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (length, last) = candidates
            .into_iter()
            .find(|&(_, i)| self.is_legal(self.vertices[i], goal))?;

        let mut path = vec![goal];
        let mut current = Some(last);
        while let Some(i) = current {
            path.push(self.vertices[i]);
            current = prev[i];
        }
        path.push(start);
        path.reverse();

        debug!(
            "Planned path with {} legs, length {:.2}m",
            path.len() - 1,
            length
        );
        Some(path)
    }
}

/// Total length of a polyline.
pub fn path_length(path: &[Point2D]) -> f64 {
    path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}
