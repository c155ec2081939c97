//! Planar convex hull and vertex centroid.
//!
//! Coordinates are `[lat, lon]` pairs treated as Cartesian `[x, y]`. This is a
//! local-area approximation; nothing here is geodesic.

/// A planar point, `[x, y]` (here `[lat, lon]`).
pub type Point = [f64; 2];

/// Z component of `(a - o) × (b - o)`. Positive for a counter-clockwise turn.
pub fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Monotone-chain convex hull.
///
/// Returns the hull vertices counter-clockwise, starting from the
/// lowest-x (then lowest-y) point, without repeating the start point.
/// Collinear boundary points are dropped: a chain pops whenever the last
/// turn is not strictly counter-clockwise.
///
/// Fully collinear input degenerates to its two extreme points (a segment),
/// and input where every point is identical collapses to that single point.
/// Neither case panics.
///
/// Inputs of fewer than three points are returned unchanged, in input order
/// and without dedup. The zone aggregator never calls this with fewer than
/// three points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        push_with_turn_check(&mut lower, p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        push_with_turn_check(&mut upper, p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    // Coincident input leaves the same point at the end of both chains.
    lower.dedup();
    lower
}

fn push_with_turn_check(chain: &mut Vec<Point>, p: Point) {
    while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) <= 0.0 {
        chain.pop();
    }
    chain.push(p);
}

/// Arithmetic mean of the given vertices.
///
/// This is the vertex centroid, not the area-weighted polygon centroid.
/// Returns `None` for an empty slice.
pub fn vertex_centroid(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let [sx, sy] = vertices
        .iter()
        .fold([0.0, 0.0], |acc, v| [acc[0] + v[0], acc[1] + v[1]]);
    Some([sx / n, sy / n])
}

/// Signed shoelace area. Positive for counter-clockwise vertex order.
pub fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a[0] * b[1] - b[0] * a[1]
        })
        .sum::<f64>()
        / 2.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
