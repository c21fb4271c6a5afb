//! Plane transforms used by the group/ungroup math.
//!
//! Angles are in degrees. Positive angles turn clockwise on screen, where the
//! y axis points down: rotating `(1, 0)` by 90° about the origin yields `(0, 1)`.

use kurbo::{Affine, Point, Rect};

/// Returns a function that rotates a point by `angle_degrees` about `pivot`.
pub fn rotate(angle_degrees: f64, pivot: Point) -> impl Fn(Point) -> Point {
    let affine = Affine::rotate_about(angle_degrees.to_radians(), pivot);
    move |point| affine * point
}

/// Rotation about the origin `(0, 0)`.
pub fn rotate_about_origin(angle_degrees: f64) -> impl Fn(Point) -> Point {
    rotate(angle_degrees, Point::ORIGIN)
}

/// Axis-aligned bounds of `rect` after rotating it about its own center.
pub fn rotated_bounds(rect: Rect, angle_degrees: f64) -> Rect {
    if angle_degrees.abs() < 0.001 {
        return rect;
    }

    let turn = rotate(angle_degrees, rect.center());
    let corners = [
        turn(Point::new(rect.x0, rect.y0)),
        turn(Point::new(rect.x1, rect.y0)),
        turn(Point::new(rect.x1, rect.y1)),
        turn(Point::new(rect.x0, rect.y1)),
    ];

    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

    Rect::new(min_x, min_y, max_x, max_y)
}
