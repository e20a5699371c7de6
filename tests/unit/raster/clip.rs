use super::*;

fn v(x: f64, y: f64, u: f64, w: f64) -> RasterVertex {
    RasterVertex::new(Point::new(x, y), Point::new(u, w), Color::WHITE)
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<RasterVertex> {
    vec![
        v(x0, y0, 0.0, 0.0),
        v(x1, y0, 1.0, 0.0),
        v(x1, y1, 1.0, 1.0),
        v(x0, y1, 0.0, 1.0),
    ]
}

#[test]
fn inside_polygon_is_returned_unchanged() {
    let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
    let poly = square(10.0, 10.0, 20.0, 20.0);
    assert_eq!(clip_polygon(&poly, clip), poly);
}

#[test]
fn outside_polygon_is_dropped() {
    let clip = Rect::new(0.0, 0.0, 100.0, 100.0);
    let poly = square(200.0, 200.0, 220.0, 220.0);
    assert!(clip_polygon(&poly, clip).is_empty());
}

#[test]
fn straddling_polygon_clips_uvs_linearly() {
    let clip = Rect::new(0.0, 0.0, 10.0, 100.0);
    let poly = square(0.0, 0.0, 20.0, 10.0);
    let out = clip_polygon(&poly, clip);

    assert_eq!(out.len(), 4);
    for vert in &out {
        assert!(vert.pos.x <= 10.0);
        // u follows x linearly across the original 0..20 span.
        assert!((vert.uv.x - vert.pos.x / 20.0).abs() < 1e-9);
    }
    assert!(out.iter().any(|p| (p.pos.x - 10.0).abs() < 1e-9 && (p.uv.x - 0.5).abs() < 1e-9));
}

#[test]
fn clipped_colors_are_interpolated() {
    let clip = Rect::new(0.0, 0.0, 5.0, 10.0);
    let poly = vec![
        RasterVertex::solid(Point::new(0.0, 0.0), Color::BLACK),
        RasterVertex::solid(Point::new(10.0, 0.0), Color::WHITE),
        RasterVertex::solid(Point::new(0.0, 10.0), Color::BLACK),
    ];
    let out = clip_polygon(&poly, clip);
    let mid = out
        .iter()
        .find(|p| (p.pos.x - 5.0).abs() < 1e-9 && p.pos.y.abs() < 1e-9)
        .unwrap();
    assert!((mid.color.r - 0.5).abs() < 1e-6);
}

#[test]
fn line_inside_is_accepted_as_is() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    let a = Point::new(1.0, 1.0);
    let b = Point::new(9.0, 5.0);
    assert_eq!(clip_line(a, b, r), Some((a, b)));
}

#[test]
fn line_outside_is_rejected() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(
        clip_line(Point::new(-5.0, -5.0), Point::new(-1.0, 20.0), r),
        None
    );
}

#[test]
fn line_crossing_is_clamped_to_edges() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    let (a, b) = clip_line(Point::new(-10.0, 5.0), Point::new(20.0, 5.0), r).unwrap();
    assert_eq!(a, Point::new(0.0, 5.0));
    assert_eq!(b, Point::new(10.0, 5.0));
}
