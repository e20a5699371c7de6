use super::*;
use crate::raster::format::pack_argb;
use crate::raster::sampler::{TextureFilter, TextureRepeat};

const RED: u32 = 0xFFFF_0000;

fn lit(buf: &PixelBuffer) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for y in 0..buf.height() {
        for x in 0..buf.width() {
            if buf.pixel(x, y) != Some(0) {
                out.push((x, y));
            }
        }
    }
    out
}

#[test]
fn filled_rect_covers_pixel_centers_only() {
    let mut buf = PixelBuffer::new(4, 4);
    SoftwareRasterizer::new(&mut buf).draw_rect(
        Rect::new(1.0, 1.0, 3.0, 3.0),
        Color::rgb(1.0, 0.0, 0.0),
        true,
        1.0,
    );
    assert_eq!(lit(&buf), vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    assert_eq!(buf.pixel(1, 1), Some(RED));
}

#[test]
fn rect_outline_leaves_interior_untouched() {
    let mut buf = PixelBuffer::new(6, 6);
    SoftwareRasterizer::new(&mut buf).draw_rect(
        Rect::new(0.0, 0.0, 6.0, 6.0),
        Color::WHITE,
        false,
        1.0,
    );
    assert_eq!(lit(&buf).len(), 20);
    assert_eq!(buf.pixel(2, 2), Some(0));
}

#[test]
fn clip_rect_limits_fills() {
    let mut buf = PixelBuffer::new(4, 4);
    let mut r = SoftwareRasterizer::new(&mut buf);
    r.set_clip_rect(Some(Rect::new(0.0, 0.0, 2.0, 1.0)));
    r.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE, true, 1.0);
    assert_eq!(lit(&buf), vec![(0, 0), (1, 0)]);
}

#[test]
fn clip_rect_is_intersected_with_target() {
    let mut buf = PixelBuffer::new(4, 4);
    let mut r = SoftwareRasterizer::new(&mut buf);
    r.set_clip_rect(Some(Rect::new(-10.0, 2.0, 100.0, 100.0)));
    assert_eq!(r.clip_rect(), Rect::new(0.0, 2.0, 4.0, 4.0));
    r.set_clip_rect(None);
    assert_eq!(r.clip_rect(), r.bounds());
}

#[test]
fn line_is_clipped_before_rasterizing() {
    let mut buf = PixelBuffer::new(4, 4);
    SoftwareRasterizer::new(&mut buf).draw_line(
        Point::new(-5.0, 1.0),
        Point::new(10.0, 1.0),
        Color::WHITE,
    );
    assert_eq!(lit(&buf), vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
}

#[test]
fn diagonal_line_steps_one_pixel_per_row() {
    let mut buf = PixelBuffer::new(4, 4);
    SoftwareRasterizer::new(&mut buf).draw_line(
        Point::new(0.0, 0.0),
        Point::new(3.0, 3.0),
        Color::WHITE,
    );
    assert_eq!(lit(&buf), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
}

#[test]
fn degenerate_primitives_draw_nothing() {
    let mut buf = PixelBuffer::new(8, 8);
    let mut r = SoftwareRasterizer::new(&mut buf);
    r.draw_line(Point::new(2.0, 2.0), Point::new(2.0, 2.0), Color::WHITE);
    r.draw_circle(Point::new(4.0, 4.0), 0.0, Color::WHITE, true);
    r.draw_polygon(&[Point::new(0.0, 0.0), Point::new(5.0, 5.0)], Color::WHITE, true);
    r.fill_polygon(
        &[
            RasterVertex::solid(Point::new(20.0, 20.0), Color::WHITE),
            RasterVertex::solid(Point::new(30.0, 20.0), Color::WHITE),
            RasterVertex::solid(Point::new(30.0, 30.0), Color::WHITE),
        ],
        None,
    );
    assert!(lit(&buf).is_empty());
    assert!(!buf.is_locked());
}

#[test]
fn filled_circle_is_symmetric() {
    let mut buf = PixelBuffer::new(11, 11);
    SoftwareRasterizer::new(&mut buf).draw_circle(Point::new(5.0, 5.0), 2.0, Color::WHITE, true);
    for (x, y) in [(5, 5), (7, 5), (3, 5), (5, 7), (5, 3)] {
        assert_ne!(buf.pixel(x, y), Some(0), "({x},{y})");
    }
    for (x, y) in [(8, 5), (2, 5), (5, 8), (5, 2)] {
        assert_eq!(buf.pixel(x, y), Some(0), "({x},{y})");
    }
}

#[test]
fn circle_outline_skips_center() {
    let mut buf = PixelBuffer::new(11, 11);
    SoftwareRasterizer::new(&mut buf).draw_circle(Point::new(5.0, 5.0), 3.0, Color::WHITE, false);
    assert_eq!(buf.pixel(5, 5), Some(0));
    assert_ne!(buf.pixel(8, 5), Some(0));
    assert_ne!(buf.pixel(5, 2), Some(0));
}

#[test]
fn oversized_circle_is_bounded_by_the_clip() {
    let mut buf = PixelBuffer::new(8, 8);
    let mut r = SoftwareRasterizer::new(&mut buf);
    r.draw_circle(Point::new(4.0, 4.0), 3.0e9, Color::WHITE, false);
    r.draw_circle(Point::new(1.0e12, 4.0), 5.0, Color::WHITE, true);
    r.draw_circle(Point::new(f64::INFINITY, 4.0), 5.0, Color::WHITE, true);
    drop(r);
    assert!(lit(&buf).is_empty());

    SoftwareRasterizer::new(&mut buf).draw_circle(
        Point::new(4.0, 4.0),
        3.0e9,
        Color::WHITE,
        true,
    );
    assert_eq!(lit(&buf).len(), 64);
    assert!(!buf.is_locked());
}

#[test]
fn shared_triangle_edges_are_blended_once() {
    let mut buf = PixelBuffer::from_pixels(2, 2, vec![0xFF00_0000; 4]).unwrap();
    let half_white = Color::rgba(1.0, 1.0, 1.0, 128.0 / 255.0);
    let verts = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]
        .map(|(x, y)| RasterVertex::solid(Point::new(x, y), half_white));
    SoftwareRasterizer::new(&mut buf).draw_batch(&verts, &[0, 1, 2, 0, 2, 3], None);

    let expected = pack_argb(128, 128, 128, 255);
    assert_eq!(buf.pixels(), &[expected; 4]);
}

#[test]
fn batch_skips_triangles_with_missing_vertices() {
    let mut buf = PixelBuffer::new(2, 2);
    let verts = [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0)]
        .map(|(x, y)| RasterVertex::solid(Point::new(x, y), Color::WHITE));
    SoftwareRasterizer::new(&mut buf).draw_batch(&verts, &[0, 1, 7], None);
    assert!(lit(&buf).is_empty());
}

#[test]
fn textured_quad_samples_nearest_texel() {
    let tex = PixelBuffer::from_pixels(
        2,
        2,
        vec![
            pack_argb(255, 0, 0, 255),
            pack_argb(0, 255, 0, 255),
            pack_argb(0, 0, 255, 255),
            pack_argb(255, 255, 255, 255),
        ],
    )
    .unwrap();
    let view = TextureView::new(&tex, TextureFilter::Nearest, TextureRepeat::Disabled);

    let mut buf = PixelBuffer::new(4, 4);
    let quad = [
        (0.0, 0.0, 0.0, 0.0),
        (4.0, 0.0, 1.0, 0.0),
        (4.0, 4.0, 1.0, 1.0),
        (0.0, 4.0, 0.0, 1.0),
    ]
    .map(|(x, y, u, v)| RasterVertex::new(Point::new(x, y), Point::new(u, v), Color::WHITE));
    SoftwareRasterizer::new(&mut buf).fill_polygon(&quad, Some(&view));

    assert_eq!(buf.pixel(0, 0), Some(pack_argb(255, 0, 0, 255)));
    assert_eq!(buf.pixel(3, 0), Some(pack_argb(0, 255, 0, 255)));
    assert_eq!(buf.pixel(0, 3), Some(pack_argb(0, 0, 255, 255)));
    assert_eq!(buf.pixel(3, 3), Some(pack_argb(255, 255, 255, 255)));
}

#[test]
fn texel_is_modulated_by_vertex_color() {
    let tex = PixelBuffer::from_pixels(1, 1, vec![0xFFFF_FFFF]).unwrap();
    let view = TextureView::new(&tex, TextureFilter::Nearest, TextureRepeat::Disabled);
    let mut buf = PixelBuffer::new(2, 2);
    let tri = [(0.0, 0.0), (4.0, 0.0), (0.0, 4.0)]
        .map(|(x, y)| RasterVertex::new(Point::new(x, y), Point::ZERO, Color::rgb(0.0, 1.0, 0.0)));
    SoftwareRasterizer::new(&mut buf).draw_textured_triangle(tri, &view);
    assert_eq!(buf.pixel(0, 0), Some(0xFF00_FF00));
}

#[test]
fn thick_polyline_expands_around_segment() {
    let mut buf = PixelBuffer::new(12, 12);
    SoftwareRasterizer::new(&mut buf).draw_polyline(
        &[Point::new(2.0, 5.0), Point::new(9.0, 5.0)],
        Color::rgb(1.0, 0.0, 0.0),
        4.0,
    );
    assert_eq!(buf.pixel(5, 3), Some(RED));
    assert_eq!(buf.pixel(5, 6), Some(RED));
    assert_eq!(buf.pixel(5, 8), Some(0));
    // Round cap extends past the end point.
    assert_eq!(buf.pixel(11, 5), Some(RED));
}

#[test]
fn thin_polyline_falls_back_to_lines() {
    let mut buf = PixelBuffer::new(4, 4);
    SoftwareRasterizer::new(&mut buf).draw_polyline(
        &[Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(3.0, 3.0)],
        Color::WHITE,
        1.0,
    );
    assert_eq!(lit(&buf).len(), 7);
}

#[test]
fn every_draw_releases_the_lock() {
    let mut buf = PixelBuffer::new(4, 4);
    {
        let mut r = SoftwareRasterizer::new(&mut buf);
        r.set_clip_rect(Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
        r.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE, true, 1.0);
        r.draw_point(Point::new(1.0, 1.0), Color::WHITE);
    }
    assert!(!buf.is_locked());
    assert_eq!(buf.lock_count(), 2);
    assert!(lit(&buf).is_empty());
}

#[test]
fn ellipse_points_respect_radii() {
    let pts = ellipse_points(Point::new(10.0, 10.0), Vec2::new(4.0, 2.0), 64);
    assert_eq!(pts.len(), 64);
    assert!((pts[0].x - 14.0).abs() < 1e-9);
    assert!((pts[16].y - 12.0).abs() < 1e-9);
}
