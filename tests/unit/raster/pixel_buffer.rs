use super::*;

#[test]
fn lock_is_released_when_guard_drops() {
    let mut buf = PixelBuffer::new(4, 4);
    {
        let mut lock = buf.lock();
        lock.put(1, 1, 0xFF00_FF00);
    }
    assert!(!buf.is_locked());
    assert_eq!(buf.lock_count(), 1);
    assert_eq!(buf.pixel(1, 1), Some(0xFF00_FF00));
}

#[test]
fn out_of_bounds_writes_are_ignored() {
    let mut buf = PixelBuffer::new(2, 2);
    {
        let mut lock = buf.lock();
        lock.put(-1, 0, 0xFFFF_FFFF);
        lock.put(2, 0, 0xFFFF_FFFF);
        lock.blend_span(5, 0, 2, 0xFFFF_FFFF, BlendMode::Mix);
        lock.blend_span(0, -3, 1, 0xFFFF_FFFF, BlendMode::Mix);
    }
    assert_eq!(buf.pixels(), &[0xFFFF_FFFF, 0, 0, 0]);
}

#[test]
fn from_pixels_checks_length() {
    assert!(PixelBuffer::from_pixels(2, 2, vec![0; 3]).is_err());
    assert!(PixelBuffer::from_pixels(2, 2, vec![0; 4]).is_ok());
}

#[test]
fn map_color_uses_argb_layout() {
    let buf = PixelBuffer::new(1, 1);
    assert_eq!(buf.map_color(0x11, 0x22, 0x33, 0x44), 0x4411_2233);
}

#[test]
fn mix_opaque_source_replaces_destination() {
    assert_eq!(blend_argb(0xFF10_2030, 0xFFFF_0000, BlendMode::Mix), 0xFFFF_0000);
}

#[test]
fn mix_transparent_source_is_noop() {
    assert_eq!(blend_argb(0xFF10_2030, 0x00FF_FFFF, BlendMode::Mix), 0xFF10_2030);
}

#[test]
fn mix_half_alpha_over_opaque_black() {
    let out = blend_argb(0xFF00_0000, pack_argb(255, 255, 255, 128), BlendMode::Mix);
    let [r, g, b, a] = unpack_argb(out);
    assert_eq!(a, 255);
    assert_eq!((r, g, b), (128, 128, 128));
}

#[test]
fn add_and_sub_saturate() {
    let dst = pack_argb(200, 10, 0, 255);
    let src = pack_argb(100, 100, 0, 255);
    assert_eq!(unpack_argb(blend_argb(dst, src, BlendMode::Add)), [255, 110, 0, 255]);
    assert_eq!(unpack_argb(blend_argb(dst, src, BlendMode::Sub)), [100, 0, 0, 255]);
}

#[test]
fn disabled_overwrites_alpha_too() {
    assert_eq!(blend_argb(0xFFFF_FFFF, 0x0000_0000, BlendMode::Disabled), 0);
}

#[test]
fn rgba8_export_is_straight_rgba() {
    let buf = PixelBuffer::from_pixels(1, 1, vec![0x8011_2233]).unwrap();
    assert_eq!(buf.to_rgba8_bytes(), vec![0x11, 0x22, 0x33, 0x80]);
}
