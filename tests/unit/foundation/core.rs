use super::*;
use serde_json::json;

#[test]
fn modulate_is_component_wise() {
    let a = Color::rgba(0.5, 1.0, 1.0, 1.0);
    let b = Color::rgba(1.0, 0.5, 1.0, 0.5);
    assert_eq!(a * b, Color::rgba(0.5, 0.5, 1.0, 0.5));
    assert_eq!(a * Color::WHITE, a);
}

#[test]
fn quantization_rounds_and_clamps() {
    assert_eq!(Color::rgba(1.0, 0.0, 0.5, 1.0).to_rgba8(), [255, 0, 128, 255]);
    assert_eq!(Color::rgba(2.0, -1.0, 0.0, 0.0).to_rgba8(), [255, 0, 0, 0]);
    assert_eq!(Color::from_rgba8(12, 34, 56, 78).to_rgba8(), [12, 34, 56, 78]);
}

#[test]
fn parses_hex_rgb_and_rgba() {
    let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 1.0));

    let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
    assert!((c.b - 1.0).abs() < 1e-6);
    assert!((c.a - (128.0 / 255.0)).abs() < 1e-6);

    assert!(serde_json::from_value::<Color>(json!("#12345")).is_err());
}

#[test]
fn parses_rgba_object_and_array() {
    let c: Color = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 1.0));

    let c: Color = serde_json::from_value(json!([0.25, 0.5, 0.75, 0.9])).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 0.9));

    assert!(serde_json::from_value::<Color>(json!([1.0, 0.0])).is_err());
}

#[test]
fn similarity_scale_detects_uniform_transforms() {
    let t = Affine::rotate(0.7).then_scale(2.0).then_translate(Vec2::new(3.0, 4.0));
    let s = similarity_scale(t).unwrap();
    assert!((s - 2.0).abs() < 1e-9);

    assert!(similarity_scale(Affine::scale_non_uniform(2.0, 1.0)).is_none());
    assert!(similarity_scale(Affine::skew(0.5, 0.0)).is_none());
}
