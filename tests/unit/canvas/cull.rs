use super::*;

fn view_rect() -> Rect {
    Rect::new(0.0, 0.0, 100.0, 100.0)
}

fn cull() -> CanvasCull {
    CanvasCull::new(HandleAllocator::new(), &ServerSettings::default())
}

/// An item with one small rect so it is emitted by the cull pass.
fn drawn_item(c: &mut CanvasCull, parent: Rid) -> Rid {
    let item = c.canvas_item_allocate();
    c.canvas_item_set_parent(item, parent);
    c.canvas_item_add_rect(item, Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE);
    item
}

fn order(list: &[RenderEntry]) -> Vec<Rid> {
    list.iter().map(|e| e.item).collect()
}

#[test]
fn single_root_item_yields_one_entry_at_z_zero() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let item = c.canvas_item_allocate();
    c.canvas_item_set_parent(item, canvas);
    c.canvas_item_set_transform(item, Affine::IDENTITY);
    c.canvas_item_add_rect(item, Rect::new(0.0, 0.0, 10.0, 10.0), Color::rgb(1.0, 0.0, 0.0));

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].item, item);
    assert_eq!(list[0].z, 0);
    assert_eq!(list[0].transform, Affine::IDENTITY);
    assert_eq!(list[0].modulate, Color::WHITE);
}

#[test]
fn items_without_commands_are_not_emitted() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let empty = c.canvas_item_allocate();
    c.canvas_item_set_parent(empty, canvas);
    let child = drawn_item(&mut c, empty);

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    assert_eq!(order(&list), vec![child]);
}

#[test]
fn global_transform_composes_parent_then_local() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    c.canvas_set_transform(canvas, Affine::translate((5.0, 0.0)));
    let parent = drawn_item(&mut c, canvas);
    c.canvas_item_set_transform(parent, Affine::scale(2.0));
    let child = drawn_item(&mut c, parent);
    c.canvas_item_set_transform(child, Affine::translate((1.0, 1.0)));

    let view = Affine::translate((0.0, 3.0));
    let list = c.cull_canvas(canvas, view, view_rect());
    let expected =
        view * Affine::translate((5.0, 0.0)) * Affine::scale(2.0) * Affine::translate((1.0, 1.0));
    let entry = list.iter().find(|e| e.item == child).unwrap();
    assert_eq!(entry.transform, expected);
    assert_eq!(c.canvas_item_get_global_transform(child), Some(expected));
}

#[test]
fn relative_z_accumulates_and_clamps() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    c.canvas_item_set_z_index(parent, 4000);
    let child = drawn_item(&mut c, parent);
    c.canvas_item_set_z_index(child, 200);
    let absolute = drawn_item(&mut c, parent);
    c.canvas_item_set_z_index(absolute, 7);
    c.canvas_item_set_z_as_relative_to_parent(absolute, false);

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    let z = |rid| list.iter().find(|e| e.item == rid).unwrap().z;
    assert_eq!(z(parent), 4000);
    assert_eq!(z(child), 4096);
    assert_eq!(z(absolute), 7);
}

#[test]
fn set_z_index_is_clamped() {
    let mut c = cull();
    let item = c.canvas_item_allocate();
    c.canvas_item_set_z_index(item, -100_000);
    assert_eq!(c.item(item).unwrap().z_index, -4096);
}

#[test]
fn modulate_multiplies_down_the_chain() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let a = drawn_item(&mut c, canvas);
    let b = drawn_item(&mut c, a);
    let leaf = drawn_item(&mut c, b);
    c.canvas_item_set_modulate(a, Color::rgba(0.5, 1.0, 1.0, 1.0));
    c.canvas_item_set_modulate(b, Color::rgba(1.0, 0.5, 1.0, 1.0));
    c.canvas_item_set_modulate(leaf, Color::rgba(1.0, 1.0, 0.5, 1.0));

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    let entry = list.iter().find(|e| e.item == leaf).unwrap();
    assert_eq!(entry.modulate, Color::rgba(0.5, 0.5, 0.5, 1.0));
    assert_eq!(
        c.canvas_item_get_final_modulate(leaf),
        Some(Color::rgba(0.5, 0.5, 0.5, 1.0))
    );
}

#[test]
fn self_modulate_is_not_inherited() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    c.canvas_item_set_self_modulate(parent, Color::rgba(0.0, 0.0, 0.0, 1.0));
    let child = drawn_item(&mut c, parent);

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    let m = |rid| list.iter().find(|e| e.item == rid).unwrap().modulate;
    assert_eq!(m(parent), Color::BLACK);
    assert_eq!(m(child), Color::WHITE);
}

#[test]
fn hidden_parent_hides_whole_subtree() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    let child = drawn_item(&mut c, parent);
    let grandchild = drawn_item(&mut c, child);

    c.canvas_item_set_visible(parent, false);
    assert!(c.cull_canvas(canvas, Affine::IDENTITY, view_rect()).is_empty());
    assert!(c.item(child).unwrap().visible);
    assert!(!c.item(grandchild).unwrap().visible_in_tree);

    c.canvas_item_set_visible(parent, true);
    assert_eq!(c.cull_canvas(canvas, Affine::IDENTITY, view_rect()).len(), 3);
}

#[test]
fn same_z_siblings_paint_in_creation_order() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let a = c.canvas_item_allocate();
    let b = c.canvas_item_allocate();
    let d = c.canvas_item_allocate();
    // Attach and mutate in reverse.
    for &item in [d, b, a].iter() {
        c.canvas_item_set_parent(item, canvas);
        c.canvas_item_add_rect(item, Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
    }

    let first = order(&c.cull_canvas(canvas, Affine::IDENTITY, view_rect()));
    assert_eq!(first, vec![a, b, d]);
    let second = order(&c.cull_canvas(canvas, Affine::IDENTITY, view_rect()));
    assert_eq!(first, second);
}

#[test]
fn z_dominates_creation_order() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let a = drawn_item(&mut c, canvas);
    let b = drawn_item(&mut c, canvas);
    c.canvas_item_set_z_index(a, 1);
    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    assert_eq!(order(&list), vec![b, a]);
}

#[test]
fn behind_parent_children_are_still_visited() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    let behind = drawn_item(&mut c, parent);
    c.canvas_item_set_draw_behind_parent(behind, true);
    c.canvas_item_set_sort_children_by_y(parent, true);

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    assert_eq!(list.len(), 2);
    let entry = list.iter().find(|e| e.item == behind).unwrap();
    assert_eq!(entry.z, 0);
}

#[test]
fn reparenting_detaches_from_previous_parent() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let p1 = drawn_item(&mut c, canvas);
    let p2 = drawn_item(&mut c, canvas);
    let child = drawn_item(&mut c, p1);

    c.canvas_item_set_parent(child, p2);
    assert!(c.item(p1).unwrap().children.is_empty());
    assert_eq!(c.item(p2).unwrap().children, vec![child]);

    c.canvas_item_set_parent(child, canvas);
    assert!(c.item(p2).unwrap().children.is_empty());
    assert_eq!(c.item(child).unwrap().canvas, Some(canvas));

    c.canvas_item_set_parent(child, Rid::INVALID);
    assert_eq!(c.cull_canvas(canvas, Affine::IDENTITY, view_rect()).len(), 2);
}

#[test]
fn parenting_under_own_descendant_is_refused() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let a = drawn_item(&mut c, canvas);
    let b = drawn_item(&mut c, a);
    c.canvas_item_set_parent(a, b);
    assert_eq!(c.item(a).unwrap().canvas, Some(canvas));
    assert_eq!(c.item(b).unwrap().parent, Some(a));
    c.canvas_item_set_parent(a, a);
    assert_eq!(c.item(a).unwrap().canvas, Some(canvas));
}

#[test]
fn freeing_an_item_detaches_it_and_orphans_children() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    let child = drawn_item(&mut c, parent);

    assert!(c.free(parent));
    assert!(!c.is_item(parent));
    assert!(c.is_item(child));
    assert_eq!(c.item(child).unwrap().parent, None);
    assert!(c.cull_canvas(canvas, Affine::IDENTITY, view_rect()).is_empty());
    assert!(!c.free(parent));
}

#[test]
fn clip_rect_is_transformed_and_inherited() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let parent = drawn_item(&mut c, canvas);
    c.canvas_item_set_transform(parent, Affine::translate((10.0, 10.0)));
    c.canvas_item_set_clip_rect(parent, Some(Rect::new(0.0, 0.0, 20.0, 20.0)));
    let child = drawn_item(&mut c, parent);
    c.canvas_item_set_clip_rect(child, Some(Rect::new(5.0, 5.0, 50.0, 50.0)));

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    let clip = |rid| list.iter().find(|e| e.item == rid).unwrap().clip;
    assert_eq!(clip(parent), Some(Rect::new(10.0, 10.0, 30.0, 30.0)));
    assert_eq!(clip(child), Some(Rect::new(15.0, 15.0, 30.0, 30.0)));
}

#[test]
fn layered_roots_sort_above_and_skip_canvas_transform() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    c.canvas_set_transform(canvas, Affine::translate((40.0, 0.0)));
    let hud = c.canvas_layer_create();
    c.canvas_layer_set_layer(hud, 1);
    c.canvas_layer_set_transform(hud, Affine::translate((0.0, 2.0)));
    c.canvas_layer_set_canvas(hud, canvas);

    let overlay = c.canvas_item_allocate();
    c.canvas_item_set_canvas_layer(overlay, Some(hud));
    c.canvas_item_set_parent(overlay, canvas);
    c.canvas_item_add_rect(overlay, Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
    let world = drawn_item(&mut c, canvas);
    c.canvas_item_set_z_index(world, 100);

    let list = c.cull_canvas(canvas, Affine::IDENTITY, view_rect());
    assert_eq!(order(&list), vec![world, overlay]);
    assert_eq!(list[1].transform, Affine::translate((0.0, 2.0)));
    assert_eq!(list[1].layer, 1);
}

#[test]
fn items_outside_the_viewport_rect_are_still_emitted() {
    let mut c = cull();
    let canvas = c.canvas_allocate();
    let far = drawn_item(&mut c, canvas);
    c.canvas_item_set_transform(far, Affine::translate((200.0, 200.0)));
    let back = drawn_item(&mut c, far);
    c.canvas_item_set_transform(back, Affine::translate((-200.0, -200.0)));

    let list = c.cull_canvas(canvas, Affine::IDENTITY, Rect::new(0.0, 0.0, 100.0, 100.0));
    assert_eq!(order(&list), vec![far, back]);
}

#[test]
fn item_rect_tracks_commands() {
    let mut c = cull();
    let item = c.canvas_item_allocate();
    assert_eq!(c.canvas_item_get_rect(item), Rect::ZERO);
    c.canvas_item_add_rect(item, Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE);
    c.canvas_item_add_circle(item, Point::new(10.0, 10.0), 2.0, Color::WHITE);
    assert_eq!(c.canvas_item_get_rect(item), Rect::new(0.0, 0.0, 12.0, 12.0));
    c.canvas_item_clear(item);
    assert_eq!(c.canvas_item_get_rect(item), Rect::ZERO);
    assert!(c.canvas_item_get_commands(item).is_empty());
}

#[test]
fn unknown_handles_are_ignored() {
    let mut c = cull();
    let ghost = Rid(42);
    c.canvas_item_set_visible(ghost, false);
    c.canvas_item_add_rect(ghost, Rect::ZERO, Color::WHITE);
    c.canvas_item_set_parent(ghost, Rid(43));
    assert!(c.cull_canvas(ghost, Affine::IDENTITY, view_rect()).is_empty());
    assert!(c.canvas_item_get_commands(ghost).is_empty());
    assert!(!c.free(ghost));
}
