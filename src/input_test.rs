use super::*;

#[test]
fn default_gesture_is_idle() {
    assert_eq!(GestureState::default(), GestureState::Idle);
}

#[test]
fn idle_and_panning_have_no_note() {
    assert!(GestureState::Idle.note_id().is_none());
    let pan = GestureState::Panning { last_screen: Point::new(1.0, 2.0) };
    assert!(pan.note_id().is_none());
}

#[test]
fn dragging_reports_note() {
    let g = GestureState::Dragging {
        id: NoteId(4),
        grab: Point::new(0.0, 0.0),
        origin: Point::new(0.0, 0.0),
        orig_z: 0,
    };
    assert_eq!(g.note_id(), Some(NoteId(4)));
}

#[test]
fn resizing_reports_note() {
    let g = GestureState::Resizing {
        id: NoteId(9),
        anchor: ResizeAnchor::Se,
        start_world: Point::new(0.0, 0.0),
        orig: Bounds { x: 0.0, y: 0.0, width: 120.0, height: 80.0 },
        orig_z: 2,
    };
    assert_eq!(g.note_id(), Some(NoteId(9)));
}

#[test]
fn selection_toggle_modifiers() {
    assert!(!Modifiers::default().toggles_selection());
    assert!(Modifiers { shift: true, ..Default::default() }.toggles_selection());
    assert!(Modifiers { meta: true, ..Default::default() }.toggles_selection());
    assert!(!Modifiers { alt: true, ..Default::default() }.toggles_selection());
}

#[test]
fn wheel_zoom_modifiers() {
    assert!(Modifiers { ctrl: true, ..Default::default() }.zooms_wheel());
    assert!(!Modifiers { shift: true, ..Default::default() }.zooms_wheel());
}

#[test]
fn key_matches_name() {
    assert!(Key("Escape".into()).is("Escape"));
    assert!(!Key("Escape".into()).is("Delete"));
}
