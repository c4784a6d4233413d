#![allow(clippy::float_cmp)]

use std::collections::BTreeSet;

use super::*;
use crate::sync::{BulkDeleteReport, OpKind, Operation};

const P: PointerId = PointerId(1);
const Q: PointerId = PointerId(2);

fn note(id: i64, x: f64, y: f64) -> Note {
    Note {
        id: NoteId(id),
        content: String::new(),
        importance: Importance::Medium,
        color: "yellow".into(),
        x,
        y,
        width: 200.0,
        height: 150.0,
        z_index: 0,
        tag_ids: BTreeSet::new(),
        locked: false,
    }
}

fn locked(id: i64, x: f64, y: f64) -> Note {
    Note { locked: true, ..note(id, x, y) }
}

fn engine(notes: Vec<Note>) -> EngineCore {
    let mut core = EngineCore::default();
    core.set_viewport(800.0, 600.0);
    core.load_notes(notes);
    core
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn persists(actions: &[Action]) -> Vec<Request> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Persist(r) => Some(r.clone()),
            _ => None,
        })
        .collect()
}

fn notices(actions: &[Action]) -> Vec<Notice> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Notify(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

fn position(core: &EngineCore, id: i64) -> (f64, f64) {
    let n = core.note(NoteId(id)).expect("note present");
    (n.x, n.y)
}

fn failure() -> BackendError {
    BackendError::Request("connection reset".into())
}

/// Press, move and release the primary pointer.
fn drag(core: &mut EngineCore, from: Point, to: Point) -> Vec<Action> {
    core.on_pointer_down(P, from, Button::Primary, Modifiers::default());
    core.on_pointer_move(P, to);
    core.on_pointer_up(P)
}

// =============================================================================
// PERMISSIONS
// =============================================================================

#[test]
fn viewer_mutations_are_rejected() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.set_role(Role::Viewer);

    assert_eq!(core.add_note(), Err(BoardError::PermissionDenied));
    assert_eq!(core.update_note(NoteId(1), NotePatch::position(5.0, 5.0)), Err(BoardError::PermissionDenied));
    assert_eq!(core.delete_note(NoteId(1)), Err(BoardError::PermissionDenied));
    assert_eq!(core.bulk_delete(&[NoteId(1)]), Err(BoardError::PermissionDenied));
    assert_eq!(core.pending_count(), 0);
    assert_eq!(position(&core, 1), (0.0, 0.0));
}

#[test]
fn viewer_cannot_drag_but_can_select_and_pan() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.set_role(Role::Viewer);

    let down = core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, Modifiers::default());
    assert_eq!(down, vec![Action::Rejected(BoardError::PermissionDenied)]);
    core.on_pointer_move(P, pt(90.0, 90.0));
    assert!(persists(&core.on_pointer_up(P)).is_empty());
    assert_eq!(position(&core, 1), (0.0, 0.0));

    assert!(core.toggle_select(NoteId(1)));
    core.pan(10.0, 0.0);
    assert_eq!(core.camera().pan_x, 10.0);
}

#[test]
fn role_capabilities() {
    assert!(!Role::Viewer.can_mutate());
    assert!(Role::Editor.can_mutate());
    assert!(!Role::Editor.overrides_lock());
    assert!(Role::Admin.overrides_lock());
    assert_eq!(Role::default(), Role::Editor);
}

// =============================================================================
// ADD / UPDATE / DELETE
// =============================================================================

#[test]
fn add_note_centers_in_viewport() {
    let mut core = engine(vec![]);
    let actions = core.add_note().expect("add");
    let reqs = persists(&actions);
    assert_eq!(reqs.len(), 1);
    let Operation::Create(draft) = &reqs[0].op else {
        panic!("expected create, got {:?}", reqs[0].op);
    };
    assert_eq!((draft.x, draft.y), (300.0, 225.0));
    assert_eq!((draft.width, draft.height), (200.0, 150.0));
    assert_eq!(draft.color, DEFAULT_NOTE_COLOR);

    let ids: Vec<NoteId> = core.notes().ids().collect();
    assert_eq!(ids.len(), 1);
    assert!(ids[0].is_provisional());
}

#[test]
fn add_note_stacks_on_top() {
    let mut core = engine(vec![Note { z_index: 4, ..note(1, 0.0, 0.0) }]);
    let actions = core.add_note().expect("add");
    let Operation::Create(draft) = &persists(&actions)[0].op else {
        panic!("expected create");
    };
    assert_eq!(draft.z_index, 5);
}

#[test]
fn add_note_with_raises_size_to_minimum() {
    let mut core = engine(vec![]);
    let draft = NoteDraft {
        content: "tiny".into(),
        importance: Importance::High,
        color: "blue".into(),
        x: 0.0,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        z_index: 0,
        tag_ids: BTreeSet::new(),
    };
    core.add_note_with(draft).expect("add");
    let n = core.notes().all()[0].clone();
    assert_eq!((n.width, n.height), (120.0, 80.0));
}

#[test]
fn update_unknown_note_is_not_found() {
    let mut core = engine(vec![]);
    assert_eq!(core.update_note(NoteId(3), NotePatch::default()), Err(BoardError::NotFound(NoteId(3))));
}

#[test]
fn update_rejects_geometry_on_locked_note_for_editor() {
    let mut core = engine(vec![locked(1, 0.0, 0.0)]);
    assert_eq!(core.update_note(NoteId(1), NotePatch::position(9.0, 9.0)), Err(BoardError::Locked(NoteId(1))));

    let content = NotePatch { content: Some("still editable".into()), ..Default::default() };
    let actions = core.update_note(NoteId(1), content).expect("content edit");
    assert_eq!(persists(&actions).len(), 1);
}

#[test]
fn admin_overrides_lock() {
    let mut core = engine(vec![locked(1, 0.0, 0.0)]);
    core.set_role(Role::Admin);
    let actions = core.update_note(NoteId(1), NotePatch::position(9.0, 9.0)).expect("admin move");
    assert_eq!(persists(&actions).len(), 1);
    assert_eq!(position(&core, 1), (9.0, 9.0));
}

#[test]
fn update_rejects_size_below_minimum() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    let err = core.update_note(NoteId(1), NotePatch::size(100.0, 150.0)).unwrap_err();
    assert_eq!(err, BoardError::BelowMinimumSize { width: 100.0, height: 150.0, min_width: 120.0, min_height: 80.0 });
    assert_eq!(core.note(NoteId(1)).unwrap().width, 200.0);
}

#[test]
fn undersized_note_accepts_edits_that_keep_its_size() {
    let mut core = engine(vec![Note { width: 100.0, height: 60.0, ..note(1, 0.0, 0.0) }]);

    let content = NotePatch { content: Some("tiny".into()), ..Default::default() };
    assert_eq!(persists(&core.update_note(NoteId(1), content).expect("content edit")).len(), 1);
    assert_eq!(persists(&core.update_note(NoteId(1), NotePatch::position(5.0, 5.0)).expect("move")).len(), 1);

    let wider = NotePatch { width: Some(130.0), ..Default::default() };
    core.update_note(NoteId(1), wider).expect("valid width, height untouched");

    let err = core.update_note(NoteId(1), NotePatch { height: Some(70.0), ..Default::default() }).unwrap_err();
    assert!(matches!(err, BoardError::BelowMinimumSize { height, .. } if height == 70.0));
}

#[test]
fn unlocking_requires_admin() {
    let mut core = engine(vec![locked(1, 0.0, 0.0)]);
    let unlock = NotePatch { locked: Some(false), ..Default::default() };
    assert_eq!(core.update_note(NoteId(1), unlock.clone()), Err(BoardError::Locked(NoteId(1))));
    assert!(core.note(NoteId(1)).unwrap().locked);

    core.set_role(Role::Admin);
    core.update_note(NoteId(1), unlock).expect("admin unlock");
    assert!(!core.note(NoteId(1)).unwrap().locked);
}

#[test]
fn editor_can_lock_a_note() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    let lock = NotePatch { locked: Some(true), ..Default::default() };
    assert_eq!(persists(&core.update_note(NoteId(1), lock).expect("lock")).len(), 1);
    assert!(core.note(NoteId(1)).unwrap().locked);
}

#[test]
fn delete_locked_note_requires_admin() {
    let mut core = engine(vec![locked(1, 0.0, 0.0)]);
    assert_eq!(core.delete_note(NoteId(1)), Err(BoardError::Locked(NoteId(1))));

    core.set_role(Role::Admin);
    let actions = core.delete_note(NoteId(1)).expect("admin delete");
    assert_eq!(persists(&actions)[0].op, Operation::Delete { id: NoteId(1) });
    assert!(core.note(NoteId(1)).is_none());
}

#[test]
fn delete_removes_from_selection() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.toggle_select(NoteId(1));
    core.delete_note(NoteId(1)).expect("delete");
    assert!(core.selection().is_empty());
}

// =============================================================================
// DRAG SCENARIOS
// =============================================================================

#[test]
fn click_without_displacement_issues_no_call() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, Modifiers::default());
    let actions = core.on_pointer_up(P);
    assert!(persists(&actions).is_empty());
    assert_eq!(core.pending_count(), 0);
    assert_eq!(position(&core, 1), (10.0, 10.0));
}

#[test]
fn drag_commits_once_on_release() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    core.on_pointer_down(P, pt(20.0, 20.0), Button::Primary, Modifiers::default());
    for step in 1..=5 {
        let d = f64::from(step) * 8.0;
        assert!(persists(&core.on_pointer_move(P, pt(20.0 + d, 20.0 + d))).is_empty());
    }
    let reqs = persists(&core.on_pointer_up(P));
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].op, Operation::Update { id: NoteId(1), patch: NotePatch::position(50.0, 50.0) });
}

#[test]
fn failed_drag_commit_rolls_back_and_notifies() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    let reqs = persists(&drag(&mut core, pt(20.0, 20.0), pt(60.0, 60.0)));
    assert_eq!(position(&core, 1), (50.0, 50.0));

    let actions = core.resolve(reqs[0].ticket, Err(failure()));
    assert_eq!(position(&core, 1), (10.0, 10.0));
    let n = notices(&actions);
    assert_eq!(n.len(), 1);
    let Notice::Failed(f) = &n[0] else {
        panic!("expected failure notice");
    };
    assert_eq!((f.id, f.op, f.rolled_back), (NoteId(1), OpKind::Update, true));
}

#[test]
fn slower_older_commit_cannot_regress_position() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    let first = persists(&drag(&mut core, pt(20.0, 20.0), pt(60.0, 60.0)));
    let second = persists(&drag(&mut core, pt(60.0, 60.0), pt(90.0, 90.0)));
    assert_eq!(position(&core, 1), (80.0, 80.0));

    core.resolve(second[0].ticket, Ok(Response::Updated(note(1, 80.0, 80.0))));
    core.resolve(first[0].ticket, Ok(Response::Updated(note(1, 50.0, 50.0))));
    assert_eq!(position(&core, 1), (80.0, 80.0));
}

#[test]
fn response_mid_gesture_does_not_yank_note() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    let first = persists(&drag(&mut core, pt(20.0, 20.0), pt(60.0, 60.0)));

    core.on_pointer_down(P, pt(60.0, 60.0), Button::Primary, Modifiers::default());
    core.on_pointer_move(P, pt(100.0, 100.0));
    core.resolve(first[0].ticket, Ok(Response::Updated(note(1, 50.0, 50.0))));
    assert_eq!(position(&core, 1), (90.0, 90.0));

    let reqs = persists(&core.on_pointer_up(P));
    assert_eq!(reqs[0].op, Operation::Update { id: NoteId(1), patch: NotePatch::position(90.0, 90.0) });
}

#[test]
fn drag_of_unconfirmed_note_is_flushed_after_create() {
    let mut core = engine(vec![]);
    let draft = NoteDraft {
        content: String::new(),
        importance: Importance::Medium,
        color: "yellow".into(),
        x: 100.0,
        y: 100.0,
        width: 200.0,
        height: 150.0,
        z_index: 0,
        tag_ids: BTreeSet::new(),
    };
    let create = persists(&core.add_note_with(draft.clone()).expect("add"));

    let moved = persists(&drag(&mut core, pt(110.0, 110.0), pt(310.0, 160.0)));
    assert!(moved.is_empty());

    let actions = core.resolve(create[0].ticket, Ok(Response::Created(draft.into_note(NoteId(7)))));
    let followups = persists(&actions);
    assert_eq!(followups.len(), 1);
    assert_eq!(followups[0].op, Operation::Update { id: NoteId(7), patch: NotePatch::position(300.0, 150.0) });
    assert_eq!(position(&core, 7), (300.0, 150.0));

    core.resolve(followups[0].ticket, Err(failure()));
    assert_eq!(position(&core, 7), (100.0, 100.0));
}

#[test]
fn click_in_place_leaves_stacking_unchanged() {
    let mut core = engine(vec![note(1, 0.0, 0.0), Note { z_index: 2, ..note(2, 400.0, 0.0) }]);
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, Modifiers::default());
    assert_eq!(core.note(NoteId(1)).unwrap().z_index, 3);
    assert!(persists(&core.on_pointer_up(P)).is_empty());
    assert_eq!(core.note(NoteId(1)).unwrap().z_index, 0);

    // The next real drag still carries the raise to the backend.
    let reqs = persists(&drag(&mut core, pt(50.0, 50.0), pt(80.0, 50.0)));
    let Operation::Update { patch, .. } = &reqs[0].op else {
        panic!("expected update");
    };
    assert_eq!(patch.z_index, Some(3));
}

#[test]
fn drag_brings_note_to_front_and_persists_z() {
    let mut core = engine(vec![Note { z_index: 3, ..note(1, 300.0, 300.0) }, note(2, 0.0, 0.0)]);
    let reqs = persists(&drag(&mut core, pt(50.0, 50.0), pt(60.0, 50.0)));
    let Operation::Update { patch, .. } = &reqs[0].op else {
        panic!("expected update");
    };
    assert_eq!(patch.z_index, Some(4));
    assert_eq!(patch.x, Some(10.0));
}

#[test]
fn locked_note_does_not_drag() {
    let mut core = engine(vec![locked(1, 0.0, 0.0)]);
    let actions = drag(&mut core, pt(50.0, 50.0), pt(90.0, 90.0));
    assert!(persists(&actions).is_empty());
    assert_eq!(position(&core, 1), (0.0, 0.0));
}

#[test]
fn resize_from_corner_clamps_to_minimum() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    let reqs = persists(&drag(&mut core, pt(200.0, 150.0), pt(50.0, 50.0)));
    let n = core.note(NoteId(1)).unwrap();
    assert_eq!((n.x, n.y, n.width, n.height), (0.0, 0.0, 120.0, 80.0));
    assert_eq!(reqs[0].op, Operation::Update { id: NoteId(1), patch: NotePatch::size(120.0, 80.0) });
}

#[test]
fn pointer_cancel_restores_without_network() {
    let mut core = engine(vec![note(1, 10.0, 10.0)]);
    core.on_pointer_down(P, pt(20.0, 20.0), Button::Primary, Modifiers::default());
    core.on_pointer_move(P, pt(200.0, 200.0));
    let actions = core.on_pointer_cancel(P);
    assert!(persists(&actions).is_empty());
    assert!(notices(&actions).is_empty());
    assert_eq!(position(&core, 1), (10.0, 10.0));
    assert!(!core.is_interacting());
}

#[test]
fn escape_cancels_every_gesture() {
    let mut core = engine(vec![note(1, 0.0, 0.0), note(2, 400.0, 0.0)]);
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, Modifiers::default());
    core.on_pointer_down(Q, pt(450.0, 50.0), Button::Primary, Modifiers::default());
    core.on_pointer_move(P, pt(70.0, 70.0));
    core.on_pointer_move(Q, pt(470.0, 70.0));

    core.on_key_down(&Key("Escape".into()), Modifiers::default());
    assert_eq!(position(&core, 1), (0.0, 0.0));
    assert_eq!(position(&core, 2), (400.0, 0.0));
    assert!(persists(&core.on_pointer_up(P)).is_empty());
}

#[test]
fn second_pointer_cannot_grab_held_note() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, Modifiers::default());
    core.on_pointer_down(Q, pt(60.0, 60.0), Button::Primary, Modifiers::default());
    core.on_pointer_move(Q, pt(160.0, 160.0));
    assert_eq!(position(&core, 1), (0.0, 0.0));
}

// =============================================================================
// SELECTION & BULK DELETE
// =============================================================================

#[test]
fn modifier_click_toggles_selection() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    let shift = Modifiers { shift: true, ..Default::default() };
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, shift);
    core.on_pointer_up(P);
    assert!(core.selection().is_selected(NoteId(1)));

    core.on_pointer_down(P, pt(50.0, 50.0), Button::Primary, shift);
    core.on_pointer_up(P);
    assert!(core.selection().is_empty());
}

#[test]
fn click_on_empty_canvas_clears_selection() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.toggle_select(NoteId(1));
    core.on_pointer_down(P, pt(700.0, 500.0), Button::Primary, Modifiers::default());
    core.on_pointer_up(P);
    assert!(core.selection().is_empty());
}

#[test]
fn reload_clears_selection() {
    let mut core = engine(vec![note(1, 0.0, 0.0), note(2, 0.0, 0.0)]);
    core.select_all();
    assert_eq!(core.selection().len(), 2);
    core.load_notes(vec![note(2, 0.0, 0.0), note(3, 0.0, 0.0)]);
    assert!(core.selection().is_empty());
}

#[test]
fn bulk_delete_with_partial_failure() {
    let mut core = engine((1..=5).map(|i| note(i, 0.0, 0.0)).collect());
    for i in 1..=3 {
        core.toggle_select(NoteId(i));
    }
    let reqs = persists(&core.bulk_delete_selected().expect("bulk delete"));
    assert_eq!(reqs.len(), 3);
    assert_eq!(core.notes().len(), 2);

    core.resolve(reqs[0].ticket, Ok(Response::Deleted));
    core.resolve(reqs[1].ticket, Err(failure()));
    let actions = core.resolve(reqs[2].ticket, Ok(Response::Deleted));

    assert_eq!(core.notes().len(), 3);
    let n = notices(&actions);
    let [Notice::BulkDeleteFinished(report)] = n.as_slice() else {
        panic!("expected one report, got {n:?}");
    };
    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(core.selection().is_empty());
}

#[test]
fn bulk_delete_skips_locked_for_editor() {
    let mut core = engine(vec![note(1, 0.0, 0.0), locked(2, 0.0, 0.0)]);
    let actions = core.bulk_delete(&[NoteId(1), NoteId(2), NoteId(9)]).expect("bulk delete");
    let reqs = persists(&actions);
    assert_eq!(reqs.len(), 1);
    assert!(core.note(NoteId(2)).is_some());

    let done = core.resolve(reqs[0].ticket, Ok(Response::Deleted));
    assert_eq!(
        notices(&done),
        vec![Notice::BulkDeleteFinished(BulkDeleteReport {
            deleted: vec![NoteId(1)],
            failed: vec![],
            skipped_locked: vec![NoteId(2)],
        })]
    );
}

#[test]
fn delete_key_removes_selection() {
    let mut core = engine(vec![note(1, 0.0, 0.0), note(2, 0.0, 0.0)]);
    core.toggle_select(NoteId(2));
    let actions = core.on_key_down(&Key("Delete".into()), Modifiers::default());
    assert_eq!(persists(&actions)[0].op, Operation::Delete { id: NoteId(2) });
}

#[test]
fn delete_key_for_viewer_is_rejected() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.toggle_select(NoteId(1));
    core.set_role(Role::Viewer);
    let actions = core.on_key_down(&Key("Backspace".into()), Modifiers::default());
    assert_eq!(actions, vec![Action::Rejected(BoardError::PermissionDenied)]);
    assert!(core.note(NoteId(1)).is_some());
}

#[test]
fn confirmed_create_keeps_selection() {
    let mut core = engine(vec![]);
    let create = persists(&core.add_note().expect("add"));
    let provisional = core.notes().ids().next().expect("note");
    core.toggle_select(provisional);

    let Operation::Create(draft) = create[0].op.clone() else {
        panic!("expected create");
    };
    core.resolve(create[0].ticket, Ok(Response::Created(draft.into_note(NoteId(11)))));
    assert_eq!(core.selection().ids(), vec![NoteId(11)]);
}

#[test]
fn failed_create_removes_note_and_selection() {
    let mut core = engine(vec![]);
    let create = persists(&core.add_note().expect("add"));
    core.select_all();
    core.resolve(create[0].ticket, Err(failure()));
    assert!(core.notes().is_empty());
    assert!(core.selection().is_empty());
}

// =============================================================================
// VIEWPORT
// =============================================================================

#[test]
fn wheel_pans_inverted() {
    let mut core = engine(vec![]);
    core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 5.0, dy: 10.0 }, Modifiers::default());
    assert_eq!((core.camera().pan_x, core.camera().pan_y), (-5.0, -10.0));
}

#[test]
fn non_finite_wheel_leaves_camera_alone() {
    let mut core = engine(vec![]);
    let ctrl = Modifiers { ctrl: true, ..Default::default() };
    core.on_wheel(pt(10.0, 10.0), WheelDelta { dx: 0.0, dy: f64::NAN }, ctrl);
    core.on_wheel(pt(10.0, 10.0), WheelDelta { dx: f64::INFINITY, dy: 0.0 }, Modifiers::default());
    core.zoom_at(f64::NAN, Some(pt(10.0, 10.0)));
    let cam = core.camera();
    assert_eq!(cam.zoom(), 1.0);
    assert_eq!((cam.pan_x, cam.pan_y), (0.0, 0.0));
}

#[test]
fn ctrl_wheel_zooms_around_pointer() {
    let mut core = engine(vec![]);
    let pivot = pt(400.0, 300.0);
    let before = core.camera().screen_to_world(pivot);
    let ctrl = Modifiers { ctrl: true, ..Default::default() };
    core.on_wheel(pivot, WheelDelta { dx: 0.0, dy: -500.0 }, ctrl);

    assert!((core.camera().zoom() - 1.5).abs() < 1e-9);
    let after = core.camera().screen_to_world(pivot);
    assert!((before.x - after.x).abs() < 1e-9);
    assert!((before.y - after.y).abs() < 1e-9);
}

#[test]
fn middle_button_pans_even_over_notes() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.on_pointer_down(P, pt(50.0, 50.0), Button::Middle, Modifiers::default());
    core.on_pointer_move(P, pt(80.0, 70.0));
    core.on_pointer_up(P);
    assert_eq!((core.camera().pan_x, core.camera().pan_y), (30.0, 20.0));
    assert_eq!(position(&core, 1), (0.0, 0.0));
}

#[test]
fn drag_respects_zoom() {
    let mut core = engine(vec![note(1, 0.0, 0.0)]);
    core.zoom_at(1.0, None);
    // At zoom 2 the note spans 0..400 on screen; 100px of pointer travel is 50 world units.
    let reqs = persists(&drag(&mut core, pt(100.0, 100.0), pt(200.0, 100.0)));
    assert_eq!(position(&core, 1), (50.0, 0.0));
    assert_eq!(reqs.len(), 1);
}

// =============================================================================
// TAGS
// =============================================================================

#[test]
fn tag_catalog_prunes_dangling_references() {
    let tagged = Note { tag_ids: [TagId(1), TagId(2)].into_iter().collect(), ..note(1, 0.0, 0.0) };
    let mut core = engine(vec![tagged.clone()]);
    core.load_tags(vec![Tag { id: TagId(1), name: "work".into(), color: "red".into() }]);
    assert_eq!(core.note(NoteId(1)).unwrap().tag_ids, [TagId(1)].into_iter().collect());

    core.load_notes(vec![tagged]);
    assert_eq!(core.note(NoteId(1)).unwrap().tag_ids.len(), 1);
    assert_eq!(core.tags().len(), 1);
}

#[test]
fn without_catalog_references_are_kept() {
    let tagged = Note { tag_ids: [TagId(5)].into_iter().collect(), ..note(1, 0.0, 0.0) };
    let core = engine(vec![tagged]);
    assert_eq!(core.note(NoteId(1)).unwrap().tag_ids.len(), 1);
    assert!(core.tags().is_empty());
}
