//! End-to-end editing scenarios driven through the public editor API.

use kurbo::Point;
use mapsmith_core::{
    Bounds, Collaborators, Connector, DockPosition, EdgeLabel, EditError, Editor, EditorConfig, ElementRef,
    LayersPanel, MapDocument, MarkerKind, MemoryStorage, Notice, Notifier, PairingState, Renderer, ShapeKind,
    SnapMode, Storage, StructureKind, ToolKind,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Update(ElementRef),
    Remove(ElementRef),
    UpdateConnector(Connector),
    RemoveConnector(Connector),
    Layers,
    Notify(Notice),
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Call>>>);

impl Recorder {
    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    fn notices(&self) -> Vec<Notice> {
        self.0
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Notify(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for Recorder {
    fn update_element(&mut self, element: ElementRef) {
        self.0.borrow_mut().push(Call::Update(element));
    }

    fn remove_element(&mut self, element: ElementRef) {
        self.0.borrow_mut().push(Call::Remove(element));
    }

    fn update_connector(&mut self, connector: Connector) {
        self.0.borrow_mut().push(Call::UpdateConnector(connector));
    }

    fn remove_connector(&mut self, connector: Connector) {
        self.0.borrow_mut().push(Call::RemoveConnector(connector));
    }
}

impl LayersPanel for Recorder {
    fn update_layers_list(&mut self) {
        self.0.borrow_mut().push(Call::Layers);
    }
}

impl Notifier for Recorder {
    fn notify(&mut self, notice: Notice) {
        self.0.borrow_mut().push(Call::Notify(notice));
    }
}

fn recorded_editor() -> (Editor, Recorder) {
    let recorder = Recorder::default();
    let collaborators = Collaborators::default()
        .with_renderer(recorder.clone())
        .with_layers(recorder.clone())
        .with_notifier(recorder.clone());
    let editor = Editor::new(EditorConfig::default()).with_collaborators(collaborators);
    (editor, recorder)
}

fn place_wall(editor: &mut Editor, bounds: Bounds) -> u64 {
    editor.set_structure_kind(StructureKind::Wall);
    let id = editor.place_structure(ShapeKind::Rectangle, bounds).unwrap();
    editor.set_structure_kind(StructureKind::Room);
    id
}

#[test]
fn door_snaps_to_rectangle_wall() {
    let (mut editor, _) = recorded_editor();
    let wall = place_wall(&mut editor, Bounds::new(0.0, 0.0, 100.0, 50.0));

    let door = editor.place_marker(MarkerKind::Door, Point::new(110.0, 10.0)).unwrap();
    let door = editor.document().marker(door).unwrap();
    assert_eq!(door.position(), Point::new(100.0, 10.0));
    assert_eq!(door.data.wall_id, Some(wall));
    assert_eq!(door.data.edge, Some(EdgeLabel::Right));
    assert_eq!(door.data.rotation, -90.0);
}

#[test]
fn door_snaps_to_circle_wall() {
    let (mut editor, _) = recorded_editor();
    editor.set_structure_kind(StructureKind::Wall);
    editor
        .place_structure(ShapeKind::Circle, Bounds::new(0.0, 0.0, 100.0, 100.0))
        .unwrap();

    let door = editor.place_marker(MarkerKind::Door, Point::new(50.0, 150.0)).unwrap();
    let door = editor.document().marker(door).unwrap();
    assert!((door.position() - Point::new(50.0, 100.0)).hypot() < 1e-9);
    assert!((door.data.rotation - 180.0).abs() < 1e-9);
}

#[test]
fn door_far_from_walls_is_rejected_with_notice() {
    let (mut editor, recorder) = recorded_editor();
    place_wall(&mut editor, Bounds::new(0.0, 0.0, 100.0, 50.0));
    // Rooms are not walls.
    editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(500.0, 500.0, 100.0, 100.0))
        .unwrap();
    recorder.take();

    let result = editor.place_marker(MarkerKind::Door, Point::new(510.0, 490.0));
    assert_eq!(result, Err(EditError::NoTarget("wall")));
    assert_eq!(editor.document().markers.len(), 0);
    assert_eq!(recorder.notices().len(), 1);
}

#[test]
fn doors_follow_their_wall() {
    let (mut editor, _) = recorded_editor();
    editor.set_snap_mode(SnapMode::None);
    let wall = place_wall(&mut editor, Bounds::new(0.0, 0.0, 100.0, 50.0));
    let door = editor.place_marker(MarkerKind::Door, Point::new(110.0, 10.0)).unwrap();

    editor.move_structure(wall, Point::new(200.0, 100.0)).unwrap();
    assert_eq!(editor.document().marker(door).unwrap().position(), Point::new(300.0, 110.0));

    // Shrinking the wall pulls the door onto the new outline.
    editor.resize_structure(wall, Bounds::new(200.0, 100.0, 60.0, 50.0)).unwrap();
    let door = editor.document().marker(door).unwrap();
    assert_eq!(door.position(), Point::new(260.0, 110.0));
    assert_eq!(door.data.edge, Some(EdgeLabel::Right));
}

#[test]
fn deleting_a_wall_deletes_its_doors() {
    let (mut editor, recorder) = recorded_editor();
    let wall = place_wall(&mut editor, Bounds::new(0.0, 0.0, 100.0, 50.0));
    let door = editor.place_marker(MarkerKind::Door, Point::new(50.0, -5.0)).unwrap();
    recorder.take();

    editor.delete_structure(wall).unwrap();
    assert!(editor.document().marker(door).is_none());
    let calls = recorder.take();
    assert!(calls.contains(&Call::Remove(ElementRef::Marker(door))));
    assert!(calls.contains(&Call::Remove(ElementRef::Structure(wall))));
    assert!(calls.contains(&Call::Layers));

    assert!(editor.undo());
    assert!(editor.document().marker(door).is_some());
    assert!(editor.document().structure(wall).is_some());
}

#[test]
fn teleport_pair_lifecycle() {
    let (mut editor, recorder) = recorded_editor();
    editor.set_tool(ToolKind::Teleport);

    let a = editor.place_marker(MarkerKind::Teleport, Point::new(0.0, 0.0)).unwrap();
    assert!(matches!(
        editor.pairing().state(),
        PairingState::AwaitingPointB { point_a, .. } if point_a == a
    ));
    let b = editor.place_marker(MarkerKind::Teleport, Point::new(300.0, 0.0)).unwrap();
    assert_eq!(editor.pairing().state(), PairingState::Idle);

    let connector = Connector { from: a, to: b };
    assert_eq!(editor.connectors(), &[connector]);
    assert!(recorder.take().contains(&Call::UpdateConnector(connector)));
    assert_eq!(editor.document().marker(a).unwrap().paired_marker(), Some(b));
    assert_eq!(editor.document().marker(b).unwrap().paired_marker(), Some(a));

    editor.delete_marker(a).unwrap();
    let partner = editor.document().marker(b).unwrap();
    assert_eq!(partner.paired_marker(), None);
    assert!(!partner.data.has_pair);
    assert!(editor.connectors().is_empty());
    assert!(recorder.take().contains(&Call::RemoveConnector(connector)));
}

#[test]
fn leaving_teleport_tool_discards_point_a() {
    let (mut editor, recorder) = recorded_editor();
    editor.set_tool(ToolKind::Teleport);
    let a = editor.place_marker(MarkerKind::Teleport, Point::new(10.0, 10.0)).unwrap();
    recorder.take();

    editor.set_tool(ToolKind::Select);
    assert!(editor.document().marker(a).is_none());
    assert_eq!(editor.pairing().state(), PairingState::Idle);
    assert!(recorder.take().contains(&Call::Remove(ElementRef::Marker(a))));
}

#[test]
fn undo_rebuilds_teleport_links() {
    let (mut editor, _) = recorded_editor();
    let a = editor.place_marker(MarkerKind::Teleport, Point::new(0.0, 0.0)).unwrap();
    let b = editor.place_marker(MarkerKind::Teleport, Point::new(100.0, 0.0)).unwrap();
    editor.delete_marker(b).unwrap();
    assert!(editor.connectors().is_empty());

    assert!(editor.undo());
    assert_eq!(editor.connectors(), &[Connector { from: a, to: b }]);
    assert_eq!(editor.document().marker(a).unwrap().paired_marker(), Some(b));
}

#[test]
fn docked_rooms_move_together() {
    let (mut editor, _) = recorded_editor();
    let hall = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 200.0, 100.0))
        .unwrap();
    let closet = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(500.0, 500.0, 50.0, 50.0))
        .unwrap();

    editor.dock(hall, closet, DockPosition::RightTop).unwrap();
    assert_eq!(editor.document().structure(closet).unwrap().origin(), Point::new(200.0, 0.0));

    // Dragging the dependent moves the whole group from its anchor.
    let moved = editor.move_structure(closet, Point::new(300.0, 100.0)).unwrap();
    assert_eq!(moved.len(), 2);
    assert_eq!(editor.document().structure(hall).unwrap().origin(), Point::new(100.0, 100.0));
    assert_eq!(editor.document().structure(closet).unwrap().origin(), Point::new(300.0, 100.0));

    assert!(matches!(
        editor.dock(closet, hall, DockPosition::LeftTop),
        Err(EditError::InvalidDock { .. })
    ));

    editor.delete_structure(hall).unwrap();
    assert!(!editor.document().docking.is_docked(closet));
}

#[test]
fn saved_map_reloads_with_runtime_state() {
    let (mut editor, _) = recorded_editor();
    let wall = place_wall(&mut editor, Bounds::new(0.0, 0.0, 100.0, 50.0));
    editor.place_marker(MarkerKind::Door, Point::new(110.0, 10.0)).unwrap();
    let a = editor.place_marker(MarkerKind::Teleport, Point::new(0.0, 200.0)).unwrap();
    let b = editor.place_marker(MarkerKind::Teleport, Point::new(200.0, 200.0)).unwrap();
    let room = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(300.0, 300.0, 50.0, 50.0))
        .unwrap();
    editor.dock(wall, room, DockPosition::BottomLeft).unwrap();

    let storage = MemoryStorage::new();
    let doc = editor.into_document();
    pollster::block_on(storage.save("keep", &doc)).unwrap();
    let loaded = pollster::block_on(storage.load("keep")).unwrap();
    assert_eq!(loaded.marker(a).unwrap().paired_marker(), None);

    let editor = Editor::from_document(loaded, EditorConfig::default());
    assert_eq!(editor.connectors(), &[Connector { from: a, to: b }]);
    assert_eq!(editor.document().docking.anchor_of(room), Some(wall));

    // New ids never collide with loaded ones.
    let mut editor = editor;
    let c = editor.place_marker(MarkerKind::Note, Point::new(0.0, 0.0)).unwrap();
    assert!(c > b);
}

#[test]
fn loading_repairs_dangling_references() {
    let json = r#"{
        "id": "old-map",
        "structures": {
            "1": {"id": 1, "shape": "rectangle", "bounds": {"x": 0, "y": 0, "width": 100, "height": 50}, "kind": "wall"}
        },
        "z_order": [1, 7],
        "markers": {
            "3": {"id": 3, "type": "door", "x": 100, "y": 10, "data": {"wall_id": 9, "rotation": -90}},
            "4": {"id": 4, "type": "teleport", "x": 0, "y": 0, "data": {"pair_id": 2, "is_point_a": true, "has_pair": true}}
        },
        "folders": [{"name": "Ground floor", "structure_ids": [1, 8]}]
    }"#;
    let doc = MapDocument::from_json(json).unwrap();
    let editor = Editor::from_document(doc, EditorConfig::default());
    let doc = editor.document();

    assert_eq!(doc.z_order, vec![1]);
    assert_eq!(doc.folders[0].structure_ids, vec![1]);
    assert_eq!(doc.marker(3).unwrap().data.wall_id, None);
    assert_eq!(doc.marker(4).unwrap().paired_marker(), None);
    assert!(editor.connectors().is_empty());
    assert!(doc.docking.is_empty());
}

#[test]
fn locked_member_of_docked_group_never_moves() {
    let (mut editor, recorder) = recorded_editor();
    editor.set_snap_mode(SnapMode::None);
    let hall = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    let closet = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(500.0, 500.0, 50.0, 50.0))
        .unwrap();
    let porch = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(900.0, 0.0, 50.0, 50.0))
        .unwrap();
    editor.dock(hall, closet, DockPosition::RightTop).unwrap();
    editor.set_locked(closet, true).unwrap();
    let before = editor.document().structures.clone();
    recorder.take();

    assert_eq!(
        editor.move_structure(hall, Point::new(300.0, 300.0)),
        Err(EditError::Locked(closet))
    );
    assert_eq!(
        editor.resize_structure(hall, Bounds::new(-50.0, -50.0, 150.0, 150.0)),
        Err(EditError::Locked(closet))
    );
    assert_eq!(
        editor.dock(porch, hall, DockPosition::BottomLeft),
        Err(EditError::Locked(closet))
    );

    assert_eq!(editor.document().structures, before);
    assert_eq!(recorder.notices().len(), 3);
    // Nothing was recorded for the rejected edits.
    assert!(editor.undo());
    assert!(!editor.document().structure(closet).unwrap().locked);
}

#[test]
fn resizing_docked_room_keeps_its_slot() {
    let (mut editor, _) = recorded_editor();
    editor.set_snap_mode(SnapMode::None);
    let hall = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    let closet = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(500.0, 500.0, 50.0, 50.0))
        .unwrap();
    editor.dock(hall, closet, DockPosition::RightTop).unwrap();

    editor
        .resize_structure(closet, Bounds::new(130.0, 20.0, 80.0, 80.0))
        .unwrap();
    let offset = editor.document().docking.relationship(closet).unwrap().offset;
    assert_eq!(
        editor.document().structure(closet).unwrap().bounds,
        Bounds::new(100.0, 0.0, 80.0, 80.0)
    );

    editor.move_structure(hall, Point::new(10.0, 10.0)).unwrap();
    let hall_origin = editor.document().structure(hall).unwrap().origin();
    assert_eq!(
        editor.document().structure(closet).unwrap().origin(),
        hall_origin + offset
    );
    assert_eq!(editor.document().structure(closet).unwrap().origin(), Point::new(110.0, 10.0));
}

#[test]
fn zoom_stays_in_range_under_custom_config() {
    let config = EditorConfig::from_json(r#"{"min_zoom": 0.01, "max_zoom": 50}"#).unwrap();
    let mut editor = Editor::new(config);
    editor.zoom_at(Point::new(400.0, 300.0), 0.01);
    assert_eq!(editor.camera().scale, 0.1);
    editor.zoom_at(Point::new(400.0, 300.0), 50.0);
    assert_eq!(editor.camera().scale, 4.0);

    // Limits set in code bypass sanitizing but still hold.
    let config = EditorConfig {
        min_zoom: 0.001,
        max_zoom: 100.0,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(config);
    editor.zoom_by(Point::ZERO, 1000.0);
    assert_eq!(editor.camera().scale, 4.0);
    editor.zoom_by(Point::ZERO, 1e-6);
    assert_eq!(editor.camera().scale, 0.1);
}

#[test]
fn redone_point_a_is_pending_again() {
    let (mut editor, recorder) = recorded_editor();
    editor.set_tool(ToolKind::Teleport);
    let a = editor.place_marker(MarkerKind::Teleport, Point::new(10.0, 10.0)).unwrap();

    assert!(editor.undo());
    assert!(editor.document().marker(a).is_none());
    assert_eq!(editor.pairing().state(), PairingState::Idle);

    assert!(editor.redo());
    assert!(editor.document().marker(a).is_some());
    assert_eq!(editor.pairing().pending(), Some(a));
    recorder.take();

    editor.set_tool(ToolKind::Select);
    assert!(editor.document().marker(a).is_none());
    assert_eq!(editor.pairing().state(), PairingState::Idle);
    assert!(recorder.take().contains(&Call::Remove(ElementRef::Marker(a))));
}

#[test]
fn discarded_point_a_leaves_no_undo_step() {
    let (mut editor, _) = recorded_editor();
    let room = editor
        .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
        .unwrap();
    editor.set_tool(ToolKind::Teleport);
    editor.place_marker(MarkerKind::Teleport, Point::new(10.0, 10.0)).unwrap();
    editor.cancel();
    assert!(editor.document().markers.is_empty());

    // The next undo removes the room, not the discarded point A.
    assert!(editor.undo());
    assert!(editor.document().structure(room).is_none());
    assert!(!editor.document().can_undo());
}
