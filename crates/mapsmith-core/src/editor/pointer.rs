//! Routing of raw pointer and keyboard events to editor operations.

use super::{Editor, MarkerDrag, Selection};
use crate::error::EditResult;
use crate::input::{KeyEvent, Modifiers, MouseButton, PointerEvent};
use crate::selection::{self, HANDLE_HIT_TOLERANCE};
use crate::tools::ToolKind;
use kurbo::Point;

impl Editor {
    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.input.set_modifiers(modifiers);
    }

    /// Handle a pointer event in screen coordinates.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> EditResult<()> {
        self.input.handle_pointer_event(event);
        let world = self.camera.screen_to_world(event.position());

        match event {
            PointerEvent::Down { button, .. } => self.pointer_down(world, button),
            PointerEvent::Move { .. } => {
                self.pointer_move(world);
                Ok(())
            }
            PointerEvent::Up { button, .. } => self.pointer_up(world, button),
            PointerEvent::Scroll { position, delta } => {
                if delta.y != 0.0 {
                    let step = self.config.zoom_step;
                    let factor = if delta.y < 0.0 { step } else { step.recip() };
                    self.camera.zoom_by(position, factor);
                }
                Ok(())
            }
        }
    }

    fn pointer_down(&mut self, world: Point, button: MouseButton) -> EditResult<()> {
        if button == MouseButton::Middle || self.tools.current_tool == ToolKind::Pan {
            self.panning = true;
            return Ok(());
        }
        if button != MouseButton::Left {
            return Ok(());
        }

        let tool = self.tools.current_tool;
        match tool {
            ToolKind::Select => {
                self.select_at(world);
                Ok(())
            }
            ToolKind::Pan => Ok(()),
            ToolKind::Rectangle | ToolKind::Circle => {
                let start = self.grid().snap_point(world).point;
                self.tools.begin(start);
                Ok(())
            }
            ToolKind::Polygon => {
                if self.input.is_double_click() {
                    self.finish_polygon().map(|_| ())
                } else {
                    self.add_polygon_point(world).map(|_| ())
                }
            }
            ToolKind::Door
            | ToolKind::Teleport
            | ToolKind::Prop
            | ToolKind::Encounter
            | ToolKind::Light
            | ToolKind::Note => match tool.marker_kind() {
                Some(kind) => self.place_marker(kind, world).map(|_| ()),
                None => Ok(()),
            },
        }
    }

    /// Select-tool press: resize handle of the selection first, then markers,
    /// then the topmost structure.
    fn select_at(&mut self, world: Point) {
        let handle_tolerance = self.camera.screen_distance_to_world(HANDLE_HIT_TOLERANCE);
        if let Some(Selection::Structure(id)) = self.selection {
            let handle = self
                .document
                .structure(id)
                .and_then(|s| selection::hit_test_handles(s, world, handle_tolerance));
            if let Some(corner) = handle {
                self.document.push_undo();
                match self
                    .drag
                    .begin_resize(&self.document.structures, &self.document.docking, id, corner, world)
                {
                    Ok(()) => return,
                    Err(err) => {
                        self.document.discard_undo();
                        log::debug!("Resize not started: {}", err);
                    }
                }
            }
        }

        let marker_radius = self.camera.screen_distance_to_world(self.config.marker_radius);
        if let Some(marker) = self
            .document
            .marker_at(world, marker_radius)
            .and_then(|id| self.document.marker(id))
        {
            self.selection = Some(Selection::Marker(marker.id));
            self.marker_drag = Some(MarkerDrag {
                original: marker.clone(),
                start_point: world,
                changed: false,
            });
            self.document.push_undo();
            return;
        }

        let tolerance = self.camera.screen_distance_to_world(self.config.hit_tolerance);
        match self.document.structure_at(world, tolerance) {
            Some(id) => {
                self.selection = Some(Selection::Structure(id));
                self.document.push_undo();
                if let Err(err) =
                    self.drag
                        .begin_move(&self.document.structures, &self.document.docking, id, world)
                {
                    self.document.discard_undo();
                    log::debug!("Move not started: {}", err);
                }
            }
            None => self.selection = None,
        }
    }

    fn pointer_move(&mut self, world: Point) {
        if self.panning {
            let delta = self.input.pointer_delta();
            self.camera.pan(delta);
            return;
        }

        if !self.drag.is_idle() {
            let before = self.bounds_of(&self.drag.affected());
            let grid = self.grid();
            let moved = self.drag.update(
                &mut self.document.structures,
                &self.document.docking,
                world,
                &grid,
            );
            if !moved.is_empty() {
                self.sync_doors(&before);
                self.refresh_structures(&moved);
            }
            return;
        }

        if let Some(drag) = &self.marker_drag {
            let id = drag.original.id;
            let target = drag.original.position() + (world - drag.start_point);
            match self.position_marker(id, target) {
                Ok(()) => {
                    if let Some(drag) = self.marker_drag.as_mut() {
                        drag.changed = true;
                    }
                }
                Err(err) => log::trace!("Marker {} stays put: {}", id, err),
            }
            return;
        }

        self.tools.update(world);
    }

    fn pointer_up(&mut self, world: Point, button: MouseButton) -> EditResult<()> {
        if self.panning && (button == MouseButton::Middle || self.tools.current_tool == ToolKind::Pan) {
            self.panning = false;
            return Ok(());
        }
        if button != MouseButton::Left {
            return Ok(());
        }

        if let Some(outcome) = self.drag.end() {
            if !outcome.changed {
                self.document.discard_undo();
            }
            return Ok(());
        }

        if let Some(drag) = self.marker_drag.take() {
            if !drag.changed {
                self.document.discard_undo();
            }
            return Ok(());
        }

        let Some(shape) = self.tools.current_tool.shape_kind() else {
            return Ok(());
        };
        match self.tools.end(world) {
            Some(bounds) => self.place_structure(shape, bounds).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Handle a key press or release.
    pub fn handle_key(&mut self, event: &KeyEvent) -> EditResult<()> {
        self.input.handle_key_event(event);
        let KeyEvent::Pressed(key) = event else {
            return Ok(());
        };
        let command = self.input.modifiers.command();

        match key.as_str() {
            "Escape" => self.cancel(),
            "Enter" if self.tools.current_tool == ToolKind::Polygon => {
                self.finish_polygon()?;
            }
            "Delete" | "Backspace" => self.delete_selected()?,
            "z" | "Z" if command => {
                if self.input.modifiers.shift {
                    self.redo();
                } else {
                    self.undo();
                }
            }
            "y" | "Y" if command => {
                self.redo();
            }
            "g" | "G" if !command => {
                self.cycle_snap_mode();
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::editor::{Editor, EditorConfig, Selection};
    use crate::input::{KeyEvent, Modifiers, MouseButton, PointerEvent};
    use crate::markers::MarkerKind;
    use crate::shapes::{Bounds, ShapeKind};
    use crate::snap::SnapMode;
    use crate::tools::ToolKind;
    use kurbo::{Point, Vec2};

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    fn mv(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
        }
    }

    fn press(key: &str) -> KeyEvent {
        KeyEvent::Pressed(key.to_string())
    }

    #[test]
    fn test_drag_creates_rectangle() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_tool(ToolKind::Rectangle);
        editor.handle_pointer(down(0.0, 0.0)).unwrap();
        editor.handle_pointer(mv(120.0, 80.0)).unwrap();
        assert_eq!(
            editor.tools().preview_bounds(),
            Some(Bounds::new(0.0, 0.0, 120.0, 80.0))
        );
        editor.handle_pointer(up(200.0, 100.0)).unwrap();

        let structure = editor.document().structures_ordered().next().unwrap();
        assert_eq!(structure.bounds, Bounds::new(0.0, 0.0, 200.0, 100.0));
        assert!(!editor.tools().is_active());
    }

    #[test]
    fn test_select_drag_moves_structure() {
        let mut editor = Editor::new(EditorConfig::default());
        let id = editor
            .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();

        editor.handle_pointer(down(50.0, 50.0)).unwrap();
        assert_eq!(editor.selection(), Some(Selection::Structure(id)));
        editor.handle_pointer(mv(150.0, 100.0)).unwrap();
        editor.handle_pointer(up(150.0, 100.0)).unwrap();

        assert_eq!(
            editor.document().structure(id).unwrap().origin(),
            Point::new(100.0, 50.0)
        );
        assert!(editor.drag_state().is_idle());

        // One entry for the placement and one for the drag.
        assert!(editor.undo());
        assert_eq!(editor.document().structure(id).unwrap().origin(), Point::ZERO);
    }

    #[test]
    fn test_click_without_moving_leaves_no_history() {
        let mut editor = Editor::new(EditorConfig::default());
        let id = editor
            .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        editor.handle_pointer(down(50.0, 50.0)).unwrap();
        editor.handle_pointer(up(50.0, 50.0)).unwrap();

        assert!(editor.undo());
        assert!(editor.document().structure(id).is_none());
        assert!(!editor.document().can_undo());
    }

    #[test]
    fn test_escape_cancels_drag() {
        let mut editor = Editor::new(EditorConfig::default());
        let id = editor
            .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        editor.handle_pointer(down(50.0, 50.0)).unwrap();
        editor.handle_pointer(mv(250.0, 250.0)).unwrap();
        assert_ne!(editor.document().structure(id).unwrap().origin(), Point::ZERO);

        editor.handle_key(&press("Escape")).unwrap();
        assert!(editor.drag_state().is_idle());
        assert_eq!(editor.document().structure(id).unwrap().origin(), Point::ZERO);
    }

    #[test]
    fn test_resize_from_handle() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_snap_mode(SnapMode::Strict);
        let id = editor
            .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        editor.select(Some(Selection::Structure(id)));

        editor.handle_pointer(down(100.0, 100.0)).unwrap();
        editor.handle_pointer(mv(203.0, 148.0)).unwrap();
        editor.handle_pointer(up(203.0, 148.0)).unwrap();

        assert_eq!(
            editor.document().structure(id).unwrap().bounds,
            Bounds::new(0.0, 0.0, 200.0, 150.0)
        );
    }

    #[test]
    fn test_polygon_double_click_finishes() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_tool(ToolKind::Polygon);
        editor.handle_pointer(down(0.0, 0.0)).unwrap();
        editor.handle_pointer(up(0.0, 0.0)).unwrap();
        editor.handle_pointer(down(200.0, 0.0)).unwrap();
        editor.handle_pointer(up(200.0, 0.0)).unwrap();
        editor.handle_pointer(down(100.0, 200.0)).unwrap();
        editor.handle_pointer(up(100.0, 200.0)).unwrap();
        assert_eq!(editor.tools().polygon_points().len(), 3);

        editor.handle_pointer(down(100.0, 200.0)).unwrap();
        assert!(editor.tools().polygon_points().is_empty());
        assert_eq!(editor.document().structures.len(), 1);
    }

    #[test]
    fn test_marker_tool_places_marker() {
        let mut editor = Editor::new(EditorConfig::default());
        editor.set_tool(ToolKind::Light);
        editor.handle_pointer(down(40.0, 60.0)).unwrap();
        let marker = editor.document().markers.values().next().unwrap();
        assert_eq!(marker.kind, MarkerKind::Light);
        assert_eq!(marker.position(), Point::new(40.0, 60.0));
    }

    #[test]
    fn test_marker_drag_moves_marker() {
        let mut editor = Editor::new(EditorConfig::default());
        let id = editor
            .place_marker(MarkerKind::Note, Point::new(40.0, 40.0))
            .unwrap();

        editor.handle_pointer(down(42.0, 41.0)).unwrap();
        assert_eq!(editor.selection(), Some(Selection::Marker(id)));
        editor.handle_pointer(mv(142.0, 61.0)).unwrap();
        editor.handle_pointer(up(142.0, 61.0)).unwrap();
        assert_eq!(
            editor.document().marker(id).unwrap().position(),
            Point::new(140.0, 60.0)
        );
    }

    #[test]
    fn test_middle_button_pans() {
        let mut editor = Editor::new(EditorConfig::default());
        editor
            .handle_pointer(PointerEvent::Down {
                position: Point::new(10.0, 10.0),
                button: MouseButton::Middle,
            })
            .unwrap();
        editor.handle_pointer(mv(30.0, 25.0)).unwrap();
        assert_eq!(editor.camera().offset, Vec2::new(20.0, 15.0));
    }

    #[test]
    fn test_scroll_zooms_toward_cursor() {
        let mut editor = Editor::new(EditorConfig::default());
        editor
            .handle_pointer(PointerEvent::Scroll {
                position: Point::new(100.0, 100.0),
                delta: Vec2::new(0.0, -1.0),
            })
            .unwrap();
        assert!((editor.camera().scale - 1.1).abs() < 1e-9);
        let world = editor.camera().screen_to_world(Point::new(100.0, 100.0));
        assert!((world - Point::new(100.0, 100.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_keyboard_undo_redo() {
        let mut editor = Editor::new(EditorConfig::default());
        editor
            .place_structure(ShapeKind::Rectangle, Bounds::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        editor.set_modifiers(Modifiers {
            ctrl: true,
            ..Modifiers::default()
        });
        editor.handle_key(&press("z")).unwrap();
        assert!(editor.document().structures.is_empty());

        editor.set_modifiers(Modifiers {
            ctrl: true,
            shift: true,
            ..Modifiers::default()
        });
        editor.handle_key(&press("Z")).unwrap();
        assert_eq!(editor.document().structures.len(), 1);
    }

    #[test]
    fn test_g_cycles_snap_mode() {
        let mut editor = Editor::new(EditorConfig::default());
        assert_eq!(editor.document().snap_mode, SnapMode::Soft);
        editor.handle_key(&press("g")).unwrap();
        assert_eq!(editor.document().snap_mode, SnapMode::Strict);
    }
}
