use eframe::egui::{self, CursorIcon, PointerButton, Rect, Ui};

use super::super::ViewModel;
use super::super::viewport::{canvas_point, input_zoom_factor};

impl ViewModel {
    /// Feeds this frame's pointer input on the canvas into the controller.
    pub(in crate::app) fn handle_canvas_input(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
    ) {
        self.handle_canvas_zoom(ui, rect, response);
        self.handle_canvas_drag(ui, rect, response);

        let pointer = response
            .hover_pos()
            .map(|pointer| canvas_point(rect.min, pointer));
        self.controller.hover(
            &self.epoch.view,
            self.epoch.simulation.as_ref(),
            pointer,
            &self.config.style,
        );

        if self.controller.is_dragging() {
            ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
        } else if self.controller.hovered_index().is_some() {
            ui.ctx().set_cursor_icon(CursorIcon::Grab);
        }
    }

    fn handle_canvas_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let (scroll, pinch) = ui.input(|input| (input.raw_scroll_delta.y, input.zoom_delta()));
        let factor = input_zoom_factor(scroll, pinch);
        if (factor - 1.0).abs() <= f32::EPSILON {
            return;
        }

        let pointer = response.hover_pos().unwrap_or_else(|| rect.center());
        self.controller.zoom_at(
            canvas_point(rect.min, pointer),
            factor,
            &self.config.zoom_extent,
        );
    }

    fn handle_canvas_drag(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if response.drag_started_by(PointerButton::Primary)
            && let Some(simulation) = self.epoch.simulation.as_mut()
        {
            let origin = ui
                .input(|input| input.pointer.press_origin())
                .or_else(|| response.interact_pointer_pos());
            let hit = origin.and_then(|origin| {
                self.controller.node_at(
                    &self.epoch.view,
                    simulation,
                    canvas_point(rect.min, origin),
                    &self.config.style,
                )
            });
            if let Some(index) = hit {
                self.controller.begin_node_drag(
                    &self.epoch.view,
                    simulation,
                    index,
                    &self.config.simulation,
                );
            }
        }

        if response.dragged() {
            let node_drag = self.controller.is_dragging()
                && response.dragged_by(PointerButton::Primary);
            match (node_drag, self.epoch.simulation.as_mut()) {
                (true, Some(simulation)) => {
                    if let Some(pointer) = response.interact_pointer_pos() {
                        self.controller
                            .drag_to(simulation, canvas_point(rect.min, pointer));
                    }
                }
                _ => self.controller.pan_by(response.drag_delta()),
            }
        }

        if response.drag_stopped() {
            self.controller
                .end_node_drag(self.epoch.simulation.as_mut());
        }
    }
}
