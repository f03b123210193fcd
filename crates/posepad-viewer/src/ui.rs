//! Status panel using bevy_egui

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use posepad_core::{PoseStamped, Transform as MapTransform};
use posepad_overlay::ScreenPoint;

use crate::app::{OverlayHost, ViewSettings};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, status_panel);
    }
}

fn status_panel(
    mut contexts: EguiContexts,
    host: NonSend<OverlayHost>,
    mut settings: ResMut<ViewSettings>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    let cursor = windows
        .single()
        .ok()
        .and_then(|window| window.cursor_position());

    egui::SidePanel::left("status_panel")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Pose Publisher");
            ui.separator();

            let mut camera = host.context.camera.borrow_mut();
            egui::Grid::new("status_grid")
                .num_columns(2)
                .striped(true)
                .show(ui, |ui| {
                    ui.label("Topic:");
                    ui.monospace(host.topic.as_str());
                    ui.end_row();

                    ui.label("Fixed frame:");
                    ui.monospace(camera.fixed_frame().as_str());
                    ui.end_row();

                    ui.label("Zoom:");
                    ui.label(format!("{:.2}x", camera.scaling_factor()));
                    ui.end_row();

                    let position = camera.position();
                    ui.label("View center:");
                    ui.label(format!("({:.2}, {:.2}) m", position.x, position.y));
                    ui.end_row();

                    ui.label("Cursor:");
                    let world = cursor.and_then(|c| {
                        camera
                            .to_world_coordinates(ScreenPoint::new(c.x as f64, c.y as f64))
                            .ok()
                    });
                    match world {
                        Some(w) => ui.label(format!("({:.2}, {:.2}) m", w.x, w.y)),
                        None => ui.label("-"),
                    };
                    ui.end_row();
                });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.checkbox(&mut settings.show_grid, "Grid");
                ui.add(
                    egui::DragValue::new(&mut settings.grid_spacing)
                        .speed(0.1)
                        .range(0.1..=100.0)
                        .suffix(" m"),
                );
            });
            if ui.button("Reset view").clicked() {
                camera.set_position(settings.home_position);
                camera.set_zoom(settings.home_zoom);
                camera.set_rotation(0.0);
                host.context.render_request.request();
            }
            drop(camera);

            ui.add_space(8.0);
            ui.label(
                egui::RichText::new("Long-press the map, drag to aim, release to publish.")
                    .small()
                    .weak(),
            );

            ui.separator();
            ui.heading("Published");
            if host.published.is_empty() {
                ui.label(egui::RichText::new("Nothing published yet").weak());
            }
            egui::ScrollArea::vertical().show(ui, |ui| {
                for pose in &host.published {
                    ui.monospace(describe(pose));
                }
            });
        });
}

/// One-line summary of a published pose
fn describe(pose: &PoseStamped) -> String {
    let transform = MapTransform::from_pose_message(&pose.pose);
    format!(
        "#{:<3} ({:>7.2}, {:>7.2}) {:>6.1}° @{}",
        pose.header.seq,
        transform.translation.x,
        transform.translation.y,
        transform.yaw().to_degrees(),
        pose.header.stamp
    )
}
