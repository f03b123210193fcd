//! Bevy application setup

use anyhow::{anyhow, Result};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, RequestRedraw};
use bevy::winit::{UpdateMode, WinitSettings};
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use glam::DVec2;
use posepad_bus::{Bus, LocalNode, Session, Subscriber};
use posepad_core::{FrameTree, GraphName, PoseStamped, Transform as MapTransform};
use posepad_overlay::{
    Camera as MapCamera, Handler, LayerContext, LayerStack, PosePublisherLayer, RenderRequest,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::input::InputPlugin;
use crate::render::RenderPlugin;
use crate::ui::UiPlugin;

/// Per-frame ordering of the overlay systems
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverlaySet {
    /// Window size copied into the map camera
    Viewport,
    /// Pointer input converted and dispatched to layers
    Input,
    /// Due UI-queue messages delivered
    Messages,
    /// Bevy camera synced and everything drawn
    View,
}

/// Marker component for the map camera
#[derive(Component)]
pub struct MapView;

/// View settings adjustable from the status panel
#[derive(Debug, Clone, Resource)]
pub struct ViewSettings {
    pub show_grid: bool,
    /// Grid spacing in meters
    pub grid_spacing: f64,
    pub home_position: DVec2,
    pub home_zoom: f64,
}

impl ViewSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            show_grid: config.viewer.show_grid,
            grid_spacing: config.viewer.grid_spacing,
            home_position: DVec2::from_array(config.camera.position),
            home_zoom: config.camera.zoom,
        }
    }
}

/// The overlay and its collaborators. Lives on the main thread as a
/// non-send resource since layers share state through `Rc`.
pub struct OverlayHost {
    pub layers: LayerStack,
    pub context: LayerContext,
    pub topic: GraphName,
    pub published: VecDeque<PoseStamped>,
    feed: Subscriber<PoseStamped>,
    history: usize,
    started: bool,
    shut_down: bool,
}

impl OverlayHost {
    pub fn new(config: &Config) -> Result<Self> {
        let bus = Bus::new();
        let node = LocalNode::new(&config.node_name()?, bus.clone());
        let topic = node.resolve(&config.topic()?);
        let feed = bus.subscribe::<PoseStamped>(&topic)?;

        let mut camera = MapCamera::new(config.fixed_frame()?);
        camera.set_zoom(config.camera.zoom);
        camera.set_position(DVec2::from_array(config.camera.position));

        let mut frames = FrameTree::new();
        frames.update(
            &GraphName::root(),
            camera.fixed_frame(),
            MapTransform::identity(),
        );

        let layer = PosePublisherLayer::new(topic.clone(), config.view_context())
            .with_gesture_config(config.gesture_config());
        let mut layers = LayerStack::new();
        layers.push(Box::new(layer));

        Ok(Self {
            layers,
            context: LayerContext {
                session: Rc::new(node),
                handler: Handler::new(),
                camera: camera.shared(),
                frames: Rc::new(RefCell::new(frames)),
                render_request: RenderRequest::new(),
            },
            topic,
            published: VecDeque::new(),
            feed,
            history: config.viewer.history.max(1),
            started: false,
            shut_down: false,
        })
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.shut_down
    }

    fn record(&mut self, pose: PoseStamped) {
        let transform = MapTransform::from_pose_message(&pose.pose);
        info!(
            topic = %self.topic,
            seq = pose.header.seq,
            frame = %pose.header.frame_id,
            stamp = %pose.header.stamp,
            x = transform.translation.x,
            y = transform.translation.y,
            yaw = transform.yaw(),
            "Received published pose"
        );

        self.published.push_front(pose);
        self.published.truncate(self.history);
    }
}

/// Run the Bevy application
pub fn run(config: Config) -> Result<()> {
    let host = OverlayHost::new(&config)?;

    let exit = App::new()
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: config.viewer.title.clone(),
                ..default()
            }),
            ..default()
        }))
        // Must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .insert_resource(WinitSettings {
            focused_mode: UpdateMode::reactive(Duration::from_millis(16)),
            unfocused_mode: UpdateMode::reactive_low_power(Duration::from_secs(1)),
        })
        .insert_resource(ViewSettings::from_config(&config))
        .insert_non_send_resource(host)
        .configure_sets(
            Update,
            (
                OverlaySet::Viewport,
                OverlaySet::Input,
                OverlaySet::Messages,
                OverlaySet::View,
            )
                .chain(),
        )
        .add_systems(Startup, (setup_view, start_layers).chain())
        .add_systems(
            Update,
            (
                sync_viewport.in_set(OverlaySet::Viewport),
                pump_messages.in_set(OverlaySet::Messages),
                (sync_view_camera, drain_published_poses, request_redraw)
                    .in_set(OverlaySet::View),
            ),
        )
        .add_systems(Last, shutdown_layers)
        .add_plugins((InputPlugin, RenderPlugin, UiPlugin))
        .run();

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(anyhow!("Viewer exited with code {code}")),
    }
}

fn setup_view(mut commands: Commands) {
    commands.spawn((Camera2d, MapView));
}

fn start_layers(mut host: NonSendMut<OverlayHost>, mut exit: MessageWriter<AppExit>) {
    let host = &mut *host;
    match host.layers.start(&host.context) {
        Ok(()) => {
            host.started = true;
            info!(topic = %host.topic, layers = host.layers.len(), "Overlay started");
        }
        Err(e) => {
            error!(error = %e, "Failed to start overlay");
            exit.write(AppExit::error());
        }
    }
}

fn sync_viewport(host: NonSend<OverlayHost>, windows: Query<&Window, With<PrimaryWindow>>) {
    if let Ok(window) = windows.single() {
        let mut camera = host.context.camera.borrow_mut();
        let viewport = camera.viewport();
        let (width, height) = (window.width() as u32, window.height() as u32);
        if viewport.width != width || viewport.height != height {
            camera.set_viewport(width, height);
        }
    }
}

fn pump_messages(mut host: NonSendMut<OverlayHost>, time: Res<Time<Real>>) {
    let host = &mut *host;
    if !host.is_running() {
        return;
    }
    if let Err(e) = host.layers.pump(&host.context.handler, time.elapsed()) {
        warn!(error = %e, "Layer failed to handle a message");
    }
}

fn sync_view_camera(
    host: NonSend<OverlayHost>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<MapView>>,
) {
    let Ok((mut transform, mut projection)) = cameras.single_mut() else {
        return;
    };
    let camera = host.context.camera.borrow();

    let position = camera.position();
    let depth = transform.translation.z;
    transform.translation = Vec3::new(position.x as f32, position.y as f32, depth);
    transform.rotation = Quat::from_rotation_z(camera.rotation() as f32);
    if let Projection::Orthographic(ortho) = &mut *projection {
        ortho.scale = (1.0 / camera.pixels_per_meter()) as f32;
    }
}

fn drain_published_poses(mut host: NonSendMut<OverlayHost>) {
    loop {
        match host.feed.try_recv() {
            Ok(Some(pose)) => host.record(pose),
            Ok(None) => break,
            Err(e) => {
                warn!(topic = %host.topic, error = %e, "Pose feed failed");
                break;
            }
        }
    }
}

fn request_redraw(host: NonSend<OverlayHost>, mut redraw: MessageWriter<RequestRedraw>) {
    if host.context.render_request.take_pending() {
        redraw.write(RequestRedraw);
    }
}

fn shutdown_layers(mut host: NonSendMut<OverlayHost>, mut exits: MessageReader<AppExit>) {
    if exits.read().next().is_none() || !host.is_running() {
        return;
    }

    host.shut_down = true;
    match host.layers.shutdown() {
        Ok(()) => info!(topic = %host.topic, "Overlay shut down"),
        Err(e) => warn!(error = %e, "Overlay shutdown failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_resolves_topic_under_node() {
        let mut config = Config::default();
        config.viewer.node_name = "/robot/viewer".to_string();
        config.camera.zoom = 3.0;
        config.camera.position = [1.0, 2.0];

        let host = OverlayHost::new(&config).unwrap();
        assert_eq!(host.topic.as_str(), "/robot/goal");
        assert_eq!(host.layers.len(), 1);
        assert!(!host.is_running());

        let camera = host.context.camera.borrow();
        assert_eq!(camera.scaling_factor(), 3.0);
        assert_eq!(camera.position(), DVec2::new(1.0, 2.0));
        assert_eq!(camera.fixed_frame().as_str(), "map");
        assert!(host.context.frames.borrow().has_frame(camera.fixed_frame()));
    }

    #[test]
    fn test_host_rejects_bad_names() {
        let mut config = Config::default();
        config.camera.fixed_frame = "9lives".to_string();
        assert!(OverlayHost::new(&config).is_err());
    }

    #[test]
    fn test_history_keeps_newest() {
        let mut config = Config::default();
        config.viewer.history = 2;
        let mut host = OverlayHost::new(&config).unwrap();

        for seq in 0..3 {
            let mut pose = PoseStamped::default();
            pose.header.seq = seq;
            host.record(pose);
        }
        let seqs: Vec<u32> = host.published.iter().map(|p| p.header.seq).collect();
        assert_eq!(seqs, vec![2, 1]);
    }
}
