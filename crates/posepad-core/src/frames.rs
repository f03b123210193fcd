//! Frame tree for parent/child coordinate frame relationships

use std::collections::HashMap;
use tracing::debug;

use crate::geometry::Transform;
use crate::name::GraphName;

/// Latest transform from a child frame into its parent
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLink {
    pub parent: GraphName,
    pub transform: Transform,
}

/// Coordinate frames linked into a forest by their most recent transforms
#[derive(Debug, Clone, Default)]
pub struct FrameTree {
    /// Links indexed by child frame
    links: HashMap<GraphName, FrameLink>,
}

impl FrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the transform mapping `child` coordinates into `parent`.
    ///
    /// Returns `false` and leaves the tree unchanged if the link would make a
    /// frame its own ancestor.
    pub fn update(&mut self, parent: &GraphName, child: &GraphName, transform: Transform) -> bool {
        if parent == child || self.is_ancestor(child, parent) {
            debug!(parent = %parent, child = %child, "Rejected cyclic frame link");
            return false;
        }

        self.links.insert(
            child.clone(),
            FrameLink {
                parent: parent.clone(),
                transform,
            },
        );
        true
    }

    pub fn has_frame(&self, frame: &GraphName) -> bool {
        self.links.contains_key(frame) || self.links.values().any(|link| &link.parent == frame)
    }

    pub fn parent(&self, frame: &GraphName) -> Option<&GraphName> {
        self.links.get(frame).map(|link| &link.parent)
    }

    /// All known frames, sorted
    pub fn frames(&self) -> Vec<GraphName> {
        let mut frames: Vec<GraphName> = self
            .links
            .iter()
            .flat_map(|(child, link)| [child.clone(), link.parent.clone()])
            .collect();
        frames.sort();
        frames.dedup();
        frames
    }

    /// Transform mapping `source` coordinates into `target`, if both frames
    /// share an ancestor
    pub fn lookup(&self, source: &GraphName, target: &GraphName) -> Option<Transform> {
        if source == target {
            return Some(Transform::identity());
        }

        let source_chain = self.chain_to_root(source);
        let target_chain = self.chain_to_root(target);

        for (ancestor, ancestor_from_source) in &source_chain {
            if let Some((_, ancestor_from_target)) =
                target_chain.iter().find(|(frame, _)| frame == ancestor)
            {
                return Some(ancestor_from_target.invert().multiply(ancestor_from_source));
            }
        }

        None
    }

    fn is_ancestor(&self, candidate: &GraphName, frame: &GraphName) -> bool {
        self.chain_to_root(frame)
            .iter()
            .any(|(ancestor, _)| ancestor == candidate)
    }

    /// Ancestors of `frame` (itself first) with the transform from `frame`
    /// into each
    fn chain_to_root(&self, frame: &GraphName) -> Vec<(GraphName, Transform)> {
        let mut chain = vec![(frame.clone(), Transform::identity())];
        let mut current = frame.clone();
        let mut accumulated = Transform::identity();

        // Links are acyclic, so the walk ends within links.len() steps
        while let Some(link) = self.links.get(&current) {
            if chain.len() > self.links.len() {
                break;
            }
            accumulated = link.transform.multiply(&accumulated);
            chain.push((link.parent.clone(), accumulated));
            current = link.parent.clone();
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use std::f64::consts::FRAC_PI_2;

    fn name(s: &str) -> GraphName {
        GraphName::new(s).unwrap()
    }

    fn robot_tree() -> FrameTree {
        let mut tree = FrameTree::new();
        assert!(tree.update(&name("map"), &name("odom"), Transform::from_xy_yaw(1.0, 0.0, 0.0)));
        assert!(tree.update(
            &name("odom"),
            &name("base_link"),
            Transform::from_xy_yaw(2.0, 0.0, FRAC_PI_2)
        ));
        assert!(tree.update(
            &name("base_link"),
            &name("laser"),
            Transform::from_xy_yaw(0.5, 0.0, 0.0)
        ));
        tree
    }

    #[test]
    fn test_lookup_to_root() {
        let tree = robot_tree();
        let laser_in_map = tree.lookup(&name("laser"), &name("map")).unwrap();
        // map -> odom (+1x) -> base_link (+2x, facing +y) -> laser (0.5 forward)
        assert!(laser_in_map
            .translation
            .abs_diff_eq(DVec3::new(3.0, 0.5, 0.0), 1e-9));
        assert!((laser_in_map.yaw() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_lookup_inverse() {
        let tree = robot_tree();
        let forward = tree.lookup(&name("laser"), &name("map")).unwrap();
        let backward = tree.lookup(&name("map"), &name("laser")).unwrap();
        assert!(forward.multiply(&backward).approx_eq(&Transform::identity(), 1e-9));
    }

    #[test]
    fn test_lookup_between_siblings() {
        let mut tree = robot_tree();
        tree.update(&name("base_link"), &name("camera"), Transform::from_xy_yaw(0.0, 0.2, 0.0));
        let laser_in_camera = tree.lookup(&name("laser"), &name("camera")).unwrap();
        assert!(laser_in_camera
            .translation
            .abs_diff_eq(DVec3::new(0.5, -0.2, 0.0), 1e-9));
    }

    #[test]
    fn test_disconnected_frames() {
        let mut tree = robot_tree();
        tree.update(&name("world"), &name("other"), Transform::identity());
        assert!(tree.lookup(&name("laser"), &name("other")).is_none());
        assert!(tree.lookup(&name("map"), &name("map")).is_some());
    }

    #[test]
    fn test_rejects_cycles() {
        let mut tree = robot_tree();
        assert!(!tree.update(&name("laser"), &name("map"), Transform::identity()));
        assert!(!tree.update(&name("map"), &name("map"), Transform::identity()));
        assert!(tree.parent(&name("map")).is_none());
    }

    #[test]
    fn test_frames() {
        let tree = robot_tree();
        let frames = tree.frames();
        assert_eq!(frames.len(), 4);
        assert!(tree.has_frame(&name("map")));
        assert!(!tree.has_frame(&name("gps")));
    }
}
