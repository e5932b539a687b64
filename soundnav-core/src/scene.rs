//! Boundary to the host scene graph.
//!
//! The host owns transform and breach warning nodes and tells SoundNav when
//! they change. `SceneHost` captures only what SoundNav needs from it;
//! `TransformScene` is a small in-memory host used by the CLI demo and tests.

use std::collections::HashMap;

use log::debug;
use soundnav_types::{ObserverToken, SlotId, SourceId, SourceKind};

use crate::error::{Result, SoundNavError};
use crate::geometry::{relative_transform, Matrix4};

/// Parent chains longer than this are treated as cycles.
const MAX_TRANSFORM_DEPTH: usize = 64;

/// What SoundNav consumes from the host scene.
pub trait SceneHost {
    /// Start observing `source` on behalf of `slot`. The host later reports
    /// changes by passing the returned token back to the connection manager.
    fn subscribe(&mut self, source: SourceId, slot: SlotId) -> Result<ObserverToken>;

    fn unsubscribe(&mut self, source: SourceId, token: ObserverToken);

    fn source_kind(&self, source: SourceId) -> Option<SourceKind>;

    /// Current transform from `source` into `reference` (world if `None`).
    fn relative_transform(&self, source: SourceId, reference: Option<SourceId>) -> Option<Matrix4>;

    /// Signed closest distance of a breach warning source to its model.
    fn signed_distance(&self, source: SourceId) -> Option<f64>;
}

#[derive(Debug, Clone)]
enum SceneNode {
    Transform {
        name: String,
        to_parent: Matrix4,
        parent: Option<SourceId>,
    },
    Breach {
        name: String,
        signed_distance: f64,
    },
}

impl SceneNode {
    fn name(&self) -> &str {
        match self {
            SceneNode::Transform { name, .. } | SceneNode::Breach { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Observer {
    token: ObserverToken,
    source: SourceId,
    slot: SlotId,
}

/// In-memory scene of transform and breach nodes.
///
/// Mutators return the tokens whose observers must be notified, in
/// subscription order. A transform change also notifies observers of every
/// descendant transform since their world pose moved with it.
#[derive(Debug, Default)]
pub struct TransformScene {
    nodes: HashMap<SourceId, SceneNode>,
    next_id: u32,
    observers: Vec<Observer>,
    next_token: u64,
}

impl TransformScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: SceneNode) -> SourceId {
        self.next_id += 1;
        let id = SourceId::new(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    pub fn add_transform(&mut self, name: &str, to_parent: Matrix4) -> SourceId {
        self.insert(SceneNode::Transform {
            name: name.to_string(),
            to_parent,
            parent: None,
        })
    }

    pub fn add_breach(&mut self, name: &str, signed_distance: f64) -> SourceId {
        self.insert(SceneNode::Breach {
            name: name.to_string(),
            signed_distance,
        })
    }

    /// Look a node up by name, the way configuration refers to nodes.
    pub fn find(&self, name: &str) -> Option<SourceId> {
        let mut matches: Vec<SourceId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.name() == name)
            .map(|(id, _)| *id)
            .collect();
        matches.sort();
        matches.first().copied()
    }

    pub fn set_parent(&mut self, child: SourceId, parent: Option<SourceId>) -> Result<Vec<ObserverToken>> {
        if let Some(p) = parent {
            if !matches!(self.nodes.get(&p), Some(SceneNode::Transform { .. })) {
                return Err(SoundNavError::Configuration(format!("{} is not a transform", p)));
            }
            if p == child || self.ancestors(p).contains(&child) {
                return Err(SoundNavError::Configuration(format!(
                    "making {} the parent of {} would create a cycle",
                    p, child
                )));
            }
        }
        match self.nodes.get_mut(&child) {
            Some(SceneNode::Transform { parent: slot, .. }) => *slot = parent,
            _ => return Err(SoundNavError::Configuration(format!("{} is not a transform", child))),
        }
        Ok(self.transform_modified(child))
    }

    pub fn set_matrix(&mut self, id: SourceId, matrix: Matrix4) -> Result<Vec<ObserverToken>> {
        match self.nodes.get_mut(&id) {
            Some(SceneNode::Transform { to_parent, .. }) => *to_parent = matrix,
            _ => return Err(SoundNavError::Configuration(format!("{} is not a transform", id))),
        }
        Ok(self.transform_modified(id))
    }

    pub fn set_signed_distance(&mut self, id: SourceId, distance: f64) -> Result<Vec<ObserverToken>> {
        match self.nodes.get_mut(&id) {
            Some(SceneNode::Breach { signed_distance, .. }) => *signed_distance = distance,
            _ => return Err(SoundNavError::Configuration(format!("{} is not a breach warning", id))),
        }
        Ok(self.tokens_for(|source| source == id))
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Slots currently observing `source`.
    pub fn observing_slots(&self, source: SourceId) -> Vec<SlotId> {
        self.observers
            .iter()
            .filter(|o| o.source == source)
            .map(|o| o.slot)
            .collect()
    }

    fn transform_modified(&self, id: SourceId) -> Vec<ObserverToken> {
        self.tokens_for(|source| source == id || self.ancestors(source).contains(&id))
    }

    fn tokens_for(&self, affected: impl Fn(SourceId) -> bool) -> Vec<ObserverToken> {
        self.observers
            .iter()
            .filter(|o| affected(o.source))
            .map(|o| o.token)
            .collect()
    }

    fn ancestors(&self, id: SourceId) -> Vec<SourceId> {
        let mut chain = Vec::new();
        let mut current = id;
        while let Some(SceneNode::Transform { parent: Some(p), .. }) = self.nodes.get(&current) {
            if chain.len() >= MAX_TRANSFORM_DEPTH {
                break;
            }
            chain.push(*p);
            current = *p;
        }
        chain
    }

    fn to_world(&self, id: SourceId) -> Option<Matrix4> {
        let mut matrix = match self.nodes.get(&id)? {
            SceneNode::Transform { to_parent, .. } => *to_parent,
            SceneNode::Breach { .. } => return None,
        };
        for ancestor in self.ancestors(id) {
            if let Some(SceneNode::Transform { to_parent, .. }) = self.nodes.get(&ancestor) {
                matrix = *to_parent * matrix;
            }
        }
        Some(matrix)
    }
}

impl SceneHost for TransformScene {
    fn subscribe(&mut self, source: SourceId, slot: SlotId) -> Result<ObserverToken> {
        if !self.nodes.contains_key(&source) {
            return Err(SoundNavError::Configuration(format!("node {} does not exist", source)));
        }
        self.next_token += 1;
        let token = ObserverToken::new(self.next_token);
        self.observers.push(Observer { token, source, slot });
        debug!(target: "scene", "observer {} added on {} for slot {}", token.get(), source, slot);
        Ok(token)
    }

    fn unsubscribe(&mut self, source: SourceId, token: ObserverToken) {
        self.observers.retain(|o| !(o.source == source && o.token == token));
    }

    fn source_kind(&self, source: SourceId) -> Option<SourceKind> {
        match self.nodes.get(&source)? {
            SceneNode::Transform { .. } => Some(SourceKind::Transform),
            SceneNode::Breach { .. } => Some(SourceKind::Breach),
        }
    }

    fn relative_transform(&self, source: SourceId, reference: Option<SourceId>) -> Option<Matrix4> {
        let source_to_world = self.to_world(source)?;
        match reference {
            Some(r) => relative_transform(&source_to_world, Some(&self.to_world(r)?)),
            None => relative_transform(&source_to_world, None),
        }
    }

    fn signed_distance(&self, source: SourceId) -> Option<f64> {
        match self.nodes.get(&source)? {
            SceneNode::Breach { signed_distance, .. } => Some(*signed_distance),
            SceneNode::Transform { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_change_notifies_children() {
        let mut scene = TransformScene::new();
        let tracker = scene.add_transform("Tracker", Matrix4::IDENTITY);
        let tool = scene.add_transform("Tool", Matrix4::from_translation(1.0, 0.0, 0.0));
        scene.set_parent(tool, Some(tracker)).unwrap();

        let token = scene.subscribe(tool, SlotId::new(0)).unwrap();
        let notified = scene
            .set_matrix(tracker, Matrix4::from_translation(0.0, 5.0, 0.0))
            .unwrap();
        assert_eq!(notified, vec![token]);

        let world = scene.relative_transform(tool, None).unwrap();
        assert_eq!(world.translation(), [1.0, 5.0, 0.0]);
    }

    #[test]
    fn relative_transform_uses_reference() {
        let mut scene = TransformScene::new();
        let tool = scene.add_transform("Tool", Matrix4::from_translation(3.0, 3.0, 3.0));
        let patient = scene.add_transform("Patient", Matrix4::from_translation(1.0, 1.0, 1.0));
        let rel = scene.relative_transform(tool, Some(patient)).unwrap();
        assert_eq!(rel.translation(), [2.0, 2.0, 2.0]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut scene = TransformScene::new();
        let a = scene.add_transform("A", Matrix4::IDENTITY);
        let b = scene.add_transform("B", Matrix4::IDENTITY);
        scene.set_parent(b, Some(a)).unwrap();
        assert!(scene.set_parent(a, Some(b)).is_err());
        assert!(scene.set_parent(a, Some(a)).is_err());
    }

    #[test]
    fn unsubscribe_removes_observer() {
        let mut scene = TransformScene::new();
        let needle = scene.add_breach("Needle", 2.0);
        let token = scene.subscribe(needle, SlotId::new(1)).unwrap();
        assert_eq!(scene.observing_slots(needle), vec![SlotId::new(1)]);
        scene.unsubscribe(needle, token);
        assert_eq!(scene.observer_count(), 0);
        assert!(scene.set_signed_distance(needle, 1.0).unwrap().is_empty());
    }

    #[test]
    fn find_and_kind() {
        let mut scene = TransformScene::new();
        let tool = scene.add_transform("Tool", Matrix4::IDENTITY);
        let needle = scene.add_breach("Needle", -1.0);
        assert_eq!(scene.find("Tool"), Some(tool));
        assert_eq!(scene.find("Missing"), None);
        assert_eq!(scene.source_kind(needle), Some(SourceKind::Breach));
        assert_eq!(scene.signed_distance(needle), Some(-1.0));
        assert_eq!(scene.signed_distance(tool), None);
        assert!(scene.relative_transform(needle, None).is_none());
    }
}
