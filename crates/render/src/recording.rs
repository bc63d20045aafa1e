use std::collections::BTreeMap;

use firmament_common::{BillboardSetId, EntityId, MaterialId, NodeId, Transform};
use glam::Vec3;

use crate::backend::{MaterialParam, ParamSlot, RenderBackend};

/// A command record produced by every call into the recording backend.
///
/// The log is append-only; tests and the CLI read it to see exactly what the
/// sky pushed to the renderer and in which order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CreateNode {
        node: NodeId,
        parent: Option<NodeId>,
    },
    SetNodePosition {
        node: NodeId,
        position: Vec3,
    },
    SetNodeScale {
        node: NodeId,
        scale: f32,
    },
    SetNodeVisible {
        node: NodeId,
        visible: bool,
    },
    DestroyNode {
        node: NodeId,
    },
    CreateMaterial {
        material: MaterialId,
        name: String,
    },
    SetMaterialParam {
        material: MaterialId,
        param: MaterialParam,
    },
    DestroyMaterial {
        material: MaterialId,
    },
    CreateBillboardSet {
        set: BillboardSetId,
        node: NodeId,
        material: MaterialId,
        size: f32,
    },
    SetBillboardDirection {
        set: BillboardSetId,
        direction: Vec3,
    },
    SetRenderQueue {
        set: BillboardSetId,
        queue: u8,
    },
    CreateEntity {
        entity: EntityId,
        node: NodeId,
        material: MaterialId,
        mesh: String,
    },
    SetEntityRenderQueue {
        entity: EntityId,
        queue: u8,
    },
}

/// Node state held by the recording backend.
#[derive(Debug, Clone)]
pub struct RecordedNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub visible: bool,
}

/// Material state: the latest value written to each parameter slot.
#[derive(Debug, Clone)]
pub struct RecordedMaterial {
    pub name: String,
    pub params: BTreeMap<ParamSlot, MaterialParam>,
}

/// Billboard set state.
#[derive(Debug, Clone)]
pub struct RecordedBillboardSet {
    pub node: NodeId,
    pub material: MaterialId,
    pub size: f32,
    pub direction: Vec3,
    pub render_queue: u8,
}

/// Mesh entity state.
#[derive(Debug, Clone)]
pub struct RecordedEntity {
    pub node: NodeId,
    pub material: MaterialId,
    pub mesh: String,
    pub render_queue: u8,
}

/// In-memory render backend.
///
/// Keeps a full scene graph with BTreeMap storage for deterministic
/// iteration, and logs every call. Stands in for a GPU backend in tests and
/// headless runs.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    nodes: BTreeMap<NodeId, RecordedNode>,
    materials: BTreeMap<MaterialId, RecordedMaterial>,
    sets: BTreeMap<BillboardSetId, RecordedBillboardSet>,
    entities: BTreeMap<EntityId, RecordedEntity>,
    next_id: u32,
    commands: Vec<BackendCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the command log.
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Drain and return the command log.
    pub fn drain_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn node(&self, node: NodeId) -> Option<&RecordedNode> {
        self.nodes.get(&node)
    }

    pub fn material(&self, material: MaterialId) -> Option<&RecordedMaterial> {
        self.materials.get(&material)
    }

    /// Latest value written to `slot` of `material`.
    pub fn material_param(&self, material: MaterialId, slot: &ParamSlot) -> Option<&MaterialParam> {
        self.materials.get(&material)?.params.get(slot)
    }

    /// Latest value of a named shader constant.
    pub fn constant(&self, material: MaterialId, name: &str) -> Option<f32> {
        match self.material_param(material, &ParamSlot::Constant(name.to_string()))? {
            MaterialParam::Constant { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Texture bound to `unit` of `material`.
    pub fn texture(&self, material: MaterialId, unit: u32) -> Option<&str> {
        match self.material_param(material, &ParamSlot::Texture(unit))? {
            MaterialParam::Texture { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn billboard_set(&self, set: BillboardSetId) -> Option<&RecordedBillboardSet> {
        self.sets.get(&set)
    }

    pub fn entity(&self, entity: EntityId) -> Option<&RecordedEntity> {
        self.entities.get(&entity)
    }

    /// Entities attached to `node`, in handle order.
    pub fn entities_on(&self, node: NodeId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.node == node)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn billboard_set_count(&self) -> usize {
        self.sets.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// A node is effectively visible when it and all its ancestors are.
    pub fn is_effectively_visible(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.nodes.get(&id) {
                Some(n) if n.visible => current = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Human-readable dump of the scene, in handle order.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== Scene (nodes={}, materials={}, billboards={}, entities={}, commands={}) ===\n",
            self.nodes.len(),
            self.materials.len(),
            self.sets.len(),
            self.entities.len(),
            self.commands.len()
        ));
        for (id, node) in &self.nodes {
            let p = node.transform.position;
            out.push_str(&format!(
                "  node {} parent={:?} pos=({:.1}, {:.1}, {:.1}) scale={:.2} visible={}\n",
                id.0,
                node.parent.map(|p| p.0),
                p.x,
                p.y,
                p.z,
                node.transform.scale.x,
                node.visible
            ));
        }
        for (id, entity) in &self.entities {
            out.push_str(&format!(
                "  entity {} node={} material={} mesh='{}' queue={}\n",
                id.0, entity.node.0, entity.material.0, entity.mesh, entity.render_queue
            ));
        }
        for (id, material) in &self.materials {
            out.push_str(&format!("  material {} '{}'\n", id.0, material.name));
            for param in material.params.values() {
                out.push_str(&format!("    {}\n", describe_param(param)));
            }
        }
        out
    }

    fn alloc(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn remove_subtree(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.remove(&node) else {
            return;
        };
        self.sets.retain(|_, set| set.node != node);
        self.entities.retain(|_, entity| entity.node != node);
        for child in removed.children {
            self.remove_subtree(child);
        }
    }
}

fn describe_param(param: &MaterialParam) -> String {
    match param {
        MaterialParam::SelfIllumination(c) => format!("self_illumination={c}"),
        MaterialParam::Diffuse(c) => format!("diffuse={c}"),
        MaterialParam::Ambient(c) => format!("ambient={c}"),
        MaterialParam::Texture { unit, name } => format!("texture[{unit}]='{name}'"),
        MaterialParam::Constant { name, value } => format!("{name}={value:.3}"),
    }
}

impl RenderBackend for RecordingBackend {
    fn create_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let node = NodeId(self.alloc());
        let parent = match parent {
            Some(p) if self.nodes.contains_key(&p) => Some(p),
            Some(p) => {
                tracing::warn!(parent = p.0, "unknown parent node, attaching to scene root");
                None
            }
            None => None,
        };
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(node);
        }
        self.nodes.insert(
            node,
            RecordedNode {
                parent,
                children: Vec::new(),
                transform: Transform::default(),
                visible: true,
            },
        );
        self.commands.push(BackendCommand::CreateNode { node, parent });
        node
    }

    fn set_node_position(&mut self, node: NodeId, position: Vec3) {
        let Some(n) = self.nodes.get_mut(&node) else {
            tracing::warn!(node = node.0, "set_node_position on unknown node");
            return;
        };
        n.transform.position = position;
        self.commands
            .push(BackendCommand::SetNodePosition { node, position });
    }

    fn set_node_scale(&mut self, node: NodeId, scale: f32) {
        let Some(n) = self.nodes.get_mut(&node) else {
            tracing::warn!(node = node.0, "set_node_scale on unknown node");
            return;
        };
        n.transform.scale = Vec3::splat(scale);
        self.commands.push(BackendCommand::SetNodeScale { node, scale });
    }

    fn set_node_visible(&mut self, node: NodeId, visible: bool) {
        let Some(n) = self.nodes.get_mut(&node) else {
            tracing::warn!(node = node.0, "set_node_visible on unknown node");
            return;
        };
        n.visible = visible;
        self.commands
            .push(BackendCommand::SetNodeVisible { node, visible });
    }

    fn derived_position(&self, node: NodeId) -> Option<Vec3> {
        let mut n = self.nodes.get(&node)?;
        let mut world = n.transform;
        while let Some(parent) = n.parent {
            n = self.nodes.get(&parent)?;
            world = n.transform.compose(&world);
        }
        Some(world.position)
    }

    fn destroy_node(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get(&node).map(|n| n.parent) else {
            tracing::warn!(node = node.0, "destroy_node on unknown node");
            return;
        };
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| *c != node);
        }
        self.remove_subtree(node);
        self.commands.push(BackendCommand::DestroyNode { node });
    }

    fn create_material(&mut self, name: &str) -> MaterialId {
        let material = MaterialId(self.alloc());
        self.materials.insert(
            material,
            RecordedMaterial {
                name: name.to_string(),
                params: BTreeMap::new(),
            },
        );
        self.commands.push(BackendCommand::CreateMaterial {
            material,
            name: name.to_string(),
        });
        material
    }

    fn set_material_param(&mut self, material: MaterialId, param: MaterialParam) {
        let Some(m) = self.materials.get_mut(&material) else {
            tracing::warn!(material = material.0, "set_material_param on unknown material");
            return;
        };
        m.params.insert(param.slot(), param.clone());
        self.commands
            .push(BackendCommand::SetMaterialParam { material, param });
    }

    fn destroy_material(&mut self, material: MaterialId) {
        if self.materials.remove(&material).is_none() {
            tracing::warn!(material = material.0, "destroy_material on unknown material");
            return;
        }
        self.commands
            .push(BackendCommand::DestroyMaterial { material });
    }

    fn create_billboard_set(
        &mut self,
        node: NodeId,
        material: MaterialId,
        size: f32,
    ) -> BillboardSetId {
        let set = BillboardSetId(self.alloc());
        self.sets.insert(
            set,
            RecordedBillboardSet {
                node,
                material,
                size,
                direction: Vec3::NEG_Z,
                render_queue: 0,
            },
        );
        self.commands.push(BackendCommand::CreateBillboardSet {
            set,
            node,
            material,
            size,
        });
        set
    }

    fn set_billboard_direction(&mut self, set: BillboardSetId, direction: Vec3) {
        let Some(s) = self.sets.get_mut(&set) else {
            tracing::warn!(set = set.0, "set_billboard_direction on unknown billboard set");
            return;
        };
        s.direction = direction;
        self.commands
            .push(BackendCommand::SetBillboardDirection { set, direction });
    }

    fn set_render_queue(&mut self, set: BillboardSetId, queue: u8) {
        let Some(s) = self.sets.get_mut(&set) else {
            tracing::warn!(set = set.0, "set_render_queue on unknown billboard set");
            return;
        };
        s.render_queue = queue;
        self.commands.push(BackendCommand::SetRenderQueue { set, queue });
    }

    fn create_entity(&mut self, node: NodeId, material: MaterialId, mesh: &str) -> EntityId {
        let entity = EntityId(self.alloc());
        if !self.nodes.contains_key(&node) {
            tracing::warn!(node = node.0, mesh, "create_entity on unknown node");
            return entity;
        }
        self.entities.insert(
            entity,
            RecordedEntity {
                node,
                material,
                mesh: mesh.to_string(),
                render_queue: 0,
            },
        );
        self.commands.push(BackendCommand::CreateEntity {
            entity,
            node,
            material,
            mesh: mesh.to_string(),
        });
        entity
    }

    fn set_entity_render_queue(&mut self, entity: EntityId, queue: u8) {
        let Some(e) = self.entities.get_mut(&entity) else {
            tracing::warn!(entity = entity.0, "set_entity_render_queue on unknown entity");
            return;
        };
        e.render_queue = queue;
        self.commands
            .push(BackendCommand::SetEntityRenderQueue { entity, queue });
    }
}
