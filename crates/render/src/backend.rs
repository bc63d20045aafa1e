use firmament_common::{BillboardSetId, Colour, EntityId, MaterialId, NodeId};
use glam::Vec3;

/// A single material property write.
///
/// Fixed-function pass properties (self-illumination, diffuse, ambient),
/// texture unit bindings and named shader constants.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialParam {
    SelfIllumination(Colour),
    Diffuse(Colour),
    Ambient(Colour),
    Texture { unit: u32, name: String },
    Constant { name: String, value: f32 },
}

/// The storage slot a [`MaterialParam`] overwrites. Two writes with the same
/// slot replace each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamSlot {
    SelfIllumination,
    Diffuse,
    Ambient,
    Texture(u32),
    Constant(String),
}

impl MaterialParam {
    pub fn constant(name: impl Into<String>, value: f32) -> Self {
        Self::Constant {
            name: name.into(),
            value,
        }
    }

    pub fn texture(unit: u32, name: impl Into<String>) -> Self {
        Self::Texture {
            unit,
            name: name.into(),
        }
    }

    pub fn slot(&self) -> ParamSlot {
        match self {
            Self::SelfIllumination(_) => ParamSlot::SelfIllumination,
            Self::Diffuse(_) => ParamSlot::Diffuse,
            Self::Ambient(_) => ParamSlot::Ambient,
            Self::Texture { unit, .. } => ParamSlot::Texture(*unit),
            Self::Constant { name, .. } => ParamSlot::Constant(name.clone()),
        }
    }
}

/// Renderer-agnostic scene interface. Sky code only ever talks to this trait.
///
/// Backends own every node, material and billboard set; callers hold the
/// handles. Operations on handles the backend no longer knows are ignored.
pub trait RenderBackend {
    /// Create a scene node, attached to `parent` or to the scene root.
    fn create_node(&mut self, parent: Option<NodeId>) -> NodeId;

    /// Set a node's position relative to its parent.
    fn set_node_position(&mut self, node: NodeId, position: Vec3);

    /// Set a node's uniform scale.
    fn set_node_scale(&mut self, node: NodeId, scale: f32);

    /// Show or hide a node and everything attached below it.
    fn set_node_visible(&mut self, node: NodeId, visible: bool);

    /// World-space position of a node, following its parent chain.
    fn derived_position(&self, node: NodeId) -> Option<Vec3>;

    /// Destroy a node together with its children and attached billboard sets.
    fn destroy_node(&mut self, node: NodeId);

    fn create_material(&mut self, name: &str) -> MaterialId;

    fn set_material_param(&mut self, material: MaterialId, param: MaterialParam);

    fn destroy_material(&mut self, material: MaterialId);

    /// Attach a single-sprite billboard set of `size` world units to `node`.
    fn create_billboard_set(
        &mut self,
        node: NodeId,
        material: MaterialId,
        size: f32,
    ) -> BillboardSetId;

    /// Orient a billboard set so its sprites face along `direction`.
    fn set_billboard_direction(&mut self, set: BillboardSetId, direction: Vec3);

    /// Render queue group; higher queues draw later.
    fn set_render_queue(&mut self, set: BillboardSetId, queue: u8);

    /// Attach the geometry loaded from `mesh` to `node`, drawn with `material`.
    /// The entity is released with its node.
    fn create_entity(&mut self, node: NodeId, material: MaterialId, mesh: &str) -> EntityId;

    fn set_entity_render_queue(&mut self, entity: EntityId, queue: u8);
}

impl<B: RenderBackend + ?Sized> RenderBackend for &mut B {
    fn create_node(&mut self, parent: Option<NodeId>) -> NodeId {
        (**self).create_node(parent)
    }

    fn set_node_position(&mut self, node: NodeId, position: Vec3) {
        (**self).set_node_position(node, position)
    }

    fn set_node_scale(&mut self, node: NodeId, scale: f32) {
        (**self).set_node_scale(node, scale)
    }

    fn set_node_visible(&mut self, node: NodeId, visible: bool) {
        (**self).set_node_visible(node, visible)
    }

    fn derived_position(&self, node: NodeId) -> Option<Vec3> {
        (**self).derived_position(node)
    }

    fn destroy_node(&mut self, node: NodeId) {
        (**self).destroy_node(node)
    }

    fn create_material(&mut self, name: &str) -> MaterialId {
        (**self).create_material(name)
    }

    fn set_material_param(&mut self, material: MaterialId, param: MaterialParam) {
        (**self).set_material_param(material, param)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        (**self).destroy_material(material)
    }

    fn create_billboard_set(
        &mut self,
        node: NodeId,
        material: MaterialId,
        size: f32,
    ) -> BillboardSetId {
        (**self).create_billboard_set(node, material, size)
    }

    fn set_billboard_direction(&mut self, set: BillboardSetId, direction: Vec3) {
        (**self).set_billboard_direction(set, direction)
    }

    fn set_render_queue(&mut self, set: BillboardSetId, queue: u8) {
        (**self).set_render_queue(set, queue)
    }

    fn create_entity(&mut self, node: NodeId, material: MaterialId, mesh: &str) -> EntityId {
        (**self).create_entity(node, material, mesh)
    }

    fn set_entity_render_queue(&mut self, entity: EntityId, queue: u8) {
        (**self).set_entity_render_queue(entity, queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_share_a_slot_by_name() {
        let a = MaterialParam::constant("opacity", 0.2);
        let b = MaterialParam::constant("opacity", 0.9);
        let c = MaterialParam::constant("speed", 0.9);
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.slot(), c.slot());
    }

    #[test]
    fn texture_units_are_distinct_slots() {
        let a = MaterialParam::texture(0, "a.dds");
        let b = MaterialParam::texture(1, "a.dds");
        assert_ne!(a.slot(), b.slot());
    }

    #[test]
    fn fixed_function_slots() {
        assert_eq!(
            MaterialParam::Diffuse(Colour::BLACK).slot(),
            ParamSlot::Diffuse
        );
        assert_eq!(
            MaterialParam::SelfIllumination(Colour::WHITE).slot(),
            ParamSlot::SelfIllumination
        );
    }
}
