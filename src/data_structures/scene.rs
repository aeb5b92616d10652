//! Scene graph of the loaded model.
//!
//! The glTF decoder produces a [`SceneModel`]: a root container whose children are
//! the top-level nodes of the file. Scene assembly then assigns a [`Material`] to
//! every node, overrides the two named nodes, offsets the root and measures the
//! world-space bounding box. Nothing here touches the GPU; [`GpuScene`] does the
//! upload afterwards.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::{
    config::AssetManifest,
    data_structures::{
        instance::Instance,
        model::{GpuMesh, Material, ModelVertex},
    },
    error::ViewerError,
};

/// Geometry of a single glTF primitive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneNode {
    pub name: Option<String>,
    pub local: Instance,
    pub primitives: Vec<Primitive>,
    pub material: Option<Material>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn container(name: Option<&str>, children: Vec<SceneNode>) -> Self {
        Self {
            name: name.map(str::to_string),
            children,
            ..Default::default()
        }
    }

    pub fn mesh(name: &str, local: Instance, primitives: Vec<Primitive>) -> Self {
        Self {
            name: Some(name.to_string()),
            local,
            primitives,
            ..Default::default()
        }
    }

    pub fn has_geometry(&self) -> bool {
        !self.primitives.is_empty()
    }

    /// Visits `self` and all descendants depth-first.
    pub fn traverse(&self, visit: &mut dyn FnMut(&SceneNode)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    pub fn traverse_mut(&mut self, visit: &mut dyn FnMut(&mut SceneNode)) {
        visit(self);
        for child in self.children.iter_mut() {
            child.traverse_mut(visit);
        }
    }

    /// Visits every node together with its world transform.
    pub fn traverse_world(&self, parent: &Instance, visit: &mut dyn FnMut(&SceneNode, &Instance)) {
        let world = parent * &self.local;
        visit(self, &world);
        for child in &self.children {
            child.traverse_world(&world, visit);
        }
    }

    /// Looks up a direct child by name. Grandchildren are not searched.
    pub fn child(&self, name: &str) -> Option<&SceneNode> {
        self.children
            .iter()
            .find(|child| child.name.as_deref() == Some(name))
    }

    fn child_index(&self, name: &str) -> Result<usize, ViewerError> {
        self.children
            .iter()
            .position(|child| child.name.as_deref() == Some(name))
            .ok_or_else(|| ViewerError::MissingNode {
                name: name.to_string(),
            })
    }
}

/// Axis-aligned bounding box. Starts empty and grows with [`Aabb::expand`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand(&mut self, point: Point3<f32>) {
        self.min = Point3::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Point3::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }

    /// The center of the box, or the origin for an empty box.
    pub fn center(&self) -> Point3<f32> {
        if self.is_empty() {
            return Point3::origin();
        }
        self.min.midpoint(self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }
}

/// The loaded model. `root` corresponds to the glTF scene itself.
#[derive(Clone, Debug, Default)]
pub struct SceneModel {
    pub root: SceneNode,
}

impl SceneModel {
    pub fn new(root: SceneNode) -> Self {
        Self { root }
    }

    /// Assigns materials, applies the root offset and returns the world-space
    /// center of the model.
    ///
    /// Both named nodes are validated before anything is mutated, so a failed
    /// assembly leaves the model exactly as it was loaded.
    pub fn assemble(
        &mut self,
        manifest: &AssetManifest,
        offset: Vector3<f32>,
    ) -> Result<Point3<f32>, ViewerError> {
        let rick = self.root.child_index(&manifest.rick_node)?;
        let portal = self.root.child_index(&manifest.portal_node)?;

        self.root
            .traverse_mut(&mut |node| node.material = Some(Material::Baked));
        self.root.children[rick].material = Some(Material::BakedRick);
        self.root.children[portal].material = Some(Material::Portal);

        self.root.local.position += offset;
        Ok(self.bounding_box().center())
    }

    /// World-space bounds over the vertices of every node.
    pub fn bounding_box(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        self.root
            .traverse_world(&Instance::default(), &mut |node, world| {
                let matrix = world.to_matrix();
                for primitive in &node.primitives {
                    for vertex in &primitive.vertices {
                        let local = Point3::from(vertex.position);
                        aabb.expand(cgmath::Transform::transform_point(&matrix, local));
                    }
                }
            });
        aabb
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.root.child(name)
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.root.traverse(&mut |_| count += 1);
        count
    }
}

/// All meshes of an assembled model, uploaded and ready to draw.
#[derive(Debug)]
pub struct GpuScene {
    pub meshes: Vec<GpuMesh>,
}

impl GpuScene {
    /// Uploads every primitive with its world matrix. Nodes without a material
    /// fall back to [`Material::Baked`].
    pub fn upload(device: &wgpu::Device, model: &SceneModel) -> Self {
        let mut meshes = Vec::new();
        model
            .root
            .traverse_world(&Instance::default(), &mut |node, world| {
                let material = node.material.unwrap_or(Material::Baked);
                let name = node.name.as_deref().unwrap_or("unnamed_node");
                for primitive in &node.primitives {
                    if primitive.indices.is_empty() {
                        log::warn!("Skipping primitive of {} without triangles", name);
                        continue;
                    }
                    meshes.push(GpuMesh::new(
                        device,
                        name,
                        &primitive.vertices,
                        &primitive.indices,
                        world,
                        material,
                    ));
                }
            });
        log::info!("Uploaded {} meshes", meshes.len());
        Self { meshes }
    }

    pub fn with_material(&self, material: Material) -> impl Iterator<Item = &GpuMesh> {
        self.meshes
            .iter()
            .filter(move |mesh| mesh.material == material)
    }
}
