#![allow(dead_code)]

use std::{collections::HashMap, io::Cursor};

use cgmath::Vector3;
use draco_oxide::{
    AttributeDomain, AttributeType, ConfigType, MeshBuilder, NdVector,
    encode::{self, encode_mesh},
};
use portal_ngin::data_structures::{
    instance::Instance,
    model::ModelVertex,
    scene::{Primitive, SceneModel, SceneNode},
};

/// Axis-aligned box spanning `min..max`, as twelve triangles.
pub(crate) fn cuboid(min: [f32; 3], max: [f32; 3]) -> Primitive {
    let mut vertices = Vec::new();
    for i in 0..8 {
        let pick = |axis: usize| if i & (1 << axis) == 0 { min[axis] } else { max[axis] };
        vertices.push(ModelVertex {
            position: [pick(0), pick(1), pick(2)],
            tex_coords: [0.0, 0.0],
        });
    }
    let indices = vec![
        0, 1, 3, 0, 3, 2, // -z
        4, 6, 7, 4, 7, 5, // +z
        0, 4, 5, 0, 5, 1, // -y
        2, 3, 7, 2, 7, 6, // +y
        0, 2, 6, 0, 6, 4, // -x
        1, 5, 7, 1, 7, 3, // +x
    ];
    Primitive { vertices, indices }
}

pub(crate) fn translated(x: f32, y: f32, z: f32) -> Instance {
    Instance::from(Vector3::new(x, y, z))
}

/// A model shaped like the shipped scene.
///
/// World-space extents before any root offset: x and z in `[-4, 7]`, y in
/// `[0, 5]`, so the center is `(1.5, 2.5, 1.5)`.
pub(crate) fn portal_scene() -> SceneModel {
    let floor = SceneNode::mesh(
        "Floor",
        Instance::default(),
        vec![cuboid([-4.0, 0.0, -4.0], [4.0, 1.0, 4.0])],
    );
    let rick = SceneNode::mesh(
        "Rick",
        translated(2.0, 0.0, 0.0),
        vec![cuboid([0.0, 0.0, 0.0], [1.0, 2.0, 1.0])],
    );
    let portal = SceneNode::mesh(
        "Portal",
        translated(0.0, 0.0, -4.0),
        vec![cuboid([-1.0, 0.0, 0.0], [1.0, 3.0, 0.0])],
    );
    let lamp = SceneNode::mesh(
        "Lamp",
        translated(3.0, 2.0, 3.0),
        vec![cuboid([0.0, 0.0, 0.0], [0.5, 0.5, 0.5])],
    );
    let mut props = SceneNode::container(Some("Props"), vec![lamp]);
    props.local.scale = Vector3::new(2.0, 2.0, 2.0);

    SceneModel::new(SceneNode::container(
        Some("Scene"),
        vec![floor, rick, portal, props],
    ))
}

pub(crate) fn png_bytes(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(colour));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("png encoding failed");
    bytes.into_inner()
}

/// Binary buffer of a single triangle: positions, uvs, then `u16` indices.
pub(crate) fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let uvs: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin = Vec::new();
    positions.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    uvs.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    indices.iter().for_each(|v| bin.extend_from_slice(&v.to_le_bytes()));
    bin
}

/// A `.gltf` document whose scene has one triangle node per name, all sharing
/// the buffer `bin_uri` (see [`triangle_bin`]).
pub(crate) fn triangle_gltf(node_names: &[&str], bin_uri: &str, required: &[&str]) -> Vec<u8> {
    let nodes: Vec<_> = node_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            serde_json::json!({
                "name": name,
                "mesh": 0,
                "translation": [i as f32 * 2.0, 0.0, 0.0],
            })
        })
        .collect();
    let mut doc = serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "name": "Scene", "nodes": (0..node_names.len()).collect::<Vec<_>>() }],
        "nodes": nodes,
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "TEXCOORD_0": 1 },
                "indices": 2
            }]
        }],
        "buffers": [{ "uri": bin_uri, "byteLength": 66 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 24 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 6 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" },
            { "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    });
    if !required.is_empty() {
        doc["extensionsUsed"] = serde_json::json!(required);
        doc["extensionsRequired"] = serde_json::json!(required);
    }
    serde_json::to_vec(&doc).expect("json encoding failed")
}

/// Packs a glTF document and its buffer into a binary `.glb` container.
///
/// The first buffer of `doc` is pointed at the container's BIN chunk.
pub(crate) fn glb(mut doc: serde_json::Value, bin: &[u8]) -> Vec<u8> {
    doc["buffers"][0] = serde_json::json!({ "byteLength": bin.len() });
    let mut json = serde_json::to_vec(&doc).expect("json encoding failed");
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// The unit quad `(0,0,0)..(1,1,0)` as a Draco stream, with uvs equal to the
/// x and y of each corner.
pub(crate) fn draco_quad() -> Vec<u8> {
    let corners: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let positions: Vec<NdVector<3, f32>> =
        corners.iter().map(|[x, y]| NdVector::from([*x, *y, 0.0])).collect();
    let uvs: Vec<NdVector<2, f32>> = corners.iter().map(|&uv| NdVector::from(uv)).collect();

    let mut builder = MeshBuilder::new();
    builder.set_connectivity_attribute(vec![[0, 1, 2], [0, 2, 3]]);
    let position = builder.add_attribute(
        positions,
        AttributeType::Position,
        AttributeDomain::Position,
        vec![],
    );
    builder.add_attribute(
        uvs,
        AttributeType::TextureCoordinate,
        AttributeDomain::Corner,
        vec![position],
    );
    let mesh = builder.build().expect("invalid test mesh");

    let mut stream = Vec::new();
    encode_mesh(mesh, &mut stream, <encode::Config as ConfigType>::default())
        .expect("draco encoding failed");
    stream
}

/// A `.glb` whose single node carries [`draco_quad`] through
/// `KHR_draco_mesh_compression`.
pub(crate) fn draco_quad_glb(node_name: &str) -> Vec<u8> {
    draco_glb(node_name, draco_quad())
}

/// A `.glb` whose single node is compressed into `stream`, declared as the
/// unit quad.
pub(crate) fn draco_glb(node_name: &str, stream: Vec<u8>) -> Vec<u8> {
    let doc = serde_json::json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_draco_mesh_compression"],
        "extensionsRequired": ["KHR_draco_mesh_compression"],
        "scene": 0,
        "scenes": [{ "name": "Scene", "nodes": [0] }],
        "nodes": [{ "name": node_name, "mesh": 0 }],
        "meshes": [{
            "primitives": [{
                "attributes": { "POSITION": 0, "TEXCOORD_0": 1 },
                "indices": 2,
                "extensions": {
                    "KHR_draco_mesh_compression": {
                        "bufferView": 0,
                        "attributes": { "POSITION": 0, "TEXCOORD_0": 1 }
                    }
                }
            }]
        }],
        "buffers": [{}],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": stream.len() }],
        "accessors": [
            { "componentType": 5126, "count": 4, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "componentType": 5126, "count": 4, "type": "VEC2" },
            { "componentType": 5125, "count": 6, "type": "SCALAR" }
        ]
    });
    glb(doc, &stream)
}

/// In-memory stand-in for the asset directory.
#[derive(Default, Clone)]
pub(crate) struct FakeAssets {
    files: HashMap<String, Vec<u8>>,
}

impl FakeAssets {
    /// The default manifest paths, with the model as a `.gltf` plus its buffer.
    pub(crate) fn shipped() -> Self {
        Self::default()
            .with("Model/r&m.jpg", png_bytes(4, 4, [200, 180, 160, 255]))
            .with("Model/Rick2.jpg", png_bytes(2, 2, [90, 200, 90, 255]))
            .with(
                "Model/r&m.glb",
                triangle_gltf(&["Baked", "Rick", "Portal"], "scene.bin", &[]),
            )
            .with("Model/scene.bin", triangle_bin())
    }

    pub(crate) fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }

    pub(crate) fn without(mut self, path: &str) -> Self {
        self.files.remove(path);
        self
    }

    pub(crate) fn fetch(
        &self,
        path: String,
    ) -> futures::future::Ready<anyhow::Result<Vec<u8>>> {
        let result = self
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{} not found", path));
        futures::future::ready(result)
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}
