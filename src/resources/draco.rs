//! Primitives stored with `KHR_draco_mesh_compression`.

use std::collections::HashMap;

use draco_oxide_core::{
    attribute::{Attribute, AttributeType, ComponentDataType},
    mesh::Mesh,
    types::{NdVector, PointIdx, Vector},
};
use serde::Deserialize;

use crate::data_structures::{model::ModelVertex, scene::Primitive};

pub const EXTENSION: &str = "KHR_draco_mesh_compression";

/// The primitive's extension object: the view holding the stream and the
/// Draco attribute id behind each glTF semantic.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DracoExtension {
    buffer_view: usize,
    #[serde(default)]
    attributes: HashMap<String, usize>,
}

pub(crate) fn read_primitive(
    document: &gltf::Document,
    extension: &serde_json::Value,
    buffers: &[Vec<u8>],
) -> anyhow::Result<Primitive> {
    let extension = DracoExtension::deserialize(extension)?;
    let view = document
        .views()
        .nth(extension.buffer_view)
        .ok_or_else(|| anyhow::anyhow!("missing buffer view {}", extension.buffer_view))?;
    let stream = buffers
        .get(view.buffer().index())
        .and_then(|buffer| buffer.get(view.offset()..view.offset() + view.length()))
        .ok_or_else(|| {
            anyhow::anyhow!("buffer view {} runs past its buffer", extension.buffer_view)
        })?;
    decode(stream, &extension.attributes)
}

fn decode(stream: &[u8], attributes: &HashMap<String, usize>) -> anyhow::Result<Primitive> {
    let mesh = draco_oxide_decoder::decode_mesh(stream)
        .map_err(|e| anyhow::anyhow!("undecodable Draco stream: {}", e))?;

    let position = find_attribute(&mesh, attributes.get("POSITION"), AttributeType::Position)
        .filter(|attribute| is_f32_vector(attribute, 3))
        .ok_or_else(|| anyhow::anyhow!("Draco stream carries no float positions"))?;
    let mut vertices: Vec<ModelVertex> = (0..position.len())
        .map(|p| {
            let v = position.get::<NdVector<3, f32>, 3>(PointIdx::from(p));
            ModelVertex {
                position: [*v.get(0), *v.get(1), *v.get(2)],
                tex_coords: Default::default(),
            }
        })
        .collect();

    if let Some(uv) = find_attribute(
        &mesh,
        attributes.get("TEXCOORD_0"),
        AttributeType::TextureCoordinate,
    )
    .filter(|attribute| is_f32_vector(attribute, 2))
    {
        let points = uv.len().min(vertices.len());
        for (p, vertex) in vertices.iter_mut().enumerate().take(points) {
            let t = uv.get::<NdVector<2, f32>, 2>(PointIdx::from(p));
            vertex.tex_coords = [*t.get(0), *t.get(1)];
        }
    }

    let indices = mesh
        .get_faces()
        .iter()
        .flatten()
        .map(|&point| usize::from(point) as u32)
        .collect();
    Ok(Primitive { vertices, indices })
}

/// Prefers the id the glTF names, falling back to the first attribute of the
/// semantic's type.
fn find_attribute<'a>(
    mesh: &'a Mesh,
    id: Option<&usize>,
    ty: AttributeType,
) -> Option<&'a Attribute> {
    let attributes = mesh.get_attributes();
    id.and_then(|&id| {
        attributes
            .iter()
            .find(|attribute| attribute.get_id().as_usize() == id)
    })
    .or_else(|| {
        attributes
            .iter()
            .find(|attribute| attribute.get_attribute_type() == ty)
    })
}

fn is_f32_vector(attribute: &Attribute, components: usize) -> bool {
    attribute.get_component_type() == ComponentDataType::F32
        && attribute.get_num_components() == components
}
