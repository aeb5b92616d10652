//! Asset I/O and decoding.
//!
//! Natively assets are read from `./assets`, on the web they are fetched
//! relative to `<origin>/assets/`. Decoding is kept free of GPU handles so the
//! loader can run before (or without) a device.

use std::future::Future;

use crate::{
    data_structures::{
        instance::Instance,
        model::ModelVertex,
        scene::{Primitive, SceneModel, SceneNode},
    },
    error::ViewerError,
};

mod draco;
pub mod texture;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = tokio::fs::read_to_string(asset_path(file_name)).await?;

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}

/// Resolves `uri` against the directory of `base`, the way a browser resolves
/// a relative link.
pub fn resolve_relative(base: &str, uri: &str) -> String {
    match base.rfind('/') {
        Some(idx) => format!("{}{}", &base[..=idx], uri),
        None => uri.to_string(),
    }
}

/// Decodes a `.glb`/`.gltf` file into a [`SceneModel`].
///
/// External buffers are fetched through `fetch`, relative to `url`. The root of
/// the returned model stands for the glTF scene; its children are the scene's
/// top-level nodes.
pub async fn load_scene_model<F, Fut>(
    url: &str,
    bytes: &[u8],
    fetch: &F,
) -> anyhow::Result<SceneModel>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<u8>>>,
{
    let gltf = parse_gltf(url, bytes)?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("{} references a missing binary chunk", url))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                anyhow::bail!("{} embeds a data URI buffer, which is not supported", url);
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = fetch(resolve_relative(url, uri)).await?;
                buffer_data.push(bin);
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow::anyhow!("{} contains no scene", url))?;
    let children = scene
        .nodes()
        .map(|node| to_scene_node(node, &gltf, &buffer_data))
        .collect::<anyhow::Result<_>>()?;
    Ok(SceneModel::new(SceneNode::container(scene.name(), children)))
}

/// Parses and validates the document. Draco is the one required extension the
/// gltf crate cannot decode that is handled here, so it is lifted out of the
/// required list before validation.
fn parse_gltf(url: &str, bytes: &[u8]) -> anyhow::Result<gltf::Gltf> {
    let err = match gltf::Gltf::from_slice(bytes) {
        Ok(gltf) => return Ok(gltf),
        Err(err) => err,
    };
    let Ok(unchecked) = gltf::Gltf::from_slice_without_validation(bytes) else {
        return Err(err.into());
    };
    if let Some(extension) = unchecked.extensions_required().find(|extension| {
        *extension != draco::EXTENSION
            && !gltf::json::extensions::ENABLED_EXTENSIONS.contains(extension)
    }) {
        return Err(ViewerError::UnsupportedExtension {
            url: url.to_string(),
            extension: extension.to_string(),
        }
        .into());
    }
    let gltf::Gltf { document, blob } = unchecked;
    let mut json = document.into_json();
    json.extensions_required
        .retain(|extension| extension != draco::EXTENSION);
    let document = gltf::Document::from_json(json)?;
    Ok(gltf::Gltf { document, blob })
}

fn to_scene_node(
    node: gltf::scene::Node,
    document: &gltf::Document,
    buffers: &[Vec<u8>],
) -> anyhow::Result<SceneNode> {
    let name = node.name().unwrap_or("unnamed_node");
    let mut primitives = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if let Some(primitive) = read_primitive(name, &primitive, document, buffers)? {
                primitives.push(primitive);
            }
        }
    }
    let local: Instance = node.transform().into();
    let mut scene_node = SceneNode::mesh(name, local, primitives);
    scene_node.name = node.name().map(str::to_string);
    scene_node.children = node
        .children()
        .map(|child| to_scene_node(child, document, buffers))
        .collect::<anyhow::Result<_>>()?;
    Ok(scene_node)
}

fn read_primitive(
    node_name: &str,
    primitive: &gltf::Primitive,
    document: &gltf::Document,
    buffers: &[Vec<u8>],
) -> anyhow::Result<Option<Primitive>> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Skipping {:?} primitive of {}, only triangles are drawn",
            primitive.mode(),
            node_name
        );
        return Ok(None);
    }
    if let Some(extension) = primitive.extension_value(draco::EXTENSION) {
        let decoded = draco::read_primitive(document, extension, buffers)
            .map_err(|e| e.context(format!("compressed primitive of {}", node_name)))?;
        return Ok(Some(decoded));
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
        Some(positions) => positions
            .map(|position| ModelVertex {
                position,
                tex_coords: Default::default(),
            })
            .collect(),
        None => {
            log::warn!("Primitive of {} has no positions", node_name);
            return Ok(None);
        }
    };
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
            vertex.tex_coords = tex_coord;
        }
    }

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    Ok(Some(Primitive { vertices, indices }))
}
