//! Asynchronous asset loading.
//!
//! [`load_assets`] fetches the three manifest entries concurrently, reports one
//! [`LoadProgress`] per finished item and resolves exactly once. The first
//! failing item ends the load and drops whatever is still in flight, so a
//! failed load never produces a completion.

use std::future::Future;

use futures::{StreamExt, stream::FuturesUnordered};

use crate::{
    config::AssetManifest,
    data_structures::scene::SceneModel,
    error::ViewerError,
    resources::{load_scene_model, texture::decode_image},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub url: String,
    pub items_loaded: usize,
    pub items_total: usize,
}

/// What the rest of the viewer knows about the running load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadingState {
    pub items_loaded: usize,
    pub items_total: usize,
    pub is_complete: bool,
    pub failure: Option<String>,
}

impl LoadingState {
    pub fn record_progress(&mut self, progress: &LoadProgress) {
        self.items_loaded = progress.items_loaded;
        self.items_total = progress.items_total;
    }

    pub fn complete(&mut self) {
        if self.failure.is_none() {
            self.is_complete = true;
        }
    }

    pub fn fail(&mut self, error: &ViewerError) {
        self.failure = Some(error.to_string());
    }

    pub fn is_pending(&self) -> bool {
        !self.is_complete && self.failure.is_none()
    }

    /// Fraction of items loaded, `0.0` before the first progress event.
    pub fn progress(&self) -> f32 {
        if self.items_total == 0 {
            return 0.0;
        }
        self.items_loaded as f32 / self.items_total as f32
    }
}

/// Everything the manifest asked for, decoded but not uploaded.
#[derive(Debug, Clone)]
pub struct LoadedAssets {
    pub baked: image::RgbaImage,
    pub rick: image::RgbaImage,
    pub model: SceneModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    BakedTexture,
    RickTexture,
    Model,
}

enum LoadedItem {
    Texture(AssetKind, image::RgbaImage),
    Model(SceneModel),
}

/// Loads every manifest entry through `fetch`.
///
/// `fetch` maps an asset path to its bytes; the viewer passes
/// [`crate::resources::load_binary`], tests pass in-memory stubs. External glTF
/// buffers go through the same function.
pub async fn load_assets<F, Fut, P>(
    manifest: &AssetManifest,
    fetch: F,
    mut on_progress: P,
) -> Result<LoadedAssets, ViewerError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<u8>>>,
    P: FnMut(LoadProgress),
{
    let requests = [
        (AssetKind::BakedTexture, manifest.baked_texture.clone()),
        (AssetKind::RickTexture, manifest.rick_texture.clone()),
        (AssetKind::Model, manifest.model.clone()),
    ];
    let items_total = requests.len();
    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|(kind, url)| load_item(kind, url, &fetch))
        .collect();

    let (mut baked, mut rick, mut model) = (None, None, None);
    let mut items_loaded = 0;
    while let Some((url, result)) = pending.next().await {
        let item = result?;
        items_loaded += 1;
        log::debug!("Loaded {} ({}/{})", url, items_loaded, items_total);
        on_progress(LoadProgress {
            url,
            items_loaded,
            items_total,
        });
        match item {
            LoadedItem::Texture(AssetKind::RickTexture, img) => rick = Some(img),
            LoadedItem::Texture(_, img) => baked = Some(img),
            LoadedItem::Model(scene) => model = Some(scene),
        }
    }

    match (baked, rick, model) {
        (Some(baked), Some(rick), Some(model)) => Ok(LoadedAssets { baked, rick, model }),
        _ => Err(ViewerError::AssetFailed {
            url: manifest.model.clone(),
            reason: "the load ended before every item resolved".to_string(),
        }),
    }
}

async fn load_item<F, Fut>(
    kind: AssetKind,
    url: String,
    fetch: &F,
) -> (String, Result<LoadedItem, ViewerError>)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<u8>>>,
{
    let result = decode_item(kind, &url, fetch)
        .await
        .map_err(|err| match err.downcast::<ViewerError>() {
            Ok(viewer_error) => viewer_error,
            Err(err) => ViewerError::AssetFailed {
                url: url.clone(),
                reason: format!("{:#}", err),
            },
        });
    (url, result)
}

async fn decode_item<F, Fut>(kind: AssetKind, url: &str, fetch: &F) -> anyhow::Result<LoadedItem>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Vec<u8>>>,
{
    let bytes = fetch(url.to_string()).await?;
    match kind {
        AssetKind::Model => Ok(LoadedItem::Model(
            load_scene_model(url, &bytes, fetch).await?,
        )),
        _ => Ok(LoadedItem::Texture(kind, decode_image(&bytes)?)),
    }
}
