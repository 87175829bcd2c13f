//! Image host trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use domain::ProductImage;

use crate::error::CheckoutError;

/// Trait for hosted image storage. Only the returned id and URL are kept.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Uploads image data (a data URI or a remote URL) into `folder`.
    async fn upload(&self, data: &str, folder: &str) -> Result<ProductImage, CheckoutError>;

    async fn destroy(&self, public_id: &str) -> Result<(), CheckoutError>;
}

#[async_trait]
impl<T: ImageHost + ?Sized> ImageHost for Arc<T> {
    async fn upload(&self, data: &str, folder: &str) -> Result<ProductImage, CheckoutError> {
        (**self).upload(data, folder).await
    }

    async fn destroy(&self, public_id: &str) -> Result<(), CheckoutError> {
        (**self).destroy(public_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryImageState {
    images: HashMap<String, usize>,
    next_id: u32,
    fail_on_upload: bool,
}

/// In-memory image host. Stores only the size of each upload.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageHost {
    state: Arc<RwLock<InMemoryImageState>>,
}

impl InMemoryImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_upload(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_upload = fail;
    }

    pub fn image_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .images
            .len()
    }

    pub fn has_image(&self, public_id: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .images
            .contains_key(public_id)
    }
}

#[async_trait]
impl ImageHost for InMemoryImageHost {
    async fn upload(&self, data: &str, folder: &str) -> Result<ProductImage, CheckoutError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.fail_on_upload {
            return Err(CheckoutError::ImageHost("Upload rejected".to_string()));
        }
        if data.trim().is_empty() {
            return Err(CheckoutError::ImageHost("Empty image".to_string()));
        }

        state.next_id += 1;
        let public_id = format!("{folder}/IMG-{:04}", state.next_id);
        state.images.insert(public_id.clone(), data.len());
        Ok(ProductImage {
            url: format!("https://images.local/{public_id}"),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.images.remove(public_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_and_destroy() {
        let host = InMemoryImageHost::new();
        let image = host
            .upload("data:image/png;base64,iVBORw0KGgo=", "products")
            .await
            .unwrap();
        assert_eq!(image.public_id, "products/IMG-0001");
        assert_eq!(image.url, "https://images.local/products/IMG-0001");
        assert!(host.has_image(&image.public_id));

        host.destroy(&image.public_id).await.unwrap();
        assert_eq!(host.image_count(), 0);
    }

    #[tokio::test]
    async fn rejected_upload() {
        let host = InMemoryImageHost::new();
        host.set_fail_on_upload(true);
        assert!(host.upload("data:,x", "products").await.is_err());
        assert_eq!(host.image_count(), 0);
    }
}
