//! Resizes uploaded tour images and user photos to JPEG and stores them under
//! the public image directory.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Not an image! Please upload only images.")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Target box and JPEG quality. The image is cropped to fill the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

pub const TOUR_IMAGE: Resize = Resize { width: 2000, height: 1333, quality: 90 };
pub const USER_PHOTO: Resize = Resize { width: 500, height: 500, quality: 90 };

const TOURS_DIR: &str = "tours";
const USERS_DIR: &str = "users";

/// File names produced by one tour upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourImages {
    pub cover: Option<String>,
    pub images: Vec<String>,
}

pub fn resize_to_jpeg(data: &[u8], target: Resize) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(data).map_err(ImageError::Decode)?;
    tracing::debug!(
        original_width = img.width(),
        original_height = img.height(),
        width = target.width,
        height = target.height,
        "resizing image"
    );

    // JPEG carries no alpha channel
    let resized = DynamicImage::ImageRgb8(
        img.resize_to_fill(target.width, target.height, FilterType::Lanczos3)
            .to_rgb8(),
    );

    let mut buf = Vec::new();
    resized
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, target.quality))
        .map_err(ImageError::Encode)?;

    tracing::debug!(output_size = buf.len(), quality = target.quality, "encoded image as JPEG");
    Ok(buf)
}

pub fn tour_cover_name(tour_id: Uuid, timestamp: i64) -> String {
    format!("tour-{tour_id}-{timestamp}-cover.jpeg")
}

/// `position` counts from 1.
pub fn tour_image_name(tour_id: Uuid, timestamp: i64, position: usize) -> String {
    format!("tour-{tour_id}-{timestamp}-{position}.jpeg")
}

pub fn user_photo_name(user_id: Uuid, timestamp: i64) -> String {
    format!("user-{user_id}-{timestamp}.jpeg")
}

/// Writes processed images below `root`; `root` is served at `/img`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[tracing::instrument(skip(self, cover, images), fields(images = images.len()))]
    pub async fn store_tour_images(
        &self,
        tour_id: Uuid,
        cover: Option<Vec<u8>>,
        images: Vec<Vec<u8>>,
    ) -> Result<TourImages, ImageError> {
        let timestamp = Utc::now().timestamp_millis();
        let mut stored = TourImages::default();

        if let Some(data) = cover {
            let name = tour_cover_name(tour_id, timestamp);
            self.save(TOURS_DIR, &name, data, TOUR_IMAGE).await?;
            stored.cover = Some(name);
        }

        for (i, data) in images.into_iter().enumerate() {
            let name = tour_image_name(tour_id, timestamp, i + 1);
            self.save(TOURS_DIR, &name, data, TOUR_IMAGE).await?;
            stored.images.push(name);
        }

        tracing::info!(%tour_id, cover = stored.cover.is_some(), images = stored.images.len(), "tour images stored");
        Ok(stored)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn store_user_photo(&self, user_id: Uuid, data: Vec<u8>) -> Result<String, ImageError> {
        let name = user_photo_name(user_id, Utc::now().timestamp_millis());
        self.save(USERS_DIR, &name, data, USER_PHOTO).await?;
        Ok(name)
    }

    async fn save(&self, folder: &str, name: &str, data: Vec<u8>, target: Resize) -> Result<(), ImageError> {
        let jpeg = tokio::task::spawn_blocking(move || resize_to_jpeg(&data, target)).await??;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(name), jpeg).await?;

        tracing::debug!(folder, name, "image written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 120, 60, 200]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("tours-images-{}", Uuid::new_v4()))
    }

    #[test]
    fn test_resize_fills_target_box() {
        let target = Resize { width: 50, height: 50, quality: 90 };
        let out = resize_to_jpeg(&png(120, 80), target).unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 50));
    }

    #[test]
    fn test_non_image_rejected() {
        let result = resize_to_jpeg(b"definitely not a picture", USER_PHOTO);

        let err = result.unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert_eq!(err.to_string(), "Not an image! Please upload only images.");
    }

    #[test]
    fn test_file_names() {
        let id = Uuid::nil();
        assert_eq!(
            tour_cover_name(id, 1700000000000),
            "tour-00000000-0000-0000-0000-000000000000-1700000000000-cover.jpeg"
        );
        assert_eq!(
            tour_image_name(id, 1700000000000, 2),
            "tour-00000000-0000-0000-0000-000000000000-1700000000000-2.jpeg"
        );
        assert_eq!(
            user_photo_name(id, 5),
            "user-00000000-0000-0000-0000-000000000000-5.jpeg"
        );
    }

    #[tokio::test]
    async fn test_user_photo_written_as_square_jpeg() {
        let store = ImageStore::new(scratch_dir());
        let user_id = Uuid::new_v4();

        let name = store.store_user_photo(user_id, png(64, 32)).await.unwrap();

        assert!(name.starts_with(&format!("user-{user_id}-")));
        let written = std::fs::read(store.root().join("users").join(&name)).unwrap();
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 500));
    }

    #[tokio::test]
    async fn test_tour_images_numbered_from_one() {
        let store = ImageStore::new(scratch_dir());
        let tour_id = Uuid::new_v4();

        let stored = store
            .store_tour_images(tour_id, Some(png(30, 20)), vec![png(10, 10), png(10, 10)])
            .await
            .unwrap();

        let cover = stored.cover.unwrap();
        assert!(cover.ends_with("-cover.jpeg"));
        assert_eq!(stored.images.len(), 2);
        assert!(stored.images[0].ends_with("-1.jpeg"));
        assert!(stored.images[1].ends_with("-2.jpeg"));
        for name in std::iter::once(&cover).chain(&stored.images) {
            assert!(store.root().join("tours").join(name).exists());
        }
    }

    #[tokio::test]
    async fn test_bad_upload_writes_nothing() {
        let store = ImageStore::new(scratch_dir());

        let result = store.store_user_photo(Uuid::new_v4(), b"<svg/>".to_vec()).await;

        assert!(matches!(result, Err(ImageError::Decode(_))));
        assert!(!store.root().join("users").exists());
    }
}
