use crate::config::Config;
use complexion_core::{LandmarkError, StaticLandmarks};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("could not decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image resolution too low ({width}x{height}), minimum {min}x{min} required")]
    Resolution { width: u32, height: u32, min: u32 },
    #[error("landmarks for {path}: {source}")]
    Landmarks {
        path: PathBuf,
        #[source]
        source: LandmarkError,
    },
    #[error("No face detected in image")]
    NoFace,
}

pub fn check_resolution(width: u32, height: u32, min: u32) -> Result<(), InputError> {
    if width < min || height < min {
        return Err(InputError::Resolution { width, height, min });
    }
    Ok(())
}

/// Decode an image file to RGB and enforce the minimum resolution.
pub fn load_image(path: &Path, min_resolution: u32) -> Result<RgbImage, InputError> {
    let image = image::open(path)
        .map_err(|source| InputError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    check_resolution(image.width(), image.height(), min_resolution)?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "image decoded"
    );
    Ok(image)
}

/// Landmark provider for one image.
///
/// An explicit landmark file must exist. Without one the sidecar file is
/// used; a missing sidecar means no face.
pub fn landmarks_for(
    image_path: &Path,
    image: &RgbImage,
    explicit: Option<&Path>,
    config: &Config,
) -> Result<StaticLandmarks, InputError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let sidecar = config.landmark_path(image_path);
            if !sidecar.exists() {
                tracing::warn!(path = %sidecar.display(), "no landmark file, treating as no face");
                return Ok(StaticLandmarks::none());
            }
            sidecar
        }
    };
    StaticLandmarks::from_file(&path, image.width(), image.height())
        .map_err(|source| InputError::Landmarks { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use complexion_core::LandmarkProvider;

    #[test]
    fn test_resolution_policy() {
        assert!(check_resolution(480, 480, 480).is_ok());
        assert!(check_resolution(1920, 1080, 480).is_ok());
        assert!(matches!(
            check_resolution(479, 640, 480),
            Err(InputError::Resolution { width: 479, .. })
        ));
        assert!(check_resolution(640, 300, 480).is_err());
    }

    #[test]
    fn test_undecodable_file() {
        let path = std::env::temp_dir().join(format!("complexion-bad-{}.png", std::process::id()));
        std::fs::write(&path, b"definitely not a png").unwrap();
        let result = load_image(&path, 1);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(InputError::Decode { .. })));
    }

    #[test]
    fn test_missing_sidecar_means_no_face() {
        let image = RgbImage::new(8, 8);
        let provider = landmarks_for(
            Path::new("/nonexistent/portrait.jpg"),
            &image,
            None,
            &Config::default(),
        )
        .unwrap();
        assert!(provider.detect(&image).is_none());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let image = RgbImage::new(8, 8);
        let result = landmarks_for(
            Path::new("portrait.jpg"),
            &image,
            Some(Path::new("/nonexistent/mesh.json")),
            &Config::default(),
        );
        assert!(matches!(result, Err(InputError::Landmarks { .. })));
    }
}
