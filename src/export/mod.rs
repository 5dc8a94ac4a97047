//! Export module for blend masks and project settings.

use crate::blending::BlendMask;
use crate::config::ProjectConfig;
use crate::error::Result;
use std::path::Path;

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

/// Export blend data to various formats.
pub struct BlendExporter;

impl BlendExporter {
    /// Export project configuration to XML.
    pub fn export_xml(project: &ProjectConfig, path: &Path) -> Result<()> {
        let xml = quick_xml::se::to_string(project)?;
        std::fs::write(path, xml)?;
        Ok(())
    }

    /// Export project configuration to JSON.
    pub fn export_json(project: &ProjectConfig, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(project)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Export project configuration, JSON for `.json` paths and XML otherwise.
    pub fn export_project(project: &ProjectConfig, path: &Path) -> Result<()> {
        if is_json(path) {
            Self::export_json(project, path)
        } else {
            Self::export_xml(project, path)
        }
    }

    /// Export blend mask as 8-bit grayscale PNG image.
    pub fn export_blend_mask(mask: &BlendMask, path: &Path) -> Result<()> {
        let img = image::GrayImage::from_fn(mask.width, mask.height, |x, y| {
            let idx = y as usize * mask.width as usize + x as usize;
            let value = (mask.data[idx] * 255.0).round().clamp(0.0, 255.0) as u8;
            image::Luma([value])
        });

        img.save(path)?;
        Ok(())
    }

    /// Export blend mask as 16-bit grayscale PNG image for higher precision.
    pub fn export_blend_mask_16bit(mask: &BlendMask, path: &Path) -> Result<()> {
        let img = image::ImageBuffer::<image::Luma<u16>, Vec<u16>>::from_fn(
            mask.width,
            mask.height,
            |x, y| {
                let idx = y as usize * mask.width as usize + x as usize;
                let value = (mask.data[idx] * 65535.0).round().clamp(0.0, 65535.0) as u16;
                image::Luma([value])
            },
        );

        img.save(path)?;
        Ok(())
    }

    /// Export one mask per projector to a directory.
    pub fn export_all_blend_masks(
        masks: &[BlendMask],
        output_dir: &Path,
        use_16bit: bool,
    ) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;

        for (i, mask) in masks.iter().enumerate() {
            let filename = format!("blend_mask_projector_{}.png", i);
            let path = output_dir.join(&filename);

            if use_16bit {
                Self::export_blend_mask_16bit(mask, &path)?;
            } else {
                Self::export_blend_mask(mask, &path)?;
            }

            log::info!("Exported blend mask: {}", filename);
        }

        Ok(())
    }
}

/// Load project configuration.
pub fn load_project(path: &Path) -> Result<ProjectConfig> {
    let contents = std::fs::read_to_string(path)?;

    if is_json(path) {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(quick_xml::de::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlendMode, SurfaceBounds};

    fn project() -> ProjectConfig {
        let mut project = ProjectConfig {
            name: "Dome".to_string(),
            ..Default::default()
        };
        project.blend.gamma = 1.8;
        project.blend.mode = BlendMode::Transition;
        project.calibration.cell_count = 6;
        project
    }

    #[test]
    fn test_project_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        BlendExporter::export_project(&project(), &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.name, "Dome");
        assert_eq!(loaded.blend.gamma, 1.8);
        assert_eq!(loaded.blend.mode, BlendMode::Transition);
        assert_eq!(loaded.calibration.cell_count, 6);
    }

    #[test]
    fn test_project_xml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.projmap");
        BlendExporter::export_project(&project(), &path).unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.name, "Dome");
        assert_eq!(loaded.blend.max_overlap, 12);
        assert_eq!(loaded.calibration.cell_count, 6);
    }

    #[test]
    fn test_export_masks() {
        let dir = tempfile::tempdir().unwrap();
        let mut mask = BlendMask::new(4, 2, SurfaceBounds::default());
        mask.set(0, 0, 0.5);
        BlendExporter::export_all_blend_masks(&[mask.clone(), mask], dir.path(), false).unwrap();

        let img = image::open(dir.path().join("blend_mask_projector_1.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(img.dimensions(), (4, 2));
        assert_eq!(img.get_pixel(0, 0).0, [128]);
        assert_eq!(img.get_pixel(3, 1).0, [255]);
    }

    #[test]
    fn test_export_mask_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask16.png");
        let mask = BlendMask::filled(2, 2, SurfaceBounds::default(), 0.25);
        BlendExporter::export_blend_mask_16bit(&mask, &path).unwrap();

        let img = image::open(&path).unwrap().to_luma16();
        assert_eq!(img.get_pixel(1, 1).0, [16384]);
    }
}
