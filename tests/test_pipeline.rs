mod common;

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use ringmark::detection::build_standard_pipeline;
use ringmark::detection::preprocessing::PreprocessingParams;

use common::*;

fn disk_image() -> DynamicImage {
    let mut img = RgbImage::new(WIDTH, HEIGHT);
    draw_filled_circle_mut(&mut img, (320, 240), 100, Rgb([255, 255, 255]));
    DynamicImage::ImageRgb8(img)
}

#[test]
fn standard_pipeline_outputs_edges() -> Result<()> {
    let pipeline = build_standard_pipeline(&PreprocessingParams::default());
    assert_eq!(
        pipeline.step_names(),
        vec!["Grayscale Conversion", "Median Blur", "Gaussian Blur", "Edge Detection"]
    );

    let edges = pipeline.run(disk_image(), 0)?;

    assert_eq!(edges.dimensions(), (WIDTH, HEIGHT));
    let lit = edges.pixels().filter(|p| p[0] > 0).count();
    assert!(lit > 300, "only {} edge pixels", lit);
    // Disk interior and far background stay empty
    assert_eq!(edges.get_pixel(320, 240)[0], 0);
    assert_eq!(edges.get_pixel(10, 10)[0], 0);
    Ok(())
}

#[test]
fn debug_mode_dumps_every_step() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let pipeline = build_standard_pipeline(&PreprocessingParams::default())
        .with_debug(dir.path().to_path_buf())?;

    pipeline.run(disk_image(), 7)?;

    let step_dirs = std::fs::read_dir(dir.path())?.count();
    assert_eq!(step_dirs, pipeline.step_names().len());
    assert!(dir.path().join("01_grayscale_conversion/frame_00007.png").exists());
    assert!(dir.path().join("04_edge_detection/frame_00007.png").exists());
    Ok(())
}

#[test]
fn debug_dir_must_be_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = Pipeline::new().with_debug(dir.path().to_path_buf());
    assert!(result.is_err());
    Ok(())
}
