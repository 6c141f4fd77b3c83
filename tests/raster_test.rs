use tkmodel::render::{RasterSettings, rasterize, render_to_file, write_jpeg};

#[test]
fn should_write_jpeg_with_requested_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let settings = RasterSettings {
        output: dir.path().join("output.jpg"),
        ..RasterSettings::default()
    };

    let path = render_to_file(&settings).unwrap();
    assert_eq!(path, settings.output);

    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (512, 512));
}

#[test]
fn should_overwrite_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("output.jpg");
    std::fs::write(&output, vec![0xAB; 1 << 20]).unwrap();

    let settings = RasterSettings {
        width: 64,
        height: 32,
        inset: 8.0,
        corner_radius: 4.0,
        output: output.clone(),
        ..RasterSettings::default()
    };
    render_to_file(&settings).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.len() < 1 << 20);
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
}

#[test]
fn should_fill_center_and_keep_corners_clear() {
    let settings = RasterSettings::default();
    let image = rasterize(&settings).unwrap();

    assert_close(image.get_pixel(256, 256).0, [100, 149, 237]);
    assert_close(image.get_pixel(4, 4).0, [255, 255, 255]);
    // Just inside the rectangle's bounding box, but cut off by the rounded corner.
    assert_close(image.get_pixel(129, 129).0, [255, 255, 255]);
}

fn assert_close(actual: [u8; 3], expected: [u8; 3]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 2, "pixel {actual:?} is not close to {expected:?}");
    }
}

#[test]
fn should_reject_degenerate_settings() {
    let empty = RasterSettings {
        width: 0,
        ..RasterSettings::default()
    };
    assert!(rasterize(&empty).is_err());

    let swallowed = RasterSettings {
        inset: 300.0,
        ..RasterSettings::default()
    };
    assert!(rasterize(&swallowed).is_err());
}

#[test]
fn should_fail_for_unwritable_path() {
    let dir = tempfile::tempdir().unwrap();
    let image = image::RgbImage::new(4, 4);
    let missing = dir.path().join("missing").join("out.jpg");
    assert!(write_jpeg(&image, &missing, 90).is_err());
}
