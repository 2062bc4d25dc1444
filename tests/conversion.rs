//! End-to-end conversions through the public API with the production codec.

use image::{
    DynamicImage, GenericImageView, GrayAlphaImage, ImageFormat, LumaA, Rgb, Rgba, RgbaImage,
};
use imgconv::config::{Overrides, load_config};
use imgconv::convert::{self, ConversionStatus};
use imgconv::formats::{ColorMode, Format};
use imgconv::imaging::ConversionSettings;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn settings() -> ConversionSettings {
    ConversionSettings {
        show_progress: false,
        ..Default::default()
    }
}

fn write_png(path: &Path, img: &RgbaImage) {
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

fn checker(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba([20, 120, 220, 255])
        } else {
            Rgba([240, 200, 40, 128])
        }
    })
}

#[test]
fn png_to_jpg_and_back_keeps_dimensions() {
    let tmp = TempDir::new().unwrap();
    let (src, mid, back) = (
        tmp.path().join("src"),
        tmp.path().join("mid"),
        tmp.path().join("back"),
    );
    fs::create_dir_all(&src).unwrap();
    write_png(&src.join("wide.png"), &checker(37, 11));
    write_png(&src.join("tall.png"), &checker(9, 64));

    let first = convert::run(&src, &mid, Format::Png, Format::Jpg, &settings(), None).unwrap();
    assert!(first.all_succeeded());
    let second = convert::run(&mid, &back, Format::Jpg, Format::Png, &settings(), None).unwrap();
    assert!(second.all_succeeded());

    for (name, dims) in [("wide.png", (37, 11)), ("tall.png", (9, 64))] {
        let img = image::open(back.join(name)).unwrap();
        assert_eq!(img.dimensions(), dims, "{name}");
        // Alpha was flattened on the way through JPG
        assert_eq!(ColorMode::of(&img), ColorMode::Rgb);
    }
}

#[test]
fn transparent_quadrant_becomes_background_color() {
    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    let img = RgbaImage::from_fn(100, 100, |x, y| {
        if x < 50 && y < 50 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([10, 10, 10, 255])
        }
    });
    write_png(&input.join("q.png"), &img);

    let settings = ConversionSettings {
        background_color: Rgb([255, 255, 255]),
        ..settings()
    };
    let report = convert::run(&input, &output, Format::Png, Format::Jpg, &settings, None).unwrap();
    assert_eq!(report.succeeded(), 1);

    let jpg = image::open(output.join("q.jpg")).unwrap();
    assert_eq!(jpg.dimensions(), (100, 100));
    assert!(matches!(jpg, DynamicImage::ImageRgb8(_)));
    let rgb = jpg.to_rgb8();
    let white = rgb.get_pixel(10, 10);
    let dark = rgb.get_pixel(90, 90);
    assert!(white.0.iter().all(|&c| c >= 245), "{white:?}");
    assert!(dark.0.iter().all(|&c| c <= 30), "{dark:?}");
}

#[test]
fn png_to_png_keeps_alpha_and_mode() {
    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    let original = checker(16, 16);
    write_png(&input.join("a.png"), &original);

    convert::run(&input, &output, Format::Png, Format::Png, &settings(), None).unwrap();

    let out = image::open(output.join("a.png")).unwrap();
    assert_eq!(ColorMode::of(&out), ColorMode::Rgba);
    assert_eq!(out.to_rgba8(), original);
}

#[test]
fn grayscale_alpha_png_to_png_keeps_its_mode() {
    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    let original = GrayAlphaImage::from_fn(10, 6, |x, y| LumaA([(x * 20) as u8, (y * 40) as u8]));
    original
        .save_with_format(input.join("mask.png"), ImageFormat::Png)
        .unwrap();

    let report = convert::run(&input, &output, Format::Png, Format::Png, &settings(), None).unwrap();
    assert!(report.all_succeeded());

    let out = image::open(output.join("mask.png")).unwrap();
    assert_eq!(ColorMode::of(&out), ColorMode::GrayscaleAlpha);
    assert_eq!(out.to_luma_alpha8(), original);
}

#[test]
fn bad_files_are_reported_and_the_rest_convert() {
    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    for name in ["a.png", "b.png", "d.png", "e.png"] {
        write_png(&input.join(name), &checker(8, 8));
    }
    fs::write(input.join("c.png"), b"not a png").unwrap();

    let report = convert::run(&input, &output, Format::Png, Format::Jpg, &settings(), None).unwrap();
    let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            ConversionStatus::Success,
            ConversionStatus::Success,
            ConversionStatus::Failure,
            ConversionStatus::Success,
            ConversionStatus::Success,
        ]
    );
    let failure = &report.results[2];
    assert!(failure.source_path.ends_with("c.png"));
    assert!(failure.error_detail.is_some());

    // No partial leftovers
    let mut names: Vec<String> = fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["a.jpg", "b.jpg", "d.jpg", "e.jpg"]);
}

#[test]
fn config_file_drives_a_run() {
    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    write_png(&input.join("logo.PNG"), &checker(12, 12));

    let config_path = tmp.path().join("imgconv.toml");
    fs::write(
        &config_path,
        format!(
            "input_dir = {:?}\noutput_dir = {:?}\ninput_format = \"png\"\noutput_format = \"jpeg\"\nquality = 80\n\n[png]\nbackground_color = [0, 0, 0]\n",
            input.to_string_lossy(),
            output.to_string_lossy()
        ),
    )
    .unwrap();

    let config = load_config(&config_path, true, &Overrides::default()).unwrap();
    let (from, to) = config.formats().unwrap();
    assert_eq!((from, to), (Format::Png, Format::Jpg));

    let report = convert::run(
        &config.input_path(),
        &config.output_path(),
        from,
        to,
        &config.settings(),
        None,
    )
    .unwrap();
    assert!(report.all_succeeded());
    assert!(output.join("logo.jpg").exists());
}

#[cfg(not(feature = "heic"))]
#[test]
fn heic_run_without_feature_is_refused() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    fs::create_dir_all(&input).unwrap();

    let result = convert::run(
        &input,
        &tmp.path().join("out"),
        Format::Heic,
        Format::Jpg,
        &settings(),
        None,
    );
    assert!(matches!(
        result,
        Err(convert::RunError::CodecUnavailable(Format::Heic))
    ));
}

#[cfg(feature = "heic")]
#[test]
fn png_to_heic_and_back_keeps_dimensions() {
    let tmp = TempDir::new().unwrap();
    let (src, mid, back) = (
        tmp.path().join("src"),
        tmp.path().join("mid"),
        tmp.path().join("back"),
    );
    fs::create_dir_all(&src).unwrap();
    write_png(&src.join("a.png"), &checker(64, 48));

    let first = convert::run(&src, &mid, Format::Png, Format::Heic, &settings(), None).unwrap();
    assert!(first.all_succeeded());
    let second = convert::run(&mid, &back, Format::Heic, Format::Png, &settings(), None).unwrap();
    assert!(second.all_succeeded());

    let img = image::open(back.join("a.png")).unwrap();
    assert_eq!(img.dimensions(), (64, 48));
}

#[cfg(feature = "heic")]
#[test]
fn transparent_png_to_heic_is_opaque_with_background() {
    use imgconv::imaging::{ImageCodec, RustCodec};

    let tmp = TempDir::new().unwrap();
    let (input, output) = (tmp.path().join("in"), tmp.path().join("out"));
    fs::create_dir_all(&input).unwrap();
    let img = RgbaImage::from_fn(64, 64, |x, y| {
        if x < 32 && y < 32 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([10, 10, 10, 255])
        }
    });
    write_png(&input.join("q.png"), &img);

    let settings = ConversionSettings {
        background_color: Rgb([0, 200, 0]),
        ..settings()
    };
    let report = convert::run(&input, &output, Format::Png, Format::Heic, &settings, None).unwrap();
    assert!(report.all_succeeded());

    let heic = RustCodec::new()
        .decode(&output.join("q.heic"), Format::Heic)
        .unwrap();
    assert_eq!(heic.dimensions(), (64, 64));
    assert_eq!(ColorMode::of(&heic), ColorMode::Rgb);
    let Rgb([r, g, b]) = *heic.to_rgb8().get_pixel(8, 8);
    assert!(r <= 20 && g.abs_diff(200) <= 20 && b <= 20, "{r},{g},{b}");
}
