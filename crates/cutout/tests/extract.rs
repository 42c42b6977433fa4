use cutout::{
    CutoutError, ExtractionMode, Pipeline, PipelineBuilder, RasterImage, Region, Result,
    extract, normalize_region, parse_proposal,
};
use image::Rgba;

/// White 100x100 canvas with a black 40x40 square at (30, 30)-(70, 70)
fn create_square_image() -> RasterImage {
    RasterImage::from_fn(100, 100, |x, y| {
        if (30..70).contains(&x) && (30..70).contains(&y) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    })
}

/// Grey-blue fabric with a red emblem and some dark lettering
fn create_shirt_image() -> RasterImage {
    RasterImage::from_fn(160, 120, |x, y| {
        if (50..110).contains(&x) && (30..60).contains(&y) {
            Rgba([210, 40, 35, 255])
        } else if (60..100).contains(&x) && (70..80).contains(&y) && x % 4 != 0 {
            Rgba([25, 25, 30, 255])
        } else {
            let shade = 140 + ((x + y) % 3) as u8;
            Rgba([shade - 40, shade - 10, shade + 20, 255])
        }
    })
}

#[test]
fn black_square_on_white_is_isolated() {
    let image = create_square_image();
    let result = extract(&image, Region::full(100, 100), ExtractionMode::Generic, false).unwrap();

    let opaque = result.opaque_pixel_count() as f64;
    assert!((opaque - 1600.0).abs() <= 80.0, "opaque pixel count {opaque}");
    assert_eq!(result.image.get_pixel(50, 50)[3], 255);
    assert_eq!(result.image.get_pixel(5, 5)[3], 0);
    assert_eq!(result.image.get_pixel(95, 50)[3], 0);
}

#[test]
fn result_size_matches_clipped_region() {
    let image = create_shirt_image();
    let pipeline = Pipeline::default();
    for region in [
        Region::new(0, 0, 160, 120),
        Region::new(40, 20, 120, 90),
        Region::new(150, 110, 160, 120),
    ] {
        for mode in [ExtractionMode::Generic, ExtractionMode::Text] {
            let result = pipeline.extract(&image, region, mode, false).unwrap();
            assert_eq!(result.width() as i64, region.width());
            assert_eq!(result.height() as i64, region.height());
        }
    }
}

#[test]
fn extraction_is_deterministic() {
    let image = create_shirt_image();
    let region = Region::new(40, 20, 120, 90);
    let pipeline = Pipeline::default();

    for aggressive in [false, true] {
        let first = pipeline.extract(&image, region, ExtractionMode::Generic, aggressive).unwrap();
        let second = pipeline.extract(&image, region, ExtractionMode::Generic, aggressive).unwrap();
        assert_eq!(first.alpha(), second.alpha());
        assert_eq!(first.encode_png().unwrap(), second.encode_png().unwrap());
    }
}

#[test]
fn emblem_kept_and_fabric_dropped() {
    let image = create_shirt_image();
    let result = extract(&image, Region::new(40, 20, 120, 90), ExtractionMode::Generic, false).unwrap();

    // (80, 45) in the source is the middle of the emblem
    assert_eq!(result.image.get_pixel(40, 25)[3], 255);
    assert_eq!(result.image.get_pixel(40, 25).0[..3], [210, 40, 35]);
    // Fabric corner of the crop
    assert_eq!(result.image.get_pixel(2, 2)[3], 0);
}

#[test]
fn zero_area_region_is_invalid() {
    let image = create_square_image();
    let err = extract(&image, Region::new(50, 50, 50, 50), ExtractionMode::Generic, false).unwrap_err();
    assert!(matches!(err, CutoutError::InvalidRegion { .. }));

    let err = extract(&image, Region::new(200, 0, 300, 50), ExtractionMode::Text, false).unwrap_err();
    assert!(matches!(err, CutoutError::InvalidRegion { .. }));
}

#[test]
fn text_mode_keeps_only_ink() {
    let mut page = RasterImage::from_pixel(80, 40, Rgba([245, 245, 240, 255]));
    for x in 10..70 {
        for y in 18..22 {
            page.put_pixel(x, y, Rgba([15, 15, 20, 255]));
        }
    }
    let result = extract(&page, Region::full(80, 40), ExtractionMode::Text, false).unwrap();
    assert_eq!(result.image.get_pixel(40, 20)[3], 255);
    assert_eq!(result.image.get_pixel(40, 5)[3], 0);
    assert_eq!(result.image.get_pixel(2, 35)[3], 0);
}

#[test]
fn normalized_proposals() {
    for prompt in ["весь", "entire"] {
        assert_eq!(
            normalize_region(Region::new(300, 200, 310, 210), prompt, (800, 600)).unwrap(),
            Region::new(0, 0, 800, 600)
        );
    }
    let proposal = Region::new(100, 100, 200, 200);
    assert_eq!(
        normalize_region(proposal, "the logo", (1000, 1000)).unwrap(),
        Region::new(90, 90, 210, 210)
    );
    assert_eq!(
        normalize_region(proposal, "надпись на футболке", (1000, 1000)).unwrap(),
        Region::new(85, 85, 215, 215)
    );
}

#[test]
fn proposer_drives_extraction() {
    let image = create_shirt_image();
    let model = |_: &RasterImage, _: &str| -> Result<Region> {
        parse_proposal("The emblem is at {\"x1\": 50, \"y1\": 30, \"x2\": 110, \"y2\": 60}.")
    };

    let result = Pipeline::default()
        .extract_with_proposer(&image, "the red emblem", &model)
        .unwrap();
    assert_eq!(result.region, Region::new(44, 27, 116, 63));
    assert_eq!(result.mode, ExtractionMode::Generic);
}

#[test]
fn conservative_pipeline_extracts_square() {
    let pipeline = PipelineBuilder::new().conservative().build();
    let result = pipeline
        .extract(&create_square_image(), Region::new(20, 20, 80, 80), ExtractionMode::Generic, false)
        .unwrap();
    assert_eq!(result.image.get_pixel(30, 30)[3], 255);
    assert_eq!(result.image.get_pixel(2, 2)[3], 0);
}
