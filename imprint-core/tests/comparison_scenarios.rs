//! End-to-end comparison scenarios with real encoder output.

use image::{DynamicImage, ImageFormat, RgbImage};
use imprint_core::compare::{CandidateImage, Comparator, FindingCategory, RegisteredOriginal};
use imprint_core::hash::similarity;
use imprint_core::profile::AnalysisProfile;
use imprint_core::{LsbCodec, Payload, PixelBuffer, Severity};
use std::io::Cursor;

fn landscape() -> RgbImage {
    RgbImage::from_fn(400, 300, |x, y| {
        let sky = y < 120;
        let r = if sky { 90 + (y / 4) as u8 } else { 60 + (x % 40) as u8 };
        let g = if sky { 140 + (y / 3) as u8 } else { 110 + (y % 30) as u8 };
        let b = if sky { 220 } else { 50 + ((x + y) % 20) as u8 };
        image::Rgb([r, g, b])
    })
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).expect("encoding failed");
    buffer.into_inner()
}

fn encode_jpeg(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder).expect("JPEG encoding failed");
    buffer.into_inner()
}

fn decode(bytes: &[u8]) -> PixelBuffer {
    PixelBuffer::from_image(&image::load_from_memory(bytes).expect("decoding failed"))
        .expect("conversion failed")
}

#[test]
fn test_jpeg_reencode_of_png_original_is_not_tampered() {
    let img = landscape();
    let original_bytes = encode(&DynamicImage::ImageRgb8(img.clone()), ImageFormat::Png);
    let original_pixels = decode(&original_bytes);
    let original = RegisteredOriginal::register(&original_bytes, Some(&original_pixels), None);

    let candidate_bytes = encode_jpeg(&img, 90);
    let candidate_pixels = decode(&candidate_bytes);
    let verdict = Comparator::default().compare(
        &original,
        &CandidateImage {
            bytes: &candidate_bytes,
            pixels: Some(&candidate_pixels),
        },
    );

    assert!(!verdict.is_tampered, "{:?}", verdict.findings);
    assert!(verdict.similarity.unwrap() >= 85.0);
    assert!(verdict.diff.as_ref().unwrap().changed_pct < 5.0);
    assert_ne!(verdict.original_digest, verdict.candidate_digest);
}

#[test]
fn test_pasted_object_is_tampered() {
    let img = landscape();
    let original_bytes = encode(&DynamicImage::ImageRgb8(img.clone()), ImageFormat::Png);
    let original = RegisteredOriginal::register(&original_bytes, Some(&decode(&original_bytes)), None);

    let mut edited = img;
    for y in 180..300 {
        for x in 250..400 {
            edited.put_pixel(x, y, image::Rgb([250, 250, 250]));
        }
    }
    let candidate_bytes = encode(&DynamicImage::ImageRgb8(edited), ImageFormat::Png);
    let candidate_pixels = decode(&candidate_bytes);
    let verdict = Comparator::default().compare(
        &original,
        &CandidateImage {
            bytes: &candidate_bytes,
            pixels: Some(&candidate_pixels),
        },
    );

    assert!(verdict.is_tampered, "{:?}", verdict.findings);
    let diff = verdict.diff.as_ref().unwrap();
    assert!(diff.changed_pct >= 10.0);
    assert!(diff
        .hot_regions
        .iter()
        .any(|r| r.name == "bottom-right" && r.severity == Some(Severity::High)));
    assert!(verdict
        .findings
        .iter()
        .any(|f| f.category == FindingCategory::Pixels && f.severity == Severity::High));
}

#[test]
fn test_cropped_copy_reports_dimensions() {
    let img = landscape();
    let original_bytes = encode(&DynamicImage::ImageRgb8(img.clone()), ImageFormat::Png);
    let original = RegisteredOriginal::register(&original_bytes, Some(&decode(&original_bytes)), None);

    let cropped = DynamicImage::ImageRgb8(img).crop_imm(0, 0, 300, 300);
    let candidate_bytes = encode(&cropped, ImageFormat::Png);
    let candidate_pixels = decode(&candidate_bytes);
    let verdict = Comparator::default().compare(
        &original,
        &CandidateImage {
            bytes: &candidate_bytes,
            pixels: Some(&candidate_pixels),
        },
    );

    let finding = verdict
        .findings
        .iter()
        .find(|f| f.category == FindingCategory::Dimensions)
        .expect("dimension finding");
    assert_eq!(finding.text, "dimensions changed from 400x300 to 300x300");
}

#[test]
fn test_watermark_stripped_by_jpeg() {
    let img = landscape();
    let pixels = PixelBuffer::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
    let payload = Payload::new("user-42", None, 1_700_000_000_000).unwrap();
    let marked = LsbCodec::default().embed(&pixels, &payload).unwrap();
    let original_bytes = encode(&DynamicImage::ImageRgba8(marked.to_rgba_image()), ImageFormat::Png);
    let original = RegisteredOriginal::register(&original_bytes, Some(&marked), Some("user-42"));

    let rgb = DynamicImage::ImageRgba8(marked.to_rgba_image()).to_rgb8();
    let candidate_bytes = encode_jpeg(&rgb, 80);
    let candidate_pixels = decode(&candidate_bytes);
    let verdict = Comparator::default().compare(
        &original,
        &CandidateImage {
            bytes: &candidate_bytes,
            pixels: Some(&candidate_pixels),
        },
    );

    assert!(verdict.extraction.is_none());
    assert!(verdict
        .findings
        .iter()
        .any(|f| f.category == FindingCategory::Watermark && f.severity == Severity::Medium));
}

#[test]
fn test_similarity_is_symmetric() {
    let a = decode(&encode(&DynamicImage::ImageRgb8(landscape()), ImageFormat::Png));
    let b = decode(&encode_jpeg(&landscape(), 60));
    let fa = imprint_core::PerceptualHasher::default().fingerprint(&a);
    let fb = imprint_core::PerceptualHasher::default().fingerprint(&b);
    assert_eq!(similarity(Some(&fa), Some(&fb)), similarity(Some(&fb), Some(&fa)));
}

#[test]
fn test_stricter_profile_flips_verdict() {
    let img = landscape();
    let original_bytes = encode(&DynamicImage::ImageRgb8(img.clone()), ImageFormat::Png);
    let original = RegisteredOriginal::register(&original_bytes, Some(&decode(&original_bytes)), None);

    let mut edited = img;
    for y in 0..60 {
        for x in 0..80 {
            edited.put_pixel(x, y, image::Rgb([20, 20, 20]));
        }
    }
    let candidate_bytes = encode(&DynamicImage::ImageRgb8(edited), ImageFormat::Png);
    let candidate_pixels = decode(&candidate_bytes);
    let candidate = CandidateImage {
        bytes: &candidate_bytes,
        pixels: Some(&candidate_pixels),
    };

    let lenient = Comparator::default().compare(&original, &candidate);

    let mut profile = AnalysisProfile::default();
    profile.verdict.tamper_score = 1;
    let strict = Comparator::new(profile).compare(&original, &candidate);

    assert_eq!(lenient.tamper_score, strict.tamper_score);
    assert!(strict.tamper_score > 0, "{:?}", strict.findings);
    assert!(strict.is_tampered);
}
