//! Region reads against synthetic slides: tile compositing, edge
//! clipping, sparse tiles, level coordinate mapping, cache behavior,
//! and associated image decoding.

use wsi_reader::{OpenOptions, TileError};

use super::test_utils::*;

// =============================================================================
// Compositing and clipping
// =============================================================================

#[tokio::test]
async fn test_read_region_covers_both_tiles() {
    let slide = open_slide(create_split_level_slide()).await.unwrap();

    let canvas = slide.read_region(0, 0, 0, 512, 256).await.unwrap();
    assert_eq!((canvas.width(), canvas.height()), (512, 256));

    assert_rgb_near(pixel_at(&canvas, 64, 128), RED_RGB);
    assert_rgb_near(pixel_at(&canvas, 255, 128), RED_RGB);
    assert_rgb_near(pixel_at(&canvas, 256, 128), GREEN_RGB);
    assert_rgb_near(pixel_at(&canvas, 480, 128), GREEN_RGB);
}

#[tokio::test]
async fn test_read_region_offset_inside_one_tile() {
    let slide = open_slide(create_split_level_slide()).await.unwrap();

    // Entirely inside the right tile
    let canvas = slide.read_region(300, 32, 0, 64, 64).await.unwrap();
    assert_rgb_near(pixel_at(&canvas, 0, 0), GREEN_RGB);
    assert_rgb_near(pixel_at(&canvas, 63, 63), GREEN_RGB);
}

#[tokio::test]
async fn test_read_region_past_level_edge() {
    let slide = open_slide(create_split_level_slide()).await.unwrap();

    // Only the top-left 64x64 corner of this region overlaps the level
    let canvas = slide.read_region(448, 192, 0, 128, 128).await.unwrap();
    assert_rgb_near(pixel_at(&canvas, 10, 10), GREEN_RGB);
    assert_rgb_near(pixel_at(&canvas, 63, 63), GREEN_RGB);
    assert_transparent(pixel_at(&canvas, 100, 10));
    assert_transparent(pixel_at(&canvas, 10, 100));
}

#[tokio::test]
async fn test_read_region_negative_origin() {
    let slide = open_slide(create_split_level_slide()).await.unwrap();

    // The level starts 32 pixels into the canvas on both axes
    let canvas = slide.read_region(-32, -32, 0, 64, 64).await.unwrap();
    assert_transparent(pixel_at(&canvas, 10, 10));
    assert_transparent(pixel_at(&canvas, 40, 10));
    assert_rgb_near(pixel_at(&canvas, 40, 40), RED_RGB);
}

#[tokio::test]
async fn test_read_region_sparse_tile_stays_transparent() {
    let slide = open_slide(create_sparse_slide()).await.unwrap();

    let canvas = slide.read_region(0, 0, 0, 512, 256).await.unwrap();
    assert_rgb_near(pixel_at(&canvas, 64, 128), RED_RGB);

    // The right tile was never written; its half of the region stays
    // fully transparent.
    for y in [0, 128, 255] {
        for x in [300, 400, 511] {
            assert_transparent(pixel_at(&canvas, x, y));
        }
    }
}

// =============================================================================
// Level coordinate mapping
// =============================================================================

#[tokio::test]
async fn test_read_region_maps_level_coordinates() {
    let slide = open_slide(create_pyramid_slide()).await.unwrap();
    assert_eq!(slide.level_info(1).unwrap().downsample, 2.0);

    // x and y are base-level coordinates regardless of the level read
    let left = slide.read_region(0, 0, 1, 128, 64).await.unwrap();
    assert_rgb_near(pixel_at(&left, 32, 32), RED_RGB);

    let right = slide.read_region(512, 0, 1, 128, 64).await.unwrap();
    assert_rgb_near(pixel_at(&right, 32, 32), GREEN_RGB);

    let base = slide.read_region(0, 0, 0, 64, 64).await.unwrap();
    assert_rgb_near(pixel_at(&base, 32, 32), GRAY_RGB);
}

#[tokio::test]
async fn test_read_region_smallest_level_partial_tiles() {
    let slide = open_slide(create_standard_slide()).await.unwrap();

    // Level 2 is 512x384 on a 2x2 grid of 256px tiles; the bottom row
    // of tiles is only 128 pixels tall.
    let canvas = slide.read_region(0, 0, 2, 512, 384).await.unwrap();
    assert_rgb_near(pixel_at(&canvas, 0, 0), SMALL_RGB);
    assert_rgb_near(pixel_at(&canvas, 511, 0), SMALL_RGB);
    assert_rgb_near(pixel_at(&canvas, 0, 383), SMALL_RGB);
    assert_rgb_near(pixel_at(&canvas, 511, 383), SMALL_RGB);

    // Rows past the level's height stay transparent
    let tall = slide.read_region(0, 0, 2, 512, 400).await.unwrap();
    assert_transparent(pixel_at(&tall, 100, 390));
}

#[tokio::test]
async fn test_read_region_invalid_level() {
    let slide = open_slide(create_standard_slide()).await.unwrap();

    let err = slide.read_region(0, 0, 7, 64, 64).await.unwrap_err();
    assert!(matches!(
        err,
        TileError::InvalidLevel {
            level: 7,
            level_count: 3
        }
    ));
}

// =============================================================================
// Cache behavior
// =============================================================================

#[tokio::test]
async fn test_repeated_reads_decode_each_tile_once() {
    let slide = open_slide(create_standard_slide()).await.unwrap();

    let first = slide.read_region(0, 0, 0, 256, 256).await.unwrap();
    let second = slide.read_region(0, 0, 0, 256, 256).await.unwrap();

    assert_eq!(first.pixels(), second.pixels());

    let stats = slide.cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_zero_cache_budget_still_reads() {
    let options = OpenOptions::new().cache_capacity_bytes(0);
    let slide = open_slide_with_options(create_split_level_slide(), options)
        .await
        .unwrap();

    let first = slide.read_region(0, 0, 0, 256, 256).await.unwrap();
    let second = slide.read_region(0, 0, 0, 256, 256).await.unwrap();

    assert_rgb_near(pixel_at(&first, 100, 100), RED_RGB);
    assert_eq!(first.pixels(), second.pixels());

    // Nothing fits in a zero-byte cache, so every read re-decodes
    let stats = slide.cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 0);
}

#[tokio::test]
async fn test_concurrent_reads_agree() {
    let slide = open_slide(create_split_level_slide()).await.unwrap();

    let (a, b, c) = tokio::join!(
        slide.read_region(0, 0, 0, 512, 256),
        slide.read_region(0, 0, 0, 512, 256),
        slide.read_region(256, 0, 0, 256, 256),
    );

    let a = a.unwrap();
    let b = b.unwrap();
    let c = c.unwrap();
    assert_eq!(a.pixels(), b.pixels());
    assert_rgb_near(pixel_at(&c, 100, 100), GREEN_RGB);
}

// =============================================================================
// Associated images
// =============================================================================

#[tokio::test]
async fn test_read_associated_images() {
    let slide = open_slide(create_standard_slide()).await.unwrap();

    let label = slide.read_associated_image("label").await.unwrap();
    assert_eq!((label.width(), label.height()), (400, 300));
    assert_rgb_near(pixel_at(&label, 200, 150), LABEL_RGB);
    assert_rgb_near(pixel_at(&label, 399, 299), LABEL_RGB);

    let macro_image = slide.read_associated_image("macro").await.unwrap();
    assert_eq!((macro_image.width(), macro_image.height()), (600, 400));
    assert_rgb_near(pixel_at(&macro_image, 599, 399), MACRO_RGB);

    // The thumbnail decodes the reduced directory it was promoted from
    let thumbnail = slide.read_associated_image("thumbnail").await.unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (1024, 768));
    assert_rgb_near(pixel_at(&thumbnail, 512, 384), MID_RGB);
}

#[tokio::test]
async fn test_read_associated_image_unknown_name() {
    let slide = open_slide(create_standard_slide()).await.unwrap();

    let err = slide.read_associated_image("barcode").await.unwrap_err();
    assert!(matches!(err, TileError::NoSuchAssociatedImage(name) if name == "barcode"));
}
