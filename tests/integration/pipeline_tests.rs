//! End-to-end tests of the snippet pipeline against a mock tile source.
//!
//! Tests verify:
//! - The resulting rows and pixels for a known box
//! - Idempotence across runs and the clear flag
//! - Domain, size and missing-tile handling
//! - Failure isolation between annotations

use geosnip::store::Annotation;
use geosnip::tile::{zoom_levels, SnippetOutcome, ABSENT_TILE_FILL};
use geosnip::GeoBounds;

use super::test_utils::{decode_png, service_for, tile_color, MockTileSource, StoreFixture};

const EQUATOR_BOX: (i64, f64, f64, f64, f64) = (1, -10.0, 10.0, -10.0, 10.0);

fn rgba(color: [u8; 3]) -> [u8; 4] {
    [color[0], color[1], color[2], 255]
}

// =============================================================================
// Known Box
// =============================================================================

#[tokio::test]
async fn test_equator_box_at_zoom_2() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX]);
    let store = fixture.open();
    let source = MockTileSource::new(256);
    let service = service_for(&store, source.clone(), 0.0, false).await;

    let summary = service
        .run(&store.annotations().await.unwrap(), 2..=2)
        .await;

    assert_eq!(summary.cached, 1);
    assert_eq!(summary.missing_tiles, 0);
    // Tiles x 1..=2, y 1..=2
    assert_eq!(source.request_count(), 4);

    let images = fixture.images();
    assert_eq!(images.len(), 1);
    let (id, zoom, png) = &images[0];
    assert_eq!((*id, *zoom), (1, 2));

    let image = decode_png(png);
    assert_eq!(image.dimensions(), (58, 58));
    // The crop straddles all four tiles
    assert_eq!(image.get_pixel(0, 0).0, rgba(tile_color(1, 1)));
    assert_eq!(image.get_pixel(57, 0).0, rgba(tile_color(2, 1)));
    assert_eq!(image.get_pixel(0, 57).0, rgba(tile_color(1, 2)));
    assert_eq!(image.get_pixel(57, 57).0, rgba(tile_color(2, 2)));
}

#[tokio::test]
async fn test_process_reports_shape() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX]);
    let store = fixture.open();
    let service = service_for(&store, MockTileSource::new(256), 0.0, false).await;
    let annotation = store.annotations().await.unwrap()[0];

    match service.process(&annotation, 2).await {
        SnippetOutcome::Cached {
            width,
            height,
            bytes,
            missing_tiles,
        } => {
            assert_eq!((width, height), (58, 58));
            assert!(bytes > 0);
            assert_eq!(missing_tiles, 0);
        }
        other => panic!("Expected Cached, got {:?}", other),
    }

    assert!(matches!(
        service.process(&annotation, 2).await,
        SnippetOutcome::Skipped
    ));
}

#[tokio::test]
async fn test_padding_grows_snippet() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX]);
    let store = fixture.open();
    let service = service_for(&store, MockTileSource::new(256), 0.1, false).await;

    service
        .run(&store.annotations().await.unwrap(), 2..=2)
        .await;

    let image = decode_png(&fixture.images()[0].2);
    let (width, height) = image.dimensions();
    assert!(width > 58 && height > 58);
    assert_eq!(width, height);
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let fixture = StoreFixture::new(2, &[EQUATOR_BOX, (2, 100.0, 110.0, 30.0, 40.0)]);
    let store = fixture.open();
    let annotations = store.annotations().await.unwrap();
    let source = MockTileSource::new(256);

    let service = service_for(&store, source.clone(), 0.1, false).await;
    let first = service.run(&annotations, zoom_levels(0, None, 2)).await;
    assert_eq!(first.cached, 6);
    assert!(source.request_count() > 0);
    let before = fixture.images();

    source.reset_tracking();
    let service = service_for(&store, source.clone(), 0.1, false).await;
    let second = service.run(&annotations, zoom_levels(0, None, 2)).await;

    assert_eq!(source.request_count(), 0);
    assert_eq!(second.skipped, 6);
    assert_eq!(second.cached, 0);
    assert_eq!(fixture.images(), before);
}

#[tokio::test]
async fn test_clear_refetches() {
    let fixture = StoreFixture::new(1, &[EQUATOR_BOX]);
    let store = fixture.open();
    let annotations = store.annotations().await.unwrap();
    let source = MockTileSource::new(256);

    let service = service_for(&store, source.clone(), 0.0, false).await;
    service.run(&annotations, 0..=1).await;
    assert_eq!(fixture.images().len(), 2);

    let service = service_for(&store, source.clone(), 0.0, true).await;
    assert!(fixture.images().is_empty());

    source.reset_tracking();
    let summary = service.run(&annotations, 0..=1).await;
    assert_eq!(summary.cached, 2);
    assert!(source.request_count() > 0);
}

#[tokio::test]
async fn test_zoom_range_is_capped_by_tileset() {
    let fixture = StoreFixture::new(2, &[EQUATOR_BOX]);
    let store = fixture.open();
    let tileset = store.tileset_info().await.unwrap();
    let service = service_for(&store, MockTileSource::new(256), 0.0, false).await;

    let zooms = zoom_levels(0, Some(10), tileset.max_zoom);
    service.run(&store.annotations().await.unwrap(), zooms).await;

    let keys: Vec<(i64, u32)> = fixture.images().iter().map(|(id, z, _)| (*id, *z)).collect();
    assert_eq!(keys, vec![(1, 0), (1, 1), (1, 2)]);
}

// =============================================================================
// Domain, Size and Missing Tiles
// =============================================================================

#[tokio::test]
async fn test_out_of_domain_writes_nothing() {
    let fixture = StoreFixture::new(3, &[(7, 190.0, 200.0, -5.0, 5.0), (8, 10.0, 20.0, 95.0, 100.0)]);
    let store = fixture.open();
    let source = MockTileSource::new(256);
    let service = service_for(&store, source.clone(), 0.1, false).await;

    let summary = service
        .run(&store.annotations().await.unwrap(), 0..=3)
        .await;

    assert_eq!(summary.out_of_domain, 8);
    assert_eq!(source.request_count(), 0);
    assert!(fixture.images().is_empty());
}

#[tokio::test]
async fn test_too_large_writes_nothing() {
    let fixture = StoreFixture::new(3, &[(1, -60.0, 60.0, -1.0, 1.0)]);
    let store = fixture.open();
    let source = MockTileSource::new(256);
    let service = service_for(&store, source.clone(), 0.0, false).await;
    let annotation = store.annotations().await.unwrap()[0];

    match service.process(&annotation, 3).await {
        SnippetOutcome::TooLarge { extent, max_size } => {
            assert!(extent > 600);
            assert_eq!(max_size, 512);
        }
        other => panic!("Expected TooLarge, got {:?}", other),
    }
    assert_eq!(source.request_count(), 0);
    assert!(fixture.images().is_empty());
}

#[tokio::test]
async fn test_all_tiles_absent_still_cached() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX]);
    let store = fixture.open();
    let service = service_for(&store, MockTileSource::new(256).unavailable(), 0.0, false).await;

    let summary = service
        .run(&store.annotations().await.unwrap(), 2..=2)
        .await;
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.missing_tiles, 4);

    let image = decode_png(&fixture.images()[0].2);
    assert_eq!(image.dimensions(), (58, 58));
    let fill = rgba(ABSENT_TILE_FILL.0);
    assert!(image.pixels().all(|p| p.0 == fill));
}

#[tokio::test]
async fn test_one_missing_tile_leaves_a_hole() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX]);
    let store = fixture.open();
    let source = MockTileSource::new(256).with_missing(&[(2, 2)]);
    let service = service_for(&store, source, 0.0, false).await;

    service
        .run(&store.annotations().await.unwrap(), 2..=2)
        .await;

    let image = decode_png(&fixture.images()[0].2);
    assert_eq!(image.get_pixel(0, 0).0, rgba(tile_color(1, 1)));
    assert_eq!(image.get_pixel(57, 57).0, rgba(ABSENT_TILE_FILL.0));
}

#[tokio::test]
async fn test_degenerate_boxes_produce_pixels() {
    let fixture = StoreFixture::new(
        4,
        &[
            (1, 13.4, 13.4, 52.5, 52.5),
            (2, 20.0, 10.0, 5.0, -5.0),
        ],
    );
    let store = fixture.open();
    let service = service_for(&store, MockTileSource::new(256), 0.1, false).await;

    let summary = service
        .run(&store.annotations().await.unwrap(), 0..=4)
        .await;
    assert_eq!(summary.cached, 10);

    for (_, _, png) in fixture.images() {
        let (width, height) = decode_png(&png).dimensions();
        assert!(width >= 1 && height >= 1);
    }
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let fixture = StoreFixture::new(
        3,
        &[
            (1, -60.0, 60.0, -1.0, 1.0),
            (2, -10.0, 10.0, -10.0, 10.0),
            (3, 190.0, 200.0, -5.0, 5.0),
        ],
    );
    let store = fixture.open();
    let service = service_for(&store, MockTileSource::new(256), 0.0, false).await;

    let summary = service
        .run(&store.annotations().await.unwrap(), 3..=3)
        .await;

    assert_eq!(summary.too_large, 1);
    assert_eq!(summary.cached, 1);
    assert_eq!(summary.out_of_domain, 1);
    assert_eq!(summary.total(), 3);

    let keys: Vec<(i64, u32)> = fixture.images().iter().map(|(id, z, _)| (*id, *z)).collect();
    assert_eq!(keys, vec![(2, 3)]);
}

#[tokio::test]
async fn test_failed_write_leaves_no_row_and_is_retried() {
    let fixture = StoreFixture::new(5, &[EQUATOR_BOX, (2, 100.0, 110.0, 30.0, 40.0)]);
    let store = fixture.open();
    let annotations = store.annotations().await.unwrap();
    let source = MockTileSource::new(256);

    let service = service_for(&store, source.clone(), 0.0, false).await;
    fixture.execute(
        "CREATE TRIGGER refuse_first BEFORE INSERT ON images WHEN NEW.id = 1
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    );

    let summary = service.run(&annotations, 2..=2).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cached, 1);
    let keys: Vec<(i64, u32)> = fixture.images().iter().map(|(id, z, _)| (*id, *z)).collect();
    assert_eq!(keys, vec![(2, 2)]);

    // The failed key is rendered again once writes succeed
    fixture.execute("DROP TRIGGER refuse_first");
    source.reset_tracking();
    let service = service_for(&store, source.clone(), 0.0, false).await;
    let summary = service.run(&annotations, 2..=2).await;

    assert_eq!(summary.cached, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(source.request_count(), 4);
    let keys: Vec<(i64, u32)> = fixture.images().iter().map(|(id, z, _)| (*id, *z)).collect();
    assert_eq!(keys, vec![(1, 2), (2, 2)]);
}

#[tokio::test]
async fn test_annotation_bounds_come_from_store() {
    let fixture = StoreFixture::new(1, &[(4, -20.0, 30.0, -15.0, 25.0)]);
    let store = fixture.open();

    let annotations = store.annotations().await.unwrap();
    assert_eq!(
        annotations,
        vec![Annotation::new(4, GeoBounds::new(-20.0, 30.0, -15.0, 25.0))]
    );
}
