//! # Output Properties
//!
//! Invariants of the byte and bitmap outputs that hold for any receipt.

use pretty_assertions::assert_eq;
use rasid::error::OversizedBitmap;
use rasid::ir::RASTER_CHUNK_ROWS;
use rasid::printer::PrinterConfig;
use rasid::protocol::codepage::{Codepage, decode, transcode};
use rasid::protocol::parse::{Parsed, parse};
use rasid::receipt::layout::layout;
use rasid::receipt::{LineItem, Receipt};
use rasid::render::compose::compose_with;
use rasid::render::glyphs::GlyphEngine;
use rasid::render::pack::{THRESHOLD, pack};
use rasid::strategy::build::{BuildOptions, raster};
use rasid::transport::Capabilities;
use rust_decimal::Decimal;

fn long_receipt(items: usize) -> Receipt {
    let mut builder = Receipt::builder("STORE");
    for i in 0..items {
        builder = builder.item(LineItem::new(
            format!("Item {i}"),
            Decimal::ONE,
            Decimal::new(199, 2),
            Decimal::new(199, 2),
        ));
    }
    builder.build().unwrap()
}

#[test]
fn transcode_round_trips() {
    for (text, codepage) in [
        ("Café au lait ½", Codepage::PC437),
        ("Crème brûlée 5,00 €", Codepage::WPC1252),
        ("متجر عينة", Codepage::WPC1256),
    ] {
        let bytes = transcode(text, codepage).unwrap();
        assert_eq!(decode(&bytes, codepage), text, "{codepage}");
    }
}

#[test]
fn raster_is_deterministic() {
    let engine = GlyphEngine::builtin();
    let blocks = layout(&long_receipt(5));
    let first = compose_with(&engine, &blocks, 384, 10.0);
    let second = compose_with(&engine, &blocks, 384, 10.0);
    assert_eq!(first.height, second.height);
    assert_eq!(first, second);
}

#[test]
fn packing_matches_threshold() {
    let bitmap = compose_with(&GlyphEngine::builtin(), &layout(&long_receipt(3)), 380, 12.0);
    let packed = pack(&bitmap, 4000).unwrap();

    assert_eq!(packed.width_bytes() as usize, bitmap.width.div_ceil(8));
    assert_eq!(
        packed.bits().len(),
        bitmap.width.div_ceil(8) * bitmap.height
    );
    for y in 0..bitmap.height {
        for x in 0..bitmap.width {
            let dark = bitmap.get(x, y).is_some_and(|v| v < THRESHOLD);
            assert_eq!(packed.is_ink(x, y), dark, "pixel ({x}, {y})");
        }
    }
    // Padding dots stay blank.
    for y in 0..bitmap.height {
        for x in bitmap.width..packed.width_dots() {
            assert!(!packed.is_ink(x, y));
        }
    }
}

#[test]
fn oversize_is_rejected_whole() {
    let bitmap = compose_with(&GlyphEngine::builtin(), &layout(&long_receipt(10)), 384, 10.0);
    let err = pack(&bitmap, bitmap.height - 1).unwrap_err();
    assert_eq!(
        err,
        OversizedBitmap::TooTall {
            height: bitmap.height,
            max_height: bitmap.height - 1,
        }
    );
}

#[test]
fn raster_headers_match_payloads() {
    let options = BuildOptions {
        printer: PrinterConfig::PAPER_58MM,
        ..BuildOptions::default()
    };
    let caps = Capabilities {
        raw_bytes: true,
        cut: true,
    };
    let program = raster(
        &layout(&long_receipt(30)),
        10.0,
        4000,
        &options,
        caps,
        &GlyphEngine::builtin(),
    )
    .unwrap();
    let expected_height: usize = program.rasters().map(|r| r.height() as usize).sum();

    let commands = parse(&program.to_bytes()).unwrap();
    let mut chunks = 0;
    let mut rows = 0;
    for command in &commands {
        if let Parsed::Raster {
            width_bytes,
            height,
            data,
        } = command
        {
            assert_eq!(*width_bytes, 48);
            assert!(*height as usize <= RASTER_CHUNK_ROWS);
            assert_eq!(data.len(), *width_bytes as usize * *height as usize);
            chunks += 1;
            rows += *height as usize;
        }
    }
    assert!(chunks > 1, "receipt should need more than one raster block");
    assert_eq!(rows, expected_height);
}
