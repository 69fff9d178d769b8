//! # Rasid CLI
//!
//! Command-line interface for receipt printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print a receipt over the configured serial port
//! rasid print receipt.json
//!
//! # Print over TCP, raster first
//! rasid print --host 10.0.0.20 --strategy raster,host-compositor receipt.json
//!
//! # Dump the ESC/POS bytes of the Arabic sample as hex
//! rasid encode --strategy raster
//!
//! # Preview what the raster strategy would print
//! rasid preview --output receipt.png receipt.json
//!
//! # List likely receipt printers
//! rasid printers
//! ```

use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use rasid::{
    Error, PrintOutcome, Receipt, SystemConnector,
    config::{self, Command, DemoArgs, EncodeArgs, PreviewArgs, PrintArgs, PrintersArgs, Settings},
    discovery,
    receipt::layout::layout,
    render::{compose::compose_with, glyphs, pack, preview},
    strategy::{RenderStrategy, build_payload},
    telemetry,
    transport::{Connector, Payload, RecordingDialog, UiThread},
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let (args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;
    glyphs::configure(&settings.render.font)?;

    match args.command {
        Command::Print(args) => print(&settings, args).await,
        Command::Encode(args) => encode(&settings, args),
        Command::Preview(args) => render_preview(&settings, args),
        Command::Printers(args) => list_printers(args).await,
        Command::Demo(DemoArgs { .. }) => {
            let outcome = print_receipt(&settings, &Receipt::sample_arabic()).await?;
            report(&outcome);
            Ok(())
        }
    }
}

async fn print(settings: &Settings, args: PrintArgs) -> Result<(), Error> {
    let receipt = read_receipt(&args.receipt)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    }
    let outcome = print_receipt(settings, &receipt).await?;
    report(&outcome);
    Ok(())
}

async fn print_receipt(settings: &Settings, receipt: &Receipt) -> Result<PrintOutcome, Error> {
    let mut connector = SystemConnector::new(
        settings.transport.connect_timeout,
        settings.transport.send_timeout,
    );

    // No native dialog toolkit is linked; a configured surface gets a
    // recording host and the document is echoed instead.
    let dialog = match &settings.transport.dialog_surface {
        Some(_) => {
            let host = RecordingDialog::new();
            connector = connector.with_ui(UiThread::spawn(host.clone())?);
            Some(host)
        }
        None => None,
    };

    let pipeline = settings.pipeline(Arc::new(connector));
    let outcome = pipeline.print(receipt, &settings.target).await?;

    if let Some(dialog) = dialog {
        for presented in dialog.shown() {
            println!("--- dialog on {} ---", presented.surface);
            println!("{}", presented.document.to_text());
        }
    }
    Ok(outcome)
}

fn report(outcome: &PrintOutcome) {
    for failure in &outcome.failures {
        eprintln!("  skipped {}", failure);
    }
    println!(
        "Printed with {} to {} ({} bytes)",
        outcome.strategy, outcome.target, outcome.bytes_sent
    );
}

fn encode(settings: &Settings, args: EncodeArgs) -> Result<(), Error> {
    let receipt = match &args.receipt {
        Some(path) => read_receipt(path)?,
        None => Receipt::sample_arabic(),
    };
    let strategy = settings
        .render
        .strategies
        .first()
        .copied()
        .unwrap_or_else(RenderStrategy::raster);

    let capabilities = SystemConnector::default().capabilities(&settings.target);
    let payload = build_payload(
        &strategy,
        &layout(&receipt),
        &settings.build_options(),
        capabilities,
        glyphs::engine(),
    )
    .map_err(|reason| Error::Encode(format!("{strategy}: {reason}")))?;

    let bytes = match payload {
        Payload::Raw(bytes) => bytes,
        Payload::Document(document) => document.to_text().into_bytes(),
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes)?;
            println!("Wrote {} bytes ({strategy}) to {}", bytes.len(), path.display());
        }
        None => print!("{}", hex_dump(&bytes)),
    }
    Ok(())
}

fn render_preview(settings: &Settings, args: PreviewArgs) -> Result<(), Error> {
    let receipt = match &args.receipt {
        Some(path) => read_receipt(path)?,
        None => Receipt::sample_arabic(),
    };
    let bitmap = compose_with(
        glyphs::engine(),
        &layout(&receipt),
        settings.printer.profile.width_dots as usize,
        settings.render.font_size_pt,
    );
    let raster = pack(&bitmap, settings.render.max_height)?;
    preview::save_png(&preview::raster_to_image(&raster), &args.output)?;
    println!(
        "Saved {}x{} preview to {}",
        raster.width_bytes() as usize * 8,
        raster.height(),
        args.output.display()
    );
    Ok(())
}

async fn list_printers(args: PrintersArgs) -> Result<(), Error> {
    let queues = discovery::list_queues().await?;
    let shown = if args.all {
        queues
    } else {
        discovery::filter_receipt_printers(queues)
    };
    if shown.is_empty() {
        println!("No receipt printers found. Use --all to list every queue.");
    }
    for name in shown {
        println!("{name}");
    }
    Ok(())
}

fn read_receipt(path: &Path) -> Result<Receipt, Error> {
    let json = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&json)?)
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x} ", row * 16);
        for byte in chunk {
            let _ = write!(out, " {byte:02x}");
        }
        out.push('\n');
    }
    out
}
