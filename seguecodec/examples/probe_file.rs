//! Example: Probe files for AC-3 or DTS frame chains
//!
//! Run with: cargo run -p seguecodec --example probe_file -- <file>...

use std::path::Path;
use std::sync::Arc;

use seguecodec::{
    Ac3Format, CodecRegistry, DtsFormat, FrameFormat, FrameSource, DEFAULT_SCAN_WINDOW,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: probe_file <file>...");
        std::process::exit(2);
    }

    let registry = CodecRegistry::default();
    for path in &paths {
        let Some(name) = registry.detect(path) else {
            println!("{path}: not a recognized frame stream");
            continue;
        };

        let detector: Arc<dyn FrameFormat> = match name {
            "dts" => Arc::new(DtsFormat),
            _ => Arc::new(Ac3Format),
        };
        let mut source = FrameSource::open(Path::new(path), detector, DEFAULT_SCAN_WINDOW)?;
        if let Err(err) = source.collect_stats() {
            println!("{path}: {name} frames found, but: {err}");
            continue;
        }

        println!("{path}: {}", source.describe());
        if let Some(stats) = source.stats() {
            println!(
                "  {} frames measured, {:.1} bytes/frame, {} kbps",
                stats.frames,
                stats.avg_frame_size,
                stats.bitrate / 1000
            );
        }
        println!("  about {:.1} seconds", source.duration());
    }
    Ok(())
}
