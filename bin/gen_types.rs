//! Write TypeScript declarations for the plain data records.
//!
//! Usage: cargo run --bin gen_types --features ts-rs -- [out_dir]

use gistghost::{ContentFormat, Edge, IndexMetadata, NetworkStats, ThoughtNode, ThoughtStatus, TS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "bindings".to_string());

    ThoughtNode::export_all_to(&out_dir)?;
    ThoughtStatus::export_all_to(&out_dir)?;
    ContentFormat::export_all_to(&out_dir)?;
    Edge::export_all_to(&out_dir)?;
    IndexMetadata::export_all_to(&out_dir)?;
    NetworkStats::export_all_to(&out_dir)?;

    println!("TypeScript bindings written to {}", out_dir);
    Ok(())
}
