//! CLI tool for turning captured chat page snapshots into transcripts.
//!
//! Each snapshot is a JSON dump of what a page inspector saw on a chat page.
//! The tool extracts, chunks and fingerprints every snapshot, keeps one record
//! per conversation and writes JSONL plus a CSV of chunk blocks.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_transcript_core::{
    pipeline::{ExtractConfig, PipelineResult},
    process_all_snapshots, write_jsonl_output, DEFAULT_MAX_CHARS, FINGERPRINT_TURNS,
    SUMMARY_CHARS,
};

/// Extract, chunk and fingerprint captured chat pages.
#[derive(Parser, Debug)]
#[command(name = "chat-transcript")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory containing JSON page snapshots
    #[arg(long)]
    input_root: PathBuf,

    /// Output directory for conversations.jsonl, blocks.csv and metadata.json
    #[arg(long)]
    output_dir: PathBuf,

    /// Maximum characters per chunk block
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,

    /// Leading messages used for the conversation fingerprint
    #[arg(long, default_value_t = FINGERPRINT_TURNS)]
    fingerprint_turns: usize,

    /// Characters of transcript kept as summary
    #[arg(long, default_value_t = SUMMARY_CHARS)]
    summary_chars: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ExtractConfig {
        max_chars: args.max_chars,
        fingerprint_turns: args.fingerprint_turns,
        summary_chars: args.summary_chars,
    };
    config.validate()?;

    tracing::info!("Processing snapshots from {:?}", args.input_root);
    let results =
        process_all_snapshots(&args.input_root, Some(args.output_dir.as_path()), &config)?;
    tracing::info!("Collected {} conversations", results.len());

    tracing::info!("Writing output to {:?}", args.output_dir);
    let result: PipelineResult = write_jsonl_output(results, &args.output_dir)?;

    let metadata_path = args.output_dir.join("metadata.json");
    let metadata = serde_json::json!({
        "config": {
            "input_root": args.input_root.to_string_lossy(),
            "output_dir": args.output_dir.to_string_lossy(),
            "max_chars": config.max_chars,
            "fingerprint_turns": config.fingerprint_turns,
            "summary_chars": config.summary_chars,
        },
        "counts": {
            "total_snapshots": result.total_snapshots,
            "unique_conversations": result.unique_conversations,
            "duplicate_snapshots": result.duplicate_snapshots,
        },
        "stats": {
            "total_messages": result.total_messages,
            "total_blocks": result.total_blocks,
            "avg_blocks_per_conversation": if result.unique_conversations > 0 {
                result.total_blocks as f64 / result.unique_conversations as f64
            } else {
                0.0
            },
        },
        "files": {
            "conversations_path": args.output_dir.join("conversations.jsonl").to_string_lossy(),
            "blocks_path": args.output_dir.join("blocks.csv").to_string_lossy(),
        },
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

    println!("\n[summary]");
    println!("  Snapshots processed: {}", result.total_snapshots);
    println!("  Unique conversations: {}", result.unique_conversations);
    println!("  Duplicate captures: {}", result.duplicate_snapshots);
    println!("  Total messages: {}", result.total_messages);
    println!("  Total blocks: {}", result.total_blocks);
    println!("  Output: {:?}/{{conversations.jsonl,blocks.csv}}", args.output_dir);
    println!("  Metadata: {:?}", metadata_path);

    Ok(())
}
