//! sealpir-demo: In-process PIR round trip with size report
//!
//! Derives parameters, fills a random database, and runs queries through a
//! server and client living in the same process. Prints query, key and reply
//! sizes along with timings.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eyre::{ensure, eyre, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sealpir::params::{PirParamsBuilder, QueryLayout};
use sealpir::pir::{PirClient, PirServer};

#[derive(Parser)]
#[command(name = "sealpir-demo")]
#[command(about = "Run SealPIR queries against a random database")]
#[command(version)]
struct Args {
    /// Number of database elements
    #[arg(long, default_value = "100")]
    element_count: usize,

    /// Size of each element in bytes
    #[arg(long, default_value = "288")]
    element_size: usize,

    /// Ring degree N (2048, 4096, 8192 or 16384)
    #[arg(long, default_value = "4096")]
    poly_degree: usize,

    /// Data bits per plaintext coefficient
    #[arg(long, default_value = "20")]
    plain_bits: u32,

    /// Recursion dimension d
    #[arg(long, default_value = "2")]
    dimension: u32,

    /// Index fetched by the first query
    #[arg(long, default_value = "37")]
    index: usize,

    /// Number of queries; indices after the first are random
    #[arg(long, default_value = "1")]
    queries: usize,

    /// Pack all selectors into one query ciphertext
    #[arg(long)]
    packed: bool,

    /// Random seed for database and keys (optional)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the derived parameters as JSON
    #[arg(long)]
    params_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let layout = if args.packed {
        QueryLayout::Packed
    } else {
        QueryLayout::PerDimension
    };
    let params = PirParamsBuilder::new(args.element_count, args.element_size)
        .poly_degree(args.poly_degree)
        .plain_bits(args.plain_bits)
        .dimension(args.dimension)
        .layout(layout)
        .build()
        .wrap_err("Failed to derive parameters")?;

    info!(
        "Parameters: N = {}, t = {}, {} primes, gadget base 2^{}",
        params.poly_degree,
        params.plain_modulus,
        params.moduli.len(),
        params.gadget_base_bits
    );
    info!(
        "Layout: {} elements/plaintext, {} columns, extents {:?}",
        params.elements_per_plaintext, params.columns, params.extents
    );
    info!("Noise margin: {:.1} bits", params.noise_margin_bits());

    if let Some(path) = &args.params_out {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &params)
            .with_context(|| "Failed to serialize parameters")?;
        writer.flush()?;
        info!("Parameters saved to {}", path.display());
    }

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    let database_size = args
        .element_count
        .checked_mul(args.element_size)
        .ok_or_else(|| {
            eyre!(
                "Database of {} x {} bytes overflows",
                args.element_count,
                args.element_size
            )
        })?;
    let mut database = vec![0u8; database_size];
    rng.fill_bytes(&mut database);

    let setup_start = Instant::now();
    let server = PirServer::new(params.clone()).wrap_err("Failed to create server")?;
    server
        .setup(&database)
        .wrap_err("Failed to load database")?;
    info!("Server setup: {:.2?}", setup_start.elapsed());

    let keygen_start = Instant::now();
    let client = PirClient::from_rng(params.clone(), &mut rng).wrap_err("Failed to create client")?;
    server
        .set_galois_key(0, client.galois_key())
        .wrap_err("Failed to register Galois keys")?;
    info!("Client keygen: {:.2?}", keygen_start.elapsed());

    let pb = ProgressBar::new(args.queries as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut query_size = 0;
    let mut reply_size = 0;
    let round_trip_start = Instant::now();
    for i in 0..args.queries {
        let index = if i == 0 {
            args.index
        } else {
            rng.gen_range(0..args.element_count)
        };

        let query = client
            .generate_query_with_rng(index, &mut rng)
            .with_context(|| format!("Failed to build query for index {}", index))?;
        let reply = server
            .evaluate(&query, 0)
            .with_context(|| format!("Failed to answer query for index {}", index))?;
        let element = client
            .decode_element(index, &reply)
            .with_context(|| format!("Failed to decode reply for index {}", index))?;

        let expected = &database[index * args.element_size..(index + 1) * args.element_size];
        ensure!(element == expected, "Element {} decoded incorrectly", index);

        query_size = query.ciphertexts.len();
        reply_size = reply.ciphertexts.len();
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    let per_query = round_trip_start.elapsed() / args.queries.max(1) as u32;

    println!();
    println!("=== SealPIR Sizes ===");
    println!("Database: {} x {} bytes", args.element_count, args.element_size);
    println!(
        "Query: {} ciphertexts, {:.1} KB",
        params.query_count(),
        query_size as f64 / 1024.0
    );
    println!(
        "Reply: {} ciphertexts, {:.1} KB",
        params.reply_count(),
        reply_size as f64 / 1024.0
    );
    println!(
        "Galois keys: {:.1} KB",
        client.galois_key().len() as f64 / 1024.0
    );
    println!("Round trip: {:.2?} per query", per_query);

    Ok(())
}
