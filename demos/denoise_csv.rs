//! Pretrain a stack on a CSV file and write the encoded rows next to it.
//!
//! ```text
//! RUST_LOG=info cargo run --example denoise_csv -- data.csv encoded.csv
//! ```
//!
//! Without arguments a small synthetic dataset is generated in a temp dir.

use std::io::Write;
use std::path::PathBuf;

use rust_sda::{Activation, BatchSource, CsvBatchSource, Loss, SdaBuilder};

fn synthetic(dir: &std::path::Path) -> rust_sda::Result<PathBuf> {
    let path = dir.join("synthetic.csv");
    let mut file = std::fs::File::create(&path)?;
    for r in 0..1_000 {
        let row: Vec<String> = (0..16)
            .map(|c| if (r + c) % 4 == 0 { "1" } else { "0" }.to_owned())
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }
    Ok(path)
}

fn main() -> rust_sda::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let tmp = std::env::temp_dir().join("rust_sda_demo");
    std::fs::create_dir_all(&tmp)?;

    let mut args = std::env::args().skip(1);
    let input = match args.next() {
        Some(p) => PathBuf::from(p),
        None => synthetic(&tmp)?,
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| tmp.join("encoded.csv"));

    // Peek at one row to learn the input width.
    let peek = CsvBatchSource::new(&input, 1)?;
    let rows = peek.count_rows()?;
    log::info!("{} has {rows} rows", input.display());
    let input_dim = peek
        .batches()?
        .next()
        .ok_or_else(|| rust_sda::Error::InvalidData("input file is empty".to_owned()))??
        .cols();

    let mut sda = SdaBuilder::new(input_dim)?
        .add_layer(input_dim / 2, Activation::Sigmoid, 20)?
        .add_layer(input_dim / 4, Activation::Sigmoid, 20)?
        .corruption(0.3)?
        .loss(Loss::CrossEntropy)
        .learning_rate(1e-2)
        .batch_size(100)
        .print_step(50)
        .build()?;

    let source = sda.csv_source(&input)?;
    let report = sda.pretrain(&source)?;
    for layer in &report.layers {
        log::info!(
            "layer {}: {} steps, final loss {:.4}, {:.2?}",
            layer.depth,
            layer.steps,
            layer.final_loss,
            layer.elapsed
        );
    }

    if output.exists() {
        std::fs::remove_file(&output)?;
    }
    for batch in source.batches()? {
        sda.persist(&sda.encode(&batch?)?, &output)?;
    }
    println!("wrote encodings to {}", output.display());
    Ok(())
}
