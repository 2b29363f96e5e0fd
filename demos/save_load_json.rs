#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_sda::Result<()> {
    use rust_sda::{Matrix, MemoryBatchSource, SdaConfig, StackedAutoencoder};

    env_logger::init();

    let cfg = SdaConfig::from_json_str(
        r#"{
            "dims": [8, 4, 2],
            "activations": ["sigmoid", "sigmoid"],
            "epochs": [50, 50],
            "noise": 0.2,
            "loss": "rmse",
            "lr": 0.01,
            "batch_size": 4,
            "seed": 0
        }"#,
    )?;

    let rows: Vec<Vec<f32>> = (0..16)
        .map(|i| (0..8).map(|j| ((i >> (j % 4)) & 1) as f32).collect())
        .collect();
    let data = Matrix::from_rows(&rows)?;
    let source = MemoryBatchSource::new(data.clone(), cfg.batch_size)?;

    // Pretrain only the first layer, save, then finish from the saved file.
    let mut sda = cfg.build()?;
    sda.pretrain_layer(0, &source)?;

    let path = "target/tmp_sda.json";
    sda.save_json(path)?;

    let mut loaded = StackedAutoencoder::load_json(path)?;
    loaded.pretrain(&source)?;
    println!(
        "resumed from {path}; encoded shape {:?}",
        loaded.encode(&data)?.shape()
    );
    Ok(())
}
