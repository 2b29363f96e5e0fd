use std::io::Write;

use approx::assert_abs_diff_eq;
use rust_sda::{
    Activation, BatchSource, Batches, CsvBatchSource, Error, Loss, Matrix, MemoryBatchSource,
    Result, SdaBuilder, StackedAutoencoder, TrainConfig, persist,
};

fn patterns(rows: usize, cols: usize) -> Matrix {
    let data = (0..rows * cols)
        .map(|i| {
            let (r, c) = (i / cols, i % cols);
            if (r + c) % 3 == 0 { 1.0 } else { 0.0 }
        })
        .collect();
    Matrix::from_vec(rows, cols, data).unwrap()
}

fn write_csv(m: &Matrix) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for row in m.rows_iter() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(file, "{}", line.join(", ")).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn relu_stack_trains_every_layer_and_encodes_to_the_last_width() {
    let data = patterns(40, 8);
    let mut sda = StackedAutoencoder::from_options(
        &[8, 4, 2],
        &["relu", "relu"],
        &[1, 1],
        TrainConfig {
            loss: Loss::Rmse,
            corruption: 0.1,
            lr: 1e-3,
            seed: Some(7),
            ..TrainConfig::default()
        },
    )
    .unwrap();

    let report = sda
        .pretrain(&MemoryBatchSource::new(data.clone(), 10).unwrap())
        .unwrap();

    assert_eq!(report.layers.len(), 2);
    assert!(sda.layers().iter().all(|l| l.is_trained()));
    assert_eq!(sda.encode_dataset(&data, 2).unwrap().shape(), (40, 2));
    assert_eq!(sda.encode_dataset(&data, 1).unwrap().shape(), (40, 4));
}

#[test]
fn three_batches_and_one_epoch_is_three_steps() {
    let file = write_csv(&patterns(35, 6));
    let source = CsvBatchSource::new(file.path(), 10).unwrap();
    assert_eq!(source.count_rows().unwrap(), 35);

    let mut sda = SdaBuilder::new(6)
        .unwrap()
        .add_layer(3, Activation::Sigmoid, 1)
        .unwrap()
        .seed(1)
        .build()
        .unwrap();
    let report = sda.pretrain(&source).unwrap();
    assert_eq!(report.layers[0].steps, 3);
    assert_eq!(report.layers[0].depth, 0);
}

#[test]
fn encoding_is_deterministic() {
    let data = patterns(20, 5);
    let mut sda = SdaBuilder::new(5)
        .unwrap()
        .add_layer(3, Activation::Tanh, 2)
        .unwrap()
        .loss(Loss::Rmse)
        .seed(11)
        .build()
        .unwrap();
    sda.pretrain(&MemoryBatchSource::new(data.clone(), 5).unwrap())
        .unwrap();

    assert_eq!(sda.encode(&data).unwrap(), sda.encode(&data).unwrap());
}

#[test]
fn persisted_encodings_read_back_equal() {
    let data = patterns(30, 4);
    let mut sda = SdaBuilder::new(4)
        .unwrap()
        .add_layer(3, Activation::Sigmoid, 1)
        .unwrap()
        .add_layer(2, Activation::Sigmoid, 1)
        .unwrap()
        .corruption(0.25)
        .unwrap()
        .seed(5)
        .build()
        .unwrap();
    sda.pretrain(&MemoryBatchSource::new(data.clone(), 10).unwrap())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("encoded.csv");
    let source = MemoryBatchSource::new(data, 10).unwrap();
    let mut written = Vec::new();
    for batch in source.batches().unwrap() {
        let encoded = sda.encode(&batch.unwrap()).unwrap();
        sda.persist(&encoded, &out).unwrap();
        written.extend_from_slice(encoded.as_slice());
    }

    let back = persist::read_rows(&out).unwrap();
    assert_eq!(back.shape(), (30, 2));
    for (a, b) in back.as_slice().iter().zip(&written) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }

    // Output of one stack is valid input for another.
    let chained = CsvBatchSource::new(&out, 10).unwrap();
    assert_eq!(chained.batches().unwrap().count(), 3);
}

/// Yields a few good batches, then fails.
struct FailingSource {
    good: usize,
    cols: usize,
}

impl BatchSource for FailingSource {
    fn batches(&self) -> Result<Batches<'_>> {
        let cols = self.cols;
        let good = (0..self.good).map(move |_| Ok(Matrix::zeros(4, cols)));
        let bad = std::iter::once(Err(Error::InvalidData("disk went away".to_owned())));
        Ok(Box::new(good.chain(bad)))
    }
}

#[test]
fn failure_mid_phase_leaves_the_layer_untrained() {
    let data = patterns(8, 3);
    let mut sda = SdaBuilder::new(3)
        .unwrap()
        .add_layer(2, Activation::Sigmoid, 1)
        .unwrap()
        .add_layer(1, Activation::Sigmoid, 1)
        .unwrap()
        .seed(2)
        .build()
        .unwrap();

    sda.pretrain_layer(0, &MemoryBatchSource::new(data, 4).unwrap())
        .unwrap();
    let err = sda
        .pretrain(&FailingSource { good: 2, cols: 3 })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
    assert_eq!(sda.trained_depth(), 1);
    assert!(!sda.layer(1).unwrap().is_trained());
}

#[test]
fn cross_entropy_with_unbounded_decoder_can_produce_nan() {
    // The tied decoder is linear, so reconstructions may leave (0, 1) and the
    // log terms go undefined. That is reported, not caught.
    let data = Matrix::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
    assert!(Loss::CrossEntropy.forward(&data, &data.map(|v| v * 3.0 - 1.0)).unwrap().is_nan());

    let mut sda = SdaBuilder::new(2)
        .unwrap()
        .add_layer(2, Activation::ReLU, 1)
        .unwrap()
        .seed(0)
        .build()
        .unwrap();
    let report = sda
        .pretrain(&MemoryBatchSource::new(data, 2).unwrap())
        .unwrap();
    assert_eq!(report.layers[0].steps, 1);
    assert!(sda.is_trained());
}
