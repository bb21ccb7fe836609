use burn::tensor::{Distribution, ElementConversion, Tensor};
use burn_ndarray::NdArray;
use rsdn_core::RsdnError;
use rsdn_model::io::{load_checkpoint, save_checkpoint};
use rsdn_model::{FrameInputs, RecurrentState, RsdnConfig};
use tempfile::tempdir;

type Backend = NdArray<f32>;

#[test]
fn test_checkpoint_roundtrip_restores_weights() {
    let device = Default::default();
    let config = RsdnConfig::new().with_mid_channels(8).with_blocknums(2);
    let trained = config.init::<Backend>(&device).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("rsdn");
    save_checkpoint(trained.clone(), &path).unwrap();

    // A freshly initialised model has different weights until it loads the file
    let fresh = config.init::<Backend>(&device).unwrap();
    let loaded = load_checkpoint(fresh, &path, &device).unwrap();

    let frame = || {
        Tensor::<Backend, 4>::random([1, 3, 4, 4], Distribution::Uniform(0.0, 1.0), &device)
    };
    let inputs = FrameInputs::new(frame(), frame(), frame(), frame(), frame());

    let expected = trained
        .forward(inputs.clone(), RecurrentState::Initial)
        .unwrap();
    let actual = loaded.forward(inputs, RecurrentState::Initial).unwrap();

    let diff = (expected.hr_frame - actual.hr_frame)
        .abs()
        .max()
        .into_scalar()
        .elem::<f32>();
    assert_eq!(diff, 0.0);
    assert_eq!(loaded.num_blocks(), 2);
}

#[test]
fn test_missing_checkpoint_is_an_error() {
    let device = Default::default();
    let model = RsdnConfig::new()
        .with_mid_channels(8)
        .with_blocknums(1)
        .init::<Backend>(&device)
        .unwrap();

    let dir = tempdir().unwrap();
    let result = load_checkpoint(model, &dir.path().join("missing"), &device);
    assert!(matches!(result, Err(RsdnError::Checkpoint(_))));
}
