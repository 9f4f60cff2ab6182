use burn_ndarray::NdArray;
use diffeo_core::filter::SmoothingConfig;
use diffeo_core::image::{Image, ImageGeometry, ScalarVolume};
use diffeo_registration::{
    CrossCorrelationMetric, MeanSquaresMetric, MetricDescriptor, UpdateFieldBuilder, UpdateRequest,
};

type B = NdArray<f32>;

fn blob(size: usize, cx: f64, cy: f64) -> Image<B, 2> {
    let geometry = ImageGeometry::from_size([size, size]);
    let volume = ScalarVolume::from_fn(geometry, |p| {
        let dx = p[0] - cx;
        let dy = p[1] - cy;
        (-(dx * dx + dy * dy) / 18.0).exp() as f32
    });
    Image::from_volume(&volume, &Default::default())
}

fn pair() -> (Image<B, 2>, Image<B, 2>) {
    (blob(24, 12.0, 12.0), blob(24, 10.5, 12.0))
}

fn request() -> UpdateRequest<'static, 2> {
    UpdateRequest {
        want_inverse: true,
        update_energy: true,
        ..UpdateRequest::default()
    }
}

#[test]
fn test_single_metric_update_is_normalized() {
    let (fixed, moving) = pair();
    let domain = fixed.geometry().clone();
    let smoothing = SmoothingConfig::gaussian(2.0);
    let mut metrics = vec![MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed, moving)];

    let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing);
    let update = builder.compute(&request()).unwrap();

    let max = update.forward.max_magnitude_in_voxels();
    assert!(max <= 1.0 + 1e-9);
    assert!(max > 0.99);
    let inverse = update.inverse.unwrap();
    assert!(inverse.max_magnitude_in_voxels() <= 1.0 + 1e-9);
    assert!(update.energies[0].unwrap() > 0.0);

    // fixed leads moving in x: the forward update pulls towards -x
    assert!(update.forward.get(&[15, 12])[0] < 0.0);
    assert!(inverse.get(&[13, 12])[0] > 0.0);
}

#[test]
fn test_configured_weights_are_not_renormalized() {
    let (fixed, moving) = pair();
    let domain = fixed.geometry().clone();
    let smoothing = SmoothingConfig::gaussian(0.0);
    let mut metrics = vec![
        MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed.clone(), moving.clone()).with_weight(3.0),
    ];

    let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing);
    let update = builder.compute(&request()).unwrap();

    // a lone metric of weight 3 is not scaled back to 1
    let max = update.forward.max_magnitude_in_voxels();
    assert!((max - 3.0).abs() < 1e-6, "max magnitude {}", max);
}

#[test]
fn test_alternating_selects_one_metric() {
    let (fixed, moving) = pair();
    let domain = fixed.geometry().clone();
    let smoothing = SmoothingConfig::gaussian(1.0);
    let mut metrics = vec![
        MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed.clone(), moving.clone()),
        MetricDescriptor::new(Box::new(CrossCorrelationMetric::new(2)), fixed, moving),
    ];

    for iteration in 0..4 {
        let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing).alternating(iteration);
        let update = builder.compute(&request()).unwrap();
        let active = iteration % 2;
        assert!(update.energies[active].is_some());
        assert!(update.energies[1 - active].is_none());
        assert!(update.forward.max_magnitude_in_voxels() <= 1.0 + 1e-9);
    }

    let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing);
    let update = builder.compute(&request()).unwrap();
    assert!(update.energies.iter().all(Option::is_some));
}

#[test]
fn test_mask_excludes_low_probability_voxels() {
    let (fixed, moving) = pair();
    let domain = fixed.geometry().clone();
    let smoothing = SmoothingConfig::gaussian(0.0);
    let mask_volume = ScalarVolume::from_fn(domain.clone(), |p| if p[0] < 12.0 { 0.05 } else { 2.0 });
    let mask = Image::from_volume(&mask_volume, &Default::default());
    let mut metrics = vec![MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed, moving)];

    let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing).with_mask(Some(&mask));
    let update = builder.compute(&request()).unwrap();

    for y in 0..24 {
        for x in 0..12 {
            assert!(update.forward.get(&[x, y]).is_zero());
        }
    }
    assert!(update.forward.get(&[15, 12])[0] < 0.0);
    // probabilities above one are clamped
    assert!(update.forward.max_magnitude_in_voxels() <= 1.0 + 1e-9);
}

#[test]
fn test_energy_flag_off() {
    let (fixed, moving) = pair();
    let domain = fixed.geometry().clone();
    let smoothing = SmoothingConfig::gaussian(1.0);
    let mut metrics = vec![MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed, moving)];

    let mut builder = UpdateFieldBuilder::new(&mut metrics, &domain, &smoothing);
    let update = builder
        .compute(&UpdateRequest {
            update_energy: false,
            ..UpdateRequest::default()
        })
        .unwrap();
    assert!(update.inverse.is_none());
    assert!(update.energies[0].is_none());
}
