//! End-to-end tests: contour structure -> mask -> dose statistics.

use dose_common::{ErrorKind, VoxelGridIndex3D};
use dose_statistics::{
    evaluate_structure, DoseGrid, DoseStatistics, DoseStatisticsCalculator, Measure,
    StatisticsConfig, Threshold,
};
use test_utils::{
    assert_approx_eq, assert_err_kind, dose_with_gaps, gradient_dose_x, grids, hashed_dose,
    structures, uniform_dose,
};
use voxelizer::{mask_generator, MaskGenerator, PartialVolumeMask, VoxelizerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn square_mask() -> PartialVolumeMask {
    mask_generator(&VoxelizerConfig::default())
        .unwrap()
        .produce_mask(&structures::voxel_aligned_square(2, 7), &grids::grid_10x10x1())
        .unwrap()
}

fn calculate(mask: &PartialVolumeMask, values: Vec<f64>, config: &StatisticsConfig) -> DoseStatistics {
    let dose = DoseGrid::new(mask.grid().clone(), values).unwrap();
    DoseStatisticsCalculator::new(mask, &dose)
        .unwrap()
        .calculate(config)
        .unwrap()
}

fn relative(values: &[f64]) -> Vec<Threshold> {
    values.iter().map(|&x| Threshold::Relative(x)).collect()
}

// =============================================================================
// Scalar statistics
// =============================================================================

#[test]
fn test_uniform_dose_scenario() {
    init_tracing();
    let mask = square_mask();
    let config = StatisticsConfig {
        dose_thresholds: relative(&[0.5, 1.0]),
        ..StatisticsConfig::complex()
    };

    let stats = calculate(&mask, uniform_dose(mask.grid(), 2.0), &config);

    assert_approx_eq!(stats.mean(), 2.0, 1e-12);
    assert_approx_eq!(stats.std_deviation(), 0.0, 1e-12);
    assert_eq!(stats.minimum(), 2.0);
    assert_eq!(stats.maximum(), 2.0);
    assert_approx_eq!(stats.volume(), 36.0, 1e-9);
    assert_approx_eq!(stats.number_of_voxels(), 36.0, 1e-9);
    assert_eq!(stats.reference_dose(), 2.0);
    assert_eq!(stats.maximum_voxel_positions().len(), 36);
    assert_eq!(stats.minimum_voxel_positions().len(), 36);

    assert_approx_eq!(stats.vx(2.0).unwrap(), 36.0, 1e-9);
    assert_err_kind!(stats.vx(2.1), ErrorKind::DataUnavailable);
    let nearest = stats.vx_nearest(2.1).unwrap();
    assert_eq!(nearest.key, 2.0);
    assert_approx_eq!(nearest.value, 36.0, 1e-9);
}

#[test]
fn test_fraction_weighted_mean() {
    let grid = grids::grid_10x10x1();
    let mask = mask_generator(&VoxelizerConfig::default())
        .unwrap()
        .produce_mask(&structures::centred_square(2.0, 7.0), &grid)
        .unwrap();

    let stats = calculate(&mask, gradient_dose_x(&grid, 0.0, 1.0), &StatisticsConfig::default());

    // Coverage is symmetric around x = 4.5.
    assert_approx_eq!(stats.mean(), 4.5, 1e-9);
    assert_approx_eq!(stats.number_of_voxels(), 25.0, 1e-9);
    assert_eq!(stats.minimum(), 2.0);
    assert_eq!(stats.maximum(), 7.0);
    // Extrema are unweighted: the quarter-covered corners count too.
    assert!(stats
        .maximum_voxel_positions()
        .contains(&VoxelGridIndex3D::new(7, 2, 0)));
}

#[test]
fn test_variance_of_gradient() {
    let mask = square_mask();
    let stats = calculate(&mask, gradient_dose_x(mask.grid(), 2.0, 0.0), &StatisticsConfig::default());
    assert_approx_eq!(stats.variance(), 0.0, 1e-12);

    let stats = calculate(&mask, gradient_dose_x(mask.grid(), 0.0, 1.0), &StatisticsConfig::default());
    // Doses 2..=7 with equal weight: variance of a discrete uniform over 6 values.
    assert_approx_eq!(stats.mean(), 4.5, 1e-12);
    assert_approx_eq!(stats.variance(), 35.0 / 12.0, 1e-9);
    assert_approx_eq!(stats.std_deviation(), (35.0_f64 / 12.0).sqrt(), 1e-9);
}

#[test]
fn test_extrema_positions_in_id_order_and_capped() {
    let mask = square_mask();
    let values = gradient_dose_x(mask.grid(), 0.0, 1.0);

    let stats = calculate(&mask, values.clone(), &StatisticsConfig::default());
    let expected: Vec<_> = (2..=7).map(|y| VoxelGridIndex3D::new(7, y, 0)).collect();
    assert_eq!(stats.maximum_voxel_positions(), expected.as_slice());
    assert_eq!(stats.minimum_voxel_positions()[0], VoxelGridIndex3D::new(2, 2, 0));

    let capped = StatisticsConfig {
        max_extrema_positions: Some(2),
        ..StatisticsConfig::default()
    };
    let stats = calculate(&mask, values, &capped);
    assert_eq!(stats.maximum_voxel_positions(), &expected[..2]);
}

#[test]
fn test_undefined_dose_voxels_are_skipped() {
    init_tracing();
    let mask = square_mask();
    let values = dose_with_gaps(mask.grid(), 3.0, &[(2, 2, 0), (0, 0, 0)]);

    let stats = calculate(&mask, values, &StatisticsConfig::default());
    assert_approx_eq!(stats.number_of_voxels(), 35.0, 1e-9);
    assert_eq!(stats.mean(), 3.0);
}

// =============================================================================
// Functional measures
// =============================================================================

#[test]
fn test_measures_on_gradient() {
    let mask = square_mask();
    let config = StatisticsConfig {
        volume_thresholds: relative(&[0.0, 0.5, 1.0]),
        ..StatisticsConfig::complex()
    };
    // Six columns of six 1 mm³ voxels at 2, 3, ..., 7 Gy.
    let stats = calculate(&mask, gradient_dose_x(mask.grid(), 0.0, 1.0), &config);

    assert_eq!(stats.dx_relative(0.5).unwrap(), 5.0);
    assert_eq!(stats.dx(18.0).unwrap(), 5.0);
    assert_approx_eq!(stats.moh_relative(0.5).unwrap(), 6.0, 1e-12);
    assert_approx_eq!(stats.moc_relative(0.5).unwrap(), 3.0, 1e-12);
    assert_eq!(stats.max_oh_relative(0.5).unwrap(), 4.0);
    assert_eq!(stats.min_oc_relative(0.5).unwrap(), 5.0);

    // x = 0 degenerates to the extrema, x = 100 % to the mean or the fallbacks.
    assert_eq!(stats.moh(0.0).unwrap(), 7.0);
    assert_eq!(stats.moc(0.0).unwrap(), 2.0);
    assert_approx_eq!(stats.moh_relative(1.0).unwrap(), 4.5, 1e-12);
    assert_eq!(stats.max_oh_relative(1.0).unwrap(), 2.0);
    assert_eq!(stats.min_oc_relative(1.0).unwrap(), 7.0);

    assert_eq!(stats.all_dx().len(), 3);
    assert_eq!(stats.all_moh().keys().collect::<Vec<_>>(), vec![0.0, 18.0, 36.0]);
}

#[test]
fn test_vx_monotonic_and_moh_decreasing() {
    let grid = grids::grid_10x10x5();
    let structure = structures::square_column(1, 8, 5, 2.0);
    let dose = DoseGrid::new(grid.clone(), hashed_dose(&grid, 60.0, 7)).unwrap();

    let (mask, stats) = evaluate_structure(
        &structure,
        &dose,
        &VoxelizerConfig::default(),
        &StatisticsConfig {
            dose_thresholds: relative(&[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0]),
            volume_thresholds: relative(&[0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0]),
            ..StatisticsConfig::complex()
        },
    )
    .unwrap();

    assert_approx_eq!(stats.volume(), mask.volume(), 1e-9);
    assert_approx_eq!(stats.vx(0.0).unwrap(), stats.volume(), 1e-9);

    let vx: Vec<f64> = stats.all_vx().iter().map(|(_, v)| v).collect();
    assert!(vx.windows(2).all(|w| w[1] <= w[0]));

    let moh: Vec<f64> = stats.all_moh().iter().map(|(_, v)| v).collect();
    assert!(moh.windows(2).all(|w| w[1] <= w[0] + 1e-9));
    assert_eq!(moh[0], stats.maximum());

    let moc: Vec<f64> = stats.all_moc().iter().map(|(_, v)| v).collect();
    assert!(moc.windows(2).all(|w| w[1] + 1e-9 >= w[0]));
    assert_eq!(moc[0], stats.minimum());

    let dx: Vec<f64> = stats.all_dx().iter().map(|(_, v)| v).collect();
    assert!(dx.windows(2).all(|w| w[1] <= w[0]));
}

#[test]
fn test_relative_queries() {
    let mask = square_mask();
    let config = StatisticsConfig {
        reference_dose: Some(4.0),
        dose_thresholds: relative(&[0.5]),
        ..StatisticsConfig::complex()
    };
    let stats = calculate(&mask, gradient_dose_x(mask.grid(), 0.0, 1.0), &config);

    assert_eq!(stats.reference_dose(), 4.0);
    // 0.5 * 4 Gy = 2 Gy, every voxel receives at least 2 Gy.
    assert_approx_eq!(stats.vx_relative(0.5).unwrap(), 36.0, 1e-9);
    assert_err_kind!(stats.vx_relative(1.5), ErrorKind::InvalidParameter);
    assert_err_kind!(stats.vx_relative(-0.1), ErrorKind::InvalidParameter);
    assert_err_kind!(stats.dx_relative(2.0), ErrorKind::InvalidParameter);
    assert_err_kind!(stats.max_oh_relative(1.01), ErrorKind::InvalidParameter);
    assert_eq!(stats.vx_relative_nearest(0.6).unwrap().key, 2.0);
}

#[test]
fn test_relative_vx_without_positive_reference() {
    let mask = square_mask();
    let stats = calculate(&mask, uniform_dose(mask.grid(), 0.0), &StatisticsConfig::complex());
    assert_eq!(stats.reference_dose(), 0.0);
    assert_err_kind!(stats.vx_relative(0.5), ErrorKind::InvalidParameter);
}

#[test]
fn test_non_positive_reference_dose_falls_back_to_maximum() {
    let mask = square_mask();
    for reference in [0.0, -1.0] {
        let config = StatisticsConfig {
            reference_dose: Some(reference),
            dose_thresholds: relative(&[0.5]),
            ..StatisticsConfig::complex()
        };
        let stats = calculate(&mask, gradient_dose_x(mask.grid(), 0.0, 1.0), &config);

        assert_eq!(stats.maximum(), 7.0);
        assert_eq!(stats.reference_dose(), stats.maximum());
        assert_eq!(stats.all_vx().keys().collect::<Vec<_>>(), vec![3.5]);
    }
}

#[test]
fn test_default_reference_dose_scales_vx_keys() {
    let mask = square_mask();
    let config = StatisticsConfig {
        reference_dose: None,
        dose_thresholds: relative(&[0.5, 1.0]),
        ..StatisticsConfig::complex()
    };
    let stats = calculate(&mask, gradient_dose_x(mask.grid(), 0.0, 1.0), &config);

    assert_eq!(stats.reference_dose(), 7.0);
    assert_eq!(stats.all_vx().keys().collect::<Vec<_>>(), vec![3.5, 7.0]);
    // Columns at 4, 5, 6 and 7 Gy reach 3.5 Gy; only the 7 Gy column reaches 7 Gy.
    assert_approx_eq!(stats.vx(3.5).unwrap(), 24.0, 1e-9);
    assert_approx_eq!(stats.vx_relative(1.0).unwrap(), 6.0, 1e-9);
}

#[test]
fn test_measures_unavailable_without_complex_mode() {
    let mask = square_mask();
    let stats = calculate(&mask, uniform_dose(mask.grid(), 2.0), &StatisticsConfig::default());
    for measure in Measure::ALL {
        assert!(stats.store(measure).is_empty());
        assert_err_kind!(stats.query(measure, 1.0, true), ErrorKind::DataUnavailable);
    }
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn test_empty_mask() {
    let grid = grids::grid_10x10x1();
    let mask = PartialVolumeMask::empty(grid.clone());
    let dose = DoseGrid::uniform(grid, 1.0);
    let result = DoseStatisticsCalculator::new(&mask, &dose)
        .unwrap()
        .calculate(&StatisticsConfig::default());
    assert_err_kind!(result, ErrorKind::DataUnavailable);
}

#[test]
fn test_grid_mismatch() {
    let mask = square_mask();
    let dose = DoseGrid::uniform(grids::cube_grid(10, 10, 2), 1.0);
    assert_err_kind!(
        DoseStatisticsCalculator::new(&mask, &dose),
        ErrorKind::StructuralValidity
    );
}

#[test]
fn test_invalid_config() {
    let mask = square_mask();
    let dose = DoseGrid::uniform(mask.grid().clone(), 1.0);
    let config = StatisticsConfig {
        volume_thresholds: relative(&[1.5]),
        ..StatisticsConfig::complex()
    };
    let result = DoseStatisticsCalculator::new(&mask, &dose)
        .unwrap()
        .calculate(&config);
    assert_err_kind!(result, ErrorKind::Config);
}

#[test]
fn test_pipeline_propagates_strict_failure() {
    let grid = grids::grid_10x10x1();
    let dose = DoseGrid::uniform(grid, 1.0);
    let result = evaluate_structure(
        &structures::overlapping_squares(),
        &dose,
        &VoxelizerConfig::default(),
        &StatisticsConfig::default(),
    );
    assert_err_kind!(result, ErrorKind::StructuralValidity);

    let (mask, stats) = evaluate_structure(
        &structures::overlapping_squares(),
        &dose,
        &VoxelizerConfig::lenient(),
        &StatisticsConfig::default(),
    )
    .unwrap();
    assert_eq!(mask.len(), 28);
    assert_approx_eq!(stats.volume(), 28.0, 1e-9);
}

#[test]
fn test_statistics_serialize() {
    let mask = square_mask();
    let stats = calculate(&mask, uniform_dose(mask.grid(), 2.0), &StatisticsConfig::complex());
    let json = serde_json::to_string(&stats).unwrap();
    let back: DoseStatistics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}
