use sgoop::config::{HoppingParams, SgoopConfig};
use sgoop::evaluate::{unit_coefficients, EvalContext};
use sgoop::io::read_colvar;
use sgoop::optimizer::{optimize_rc, LogObserver};
use std::fs;
use std::path::Path;

/// Deterministic two-state trajectory: cv1 hops between basins at 0 and
/// 4 with in-basin jitter, cv2 is decorrelated small-amplitude noise.
fn two_state_rows() -> Vec<(f64, f64, f64)> {
    let jitter = [0.00, 0.07, -0.05, 0.11, -0.09, 0.04, -0.02, 0.08];
    let noise = [0.03, -0.06, 0.01, 0.05, -0.04, 0.02, -0.01, 0.06];
    let mut rows = Vec::new();
    let mut t = 0.0;
    for block in 0..6 {
        let center = if block % 2 == 0 { 0.0 } else { 4.0 };
        for k in 0..8 {
            rows.push((t, center + jitter[k], noise[(k + block) % 8]));
            t += 0.5;
        }
    }
    rows
}

fn write_two_state_colvar(path: &Path) {
    let mut content = String::from("#! FIELDS time cv1 cv2\n");
    for (t, a, b) in two_state_rows() {
        content.push_str(&format!("{t:.1} {a:.4} {b:.4}\n"));
    }
    fs::write(path, content).unwrap();
}

fn scoring_config() -> SgoopConfig {
    SgoopConfig {
        rc_bins: 8,
        wells: 2,
        d: 1,
        kde: true,
        bandwidth: 0.8,
        cv_cols: vec![1, 2],
        ..Default::default()
    }
}

#[test]
fn test_colvar_to_spectral_gap() {
    let path = Path::new("test_pipeline_eval.colvar");
    write_two_state_colvar(path);

    let colvar = read_colvar(path).unwrap();
    fs::remove_file(path).unwrap();

    let context = EvalContext::new(&colvar.trajectory, &scoring_config()).unwrap();
    let score = context.evaluate(&[1.0, 0.0]).unwrap();

    assert_eq!(score.eigenvalues.len(), 8);
    assert!(score.eigenvalues[0].abs() < 1e-8, "{}", score.eigenvalues[0]);
    assert!(score.spectral_gap.is_finite());
    assert!(score.spectral_gap > 0.0, "{}", score.spectral_gap);
}

#[test]
fn test_state_hopping_cv_outscores_noise() {
    let path = Path::new("test_pipeline_compare.colvar");
    write_two_state_colvar(path);

    let colvar = read_colvar(path).unwrap();
    fs::remove_file(path).unwrap();

    let context = EvalContext::new(&colvar.trajectory, &scoring_config()).unwrap();
    let signal = context.evaluate(&[1.0, 0.0]).unwrap().spectral_gap;
    let noise = context.evaluate(&[0.0, 1.0]).unwrap().spectral_gap;
    assert!(
        signal > noise,
        "signal gap {signal} should beat noise gap {noise}"
    );
}

#[test]
fn test_optimize_run_and_save() {
    let colvar_path = Path::new("test_pipeline_optimize.colvar");
    write_two_state_colvar(colvar_path);

    let colvar = read_colvar(colvar_path).unwrap();
    fs::remove_file(colvar_path).unwrap();

    let context = EvalContext::new(&colvar.trajectory, &scoring_config()).unwrap();
    let initial = [0.2, 0.9];
    let start_gap = context
        .evaluate(&unit_coefficients(&initial))
        .unwrap()
        .spectral_gap;

    let params = HoppingParams {
        niter: 8,
        seed: Some(5),
        ..Default::default()
    };
    let mut observer = LogObserver;
    let result = optimize_rc(&context, &initial, &params, &mut observer).unwrap();

    assert_eq!(result.trace.len(), 8);
    assert!(
        result.spectral_gap >= start_gap - 1e-12,
        "{} vs {start_gap}",
        result.spectral_gap
    );

    let json_path = Path::new("test_pipeline_result.json");
    result.save(json_path).unwrap();
    let saved = fs::read_to_string(json_path).unwrap();
    fs::remove_file(json_path).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert!(parsed["spectral_gap"].is_number());
    assert_eq!(parsed["coefficients"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["trace"].as_array().unwrap().len(), 8);
}

#[test]
fn test_biased_run_with_diffusivity() {
    let path = Path::new("test_pipeline_biased.colvar");
    let mut content = String::from("#! FIELDS time cv1 cv2 bias\n");
    for (t, a, b) in two_state_rows() {
        content.push_str(&format!("{t:.1} {a:.4} {b:.4} {:.4}\n", 0.3 * a));
    }
    fs::write(path, content).unwrap();

    let colvar = read_colvar(path).unwrap();
    fs::remove_file(path).unwrap();

    let config = SgoopConfig {
        v_minus_c_col: Some(3),
        diffusivity: Some(1.0),
        ..scoring_config()
    };
    let context = EvalContext::new(&colvar.trajectory, &config).unwrap();
    let score = context.evaluate(&[1.0, 0.0]).unwrap();
    assert!(score.spectral_gap.is_finite());
    assert!(score.spectral_gap > 0.0, "{}", score.spectral_gap);
}

#[test]
fn test_companion_dynamics_table() {
    let density_path = Path::new("test_pipeline_density.colvar");
    let dynamics_path = Path::new("test_pipeline_dynamics.colvar");
    let mut content = String::from("#! FIELDS time cv1 cv2 bias\n");
    for (t, a, b) in two_state_rows() {
        content.push_str(&format!("{t:.1} {a:.4} {b:.4} {:.4}\n", 0.3 * a));
    }
    fs::write(density_path, content).unwrap();
    write_two_state_colvar(dynamics_path);

    let density = read_colvar(density_path).unwrap();
    let dynamics = read_colvar(dynamics_path).unwrap();
    fs::remove_file(density_path).unwrap();
    fs::remove_file(dynamics_path).unwrap();

    let config = SgoopConfig {
        v_minus_c_col: Some(3),
        ..scoring_config()
    };
    let context =
        EvalContext::with_dynamics(&density.trajectory, &dynamics.trajectory, &config).unwrap();
    let score = context.evaluate(&[1.0, 0.0]).unwrap();
    assert!(score.spectral_gap.is_finite());
    assert!(score.spectral_gap > 0.0, "{}", score.spectral_gap);
}
