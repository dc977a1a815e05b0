use sgoop::config::{RunMode, SgoopConfig};
use sgoop::parser::{parse_input, write_template};
use std::fs;
use std::path::Path;

#[test]
fn test_parse_run_file() {
    let input = r#"
# two-CV optimization run
colvar = traj.colvar
cv_cols = 1, 2
rc0 = 0.7, 0.7
mode = optimize
rc_bins = 10
wells = 2
niter = 25
seed = 11
"#;
    let path = Path::new("test_run_basic.in");
    fs::write(path, input).unwrap();

    let spec = parse_input(path).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(spec.mode, RunMode::Optimize);
    assert_eq!(spec.colvar, Path::new("traj.colvar"));
    assert_eq!(spec.config.cv_cols, vec![1, 2]);
    assert_eq!(spec.rc0, vec![0.7, 0.7]);
    assert_eq!(spec.config.rc_bins, 10);
    assert_eq!(spec.hopping.niter, 25);
    assert_eq!(spec.hopping.seed, Some(11));
}

#[test]
fn test_template_round_trip() {
    let path = Path::new("test_template_round_trip.in");
    write_template(path).unwrap();

    let spec = parse_input(path).unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(spec.mode, RunMode::Evaluate);
    assert_eq!(spec.colvar, Path::new("COLVAR"));
    assert_eq!(spec.config.cv_cols, vec![1, 2]);
    assert_eq!(spec.rc0, vec![1.0, 0.0]);

    // the template carries the library defaults
    let defaults = SgoopConfig::default();
    assert_eq!(spec.config.rc_bins, defaults.rc_bins);
    assert_eq!(spec.config.wells, defaults.wells);
    assert_eq!(spec.config.d, defaults.d);
    assert_eq!(spec.config.kde, defaults.kde);
    assert_eq!(spec.config.bandwidth, defaults.bandwidth);
    assert_eq!(spec.config.kt, defaults.kt);
    assert!(spec.config.v_minus_c_col.is_none());
    assert!(spec.config.diffusivity.is_none());
    assert!(spec.maxcal.is_none());
}

#[test]
fn test_missing_input_file() {
    assert!(parse_input(Path::new("test_no_such_run.in")).is_err());
}

#[test]
fn test_rejects_malformed_run_file() {
    let path = Path::new("test_run_malformed.in");
    fs::write(
        path,
        "colvar = a.colvar\ncv_cols = 1\nrc0 = 1.0\nwells = two\n",
    )
    .unwrap();

    let result = parse_input(path);
    fs::remove_file(path).unwrap();
    assert!(result.is_err());
}
