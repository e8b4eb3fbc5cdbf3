use tempfile::TempDir;

use rf_tools::config::{
    BaseSet, CombineConfig, ConfigError, NormConfig, NormMethod, PeakConfig, Scoring, Window,
};

#[test]
fn scoring_dependent_window_defaults() {
    let config = NormConfig::new(Scoring::Ding, NormMethod::TwoEight);
    assert_eq!(config.window, Window::Transcript);
    assert_eq!(config.offset, Window::Transcript);

    let config = NormConfig::new(Scoring::Rouskin, NormMethod::Winsor90);
    assert_eq!(config.window, Window::Bases(50));
    assert_eq!(config.offset, Window::Bases(50));

    let config = NormConfig::new(Scoring::Zubradt, NormMethod::BoxPlot);
    assert_eq!(config.window, Window::Bases(50));
}

#[test]
fn methods_parse_by_code_or_name() {
    assert_eq!(Scoring::from_value("1").unwrap(), Scoring::Ding);
    assert_eq!(Scoring::from_value("Siegfried").unwrap(), Scoring::Siegfried);
    assert!(Scoring::from_value("5").is_err());
    assert_eq!(NormMethod::from_value("2").unwrap(), NormMethod::Winsor90);
    assert_eq!(NormMethod::from_value("Box-plot").unwrap(), NormMethod::BoxPlot);
    assert!(NormMethod::from_value("0").is_err());
}

#[test]
fn validation_rejects_bad_parameters() {
    let mut config = NormConfig::new(Scoring::Rouskin, NormMethod::Winsor90);
    config.window = Window::Bases(2);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::WindowTooSmall(2))
    ));

    let mut config = NormConfig::new(Scoring::Rouskin, NormMethod::Winsor90);
    config.offset = Window::Bases(0);
    assert!(matches!(config.validate(), Err(ConfigError::BadOffset(0))));

    // a stride wider than the window is a sparse but legal tiling
    let mut config = NormConfig::new(Scoring::Rouskin, NormMethod::Winsor90);
    config.window = Window::Bases(10);
    config.offset = Window::Bases(11);
    assert!(config.validate().is_ok());

    let mut config = NormConfig::new(Scoring::Ding, NormMethod::TwoEight);
    config.pseudocount = 0.0;
    assert!(config.validate().is_err());

    let mut config = NormConfig::new(Scoring::Ding, NormMethod::TwoEight);
    config.raw = true;
    config.remap = true;
    assert!(matches!(config.validate(), Err(ConfigError::RawRemap)));
}

#[test]
fn config_file_roundtrip_is_lossless() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("norm.conf");

    let mut config = NormConfig::new(Scoring::Siegfried, NormMethod::BoxPlot);
    config.window = Window::Bases(600);
    config.offset = Window::Bases(200);
    config.reactive = BaseSet::parse("AC").unwrap();
    config.independent = true;
    config.pseudocount = 0.5;
    config.max_score = 7.25;
    config.mean_coverage = 15.0;
    config.median_coverage = 5.0;
    config.nan_threshold = 20;
    config.max_untreated_mut = 0.02;
    config.to_file(&path).unwrap();

    let loaded = NormConfig::from_file(&path).unwrap();
    assert_eq!(loaded.scoring, config.scoring);
    assert_eq!(loaded.norm, config.norm);
    assert_eq!(loaded.window, config.window);
    assert_eq!(loaded.offset, config.offset);
    assert_eq!(loaded.reactive, config.reactive);
    assert_eq!(loaded.independent, config.independent);
    assert_eq!(loaded.pseudocount, config.pseudocount);
    assert_eq!(loaded.max_score, config.max_score);
    assert_eq!(loaded.mean_coverage, config.mean_coverage);
    assert_eq!(loaded.median_coverage, config.median_coverage);
    assert_eq!(loaded.nan_threshold, config.nan_threshold);
    assert_eq!(loaded.remap, config.remap);
    assert_eq!(loaded.max_untreated_mut, config.max_untreated_mut);
    assert_eq!(loaded.raw, config.raw);
}

#[test]
fn config_file_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("norm.conf");

    std::fs::write(&path, "scoring=Ding\nnot a pair\n").unwrap();
    assert!(NormConfig::from_file(&path).is_err());

    std::fs::write(&path, "scoring=Ding\nmystery-option=1\n").unwrap();
    assert!(NormConfig::from_file(&path).is_err());

    std::fs::write(&path, "pseudocount=banana\n").unwrap();
    assert!(NormConfig::from_file(&path).is_err());

    // comments and blank lines are fine
    std::fs::write(&path, "# a comment\n\nscoring=Rouskin\n").unwrap();
    let loaded = NormConfig::from_file(&path).unwrap();
    assert_eq!(loaded.scoring, Scoring::Rouskin);
    assert_eq!(loaded.window, Window::Bases(50));
}

#[test]
fn base_set_canonical_form() {
    assert_eq!(BaseSet::parse("N").unwrap().spec(), "N");
    assert_eq!(BaseSet::parse("acgt").unwrap().spec(), "N");
    assert_eq!(BaseSet::parse("ca").unwrap().spec(), "AC");
    assert_eq!(BaseSet::parse("AU").unwrap().spec(), "AT");
    assert!(BaseSet::parse("").is_err());
    assert!(BaseSet::parse("AX").is_err());

    let set = BaseSet::parse("GU").unwrap();
    assert!(set.is_reactive('G'));
    assert!(set.is_reactive('T'));
    assert!(set.is_reactive('U'));
    assert!(!set.is_reactive('A'));
    assert!(!set.is_reactive('N'));
}

#[test]
fn base_set_classes_and_union() {
    let set = BaseSet::parse("AC").unwrap();
    let classes = set.classes(true);
    assert_eq!(classes.len(), 2);
    assert!(classes[0].is_reactive('A') && !classes[0].is_reactive('C'));
    assert_eq!(set.classes(false).len(), 1);

    let other = BaseSet::parse("GT").unwrap();
    assert_eq!(set.union(&other).spec(), "N");
}

#[test]
fn peak_config_validation() {
    let config = PeakConfig::new(150, None);
    assert_eq!(config.offset, 75);
    config.validate().unwrap();

    let config = PeakConfig::new(9, None);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PeakWindowTooSmall(9))
    ));

    // a stride wider than the window is a sparse but legal tiling
    let config = PeakConfig::new(100, Some(101));
    assert!(config.validate().is_ok());

    let mut config = PeakConfig::new(100, Some(0));
    assert!(matches!(config.validate(), Err(ConfigError::BadOffset(0))));
    config.offset = 50;
    config.pvalue = 0.0;
    assert!(matches!(config.validate(), Err(ConfigError::BadPvalue(_))));
}

#[test]
fn combine_config_validation() {
    CombineConfig::new(3, false).validate().unwrap();
    assert!(CombineConfig::new(0, false).validate().is_err());
    assert!(CombineConfig::new(11, true).validate().is_err());
}
