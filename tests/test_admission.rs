use gaste::config::{AnalysisConfig, ConfigIO};
use gaste::{Alternative, GasteError, Method, StratifiedTable2x2};
use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const ROWS: [&str; 2] = ["Admitted", "Rejected"];
const COLUMNS: [&str; 2] = ["Men", "Women"];

fn read_admission() -> Result<(Vec<[[u64; 2]; 2]>, Vec<String>), Box<dyn Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/admission.csv");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(File::open(path)?));
    let mut tables = Vec::new();
    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record?;
        let c: Vec<u64> = (1..5).map(|i| record[i].parse::<u64>()).collect::<Result<_, _>>()?;
        tables.push([[c[0], c[1]], [c[2], c[3]]]);
        labels.push(format!("Department {}", &record[0]));
    }
    Ok((tables, labels))
}

fn admission(config: AnalysisConfig) -> StratifiedTable2x2 {
    let (tables, labels) = read_admission().unwrap();
    StratifiedTable2x2::with_config(&tables, &labels, ROWS, COLUMNS, config).unwrap()
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[test]
fn test_admission_asymptotic() {
    let table = admission(AnalysisConfig::default());
    let cmh = table.cmh_test().unwrap();
    assert_eq!(round3(cmh.statistic), 1.525);
    assert_eq!(round3(cmh.pvalue), 0.217);
    assert_eq!(cmh.df, 1);

    let bd = table.bd_test().unwrap();
    assert_eq!(round3(bd.statistic), 18.826);
    assert_eq!(round3(bd.pvalue), 0.002);
    assert_eq!(bd.df, 5);
}

#[test]
fn test_admission_corrections_from_config() {
    let config = AnalysisConfig::from_json(r#"{"cmh_correction": true, "tarone_adjustment": true}"#).unwrap();
    let table = admission(config);
    let cmh = table.cmh_test().unwrap();
    assert!((cmh.statistic - 1.4269462285866883).abs() < 1e-6);
    assert!((cmh.pvalue - 0.23226346281704818).abs() < 1e-6);
    let bd = table.bd_test().unwrap();
    assert!((bd.statistic - 18.82550125205272).abs() < 1e-4);
}

#[test]
fn test_admission_stratified_exact() {
    let table = admission(AnalysisConfig::default());
    assert_eq!(table.nb_combination(), 317629);

    let less = table.gaste(Alternative::Less).unwrap();
    assert_eq!(less.method, Method::Exact);
    assert_eq!(less.nb_combination, 317629);
    assert!((less.pvalue - 0.11599366896021966).abs() < 1e-8);

    let greater = table.gaste(Alternative::Greater).unwrap();
    assert!((greater.pvalue - 0.8990078387625202).abs() < 1e-8);
    assert!(less.pvalue + greater.pvalue >= 1.0);

    let two_sided = table.gaste(Alternative::TwoSided).unwrap();
    assert!((two_sided.pvalue - 2.0 * less.pvalue).abs() < 1e-12);

    let approx = table.gaste_with_limit(Alternative::Less, 317628).unwrap();
    assert_eq!(approx.method, Method::GammaApprox);
    assert!((approx.pvalue - 0.1151471259092095).abs() < 1e-6);

    let at_limit = table.gaste_with_limit(Alternative::Less, 317629).unwrap();
    assert_eq!(at_limit.method, Method::Exact);
}

#[test]
fn test_admission_alternative_from_str() {
    let table = admission(AnalysisConfig::default());
    let alternative: Alternative = "greater".parse().unwrap();
    assert_eq!(table.gaste(alternative).unwrap().statistic, 1198);
    assert!(matches!(
        "bigger".parse::<Alternative>(),
        Err(GasteError::InvalidAlternative(..))
    ));
}

#[test]
fn test_admission_resume() {
    let table = admission(AnalysisConfig::default());
    let resume = table.resume();
    let first = resume.find("Department A").unwrap();
    let last = resume.find("Department F").unwrap();
    assert!(first < last);
    assert!(resume.contains("317629"));
    assert!(resume.contains("Admitted") && resume.contains("Women"));
}
