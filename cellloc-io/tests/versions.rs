use std::path::PathBuf;

use cellloc_core::document::{CoordinateUnits, Document, MarkupType, RepresentationType};
use cellloc_core::geometry::Point3;
use cellloc_io::{
    AnnotationFacade, ConvertError, DocumentLoader, DocumentSaver, RegistryError, VersionRegistry,
    read_json,
};
use serde_json::{Value, json};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

fn load_fixture(name: &str) -> Value {
    read_json(&fixture(name)).expect("读取测试数据失败")
}

const FIXTURES: [(&str, &str); 7] = [
    ("v2019_01_26.json", "v0.0.0+2019.01.26"),
    ("v2020_04_16.json", "v0.0.0+2020.04.16"),
    ("v2020_08_26.json", "v0.0.0+2020.08.26"),
    ("v2020_09_18.json", "v0.1.0+2020.09.18"),
    ("v2021_06_11.json", "v0.1.1+2021.06.11"),
    ("v2021_08_12.json", "v0.2.0+2021.08.12"),
    ("v2022_03_04.json", "v0.2.1+2022.03.04"),
];

#[test]
fn every_version_round_trips_through_the_model() {
    let registry = VersionRegistry::new().unwrap();
    for (name, version) in FIXTURES {
        let converter = registry.converter(version).expect("版本已注册");
        let data = load_fixture(name);
        let document = converter
            .normalize(&data)
            .unwrap_or_else(|err| panic!("{name} 无法以 {version} 解析：{err}"));
        let written = converter.specialize(&document).unwrap();
        let again = converter.normalize(&written).unwrap();
        assert_eq!(again, document, "{name} 往返后文档发生变化");
    }
}

#[test]
fn inference_prefers_the_newest_accepting_version() {
    let registry = VersionRegistry::new().unwrap();
    let expected = [
        ("v2019_01_26.json", "v0.0.0+2019.01.26"),
        ("v2020_04_16.json", "v0.0.0+2020.04.16"),
        ("v2020_08_26.json", "v0.0.0+2020.08.26"),
        // 以下格式都能被最新版本接受。
        ("v2020_09_18.json", "v0.2.1+2022.03.04"),
        ("v2021_06_11.json", "v0.2.1+2022.03.04"),
        ("v2021_08_12.json", "v0.2.1+2022.03.04"),
        ("v2022_03_04.json", "v0.2.1+2022.03.04"),
    ];
    for (name, version) in expected {
        let (inferred, _) = registry.infer_normalize(&load_fixture(name)).unwrap();
        assert_eq!(inferred, version, "{name}");
    }
}

#[test]
fn inferred_document_matches_explicit_version() {
    let registry = VersionRegistry::new().unwrap();
    let data = load_fixture("v2021_08_12.json");
    let (_, inferred) = registry.infer_normalize(&data).unwrap();
    let (_, explicit) = registry.normalize_as("0.2.0", &data).unwrap();
    assert_eq!(inferred, explicit);
    assert_eq!(explicit.annotations[0].coordinate_units, CoordinateUnits::Millimeter);
}

#[test]
fn legacy_points_are_converted_from_ras() {
    let registry = VersionRegistry::new().unwrap();
    let (_, document) = registry
        .normalize_as("d2019", &load_fixture("v2019_01_26.json"))
        .unwrap();
    assert_eq!(document.annotations.len(), 2);
    assert_eq!(
        document.annotations[0].points[0].position(),
        Point3::new(-1.0, -2.0, 3.0)
    );
    assert_eq!(document.current_id, 0);
    assert_eq!(document.step_size, 25.0);
    assert_eq!(
        document.annotations[1].representation_type,
        RepresentationType::Polyline
    );
}

#[test]
fn legacy_and_nested_fixtures_describe_the_same_geometry() {
    let registry = VersionRegistry::new().unwrap();
    let (_, legacy) = registry
        .normalize_as("d2019", &load_fixture("v2019_01_26.json"))
        .unwrap();
    let (_, nested) = registry
        .normalize_as("d2020.08", &load_fixture("v2020_08_26.json"))
        .unwrap();
    for (a, b) in legacy.annotations.iter().zip(&nested.annotations) {
        let left: Vec<Point3> = a.positions().collect();
        let right: Vec<Point3> = b.positions().collect();
        assert_eq!(left, right);
    }
}

#[test]
fn conversion_through_latest_and_back_is_lossless() {
    let registry = VersionRegistry::new().unwrap();
    let (_, original) = registry
        .normalize_as("d2019", &load_fixture("v2019_01_26.json"))
        .unwrap();

    let (latest, upgraded) = registry.specialize_as("", &original).unwrap();
    assert_eq!(latest, "v0.2.1+2022.03.04");
    assert_eq!(upgraded["version"], json!("0.2.1+2022.03.04"));
    assert_eq!(upgraded["currentId"], json!(0));

    let (_, reread) = registry.normalize_as("", &upgraded).unwrap();
    assert_eq!(reread, original);

    let (_, downgraded) = registry.specialize_as("d2019", &reread).unwrap();
    assert!(downgraded.get("version").is_none());
    let (_, back) = registry.normalize_as("d2019", &downgraded).unwrap();
    assert_eq!(back, original);
}

#[test]
fn structures_survive_only_where_the_format_has_them() {
    let registry = VersionRegistry::new().unwrap();
    let (_, document) = registry
        .normalize_as("", &load_fixture("v2022_03_04.json"))
        .unwrap();
    let curve = &document.annotations[0];
    assert_eq!(curve.points[0].structure().map(|s| s.acronym.as_str()), Some("VISp"));
    assert!(curve.points[1].structure().is_none());

    let (_, old) = registry.specialize_as("0.1.0", &document).unwrap();
    assert!(old["markups"][0]["markup"]["controlPoints"][0].get("structure").is_none());

    let (_, omitting) = registry.specialize_as("0.1.1", &document).unwrap();
    let points = &omitting["markups"][0]["markup"]["controlPoints"];
    assert_eq!(points[0]["structure"]["acronym"], json!("VISp"));
    assert!(points[1].get("structure").is_none());
}

#[test]
fn fiducials_cannot_be_downgraded_to_flat_formats() {
    let registry = VersionRegistry::new().unwrap();
    let (_, document) = registry
        .normalize_as("", &load_fixture("v2022_03_04.json"))
        .unwrap();
    assert_eq!(document.annotations[2].markup_type, MarkupType::Fiducial);

    let err = registry.specialize_as("d2020.04", &document).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Convert {
            source: ConvertError::Unsupported { .. },
            ..
        }
    ));
}

#[test]
fn non_mismatch_errors_abort_inference() {
    let registry = VersionRegistry::new().unwrap();
    let mut data = load_fixture("v2022_03_04.json");
    data["referenceView"] = json!("Oblique");
    let err = registry.infer_normalize(&data).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Convert {
            version: "v0.2.1+2022.03.04",
            source: ConvertError::InvalidValue { .. },
        }
    ));
}

#[test]
fn unrecognized_documents_have_no_converter() {
    let registry = VersionRegistry::new().unwrap();
    let err = registry
        .infer_normalize(&json!({"something": "else"}))
        .unwrap_err();
    assert!(matches!(err, RegistryError::NoConverter));
}

#[test]
fn facade_saves_and_loads_files() {
    let registry = VersionRegistry::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("converted/annotation.json");

    let reader = AnnotationFacade::new(&registry).with_source(Some("0.1.0".to_string()));
    let (version, document): (_, Document) = reader.load(&fixture("v2020_09_18.json")).unwrap();
    assert_eq!(version, "v0.1.0+2020.09.18");

    let writer = AnnotationFacade::new(&registry).with_target("0.1.0");
    writer.save(&document, &output).unwrap();

    let written = read_json(&output).unwrap();
    assert_eq!(written["version"], json!("0.1.0+2020.09.18"));
    assert_eq!(reader.load(&output).unwrap(), ("v0.1.0+2020.09.18", document));
}
