//! 2020.08.26 起的嵌套格式：`markups[].markup.controlPoints[]`（Slicer Markups JSON）。
//!
//! 各版本之间的差异由 [`Flavor`] 描述，读写逻辑共用。

use cellloc_core::document::{
    Annotation, CoordinateSystem, CoordinateUnits, Document, MarkupType, Ontology, Point,
    ReferenceView, RepresentationType, Structure,
};
use cellloc_core::geometry::Point3;
use serde_json::{Map, Value, json};

use super::{ConvertError, Converter, fields, lps_position, version_stamp};

/// 控制点 `structure` 字段的写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StructureStyle {
    /// 格式中没有该字段。
    Absent,
    /// 只在有值时写出。
    OmitWhenEmpty,
    /// 总是写出，没有值时为 `null`。
    NullWhenEmpty,
}

#[derive(Debug, Clone, Copy)]
struct Flavor {
    version: &'static str,
    /// 是否带 `name` 字段；否则按序号生成名称。
    named: bool,
    /// `representationType`/`thickness` 只对闭合曲线存在。
    typed_fields: bool,
    /// 读取时 `coordinateUnits` 是否必需。
    units_required: bool,
    /// 写出旧版界面需要的显示属性与控制点元数据。
    legacy_display: bool,
    structure: StructureStyle,
}

const V2020_08_26: Flavor = Flavor {
    version: "v0.0.0+2020.08.26",
    named: false,
    typed_fields: false,
    units_required: false,
    legacy_display: true,
    structure: StructureStyle::Absent,
};

const V2020_09_18: Flavor = Flavor {
    version: "v0.1.0+2020.09.18",
    named: true,
    typed_fields: false,
    units_required: false,
    legacy_display: false,
    structure: StructureStyle::Absent,
};

const V2021_06_11: Flavor = Flavor {
    version: "v0.1.1+2021.06.11",
    named: true,
    typed_fields: true,
    units_required: false,
    legacy_display: false,
    structure: StructureStyle::OmitWhenEmpty,
};

const V2021_08_12: Flavor = Flavor {
    version: "v0.2.0+2021.08.12",
    named: true,
    typed_fields: true,
    units_required: true,
    legacy_display: false,
    structure: StructureStyle::NullWhenEmpty,
};

const V2022_03_04: Flavor = Flavor {
    version: "v0.2.1+2022.03.04",
    named: true,
    typed_fields: true,
    units_required: false,
    legacy_display: false,
    structure: StructureStyle::NullWhenEmpty,
};

macro_rules! markups_converter {
    ($(#[$meta:meta])* $name:ident, $flavor:expr) => {
        $(#[$meta])*
        pub struct $name;

        impl Converter for $name {
            fn version(&self) -> &'static str {
                $flavor.version
            }

            fn normalize(&self, data: &Value) -> Result<Document, ConvertError> {
                normalize(data, $flavor)
            }

            fn specialize(&self, document: &Document) -> Result<Value, ConvertError> {
                specialize(document, $flavor)
            }
        }
    };
}

markups_converter!(
    /// 首个嵌套格式，没有标注名称。
    MarkupsV20200826,
    V2020_08_26
);
markups_converter!(
    /// 增加 `name`。
    MarkupsV20200918,
    V2020_09_18
);
markups_converter!(
    /// 增加点标注与控制点结构引用。
    MarkupsV20210611,
    V2021_06_11
);
markups_converter!(
    /// 要求 `coordinateUnits`（MNI 图谱使用毫米）。
    MarkupsV20210812,
    V2021_08_12
);
markups_converter!(MarkupsV20220304, V2022_03_04);

/// 控制点在 Slicer 中的默认朝向（绕 z 旋转 180°）。
const CONTROL_POINT_ORIENTATION: [f64; 9] = [-1.0, -0.0, -0.0, -0.0, -1.0, -0.0, 0.0, 0.0, 1.0];

fn normalize(data: &Value, flavor: Flavor) -> Result<Document, ConvertError> {
    let mut document = Document {
        current_id: fields::index(data, "currentId")?,
        reference_view: fields::enumeration(
            data,
            "referenceView",
            "reference view",
            ReferenceView::parse,
        )?,
        ontology: fields::enumeration(data, "ontology", "ontology", Ontology::parse)?,
        step_size: fields::number(data, "stepSize")?,
        camera_position: fields::floats(data, "cameraPosition")?,
        camera_view_up: fields::floats(data, "cameraViewUp")?,
        annotations: Vec::new(),
    };

    for (index, entry) in fields::array(data, "markups")?.iter().enumerate() {
        document
            .annotations
            .push(normalize_annotation(entry, index, flavor)?);
    }

    if document.validate().is_err() {
        return Err(ConvertError::mismatch("currentId"));
    }
    Ok(document)
}

fn normalize_annotation(entry: &Value, index: usize, flavor: Flavor) -> Result<Annotation, ConvertError> {
    let markup = fields::field(entry, "markup")?;
    let mut annotation = Annotation {
        name: if flavor.named {
            fields::string(entry, "name")?.to_string()
        } else {
            format!("Annotation {}", index + 1)
        },
        orientation: fields::floats(entry, "orientation")?,
        markup_type: fields::enumeration(markup, "type", "markup type", MarkupType::parse)?,
        ..Annotation::default()
    };

    if !flavor.typed_fields || annotation.is_closed_curve() {
        annotation.representation_type = fields::enumeration(
            entry,
            "representationType",
            "representation type",
            RepresentationType::parse,
        )?;
        annotation.thickness = fields::number(entry, "thickness")?;
    }

    let coordinate_system = fields::enumeration(
        markup,
        "coordinateSystem",
        "coordinate system",
        CoordinateSystem::parse,
    )?;
    annotation.coordinate_units = if flavor.units_required {
        fields::enumeration(markup, "coordinateUnits", "coordinate units", CoordinateUnits::parse)?
    } else {
        match fields::optional(markup, "coordinateUnits")? {
            Some(_) => fields::enumeration(
                markup,
                "coordinateUnits",
                "coordinate units",
                CoordinateUnits::parse,
            )?,
            None => CoordinateUnits::default(),
        }
    };

    for control_point in fields::array(markup, "controlPoints")? {
        let mut position = Point3::from(fields::floats::<3>(control_point, "position")?);
        if coordinate_system == CoordinateSystem::Ras {
            position = position.flip_xy();
        }
        let structure = match flavor.structure {
            StructureStyle::Absent => None,
            _ => normalize_structure(control_point)?,
        };
        annotation.points.push(Point::with_structure(position, structure));
    }
    annotation.coordinate_system = CoordinateSystem::Lps;

    Ok(annotation)
}

fn normalize_structure(control_point: &Value) -> Result<Option<Structure>, ConvertError> {
    let Some(structure) = fields::optional(control_point, "structure")? else {
        return Ok(None);
    };
    // 空对象与缺失等价。
    if structure.as_object().is_some_and(|object| object.is_empty()) {
        return Ok(None);
    }
    Ok(Some(Structure {
        id: fields::integer(structure, "id")?,
        acronym: fields::string(structure, "acronym")?.to_string(),
    }))
}

fn specialize(document: &Document, flavor: Flavor) -> Result<Value, ConvertError> {
    document.validate()?;

    let markups: Vec<Value> = document
        .annotations
        .iter()
        .map(|annotation| specialize_annotation(annotation, flavor))
        .collect();

    let mut data = Map::new();
    data.insert("version".into(), json!(version_stamp(flavor.version)));
    data.insert("markups".into(), Value::Array(markups));
    data.insert("currentId".into(), json!(document.current_id));
    data.insert("referenceView".into(), json!(document.reference_view.as_str()));
    data.insert("ontology".into(), json!(document.ontology.as_str()));
    data.insert("stepSize".into(), json!(document.step_size));
    data.insert("cameraPosition".into(), json!(document.camera_position));
    data.insert("cameraViewUp".into(), json!(document.camera_view_up));
    Ok(Value::Object(data))
}

fn specialize_annotation(annotation: &Annotation, flavor: Flavor) -> Value {
    let control_points: Vec<Value> = annotation
        .points
        .iter()
        .enumerate()
        .map(|(index, point)| specialize_control_point(annotation, point, index + 1, flavor))
        .collect();

    let mut markup = Map::new();
    markup.insert("type".into(), json!(annotation.markup_type.as_str()));
    markup.insert("coordinateSystem".into(), json!(CoordinateSystem::Lps.as_str()));
    if flavor.legacy_display {
        markup.insert("locked".into(), json!(false));
        markup.insert("labelFormat".into(), json!("%N-%d"));
    } else {
        markup.insert(
            "coordinateUnits".into(),
            json!(annotation.coordinate_units.as_str()),
        );
    }
    markup.insert("controlPoints".into(), Value::Array(control_points));
    if flavor.legacy_display {
        markup.insert("display".into(), legacy_display_block());
    }

    let mut entry = Map::new();
    entry.insert("markup".into(), Value::Object(markup));
    if flavor.named {
        entry.insert("name".into(), json!(annotation.name));
    }
    entry.insert("orientation".into(), json!(annotation.orientation));
    if !flavor.typed_fields || annotation.is_closed_curve() {
        entry.insert(
            "representationType".into(),
            json!(annotation.representation_type.as_str()),
        );
        entry.insert("thickness".into(), json!(annotation.thickness));
    }
    Value::Object(entry)
}

fn specialize_control_point(annotation: &Annotation, point: &Point, id: usize, flavor: Flavor) -> Value {
    let position = lps_position(annotation, point);
    let mut control_point = Map::new();
    control_point.insert("id".into(), json!(id.to_string()));
    if flavor.legacy_display {
        control_point.insert("label".into(), json!(format!("MarkupsClosedCurve-{id}")));
        control_point.insert("description".into(), json!(""));
        control_point.insert("associatedNodeID".into(), json!("vtkMRMLScalarVolumeNode1"));
    }
    control_point.insert("position".into(), json!(position.to_array()));
    control_point.insert("orientation".into(), json!(CONTROL_POINT_ORIENTATION));
    if flavor.legacy_display {
        control_point.insert("selected".into(), json!(false));
        control_point.insert("locked".into(), json!(false));
        control_point.insert("visibility".into(), json!(true));
        control_point.insert("positionStatus".into(), json!("defined"));
    }

    let structure = point
        .structure()
        .map(|structure| json!({"id": structure.id, "acronym": structure.acronym}));
    match (flavor.structure, structure) {
        (StructureStyle::Absent, _) => {}
        (StructureStyle::OmitWhenEmpty, None) => {}
        (_, Some(value)) => {
            control_point.insert("structure".into(), value);
        }
        (StructureStyle::NullWhenEmpty, None) => {
            control_point.insert("structure".into(), Value::Null);
        }
    }
    Value::Object(control_point)
}

/// 2020.08.26 版界面加载文件时要求的显示属性。
fn legacy_display_block() -> Value {
    json!({
        "visibility": true,
        "opacity": 1.0,
        "color": [0.4, 1.0, 1.0],
        "selectedColor": [1.0, 0.5, 0.5],
        "propertiesLabelVisibility": true,
        "pointLabelsVisibility": false,
        "textScale": 3.0,
        "glyphType": "Sphere3D",
        "glyphScale": 1.0,
        "glyphSize": 5.0,
        "useGlyphScale": true,
        "sliceProjection": false,
        "sliceProjectionUseFiducialColor": true,
        "sliceProjectionOutlinedBehindSlicePlane": false,
        "sliceProjectionColor": [1.0, 1.0, 1.0],
        "sliceProjectionOpacity": 0.6,
        "lineThickness": 0.2,
        "lineColorFadingStart": 1.0,
        "lineColorFadingEnd": 10.0,
        "lineColorFadingSaturation": 1.0,
        "lineColorFadingHueOffset": 0.0,
        "handlesInteractive": false,
        "snapMode": "toVisibleSurface"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orientation() -> Value {
        json!([1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0])
    }

    fn document_with(markups: Value) -> Value {
        json!({
            "markups": markups,
            "currentId": 0,
            "referenceView": "Coronal",
            "ontology": "Structure",
            "stepSize": 25.0,
            "cameraPosition": [0.0, 0.0, 1.0],
            "cameraViewUp": [0.0, 1.0, 0.0]
        })
    }

    #[test]
    fn v2020_08_synthesizes_names() {
        let data = document_with(json!([
            {
                "markup": {"type": "ClosedCurve", "coordinateSystem": "LPS", "controlPoints": []},
                "orientation": orientation(),
                "representationType": "spline",
                "thickness": 50
            },
            {
                "markup": {"type": "ClosedCurve", "coordinateSystem": "LPS", "controlPoints": []},
                "orientation": orientation(),
                "representationType": "polyline",
                "thickness": 10
            }
        ]));
        let doc = MarkupsV20200826.normalize(&data).unwrap();
        assert_eq!(doc.annotations[0].name, "Annotation 1");
        assert_eq!(doc.annotations[1].name, "Annotation 2");
        assert_eq!(doc.annotations[1].representation_type, RepresentationType::Polyline);
    }

    #[test]
    fn v2020_08_specialize_writes_legacy_display_block() {
        let mut doc = Document::new();
        doc.annotations.push(Annotation {
            points: vec![Point::new(Point3::new(1.0, 2.0, 3.0))],
            ..Annotation::default()
        });
        let out = MarkupsV20200826.specialize(&doc).unwrap();
        let markup = &out["markups"][0]["markup"];
        assert_eq!(markup["display"]["glyphType"], json!("Sphere3D"));
        assert_eq!(markup["controlPoints"][0]["label"], json!("MarkupsClosedCurve-1"));
        assert_eq!(markup["controlPoints"][0]["positionStatus"], json!("defined"));
        assert!(out["markups"][0].get("name").is_none());
        assert!(markup.get("coordinateUnits").is_none());
        assert_eq!(out["version"], json!("0.0.0+2020.08.26"));

        let current = MarkupsV20200918.specialize(&doc).unwrap();
        assert_eq!(current["markups"][0]["markup"]["coordinateUnits"], json!("um"));
    }

    #[test]
    fn fiducials_omit_curve_fields() {
        let data = document_with(json!([
            {
                "markup": {
                    "type": "Fiducial",
                    "coordinateSystem": "LPS",
                    "coordinateUnits": "mm",
                    "controlPoints": [{"id": "1", "position": [1.0, 2.0, 3.0], "structure": {"id": 385, "acronym": "VISp"}}]
                },
                "name": "Point",
                "orientation": orientation()
            }
        ]));
        let doc = MarkupsV20220304.normalize(&data).unwrap();
        let annotation = &doc.annotations[0];
        assert_eq!(annotation.markup_type, MarkupType::Fiducial);
        assert_eq!(annotation.coordinate_units, CoordinateUnits::Millimeter);
        assert_eq!(
            annotation.points[0].structure(),
            Some(&Structure {
                id: 385,
                acronym: "VISp".to_string()
            })
        );

        let out = MarkupsV20220304.specialize(&doc).unwrap();
        assert!(out["markups"][0].get("thickness").is_none());
        assert!(out["markups"][0].get("representationType").is_none());
        assert_eq!(MarkupsV20220304.normalize(&out).unwrap(), doc);

        // 2020.09.18 不区分点标注，缺少曲线字段即不匹配。
        assert!(MarkupsV20200918.normalize(&data).unwrap_err().is_schema_mismatch());
    }

    #[test]
    fn ras_control_points_are_flipped() {
        let data = document_with(json!([
            {
                "markup": {
                    "type": "ClosedCurve",
                    "coordinateSystem": "RAS",
                    "controlPoints": [{"id": "1", "position": [1.0, 2.0, 3.0]}]
                },
                "name": "A",
                "orientation": orientation(),
                "representationType": "spline",
                "thickness": 50
            }
        ]));
        let doc = MarkupsV20220304.normalize(&data).unwrap();
        assert_eq!(doc.annotations[0].points[0].position(), Point3::new(-1.0, -2.0, 3.0));
        assert_eq!(doc.annotations[0].coordinate_system, CoordinateSystem::Lps);
        let out = MarkupsV20220304.specialize(&doc).unwrap();
        assert_eq!(out["markups"][0]["markup"]["coordinateSystem"], json!("LPS"));
    }

    #[test]
    fn structure_styles_differ_between_versions() {
        let mut doc = Document::new();
        doc.annotations.push(Annotation {
            points: vec![Point::new(Point3::new(0.0, 0.0, 0.0))],
            ..Annotation::default()
        });
        let v0_1_1 = MarkupsV20210611.specialize(&doc).unwrap();
        assert!(v0_1_1["markups"][0]["markup"]["controlPoints"][0].get("structure").is_none());
        let v0_2_1 = MarkupsV20220304.specialize(&doc).unwrap();
        assert_eq!(
            v0_2_1["markups"][0]["markup"]["controlPoints"][0]["structure"],
            Value::Null
        );
    }

    #[test]
    fn v2021_08_requires_units() {
        let data = document_with(json!([
            {
                "markup": {"type": "ClosedCurve", "coordinateSystem": "LPS", "controlPoints": []},
                "name": "A",
                "orientation": orientation(),
                "representationType": "spline",
                "thickness": 50
            }
        ]));
        assert!(MarkupsV20210812.normalize(&data).unwrap_err().is_schema_mismatch());
        assert!(MarkupsV20220304.normalize(&data).is_ok());
    }

    #[test]
    fn unknown_markup_type_is_fatal() {
        let data = document_with(json!([
            {
                "markup": {"type": "Plane", "coordinateSystem": "LPS", "controlPoints": []},
                "name": "A",
                "orientation": orientation()
            }
        ]));
        let err = MarkupsV20220304.normalize(&data).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue { kind: "markup type", .. }));
    }

    #[test]
    fn out_of_range_current_id_is_a_mismatch() {
        let mut data = document_with(json!([
            {
                "markup": {"type": "ClosedCurve", "coordinateSystem": "LPS", "controlPoints": []},
                "name": "A",
                "orientation": orientation(),
                "representationType": "spline",
                "thickness": 50
            }
        ]));
        data["currentId"] = json!(4);
        assert!(MarkupsV20220304.normalize(&data).unwrap_err().is_schema_mismatch());
    }
}
