//! 2019.01.26 与 2020.04.16：Slicer MarkupsSplines 节点的扁平 `Markups` 列表。
//!
//! 点以 RAS 存储为 `{x, y, z}`，读写时前两个轴取反。文档级字段挂在被选中的
//! markup 上。这两个版本的文件都没有 `version` 字段。

use cellloc_core::document::{
    Annotation, CoordinateSystem, Document, MarkupType, Ontology, Point, ReferenceView,
    RepresentationType,
};
use cellloc_core::geometry::Point3;
use serde_json::{Map, Value, json};

use super::{ConvertError, Converter, fields, lps_position};

const DEFAULT_KEYS: [&str; 8] = [
    "DefaultCameraPosition",
    "DefaultCameraViewUp",
    "DefaultOntology",
    "DefaultReferenceView",
    "DefaultRepresentationType",
    "DefaultSplineOrientation",
    "DefaultStepSize",
    "DefaultThickness",
];

#[derive(Debug, Clone, Copy)]
struct Flavor {
    version: &'static str,
    /// 2020.04.16 起顶层带 `Default*` 字段。
    with_defaults: bool,
}

const V2019_01_26: Flavor = Flavor {
    version: "v0.0.0+2019.01.26",
    with_defaults: false,
};

const V2020_04_16: Flavor = Flavor {
    version: "v0.0.0+2020.04.16",
    with_defaults: true,
};

pub struct SplinesV20190126;

impl Converter for SplinesV20190126 {
    fn version(&self) -> &'static str {
        V2019_01_26.version
    }

    fn normalize(&self, data: &Value) -> Result<Document, ConvertError> {
        normalize(data, V2019_01_26)
    }

    fn specialize(&self, document: &Document) -> Result<Value, ConvertError> {
        specialize(document, V2019_01_26)
    }
}

pub struct SplinesV20200416;

impl Converter for SplinesV20200416 {
    fn version(&self) -> &'static str {
        V2020_04_16.version
    }

    fn normalize(&self, data: &Value) -> Result<Document, ConvertError> {
        normalize(data, V2020_04_16)
    }

    fn specialize(&self, document: &Document) -> Result<Value, ConvertError> {
        specialize(document, V2020_04_16)
    }
}

fn normalize(data: &Value, flavor: Flavor) -> Result<Document, ConvertError> {
    if flavor.with_defaults {
        // 内容用不到，但缺失时必须失败，否则会抢走 2019 版文件的推断结果。
        for key in DEFAULT_KEYS {
            fields::field(data, key)?;
        }
    }

    let markups = fields::array(data, "Markups")?;
    let mut document = Document::new();

    for (index, markup) in markups.iter().enumerate() {
        if fields::truthy(markup, "Selected")? {
            document.current_id = index;
            document.reference_view =
                fields::enumeration(markup, "ReferenceView", "reference view", ReferenceView::parse)?;
            document.ontology = fields::enumeration(markup, "Ontology", "ontology", Ontology::parse)?;
            document.step_size = fields::number(markup, "StepSize")?;
            document.camera_position = fields::floats(markup, "CameraPosition")?;
            document.camera_view_up = fields::floats(markup, "CameraViewUp")?;
            break;
        }
    }

    for markup in markups {
        let points = fields::array(markup, "Points")?
            .iter()
            .map(|point| {
                let ras = Point3::new(
                    fields::number(point, "x")?,
                    fields::number(point, "y")?,
                    fields::number(point, "z")?,
                );
                Ok(Point::new(ras.flip_xy()))
            })
            .collect::<Result<Vec<_>, ConvertError>>()?;

        document.annotations.push(Annotation {
            name: fields::string(markup, "Label")?.to_string(),
            markup_type: MarkupType::ClosedCurve,
            representation_type: fields::enumeration(
                markup,
                "RepresentationType",
                "representation type",
                RepresentationType::parse,
            )?,
            thickness: fields::number(markup, "Thickness")?,
            coordinate_system: CoordinateSystem::Lps,
            orientation: fields::floats(markup, "SplineOrientation")?,
            points,
            ..Annotation::default()
        });
    }

    Ok(document)
}

fn specialize(document: &Document, flavor: Flavor) -> Result<Value, ConvertError> {
    document.validate()?;
    if let Some(annotation) = document.annotations.iter().find(|ann| !ann.is_closed_curve()) {
        return Err(ConvertError::Unsupported {
            version: flavor.version,
            what: format!(
                "{} annotation {:?}",
                annotation.markup_type.as_str(),
                annotation.name
            ),
        });
    }

    let mut data = Map::new();
    if flavor.with_defaults {
        let current = document.current_annotation().cloned().unwrap_or_default();
        data.insert("DefaultCameraPosition".into(), json!(document.camera_position));
        data.insert("DefaultCameraViewUp".into(), json!(document.camera_view_up));
        data.insert("DefaultOntology".into(), json!(document.ontology.as_str()));
        data.insert(
            "DefaultReferenceView".into(),
            json!(document.reference_view.as_str()),
        );
        data.insert(
            "DefaultRepresentationType".into(),
            json!(RepresentationType::Polyline.as_str()),
        );
        data.insert("DefaultSplineOrientation".into(), json!(current.orientation));
        data.insert("DefaultStepSize".into(), json!(document.step_size));
        data.insert("DefaultThickness".into(), json!(current.thickness));
    }
    data.insert("Locked".into(), json!(0));
    data.insert("MarkupLabelFormat".into(), json!("%N-%d"));

    let mut markups: Vec<Value> = document
        .annotations
        .iter()
        .enumerate()
        .map(|(index, annotation)| {
            let points: Vec<Value> = annotation
                .points
                .iter()
                .map(|point| {
                    let ras = lps_position(annotation, point).flip_xy();
                    json!({"x": ras.x(), "y": ras.y(), "z": ras.z()})
                })
                .collect();
            // 其余节点元数据只为旧版界面能加载文件，不参与往返。
            json!({
                "AssociatedNodeID": format!("vtkMRMLModelNode{index}"),
                "CameraPosition": document.camera_position,
                "CameraViewUp": document.camera_view_up,
                "Closed": 1,
                "Description": "",
                "ID": format!("vtkMRMLMarkupsSplinesNode_{index}"),
                "Label": annotation.name,
                "Locked": 1,
                "Ontology": document.ontology.as_str(),
                "OrientationWXYZ": [0.0, 0.0, 0.0, 1.0],
                "Points": points,
                "Points_Count": annotation.points.len().to_string(),
                "ReferenceView": document.reference_view.as_str(),
                "RepresentationType": annotation.representation_type.as_str(),
                "Selected": 0,
                "SplineOrientation": annotation.orientation,
                "StepSize": document.step_size,
                "Thickness": annotation.thickness,
                "Visibility": 1,
            })
        })
        .collect();

    if let Some(selected) = markups.get_mut(document.current_id) {
        selected["Selected"] = json!(1);
        if !flavor.with_defaults {
            selected["Locked"] = json!(0);
        }
    }

    data.insert("Markups".into(), Value::Array(markups));
    data.insert("Markups_Count".into(), json!(document.annotations.len()));
    data.insert("TextList".into(), json!([null]));
    data.insert("TextList_Count".into(), json!(0));

    Ok(Value::Object(data))
}
