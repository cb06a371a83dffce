//! 病理医生绘制的多边形标注 (ASAP XML 格式).
//!
//! ```xml
//! <ASAP_Annotations>
//!   <Annotations>
//!     <Annotation Name="Annotation 0" Type="Polygon" PartOfGroup="metastases">
//!       <Coordinates>
//!         <Coordinate Order="0" X="12.5" Y="40.0" />
//!         ...
//!       </Coordinates>
//!     </Annotation>
//!   </Annotations>
//!   <AnnotationGroups>...</AnnotationGroups>
//! </ASAP_Annotations>
//! ```
//!
//! `AnnotationGroups` 以及其它未列出的属性会被忽略.

use crate::{Error, FileKind, Result, Vertex};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 一个命名的标注多边形.
///
/// 多边形可以不闭合 (首尾顶点不要求相等), 顶点顺序与文件中一致.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// 标注名称.
    pub name: String,

    /// 所属组 (`PartOfGroup`).
    pub group: String,

    /// 顶点序列.
    pub polygon: Vec<Vertex>,
}

#[derive(Deserialize)]
struct AsapDocument {
    #[serde(rename = "Annotations", default)]
    annotations: AnnotationList,
}

#[derive(Deserialize, Default)]
struct AnnotationList {
    #[serde(rename = "Annotation", default)]
    items: Vec<RawAnnotation>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    #[serde(rename = "@Name", default)]
    name: String,
    #[serde(rename = "@PartOfGroup", default)]
    group: String,
    #[serde(rename = "Coordinates", default)]
    coordinates: CoordinateList,
}

#[derive(Deserialize, Default)]
struct CoordinateList {
    #[serde(rename = "Coordinate", default)]
    items: Vec<RawCoordinate>,
}

#[derive(Deserialize)]
struct RawCoordinate {
    #[serde(rename = "@X")]
    x: f64,
    #[serde(rename = "@Y")]
    y: f64,
}

impl From<RawAnnotation> for Annotation {
    fn from(raw: RawAnnotation) -> Self {
        Self {
            name: raw.name,
            group: raw.group,
            polygon: raw
                .coordinates
                .items
                .into_iter()
                .map(|c| (c.x, c.y))
                .collect(),
        }
    }
}

/// 解析 XML 文本.
pub fn parse_xml_str(xml: &str) -> std::result::Result<Vec<Annotation>, quick_xml::DeError> {
    let doc: AsapDocument = quick_xml::de::from_str(xml)?;
    Ok(doc
        .annotations
        .items
        .into_iter()
        .map(Annotation::from)
        .collect())
}

/// 读取并解析标注文件 `path`.
///
/// 文件不存在时返回 [`Error::MissingFile`].
pub fn parse_xml<P: AsRef<Path>>(path: P) -> Result<Vec<Annotation>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::missing(FileKind::Annotation, path));
    }
    let xml = fs::read_to_string(path).map_err(Error::io(path))?;
    parse_xml_str(&xml).map_err(|source| Error::Xml {
        path: path.to_owned(),
        source,
    })
}
