//! Reader for OpenCV's `opencv-cascade-classifier` XML storage, the
//! format `haarcascade_*.xml` files ship in.
//!
//! Only boosted Haar cascades built from decision stumps with upright
//! features are accepted. LBP cascades, tilted features and deeper trees
//! are reported instead of being approximated.

use std::str::FromStr;

use roxmltree::{Document, Node};
use thiserror::Error;

use super::haar_cascade::{CascadeStage, HaarCascade, HaarFeature, Stump, WeightedRect};

#[derive(Error, Debug)]
pub enum OpenCvXmlError {
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
    #[error("missing <{0}> element")]
    Missing(&'static str),
    #[error("unsupported {what} {value:?}")]
    Unsupported { what: &'static str, value: String },
    #[error("feature {0} is tilted; only upright features are supported")]
    TiltedFeature(usize),
    #[error("stage {stage} classifier {classifier} is not a decision stump")]
    NotAStump { stage: usize, classifier: usize },
    #[error("invalid value {value:?} in <{element}>")]
    BadValue { element: &'static str, value: String },
}

/// Parses a cascade from the text of an OpenCV XML file.
pub fn parse(xml: &str) -> Result<HaarCascade, OpenCvXmlError> {
    let doc = Document::parse(xml)?;
    let cascade = doc
        .descendants()
        .find(|n| n.has_tag_name("cascade"))
        .ok_or(OpenCvXmlError::Missing("cascade"))?;

    let stage_type = text(child(cascade, "stageType")?);
    if stage_type != "BOOST" {
        return Err(OpenCvXmlError::Unsupported {
            what: "stage type",
            value: stage_type.to_string(),
        });
    }
    let feature_type = text(child(cascade, "featureType")?);
    if feature_type != "HAAR" {
        return Err(OpenCvXmlError::Unsupported {
            what: "feature type",
            value: feature_type.to_string(),
        });
    }

    let width = scalar(cascade, "width")?;
    let height = scalar(cascade, "height")?;

    let features = items(child(cascade, "features")?)
        .enumerate()
        .map(|(i, node)| feature(i, node))
        .collect::<Result<Vec<_>, _>>()?;
    let stages = items(child(cascade, "stages")?)
        .enumerate()
        .map(|(i, node)| stage(i, node))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HaarCascade {
        window: (width, height),
        features,
        stages,
    })
}

fn stage(idx: usize, node: Node) -> Result<CascadeStage, OpenCvXmlError> {
    let threshold = scalar(node, "stageThreshold")?;
    let stumps = items(child(node, "weakClassifiers")?)
        .enumerate()
        .map(|(classifier, weak)| stump(idx, classifier, weak))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CascadeStage { threshold, stumps })
}

/// `internalNodes` is `left right feature threshold` per node, where
/// non-positive children index `leafValues`. A stump is the single node
/// `0 -1 feature threshold`.
fn stump(stage: usize, classifier: usize, node: Node) -> Result<Stump, OpenCvXmlError> {
    let internal: Vec<f64> = values(child(node, "internalNodes")?, "internalNodes")?;
    let leaves: Vec<f32> = values(child(node, "leafValues")?, "leafValues")?;
    let (&[left_child, right_child, feature, threshold], &[left, right]) =
        (internal.as_slice(), leaves.as_slice())
    else {
        return Err(OpenCvXmlError::NotAStump { stage, classifier });
    };
    if left_child != 0.0 || right_child != -1.0 {
        return Err(OpenCvXmlError::NotAStump { stage, classifier });
    }
    if feature < 0.0 || feature.fract() != 0.0 {
        return Err(OpenCvXmlError::BadValue {
            element: "internalNodes",
            value: feature.to_string(),
        });
    }
    Ok(Stump {
        feature: feature as usize,
        threshold: threshold as f32,
        left,
        right,
    })
}

fn feature(idx: usize, node: Node) -> Result<HaarFeature, OpenCvXmlError> {
    if let Some(tilted) = node.children().find(|n| n.has_tag_name("tilted")) {
        if text(tilted) != "0" {
            return Err(OpenCvXmlError::TiltedFeature(idx));
        }
    }
    let rects = items(child(node, "rects")?)
        .map(rect)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HaarFeature { rects })
}

/// `x y width height weight`.
fn rect(node: Node) -> Result<WeightedRect, OpenCvXmlError> {
    let bad = || OpenCvXmlError::BadValue {
        element: "rects",
        value: text(node).to_string(),
    };
    let v: Vec<f32> = values(node, "rects")?;
    let &[x, y, width, height, weight] = v.as_slice() else {
        return Err(bad());
    };
    let coord = |c: f32| {
        if c >= 0.0 && c.fract() == 0.0 {
            Ok(c as u32)
        } else {
            Err(bad())
        }
    };
    Ok(WeightedRect {
        x: coord(x)?,
        y: coord(y)?,
        width: coord(width)?,
        height: coord(height)?,
        weight,
    })
}

fn child<'a, 'i>(node: Node<'a, 'i>, tag: &'static str) -> Result<Node<'a, 'i>, OpenCvXmlError> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .ok_or(OpenCvXmlError::Missing(tag))
}

/// Sequence entries, which OpenCV writes as `<_>` elements.
fn items<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(|n| n.has_tag_name("_"))
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn scalar<T: FromStr>(node: Node, tag: &'static str) -> Result<T, OpenCvXmlError> {
    let raw = text(child(node, tag)?);
    raw.parse().map_err(|_| OpenCvXmlError::BadValue {
        element: tag,
        value: raw.to_string(),
    })
}

fn values<T: FromStr>(node: Node, element: &'static str) -> Result<Vec<T>, OpenCvXmlError> {
    text(node)
        .split_whitespace()
        .map(|v| {
            v.parse().map_err(|_| OpenCvXmlError::BadValue {
                element,
                value: v.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::tests::edge_cascade;

    /// The edge cascade as OpenCV's `traincascade` would write it.
    pub(crate) const EDGE_CASCADE_XML: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageParams>
    <boostType>GAB</boostType>
    <minHitRate>9.9500000476837158e-01</minHitRate>
    <maxFalseAlarm>5.0000000000000000e-01</maxFalseAlarm>
    <weightTrimRate>9.4999999999999996e-01</weightTrimRate>
    <maxDepth>1</maxDepth>
    <maxWeakCount>100</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount>
    <featSize>1</featSize>
    <mode>BASIC</mode></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 4 4 -1.</_>
        <_>
          0 0 2 4 2.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    #[test]
    fn test_parse_matches_edge_cascade() {
        assert_eq!(parse(EDGE_CASCADE_XML).unwrap(), edge_cascade());
    }

    #[test]
    fn test_upright_tilted_flag_is_accepted() {
        let xml = EDGE_CASCADE_XML.replace(
            "0 0 2 4 2.</_></rects>",
            "0 0 2 4 2.</_></rects>\n      <tilted>0</tilted>",
        );
        assert_eq!(parse(&xml).unwrap(), edge_cascade());
    }

    #[test]
    fn test_tilted_feature_rejected() {
        let xml = EDGE_CASCADE_XML.replace(
            "0 0 2 4 2.</_></rects>",
            "0 0 2 4 2.</_></rects>\n      <tilted>1</tilted>",
        );
        assert!(matches!(parse(&xml), Err(OpenCvXmlError::TiltedFeature(0))));
    }

    #[test]
    fn test_lbp_cascade_rejected() {
        let xml = EDGE_CASCADE_XML.replace(
            "<featureType>HAAR</featureType>",
            "<featureType>LBP</featureType>",
        );
        assert!(matches!(
            parse(&xml),
            Err(OpenCvXmlError::Unsupported {
                what: "feature type",
                ..
            })
        ));
    }

    #[test]
    fn test_tree_classifier_rejected() {
        let xml = EDGE_CASCADE_XML.replace(
            "0 -1 0 5.0000000000000000e-01",
            "1 -1 0 5.0000000000000000e-01 0 -2 0 1.0000000000000000e-01",
        );
        assert!(matches!(
            parse(&xml),
            Err(OpenCvXmlError::NotAStump {
                stage: 0,
                classifier: 0
            })
        ));
    }

    #[test]
    fn test_old_haar_format_reports_missing_cascade() {
        let xml = r#"<?xml version="1.0"?>
<opencv_storage>
<haarcascade_eye type_id="opencv-haar-classifier"><size>20 20</size></haarcascade_eye>
</opencv_storage>"#;
        assert!(matches!(parse(xml), Err(OpenCvXmlError::Missing("cascade"))));
    }

    #[test]
    fn test_bad_rect_value() {
        let xml = EDGE_CASCADE_XML.replace("0 0 2 4 2.", "0 0 2.5 4 2.");
        assert!(matches!(
            parse(&xml),
            Err(OpenCvXmlError::BadValue {
                element: "rects",
                ..
            })
        ));
    }

    #[test]
    fn test_not_xml() {
        assert!(matches!(parse("{ \"window\": [4, 4] }"), Err(OpenCvXmlError::Xml(_))));
    }
}
