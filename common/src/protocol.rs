//! JSON contract of the object detection endpoint.
//!
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Size of the decoded image in pixels.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

/// One detected object as reported to clients.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DetectionEntry {
    pub class_name: String,
    /// `[x1, y1, x2, y2]` in pixels of the decoded image.
    pub bbox: [i32; 4],
}

/// Successful response of `POST /objectdetection/`.
///
/// `results` is keyed by the position of the detection in the result set and serializes as a
/// JSON object with the decimal index as key.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DetectionResponse {
    pub dimension: Dimension,
    pub results: BTreeMap<usize, DetectionEntry>,
}

/// Error payload returned alongside a non-success status code.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Number of occurrences of one class.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClassCount {
    pub class_name: String,
    pub quantity: usize,
}

impl DetectionResponse {
    /// Tally the detections per class.
    pub fn class_counts(&self) -> Vec<ClassCount> {
        class_counts(self.results.values().map(|entry| entry.class_name.as_str()))
    }
}

/// Count class names, keeping the order in which each class first appears.
pub fn class_counts<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<ClassCount> {
    let mut counts: Vec<ClassCount> = Vec::new();
    for name in names {
        match counts.iter_mut().find(|count| count.class_name == name) {
            Some(count) => count.quantity += 1,
            None => counts.push(ClassCount {
                class_name: name.to_owned(),
                quantity: 1,
            }),
        }
    }

    counts
}

#[cfg(test)]
mod test {

    use super::*;
    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn entry(class_name: &str, bbox: [i32; 4]) -> DetectionEntry {
        DetectionEntry {
            class_name: class_name.into(),
            bbox,
        }
    }

    #[test]
    fn test_response_json_layout() -> TestResult {
        let mut results = BTreeMap::new();
        results.insert(0, entry("0", [1, 2, 30, 40]));
        results.insert(1, entry("1", [5, 6, 70, 80]));
        let response = DetectionResponse {
            dimension: Dimension {
                width: 640,
                height: 480,
            },
            results,
        };

        let value = serde_json::to_value(&response)?;
        assert_eq!(value["dimension"]["width"], 640);
        assert_eq!(value["dimension"]["height"], 480);
        assert_eq!(value["results"]["0"]["class_name"], "0");
        assert_eq!(
            value["results"]["1"]["bbox"],
            serde_json::json!([5, 6, 70, 80])
        );

        let parsed: DetectionResponse = serde_json::from_value(value)?;
        assert_eq!(parsed, response);

        Ok(())
    }

    #[test]
    fn test_results_are_ordered_by_index() -> TestResult {
        let mut results = BTreeMap::new();
        for idx in (0..12).rev() {
            results.insert(idx, entry("3", [0, 0, 1, 1]));
        }
        let response = DetectionResponse {
            dimension: Dimension {
                width: 2,
                height: 2,
            },
            results,
        };

        let json = serde_json::to_string(&response)?;
        let pos_2 = json.find("\"2\":").ok_or("missing key 2")?;
        let pos_10 = json.find("\"10\":").ok_or("missing key 10")?;
        assert!(pos_2 < pos_10);

        Ok(())
    }

    #[test]
    fn test_error_payload() -> TestResult {
        let json = serde_json::to_string(&ErrorResponse::new("No image in request"))?;
        assert_eq!(json, r#"{"error":"No image in request"}"#);

        Ok(())
    }

    #[test]
    fn test_class_counts_keep_first_appearance() {
        let counts = class_counts(["2", "0", "2", "2", "1", "0"]);

        let names: Vec<_> = counts.iter().map(|c| c.class_name.as_str()).collect();
        assert_eq!(names, vec!["2", "0", "1"]);
        let quantities: Vec<_> = counts.iter().map(|c| c.quantity).collect();
        assert_eq!(quantities, vec![3, 2, 1]);
    }

    #[test]
    fn test_class_counts_sum_to_detections() {
        let mut results = BTreeMap::new();
        for (idx, name) in ["0", "1", "1", "5", "0", "1"].iter().enumerate() {
            results.insert(idx, entry(name, [0, 0, 1, 1]));
        }
        let response = DetectionResponse {
            dimension: Dimension {
                width: 10,
                height: 10,
            },
            results,
        };

        let total: usize = response.class_counts().iter().map(|c| c.quantity).sum();
        assert_eq!(total, response.results.len());
    }

    #[test]
    fn test_class_counts_empty() {
        assert!(class_counts(Vec::<&str>::new()).is_empty());
    }
}
