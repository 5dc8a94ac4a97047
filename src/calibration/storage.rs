//! Named-field calibration documents.
//!
//! The layout matches an OpenCV FileStorage XML file: every child of the root
//! element is a named field holding either a scalar as text, or a matrix with
//! `rows`, `cols`, `dt` and whitespace-separated `data` children.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{BlendError, Result};

const ROOT: &str = "opencv_storage";

/// Row-major matrix of doubles.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Self { rows, cols, data }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_iter(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.cols.max(1))
    }
}

/// Value of one named field.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageValue {
    Scalar(String),
    Matrix(Matrix),
}

/// Field being assembled while its element is open.
#[derive(Default)]
struct PendingField {
    name: String,
    text: String,
    child: Option<String>,
    children: Vec<(String, String)>,
}

impl PendingField {
    fn child_text(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, text)| text.as_str())
    }

    fn finish(self) -> Result<(String, StorageValue)> {
        let Some(rows) = self.child_text("rows") else {
            return Ok((self.name, StorageValue::Scalar(self.text.trim().to_string())));
        };

        let malformed = |reason: String| BlendError::MalformedField {
            field: self.name.clone(),
            reason,
        };
        let rows: usize = rows
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad row count '{}'", rows)))?;
        let cols_text = self
            .child_text("cols")
            .ok_or_else(|| malformed("matrix without cols".to_string()))?;
        let cols: usize = cols_text
            .trim()
            .parse()
            .map_err(|_| malformed(format!("bad column count '{}'", cols_text)))?;

        let data = self
            .child_text("data")
            .unwrap_or("")
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("bad number '{}'", token)))
            })
            .collect::<Result<Vec<_>>>()?;
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| malformed(format!("{}x{} matrix is too large", rows, cols)))?;
        if data.len() != expected {
            return Err(malformed(format!(
                "{} values for a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }

        Ok((self.name, StorageValue::Matrix(Matrix { rows, cols, data })))
    }
}

/// Parsed calibration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageDocument {
    fields: BTreeMap<String, StorageValue>,
}

impl StorageDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let doc = Self::parse(&contents)?;
        log::info!("Loaded {} fields from {}", doc.fields.len(), path.display());
        Ok(doc)
    }

    /// Parse a document from XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut doc = Self::default();
        let mut depth = 0usize;
        let mut field: Option<PendingField> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    depth += 1;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    match depth {
                        2 => {
                            field = Some(PendingField {
                                name,
                                ..Default::default()
                            })
                        }
                        3 => {
                            if let Some(field) = field.as_mut() {
                                field.child = Some(name);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Empty(e) if depth == 1 => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    doc.fields.insert(name, StorageValue::Scalar(String::new()));
                }
                Event::Text(t) => {
                    let text = String::from_utf8_lossy(&t).into_owned();
                    if let Some(field) = field.as_mut() {
                        match field.child.clone() {
                            Some(child) => match field.children.iter_mut().find(|(c, _)| *c == child) {
                                Some((_, existing)) => {
                                    existing.push(' ');
                                    existing.push_str(&text);
                                }
                                None => field.children.push((child, text)),
                            },
                            None => field.text.push_str(&text),
                        }
                    }
                }
                Event::End(_) => {
                    match depth {
                        2 => {
                            if let Some(done) = field.take() {
                                let (name, value) = done.finish()?;
                                doc.fields.insert(name, value);
                            }
                        }
                        3 => {
                            if let Some(field) = field.as_mut() {
                                field.child = None;
                            }
                        }
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(doc)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&StorageValue> {
        self.fields.get(name)
    }

    fn require(&self, name: &str) -> Result<&StorageValue> {
        self.fields
            .get(name)
            .ok_or_else(|| BlendError::MissingField(name.to_string()))
    }

    /// Numeric scalar. A 1x1 matrix is accepted as well.
    pub fn scalar(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            StorageValue::Scalar(text) => text.parse().map_err(|_| BlendError::MalformedField {
                field: name.to_string(),
                reason: format!("'{}' is not a number", text),
            }),
            StorageValue::Matrix(m) if m.rows == 1 && m.cols == 1 => Ok(m.data[0]),
            StorageValue::Matrix(m) => Err(BlendError::MatrixShape {
                field: name.to_string(),
                rows: 1,
                cols: 1,
                found_rows: m.rows,
                found_cols: m.cols,
            }),
        }
    }

    /// Matrix with an exact shape.
    pub fn matrix(&self, name: &str, rows: usize, cols: usize) -> Result<&Matrix> {
        let m = self.matrix_with_cols(name, cols)?;
        if m.rows != rows {
            return Err(BlendError::MatrixShape {
                field: name.to_string(),
                rows,
                cols,
                found_rows: m.rows,
                found_cols: m.cols,
            });
        }
        Ok(m)
    }

    /// Matrix with any number of rows and a fixed column count.
    pub fn matrix_with_cols(&self, name: &str, cols: usize) -> Result<&Matrix> {
        match self.require(name)? {
            StorageValue::Matrix(m) if m.cols == cols => Ok(m),
            StorageValue::Matrix(m) => Err(BlendError::MatrixShape {
                field: name.to_string(),
                rows: m.rows,
                cols,
                found_rows: m.rows,
                found_cols: m.cols,
            }),
            StorageValue::Scalar(_) => Err(BlendError::MalformedField {
                field: name.to_string(),
                reason: "expected a matrix, found a scalar".to_string(),
            }),
        }
    }

    pub fn insert_scalar(&mut self, name: impl Into<String>, value: f64) {
        self.fields
            .insert(name.into(), StorageValue::Scalar(value.to_string()));
    }

    pub fn insert_matrix(&mut self, name: impl Into<String>, matrix: Matrix) {
        self.fields.insert(name.into(), StorageValue::Matrix(matrix));
    }

    /// Serialize back to XML.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        writer.write_event(Event::Start(BytesStart::new(ROOT)))?;

        for (name, value) in &self.fields {
            match value {
                StorageValue::Scalar(text) => {
                    writer
                        .create_element(name.as_str())
                        .write_text_content(BytesText::new(text))?;
                }
                StorageValue::Matrix(m) => {
                    let mut start = BytesStart::new(name.as_str());
                    start.push_attribute(("type_id", "opencv-matrix"));
                    writer.write_event(Event::Start(start))?;
                    writer
                        .create_element("rows")
                        .write_text_content(BytesText::new(&m.rows.to_string()))?;
                    writer
                        .create_element("cols")
                        .write_text_content(BytesText::new(&m.cols.to_string()))?;
                    writer
                        .create_element("dt")
                        .write_text_content(BytesText::new("d"))?;
                    let data = m
                        .data
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(" ");
                    writer
                        .create_element("data")
                        .write_text_content(BytesText::new(&data))?;
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
        }

        writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
        String::from_utf8(writer.into_inner()).map_err(|e| BlendError::MalformedField {
            field: ROOT.to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the document to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml()?)?;
        Ok(())
    }
}
