//! Stream events, schemas and query arguments as seen by the operators

use crate::labels::Label;
use serde::{Deserialize, Serialize};

/// Declared type of a stream attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Int,
    Long,
    Float,
    Double,
    Bool,
}

impl AttributeType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AttributeType::Int | AttributeType::Long | AttributeType::Float | AttributeType::Double
        )
    }

    /// Types whose values have exact identity and can act as class labels
    pub fn is_discrete(&self) -> bool {
        matches!(
            self,
            AttributeType::String | AttributeType::Int | AttributeType::Long | AttributeType::Bool
        )
    }
}

/// A single attribute value carried by an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    Null,
}

impl AttributeValue {
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            AttributeValue::String(_) => Some(AttributeType::String),
            AttributeValue::Int(_) => Some(AttributeType::Int),
            AttributeValue::Long(_) => Some(AttributeType::Long),
            AttributeValue::Float(_) => Some(AttributeType::Float),
            AttributeValue::Double(_) => Some(AttributeType::Double),
            AttributeValue::Bool(_) => Some(AttributeType::Bool),
            AttributeValue::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Long(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v as f64),
            AttributeValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<Label> {
        match self {
            AttributeValue::String(s) => Some(Label::Text(s.clone())),
            AttributeValue::Int(v) => Some(Label::Integer(*v as i64)),
            AttributeValue::Long(v) => Some(Label::Integer(*v)),
            AttributeValue::Bool(b) => Some(Label::Boolean(*b)),
            _ => None,
        }
    }
}

/// Named, typed attribute of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }
}

/// Schema of an input stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub id: String,
    pub attributes: Vec<Attribute>,
}

impl StreamDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attr_type: AttributeType) -> Self {
        self.attributes.push(Attribute::new(name, attr_type));
        self
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn get(&self, name: &str) -> Option<(usize, &Attribute)> {
        self.position(name).map(|i| (i, &self.attributes[i]))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// One event flowing through a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub timestamp: i64,
    pub data: Vec<AttributeValue>,
}

impl StreamEvent {
    pub fn new(timestamp: i64, data: Vec<AttributeValue>) -> Self {
        Self { timestamp, data }
    }

    /// Append output attributes after the original ones
    pub fn append(&mut self, values: impl IntoIterator<Item = AttributeValue>) {
        self.data.extend(values);
    }
}

/// A parameter of an operator invocation, as compiled by the host
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArgument {
    Constant(AttributeValue),
    /// Reference to an attribute of the input stream by name
    Attribute(String),
}

impl QueryArgument {
    pub fn constant(value: AttributeValue) -> Self {
        QueryArgument::Constant(value)
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        QueryArgument::Attribute(name.into())
    }

    pub fn describe(&self) -> &'static str {
        match self {
            QueryArgument::Constant(_) => "constant",
            QueryArgument::Attribute(_) => "attribute reference",
        }
    }
}

/// Host application context for an operator
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub app_name: String,
}

impl QueryContext {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Registry key for a user-facing model name within this application
    pub fn model_key(&self, model_name: &str) -> String {
        format!("{}.{}", model_name, self.app_name)
    }
}
