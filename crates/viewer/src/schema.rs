//! Schema models written in KDL.
//!
//! ```kdl
//! type User {
//!     field id type=ID
//!     field posts type="[Post!]"
//! }
//! ```
//!
//! Every declared type becomes a node. A field whose type names another declared type
//! becomes a link from the owning type, identified as `<Type>.<field>`.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use graphview::{Link, LinkEndOffset, Measure, Node};
use schemaviz_layout::{Position, Size};
use tracing::debug;

const CHAR_WIDTH: f64 = 7.2;
const FIELD_CHAR_WIDTH: f64 = 6.0;
const PADDING: f64 = 24.0;
const BASE_WIDTH: f64 = 120.0;
pub const HEADER_HEIGHT: f64 = 28.0;
pub const ROW_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: String,
}

impl Field {
    /// Named type with list and non-null markers stripped: `[Post!]!` is `Post`.
    pub fn base_type(&self) -> &str {
        self.ty.trim_matches(|c: char| matches!(c, '[' | ']' | '!'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

impl TypeDecl {
    /// Box size of the rendered type: a header line plus one row per field.
    pub fn estimated_size(&self) -> Size {
        let name_width = self.name.len() as f64 * CHAR_WIDTH + PADDING;
        let field_width = self
            .fields
            .iter()
            .map(|f| (f.name.len() + f.ty.len() + 2) as f64 * FIELD_CHAR_WIDTH + PADDING)
            .fold(0.0, f64::max);
        let width = name_width.max(field_width).max(BASE_WIDTH);
        let height = HEADER_HEIGHT + self.fields.len() as f64 * ROW_HEIGHT;
        Size::new(width, height)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    pub types: Vec<TypeDecl>,
}

impl SchemaModel {
    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.types
            .iter()
            .map(|t| Node::new(t.name.clone(), t.name.clone()))
            .collect()
    }

    pub fn links(&self) -> Vec<Link> {
        let mut links = Vec::new();
        for decl in &self.types {
            for field in &decl.fields {
                let target = field.base_type();
                if self.get(target).is_none() {
                    continue;
                }
                if target == decl.name {
                    debug!(owner = %decl.name, field = %field.name, "skipping self reference");
                    continue;
                }
                links.push(
                    Link::new(decl.name.clone(), target)
                        .with_id(format!("{}.{}", decl.name, field.name)),
                );
            }
        }
        links
    }

    pub fn sizes(&self) -> HashMap<String, Size> {
        self.types
            .iter()
            .map(|t| (t.name.clone(), t.estimated_size()))
            .collect()
    }
}

pub fn parse_schema(content: &str) -> Result<SchemaModel> {
    let doc = kdl::KdlDocument::parse(content).context("invalid KDL document")?;

    let mut model = SchemaModel::default();
    for kdl_node in doc.nodes() {
        if kdl_node.name().value() != "type" {
            debug!(node = kdl_node.name().value(), "skipping unknown node");
            continue;
        }
        let Some(name) = first_argument(kdl_node) else {
            bail!("type declaration without a name");
        };
        if model.get(name).is_some() {
            bail!("type {name} is declared twice");
        }

        let mut fields = Vec::new();
        if let Some(children) = kdl_node.children() {
            for child in children.nodes() {
                if child.name().value() != "field" {
                    continue;
                }
                let field_name = first_argument(child)
                    .with_context(|| format!("field without a name in type {name}"))?;
                let ty = property(child, "type")
                    .with_context(|| format!("field {name}.{field_name} has no type"))?;
                fields.push(Field {
                    name: field_name.to_string(),
                    ty: ty.to_string(),
                });
            }
        }
        model.types.push(TypeDecl {
            name: name.to_string(),
            fields,
        });
    }
    Ok(model)
}

/// First positional argument
fn first_argument(kdl_node: &kdl::KdlNode) -> Option<&str> {
    kdl_node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
}

fn property<'a>(kdl_node: &'a kdl::KdlNode, key: &str) -> Option<&'a str> {
    kdl_node
        .entries()
        .iter()
        .find(|e| e.name().is_some_and(|n| n.value() == key))
        .and_then(|e| e.value().as_string())
}

/// Estimated type boxes, with links attached to box centres.
pub struct BoxMeasure {
    sizes: HashMap<String, Size>,
}

impl BoxMeasure {
    pub fn new(sizes: HashMap<String, Size>) -> Self {
        Self { sizes }
    }

    fn half(&self, id: &str) -> Position {
        let size = self.sizes.get(id).copied().unwrap_or_default();
        Position::new(size.width / 2.0, size.height / 2.0)
    }
}

impl Measure for BoxMeasure {
    fn measure(&self, node: &Node) -> Option<Size> {
        self.sizes.get(&node.id).copied()
    }

    fn link_offset(&self, link: &Link) -> LinkEndOffset {
        LinkEndOffset {
            source: self.half(&link.source),
            target: self.half(&link.target),
        }
    }
}
