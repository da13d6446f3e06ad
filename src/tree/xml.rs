//! `structure.xml` reading and writing.
//!
//! ```xml
//! <ClassificationTree>
//!   <Node nodeName="root" k="1">
//!     <labels/>
//!     <childrens>
//!       <Node nodeName="Sport" k="1">
//!         <labels it="Sport" en="Sports"/>
//!         <childrens/>
//!       </Node>
//!     </childrens>
//!   </Node>
//! </ClassificationTree>
//! ```

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, TaxisError};
use crate::intern::InternPool;
use crate::tree::{CategoryTree, NodeId, ROOT_NAME};

const TREE_ELEMENT: &str = "ClassificationTree";
const NODE_ELEMENT: &str = "Node";
const LABELS_ELEMENT: &str = "labels";
const CHILDREN_ELEMENT: &str = "childrens";
const NAME_ATTRIBUTE: &str = "nodeName";
const K_ATTRIBUTE: &str = "k";

fn xml_error<E: std::fmt::Display>(e: E) -> TaxisError {
    TaxisError::xml(e.to_string())
}

impl CategoryTree {
    /// Serialize the tree, labels and neighbour counts included.
    pub fn to_document(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        writer
            .write_event(Event::Start(BytesStart::new(TREE_ELEMENT)))
            .map_err(xml_error)?;
        self.write_node(&mut writer, self.root())?;
        writer
            .write_event(Event::End(BytesEnd::new(TREE_ELEMENT)))
            .map_err(xml_error)?;

        String::from_utf8(writer.into_inner()).map_err(xml_error)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<()> {
        let Some(node) = self.node(id) else {
            return Ok(());
        };
        let k = node.k().to_string();
        let start = BytesStart::new(NODE_ELEMENT)
            .with_attributes([(NAME_ATTRIBUTE, node.name()), (K_ATTRIBUTE, k.as_str())]);
        writer.write_event(Event::Start(start)).map_err(xml_error)?;

        let labels = BytesStart::new(LABELS_ELEMENT).with_attributes(
            node.labels()
                .iter()
                .map(|(language, label)| (language.as_str(), label.as_str())),
        );
        writer.write_event(Event::Empty(labels)).map_err(xml_error)?;

        if node.has_children() {
            writer
                .write_event(Event::Start(BytesStart::new(CHILDREN_ELEMENT)))
                .map_err(xml_error)?;
            for child in node.children() {
                self.write_node(writer, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(CHILDREN_ELEMENT)))
                .map_err(xml_error)?;
        } else {
            writer
                .write_event(Event::Empty(BytesStart::new(CHILDREN_ELEMENT)))
                .map_err(xml_error)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(NODE_ELEMENT)))
            .map_err(xml_error)?;
        Ok(())
    }

    /// Parse a tree written by [`CategoryTree::to_document`]. `default_k`
    /// applies to nodes without a valid `k` attribute. Nodes that cannot be
    /// added (duplicates, id collisions) are skipped with a warning, together
    /// with their subtree.
    pub fn from_document(xml: &str, default_k: usize, pool: Arc<InternPool>) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut tree: Option<CategoryTree> = None;
        let mut in_tree_element = false;
        // One entry per open Node element; None for skipped subtrees.
        let mut open_nodes: Vec<Option<NodeId>> = Vec::new();

        loop {
            let event = reader.read_event().map_err(xml_error)?;
            match event {
                Event::Start(ref element) | Event::Empty(ref element) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match element.name().as_ref() {
                        b"ClassificationTree" => in_tree_element = true,
                        b"Node" if in_tree_element => {
                            let attributes = attributes(element)?;
                            let name = attribute(&attributes, NAME_ATTRIBUTE).unwrap_or_default();
                            let k = attribute(&attributes, K_ATTRIBUTE)
                                .and_then(|k| k.trim().parse::<usize>().ok())
                                .filter(|k| *k > 0)
                                .unwrap_or(default_k);

                            let id = if tree.is_none() && open_nodes.is_empty() {
                                (name == ROOT_NAME).then(|| {
                                    let mut root = CategoryTree::new(default_k, Arc::clone(&pool));
                                    let id = root.root();
                                    if let Some(node) = root.node_mut(id) {
                                        node.k = k;
                                    }
                                    tree = Some(root);
                                    id
                                })
                            } else if let (Some(Some(parent)), Some(tree)) =
                                (open_nodes.last().copied(), tree.as_mut())
                            {
                                match tree.create_child(parent, &name, k) {
                                    Ok(child) => Some(child),
                                    Err(e) => {
                                        warn!("Skipping node {name}: {e}");
                                        None
                                    }
                                }
                            } else {
                                None
                            };
                            if !is_empty {
                                open_nodes.push(id);
                            }
                        }
                        b"labels" => {
                            if let (Some(Some(id)), Some(tree)) = (open_nodes.last(), tree.as_mut())
                                && let Some(node) = tree.node_mut(*id)
                            {
                                for (language, label) in attributes(element)? {
                                    node.set_label(&language, label);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref element) => match element.name().as_ref() {
                    b"Node" => {
                        open_nodes.pop();
                    }
                    b"ClassificationTree" => in_tree_element = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        tree.ok_or_else(|| TaxisError::xml("no ClassificationTree root node found"))
    }

    /// Write `structure.xml` to `path`.
    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let document = self.to_document()?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), document)?;
        info!(
            "Stored category tree with {} nodes to {:?}",
            self.node_count(),
            path.as_ref()
        );
        Ok(())
    }

    /// Read the tree stored at `path`. A missing or malformed file yields an
    /// empty tree.
    pub fn load_or_empty<P: AsRef<Path>>(path: P, k: usize, pool: Arc<InternPool>) -> Self {
        let path = path.as_ref();
        if !path.is_file() {
            info!("No structure file at {path:?}, starting with an empty tree");
            return CategoryTree::new(k, pool);
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(TaxisError::from)
            .and_then(|xml| CategoryTree::from_document(&xml, k, Arc::clone(&pool)));
        match parsed {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Ignoring malformed structure file {path:?}: {e}");
                CategoryTree::new(k, pool)
            }
        }
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    element
        .attributes()
        .map(|attribute| {
            let attribute = attribute.map_err(xml_error)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn attribute(attributes: &[(String, String)], name: &str) -> Option<String> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}
