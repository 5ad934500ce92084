// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rich view contract and an in-memory structured view
//!
//! The structured editing widget is an external collaborator. What the core
//! needs from it is captured by [`RichView`]: serialize to markup, replace the
//! whole tree from markup, and report user edits through a [`ChangeNotifier`].
//!
//! [`StructuredView`] implements the contract over a [`RichNode`] tree. Images
//! in that tree are [`ImageNode`]s carrying both the resolved display reference
//! and the original reference; serialization reads only the original.

use crate::assets::{resolve_for_display, AssetProtocol, DisplayBridge};
use crate::ast::Node;
use crate::formats::markdown::{parse_markdown, serialize_markdown};
use crate::traits::{Result, SyncError};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc;
use tracing::trace;

/// What the synchronization controller requires from a rich editing widget
pub trait RichView {
    /// Current tree as canonical markup.
    ///
    /// Fails with [`SyncError::SerializationUnavailable`] while the widget's
    /// serializer is not initialized.
    fn serialize_to_markup(&self) -> Result<String>;

    /// Replace the whole tree. Not a user edit.
    fn replace_content(&mut self, markup: &str);

    /// Install the channel used to report user edits
    fn set_change_notifier(&mut self, notifier: ChangeNotifier);
}

/// Sending half of the change channel, held by the rich view
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: mpsc::Sender<String>,
    programmatic: Rc<Cell<bool>>,
}

impl ChangeNotifier {
    /// Report the serialization after an edit.
    ///
    /// Returns `false` when the notification was dropped because a
    /// programmatic replacement is in flight or the receiver is gone.
    pub fn notify(&self, markup: String) -> bool {
        if self.programmatic.get() {
            trace!("suppressing change notification during programmatic update");
            return false;
        }
        self.sender.send(markup).is_ok()
    }
}

/// Receiving half of the change channel, held by the controller
#[derive(Debug)]
pub struct ChangeChannel {
    receiver: mpsc::Receiver<String>,
    programmatic: Rc<Cell<bool>>,
}

pub fn change_channel() -> (ChangeNotifier, ChangeChannel) {
    let (sender, receiver) = mpsc::channel();
    let programmatic = Rc::new(Cell::new(false));
    (
        ChangeNotifier {
            sender,
            programmatic: Rc::clone(&programmatic),
        },
        ChangeChannel {
            receiver,
            programmatic,
        },
    )
}

impl ChangeChannel {
    /// Mark a programmatic update as in flight until the guard drops
    pub fn begin_programmatic(&self) -> ProgrammaticUpdate<'_> {
        let previous = self.programmatic.replace(true);
        ProgrammaticUpdate {
            flag: &self.programmatic,
            previous,
        }
    }

    pub fn is_programmatic(&self) -> bool {
        self.programmatic.get()
    }

    /// Drain pending notifications, returning the most recent serialization
    pub fn latest(&self) -> Option<String> {
        self.receiver.try_iter().last()
    }
}

/// Guard returned by [`ChangeChannel::begin_programmatic`]
#[derive(Debug)]
pub struct ProgrammaticUpdate<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl Drop for ProgrammaticUpdate<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Image node of the rich tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNode {
    /// Reference the view renders; derived from `original_src`
    pub display_src: String,
    /// Reference as written in the markup; the only one serialized
    pub original_src: String,
    pub alt: Option<String>,
}

impl ImageNode {
    pub fn new(original_src: impl Into<String>, alt: Option<String>, bridge: &dyn DisplayBridge) -> Self {
        let original_src = original_src.into();
        Self {
            display_src: resolve_for_display(&original_src, bridge),
            original_src,
            alt,
        }
    }
}

/// Node of the rich view's tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichNode {
    /// Container; `shell` is the AST node with its children removed
    Element { shell: Node, children: Vec<RichNode> },
    Image(ImageNode),
    /// Leaf, or a table kept whole
    Leaf(Node),
}

impl RichNode {
    pub fn from_ast(node: Node, bridge: &dyn DisplayBridge) -> Self {
        match node {
            Node::Image { url, alt } => RichNode::Image(ImageNode::new(url, alt, bridge)),
            mut node => {
                let children = node.children_mut().map(std::mem::take);
                match children {
                    Some(children) => RichNode::Element {
                        shell: node,
                        children: children
                            .into_iter()
                            .map(|child| RichNode::from_ast(child, bridge))
                            .collect(),
                    },
                    None => RichNode::Leaf(node),
                }
            }
        }
    }

    pub fn to_ast(&self) -> Node {
        match self {
            RichNode::Element { shell, children } => {
                let mut node = shell.clone();
                if let Some(slot) = node.children_mut() {
                    *slot = children.iter().map(RichNode::to_ast).collect();
                }
                node
            }
            RichNode::Image(image) => Node::Image {
                url: image.original_src.clone(),
                alt: image.alt.clone(),
            },
            RichNode::Leaf(node) => node.clone(),
        }
    }

    fn collect_images<'a>(&'a self, images: &mut Vec<&'a ImageNode>) {
        match self {
            RichNode::Element { children, .. } => {
                for child in children {
                    child.collect_images(images);
                }
            }
            RichNode::Image(image) => images.push(image),
            RichNode::Leaf(_) => {}
        }
    }
}

/// Transient cursor state that only the rich view holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

/// In-memory structured view
pub struct StructuredView {
    blocks: Vec<RichNode>,
    bridge: Box<dyn DisplayBridge>,
    notifier: Option<ChangeNotifier>,
    serializer_ready: bool,
    selection: Option<Selection>,
}

impl StructuredView {
    pub fn new(bridge: impl DisplayBridge + 'static) -> Self {
        Self {
            blocks: Vec::new(),
            bridge: Box::new(bridge),
            notifier: None,
            serializer_ready: true,
            selection: None,
        }
    }

    /// A view whose markup serializer has not finished initializing
    pub fn uninitialized(bridge: impl DisplayBridge + 'static) -> Self {
        Self {
            serializer_ready: false,
            ..Self::new(bridge)
        }
    }

    pub fn initialize(&mut self) {
        self.serializer_ready = true;
    }

    pub fn blocks(&self) -> &[RichNode] {
        &self.blocks
    }

    pub fn to_ast(&self) -> Node {
        Node::root(self.blocks.iter().map(RichNode::to_ast).collect())
    }

    pub fn images(&self) -> Vec<&ImageNode> {
        let mut images = Vec::new();
        for block in &self.blocks {
            block.collect_images(&mut images);
        }
        images
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    /// Apply a user edit to the tree and report it
    pub fn apply_edit(&mut self, edit: impl FnOnce(&mut Vec<RichNode>)) {
        edit(&mut self.blocks);
        self.emit_change();
    }

    /// Insert an image paragraph at the end of the document (user edit)
    pub fn insert_image(&mut self, original_src: &str, alt: Option<String>) {
        let image = RichNode::Image(ImageNode::new(original_src, alt, self.bridge.as_ref()));
        self.apply_edit(|blocks| {
            blocks.push(RichNode::Element {
                shell: Node::paragraph(Vec::new()),
                children: vec![image],
            })
        });
    }

    fn emit_change(&self) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        match self.serialize_to_markup() {
            Ok(markup) => {
                notifier.notify(markup);
            }
            Err(err) => trace!(error = %err, "edit not reported, serializer unavailable"),
        }
    }
}

impl Default for StructuredView {
    fn default() -> Self {
        Self::new(AssetProtocol::default())
    }
}

impl RichView for StructuredView {
    fn serialize_to_markup(&self) -> Result<String> {
        if !self.serializer_ready {
            return Err(SyncError::SerializationUnavailable(
                "markdown serializer not initialized".to_string(),
            ));
        }
        Ok(serialize_markdown(&self.to_ast()))
    }

    fn replace_content(&mut self, markup: &str) {
        let doc = parse_markdown(markup);
        let children = match doc {
            Node::Root { children } => children,
            other => vec![other],
        };
        self.blocks = children
            .into_iter()
            .map(|node| RichNode::from_ast(node, self.bridge.as_ref()))
            .collect();
        self.selection = None;
        // Widgets report their own replacements; the controller's guard drops it.
        self.emit_change();
    }

    fn set_change_notifier(&mut self, notifier: ChangeNotifier) {
        self.notifier = Some(notifier);
    }
}
