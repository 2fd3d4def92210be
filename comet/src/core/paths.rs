//! Loading system modules from a namespace tree.
//!
//! Hosts that discover plugin code at runtime expose it as a tree of folders and modules. Each
//! [`Module`] carries a loader that declares its systems on the app, so a plugin can pull in a
//! whole folder with [`App::add_paths`](crate::core::App::add_paths) instead of listing every
//! declaration by hand.

use std::fmt;

use crate::core::{app::App, error::Result};

type Loader = Box<dyn Fn(&App) -> Result<()> + Send + Sync>;

/// A loadable unit of plugin code.
pub struct Module {
    name: String,
    load: Loader,
}

impl Module {
    pub fn new<F>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn(&App) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            load: Box::new(load),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the module's loader against `app`.
    pub fn load(&self, app: &App) -> Result<()> {
        (self.load)(app)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module").field("name", &self.name).finish()
    }
}

/// An entry in the namespace tree.
#[derive(Debug)]
pub enum Node {
    Folder { name: String, children: Vec<Node> },
    Module(Module),
}

impl Node {
    /// A folder with the given children.
    pub fn folder(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Folder {
            name: name.into(),
            children,
        }
    }

    /// A module leaf.
    pub fn module<F>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn(&App) -> Result<()> + Send + Sync + 'static,
    {
        Node::Module(Module::new(name, load))
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder { name, .. } => name,
            Node::Module(module) => module.name(),
        }
    }

    /// Direct children of a folder. Modules have none.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Folder { children, .. } => children,
            Node::Module(_) => &[],
        }
    }

    /// The modules directly inside this folder, or every module below it when `recursive`.
    ///
    /// Modules are yielded depth first, in child order.
    pub fn modules(&self, recursive: bool) -> Vec<&Module> {
        let mut modules = Vec::new();
        collect(self.children(), recursive, &mut modules);
        modules
    }
}

fn collect<'a>(nodes: &'a [Node], recursive: bool, out: &mut Vec<&'a Module>) {
    for node in nodes {
        match node {
            Node::Module(module) => out.push(module),
            Node::Folder { children, .. } if recursive => collect(children, recursive, out),
            Node::Folder { .. } => {}
        }
    }
}
