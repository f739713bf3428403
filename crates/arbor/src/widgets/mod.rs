//! Built-in widgets.
//!
//! Leaf widgets ([`text`], [`edit`], [`solid_fill`]) draw content.
//! Decorations ([`filler`], [`padding`], [`attr_map`]) wrap a single
//! widget. Containers ([`pile`], [`columns`], [`overlay`], [`frame`],
//! [`listbox`]) arrange several and route input to the one in focus.

/// Attribute remapping decoration.
pub mod attr_map;
/// Side-by-side container.
pub mod columns;
/// The container contract and child lists.
pub mod container;
/// Text editor.
pub mod edit;
/// Vertical fill and box-to-flow adapters.
pub mod filler;
/// Header, body and footer.
pub mod frame;
/// Scrolling list.
pub mod listbox;
/// One widget over another.
pub mod overlay;
/// Horizontal padding.
pub mod padding;
/// Vertical stack.
pub mod pile;
/// Solid fills and dividers.
pub mod solid_fill;
/// Static text.
pub mod text;
/// List box content sources.
pub mod walker;

pub use attr_map::AttrMap;
pub use columns::{ColumnOptions, Columns};
pub use container::{Container, Contents};
pub use edit::{Edit, EditSignal};
pub use filler::{BoxAdapter, Filler};
pub use frame::{Frame, FramePart};
pub use listbox::{ComingFrom, Ends, FocusValign, ListBox};
pub use overlay::{Overlay, OverlayOptions};
pub use padding::Padding;
pub use pile::{Extent, Pile};
pub use solid_fill::{Divider, SolidFill};
pub use text::Text;
pub use walker::{ListWalker, SimpleFocusListWalker, SimpleListWalker, WalkerSignal};
