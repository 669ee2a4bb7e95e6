#![forbid(unsafe_code)]

//! Window sets: one binary split tree of windows.
//!
//! # Design
//!
//! Nodes live in an arena keyed by [`NodeId`]. A node is either a leaf holding
//! a [`WindowId`] or a split with an axis, a weight ratio and two children.
//! Parent links are plain ids, so restructuring never leaves a dangling
//! reference: a deleted node is simply absent from the arena.
//!
//! ## Invariants
//!
//! 1. The root has no parent; every other node's parent is the split that
//!    lists it as a child.
//! 2. Every split has exactly two children.
//! 3. Leaves and windows are in bijection, and each window's rectangle equals
//!    its leaf's rectangle.
//! 4. A vertical split's children stack top to bottom and exactly cover its
//!    rectangle. A horizontal split's children sit side by side with one
//!    divider column between them.
//! 5. The selected node is always a leaf.
//!
//! [`WindowSet::validate`] checks all of these.
//!
//! ## Failure Modes
//!
//! Refused operations return a [`LayoutError`] and leave the tree untouched:
//! all checks happen before the first mutation.
//!
//! # Example
//!
//! ```
//! use paned_core::{HeadlessSurface, Rect};
//! use paned_layout::{BufferId, LayoutConfig, WindowIdAllocator, WindowSet, WindowState};
//!
//! let mut surface = HeadlessSurface::new(25, 80);
//! let mut ids = WindowIdAllocator::default();
//! let mut set = WindowSet::new(
//!     Rect::from_size(80, 24),
//!     BufferId(1),
//!     WindowState::new(),
//!     LayoutConfig::default(),
//!     &mut ids,
//!     &mut surface,
//! );
//! let new_window = set.split_below(&WindowState::new(), &mut ids, &mut surface).unwrap();
//! assert_eq!(set.window(new_window).unwrap().rect().height, 12);
//! ```

use std::collections::BTreeMap;

use paned_core::geometry::Rect;
use paned_core::surface::ScreenSurface;

use crate::error::LayoutError;
use crate::window::{BufferId, Window, WindowId, WindowIdAllocator, WindowState};

/// Identifier of a node in a window set's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    const MIN: Self = Self(1);

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Orientation of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitAxis {
    /// Children side by side, separated by a divider column.
    Horizontal,
    /// Children stacked top to bottom.
    Vertical,
}

/// Weight pair `first:second` between split children, stored reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRatio {
    first: u32,
    second: u32,
}

impl SplitRatio {
    /// Create a ratio; zero weights are bumped to one.
    pub fn new(first: u32, second: u32) -> Self {
        let (first, second) = (first.max(1), second.max(1));
        let gcd = gcd_u32(first, second);
        Self {
            first: first / gcd,
            second: second / gcd,
        }
    }

    /// The first child's share as `(numerator, denominator)`.
    pub const fn fraction(self) -> (u64, u64) {
        (self.first as u64, self.first as u64 + self.second as u64)
    }
}

impl Default for SplitRatio {
    fn default() -> Self {
        Self {
            first: 1,
            second: 1,
        }
    }
}

fn gcd_u32(mut left: u32, mut right: u32) -> u32 {
    while right != 0 {
        let rem = left % right;
        left = right;
        right = rem;
    }
    left.max(1)
}

/// Minimum window size and split defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Minimum window height, mode line included.
    pub min_rows: u16,
    /// Minimum window width.
    pub min_cols: u16,
    /// Ratio used by `split_below` and `split_right`.
    pub ratio: SplitRatio,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_rows: 4,
            min_cols: 20,
            ratio: SplitRatio::default(),
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn with_min_size(mut self, rows: u16, cols: u16) -> Self {
        self.min_rows = rows;
        self.min_cols = cols;
        self
    }

    #[must_use]
    pub fn with_ratio(mut self, ratio: SplitRatio) -> Self {
        self.ratio = ratio;
        self
    }
}

/// A split node's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub axis: SplitAxis,
    pub ratio: SplitRatio,
    pub first: NodeId,
    pub second: NodeId,
}

impl Split {
    fn child(&self, side: Side) -> NodeId {
        match side {
            Side::First => self.first,
            Side::Second => self.second,
        }
    }
}

/// Node payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(WindowId),
    Split(Split),
}

/// One arena entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub rect: Rect,
    pub kind: NodeKind,
}

/// A vertical divider line drawn between side-by-side children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divider {
    pub x: u16,
    pub y: u16,
    pub height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Direction for selection moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    fn walk(self) -> (Side, Option<SplitAxis>) {
        match self {
            Self::Left => (Side::First, Some(SplitAxis::Horizontal)),
            Self::Right => (Side::Second, Some(SplitAxis::Horizontal)),
            Self::Up => (Side::First, Some(SplitAxis::Vertical)),
            Self::Down => (Side::Second, Some(SplitAxis::Vertical)),
        }
    }
}

// ---------------------------------------------------------------------------
// WindowSet
// ---------------------------------------------------------------------------

/// One independent layout tree with its own selected window.
#[derive(Debug, Clone)]
pub struct WindowSet {
    config: LayoutConfig,
    root: NodeId,
    next_node: NodeId,
    nodes: BTreeMap<NodeId, NodeRecord>,
    windows: BTreeMap<WindowId, Window>,
    leaves: BTreeMap<WindowId, NodeId>,
    selected: NodeId,
}

impl WindowSet {
    /// Create a set holding one window that fills `area`.
    pub fn new(
        area: Rect,
        buffer: BufferId,
        state: WindowState,
        config: LayoutConfig,
        ids: &mut WindowIdAllocator,
        surface: &mut dyn ScreenSurface,
    ) -> Self {
        let root = NodeId::MIN;
        let window_id = ids.allocate();
        let region = surface.create_region(area);
        let window = Window::new(window_id, area, region, buffer, state);
        let record = NodeRecord {
            id: root,
            parent: None,
            rect: area,
            kind: NodeKind::Leaf(window_id),
        };
        Self {
            config,
            root,
            next_node: root.next(),
            nodes: BTreeMap::from([(root, record)]),
            windows: BTreeMap::from([(window_id, window)]),
            leaves: BTreeMap::from([(window_id, root)]),
            selected: root,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The rectangle the whole tree tiles.
    pub fn area(&self) -> Rect {
        self.nodes.get(&self.root).map(|node| node.rect).unwrap_or_default()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(&id)
    }

    pub fn contains_window(&self, id: WindowId) -> bool {
        self.windows.contains_key(&id)
    }

    /// Windows in tree order (first child before second).
    pub fn windows(&self) -> impl Iterator<Item = &Window> + '_ {
        self.leaf_order()
            .into_iter()
            .filter_map(|node| match self.nodes.get(&node)?.kind {
                NodeKind::Leaf(window) => self.windows.get(&window),
                NodeKind::Split(_) => None,
            })
    }

    pub fn selected_node(&self) -> NodeId {
        self.selected
    }

    /// The selected window's id.
    pub fn selected_window_id(&self) -> WindowId {
        match self.nodes.get(&self.selected).map(|node| node.kind) {
            Some(NodeKind::Leaf(window)) => window,
            // Unreachable for a valid tree; see `validate`.
            _ => self.windows.keys().next().copied().unwrap_or(WindowId(0)),
        }
    }

    pub fn selected_window(&self) -> Option<&Window> {
        self.windows.get(&self.selected_window_id())
    }

    pub fn selected_window_mut(&mut self) -> Option<&mut Window> {
        let id = self.selected_window_id();
        self.windows.get_mut(&id)
    }

    // -----------------------------------------------------------------------
    // Structural operations
    // -----------------------------------------------------------------------

    /// Split the selected window below it with the configured ratio.
    pub fn split_below(
        &mut self,
        state: &WindowState,
        ids: &mut WindowIdAllocator,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        self.split(SplitAxis::Vertical, self.config.ratio, state, ids, surface)
    }

    /// Split the selected window to its right with the configured ratio.
    pub fn split_right(
        &mut self,
        state: &WindowState,
        ids: &mut WindowIdAllocator,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        self.split(SplitAxis::Horizontal, self.config.ratio, state, ids, surface)
    }

    /// Split the selected leaf.
    ///
    /// The selected leaf keeps its window (resized) as the first child; the
    /// new second child gets a fresh window on the same buffer whose state is
    /// `state` and becomes selected. Returns the new window's id.
    pub fn split(
        &mut self,
        axis: SplitAxis,
        ratio: SplitRatio,
        state: &WindowState,
        ids: &mut WindowIdAllocator,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        let target = self.selected;
        let (parent, rect, window_id) = match self.nodes.get(&target) {
            Some(NodeRecord {
                parent,
                rect,
                kind: NodeKind::Leaf(window),
                ..
            }) => (*parent, *rect, *window),
            _ => return Err(LayoutError::InvalidTree("selected node is not a leaf".into())),
        };
        let buffer = self
            .windows
            .get(&window_id)
            .map(Window::buffer)
            .ok_or(LayoutError::UnknownWindow(window_id))?;

        let (first_rect, second_rect) = split_rect(rect, axis, ratio);
        let (min_rows, min_cols) = (self.config.min_rows, self.config.min_cols);
        if !first_rect.fits(min_rows, min_cols) || !second_rect.fits(min_rows, min_cols) {
            tracing::debug!(
                rows = rect.height,
                cols = rect.width,
                ?axis,
                "split refused: window too small"
            );
            return Err(LayoutError::TooSmall {
                rows: rect.height,
                cols: rect.width,
            });
        }

        let split_id = self.allocate_node_id();
        let new_leaf = self.allocate_node_id();
        if let Some(parent) = parent {
            self.replace_child(parent, target, split_id)?;
        } else {
            self.root = split_id;
        }
        let new_window = ids.allocate();
        let region = surface.create_region(second_rect);
        self.nodes.insert(
            split_id,
            NodeRecord {
                id: split_id,
                parent,
                rect,
                kind: NodeKind::Split(Split {
                    axis,
                    ratio,
                    first: target,
                    second: new_leaf,
                }),
            },
        );
        self.nodes.insert(
            new_leaf,
            NodeRecord {
                id: new_leaf,
                parent: Some(split_id),
                rect: second_rect,
                kind: NodeKind::Leaf(new_window),
            },
        );
        self.windows.insert(
            new_window,
            Window::new(new_window, second_rect, region, buffer, state.clone()),
        );
        self.leaves.insert(new_window, new_leaf);
        if let Some(node) = self.nodes.get_mut(&target) {
            node.parent = Some(split_id);
        }
        self.layout_node(target, first_rect, surface);
        self.selected = new_leaf;

        tracing::debug!(
            window = window_id.get(),
            new_window = new_window.get(),
            ?axis,
            "split window"
        );
        Ok(new_window)
    }

    /// Delete the selected window and give its space to its sibling.
    ///
    /// Selection moves to the window after the deleted one in tree order.
    /// Returns the newly selected window.
    pub fn delete_selected(
        &mut self,
        surface: &mut dyn ScreenSurface,
    ) -> Result<WindowId, LayoutError> {
        let target = self.selected;
        if target == self.root {
            return Err(LayoutError::CannotDeleteLastWindow);
        }
        let NodeKind::Leaf(window_id) = self.kind(target)? else {
            return Err(LayoutError::InvalidTree("selected node is not a leaf".into()));
        };

        let next = self.neighbour(target, Side::Second, None);
        let (parent_rect, sibling) = self.promote_sibling_after_detach(target)?;
        self.nodes.remove(&target);
        self.leaves.remove(&window_id);
        if let Some(window) = self.windows.remove(&window_id) {
            surface.release_region(window.region());
        }
        self.layout_node(sibling, parent_rect, surface);
        self.selected = next;

        tracing::debug!(window = window_id.get(), "deleted window");
        Ok(self.selected_window_id())
    }

    /// Keep only the selected window, resized to the whole set area.
    ///
    /// Returns the number of windows removed.
    pub fn delete_all_windows(&mut self, surface: &mut dyn ScreenSurface) -> usize {
        let keep = self.selected;
        if keep == self.root {
            return 0;
        }
        let area = self.area();
        let keep_window = self.selected_window_id();
        let removed: Vec<WindowId> = self
            .windows
            .keys()
            .copied()
            .filter(|id| *id != keep_window)
            .collect();
        for id in &removed {
            if let Some(window) = self.windows.remove(id) {
                surface.release_region(window.region());
            }
            self.leaves.remove(id);
        }
        self.nodes.retain(|id, _| *id == keep);
        if let Some(node) = self.nodes.get_mut(&keep) {
            node.parent = None;
        }
        self.root = keep;
        self.layout_node(keep, area, surface);
        removed.len()
    }

    /// Recompute every rectangle from a new set area.
    pub fn resize(&mut self, area: Rect, surface: &mut dyn ScreenSurface) {
        self.layout_node(self.root, area, surface);
    }

    /// Give every window showing `old` the buffer `new`.
    ///
    /// Returns how many windows changed.
    pub fn replace_buffer(&mut self, old: BufferId, new: BufferId, state: &WindowState) -> usize {
        let mut changed = 0;
        for window in self.windows.values_mut() {
            if window.buffer() == old {
                window.set_buffer(new, state);
                changed += 1;
            }
        }
        changed
    }

    /// Release every surface region owned by this set.
    pub fn release_regions(&self, surface: &mut dyn ScreenSurface) {
        for window in self.windows.values() {
            surface.release_region(window.region());
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Select the leaf holding `window`.
    pub fn select_window(&mut self, window: WindowId) -> Result<(), LayoutError> {
        let leaf = *self
            .leaves
            .get(&window)
            .ok_or(LayoutError::UnknownWindow(window))?;
        self.selected = leaf;
        Ok(())
    }

    /// Select the next window in tree order, wrapping around.
    pub fn select_next_window(&mut self) -> WindowId {
        self.selected = self.neighbour(self.selected, Side::Second, None);
        self.selected_window_id()
    }

    /// Select the previous window in tree order, wrapping around.
    pub fn select_previous_window(&mut self) -> WindowId {
        self.selected = self.neighbour(self.selected, Side::First, None);
        self.selected_window_id()
    }

    /// Select the nearest window in `direction`, wrapping around.
    pub fn select_direction(&mut self, direction: Direction) -> WindowId {
        let (toward, axis) = direction.walk();
        self.selected = self.neighbour(self.selected, toward, axis);
        self.selected_window_id()
    }

    /// First window (in tree order) matching `predicate`.
    pub fn find_window(&self, mut predicate: impl FnMut(&Window) -> bool) -> Option<WindowId> {
        self.windows().find(|window| predicate(window)).map(Window::id)
    }

    /// Divider columns between side-by-side children.
    pub fn dividers(&self) -> Vec<Divider> {
        self.nodes
            .values()
            .filter_map(|node| match node.kind {
                NodeKind::Split(split) if split.axis == SplitAxis::Horizontal => {
                    let first = self.nodes.get(&split.first)?;
                    Some(Divider {
                        x: first.rect.right(),
                        y: node.rect.y,
                        height: node.rect.height,
                    })
                }
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check every structural invariant of the tree.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let bad = |detail: String| -> Result<(), LayoutError> {
            Err(LayoutError::InvalidTree(detail))
        };

        let Some(root) = self.nodes.get(&self.root) else {
            return bad(format!("root {:?} missing", self.root));
        };
        if root.parent.is_some() {
            return bad("root has a parent".into());
        }

        let mut reachable = 0usize;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            reachable += 1;
            let Some(node) = self.nodes.get(&id) else {
                return bad(format!("node {id:?} missing"));
            };
            match node.kind {
                NodeKind::Leaf(window_id) => {
                    let Some(window) = self.windows.get(&window_id) else {
                        return bad(format!("leaf {id:?} has no window"));
                    };
                    if window.rect() != node.rect {
                        return bad(format!("window {} rect differs from leaf", window_id.get()));
                    }
                    if self.leaves.get(&window_id) != Some(&id) {
                        return bad(format!("window {} index is stale", window_id.get()));
                    }
                }
                NodeKind::Split(split) => {
                    let (Some(first), Some(second)) =
                        (self.nodes.get(&split.first), self.nodes.get(&split.second))
                    else {
                        return bad(format!("split {id:?} is missing a child"));
                    };
                    if first.parent != Some(id) || second.parent != Some(id) {
                        return bad(format!("split {id:?} children have wrong parent"));
                    }
                    if !tiles(node.rect, first.rect, second.rect, split.axis) {
                        return bad(format!("split {id:?} children do not tile its rectangle"));
                    }
                    stack.push(split.first);
                    stack.push(split.second);
                }
            }
        }

        if reachable != self.nodes.len() {
            return bad(format!(
                "{} nodes reachable, {} in arena",
                reachable,
                self.nodes.len()
            ));
        }
        if self.windows.len() != self.leaves.len() {
            return bad("window and leaf counts differ".into());
        }
        if !matches!(self.kind(self.selected), Ok(NodeKind::Leaf(_))) {
            return bad("selected node is not a leaf".into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn kind(&self, id: NodeId) -> Result<NodeKind, LayoutError> {
        self.nodes
            .get(&id)
            .map(|node| node.kind)
            .ok_or_else(|| LayoutError::InvalidTree(format!("node {id:?} missing")))
    }

    fn allocate_node_id(&mut self) -> NodeId {
        let current = self.next_node;
        self.next_node = current.next();
        current
    }

    /// Leaf ids in tree order.
    fn leaf_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.windows.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes.get(&id).map(|node| node.kind) {
                Some(NodeKind::Leaf(_)) => out.push(id),
                Some(NodeKind::Split(split)) => {
                    stack.push(split.second);
                    stack.push(split.first);
                }
                None => {}
            }
        }
        out
    }

    /// Follow `side` children down to a leaf.
    fn descend(&self, mut id: NodeId, side: Side) -> NodeId {
        while let Some(NodeKind::Split(split)) = self.nodes.get(&id).map(|node| node.kind) {
            id = split.child(side);
        }
        id
    }

    /// The leaf next to `from` when moving toward `toward`.
    ///
    /// Climbs while `from` sits on the `toward` side of its parent (or the
    /// parent's axis does not match), crosses to the sibling, then descends
    /// along the opposite side. Reaching the root wraps to the far end.
    fn neighbour(&self, from: NodeId, toward: Side, axis: Option<SplitAxis>) -> NodeId {
        let away = toward.opposite();
        let mut current = from;
        loop {
            let Some(parent) = self.nodes.get(&current).and_then(|node| node.parent) else {
                break;
            };
            if let Some(NodeKind::Split(split)) = self.nodes.get(&parent).map(|node| node.kind) {
                let axis_matches = axis.is_none_or(|axis| axis == split.axis);
                if split.child(away) == current && axis_matches {
                    current = split.child(toward);
                    break;
                }
            }
            current = parent;
        }
        self.descend(current, away)
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), LayoutError> {
        let Some(NodeRecord {
            kind: NodeKind::Split(split),
            ..
        }) = self.nodes.get_mut(&parent)
        else {
            return Err(LayoutError::InvalidTree(format!("{parent:?} is not a split")));
        };
        if split.first == old {
            split.first = new;
        } else if split.second == old {
            split.second = new;
        } else {
            return Err(LayoutError::InvalidTree(format!(
                "{parent:?} does not reference {old:?}"
            )));
        }
        Ok(())
    }

    /// Splice `detached`'s parent out of the tree, moving the sibling into its
    /// place. Returns the freed rectangle and the sibling.
    fn promote_sibling_after_detach(
        &mut self,
        detached: NodeId,
    ) -> Result<(Rect, NodeId), LayoutError> {
        let parent_id = self
            .nodes
            .get(&detached)
            .and_then(|node| node.parent)
            .ok_or(LayoutError::CannotDeleteLastWindow)?;
        let Some(NodeRecord {
            parent: grandparent,
            rect,
            kind: NodeKind::Split(split),
            ..
        }) = self.nodes.get(&parent_id).cloned()
        else {
            return Err(LayoutError::InvalidTree(format!("{parent_id:?} is not a split")));
        };
        let sibling = if split.first == detached {
            split.second
        } else {
            split.first
        };

        if let Some(grandparent) = grandparent {
            self.replace_child(grandparent, parent_id, sibling)?;
        } else {
            self.root = sibling;
        }
        if let Some(node) = self.nodes.get_mut(&sibling) {
            node.parent = grandparent;
        }
        self.nodes.remove(&parent_id);
        Ok((rect, sibling))
    }

    /// Assign `rect` to `id` and recompute its subtree top-down.
    fn layout_node(&mut self, id: NodeId, rect: Rect, surface: &mut dyn ScreenSurface) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.rect = rect;
        match node.kind {
            NodeKind::Leaf(window_id) => {
                if let Some(window) = self.windows.get_mut(&window_id) {
                    window.set_rect(rect);
                    surface.resize_region(window.region(), rect);
                }
            }
            NodeKind::Split(split) => {
                let (first, second) = split_rect(rect, split.axis, split.ratio);
                self.layout_node(split.first, first, surface);
                self.layout_node(split.second, second, surface);
            }
        }
    }
}

fn split_rect(rect: Rect, axis: SplitAxis, ratio: SplitRatio) -> (Rect, Rect) {
    let (num, den) = ratio.fraction();
    match axis {
        SplitAxis::Vertical => rect.split_rows(num, den),
        SplitAxis::Horizontal => rect.split_cols(num, den),
    }
}

fn tiles(parent: Rect, first: Rect, second: Rect, axis: SplitAxis) -> bool {
    match axis {
        SplitAxis::Vertical => {
            first.x == parent.x
                && second.x == parent.x
                && first.width == parent.width
                && second.width == parent.width
                && first.y == parent.y
                && second.y == first.bottom()
                && first.height + second.height == parent.height
        }
        SplitAxis::Horizontal => {
            parent.width == 0
                || (first.y == parent.y
                    && second.y == parent.y
                    && first.height == parent.height
                    && second.height == parent.height
                    && first.x == parent.x
                    && second.x == first.right() + 1
                    && first.width + 1 + second.width == parent.width)
        }
    }
}
