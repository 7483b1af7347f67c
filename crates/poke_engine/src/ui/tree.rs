use crate::render::resources::FontData;
use crate::ui::widget::validate_height_percent;
use crate::ui::{layout_text, Anchor, GlyphQuad, LayoutRect, UiError, WidgetBuilder, WidgetId, WidgetNode, WidgetPayload};
use slotmap::{SecondaryMap, SlotMap};
use std::collections::HashMap;

/// Arena-backed widget tree
///
/// Widgets are inserted detached, then attached as roots or children. A
/// widget has at most one parent and removing it drops its whole subtree.
/// Layout results are only available for attached widgets after
/// [`resolve`](Self::resolve).
#[derive(Debug, Clone)]
pub struct UiTree {
    nodes: SlotMap<WidgetId, WidgetNode>,
    roots: Vec<WidgetId>,
    layouts: SecondaryMap<WidgetId, LayoutRect>,
    viewport: LayoutRect,
}

impl UiTree {
    /// Create an empty tree for a viewport
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            layouts: SecondaryMap::new(),
            viewport: LayoutRect::viewport(viewport_width, viewport_height),
        }
    }

    /// Validate and store a detached widget
    pub fn insert(&mut self, builder: WidgetBuilder) -> Result<WidgetId, UiError> {
        let node = builder.build()?;
        Ok(self.nodes.insert(node))
    }

    /// Attach a detached widget as a new root
    pub fn add_root(&mut self, id: WidgetId) -> Result<(), UiError> {
        self.ensure_detached(id)?;
        self.roots.push(id);
        self.mark_dirty(id);
        Ok(())
    }

    /// Attach a detached widget as the last child of `parent`
    pub fn attach(&mut self, parent: WidgetId, child: WidgetId) -> Result<(), UiError> {
        if !self.nodes.contains_key(parent) {
            return Err(UiError::UnknownWidget);
        }
        self.ensure_detached(child)?;
        if self.ancestors_and_self(parent).any(|id| id == child) {
            return Err(UiError::WouldCreateCycle);
        }

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.dirty = true;
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Detach a widget from its parent or the root list, keeping its subtree
    pub fn detach(&mut self, id: WidgetId) -> Result<(), UiError> {
        let parent = self.nodes.get(id).ok_or(UiError::UnknownWidget)?.parent;

        match parent {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        for node_id in self.subtree(id) {
            self.layouts.remove(node_id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
            node.dirty = true;
        }
        Ok(())
    }

    /// Remove a widget and its whole subtree
    pub fn remove(&mut self, id: WidgetId) -> Result<(), UiError> {
        self.detach(id)?;
        for node_id in self.subtree(id) {
            self.nodes.remove(node_id);
            self.layouts.remove(node_id);
        }
        Ok(())
    }

    /// Look up a widget
    pub fn get(&self, id: WidgetId) -> Option<&WidgetNode> {
        self.nodes.get(id)
    }

    /// Change a widget's height percent
    pub fn set_height_percent(&mut self, id: WidgetId, percent: f32) -> Result<(), UiError> {
        validate_height_percent(percent)?;
        let node = self.nodes.get_mut(id).ok_or(UiError::UnknownWidget)?;
        node.height_percent = percent;
        node.dirty = true;
        Ok(())
    }

    /// Change a widget's anchor
    pub fn set_anchor(&mut self, id: WidgetId, anchor: Anchor) -> Result<(), UiError> {
        let node = self.nodes.get_mut(id).ok_or(UiError::UnknownWidget)?;
        node.anchor = anchor;
        node.dirty = true;
        Ok(())
    }

    /// Replace the text of a text widget
    pub fn set_text(&mut self, id: WidgetId, text: impl Into<String>) -> Result<(), UiError> {
        let node = self.nodes.get_mut(id).ok_or(UiError::UnknownWidget)?;
        match &mut node.payload {
            Some(WidgetPayload::Text(content)) => content.text = text.into(),
            _ => return Err(UiError::NotText),
        }
        node.dirty = true;
        Ok(())
    }

    /// Change the viewport the roots resolve against
    pub fn resize(&mut self, viewport_width: f32, viewport_height: f32) {
        self.viewport = LayoutRect::viewport(viewport_width, viewport_height);
        let roots = self.roots.clone();
        for root in roots {
            self.mark_dirty(root);
        }
    }

    /// Viewport box
    pub fn viewport(&self) -> LayoutRect {
        self.viewport
    }

    /// Whether any attached widget changed since the last resolve
    pub fn needs_resolve(&self) -> bool {
        self.walk()
            .into_iter()
            .any(|id| self.nodes.get(id).is_some_and(|n| n.dirty))
    }

    /// Re-resolve every changed widget and everything below it
    ///
    /// Runs parent before child in one pass. Returns the number of widgets
    /// whose placement was recomputed.
    pub fn resolve(&mut self) -> usize {
        let mut resolved = 0;
        let mut stack: Vec<(WidgetId, LayoutRect, bool)> =
            self.roots.iter().rev().map(|root| (*root, self.viewport, false)).collect();

        while let Some((id, parent_rect, forced)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else { continue };

            let recompute = forced || node.dirty || !self.layouts.contains_key(id);
            let rect = if recompute {
                let height = node.height_percent * parent_rect.height;
                let width = height / node.aspect_ratio;
                let rect = parent_rect.place(node.anchor, width, height);
                node.dirty = false;
                self.layouts.insert(id, rect);
                resolved += 1;
                rect
            } else {
                self.layouts[id]
            };

            for child in node.children.iter().rev() {
                stack.push((*child, rect, recompute));
            }
        }

        resolved
    }

    /// Last resolved box of a widget
    pub fn layout(&self, id: WidgetId) -> Option<LayoutRect> {
        self.layouts.get(id).copied()
    }

    /// Attached widgets in pre-order, parents before children
    pub fn walk(&self) -> Vec<WidgetId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<WidgetId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }

        order
    }

    /// Root widgets in order
    pub fn roots(&self) -> &[WidgetId] {
        &self.roots
    }

    /// Glyph quads of a resolved text widget
    ///
    /// `None` when the widget is not text, not resolved, or its font is not loaded.
    pub fn text_quads(&self, id: WidgetId, fonts: &HashMap<String, FontData>) -> Option<Vec<GlyphQuad>> {
        let content = self.nodes.get(id)?.text()?;
        let bounds = self.layouts.get(id)?;
        let font = fonts.get(&content.font)?;
        Some(layout_text(bounds, content, font))
    }

    /// Number of widgets, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no widgets
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn ensure_detached(&self, id: WidgetId) -> Result<(), UiError> {
        let node = self.nodes.get(id).ok_or(UiError::UnknownWidget)?;
        if node.parent.is_some() || self.roots.contains(&id) {
            return Err(UiError::AlreadyAttached);
        }
        Ok(())
    }

    fn mark_dirty(&mut self, id: WidgetId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.dirty = true;
        }
    }

    fn ancestors_and_self(&self, id: WidgetId) -> impl Iterator<Item = WidgetId> + '_ {
        std::iter::successors(Some(id), move |current| self.nodes.get(*current).and_then(|n| n.parent))
    }

    fn subtree(&self, id: WidgetId) -> Vec<WidgetId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                ids.push(current);
                stack.extend(node.children.iter().copied());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::device::TextureHandle;
    use crate::render::resources::GlyphMetrics;
    use crate::ui::TextContent;
    use approx::assert_relative_eq;

    fn tree() -> UiTree {
        UiTree::new(1200.0, 640.0)
    }

    fn widget(tree: &mut UiTree, percent: f32, anchor: Anchor) -> WidgetId {
        tree.insert(WidgetBuilder::container().height_percent(percent).anchor(anchor))
            .unwrap()
    }

    #[test]
    fn test_half_of_400px_parent_is_200px() {
        let mut ui = tree();
        let panel = widget(&mut ui, 0.625, Anchor::MiddleMiddle);
        ui.add_root(panel).unwrap();

        let before = widget(&mut ui, 0.2, Anchor::TopLeft);
        let target = widget(&mut ui, 0.5, Anchor::BottomRight);
        ui.attach(panel, before).unwrap();
        ui.attach(panel, target).unwrap();
        ui.resolve();

        assert_relative_eq!(ui.layout(panel).unwrap().height, 400.0);
        assert_relative_eq!(ui.layout(target).unwrap().height, 200.0);

        // sibling count and order do not matter
        ui.remove(before).unwrap();
        let after = widget(&mut ui, 0.9, Anchor::TopRight);
        ui.attach(panel, after).unwrap();
        ui.resolve();
        assert_relative_eq!(ui.layout(target).unwrap().height, 200.0);
    }

    #[test]
    fn test_width_from_aspect_ratio() {
        let mut ui = tree();
        let id = ui
            .insert(WidgetBuilder::container().height_percent(0.5).aspect_ratio(0.5))
            .unwrap();
        ui.add_root(id).unwrap();
        ui.resolve();

        let rect = ui.layout(id).unwrap();
        assert_relative_eq!(rect.height, 320.0);
        assert_relative_eq!(rect.width, 640.0);
        assert_relative_eq!(rect.x, 280.0);
        assert_relative_eq!(rect.y, 160.0);
    }

    #[test]
    fn test_child_placed_inside_parent_box() {
        let mut ui = tree();
        let panel = widget(&mut ui, 0.5, Anchor::TopRight);
        let icon = widget(&mut ui, 0.25, Anchor::BottomLeft);
        ui.add_root(panel).unwrap();
        ui.attach(panel, icon).unwrap();
        ui.resolve();

        // panel: 320x320 at (880, 320)
        let rect = ui.layout(icon).unwrap();
        assert_relative_eq!(rect.x, 880.0);
        assert_relative_eq!(rect.y, 320.0);
        assert_relative_eq!(rect.height, 80.0);
    }

    #[test]
    fn test_attach_rules() {
        let mut ui = tree();
        let a = widget(&mut ui, 1.0, Anchor::MiddleMiddle);
        let b = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        let c = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        ui.add_root(a).unwrap();
        ui.attach(a, b).unwrap();

        assert_eq!(ui.attach(c, b), Err(UiError::AlreadyAttached));
        assert_eq!(ui.add_root(a), Err(UiError::AlreadyAttached));

        // c is detached with b's old subtree under it
        ui.attach(b, c).unwrap();
        ui.detach(b).unwrap();
        assert_eq!(ui.attach(c, b), Err(UiError::WouldCreateCycle));
        assert_eq!(ui.attach(b, b), Err(UiError::WouldCreateCycle));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut ui = tree();
        let root = widget(&mut ui, 1.0, Anchor::MiddleMiddle);
        let child = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        let grandchild = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        ui.add_root(root).unwrap();
        ui.attach(root, child).unwrap();
        ui.attach(child, grandchild).unwrap();
        ui.resolve();

        ui.remove(child).unwrap();
        assert!(ui.get(child).is_none());
        assert!(ui.get(grandchild).is_none());
        assert!(ui.layout(grandchild).is_none());
        assert!(ui.get(root).unwrap().children.is_empty());
        assert_eq!(ui.len(), 1);
        assert_eq!(ui.remove(child), Err(UiError::UnknownWidget));
    }

    #[test]
    fn test_detached_widget_has_no_layout() {
        let mut ui = tree();
        let id = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        ui.resolve();
        assert!(ui.layout(id).is_none());

        ui.add_root(id).unwrap();
        ui.resolve();
        assert!(ui.layout(id).is_some());

        ui.detach(id).unwrap();
        assert!(ui.layout(id).is_none());
        assert!(ui.walk().is_empty());
    }

    #[test]
    fn test_changes_resolve_only_dirty_subtrees() {
        let mut ui = tree();
        let left = widget(&mut ui, 0.5, Anchor::MiddleLeft);
        let right = widget(&mut ui, 0.5, Anchor::MiddleRight);
        let right_child = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        ui.add_root(left).unwrap();
        ui.add_root(right).unwrap();
        ui.attach(right, right_child).unwrap();
        assert_eq!(ui.resolve(), 3);
        assert_eq!(ui.resolve(), 0);
        assert!(!ui.needs_resolve());

        ui.set_height_percent(right, 1.0).unwrap();
        assert!(ui.needs_resolve());
        assert_eq!(ui.resolve(), 2);
        assert_relative_eq!(ui.layout(right_child).unwrap().height, 320.0);

        ui.set_anchor(left, Anchor::TopLeft).unwrap();
        assert_eq!(ui.resolve(), 1);
        assert_relative_eq!(ui.layout(left).unwrap().y, 320.0);
    }

    #[test]
    fn test_resize_re_resolves_everything() {
        let mut ui = tree();
        let root = widget(&mut ui, 0.5, Anchor::BottomLeft);
        let child = widget(&mut ui, 0.5, Anchor::BottomLeft);
        ui.add_root(root).unwrap();
        ui.attach(root, child).unwrap();
        ui.resolve();

        ui.resize(800.0, 400.0);
        assert_eq!(ui.resolve(), 2);
        assert_relative_eq!(ui.layout(child).unwrap().height, 100.0);
    }

    #[test]
    fn test_setters_validate() {
        let mut ui = tree();
        let id = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        assert_eq!(ui.set_height_percent(id, 0.0), Err(UiError::InvalidHeightPercent(0.0)));
        assert_eq!(ui.set_text(id, "hello"), Err(UiError::NotText));
        assert_relative_eq!(ui.get(id).unwrap().height_percent, 0.5);
    }

    #[test]
    fn test_walk_is_pre_order() {
        let mut ui = tree();
        let a = widget(&mut ui, 1.0, Anchor::MiddleMiddle);
        let a1 = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        let a2 = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        let a1x = widget(&mut ui, 0.5, Anchor::MiddleMiddle);
        let b = widget(&mut ui, 1.0, Anchor::MiddleMiddle);
        ui.add_root(a).unwrap();
        ui.add_root(b).unwrap();
        ui.attach(a, a1).unwrap();
        ui.attach(a, a2).unwrap();
        ui.attach(a1, a1x).unwrap();

        assert_eq!(ui.walk(), vec![a, a1, a1x, a2, b]);
    }

    #[test]
    fn test_text_quads_need_font_and_layout() {
        let mut ui = tree();
        let label = ui
            .insert(WidgetBuilder::text(TextContent::new("pokefont", "A")).height_percent(0.1).aspect_ratio(0.1))
            .unwrap();
        ui.add_root(label).unwrap();

        let mut fonts = HashMap::new();
        assert!(ui.text_quads(label, &fonts).is_none());

        let mut characters = HashMap::new();
        characters.insert(
            'A',
            GlyphMetrics {
                size: (10, 10),
                bearing: (0, 10),
                advance: 12,
            },
        );
        fonts.insert(
            "pokefont".to_string(),
            FontData {
                glyph_size: 16,
                texture: TextureHandle(3),
                characters,
            },
        );
        assert!(ui.text_quads(label, &fonts).is_none());

        ui.resolve();
        assert_eq!(ui.text_quads(label, &fonts).map(|q| q.len()), Some(1));

        ui.set_text(label, "AA").unwrap();
        ui.resolve();
        assert_eq!(ui.text_quads(label, &fonts).map(|q| q.len()), Some(2));
    }
}
