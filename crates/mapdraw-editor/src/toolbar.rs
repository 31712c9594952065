//! Mode toolbar: a hand/pan entry followed by one entry per drawing mode.

use crate::map::{MapView, RenderableOverlay, ToolbarItem, Widget, WidgetKind};
use crate::options::ToolbarOptions;
use kurbo::Vec2;

#[derive(Debug)]
pub struct Toolbar {
    items: Vec<ToolbarItem>,
    active: ToolbarItem,
    options: ToolbarOptions,
    attached: bool,
}

impl Toolbar {
    pub fn new(options: ToolbarOptions) -> Self {
        let items = std::iter::once(ToolbarItem::Hand)
            .chain(options.drawing_modes.iter().copied().map(ToolbarItem::Mode))
            .collect();
        Self {
            items,
            active: ToolbarItem::Hand,
            options,
            attached: false,
        }
    }

    pub fn items(&self) -> &[ToolbarItem] {
        &self.items
    }

    pub fn active(&self) -> ToolbarItem {
        self.active
    }

    pub fn offers(&self, item: ToolbarItem) -> bool {
        self.items.contains(&item)
    }

    /// Move the highlight, redrawing if it changed.
    pub fn highlight(&mut self, item: ToolbarItem, map: &mut dyn MapView) {
        if self.active == item {
            return;
        }
        self.active = item;
        if self.attached {
            self.draw(map);
        }
    }
}

impl RenderableOverlay for Toolbar {
    fn attach(&mut self, map: &mut dyn MapView) {
        self.attached = true;
        self.draw(map);
    }

    fn draw(&mut self, map: &mut dyn MapView) {
        let (dx, dy) = self.options.offset;
        map.mount_widget(Widget::Toolbar {
            items: self.items.clone(),
            active: self.active,
            anchor: self.options.anchor,
            offset: Vec2::new(dx, dy),
            scale: self.options.scale,
        });
    }

    fn detach(&mut self, map: &mut dyn MapView) {
        self.attached = false;
        map.unmount_widget(WidgetKind::Toolbar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessMap;
    use kurbo::Size;
    use mapdraw_core::DrawingMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn items_are_hand_then_configured_modes() {
        let toolbar = Toolbar::new(ToolbarOptions {
            drawing_modes: vec![DrawingMode::Polygon, DrawingMode::Circle],
            ..ToolbarOptions::default()
        });
        assert_eq!(
            toolbar.items(),
            &[
                ToolbarItem::Hand,
                ToolbarItem::Mode(DrawingMode::Polygon),
                ToolbarItem::Mode(DrawingMode::Circle),
            ]
        );
        assert!(!toolbar.offers(ToolbarItem::Mode(DrawingMode::Marker)));
    }

    #[test]
    fn highlight_redraws_mounted_widget() {
        let mut map = HeadlessMap::new(Size::new(400.0, 300.0));
        let mut toolbar = Toolbar::new(ToolbarOptions::default());
        toolbar.attach(&mut map);
        toolbar.highlight(ToolbarItem::Mode(DrawingMode::Rectangle), &mut map);
        let Some(Widget::Toolbar { active, offset, .. }) = map.widget(WidgetKind::Toolbar) else {
            panic!("toolbar not mounted");
        };
        assert_eq!(*active, ToolbarItem::Mode(DrawingMode::Rectangle));
        assert_eq!(*offset, Vec2::new(10.0, 10.0));
        toolbar.detach(&mut map);
        assert!(map.widget(WidgetKind::Toolbar).is_none());
    }
}
