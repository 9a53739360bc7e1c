//! Contracts between registers and concrete widgets.

use std::sync::Weak;

use crate::data::ItemValue;

/// A concrete widget showing one item.
///
/// The register drives the widget; the widget never touches records. Any
/// toolkit can be plugged in by implementing this trait.
///
/// # Thread Safety
///
/// Renderers are shared between the register and the toolkit, so they must
/// be `Send + Sync` and use interior mutability.
pub trait ItemRenderer: Send + Sync {
    /// Name of the item this widget shows.
    fn item_name(&self) -> &str;

    /// Set the value as if the user had typed it.
    ///
    /// The widget reports the change to its listener.
    fn set_value(&self, value: ItemValue);

    /// Set the displayed value without reporting a change.
    fn set_initial_value(&self, value: ItemValue);

    /// The value currently held by the widget.
    fn value(&self) -> ItemValue;

    /// Show or hide the widget.
    fn set_visible(&self, visible: bool);

    /// Allow or forbid user edits.
    fn set_edit_allowed(&self, allowed: bool);

    /// Mark the widget as requiring a value.
    fn set_mandatory(&self, mandatory: bool);

    /// Flag the widget as holding a rejected value, or clear the flag.
    fn validation_error_occurred(&self, invalid: bool);

    /// Install or remove the listener edits and focus changes are reported to.
    fn set_listener(&self, listener: Option<Weak<dyn ScreenItemListener>>);
}

/// Callbacks from widgets into their register.
pub trait ScreenItemListener: Send + Sync {
    /// The widget showing `item_name` now holds `value`.
    fn item_value_changed(&self, item_name: &str, value: ItemValue);

    /// The widget showing `item_name` gained focus.
    fn focus_gained(&self, item_name: &str);

    /// The widget showing `item_name` lost focus.
    fn focus_lost(&self, item_name: &str);
}
