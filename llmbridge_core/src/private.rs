//! Support items for code generated by `#[derive(InputSchema)]`.
//!
//! A field default is published in the schema only when its type is
//! `Serialize`. The choice is made by method resolution on [`DefaultOf`]:
//! `(&DefaultOf(&value)).published_default()` finds the `Serialize` impl on
//! `DefaultOf<T>` first and falls back to the blanket impl on `&DefaultOf<T>`.

use serde::Serialize;
use serde_json::Value;

pub struct DefaultOf<'a, T>(pub &'a T);

pub trait SerializedDefault {
    fn published_default(&self) -> Option<Value>;
}

impl<T: Serialize> SerializedDefault for DefaultOf<'_, T> {
    fn published_default(&self) -> Option<Value> {
        serde_json::to_value(self.0).ok()
    }
}

pub trait UnpublishedDefault {
    fn published_default(&self) -> Option<Value>;
}

impl<T> UnpublishedDefault for &DefaultOf<'_, T> {
    fn published_default(&self) -> Option<Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Opaque;

    #[test]
    fn serializable_defaults_are_published() {
        let limit = 10u32;
        assert_eq!((&DefaultOf(&limit)).published_default(), Some(json!(10)));
    }

    #[test]
    fn other_defaults_are_left_to_deserialization() {
        let opaque = Opaque;
        assert_eq!((&DefaultOf(&opaque)).published_default(), None);
    }
}
