use serde_json::{Map, Value};

use crate::spec::field::FieldConfig;
use crate::spec::form::FormConfig;

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Derives the visibility of every field from the current values.
///
/// Fields without a `conditional` block are always visible. Visibility never
/// touches `values`: a hidden field keeps whatever was entered before, so the
/// input is still there when it is shown again.
pub fn compute_visibility<'a>(
    fields: impl IntoIterator<Item = &'a FieldConfig>,
    values: &Value,
) -> VisibilityMap {
    let empty = Map::new();
    let values = values.as_object().unwrap_or(&empty);

    fields
        .into_iter()
        .map(|field| {
            let visible = field
                .conditional
                .as_ref()
                .is_none_or(|group| group.matches(values));
            (field.id.clone(), visible)
        })
        .collect()
}

pub fn resolve_form_visibility(form: &FormConfig, values: &Value) -> VisibilityMap {
    compute_visibility(form.all_fields(), values)
}

/// Unknown ids are reported visible.
pub fn is_field_visible(map: &VisibilityMap, field_id: &str) -> bool {
    map.get(field_id).copied().unwrap_or(true)
}

pub fn visible_fields<'a>(fields: &'a [FieldConfig], map: &VisibilityMap) -> Vec<&'a FieldConfig> {
    fields
        .iter()
        .filter(|field| is_field_visible(map, &field.id))
        .collect()
}

pub fn hidden_fields<'a>(fields: &'a [FieldConfig], map: &VisibilityMap) -> Vec<&'a FieldConfig> {
    fields
        .iter()
        .filter(|field| !is_field_visible(map, &field.id))
        .collect()
}
