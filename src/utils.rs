use std::fmt::Display;
use uuid::Uuid;

/// Link to a subscription's detail page in the workflows GUI
pub fn subscription_link(workflows_gui_uri: &str, subscription_id: Uuid) -> String {
    format!(
        "{}/subscription/{}",
        workflows_gui_uri.trim_end_matches('/'),
        subscription_id
    )
}

/// Join values with ", " for summary tables
pub fn array_to_comma_separated_string<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
