//! Interactive event forms.

use anyhow::Result;
use dialoguer::{Confirm, Input};
use eventcache_core::{Event, EventFields, EventPatch};

fn prompt(label: &str, initial: &str, required: bool) -> Result<String> {
    let input = Input::<String>::new()
        .with_prompt(format!("  {}", label))
        .allow_empty(!required);
    let value = if initial.is_empty() {
        input.interact_text()?
    } else {
        input.default(initial.to_string()).interact_text()?
    };
    Ok(value.trim().to_string())
}

fn prompt_fields(initial: &EventFields) -> Result<EventFields> {
    Ok(EventFields {
        title: prompt("Title", &initial.title, true)?,
        description: prompt("Description", &initial.description, false)?,
        date: prompt("Date (YYYY-MM-DD)", &initial.date, false)?,
        time: prompt("Time (HH:MM)", &initial.time, false)?,
        location: prompt("Location", &initial.location, false)?,
        image: prompt("Image", &initial.image, false)?,
    })
}

/// Ask for every field of a new event.
pub fn new_event() -> Result<EventFields> {
    prompt_fields(&EventFields::default())
}

/// Ask for every field, prefilled with the current values. Only changed
/// fields end up in the patch.
pub fn edit_event(current: &Event) -> Result<EventPatch> {
    let edited = prompt_fields(&current.fields())?;
    Ok(changed_fields(current, edited))
}

pub fn changed_fields(current: &Event, edited: EventFields) -> EventPatch {
    fn keep_if_changed(old: &str, new: String) -> Option<String> {
        (old != new).then_some(new)
    }
    EventPatch {
        title: keep_if_changed(&current.title, edited.title),
        description: keep_if_changed(&current.description, edited.description),
        date: keep_if_changed(&current.date, edited.date),
        time: keep_if_changed(&current.time, edited.time),
        location: keep_if_changed(&current.location, edited.location),
        image: keep_if_changed(&current.image, edited.image),
    }
}

/// Two-step delete prompt.
pub fn confirm_delete(title: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!(
            "Delete \"{}\"? This action cannot be undone.",
            title
        ))
        .default(false)
        .interact()?)
}

pub fn confirm_retry() -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt("Try again?")
        .default(true)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use eventcache_core::EventId;

    use super::*;

    fn event() -> Event {
        Event {
            id: EventId::new("7"),
            title: "Old".into(),
            description: "Same".into(),
            date: "2025-06-01".into(),
            time: "18:00".into(),
            location: "Main Hall".into(),
            image: String::new(),
        }
    }

    #[test]
    fn test_changed_fields_only() {
        let current = event();
        let mut edited = current.fields();
        edited.title = "New".into();
        edited.image = "images/new.jpg".into();

        let patch = changed_fields(&current, edited);
        assert_eq!(patch.title.as_deref(), Some("New"));
        assert_eq!(patch.image.as_deref(), Some("images/new.jpg"));
        assert!(patch.description.is_none());
        assert!(patch.location.is_none());
    }

    #[test]
    fn test_unchanged_form_is_empty_patch() {
        let current = event();
        assert!(changed_fields(&current, current.fields()).is_empty());
    }
}
