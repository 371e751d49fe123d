const MAX_LENGTH: usize = 72;

pub(crate) fn shorten_content(content: &str) -> String {
    if content.chars().count() <= MAX_LENGTH {
        content.to_owned()
    } else {
        content.chars().take(MAX_LENGTH).collect::<String>() + "…"
    }
}
